// src/fetch/interaction.rs
//! Interaction strategies run against a live page before its DOM is read.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::source::Interaction;

/// Finds the first "load more" style control and clicks it. Returns whether a click happened.
const CLICK_LOAD_MORE_JS: &str = r#"(() => {
  const buttons = Array.from(document.querySelectorAll('button'));
  const byText = (re) => buttons.find((b) => re.test(b.textContent || ''));
  const target = byText(/load more/i)
    || byText(/show more/i)
    || document.querySelector('.load-more')
    || document.querySelector('[class*="load-more"]')
    || byText(/view all/i);
  if (!target) return false;
  target.click();
  return true;
})()"#;

const SCROLL_HEIGHT_JS: &str = "document.body ? document.body.scrollHeight : 0";
const SCROLL_TO_BOTTOM_JS: &str = "window.scrollTo(0, document.body ? document.body.scrollHeight : 0)";

/// The few page operations the strategies need.
#[async_trait]
pub trait PageSurface: Send + Sync {
    async fn scroll_height(&self) -> Result<i64>;
    async fn scroll_to_bottom(&self) -> Result<()>;
    async fn click_load_more(&self) -> Result<bool>;
}

#[async_trait]
impl PageSurface for chromiumoxide::Page {
    async fn scroll_height(&self) -> Result<i64> {
        self.evaluate(SCROLL_HEIGHT_JS)
            .await
            .context("measuring scroll height")?
            .into_value::<i64>()
            .context("scroll height is not a number")
    }

    async fn scroll_to_bottom(&self) -> Result<()> {
        self.evaluate(SCROLL_TO_BOTTOM_JS)
            .await
            .context("scrolling to bottom")?;
        Ok(())
    }

    async fn click_load_more(&self) -> Result<bool> {
        let clicked = self
            .evaluate(CLICK_LOAD_MORE_JS)
            .await
            .context("clicking load-more control")?
            .into_value::<bool>()
            .unwrap_or(false);
        Ok(clicked)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionOutcome {
    Clicked,
    NoControl,
    /// Height stabilized after `rounds` scrolls.
    Scrolled { rounds: usize },
    /// Gave up after the round limit with the height still changing.
    ScrollCapped { rounds: usize },
}

#[derive(Debug, Clone, Copy)]
pub struct InteractionTiming {
    /// Wait after a click or a scroll for new content to land.
    pub settle: Duration,
    pub max_scroll_rounds: usize,
}

impl Default for InteractionTiming {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(2),
            max_scroll_rounds: 20,
        }
    }
}

pub async fn apply<P: PageSurface + ?Sized>(
    page: &P,
    interaction: Interaction,
    timing: InteractionTiming,
) -> Result<InteractionOutcome> {
    match interaction {
        Interaction::LoadMore => load_more(page, timing).await,
        Interaction::InfiniteScroll => infinite_scroll(page, timing).await,
    }
}

async fn load_more<P: PageSurface + ?Sized>(
    page: &P,
    timing: InteractionTiming,
) -> Result<InteractionOutcome> {
    if !page.click_load_more().await? {
        return Ok(InteractionOutcome::NoControl);
    }
    tokio::time::sleep(timing.settle).await;
    Ok(InteractionOutcome::Clicked)
}

async fn infinite_scroll<P: PageSurface + ?Sized>(
    page: &P,
    timing: InteractionTiming,
) -> Result<InteractionOutcome> {
    let mut current = page.scroll_height().await?;
    let mut rounds = 0usize;

    while rounds < timing.max_scroll_rounds {
        let previous = current;
        page.scroll_to_bottom().await?;
        tokio::time::sleep(timing.settle).await;
        current = page.scroll_height().await?;
        rounds += 1;
        debug!(target: "fetch", rounds, previous, current, "scrolled");
        if current == previous {
            return Ok(InteractionOutcome::Scrolled { rounds });
        }
    }

    Ok(InteractionOutcome::ScrollCapped { rounds })
}
