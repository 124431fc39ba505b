// src/fetch/browser.rs
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::{EventLifecycleEvent, NavigateParams};
use chromiumoxide::Page;
use futures::StreamExt;
use metrics::histogram;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::interaction::{self, InteractionTiming};
use super::{SiteFetcher, USER_AGENT};
use crate::source::Source;

#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// Chrome/Chromium binary; autodetected when `None`.
    pub chrome_path: Option<PathBuf>,
    pub navigation_timeout: Duration,
    /// Fixed wait after navigation before any interaction.
    pub settle: Duration,
    pub interaction: InteractionTiming,
    /// How long the process gets to exit after close, and again after kill.
    pub exit_grace: Duration,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            chrome_path: None,
            navigation_timeout: Duration::from_secs(60),
            settle: Duration::from_secs(2),
            interaction: InteractionTiming::default(),
            exit_grace: Duration::from_secs(10),
        }
    }
}

impl BrowserOptions {
    /// Defaults, plus `CHROME_PATH` when set.
    pub fn from_env() -> Self {
        Self {
            chrome_path: std::env::var("CHROME_PATH")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            ..Self::default()
        }
    }
}

/// Teardown operations on one launched browser process.
#[async_trait]
pub trait BrowserProcess: Send {
    /// Polite shutdown over the protocol channel.
    async fn close(&mut self) -> Result<()>;
    async fn kill(&mut self) -> Result<()>;
    /// Reaps the process. May never resolve if it does not exit.
    async fn wait(&mut self) -> Result<()>;
}

#[async_trait]
impl BrowserProcess for Browser {
    async fn close(&mut self) -> Result<()> {
        Browser::close(self).await.context("closing browser")?;
        Ok(())
    }

    async fn kill(&mut self) -> Result<()> {
        match Browser::kill(self).await {
            Some(res) => res.context("killing browser process"),
            None => Ok(()),
        }
    }

    async fn wait(&mut self) -> Result<()> {
        Browser::wait(self).await.context("waiting for browser exit")?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    Closed,
    Killed,
    /// Kill failed or the process outlived the grace period.
    Leaked,
}

/// Close, then kill if close fails or the process lingers. Never waits
/// longer than twice `grace` on the process itself.
pub async fn release<P: BrowserProcess + ?Sized>(process: &mut P, grace: Duration) -> Release {
    match process.close().await {
        Ok(()) => match tokio::time::timeout(grace, process.wait()).await {
            Ok(Ok(())) => return Release::Closed,
            Ok(Err(e)) => warn!(target: "fetch", error = ?e, "browser exit wait failed"),
            Err(_) => warn!(target: "fetch", ?grace, "browser still running after close"),
        },
        Err(e) => warn!(target: "fetch", error = ?e, "browser close failed"),
    }

    if let Err(e) = process.kill().await {
        warn!(target: "fetch", error = ?e, "browser kill failed");
        return Release::Leaked;
    }
    match tokio::time::timeout(grace, process.wait()).await {
        Ok(Ok(())) => Release::Killed,
        Ok(Err(e)) => {
            warn!(target: "fetch", error = ?e, "browser exit wait failed after kill");
            Release::Leaked
        }
        Err(_) => {
            warn!(target: "fetch", ?grace, "browser still running after kill");
            Release::Leaked
        }
    }
}

/// Navigates and resolves once the new document reports `networkIdle`.
/// Same-document navigations have no new loader and resolve immediately.
async fn navigate_until_idle(page: &Page, url: &str) -> Result<()> {
    let mut lifecycle = page
        .event_listener::<EventLifecycleEvent>()
        .await
        .context("subscribing to lifecycle events")?;
    let nav = page
        .execute(NavigateParams::new(url))
        .await
        .context("sending navigation")?;
    if let Some(err) = &nav.result.error_text {
        bail!("navigation failed: {err}");
    }
    let Some(loader) = nav.result.loader_id.clone() else {
        return Ok(());
    };

    while let Some(ev) = lifecycle.next().await {
        if ev.name == "networkIdle" && ev.loader_id == loader {
            return Ok(());
        }
    }
    bail!("lifecycle events ended before the network went idle")
}

/// One isolated headless browser per fetch; always released before returning.
#[derive(Debug, Clone, Default)]
pub struct BrowserFetcher {
    opts: BrowserOptions,
}

impl BrowserFetcher {
    pub fn new(opts: BrowserOptions) -> Self {
        Self { opts }
    }

    async fn launch(&self) -> Result<(Browser, JoinHandle<()>)> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-setuid-sandbox")
            .arg("--disable-dev-shm-usage")
            .request_timeout(self.opts.navigation_timeout);
        if let Some(path) = &self.opts.chrome_path {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|e| anyhow!("browser config error: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("launching headless browser")?;

        // The CDP handler must be polled for the browser to make progress.
        let events = tokio::spawn(async move {
            while let Some(ev) = handler.next().await {
                if ev.is_err() {
                    break;
                }
            }
        });

        Ok((browser, events))
    }

    async fn render(&self, browser: &Browser, source: &Source) -> Result<String> {
        let page = browser
            .new_page("about:blank")
            .await
            .context("opening page")?;
        page.set_user_agent(SetUserAgentOverrideParams::new(USER_AGENT))
            .await
            .context("setting user agent")?;

        tokio::time::timeout(
            self.opts.navigation_timeout,
            navigate_until_idle(&page, &source.url),
        )
        .await
        .map_err(|_| {
            anyhow!(
                "navigation to {} timed out after {:?}",
                source.url,
                self.opts.navigation_timeout
            )
        })?
        .with_context(|| format!("navigating to {}", source.url))?;

        tokio::time::sleep(self.opts.settle).await;

        if let Some(kind) = source.interaction {
            // A failed recipe still leaves a readable DOM.
            match interaction::apply(&page, kind, self.opts.interaction).await {
                Ok(outcome) => debug!(target: "fetch", source = %source.url, ?outcome, "interaction done"),
                Err(e) => warn!(target: "fetch", source = %source.url, error = ?e, "interaction failed"),
            }
        }

        page.content().await.context("reading rendered DOM")
    }
}

#[async_trait]
impl SiteFetcher for BrowserFetcher {
    async fn fetch(&self, source: &Source) -> Result<String> {
        let t0 = std::time::Instant::now();
        let result = match self.launch().await {
            Ok((mut browser, events)) => {
                let result = self.render(&browser, source).await;
                let released = release(&mut browser, self.opts.exit_grace).await;
                debug!(target: "fetch", source = %source.url, ?released, "browser released");
                events.abort();
                result
            }
            Err(e) => Err(e),
        };

        histogram!("scout_fetch_ms", "mode" => "dynamic").record(t0.elapsed().as_secs_f64() * 1_000.0);
        result
    }
}
