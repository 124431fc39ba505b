// src/fetch/mod.rs
pub mod browser;
pub mod interaction;

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::histogram;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use std::time::Duration;

use crate::source::{RenderMode, Source};
pub use browser::{BrowserFetcher, BrowserOptions, BrowserProcess, Release};

pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const STATIC_TIMEOUT: Duration = Duration::from_secs(30);

/// Returns the rendered markup of one source. Errors stay per source.
#[async_trait]
pub trait SiteFetcher: Send + Sync {
    async fn fetch(&self, source: &Source) -> Result<String>;
}

/// Single GET with browser-like headers.
#[derive(Clone)]
pub struct StaticFetcher {
    client: reqwest::Client,
}

impl StaticFetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(STATIC_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context("building http client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SiteFetcher for StaticFetcher {
    async fn fetch(&self, source: &Source) -> Result<String> {
        let t0 = std::time::Instant::now();
        let result = self.get(source).await;
        histogram!("scout_fetch_ms", "mode" => "static").record(t0.elapsed().as_secs_f64() * 1_000.0);
        result
    }
}

impl StaticFetcher {
    async fn get(&self, source: &Source) -> Result<String> {
        let resp = self
            .client
            .get(&source.url)
            .send()
            .await
            .with_context(|| format!("GET {}", source.url))?
            .error_for_status()
            .with_context(|| format!("non-2xx from {}", source.url))?;
        resp.text().await.context("reading response body")
    }
}

/// Picks the static or browser variant from the source's render mode.
pub struct PageFetcher {
    static_fetcher: StaticFetcher,
    browser: BrowserFetcher,
}

impl PageFetcher {
    pub fn new(static_fetcher: StaticFetcher, browser: BrowserFetcher) -> Self {
        Self {
            static_fetcher,
            browser,
        }
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self::new(
            StaticFetcher::new()?,
            BrowserFetcher::new(BrowserOptions::from_env()),
        ))
    }
}

#[async_trait]
impl SiteFetcher for PageFetcher {
    async fn fetch(&self, source: &Source) -> Result<String> {
        match source.mode {
            RenderMode::Static => self.static_fetcher.fetch(source).await,
            RenderMode::Dynamic => self.browser.fetch(source).await,
        }
    }
}
