use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

use super::Notifier;

pub struct SlackNotifier {
    webhook_url: String,
    client: Client,
    timeout: Duration,
}

impl SlackNotifier {
    /// `None` when `SLACK_WEBHOOK_URL` is unset or blank.
    pub fn from_env() -> Option<Self> {
        std::env::var("SLACK_WEBHOOK_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .map(Self::new)
    }

    pub fn new(webhook_url: String) -> Self {
        Self {
            webhook_url,
            client: Client::new(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }
}

#[async_trait::async_trait]
impl Notifier for SlackNotifier {
    fn name(&self) -> &'static str {
        "slack"
    }

    async fn send(&self, message: &str) -> Result<()> {
        let body = serde_json::json!({ "text": message });

        self.client
            .post(&self.webhook_url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .context("slack post")?
            .error_for_status()
            .context("slack non-2xx")?;
        Ok(())
    }
}
