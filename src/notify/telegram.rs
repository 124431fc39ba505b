// src/notify/telegram.rs
use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::Notifier;

pub const TELEGRAM_API: &str = "https://api.telegram.org";

/// Bot API `sendMessage` to a single chat. One attempt per digest.
#[derive(Clone)]
pub struct TelegramNotifier {
    token: String,
    chat_id: String,
    api_base: String,
    client: Client,
    timeout: Duration,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    disable_web_page_preview: bool,
}

impl TelegramNotifier {
    pub fn new(token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            chat_id: chat_id.into(),
            api_base: TELEGRAM_API.to_string(),
            client: Client::new(),
            timeout: Duration::from_secs(15),
        }
    }

    /// Both `TELEGRAM_BOT_TOKEN` and `TELEGRAM_CHAT_ID` must be present.
    pub fn from_env() -> Result<Self> {
        let read = |key: &str| {
            std::env::var(key)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow!("missing required environment variable {key}"))
        };
        Ok(Self::new(read("TELEGRAM_BOT_TOKEN")?, read("TELEGRAM_CHAT_ID")?))
    }

    /// Points the client at another Bot API host (local test servers).
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.token)
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn send(&self, message: &str) -> Result<()> {
        let body = SendMessage {
            chat_id: &self.chat_id,
            text: message,
            disable_web_page_preview: true,
        };

        // Token is part of the URL; keep it out of error chains.
        let rsp = self
            .client
            .post(self.endpoint())
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| anyhow!("telegram request failed: {}", e.without_url()))?;

        let status = rsp.status();
        if !status.is_success() {
            let detail = rsp.text().await.unwrap_or_default();
            return Err(anyhow!("telegram HTTP {status}: {detail}"));
        }
        rsp.bytes().await.context("telegram response body")?;
        Ok(())
    }
}
