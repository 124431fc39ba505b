// src/notify/mod.rs
//! Outbound digest channels. Telegram is mandatory, Slack is optional.

pub mod slack;
pub mod telegram;

use anyhow::Result;
use std::sync::{Arc, Mutex};

pub use slack::SlackNotifier;
pub use telegram::TelegramNotifier;

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;
    async fn send(&self, message: &str) -> Result<()>;
}

/// Fans a message out to every configured channel.
/// A failing channel is logged and never blocks the others.
#[derive(Default, Clone)]
pub struct NotifierMux {
    channels: Vec<Arc<dyn Notifier>>,
}

impl NotifierMux {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, channel: Arc<dyn Notifier>) -> Self {
        self.channels.push(channel);
        self
    }

    /// Telegram credentials are required; Slack joins when `SLACK_WEBHOOK_URL` is set.
    pub fn from_env() -> Result<Self> {
        let mut mux = Self::new().with(Arc::new(TelegramNotifier::from_env()?));
        if let Some(slack) = SlackNotifier::from_env() {
            mux = mux.with(Arc::new(slack));
        }
        Ok(mux)
    }

    pub fn channel_names(&self) -> Vec<&'static str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// Returns how many channels accepted the message.
    pub async fn notify(&self, message: &str) -> usize {
        let mut delivered = 0;
        for ch in &self.channels {
            match ch.send(message).await {
                Ok(()) => {
                    delivered += 1;
                    tracing::info!(target: "notify", channel = ch.name(), "digest sent");
                }
                Err(e) => {
                    metrics::counter!("scout_notify_failures_total", "channel" => ch.name())
                        .increment(1);
                    tracing::warn!(target: "notify", channel = ch.name(), error = ?e, "notification failed");
                }
            }
        }
        delivered
    }
}

/// Keeps every message in memory; used by tests and the dry-run binary.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.sent.lock().expect("recording notifier mutex poisoned").clone()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, message: &str) -> Result<()> {
        self.sent
            .lock()
            .expect("recording notifier mutex poisoned")
            .push(message.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    struct Broken;

    #[async_trait::async_trait]
    impl Notifier for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }
        async fn send(&self, _message: &str) -> Result<()> {
            Err(anyhow!("down"))
        }
    }

    #[tokio::test]
    async fn failing_channel_does_not_block_others() {
        let rec = Arc::new(RecordingNotifier::default());
        let mux = NotifierMux::new().with(Arc::new(Broken)).with(rec.clone());

        assert_eq!(mux.notify("hello").await, 1);
        assert_eq!(rec.messages(), vec!["hello".to_string()]);
        assert_eq!(mux.channel_names(), vec!["broken", "recording"]);
    }
}
