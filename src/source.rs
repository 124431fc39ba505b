// src/source.rs
use serde::{Deserialize, Serialize};

/// How a source has to be rendered before extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Plain HTTP GET of the served markup.
    #[default]
    Static,
    /// Headless browser; scripts run before the DOM is read.
    Dynamic,
}

/// "Reveal more content" step run in the browser after navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Interaction {
    /// Click the first "load more / show more / view all" control once.
    LoadMore,
    /// Scroll to the bottom until the document height stops changing.
    InfiniteScroll,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Canonical page URL; also the snapshot key.
    pub url: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub mode: RenderMode,
    #[serde(default)]
    pub interaction: Option<Interaction>,
}

impl Source {
    pub fn static_page(url: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            label: Some(label.into()),
            mode: RenderMode::Static,
            interaction: None,
        }
    }

    pub fn dynamic_page(
        url: impl Into<String>,
        label: impl Into<String>,
        interaction: Option<Interaction>,
    ) -> Self {
        Self {
            url: url.into(),
            label: Some(label.into()),
            mode: RenderMode::Dynamic,
            interaction,
        }
    }

    /// Human label used in the digest.
    pub fn display_label(&self) -> String {
        match self.label.as_deref().map(str::trim) {
            Some(l) if !l.is_empty() => l.to_string(),
            _ => label_from_url(&self.url),
        }
    }
}

/// `https://www.haun.co/portfolio` → `haun`.
pub fn label_from_url(raw: &str) -> String {
    url::Url::parse(raw)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .and_then(|host| {
            let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
            host.split('.').next().map(str::to_string)
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "Unknown source".to_string())
}
