// src/extract/mod.rs
pub mod acceptance;

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::HashSet;

use crate::filter::filter_name;
pub use acceptance::{AcceptanceRegistry, DefaultAcceptance, ExcludeWords, NameAcceptance, OverrideRule};

/// Upper bound of names kept per source and run.
pub const MAX_NAMES_PER_SOURCE: usize = 100;

/// Selector groups, applied in this order. Discovery order matters for the cap.
const SELECTOR_GROUPS: &[&str] = &[
    "h1, h2, h3, h4, h5, h6",
    r#"a[href*="/portfolio"], a[href*="/companies"], a[href*="/investments"]"#,
    ".portfolio-item, .company-item, .investment-item",
    ".project-name, .company-name, .startup-name",
    "li",
    "strong, b",
    r#"[class*="portfolio"], [class*="company"], [class*="project"], [class*="investment"]"#,
    "span",
];

static SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    SELECTOR_GROUPS
        .iter()
        .map(|s| Selector::parse(s).expect("static selector"))
        .collect()
});

/// Extracts candidate names from rendered portfolio markup.
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    registry: AcceptanceRegistry,
}

impl Extractor {
    pub fn new(registry: AcceptanceRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &AcceptanceRegistry {
        &self.registry
    }

    /// Unique names in discovery order, at most `MAX_NAMES_PER_SOURCE`.
    pub fn extract(&self, html: &str, source_id: &str) -> Vec<String> {
        let document = Html::parse_document(html);
        let mut seen: HashSet<String> = HashSet::new();
        let mut found = Vec::new();

        for selector in SELECTORS.iter() {
            for element in document.select(selector) {
                let text: String = element.text().collect();
                if let Some(name) = filter_name(&text) {
                    if seen.insert(name.clone()) {
                        found.push(name);
                    }
                }
            }
        }

        let rule = self.registry.resolve(source_id);
        found.retain(|name| rule.accept(name));
        found.truncate(MAX_NAMES_PER_SOURCE);

        tracing::debug!(target: "extract", source = source_id, kept = found.len(), "extracted names");
        found
    }
}
