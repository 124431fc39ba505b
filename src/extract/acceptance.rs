// src/extract/acceptance.rs
//! Secondary, per-source acceptance rules applied after the generic name filter.
//!
//! - `NameAcceptance` is the capability: "is this name acceptable for this source?"
//! - `DefaultAcceptance` covers sources without quirks (len >= 3, <= 3 tokens).
//! - `ExcludeWords` rejects site-specific noise words observed on one page.
//! - `AcceptanceRegistry` maps a source (full URL or bare domain) to its rule.
//!   Lookup order: exact source id → domain contained in the source id → default.

use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;

use crate::filter::{token_count, word_alternation};

pub trait NameAcceptance: Send + Sync + std::fmt::Debug {
    fn accept(&self, name: &str) -> bool;
}

#[derive(Debug, Clone, Copy)]
pub struct DefaultAcceptance {
    pub min_chars: usize,
    pub max_tokens: usize,
}

impl Default for DefaultAcceptance {
    fn default() -> Self {
        Self {
            min_chars: 3,
            max_tokens: 3,
        }
    }
}

impl NameAcceptance for DefaultAcceptance {
    fn accept(&self, name: &str) -> bool {
        name.chars().count() >= self.min_chars && token_count(name) <= self.max_tokens
    }
}

/// Rejects names containing any of `words` (case-insensitive, whole words).
/// `max_tokens = None` keeps the generic filter's bound only.
#[derive(Debug, Clone)]
pub struct ExcludeWords {
    min_chars: usize,
    max_tokens: Option<usize>,
    words: Option<Regex>,
}

impl ExcludeWords {
    pub fn new<S: AsRef<str>>(words: &[S], min_chars: usize, max_tokens: Option<usize>) -> Self {
        let words = if words.is_empty() {
            None
        } else {
            Some(word_alternation(words))
        };
        Self {
            min_chars,
            max_tokens,
            words,
        }
    }
}

impl NameAcceptance for ExcludeWords {
    fn accept(&self, name: &str) -> bool {
        if name.chars().count() < self.min_chars {
            return false;
        }
        if let Some(max) = self.max_tokens {
            if token_count(name) > max {
                return false;
            }
        }
        !self.words.as_ref().is_some_and(|re| re.is_match(name))
    }
}

/// Override entry as it appears in the sources config.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct OverrideRule {
    /// Full source URL or a bare domain such as `paradigm.xyz`.
    #[serde(alias = "domain")]
    pub source: String,
    #[serde(default = "default_min_chars")]
    pub min_chars: usize,
    #[serde(default)]
    pub max_tokens: Option<usize>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

fn default_min_chars() -> usize {
    3
}

impl OverrideRule {
    pub fn to_acceptance(&self) -> ExcludeWords {
        ExcludeWords::new(&self.exclude, self.min_chars, self.max_tokens)
    }
}

#[derive(Debug, Clone)]
pub struct AcceptanceRegistry {
    default: Arc<dyn NameAcceptance>,
    entries: Vec<(String, Arc<dyn NameAcceptance>)>,
}

impl Default for AcceptanceRegistry {
    fn default() -> Self {
        Self {
            default: Arc::new(DefaultAcceptance::default()),
            entries: Vec::new(),
        }
    }
}

impl AcceptanceRegistry {
    /// Registry with only the default rule.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Later registrations for the same key replace earlier ones.
    pub fn register(&mut self, key: impl Into<String>, rule: Arc<dyn NameAcceptance>) {
        let key = key.into().trim().to_ascii_lowercase();
        self.entries.retain(|(k, _)| *k != key);
        self.entries.push((key, rule));
    }

    pub fn with_rules(rules: &[OverrideRule]) -> Self {
        let mut reg = Self::default();
        for r in rules {
            reg.register(r.source.clone(), Arc::new(r.to_acceptance()));
        }
        reg
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn resolve(&self, source_id: &str) -> Arc<dyn NameAcceptance> {
        let id = source_id.trim().to_ascii_lowercase();
        if let Some((_, rule)) = self.entries.iter().find(|(k, _)| *k == id) {
            return Arc::clone(rule);
        }
        if let Some((_, rule)) = self.entries.iter().find(|(k, _)| id.contains(k.as_str())) {
            return Arc::clone(rule);
        }
        Arc::clone(&self.default)
    }

    /// Built-in quirks for known portfolio pages.
    pub fn default_seed() -> Vec<OverrideRule> {
        let rule = |source: &str, exclude: &[&str]| OverrideRule {
            source: source.to_string(),
            min_chars: 3,
            max_tokens: None,
            exclude: exclude.iter().map(|s| s.to_string()).collect(),
        };
        vec![
            rule(
                "sequoiacap.com",
                &["close", "filter", "clear", "apply", "category", "stage", "partner"],
            ),
            rule(
                "paradigm.xyz",
                &[
                    "portfolio", "featured", "investments", "protocol", "exchange", "wallet",
                    "platform",
                ],
            ),
            rule(
                "a16zcrypto.com",
                &[
                    "acquired", "companies", "undergone", "initial", "public", "offering",
                    "shares", "certain", "publicly", "traded", "held", "funds", "available",
                    "excluded", "investments", "issuer", "provided", "permission", "disclose",
                    "unannounced", "digital", "assets", "updated", "monthly",
                ],
            ),
        ]
    }
}
