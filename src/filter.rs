// src/filter.rs
//! Name filter: turns one raw text node into a candidate company/project name,
//! or rejects it.
//!
//! Normalization:
//! 1) trim + collapse whitespace/newlines to single spaces
//! 2) replace anything outside `[\w\s\-.]` with a space, then collapse again
//!
//! Rejection rules (any one rejects):
//! - length outside 2..=50 characters, or more than 4 tokens
//! - whole string is a generic / navigational stopword
//! - contains a navigational phrase ("read more", "privacy policy", ...)
//! - looks like a URL, domain or handle
//! - purely numeric
//! - contains descriptive/technical vocabulary typical of marketing copy

use once_cell::sync::Lazy;
use regex::Regex;

pub const MIN_NAME_CHARS: usize = 2;
pub const MAX_NAME_CHARS: usize = 50;
pub const MAX_NAME_TOKENS: usize = 4;

/// Generic words and UI chrome that are never a company name on their own.
pub const STOPWORDS: &[&str] = &[
    "the", "and", "or", "of", "in", "on", "at", "to", "for", "with", "by", "from", "about",
    "into", "through", "during", "before", "after", "above", "below", "up", "down", "out",
    "off", "over", "under", "again", "further", "then", "once", "here", "there", "when",
    "where", "why", "how", "all", "any", "both", "each", "few", "more", "most", "other",
    "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than", "too", "very",
    "can", "will", "just", "should", "now", "portfolio", "company", "companies",
    "investment", "investments", "project", "projects", "team", "teams", "startup",
    "startups", "jobs", "press", "contact", "disclosures", "privacy", "twitter", "home",
    "blog", "news", "careers", "login", "search", "menu", "close", "open", "view", "show",
    "load", "filter", "apply", "clear", "category", "stage", "partner", "featured",
    "writing", "insights", "x", "subscribe", "newsletter", "get", "read", "explore",
    "discover", "learn", "find", "see", "terms", "conditions", "service", "cookies",
    "policy", "rights", "reserved", "copyright", "legal", "disclaimer", "faq", "help",
    "support",
];

/// Navigation phrases rejected anywhere in the text.
pub const NAV_PHRASES: &[&str] = &[
    "x twitter", "follow us", "subscribe", "newsletter", "get in touch", "learn more",
    "read more", "view all", "show all", "load more", "see more", "explore", "discover",
    "find out", "click here", "sign up", "log in", "register", "submit", "contact us",
    "about us", "our team", "privacy policy", "terms of service", "all rights reserved",
];

/// Vocabulary of descriptions and taglines rather than names.
pub const DESCRIPTIVE_WORDS: &[&str] = &[
    "description", "overview", "summary", "details", "information", "technology",
    "platform", "protocol", "solution", "service", "application", "ecosystem", "network",
    "infrastructure", "blockchain", "crypto", "defi", "nft", "web3", "decentralized",
    "distributed",
];

static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));
static RE_STRIP: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s\-.]").expect("strip regex"));
static RE_NUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").expect("numeric regex"));
static RE_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^https?\b|\.com|\.io|\.xyz|www\.").expect("link regex")
});
static RE_NAV: Lazy<Regex> = Lazy::new(|| word_alternation(NAV_PHRASES));
static RE_DESCRIPTIVE: Lazy<Regex> = Lazy::new(|| word_alternation(DESCRIPTIVE_WORDS));

/// Case-insensitive `\b(a|b|c)\b` over literal words/phrases.
pub(crate) fn word_alternation<S: AsRef<str>>(words: &[S]) -> Regex {
    let alts: Vec<String> = words.iter().map(|w| regex::escape(w.as_ref())).collect();
    Regex::new(&format!(r"(?i)\b(?:{})\b", alts.join("|"))).expect("word alternation regex")
}

/// Collapse whitespace and strip characters that never occur in a name.
pub fn normalize(raw: &str) -> String {
    let collapsed = RE_WS.replace_all(raw.trim(), " ");
    let stripped = RE_STRIP.replace_all(&collapsed, " ");
    RE_WS.replace_all(stripped.trim(), " ").into_owned()
}

/// Number of single-space separated tokens.
pub fn token_count(name: &str) -> usize {
    name.split(' ').filter(|t| !t.is_empty()).count()
}

fn is_stopword(name: &str) -> bool {
    let lower = name.to_lowercase();
    STOPWORDS.iter().any(|w| *w == lower)
}

/// Filter one raw text node. Returns the normalized name if it survives.
pub fn filter_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.starts_with('@') {
        return None;
    }

    let name = normalize(trimmed);
    let len = name.chars().count();
    if !(MIN_NAME_CHARS..=MAX_NAME_CHARS).contains(&len) {
        return None;
    }
    if token_count(&name) > MAX_NAME_TOKENS {
        return None;
    }
    if is_stopword(&name)
        || RE_NAV.is_match(&name)
        || RE_LINK.is_match(&name)
        || RE_NUMERIC.is_match(&name)
        || RE_DESCRIPTIVE.is_match(&name)
    {
        return None;
    }

    Some(name)
}
