// src/config.rs
//! Watch configuration: ordered sources, per-source overrides and timings.
//!
//! Lookup order:
//! 1) $PORTFOLIO_CONFIG_PATH
//! 2) config/sources.toml
//! 3) config/sources.json
//! 4) built-in seed list

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::extract::{AcceptanceRegistry, OverrideRule};
use crate::source::{Interaction, Source};
use crate::store::file::DEFAULT_DATA_FILE;

pub const ENV_CONFIG_PATH: &str = "PORTFOLIO_CONFIG_PATH";

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct WatchConfig {
    /// Period between scheduled runs.
    pub interval_secs: u64,
    /// Delay before the first scheduled run after startup.
    pub initial_delay_secs: u64,
    pub inter_source_delay_ms: u64,
    pub data_file: PathBuf,
    pub sources: Vec<Source>,
    pub overrides: Vec<OverrideRule>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval_secs: 2 * 60 * 60,
            initial_delay_secs: 30,
            inter_source_delay_ms: 1_000,
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            sources: default_sources(),
            overrides: AcceptanceRegistry::default_seed(),
        }
    }
}

impl WatchConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_secs)
    }

    pub fn inter_source_delay(&self) -> Duration {
        Duration::from_millis(self.inter_source_delay_ms)
    }

    pub fn registry(&self) -> AcceptanceRegistry {
        AcceptanceRegistry::with_rules(&self.overrides)
    }

    fn validate(self) -> Result<Self> {
        if self.interval_secs == 0 {
            bail!("interval_secs must be positive");
        }
        let mut seen = std::collections::HashSet::new();
        for s in &self.sources {
            url::Url::parse(&s.url).with_context(|| format!("invalid source url {:?}", s.url))?;
            if !seen.insert(s.url.as_str()) {
                bail!("duplicate source url {}", s.url);
            }
        }
        Ok(self)
    }
}

/// Load from an explicit path. TOML or JSON, chosen by extension.
pub fn load_from(path: &Path) -> Result<WatchConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let cfg: WatchConfig = match ext.as_str() {
        "json" => serde_json::from_str(&content)
            .with_context(|| format!("parsing JSON config {}", path.display()))?,
        _ => toml::from_str(&content)
            .with_context(|| format!("parsing TOML config {}", path.display()))?,
    };
    cfg.validate()
}

pub fn load_default() -> Result<WatchConfig> {
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if !pb.exists() {
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        return load_from(&pb);
    }
    let toml_p = PathBuf::from("config/sources.toml");
    if toml_p.exists() {
        return load_from(&toml_p);
    }
    let json_p = PathBuf::from("config/sources.json");
    if json_p.exists() {
        return load_from(&json_p);
    }
    Ok(WatchConfig::default())
}

/// The shipped portfolio pages, static ones first.
pub fn default_sources() -> Vec<Source> {
    let st = |url: &str, label: &str| Source::static_page(url, label);
    let dy = |url: &str, label: &str| Source::dynamic_page(url, label, None);
    vec![
        st("https://www.haun.co/portfolio", "Haun Ventures"),
        st("https://hashkey.capital/portfolio/index.html", "HashKey Capital"),
        st("https://greenfield.xyz/portfolio/", "Greenfield One"),
        st("https://www.fabric.vc/portfolio", "Fabric Ventures"),
        st("https://www.dewhales.com/portfolio", "DeWhales Capital"),
        st("https://www.mhventures.io/portfolio", "MH Ventures"),
        st("https://multicoin.capital/portfolio/", "Multicoin Capital"),
        st("https://www.wintermute.com/ventures/portfolio", "Wintermute Ventures"),
        st("https://alliance.xyz/companies", "Alliance"),
        st("https://gmcapital.xyz/", "GM Capital"),
        st("https://nativecrypto.xyz/", "Native Crypto"),
        st("https://nativecrypto.xyz/cc/", "Native Crypto"),
        st("https://www.stake.capital/", "Stake Capital"),
        st("https://shima.capital/investments", "Shima Capital"),
        dy("https://nlh.xyz/#portfolio", "NLH"),
        Source::dynamic_page(
            "https://www.framework.ventures/portfolio",
            "Framework Ventures",
            Some(Interaction::LoadMore),
        ),
        Source::dynamic_page(
            "https://delphiventures.io/portfolio",
            "Delphi Ventures",
            Some(Interaction::LoadMore),
        ),
        dy("https://www.fomo.ventures/portfolio", "FOMO Ventures"),
        dy("https://panteracapital.com/portfolio/", "Pantera Capital"),
        dy("https://jobs.polychain.capital/companies", "Polychain Capital"),
        dy("https://www.paradigm.xyz/portfolio", "Paradigm"),
        dy("https://www.sequoiacap.com/our-companies/", "Sequoia Capital"),
        dy("https://www.moonrockcapital.io/portfolio", "Moonrock Capital"),
        Source::dynamic_page(
            "https://6thman.ventures/#portfolio",
            "6th Man Ventures",
            Some(Interaction::InfiniteScroll),
        ),
        Source::dynamic_page(
            "https://www.bankless.ventures/#Portfolio",
            "Bankless Ventures",
            Some(Interaction::InfiniteScroll),
        ),
        dy("https://a16zcrypto.com/portfolio/", "a16z crypto"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::RenderMode;
    use std::{env, fs};

    #[test]
    fn seed_has_fourteen_static_and_twelve_dynamic() {
        let s = default_sources();
        assert_eq!(s.len(), 26);
        assert_eq!(s.iter().filter(|s| s.mode == RenderMode::Static).count(), 14);
        assert!(WatchConfig::default().validate().is_ok());
        let with_recipe: Vec<_> = s.iter().filter(|s| s.interaction.is_some()).collect();
        assert_eq!(with_recipe.len(), 4);
    }

    #[test]
    fn toml_fills_missing_fields_with_defaults() {
        let cfg: WatchConfig = toml::from_str(
            r#"
            interval_secs = 600

            [[sources]]
            url = "https://example.vc/portfolio"
            mode = "dynamic"
            interaction = "infinite-scroll"

            [[overrides]]
            domain = "example.vc"
            exclude = ["fund"]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.interval(), Duration::from_secs(600));
        assert_eq!(cfg.initial_delay_secs, 30);
        assert_eq!(cfg.sources.len(), 1);
        assert_eq!(cfg.sources[0].interaction, Some(Interaction::InfiniteScroll));
        assert_eq!(cfg.overrides[0].source, "example.vc");
        assert_eq!(cfg.data_file, PathBuf::from(DEFAULT_DATA_FILE));
    }

    #[test]
    fn rejects_duplicate_and_invalid_urls() {
        let dup = WatchConfig {
            sources: vec![
                Source::static_page("https://a.vc/", "A"),
                Source::static_page("https://a.vc/", "A again"),
            ],
            ..WatchConfig::default()
        };
        assert!(dup.validate().is_err());

        let bad = WatchConfig {
            sources: vec![Source::static_page("not a url", "X")],
            ..WatchConfig::default()
        };
        assert!(bad.validate().is_err());
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        env::remove_var(ENV_CONFIG_PATH);

        // No files → built-in seed
        assert_eq!(load_default().unwrap().sources.len(), 26);

        fs::create_dir_all("config").unwrap();
        fs::write(
            "config/sources.json",
            r#"{"sources":[{"url":"https://json.vc/","label":"Json"}]}"#,
        )
        .unwrap();
        assert_eq!(load_default().unwrap().sources[0].url, "https://json.vc/");

        fs::write(
            "config/sources.toml",
            "[[sources]]\nurl = \"https://toml.vc/\"\n",
        )
        .unwrap();
        assert_eq!(load_default().unwrap().sources[0].url, "https://toml.vc/");

        // Env wins
        let p = tmp.path().join("custom.toml");
        fs::write(&p, "inter_source_delay_ms = 0\n[[sources]]\nurl = \"https://env.vc/\"\n").unwrap();
        env::set_var(ENV_CONFIG_PATH, p.display().to_string());
        let cfg = load_default().unwrap();
        assert_eq!(cfg.sources[0].url, "https://env.vc/");
        assert_eq!(cfg.inter_source_delay(), Duration::ZERO);

        env::set_var(ENV_CONFIG_PATH, tmp.path().join("missing.toml").display().to_string());
        assert!(load_default().is_err());

        env::remove_var(ENV_CONFIG_PATH);
        env::set_current_dir(&old).unwrap();
    }
}
