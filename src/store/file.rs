// src/store/file.rs
//! Plain-text snapshot file, the fallback of last resort.
//!
//! Format (UTF-8), one block per source, names sorted:
//! ```text
//! https://www.haun.co/portfolio
//! Farcaster
//! Uniswap
//!
//! https://multicoin.capital/portfolio/
//! ...
//! ```

use anyhow::{Context, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::Snapshot;

pub const DEFAULT_DATA_FILE: &str = "vc_portfolio_data.txt";

#[derive(Debug, Clone)]
pub struct FileSnapshot {
    path: PathBuf,
}

impl FileSnapshot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file reads as an empty snapshot.
    pub async fn load(&self) -> Result<Snapshot> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => Ok(parse(&content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Snapshot::new()),
            Err(e) => {
                Err(e).with_context(|| format!("reading snapshot file {}", self.path.display()))
            }
        }
    }

    /// Writes via a sibling temp file so a crash never leaves half a snapshot.
    pub async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, render(snapshot))
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}

fn is_url_line(line: &str) -> bool {
    line.starts_with("http://") || line.starts_with("https://")
}

pub fn parse(content: &str) -> Snapshot {
    let mut out = Snapshot::new();
    let mut current: Option<String> = None;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if is_url_line(line) {
            out.insert(line.to_string(), Default::default());
            current = Some(line.to_string());
        } else if let Some(url) = &current {
            out.entry(url.clone()).or_default().insert(line.to_string());
        }
    }
    out
}

pub fn render(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    for (url, names) in snapshot {
        out.push_str(url);
        out.push('\n');
        for name in names {
            out.push_str(name);
            out.push('\n');
        }
        out.push('\n');
    }
    out
}
