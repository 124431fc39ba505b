// src/digest.rs
//! Human-readable summary sent once per run.

use serde::Serialize;
use std::fmt::Write as _;

use crate::store::Snapshot;

/// Names listed individually before the "...and N more" marker.
pub const DIGEST_CAP: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewDeal {
    pub name: String,
    /// Human label of the source it appeared on.
    pub label: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotStats {
    pub sources: usize,
    pub names: usize,
}

impl SnapshotStats {
    pub fn of(snapshot: &Snapshot) -> Self {
        Self {
            sources: snapshot.len(),
            names: snapshot.values().map(|n| n.len()).sum(),
        }
    }
}

pub fn compose(new_deals: &[NewDeal], stats: SnapshotStats, failed_labels: &[String]) -> String {
    let mut out = String::new();

    if new_deals.is_empty() {
        out.push_str("📊 No new deals, go source on X!");
    } else {
        let _ = write!(out, "🚀 {} new deals found:", new_deals.len());
        for deal in new_deals.iter().take(DIGEST_CAP) {
            let _ = write!(out, "\n{} ({})", deal.name, deal.label);
        }
        if new_deals.len() > DIGEST_CAP {
            let _ = write!(out, "\n...and {} more", new_deals.len() - DIGEST_CAP);
        }
    }

    let _ = write!(
        out,
        "\n\n📊 {} sources, {} tracked names",
        stats.sources, stats.names
    );

    if !failed_labels.is_empty() {
        let _ = write!(
            out,
            "\n⚠️ {} sources failed: {}",
            failed_labels.len(),
            failed_labels.join(", ")
        );
    }
    out
}
