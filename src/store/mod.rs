// src/store/mod.rs
//! Snapshot persistence: an optional primary backend plus the text-file fallback.
//!
//! The primary is connected once. If that fails the store runs degraded: every
//! primary operation becomes a no-op returning a sentinel, loads come from the
//! file, and the file is still rewritten after every run.

pub mod file;
pub mod memory;
pub mod postgres;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{info, warn};

pub use file::FileSnapshot;
pub use memory::MemoryBackend;
pub use postgres::PgBackend;

/// Source URL → sorted, unique names known as of its last successful scrape.
pub type Snapshot = BTreeMap<String, BTreeSet<String>>;

#[async_trait]
pub trait SnapshotBackend: Send + Sync {
    fn name(&self) -> &'static str;
    async fn load_all(&self) -> Result<Snapshot>;
    async fn save_all(&self, snapshot: &Snapshot) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadOrigin {
    Primary,
    File,
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryStatus {
    Saved,
    Unavailable,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PersistOutcome {
    pub primary: PrimaryStatus,
    pub file_written: bool,
}

impl PersistOutcome {
    /// State was not carried forward through the primary store.
    pub fn is_degraded(&self) -> bool {
        self.primary != PrimaryStatus::Saved
    }
}

pub struct SnapshotStore {
    primary: Option<Arc<dyn SnapshotBackend>>,
    file: FileSnapshot,
}

impl SnapshotStore {
    pub fn new(primary: Option<Arc<dyn SnapshotBackend>>, file: FileSnapshot) -> Self {
        Self { primary, file }
    }

    pub fn file_only(file: FileSnapshot) -> Self {
        Self::new(None, file)
    }

    /// Connects Postgres when a URL is given. Connection failures are logged and
    /// leave the store file-only.
    pub async fn connect(database_url: Option<&str>, file: FileSnapshot) -> Self {
        let Some(url) = database_url.filter(|u| !u.trim().is_empty()) else {
            warn!(target: "store", "no DATABASE_URL, snapshot persisted to file only");
            return Self::file_only(file);
        };
        match PgBackend::connect(url).await {
            Ok(pg) => {
                info!(target: "store", "postgres snapshot store connected");
                Self::new(Some(Arc::new(pg)), file)
            }
            Err(e) => {
                warn!(target: "store", error = ?e, "postgres unavailable, snapshot persisted to file only");
                Self::file_only(file)
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.primary.is_some()
    }

    pub fn file(&self) -> &FileSnapshot {
        &self.file
    }

    /// `None` when the primary is unavailable, failed or holds nothing yet.
    async fn load_primary(&self) -> Option<Snapshot> {
        let backend = self.primary.as_ref()?;
        match backend.load_all().await {
            Ok(s) if !s.is_empty() => Some(s),
            Ok(_) => None,
            Err(e) => {
                warn!(target: "store", backend = backend.name(), error = ?e, "primary load failed");
                None
            }
        }
    }

    async fn save_primary(&self, snapshot: &Snapshot) -> PrimaryStatus {
        let Some(backend) = self.primary.as_ref() else {
            return PrimaryStatus::Unavailable;
        };
        match backend.save_all(snapshot).await {
            Ok(()) => PrimaryStatus::Saved,
            Err(e) => {
                warn!(target: "store", backend = backend.name(), error = ?e, "primary save failed");
                PrimaryStatus::Failed
            }
        }
    }

    /// Primary first, then the file, else empty. Never fails.
    pub async fn load_all(&self) -> (Snapshot, LoadOrigin) {
        if let Some(s) = self.load_primary().await {
            return (s, LoadOrigin::Primary);
        }
        match self.file.load().await {
            Ok(s) if !s.is_empty() => (s, LoadOrigin::File),
            Ok(_) => (Snapshot::new(), LoadOrigin::Empty),
            Err(e) => {
                warn!(target: "store", error = ?e, "snapshot file unreadable, starting empty");
                (Snapshot::new(), LoadOrigin::Empty)
            }
        }
    }

    /// Primary (when available) then always the file.
    pub async fn save_all(&self, snapshot: &Snapshot) -> PersistOutcome {
        let primary = self.save_primary(snapshot).await;
        let file_written = match self.file.save(snapshot).await {
            Ok(()) => true,
            Err(e) => {
                warn!(target: "store", error = ?e, "snapshot file write failed");
                false
            }
        };
        if primary != PrimaryStatus::Saved {
            warn!(
                target: "store",
                ?primary,
                file_written,
                "snapshot not persisted to primary store; state carried by file only"
            );
        }
        PersistOutcome {
            primary,
            file_written,
        }
    }
}
