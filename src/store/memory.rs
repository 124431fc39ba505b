// src/store/memory.rs
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{Snapshot, SnapshotBackend};

/// In-process backend for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    data: Mutex<Snapshot>,
    saves: AtomicUsize,
    fail: bool,
}

impl MemoryBackend {
    /// Every operation errors, like a store that went away mid-run.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn seed(&self, snapshot: Snapshot) {
        *self.data.lock().expect("memory backend mutex poisoned") = snapshot;
    }

    pub fn contents(&self) -> Snapshot {
        self.data.lock().expect("memory backend mutex poisoned").clone()
    }

    /// Number of successful `save_all` calls.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn load_all(&self) -> Result<Snapshot> {
        if self.fail {
            return Err(anyhow!("memory backend configured to fail"));
        }
        Ok(self.contents())
    }

    async fn save_all(&self, snapshot: &Snapshot) -> Result<()> {
        if self.fail {
            return Err(anyhow!("memory backend configured to fail"));
        }
        self.seed(snapshot.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
