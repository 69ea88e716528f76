//! Device hook of the mock server
//!
//! There is no device behind the mock; the hook logs what would be pushed
//! and counts calls.

use std::sync::atomic::{AtomicU64, Ordering};

use gnmi_lite_core::{ConfigHook, ConfigRoot, Path};
use tracing::info;

#[derive(Debug, Default)]
pub struct LoggingHook {
    applied: AtomicU64,
    rolled_back: AtomicU64,
    deleted: AtomicU64,
}

impl LoggingHook {
    pub fn new() -> Self {
        Self::default()
    }

    /// (applied, rolled back, deleted)
    pub fn stats(&self) -> (u64, u64, u64) {
        (
            self.applied.load(Ordering::Relaxed),
            self.rolled_back.load(Ordering::Relaxed),
            self.deleted.load(Ordering::Relaxed),
        )
    }
}

impl ConfigHook for LoggingHook {
    fn apply(&self, candidate: &ConfigRoot) -> anyhow::Result<()> {
        self.applied.fetch_add(1, Ordering::Relaxed);
        info!(top_level_fields = candidate.len(), "applying configuration to device");
        Ok(())
    }

    fn rollback(&self, previous: &ConfigRoot) -> anyhow::Result<()> {
        self.rolled_back.fetch_add(1, Ordering::Relaxed);
        info!(top_level_fields = previous.len(), "restoring previous configuration");
        Ok(())
    }

    fn deleted(&self, _current: &ConfigRoot, path: &Path) -> anyhow::Result<()> {
        self.deleted.fetch_add(1, Ordering::Relaxed);
        info!(path = %path, "removing configuration from device");
        Ok(())
    }
}
