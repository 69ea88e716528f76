//! Device callbacks run by the write path
//!
//! A hook pushes a committed configuration to the managed device. `apply`
//! receives the candidate root; if it fails, `rollback` receives the root
//! that was authoritative before the request.

use crate::model::ConfigRoot;
use crate::types::Path;

pub trait ConfigHook: Send + Sync {
    fn apply(&self, candidate: &ConfigRoot) -> anyhow::Result<()>;

    fn rollback(&self, previous: &ConfigRoot) -> anyhow::Result<()>;

    /// Called once per delete that removed data, before commit.
    fn deleted(&self, _current: &ConfigRoot, _path: &Path) -> anyhow::Result<()> {
        Ok(())
    }
}
