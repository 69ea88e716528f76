//! Change Event Emitter
//!
//! Committing writers publish one event per changed path. The channel is
//! unbounded so `emit()` never blocks inside the writer section and no change
//! is dropped while the broadcaster is alive.

use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

use crate::types::Path;

/// A committed change at `path`. Subscribers resolve the current value, so
/// an update and a removal look the same on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: Path,
}

impl ChangeEvent {
    pub fn new(path: Path) -> Self {
        Self { path }
    }
}

/// Receiver end of the change bus (consumed by the broadcaster task).
pub type ChangeReceiver = mpsc::UnboundedReceiver<ChangeEvent>;

/// Change event emitter.
pub struct ChangeEmitter {
    sender: mpsc::UnboundedSender<ChangeEvent>,
    stats: EmitterStats,
}

/// Statistics for monitoring emitter health.
#[derive(Debug, Default)]
pub struct EmitterStats {
    /// Total events emitted
    emitted: AtomicU64,
    /// Events lost because the broadcaster is gone
    dropped: AtomicU64,
}

impl ChangeEmitter {
    pub fn new() -> (Self, ChangeReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let emitter = Self {
            sender,
            stats: EmitterStats::default(),
        };
        (emitter, receiver)
    }

    #[inline]
    pub fn emit(&self, event: ChangeEvent) {
        self.stats.emitted.fetch_add(1, Ordering::Relaxed);

        if self.sender.send(event).is_err() {
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// (emitted, dropped)
    pub fn stats(&self) -> (u64, u64) {
        (
            self.stats.emitted.load(Ordering::Relaxed),
            self.stats.dropped.load(Ordering::Relaxed),
        )
    }
}
