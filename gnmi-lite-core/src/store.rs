//! Owner of the authoritative configuration
//!
//! Readers take a snapshot (`Arc` clone) and never see partial writes.
//! Writers go through a [`WriteTransaction`], which holds the single writer
//! section for its whole lifetime and installs a new root on commit.

use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, RwLock};

use crate::model::ConfigRoot;

pub struct ConfigStore {
    root: RwLock<Arc<ConfigRoot>>,
    writer: Mutex<()>,
}

impl ConfigStore {
    pub fn new(initial: ConfigRoot) -> Self {
        Self {
            root: RwLock::new(Arc::new(initial)),
            writer: Mutex::new(()),
        }
    }

    /// Current authoritative root.
    pub async fn snapshot(&self) -> Arc<ConfigRoot> {
        self.root.read().await.clone()
    }

    /// Enter the writer section. Waits for any running transaction.
    pub async fn transaction(&self) -> WriteTransaction<'_> {
        let guard = self.writer.lock().await;
        let base = self.snapshot().await;
        WriteTransaction {
            store: self,
            _guard: guard,
            base,
        }
    }
}

/// Exclusive write access, released on drop. Dropping without
/// [`commit`](Self::commit) leaves the store untouched.
pub struct WriteTransaction<'a> {
    store: &'a ConfigStore,
    _guard: MutexGuard<'a, ()>,
    base: Arc<ConfigRoot>,
}

impl WriteTransaction<'_> {
    /// Root the transaction started from.
    pub fn base(&self) -> &Arc<ConfigRoot> {
        &self.base
    }

    /// Install `root` as authoritative. The writer section stays held until
    /// the transaction is dropped.
    pub async fn commit(&mut self, root: ConfigRoot) -> Arc<ConfigRoot> {
        let root = Arc::new(root);
        *self.store.root.write().await = root.clone();
        self.base = root.clone();
        root
    }
}
