//! Snapshot transactions for [`TinkerGraph`](super::TinkerGraph).
//!
//! Opening a transaction copies the store; rollback restores that copy and
//! commit discards it. Writes are visible to readers immediately, so this is
//! rollback support rather than isolation.

use super::Store;
use crate::error::{Result, StructureError};
use crate::transaction::Transaction;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

#[derive(Debug)]
pub struct TinkerTransaction {
    store: Arc<RwLock<Store>>,
    snapshot: Mutex<Option<Store>>,
}

impl TinkerTransaction {
    pub(crate) fn new(store: Arc<RwLock<Store>>) -> Self {
        Self {
            store,
            snapshot: Mutex::new(None),
        }
    }
}

impl Transaction for TinkerTransaction {
    fn open(&self) -> Result<()> {
        let mut snapshot = self.snapshot.lock();
        if snapshot.is_some() {
            return Err(StructureError::Transaction(
                "transaction already open".to_string(),
            ));
        }
        *snapshot = Some(self.store.read().clone());
        tracing::debug!("Opened transaction");
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        self.snapshot
            .lock()
            .take()
            .map(|_| tracing::debug!("Committed transaction"))
            .ok_or_else(|| StructureError::Transaction("no open transaction".to_string()))
    }

    fn rollback(&self) -> Result<()> {
        let previous = self
            .snapshot
            .lock()
            .take()
            .ok_or_else(|| StructureError::Transaction("no open transaction".to_string()))?;
        *self.store.write() = previous;
        tracing::debug!("Rolled back transaction");
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.snapshot.lock().is_some()
    }
}
