//! Transaction contract.
//!
//! Steps that mutate a graph consult [`Transaction::read_write`] before
//! writing. Graphs without transaction support hand out [`NoTransaction`],
//! which rejects every explicit call with an unsupported-operation error.

use crate::error::{Result, StructureError};

/// Transaction handle for a graph.
pub trait Transaction: Send + Sync {
    /// Open a new transaction. Fails if one is already open.
    fn open(&self) -> Result<()>;

    /// Commit the open transaction.
    fn commit(&self) -> Result<()>;

    /// Roll back the open transaction.
    fn rollback(&self) -> Result<()>;

    /// Whether a transaction is currently open.
    fn is_open(&self) -> bool;

    /// Close the transaction, rolling back uncommitted work.
    fn close(&self) -> Result<()> {
        if self.is_open() {
            self.rollback()
        } else {
            Ok(())
        }
    }

    /// Make sure a transaction is open before a read/write operation.
    fn read_write(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            self.open()
        }
    }
}

/// Transaction handle for graphs that do not support transactions.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTransaction;

impl NoTransaction {
    fn unsupported(operation: &str) -> StructureError {
        StructureError::unsupported(operation, "graph does not support transactions")
    }
}

impl Transaction for NoTransaction {
    fn open(&self) -> Result<()> {
        Err(Self::unsupported("tx.open"))
    }

    fn commit(&self) -> Result<()> {
        Err(Self::unsupported("tx.commit"))
    }

    fn rollback(&self) -> Result<()> {
        Err(Self::unsupported("tx.rollback"))
    }

    fn is_open(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_transaction_rejects_everything() {
        let tx = NoTransaction;
        assert!(!tx.is_open());
        assert!(tx.open().unwrap_err().is_unsupported());
        assert!(tx.commit().is_err());
        assert!(tx.rollback().is_err());
        assert!(tx.read_write().is_err());
        // closing a transaction that was never opened is a no-op
        assert!(tx.close().is_ok());
    }
}
