//! Error types for graph structure operations
//!
//! Every failure that crosses the graph capability contract is a
//! [`StructureError`]. Unsupported operations are reported as typed errors
//! rather than being swallowed, so callers can distinguish "this graph cannot
//! do that" from "that element does not exist".

use crate::value::{EdgeId, VertexId};
use thiserror::Error;

/// Convenience result type using [`StructureError`]
pub type Result<T> = std::result::Result<T, StructureError>;

/// Errors raised by graphs, elements and the serialization boundary
#[derive(Error, Debug)]
pub enum StructureError {
    /// The graph (or element) does not support the requested operation
    ///
    /// Raised for mutations on read-only graphs, detached elements, or when a
    /// feature such as user-supplied ids is disabled.
    #[error("Unsupported operation '{operation}': {reason}")]
    Unsupported {
        /// Operation that was attempted
        operation: String,
        /// Why the operation is not available
        reason: String,
    },

    /// Vertex lookup failed
    #[error("Vertex {0} does not exist")]
    VertexNotFound(VertexId),

    /// Edge lookup failed
    #[error("Edge {0} does not exist")]
    EdgeNotFound(EdgeId),

    /// A user-supplied vertex id collided with an existing vertex
    #[error("Vertex with id {0} already exists")]
    DuplicateVertexId(VertexId),

    /// Transaction state error (double open, commit without open, ...)
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// I/O failure while reading or writing elements
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StructureError {
    /// Create an [`StructureError::Unsupported`] error
    pub fn unsupported(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for [`StructureError::Unsupported`]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_display() {
        let err = StructureError::unsupported("add_vertex", "graph is read-only");
        assert!(err.is_unsupported());
        assert_eq!(
            err.to_string(),
            "Unsupported operation 'add_vertex': graph is read-only"
        );
    }

    #[test]
    fn test_not_found_display() {
        let err = StructureError::VertexNotFound(VertexId::new(4));
        assert_eq!(err.to_string(), "Vertex v[4] does not exist");
        assert!(!err.is_unsupported());
    }
}
