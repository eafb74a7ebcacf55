//! Feature flags describing what a graph implementation supports.
//!
//! The strategy layer and the graph computer consult [`Features`] before
//! running anything so that unsupported work fails fast with a typed error
//! instead of halfway through execution.

use crate::error::{Result, StructureError};
use serde::{Deserialize, Serialize};

/// Graph-level capabilities
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphFeatures {
    /// `tx()` returns a working transaction
    pub supports_transactions: bool,
    /// The graph can host a BSP computation
    pub supports_computer: bool,
    /// Data survives process restarts
    pub supports_persistence: bool,
}

/// Vertex-level capabilities
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexFeatures {
    pub supports_add_vertices: bool,
    pub supports_user_supplied_ids: bool,
    pub supports_multi_properties: bool,
    pub supports_add_properties: bool,
}

/// Edge-level capabilities
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeFeatures {
    pub supports_add_edges: bool,
    pub supports_user_supplied_ids: bool,
}

/// Everything a graph declares about itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Features {
    pub graph: GraphFeatures,
    pub vertex: VertexFeatures,
    pub edge: EdgeFeatures,
}

impl Features {
    /// Features of a graph that can be read but never mutated.
    pub fn read_only() -> Self {
        Self {
            graph: GraphFeatures {
                supports_transactions: false,
                supports_computer: true,
                supports_persistence: false,
            },
            vertex: VertexFeatures::default(),
            edge: EdgeFeatures::default(),
        }
    }

    /// Fail unless vertices can be added.
    pub fn require_add_vertices(&self) -> Result<()> {
        if self.vertex.supports_add_vertices {
            Ok(())
        } else {
            Err(StructureError::unsupported(
                "add_vertex",
                "graph does not support adding vertices",
            ))
        }
    }

    /// Fail unless edges can be added.
    pub fn require_add_edges(&self) -> Result<()> {
        if self.edge.supports_add_edges {
            Ok(())
        } else {
            Err(StructureError::unsupported(
                "add_edge",
                "graph does not support adding edges",
            ))
        }
    }

    /// Fail unless the graph accepts caller-chosen vertex ids.
    pub fn require_user_supplied_vertex_ids(&self) -> Result<()> {
        if self.vertex.supports_user_supplied_ids {
            Ok(())
        } else {
            Err(StructureError::unsupported(
                "add_vertex",
                "graph does not support user supplied vertex ids",
            ))
        }
    }

    /// Fail unless a graph computer can run against this graph.
    pub fn require_computer(&self) -> Result<()> {
        if self.graph.supports_computer {
            Ok(())
        } else {
            Err(StructureError::unsupported(
                "compute",
                "graph does not support graph computers",
            ))
        }
    }

    /// Fail unless transactions are available.
    pub fn require_transactions(&self) -> Result<()> {
        if self.graph.supports_transactions {
            Ok(())
        } else {
            Err(StructureError::unsupported(
                "tx",
                "graph does not support transactions",
            ))
        }
    }
}
