//! The graph capability contract.
//!
//! A [`Graph`] is anything the traversal engine can read from (and, when its
//! [`Features`] allow it, write to). Lookups hand out ids and detached
//! snapshots rather than live references, so the engine never holds a lock
//! on the underlying store across a pull.

use crate::detached::{DetachedEdge, DetachedVertex};
use crate::error::Result;
use crate::features::Features;
use crate::transaction::Transaction;
use crate::value::{Direction, EdgeId, Properties, Value, VertexId};
use std::fmt;

/// Read/write access to a property graph.
pub trait Graph: Send + Sync + fmt::Debug {
    /// Capabilities of this graph.
    fn features(&self) -> Features;

    /// Transaction handle for this graph.
    fn tx(&self) -> &dyn Transaction;

    /// Add a vertex. `id` is only accepted when user-supplied ids are supported.
    fn add_vertex(&self, id: Option<VertexId>, label: &str, properties: Properties)
        -> Result<VertexId>;

    /// Add an edge from `out_vertex` to `in_vertex`.
    fn add_edge(
        &self,
        out_vertex: VertexId,
        label: &str,
        in_vertex: VertexId,
        properties: Properties,
    ) -> Result<EdgeId>;

    /// Set (replace) a single vertex property.
    fn set_vertex_property(&self, id: VertexId, key: &str, value: Value) -> Result<()>;

    /// All vertex ids in ascending order.
    fn vertex_ids(&self) -> Vec<VertexId>;

    /// All edge ids in ascending order.
    fn edge_ids(&self) -> Vec<EdgeId>;

    /// Whether a vertex with this id exists.
    fn contains_vertex(&self, id: VertexId) -> bool;

    /// Snapshot of a vertex.
    fn vertex(&self, id: VertexId) -> Result<DetachedVertex>;

    /// Snapshot of an edge.
    fn edge(&self, id: EdgeId) -> Result<DetachedEdge>;

    fn vertex_label(&self, id: VertexId) -> Result<String>;

    fn edge_label(&self, id: EdgeId) -> Result<String>;

    fn vertex_property(&self, id: VertexId, key: &str) -> Result<Option<Value>>;

    fn edge_property(&self, id: EdgeId, key: &str) -> Result<Option<Value>>;

    /// `(out_vertex, in_vertex)` of an edge.
    fn edge_vertices(&self, id: EdgeId) -> Result<(VertexId, VertexId)>;

    /// Edges incident to a vertex, optionally restricted to some labels.
    ///
    /// An empty `labels` slice matches every label.
    fn incident_edges(&self, id: VertexId, direction: Direction, labels: &[String])
        -> Result<Vec<EdgeId>>;

    /// Vertices adjacent to a vertex, one entry per traversed edge.
    fn adjacent_vertices(
        &self,
        id: VertexId,
        direction: Direction,
        labels: &[String],
    ) -> Result<Vec<VertexId>> {
        let mut adjacent = Vec::new();
        if matches!(direction, Direction::Out | Direction::Both) {
            for edge in self.incident_edges(id, Direction::Out, labels)? {
                adjacent.push(self.edge_vertices(edge)?.1);
            }
        }
        if matches!(direction, Direction::In | Direction::Both) {
            for edge in self.incident_edges(id, Direction::In, labels)? {
                adjacent.push(self.edge_vertices(edge)?.0);
            }
        }
        Ok(adjacent)
    }

    /// Property keys that have a vertex index.
    fn indexed_keys(&self) -> Vec<String> {
        Vec::new()
    }

    /// Index lookup. Returns `None` when `key` is not indexed.
    fn lookup_vertices(&self, _key: &str, _value: &Value) -> Option<Vec<VertexId>> {
        None
    }
}
