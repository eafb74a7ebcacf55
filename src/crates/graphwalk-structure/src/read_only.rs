//! Read-only view over another graph.
//!
//! The graph computer hands vertex programs a [`ReadOnlyGraph`] so that
//! mutation during a computation fails immediately instead of racing with
//! concurrent readers.

use crate::detached::{DetachedEdge, DetachedVertex};
use crate::error::{Result, StructureError};
use crate::features::Features;
use crate::graph::Graph;
use crate::transaction::{NoTransaction, Transaction};
use crate::value::{Direction, EdgeId, Properties, Value, VertexId};
use std::sync::Arc;

/// Wraps a graph and rejects every mutation with `Unsupported`.
#[derive(Debug, Clone)]
pub struct ReadOnlyGraph {
    inner: Arc<dyn Graph>,
    tx: NoTransaction,
}

impl ReadOnlyGraph {
    pub fn new(inner: Arc<dyn Graph>) -> Self {
        Self {
            inner,
            tx: NoTransaction,
        }
    }

    /// The wrapped graph.
    pub fn inner(&self) -> &Arc<dyn Graph> {
        &self.inner
    }

    fn rejected(operation: &str) -> StructureError {
        tracing::warn!(operation, "Rejected mutation on read-only graph");
        StructureError::unsupported(operation, "graph is read-only")
    }
}

impl Graph for ReadOnlyGraph {
    fn features(&self) -> Features {
        let mut features = Features::read_only();
        features.graph.supports_computer = self.inner.features().graph.supports_computer;
        features
    }

    fn tx(&self) -> &dyn Transaction {
        &self.tx
    }

    fn add_vertex(&self, _id: Option<VertexId>, _label: &str, _properties: Properties) -> Result<VertexId> {
        Err(Self::rejected("add_vertex"))
    }

    fn add_edge(
        &self,
        _out_vertex: VertexId,
        _label: &str,
        _in_vertex: VertexId,
        _properties: Properties,
    ) -> Result<EdgeId> {
        Err(Self::rejected("add_edge"))
    }

    fn set_vertex_property(&self, _id: VertexId, _key: &str, _value: Value) -> Result<()> {
        Err(Self::rejected("set_vertex_property"))
    }

    fn vertex_ids(&self) -> Vec<VertexId> {
        self.inner.vertex_ids()
    }

    fn edge_ids(&self) -> Vec<EdgeId> {
        self.inner.edge_ids()
    }

    fn contains_vertex(&self, id: VertexId) -> bool {
        self.inner.contains_vertex(id)
    }

    fn vertex(&self, id: VertexId) -> Result<DetachedVertex> {
        self.inner.vertex(id)
    }

    fn edge(&self, id: EdgeId) -> Result<DetachedEdge> {
        self.inner.edge(id)
    }

    fn vertex_label(&self, id: VertexId) -> Result<String> {
        self.inner.vertex_label(id)
    }

    fn edge_label(&self, id: EdgeId) -> Result<String> {
        self.inner.edge_label(id)
    }

    fn vertex_property(&self, id: VertexId, key: &str) -> Result<Option<Value>> {
        self.inner.vertex_property(id, key)
    }

    fn edge_property(&self, id: EdgeId, key: &str) -> Result<Option<Value>> {
        self.inner.edge_property(id, key)
    }

    fn edge_vertices(&self, id: EdgeId) -> Result<(VertexId, VertexId)> {
        self.inner.edge_vertices(id)
    }

    fn incident_edges(&self, id: VertexId, direction: Direction, labels: &[String]) -> Result<Vec<EdgeId>> {
        self.inner.incident_edges(id, direction, labels)
    }

    fn adjacent_vertices(&self, id: VertexId, direction: Direction, labels: &[String]) -> Result<Vec<VertexId>> {
        self.inner.adjacent_vertices(id, direction, labels)
    }

    fn indexed_keys(&self) -> Vec<String> {
        self.inner.indexed_keys()
    }

    fn lookup_vertices(&self, key: &str, value: &Value) -> Option<Vec<VertexId>> {
        self.inner.lookup_vertices(key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tinker::{modern, TinkerGraph};

    #[test]
    fn test_reads_pass_through() {
        let graph = ReadOnlyGraph::new(Arc::new(modern().unwrap()));
        assert_eq!(graph.vertex_ids().len(), 6);
        assert_eq!(
            graph.vertex_property(VertexId::new(1), "name").unwrap(),
            Some(Value::from("marko"))
        );
        assert!(graph.features().require_computer().is_ok());
    }

    #[test]
    fn test_mutations_are_unsupported() {
        let inner: Arc<dyn Graph> = Arc::new(TinkerGraph::new());
        let graph = ReadOnlyGraph::new(inner.clone());
        let err = graph
            .add_vertex(None, "person", Properties::new())
            .unwrap_err();
        assert!(err.is_unsupported());
        assert!(graph.tx().open().unwrap_err().is_unsupported());
        assert!(inner.vertex_ids().is_empty());
    }
}
