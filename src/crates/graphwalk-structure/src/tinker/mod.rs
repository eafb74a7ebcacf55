//! In-memory reference graph.
//!
//! [`TinkerGraph`] keeps vertices, edges and adjacency lists behind a single
//! `parking_lot::RwLock`. It supports user-supplied vertex ids, optional
//! exact-match vertex property indices and, when built with
//! [`TinkerGraph::with_transactions`], snapshot transactions.

mod factory;
mod transaction;

pub use factory::modern;
pub use transaction::TinkerTransaction;

use crate::detached::{DetachedEdge, DetachedVertex};
use crate::error::{Result, StructureError};
use crate::features::{EdgeFeatures, Features, GraphFeatures, VertexFeatures};
use crate::graph::Graph;
use crate::transaction::{NoTransaction, Transaction};
use crate::value::{Direction, EdgeId, Properties, Value, VertexId};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

#[derive(Debug, Clone)]
struct VertexRecord {
    label: String,
    properties: Properties,
    out_edges: Vec<EdgeId>,
    in_edges: Vec<EdgeId>,
}

#[derive(Debug, Clone)]
struct EdgeRecord {
    label: String,
    out_vertex: VertexId,
    in_vertex: VertexId,
    properties: Properties,
}

type PropertyIndex = HashMap<Value, BTreeSet<VertexId>>;

#[derive(Debug, Clone, Default)]
pub(crate) struct Store {
    vertices: BTreeMap<VertexId, VertexRecord>,
    edges: BTreeMap<EdgeId, EdgeRecord>,
    next_id: u64,
    indices: HashMap<String, PropertyIndex>,
}

impl Store {
    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn vertex(&self, id: VertexId) -> Result<&VertexRecord> {
        self.vertices
            .get(&id)
            .ok_or(StructureError::VertexNotFound(id))
    }

    fn edge(&self, id: EdgeId) -> Result<&EdgeRecord> {
        self.edges.get(&id).ok_or(StructureError::EdgeNotFound(id))
    }

    fn index_insert(&mut self, id: VertexId, key: &str, value: &Value) {
        if let Some(index) = self.indices.get_mut(key) {
            index.entry(value.clone()).or_default().insert(id);
        }
    }

    fn index_remove(&mut self, id: VertexId, key: &str, value: &Value) {
        if let Some(index) = self.indices.get_mut(key) {
            if let Some(ids) = index.get_mut(value) {
                ids.remove(&id);
                if ids.is_empty() {
                    index.remove(value);
                }
            }
        }
    }
}

/// An in-memory property graph.
#[derive(Debug)]
pub struct TinkerGraph {
    store: Arc<RwLock<Store>>,
    tx: TxMode,
}

#[derive(Debug)]
enum TxMode {
    Disabled(NoTransaction),
    Snapshot(TinkerTransaction),
}

impl Default for TinkerGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl TinkerGraph {
    /// Create an empty graph without transaction support.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(Store::default())),
            tx: TxMode::Disabled(NoTransaction),
        }
    }

    /// Create an empty graph whose `tx()` supports snapshot transactions.
    pub fn with_transactions() -> Self {
        let store = Arc::new(RwLock::new(Store::default()));
        Self {
            tx: TxMode::Snapshot(TinkerTransaction::new(store.clone())),
            store,
        }
    }

    /// Create (or rebuild) an exact-match index on a vertex property key.
    pub fn create_index(&self, key: &str) {
        let mut store = self.store.write();
        let mut index = PropertyIndex::new();
        for (id, vertex) in &store.vertices {
            if let Some(value) = vertex.properties.get(key) {
                index.entry(value.clone()).or_default().insert(*id);
            }
        }
        tracing::debug!(key, entries = index.len(), "Created vertex property index");
        store.indices.insert(key.to_string(), index);
    }

    /// Drop the index on `key`, if any.
    pub fn drop_index(&self, key: &str) {
        self.store.write().indices.remove(key);
    }

    pub fn vertex_count(&self) -> usize {
        self.store.read().vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.store.read().edges.len()
    }
}

impl Graph for TinkerGraph {
    fn features(&self) -> Features {
        Features {
            graph: GraphFeatures {
                supports_transactions: matches!(self.tx, TxMode::Snapshot(_)),
                supports_computer: true,
                supports_persistence: false,
            },
            vertex: VertexFeatures {
                supports_add_vertices: true,
                supports_user_supplied_ids: true,
                supports_multi_properties: false,
                supports_add_properties: true,
            },
            edge: EdgeFeatures {
                supports_add_edges: true,
                supports_user_supplied_ids: false,
            },
        }
    }

    fn tx(&self) -> &dyn Transaction {
        match &self.tx {
            TxMode::Disabled(tx) => tx,
            TxMode::Snapshot(tx) => tx,
        }
    }

    fn add_vertex(
        &self,
        id: Option<VertexId>,
        label: &str,
        properties: Properties,
    ) -> Result<VertexId> {
        let mut store = self.store.write();
        let id = match id {
            Some(id) => {
                if store.vertices.contains_key(&id) {
                    return Err(StructureError::DuplicateVertexId(id));
                }
                store.next_id = store.next_id.max(id.as_u64() + 1);
                id
            }
            None => VertexId::new(store.allocate_id()),
        };
        for (key, value) in &properties {
            store.index_insert(id, key, value);
        }
        store.vertices.insert(
            id,
            VertexRecord {
                label: label.to_string(),
                properties,
                out_edges: Vec::new(),
                in_edges: Vec::new(),
            },
        );
        Ok(id)
    }

    fn add_edge(
        &self,
        out_vertex: VertexId,
        label: &str,
        in_vertex: VertexId,
        properties: Properties,
    ) -> Result<EdgeId> {
        let mut store = self.store.write();
        store.vertex(out_vertex)?;
        store.vertex(in_vertex)?;
        let id = EdgeId::new(store.allocate_id());
        store.edges.insert(
            id,
            EdgeRecord {
                label: label.to_string(),
                out_vertex,
                in_vertex,
                properties,
            },
        );
        if let Some(out) = store.vertices.get_mut(&out_vertex) {
            out.out_edges.push(id);
        }
        if let Some(inv) = store.vertices.get_mut(&in_vertex) {
            inv.in_edges.push(id);
        }
        Ok(id)
    }

    fn set_vertex_property(&self, id: VertexId, key: &str, value: Value) -> Result<()> {
        let mut store = self.store.write();
        let previous = {
            let vertex = store
                .vertices
                .get_mut(&id)
                .ok_or(StructureError::VertexNotFound(id))?;
            vertex.properties.insert(key.to_string(), value.clone())
        };
        if let Some(previous) = previous {
            store.index_remove(id, key, &previous);
        }
        store.index_insert(id, key, &value);
        Ok(())
    }

    fn vertex_ids(&self) -> Vec<VertexId> {
        self.store.read().vertices.keys().copied().collect()
    }

    fn edge_ids(&self) -> Vec<EdgeId> {
        self.store.read().edges.keys().copied().collect()
    }

    fn contains_vertex(&self, id: VertexId) -> bool {
        self.store.read().vertices.contains_key(&id)
    }

    fn vertex(&self, id: VertexId) -> Result<DetachedVertex> {
        let store = self.store.read();
        let vertex = store.vertex(id)?;
        Ok(DetachedVertex::new(
            id,
            vertex.label.clone(),
            vertex.properties.clone(),
        ))
    }

    fn edge(&self, id: EdgeId) -> Result<DetachedEdge> {
        let store = self.store.read();
        let edge = store.edge(id)?;
        Ok(DetachedEdge::new(
            id,
            edge.label.clone(),
            edge.out_vertex,
            edge.in_vertex,
            edge.properties.clone(),
        ))
    }

    fn vertex_label(&self, id: VertexId) -> Result<String> {
        Ok(self.store.read().vertex(id)?.label.clone())
    }

    fn edge_label(&self, id: EdgeId) -> Result<String> {
        Ok(self.store.read().edge(id)?.label.clone())
    }

    fn vertex_property(&self, id: VertexId, key: &str) -> Result<Option<Value>> {
        Ok(self.store.read().vertex(id)?.properties.get(key).cloned())
    }

    fn edge_property(&self, id: EdgeId, key: &str) -> Result<Option<Value>> {
        Ok(self.store.read().edge(id)?.properties.get(key).cloned())
    }

    fn edge_vertices(&self, id: EdgeId) -> Result<(VertexId, VertexId)> {
        let store = self.store.read();
        let edge = store.edge(id)?;
        Ok((edge.out_vertex, edge.in_vertex))
    }

    fn incident_edges(
        &self,
        id: VertexId,
        direction: Direction,
        labels: &[String],
    ) -> Result<Vec<EdgeId>> {
        let store = self.store.read();
        let vertex = store.vertex(id)?;
        let candidates: Box<dyn Iterator<Item = &EdgeId>> = match direction {
            Direction::Out => Box::new(vertex.out_edges.iter()),
            Direction::In => Box::new(vertex.in_edges.iter()),
            Direction::Both => Box::new(vertex.out_edges.iter().chain(vertex.in_edges.iter())),
        };
        let mut edges = Vec::new();
        for edge_id in candidates {
            let edge = store.edge(*edge_id)?;
            if labels.is_empty() || labels.iter().any(|l| *l == edge.label) {
                edges.push(*edge_id);
            }
        }
        Ok(edges)
    }

    fn indexed_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.store.read().indices.keys().cloned().collect();
        keys.sort();
        keys
    }

    fn lookup_vertices(&self, key: &str, value: &Value) -> Option<Vec<VertexId>> {
        let store = self.store.read();
        let index = store.indices.get(key)?;
        Some(
            index
                .get(value)
                .map(|ids| ids.iter().copied().collect())
                .unwrap_or_default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(pairs: &[(&str, Value)]) -> Properties {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_ids_are_shared_between_vertices_and_edges() {
        let graph = TinkerGraph::new();
        let a = graph.add_vertex(None, "person", Properties::new()).unwrap();
        let b = graph.add_vertex(None, "person", Properties::new()).unwrap();
        let e = graph.add_edge(a, "knows", b, Properties::new()).unwrap();
        assert_eq!(a.as_u64(), 0);
        assert_eq!(b.as_u64(), 1);
        assert_eq!(e.as_u64(), 2);
    }

    #[test]
    fn test_user_supplied_ids_bump_counter() {
        let graph = TinkerGraph::new();
        graph
            .add_vertex(Some(VertexId::new(10)), "person", Properties::new())
            .unwrap();
        let next = graph.add_vertex(None, "person", Properties::new()).unwrap();
        assert_eq!(next.as_u64(), 11);

        let err = graph
            .add_vertex(Some(VertexId::new(10)), "person", Properties::new())
            .unwrap_err();
        assert!(matches!(err, StructureError::DuplicateVertexId(_)));
    }

    #[test]
    fn test_adjacency_respects_direction_and_labels() {
        let graph = TinkerGraph::new();
        let a = graph.add_vertex(None, "v", Properties::new()).unwrap();
        let b = graph.add_vertex(None, "v", Properties::new()).unwrap();
        let c = graph.add_vertex(None, "v", Properties::new()).unwrap();
        graph.add_edge(a, "knows", b, Properties::new()).unwrap();
        graph.add_edge(a, "likes", c, Properties::new()).unwrap();

        assert_eq!(graph.adjacent_vertices(a, Direction::Out, &[]).unwrap(), vec![b, c]);
        assert_eq!(
            graph
                .adjacent_vertices(a, Direction::Out, &["likes".to_string()])
                .unwrap(),
            vec![c]
        );
        assert_eq!(graph.adjacent_vertices(b, Direction::In, &[]).unwrap(), vec![a]);
        assert!(graph.adjacent_vertices(b, Direction::Out, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_edge_to_missing_vertex_fails() {
        let graph = TinkerGraph::new();
        let a = graph.add_vertex(None, "v", Properties::new()).unwrap();
        let err = graph
            .add_edge(a, "knows", VertexId::new(99), Properties::new())
            .unwrap_err();
        assert!(matches!(err, StructureError::VertexNotFound(_)));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_index_lookup_tracks_updates() {
        let graph = TinkerGraph::new();
        let a = graph
            .add_vertex(None, "person", props(&[("name", Value::from("marko"))]))
            .unwrap();
        assert!(graph.lookup_vertices("name", &Value::from("marko")).is_none());

        graph.create_index("name");
        assert_eq!(
            graph.lookup_vertices("name", &Value::from("marko")),
            Some(vec![a])
        );

        graph
            .set_vertex_property(a, "name", Value::from("marko a."))
            .unwrap();
        assert_eq!(
            graph.lookup_vertices("name", &Value::from("marko")),
            Some(vec![])
        );
        assert_eq!(graph.indexed_keys(), vec!["name".to_string()]);
    }
}
