//! Detached elements.
//!
//! A detached element carries only its id, label and properties as they were
//! when it was detached (or constructed). It is not traversable and it is
//! read-only: every mutation fails with [`StructureError::Unsupported`].
//! Detached elements are the only form in which elements cross a
//! serialization boundary; [`DetachedVertex::add_to`] and
//! [`DetachedEdge::add_to`] rehydrate them into any [`Graph`].

use crate::error::{Result, StructureError};
use crate::graph::Graph;
use crate::value::{EdgeId, Properties, Value, VertexId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A vertex disconnected from its graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetachedVertex {
    id: VertexId,
    label: String,
    #[serde(default)]
    properties: Properties,
}

impl DetachedVertex {
    pub fn new(id: VertexId, label: impl Into<String>, properties: Properties) -> Self {
        Self {
            id,
            label: label.into(),
            properties,
        }
    }

    /// Snapshot a live vertex.
    pub fn detach(graph: &dyn Graph, id: VertexId) -> Result<Self> {
        graph.vertex(id)
    }

    pub fn id(&self) -> VertexId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Detached vertices are read-only.
    pub fn set_property(&mut self, key: &str, _value: Value) -> Result<()> {
        Err(StructureError::unsupported(
            format!("property({})", key),
            format!("detached elements are read-only: {}", self),
        ))
    }

    /// Detached vertices do not store edges.
    pub fn add_edge(&self, label: &str, _in_vertex: VertexId) -> Result<EdgeId> {
        Err(StructureError::unsupported(
            format!("add_edge({})", label),
            format!("detached vertices do not store edges: {}", self),
        ))
    }

    /// Re-create this vertex in `graph`.
    ///
    /// The original id is kept when the graph accepts user-supplied ids;
    /// otherwise the graph assigns a new one, which is returned.
    pub fn add_to(&self, graph: &dyn Graph) -> Result<VertexId> {
        graph.features().require_add_vertices()?;
        let id = graph
            .features()
            .vertex
            .supports_user_supplied_ids
            .then_some(self.id);
        graph.add_vertex(id, &self.label, self.properties.clone())
    }
}

impl fmt::Display for DetachedVertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// An edge disconnected from its graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetachedEdge {
    id: EdgeId,
    label: String,
    out_vertex: VertexId,
    in_vertex: VertexId,
    #[serde(default)]
    properties: Properties,
}

impl DetachedEdge {
    pub fn new(
        id: EdgeId,
        label: impl Into<String>,
        out_vertex: VertexId,
        in_vertex: VertexId,
        properties: Properties,
    ) -> Self {
        Self {
            id,
            label: label.into(),
            out_vertex,
            in_vertex,
            properties,
        }
    }

    /// Snapshot a live edge.
    pub fn detach(graph: &dyn Graph, id: EdgeId) -> Result<Self> {
        graph.edge(id)
    }

    pub fn id(&self) -> EdgeId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn out_vertex(&self) -> VertexId {
        self.out_vertex
    }

    pub fn in_vertex(&self) -> VertexId {
        self.in_vertex
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Detached edges are read-only.
    pub fn set_property(&mut self, key: &str, _value: Value) -> Result<()> {
        Err(StructureError::unsupported(
            format!("property({})", key),
            format!("detached elements are read-only: {}", self),
        ))
    }

    /// Re-create this edge in `graph` between the given endpoints.
    ///
    /// Endpoints are passed explicitly because rehydrated vertices may have
    /// received new ids.
    pub fn add_to_between(
        &self,
        graph: &dyn Graph,
        out_vertex: VertexId,
        in_vertex: VertexId,
    ) -> Result<EdgeId> {
        graph.features().require_add_edges()?;
        graph.add_edge(out_vertex, &self.label, in_vertex, self.properties.clone())
    }

    /// Re-create this edge in `graph` using its original endpoint ids.
    pub fn add_to(&self, graph: &dyn Graph) -> Result<EdgeId> {
        self.add_to_between(graph, self.out_vertex, self.in_vertex)
    }
}

impl fmt::Display for DetachedEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}-{}->{}]",
            self.id, self.out_vertex, self.label, self.in_vertex
        )
    }
}
