use super::memory::MemorySnapshot;
use graphwalk_structure::{Graph, VertexId};
use std::collections::BTreeMap;
use std::sync::Arc;

/// The graph a computation ran on, plus the state it left on each vertex.
#[derive(Debug, Clone)]
pub struct ComputedGraph<S> {
    graph: Arc<dyn Graph>,
    states: BTreeMap<VertexId, S>,
}

impl<S> ComputedGraph<S> {
    pub(crate) fn new(graph: Arc<dyn Graph>, states: BTreeMap<VertexId, S>) -> Self {
        Self { graph, states }
    }

    pub fn graph(&self) -> &Arc<dyn Graph> {
        &self.graph
    }

    /// Computed state of a vertex.
    pub fn state(&self, vertex: VertexId) -> Option<&S> {
        self.states.get(&vertex)
    }

    /// Every vertex state, by ascending vertex id.
    pub fn states(&self) -> &BTreeMap<VertexId, S> {
        &self.states
    }

    pub fn into_states(self) -> BTreeMap<VertexId, S> {
        self.states
    }
}

/// Final memory and computed graph of a finished computation.
#[derive(Debug, Clone)]
pub struct ComputerResult<S> {
    pub memory: MemorySnapshot,
    pub graph: ComputedGraph<S>,
}
