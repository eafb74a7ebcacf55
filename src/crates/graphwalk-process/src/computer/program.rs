//! The per-vertex program contract.

use super::memory::{Memory, MemorySnapshot};
use super::messenger::{MessageScope, Messenger};
use crate::error::Result;
use graphwalk_structure::{Graph, Value, VertexId};
use std::fmt;

/// Logic run on every active vertex once per superstep.
///
/// A vertex is active in superstep 0 when [`initially_active`] says so, and
/// in superstep N+1 when it received a message in superstep N or asked to
/// stay active with [`VertexContext::keep_active`]. Whether another
/// superstep runs at all is decided globally by [`terminate`].
///
/// [`initially_active`]: VertexProgram::initially_active
/// [`terminate`]: VertexProgram::terminate
pub trait VertexProgram: Send + Sync + 'static {
    /// Message exchanged between vertices
    type Message: Clone + Send + Sync + fmt::Debug + 'static;

    /// Per-vertex state kept across supersteps
    type State: Default + Send + Sync + 'static;

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Seed memory before superstep 0.
    fn setup(&self, graph: &dyn Graph, memory: &mut Memory) -> Result<()>;

    fn initially_active(&self, _vertex: VertexId) -> bool {
        true
    }

    /// Run on one active vertex.
    fn execute(&self, ctx: &mut VertexContext<'_, Self::Message, Self::State>) -> Result<()>;

    /// Called after every barrier; `true` halts the computation.
    fn terminate(&self, memory: &mut Memory) -> Result<bool>;

    /// Combine the messages bound for one vertex at the barrier.
    fn combine(&self, messages: Vec<Self::Message>) -> Vec<Self::Message> {
        messages
    }
}

/// What a vertex execution can see and do.
pub struct VertexContext<'a, M, S> {
    vertex: VertexId,
    superstep: u64,
    graph: &'a dyn Graph,
    memory: &'a MemorySnapshot,
    messenger: Messenger<'a, M>,
    state: &'a mut S,
    memory_writes: Vec<(String, Value)>,
    keep_active: bool,
}

impl<'a, M: Clone, S> VertexContext<'a, M, S> {
    pub(crate) fn new(
        vertex: VertexId,
        superstep: u64,
        graph: &'a dyn Graph,
        memory: &'a MemorySnapshot,
        incoming: &'a [M],
        state: &'a mut S,
    ) -> Self {
        Self {
            vertex,
            superstep,
            graph,
            memory,
            messenger: Messenger::new(vertex, graph, incoming),
            state,
            memory_writes: Vec::new(),
            keep_active: false,
        }
    }

    pub fn vertex(&self) -> VertexId {
        self.vertex
    }

    pub fn superstep(&self) -> u64 {
        self.superstep
    }

    /// Read-only view of the graph.
    pub fn graph(&self) -> &'a dyn Graph {
        self.graph
    }

    /// Memory as of the start of this superstep.
    pub fn memory(&self) -> &MemorySnapshot {
        self.memory
    }

    pub fn state(&self) -> &S {
        &*self.state
    }

    pub fn state_mut(&mut self) -> &mut S {
        &mut *self.state
    }

    pub fn receive_messages(&self) -> &[M] {
        self.messenger.receive_messages()
    }

    pub fn send_message(&mut self, scope: &MessageScope, message: M) -> Result<()> {
        self.messenger.send_message(scope, message)
    }

    pub fn messenger(&mut self) -> &mut Messenger<'a, M> {
        &mut self.messenger
    }

    /// Queue a memory update, applied through the key's reducer at the barrier.
    pub fn add_memory(&mut self, key: impl Into<String>, update: Value) {
        self.memory_writes.push((key.into(), update));
    }

    /// Stay active in the next superstep even without incoming messages.
    pub fn keep_active(&mut self) {
        self.keep_active = true;
    }

    pub(crate) fn finish(self) -> VertexOutcome<M> {
        VertexOutcome {
            vertex: self.vertex,
            outgoing: self.messenger.into_outgoing(),
            memory_writes: self.memory_writes,
            keep_active: self.keep_active,
        }
    }
}

/// Everything a vertex execution hands back to the barrier.
#[derive(Debug)]
pub(crate) struct VertexOutcome<M> {
    pub(crate) vertex: VertexId,
    pub(crate) outgoing: Vec<(VertexId, M)>,
    pub(crate) memory_writes: Vec<(String, Value)>,
    pub(crate) keep_active: bool,
}
