//! Bulk-synchronous graph computation.
//!
//! A [`GraphComputer`] runs a [`VertexProgram`] over every vertex of a
//! graph in supersteps. Within a superstep active vertices run in parallel
//! and in no particular order; they can only see memory as it was when the
//! superstep started and the messages sent to them in the previous one.
//!
//! # Superstep lifecycle
//!
//! ```text
//! setup(memory)                         once
//!   │
//!   ▼
//! ┌─────────────────────────────────┐
//! │ execute(vertex) on every active │   parallel, isolated
//! │ vertex against a memory snapshot│
//! └───────────────┬─────────────────┘
//!                 ▼
//!        barrier: reduce memory writes,
//!        combine and deliver messages,
//!        compute next active set
//!                 │
//!                 ▼
//!        terminate(memory)? ── no ──▶ next superstep
//!                 │ yes
//!                 ▼
//!        ComputerResult { memory, graph }
//! ```
//!
//! A vertex is active in the next superstep when it received a message or
//! asked to stay active. The first failing vertex aborts the whole job; no
//! write or message of the failed superstep is committed.

mod engine;
mod memory;
mod messenger;
pub mod programs;
mod program;
mod result;
mod traversal_program;

pub use engine::TinkerGraphComputer;
pub use memory::{Memory, MemorySnapshot};
pub use messenger::{MessageScope, Messenger};
pub use program::{VertexContext, VertexProgram};
pub use result::{ComputedGraph, ComputerResult};
pub use traversal_program::{TraversalVertexProgram, TraverserMessage};

use crate::error::Result;
use async_trait::async_trait;
use graphwalk_structure::Graph;
use std::sync::Arc;

/// Executes vertex programs against a graph.
#[async_trait]
pub trait GraphComputer: Send + Sync {
    /// The graph computations run on.
    fn graph(&self) -> &Arc<dyn Graph>;

    /// Run `program` to termination.
    ///
    /// Either the computation completes and its final memory and vertex
    /// states are returned, or it fails as a whole.
    async fn submit<P: VertexProgram>(&self, program: P) -> Result<ComputerResult<P::State>>;
}
