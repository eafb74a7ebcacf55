//! # graphwalk-process
//!
//! The process side of graphwalk: traversals built from composable steps,
//! the strategies that rewrite them, and the bulk-synchronous graph computer
//! that can run them (or any other vertex program) superstep by superstep.
//!
//! ## Overview
//!
//! - **Traversals** - ordered step pipelines evaluated lazily by pull
//! - **Traversers** - values in flight, with path, bulk and loop counter
//! - **Strategies** - rewrite passes ordered by explicit constraints
//! - **Side effects** - reducer-backed accumulators shared by a traversal
//! - **Graph computer** - BSP engine for vertex programs, with memory,
//!   scoped messaging and message combiners
//!
//! ## Execution modes
//!
//! ```text
//!                       ┌──────────────────────┐
//!  GraphTraversalSource │ Traversal (steps)    │
//!  ────────────────────▶│ + strategies         │
//!                       └──────────┬───────────┘
//!                 to_list()        │        submit(&computer)
//!            ┌─────────────────────┴──────────────────────┐
//!            ▼                                            ▼
//!   pull: each step asks its                 TraversalVertexProgram:
//!   upstream for the next traverser          prefix as supersteps,
//!                                            suffix pulled over halted
//!                                            traversers
//! ```
//!
//! Both modes produce the same multiset of results for traversals the
//! computer accepts.
//!
//! ## Quick Start
//!
//! ```rust
//! use graphwalk_process::prelude::*;
//! use graphwalk_structure::{tinker, Value};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "multi_thread")]
//! # async fn main() -> graphwalk_process::Result<()> {
//! let graph = Arc::new(tinker::modern()?);
//! let g = GraphTraversalSource::new(graph.clone())?;
//!
//! let oltp = g.v().out(&["created"]).values(&["name"]).dedup().to_list()?;
//! assert_eq!(oltp, vec![Value::from("lop"), Value::from("ripple")]);
//!
//! let computer = TinkerGraphComputer::new(graph).workers(2);
//! let mut olap = g.v().out(&["created"]).values(&["name"]).submit(&computer).await?;
//! olap.sort();
//! assert_eq!(olap.len(), 4);
//! # Ok(())
//! # }
//! ```

pub mod computer;
pub mod config;
pub mod error;
pub mod predicate;
pub mod side_effects;
pub mod step;
pub mod strategy;
pub mod traversal;
pub mod traverser;

pub use computer::{
    ComputedGraph, ComputerResult, GraphComputer, Memory, MemorySnapshot, MessageScope, Messenger,
    TinkerGraphComputer, TraversalVertexProgram, TraverserMessage, VertexContext, VertexProgram,
};
pub use config::{ComputerConfig, EngineConfig, TraversalConfig};
pub use error::{ProcessError, Result};
pub use predicate::P;
pub use side_effects::{
    AndReducer, AppendReducer, MapSumReducer, MaxReducer, MinReducer, OrReducer,
    OverwriteReducer, Reducer, SideEffects, SumReducer,
};
pub use step::{HasContainer, HasKey, Step, StepKind};
pub use strategy::{
    ComputerVerificationStrategy, GraphStepIndexStrategy, IdentityRemovalStrategy,
    PartitionStrategy, PathRequirementStrategy, SideEffectCapStrategy, StrategyCategory,
    TraversalEngine, TraversalStrategies, TraversalStrategy,
};
pub use traversal::{GraphTraversalSource, Traversal, __};
pub use traverser::{Path, Traverser, TraverserSet};

/// Everything needed to build and run traversals.
pub mod prelude {
    pub use crate::computer::programs::{PageRankProgram, ShortestPathProgram};
    pub use crate::computer::{GraphComputer, TinkerGraphComputer, VertexProgram};
    pub use crate::error::{ProcessError, Result};
    pub use crate::predicate::P;
    pub use crate::side_effects::{
        AppendReducer, MapSumReducer, OrReducer, OverwriteReducer, Reducer, SumReducer,
    };
    pub use crate::strategy::{PartitionStrategy, TraversalStrategies, TraversalStrategy};
    pub use crate::traversal::{GraphTraversalSource, Traversal, __};
    pub use crate::traverser::Traverser;
}
