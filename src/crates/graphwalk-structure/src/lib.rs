//! # graphwalk-structure
//!
//! The structure side of graphwalk: the [`Graph`] capability contract that
//! traversals and graph computers run against, the [`Value`] model, feature
//! flags, transactions, detached elements and their reader/writer boundary,
//! and [`TinkerGraph`], an in-memory reference implementation.
//!
//! ```rust
//! use graphwalk_structure::{tinker, Direction, Graph, VertexId};
//!
//! let graph = tinker::modern().unwrap();
//! let friends = graph
//!     .adjacent_vertices(VertexId::new(1), Direction::Out, &["knows".to_string()])
//!     .unwrap();
//! assert_eq!(friends, vec![VertexId::new(2), VertexId::new(4)]);
//! ```

pub mod detached;
pub mod error;
pub mod features;
pub mod graph;
pub mod io;
pub mod read_only;
pub mod tinker;
pub mod transaction;
pub mod value;

pub use detached::{DetachedEdge, DetachedVertex};
pub use error::{Result, StructureError};
pub use features::{EdgeFeatures, Features, GraphFeatures, VertexFeatures};
pub use graph::Graph;
pub use io::{DetachedElement, GraphReader, GraphWriter, JsonLinesReader, JsonLinesWriter};
pub use read_only::ReadOnlyGraph;
pub use tinker::TinkerGraph;
pub use transaction::{NoTransaction, Transaction};
pub use value::{Direction, EdgeId, Properties, Value, VertexId};
