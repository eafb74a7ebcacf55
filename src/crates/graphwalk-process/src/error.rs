//! Error types for traversal execution and graph computation
//!
//! All failures raised while building, rewriting or running a traversal, or
//! while running a vertex program on a graph computer, are reported as
//! [`ProcessError`]. Structure-level failures (missing elements, unsupported
//! graph operations) are wrapped unchanged so callers can still match on
//! them.
//!
//! # Error Hierarchy
//!
//! ```text
//! ProcessError
//! ├── Configuration           - Invalid engine or traversal configuration
//! ├── CyclicStrategies        - Strategy ordering constraints form a cycle
//! ├── UnsupportedFeature      - A step needs a graph feature that is missing
//! ├── Structure               - Error from the graph itself
//! ├── StepExecution           - A step failed while pulling (with step context)
//! ├── VertexExecution         - A vertex program failed (with vertex/superstep)
//! ├── Execution               - Failure raised by user code
//! ├── PathNotTracked          - Path requested without path tracking
//! ├── UnknownPathLabel        - Path lookup by a label that was never set
//! ├── UnregisteredKey         - Side-effect/memory key without a reducer
//! ├── Reducer                 - A reducer rejected an update
//! ├── MaxSuperstepsExceeded   - Computation did not terminate in time
//! ├── Join                    - A worker task panicked or was cancelled
//! └── Yaml                    - Configuration parsing failure
//! ```

use graphwalk_structure::{StructureError, VertexId};
use thiserror::Error;

/// Convenience result type using [`ProcessError`]
pub type Result<T> = std::result::Result<T, ProcessError>;

/// Errors raised by traversals, strategies and graph computers
#[derive(Error, Debug)]
pub enum ProcessError {
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Strategy `apply_pre`/`apply_post` constraints contain a cycle
    ///
    /// Detected when a strategy set is built, before any traversal runs.
    #[error("Strategy ordering constraints form a cycle between: {}", .cycle.join(", "))]
    CyclicStrategies {
        /// Strategy ids that could not be ordered
        cycle: Vec<String>,
    },

    /// A step requires a graph feature the target graph does not provide
    #[error("Step '{step}' requires unsupported feature: {feature}")]
    UnsupportedFeature {
        /// Feature that is missing
        feature: String,
        /// Step that needed it
        step: String,
    },

    /// Error raised by the underlying graph
    #[error(transparent)]
    Structure(#[from] StructureError),

    /// A step failed while producing its next traverser
    #[error("Step '{step}' failed: {source}")]
    StepExecution {
        /// Name of the failing step
        step: String,
        /// Underlying failure
        #[source]
        source: Box<ProcessError>,
    },

    /// A vertex program failed while executing on a vertex
    #[error("Vertex {vertex} failed in superstep {superstep}: {source}")]
    VertexExecution {
        /// Vertex being executed
        vertex: VertexId,
        /// Superstep in which the failure happened
        superstep: u64,
        /// Underlying failure
        #[source]
        source: Box<ProcessError>,
    },

    /// Failure raised from user-supplied code (lambdas, custom programs)
    #[error("Execution failed: {0}")]
    Execution(String),

    /// The traverser's path was requested but path tracking is disabled
    #[error("Path is not tracked by this traversal")]
    PathNotTracked,

    /// No path entry carries the requested label
    #[error("No path entry labeled '{0}'")]
    UnknownPathLabel(String),

    /// A side-effect or memory key was written or read without registration
    #[error("Key '{0}' has not been registered")]
    UnregisteredKey(String),

    /// A reducer could not combine the current value with an update
    #[error("Reducer '{reducer}' failed: {message}")]
    Reducer {
        /// Reducer name
        reducer: String,
        /// Description of the failure
        message: String,
    },

    /// The computation did not terminate within the configured bound
    #[error("Computation exceeded {0} supersteps")]
    MaxSuperstepsExceeded(u64),

    /// A worker task panicked or was cancelled
    #[error("Worker task failed: {0}")]
    Join(String),

    /// YAML configuration could not be parsed
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ProcessError {
    /// Create an execution error from user code
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create an unsupported-feature error
    pub fn unsupported_feature(feature: impl Into<String>, step: impl Into<String>) -> Self {
        Self::UnsupportedFeature {
            feature: feature.into(),
            step: step.into(),
        }
    }

    /// Create a reducer error
    pub fn reducer(reducer: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Reducer {
            reducer: reducer.into(),
            message: message.into(),
        }
    }

    /// Attach step context, unless the error already names a step.
    pub fn in_step(self, step: &str) -> Self {
        match self {
            Self::StepExecution { .. } | Self::CyclicStrategies { .. } => self,
            other => Self::StepExecution {
                step: step.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// Attach vertex/superstep context to a vertex program failure.
    pub fn in_vertex(self, vertex: VertexId, superstep: u64) -> Self {
        match self {
            Self::VertexExecution { .. } => self,
            other => Self::VertexExecution {
                vertex,
                superstep,
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, with step and vertex context stripped.
    pub fn root_cause(&self) -> &ProcessError {
        match self {
            Self::StepExecution { source, .. } | Self::VertexExecution { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }

    /// Returns `true` when the root cause is an unsupported operation or feature.
    pub fn is_unsupported(&self) -> bool {
        match self.root_cause() {
            Self::Structure(e) => e.is_unsupported(),
            Self::UnsupportedFeature { .. } => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_context_wraps_once() {
        let err = ProcessError::execution("boom")
            .in_step("MapStep")
            .in_step("RepeatStep");
        assert_eq!(err.to_string(), "Step 'MapStep' failed: Execution failed: boom");
        assert!(matches!(err.root_cause(), ProcessError::Execution(_)));
    }

    #[test]
    fn test_unsupported_is_found_through_context() {
        let err = ProcessError::from(StructureError::unsupported("add_edge", "read-only"))
            .in_step("AddEdgeStep")
            .in_vertex(VertexId::new(1), 2);
        assert!(err.is_unsupported());
        assert!(err.to_string().starts_with("Vertex v[1] failed in superstep 2"));
    }

    #[test]
    fn test_cycle_display() {
        let err = ProcessError::CyclicStrategies {
            cycle: vec!["A".to_string(), "B".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Strategy ordering constraints form a cycle between: A, B"
        );
    }
}
