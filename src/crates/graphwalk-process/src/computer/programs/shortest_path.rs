use crate::computer::memory::Memory;
use crate::computer::messenger::MessageScope;
use crate::computer::program::{VertexContext, VertexProgram};
use crate::error::{ProcessError, Result};
use crate::side_effects::OrReducer;
use graphwalk_structure::{Direction, Graph, Value, VertexId};
use std::sync::Arc;

const DISTANCES_SENT: &str = "~sssp.sent";

/// Single-source shortest paths by repeated relaxation.
///
/// Without a weight key every edge counts 1 and distances are sent along
/// the scope's adjacency; with one, each edge's numeric property is added.
/// A vertex only relaxes its neighbors when its distance improved, and the
/// computation stops after the first superstep in which nothing was sent,
/// so on a graph of diameter `D` it finishes within `D + 1` supersteps.
///
/// Final state is the distance from the source, `None` when unreachable.
#[derive(Debug, Clone)]
pub struct ShortestPathProgram {
    source: VertexId,
    weight: Option<String>,
    direction: Direction,
    edge_labels: Vec<String>,
}

impl ShortestPathProgram {
    pub fn new(source: impl Into<VertexId>) -> Self {
        Self {
            source: source.into(),
            weight: None,
            direction: Direction::Out,
            edge_labels: Vec::new(),
        }
    }

    /// Read edge lengths from the numeric property `key`.
    pub fn weighted(mut self, key: impl Into<String>) -> Self {
        self.weight = Some(key.into());
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Only follow edges with one of `labels`.
    pub fn edge_labels(mut self, labels: &[&str]) -> Self {
        self.edge_labels = labels.iter().map(|s| s.to_string()).collect();
        self
    }

    fn relax(
        &self,
        ctx: &mut VertexContext<'_, f64, Option<f64>>,
        distance: f64,
    ) -> Result<()> {
        let Some(key) = &self.weight else {
            let scope = MessageScope::Local {
                direction: self.direction,
                labels: self.edge_labels.clone(),
            };
            return ctx.send_message(&scope, distance + 1.0);
        };
        let graph = ctx.graph();
        let vertex = ctx.vertex();
        for edge in graph.incident_edges(vertex, self.direction, &self.edge_labels)? {
            let (out, in_) = graph.edge_vertices(edge)?;
            let target = if out == vertex { in_ } else { out };
            let length = graph
                .edge_property(edge, key)?
                .and_then(|v| v.as_f64())
                .ok_or_else(|| {
                    ProcessError::execution(format!("Edge {} has no numeric '{}'", edge, key))
                })?;
            ctx.send_message(&MessageScope::Global(vec![target]), distance + length)?;
        }
        Ok(())
    }
}

impl VertexProgram for ShortestPathProgram {
    type Message = f64;
    type State = Option<f64>;

    fn name(&self) -> &str {
        "ShortestPathProgram"
    }

    fn setup(&self, graph: &dyn Graph, memory: &mut Memory) -> Result<()> {
        if !graph.contains_vertex(self.source) {
            return Err(ProcessError::configuration(format!(
                "Source vertex {} does not exist",
                self.source
            )));
        }
        memory.register(DISTANCES_SENT, Value::Bool(false), Arc::new(OrReducer));
        Ok(())
    }

    fn initially_active(&self, vertex: VertexId) -> bool {
        vertex == self.source
    }

    fn execute(&self, ctx: &mut VertexContext<'_, f64, Option<f64>>) -> Result<()> {
        let candidate = if ctx.superstep() == 0 {
            Some(0.0)
        } else {
            ctx.receive_messages().iter().copied().reduce(f64::min)
        };
        let Some(candidate) = candidate else {
            return Ok(());
        };
        if ctx.state().is_some_and(|current| current <= candidate) {
            return Ok(());
        }
        *ctx.state_mut() = Some(candidate);

        let before = ctx.messenger().sent();
        self.relax(ctx, candidate)?;
        if ctx.messenger().sent() > before {
            ctx.add_memory(DISTANCES_SENT, Value::Bool(true));
        }
        Ok(())
    }

    fn terminate(&self, memory: &mut Memory) -> Result<bool> {
        let sent = memory.get(DISTANCES_SENT)?.as_bool().unwrap_or(false);
        memory.set(DISTANCES_SENT, Value::Bool(false))?;
        Ok(!sent)
    }

    /// Only the shortest candidate matters.
    fn combine(&self, messages: Vec<f64>) -> Vec<f64> {
        messages.into_iter().reduce(f64::min).into_iter().collect()
    }
}
