use crate::computer::memory::Memory;
use crate::computer::messenger::MessageScope;
use crate::computer::program::{VertexContext, VertexProgram};
use crate::error::Result;
use crate::side_effects::OverwriteReducer;
use graphwalk_structure::{Direction, Graph, Value};
use std::sync::Arc;

const VERTEX_COUNT: &str = "~pagerank.vertices";

/// Fixed-iteration PageRank.
///
/// Rank mass of vertices without outgoing edges is not redistributed.
#[derive(Debug, Clone)]
pub struct PageRankProgram {
    iterations: u64,
    damping: f64,
    edge_labels: Vec<String>,
}

impl PageRankProgram {
    pub fn new(iterations: u64) -> Self {
        Self {
            iterations,
            damping: 0.85,
            edge_labels: Vec::new(),
        }
    }

    pub fn damping(mut self, damping: f64) -> Self {
        self.damping = damping;
        self
    }

    pub fn edge_labels(mut self, labels: &[&str]) -> Self {
        self.edge_labels = labels.iter().map(|s| s.to_string()).collect();
        self
    }
}

impl VertexProgram for PageRankProgram {
    type Message = f64;
    type State = f64;

    fn name(&self) -> &str {
        "PageRankProgram"
    }

    fn setup(&self, graph: &dyn Graph, memory: &mut Memory) -> Result<()> {
        let count = Value::saturating_int(graph.vertex_ids().len() as u64);
        memory.register(VERTEX_COUNT, count, Arc::new(OverwriteReducer));
        Ok(())
    }

    fn execute(&self, ctx: &mut VertexContext<'_, f64, f64>) -> Result<()> {
        let n = ctx
            .memory()
            .get(VERTEX_COUNT)
            .and_then(Value::as_f64)
            .unwrap_or(1.0)
            .max(1.0);
        let rank = if ctx.superstep() == 0 {
            1.0 / n
        } else {
            let incoming: f64 = ctx.receive_messages().iter().sum();
            (1.0 - self.damping) / n + self.damping * incoming
        };
        *ctx.state_mut() = rank;

        if ctx.superstep() < self.iterations {
            let out_degree = ctx
                .graph()
                .incident_edges(ctx.vertex(), Direction::Out, &self.edge_labels)?
                .len();
            if out_degree > 0 {
                let scope = MessageScope::Local {
                    direction: Direction::Out,
                    labels: self.edge_labels.clone(),
                };
                ctx.send_message(&scope, rank / out_degree as f64)?;
            }
            ctx.keep_active();
        }
        Ok(())
    }

    fn terminate(&self, memory: &mut Memory) -> Result<bool> {
        Ok(memory.superstep() > self.iterations)
    }

    fn combine(&self, messages: Vec<f64>) -> Vec<f64> {
        vec![messages.into_iter().sum()]
    }
}
