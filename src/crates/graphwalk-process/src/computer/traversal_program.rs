//! Running a traversal on the graph computer.
//!
//! The traversal is rewritten for the computer engine and split in two:
//!
//! ```text
//! V() . out() . has() . values()  |  order() . fold()
//! └──── prefix: one superstep per ┘  └── suffix: OLTP over the
//!       hop, traversers as messages      halted traversers
//! ```
//!
//! The prefix holds the `V` step and every following step that only needs
//! the star of the vertex a traverser sits on. A traverser that moves to
//! another vertex travels there as a message; one that runs past the end of
//! the prefix halts in the state of the vertex it is on. Side-effect writes
//! made by prefix steps are buffered per vertex and reduced into memory at
//! the barrier, under the same keys and reducers the traversal registered.
//!
//! Once no traverser moved during a superstep the computation ends. The
//! suffix then starts from all halted traversers, in vertex id order, with
//! its side effects seeded from final memory.

use super::memory::{Memory, MemorySnapshot};
use super::messenger::MessageScope;
use super::program::{VertexContext, VertexProgram};
use super::result::ComputerResult;
use super::GraphComputer;
use crate::error::{ProcessError, Result};
use crate::side_effects::{OrReducer, SideEffects};
use crate::step::{pull, HasContainer, Step, StepKind};
use crate::strategy::{ComputerVerificationStrategy, TraversalEngine, TraversalStrategies};
use crate::traversal::{ExecutionContext, Traversal};
use crate::traverser::{Traverser, TraverserSet};
use graphwalk_structure::{Graph, ReadOnlyGraph, Value, VertexId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

/// Memory key raised whenever a traverser moves to another vertex.
const TRAVERSERS_SENT: &str = "~traversers.sent";

/// A traverser in flight, addressed to a prefix step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraverserMessage {
    pub traverser: Traverser,
    /// Index of the prefix step the traverser enters next
    pub step: usize,
}

/// Whether a step can run on the star of a single vertex.
fn is_vertex_local(kind: &StepKind) -> bool {
    matches!(
        kind,
        StepKind::Vertex { .. }
            | StepKind::EdgeVertex(_)
            | StepKind::Values(_)
            | StepKind::Id
            | StepKind::Label
            | StepKind::Constant(_)
            | StepKind::Map(_)
            | StepKind::FlatMap(_)
            | StepKind::Path
            | StepKind::Select(_)
            | StepKind::Has(_)
            | StepKind::Is(_)
            | StepKind::Filter(_)
            | StepKind::SimplePath
            | StepKind::Store(_)
            | StepKind::GroupCountSideEffect { .. }
            | StepKind::SideEffect(_)
            | StepKind::Identity
    )
}

/// Vertex program that executes the prefix of a traversal.
#[derive(Debug, Clone)]
pub struct TraversalVertexProgram {
    prefix: Vec<Step>,
    ids: Vec<VertexId>,
    has: Vec<HasContainer>,
    side_effects: SideEffects,
    path_tracking: bool,
    max_loops: Option<u32>,
    suffix: Traversal,
}

impl TraversalVertexProgram {
    /// Rewrite `traversal` for the computer engine and split it.
    ///
    /// Fails with an unsupported-feature error when the traversal does not
    /// start from `V` or mutates the graph.
    pub fn new(mut traversal: Traversal) -> Result<Self> {
        let graph = traversal
            .graph()
            .cloned()
            .ok_or_else(|| ProcessError::configuration("Traversal is not bound to a graph"))?;
        let strategies = traversal
            .strategies()
            .with(Arc::new(ComputerVerificationStrategy))?;
        traversal.apply_strategies_with(&strategies, TraversalEngine::Computer)?;

        let mut prefix = traversal.take_steps();
        let (ids, has) = match prefix.first().map(Step::kind) {
            Some(StepKind::V { ids, has }) => (ids.clone(), has.clone()),
            _ => {
                return Err(ProcessError::unsupported_feature(
                    "computer",
                    prefix.first().map_or("empty traversal", Step::name),
                ))
            }
        };
        let split = prefix
            .iter()
            .skip(1)
            .position(|s| !is_vertex_local(s.kind()))
            .map_or(prefix.len(), |i| i + 1);
        let suffix_steps = prefix.split_off(split);
        tracing::debug!(
            prefix = prefix.len(),
            suffix = suffix_steps.len(),
            "Split traversal for the graph computer"
        );

        let side_effects = traversal.side_effects().clone();
        // the suffix runs on the master, which must not mutate either
        let read_only: Arc<dyn Graph> = Arc::new(ReadOnlyGraph::new(graph));
        let suffix = Traversal::rewritten(read_only, &traversal, suffix_steps, side_effects.clone());
        Ok(Self {
            prefix,
            ids,
            has,
            side_effects,
            path_tracking: traversal.path_tracking(),
            max_loops: traversal.loop_limit(),
            suffix,
        })
    }

    /// Steps run as a vertex program, starting with `V`.
    pub fn prefix(&self) -> &[Step] {
        &self.prefix
    }

    /// Steps run afterwards over the halted traversers.
    pub fn suffix(&self) -> &Traversal {
        &self.suffix
    }

    /// Run the suffix over the halted traversers of a finished computation.
    pub fn complete(&self, result: &ComputerResult<Vec<Traverser>>) -> Result<Traversal> {
        let mut suffix = self.suffix.clone();
        resume(&mut suffix, result)?;
        Ok(suffix)
    }

    /// Start traverser for `vertex`, if the `V` step accepts it.
    fn start_at(&self, graph: &dyn Graph, vertex: VertexId) -> Result<Option<Traverser>> {
        let value = Value::Vertex(vertex);
        for container in &self.has {
            if !container.test(graph, &value)? {
                return Ok(None);
            }
        }
        let mut traverser = Traverser::start(value, self.path_tracking);
        traverser.add_labels(self.prefix[0].labels());
        Ok(Some(traverser))
    }
}

/// Seed `suffix` with the side effects and halted traversers of `result`.
fn resume(suffix: &mut Traversal, result: &ComputerResult<Vec<Traverser>>) -> Result<()> {
    seed_side_effects(suffix.side_effects_mut(), &result.memory)?;
    let halted = result
        .graph
        .states()
        .values()
        .flat_map(|halted| halted.iter().cloned());
    suffix.add_starts(halted);
    Ok(())
}

fn seed_side_effects(side_effects: &mut SideEffects, memory: &MemorySnapshot) -> Result<()> {
    let keys: Vec<String> = side_effects.keys().map(str::to_string).collect();
    for key in keys {
        if let Some(value) = memory.get(&key) {
            side_effects.set(&key, value.clone())?;
        }
    }
    Ok(())
}

impl VertexProgram for TraversalVertexProgram {
    type Message = TraverserMessage;
    type State = Vec<Traverser>;

    fn name(&self) -> &str {
        "TraversalVertexProgram"
    }

    fn setup(&self, _graph: &dyn Graph, memory: &mut Memory) -> Result<()> {
        for key in self.side_effects.keys() {
            memory.register(
                key,
                self.side_effects.get(key)?.clone(),
                self.side_effects.reducer(key)?,
            );
        }
        memory.register(TRAVERSERS_SENT, Value::Bool(false), Arc::new(OrReducer));
        Ok(())
    }

    fn initially_active(&self, vertex: VertexId) -> bool {
        self.ids.is_empty() || self.ids.contains(&vertex)
    }

    fn execute(&self, ctx: &mut VertexContext<'_, TraverserMessage, Vec<Traverser>>) -> Result<()> {
        let vertex = ctx.vertex();
        let graph = ctx.graph();
        let mut work: VecDeque<(Traverser, usize)> = VecDeque::new();
        if ctx.superstep() == 0 {
            if let Some(start) = self.start_at(graph, vertex)? {
                work.push_back((start, 1));
            }
        } else {
            work.extend(
                ctx.receive_messages()
                    .iter()
                    .map(|m| (m.traverser.clone(), m.step)),
            );
        }
        if work.is_empty() {
            return Ok(());
        }

        let mut steps = self.prefix.clone();
        let end = steps.len();
        let mut side_effects = self.side_effects.recording();
        let strategies = TraversalStrategies::empty();
        let mut halted = Vec::new();
        let mut moved = Vec::new();
        {
            let mut exec = ExecutionContext::new(
                graph,
                &mut side_effects,
                &strategies,
                TraversalEngine::Computer,
            );
            exec.path_tracking = self.path_tracking;
            exec.max_loops = self.max_loops;

            while let Some((traverser, index)) = work.pop_front() {
                if index == end {
                    halted.push(traverser);
                    continue;
                }
                let mut starts = VecDeque::from([traverser]);
                while let Some(out) = pull(&mut steps[index..=index], &mut starts, &mut exec)? {
                    match out.get().as_vertex() {
                        Some(target) if target != vertex && index + 1 < end => {
                            moved.push((target, TraverserMessage { traverser: out, step: index + 1 }));
                        }
                        _ => work.push_back((out, index + 1)),
                    }
                }
                steps[index].reset();
            }
        }

        for (key, update) in side_effects.take_journal() {
            ctx.add_memory(key, update);
        }
        if !moved.is_empty() {
            ctx.add_memory(TRAVERSERS_SENT, Value::Bool(true));
        }
        for (target, message) in moved {
            ctx.send_message(&MessageScope::Global(vec![target]), message)?;
        }
        ctx.state_mut().extend(halted);
        Ok(())
    }

    fn terminate(&self, memory: &mut Memory) -> Result<bool> {
        let sent = memory.get(TRAVERSERS_SENT)?.as_bool().unwrap_or(false);
        memory.set(TRAVERSERS_SENT, Value::Bool(false))?;
        Ok(!sent)
    }

    /// Merge equal traversers headed for the same step.
    fn combine(&self, messages: Vec<TraverserMessage>) -> Vec<TraverserMessage> {
        let mut by_step: BTreeMap<usize, TraverserSet> = BTreeMap::new();
        for message in messages {
            by_step.entry(message.step).or_default().add(message.traverser);
        }
        by_step
            .into_iter()
            .flat_map(|(step, set)| {
                set.into_iter()
                    .map(move |traverser| TraverserMessage { traverser, step })
            })
            .collect()
    }
}

impl Traversal {
    /// Run this traversal on `computer` and collect its values.
    ///
    /// Equivalent to iterating the traversal, up to result order.
    pub async fn submit<C: GraphComputer>(self, computer: &C) -> Result<Vec<Value>> {
        let program = TraversalVertexProgram::new(self)?;
        let mut suffix = program.suffix.clone();
        let result = computer.submit(program).await?;
        resume(&mut suffix, &result)?;
        suffix.to_list()
    }
}
