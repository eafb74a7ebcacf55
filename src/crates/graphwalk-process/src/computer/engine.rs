use super::memory::{Memory, MemorySnapshot};
use super::program::{VertexContext, VertexOutcome, VertexProgram};
use super::result::{ComputedGraph, ComputerResult};
use super::GraphComputer;
use crate::config::ComputerConfig;
use crate::error::{ProcessError, Result};
use async_trait::async_trait;
use futures::future::try_join_all;
use graphwalk_structure::{Graph, ReadOnlyGraph, VertexId};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

type WorkItem<P> = (
    VertexId,
    <P as VertexProgram>::State,
    Vec<<P as VertexProgram>::Message>,
);
type Finished<P> = (
    VertexOutcome<<P as VertexProgram>::Message>,
    <P as VertexProgram>::State,
);

/// In-process graph computer that spreads each superstep over a pool of
/// blocking worker tasks.
///
/// The program sees a [`ReadOnlyGraph`] view. Vertices of a superstep are
/// split into contiguous chunks by id, one chunk per worker. The first
/// failing vertex raises an abort flag that every worker checks before its
/// next vertex; the job then fails and nothing of that superstep is
/// committed.
#[derive(Debug, Clone)]
pub struct TinkerGraphComputer {
    graph: Arc<dyn Graph>,
    config: ComputerConfig,
}

impl TinkerGraphComputer {
    pub fn new(graph: Arc<dyn Graph>) -> Self {
        Self {
            graph,
            config: ComputerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ComputerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    pub fn max_supersteps(mut self, max_supersteps: u64) -> Self {
        self.config.max_supersteps = max_supersteps;
        self
    }

    pub fn config(&self) -> &ComputerConfig {
        &self.config
    }

    #[tracing::instrument(skip(self, program), fields(program = program.name()))]
    async fn run<P: VertexProgram>(&self, program: P) -> Result<ComputerResult<P::State>> {
        self.config.validate()?;
        if let Err(e) = self.graph.features().require_computer() {
            tracing::warn!(error = %e, "Graph cannot host a computation");
            return Err(e.into());
        }

        let job_id = Uuid::new_v4();
        let started = Instant::now();
        let view: Arc<dyn Graph> = Arc::new(ReadOnlyGraph::new(self.graph.clone()));
        tracing::info!(
            job_id = %job_id,
            workers = self.config.workers,
            max_supersteps = self.config.max_supersteps,
            "Starting graph computation"
        );

        let program = Arc::new(program);
        let mut memory = Memory::new();
        program.setup(view.as_ref(), &mut memory)?;

        let vertex_ids = view.vertex_ids();
        let mut states: BTreeMap<VertexId, P::State> = vertex_ids
            .iter()
            .map(|v| (*v, P::State::default()))
            .collect();
        let mut inbox: HashMap<VertexId, Vec<P::Message>> = HashMap::new();
        let mut active: Vec<VertexId> = vertex_ids
            .into_iter()
            .filter(|v| program.initially_active(*v))
            .collect();

        loop {
            let superstep = memory.superstep();
            if superstep >= self.config.max_supersteps {
                tracing::error!(
                    job_id = %job_id,
                    superstep,
                    "Computation did not terminate within its superstep bound"
                );
                return Err(ProcessError::MaxSuperstepsExceeded(self.config.max_supersteps));
            }

            let snapshot = Arc::new(memory.snapshot(started.elapsed()));
            tracing::debug!(
                job_id = %job_id,
                superstep,
                active = active.len(),
                messages = inbox.values().map(Vec::len).sum::<usize>(),
                "Superstep started"
            );

            let work: Vec<WorkItem<P>> = active
                .iter()
                .map(|v| {
                    (
                        *v,
                        states.remove(v).unwrap_or_default(),
                        inbox.remove(v).unwrap_or_default(),
                    )
                })
                .collect();
            let mut finished = self
                .execute_superstep(&program, &view, &snapshot, superstep, work)
                .await?;
            finished.sort_by_key(|(outcome, _)| outcome.vertex);

            // Barrier: memory, then messages, then next activity.
            let mut next_inbox: HashMap<VertexId, Vec<P::Message>> = HashMap::new();
            let mut next_active = BTreeSet::new();
            let mut sent = 0usize;
            for (outcome, state) in finished {
                let vertex = outcome.vertex;
                for (key, update) in outcome.memory_writes {
                    memory
                        .add(&key, update)
                        .map_err(|e| e.in_vertex(vertex, superstep))?;
                }
                for (target, message) in outcome.outgoing {
                    if view.contains_vertex(target) {
                        next_inbox.entry(target).or_default().push(message);
                        sent += 1;
                    } else {
                        tracing::warn!(
                            job_id = %job_id,
                            from = %vertex,
                            to = %target,
                            "Dropping message to a missing vertex"
                        );
                    }
                }
                if outcome.keep_active {
                    next_active.insert(vertex);
                }
                states.insert(vertex, state);
            }
            for messages in next_inbox.values_mut() {
                *messages = program.combine(std::mem::take(messages));
            }
            next_active.extend(next_inbox.keys().copied());
            active = next_active.into_iter().collect();
            inbox = next_inbox;
            memory.set_superstep(superstep + 1);

            tracing::debug!(
                job_id = %job_id,
                superstep,
                sent,
                next_active = active.len(),
                "Superstep finished"
            );

            if program.terminate(&mut memory)? {
                break;
            }
        }

        let snapshot = memory.snapshot(started.elapsed());
        tracing::info!(
            job_id = %job_id,
            supersteps = snapshot.superstep(),
            elapsed_ms = snapshot.runtime().as_millis() as u64,
            "Graph computation finished"
        );
        Ok(ComputerResult {
            memory: snapshot,
            graph: ComputedGraph::new(self.graph.clone(), states),
        })
    }

    /// Run one superstep across the worker pool.
    async fn execute_superstep<P: VertexProgram>(
        &self,
        program: &Arc<P>,
        view: &Arc<dyn Graph>,
        snapshot: &Arc<MemorySnapshot>,
        superstep: u64,
        mut work: Vec<WorkItem<P>>,
    ) -> Result<Vec<Finished<P>>> {
        let chunk_size = work.len().div_ceil(self.config.workers.max(1)).max(1);
        let mut chunks = Vec::new();
        while !work.is_empty() {
            let rest = work.split_off(work.len().min(chunk_size));
            chunks.push(std::mem::replace(&mut work, rest));
        }

        let abort = Arc::new(AtomicBool::new(false));
        let handles = chunks.into_iter().map(|chunk| {
            let program = program.clone();
            let view = view.clone();
            let snapshot = snapshot.clone();
            let abort = abort.clone();
            let handle = tokio::task::spawn_blocking(move || {
                run_chunk(program.as_ref(), view.as_ref(), &snapshot, superstep, chunk, &abort)
            });
            async move {
                match handle.await {
                    Ok(result) => result,
                    Err(e) => Err(ProcessError::Join(e.to_string())),
                }
            }
        });
        let results = try_join_all(handles).await?;
        Ok(results.into_iter().flatten().collect())
    }
}

/// Execute a chunk of vertices, stopping early once any worker has failed.
fn run_chunk<P: VertexProgram>(
    program: &P,
    graph: &dyn Graph,
    memory: &MemorySnapshot,
    superstep: u64,
    chunk: Vec<WorkItem<P>>,
    abort: &AtomicBool,
) -> Result<Vec<Finished<P>>> {
    let mut finished = Vec::with_capacity(chunk.len());
    for (vertex, mut state, incoming) in chunk {
        if abort.load(Ordering::Acquire) {
            break;
        }
        let mut ctx = VertexContext::new(vertex, superstep, graph, memory, &incoming, &mut state);
        if let Err(e) = program.execute(&mut ctx) {
            abort.store(true, Ordering::Release);
            tracing::error!(vertex = %vertex, superstep, error = %e, "Vertex program failed");
            return Err(e.in_vertex(vertex, superstep));
        }
        let outcome = ctx.finish();
        finished.push((outcome, state));
    }
    Ok(finished)
}

#[async_trait]
impl GraphComputer for TinkerGraphComputer {
    fn graph(&self) -> &Arc<dyn Graph> {
        &self.graph
    }

    async fn submit<P: VertexProgram>(&self, program: P) -> Result<ComputerResult<P::State>> {
        self.run(program).await
    }
}
