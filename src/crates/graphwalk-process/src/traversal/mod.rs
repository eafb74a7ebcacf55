//! Traversals: ordered step pipelines and their execution lifecycle.
//!
//! A [`Traversal`] owns its steps, the traversers injected into it, and its
//! side-effect store. Strategies are applied exactly once, right before the
//! first pull; the `strategies_applied` flag makes any later application a
//! no-op regardless of what individual strategies do.
//!
//! # Lifecycle
//!
//! ```text
//! GraphTraversalSource::v()      build steps fluently
//!          │
//!          ▼
//! apply_strategies()             once, on first pull (or explicitly)
//!          │
//!          ▼
//! next_traverser() ... None      pull: last step asks its upstream, and so on
//! ```
//!
//! Nested traversals (inside `where`, `union`, `choose` and `repeat`) are
//! never rewritten by their parent's strategies. Each one is rewritten
//! independently with the root's strategy set the first time it is pulled.
//!
//! During a pull every step receives an [`ExecutionContext`]: the graph,
//! the root's side effects, the strategy set and the engine settings. Steps
//! never hold references back into the traversal that owns them.

mod builder;

pub use builder::{GraphTraversalSource, __};

use crate::error::{ProcessError, Result};
use crate::side_effects::SideEffects;
use crate::step::{pull, Step};
use crate::strategy::{TraversalEngine, TraversalStrategies};
use crate::traverser::Traverser;
use graphwalk_structure::{Graph, Value};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

/// Everything a step may touch while producing traversers.
pub struct ExecutionContext<'a> {
    pub(crate) graph: &'a dyn Graph,
    pub(crate) side_effects: &'a mut SideEffects,
    pub(crate) strategies: &'a TraversalStrategies,
    pub(crate) engine: TraversalEngine,
    pub(crate) path_tracking: bool,
    pub(crate) max_loops: Option<u32>,
}

impl<'a> ExecutionContext<'a> {
    pub(crate) fn new(
        graph: &'a dyn Graph,
        side_effects: &'a mut SideEffects,
        strategies: &'a TraversalStrategies,
        engine: TraversalEngine,
    ) -> Self {
        Self {
            graph,
            side_effects,
            strategies,
            engine,
            path_tracking: false,
            max_loops: None,
        }
    }

    /// A fresh traverser, path-tracked when the traversal tracks paths.
    pub(crate) fn start(&self, value: Value) -> Traverser {
        Traverser::start(value, self.path_tracking)
    }
}

/// An ordered pipeline of steps plus its side effects.
#[derive(Debug, Clone)]
pub struct Traversal {
    steps: Vec<Step>,
    starts: VecDeque<Traverser>,
    side_effects: SideEffects,
    strategies: Arc<TraversalStrategies>,
    graph: Option<Arc<dyn Graph>>,
    engine: TraversalEngine,
    strategies_applied: bool,
    path_tracking: bool,
    root: bool,
    max_loops: Option<u32>,
    peeked: Option<Traverser>,
    unrolled: Option<(Value, u64)>,
}

impl Default for Traversal {
    fn default() -> Self {
        Self::anonymous()
    }
}

impl Traversal {
    /// An unbound traversal, for nesting inside another one.
    pub fn anonymous() -> Self {
        Self {
            steps: Vec::new(),
            starts: VecDeque::new(),
            side_effects: SideEffects::new(),
            strategies: Arc::new(TraversalStrategies::empty()),
            graph: None,
            engine: TraversalEngine::Standard,
            strategies_applied: false,
            path_tracking: false,
            root: false,
            max_loops: None,
            peeked: None,
            unrolled: None,
        }
    }

    pub(crate) fn bound(
        graph: Arc<dyn Graph>,
        strategies: Arc<TraversalStrategies>,
        side_effects: SideEffects,
    ) -> Self {
        Self {
            graph: Some(graph),
            strategies,
            side_effects,
            root: true,
            ..Self::anonymous()
        }
    }

    /// Mark this traversal as a root (top-level) traversal.
    pub(crate) fn into_root(mut self) -> Self {
        self.root = true;
        self
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn steps_mut(&mut self) -> &mut [Step] {
        &mut self.steps
    }

    pub fn add_step(&mut self, step: impl Into<Step>) {
        self.steps.push(step.into());
    }

    /// Append a step, consuming and returning the traversal.
    pub fn push(mut self, step: impl Into<Step>) -> Self {
        self.add_step(step);
        self
    }

    /// Insert a step at `index`, shifting later steps back.
    pub fn insert_step(&mut self, index: usize, step: impl Into<Step>) {
        self.steps.insert(index, step.into());
    }

    /// Remove and return the step at `index`.
    pub fn remove_step(&mut self, index: usize) -> Step {
        self.steps.remove(index)
    }

    pub fn side_effects(&self) -> &SideEffects {
        &self.side_effects
    }

    pub fn side_effects_mut(&mut self) -> &mut SideEffects {
        &mut self.side_effects
    }

    pub fn strategies(&self) -> &TraversalStrategies {
        &self.strategies
    }

    pub fn graph(&self) -> Option<&Arc<dyn Graph>> {
        self.graph.as_ref()
    }

    pub fn engine(&self) -> TraversalEngine {
        self.engine
    }

    /// Whether this is a top-level traversal rather than a nested one.
    pub fn is_root(&self) -> bool {
        self.root
    }

    pub fn path_tracking(&self) -> bool {
        self.path_tracking
    }

    pub fn set_path_tracking(&mut self, enabled: bool) {
        self.path_tracking = enabled;
    }

    /// Loop bound for `repeat` steps that do not set their own.
    pub fn loop_limit(&self) -> Option<u32> {
        self.max_loops
    }

    pub fn set_loop_limit(&mut self, max_loops: Option<u32>) {
        self.max_loops = max_loops;
    }

    pub fn strategies_applied(&self) -> bool {
        self.strategies_applied
    }

    /// Whether any step, nested ones included, reads traverser paths.
    pub fn requires_path(&self) -> bool {
        self.steps.iter().any(Step::requires_path)
    }

    /// Whether any step, nested ones included, drains its input before
    /// emitting. Such a traversal must be fed before it is first pulled.
    pub fn has_barrier(&self) -> bool {
        self.steps.iter().any(|step| {
            step.kind().is_barrier() || step.kind().nested().iter().any(|t| t.has_barrier())
        })
    }

    /// Rewrite this traversal with its own strategy set, once.
    pub fn apply_strategies(&mut self) -> Result<()> {
        let strategies = self.strategies.clone();
        self.apply_strategies_with(&strategies, self.engine)
    }

    /// Rewrite this traversal with `strategies` for `engine`, once.
    ///
    /// A traversal that has already been rewritten is left untouched.
    pub fn apply_strategies_with(
        &mut self,
        strategies: &TraversalStrategies,
        engine: TraversalEngine,
    ) -> Result<()> {
        if self.strategies_applied {
            return Ok(());
        }
        self.engine = engine;
        strategies.apply(self, engine)?;
        self.strategies_applied = true;
        tracing::debug!(
            steps = self.steps.len(),
            path_tracking = self.path_tracking,
            traversal = %self,
            "Traversal rewritten"
        );
        Ok(())
    }

    /// Next traverser (with its bulk), or `None` once exhausted.
    pub fn next_traverser(&mut self) -> Result<Option<Traverser>> {
        if let Some(t) = self.peeked.take() {
            return Ok(Some(t));
        }
        self.apply_strategies()?;
        let graph = self
            .graph
            .clone()
            .ok_or_else(|| ProcessError::configuration("Traversal is not bound to a graph"))?;
        let Self {
            steps,
            starts,
            side_effects,
            strategies,
            engine,
            path_tracking,
            max_loops,
            ..
        } = self;
        let mut ctx = ExecutionContext {
            graph: graph.as_ref(),
            side_effects,
            strategies: strategies.as_ref(),
            engine: *engine,
            path_tracking: *path_tracking,
            max_loops: *max_loops,
        };
        pull(steps, starts, &mut ctx)
    }

    /// Whether another value is available.
    pub fn has_next(&mut self) -> Result<bool> {
        if self.unrolled.is_some() || self.peeked.is_some() {
            return Ok(true);
        }
        self.peeked = self.next_traverser()?;
        Ok(self.peeked.is_some())
    }

    /// Next value, repeating a traverser's value once per unit of bulk.
    pub fn next_value(&mut self) -> Result<Option<Value>> {
        if let Some((value, remaining)) = self.unrolled.take() {
            if remaining > 1 {
                self.unrolled = Some((value.clone(), remaining - 1));
            }
            return Ok(Some(value));
        }
        match self.next_traverser()? {
            None => Ok(None),
            Some(t) => {
                let bulk = t.bulk();
                let value = t.into_value();
                if bulk > 1 {
                    self.unrolled = Some((value.clone(), bulk - 1));
                }
                Ok(Some(value))
            }
        }
    }

    /// Every remaining value, bulk unrolled.
    pub fn to_list(&mut self) -> Result<Vec<Value>> {
        let mut values = Vec::new();
        while let Some(value) = self.next_value()? {
            values.push(value);
        }
        Ok(values)
    }

    /// Every remaining traverser, bulk kept.
    pub fn traversers(&mut self) -> Result<Vec<Traverser>> {
        let mut traversers = Vec::new();
        while let Some(t) = self.next_traverser()? {
            traversers.push(t);
        }
        Ok(traversers)
    }

    /// Pull to exhaustion for side effects only.
    pub fn iterate(&mut self) -> Result<()> {
        while self.next_traverser()?.is_some() {}
        Ok(())
    }

    /// Feed a traverser into the front of the pipeline.
    pub(crate) fn add_start(&mut self, traverser: Traverser) {
        self.starts.push_back(traverser);
    }

    pub(crate) fn add_starts(&mut self, traversers: impl IntoIterator<Item = Traverser>) {
        self.starts.extend(traversers);
    }

    /// Pull from a nested traversal, rewriting it on first touch.
    pub(crate) fn next_nested(
        &mut self,
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<Option<Traverser>> {
        if !self.strategies_applied {
            let strategies = ctx.strategies;
            self.apply_strategies_with(strategies, ctx.engine)?;
        }
        pull(&mut self.steps, &mut self.starts, ctx)
    }

    /// Whether this nested traversal yields anything for `traverser`.
    pub(crate) fn test(
        &mut self,
        traverser: &Traverser,
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<bool> {
        self.reset();
        self.add_start(traverser.clone());
        let found = self.next_nested(ctx)?.is_some();
        self.reset();
        Ok(found)
    }

    /// Drop all execution state; steps and rewrites are kept.
    pub fn reset(&mut self) {
        self.starts.clear();
        self.peeked = None;
        self.unrolled = None;
        for step in &mut self.steps {
            step.reset();
        }
    }

    /// Take the steps out, leaving the traversal empty.
    pub(crate) fn take_steps(&mut self) -> Vec<Step> {
        std::mem::take(&mut self.steps)
    }

    /// A root traversal over steps that have already been rewritten.
    ///
    /// Settings (engine, path tracking, loop bound) are taken from `like`.
    pub(crate) fn rewritten(
        graph: Arc<dyn Graph>,
        like: &Traversal,
        steps: Vec<Step>,
        side_effects: SideEffects,
    ) -> Self {
        Self {
            steps,
            strategies_applied: true,
            engine: like.engine,
            path_tracking: like.path_tracking,
            max_loops: like.max_loops,
            ..Self::bound(graph, like.strategies.clone(), side_effects)
        }
    }
}

impl fmt::Display for Traversal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", step)?;
        }
        write!(f, "]")
    }
}
