//! Fluent construction of traversals.
//!
//! [`GraphTraversalSource`] spawns root traversals bound to a graph and a
//! strategy set. Every step method consumes the traversal and returns it
//! with one more step; modulators (`by`, `desc`, `times`, `until`, `emit`,
//! `from_`, `to`, `property`) adjust the step just added. Anonymous
//! traversals for nesting are built through [`__`].
//!
//! ```rust
//! use graphwalk_process::prelude::*;
//! use graphwalk_structure::{tinker, Value};
//! use std::sync::Arc;
//!
//! let g = GraphTraversalSource::new(Arc::new(tinker::modern().unwrap())).unwrap();
//! let names = g
//!     .v_ids([1u64])
//!     .out(&["knows"])
//!     .has("age", P::gt(30))
//!     .values(&["name"])
//!     .to_list()
//!     .unwrap();
//! assert_eq!(names, vec![Value::from("josh")]);
//! ```

use super::Traversal;
use crate::config::TraversalConfig;
use crate::error::Result;
use crate::predicate::P;
use crate::side_effects::{AppendReducer, MapSumReducer, Reducer, SideEffects};
use crate::step::{HasContainer, HasKey, Lambda, LoopCondition, StepKind};
use crate::strategy::{TraversalStrategies, TraversalStrategy};
use crate::traverser::Traverser;
use graphwalk_structure::{Direction, EdgeId, Graph, Value, VertexId};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Spawns traversals over one graph.
#[derive(Debug, Clone)]
pub struct GraphTraversalSource {
    graph: Arc<dyn Graph>,
    strategies: Arc<TraversalStrategies>,
    side_effects: SideEffects,
    config: TraversalConfig,
}

impl GraphTraversalSource {
    /// A source with the standard strategy set.
    pub fn new(graph: Arc<dyn Graph>) -> Result<Self> {
        Ok(Self {
            graph,
            strategies: Arc::new(TraversalStrategies::standard()?),
            side_effects: SideEffects::new(),
            config: TraversalConfig::default(),
        })
    }

    /// Add a strategy to (or replace it in) this source's set.
    pub fn with_strategy(mut self, strategy: impl TraversalStrategy + 'static) -> Result<Self> {
        self.strategies = Arc::new(self.strategies.with(Arc::new(strategy))?);
        Ok(self)
    }

    /// Replace the whole strategy set.
    pub fn with_strategies(mut self, strategies: TraversalStrategies) -> Self {
        self.strategies = Arc::new(strategies);
        self
    }

    /// Drop the strategy named `id`.
    pub fn without_strategy(mut self, id: &str) -> Self {
        self.strategies = Arc::new(self.strategies.without(id));
        self
    }

    /// Register a side effect every spawned traversal starts with.
    pub fn with_side_effect(
        mut self,
        key: impl Into<String>,
        initial: Value,
        reducer: Arc<dyn Reducer>,
    ) -> Self {
        self.side_effects.register(key, initial, reducer);
        self
    }

    /// Track paths in every spawned traversal.
    pub fn with_path(mut self) -> Self {
        self.config.path_tracking = true;
        self
    }

    pub fn with_config(mut self, config: TraversalConfig) -> Self {
        self.config = config;
        self
    }

    pub fn graph(&self) -> &Arc<dyn Graph> {
        &self.graph
    }

    pub fn strategies(&self) -> &TraversalStrategies {
        &self.strategies
    }

    fn spawn(&self, kind: StepKind) -> Traversal {
        let mut traversal = Traversal::bound(
            self.graph.clone(),
            self.strategies.clone(),
            self.side_effects.clone(),
        );
        traversal.set_path_tracking(self.config.path_tracking);
        traversal.set_loop_limit(self.config.max_loops);
        traversal.push(kind)
    }

    /// All vertices.
    pub fn v(&self) -> Traversal {
        self.spawn(StepKind::V {
            ids: Vec::new(),
            has: Vec::new(),
        })
    }

    /// Vertices by id; unknown ids are skipped.
    pub fn v_ids<I>(&self, ids: I) -> Traversal
    where
        I: IntoIterator,
        I::Item: Into<VertexId>,
    {
        self.spawn(StepKind::V {
            ids: ids.into_iter().map(Into::into).collect(),
            has: Vec::new(),
        })
    }

    /// All edges.
    pub fn e(&self) -> Traversal {
        self.spawn(StepKind::E {
            ids: Vec::new(),
            has: Vec::new(),
        })
    }

    pub fn e_ids<I>(&self, ids: I) -> Traversal
    where
        I: IntoIterator,
        I::Item: Into<EdgeId>,
    {
        self.spawn(StepKind::E {
            ids: ids.into_iter().map(Into::into).collect(),
            has: Vec::new(),
        })
    }

    /// Literal start values.
    pub fn inject<V: Into<Value>>(&self, values: impl IntoIterator<Item = V>) -> Traversal {
        self.spawn(StepKind::Inject(values.into_iter().map(Into::into).collect()))
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Traversal {
    fn nest(&mut self, nested: &Traversal) {
        self.side_effects.absorb(nested.side_effects());
    }

    /// Adjust the last step, if `apply` accepts it.
    fn modulate(mut self, modulator: &str, apply: impl FnOnce(&mut StepKind) -> bool) -> Self {
        let applied = self
            .steps
            .last_mut()
            .map_or(false, |step| apply(step.kind_mut()));
        if !applied {
            tracing::warn!(
                modulator,
                step = self.steps.last().map_or("<none>", |s| s.name()),
                "Modulator does not apply to the preceding step"
            );
        }
        self
    }

    fn vertex_step(self, direction: Direction, labels: &[&str], to_edges: bool) -> Self {
        self.push(StepKind::Vertex {
            direction,
            edge_labels: strings(labels),
            to_edges,
        })
    }

    pub fn out(self, labels: &[&str]) -> Self {
        self.vertex_step(Direction::Out, labels, false)
    }

    pub fn in_(self, labels: &[&str]) -> Self {
        self.vertex_step(Direction::In, labels, false)
    }

    pub fn both(self, labels: &[&str]) -> Self {
        self.vertex_step(Direction::Both, labels, false)
    }

    pub fn out_e(self, labels: &[&str]) -> Self {
        self.vertex_step(Direction::Out, labels, true)
    }

    pub fn in_e(self, labels: &[&str]) -> Self {
        self.vertex_step(Direction::In, labels, true)
    }

    pub fn both_e(self, labels: &[&str]) -> Self {
        self.vertex_step(Direction::Both, labels, true)
    }

    pub fn out_v(self) -> Self {
        self.push(StepKind::EdgeVertex(Direction::Out))
    }

    pub fn in_v(self) -> Self {
        self.push(StepKind::EdgeVertex(Direction::In))
    }

    pub fn both_v(self) -> Self {
        self.push(StepKind::EdgeVertex(Direction::Both))
    }

    /// Property values; every property when `keys` is empty.
    pub fn values(self, keys: &[&str]) -> Self {
        self.push(StepKind::Values(strings(keys)))
    }

    pub fn id(self) -> Self {
        self.push(StepKind::Id)
    }

    pub fn label(self) -> Self {
        self.push(StepKind::Label)
    }

    pub fn constant(self, value: impl Into<Value>) -> Self {
        self.push(StepKind::Constant(value.into()))
    }

    pub fn map<F>(self, f: F) -> Self
    where
        F: Fn(&Traverser) -> Result<Value> + Send + Sync + 'static,
    {
        self.push(StepKind::Map(Lambda(Arc::new(f))))
    }

    pub fn flat_map<F>(self, f: F) -> Self
    where
        F: Fn(&Traverser) -> Result<Vec<Value>> + Send + Sync + 'static,
    {
        self.push(StepKind::FlatMap(Lambda(Arc::new(f))))
    }

    pub fn path(self) -> Self {
        self.push(StepKind::Path)
    }

    pub fn select(self, labels: &[&str]) -> Self {
        self.push(StepKind::Select(strings(labels)))
    }

    pub fn has(self, key: &str, predicate: P) -> Self {
        self.push(StepKind::Has(vec![HasContainer::property(key, predicate)]))
    }

    pub fn has_label(self, label: &str) -> Self {
        self.push(StepKind::Has(vec![HasContainer::new(HasKey::Label, P::eq(label))]))
    }

    pub fn has_id<I>(self, ids: I) -> Self
    where
        I: IntoIterator<Item = u64>,
    {
        let ids: Vec<Value> = ids.into_iter().map(Value::saturating_int).collect();
        self.push(StepKind::Has(vec![HasContainer::new(HasKey::Id, P::Within(ids))]))
    }

    pub fn is(self, predicate: P) -> Self {
        self.push(StepKind::Is(predicate))
    }

    pub fn filter<F>(self, f: F) -> Self
    where
        F: Fn(&Traverser) -> Result<bool> + Send + Sync + 'static,
    {
        self.push(StepKind::Filter(Lambda(Arc::new(f))))
    }

    /// Keep traversers for which `traversal` yields at least one result.
    pub fn where_(mut self, traversal: Traversal) -> Self {
        self.nest(&traversal);
        self.push(StepKind::Where {
            traversal: Box::new(traversal),
            negate: false,
        })
    }

    /// Keep traversers for which `traversal` yields nothing.
    pub fn not(mut self, traversal: Traversal) -> Self {
        self.nest(&traversal);
        self.push(StepKind::Where {
            traversal: Box::new(traversal),
            negate: true,
        })
    }

    pub fn dedup(self) -> Self {
        self.push(StepKind::Dedup)
    }

    /// Keep positions `low..high`, counting bulk.
    pub fn range(self, low: u64, high: u64) -> Self {
        self.push(StepKind::Range {
            low,
            high: Some(high),
        })
    }

    pub fn limit(self, n: u64) -> Self {
        self.range(0, n)
    }

    pub fn skip(self, n: u64) -> Self {
        self.push(StepKind::Range { low: n, high: None })
    }

    pub fn simple_path(self) -> Self {
        self.push(StepKind::SimplePath)
    }

    /// Append every value to the list side effect `key`.
    pub fn store(mut self, key: &str) -> Self {
        self.side_effects
            .register_if_absent(key, Value::List(Vec::new()), Arc::new(AppendReducer));
        self.push(StepKind::Store(key.to_string()))
    }

    /// Count values into the map side effect `key`; use `by` to count a property.
    pub fn group_count_into(mut self, key: &str) -> Self {
        self.side_effects
            .register_if_absent(key, Value::Map(BTreeMap::new()), Arc::new(MapSumReducer));
        self.push(StepKind::GroupCountSideEffect {
            key: key.to_string(),
            by: None,
        })
    }

    pub fn side_effect<F>(self, f: F) -> Self
    where
        F: Fn(&Traverser) -> Result<()> + Send + Sync + 'static,
    {
        self.push(StepKind::SideEffect(Lambda(Arc::new(f))))
    }

    /// Add an edge from (and to) the current vertex; see `from_` and `to`.
    pub fn add_e(self, label: &str) -> Self {
        self.push(StepKind::AddEdge {
            label: label.to_string(),
            from: None,
            to: None,
            properties: BTreeMap::new(),
        })
    }

    /// Out vertex of the edge being added: the path value labeled `label`.
    pub fn from_(self, label: &str) -> Self {
        self.modulate("from", |kind| match kind {
            StepKind::AddEdge { from, .. } => {
                *from = Some(label.to_string());
                true
            }
            _ => false,
        })
    }

    /// In vertex of the edge being added: the path value labeled `label`.
    pub fn to(self, label: &str) -> Self {
        self.modulate("to", |kind| match kind {
            StepKind::AddEdge { to, .. } => {
                *to = Some(label.to_string());
                true
            }
            _ => false,
        })
    }

    /// Property of the edge being added.
    pub fn property(self, key: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.modulate("property", |kind| match kind {
            StepKind::AddEdge { properties, .. } => {
                properties.insert(key.to_string(), value);
                true
            }
            _ => false,
        })
    }

    pub fn union(mut self, branches: Vec<Traversal>) -> Self {
        for branch in &branches {
            self.nest(branch);
        }
        self.push(StepKind::Union(branches))
    }

    /// Route each traverser into `true_branch` when `condition` yields
    /// anything, else into `false_branch`.
    pub fn choose(mut self, condition: Traversal, true_branch: Traversal, false_branch: Traversal) -> Self {
        for nested in [&condition, &true_branch, &false_branch] {
            self.nest(nested);
        }
        self.push(StepKind::Choose {
            condition: Box::new(condition),
            true_branch: Box::new(true_branch),
            false_branch: Box::new(false_branch),
        })
    }

    /// Sort ascending by value; modulate with `by` and `desc`.
    pub fn order(self) -> Self {
        self.push(StepKind::Order {
            by: None,
            descending: false,
        })
    }

    /// Key the preceding `order`, `group_count` or `group_count_into` by a property.
    pub fn by(self, key: &str) -> Self {
        self.modulate("by", |kind| match kind {
            StepKind::Order { by, .. }
            | StepKind::GroupCount { by }
            | StepKind::GroupCountSideEffect { by, .. } => {
                *by = Some(key.to_string());
                true
            }
            _ => false,
        })
    }

    /// Reverse the preceding `order`.
    pub fn desc(self) -> Self {
        self.modulate("desc", |kind| match kind {
            StepKind::Order { descending, .. } => {
                *descending = true;
                true
            }
            _ => false,
        })
    }

    pub fn count(self) -> Self {
        self.push(StepKind::Count)
    }

    pub fn fold(self) -> Self {
        self.push(StepKind::Fold)
    }

    pub fn sum(self) -> Self {
        self.push(StepKind::Sum)
    }

    pub fn group_count(self) -> Self {
        self.push(StepKind::GroupCount { by: None })
    }

    /// Drain upstream into the list side effect `key`, then pass everything on.
    pub fn aggregate(mut self, key: &str) -> Self {
        self.side_effects
            .register_if_absent(key, Value::List(Vec::new()), Arc::new(AppendReducer));
        self.push(StepKind::Aggregate(key.to_string()))
    }

    /// Drain upstream and merge equal traversers by bulk.
    pub fn barrier(self) -> Self {
        self.push(StepKind::Barrier)
    }

    pub fn cap(self, keys: &[&str]) -> Self {
        self.push(StepKind::Cap(strings(keys)))
    }

    /// Loop `body`; modulate with `times`, `until`, `until_fn`, `emit` and `max_loops`.
    pub fn repeat(mut self, body: Traversal) -> Self {
        self.nest(&body);
        self.push(StepKind::Repeat {
            body: Box::new(body),
            until: None,
            emit: false,
            max_loops: None,
        })
    }

    pub fn times(self, n: u32) -> Self {
        self.modulate("times", |kind| match kind {
            StepKind::Repeat { until, .. } => {
                *until = Some(LoopCondition::Times(n));
                true
            }
            _ => false,
        })
    }

    /// Leave the loop once `condition` yields anything.
    pub fn until(mut self, condition: Traversal) -> Self {
        self.nest(&condition);
        self.modulate("until", |kind| match kind {
            StepKind::Repeat { until, .. } => {
                *until = Some(LoopCondition::Traversal(Box::new(condition)));
                true
            }
            _ => false,
        })
    }

    /// Leave the loop once `predicate` holds.
    pub fn until_fn<F>(self, predicate: F) -> Self
    where
        F: Fn(&Traverser) -> bool + Send + Sync + 'static,
    {
        self.modulate("until", |kind| match kind {
            StepKind::Repeat { until, .. } => {
                *until = Some(LoopCondition::Predicate(Lambda(Arc::new(predicate))));
                true
            }
            _ => false,
        })
    }

    /// Also emit every intermediate traverser of the loop.
    pub fn emit(self) -> Self {
        self.modulate("emit", |kind| match kind {
            StepKind::Repeat { emit, .. } => {
                *emit = true;
                true
            }
            _ => false,
        })
    }

    /// Bound this loop; traversers leave it after `n` iterations.
    pub fn max_loops(self, n: u32) -> Self {
        self.modulate("max_loops", |kind| match kind {
            StepKind::Repeat { max_loops, .. } => {
                *max_loops = Some(n);
                true
            }
            _ => false,
        })
    }

    pub fn identity(self) -> Self {
        self.push(StepKind::Identity)
    }

    /// Label the preceding step's output for `select`, `path` and `add_e`.
    pub fn as_(mut self, label: &str) -> Self {
        match self.steps.last_mut() {
            Some(step) => step.add_label(label),
            None => tracing::warn!(label, "as_() without a preceding step"),
        }
        self
    }
}

/// Anonymous traversals for nesting inside `where_`, `union`, `repeat` and friends.
#[allow(non_snake_case)]
pub mod __ {
    use super::*;

    /// An empty anonymous traversal.
    pub fn start() -> Traversal {
        Traversal::anonymous()
    }

    pub fn inject<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Traversal {
        start().push(StepKind::Inject(values.into_iter().map(Into::into).collect()))
    }

    pub fn identity() -> Traversal {
        start().identity()
    }

    pub fn out(labels: &[&str]) -> Traversal {
        start().out(labels)
    }

    pub fn in_(labels: &[&str]) -> Traversal {
        start().in_(labels)
    }

    pub fn both(labels: &[&str]) -> Traversal {
        start().both(labels)
    }

    pub fn out_e(labels: &[&str]) -> Traversal {
        start().out_e(labels)
    }

    pub fn in_v() -> Traversal {
        start().in_v()
    }

    pub fn values(keys: &[&str]) -> Traversal {
        start().values(keys)
    }

    pub fn label() -> Traversal {
        start().label()
    }

    pub fn constant(value: impl Into<Value>) -> Traversal {
        start().constant(value)
    }

    pub fn has(key: &str, predicate: P) -> Traversal {
        start().has(key, predicate)
    }

    pub fn has_label(label: &str) -> Traversal {
        start().has_label(label)
    }

    pub fn is(predicate: P) -> Traversal {
        start().is(predicate)
    }

    pub fn map<F>(f: F) -> Traversal
    where
        F: Fn(&Traverser) -> Result<Value> + Send + Sync + 'static,
    {
        start().map(f)
    }

    pub fn side_effect<F>(f: F) -> Traversal
    where
        F: Fn(&Traverser) -> Result<()> + Send + Sync + 'static,
    {
        start().side_effect(f)
    }

    pub fn simple_path() -> Traversal {
        start().simple_path()
    }

    pub fn store(key: &str) -> Traversal {
        start().store(key)
    }

    pub fn count() -> Traversal {
        start().count()
    }

    pub fn add_e(label: &str) -> Traversal {
        start().add_e(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphwalk_structure::tinker;

    fn g() -> GraphTraversalSource {
        GraphTraversalSource::new(Arc::new(tinker::modern().unwrap())).unwrap()
    }

    #[test]
    fn test_fluent_steps_render() {
        let t = g()
            .v()
            .has_label("person")
            .out_e(&["knows"])
            .in_v()
            .order()
            .by("age")
            .desc()
            .limit(1);
        assert_eq!(
            t.to_string(),
            "[VStep([],[]), HasStep([~label.eq(person)]), VertexStep(OUT,[knows],edge), \
             EdgeVertexStep(IN), OrderStep(age,desc), RangeStep(0,1)]"
        );
    }

    #[test]
    fn test_nested_side_effects_are_registered_on_parent() {
        let t = g().v().union(vec![__::store("a"), __::out(&[]).store("b")]);
        assert!(t.side_effects().contains("a"));
        assert!(t.side_effects().contains("b"));
    }

    #[test]
    fn test_misplaced_modulator_is_ignored() {
        let t = g().v().times(3).desc();
        assert_eq!(t.steps().len(), 1);
    }

    #[test]
    fn test_source_settings_reach_traversals() {
        let t = g().with_path().inject([1]);
        assert!(t.path_tracking());
        assert!(t.is_root());
        let config = TraversalConfig {
            max_loops: Some(4),
            path_tracking: false,
        };
        assert_eq!(g().with_config(config).v().loop_limit(), Some(4));
    }
}
