//! Pull-based execution of steps.
//!
//! [`pull`] asks the last step of a slice for its next traverser; that step
//! pulls from the slice in front of it, and so on, down to the traversal's
//! injected starts. Each step buffers its outputs in `pending` and refills
//! it through `advance`, which consumes as little upstream as it can.

use super::{HasContainer, LoopCondition, Step, StepKind};
use crate::error::{ProcessError, Result};
use crate::traversal::{ExecutionContext, Traversal};
use crate::traverser::{Traverser, TraverserSet};
use graphwalk_structure::{Direction, EdgeId, Graph, Value, VertexId};
use std::collections::{BTreeMap, VecDeque};

/// Next traverser produced by the last step of `steps`.
///
/// With no steps left, traversers come from `starts`.
pub(crate) fn pull(
    steps: &mut [Step],
    starts: &mut VecDeque<Traverser>,
    ctx: &mut ExecutionContext<'_>,
) -> Result<Option<Traverser>> {
    match steps.split_last_mut() {
        None => Ok(starts.pop_front()),
        Some((step, upstream)) => step.next(
            &mut Upstream {
                steps: upstream,
                starts,
            },
            ctx,
        ),
    }
}

/// Everything in front of a step.
pub(crate) struct Upstream<'s> {
    steps: &'s mut [Step],
    starts: &'s mut VecDeque<Traverser>,
}

impl Upstream<'_> {
    fn next(&mut self, ctx: &mut ExecutionContext<'_>) -> Result<Option<Traverser>> {
        pull(self.steps, self.starts, ctx)
    }

    fn drain(&mut self, ctx: &mut ExecutionContext<'_>) -> Result<Vec<Traverser>> {
        let mut all = Vec::new();
        while let Some(t) = self.next(ctx)? {
            all.push(t);
        }
        Ok(all)
    }
}

fn expect_vertex(t: &Traverser, step: &str) -> Result<VertexId> {
    t.get().as_vertex().ok_or_else(|| {
        ProcessError::execution(format!("{} expects a vertex, found {}", step, t.get()))
    })
}

fn expect_edge(t: &Traverser, step: &str) -> Result<EdgeId> {
    t.get().as_edge().ok_or_else(|| {
        ProcessError::execution(format!("{} expects an edge, found {}", step, t.get()))
    })
}

fn has_all(containers: &[HasContainer], graph: &dyn Graph, value: &Value) -> Result<bool> {
    for container in containers {
        if !container.test(graph, value)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Vertex ids a `V` step starts from, answered by an index when possible.
fn source_vertices(ids: &[VertexId], has: &[HasContainer], graph: &dyn Graph) -> Vec<VertexId> {
    if !ids.is_empty() {
        return ids
            .iter()
            .copied()
            .filter(|id| graph.contains_vertex(*id))
            .collect();
    }
    for container in has {
        if let (super::HasKey::Property(key), Some(value)) =
            (&container.key, container.predicate.index_value())
        {
            if let Some(found) = graph.lookup_vertices(key, value) {
                tracing::debug!(key = %key, hits = found.len(), "Answered has() from index");
                return found;
            }
        }
    }
    graph.vertex_ids()
}

/// Property of an element, or entry of a map, used as a sort/group key.
fn by_key(graph: &dyn Graph, value: &Value, key: &Option<String>) -> Result<Value> {
    let Some(key) = key else {
        return Ok(value.clone());
    };
    let found = match value {
        Value::Vertex(id) => graph.vertex_property(*id, key)?,
        Value::Edge(id) => graph.edge_property(*id, key)?,
        Value::Map(map) => map.get(&Value::from(key.as_str())).cloned(),
        _ => None,
    };
    Ok(found.unwrap_or(Value::Null))
}

fn repeated(value: &Value, bulk: u64) -> Value {
    Value::List(std::iter::repeat(value.clone()).take(bulk as usize).collect())
}

impl Step {
    /// Next output of this step.
    pub(crate) fn next(
        &mut self,
        upstream: &mut Upstream<'_>,
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<Option<Traverser>> {
        loop {
            if let Some(mut t) = self.pending.pop_front() {
                if !self.labels.is_empty() {
                    t.add_labels(&self.labels);
                }
                return Ok(Some(t));
            }
            let more = self
                .advance(upstream, ctx)
                .map_err(|e| e.in_step(self.kind.name()))?;
            if !more && self.pending.is_empty() {
                return Ok(None);
            }
        }
    }

    /// Push zero or more outputs into `pending`.
    ///
    /// Returns `false` once the step can produce nothing more.
    fn advance(&mut self, upstream: &mut Upstream<'_>, ctx: &mut ExecutionContext<'_>) -> Result<bool> {
        let Step {
            kind,
            state,
            pending,
            ..
        } = self;
        let graph = ctx.graph;
        let name = kind.name();

        match kind {
            StepKind::V { ids, has } => {
                if !state.started {
                    state.started = true;
                    state.sources = source_vertices(ids, has, graph)
                        .into_iter()
                        .map(Value::Vertex)
                        .collect();
                }
                while let Some(value) = state.sources.pop_front() {
                    if has_all(has, graph, &value)? {
                        pending.push_back(ctx.start(value));
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            StepKind::E { ids, has } => {
                if !state.started {
                    state.started = true;
                    let edges = if ids.is_empty() {
                        graph.edge_ids()
                    } else {
                        ids.clone()
                    };
                    state.sources = edges.into_iter().map(Value::Edge).collect();
                }
                while let Some(value) = state.sources.pop_front() {
                    if has_all(has, graph, &value)? {
                        pending.push_back(ctx.start(value));
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            StepKind::Inject(values) => {
                if !state.started {
                    state.started = true;
                    state.sources = values.iter().cloned().collect();
                }
                if let Some(value) = state.sources.pop_front() {
                    pending.push_back(ctx.start(value));
                    return Ok(true);
                }
                match upstream.next(ctx)? {
                    Some(t) => {
                        pending.push_back(t);
                        Ok(true)
                    }
                    None => Ok(false),
                }
            }

            StepKind::Vertex {
                direction,
                edge_labels,
                to_edges,
            } => {
                let Some(t) = upstream.next(ctx)? else {
                    return Ok(false);
                };
                let id = expect_vertex(&t, name)?;
                if *to_edges {
                    for edge in graph.incident_edges(id, *direction, edge_labels)? {
                        pending.push_back(t.split(Value::Edge(edge)));
                    }
                } else {
                    for vertex in graph.adjacent_vertices(id, *direction, edge_labels)? {
                        pending.push_back(t.split(Value::Vertex(vertex)));
                    }
                }
                Ok(true)
            }
            StepKind::EdgeVertex(direction) => {
                let Some(t) = upstream.next(ctx)? else {
                    return Ok(false);
                };
                let (out_vertex, in_vertex) = graph.edge_vertices(expect_edge(&t, name)?)?;
                if matches!(direction, Direction::Out | Direction::Both) {
                    pending.push_back(t.split(Value::Vertex(out_vertex)));
                }
                if matches!(direction, Direction::In | Direction::Both) {
                    pending.push_back(t.split(Value::Vertex(in_vertex)));
                }
                Ok(true)
            }
            StepKind::Values(keys) => {
                let Some(t) = upstream.next(ctx)? else {
                    return Ok(false);
                };
                let properties = match t.get() {
                    Value::Vertex(id) => graph.vertex(*id)?.properties().clone(),
                    Value::Edge(id) => graph.edge(*id)?.properties().clone(),
                    Value::Map(map) => map
                        .iter()
                        .filter_map(|(k, v)| k.as_str().map(|k| (k.to_string(), v.clone())))
                        .collect(),
                    other => {
                        return Err(ProcessError::execution(format!(
                            "{} expects an element or a map, found {}",
                            name, other
                        )))
                    }
                };
                if keys.is_empty() {
                    for value in properties.into_values() {
                        pending.push_back(t.split(value));
                    }
                } else {
                    for key in keys.iter() {
                        if let Some(value) = properties.get(key) {
                            pending.push_back(t.split(value.clone()));
                        }
                    }
                }
                Ok(true)
            }
            StepKind::Id => {
                let Some(t) = upstream.next(ctx)? else {
                    return Ok(false);
                };
                let id = match t.get() {
                    Value::Vertex(id) => id.as_u64(),
                    Value::Edge(id) => id.as_u64(),
                    other => {
                        return Err(ProcessError::execution(format!(
                            "{} expects an element, found {}",
                            name, other
                        )))
                    }
                };
                pending.push_back(t.split(Value::saturating_int(id)));
                Ok(true)
            }
            StepKind::Label => {
                let Some(t) = upstream.next(ctx)? else {
                    return Ok(false);
                };
                let label = match t.get() {
                    Value::Vertex(id) => graph.vertex_label(*id)?,
                    Value::Edge(id) => graph.edge_label(*id)?,
                    other => {
                        return Err(ProcessError::execution(format!(
                            "{} expects an element, found {}",
                            name, other
                        )))
                    }
                };
                pending.push_back(t.split(Value::String(label)));
                Ok(true)
            }
            StepKind::Constant(value) => {
                let Some(t) = upstream.next(ctx)? else {
                    return Ok(false);
                };
                pending.push_back(t.split(value.clone()));
                Ok(true)
            }
            StepKind::Map(f) => {
                let Some(t) = upstream.next(ctx)? else {
                    return Ok(false);
                };
                let value = (f.0)(&t)?;
                pending.push_back(t.split(value));
                Ok(true)
            }
            StepKind::FlatMap(f) => {
                let Some(t) = upstream.next(ctx)? else {
                    return Ok(false);
                };
                for value in (f.0)(&t)? {
                    pending.push_back(t.split(value));
                }
                Ok(true)
            }
            StepKind::Path => {
                let Some(t) = upstream.next(ctx)? else {
                    return Ok(false);
                };
                let objects = t.path()?.objects();
                pending.push_back(t.split(Value::List(objects)));
                Ok(true)
            }
            StepKind::Select(labels) => {
                let Some(t) = upstream.next(ctx)? else {
                    return Ok(false);
                };
                let path = t.path()?;
                if let [label] = labels.as_slice() {
                    if let Some(value) = path.get(label) {
                        let value = value.clone();
                        pending.push_back(t.split(value));
                    }
                } else {
                    let selected: Option<BTreeMap<Value, Value>> = labels
                        .iter()
                        .map(|l| path.get(l).map(|v| (Value::from(l.as_str()), v.clone())))
                        .collect();
                    if let Some(map) = selected {
                        pending.push_back(t.split(Value::Map(map)));
                    }
                }
                Ok(true)
            }

            StepKind::Has(containers) => {
                let Some(t) = upstream.next(ctx)? else {
                    return Ok(false);
                };
                if has_all(containers, graph, t.get())? {
                    pending.push_back(t);
                }
                Ok(true)
            }
            StepKind::Is(predicate) => {
                let Some(t) = upstream.next(ctx)? else {
                    return Ok(false);
                };
                if predicate.test(t.get()) {
                    pending.push_back(t);
                }
                Ok(true)
            }
            StepKind::Filter(f) => {
                let Some(t) = upstream.next(ctx)? else {
                    return Ok(false);
                };
                if (f.0)(&t)? {
                    pending.push_back(t);
                }
                Ok(true)
            }
            StepKind::Where { traversal, negate } => {
                let Some(t) = upstream.next(ctx)? else {
                    return Ok(false);
                };
                if traversal.test(&t, ctx)? != *negate {
                    pending.push_back(t);
                }
                Ok(true)
            }
            StepKind::Dedup => {
                let Some(mut t) = upstream.next(ctx)? else {
                    return Ok(false);
                };
                if state.seen.insert(t.get().clone()) {
                    t.set_bulk(1);
                    pending.push_back(t);
                }
                Ok(true)
            }
            StepKind::Range { low, high } => {
                if high.map_or(false, |high| state.counter >= high) {
                    return Ok(false);
                }
                let Some(mut t) = upstream.next(ctx)? else {
                    return Ok(false);
                };
                let start = state.counter;
                let end = start + t.bulk();
                state.counter = end;
                let from = start.max(*low);
                let to = high.map_or(end, |high| end.min(high));
                if from < to {
                    t.set_bulk(to - from);
                    pending.push_back(t);
                }
                Ok(true)
            }
            StepKind::SimplePath => {
                let Some(t) = upstream.next(ctx)? else {
                    return Ok(false);
                };
                if t.path()?.is_simple() {
                    pending.push_back(t);
                }
                Ok(true)
            }

            StepKind::Store(key) => {
                let Some(t) = upstream.next(ctx)? else {
                    return Ok(false);
                };
                ctx.side_effects.add(key, repeated(t.get(), t.bulk()))?;
                pending.push_back(t);
                Ok(true)
            }
            StepKind::GroupCountSideEffect { key, by } => {
                let Some(t) = upstream.next(ctx)? else {
                    return Ok(false);
                };
                let group = by_key(graph, t.get(), by)?;
                let update = Value::Map([(group, Value::saturating_int(t.bulk()))].into_iter().collect());
                ctx.side_effects.add(key, update)?;
                pending.push_back(t);
                Ok(true)
            }
            StepKind::SideEffect(f) => {
                let Some(t) = upstream.next(ctx)? else {
                    return Ok(false);
                };
                (f.0)(&t)?;
                pending.push_back(t);
                Ok(true)
            }
            StepKind::AddEdge {
                label,
                from,
                to,
                properties,
            } => {
                let Some(t) = upstream.next(ctx)? else {
                    return Ok(false);
                };
                let features = graph.features();
                if features.require_add_edges().is_err() {
                    tracing::warn!(step = name, "Graph does not support adding edges");
                    return Err(ProcessError::unsupported_feature("add_edges", name));
                }
                if features.graph.supports_transactions {
                    graph.tx().read_write()?;
                }
                let current = expect_vertex(&t, name)?;
                let endpoint = |label: &Option<String>| -> Result<VertexId> {
                    match label {
                        None => Ok(current),
                        Some(label) => t
                            .path()?
                            .get(label)
                            .and_then(Value::as_vertex)
                            .ok_or_else(|| ProcessError::UnknownPathLabel(label.clone())),
                    }
                };
                let out_vertex = endpoint(from)?;
                let in_vertex = endpoint(to)?;
                let edge = graph.add_edge(out_vertex, label, in_vertex, properties.clone())?;
                pending.push_back(t.split(Value::Edge(edge)));
                Ok(true)
            }

            StepKind::Union(branches) => {
                if !state.started && branches.iter().any(|b| b.has_barrier()) {
                    state.started = true;
                    for t in upstream.drain(ctx)? {
                        for branch in branches.iter_mut() {
                            branch.add_start(t.clone());
                        }
                    }
                }
                loop {
                    for branch in branches.iter_mut() {
                        if let Some(t) = branch.next_nested(ctx)? {
                            pending.push_back(t);
                            return Ok(true);
                        }
                    }
                    let Some(t) = upstream.next(ctx)? else {
                        return Ok(false);
                    };
                    for branch in branches.iter_mut() {
                        branch.add_start(t.clone());
                    }
                }
            }
            StepKind::Choose {
                condition,
                true_branch,
                false_branch,
            } => {
                if !state.started && (true_branch.has_barrier() || false_branch.has_barrier()) {
                    state.started = true;
                    for t in upstream.drain(ctx)? {
                        if condition.test(&t, ctx)? {
                            true_branch.add_start(t);
                        } else {
                            false_branch.add_start(t);
                        }
                    }
                }
                loop {
                    if let Some(t) = true_branch.next_nested(ctx)? {
                        pending.push_back(t);
                        return Ok(true);
                    }
                    if let Some(t) = false_branch.next_nested(ctx)? {
                        pending.push_back(t);
                        return Ok(true);
                    }
                    let Some(t) = upstream.next(ctx)? else {
                        return Ok(false);
                    };
                    if condition.test(&t, ctx)? {
                        true_branch.add_start(t);
                    } else {
                        false_branch.add_start(t);
                    }
                }
            }

            StepKind::Order { by, descending } => {
                if state.started {
                    return Ok(false);
                }
                state.started = true;
                let mut keyed = Vec::new();
                for t in upstream.drain(ctx)?.into_iter().collect::<TraverserSet>() {
                    keyed.push((by_key(graph, t.get(), by)?, t));
                }
                keyed.sort_by(|(a, _), (b, _)| {
                    let ord = a.compare(b).unwrap_or_else(|| a.cmp(b));
                    if *descending {
                        ord.reverse()
                    } else {
                        ord
                    }
                });
                pending.extend(keyed.into_iter().map(|(_, t)| t));
                Ok(true)
            }
            StepKind::Count => {
                if state.started {
                    return Ok(false);
                }
                state.started = true;
                let count: u64 = upstream.drain(ctx)?.iter().map(Traverser::bulk).sum();
                pending.push_back(ctx.start(Value::saturating_int(count)));
                Ok(true)
            }
            StepKind::Fold => {
                if state.started {
                    return Ok(false);
                }
                state.started = true;
                let mut items = Vec::new();
                for t in upstream.drain(ctx)? {
                    for _ in 0..t.bulk() {
                        items.push(t.get().clone());
                    }
                }
                pending.push_back(ctx.start(Value::List(items)));
                Ok(true)
            }
            StepKind::Sum => {
                if state.started {
                    return Ok(false);
                }
                state.started = true;
                let mut total: Option<Value> = None;
                for t in upstream.drain(ctx)? {
                    let weighted = t.get().scale(t.bulk()).ok_or_else(|| {
                        ProcessError::execution(format!("{} expects numbers, found {}", name, t.get()))
                    })?;
                    total = Some(match total {
                        None => weighted,
                        Some(acc) => acc.add_numeric(&weighted).ok_or_else(|| {
                            ProcessError::execution(format!("{} cannot add {}", name, weighted))
                        })?,
                    });
                }
                if let Some(total) = total {
                    pending.push_back(ctx.start(total));
                }
                Ok(true)
            }
            StepKind::GroupCount { by } => {
                if state.started {
                    return Ok(false);
                }
                state.started = true;
                let mut groups: BTreeMap<Value, Value> = BTreeMap::new();
                for t in upstream.drain(ctx)? {
                    let group = by_key(graph, t.get(), by)?;
                    let count = groups.entry(group).or_insert(Value::Int(0));
                    *count = count
                        .add_numeric(&Value::saturating_int(t.bulk()))
                        .unwrap_or(Value::Int(i64::MAX));
                }
                pending.push_back(ctx.start(Value::Map(groups)));
                Ok(true)
            }
            StepKind::Aggregate(key) => {
                if state.started {
                    return Ok(false);
                }
                state.started = true;
                let all = upstream.drain(ctx)?;
                for t in &all {
                    ctx.side_effects.add(key, repeated(t.get(), t.bulk()))?;
                }
                pending.extend(all);
                Ok(true)
            }
            StepKind::Barrier => {
                if state.started {
                    return Ok(false);
                }
                state.started = true;
                let merged: TraverserSet = upstream.drain(ctx)?.into_iter().collect();
                pending.extend(merged);
                Ok(true)
            }
            StepKind::Cap(keys) => {
                if state.started {
                    return Ok(false);
                }
                state.started = true;
                upstream.drain(ctx)?;
                let value = match keys.as_slice() {
                    [key] => ctx.side_effects.get(key)?.clone(),
                    _ => {
                        let mut map = BTreeMap::new();
                        for key in keys.iter() {
                            map.insert(Value::from(key.as_str()), ctx.side_effects.get(key)?.clone());
                        }
                        Value::Map(map)
                    }
                };
                pending.push_back(ctx.start(value));
                Ok(true)
            }

            StepKind::Repeat {
                body,
                until,
                emit,
                max_loops,
            } => {
                let bound = max_loops.or(ctx.max_loops);
                if body.has_barrier() {
                    if state.started {
                        return Ok(false);
                    }
                    state.started = true;
                    let starts = upstream.drain(ctx)?;
                    repeat_in_rounds(body, until, *emit, bound, starts, pending, ctx)?;
                    return Ok(true);
                }
                loop {
                    if let Some(mut t) = body.next_nested(ctx)? {
                        t.incr_loops();
                        if loop_done(until, &t, ctx)? || bound.map_or(false, |max| t.loops() >= max) {
                            pending.push_back(t);
                            return Ok(true);
                        }
                        if *emit {
                            body.add_start(t.clone());
                            pending.push_back(t);
                            return Ok(true);
                        }
                        body.add_start(t);
                        continue;
                    }
                    let Some(mut t) = upstream.next(ctx)? else {
                        return Ok(false);
                    };
                    t.reset_loops();
                    body.add_start(t);
                }
            }

            StepKind::Identity => match upstream.next(ctx)? {
                Some(t) => {
                    pending.push_back(t);
                    Ok(true)
                }
                None => Ok(false),
            },
        }
    }
}

/// Whether a traverser that just left the loop body should exit the loop.
fn loop_done(
    until: &mut Option<LoopCondition>,
    t: &Traverser,
    ctx: &mut ExecutionContext<'_>,
) -> Result<bool> {
    Ok(match until {
        None => false,
        Some(LoopCondition::Times(n)) => t.loops() >= *n,
        Some(LoopCondition::Predicate(p)) => (p.0)(t),
        Some(LoopCondition::Traversal(cond)) => cond.test(t, ctx)?,
    })
}

/// Run a loop whose body holds a barrier one round at a time.
///
/// Each round feeds the whole frontier to a freshly reset body and drains
/// it, so the barrier sees every traverser of the round. Traversers that
/// keep looping form the next frontier.
fn repeat_in_rounds(
    body: &mut Traversal,
    until: &mut Option<LoopCondition>,
    emit: bool,
    bound: Option<u32>,
    starts: Vec<Traverser>,
    pending: &mut VecDeque<Traverser>,
    ctx: &mut ExecutionContext<'_>,
) -> Result<()> {
    let mut frontier: Vec<Traverser> = starts
        .into_iter()
        .map(|mut t| {
            t.reset_loops();
            t
        })
        .collect();
    while !frontier.is_empty() {
        body.reset();
        body.add_starts(frontier.drain(..));
        let mut round = Vec::new();
        while let Some(t) = body.next_nested(ctx)? {
            round.push(t);
        }
        for mut t in round {
            t.incr_loops();
            if loop_done(until, &t, ctx)? || bound.map_or(false, |max| t.loops() >= max) {
                pending.push_back(t);
            } else {
                if emit {
                    pending.push_back(t.clone());
                }
                frontier.push(t);
            }
        }
    }
    body.reset();
    Ok(())
}
