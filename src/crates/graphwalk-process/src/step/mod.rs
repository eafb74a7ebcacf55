//! Steps: the stages of a traversal pipeline.
//!
//! A [`Step`] pairs a [`StepKind`] (what the step does, plain configuration
//! that strategies can inspect and rewrite) with its execution state. Steps
//! are pulled lazily: each call asks the upstream step for exactly as many
//! traversers as it needs, except barrier steps, which drain their upstream
//! completely before emitting anything.
//!
//! # Step families
//!
//! | Family | Kinds |
//! |---|---|
//! | source | `V`, `E`, `Inject` |
//! | map | `Vertex`, `EdgeVertex`, `Values`, `Id`, `Label`, `Constant`, `Map`, `FlatMap`, `Path`, `Select` |
//! | filter | `Has`, `Is`, `Filter`, `Where`, `Dedup`, `Range`, `SimplePath` |
//! | side effect | `Store`, `GroupCountSideEffect`, `SideEffect`, `AddEdge` |
//! | branch | `Union`, `Choose` |
//! | barrier | `Order`, `Count`, `Fold`, `Sum`, `GroupCount`, `Aggregate`, `Barrier`, `Cap` |
//! | loop | `Repeat` |
//!
//! Branch and loop steps own their nested traversals by value.

mod execute;

pub(crate) use execute::{pull, Upstream};

use crate::error::Result;
use crate::predicate::P;
use crate::traversal::Traversal;
use crate::traverser::Traverser;
use graphwalk_structure::{Direction, EdgeId, Graph, Properties, Value, VertexId};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

/// A user-supplied closure stored in a step.
pub struct Lambda<F: ?Sized>(pub(crate) Arc<F>);

impl<F: ?Sized> Clone for Lambda<F> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<F: ?Sized> fmt::Debug for Lambda<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<lambda>")
    }
}

pub type MapFn = Lambda<dyn Fn(&Traverser) -> Result<Value> + Send + Sync>;
pub type FlatMapFn = Lambda<dyn Fn(&Traverser) -> Result<Vec<Value>> + Send + Sync>;
pub type FilterFn = Lambda<dyn Fn(&Traverser) -> Result<bool> + Send + Sync>;
pub type SideEffectFn = Lambda<dyn Fn(&Traverser) -> Result<()> + Send + Sync>;
pub type LoopPredicate = Lambda<dyn Fn(&Traverser) -> bool + Send + Sync>;

/// What a [`HasContainer`] looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HasKey {
    Id,
    Label,
    Property(String),
}

/// A `(key, predicate)` filter over elements.
#[derive(Debug, Clone, PartialEq)]
pub struct HasContainer {
    pub key: HasKey,
    pub predicate: P,
}

impl HasContainer {
    pub fn new(key: HasKey, predicate: P) -> Self {
        Self { key, predicate }
    }

    pub fn property(key: impl Into<String>, predicate: P) -> Self {
        Self::new(HasKey::Property(key.into()), predicate)
    }

    /// Test an element (or a map, by string key) against this container.
    ///
    /// Missing properties and non-element values never match.
    pub fn test(&self, graph: &dyn Graph, value: &Value) -> Result<bool> {
        let resolved = match (&self.key, value) {
            (HasKey::Id, Value::Vertex(id)) => Some(Value::saturating_int(id.as_u64())),
            (HasKey::Id, Value::Edge(id)) => Some(Value::saturating_int(id.as_u64())),
            (HasKey::Label, Value::Vertex(id)) => Some(Value::String(graph.vertex_label(*id)?)),
            (HasKey::Label, Value::Edge(id)) => Some(Value::String(graph.edge_label(*id)?)),
            (HasKey::Property(key), Value::Vertex(id)) => graph.vertex_property(*id, key)?,
            (HasKey::Property(key), Value::Edge(id)) => graph.edge_property(*id, key)?,
            (HasKey::Property(key), Value::Map(map)) => map.get(&Value::from(key.as_str())).cloned(),
            _ => None,
        };
        Ok(resolved.map_or(false, |v| self.predicate.test(&v)))
    }
}

impl fmt::Display for HasContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            HasKey::Id => write!(f, "~id.{}", self.predicate),
            HasKey::Label => write!(f, "~label.{}", self.predicate),
            HasKey::Property(key) => write!(f, "{}.{}", key, self.predicate),
        }
    }
}

/// Break condition of a `repeat` step.
#[derive(Debug, Clone)]
pub enum LoopCondition {
    /// Stop once the traverser has looped this many times
    Times(u32),
    /// Stop when the predicate holds
    Predicate(LoopPredicate),
    /// Stop when the traversal produces at least one result
    Traversal(Box<Traversal>),
}

/// The kind of a step and its configuration.
#[derive(Debug, Clone)]
pub enum StepKind {
    /// Vertices by id (all when `ids` is empty), filtered by folded `has` containers
    V { ids: Vec<VertexId>, has: Vec<HasContainer> },
    /// Edges by id (all when `ids` is empty)
    E { ids: Vec<EdgeId>, has: Vec<HasContainer> },
    /// Literal values, followed by whatever upstream produces
    Inject(Vec<Value>),
    /// Adjacent vertices, or incident edges when `to_edges` is set
    Vertex {
        direction: Direction,
        edge_labels: Vec<String>,
        to_edges: bool,
    },
    /// Endpoint vertices of an edge
    EdgeVertex(Direction),
    /// Property values (all properties when `keys` is empty)
    Values(Vec<String>),
    Id,
    Label,
    Constant(Value),
    Map(MapFn),
    FlatMap(FlatMapFn),
    /// The traverser's path as a list
    Path,
    /// Path values by label; a single label yields the value, several a map
    Select(Vec<String>),
    Has(Vec<HasContainer>),
    Is(P),
    Filter(FilterFn),
    /// Keep traversers for which `traversal` yields something (or nothing, when negated)
    Where {
        traversal: Box<Traversal>,
        negate: bool,
    },
    Dedup,
    /// Keep the traversers in positions `low..high`, counting bulk
    Range { low: u64, high: Option<u64> },
    SimplePath,
    /// Append values to a list side effect
    Store(String),
    /// Count values (or a property of them) into a map side effect
    GroupCountSideEffect { key: String, by: Option<String> },
    SideEffect(SideEffectFn),
    /// Add an edge; endpoints default to the current vertex, or name a path label
    AddEdge {
        label: String,
        from: Option<String>,
        to: Option<String>,
        properties: Properties,
    },
    Union(Vec<Traversal>),
    Choose {
        condition: Box<Traversal>,
        true_branch: Box<Traversal>,
        false_branch: Box<Traversal>,
    },
    Order { by: Option<String>, descending: bool },
    Count,
    Fold,
    Sum,
    GroupCount { by: Option<String> },
    /// Store every value into a list side effect, then pass them all on
    Aggregate(String),
    /// Collapse equal traversers into one by bulk
    Barrier,
    /// Emit side-effect values
    Cap(Vec<String>),
    Repeat {
        body: Box<Traversal>,
        until: Option<LoopCondition>,
        emit: bool,
        max_loops: Option<u32>,
    },
    Identity,
}

impl StepKind {
    /// Step name used in logs, errors and strategy checks.
    pub fn name(&self) -> &'static str {
        match self {
            Self::V { .. } => "VStep",
            Self::E { .. } => "EStep",
            Self::Inject(_) => "InjectStep",
            Self::Vertex { .. } => "VertexStep",
            Self::EdgeVertex(_) => "EdgeVertexStep",
            Self::Values(_) => "ValuesStep",
            Self::Id => "IdStep",
            Self::Label => "LabelStep",
            Self::Constant(_) => "ConstantStep",
            Self::Map(_) => "MapStep",
            Self::FlatMap(_) => "FlatMapStep",
            Self::Path => "PathStep",
            Self::Select(_) => "SelectStep",
            Self::Has(_) => "HasStep",
            Self::Is(_) => "IsStep",
            Self::Filter(_) => "FilterStep",
            Self::Where { .. } => "WhereStep",
            Self::Dedup => "DedupStep",
            Self::Range { .. } => "RangeStep",
            Self::SimplePath => "SimplePathStep",
            Self::Store(_) => "StoreStep",
            Self::GroupCountSideEffect { .. } => "GroupCountSideEffectStep",
            Self::SideEffect(_) => "SideEffectStep",
            Self::AddEdge { .. } => "AddEdgeStep",
            Self::Union(_) => "UnionStep",
            Self::Choose { .. } => "ChooseStep",
            Self::Order { .. } => "OrderStep",
            Self::Count => "CountStep",
            Self::Fold => "FoldStep",
            Self::Sum => "SumStep",
            Self::GroupCount { .. } => "GroupCountStep",
            Self::Aggregate(_) => "AggregateStep",
            Self::Barrier => "BarrierStep",
            Self::Cap(_) => "CapStep",
            Self::Repeat { .. } => "RepeatStep",
            Self::Identity => "IdentityStep",
        }
    }

    pub fn is_source(&self) -> bool {
        matches!(self, Self::V { .. } | Self::E { .. } | Self::Inject(_))
    }

    /// Barrier steps drain their upstream before emitting.
    pub fn is_barrier(&self) -> bool {
        matches!(
            self,
            Self::Order { .. }
                | Self::Count
                | Self::Fold
                | Self::Sum
                | Self::GroupCount { .. }
                | Self::Aggregate(_)
                | Self::Barrier
                | Self::Cap(_)
        )
    }

    /// Steps whose output values are graph elements.
    pub fn emits_elements(&self) -> bool {
        matches!(
            self,
            Self::V { .. } | Self::E { .. } | Self::Vertex { .. } | Self::EdgeVertex(_)
        )
    }

    /// Whether this step (not its nested traversals) reads traverser paths.
    pub fn requires_path(&self) -> bool {
        match self {
            Self::Path | Self::Select(_) | Self::SimplePath => true,
            Self::AddEdge { from, to, .. } => from.is_some() || to.is_some(),
            _ => false,
        }
    }

    /// Side-effect key written by this step, if any.
    pub fn side_effect_key(&self) -> Option<&str> {
        match self {
            Self::Store(key) | Self::Aggregate(key) => Some(key),
            Self::GroupCountSideEffect { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Traversals owned by this step.
    pub fn nested(&self) -> Vec<&Traversal> {
        match self {
            Self::Where { traversal, .. } => vec![traversal.as_ref()],
            Self::Union(branches) => branches.iter().collect(),
            Self::Choose {
                condition,
                true_branch,
                false_branch,
            } => vec![condition.as_ref(), true_branch.as_ref(), false_branch.as_ref()],
            Self::Repeat { body, until, .. } => {
                let mut nested = vec![body.as_ref()];
                if let Some(LoopCondition::Traversal(t)) = until {
                    nested.push(t.as_ref());
                }
                nested
            }
            _ => Vec::new(),
        }
    }

    pub fn nested_mut(&mut self) -> Vec<&mut Traversal> {
        match self {
            Self::Where { traversal, .. } => vec![traversal.as_mut()],
            Self::Union(branches) => branches.iter_mut().collect(),
            Self::Choose {
                condition,
                true_branch,
                false_branch,
            } => vec![condition.as_mut(), true_branch.as_mut(), false_branch.as_mut()],
            Self::Repeat { body, until, .. } => {
                let mut nested = vec![body.as_mut()];
                if let Some(LoopCondition::Traversal(t)) = until {
                    nested.push(t.as_mut());
                }
                nested
            }
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |items: &[String]| items.join(",");
        let name = self.name();
        match self {
            Self::V { ids, has } => {
                let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
                let has: Vec<String> = has.iter().map(ToString::to_string).collect();
                write!(f, "{}([{}],[{}])", name, join(&ids), join(&has))
            }
            Self::E { ids, has } => {
                let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
                let has: Vec<String> = has.iter().map(ToString::to_string).collect();
                write!(f, "{}([{}],[{}])", name, join(&ids), join(&has))
            }
            Self::Vertex {
                direction,
                edge_labels,
                to_edges,
            } => {
                let target = if *to_edges { "edge" } else { "vertex" };
                write!(f, "{}({},[{}],{})", name, direction, join(edge_labels), target)
            }
            Self::EdgeVertex(direction) => write!(f, "{}({})", name, direction),
            Self::Values(keys) | Self::Select(keys) | Self::Cap(keys) => {
                write!(f, "{}([{}])", name, join(keys))
            }
            Self::Constant(v) => write!(f, "{}({})", name, v),
            Self::Has(containers) => {
                let has: Vec<String> = containers.iter().map(ToString::to_string).collect();
                write!(f, "{}([{}])", name, join(&has))
            }
            Self::Is(p) => write!(f, "{}({})", name, p),
            Self::Range { low, high } => match high {
                Some(high) => write!(f, "{}({},{})", name, low, high),
                None => write!(f, "{}({},-1)", name, low),
            },
            Self::Store(key) | Self::Aggregate(key) => write!(f, "{}({})", name, key),
            Self::GroupCountSideEffect { key, .. } => write!(f, "{}({})", name, key),
            Self::AddEdge { label, .. } => write!(f, "{}({})", name, label),
            Self::Order { by, descending } => {
                let order = if *descending { "desc" } else { "asc" };
                match by {
                    Some(key) => write!(f, "{}({},{})", name, key, order),
                    None => write!(f, "{}({})", name, order),
                }
            }
            Self::Where { traversal, negate } => {
                write!(f, "{}({}{})", name, if *negate { "not," } else { "" }, traversal)
            }
            Self::Union(branches) => {
                let branches: Vec<String> = branches.iter().map(ToString::to_string).collect();
                write!(f, "{}({})", name, join(&branches))
            }
            Self::Choose {
                condition,
                true_branch,
                false_branch,
            } => write!(f, "{}({},{},{})", name, condition, true_branch, false_branch),
            Self::Repeat { body, emit, .. } => {
                write!(f, "{}({}{})", name, body, if *emit { ",emit" } else { "" })
            }
            _ => f.write_str(name),
        }
    }
}

/// Per-step execution state. Cleared by [`Step::reset`].
#[derive(Debug, Clone, Default)]
pub(crate) struct StepState {
    /// Source resolved or barrier drained
    pub(crate) started: bool,
    /// Values still to be emitted by a source step
    pub(crate) sources: VecDeque<Value>,
    /// Values seen by `Dedup`
    pub(crate) seen: HashSet<Value>,
    /// Objects consumed by `Range`
    pub(crate) counter: u64,
}

/// One stage of a traversal.
#[derive(Debug, Clone)]
pub struct Step {
    kind: StepKind,
    labels: Vec<String>,
    pub(crate) state: StepState,
    pub(crate) pending: VecDeque<Traverser>,
}

impl Step {
    pub fn new(kind: StepKind) -> Self {
        Self {
            kind,
            labels: Vec::new(),
            state: StepState::default(),
            pending: VecDeque::new(),
        }
    }

    pub fn kind(&self) -> &StepKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut StepKind {
        &mut self.kind
    }

    pub fn into_kind(self) -> StepKind {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Path labels attached to this step's output (`as_`).
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn add_label(&mut self, label: impl Into<String>) {
        let label = label.into();
        if !self.labels.contains(&label) {
            self.labels.push(label);
        }
    }

    /// Whether this step or any traversal nested in it reads paths.
    pub fn requires_path(&self) -> bool {
        self.kind.requires_path()
            || self
                .kind
                .nested()
                .iter()
                .any(|t| t.steps().iter().any(Step::requires_path))
    }

    /// Drop all execution state, including that of nested traversals.
    pub fn reset(&mut self) {
        self.state = StepState::default();
        self.pending.clear();
        for nested in self.kind.nested_mut() {
            nested.reset();
        }
    }
}

impl From<StepKind> for Step {
    fn from(kind: StepKind) -> Self {
        Self::new(kind)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if !self.labels.is_empty() {
            write!(f, "@[{}]", self.labels.join(","))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphwalk_structure::tinker;

    #[test]
    fn test_has_container_on_elements_and_maps() {
        let graph = tinker::modern().unwrap();
        let marko = Value::Vertex(VertexId::new(1));
        assert!(HasContainer::property("age", P::gt(28)).test(&graph, &marko).unwrap());
        assert!(!HasContainer::property("lang", P::eq("java")).test(&graph, &marko).unwrap());
        assert!(HasContainer::new(HasKey::Label, P::eq("person"))
            .test(&graph, &marko)
            .unwrap());
        assert!(HasContainer::new(HasKey::Id, P::within([1, 2]))
            .test(&graph, &marko)
            .unwrap());

        let map = Value::Map([(Value::from("k"), Value::Int(1))].into_iter().collect());
        assert!(HasContainer::property("k", P::eq(1)).test(&graph, &map).unwrap());
        assert!(!HasContainer::property("k", P::eq(1)).test(&graph, &Value::Int(1)).unwrap());
    }

    #[test]
    fn test_huge_ids_saturate_instead_of_wrapping() {
        let graph = tinker::TinkerGraph::new();
        let id = graph
            .add_vertex(Some(VertexId::new(u64::MAX)), "node", Properties::new())
            .unwrap();
        let vertex = Value::Vertex(id);
        assert!(HasContainer::new(HasKey::Id, P::eq(i64::MAX))
            .test(&graph, &vertex)
            .unwrap());
        assert!(!HasContainer::new(HasKey::Id, P::lt(0))
            .test(&graph, &vertex)
            .unwrap());
    }

    #[test]
    fn test_step_display() {
        let mut step = Step::new(StepKind::Vertex {
            direction: Direction::Out,
            edge_labels: vec!["knows".to_string()],
            to_edges: false,
        });
        step.add_label("a");
        assert_eq!(step.to_string(), "VertexStep(OUT,[knows],vertex)@[a]");
        assert_eq!(
            Step::new(StepKind::Range { low: 0, high: Some(2) }).to_string(),
            "RangeStep(0,2)"
        );
    }

    #[test]
    fn test_step_classification() {
        assert!(StepKind::Count.is_barrier());
        assert!(!StepKind::Dedup.is_barrier());
        assert!(StepKind::Select(vec!["a".to_string()]).requires_path());
        assert_eq!(StepKind::Store("x".to_string()).side_effect_key(), Some("x"));
        assert!(StepKind::EdgeVertex(Direction::In).emits_elements());
    }
}
