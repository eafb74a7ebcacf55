//! Traversal strategies: rewrite passes applied before execution.
//!
//! A [`TraversalStrategy`] mutates a traversal's step list in place. Each
//! strategy belongs to a [`StrategyCategory`] and may name other strategies
//! that must run before it (`apply_pre`) or after it (`apply_post`).
//! [`TraversalStrategies`] resolves those constraints into a single total
//! order when it is built, so the order is computed once per strategy set
//! rather than once per traversal.
//!
//! # Ordering
//!
//! ```text
//!   constraints (partial order)         application order (total)
//!
//!   IdentityRemoval ──┐
//!                     ├──▶ GraphStepIndex    Partition
//!   Partition ────────┘                      IdentityRemoval
//!                                            GraphStepIndex
//!   SideEffectCap                            PathRequirement
//!   PathRequirement                          SideEffectCap
//! ```
//!
//! Strategies with no pending constraint are taken lowest first by
//! `(category, id)`: decoration before optimization before finalization,
//! then by id. The order never depends on registration order. A cycle in
//! the constraints is reported as [`ProcessError::CyclicStrategies`] when
//! the set is built.
//!
//! # Shipped strategies
//!
//! | Strategy | Category | Effect |
//! |---|---|---|
//! | [`PartitionStrategy`] | decoration | filter elements by a partition key, tag new edges |
//! | [`IdentityRemovalStrategy`] | optimization | drop unlabeled identity steps |
//! | [`GraphStepIndexStrategy`] | optimization | fold `has` filters into the `V` source |
//! | [`SideEffectCapStrategy`] | finalization | cap a root traversal ending in a side effect |
//! | [`PathRequirementStrategy`] | finalization | turn on path tracking when a step needs it |
//! | [`ComputerVerificationStrategy`] | finalization | reject pipelines the graph computer cannot host |

mod decoration;
mod finalization;
mod optimization;

pub use decoration::PartitionStrategy;
pub use finalization::{
    ComputerVerificationStrategy, PathRequirementStrategy, SideEffectCapStrategy,
};
pub use optimization::{GraphStepIndexStrategy, IdentityRemovalStrategy};

use crate::error::{ProcessError, Result};
use crate::traversal::Traversal;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// Broad purpose of a strategy; also the first tie-break key when ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StrategyCategory {
    /// Adds steps that change what the traversal observes
    Decoration,
    /// Rewrites steps without changing results
    Optimization,
    /// Closing adjustments and verification
    Finalization,
}

/// Which engine a traversal is being prepared for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TraversalEngine {
    /// Lazy pull iteration
    #[default]
    Standard,
    /// Bulk-synchronous graph computer
    Computer,
}

/// A rewrite pass over a traversal.
pub trait TraversalStrategy: Send + Sync + fmt::Debug {
    /// Unique id, used by other strategies' ordering constraints
    fn id(&self) -> &str;

    fn category(&self) -> StrategyCategory;

    /// Ids of strategies that must run before this one
    fn apply_pre(&self) -> Vec<String> {
        Vec::new()
    }

    /// Ids of strategies that must run after this one
    fn apply_post(&self) -> Vec<String> {
        Vec::new()
    }

    /// Rewrite `traversal` in place.
    fn apply(&self, traversal: &mut Traversal, engine: TraversalEngine) -> Result<()>;
}

/// An ordered, validated set of strategies.
#[derive(Debug, Clone, Default)]
pub struct TraversalStrategies {
    ordered: Vec<Arc<dyn TraversalStrategy>>,
}

impl TraversalStrategies {
    /// No strategies at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a set, resolving duplicates and ordering constraints.
    ///
    /// A later strategy with the same id replaces an earlier one.
    /// Constraints naming strategies outside the set are ignored.
    pub fn new(strategies: Vec<Arc<dyn TraversalStrategy>>) -> Result<Self> {
        let mut by_id: BTreeMap<String, Arc<dyn TraversalStrategy>> = BTreeMap::new();
        for strategy in strategies {
            by_id.insert(strategy.id().to_string(), strategy);
        }

        let mut successors: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        let mut in_degree: BTreeMap<&str, usize> = by_id.keys().map(|id| (id.as_str(), 0)).collect();
        let mut add_edge = |before: &str, after: &str| {
            let (Some((before, _)), Some((after, _))) =
                (by_id.get_key_value(before), by_id.get_key_value(after))
            else {
                return;
            };
            if successors
                .entry(before.as_str())
                .or_default()
                .insert(after.as_str())
            {
                *in_degree.entry(after.as_str()).or_default() += 1;
            }
        };
        let mut pres = Vec::new();
        for (id, strategy) in &by_id {
            for pre in strategy.apply_pre() {
                pres.push((pre, id.clone()));
            }
            for post in strategy.apply_post() {
                pres.push((id.clone(), post));
            }
        }
        for (before, after) in &pres {
            add_edge(before, after);
        }

        let rank = |id: &str| {
            by_id
                .get(id)
                .map(|s| s.category())
                .unwrap_or(StrategyCategory::Finalization)
        };
        let mut ready: BTreeSet<(StrategyCategory, &str)> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(id, _)| (rank(*id), *id))
            .collect();

        let mut ordered = Vec::with_capacity(by_id.len());
        while let Some(next) = ready.pop_first() {
            let id = next.1;
            in_degree.remove(id);
            if let Some(strategy) = by_id.get(id) {
                ordered.push(strategy.clone());
            }
            for after in successors.get(id).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(after) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert((rank(*after), *after));
                    }
                }
            }
        }

        if !in_degree.is_empty() {
            let cycle: Vec<String> = in_degree.keys().map(|id| id.to_string()).collect();
            tracing::error!(cycle = ?cycle, "Strategy ordering constraints form a cycle");
            return Err(ProcessError::CyclicStrategies { cycle });
        }

        let set = Self { ordered };
        tracing::debug!(order = ?set.ids(), "Computed strategy order");
        Ok(set)
    }

    /// The default set for pull iteration.
    pub fn standard() -> Result<Self> {
        Self::new(vec![
            Arc::new(IdentityRemovalStrategy),
            Arc::new(GraphStepIndexStrategy),
            Arc::new(SideEffectCapStrategy),
            Arc::new(PathRequirementStrategy),
        ])
    }

    /// The default set for the graph computer.
    pub fn computer() -> Result<Self> {
        Self::standard()?.with(Arc::new(ComputerVerificationStrategy))
    }

    /// A new set with `strategy` added (or replacing the one with its id).
    pub fn with(&self, strategy: Arc<dyn TraversalStrategy>) -> Result<Self> {
        let mut strategies = self.ordered.clone();
        strategies.push(strategy);
        Self::new(strategies)
    }

    /// A new set without the strategy named `id`.
    pub fn without(&self, id: &str) -> Self {
        Self {
            ordered: self
                .ordered
                .iter()
                .filter(|s| s.id() != id)
                .cloned()
                .collect(),
        }
    }

    /// Strategy ids in application order.
    pub fn ids(&self) -> Vec<&str> {
        self.ordered.iter().map(|s| s.id()).collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ordered.iter().any(|s| s.id() == id)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// Apply every strategy once, in order.
    ///
    /// This does not consult or set the traversal's rewritten flag; callers
    /// go through [`Traversal::apply_strategies`] for that.
    pub fn apply(&self, traversal: &mut Traversal, engine: TraversalEngine) -> Result<()> {
        for strategy in &self.ordered {
            strategy.apply(traversal, engine)?;
            tracing::debug!(
                strategy = strategy.id(),
                steps = traversal.steps().len(),
                "Applied strategy"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Ordered {
        id: &'static str,
        category: StrategyCategory,
        pre: Vec<&'static str>,
        post: Vec<&'static str>,
    }

    impl Ordered {
        fn new(id: &'static str, category: StrategyCategory) -> Self {
            Self {
                id,
                category,
                pre: Vec::new(),
                post: Vec::new(),
            }
        }
    }

    impl TraversalStrategy for Ordered {
        fn id(&self) -> &str {
            self.id
        }

        fn category(&self) -> StrategyCategory {
            self.category
        }

        fn apply_pre(&self) -> Vec<String> {
            self.pre.iter().map(|s| s.to_string()).collect()
        }

        fn apply_post(&self) -> Vec<String> {
            self.post.iter().map(|s| s.to_string()).collect()
        }

        fn apply(&self, _traversal: &mut Traversal, _engine: TraversalEngine) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_standard_order() {
        let strategies = TraversalStrategies::standard().unwrap();
        assert_eq!(
            strategies.ids(),
            vec![
                "IdentityRemovalStrategy",
                "GraphStepIndexStrategy",
                "PathRequirementStrategy",
                "SideEffectCapStrategy",
            ]
        );
        let computer = TraversalStrategies::computer().unwrap();
        assert!(computer.contains("ComputerVerificationStrategy"));
        assert_eq!(computer.len(), 5);
    }

    #[test]
    fn test_constraints_override_category() {
        let mut early = Ordered::new("a", StrategyCategory::Decoration);
        early.pre = vec!["z"];
        let late = Ordered::new("z", StrategyCategory::Finalization);
        let strategies = TraversalStrategies::new(vec![Arc::new(early), Arc::new(late)]).unwrap();
        assert_eq!(strategies.ids(), vec!["z", "a"]);
    }

    #[test]
    fn test_cycle_is_rejected() {
        let mut a = Ordered::new("a", StrategyCategory::Optimization);
        a.post = vec!["b"];
        let mut b = Ordered::new("b", StrategyCategory::Optimization);
        b.post = vec!["a"];
        let c = Ordered::new("c", StrategyCategory::Optimization);
        let err = TraversalStrategies::new(vec![Arc::new(a), Arc::new(b), Arc::new(c)]).unwrap_err();
        match err {
            ProcessError::CyclicStrategies { cycle } => assert_eq!(cycle, vec!["a", "b"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_constraints_and_duplicates() {
        let mut a = Ordered::new("a", StrategyCategory::Optimization);
        a.pre = vec!["missing"];
        let replacement = Ordered::new("a", StrategyCategory::Decoration);
        let strategies =
            TraversalStrategies::new(vec![Arc::new(a), Arc::new(replacement)]).unwrap();
        assert_eq!(strategies.ids(), vec!["a"]);
        assert!(strategies.without("a").is_empty());
    }
}
