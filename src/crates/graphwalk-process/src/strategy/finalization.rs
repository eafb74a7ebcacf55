use super::{StrategyCategory, TraversalEngine, TraversalStrategy};
use crate::error::{ProcessError, Result};
use crate::step::{Step, StepKind};
use crate::traversal::Traversal;

/// Appends a `cap` to a root traversal whose last step writes a side
/// effect, so iterating it yields the side-effect value.
#[derive(Debug, Clone, Copy, Default)]
pub struct SideEffectCapStrategy;

impl TraversalStrategy for SideEffectCapStrategy {
    fn id(&self) -> &str {
        "SideEffectCapStrategy"
    }

    fn category(&self) -> StrategyCategory {
        StrategyCategory::Finalization
    }

    fn apply(&self, traversal: &mut Traversal, _engine: TraversalEngine) -> Result<()> {
        if !traversal.is_root() {
            return Ok(());
        }
        let key = traversal
            .steps()
            .last()
            .and_then(|s| s.kind().side_effect_key())
            .map(str::to_string);
        if let Some(key) = key {
            traversal.add_step(Step::new(StepKind::Cap(vec![key])));
        }
        Ok(())
    }
}

/// Turns on path tracking for a root traversal when any step, nested ones
/// included, reads paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathRequirementStrategy;

impl TraversalStrategy for PathRequirementStrategy {
    fn id(&self) -> &str {
        "PathRequirementStrategy"
    }

    fn category(&self) -> StrategyCategory {
        StrategyCategory::Finalization
    }

    fn apply(&self, traversal: &mut Traversal, _engine: TraversalEngine) -> Result<()> {
        if traversal.is_root() && traversal.requires_path() {
            traversal.set_path_tracking(true);
        }
        Ok(())
    }
}

/// Rejects root traversals the graph computer cannot run: anything not
/// starting from `V`, and mutations.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComputerVerificationStrategy;

impl TraversalStrategy for ComputerVerificationStrategy {
    fn id(&self) -> &str {
        "ComputerVerificationStrategy"
    }

    fn category(&self) -> StrategyCategory {
        StrategyCategory::Finalization
    }

    fn apply_pre(&self) -> Vec<String> {
        vec!["IdentityRemovalStrategy".to_string()]
    }

    fn apply(&self, traversal: &mut Traversal, engine: TraversalEngine) -> Result<()> {
        if engine != TraversalEngine::Computer || !traversal.is_root() {
            return Ok(());
        }
        match traversal.steps().first().map(Step::kind) {
            Some(StepKind::V { .. }) => {}
            first => {
                let step = first.map_or("<empty>", StepKind::name);
                tracing::warn!(step, "Graph computer traversals must start at V");
                return Err(ProcessError::unsupported_feature("computer", step));
            }
        }
        if let Some(step) = find_mutation(traversal.steps()) {
            tracing::warn!(step, "Graph computer traversals cannot mutate the graph");
            return Err(ProcessError::unsupported_feature("computer", step));
        }
        Ok(())
    }
}

/// Name of the first mutating step, looking inside nested traversals too.
fn find_mutation(steps: &[Step]) -> Option<&'static str> {
    steps.iter().find_map(|step| match step.kind() {
        StepKind::AddEdge { .. } => Some(step.name()),
        kind => kind.nested().into_iter().find_map(|t| find_mutation(t.steps())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traversal::__;

    fn root(t: Traversal) -> Traversal {
        t.into_root()
    }

    #[test]
    fn test_cap_only_for_root_side_effect_tail() {
        let mut t = root(__::start().store("x"));
        SideEffectCapStrategy
            .apply(&mut t, TraversalEngine::Standard)
            .unwrap();
        assert_eq!(t.to_string(), "[StoreStep(x), CapStep([x])]");

        let mut nested = __::start().store("x");
        SideEffectCapStrategy
            .apply(&mut nested, TraversalEngine::Standard)
            .unwrap();
        assert_eq!(nested.steps().len(), 1);
    }

    #[test]
    fn test_path_requirement_sees_nested_steps() {
        let mut t = root(__::start().where_(__::start().simple_path()));
        assert!(!t.path_tracking());
        PathRequirementStrategy
            .apply(&mut t, TraversalEngine::Standard)
            .unwrap();
        assert!(t.path_tracking());
    }

    #[test]
    fn test_computer_verification() {
        let mut injected = root(__::inject([1]));
        assert!(ComputerVerificationStrategy
            .apply(&mut injected, TraversalEngine::Standard)
            .is_ok());
        let err = ComputerVerificationStrategy
            .apply(&mut injected, TraversalEngine::Computer)
            .unwrap_err();
        assert!(err.is_unsupported());

        let mut mutating = root(
            Traversal::anonymous()
                .push(StepKind::V {
                    ids: vec![],
                    has: vec![],
                })
                .add_e("knows"),
        );
        let err = ComputerVerificationStrategy
            .apply(&mut mutating, TraversalEngine::Computer)
            .unwrap_err();
        assert!(matches!(err, ProcessError::UnsupportedFeature { step, .. } if step == "AddEdgeStep"));

        let mut nested = root(
            Traversal::anonymous()
                .push(StepKind::V {
                    ids: vec![],
                    has: vec![],
                })
                .union(vec![__::identity(), __::start().repeat(__::add_e("self")).times(1)]),
        );
        let err = ComputerVerificationStrategy
            .apply(&mut nested, TraversalEngine::Computer)
            .unwrap_err();
        assert!(matches!(err, ProcessError::UnsupportedFeature { step, .. } if step == "AddEdgeStep"));
    }
}
