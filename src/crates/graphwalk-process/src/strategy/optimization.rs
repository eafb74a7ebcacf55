use super::{StrategyCategory, TraversalEngine, TraversalStrategy};
use crate::error::Result;
use crate::step::StepKind;
use crate::traversal::Traversal;

/// Removes identity steps that carry no label.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityRemovalStrategy;

impl TraversalStrategy for IdentityRemovalStrategy {
    fn id(&self) -> &str {
        "IdentityRemovalStrategy"
    }

    fn category(&self) -> StrategyCategory {
        StrategyCategory::Optimization
    }

    fn apply(&self, traversal: &mut Traversal, _engine: TraversalEngine) -> Result<()> {
        let mut i = 0;
        while i < traversal.steps().len() {
            let step = &traversal.steps()[i];
            let removable = matches!(step.kind(), StepKind::Identity)
                && step.labels().is_empty()
                && traversal.steps().len() > 1;
            if removable {
                traversal.remove_step(i);
            } else {
                i += 1;
            }
        }
        Ok(())
    }
}

/// Folds unlabeled `has` filters directly after a `V` source into the
/// source, where equality on an indexed key is answered by the index.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphStepIndexStrategy;

impl TraversalStrategy for GraphStepIndexStrategy {
    fn id(&self) -> &str {
        "GraphStepIndexStrategy"
    }

    fn category(&self) -> StrategyCategory {
        StrategyCategory::Optimization
    }

    fn apply_pre(&self) -> Vec<String> {
        vec![
            "IdentityRemovalStrategy".to_string(),
            "PartitionStrategy".to_string(),
        ]
    }

    fn apply(&self, traversal: &mut Traversal, _engine: TraversalEngine) -> Result<()> {
        if !matches!(traversal.steps().first().map(|s| s.kind()), Some(StepKind::V { .. })) {
            return Ok(());
        }
        while traversal.steps().len() > 1 {
            let next = &traversal.steps()[1];
            if !matches!(next.kind(), StepKind::Has(_)) || !next.labels().is_empty() {
                break;
            }
            if let StepKind::Has(containers) = traversal.remove_step(1).into_kind() {
                if let StepKind::V { has, .. } = traversal.steps_mut()[0].kind_mut() {
                    has.extend(containers);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::P;
    use crate::step::Step;

    fn source() -> Traversal {
        Traversal::anonymous().push(StepKind::V {
            ids: vec![],
            has: vec![],
        })
    }

    #[test]
    fn test_identity_removal_keeps_labels_and_lone_identity() {
        let mut t = source().identity().identity().as_("x").count();
        IdentityRemovalStrategy
            .apply(&mut t, TraversalEngine::Standard)
            .unwrap();
        assert_eq!(t.to_string(), "[VStep([],[]), IdentityStep@[x], CountStep]");

        let mut lone = Traversal::anonymous().identity();
        IdentityRemovalStrategy
            .apply(&mut lone, TraversalEngine::Standard)
            .unwrap();
        assert_eq!(lone.steps().len(), 1);
    }

    #[test]
    fn test_has_folds_into_source() {
        let mut t = source()
            .has("name", P::eq("marko"))
            .has_label("person")
            .as_("a")
            .has("age", P::gt(20));
        GraphStepIndexStrategy
            .apply(&mut t, TraversalEngine::Standard)
            .unwrap();
        assert_eq!(t.steps().len(), 3);
        match t.steps()[0].kind() {
            StepKind::V { has, .. } => assert_eq!(has.len(), 1),
            other => panic!("unexpected step {other}"),
        }
        assert_eq!(t.steps()[1].labels(), &["a".to_string()]);
        assert!(matches!(t.steps()[2].kind(), StepKind::Has(_)));
    }

    #[test]
    fn test_non_source_traversal_is_untouched() {
        let mut t = Traversal::anonymous()
            .push(Step::new(StepKind::Identity))
            .has("name", P::eq("marko"));
        GraphStepIndexStrategy
            .apply(&mut t, TraversalEngine::Standard)
            .unwrap();
        assert_eq!(t.steps().len(), 2);
    }
}
