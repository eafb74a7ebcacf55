//! Integration tests for pull execution, traversers and strategy application.

use graphwalk_process::prelude::*;
use graphwalk_process::{
    GraphStepIndexStrategy, IdentityRemovalStrategy, PathRequirementStrategy,
    SideEffectCapStrategy, TraverserSet,
};
use graphwalk_structure::{tinker, Direction, Graph, ReadOnlyGraph, Value, VertexId};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn g() -> GraphTraversalSource {
    GraphTraversalSource::new(Arc::new(tinker::modern().unwrap())).unwrap()
}

fn counting(counter: &Arc<AtomicUsize>) -> impl Fn(&Traverser) -> Result<()> + Send + Sync {
    let counter = counter.clone();
    move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn test_pull_is_lazy_without_barrier() {
    let seen = Arc::new(AtomicUsize::new(0));
    let mut t = g().v().side_effect(counting(&seen));
    assert!(t.next_traverser().unwrap().is_some());
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

#[test]
fn test_barrier_drains_upstream_before_first_output() {
    let seen = Arc::new(AtomicUsize::new(0));
    let mut t = g().v().side_effect(counting(&seen)).barrier();
    assert!(t.next_traverser().unwrap().is_some());
    assert_eq!(seen.load(Ordering::SeqCst), 6);
}

#[test]
fn test_barrier_merges_equal_traversers_by_bulk() {
    let mut t = g().v().out(&["created"]).barrier();
    let traversers = t.traversers().unwrap();
    let lop = traversers
        .iter()
        .find(|t| t.get() == &Value::Vertex(VertexId::new(3)))
        .unwrap();
    assert_eq!(lop.bulk(), 3);
    assert_eq!(traversers.iter().map(Traverser::bulk).sum::<u64>(), 4);
}

#[test]
fn test_count_respects_bulk() {
    let count = g().v().out(&["created"]).barrier().count().to_list().unwrap();
    assert_eq!(count, vec![Value::Int(4)]);
}

#[test]
fn test_repeat_times_counts_loops() {
    let mut t = g()
        .inject([0])
        .repeat(__::map(|t| Ok(Value::Int(t.get().as_int().unwrap_or(0) + 1))))
        .times(3);
    let out = t.traversers().unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].get(), &Value::Int(3));
    assert_eq!(out[0].loops(), 3);
}

#[test]
fn test_repeat_emit_and_until() {
    let names = g()
        .v_ids([1u64])
        .repeat(__::out(&[]))
        .until(__::has_label("software"))
        .values(&["name"])
        .to_list()
        .unwrap();
    let mut names: Vec<String> = names
        .into_iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();
    names.sort();
    assert_eq!(names, vec!["lop", "lop", "ripple"]);

    let emitted = g()
        .v_ids([1u64])
        .repeat(__::out(&["knows"]))
        .emit()
        .times(2)
        .count()
        .to_list()
        .unwrap();
    assert_eq!(emitted, vec![Value::Int(2)]);
}

#[test]
fn test_untracked_path_differs_from_empty_path() {
    let err = g()
        .without_strategy("PathRequirementStrategy")
        .v()
        .path()
        .next_value()
        .unwrap_err();
    assert!(matches!(err.root_cause(), ProcessError::PathNotTracked));

    let untracked = Traverser::new(Value::Int(1));
    assert!(matches!(untracked.path(), Err(ProcessError::PathNotTracked)));
    let tracked = Traverser::start(Value::Int(1), true);
    assert_eq!(tracked.path().unwrap().len(), 1);
}

#[test]
fn test_path_tracking_enabled_by_strategy() {
    let paths = g()
        .v_ids([1u64])
        .as_("a")
        .out(&["knows"])
        .has("age", P::gt(30))
        .select(&["a"])
        .values(&["name"])
        .to_list()
        .unwrap();
    assert_eq!(paths, vec![Value::from("marko")]);
}

#[test]
fn test_add_edge_on_read_only_graph_is_unsupported() {
    let graph: Arc<dyn Graph> = Arc::new(ReadOnlyGraph::new(Arc::new(tinker::modern().unwrap())));
    let g = GraphTraversalSource::new(graph).unwrap();
    let err = g.v_ids([1u64]).add_e("likes").next_value().unwrap_err();
    assert!(err.is_unsupported());
    assert!(matches!(err, ProcessError::StepExecution { ref step, .. } if step == "AddEdgeStep"));
}

#[test]
fn test_add_edge_between_labeled_vertices() {
    let graph = Arc::new(tinker::modern().unwrap());
    let g = GraphTraversalSource::new(graph.clone()).unwrap();
    let added = g
        .v_ids([1u64])
        .as_("a")
        .out(&["knows"])
        .has("name", P::eq("vadas"))
        .add_e("likes")
        .from_("a")
        .property("since", 2010)
        .to_list()
        .unwrap();
    assert_eq!(added.len(), 1);
    let liked = graph
        .adjacent_vertices(VertexId::new(1), Direction::Out, &["likes".to_string()])
        .unwrap();
    assert_eq!(liked, vec![VertexId::new(2)]);

    let err = g
        .v_ids([1u64])
        .add_e("likes")
        .to("missing")
        .to_list()
        .unwrap_err();
    assert!(matches!(err.root_cause(), ProcessError::UnknownPathLabel(label) if label == "missing"));
}

#[test]
fn test_strategies_applied_once_even_when_not_idempotent() {
    let g = g()
        .with_strategy(PartitionStrategy::new("_partition").read_partition("a"))
        .unwrap();
    let mut t = g.v().out(&[]);
    t.apply_strategies().unwrap();
    let once = t.to_string();
    t.apply_strategies().unwrap();
    assert_eq!(t.to_string(), once);
    assert!(t.to_list().unwrap().is_empty());
}

#[test]
fn test_side_effect_cap_and_group_count() {
    let stored = g().v().has_label("person").values(&["age"]).store("ages").to_list().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].as_list().map(<[Value]>::len), Some(4));

    let counts = g().v().out(&[]).group_count_into("c").by("name").to_list().unwrap();
    let lop = counts[0]
        .as_map()
        .and_then(|m| m.get(&Value::from("lop")))
        .cloned();
    assert_eq!(lop, Some(Value::Int(3)));
}

#[test]
fn test_user_lambda_failure_reports_step() {
    let err = g()
        .v()
        .map(|_| Err(ProcessError::execution("boom")))
        .to_list()
        .unwrap_err();
    assert!(matches!(err, ProcessError::StepExecution { ref step, .. } if step == "MapStep"));
    assert!(matches!(err.root_cause(), ProcessError::Execution(_)));
}

#[test]
fn test_barrier_inside_union_sees_every_input() {
    let counted = g().v().union(vec![__::count()]).to_list().unwrap();
    assert_eq!(counted, vec![Value::Int(6)]);

    let both = g()
        .v()
        .union(vec![__::out(&[]).count(), __::count()])
        .to_list()
        .unwrap();
    assert_eq!(both, vec![Value::Int(6), Value::Int(6)]);
}

#[test]
fn test_barrier_inside_choose_sees_its_whole_branch() {
    let mut routed = g()
        .v()
        .choose(__::has_label("person"), __::count(), __::values(&["name"]))
        .to_list()
        .unwrap();
    routed.sort();
    assert_eq!(
        routed,
        vec![Value::Int(4), Value::from("lop"), Value::from("ripple")]
    );
}

#[test]
fn test_barrier_inside_repeat_keeps_loop_results() {
    for emit in [false, true] {
        let run = |body: Traversal| {
            let t = g().v_ids([1u64]).repeat(body);
            let t = if emit { t.emit() } else { t };
            t.times(2).count().to_list().unwrap()
        };
        let lazy = run(__::out(&[]));
        let merged = run(__::out(&[]).barrier());
        assert_eq!(merged, lazy);
    }
    let two_hops = g()
        .v_ids([1u64])
        .repeat(__::out(&[]).barrier())
        .times(2)
        .count()
        .to_list()
        .unwrap();
    assert_eq!(two_hops, vec![Value::Int(2)]);
}

#[test]
fn test_where_with_count_is_local_to_each_traverser() {
    let busy = g()
        .v()
        .where_(__::out(&[]).count().is(P::gt(1)))
        .values(&["name"])
        .to_list()
        .unwrap();
    assert_eq!(busy, vec![Value::from("marko"), Value::from("josh")]);
}

#[test]
fn test_order_sorts_after_draining_everything() {
    let sorted = g().inject([3, 1, 2]).order().to_list().unwrap();
    assert_eq!(sorted, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);

    let seen = Arc::new(AtomicUsize::new(0));
    let mut t = g().inject([3, 1, 2]).side_effect(counting(&seen)).order().desc();
    assert_eq!(t.next_value().unwrap(), Some(Value::Int(3)));
    assert_eq!(seen.load(Ordering::SeqCst), 3);

    let ages = g().v().has_label("person").order().by("age").values(&["name"]).to_list().unwrap();
    assert_eq!(
        ages,
        vec![
            Value::from("vadas"),
            Value::from("marko"),
            Value::from("josh"),
            Value::from("peter")
        ]
    );
}

#[test]
fn test_order_is_exact_for_large_mixed_numbers() {
    let big = 1i64 << 53;
    let sorted = g()
        .inject([
            Value::Int(big + 3),
            Value::Int(big + 1),
            Value::Float(big as f64 + 2.0),
            Value::Float(big as f64),
        ])
        .order()
        .to_list()
        .unwrap();
    assert_eq!(
        sorted,
        vec![
            Value::Float(big as f64),
            Value::Int(big + 1),
            Value::Float(big as f64 + 2.0),
            Value::Int(big + 3)
        ]
    );
}

#[test]
fn test_union_and_choose_route_traversers() {
    let mut marko = g()
        .v_ids([1u64])
        .union(vec![__::out(&["knows"]).values(&["name"]), __::values(&["age"])])
        .to_list()
        .unwrap();
    marko.sort();
    assert_eq!(
        marko,
        vec![Value::Int(29), Value::from("josh"), Value::from("vadas")]
    );

    let routed = g()
        .v()
        .choose(__::has_label("person"), __::values(&["name"]), __::constant("software"))
        .to_list()
        .unwrap();
    assert_eq!(routed.len(), 6);
    assert_eq!(routed.iter().filter(|v| v.as_str() == Some("software")).count(), 2);
    assert!(routed.contains(&Value::from("peter")));
}

#[test]
fn test_fold_and_sum_respect_bulk() {
    let folded = g().v().out(&["created"]).barrier().values(&["name"]).fold().to_list().unwrap();
    assert_eq!(folded.len(), 1);
    let mut names = folded[0].as_list().unwrap().to_vec();
    names.sort();
    assert_eq!(
        names,
        vec![
            Value::from("lop"),
            Value::from("lop"),
            Value::from("lop"),
            Value::from("ripple")
        ]
    );

    let ages = g().v().has_label("person").values(&["age"]).sum().to_list().unwrap();
    assert_eq!(ages, vec![Value::Int(123)]);

    let ones = g()
        .v()
        .out(&["created"])
        .barrier()
        .map(|_| Ok(Value::Int(1)))
        .sum()
        .to_list()
        .unwrap();
    assert_eq!(ones, vec![Value::Int(4)]);

    let nothing = g().v().has_label("nobody").values(&["age"]).sum().to_list().unwrap();
    assert!(nothing.is_empty());
    assert!(g().v().values(&["name"]).sum().to_list().is_err());
}

#[test]
fn test_range_limit_and_skip_count_bulk() {
    let ages = || g().v().has_label("person").values(&["age"]).order();
    assert_eq!(
        ages().range(1, 3).to_list().unwrap(),
        vec![Value::Int(29), Value::Int(32)]
    );
    assert_eq!(
        ages().limit(2).to_list().unwrap(),
        vec![Value::Int(27), Value::Int(29)]
    );
    assert_eq!(ages().skip(3).to_list().unwrap(), vec![Value::Int(35)]);
    assert!(ages().skip(10).to_list().unwrap().is_empty());

    let split = g().v().out(&["created"]).barrier().limit(2).count().to_list().unwrap();
    assert_eq!(split, vec![Value::Int(2)]);
}

#[test]
fn test_aggregate_fills_side_effect_before_passing_on() {
    let seen = Arc::new(AtomicUsize::new(0));
    let mut t = g()
        .v()
        .has_label("person")
        .side_effect(counting(&seen))
        .values(&["age"])
        .aggregate("ages");
    assert!(t.next_traverser().unwrap().is_some());
    assert_eq!(seen.load(Ordering::SeqCst), 4);

    let old = g()
        .v()
        .has_label("person")
        .values(&["age"])
        .aggregate("ages")
        .is(P::gt(30))
        .count()
        .to_list()
        .unwrap();
    assert_eq!(old, vec![Value::Int(2)]);

    let capped = g()
        .v()
        .has_label("person")
        .values(&["age"])
        .aggregate("ages")
        .is(P::gt(30))
        .cap(&["ages"])
        .to_list()
        .unwrap();
    assert_eq!(capped.len(), 1);
    assert_eq!(capped[0].as_list().map(<[Value]>::len), Some(4));
}

#[test]
fn test_cap_of_several_keys_is_a_map() {
    let capped = g()
        .v()
        .has_label("person")
        .aggregate("people")
        .out(&["created"])
        .aggregate("software")
        .cap(&["people", "software"])
        .to_list()
        .unwrap();
    let map = capped[0].as_map().unwrap();
    let len = |key: &str| map.get(&Value::from(key)).and_then(Value::as_list).map(<[Value]>::len);
    assert_eq!(len("people"), Some(4));
    assert_eq!(len("software"), Some(4));
}

#[test]
fn test_not_keeps_traversers_without_results() {
    let mut idle = g()
        .v()
        .not(__::out(&["created"]))
        .values(&["name"])
        .to_list()
        .unwrap();
    idle.sort();
    assert_eq!(
        idle,
        vec![Value::from("lop"), Value::from("ripple"), Value::from("vadas")]
    );
}

#[test]
fn test_max_loops_bounds_an_open_loop() {
    let mut t = g()
        .inject([0])
        .repeat(__::map(|t| Ok(Value::Int(t.get().as_int().unwrap_or(0) + 1))))
        .max_loops(5);
    let out = t.traversers().unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].get(), &Value::Int(5));
    assert_eq!(out[0].loops(), 5);
}

#[test]
fn test_until_fn_checks_after_each_iteration() {
    let increment = || __::map(|t| Ok(Value::Int(t.get().as_int().unwrap_or(0) + 1)));
    let mut t = g().inject([10]).repeat(increment()).until_fn(|t| t.loops() >= 3);
    let out = t.traversers().unwrap();
    assert_eq!(out[0].get(), &Value::Int(13));
    assert_eq!(out[0].loops(), 3);

    let mut reached = g()
        .inject([0, 5])
        .repeat(increment())
        .until_fn(|t| t.get().as_int().map_or(true, |v| v >= 2))
        .to_list()
        .unwrap();
    reached.sort();
    assert_eq!(reached, vec![Value::Int(2), Value::Int(6)]);
}

fn shipped() -> Vec<Arc<dyn TraversalStrategy>> {
    vec![
        Arc::new(IdentityRemovalStrategy),
        Arc::new(GraphStepIndexStrategy),
        Arc::new(SideEffectCapStrategy),
        Arc::new(PathRequirementStrategy),
        Arc::new(PartitionStrategy::new("_partition")),
    ]
}

proptest! {
    #[test]
    fn prop_strategy_order_ignores_registration_order(
        shuffled in Just(shipped()).prop_shuffle()
    ) {
        let expected = TraversalStrategies::new(shipped()).unwrap();
        let actual = TraversalStrategies::new(shuffled).unwrap();
        prop_assert_eq!(actual.ids(), expected.ids());
    }

    #[test]
    fn prop_traverser_set_preserves_total_bulk(
        entries in prop::collection::vec((0i64..5, 1u64..10), 0..40)
    ) {
        let mut set = TraverserSet::new();
        for (value, bulk) in &entries {
            let mut t = Traverser::new(Value::Int(*value));
            t.set_bulk(*bulk);
            set.add(t);
        }
        let mut distinct: Vec<i64> = entries.iter().map(|(v, _)| *v).collect();
        distinct.sort_unstable();
        distinct.dedup();
        prop_assert_eq!(set.len(), distinct.len());
        prop_assert_eq!(set.total_bulk(), entries.iter().map(|(_, b)| *b).sum::<u64>());
    }

    #[test]
    fn prop_barrier_merge_does_not_change_pure_results(
        values in prop::collection::vec(0i64..4, 0..30),
        ids in prop::collection::vec(1u64..7, 0..6)
    ) {
        let run = |merge: bool, tail: fn(Traversal) -> Traversal| {
            let t = g().inject(values.clone());
            let t = if merge { t.barrier() } else { t };
            let mut out = tail(t).to_list().unwrap();
            out.sort();
            out
        };
        let tails: [fn(Traversal) -> Traversal; 3] = [
            |t| t.map(|t| Ok(Value::Int(t.get().as_int().unwrap_or(0) * 10))),
            |t| t.count(),
            |t| t.group_count(),
        ];
        for tail in tails {
            prop_assert_eq!(run(true, tail), run(false, tail));
        }

        let names = |merge: bool, tail: fn(Traversal) -> Traversal| {
            let t = g().v_ids(ids.clone()).out(&[]);
            let t = if merge { t.barrier() } else { t };
            let mut out = tail(t).to_list().unwrap();
            out.sort();
            out
        };
        let tails: [fn(Traversal) -> Traversal; 3] = [
            |t| t.values(&["name"]),
            |t| t.count(),
            |t| t.group_count().by("name"),
        ];
        for tail in tails {
            prop_assert_eq!(names(true, tail), names(false, tail));
        }
    }
}
