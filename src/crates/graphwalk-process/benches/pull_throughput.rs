use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use graphwalk_process::prelude::*;
use graphwalk_structure::tinker::TinkerGraph;
use graphwalk_structure::{Graph, Properties, VertexId};
use std::sync::Arc;

/// `n` vertices, each linked to the next `fanout` ones (wrapping).
fn ring(n: u64, fanout: u64) -> Arc<TinkerGraph> {
    let graph = TinkerGraph::new();
    for id in 0..n {
        graph
            .add_vertex(Some(VertexId::new(id)), "node", Properties::new())
            .unwrap();
    }
    for id in 0..n {
        for step in 1..=fanout {
            graph
                .add_edge(
                    VertexId::new(id),
                    "link",
                    VertexId::new((id + step) % n),
                    Properties::new(),
                )
                .unwrap();
        }
    }
    Arc::new(graph)
}

fn pull_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("pull");
    for n in [100u64, 1_000] {
        let g = GraphTraversalSource::new(ring(n, 4)).unwrap();
        group.bench_with_input(BenchmarkId::new("two hops", n), &g, |b, g| {
            b.iter(|| black_box(g.v().out(&[]).out(&[]).count().to_list().unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("two hops with barrier", n), &g, |b, g| {
            b.iter(|| {
                black_box(g.v().out(&[]).barrier().out(&[]).barrier().count().to_list().unwrap())
            });
        });
    }
    group.finish();
}

fn olap_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let graph = ring(1_000, 4);
    let g = GraphTraversalSource::new(graph.clone()).unwrap();
    let computer = TinkerGraphComputer::new(graph).workers(4);

    c.bench_function("olap two hops", |b| {
        b.to_async(&runtime).iter(|| async {
            black_box(g.v().out(&[]).out(&[]).count().submit(&computer).await.unwrap())
        });
    });
    c.bench_function("page rank 10 iterations", |b| {
        b.to_async(&runtime).iter(|| async {
            black_box(computer.submit(PageRankProgram::new(10)).await.unwrap())
        });
    });
}

criterion_group!(benches, pull_benchmark, olap_benchmark);
criterion_main!(benches);
