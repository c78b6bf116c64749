//! Benchmarks for the sliding-window driver
//!
//! This benchmark measures:
//! - Window scheduling for typical candidate pools
//! - A full rerank pass with a no-op agent (driver overhead only)
//! - Permutation parsing of model output

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use rank_llm_rerank::engine::{parse_permutation, window_schedule, IdentityAgent};
use rank_llm_rerank::{Candidate, Query, RerankOptions, Reranker, Request};

fn request(n: usize) -> Request {
    let candidates = (0..n)
        .map(|i| Candidate::new(format!("d{i}"), (n - i) as f64, format!("passage number {i}")))
        .collect();
    Request::new(Query::new("benchmark query", "q0"), candidates)
}

fn bench_schedule(c: &mut Criterion) {
    let mut group = c.benchmark_group("window_schedule");
    for &pool in &[20usize, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(pool), &pool, |b, &pool| {
            b.iter(|| window_schedule(0, black_box(pool), 20, 10))
        });
    }
    group.finish();
}

fn bench_rerank(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
    let reranker = Reranker::new(Arc::new(IdentityAgent));
    let mut group = c.benchmark_group("rerank_identity");
    for &pool in &[20usize, 100] {
        group.throughput(Throughput::Elements(pool as u64));
        let options = RerankOptions::new(pool, 20, 10);
        group.bench_with_input(BenchmarkId::from_parameter(pool), &pool, |b, &pool| {
            b.to_async(&rt)
                .iter(|| async { reranker.rerank(request(pool), &options).await })
        });
    }
    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let response = (1..=20)
        .rev()
        .map(|i| format!("[{i}]"))
        .collect::<Vec<_>>()
        .join(" > ");
    c.bench_function("parse_permutation_20", |b| {
        b.iter(|| parse_permutation(black_box(&response)))
    });
}

criterion_group!(benches, bench_schedule, bench_rerank, bench_parse);
criterion_main!(benches);
