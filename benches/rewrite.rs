//! Benchmarks for the rewrite path.
//!
//! Covers the stages a loader thread pays for on every load:
//! - Class file parsing
//! - Classification of an unmarked unit (the common case)
//! - Full rewrite of a marked unit
//! - Batch rewriting across the rayon pool

extern crate probeweave;

use criterion::{criterion_group, criterion_main, Criterion};
use probeweave::prelude::*;
use std::hint::black_box;

fn sample(name: &str, marked: bool) -> Vec<u8> {
    let mut builder = ClassFileBuilder::new(name);
    for i in 0..16 {
        let mut method = MethodBuilder::new(format!("step{i}"), "(ILjava/lang/String;J)J")
            .flags(MethodAccessFlags::PUBLIC)
            .body(2, 5, vec![0x1F, 0xAD]);
        if marked && i % 4 == 0 {
            method = method.annotation(TASK_MARKER);
        }
        builder = builder.method(method);
    }
    builder.build().unwrap().to_bytes().unwrap()
}

/// Benchmark parsing a 16-method class.
fn bench_parse(c: &mut Criterion) {
    let bytes = sample("com/acme/Parse", true);

    c.bench_function("classfile_parse", |b| {
        b.iter(|| {
            let class = ClassFile::parse(black_box(&bytes)).unwrap();
            black_box(class)
        });
    });
}

/// Benchmark declining a unit without marked methods.
fn bench_decline_unmarked(c: &mut Criterion) {
    let bytes = sample("com/acme/Plain", false);
    let rewriter = Rewriter::default();

    c.bench_function("rewrite_decline_unmarked", |b| {
        b.iter(|| {
            let outcome = rewriter.rewrite(black_box(&bytes), "com/acme/Plain", &NoCompanions);
            black_box(outcome)
        });
    });
}

/// Benchmark a full rewrite of four marked methods.
fn bench_rewrite_marked(c: &mut Criterion) {
    let bytes = sample("com/acme/Marked", true);

    c.bench_function("rewrite_marked", |b| {
        b.iter(|| {
            // a fresh pool per iteration, otherwise the unit is finalized after the first run
            let rewriter = Rewriter::default();
            let outcome = rewriter.rewrite(black_box(&bytes), "com/acme/Marked", &NoCompanions);
            black_box(outcome)
        });
    });
}

/// Benchmark rewriting 256 distinct units in parallel.
fn bench_rewrite_batch(c: &mut Criterion) {
    let names: Vec<String> = (0..256).map(|i| format!("com/acme/Unit{i}")).collect();
    let bytes: Vec<Vec<u8>> = names.iter().map(|n| sample(n, true)).collect();
    let units: Vec<(&str, &[u8])> = names
        .iter()
        .zip(&bytes)
        .map(|(n, b)| (n.as_str(), b.as_slice()))
        .collect();

    c.bench_function("rewrite_batch_256", |b| {
        b.iter(|| {
            let rewriter = Rewriter::default();
            black_box(rewriter.rewrite_batch(black_box(&units), &NoCompanions))
        });
    });
}

criterion_group!(
    benches,
    bench_parse,
    bench_decline_unmarked,
    bench_rewrite_marked,
    bench_rewrite_batch
);
criterion_main!(benches);
