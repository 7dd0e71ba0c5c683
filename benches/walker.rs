//! Benchmarks for path walkers.
//!
//! These benchmarks measure the performance of:
//! - Building a walker over paths of increasing depth
//! - Re-rooting a walker between two object graphs
//! - Propagating a change at the root through the whole chain

use std::{hint::black_box, rc::Rc};

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use floem_databind::{DynObject, PathWalker, Value};

/// A chain of `depth` objects, each holding the next under `Next`, ending in
/// a `Leaf` property.
fn create_chain(depth: usize, leaf: &str) -> Rc<DynObject> {
    let mut current = Rc::new(DynObject::new("Node").with_property("Leaf", leaf));
    for _ in 0..depth {
        current = Rc::new(DynObject::new("Node").with_property("Next", current));
    }
    current
}

fn create_path(depth: usize) -> String {
    let mut path = "Next.".repeat(depth);
    path.push_str("Leaf");
    path
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("walker_build");

    for depth in [1, 4, 16, 64] {
        let root = create_chain(depth, "leaf");
        let path = create_path(depth);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.iter(|| {
                let walker = PathWalker::new(&path, root.clone(), true).unwrap();
                black_box(walker.final_value())
            });
        });
    }

    group.finish();
}

fn bench_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("walker_update");

    for depth in [1, 4, 16, 64] {
        let first = Value::from(create_chain(depth, "first"));
        let second = Value::from(create_chain(depth, "second"));
        let walker = PathWalker::new(&create_path(depth), first.clone(), true).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.iter(|| {
                walker.update(second.clone());
                walker.update(first.clone());
                black_box(walker.final_value())
            });
        });
    }

    group.finish();
}

fn bench_root_change(c: &mut Criterion) {
    let mut group = c.benchmark_group("walker_root_change");

    for depth in [1, 4, 16, 64] {
        let root = Rc::new(DynObject::new("Root").with_property("Next", Value::Null));
        let first = Value::from(create_chain(depth - 1, "first"));
        let second = Value::from(create_chain(depth - 1, "second"));
        let walker = PathWalker::new(&create_path(depth), root.clone(), true).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.iter(|| {
                root.set("Next", second.clone());
                root.set("Next", first.clone());
                black_box(walker.final_value())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_build, bench_update, bench_root_change);

criterion_main!(benches);
