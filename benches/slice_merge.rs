//! Performance benchmarks for slicing and merging variants.
//!
//! Run with: `cargo bench --bench slice_merge`
//!
//! ## Performance Targets
//!
//! | Operation | Target | Notes |
//! |-----------|--------|-------|
//! | Slice, 1k artifacts | <10ms | Unordered directories |
//! | Merge, 1k artifacts | <10ms | Includes reference update |
//! | Sequence, 200 children | <5ms | Two diverging orders |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use artifact_kernel::{ArtifactOptions, Forest, Markers, NodeId, SequenceGraph, SequenceItem};

/// Build a variant with `dirs` directories of `files` files each.
///
/// Every `skip`-th file is left out so that two variants differ.
fn make_variant(forest: &mut Forest<String>, dirs: usize, files: usize, skip: usize) -> NodeId {
    let root = forest.create_root();
    for d in 0..dirs {
        let dir = forest
            .add_artifact(root, format!("dir_{}", d), ArtifactOptions::unordered())
            .expect("dir");
        for f in 0..files {
            if skip > 0 && (d * files + f) % skip == 0 {
                continue;
            }
            forest
                .add_artifact(dir, format!("file_{}", f), ArtifactOptions::unordered())
                .expect("file");
        }
    }
    root
}

/// Benchmark slicing two variants.
fn bench_slice(c: &mut Criterion) {
    let mut group = c.benchmark_group("slice");

    for dirs in [1, 10, 50] {
        group.throughput(Throughput::Elements((dirs * 20) as u64));
        group.bench_with_input(BenchmarkId::new("dirs", dirs), &dirs, |b, &dirs| {
            b.iter(|| {
                let mut forest: Forest<String> = Forest::new();
                let left = make_variant(&mut forest, dirs, 20, 3);
                let right = make_variant(&mut forest, dirs, 20, 5);
                let mut markers = Markers::new();
                let common = forest
                    .slice(black_box(left), black_box(right), &mut markers)
                    .expect("slice");
                forest.count_artifacts(common).expect("count")
            })
        });
    }

    group.finish();
}

/// Benchmark the full slice, update and merge chain.
fn bench_slice_merge_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("slice_merge_chain");

    for dirs in [1, 10, 50] {
        group.throughput(Throughput::Elements((dirs * 20) as u64));
        group.bench_with_input(BenchmarkId::new("dirs", dirs), &dirs, |b, &dirs| {
            b.iter(|| {
                let mut forest: Forest<String> = Forest::new();
                let left = make_variant(&mut forest, dirs, 20, 3);
                let right = make_variant(&mut forest, dirs, 20, 5);
                let mut markers = Markers::new();
                let common = forest.slice(left, right, &mut markers).expect("slice");
                for root in [left, right, common] {
                    forest
                        .update_artifact_references(root, &markers)
                        .expect("update");
                }
                forest.merge(common, right, &mut markers).expect("merge");
                forest.discard_superseded(markers).expect("discard")
            })
        });
    }

    group.finish();
}

/// Benchmark sequencing two diverging child lists.
fn bench_sequence(c: &mut Criterion) {
    let mut group = c.benchmark_group("sequence");

    for len in [10, 50, 200] {
        let first: Vec<SequenceItem<String>> = (0..len)
            .map(|i| SequenceItem::new(format!("stmt_{}", i)))
            .collect();
        let second: Vec<SequenceItem<String>> = (0..len)
            .filter(|i| i % 4 != 0)
            .map(|i| SequenceItem::new(format!("stmt_{}", (i * 7) % len)))
            .collect();

        group.bench_with_input(
            BenchmarkId::new("children", len),
            &(first, second),
            |b, (first, second)| {
                b.iter(|| {
                    let mut graph: SequenceGraph<String> = SequenceGraph::new();
                    graph.sequence(black_box(first)).expect("first");
                    graph.sequence(black_box(second)).expect("second");
                    let all: Vec<_> = graph.numbers().collect();
                    graph.linearize(&all).expect("linearize")
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_slice, bench_slice_merge_chain, bench_sequence);
criterion_main!(benches);
