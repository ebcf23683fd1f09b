use bptree::Tree;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rng;
use rand::seq::SliceRandom;

const ORDER: usize = 128;

fn shuffled_keys(n: i64) -> Vec<i64> {
    let mut keys: Vec<i64> = (0..n).collect();
    keys.shuffle(&mut rng());
    keys
}

fn populated(n: i64) -> Tree<i64, i64> {
    let mut tree = Tree::new(ORDER).unwrap();
    for k in shuffled_keys(n) {
        tree.insert(k, k, false).unwrap();
    }
    tree
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");
    for size in [1_000, 10_000, 100_000].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let keys = shuffled_keys(size);
            b.iter(|| {
                let mut tree = Tree::new(ORDER).unwrap();
                for &k in &keys {
                    tree.insert(black_box(k), k, false).unwrap();
                }
                black_box(tree.len())
            });
        });
    }
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    for size in [1_000, 10_000, 100_000].iter() {
        let tree = populated(*size);
        let probes = shuffled_keys(*size);
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &probes, |b, probes| {
            b.iter(|| {
                for &k in probes {
                    black_box(tree.search(&k).unwrap());
                }
            });
        });
    }
    group.finish();
}

fn bench_delete(c: &mut Criterion) {
    let mut group = c.benchmark_group("delete");
    for size in [1_000, 10_000, 100_000].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let order = shuffled_keys(size);
            b.iter_batched(
                || populated(size),
                |mut tree| {
                    for &k in &order {
                        tree.delete(black_box(&k)).unwrap();
                    }
                    black_box(tree.len())
                },
                criterion::BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn bench_iterate(c: &mut Criterion) {
    let mut group = c.benchmark_group("iterate");
    for size in [1_000, 10_000, 100_000].iter() {
        let tree = populated(*size);
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let sum: i64 = tree.items(None, None).unwrap().map(|(_, v)| *v).sum();
                black_box(sum)
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_insert, bench_search, bench_delete, bench_iterate);
criterion_main!(benches);
