use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tempfile::TempDir;

use minex::{MappedPatricia, PatriciaTrie};

fn make_keys(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("entry-{:06}-suffix", i)).collect()
}

fn build_trie(keys: &[String]) -> PatriciaTrie {
    let mut trie = PatriciaTrie::new();
    for key in keys {
        trie.insert(key.as_bytes());
    }
    trie
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("trie_insert");
    for count in [1_000, 10_000] {
        let keys = make_keys(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &keys, |b, keys| {
            b.iter(|| build_trie(black_box(keys)));
        });
    }
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let keys = make_keys(10_000);
    let owned = build_trie(&keys);

    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("bench.trie");
    owned.save(&path).unwrap();
    let mapped = MappedPatricia::from_file(&path).unwrap();

    let mut group = c.benchmark_group("trie_search");
    group.bench_function("owned", |b| {
        b.iter(|| {
            for key in keys.iter().step_by(97) {
                black_box(owned.search(black_box(key.as_bytes())));
            }
        });
    });
    group.bench_function("mapped", |b| {
        b.iter(|| {
            for key in keys.iter().step_by(97) {
                black_box(mapped.search(black_box(key.as_bytes())));
            }
        });
    });
    group.finish();
}

criterion_group!(benches, bench_insert, bench_search);
criterion_main!(benches);
