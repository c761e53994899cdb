use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rand::Rng;
use std::collections::HashMap;
use std::hint::black_box;
use tokenguard::LruStore;

/// Pre-generated key indices so the RNG stays out of the measured loop
fn access_pattern(num_keys: usize, len: usize) -> Vec<usize> {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| rng.gen_range(0..num_keys)).collect()
}

/// LruStore against an unbounded HashMap across working-set sizes
fn benchmark_store_shootout(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_shootout");
    group.throughput(Throughput::Elements(1));

    let capacity = 1_000;
    for &num_keys in &[100usize, 1_000, 10_000] {
        let keys: Vec<String> = (0..num_keys).map(|i| format!("key_{i}")).collect();
        let pattern = access_pattern(num_keys, 65_536);

        group.bench_with_input(BenchmarkId::new("lru", num_keys), &num_keys, |b, _| {
            let mut store: LruStore<String, u64> = LruStore::new(capacity).unwrap();
            let mut cursor = 0usize;

            b.iter(|| {
                let key = &keys[pattern[cursor % pattern.len()]];
                cursor += 1;
                if store.get(key.as_str()).is_none() {
                    black_box(store.put(key.clone(), cursor as u64));
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("hashmap", num_keys), &num_keys, |b, _| {
            let mut store: HashMap<String, u64> = HashMap::with_capacity(capacity);
            let mut cursor = 0usize;

            b.iter(|| {
                let key = &keys[pattern[cursor % pattern.len()]];
                cursor += 1;
                if store.get(key.as_str()).is_none() {
                    black_box(store.insert(key.clone(), cursor as u64));
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_store_shootout);
criterion_main!(benches);
