#![allow(missing_docs)]
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use flint_trie::{MemoryStorage, Trie};
use rand::{rngs::StdRng, Rng, SeedableRng};
use starknet_types_core::{felt::Felt, hash::Pedersen};

/// Commitment over a freshly populated trie, and the incremental commitment
/// after touching a handful of leaves.
fn trie_root(c: &mut Criterion) {
    let mut group = c.benchmark_group("root");
    let mut rng = StdRng::seed_from_u64(17);
    let entries: Vec<(Felt, Felt)> =
        (0..1000).map(|_| (Felt::from(rng.gen::<u64>()), Felt::from(rng.gen::<u64>()))).collect();

    group.bench_function("cold/1k leaves", |b| {
        b.iter_batched(
            || {
                let mut trie = Trie::<_, Pedersen>::new(MemoryStorage::new(), 251).unwrap();
                for (key, value) in &entries {
                    trie.put(key, value).unwrap();
                }
                trie
            },
            |mut trie| trie.root().unwrap(),
            BatchSize::SmallInput,
        )
    });

    group.bench_function("incremental/16 of 1k leaves", |b| {
        let mut trie = Trie::<_, Pedersen>::new(MemoryStorage::new(), 251).unwrap();
        for (key, value) in &entries {
            trie.put(key, value).unwrap();
        }
        trie.root().unwrap();
        b.iter(|| {
            for (key, _) in entries.iter().step_by(64) {
                trie.put(key, &Felt::from(rng.gen::<u64>())).unwrap();
            }
            trie.root().unwrap()
        })
    });

    group.finish();
}

criterion_group!(benches, trie_root);
criterion_main!(benches);
