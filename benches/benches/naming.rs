// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use understory_naming::{
    FeatureId, OperandSnapshot, PersistentNamingStore, ShapeIdentityTable, Uuid,
};
use understory_prism::{extrude, polygon};

fn fid(n: u64) -> FeatureId {
    FeatureId::from_sequence(Uuid::from_u128(0xbe7c), n)
}

fn profile(sides: usize) -> ShapeIdentityTable {
    let mut table = ShapeIdentityTable::new();
    PersistentNamingStore::new(fid(0))
        .name(&mut table, &OperandSnapshot::new(), polygon(fid(0), sides, 1.0).unwrap())
        .unwrap();
    table
}

fn bench_naming(c: &mut Criterion) {
    let mut group = c.benchmark_group("understory_naming");

    for &sides in &[4_usize, 64, 1024] {
        let sketch = profile(sides);
        let mut snapshot = OperandSnapshot::new();
        snapshot.capture(fid(0), &sketch);

        group.bench_function(format!("fresh_store(sides={sides})"), |b| {
            b.iter_batched(
                || extrude(&sketch, 2.0, None).unwrap(),
                |result| {
                    let mut store = PersistentNamingStore::new(fid(1));
                    let mut table = ShapeIdentityTable::new();
                    store.name(&mut table, &snapshot, result).unwrap();
                    black_box(table)
                },
                BatchSize::SmallInput,
            );
        });

        group.bench_function(format!("memoized_store(sides={sides})"), |b| {
            let mut store = PersistentNamingStore::new(fid(1));
            let mut table = ShapeIdentityTable::new();
            store
                .name(&mut table, &snapshot, extrude(&sketch, 1.0, None).unwrap())
                .unwrap();
            b.iter_batched(
                || extrude(&sketch, 2.0, None).unwrap(),
                |result| {
                    store.name(&mut table, &snapshot, result).unwrap();
                    black_box(table.len())
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_naming);
criterion_main!(benches);
