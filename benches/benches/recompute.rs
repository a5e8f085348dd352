// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use understory_naming::FeatureId;
use understory_prism::{ExtrudeFeature, SketchFeature};
use understory_recompute::{Model, Role};

/// `pairs` independent sketch/extrude chains, all recomputed once.
fn build(pairs: usize, sides: i64) -> (Model, Vec<FeatureId>) {
    let mut model = Model::new();
    let mut extrudes = Vec::with_capacity(pairs);
    for _ in 0..pairs {
        let sketch = model.add_feature(SketchFeature::new(sides, 1.0));
        let extrude = model.add_feature(ExtrudeFeature::new(1.0));
        model.connect(sketch, extrude, Role::Target).unwrap();
        extrudes.push(extrude);
    }
    model.recompute();
    (model, extrudes)
}

fn bench_recompute(c: &mut Criterion) {
    let mut group = c.benchmark_group("understory_recompute");
    group.sample_size(30);

    for &(pairs, sides) in &[(16_usize, 4_i64), (16, 32), (256, 4)] {
        group.bench_function(format!("full(pairs={pairs},sides={sides})"), |b| {
            b.iter_batched(
                || {
                    let (mut model, _) = build(pairs, sides);
                    model.force_update();
                    model
                },
                |mut model| black_box(model.recompute()),
                BatchSize::SmallInput,
            );
        });

        group.bench_function(format!("one_edit(pairs={pairs},sides={sides})"), |b| {
            let (mut model, extrudes) = build(pairs, sides);
            let mut distance = 1.0;
            b.iter(|| {
                distance += 1.0;
                model
                    .set_parameter(extrudes[pairs / 2], "distance", distance)
                    .unwrap();
                black_box(model.recompute())
            });
        });

        group.bench_function(format!("noop(pairs={pairs},sides={sides})"), |b| {
            let (mut model, _) = build(pairs, sides);
            b.iter(|| black_box(model.recompute()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_recompute);
criterion_main!(benches);
