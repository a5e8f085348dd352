// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Picks captured on a model and resolved after edits.

use understory_naming::{Category, EntityKind, FeatureId, MissingReason, Resolution, ShapeId};
use understory_prism::{ExtrudeFeature, SketchFeature};
use understory_recompute::{Model, Role};

fn first_side_face(model: &Model, extrude: FeatureId) -> (ShapeId, ShapeId) {
    let sketch_edge = model
        .graph()
        .parents(extrude)
        .find_map(|(parent, _)| model.table(parent).ok())
        .map(|t| t.ids_of_kind(EntityKind::Edge)[0])
        .unwrap();
    let side = model
        .graph()
        .naming(extrude)
        .unwrap()
        .lookup(Category::Generated, sketch_edge)
        .unwrap();
    assert_eq!(model.table(extrude).unwrap().kind_of(side), Some(EntityKind::Face));
    (sketch_edge, side)
}

#[test]
fn side_face_pick_survives_a_distance_edit() {
    let mut model = Model::new();
    let sketch = model.add_feature(SketchFeature::new(4, 1.0));
    let extrude = model.add_feature(ExtrudeFeature::new(1.0));
    model.connect(sketch, extrude, Role::Target).unwrap();
    model.recompute();
    let (_, side) = first_side_face(&model, extrude);
    let pick = model.capture_pick(extrude, side).with_point([0.5, 0.0, 0.5]);

    model.set_parameter(extrude, "distance", 7.0).unwrap();
    model.recompute();
    let resolved = model.resolve_picks(&[extrude], &[pick]);
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].ids(), &[side]);
}

#[test]
fn profile_edge_leads_to_its_copy_and_its_side_face() {
    let mut model = Model::new();
    let sketch = model.add_feature(SketchFeature::new(3, 1.0));
    let skipped = model.add_feature(ExtrudeFeature::new(1.0));
    let extrude = model.add_feature(ExtrudeFeature::new(1.0));
    model.connect(sketch, skipped, Role::Target).unwrap();
    model.connect(skipped, extrude, Role::Target).unwrap();
    model.set_skipped(skipped, true).unwrap();
    model.recompute();

    let (edge, side) = first_side_face(&model, extrude);
    let pick = model.capture_pick(sketch, edge);
    let resolved = model.resolve_picks(&[extrude], &[pick]);
    let Resolution::Resolved { feature, ids } = &resolved[0] else {
        panic!("expected a resolution, got {:?}", resolved[0]);
    };
    assert_eq!(*feature, extrude);
    let mut expected = vec![edge, side];
    expected.sort_unstable();
    assert_eq!(ids.as_slice(), expected.as_slice());
}

#[test]
fn removed_consumer_reports_consumed() {
    let mut model = Model::new();
    let sketch = model.add_feature(SketchFeature::new(4, 1.0));
    let extrude = model.add_feature(ExtrudeFeature::new(1.0));
    model.connect(sketch, extrude, Role::Target).unwrap();
    model.recompute();
    let (_, side) = first_side_face(&model, extrude);
    let pick = model.capture_pick(extrude, side);

    model.clear_inputs(extrude).unwrap();
    model.remove_feature(extrude).unwrap();
    model.recompute();
    assert_eq!(
        model.resolve_picks(&[sketch], &[pick]),
        vec![Resolution::Missing {
            reason: MissingReason::Consumed,
        }]
    );
}

#[test]
fn removed_origin_reports_absent() {
    let mut model = Model::new();
    let sketch = model.add_feature(SketchFeature::new(4, 1.0));
    model.recompute();
    let face = model.table(sketch).unwrap().ids_of_kind(EntityKind::Face)[0];
    let pick = model.capture_pick(sketch, face);

    model.remove_feature(sketch).unwrap();
    model.recompute();
    assert_eq!(
        model.resolve_picks(&[sketch], &[pick]),
        vec![Resolution::Missing {
            reason: MissingReason::Absent,
        }]
    );
}

#[test]
fn unrelated_candidate_is_not_reachable() {
    let mut model = Model::new();
    let a = model.add_feature(SketchFeature::new(4, 1.0));
    let b = model.add_feature(SketchFeature::new(4, 1.0));
    model.recompute();
    let face = model.table(a).unwrap().ids_of_kind(EntityKind::Face)[0];
    let pick = model.capture_pick(a, face);

    let resolved = model.resolve_picks(&[b], &[pick.clone()]);
    assert_eq!(
        resolved,
        vec![Resolution::Missing {
            reason: MissingReason::NotReachable,
        }]
    );
    let resolved = model.resolve_picks(&[b, a], &[pick]);
    assert_eq!(resolved[0].ids(), &[face]);
}

#[test]
fn moved_split_piece_is_missing_not_renamed() {
    let mut model = Model::new();
    let sketch = model.add_feature(SketchFeature::new(4, 1.0));
    let extrude = model.add_feature(ExtrudeFeature::new(1.0));
    model.connect(sketch, extrude, Role::Target).unwrap();
    model.recompute();
    let whole = model.table(extrude).unwrap().ids_of_kind(EntityKind::Face);

    model.set_parameter(extrude, "split_side", 1_i64).unwrap();
    model.recompute();
    let split_faces = model.table(extrude).unwrap().ids_of_kind(EntityKind::Face);
    let pieces: Vec<_> = split_faces.into_iter().filter(|id| !whole.contains(id)).collect();
    assert_eq!(pieces.len(), 1);
    let piece = pieces[0];
    let pick = model.capture_pick(extrude, piece);

    model.set_parameter(extrude, "split_side", 2_i64).unwrap();
    model.recompute();
    assert!(!model.table(extrude).unwrap().has_id(piece));
    let resolved = model.resolve_picks(&[extrude], &[pick.clone()]);
    assert!(resolved[0].is_missing(), "resolved to {resolved:?}");

    model.set_parameter(extrude, "split_side", 1_i64).unwrap();
    model.recompute();
    assert_eq!(model.resolve_picks(&[extrude], &[pick])[0].ids(), &[piece]);
}

#[test]
fn inactive_candidate_is_passed_over() {
    let mut model = Model::new();
    let sketch = model.add_feature(SketchFeature::new(4, 1.0));
    let extrude = model.add_feature(ExtrudeFeature::new(1.0));
    model.connect(sketch, extrude, Role::Target).unwrap();
    model.recompute();
    let (edge, _) = first_side_face(&model, extrude);
    let pick = model.capture_pick(sketch, edge);
    let resolved = model.resolve_picks(&[extrude, sketch], &[pick.clone()]);
    assert!(matches!(resolved[0], Resolution::Resolved { feature, .. } if feature == extrude));

    model.set_inactive(extrude, true).unwrap();
    model.recompute();
    assert!(model.table(extrude).unwrap().has_id(edge), "stale output is kept");
    let resolved = model.resolve_picks(&[extrude, sketch], &[pick]);
    assert_eq!(
        resolved,
        vec![Resolution::Resolved {
            feature: sketch,
            ids: [edge].into_iter().collect(),
        }]
    );
}
