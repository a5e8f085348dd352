// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Prism extrusion.

use alloc::vec::Vec;

use understory_naming::{
    Correspondence, EntityKey, EntityKind, OperandEntity, OperationResult, ShapeIdentityTable,
    Topology,
};

use crate::KernelError;
use crate::geometry::{SHELL, SIDE, SOLID, SPLIT, TOP, VERTICAL, fingerprint, positive};

/// The planar profile an extrusion sweeps.
struct Profile {
    face: EntityKey,
    wire: EntityKey,
    edges: Vec<EntityKey>,
    /// Corners in order of first appearance along the wire.
    vertices: Vec<EntityKey>,
    /// Corner indices of each edge.
    ends: Vec<(usize, usize)>,
}

impl Profile {
    fn find(topology: &Topology) -> Result<Self, KernelError> {
        let faces: Vec<_> = topology.of_kind(EntityKind::Face).collect();
        let [face] = faces[..] else {
            return Err(KernelError::NoProfile { faces: faces.len() });
        };
        let wire = topology
            .children(face)
            .iter()
            .copied()
            .find(|&c| topology.kind(c) == Some(EntityKind::Wire))
            .ok_or(KernelError::OpenProfile)?;
        let edges: Vec<_> = topology
            .children(wire)
            .iter()
            .copied()
            .filter(|&c| topology.kind(c) == Some(EntityKind::Edge))
            .collect();
        if edges.is_empty() {
            return Err(KernelError::OpenProfile);
        }

        let mut vertices: Vec<EntityKey> = Vec::new();
        let mut ends = Vec::with_capacity(edges.len());
        for &edge in &edges {
            let mut corner = |v: EntityKey| match vertices.iter().position(|&k| k == v) {
                Some(i) => i,
                None => {
                    vertices.push(v);
                    vertices.len() - 1
                }
            };
            let corners: Vec<_> = topology
                .children(edge)
                .iter()
                .copied()
                .filter(|&c| topology.kind(c) == Some(EntityKind::Vertex))
                .collect();
            let [a, b] = corners[..] else {
                return Err(KernelError::OpenProfile);
            };
            ends.push((corner(a), corner(b)));
        }
        Ok(Self {
            face,
            wire,
            edges,
            vertices,
            ends,
        })
    }
}

/// Sweeps the single profile face of `profile` by `distance`.
///
/// The prism is `solid > shell > faces > wires > edges > vertices`. The
/// correspondence reports, against operand 0:
///
/// - the bottom face, its wire, edges and corners as *original* (they keep
///   the profile's ids),
/// - one side face per profile edge and one vertical edge per corner as
///   *generated*,
/// - the top face as *last* of the profile face.
///
/// Everything else (shell, top and side wires, top edges and corners) is
/// left to the derived pass. With `split_side = Some(i)` side face `i` comes
/// out in two pieces that both report edge `i` as their source, which is
/// what a kernel does when a face gets split.
pub fn extrude(
    profile: &ShapeIdentityTable,
    distance: f64,
    split_side: Option<usize>,
) -> Result<OperationResult, KernelError> {
    let height = positive("distance", distance)?.to_bits();
    let source = profile.topology();
    let p = Profile::find(source)?;
    let geometry = |key: EntityKey| source.geometry(key).unwrap_or_default();

    let mut t = Topology::new();
    let mut c = Correspondence::new();
    let operand = |key: EntityKey| OperandEntity::new(0, key);

    let solid = t.add(EntityKind::Solid, fingerprint(&[SOLID, height]));
    let shell = t.add(EntityKind::Shell, fingerprint(&[SHELL, height]));
    t.attach(solid, shell);
    t.set_root(solid);

    // Bottom cap: the profile itself.
    let bottom = t.add(EntityKind::Face, geometry(p.face));
    let bottom_wire = t.add(EntityKind::Wire, geometry(p.wire));
    t.attach(shell, bottom);
    t.attach(bottom, bottom_wire);
    c.add_original(operand(p.face), bottom);
    c.add_original(operand(p.wire), bottom_wire);
    let bottom_corners: Vec<_> = p
        .vertices
        .iter()
        .map(|&v| {
            let k = t.add(EntityKind::Vertex, geometry(v));
            c.add_original(operand(v), k);
            k
        })
        .collect();
    let bottom_edges: Vec<_> = p
        .edges
        .iter()
        .zip(&p.ends)
        .map(|(&e, &(a, b))| {
            let k = t.add(EntityKind::Edge, geometry(e));
            t.attach(bottom_wire, k);
            t.attach(k, bottom_corners[a]);
            t.attach(k, bottom_corners[b]);
            c.add_original(operand(e), k);
            k
        })
        .collect();

    // Vertical edges, one per corner.
    let top_corners: Vec<_> = p
        .vertices
        .iter()
        .map(|&v| t.add(EntityKind::Vertex, fingerprint(&[TOP, geometry(v), height])))
        .collect();
    let verticals: Vec<_> = p
        .vertices
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let k = t.add(EntityKind::Edge, fingerprint(&[VERTICAL, geometry(v), height]));
            t.attach(k, bottom_corners[i]);
            t.attach(k, top_corners[i]);
            c.add_generated(operand(v), k);
            k
        })
        .collect();

    // Top cap.
    let top = t.add(EntityKind::Face, fingerprint(&[TOP, geometry(p.face), height]));
    let top_wire = t.add(EntityKind::Wire, fingerprint(&[TOP, geometry(p.wire), height]));
    t.attach(shell, top);
    t.attach(top, top_wire);
    c.add_last(operand(p.face), top);
    let top_edges: Vec<_> = p
        .edges
        .iter()
        .zip(&p.ends)
        .map(|(&e, &(a, b))| {
            let k = t.add(EntityKind::Edge, fingerprint(&[TOP, geometry(e), height]));
            t.attach(top_wire, k);
            t.attach(k, top_corners[a]);
            t.attach(k, top_corners[b]);
            k
        })
        .collect();

    // Side faces, one per profile edge.
    for (i, (&e, &(a, b))) in p.edges.iter().zip(&p.ends).enumerate() {
        let side = t.add(EntityKind::Face, fingerprint(&[SIDE, geometry(e), height]));
        let side_wire = t.add(EntityKind::Wire, fingerprint(&[SIDE, geometry(e), height, 1]));
        t.attach(shell, side);
        t.attach(side, side_wire);
        for edge in [bottom_edges[i], top_edges[i], verticals[a], verticals[b]] {
            t.attach(side_wire, edge);
        }
        c.add_generated(operand(e), side);
    }

    if let Some(i) = split_side.filter(|&i| i < p.edges.len()) {
        let e = p.edges[i];
        let piece = t.add(EntityKind::Face, fingerprint(&[SPLIT, geometry(e), height]));
        let seam_wire = t.add(EntityKind::Wire, fingerprint(&[SPLIT, geometry(e), height, 1]));
        let seam = t.add(EntityKind::Edge, fingerprint(&[SPLIT, geometry(e), height, 2]));
        t.attach(shell, piece);
        t.attach(piece, seam_wire);
        t.attach(seam_wire, seam);
        c.add_generated(operand(e), piece);
    }

    tracing::trace!(
        edges = p.edges.len(),
        entities = t.len(),
        split = ?split_side,
        "prism built"
    );
    Ok(OperationResult {
        topology: t,
        correspondence: c,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polygon;
    use understory_naming::{
        Category, FeatureId, NamingDiagnostic, OperandSnapshot, PersistentNamingStore, Uuid,
    };

    fn fid(n: u64) -> FeatureId {
        FeatureId::from_sequence(Uuid::from_u128(2), n)
    }

    fn profile(sides: usize) -> ShapeIdentityTable {
        let mut table = ShapeIdentityTable::new();
        PersistentNamingStore::new(fid(0))
            .name(&mut table, &OperandSnapshot::new(), polygon(fid(0), sides, 1.0).unwrap())
            .unwrap();
        table
    }

    fn name(
        store: &mut PersistentNamingStore,
        profile: &ShapeIdentityTable,
        distance: f64,
        split: Option<usize>,
    ) -> ShapeIdentityTable {
        let mut snapshot = OperandSnapshot::new();
        snapshot.capture(fid(0), profile);
        let mut table = ShapeIdentityTable::new();
        store
            .name(&mut table, &snapshot, extrude(profile, distance, split).unwrap())
            .unwrap();
        table
    }

    #[test]
    fn prism_has_expected_shape() {
        let result = extrude(&profile(4), 2.0, None).unwrap();
        let t = &result.topology;
        assert_eq!(t.len(), 6 + 7 * 4);
        assert_eq!(t.of_kind(EntityKind::Face).count(), 4 + 2);
        assert_eq!(t.of_kind(EntityKind::Edge).count(), 3 * 4);
        assert_eq!(t.of_kind(EntityKind::Vertex).count(), 2 * 4);
        assert_eq!(result.correspondence.generated.len(), 4 + 4);
        assert_eq!(result.correspondence.last.len(), 1);
        assert_eq!(result.correspondence.original.len(), 2 + 2 * 4);
    }

    #[test]
    fn side_faces_keep_ids_when_distance_changes() {
        let sketch = profile(5);
        let mut store = PersistentNamingStore::new(fid(1));
        let low = name(&mut store, &sketch, 1.0, None);
        let high = name(&mut store, &sketch, 4.0, None);
        assert_ne!(low, high);
        assert_eq!(low.ids(), high.ids());

        let sketch_edge = sketch.ids_of_kind(EntityKind::Edge)[0];
        let side = store.lookup(Category::Generated, sketch_edge).unwrap();
        assert_eq!(low.kind_of(side), Some(EntityKind::Face));
        // The bottom cap reuses the sketch's ids verbatim.
        assert!(low.has_id(sketch_edge));
    }

    #[test]
    fn split_side_is_reported_and_still_named() {
        let sketch = profile(3);
        let mut store = PersistentNamingStore::new(fid(1));
        let table = name(&mut store, &sketch, 1.0, Some(1));
        assert!(table.all_nil_entities().is_empty());
        assert!(matches!(
            store.diagnostics(),
            [NamingDiagnostic::MultipleGenerated { .. }]
        ));
    }

    #[test]
    fn bad_operands_are_rejected() {
        let sketch = profile(3);
        assert!(matches!(
            extrude(&sketch, 0.0, None),
            Err(KernelError::Degenerate { what: "distance", .. })
        ));
        let prism = {
            let mut store = PersistentNamingStore::new(fid(1));
            name(&mut store, &sketch, 1.0, None)
        };
        assert_eq!(
            extrude(&prism, 1.0, None).err(),
            Some(KernelError::NoProfile { faces: 5 })
        );
        assert_eq!(
            extrude(&ShapeIdentityTable::new(), 1.0, None).err(),
            Some(KernelError::NoProfile { faces: 0 })
        );
    }
}
