// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Regular polygon profiles.

use alloc::format;
use alloc::vec::Vec;

use understory_naming::{Correspondence, EntityKind, FeatureId, OperationResult, ShapeId, Topology};

use crate::KernelError;
use crate::geometry::{SKETCH, fingerprint, positive};

/// A closed regular polygon of `sides` edges and circumradius `radius`.
///
/// The result is `compound > face > wire > edges > vertices`, with vertex
/// `i` shared by edges `i - 1` and `i`. The face and every edge are seeded
/// with ids minted from `owner` (`"face"`, `"edge-0"`, ...), so the profile
/// keeps its ids for as long as its side count does. The wire and the
/// vertices are left to the derived pass.
pub fn polygon(
    owner: FeatureId,
    sides: usize,
    radius: f64,
) -> Result<OperationResult, KernelError> {
    if sides < 3 {
        return Err(KernelError::TooFewSides(sides));
    }
    let radius = positive("radius", radius)?.to_bits();
    let n = sides as u64;

    let mut topology = Topology::new();
    let compound = topology.add(EntityKind::Compound, fingerprint(&[SKETCH, radius, n]));
    let face = topology.add(EntityKind::Face, fingerprint(&[SKETCH, radius, n, 1]));
    let wire = topology.add(EntityKind::Wire, fingerprint(&[SKETCH, radius, n, 2]));
    topology.attach(compound, face);
    topology.attach(face, wire);
    topology.set_root(compound);

    let vertices: Vec<_> = (0..n)
        .map(|i| topology.add(EntityKind::Vertex, fingerprint(&[SKETCH, radius, n, 3, i])))
        .collect();

    let mut correspondence = Correspondence::new();
    correspondence.add_seeded(ShapeId::mint(owner, b"face"), face);
    for i in 0..sides {
        let edge = topology.add(
            EntityKind::Edge,
            fingerprint(&[SKETCH, radius, n, 4, i as u64]),
        );
        topology.attach(wire, edge);
        topology.attach(edge, vertices[i]);
        topology.attach(edge, vertices[(i + 1) % sides]);
        correspondence.add_seeded(ShapeId::mint(owner, format!("edge-{i}").as_bytes()), edge);
    }

    tracing::trace!(feature = %owner, sides, "polygon profile built");
    Ok(OperationResult {
        topology,
        correspondence,
    })
}
