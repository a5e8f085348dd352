// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Structural model of a geometry kernel result.
//!
//! The engine never looks at geometry. It only needs to know which
//! sub-entities exist, what kind each one is, how they contain one another,
//! and an opaque fingerprint that changes whenever the underlying geometry
//! does.

use alloc::collections::{BinaryHeap, VecDeque};
use alloc::vec::Vec;
use core::cmp::Reverse;

use hashbrown::HashSet;
use smallvec::SmallVec;

/// Topological kind of a sub-entity, ordered from the outermost container
/// to the innermost.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKind {
    /// Heterogeneous collection of entities.
    Compound,
    /// Closed volume.
    Solid,
    /// Connected set of faces.
    Shell,
    /// Bounded surface.
    Face,
    /// Connected chain of edges.
    Wire,
    /// Bounded curve.
    Edge,
    /// Point.
    Vertex,
}

impl EntityKind {
    /// Stable tag used when minting ids.
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::Compound => 0,
            Self::Solid => 1,
            Self::Shell => 2,
            Self::Face => 3,
            Self::Wire => 4,
            Self::Edge => 5,
            Self::Vertex => 6,
        }
    }
}

/// Handle of an entity inside one [`Topology`].
///
/// Keys are dense arena indices and carry no meaning outside the topology
/// that produced them.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityKey(u32);

impl EntityKey {
    /// Creates a key from a raw arena index.
    #[must_use]
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Arena index of this key.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Entity {
    kind: EntityKind,
    geometry: u64,
    children: SmallVec<[EntityKey; 4]>,
    parents: SmallVec<[EntityKey; 2]>,
}

/// Arena of sub-entities with containment links.
///
/// Entities may be shared: an edge bounded by two faces has two parent
/// wires. The containment relation must be acyclic; [`Topology::attach`]
/// refuses links that would close a loop.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Topology {
    entities: Vec<Entity>,
    root: Option<EntityKey>,
}

impl Topology {
    /// Creates an empty topology.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a detached entity and returns its key.
    pub fn add(&mut self, kind: EntityKind, geometry: u64) -> EntityKey {
        let index = u32::try_from(self.entities.len()).unwrap_or(u32::MAX);
        self.entities.push(Entity {
            kind,
            geometry,
            children: SmallVec::new(),
            parents: SmallVec::new(),
        });
        EntityKey(index)
    }

    /// Records that `parent` contains `child`.
    ///
    /// Returns `false` if either key is unknown, the link already exists, or
    /// the link would make `child` contain itself.
    pub fn attach(&mut self, parent: EntityKey, child: EntityKey) -> bool {
        if !self.contains(parent) || !self.contains(child) || parent == child {
            return false;
        }
        if self.entities[parent.index()].children.contains(&child) {
            return false;
        }
        if self.reaches(child, parent) {
            return false;
        }
        self.entities[parent.index()].children.push(child);
        self.entities[child.index()].parents.push(parent);
        true
    }

    /// Marks `key` as the outermost entity of the result.
    pub fn set_root(&mut self, key: EntityKey) {
        if self.contains(key) {
            self.root = Some(key);
        }
    }

    /// Outermost entity, if one was set.
    #[must_use]
    pub fn root(&self) -> Option<EntityKey> {
        self.root
    }

    /// Number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if the topology holds no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Returns `true` if `key` belongs to this topology.
    #[must_use]
    pub fn contains(&self, key: EntityKey) -> bool {
        key.index() < self.entities.len()
    }

    /// All keys in arena order.
    pub fn keys(&self) -> impl Iterator<Item = EntityKey> + '_ {
        (0..self.entities.len()).map(|i| EntityKey(i as u32))
    }

    /// Kind of `key`.
    #[must_use]
    pub fn kind(&self, key: EntityKey) -> Option<EntityKind> {
        self.entities.get(key.index()).map(|e| e.kind)
    }

    /// Geometry fingerprint of `key`.
    #[must_use]
    pub fn geometry(&self, key: EntityKey) -> Option<u64> {
        self.entities.get(key.index()).map(|e| e.geometry)
    }

    /// Entities directly contained by `key`.
    #[must_use]
    pub fn children(&self, key: EntityKey) -> &[EntityKey] {
        self.entities
            .get(key.index())
            .map_or(&[][..], |e| e.children.as_slice())
    }

    /// Entities directly containing `key`.
    #[must_use]
    pub fn parents(&self, key: EntityKey) -> &[EntityKey] {
        self.entities
            .get(key.index())
            .map_or(&[][..], |e| e.parents.as_slice())
    }

    /// Entities of `kind`, in arena order.
    pub fn of_kind(&self, kind: EntityKind) -> impl Iterator<Item = EntityKey> + '_ {
        self.keys().filter(move |&k| self.kind(k) == Some(kind))
    }

    /// Containing entities of `kind`, breadth first from `key`.
    ///
    /// The search does not continue past a match, so a face's solid is not
    /// reported when asking an edge for its faces.
    #[must_use]
    pub fn ancestors_of_kind(&self, key: EntityKey, kind: EntityKind) -> Vec<EntityKey> {
        self.breadth_first(key, kind, move |k| self.parents(k))
    }

    /// Contained entities of `kind`, breadth first from `key`.
    #[must_use]
    pub fn descendants_of_kind(&self, key: EntityKey, kind: EntityKind) -> Vec<EntityKey> {
        self.breadth_first(key, kind, move |k| self.children(k))
    }

    fn breadth_first<'a>(
        &'a self,
        start: EntityKey,
        kind: EntityKind,
        next: impl Fn(EntityKey) -> &'a [EntityKey],
    ) -> Vec<EntityKey> {
        let mut out = Vec::new();
        if !self.contains(start) {
            return out;
        }
        let mut seen = HashSet::new();
        let mut queue = VecDeque::new();
        queue.extend(next(start).iter().copied());
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current) {
                continue;
            }
            if self.kind(current) == Some(kind) {
                out.push(current);
            } else {
                queue.extend(next(current).iter().copied());
            }
        }
        out
    }

    /// Every entity, parents before children; ties broken by arena index.
    #[must_use]
    pub fn top_down_order(&self) -> Vec<EntityKey> {
        let mut remaining: Vec<usize> = self.entities.iter().map(|e| e.parents.len()).collect();
        let mut ready: BinaryHeap<Reverse<EntityKey>> = self
            .keys()
            .filter(|k| remaining[k.index()] == 0)
            .map(Reverse)
            .collect();
        let mut order = Vec::with_capacity(self.entities.len());
        while let Some(Reverse(key)) = ready.pop() {
            order.push(key);
            for &child in self.children(key) {
                remaining[child.index()] -= 1;
                if remaining[child.index()] == 0 {
                    ready.push(Reverse(child));
                }
            }
        }
        order
    }

    fn reaches(&self, from: EntityKey, to: EntityKey) -> bool {
        let mut seen = HashSet::new();
        let mut stack = Vec::new();
        stack.push(from);
        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            if seen.insert(current) {
                stack.extend(self.children(current).iter().copied());
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// face > wire > {e0, e1}, e0 > {v0, v1}, e1 > {v1, v2}
    fn open_face() -> (Topology, [EntityKey; 7]) {
        let mut t = Topology::new();
        let face = t.add(EntityKind::Face, 1);
        let wire = t.add(EntityKind::Wire, 2);
        let e0 = t.add(EntityKind::Edge, 3);
        let e1 = t.add(EntityKind::Edge, 4);
        let v0 = t.add(EntityKind::Vertex, 5);
        let v1 = t.add(EntityKind::Vertex, 6);
        let v2 = t.add(EntityKind::Vertex, 7);
        t.attach(face, wire);
        t.attach(wire, e0);
        t.attach(wire, e1);
        t.attach(e0, v0);
        t.attach(e0, v1);
        t.attach(e1, v1);
        t.attach(e1, v2);
        t.set_root(face);
        (t, [face, wire, e0, e1, v0, v1, v2])
    }

    #[test]
    fn attach_rejects_loops_and_repeats() {
        let (mut t, [face, wire, e0, ..]) = open_face();
        assert!(!t.attach(face, wire));
        assert!(!t.attach(e0, face));
        assert!(!t.attach(e0, e0));
        assert_eq!(t.parents(wire), &[face]);
    }

    #[test]
    fn shared_vertex_has_two_parents() {
        let (t, [_, _, e0, e1, _, v1, _]) = open_face();
        assert_eq!(t.parents(v1), &[e0, e1]);
    }

    #[test]
    fn ancestors_stop_at_first_match() {
        let (t, [face, _, e0, e1, _, v1, _]) = open_face();
        assert_eq!(t.ancestors_of_kind(v1, EntityKind::Edge), alloc::vec![e0, e1]);
        assert_eq!(t.ancestors_of_kind(v1, EntityKind::Face), alloc::vec![face]);
        assert!(t.ancestors_of_kind(face, EntityKind::Edge).is_empty());
    }

    #[test]
    fn descendants_dedupe_shared_entities() {
        let (t, [face, .., v0, v1, v2]) = open_face();
        assert_eq!(
            t.descendants_of_kind(face, EntityKind::Vertex),
            alloc::vec![v0, v1, v2]
        );
    }

    #[test]
    fn top_down_order_puts_parents_first() {
        let (t, keys) = open_face();
        let order = t.top_down_order();
        assert_eq!(order.len(), keys.len());
        let pos = |k: EntityKey| order.iter().position(|&o| o == k).unwrap();
        for key in t.keys() {
            for &child in t.children(key) {
                assert!(pos(key) < pos(child), "{key:?} must precede {child:?}");
            }
        }
    }
}
