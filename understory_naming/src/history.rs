// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Project-wide lineage graph.

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;

use crate::{EvolveRecord, FeatureId, ShapeId, ShapeIdentityTable};

/// A shape id as seen in one feature's output.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HistoryVertex {
    /// Feature whose table holds the id.
    pub feature: FeatureId,
    /// The id.
    pub shape: ShapeId,
}

impl HistoryVertex {
    /// Creates a vertex.
    #[must_use]
    pub const fn new(feature: FeatureId, shape: ShapeId) -> Self {
        Self { feature, shape }
    }
}

/// Directed acyclic graph of id transformations.
///
/// Each edge runs from an older vertex to the newer vertex that was derived
/// from it by one recompute step. Steps are chained by
/// [`record_step`](Self::record_step), normally in topological feature
/// order, so the graph answers "where did id X end up" by walking forward
/// ([`evolve`](Self::evolve)) and "where did it come from" by walking back
/// ([`devolve`](Self::devolve)).
#[derive(Clone, Debug, Default)]
pub struct ShapeHistory {
    vertices: Vec<HistoryVertex>,
    index: HashMap<HistoryVertex, usize>,
    by_shape: HashMap<ShapeId, SmallVec<[usize; 2]>>,
    older: Vec<SmallVec<[usize; 2]>>,
    newer: Vec<SmallVec<[usize; 2]>>,
}

impl ShapeHistory {
    /// Creates an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes every vertex and edge.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.index.clear();
        self.by_shape.clear();
        self.older.clear();
        self.newer.clear();
    }

    /// Number of vertices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Returns `true` if the history holds no vertices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Returns `true` if `vertex` is part of the history.
    #[must_use]
    pub fn contains(&self, vertex: HistoryVertex) -> bool {
        self.index.contains_key(&vertex)
    }

    /// Every vertex, in insertion order.
    #[must_use]
    pub fn vertices(&self) -> &[HistoryVertex] {
        &self.vertices
    }

    /// Vertices carrying `shape`, in insertion order.
    pub fn vertices_with_shape(&self, shape: ShapeId) -> impl Iterator<Item = HistoryVertex> + '_ {
        self.by_shape
            .get(&shape)
            .into_iter()
            .flat_map(|slots| slots.iter().map(|&i| self.vertices[i]))
    }

    /// Adds `vertex` if it is not present yet.
    pub fn add_vertex(&mut self, vertex: HistoryVertex) {
        self.slot(vertex);
    }

    fn slot(&mut self, vertex: HistoryVertex) -> usize {
        if let Some(&i) = self.index.get(&vertex) {
            return i;
        }
        let i = self.vertices.len();
        self.vertices.push(vertex);
        self.index.insert(vertex, i);
        self.by_shape.entry(vertex.shape).or_default().push(i);
        self.older.push(SmallVec::new());
        self.newer.push(SmallVec::new());
        i
    }

    /// Links `older` to `newer`, adding both vertices as needed.
    ///
    /// Returns `false` if the link already existed or would point a vertex
    /// at itself.
    pub fn link(&mut self, older: HistoryVertex, newer: HistoryVertex) -> bool {
        if older == newer {
            return false;
        }
        let o = self.slot(older);
        let n = self.slot(newer);
        if self.newer[o].contains(&n) {
            return false;
        }
        self.newer[o].push(n);
        self.older[n].push(o);
        true
    }

    /// Chains one feature's recompute step onto the history.
    ///
    /// Adds a vertex for every id in `table` and, for each record with an old
    /// id, links the vertex of every `sources` table holding that id to the
    /// record's new id.
    pub fn record_step(
        &mut self,
        feature: FeatureId,
        table: &ShapeIdentityTable,
        records: &[EvolveRecord],
        sources: &[(FeatureId, &ShapeIdentityTable)],
    ) {
        for id in table.ids() {
            self.add_vertex(HistoryVertex::new(feature, id));
        }
        for record in records {
            let Some(old) = record.old else {
                continue;
            };
            if !table.has_id(record.new) {
                continue;
            }
            for &(source, source_table) in sources {
                if source_table.has_id(old) {
                    self.link(
                        HistoryVertex::new(source, old),
                        HistoryVertex::new(feature, record.new),
                    );
                }
            }
        }
    }

    /// Every vertex reachable forward from `vertex`, breadth first.
    #[must_use]
    pub fn evolve(&self, vertex: HistoryVertex) -> Vec<HistoryVertex> {
        self.walk(vertex, &self.newer)
    }

    /// Every vertex reachable backward from `vertex`, breadth first.
    #[must_use]
    pub fn devolve(&self, vertex: HistoryVertex) -> Vec<HistoryVertex> {
        self.walk(vertex, &self.older)
    }

    fn walk(&self, vertex: HistoryVertex, edges: &[SmallVec<[usize; 2]>]) -> Vec<HistoryVertex> {
        let Some(&start) = self.index.get(&vertex) else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        seen.insert(start);
        let mut queue: VecDeque<usize> = edges[start].iter().copied().collect();
        let mut out = Vec::new();
        while let Some(i) = queue.pop_front() {
            if !seen.insert(i) {
                continue;
            }
            out.push(self.vertices[i]);
            queue.extend(edges[i].iter().copied());
        }
        out
    }

    /// Captures the lineage of `shape`: every vertex carrying it plus all of
    /// their ancestors, with the edges between them.
    ///
    /// The capture is resolved later against whatever the history has become
    /// by then; see [`resolve_picks`](crate::resolve_picks).
    #[must_use]
    pub fn create_devolve_history(&self, shape: ShapeId) -> DevolveHistory {
        let mut lineage = Self::new();
        let mut keep: HashSet<usize> = HashSet::new();
        for vertex in self.vertices_with_shape(shape) {
            lineage.add_vertex(vertex);
            keep.insert(self.index[&vertex]);
            for ancestor in self.devolve(vertex) {
                keep.insert(self.index[&ancestor]);
            }
        }
        let mut kept: Vec<usize> = keep.into_iter().collect();
        kept.sort_unstable();
        for &i in &kept {
            lineage.add_vertex(self.vertices[i]);
            for &o in &self.older[i] {
                lineage.link(self.vertices[o], self.vertices[i]);
            }
        }
        DevolveHistory { shape, lineage }
    }
}

/// The lineage of one id at the moment it was captured.
#[derive(Clone, Debug)]
pub struct DevolveHistory {
    shape: ShapeId,
    lineage: ShapeHistory,
}

impl DevolveHistory {
    /// The captured id.
    #[must_use]
    pub fn shape(&self) -> ShapeId {
        self.shape
    }

    /// The captured subgraph.
    #[must_use]
    pub fn lineage(&self) -> &ShapeHistory {
        &self.lineage
    }

    /// Captured vertices that do not carry the captured id.
    pub fn ancestors(&self) -> impl Iterator<Item = HistoryVertex> + '_ {
        self.lineage
            .vertices()
            .iter()
            .copied()
            .filter(|v| v.shape != self.shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn fid(n: u64) -> FeatureId {
        FeatureId::from_sequence(Uuid::from_u128(3), n)
    }

    fn sid(name: &str) -> ShapeId {
        ShapeId::mint(fid(99), name.as_bytes())
    }

    fn v(f: u64, s: &str) -> HistoryVertex {
        HistoryVertex::new(fid(f), sid(s))
    }

    #[test]
    fn evolve_and_devolve_walk_opposite_ways() {
        let mut h = ShapeHistory::new();
        h.link(v(0, "edge"), v(1, "face"));
        h.link(v(1, "face"), v(2, "face2"));
        assert_eq!(h.evolve(v(0, "edge")), alloc::vec![v(1, "face"), v(2, "face2")]);
        assert_eq!(h.devolve(v(2, "face2")), alloc::vec![v(1, "face"), v(0, "edge")]);
        assert!(h.evolve(v(7, "nothing")).is_empty());
    }

    #[test]
    fn link_is_idempotent_and_rejects_self() {
        let mut h = ShapeHistory::new();
        assert!(h.link(v(0, "a"), v(1, "a")));
        assert!(!h.link(v(0, "a"), v(1, "a")));
        assert!(!h.link(v(0, "a"), v(0, "a")));
        assert_eq!(h.len(), 2);
        assert_eq!(h.vertices_with_shape(sid("a")).count(), 2);
    }

    #[test]
    fn devolve_capture_holds_ancestors_only() {
        let mut h = ShapeHistory::new();
        h.link(v(0, "edge"), v(1, "face"));
        h.link(v(1, "face"), v(2, "other"));
        h.add_vertex(v(0, "unrelated"));

        let capture = h.create_devolve_history(sid("face"));
        assert_eq!(capture.shape(), sid("face"));
        assert_eq!(capture.lineage().len(), 2);
        assert!(capture.lineage().contains(v(0, "edge")));
        assert!(!capture.lineage().contains(v(2, "other")));
        assert_eq!(capture.ancestors().collect::<Vec<_>>(), alloc::vec![v(0, "edge")]);
    }
}
