// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The feature dependency graph.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;

use hashbrown::HashMap;
use smallvec::SmallVec;
use understory_naming::{FeatureId, PersistentNamingStore, ShapeIdentityTable, Uuid};

use crate::order::deterministic_order;
use crate::scratch::TraversalScratch;
use crate::{Descriptor, Feature, GraphError, Parameters, Role, RoleSet};

/// Namespace used by [`FeatureGraph::new`] to mint feature ids.
pub const DEFAULT_NAMESPACE: Uuid = Uuid::from_u128(0x8d2f_6a51_0c3e_4b7a_9e15_2f60_d4c8_a713);

/// One alive feature and everything the graph owns on its behalf.
#[derive(Debug)]
pub(crate) struct FeatureNode {
    pub(crate) feature: Box<dyn Feature>,
    pub(crate) parameters: Parameters,
    pub(crate) table: ShapeIdentityTable,
    pub(crate) naming: PersistentNamingStore,
    pub(crate) last_error: Option<String>,
}

/// DAG of features connected by role-tagged edges.
///
/// An edge `parent -> child` means the child consumes the parent's output.
/// Every mutation keeps the graph acyclic: an edge that would close a cycle
/// is rejected with [`GraphError::CycleDetected`] and nothing changes.
///
/// Features live in insertion-ordered slots. A removed feature's slot is
/// never reused, so the slot index doubles as the stable tie-break of
/// [`topological_order`](Self::topological_order).
///
/// # Example
///
/// ```
/// use understory_recompute::{
///     ComputeContext, ComputeError, Feature, FeatureGraph, FeatureKind, GraphError, Role,
/// };
///
/// #[derive(Debug)]
/// struct Step;
/// impl Feature for Step {
///     fn kind(&self) -> FeatureKind {
///         FeatureKind::new("step")
///     }
///     fn compute(&self, _: &mut ComputeContext<'_>) -> Result<(), ComputeError> {
///         Ok(())
///     }
/// }
///
/// let mut graph = FeatureGraph::new();
/// let a = graph.add_feature(Step);
/// let b = graph.add_feature(Step);
/// graph.connect(a, b, Role::Target).unwrap();
///
/// assert_eq!(
///     graph.connect(b, a, Role::Tool),
///     Err(GraphError::CycleDetected { parent: b, child: a })
/// );
/// assert_eq!(graph.topological_order(|_| true), vec![a, b]);
/// ```
#[derive(Debug)]
pub struct FeatureGraph {
    namespace: Uuid,
    next_sequence: u64,
    ids: Vec<FeatureId>,
    nodes: Vec<Option<FeatureNode>>,
    slots: HashMap<FeatureId, usize>,
    parents: Vec<SmallVec<[usize; 2]>>,
    children: Vec<SmallVec<[usize; 4]>>,
    roles: HashMap<(usize, usize), RoleSet>,
    generation: u64,
}

impl Default for FeatureGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureGraph {
    /// Creates an empty graph minting ids in [`DEFAULT_NAMESPACE`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_namespace(DEFAULT_NAMESPACE)
    }

    /// Creates an empty graph minting ids in `namespace`.
    ///
    /// Two graphs with the same namespace and the same sequence of
    /// [`add_feature`](Self::add_feature) calls hand out the same ids.
    #[must_use]
    pub fn with_namespace(namespace: Uuid) -> Self {
        Self {
            namespace,
            next_sequence: 0,
            ids: Vec::new(),
            nodes: Vec::new(),
            slots: HashMap::new(),
            parents: Vec::new(),
            children: Vec::new(),
            roles: HashMap::new(),
            generation: 0,
        }
    }

    /// The id namespace.
    #[must_use]
    pub fn namespace(&self) -> Uuid {
        self.namespace
    }

    /// Topology generation, bumped by every structural mutation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of alive features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if the graph has no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Adds a feature under the next id of the namespace sequence.
    pub fn add_feature<F: Feature + 'static>(&mut self, feature: F) -> FeatureId {
        self.add_boxed(Box::new(feature))
    }

    /// Adds an already boxed feature.
    pub fn add_boxed(&mut self, feature: Box<dyn Feature>) -> FeatureId {
        let mut id = FeatureId::from_sequence(self.namespace, self.next_sequence);
        self.next_sequence += 1;
        // Only reachable if a caller picked a sequence id by hand.
        while self.slots.contains_key(&id) {
            id = FeatureId::from_sequence(self.namespace, self.next_sequence);
            self.next_sequence += 1;
        }
        self.insert(id, feature);
        id
    }

    /// Adds a feature under a caller-chosen id.
    pub fn add_feature_with_id<F: Feature + 'static>(
        &mut self,
        id: FeatureId,
        feature: F,
    ) -> Result<FeatureId, GraphError> {
        if self.slots.contains_key(&id) {
            return Err(GraphError::DuplicateFeature(id));
        }
        self.insert(id, Box::new(feature));
        Ok(id)
    }

    fn insert(&mut self, id: FeatureId, feature: Box<dyn Feature>) {
        let slot = self.ids.len();
        let parameters = feature.parameters();
        tracing::debug!(feature = %id, kind = %feature.kind(), slot, "feature added");
        self.ids.push(id);
        self.nodes.push(Some(FeatureNode {
            feature,
            parameters,
            table: ShapeIdentityTable::new(),
            naming: PersistentNamingStore::new(id),
            last_error: None,
        }));
        self.slots.insert(id, slot);
        self.parents.push(SmallVec::new());
        self.children.push(SmallVec::new());
        self.generation = self.generation.wrapping_add(1);
    }

    /// Removes a feature that has no edges left and returns it.
    ///
    /// Fails with [`GraphError::HasDependents`] while any edge touches it.
    pub fn remove_feature(&mut self, id: FeatureId) -> Result<Box<dyn Feature>, GraphError> {
        let slot = self.slot(id)?;
        let in_degree = self.parents[slot].len();
        let out_degree = self.children[slot].len();
        if in_degree != 0 || out_degree != 0 {
            return Err(GraphError::HasDependents {
                feature: id,
                in_degree,
                out_degree,
            });
        }
        let node = self.nodes[slot].take().ok_or(GraphError::NotFound(id))?;
        self.slots.remove(&id);
        self.generation = self.generation.wrapping_add(1);
        tracing::debug!(feature = %id, "feature removed");
        Ok(node.feature)
    }

    /// Returns `true` if `id` is an alive feature.
    #[must_use]
    pub fn has_feature(&self, id: FeatureId) -> bool {
        self.slots.contains_key(&id)
    }

    /// Every alive feature id, in insertion order.
    #[must_use]
    pub fn feature_ids(&self) -> Vec<FeatureId> {
        self.ids
            .iter()
            .enumerate()
            .filter(|&(slot, id)| self.slots.get(id) == Some(&slot))
            .map(|(_, id)| *id)
            .collect()
    }

    /// The feature behind `id`.
    pub fn find_feature(&self, id: FeatureId) -> Result<&dyn Feature, GraphError> {
        self.node(id).map(|node| &*node.feature)
    }

    /// Current parameters of `id`.
    pub fn parameters(&self, id: FeatureId) -> Result<&Parameters, GraphError> {
        self.node(id).map(|node| &node.parameters)
    }

    pub(crate) fn parameters_mut(&mut self, id: FeatureId) -> Result<&mut Parameters, GraphError> {
        self.node_mut(id).map(|node| &mut node.parameters)
    }

    /// Current output of `id`.
    pub fn table(&self, id: FeatureId) -> Result<&ShapeIdentityTable, GraphError> {
        self.node(id).map(|node| &node.table)
    }

    /// Naming store of `id`: its lineage maps and the records of its last
    /// compute step.
    pub fn naming(&self, id: FeatureId) -> Result<&PersistentNamingStore, GraphError> {
        self.node(id).map(|node| &node.naming)
    }

    /// Message of the last failed compute step of `id`, cleared by the next
    /// success.
    pub fn last_error(&self, id: FeatureId) -> Result<Option<&str>, GraphError> {
        self.node(id).map(|node| node.last_error.as_deref())
    }

    /// Connects `parent -> child`, merging `roles` onto an existing edge.
    ///
    /// Returns `true` if a new edge was created.
    pub fn connect(
        &mut self,
        parent: FeatureId,
        child: FeatureId,
        roles: impl Into<RoleSet>,
    ) -> Result<bool, GraphError> {
        let p = self.slot(parent)?;
        let c = self.slot(child)?;
        let roles = roles.into();
        if let Some(existing) = self.roles.get_mut(&(p, c)) {
            existing.merge(&roles);
            tracing::debug!(%parent, %child, roles = %existing, "roles merged");
            return Ok(false);
        }
        if self.would_create_cycle(p, c) {
            return Err(GraphError::CycleDetected { parent, child });
        }
        self.link(p, c, roles);
        Ok(true)
    }

    /// Connects like [`connect`](Self::connect), but splices `child` into an
    /// existing chain when possible.
    ///
    /// If `child` is an [`Alter`](Descriptor::Alter) feature and `parent`
    /// already feeds another `Alter` feature through a [`Role::Target`] edge,
    /// the result is `parent -> child -> old`: the old edge's roles move to
    /// `child -> old` and `parent -> child` gets `roles`. Returns the
    /// displaced feature, which now has a new input. All cycle checks run
    /// before anything changes.
    pub fn connect_insert(
        &mut self,
        parent: FeatureId,
        child: FeatureId,
        roles: impl Into<RoleSet>,
    ) -> Result<Option<FeatureId>, GraphError> {
        let p = self.slot(parent)?;
        let c = self.slot(child)?;
        let roles = roles.into();
        let Some(old) = self.splice_candidate(p, c) else {
            self.connect(parent, child, roles)?;
            return Ok(None);
        };
        let old_id = self.ids[old];

        if self.would_create_cycle(p, c) {
            return Err(GraphError::CycleDetected { parent, child });
        }
        if !self.roles.contains_key(&(c, old)) && self.would_create_cycle(c, old) {
            return Err(GraphError::CycleDetected {
                parent: child,
                child: old_id,
            });
        }

        let moved = self.unlink(p, old).unwrap_or_default();
        match self.roles.get_mut(&(c, old)) {
            Some(existing) => {
                existing.merge(&moved);
            }
            None => self.link(c, old, moved),
        }
        match self.roles.get_mut(&(p, c)) {
            Some(existing) => {
                existing.merge(&roles);
            }
            None => self.link(p, c, roles),
        }
        tracing::debug!(%parent, %child, displaced = %old_id, "feature spliced into chain");
        Ok(Some(old_id))
    }

    fn splice_candidate(&self, p: usize, c: usize) -> Option<usize> {
        if !self.is_alter(c) {
            return None;
        }
        let mut candidates: SmallVec<[usize; 4]> = self.children[p]
            .iter()
            .copied()
            .filter(|&old| {
                old != c
                    && self.is_alter(old)
                    && self
                        .roles
                        .get(&(p, old))
                        .is_some_and(|r| r.contains(&Role::Target))
            })
            .collect();
        candidates.sort_unstable();
        candidates.first().copied()
    }

    fn is_alter(&self, slot: usize) -> bool {
        self.nodes[slot]
            .as_ref()
            .is_some_and(|node| node.feature.descriptor() == Descriptor::Alter)
    }

    /// Removes the edge `parent -> child` and returns its roles.
    pub fn disconnect(
        &mut self,
        parent: FeatureId,
        child: FeatureId,
    ) -> Result<RoleSet, GraphError> {
        let p = self.slot(parent)?;
        let c = self.slot(child)?;
        let roles = self
            .unlink(p, c)
            .ok_or(GraphError::NotConnected { parent, child })?;
        tracing::debug!(%parent, %child, "disconnected");
        Ok(roles)
    }

    /// Removes one role from the edge `parent -> child`, and the edge itself
    /// once no role is left.
    ///
    /// Returns `true` if the edge was removed.
    pub fn disconnect_role(
        &mut self,
        parent: FeatureId,
        child: FeatureId,
        role: &Role,
    ) -> Result<bool, GraphError> {
        let p = self.slot(parent)?;
        let c = self.slot(child)?;
        let roles = self
            .roles
            .get_mut(&(p, c))
            .ok_or(GraphError::NotConnected { parent, child })?;
        roles.remove(role);
        if roles.is_empty() {
            self.unlink(p, c);
            return Ok(true);
        }
        Ok(false)
    }

    /// Removes every incoming edge of `child` and returns the former
    /// parents.
    pub fn clear_inputs(&mut self, child: FeatureId) -> Result<Vec<FeatureId>, GraphError> {
        let c = self.slot(child)?;
        let parents: Vec<usize> = self.parents[c].to_vec();
        for &p in &parents {
            self.unlink(p, c);
        }
        Ok(parents.into_iter().map(|p| self.ids[p]).collect())
    }

    /// Roles on the edge `parent -> child`, if connected.
    #[must_use]
    pub fn roles(&self, parent: FeatureId, child: FeatureId) -> Option<&RoleSet> {
        let p = *self.slots.get(&parent)?;
        let c = *self.slots.get(&child)?;
        self.roles.get(&(p, c))
    }

    /// Direct inputs of `id` with their roles, in insertion order.
    pub fn parents(&self, id: FeatureId) -> impl Iterator<Item = (FeatureId, &RoleSet)> + '_ {
        let slot = self.slots.get(&id).copied();
        slot.into_iter().flat_map(move |c| {
            self.parents[c]
                .iter()
                .filter_map(move |&p| Some((self.ids[p], self.roles.get(&(p, c))?)))
        })
    }

    /// Direct consumers of `id` with their roles, in insertion order.
    pub fn children(&self, id: FeatureId) -> impl Iterator<Item = (FeatureId, &RoleSet)> + '_ {
        let slot = self.slots.get(&id).copied();
        slot.into_iter().flat_map(move |p| {
            self.children[p]
                .iter()
                .filter_map(move |&c| Some((self.ids[c], self.roles.get(&(p, c))?)))
        })
    }

    /// Number of incoming edges of `id`.
    #[must_use]
    pub fn in_degree(&self, id: FeatureId) -> usize {
        self.slots.get(&id).map_or(0, |&s| self.parents[s].len())
    }

    /// Number of outgoing edges of `id`.
    #[must_use]
    pub fn out_degree(&self, id: FeatureId) -> usize {
        self.slots.get(&id).map_or(0, |&s| self.children[s].len())
    }

    /// Calls `f` once for every feature reachable from `id` through
    /// outgoing edges, `id` excluded.
    pub fn for_each_dependent(
        &self,
        id: FeatureId,
        scratch: &mut TraversalScratch,
        mut f: impl FnMut(FeatureId),
    ) {
        let Some(&start) = self.slots.get(&id) else {
            return;
        };
        scratch.reset();
        scratch.visited.insert(start);
        scratch.stack.extend(self.children[start].iter().copied());
        while let Some(slot) = scratch.stack.pop() {
            if !scratch.visited.insert(slot) {
                continue;
            }
            f(self.ids[slot]);
            scratch.stack.extend(self.children[slot].iter().copied());
        }
    }

    /// Every feature reachable from `id` through outgoing edges, `id`
    /// excluded, in insertion order.
    #[must_use]
    pub fn transitive_dependents(&self, id: FeatureId) -> Vec<FeatureId> {
        let mut scratch = TraversalScratch::new();
        let mut slots = Vec::new();
        self.for_each_dependent(id, &mut scratch, |dep| {
            if let Some(&slot) = self.slots.get(&dep) {
                slots.push(slot);
            }
        });
        slots.sort_unstable();
        slots.into_iter().map(|s| self.ids[s]).collect()
    }

    /// Alive features accepted by `include`, parents before children.
    ///
    /// Edges through rejected features are ignored. Ties are broken by
    /// insertion order, so identical graphs yield identical orders.
    #[must_use]
    pub fn topological_order(&self, include: impl Fn(FeatureId) -> bool) -> Vec<FeatureId> {
        let alive = |slot: usize| self.slots.get(&self.ids[slot]) == Some(&slot);
        deterministic_order(&self.parents, &self.children, |slot| {
            alive(slot) && include(self.ids[slot])
        })
        .into_iter()
        .map(|slot| self.ids[slot])
        .collect()
    }

    fn would_create_cycle(&self, parent: usize, child: usize) -> bool {
        // A cycle appears if `parent` is reachable from `child`.
        let mut scratch = TraversalScratch::new();
        scratch.stack.push(child);
        while let Some(current) = scratch.stack.pop() {
            if current == parent {
                return true;
            }
            if !scratch.visited.insert(current) {
                continue;
            }
            scratch.stack.extend(self.children[current].iter().copied());
        }
        false
    }

    fn link(&mut self, p: usize, c: usize, roles: RoleSet) {
        tracing::debug!(parent = %self.ids[p], child = %self.ids[c], %roles, "connected");
        insert_sorted(&mut self.children[p], c);
        insert_sorted(&mut self.parents[c], p);
        self.roles.insert((p, c), roles);
        self.generation = self.generation.wrapping_add(1);
    }

    fn unlink(&mut self, p: usize, c: usize) -> Option<RoleSet> {
        let roles = self.roles.remove(&(p, c))?;
        self.children[p].retain(|s| *s != c);
        self.parents[c].retain(|s| *s != p);
        self.generation = self.generation.wrapping_add(1);
        Some(roles)
    }

    pub(crate) fn slot(&self, id: FeatureId) -> Result<usize, GraphError> {
        self.slots.get(&id).copied().ok_or(GraphError::NotFound(id))
    }

    fn node(&self, id: FeatureId) -> Result<&FeatureNode, GraphError> {
        let slot = self.slot(id)?;
        self.nodes[slot].as_ref().ok_or(GraphError::NotFound(id))
    }

    fn node_mut(&mut self, id: FeatureId) -> Result<&mut FeatureNode, GraphError> {
        let slot = self.slot(id)?;
        self.nodes[slot].as_mut().ok_or(GraphError::NotFound(id))
    }

    /// Moves a node out so it can be computed against the rest of the graph.
    pub(crate) fn take_node(&mut self, id: FeatureId) -> Result<FeatureNode, GraphError> {
        let slot = self.slot(id)?;
        self.nodes[slot].take().ok_or(GraphError::NotFound(id))
    }

    pub(crate) fn restore_node(&mut self, id: FeatureId, node: FeatureNode) {
        if let Some(&slot) = self.slots.get(&id) {
            self.nodes[slot] = Some(node);
        }
    }

    pub(crate) fn node_parts(
        &self,
        id: FeatureId,
    ) -> Option<(&dyn Feature, &ShapeIdentityTable, &PersistentNamingStore)> {
        let node = self.node(id).ok()?;
        Some((&*node.feature, &node.table, &node.naming))
    }
}

fn insert_sorted<A: smallvec::Array<Item = usize>>(list: &mut SmallVec<A>, slot: usize) {
    if let Err(pos) = list.binary_search(&slot) {
        list.insert(pos, slot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Stub;
    use alloc::vec;

    fn chain(n: usize) -> (FeatureGraph, Vec<FeatureId>) {
        let mut g = FeatureGraph::new();
        let ids: Vec<_> = (0..n).map(|_| g.add_feature(Stub::alter())).collect();
        for w in ids.windows(2) {
            g.connect(w[0], w[1], Role::Target).unwrap();
        }
        (g, ids)
    }

    #[test]
    fn ids_follow_namespace_sequence() {
        let mut a = FeatureGraph::with_namespace(Uuid::from_u128(7));
        let mut b = FeatureGraph::with_namespace(Uuid::from_u128(7));
        assert_eq!(a.add_feature(Stub::alter()), b.add_feature(Stub::alter()));
        assert_eq!(
            a.add_feature(Stub::alter()),
            FeatureId::from_sequence(Uuid::from_u128(7), 1)
        );
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let mut g = FeatureGraph::new();
        let a = g.add_feature(Stub::alter());
        assert_eq!(
            g.add_feature_with_id(a, Stub::alter()).err(),
            Some(GraphError::DuplicateFeature(a))
        );
        assert_eq!(g.len(), 1);
        // The sequence skips ids taken by hand.
        let next = FeatureId::from_sequence(DEFAULT_NAMESPACE, 1);
        g.add_feature_with_id(next, Stub::alter()).unwrap();
        let c = g.add_feature(Stub::alter());
        assert_ne!(c, next);
        assert_eq!(g.feature_ids(), vec![a, next, c]);
    }

    #[test]
    fn self_loop_and_cycles_are_rejected_unchanged() {
        let (mut g, ids) = chain(4);
        let generation = g.generation();
        assert_eq!(
            g.connect(ids[0], ids[0], Role::Tool),
            Err(GraphError::CycleDetected {
                parent: ids[0],
                child: ids[0]
            })
        );
        assert!(matches!(
            g.connect(ids[1], ids[0], Role::Tool),
            Err(GraphError::CycleDetected { .. })
        ));
        assert!(matches!(
            g.connect(ids[3], ids[0], Role::Tool),
            Err(GraphError::CycleDetected { .. })
        ));
        assert_eq!(g.generation(), generation);
        assert_eq!(g.in_degree(ids[0]), 0);
    }

    #[test]
    fn roles_merge_onto_one_edge() {
        let (mut g, ids) = chain(2);
        assert_eq!(g.connect(ids[0], ids[1], Role::Tool), Ok(false));
        assert_eq!(g.out_degree(ids[0]), 1);
        let roles = g.roles(ids[0], ids[1]).unwrap();
        assert!(roles.contains(&Role::Target) && roles.contains(&Role::Tool));
    }

    #[test]
    fn remove_requires_no_edges() {
        let (mut g, ids) = chain(2);
        assert_eq!(
            g.remove_feature(ids[0]).err(),
            Some(GraphError::HasDependents {
                feature: ids[0],
                in_degree: 0,
                out_degree: 1
            })
        );
        assert!(g.roles(ids[0], ids[1]).is_some());
        g.disconnect(ids[0], ids[1]).unwrap();
        g.remove_feature(ids[0]).unwrap();
        assert!(!g.has_feature(ids[0]));
        assert_eq!(g.find_feature(ids[0]).err(), Some(GraphError::NotFound(ids[0])));
        assert_eq!(g.topological_order(|_| true), vec![ids[1]]);
    }

    #[test]
    fn disconnect_role_drops_edge_when_empty() {
        let (mut g, ids) = chain(2);
        g.connect(ids[0], ids[1], Role::Tool).unwrap();
        assert_eq!(g.disconnect_role(ids[0], ids[1], &Role::Tool), Ok(false));
        assert_eq!(g.disconnect_role(ids[0], ids[1], &Role::Target), Ok(true));
        assert_eq!(
            g.disconnect(ids[0], ids[1]),
            Err(GraphError::NotConnected {
                parent: ids[0],
                child: ids[1]
            })
        );
    }

    #[test]
    fn clear_inputs_returns_former_parents() {
        let mut g = FeatureGraph::new();
        let a = g.add_feature(Stub::create());
        let b = g.add_feature(Stub::create());
        let c = g.add_feature(Stub::alter());
        g.connect(b, c, Role::Tool).unwrap();
        g.connect(a, c, Role::Target).unwrap();
        assert_eq!(g.clear_inputs(c).unwrap(), vec![a, b]);
        assert_eq!(g.in_degree(c), 0);
    }

    #[test]
    fn connect_insert_splices_alter_chain() {
        let mut g = FeatureGraph::new();
        let sketch = g.add_feature(Stub::create());
        let extrude = g.add_feature(Stub::alter());
        g.connect(sketch, extrude, Role::Target).unwrap();
        let fillet = g.add_feature(Stub::alter());

        assert_eq!(g.connect_insert(sketch, fillet, Role::Target), Ok(Some(extrude)));
        assert!(g.roles(sketch, extrude).is_none());
        assert!(g.roles(fillet, extrude).unwrap().contains(&Role::Target));
        assert!(g.roles(sketch, fillet).unwrap().contains(&Role::Target));
        assert_eq!(g.topological_order(|_| true), vec![sketch, fillet, extrude]);
    }

    #[test]
    fn connect_insert_without_candidate_is_connect() {
        let mut g = FeatureGraph::new();
        let a = g.add_feature(Stub::create());
        let b = g.add_feature(Stub::create());
        assert_eq!(g.connect_insert(a, b, Role::Tool), Ok(None));
        assert!(g.roles(a, b).is_some());
    }

    #[test]
    fn connect_insert_checks_before_mutating() {
        let mut g = FeatureGraph::new();
        let a = g.add_feature(Stub::create());
        let old = g.add_feature(Stub::alter());
        let child = g.add_feature(Stub::alter());
        g.connect(a, old, Role::Target).unwrap();
        g.connect(old, child, Role::Tool).unwrap();
        // Splicing `child` above `old` would need child -> old.
        assert!(matches!(
            g.connect_insert(a, child, Role::Target),
            Err(GraphError::CycleDetected { .. })
        ));
        assert!(g.roles(a, old).is_some());
        assert!(g.roles(a, child).is_none());
    }

    #[test]
    fn dependents_and_order_are_deterministic() {
        let mut g = FeatureGraph::new();
        let ids: Vec<_> = (0..5).map(|_| g.add_feature(Stub::alter())).collect();
        g.connect(ids[4], ids[1], Role::Target).unwrap();
        g.connect(ids[1], ids[0], Role::Target).unwrap();
        g.connect(ids[4], ids[3], Role::Tool).unwrap();
        assert_eq!(g.transitive_dependents(ids[4]), vec![ids[0], ids[1], ids[3]]);
        assert_eq!(
            g.topological_order(|_| true),
            vec![ids[2], ids[4], ids[1], ids[0], ids[3]]
        );
        assert_eq!(
            g.topological_order(|id| id != ids[1]),
            vec![ids[0], ids[2], ids[4], ids[3]]
        );
    }
}
