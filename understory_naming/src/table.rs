// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-feature id ↔ sub-entity map.

use alloc::vec::Vec;

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::error::{NamingError, TableError};
use crate::{EntityKey, EntityKind, ShapeId, Topology};

/// Bidirectional map between stable ids and the sub-entities of one
/// feature's current output.
///
/// The forward direction is a dense `Option<ShapeId>` per entity, the
/// reverse direction a multi-index from id to entities. Both are updated by
/// the same calls so that `find_id(e) == Some(id)` holds exactly when `e` is
/// one of the entities reported for `id`.
///
/// An id may transiently be carried by several entities while a naming run
/// is in progress; [`ensure_no_duplicates`](Self::ensure_no_duplicates) turns
/// that into an error at the end of the run.
///
/// Two tables compare equal when their topology (including geometry
/// fingerprints) and id assignment are equal.
#[derive(Clone, Debug, Default)]
pub struct ShapeIdentityTable {
    topology: Topology,
    ids: Vec<Option<ShapeId>>,
    by_id: HashMap<ShapeId, SmallVec<[EntityKey; 1]>>,
}

impl PartialEq for ShapeIdentityTable {
    fn eq(&self, other: &Self) -> bool {
        self.topology == other.topology && self.ids == other.ids
    }
}

impl Eq for ShapeIdentityTable {}

impl ShapeIdentityTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the table's content with a fresh kernel result.
    ///
    /// Every entity starts without an id except the topology's root, which
    /// receives `root_id`.
    pub fn set_root_shape(&mut self, topology: Topology, root_id: ShapeId) {
        self.ids.clear();
        self.ids.resize(topology.len(), None);
        self.by_id.clear();
        let root = topology.root();
        self.topology = topology;
        if let Some(root) = root {
            self.ids[root.index()] = Some(root_id);
            self.by_id.entry(root_id).or_default().push(root);
        }
    }

    /// Removes every entity.
    pub fn clear(&mut self) {
        self.topology = Topology::new();
        self.ids.clear();
        self.by_id.clear();
    }

    /// Number of entities, named or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` if the table holds no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// The kernel result this table names.
    #[must_use]
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Id of the topology's root entity.
    #[must_use]
    pub fn root_id(&self) -> Option<ShapeId> {
        self.topology.root().and_then(|root| self.find_id(root))
    }

    /// Assigns `id` to `entity`, returning the id it carried before.
    pub fn update_id(
        &mut self,
        entity: EntityKey,
        id: ShapeId,
    ) -> Result<Option<ShapeId>, TableError> {
        let slot = self
            .ids
            .get_mut(entity.index())
            .ok_or(TableError::UnknownEntity(entity))?;
        let previous = slot.replace(id);
        if let Some(old) = previous {
            if old == id {
                return Ok(previous);
            }
            if let Some(holders) = self.by_id.get_mut(&old) {
                holders.retain(|k| *k != entity);
                if holders.is_empty() {
                    self.by_id.remove(&old);
                }
            }
        }
        self.by_id.entry(id).or_default().push(entity);
        Ok(previous)
    }

    /// Id carried by `entity`, or `None` while it is still unnamed.
    #[must_use]
    pub fn find_id(&self, entity: EntityKey) -> Option<ShapeId> {
        self.ids.get(entity.index()).copied().flatten()
    }

    /// Entity carrying `id`.
    pub fn get_entity(&self, id: ShapeId) -> Result<EntityKey, TableError> {
        match self.by_id.get(&id).map(|holders| holders.as_slice()) {
            Some([entity]) => Ok(*entity),
            Some(holders) if !holders.is_empty() => Err(TableError::Ambiguous {
                id,
                count: holders.len(),
            }),
            _ => Err(TableError::NotFound(id)),
        }
    }

    /// Returns `true` if some entity carries `id`.
    #[must_use]
    pub fn has_id(&self, id: ShapeId) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Returns `true` if `entity` belongs to this table.
    #[must_use]
    pub fn has_entity(&self, entity: EntityKey) -> bool {
        entity.index() < self.ids.len()
    }

    /// `(entity, id)` pairs in arena order, unnamed entities included.
    pub fn entries(&self) -> impl Iterator<Item = (EntityKey, Option<ShapeId>)> + '_ {
        self.topology.keys().zip(self.ids.iter().copied())
    }

    /// Every id in the table, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<ShapeId> {
        let mut ids: Vec<ShapeId> = self.by_id.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Ids of entities of `kind`, in arena order.
    #[must_use]
    pub fn ids_of_kind(&self, kind: EntityKind) -> Vec<ShapeId> {
        self.topology
            .of_kind(kind)
            .filter_map(|k| self.find_id(k))
            .collect()
    }

    /// Kind of the entity carrying `id`.
    #[must_use]
    pub fn kind_of(&self, id: ShapeId) -> Option<EntityKind> {
        self.get_entity(id).ok().and_then(|e| self.topology.kind(e))
    }

    /// Ids of the nearest containing entities of `kind`.
    #[must_use]
    pub fn parents_of_kind(&self, id: ShapeId, kind: EntityKind) -> Vec<ShapeId> {
        let Ok(entity) = self.get_entity(id) else {
            return Vec::new();
        };
        self.topology
            .ancestors_of_kind(entity, kind)
            .into_iter()
            .filter_map(|k| self.find_id(k))
            .collect()
    }

    /// Ids of the nearest contained entities of `kind`.
    #[must_use]
    pub fn children_of_kind(&self, id: ShapeId, kind: EntityKind) -> Vec<ShapeId> {
        let Ok(entity) = self.get_entity(id) else {
            return Vec::new();
        };
        self.topology
            .descendants_of_kind(entity, kind)
            .into_iter()
            .filter_map(|k| self.find_id(k))
            .collect()
    }

    /// Entities that have no id yet, in arena order.
    #[must_use]
    pub fn all_nil_entities(&self) -> Vec<EntityKey> {
        self.entries()
            .filter(|(_, id)| id.is_none())
            .map(|(k, _)| k)
            .collect()
    }

    /// Ids carried by more than one entity, sorted.
    #[must_use]
    pub fn duplicate_ids(&self) -> Vec<ShapeId> {
        let mut ids: Vec<ShapeId> = self
            .by_id
            .iter()
            .filter(|(_, holders)| holders.len() > 1)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Fails if any entity is still unnamed.
    pub fn ensure_no_nils(&self) -> Result<(), NamingError> {
        let entities = self.all_nil_entities();
        if entities.is_empty() {
            Ok(())
        } else {
            Err(NamingError::NilIds { entities })
        }
    }

    /// Fails if any id is carried by more than one entity.
    pub fn ensure_no_duplicates(&self) -> Result<(), NamingError> {
        let ids = self.duplicate_ids();
        if ids.is_empty() {
            Ok(())
        } else {
            Err(NamingError::DuplicateIds { ids })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FeatureId;
    use uuid::Uuid;

    fn owner() -> FeatureId {
        FeatureId::from_sequence(Uuid::from_u128(1), 0)
    }

    fn edge_pair() -> (ShapeIdentityTable, EntityKey, EntityKey, EntityKey) {
        let mut topology = Topology::new();
        let wire = topology.add(EntityKind::Wire, 0);
        let a = topology.add(EntityKind::Edge, 1);
        let b = topology.add(EntityKind::Edge, 2);
        topology.attach(wire, a);
        topology.attach(wire, b);
        topology.set_root(wire);
        let mut table = ShapeIdentityTable::new();
        table.set_root_shape(topology, ShapeId::mint(owner(), b"root"));
        (table, wire, a, b)
    }

    #[test]
    fn root_is_named_everything_else_is_nil() {
        let (table, wire, a, b) = edge_pair();
        assert_eq!(table.root_id(), Some(ShapeId::mint(owner(), b"root")));
        assert_eq!(table.find_id(wire), table.root_id());
        assert_eq!(table.all_nil_entities(), alloc::vec![a, b]);
        assert!(matches!(table.ensure_no_nils(), Err(NamingError::NilIds { .. })));
    }

    #[test]
    fn update_keeps_both_directions_in_sync() {
        let (mut table, _, a, _) = edge_pair();
        let first = ShapeId::mint(owner(), b"first");
        let second = ShapeId::mint(owner(), b"second");

        assert_eq!(table.update_id(a, first), Ok(None));
        assert_eq!(table.get_entity(first), Ok(a));

        assert_eq!(table.update_id(a, second), Ok(Some(first)));
        assert!(!table.has_id(first));
        assert_eq!(table.get_entity(first), Err(TableError::NotFound(first)));
        assert_eq!(table.get_entity(second), Ok(a));
        assert_eq!(table.find_id(a), Some(second));
    }

    #[test]
    fn duplicates_are_reported_not_hidden() {
        let (mut table, _, a, b) = edge_pair();
        let shared = ShapeId::mint(owner(), b"shared");
        table.update_id(a, shared).unwrap();
        table.update_id(b, shared).unwrap();

        assert_eq!(
            table.get_entity(shared),
            Err(TableError::Ambiguous { id: shared, count: 2 })
        );
        assert_eq!(
            table.ensure_no_duplicates(),
            Err(NamingError::DuplicateIds {
                ids: alloc::vec![shared]
            })
        );
        assert!(table.ensure_no_nils().is_ok());
    }

    #[test]
    fn unknown_entity_is_rejected() {
        let (mut table, ..) = edge_pair();
        let stray = EntityKey::new(99);
        assert_eq!(
            table.update_id(stray, ShapeId::mint(owner(), b"x")),
            Err(TableError::UnknownEntity(stray))
        );
        assert!(!table.has_entity(stray));
        assert_eq!(table.find_id(stray), None);
    }

    #[test]
    fn containment_queries_go_through_ids() {
        let (mut table, _, a, b) = edge_pair();
        let ia = ShapeId::mint(owner(), b"a");
        let ib = ShapeId::mint(owner(), b"b");
        table.update_id(a, ia).unwrap();
        table.update_id(b, ib).unwrap();
        let root = table.root_id().unwrap();

        assert_eq!(table.parents_of_kind(ia, EntityKind::Wire), alloc::vec![root]);
        assert_eq!(table.children_of_kind(root, EntityKind::Edge), alloc::vec![ia, ib]);
        assert_eq!(table.ids_of_kind(EntityKind::Edge), alloc::vec![ia, ib]);
        assert_eq!(table.kind_of(ib), Some(EntityKind::Edge));
    }

    #[test]
    fn equality_ignores_reverse_index_layout() {
        let (mut left, _, a, b) = edge_pair();
        let (mut right, ..) = edge_pair();
        let ia = ShapeId::mint(owner(), b"a");
        let ib = ShapeId::mint(owner(), b"b");
        left.update_id(a, ia).unwrap();
        left.update_id(b, ib).unwrap();
        right.update_id(b, ib).unwrap();
        right.update_id(a, ia).unwrap();
        assert_eq!(left, right);

        right.clear();
        assert!(right.is_empty());
        assert_ne!(left, right);
    }
}
