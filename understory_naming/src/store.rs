// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Lineage maps that keep sub-entity ids stable across recomputes.
//!
//! A geometry operation hands back a fresh, unidentified collection of
//! sub-entities together with correspondence data relating them to the
//! operands. [`PersistentNamingStore::name`] turns that into ids:
//!
//! 1. the caller captures an [`OperandSnapshot`] before invoking the kernel,
//! 2. the kernel produces an [`OperationResult`],
//! 3. `original`, `generated` and `last` correspondences are mapped through
//!    their lineage maps (minting once, then reusing),
//! 4. a derived pass names whatever is left from its named parents and,
//!    for repeated operand ids, from that operand id too,
//! 5. nil or duplicate ids fail the run.
//!
//! Minted ids are name based on the owning feature, so the memoized maps and
//! an independent rebuild agree on every id.

use alloc::vec::Vec;

use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;

use crate::error::NamingError;
use crate::evolve::{Category, EvolveRecord, NamingDiagnostic};
use crate::{EntityKey, EntityKind, FeatureId, ShapeId, ShapeIdentityTable, Topology};

/// An entity of one operand: the operand's index in an [`OperandSnapshot`]
/// plus the entity key in that operand's topology.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct OperandEntity {
    /// Index returned by [`OperandSnapshot::capture`].
    pub operand: usize,
    /// Entity within the operand's topology.
    pub entity: EntityKey,
}

impl OperandEntity {
    /// Creates an operand entity reference.
    #[must_use]
    pub const fn new(operand: usize, entity: EntityKey) -> Self {
        Self { operand, entity }
    }
}

#[derive(Clone, Debug)]
struct CapturedOperand {
    feature: FeatureId,
    ids: Vec<Option<ShapeId>>,
}

/// Operand ids frozen before a geometry operation runs.
#[derive(Clone, Debug, Default)]
pub struct OperandSnapshot {
    operands: Vec<CapturedOperand>,
}

impl OperandSnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the current ids of `table`, owned by `feature`, and returns
    /// the operand index to use in [`OperandEntity`].
    pub fn capture(&mut self, feature: FeatureId, table: &ShapeIdentityTable) -> usize {
        self.operands.push(CapturedOperand {
            feature,
            ids: table.entries().map(|(_, id)| id).collect(),
        });
        self.operands.len() - 1
    }

    /// Number of captured operands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.operands.len()
    }

    /// Returns `true` if nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operands.is_empty()
    }

    /// Feature that owned operand `operand`.
    #[must_use]
    pub fn feature(&self, operand: usize) -> Option<FeatureId> {
        self.operands.get(operand).map(|o| o.feature)
    }

    /// Id the referenced operand entity had when captured.
    #[must_use]
    pub fn id_of(&self, entity: OperandEntity) -> Option<ShapeId> {
        self.operands
            .get(entity.operand)
            .and_then(|o| o.ids.get(entity.entity.index()))
            .copied()
            .flatten()
    }

    /// Every captured id.
    pub fn ids(&self) -> impl Iterator<Item = ShapeId> + '_ {
        self.operands.iter().flat_map(|o| o.ids.iter().copied().flatten())
    }
}

/// Correspondence data reported by a geometry operation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Correspondence {
    /// Operand entities carried into the result unchanged.
    pub original: Vec<(OperandEntity, EntityKey)>,
    /// Result entities generated from an operand entity.
    pub generated: Vec<(OperandEntity, EntityKey)>,
    /// Top-level result entities created because of an operand entity.
    pub last: Vec<(OperandEntity, EntityKey)>,
    /// Result entities with no operand at all, keyed by a seed id chosen by
    /// the creating feature. These use the `last` map.
    pub seeded: Vec<(ShapeId, EntityKey)>,
}

impl Correspondence {
    /// Creates empty correspondence data.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an `original` correspondence.
    pub fn add_original(&mut self, operand: OperandEntity, result: EntityKey) -> &mut Self {
        self.original.push((operand, result));
        self
    }

    /// Records a `generated` correspondence.
    pub fn add_generated(&mut self, operand: OperandEntity, result: EntityKey) -> &mut Self {
        self.generated.push((operand, result));
        self
    }

    /// Records a `last` correspondence.
    pub fn add_last(&mut self, operand: OperandEntity, result: EntityKey) -> &mut Self {
        self.last.push((operand, result));
        self
    }

    /// Records a seeded entity.
    pub fn add_seeded(&mut self, seed: ShapeId, result: EntityKey) -> &mut Self {
        self.seeded.push((seed, result));
        self
    }
}

/// What a geometry operation hands back: the result topology and how it
/// relates to the operands.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OperationResult {
    /// Result sub-entities.
    pub topology: Topology,
    /// Correspondence to operand sub-entities.
    pub correspondence: Correspondence,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct DerivedKey {
    kind: EntityKind,
    parents: SmallVec<[ShapeId; 4]>,
    /// Operand id of an entity left over by a repeated correspondence.
    operand: Option<ShapeId>,
    ordinal: u32,
}

/// Per-feature lineage maps.
///
/// The maps only grow unless [`compact`](Self::compact) is called. The
/// records and diagnostics describe the most recent run.
#[derive(Clone, Debug)]
pub struct PersistentNamingStore {
    owner: FeatureId,
    original: HashMap<ShapeId, ShapeId>,
    generated: HashMap<ShapeId, ShapeId>,
    last: HashMap<ShapeId, ShapeId>,
    derived: HashMap<DerivedKey, ShapeId>,
    records: Vec<EvolveRecord>,
    diagnostics: Vec<NamingDiagnostic>,
}

impl PersistentNamingStore {
    /// Creates an empty store for `owner`.
    #[must_use]
    pub fn new(owner: FeatureId) -> Self {
        Self {
            owner,
            original: HashMap::new(),
            generated: HashMap::new(),
            last: HashMap::new(),
            derived: HashMap::new(),
            records: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Feature owning this store.
    #[must_use]
    pub fn owner(&self) -> FeatureId {
        self.owner
    }

    /// Id the root entity of every result receives.
    #[must_use]
    pub fn root_id(&self) -> ShapeId {
        ShapeId::mint(self.owner, b"r")
    }

    /// Lineage records of the most recent successful run.
    #[must_use]
    pub fn records(&self) -> &[EvolveRecord] {
        &self.records
    }

    /// Diagnostics of the most recent run.
    #[must_use]
    pub fn diagnostics(&self) -> &[NamingDiagnostic] {
        &self.diagnostics
    }

    /// Looks up the memoized id for `key` in one of the keyed maps.
    ///
    /// Always `None` for [`Category::Derived`], which is keyed by parent sets.
    #[must_use]
    pub fn lookup(&self, category: Category, key: ShapeId) -> Option<ShapeId> {
        match category {
            Category::Original => self.original.get(&key),
            Category::Generated => self.generated.get(&key),
            Category::Last => self.last.get(&key),
            Category::Derived => None,
        }
        .copied()
    }

    /// Total number of lineage entries over all four maps.
    #[must_use]
    pub fn lineage_len(&self) -> usize {
        self.original.len() + self.generated.len() + self.last.len() + self.derived.len()
    }

    /// Names the sub-entities of `result` and stores them in `table`.
    ///
    /// `snapshot` must have been captured before the operation ran. On
    /// success every entity in `table` carries a unique id. On failure the
    /// table keeps whatever was assigned (for diagnostics), the records are
    /// cleared and the error says what is wrong; the diagnostics are kept
    /// either way.
    pub fn name(
        &mut self,
        table: &mut ShapeIdentityTable,
        snapshot: &OperandSnapshot,
        result: OperationResult,
    ) -> Result<(), NamingError> {
        let OperationResult {
            topology,
            correspondence,
        } = result;
        table.set_root_shape(topology, self.root_id());

        let mut run = Run {
            table,
            records: Vec::new(),
            diagnostics: Vec::new(),
            extras: HashMap::new(),
        };
        let outcome = self.run_passes(&mut run, snapshot, &correspondence);
        let Run {
            table,
            records,
            diagnostics,
            ..
        } = run;
        self.diagnostics = diagnostics;

        let checked = outcome
            .and_then(|()| table.ensure_no_nils())
            .and_then(|()| table.ensure_no_duplicates());
        match checked {
            Ok(()) => {
                tracing::debug!(
                    feature = %self.owner,
                    entities = table.len(),
                    records = records.len(),
                    diagnostics = self.diagnostics.len(),
                    "named operation result"
                );
                self.records = records;
                Ok(())
            }
            Err(err) => {
                self.records.clear();
                Err(err)
            }
        }
    }

    fn run_passes(
        &mut self,
        run: &mut Run<'_>,
        snapshot: &OperandSnapshot,
        correspondence: &Correspondence,
    ) -> Result<(), NamingError> {
        // original: reuse the operand id verbatim.
        for &(operand, entity) in &correspondence.original {
            let Some(old) = run.operand_id(snapshot, operand) else {
                continue;
            };
            self.original.insert(old, old);
            if run.assign(entity, old)? {
                run.record(Some(old), old, Category::Original);
            }
        }

        let generated = run.keyed(snapshot, &correspondence.generated);
        self.memoized_pass(run, Category::Generated, &generated)?;

        let mut last = run.keyed(snapshot, &correspondence.last);
        last.extend(correspondence.seeded.iter().copied());
        self.memoized_pass(run, Category::Last, &last)?;

        self.derived_pass(run)
    }

    fn memoized_pass(
        &mut self,
        run: &mut Run<'_>,
        category: Category,
        keyed: &[(ShapeId, EntityKey)],
    ) -> Result<(), NamingError> {
        let owner = self.owner;
        let map = match category {
            Category::Generated => &mut self.generated,
            _ => &mut self.last,
        };
        let mut seen = HashSet::new();
        for &(key, entity) in keyed {
            if !seen.insert(key) {
                tracing::warn!(
                    feature = %owner,
                    operand = %key,
                    ?entity,
                    ?category,
                    "more than one result entity for one operand id; only the first is mapped"
                );
                run.diagnostics.push(NamingDiagnostic::MultipleGenerated {
                    operand: key,
                    entity,
                    category,
                });
                run.extras.entry(entity).or_insert(key);
                continue;
            }
            let id = *map
                .entry(key)
                .or_insert_with(|| mint_keyed(owner, category, key));
            if run.assign(entity, id)? {
                run.record(Some(key), id, category);
            }
        }
        Ok(())
    }

    fn derived_pass(&mut self, run: &mut Run<'_>) -> Result<(), NamingError> {
        let owner = self.owner;
        let mut ordinals: HashMap<DerivedKey, u32> = HashMap::new();
        for entity in run.table.topology().top_down_order() {
            if run.table.find_id(entity).is_some() {
                continue;
            }
            let topology = run.table.topology();
            let Some(kind) = topology.kind(entity) else {
                continue;
            };
            let parents: Option<SmallVec<[ShapeId; 4]>> = topology
                .parents(entity)
                .iter()
                .map(|&p| run.table.find_id(p))
                .collect();
            let Some(mut parents) = parents.filter(|p| !p.is_empty()) else {
                run.diagnostics
                    .push(NamingDiagnostic::UnnamedParent { entity });
                continue;
            };
            parents.sort_unstable();
            parents.dedup();

            let mut key = DerivedKey {
                kind,
                parents,
                operand: run.extras.get(&entity).copied(),
                ordinal: 0,
            };
            let counter = ordinals.entry(key.clone()).or_insert(0);
            key.ordinal = *counter;
            *counter += 1;

            let id = match self.derived.get(&key) {
                Some(id) => *id,
                None => {
                    let id = mint_derived(owner, &key);
                    self.derived.insert(key, id);
                    id
                }
            };
            if run.assign(entity, id)? {
                run.record(None, id, Category::Derived);
            }
        }
        Ok(())
    }

    /// Replaces the records with identity `original` entries for every id in
    /// `table`, for a feature whose output is a verbatim copy of its input.
    pub fn record_passthrough(&mut self, table: &ShapeIdentityTable) {
        self.records = table
            .ids()
            .into_iter()
            .map(|id| EvolveRecord {
                old: Some(id),
                new: id,
                category: Category::Original,
            })
            .collect();
        self.diagnostics.clear();
    }

    /// Forgets the records and diagnostics of the last run, keeping the
    /// lineage maps.
    pub fn discard_run(&mut self) {
        self.records.clear();
        self.diagnostics.clear();
    }

    /// Drops lineage entries that can no longer be hit.
    ///
    /// Keyed entries survive while `is_live_upstream(key)` holds; derived
    /// entries survive while every parent id is still in `own` and their
    /// operand id, if any, is live upstream. Returns the number of entries
    /// removed.
    pub fn compact(
        &mut self,
        is_live_upstream: impl Fn(ShapeId) -> bool,
        own: &ShapeIdentityTable,
    ) -> usize {
        let before = self.lineage_len();
        self.original.retain(|key, _| is_live_upstream(*key));
        self.generated.retain(|key, _| is_live_upstream(*key));
        self.last.retain(|key, _| is_live_upstream(*key));
        self.derived.retain(|key, _| {
            key.parents.iter().all(|p| own.has_id(*p))
                && key.operand.is_none_or(&is_live_upstream)
        });
        let removed = before - self.lineage_len();
        if removed > 0 {
            tracing::debug!(feature = %self.owner, removed, "compacted lineage maps");
        }
        removed
    }
}

struct Run<'t> {
    table: &'t mut ShapeIdentityTable,
    records: Vec<EvolveRecord>,
    diagnostics: Vec<NamingDiagnostic>,
    /// Entities skipped by a keyed pass, with the operand id they repeated.
    extras: HashMap<EntityKey, ShapeId>,
}

impl Run<'_> {
    fn operand_id(
        &mut self,
        snapshot: &OperandSnapshot,
        operand: OperandEntity,
    ) -> Option<ShapeId> {
        let id = snapshot.id_of(operand);
        if id.is_none() {
            self.diagnostics.push(NamingDiagnostic::UnnamedOperand {
                operand: operand.operand,
                entity: operand.entity,
            });
        }
        id
    }

    fn keyed(
        &mut self,
        snapshot: &OperandSnapshot,
        pairs: &[(OperandEntity, EntityKey)],
    ) -> Vec<(ShapeId, EntityKey)> {
        pairs
            .iter()
            .filter_map(|&(operand, entity)| {
                self.operand_id(snapshot, operand).map(|id| (id, entity))
            })
            .collect()
    }

    /// Gives `entity` the id `id` unless it already has one.
    ///
    /// Returns `true` when the id was newly assigned.
    fn assign(&mut self, entity: EntityKey, id: ShapeId) -> Result<bool, NamingError> {
        if !self.table.has_entity(entity) {
            return Err(NamingError::UnknownEntity(entity));
        }
        match self.table.find_id(entity) {
            Some(current) if current == id => Ok(false),
            Some(kept) => {
                tracing::warn!(
                    ?entity,
                    %kept,
                    rejected = %id,
                    "entity already named; keeping first id"
                );
                self.diagnostics.push(NamingDiagnostic::Conflict {
                    entity,
                    kept,
                    rejected: id,
                });
                Ok(false)
            }
            None => {
                self.table
                    .update_id(entity, id)
                    .map_err(|_| NamingError::UnknownEntity(entity))?;
                tracing::trace!(?entity, %id, "assigned id");
                Ok(true)
            }
        }
    }

    fn record(&mut self, old: Option<ShapeId>, new: ShapeId, category: Category) {
        self.records.push(EvolveRecord { old, new, category });
    }
}

fn mint_keyed(owner: FeatureId, category: Category, key: ShapeId) -> ShapeId {
    let mut name = [0_u8; 17];
    name[0] = category.tag();
    name[1..].copy_from_slice(key.as_bytes());
    ShapeId::mint(owner, &name)
}

fn mint_derived(owner: FeatureId, key: &DerivedKey) -> ShapeId {
    let mut name: Vec<u8> = Vec::with_capacity(23 + 16 * key.parents.len());
    name.push(Category::Derived.tag());
    name.push(key.kind.tag());
    name.extend_from_slice(&key.ordinal.to_le_bytes());
    match key.operand {
        Some(operand) => {
            name.push(1);
            name.extend_from_slice(operand.as_bytes());
        }
        None => name.push(0),
    }
    for parent in &key.parents {
        name.extend_from_slice(parent.as_bytes());
    }
    ShapeId::mint(owner, &name)
}
