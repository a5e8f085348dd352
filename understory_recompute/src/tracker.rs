// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-feature state and its propagation.

use alloc::vec::Vec;

use hashbrown::HashMap;
use understory_naming::FeatureId;

use crate::scratch::TraversalScratch;
use crate::state::{StateCell, StateChange};
use crate::{DirtyState, FeatureGraph, GraphError};

/// State bits of every feature and the rules that spread them.
///
/// Dirtiness spreads only through [`set_model_dirty`](Self::set_model_dirty)
/// and the toggles built on it: the feature and every feature reachable from
/// it through outgoing edges are marked, and nothing else.
///
/// External requests (marking, toggles, imposed bits) bump
/// [`generation`](Self::generation), which an in-flight recompute pass
/// watches to detect that it went stale. Writes made by the scheduler
/// itself do not.
///
/// Every change of a feature's effective state is queued as a
/// [`StateChange`] until [`drain_changes`](Self::drain_changes).
#[derive(Debug, Default)]
pub struct DirtyStateTracker {
    states: HashMap<FeatureId, StateCell>,
    generation: u64,
    changes: Vec<StateChange>,
    scratch: TraversalScratch,
}

impl DirtyStateTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking `id`, which begins model- and visual-dirty.
    pub fn insert(&mut self, id: FeatureId) {
        self.states.insert(id, StateCell::default());
        self.update(id, |cell| {
            cell.local |= DirtyState::MODEL_DIRTY | DirtyState::VISUAL_DIRTY;
        });
        self.bump();
    }

    /// Stops tracking `id` and returns its last effective state.
    pub fn remove(&mut self, id: FeatureId) -> Option<DirtyState> {
        let cell = self.states.remove(&id)?;
        self.bump();
        Some(cell.merged())
    }

    /// Effective state of `id`; empty if untracked.
    #[must_use]
    pub fn state(&self, id: FeatureId) -> DirtyState {
        self.states
            .get(&id)
            .map_or(DirtyState::empty(), |cell| cell.merged())
    }

    /// Both halves of the state of `id`.
    #[must_use]
    pub fn cell(&self, id: FeatureId) -> Option<StateCell> {
        self.states.get(&id).copied()
    }

    /// Returns `true` if `id` is tracked.
    #[must_use]
    pub fn contains(&self, id: FeatureId) -> bool {
        self.states.contains_key(&id)
    }

    /// State generation, bumped by external requests.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Marks `id` and everything downstream of it model- and visual-dirty.
    pub fn set_model_dirty(
        &mut self,
        graph: &FeatureGraph,
        id: FeatureId,
    ) -> Result<(), GraphError> {
        if !self.states.contains_key(&id) {
            return Err(GraphError::NotFound(id));
        }
        self.mark_dirty(id);
        self.propagate(graph, id);
        self.bump();
        Ok(())
    }

    /// Marks every tracked feature dirty.
    pub fn force_update(&mut self) {
        let ids: Vec<FeatureId> = self.states.keys().copied().collect();
        for id in ids {
            self.mark_dirty(id);
        }
        self.bump();
    }

    /// Sets or clears `SKIPPED` on `id`; a change re-dirties `id` and its
    /// dependents.
    pub fn set_skipped(
        &mut self,
        graph: &FeatureGraph,
        id: FeatureId,
        skipped: bool,
    ) -> Result<bool, GraphError> {
        self.toggle(graph, id, DirtyState::SKIPPED, skipped)
    }

    /// Sets or clears `INACTIVE` on `id`; a change re-dirties `id` and its
    /// dependents.
    pub fn set_inactive(
        &mut self,
        graph: &FeatureGraph,
        id: FeatureId,
        inactive: bool,
    ) -> Result<bool, GraphError> {
        self.toggle(graph, id, DirtyState::INACTIVE, inactive)
    }

    /// Sets or clears `EDITING` on `id`. Does not propagate.
    pub fn set_editing(&mut self, id: FeatureId, editing: bool) -> Result<bool, GraphError> {
        if !self.states.contains_key(&id) {
            return Err(GraphError::NotFound(id));
        }
        let changed = self.update(id, |cell| cell.local.set(DirtyState::EDITING, editing));
        if changed {
            self.bump();
        }
        Ok(changed)
    }

    /// Adds externally owned bits to `id`.
    ///
    /// Imposing `SKIPPED` or `INACTIVE` propagates like the matching toggle.
    pub fn impose(
        &mut self,
        graph: &FeatureGraph,
        id: FeatureId,
        bits: DirtyState,
    ) -> Result<bool, GraphError> {
        self.external(graph, id, |cell| cell.external.insert(bits), bits)
    }

    /// Removes externally owned bits from `id`.
    pub fn lift(
        &mut self,
        graph: &FeatureGraph,
        id: FeatureId,
        bits: DirtyState,
    ) -> Result<bool, GraphError> {
        self.external(graph, id, |cell| cell.external.remove(bits), bits)
    }

    /// Clears `VISUAL_DIRTY` once a renderer has picked up the output.
    pub fn acknowledge_visual(&mut self, id: FeatureId) -> Result<(), GraphError> {
        if !self.states.contains_key(&id) {
            return Err(GraphError::NotFound(id));
        }
        self.update(id, |cell| cell.local.remove(DirtyState::VISUAL_DIRTY));
        Ok(())
    }

    /// Takes every queued state change, oldest first.
    pub fn drain_changes(&mut self) -> Vec<StateChange> {
        core::mem::take(&mut self.changes)
    }

    pub(crate) fn set_success(&mut self, id: FeatureId, visual_changed: bool) {
        self.update(id, |cell| {
            cell.local.remove(DirtyState::MODEL_DIRTY | DirtyState::FAILURE);
            cell.local.set(DirtyState::VISUAL_DIRTY, visual_changed);
        });
    }

    pub(crate) fn set_failure(&mut self, id: FeatureId) {
        self.update(id, |cell| {
            cell.local.remove(DirtyState::MODEL_DIRTY);
            cell.local |= DirtyState::FAILURE | DirtyState::VISUAL_DIRTY;
        });
    }

    pub(crate) fn set_leaf(&mut self, id: FeatureId, leaf: bool) {
        self.update(id, |cell| cell.local.set(DirtyState::NON_LEAF, !leaf));
    }

    /// Marks every dependent of `id` dirty without bumping the generation.
    pub(crate) fn propagate(&mut self, graph: &FeatureGraph, id: FeatureId) {
        let mut reached = Vec::new();
        graph.for_each_dependent(id, &mut self.scratch, |dep| reached.push(dep));
        for dep in reached {
            self.mark_dirty(dep);
        }
    }

    fn toggle(
        &mut self,
        graph: &FeatureGraph,
        id: FeatureId,
        bit: DirtyState,
        on: bool,
    ) -> Result<bool, GraphError> {
        if !self.states.contains_key(&id) {
            return Err(GraphError::NotFound(id));
        }
        let changed = self.update(id, |cell| cell.local.set(bit, on));
        if changed {
            self.mark_dirty(id);
            self.propagate(graph, id);
            self.bump();
        }
        Ok(changed)
    }

    fn external(
        &mut self,
        graph: &FeatureGraph,
        id: FeatureId,
        f: impl FnOnce(&mut StateCell),
        bits: DirtyState,
    ) -> Result<bool, GraphError> {
        if !self.states.contains_key(&id) {
            return Err(GraphError::NotFound(id));
        }
        let changed = self.update(id, f);
        if changed {
            if bits.intersects(DirtyState::PROPAGATING | DirtyState::MODEL_DIRTY) {
                self.mark_dirty(id);
                self.propagate(graph, id);
            }
            self.bump();
        }
        Ok(changed)
    }

    fn mark_dirty(&mut self, id: FeatureId) {
        self.update(id, |cell| {
            cell.local |= DirtyState::MODEL_DIRTY | DirtyState::VISUAL_DIRTY;
        });
    }

    /// Applies `f` to the cell of `id` and queues the change, if any.
    fn update(&mut self, id: FeatureId, f: impl FnOnce(&mut StateCell)) -> bool {
        let Some(cell) = self.states.get_mut(&id) else {
            return false;
        };
        let before = cell.merged();
        f(cell);
        let after = cell.merged();
        if before == after {
            return false;
        }
        tracing::trace!(feature = %id, ?before, ?after, "state changed");
        self.changes.push(StateChange {
            feature: id,
            before,
            after,
        });
        true
    }

    fn bump(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }
}
