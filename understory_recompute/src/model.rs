// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The model facade.

use alloc::boxed::Box;
use alloc::vec::Vec;

use understory_naming::{
    EvolveRecord, FeatureId, PickRecord, Resolution, ShapeHistory, ShapeId, ShapeIdentityTable,
    Uuid,
};

use crate::observer::Observers;
use crate::{
    DirtyState, DirtyStateTracker, Feature, FeatureGraph, GraphError, ModelObserver, ObserverId,
    ParameterValue, Parameters, PassStep, RecomputeOptions, RecomputePass, RecomputeScheduler,
    Report, Role, RoleSet,
};

/// A parametric model: the feature graph, its state, the project shape
/// history and the observers, kept consistent with each other.
///
/// Every edit goes through the model so that the right features are marked
/// dirty and observers hear about it. Edges that change a feature's inputs
/// mark that feature dirty; parameter edits mark the edited feature dirty;
/// both propagate downstream.
#[derive(Debug, Default)]
pub struct Model {
    graph: FeatureGraph,
    tracker: DirtyStateTracker,
    history: ShapeHistory,
    scheduler: RecomputeScheduler,
    observers: Observers,
}

impl Model {
    /// Creates an empty model with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty model minting feature ids in `namespace`.
    #[must_use]
    pub fn with_namespace(namespace: Uuid) -> Self {
        Self {
            graph: FeatureGraph::with_namespace(namespace),
            ..Self::default()
        }
    }

    /// Recompute options.
    #[must_use]
    pub fn options(&self) -> RecomputeOptions {
        self.scheduler.options()
    }

    /// Replaces the recompute options.
    pub fn set_options(&mut self, options: RecomputeOptions) {
        self.scheduler.set_options(options);
    }

    /// The feature graph, for queries.
    #[must_use]
    pub fn graph(&self) -> &FeatureGraph {
        &self.graph
    }

    /// The state tracker, for queries.
    #[must_use]
    pub fn tracker(&self) -> &DirtyStateTracker {
        &self.tracker
    }

    /// Adds a feature; it starts dirty.
    pub fn add_feature<F: Feature + 'static>(&mut self, feature: F) -> FeatureId {
        let id = self.graph.add_feature(feature);
        self.added(id);
        id
    }

    /// Adds a feature under a caller-chosen id.
    pub fn add_feature_with_id<F: Feature + 'static>(
        &mut self,
        id: FeatureId,
        feature: F,
    ) -> Result<FeatureId, GraphError> {
        let id = self.graph.add_feature_with_id(id, feature)?;
        self.added(id);
        Ok(id)
    }

    fn added(&mut self, id: FeatureId) {
        self.tracker.insert(id);
        self.observers.notify(|o| o.feature_added(id));
        self.flush_state_changes();
    }

    /// Removes a feature with no edges left.
    pub fn remove_feature(&mut self, id: FeatureId) -> Result<Box<dyn Feature>, GraphError> {
        let feature = self.graph.remove_feature(id)?;
        self.tracker.remove(id);
        self.observers.notify(|o| o.feature_removed(id));
        Ok(feature)
    }

    /// Returns `true` if `id` is an alive feature.
    #[must_use]
    pub fn has_feature(&self, id: FeatureId) -> bool {
        self.graph.has_feature(id)
    }

    /// Every alive feature id, in insertion order.
    #[must_use]
    pub fn feature_ids(&self) -> Vec<FeatureId> {
        self.graph.feature_ids()
    }

    /// The feature behind `id`.
    pub fn find_feature(&self, id: FeatureId) -> Result<&dyn Feature, GraphError> {
        self.graph.find_feature(id)
    }

    /// Connects `parent -> child`, merging roles onto an existing edge, and
    /// marks `child` dirty.
    pub fn connect(
        &mut self,
        parent: FeatureId,
        child: FeatureId,
        roles: impl Into<RoleSet>,
    ) -> Result<(), GraphError> {
        self.graph.connect(parent, child, roles)?;
        self.connected(parent, child);
        self.tracker.set_model_dirty(&self.graph, child)?;
        self.flush_state_changes();
        Ok(())
    }

    /// Connects `parent -> child`, splicing `child` into an existing chain
    /// where [`FeatureGraph::connect_insert`] allows it.
    pub fn connect_insert(
        &mut self,
        parent: FeatureId,
        child: FeatureId,
        roles: impl Into<RoleSet>,
    ) -> Result<Option<FeatureId>, GraphError> {
        let displaced = self.graph.connect_insert(parent, child, roles)?;
        if let Some(old) = displaced {
            self.observers.notify(|o| o.connection_removed(parent, old));
            self.connected(child, old);
        }
        self.connected(parent, child);
        // Dirtying `child` also reaches the displaced feature downstream.
        self.tracker.set_model_dirty(&self.graph, child)?;
        self.flush_state_changes();
        Ok(displaced)
    }

    fn connected(&mut self, parent: FeatureId, child: FeatureId) {
        if let Some(roles) = self.graph.roles(parent, child) {
            self.observers
                .notify(|o| o.connection_added(parent, child, roles));
        }
    }

    /// Removes the edge `parent -> child` and marks `child` dirty.
    pub fn disconnect(
        &mut self,
        parent: FeatureId,
        child: FeatureId,
    ) -> Result<RoleSet, GraphError> {
        let roles = self.graph.disconnect(parent, child)?;
        self.disconnected(parent, child)?;
        Ok(roles)
    }

    /// Removes one role from `parent -> child` and marks `child` dirty.
    pub fn disconnect_role(
        &mut self,
        parent: FeatureId,
        child: FeatureId,
        role: &Role,
    ) -> Result<(), GraphError> {
        if self.graph.disconnect_role(parent, child, role)? {
            self.disconnected(parent, child)?;
        } else {
            self.connected(parent, child);
            self.tracker.set_model_dirty(&self.graph, child)?;
            self.flush_state_changes();
        }
        Ok(())
    }

    /// Removes every input of `child` and marks it dirty.
    pub fn clear_inputs(&mut self, child: FeatureId) -> Result<Vec<FeatureId>, GraphError> {
        let parents = self.graph.clear_inputs(child)?;
        for &parent in &parents {
            self.observers
                .notify(|o| o.connection_removed(parent, child));
        }
        self.tracker.set_model_dirty(&self.graph, child)?;
        self.flush_state_changes();
        Ok(parents)
    }

    fn disconnected(&mut self, parent: FeatureId, child: FeatureId) -> Result<(), GraphError> {
        self.observers
            .notify(|o| o.connection_removed(parent, child));
        self.tracker.set_model_dirty(&self.graph, child)?;
        self.flush_state_changes();
        Ok(())
    }

    /// Current parameters of `id`.
    pub fn parameters(&self, id: FeatureId) -> Result<&Parameters, GraphError> {
        self.graph.parameters(id)
    }

    /// Sets one parameter and, if the value changed, marks `id` dirty.
    ///
    /// Returns the previous value.
    pub fn set_parameter(
        &mut self,
        id: FeatureId,
        name: &'static str,
        value: impl Into<ParameterValue>,
    ) -> Result<Option<ParameterValue>, GraphError> {
        let value = value.into();
        let parameters = self.graph.parameters_mut(id)?;
        if parameters.get(name) == Some(&value) {
            return Ok(Some(value));
        }
        let previous = parameters.set(name, value);
        tracing::debug!(feature = %id, parameter = name, "parameter changed");
        self.set_model_dirty(id)?;
        Ok(previous)
    }

    /// Marks `id` and everything downstream of it dirty.
    pub fn set_model_dirty(&mut self, id: FeatureId) -> Result<(), GraphError> {
        self.tracker.set_model_dirty(&self.graph, id)?;
        self.flush_state_changes();
        Ok(())
    }

    /// Marks every feature dirty.
    pub fn force_update(&mut self) {
        self.tracker.force_update();
        self.flush_state_changes();
    }

    /// Skips or unskips `id`. Returns `true` if the state changed.
    pub fn set_skipped(&mut self, id: FeatureId, skipped: bool) -> Result<bool, GraphError> {
        let changed = self.tracker.set_skipped(&self.graph, id, skipped)?;
        self.flush_state_changes();
        Ok(changed)
    }

    /// Deactivates or reactivates `id`. Returns `true` if the state changed.
    pub fn set_inactive(&mut self, id: FeatureId, inactive: bool) -> Result<bool, GraphError> {
        let changed = self.tracker.set_inactive(&self.graph, id, inactive)?;
        self.flush_state_changes();
        Ok(changed)
    }

    /// Flags `id` as being edited. Returns `true` if the state changed.
    pub fn set_editing(&mut self, id: FeatureId, editing: bool) -> Result<bool, GraphError> {
        let changed = self.tracker.set_editing(id, editing)?;
        self.flush_state_changes();
        Ok(changed)
    }

    /// Adds externally owned state bits to `id`.
    pub fn impose_state(&mut self, id: FeatureId, bits: DirtyState) -> Result<bool, GraphError> {
        let changed = self.tracker.impose(&self.graph, id, bits)?;
        self.flush_state_changes();
        Ok(changed)
    }

    /// Removes externally owned state bits from `id`.
    pub fn lift_state(&mut self, id: FeatureId, bits: DirtyState) -> Result<bool, GraphError> {
        let changed = self.tracker.lift(&self.graph, id, bits)?;
        self.flush_state_changes();
        Ok(changed)
    }

    /// Clears `VISUAL_DIRTY` on `id`.
    pub fn acknowledge_visual(&mut self, id: FeatureId) -> Result<(), GraphError> {
        self.tracker.acknowledge_visual(id)?;
        self.flush_state_changes();
        Ok(())
    }

    /// Effective state of `id`.
    pub fn state(&self, id: FeatureId) -> Result<DirtyState, GraphError> {
        if !self.graph.has_feature(id) {
            return Err(GraphError::NotFound(id));
        }
        Ok(self.tracker.state(id))
    }

    /// Current output of `id`.
    pub fn table(&self, id: FeatureId) -> Result<&ShapeIdentityTable, GraphError> {
        self.graph.table(id)
    }

    /// Records of the last compute step of `id`.
    pub fn records(&self, id: FeatureId) -> Result<&[EvolveRecord], GraphError> {
        self.graph.naming(id).map(|naming| naming.records())
    }

    /// Message of the last failed compute step of `id`.
    pub fn last_error(&self, id: FeatureId) -> Result<Option<&str>, GraphError> {
        self.graph.last_error(id)
    }

    /// Brings every dirty feature up to date.
    pub fn recompute(&mut self) -> Report {
        let pass = self.begin_recompute();
        self.finish(pass)
    }

    /// Starts a cooperative recompute pass.
    pub fn begin_recompute(&mut self) -> RecomputePass {
        self.observers.notify(|o| o.recompute_started());
        self.scheduler.begin(&self.graph, &self.tracker)
    }

    /// Advances `pass` by one feature.
    pub fn step(&mut self, pass: &mut RecomputePass) -> PassStep {
        let step = self
            .scheduler
            .step(pass, &mut self.graph, &mut self.tracker);
        self.flush_state_changes();
        step
    }

    /// Completes `pass` and rebuilds the shape history.
    pub fn finish(&mut self, pass: RecomputePass) -> Report {
        let report = self.scheduler.finish(
            pass,
            &mut self.graph,
            &mut self.tracker,
            &mut self.history,
        );
        self.flush_state_changes();
        tracing::info!(
            computed = report.computed.len(),
            failures = report.failures.len(),
            restarts = report.restarts,
            "recompute complete"
        );
        self.observers.notify(|o| o.recompute_finished(&report));
        report
    }

    /// Project-wide shape history as of the last finished pass.
    #[must_use]
    pub fn shape_history(&self) -> &ShapeHistory {
        &self.history
    }

    /// Records a pick of `shape` on `feature` against the current history.
    #[must_use]
    pub fn capture_pick(&self, feature: FeatureId, shape: ShapeId) -> PickRecord {
        PickRecord::capture(&self.history, feature, shape)
    }

    /// Resolves `picks` into the first of `candidates` their ids lead to.
    ///
    /// Unknown candidates are ignored. Never fails; see
    /// [`understory_naming::resolve_picks`].
    #[must_use]
    pub fn resolve_picks(
        &self,
        candidates: &[FeatureId],
        picks: &[PickRecord],
    ) -> Vec<Resolution> {
        let features: Vec<(FeatureId, &ShapeIdentityTable)> = candidates
            .iter()
            .filter_map(|&id| Some((id, self.graph.table(id).ok()?)))
            .collect();
        understory_naming::resolve_picks(&features, picks, &self.history)
    }

    /// Registers an observer.
    pub fn subscribe<O: ModelObserver + 'static>(&mut self, observer: O) -> ObserverId {
        self.observers.subscribe(Box::new(observer))
    }

    /// Unregisters an observer. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.observers.unsubscribe(id)
    }

    fn flush_state_changes(&mut self) {
        for change in self.tracker.drain_changes() {
            self.observers
                .notify(|o| o.state_changed(change.feature, change.before, change.after));
        }
    }
}
