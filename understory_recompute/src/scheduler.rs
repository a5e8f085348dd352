// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ordered, incremental evaluation of dirty features.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use understory_naming::{FeatureId, NamingDiagnostic, ShapeHistory, ShapeIdentityTable};

use crate::graph::FeatureNode;
use crate::payload::{ComputeContext, PayloadInput, UpdatePayload};
use crate::{ComputeError, DirtyState, DirtyStateTracker, FeatureGraph, Role};

/// Knobs for a recompute pass.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RecomputeOptions {
    include_inactive: bool,
    compact_lineage: bool,
}

impl RecomputeOptions {
    /// Default options: inactive features are left out, lineage maps are
    /// never compacted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes inactive features too.
    #[must_use]
    pub fn include_inactive(mut self, include: bool) -> Self {
        self.include_inactive = include;
        self
    }

    /// Drops lineage entries no longer reachable from the current inputs
    /// after every successful compute step.
    #[must_use]
    pub fn compact_lineage(mut self, compact: bool) -> Self {
        self.compact_lineage = compact;
        self
    }

    /// Whether inactive features are computed.
    #[must_use]
    pub fn includes_inactive(&self) -> bool {
        self.include_inactive
    }

    /// Whether lineage maps are compacted.
    #[must_use]
    pub fn compacts_lineage(&self) -> bool {
        self.compact_lineage
    }
}

/// A feature whose compute step failed during a pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeatureFailure {
    /// The feature.
    pub feature: FeatureId,
    /// The error, rendered.
    pub message: String,
}

/// What a recompute pass did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Report {
    /// Every feature the pass visited, in visiting order, clean ones
    /// included.
    pub order: Vec<FeatureId>,
    /// Features whose compute step ran and succeeded.
    pub computed: Vec<FeatureId>,
    /// Skipped features that copied their target input.
    pub passthrough: Vec<FeatureId>,
    /// Features whose compute step failed.
    pub failures: Vec<FeatureFailure>,
    /// Naming diagnostics of every computed or failed feature.
    pub diagnostics: Vec<(FeatureId, NamingDiagnostic)>,
    /// How often the pass threw its order away because the model changed.
    pub restarts: usize,
}

impl Report {
    /// Returns `true` if no feature failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Returns `true` if the pass computed or copied nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.computed.is_empty() && self.passthrough.is_empty() && self.failures.is_empty()
    }
}

/// Result of one [`RecomputeScheduler::step`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PassStep {
    /// The feature was visited: computed if dirty, left alone otherwise.
    Visited(FeatureId),
    /// The model changed since the order was computed; the unvisited
    /// remainder was dropped and a fresh order computed.
    Restarted,
    /// Every feature in the order has been visited.
    Finished,
}

/// An in-flight recompute pass.
#[derive(Clone, Debug)]
pub struct RecomputePass {
    order: Vec<FeatureId>,
    cursor: usize,
    topology_generation: u64,
    state_generation: u64,
    report: Report,
}

impl RecomputePass {
    /// Features still to visit under the current order.
    #[must_use]
    pub fn remaining(&self) -> &[FeatureId] {
        &self.order[self.cursor..]
    }

    /// Progress so far.
    #[must_use]
    pub fn report(&self) -> &Report {
        &self.report
    }
}

/// Drives compute steps over a [`FeatureGraph`] in deterministic
/// topological order.
///
/// Clean features are left untouched. Dirty features get an
/// [`UpdatePayload`] of their direct inputs and run their compute step;
/// skipped features copy their single target input. A failure never escapes
/// the pass: it is logged, recorded on the feature and in the [`Report`],
/// and every dependent is marked dirty so it recomputes against the absent
/// output.
///
/// A pass is cooperative. Between [`step`](Self::step) calls the caller may
/// edit the model; the next step notices the change through the graph and
/// tracker generations and restarts with a fresh order. Features visited
/// before the restart are not visited twice unless the edit dirtied them.
#[derive(Clone, Debug, Default)]
pub struct RecomputeScheduler {
    options: RecomputeOptions,
}

impl RecomputeScheduler {
    /// Creates a scheduler.
    #[must_use]
    pub fn new(options: RecomputeOptions) -> Self {
        Self { options }
    }

    /// Current options.
    #[must_use]
    pub fn options(&self) -> RecomputeOptions {
        self.options
    }

    /// Replaces the options; takes effect at the next order computation.
    pub fn set_options(&mut self, options: RecomputeOptions) {
        self.options = options;
    }

    /// Runs a whole pass and rebuilds `history`.
    pub fn recompute(
        &self,
        graph: &mut FeatureGraph,
        tracker: &mut DirtyStateTracker,
        history: &mut ShapeHistory,
    ) -> Report {
        let mut pass = self.begin(graph, tracker);
        while self.step(&mut pass, graph, tracker) != PassStep::Finished {}
        self.finish(pass, graph, tracker, history)
    }

    /// Starts a pass.
    #[must_use]
    pub fn begin(&self, graph: &FeatureGraph, tracker: &DirtyStateTracker) -> RecomputePass {
        let order = self.order(graph, tracker);
        tracing::debug!(features = order.len(), "recompute started");
        RecomputePass {
            order,
            cursor: 0,
            topology_generation: graph.generation(),
            state_generation: tracker.generation(),
            report: Report::default(),
        }
    }

    /// Visits the next feature of `pass`, restarting first if the model
    /// changed since the order was computed.
    pub fn step(
        &self,
        pass: &mut RecomputePass,
        graph: &mut FeatureGraph,
        tracker: &mut DirtyStateTracker,
    ) -> PassStep {
        if pass.topology_generation != graph.generation()
            || pass.state_generation != tracker.generation()
        {
            pass.order = self.order(graph, tracker);
            pass.cursor = 0;
            pass.topology_generation = graph.generation();
            pass.state_generation = tracker.generation();
            pass.report.restarts += 1;
            tracing::debug!(
                features = pass.order.len(),
                restarts = pass.report.restarts,
                "model changed during recompute; restarting with a fresh order"
            );
            return PassStep::Restarted;
        }
        let Some(&id) = pass.order.get(pass.cursor) else {
            return PassStep::Finished;
        };
        pass.cursor += 1;
        pass.report.order.push(id);
        self.visit(id, graph, tracker, &mut pass.report);
        PassStep::Visited(id)
    }

    /// Runs the rest of `pass`, refreshes `NON_LEAF` bits and rebuilds
    /// `history` from every alive feature.
    pub fn finish(
        &self,
        mut pass: RecomputePass,
        graph: &mut FeatureGraph,
        tracker: &mut DirtyStateTracker,
        history: &mut ShapeHistory,
    ) -> Report {
        while self.step(&mut pass, graph, tracker) != PassStep::Finished {}

        for id in graph.feature_ids() {
            let leaf = !graph
                .children(id)
                .any(|(child, _)| !tracker.state(child).contains(DirtyState::INACTIVE));
            tracker.set_leaf(id, leaf);
        }
        let include_inactive = self.options.include_inactive;
        rebuild_history(graph, history, |id| {
            include_inactive || !tracker.state(id).contains(DirtyState::INACTIVE)
        });

        let report = pass.report;
        tracing::debug!(
            visited = report.order.len(),
            computed = report.computed.len(),
            passthrough = report.passthrough.len(),
            failures = report.failures.len(),
            restarts = report.restarts,
            "recompute finished"
        );
        report
    }

    fn order(&self, graph: &FeatureGraph, tracker: &DirtyStateTracker) -> Vec<FeatureId> {
        let include_inactive = self.options.include_inactive;
        graph.topological_order(|id| {
            include_inactive || !tracker.state(id).contains(DirtyState::INACTIVE)
        })
    }

    fn visit(
        &self,
        id: FeatureId,
        graph: &mut FeatureGraph,
        tracker: &mut DirtyStateTracker,
        report: &mut Report,
    ) {
        let state = tracker.state(id);
        if !state.needs_recompute() {
            return;
        }
        let Ok(mut node) = graph.take_node(id) else {
            return;
        };
        let previous = node.table.clone();

        let outcome = if state.contains(DirtyState::SKIPPED) {
            passthrough(id, &mut node, graph);
            report.passthrough.push(id);
            Ok(())
        } else {
            self.compute(id, &mut node, graph, tracker)
        };
        report
            .diagnostics
            .extend(node.naming.diagnostics().iter().map(|d| (id, *d)));

        match outcome {
            Ok(()) => {
                let changed = node.table != previous;
                node.last_error = None;
                graph.restore_node(id, node);
                if !state.contains(DirtyState::SKIPPED) {
                    report.computed.push(id);
                }
                tracker.set_success(id, changed);
                tracing::debug!(feature = %id, changed, "feature recomputed");
            }
            Err(message) => {
                tracing::error!(feature = %id, error = %message, "feature failed");
                node.table.clear();
                node.naming.discard_run();
                node.last_error = Some(message.clone());
                graph.restore_node(id, node);
                report.failures.push(FeatureFailure {
                    feature: id,
                    message,
                });
                tracker.set_failure(id);
                tracker.propagate(graph, id);
            }
        }
    }

    fn compute(
        &self,
        id: FeatureId,
        node: &mut FeatureNode,
        graph: &FeatureGraph,
        tracker: &DirtyStateTracker,
    ) -> Result<(), String> {
        let inputs: Vec<PayloadInput<'_>> = graph
            .parents(id)
            .filter_map(|(parent, roles)| {
                let (feature, table, naming) = graph.node_parts(parent)?;
                Some(PayloadInput {
                    feature: parent,
                    kind: feature.kind(),
                    roles,
                    table,
                    history: naming.records(),
                    state: tracker.state(parent),
                })
            })
            .collect();
        let payload = UpdatePayload::new(inputs);

        let FeatureNode {
            feature,
            parameters,
            table,
            naming,
            ..
        } = node;
        let (result, committed, commit_error) = {
            let mut cx = ComputeContext::new(id, parameters, &payload, table, naming);
            let result = feature.compute(&mut cx);
            (result, cx.committed(), cx.take_commit_error())
        };
        result.map_err(|err| err.to_string())?;
        if let Some(err) = commit_error {
            return Err(ComputeError::from(err).to_string());
        }

        if !committed {
            table.clear();
            naming.discard_run();
            return Ok(());
        }
        table
            .ensure_no_nils()
            .and_then(|()| table.ensure_no_duplicates())
            .map_err(|err| ComputeError::from(err).to_string())?;
        if self.options.compact_lineage {
            naming.compact(|key| payload.iter().any(|i| i.table.has_id(key)), table);
        }
        Ok(())
    }
}

/// Copies the single target input of a skipped feature.
fn passthrough(id: FeatureId, node: &mut FeatureNode, graph: &FeatureGraph) {
    let mut targets = graph
        .parents(id)
        .filter(|(_, roles)| roles.contains(&Role::Target))
        .filter_map(|(parent, _)| graph.table(parent).ok());
    match (targets.next(), targets.next()) {
        (Some(table), None) => {
            node.table = table.clone();
            node.naming.record_passthrough(&node.table);
            tracing::debug!(
                feature = %id,
                entities = node.table.len(),
                "skipped feature passes its target through"
            );
        }
        _ => {
            tracing::warn!(
                feature = %id,
                "skipped feature without a single target input; output is empty"
            );
            node.table = ShapeIdentityTable::new();
            node.naming.discard_run();
        }
    }
}

/// Chains every alive feature passing `include` into `history`, parents
/// first. Left-out features hold stale output and never become picks'
/// targets.
fn rebuild_history(
    graph: &FeatureGraph,
    history: &mut ShapeHistory,
    include: impl Fn(FeatureId) -> bool,
) {
    history.clear();
    for id in graph.topological_order(&include) {
        let Some((_, table, naming)) = graph.node_parts(id) else {
            continue;
        };
        let sources: Vec<(FeatureId, &ShapeIdentityTable)> = graph
            .parents(id)
            .filter(|&(parent, _)| include(parent))
            .filter_map(|(parent, _)| Some((parent, graph.table(parent).ok()?)))
            .collect();
        history.record_step(id, table, naming.records(), &sources);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Stub;
    use crate::{ParameterValue, RoleSet};
    use alloc::vec;

    struct Fixture {
        graph: FeatureGraph,
        tracker: DirtyStateTracker,
        history: ShapeHistory,
        scheduler: RecomputeScheduler,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                graph: FeatureGraph::new(),
                tracker: DirtyStateTracker::new(),
                history: ShapeHistory::new(),
                scheduler: RecomputeScheduler::default(),
            }
        }

        fn add(&mut self, stub: Stub) -> FeatureId {
            let id = self.graph.add_feature(stub);
            self.tracker.insert(id);
            id
        }

        fn connect(&mut self, parent: FeatureId, child: FeatureId, roles: impl Into<RoleSet>) {
            self.graph.connect(parent, child, roles).unwrap();
            self.tracker.set_model_dirty(&self.graph, child).unwrap();
        }

        fn set_value(&mut self, id: FeatureId, value: i64) {
            self.graph
                .parameters_mut(id)
                .unwrap()
                .set("value", ParameterValue::Integer(value));
            self.tracker.set_model_dirty(&self.graph, id).unwrap();
        }

        fn recompute(&mut self) -> Report {
            self.scheduler
                .recompute(&mut self.graph, &mut self.tracker, &mut self.history)
        }
    }

    #[test]
    fn second_pass_is_a_noop() {
        let mut f = Fixture::new();
        let a = f.add(Stub::create());
        let b = f.add(Stub::alter());
        f.connect(a, b, Role::Target);
        let first = f.recompute();
        assert_eq!(first.computed, vec![a, b]);
        let table = f.graph.table(b).unwrap().clone();

        let second = f.recompute();
        assert!(second.is_noop());
        assert_eq!(second.order, vec![a, b]);
        assert_eq!(f.graph.table(b).unwrap(), &table);
    }

    #[test]
    fn visual_dirty_only_when_output_changed() {
        let mut f = Fixture::new();
        let a = f.add(Stub::create());
        f.recompute();
        assert!(f.tracker.state(a).contains(DirtyState::VISUAL_DIRTY));

        f.tracker.set_model_dirty(&f.graph, a).unwrap();
        f.recompute();
        assert!(!f.tracker.state(a).contains(DirtyState::VISUAL_DIRTY));

        f.set_value(a, 9);
        f.recompute();
        assert!(f.tracker.state(a).contains(DirtyState::VISUAL_DIRTY));
    }

    #[test]
    fn failure_is_local_and_dependents_recompute() {
        let mut f = Fixture::new();
        let a = f.add(Stub::create());
        let b = f.add(Stub::alter());
        let sibling = f.add(Stub::create());
        f.connect(a, b, Role::Target);
        f.recompute();

        f.set_value(a, -1);
        let report = f.recompute();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].feature, a);
        assert!(f.graph.table(a).unwrap().is_empty());
        assert_eq!(
            f.graph.last_error(a).unwrap(),
            Some("geometry operation failed: negative value")
        );
        let state = f.tracker.state(a);
        assert!(state.contains(DirtyState::FAILURE) && !state.needs_recompute());
        // The stub ignores its inputs, so the dependent still succeeds.
        assert_eq!(report.computed, vec![b]);
        assert!(!f.tracker.state(sibling).contains(DirtyState::FAILURE));

        f.set_value(a, 2);
        let report = f.recompute();
        assert!(report.is_success());
        assert_eq!(f.graph.last_error(a).unwrap(), None);
        assert!(!f.tracker.state(a).contains(DirtyState::FAILURE));
    }

    #[test]
    fn skipped_feature_copies_its_target() {
        let mut f = Fixture::new();
        let a = f.add(Stub::create());
        let b = f.add(Stub::alter());
        f.connect(a, b, Role::Target);
        f.tracker.set_skipped(&f.graph, b, true).unwrap();
        let report = f.recompute();
        assert_eq!(report.passthrough, vec![b]);
        assert_eq!(f.graph.table(b).unwrap(), f.graph.table(a).unwrap());
    }

    #[test]
    fn skipped_feature_without_target_is_empty() {
        let mut f = Fixture::new();
        let a = f.add(Stub::create());
        let b = f.add(Stub::create());
        let c = f.add(Stub::alter());
        f.connect(a, c, Role::Target);
        f.connect(b, c, Role::Target);
        f.tracker.set_skipped(&f.graph, c, true).unwrap();
        f.recompute();
        assert!(f.graph.table(c).unwrap().is_empty());
        assert!(!f.tracker.state(c).contains(DirtyState::FAILURE));
    }

    #[test]
    fn inactive_features_are_left_out() {
        let mut f = Fixture::new();
        let a = f.add(Stub::create());
        let b = f.add(Stub::alter());
        f.connect(a, b, Role::Target);
        f.tracker.set_inactive(&f.graph, b, true).unwrap();
        let report = f.recompute();
        assert_eq!(report.order, vec![a]);
        assert!(f.tracker.state(b).needs_recompute());
        assert!(!f.tracker.state(a).contains(DirtyState::NON_LEAF));

        f.scheduler
            .set_options(RecomputeOptions::new().include_inactive(true));
        let report = f.recompute();
        assert_eq!(report.computed, vec![b]);
    }

    #[test]
    fn non_leaf_tracks_active_children() {
        let mut f = Fixture::new();
        let a = f.add(Stub::create());
        let b = f.add(Stub::alter());
        f.connect(a, b, Role::Target);
        f.recompute();
        assert!(f.tracker.state(a).contains(DirtyState::NON_LEAF));
        assert!(!f.tracker.state(b).contains(DirtyState::NON_LEAF));
    }

    #[test]
    fn edit_between_steps_restarts_the_pass() {
        let mut f = Fixture::new();
        let a = f.add(Stub::create());
        let b = f.add(Stub::alter());
        f.connect(a, b, Role::Target);
        f.recompute();

        f.set_value(a, 3);
        let mut pass = f.scheduler.begin(&f.graph, &f.tracker);
        assert_eq!(
            f.scheduler.step(&mut pass, &mut f.graph, &mut f.tracker),
            PassStep::Visited(a)
        );
        let c = f.add(Stub::alter());
        f.connect(b, c, Role::Target);
        assert_eq!(
            f.scheduler.step(&mut pass, &mut f.graph, &mut f.tracker),
            PassStep::Restarted
        );
        assert_eq!(pass.remaining(), &[a, b, c]);
        let report = f
            .scheduler
            .finish(pass, &mut f.graph, &mut f.tracker, &mut f.history);
        assert_eq!(report.restarts, 1);
        assert_eq!(report.computed, vec![a, b, c]);
        assert_eq!(report.order, vec![a, a, b, c]);
    }

    #[test]
    fn history_chains_every_alive_feature() {
        let mut f = Fixture::new();
        let a = f.add(Stub::create());
        let b = f.add(Stub::create());
        f.recompute();
        let ids_a = f.graph.table(a).unwrap().ids();
        let ids_b = f.graph.table(b).unwrap().ids();
        assert_eq!(f.history.len(), ids_a.len() + ids_b.len());
    }
}
