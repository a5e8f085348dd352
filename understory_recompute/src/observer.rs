// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Model event callbacks.
//!
//! Observers are plain synchronous callbacks. They receive shared data only
//! and cannot reach back into the model while it notifies them.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use understory_naming::FeatureId;

use crate::{DirtyState, Report, RoleSet};

/// Receives model events. Every method defaults to doing nothing.
pub trait ModelObserver {
    /// A feature was added.
    fn feature_added(&mut self, feature: FeatureId) {
        let _ = feature;
    }

    /// A feature was removed.
    fn feature_removed(&mut self, feature: FeatureId) {
        let _ = feature;
    }

    /// An edge was created or gained roles; `roles` is the full set now on
    /// the edge.
    fn connection_added(&mut self, parent: FeatureId, child: FeatureId, roles: &RoleSet) {
        let _ = (parent, child, roles);
    }

    /// An edge was removed.
    fn connection_removed(&mut self, parent: FeatureId, child: FeatureId) {
        let _ = (parent, child);
    }

    /// The effective state of a feature changed.
    fn state_changed(&mut self, feature: FeatureId, before: DirtyState, after: DirtyState) {
        let _ = (feature, before, after);
    }

    /// A recompute pass began.
    fn recompute_started(&mut self) {}

    /// A recompute pass ended.
    fn recompute_finished(&mut self, report: &Report) {
        let _ = report;
    }
}

impl<T: ModelObserver> ModelObserver for Rc<RefCell<T>> {
    fn feature_added(&mut self, feature: FeatureId) {
        self.borrow_mut().feature_added(feature);
    }

    fn feature_removed(&mut self, feature: FeatureId) {
        self.borrow_mut().feature_removed(feature);
    }

    fn connection_added(&mut self, parent: FeatureId, child: FeatureId, roles: &RoleSet) {
        self.borrow_mut().connection_added(parent, child, roles);
    }

    fn connection_removed(&mut self, parent: FeatureId, child: FeatureId) {
        self.borrow_mut().connection_removed(parent, child);
    }

    fn state_changed(&mut self, feature: FeatureId, before: DirtyState, after: DirtyState) {
        self.borrow_mut().state_changed(feature, before, after);
    }

    fn recompute_started(&mut self) {
        self.borrow_mut().recompute_started();
    }

    fn recompute_finished(&mut self, report: &Report) {
        self.borrow_mut().recompute_finished(report);
    }
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Registered observers, notified in subscription order.
#[derive(Default)]
pub(crate) struct Observers {
    next: u64,
    entries: Vec<(ObserverId, Box<dyn ModelObserver>)>,
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("next", &self.next)
            .field("count", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl Observers {
    pub(crate) fn subscribe(&mut self, observer: Box<dyn ModelObserver>) -> ObserverId {
        let id = ObserverId(self.next);
        self.next += 1;
        self.entries.push((id, observer));
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    pub(crate) fn notify(&mut self, mut f: impl FnMut(&mut dyn ModelObserver)) {
        for (_, observer) in &mut self.entries {
            f(observer.as_mut());
        }
    }
}

/// One recorded model event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModelEvent {
    /// See [`ModelObserver::feature_added`].
    FeatureAdded(FeatureId),
    /// See [`ModelObserver::feature_removed`].
    FeatureRemoved(FeatureId),
    /// See [`ModelObserver::connection_added`].
    ConnectionAdded {
        /// Upstream end.
        parent: FeatureId,
        /// Downstream end.
        child: FeatureId,
        /// Roles now on the edge.
        roles: RoleSet,
    },
    /// See [`ModelObserver::connection_removed`].
    ConnectionRemoved {
        /// Upstream end.
        parent: FeatureId,
        /// Downstream end.
        child: FeatureId,
    },
    /// See [`ModelObserver::state_changed`].
    StateChanged {
        /// The feature.
        feature: FeatureId,
        /// Effective state before.
        before: DirtyState,
        /// Effective state after.
        after: DirtyState,
    },
    /// See [`ModelObserver::recompute_started`].
    RecomputeStarted,
    /// See [`ModelObserver::recompute_finished`].
    RecomputeFinished {
        /// Number of features computed.
        computed: usize,
        /// Number of features that failed.
        failures: usize,
    },
}

/// Observer that records every event.
///
/// Subscribe it wrapped in `Rc<RefCell<_>>` to read the log afterwards.
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    events: Vec<ModelEvent>,
}

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded events, oldest first.
    #[must_use]
    pub fn events(&self) -> &[ModelEvent] {
        &self.events
    }

    /// Takes the recorded events, leaving the log empty.
    pub fn take(&mut self) -> Vec<ModelEvent> {
        core::mem::take(&mut self.events)
    }
}

impl ModelObserver for EventLog {
    fn feature_added(&mut self, feature: FeatureId) {
        self.events.push(ModelEvent::FeatureAdded(feature));
    }

    fn feature_removed(&mut self, feature: FeatureId) {
        self.events.push(ModelEvent::FeatureRemoved(feature));
    }

    fn connection_added(&mut self, parent: FeatureId, child: FeatureId, roles: &RoleSet) {
        self.events.push(ModelEvent::ConnectionAdded {
            parent,
            child,
            roles: roles.clone(),
        });
    }

    fn connection_removed(&mut self, parent: FeatureId, child: FeatureId) {
        self.events
            .push(ModelEvent::ConnectionRemoved { parent, child });
    }

    fn state_changed(&mut self, feature: FeatureId, before: DirtyState, after: DirtyState) {
        self.events.push(ModelEvent::StateChanged {
            feature,
            before,
            after,
        });
    }

    fn recompute_started(&mut self) {
        self.events.push(ModelEvent::RecomputeStarted);
    }

    fn recompute_finished(&mut self, report: &Report) {
        self.events.push(ModelEvent::RecomputeFinished {
            computed: report.computed.len(),
            failures: report.failures.len(),
        });
    }
}
