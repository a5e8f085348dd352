// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Recompute: a parametric feature graph with incremental,
//! deterministic recompute.
//!
//! A parametric model is a DAG of features. Each feature turns parameters and
//! the outputs of its inputs into geometry, named by
//! [`understory_naming`] so that sub-entity ids survive parameter edits.
//! This crate keeps that DAG up to date:
//!
//! - **Feature graph** ([`FeatureGraph`]): features connected by edges tagged
//!   with [`Role`]s, kept acyclic, ordered deterministically.
//! - **State tracking** ([`DirtyStateTracker`], [`DirtyState`]): per-feature
//!   bits (dirty, failed, skipped, inactive, ...) and the rule that dirtiness
//!   spreads to everything downstream and nowhere else.
//! - **Recompute** ([`RecomputeScheduler`]): visits features parents first,
//!   computes only the dirty ones, turns failures into per-feature state and
//!   restarts cleanly when the model changes mid-pass.
//! - **Model** ([`Model`]): the facade that keeps all of the above and the
//!   project [`ShapeHistory`](understory_naming::ShapeHistory) consistent,
//!   and notifies [`ModelObserver`]s.
//!
//! Geometry comes from an external kernel. A [`Feature`] calls it from
//! [`Feature::compute`] and hands the result, with the kernel's
//! correspondence data, to [`ComputeContext::commit`].
//!
//! ## Quick Start
//!
//! ```rust
//! use understory_naming::{Correspondence, EntityKind, OperationResult, Topology};
//! use understory_recompute::{
//!     ComputeContext, ComputeError, Descriptor, DirtyState, Feature, FeatureKind, Model,
//!     Parameters,
//! };
//!
//! /// A single vertex at height `z`.
//! #[derive(Debug)]
//! struct Point;
//!
//! impl Feature for Point {
//!     fn kind(&self) -> FeatureKind {
//!         FeatureKind::new("point")
//!     }
//!     fn descriptor(&self) -> Descriptor {
//!         Descriptor::Create
//!     }
//!     fn parameters(&self) -> Parameters {
//!         Parameters::new().with("z", 1.0)
//!     }
//!     fn compute(&self, cx: &mut ComputeContext<'_>) -> Result<(), ComputeError> {
//!         let z = cx.parameters().float("z")?;
//!         let mut topology = Topology::new();
//!         let vertex = topology.add(EntityKind::Vertex, z.to_bits());
//!         topology.set_root(vertex);
//!         let snapshot = cx.snapshot(&[]);
//!         let result = OperationResult { topology, correspondence: Correspondence::new() };
//!         cx.commit(&snapshot, result)
//!     }
//! }
//!
//! let mut model = Model::new();
//! let point = model.add_feature(Point);
//! assert!(model.state(point).unwrap().contains(DirtyState::MODEL_DIRTY));
//!
//! let report = model.recompute();
//! assert_eq!(report.computed, vec![point]);
//! let id = model.table(point).unwrap().root_id();
//!
//! // Nothing changed: nothing is computed.
//! assert!(model.recompute().is_noop());
//!
//! // A parameter edit recomputes, and the vertex keeps its id.
//! model.set_parameter(point, "z", 2.0).unwrap();
//! assert_eq!(model.recompute().computed, vec![point]);
//! assert_eq!(model.table(point).unwrap().root_id(), id);
//! ```
//!
//! ## Failures
//!
//! A failing compute step never escapes [`Model::recompute`]. The feature
//! gets [`DirtyState::FAILURE`], an empty output and a retained message
//! ([`Model::last_error`]); its dependents are recomputed against the absent
//! output and see it as unusable in their [`UpdatePayload`]. Sibling subtrees
//! are unaffected.
//!
//! ## Staleness
//!
//! [`Model::begin_recompute`], [`Model::step`] and [`Model::finish`] run a pass
//! one feature at a time. Edits between steps are detected through the graph
//! and state generations; the pass then drops its unvisited remainder and
//! starts over with a fresh order instead of mixing two schedules.
//!
//! ## `no_std` Support
//!
//! This crate is `no_std` and uses `alloc`. It does not depend on `std`.

#![no_std]

extern crate alloc;

mod error;
mod feature;
mod graph;
mod model;
mod observer;
mod order;
mod payload;
mod role;
mod scheduler;
mod scratch;
mod state;
mod tracker;

#[cfg(test)]
mod testing;

pub use error::{ComputeError, GraphError};
pub use feature::{Descriptor, Feature, FeatureKind, ParameterValue, Parameters};
pub use graph::{DEFAULT_NAMESPACE, FeatureGraph};
pub use model::Model;
pub use observer::{EventLog, ModelEvent, ModelObserver, ObserverId};
pub use payload::{ComputeContext, PayloadInput, UpdatePayload};
pub use role::{Role, RoleSet};
pub use scheduler::{
    FeatureFailure, PassStep, RecomputeOptions, RecomputePass, RecomputeScheduler, Report,
};
pub use scratch::TraversalScratch;
pub use state::{DirtyState, StateCell, StateChange};
pub use tracker::DirtyStateTracker;
