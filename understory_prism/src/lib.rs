// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Prism: a tiny topological kernel for exercising the feature
//! graph.
//!
//! It builds regular polygon profiles and extrudes them into prisms. There
//! are no coordinates; every entity carries a fingerprint of the inputs that
//! determine it, which is enough for change detection and for testing how
//! [`understory_naming`] keeps ids stable across edits.
//!
//! The kernel functions ([`polygon`], [`extrude`]) report correspondence data
//! the way a real kernel would: the profile's entities carried into the
//! bottom cap as *original*, side faces and vertical edges as *generated*,
//! the top cap as *last*. [`SketchFeature`] and [`ExtrudeFeature`] wrap them
//! as [`Feature`](understory_recompute::Feature)s.
//!
//! ```rust
//! use understory_prism::{ExtrudeFeature, SketchFeature};
//! use understory_recompute::{Model, Role};
//! use understory_naming::EntityKind;
//!
//! let mut model = Model::new();
//! let sketch = model.add_feature(SketchFeature::new(4, 1.0));
//! let prism = model.add_feature(ExtrudeFeature::new(2.0));
//! model.connect(sketch, prism, Role::Target).unwrap();
//! assert!(model.recompute().is_success());
//!
//! let faces = model.table(prism).unwrap().ids_of_kind(EntityKind::Face);
//! assert_eq!(faces.len(), 6);
//!
//! model.set_parameter(prism, "distance", 5.0).unwrap();
//! model.recompute();
//! assert_eq!(model.table(prism).unwrap().ids_of_kind(EntityKind::Face), faces);
//! ```

#![no_std]

extern crate alloc;

mod error;
mod extrude;
mod features;
mod geometry;
mod sketch;

pub use error::KernelError;
pub use extrude::extrude;
pub use features::{ExtrudeFeature, SketchFeature};
pub use sketch::polygon;
