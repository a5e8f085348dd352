// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Naming: persistent topological naming primitives.
//!
//! A parametric model recomputes its features over and over. Every recompute
//! asks an external geometry kernel for a fresh, unidentified collection of
//! sub-entities (faces, edges, vertices, ...). Selections, downstream
//! references and per-entity overrides need those sub-entities to keep the
//! *same* id across recomputes that only change parameters. This crate
//! provides the bookkeeping for that:
//!
//! - **Identity tables** ([`ShapeIdentityTable`]): the id ↔ sub-entity bimap
//!   of one feature's current output, with hard checks for nil and duplicate
//!   ids.
//! - **Lineage maps** ([`PersistentNamingStore`]): per-feature `original`,
//!   `generated`, `last` and `derived` maps that mint an id once and reuse it
//!   on every later recompute, driven by kernel [`Correspondence`] data.
//! - **History** ([`ShapeHistory`]): the project-wide chain of
//!   [`EvolveRecord`]s, walkable in both directions.
//! - **Picks** ([`PickRecord`], [`resolve_picks`]): stored references that
//!   resolve forward to their current equivalent, or to an explicit
//!   [`Resolution::Missing`].
//!
//! The kernel result is modelled structurally by [`Topology`]; geometry is
//! reduced to an opaque fingerprint per entity.
//!
//! ## Naming one result
//!
//! ```rust
//! use understory_naming::{
//!     Correspondence, EntityKind, FeatureId, OperandEntity, OperandSnapshot, OperationResult,
//!     PersistentNamingStore, ShapeId, ShapeIdentityTable, Topology,
//! };
//! # use understory_naming::Uuid;
//!
//! let ns = Uuid::from_u128(1);
//! let sketch = FeatureId::from_sequence(ns, 0);
//! let sweep = FeatureId::from_sequence(ns, 1);
//!
//! // Upstream output: one named edge.
//! let mut edge_only = Topology::new();
//! let edge = edge_only.add(EntityKind::Edge, 0);
//! edge_only.set_root(edge);
//! let mut upstream = ShapeIdentityTable::new();
//! upstream.set_root_shape(edge_only, ShapeId::mint(sketch, b"edge-0"));
//!
//! // Snapshot operand ids, then run the (here hand-built) operation.
//! let mut snapshot = OperandSnapshot::new();
//! let operand = snapshot.capture(sketch, &upstream);
//!
//! let mut topology = Topology::new();
//! let root = topology.add(EntityKind::Compound, 0);
//! let face = topology.add(EntityKind::Face, 42);
//! topology.attach(root, face);
//! topology.set_root(root);
//! let mut correspondence = Correspondence::new();
//! correspondence.add_generated(OperandEntity::new(operand, edge), face);
//!
//! let mut store = PersistentNamingStore::new(sweep);
//! let mut table = ShapeIdentityTable::new();
//! store
//!     .name(&mut table, &snapshot, OperationResult { topology, correspondence })
//!     .unwrap();
//!
//! let face_id = table.find_id(face).unwrap();
//! assert!(table.ensure_no_nils().is_ok());
//! // The same key always yields the same id.
//! assert_eq!(
//!     store.lookup(understory_naming::Category::Generated, ShapeId::mint(sketch, b"edge-0")),
//!     Some(face_id)
//! );
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod error;
mod evolve;
mod history;
mod id;
mod pick;
mod store;
mod table;
mod topology;

pub use error::{NamingError, TableError};
pub use evolve::{Category, EvolveRecord, NamingDiagnostic};
pub use history::{DevolveHistory, HistoryVertex, ShapeHistory};
pub use id::{FeatureId, ShapeId};
pub use pick::{MissingReason, PickRecord, Resolution, resolve_picks};
pub use store::{
    Correspondence, OperandEntity, OperandSnapshot, OperationResult, PersistentNamingStore,
};
pub use table::ShapeIdentityTable;
pub use topology::{EntityKey, EntityKind, Topology};

pub use uuid::Uuid;
