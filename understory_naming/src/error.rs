// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.

use alloc::vec::Vec;

use crate::{EntityKey, ShapeId};

/// Lookup failures on a [`ShapeIdentityTable`](crate::ShapeIdentityTable).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    /// No entity carries the id.
    #[error("no sub-entity carries id {0}")]
    NotFound(ShapeId),
    /// More than one entity carries the id.
    #[error("id {id} is carried by {count} sub-entities")]
    Ambiguous {
        /// The duplicated id.
        id: ShapeId,
        /// How many entities carry it.
        count: usize,
    },
    /// The entity key is not part of the table's topology.
    #[error("sub-entity {0:?} is not part of this table")]
    UnknownEntity(EntityKey),
}

/// A naming pass left the table in a state that must fail the feature.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum NamingError {
    /// Sub-entities still have no id after every pass.
    #[error("{} sub-entities left without an id", entities.len())]
    NilIds {
        /// The unnamed entities, in arena order.
        entities: Vec<EntityKey>,
    },
    /// The same id is carried by more than one sub-entity.
    #[error("{} ids are carried by more than one sub-entity", ids.len())]
    DuplicateIds {
        /// The duplicated ids, sorted.
        ids: Vec<ShapeId>,
    },
    /// Correspondence data referenced an entity the result does not have.
    #[error("correspondence references unknown result entity {0:?}")]
    UnknownEntity(EntityKey),
}
