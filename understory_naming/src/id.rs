// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Feature and shape identifiers.

use core::fmt;

use uuid::Uuid;

/// Stable identifier of a feature node.
///
/// Feature ids are usually assigned by the feature graph from a namespace and
/// the insertion sequence (see [`FeatureId::from_sequence`]), so two
/// independent builds that add the same features in the same order agree on
/// every id.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureId(Uuid);

impl FeatureId {
    /// Wraps an existing UUID.
    #[must_use]
    #[inline]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Derives the id of the `sequence`-th feature created under `namespace`.
    #[must_use]
    pub fn from_sequence(namespace: Uuid, sequence: u64) -> Self {
        Self(Uuid::new_v5(&namespace, &sequence.to_le_bytes()))
    }

    /// Returns the underlying UUID.
    #[must_use]
    #[inline]
    pub const fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl fmt::Debug for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FeatureId({})", short(self.0))
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Stable identifier of one sub-entity (face, edge, vertex, ...) of a
/// feature's output.
///
/// ## Semantics
///
/// - Ids are unique within one feature's
///   [`ShapeIdentityTable`](crate::ShapeIdentityTable) once a compute step
///   succeeds.
/// - An id reused verbatim by a downstream feature (the `original` lineage)
///   names the same logical entity in both features.
/// - Minted ids are name based: the same owner, lineage map and key always
///   produce the same id.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShapeId(Uuid);

impl ShapeId {
    /// Wraps an existing UUID.
    #[must_use]
    #[inline]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    #[inline]
    pub const fn as_uuid(self) -> Uuid {
        self.0
    }

    /// Mints the id `owner` gives to the entity described by `name`.
    ///
    /// Creation features use this to seed ids for entities that have no
    /// operand, e.g. `ShapeId::mint(sketch, b"edge-3")`.
    #[must_use]
    pub fn mint(owner: FeatureId, name: &[u8]) -> Self {
        Self(Uuid::new_v5(&owner.as_uuid(), name))
    }

    /// Raw bytes, used when building name keys out of other ids.
    #[must_use]
    #[inline]
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShapeId({})", short(self.0))
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// First eight hex digits; enough to tell ids apart in debug output.
fn short(uuid: Uuid) -> impl fmt::Display {
    struct Short([u8; 4]);
    impl fmt::Display for Short {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            for b in self.0 {
                write!(f, "{b:02x}")?;
            }
            Ok(())
        }
    }
    let bytes = uuid.as_bytes();
    Short([bytes[0], bytes[1], bytes[2], bytes[3]])
}
