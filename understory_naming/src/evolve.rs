// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Lineage records and naming diagnostics.

use crate::{EntityKey, ShapeId};

/// Which lineage map produced an id.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    /// Operand entity carried into the result unchanged; id reused verbatim.
    Original,
    /// New entity the kernel reports as generated from an operand entity.
    Generated,
    /// New top-level entity keyed by the operand (or seed) that created it.
    Last,
    /// Id propagated down structural containment from named parents.
    Derived,
}

impl Category {
    /// Byte prefix used when minting ids for this map.
    pub(crate) const fn tag(self) -> u8 {
        match self {
            Self::Original => b'o',
            Self::Generated => b'g',
            Self::Last => b'l',
            Self::Derived => b'd',
        }
    }
}

/// One lineage entry: `old` became `new` through `category`.
///
/// `old` is `None` for derived ids, which have no single predecessor.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct EvolveRecord {
    /// Id on the operand side.
    pub old: Option<ShapeId>,
    /// Id assigned in the result.
    pub new: ShapeId,
    /// Map that produced the assignment.
    pub category: Category,
}

/// Non-fatal conditions noticed during a naming run.
///
/// These never fail a feature on their own. The entities they leave unnamed
/// either get a derived id or make the run fail its final checks.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NamingDiagnostic {
    /// The kernel reported more than one generated or last entity for one
    /// operand id. Only the first was mapped; `entity` was left for the
    /// derived pass.
    MultipleGenerated {
        /// Operand id that was reported more than once.
        operand: ShapeId,
        /// Result entity that was not mapped.
        entity: EntityKey,
        /// Map in which the repeat occurred.
        category: Category,
    },
    /// A pass tried to give an already named entity a different id. The
    /// first assignment was kept.
    Conflict {
        /// Entity receiving two ids.
        entity: EntityKey,
        /// Id it keeps.
        kept: ShapeId,
        /// Id that was refused.
        rejected: ShapeId,
    },
    /// Correspondence referenced an operand entity that had no id in the
    /// snapshot.
    UnnamedOperand {
        /// Index of the operand in the snapshot.
        operand: usize,
        /// Entity within that operand.
        entity: EntityKey,
    },
    /// The derived pass could not name `entity` because one of its parents
    /// was unnamed, or it has no parents at all.
    UnnamedParent {
        /// Entity that stays nil.
        entity: EntityKey,
    },
}
