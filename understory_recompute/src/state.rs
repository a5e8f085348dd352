// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-feature state bits.

use understory_naming::FeatureId;

bitflags::bitflags! {
    /// State of one feature.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct DirtyState: u16 {
        /// Output is out of date and must be recomputed.
        const MODEL_DIRTY  = 0b0000_0001;
        /// Output content changed since a renderer last looked at it.
        const VISUAL_DIRTY = 0b0000_0010;
        /// The last compute step failed.
        const FAILURE      = 0b0000_0100;
        /// Never computed; passes its single target input through.
        const SKIPPED      = 0b0000_1000;
        /// Excluded from recompute and unusable as an input.
        const INACTIVE     = 0b0001_0000;
        /// At least one active feature consumes this one.
        const NON_LEAF     = 0b0010_0000;
        /// Currently being edited by the user.
        const EDITING      = 0b0100_0000;
    }
}

impl Default for DirtyState {
    fn default() -> Self {
        Self::empty()
    }
}

impl DirtyState {
    /// Bits whose change re-triggers dirty propagation.
    pub const PROPAGATING: Self = Self::SKIPPED.union(Self::INACTIVE);

    /// Returns `true` if the feature has to be recomputed.
    #[must_use]
    pub fn needs_recompute(self) -> bool {
        self.contains(Self::MODEL_DIRTY)
    }
}

/// State stored per feature: bits set by the model itself and bits imposed
/// from outside (a host document, a configuration). The effective state is
/// their union.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StateCell {
    /// Bits owned by the model.
    pub local: DirtyState,
    /// Bits owned by an external controller.
    pub external: DirtyState,
}

impl StateCell {
    /// The effective state.
    #[must_use]
    pub fn merged(self) -> DirtyState {
        self.local | self.external
    }
}

/// One change of a feature's effective state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateChange {
    /// The feature.
    pub feature: FeatureId,
    /// Effective state before.
    pub before: DirtyState,
    /// Effective state after.
    pub after: DirtyState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_merges_both_owners() {
        let cell = StateCell {
            local: DirtyState::MODEL_DIRTY,
            external: DirtyState::INACTIVE,
        };
        assert_eq!(cell.merged(), DirtyState::MODEL_DIRTY | DirtyState::INACTIVE);
        assert!(cell.merged().needs_recompute());
        assert!(cell.merged().intersects(DirtyState::PROPAGATING));
        assert!(!DirtyState::default().needs_recompute());
    }
}
