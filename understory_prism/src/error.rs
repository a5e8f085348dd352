// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::string::ToString;

use understory_recompute::ComputeError;

/// An operation the kernel refuses to perform.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum KernelError {
    /// A polygon needs at least three sides.
    #[error("a polygon needs at least 3 sides, got {0}")]
    TooFewSides(usize),
    /// A length is zero, negative or not finite.
    #[error("degenerate {what}: {value}")]
    Degenerate {
        /// Which length.
        what: &'static str,
        /// Its value.
        value: f64,
    },
    /// The operand is not a single closed planar profile.
    #[error("expected exactly one profile face, found {faces}")]
    NoProfile {
        /// Faces found in the operand.
        faces: usize,
    },
    /// The profile face has no boundary wire with edges.
    #[error("profile face has no boundary edges")]
    OpenProfile,
}

impl From<KernelError> for ComputeError {
    fn from(err: KernelError) -> Self {
        Self::GeometryOperationFailed(err.to_string())
    }
}
