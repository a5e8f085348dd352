// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Geometry fingerprints.
//!
//! The kernel does not keep coordinates. Every entity carries a 64-bit
//! fingerprint of the inputs that determine its shape, which is all naming
//! and change detection need.

pub(crate) const SKETCH: u64 = 0x5_3b;
pub(crate) const SOLID: u64 = 0x50_1d;
pub(crate) const SHELL: u64 = 0x5_7e11;
pub(crate) const TOP: u64 = 0x70_b0;
pub(crate) const SIDE: u64 = 0x51_de;
pub(crate) const VERTICAL: u64 = 0x7e_a7;
pub(crate) const SPLIT: u64 = 0x5_b117;

/// FNV-1a over 64-bit words.
pub(crate) fn fingerprint(parts: &[u64]) -> u64 {
    parts.iter().fold(0xcbf2_9ce4_8422_2325, |hash, &part| {
        (hash ^ part).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

/// Rejects zero, negative and non-finite lengths.
pub(crate) fn positive(what: &'static str, value: f64) -> Result<f64, crate::KernelError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(crate::KernelError::Degenerate { what, value })
    }
}
