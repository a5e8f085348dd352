// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.

use alloc::string::String;

use understory_naming::{FeatureId, NamingError};

use crate::Role;

/// A rejected graph mutation or query. The graph is unchanged when one is
/// returned.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// The edge would close a cycle (a self-loop included).
    #[error("connecting {parent} -> {child} would create a cycle")]
    CycleDetected {
        /// Upstream end of the rejected edge.
        parent: FeatureId,
        /// Downstream end of the rejected edge.
        child: FeatureId,
    },
    /// No alive feature has this id.
    #[error("feature {0} not found")]
    NotFound(FeatureId),
    /// The feature still has incoming or outgoing edges.
    #[error("feature {feature} is still connected ({in_degree} inputs, {out_degree} dependents)")]
    HasDependents {
        /// The feature that could not be removed.
        feature: FeatureId,
        /// Number of incoming edges.
        in_degree: usize,
        /// Number of outgoing edges.
        out_degree: usize,
    },
    /// A feature with this id already exists.
    #[error("feature {0} already exists")]
    DuplicateFeature(FeatureId),
    /// There is no edge between the two features.
    #[error("{parent} is not connected to {child}")]
    NotConnected {
        /// Upstream end.
        parent: FeatureId,
        /// Downstream end.
        child: FeatureId,
    },
}

/// Why a feature's compute step failed.
///
/// Never escapes a recompute; it becomes the feature's `FAILURE` bit and
/// its retained error message.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ComputeError {
    /// The geometry kernel rejected the operation.
    #[error("geometry operation failed: {0}")]
    GeometryOperationFailed(String),
    /// A nil or duplicate id survived the naming passes.
    #[error("naming invariant violated: {0}")]
    NamingInvariantViolated(#[from] NamingError),
    /// No usable upstream input carries this role.
    #[error("no usable `{0}` input")]
    MissingInput(Role),
    /// A parameter is missing or out of range.
    #[error("parameter `{name}`: {reason}")]
    Parameter {
        /// Parameter name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },
}
