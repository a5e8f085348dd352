// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reusable buffers for walking the feature graph.

use alloc::vec::Vec;

use hashbrown::HashSet;

/// Stack and visited set for [`FeatureGraph::for_each_dependent`].
///
/// Every edit walks the downstream closure of the edited feature. Keeping
/// one scratch per tracker lets those walks reuse their allocations. The
/// buffers hold graph slots, not ids, and are cleared at the start of every
/// walk.
///
/// [`FeatureGraph::for_each_dependent`]: crate::FeatureGraph::for_each_dependent
#[derive(Debug, Default)]
pub struct TraversalScratch {
    pub(crate) stack: Vec<usize>,
    pub(crate) visited: HashSet<usize>,
}

impl TraversalScratch {
    /// Creates empty buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates buffers sized for a graph of `features` features.
    #[must_use]
    pub fn with_capacity(features: usize) -> Self {
        Self {
            stack: Vec::with_capacity(features),
            visited: HashSet::with_capacity(features),
        }
    }

    pub(crate) fn reset(&mut self) {
        self.stack.clear();
        self.visited.clear();
    }
}
