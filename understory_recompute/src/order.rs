// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deterministic topological ordering.

use alloc::collections::BinaryHeap;
use alloc::vec::Vec;
use core::cmp::Reverse;

use smallvec::SmallVec;

/// Kahn's algorithm over slot indices.
///
/// Slots for which `include` is false are left out together with their
/// edges. Among ready slots the smallest index goes first, so identical
/// graphs always yield identical orders. Slots left on a cycle are not
/// yielded.
pub(crate) fn deterministic_order(
    parents: &[SmallVec<[usize; 2]>],
    children: &[SmallVec<[usize; 4]>],
    include: impl Fn(usize) -> bool,
) -> Vec<usize> {
    let count = parents.len();
    let mut in_degree: Vec<usize> = alloc::vec![0; count];
    let mut ready = BinaryHeap::new();
    for slot in 0..count {
        if !include(slot) {
            continue;
        }
        let degree = parents[slot].iter().filter(|&&p| include(p)).count();
        in_degree[slot] = degree;
        if degree == 0 {
            ready.push(Reverse(slot));
        }
    }

    let mut order = Vec::new();
    while let Some(Reverse(slot)) = ready.pop() {
        order.push(slot);
        for &child in &children[slot] {
            if !include(child) {
                continue;
            }
            in_degree[child] -= 1;
            if in_degree[child] == 0 {
                ready.push(Reverse(child));
            }
        }
    }
    order
}
