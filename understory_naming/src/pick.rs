// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Resolving stored picks against the current history.

use alloc::vec::Vec;

use hashbrown::HashSet;
use smallvec::SmallVec;

use crate::history::{DevolveHistory, HistoryVertex, ShapeHistory};
use crate::{FeatureId, ShapeId, ShapeIdentityTable};

/// A user or feature reference to one sub-entity.
#[derive(Clone, Debug)]
pub struct PickRecord {
    /// Feature the entity was picked on.
    pub feature: FeatureId,
    /// Id of the picked entity.
    pub shape: ShapeId,
    /// Where on the entity the pick landed, if known.
    pub point: Option<[f64; 3]>,
    /// Lineage of `shape` when the pick was made.
    pub history: DevolveHistory,
}

impl PickRecord {
    /// Records a pick of `shape` on `feature` against the current history.
    #[must_use]
    pub fn capture(history: &ShapeHistory, feature: FeatureId, shape: ShapeId) -> Self {
        Self {
            feature,
            shape,
            point: None,
            history: history.create_devolve_history(shape),
        }
    }

    /// Attaches the picked point.
    #[must_use]
    pub fn with_point(mut self, point: [f64; 3]) -> Self {
        self.point = Some(point);
        self
    }
}

/// Why a pick did not resolve.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MissingReason {
    /// Neither the picked id nor anything it came from exists any more.
    Absent,
    /// The picked id is gone but something it came from still exists: the
    /// entity was merged away or replaced.
    Consumed,
    /// The picked id exists but does not lead into any of the candidate
    /// features.
    NotReachable,
}

/// Outcome of resolving one pick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// The pick's current equivalent. More than one id means the entity was
    /// split.
    Resolved {
        /// Candidate feature holding the ids.
        feature: FeatureId,
        /// Current ids, sorted.
        ids: SmallVec<[ShapeId; 1]>,
    },
    /// No current equivalent exists.
    Missing {
        /// Why.
        reason: MissingReason,
    },
}

impl Resolution {
    /// Returns `true` for [`Resolution::Missing`].
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing { .. })
    }

    /// Resolved ids; empty when missing.
    #[must_use]
    pub fn ids(&self) -> &[ShapeId] {
        match self {
            Self::Resolved { ids, .. } => ids.as_slice(),
            Self::Missing { .. } => &[],
        }
    }
}

/// Resolves `picks` into the first of `features` their ids lead to.
///
/// Each pick starts from every vertex of `history` carrying the picked id and
/// walks forward. The ids reached in a candidate feature are reported only if
/// that feature's table really holds them, so a stale history can make a
/// pick miss but never resolve to a wrong id. Returns one [`Resolution`] per
/// pick, in order.
#[must_use]
pub fn resolve_picks(
    features: &[(FeatureId, &ShapeIdentityTable)],
    picks: &[PickRecord],
    history: &ShapeHistory,
) -> Vec<Resolution> {
    picks
        .iter()
        .map(|pick| resolve_one(features, pick, history))
        .collect()
}

fn resolve_one(
    features: &[(FeatureId, &ShapeIdentityTable)],
    pick: &PickRecord,
    history: &ShapeHistory,
) -> Resolution {
    let mut reached: HashSet<HistoryVertex> = HashSet::new();
    for start in history.vertices_with_shape(pick.shape) {
        reached.insert(start);
        reached.extend(history.evolve(start));
    }

    if reached.is_empty() {
        let consumed = pick.history.ancestors().any(|a| history.contains(a));
        let reason = if consumed {
            MissingReason::Consumed
        } else {
            MissingReason::Absent
        };
        tracing::debug!(feature = %pick.feature, shape = %pick.shape, ?reason, "pick missing");
        return Resolution::Missing { reason };
    }

    for &(feature, table) in features {
        let mut ids: SmallVec<[ShapeId; 1]> = reached
            .iter()
            .filter(|v| v.feature == feature && table.has_id(v.shape))
            .map(|v| v.shape)
            .collect();
        if !ids.is_empty() {
            ids.sort_unstable();
            ids.dedup();
            return Resolution::Resolved { feature, ids };
        }
    }

    tracing::debug!(
        feature = %pick.feature,
        shape = %pick.shape,
        "pick does not reach any candidate"
    );
    Resolution::Missing {
        reason: MissingReason::NotReachable,
    }
}
