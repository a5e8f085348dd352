// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Features driving the prism kernel.

use alloc::string::ToString;

use understory_recompute::{
    ComputeContext, ComputeError, Descriptor, Feature, FeatureKind, Parameters,
};

use crate::{extrude, polygon};

/// A regular polygon profile. Parameters: `sides` (integer), `radius`
/// (float).
#[derive(Clone, Debug)]
pub struct SketchFeature {
    sides: i64,
    radius: f64,
}

impl SketchFeature {
    /// Type tag.
    pub const KIND: FeatureKind = FeatureKind::new("sketch");

    /// Declares a profile with these default parameters.
    #[must_use]
    pub fn new(sides: i64, radius: f64) -> Self {
        Self { sides, radius }
    }
}

impl Feature for SketchFeature {
    fn kind(&self) -> FeatureKind {
        Self::KIND
    }

    fn descriptor(&self) -> Descriptor {
        Descriptor::Create
    }

    fn parameters(&self) -> Parameters {
        Parameters::new()
            .with("sides", self.sides)
            .with("radius", self.radius)
    }

    fn compute(&self, cx: &mut ComputeContext<'_>) -> Result<(), ComputeError> {
        let params = cx.parameters();
        let sides = params.integer("sides")?;
        let sides = usize::try_from(sides).map_err(|_| ComputeError::Parameter {
            name: "sides".to_string(),
            reason: "must not be negative".to_string(),
        })?;
        let result = polygon(cx.feature(), sides, params.float("radius")?)?;
        let snapshot = cx.snapshot(&[]);
        cx.commit(&snapshot, result)
    }
}

/// Extrudes its `Target` input. Parameters: `distance` (float) and
/// `split_side` (integer, `-1` for none), which splits one side face in two.
#[derive(Clone, Debug)]
pub struct ExtrudeFeature {
    distance: f64,
}

impl ExtrudeFeature {
    /// Type tag.
    pub const KIND: FeatureKind = FeatureKind::new("extrude");

    /// Declares an extrusion by `distance`.
    #[must_use]
    pub fn new(distance: f64) -> Self {
        Self { distance }
    }
}

impl Feature for ExtrudeFeature {
    fn kind(&self) -> FeatureKind {
        Self::KIND
    }

    fn parameters(&self) -> Parameters {
        Parameters::new()
            .with("distance", self.distance)
            .with("split_side", -1_i64)
    }

    fn compute(&self, cx: &mut ComputeContext<'_>) -> Result<(), ComputeError> {
        let params = cx.parameters();
        let distance = params.float("distance")?;
        let split = usize::try_from(params.integer("split_side")?).ok();
        let target = cx.payload().target()?;
        let snapshot = cx.snapshot(&[target]);
        let result = extrude(target.table, distance, split)?;
        cx.commit(&snapshot, result)
    }
}
