// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Minimal features for unit tests.

use alloc::string::ToString;

use understory_naming::{Correspondence, EntityKind, OperationResult, Topology};

use crate::{ComputeContext, ComputeError, Descriptor, Feature, FeatureKind, Parameters};

/// Produces one vertex whose geometry is the `value` parameter, or fails
/// when `value` is negative.
#[derive(Debug)]
pub(crate) struct Stub {
    descriptor: Descriptor,
}

impl Stub {
    pub(crate) fn create() -> Self {
        Self {
            descriptor: Descriptor::Create,
        }
    }

    pub(crate) fn alter() -> Self {
        Self {
            descriptor: Descriptor::Alter,
        }
    }
}

impl Feature for Stub {
    fn kind(&self) -> FeatureKind {
        FeatureKind::new("stub")
    }

    fn descriptor(&self) -> Descriptor {
        self.descriptor
    }

    fn parameters(&self) -> Parameters {
        Parameters::new().with("value", 1_i64)
    }

    fn compute(&self, cx: &mut ComputeContext<'_>) -> Result<(), ComputeError> {
        let value = cx.parameters().integer("value")?;
        if value < 0 {
            return Err(ComputeError::GeometryOperationFailed("negative value".to_string()));
        }
        let mut topology = Topology::new();
        let vertex = topology.add(EntityKind::Vertex, value.unsigned_abs());
        topology.set_root(vertex);
        let snapshot = cx.snapshot(&[]);
        cx.commit(
            &snapshot,
            OperationResult {
                topology,
                correspondence: Correspondence::new(),
            },
        )
    }
}
