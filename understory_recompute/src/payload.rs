// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compute-step inputs.

use alloc::vec::Vec;

use understory_naming::{
    EvolveRecord, FeatureId, NamingDiagnostic, NamingError, OperandSnapshot, OperationResult,
    PersistentNamingStore, ShapeId, ShapeIdentityTable,
};

use crate::{ComputeError, DirtyState, FeatureKind, Parameters, Role, RoleSet};

/// One direct predecessor as seen by a compute step.
#[derive(Clone, Copy, Debug)]
pub struct PayloadInput<'a> {
    /// The predecessor.
    pub feature: FeatureId,
    /// Its type tag.
    pub kind: FeatureKind,
    /// Roles of the edge into the computing feature.
    pub roles: &'a RoleSet,
    /// Its current output.
    pub table: &'a ShapeIdentityTable,
    /// Records of its last compute step.
    pub history: &'a [EvolveRecord],
    /// Its effective state.
    pub state: DirtyState,
}

impl PayloadInput<'_> {
    /// Returns `true` if the input has output worth consuming: it did not
    /// fail, is not inactive and its table is not empty.
    #[must_use]
    pub fn usable(&self) -> bool {
        !self
            .state
            .intersects(DirtyState::FAILURE | DirtyState::INACTIVE)
            && !self.table.is_empty()
    }
}

/// Read-only inputs of one compute step: every direct predecessor with its
/// edge roles, in predecessor insertion order.
#[derive(Clone, Debug, Default)]
pub struct UpdatePayload<'a> {
    inputs: Vec<PayloadInput<'a>>,
}

impl<'a> UpdatePayload<'a> {
    pub(crate) fn new(inputs: Vec<PayloadInput<'a>>) -> Self {
        Self { inputs }
    }

    /// Number of inputs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    /// Returns `true` if the feature has no inputs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// All inputs.
    pub fn iter(&self) -> impl Iterator<Item = &PayloadInput<'a>> + '_ {
        self.inputs.iter()
    }

    /// Inputs whose edge carries `role`, usable or not.
    pub fn with_role<'r>(&self, role: &'r Role) -> impl Iterator<Item = &PayloadInput<'a>> {
        self.inputs.iter().filter(move |i| i.roles.contains(role))
    }

    /// First input whose edge carries `role`.
    #[must_use]
    pub fn first_with_role(&self, role: &Role) -> Option<&PayloadInput<'a>> {
        self.inputs.iter().find(|i| i.roles.contains(role))
    }

    /// First usable input carrying `role`, or
    /// [`ComputeError::MissingInput`].
    pub fn require(&self, role: &Role) -> Result<&PayloadInput<'a>, ComputeError> {
        self.inputs
            .iter()
            .find(|i| i.roles.contains(role) && i.usable())
            .ok_or_else(|| ComputeError::MissingInput(role.clone()))
    }

    /// The usable [`Role::Target`] input.
    pub fn target(&self) -> Result<&PayloadInput<'a>, ComputeError> {
        self.require(&Role::Target)
    }
}

/// Everything one compute step may read and write.
///
/// The step reads parameters and inputs, captures an [`OperandSnapshot`]
/// before calling the geometry kernel, then hands the kernel result to
/// [`commit`](Self::commit), which names it into the feature's table.
#[derive(Debug)]
pub struct ComputeContext<'a> {
    feature: FeatureId,
    parameters: &'a Parameters,
    payload: &'a UpdatePayload<'a>,
    table: &'a mut ShapeIdentityTable,
    naming: &'a mut PersistentNamingStore,
    committed: bool,
    commit_error: Option<NamingError>,
}

impl<'a> ComputeContext<'a> {
    pub(crate) fn new(
        feature: FeatureId,
        parameters: &'a Parameters,
        payload: &'a UpdatePayload<'a>,
        table: &'a mut ShapeIdentityTable,
        naming: &'a mut PersistentNamingStore,
    ) -> Self {
        Self {
            feature,
            parameters,
            payload,
            table,
            naming,
            committed: false,
            commit_error: None,
        }
    }

    /// The computing feature.
    #[must_use]
    pub fn feature(&self) -> FeatureId {
        self.feature
    }

    /// Its current parameters.
    #[must_use]
    pub fn parameters(&self) -> &'a Parameters {
        self.parameters
    }

    /// Its inputs.
    #[must_use]
    pub fn payload(&self) -> &'a UpdatePayload<'a> {
        self.payload
    }

    /// The output of the previous successful step.
    #[must_use]
    pub fn previous(&self) -> &ShapeIdentityTable {
        self.table
    }

    /// Freezes the ids of `operands`; operand `i` of the snapshot is
    /// `operands[i]`.
    #[must_use]
    pub fn snapshot(&self, operands: &[&PayloadInput<'_>]) -> OperandSnapshot {
        let mut snapshot = OperandSnapshot::new();
        for input in operands {
            snapshot.capture(input.feature, input.table);
        }
        snapshot
    }

    /// Seed id for an entity the feature names itself, e.g. a sketch edge.
    #[must_use]
    pub fn seed(&self, name: &[u8]) -> ShapeId {
        ShapeId::mint(self.feature, name)
    }

    /// Names `result` into the feature's table.
    ///
    /// Fails with [`ComputeError::NamingInvariantViolated`] when a nil or
    /// duplicate id survives naming. The step fails even if the feature
    /// ignores the error.
    pub fn commit(
        &mut self,
        snapshot: &OperandSnapshot,
        result: OperationResult,
    ) -> Result<(), ComputeError> {
        self.committed = true;
        let named = self.naming.name(self.table, snapshot, result);
        self.commit_error = named.clone().err();
        named.map_err(ComputeError::from)
    }

    /// Diagnostics of the last commit.
    #[must_use]
    pub fn diagnostics(&self) -> &[NamingDiagnostic] {
        self.naming.diagnostics()
    }

    pub(crate) fn committed(&self) -> bool {
        self.committed
    }

    pub(crate) fn take_commit_error(&mut self) -> Option<NamingError> {
        self.commit_error.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use understory_naming::{EntityKind, Topology, Uuid};

    fn input<'a>(
        feature: FeatureId,
        roles: &'a RoleSet,
        table: &'a ShapeIdentityTable,
    ) -> PayloadInput<'a> {
        PayloadInput {
            feature,
            kind: FeatureKind::new("stub"),
            roles,
            table,
            history: &[],
            state: DirtyState::empty(),
        }
    }

    #[test]
    fn role_lookups_skip_unusable_inputs() {
        let ids: Vec<_> = (0..3)
            .map(|seq| FeatureId::from_sequence(Uuid::from_u128(3), seq))
            .collect();
        let mut topology = Topology::new();
        let vertex = topology.add(EntityKind::Vertex, 7);
        topology.set_root(vertex);
        let mut table = ShapeIdentityTable::new();
        table.set_root_shape(topology, ShapeId::mint(ids[2], b"r"));
        let empty = ShapeIdentityTable::new();
        let target = RoleSet::from(Role::Target);
        let tool = RoleSet::from(Role::Tool);
        let payload = UpdatePayload::new(vec![
            input(ids[0], &target, &empty),
            input(ids[1], &tool, &table),
            input(ids[2], &target, &table),
        ]);

        // Results borrow the payload, not the role.
        let first = {
            let role = Role::Target;
            payload.first_with_role(&role)
        };
        let usable = {
            let role = Role::Target;
            payload.require(&role)
        };
        assert_eq!(first.map(|i| i.feature), Some(ids[0]));
        assert_eq!(usable.map(|i| i.feature), Ok(ids[2]));
        assert_eq!(payload.target().map(|i| i.feature), Ok(ids[2]));
        assert_eq!(payload.with_role(&Role::Tool).count(), 1);
        assert!(matches!(
            payload.require(&Role::named("axis")),
            Err(ComputeError::MissingInput(Role::Named(_)))
        ));
    }
}
