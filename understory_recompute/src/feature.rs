// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The feature trait and feature parameters.

use alloc::borrow::Cow;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use crate::{ComputeContext, ComputeError};

/// A node of the feature graph: produces geometry from its parameters and
/// its upstream inputs.
///
/// Implementations hold no output of their own. The graph owns each
/// feature's parameters, identity table and naming store, and hands them to
/// [`compute`](Self::compute) through a [`ComputeContext`].
pub trait Feature: fmt::Debug {
    /// Type tag, e.g. `"extrude"`.
    fn kind(&self) -> FeatureKind;

    /// How the feature relates to its target input.
    fn descriptor(&self) -> Descriptor {
        Descriptor::Alter
    }

    /// Declared parameters with their default values.
    fn parameters(&self) -> Parameters {
        Parameters::new()
    }

    /// Runs one compute step.
    ///
    /// A step that produces geometry ends with
    /// [`ComputeContext::commit`]; a step that returns `Ok` without
    /// committing leaves the feature with an empty output.
    fn compute(&self, cx: &mut ComputeContext<'_>) -> Result<(), ComputeError>;
}

/// Type tag of a feature.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureKind(&'static str);

impl FeatureKind {
    /// Creates a tag.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// The tag text.
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Whether a feature starts new geometry or modifies its target.
///
/// `connect_insert` splices an `Alter` feature between a parent and the
/// `Alter` feature that already consumes it.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Descriptor {
    /// Creates geometry from parameters alone (sketch, primitive).
    Create,
    /// Modifies its target input (extrude, fillet, boolean).
    #[default]
    Alter,
}

/// A parameter value.
#[derive(Clone, Debug, PartialEq)]
pub enum ParameterValue {
    /// Length, angle, ...
    Float(f64),
    /// Count, index, ...
    Integer(i64),
    /// Flag.
    Bool(bool),
    /// Free text.
    Text(Cow<'static, str>),
}

impl ParameterValue {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Float(_) => "float",
            Self::Integer(_) => "integer",
            Self::Bool(_) => "bool",
            Self::Text(_) => "text",
        }
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<i64> for ParameterValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&'static str> for ParameterValue {
    fn from(value: &'static str) -> Self {
        Self::Text(Cow::Borrowed(value))
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        Self::Text(Cow::Owned(value))
    }
}

/// Ordered `name -> value` list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Parameters {
    entries: Vec<(Cow<'static, str>, ParameterValue)>,
}

impl Parameters {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`set`](Self::set).
    #[must_use]
    pub fn with(mut self, name: &'static str, value: impl Into<ParameterValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Value of `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Sets `name`, appending it if new. Returns the previous value.
    pub fn set(
        &mut self,
        name: impl Into<Cow<'static, str>>,
        value: impl Into<ParameterValue>,
    ) -> Option<ParameterValue> {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => Some(core::mem::replace(slot, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    /// Entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterValue)> + '_ {
        self.entries.iter().map(|(n, v)| (n.as_ref(), v))
    }

    /// `name` as a float; integers are widened.
    pub fn float(&self, name: &str) -> Result<f64, ComputeError> {
        match self.require(name)? {
            ParameterValue::Float(v) => Ok(*v),
            ParameterValue::Integer(v) => Ok(*v as f64),
            other => Err(mismatch(name, "float", other)),
        }
    }

    /// `name` as an integer.
    pub fn integer(&self, name: &str) -> Result<i64, ComputeError> {
        match self.require(name)? {
            ParameterValue::Integer(v) => Ok(*v),
            other => Err(mismatch(name, "integer", other)),
        }
    }

    /// `name` as a flag.
    pub fn flag(&self, name: &str) -> Result<bool, ComputeError> {
        match self.require(name)? {
            ParameterValue::Bool(v) => Ok(*v),
            other => Err(mismatch(name, "bool", other)),
        }
    }

    fn require(&self, name: &str) -> Result<&ParameterValue, ComputeError> {
        self.get(name).ok_or_else(|| ComputeError::Parameter {
            name: name.to_string(),
            reason: "missing".to_string(),
        })
    }
}

fn mismatch(name: &str, wanted: &str, found: &ParameterValue) -> ComputeError {
    ComputeError::Parameter {
        name: name.to_string(),
        reason: format!("expected {wanted}, found {}", found.type_name()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_in_place() {
        let mut p = Parameters::new().with("distance", 5.0).with("sides", 4_i64);
        assert_eq!(p.set("distance", 7.5), Some(ParameterValue::Float(5.0)));
        assert_eq!(p.set("label", "base"), None);
        let names: Vec<_> = p.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["distance", "sides", "label"]);
        assert_eq!(p.float("distance"), Ok(7.5));
        assert_eq!(p.float("sides"), Ok(4.0));
        assert_eq!(p.integer("sides"), Ok(4));
    }

    #[test]
    fn typed_access_reports_problems() {
        let p = Parameters::new().with("flag", true);
        assert_eq!(p.flag("flag"), Ok(true));
        assert!(matches!(
            p.float("flag"),
            Err(ComputeError::Parameter { ref reason, .. })
                if reason == "expected float, found bool"
        ));
        assert!(matches!(
            p.integer("nope"),
            Err(ComputeError::Parameter { ref reason, .. }) if reason == "missing"
        ));
    }
}
