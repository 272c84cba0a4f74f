// Copyright 2025 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Union and nullability wrappers.

use std::fmt;

use serde_json::Value as Json;
use smallvec::SmallVec;

use crate::error::{DeserializationError, ValidationError};
use crate::property::{Alternative, Property, PropertyKind, nice_join};
use crate::value::{ModelIndex, Value};

/// A value accepted by any one of several properties.
///
/// Parameters are tried in declaration order: the first one that accepts a
/// value transforms and serializes it. Alternatives registered on the
/// parameters are collected onto the union.
///
/// ```rust
/// use vellum_property::{Either, Enum, Float, Property, PropertyKind, Value};
///
/// let size = Either::new([Property::new(Float), Property::new(Enum::auto())]);
/// assert!(size.validate(&Value::from(1.5), true).is_ok());
/// assert!(size.validate(&Value::from("auto"), true).is_ok());
/// assert!(size.validate(&Value::from("big"), true).is_err());
/// ```
#[derive(Clone, Debug)]
pub struct Either {
    params: SmallVec<[Property; 4]>,
}

impl Either {
    /// Creates a union of `params`.
    ///
    /// # Panics
    ///
    /// Panics if `params` is empty.
    #[must_use]
    pub fn new(params: impl IntoIterator<Item = Property>) -> Self {
        let params: SmallVec<[Property; 4]> = params.into_iter().collect();
        assert!(!params.is_empty(), "Either needs at least one type parameter");
        Self { params }
    }

    /// Appends another accepted property.
    #[must_use]
    pub fn or(mut self, param: impl Into<Property>) -> Self {
        self.params.push(param.into());
        self
    }

    fn accepting(&self, value: &Value) -> Option<&Property> {
        self.params.iter().find(|param| param.is_valid(value))
    }
}

impl fmt::Display for Either {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Either(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{param}")?;
        }
        f.write_str(")")
    }
}

impl PropertyKind for Either {
    fn validate(&self, value: &Value, detail: bool) -> Result<(), ValidationError> {
        if self.accepting(value).is_some() {
            return Ok(());
        }
        Err(ValidationError::detailed(detail, || {
            format!(
                "expected an element of either {}, got {value}",
                nice_join(&self.params)
            )
        }))
    }

    fn transform(&self, value: Value) -> Value {
        match self.accepting(&value) {
            Some(param) => param.transform(value),
            None => value,
        }
    }

    fn from_json(&self, json: &Json, models: Option<&ModelIndex>) -> Result<Value, DeserializationError> {
        self.params
            .iter()
            .find_map(|param| param.from_json(json, models).ok())
            .ok_or_else(|| DeserializationError::new(format!("{self} couldn't deserialize {json}")))
    }

    fn serialize_value(&self, value: &Value) -> Json {
        match self.accepting(value) {
            Some(param) => param.serialize_value(value),
            None => value.to_json(),
        }
    }

    fn type_params(&self) -> &[Property] {
        &self.params
    }

    fn intrinsic_default(&self) -> Option<Value> {
        self.params[0].raw_default()
    }

    fn default_alternatives(&self) -> Vec<Alternative> {
        self.params
            .iter()
            .flat_map(|param| param.alternatives().iter().cloned())
            .collect()
    }
}

/// Adds null to the values an inner property accepts.
#[derive(Clone, Debug)]
pub struct Nullable {
    inner: Property,
}

impl Nullable {
    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: impl Into<Property>) -> Self {
        Self {
            inner: inner.into(),
        }
    }
}

impl fmt::Display for Nullable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nullable({})", self.inner)
    }
}

impl PropertyKind for Nullable {
    fn validate(&self, value: &Value, detail: bool) -> Result<(), ValidationError> {
        if value.is_null() {
            return Ok(());
        }
        self.inner.validate(value, detail)
    }

    fn transform(&self, value: Value) -> Value {
        if value.is_null() { value } else { self.inner.transform(value) }
    }

    fn preprocess(&self, value: Value) -> Result<Value, ValidationError> {
        if value.is_null() {
            Ok(value)
        } else {
            self.inner.kind().preprocess(value)
        }
    }

    fn from_json(&self, json: &Json, models: Option<&ModelIndex>) -> Result<Value, DeserializationError> {
        if json.is_null() {
            Ok(Value::Null)
        } else {
            self.inner.from_json(json, models)
        }
    }

    fn serialize_value(&self, value: &Value) -> Json {
        if value.is_null() {
            Json::Null
        } else {
            self.inner.serialize_value(value)
        }
    }

    fn matches(&self, new: &Value, old: &Value) -> bool {
        match (new.is_null(), old.is_null()) {
            (true, true) => true,
            (false, false) => self.inner.matches(new, old),
            _ => false,
        }
    }

    fn type_params(&self) -> &[Property] {
        core::slice::from_ref(&self.inner)
    }

    fn is_container(&self) -> bool {
        self.inner.kind().is_container()
    }

    fn intrinsic_default(&self) -> Option<Value> {
        Some(Value::Null)
    }

    fn default_alternatives(&self) -> Vec<Alternative> {
        self.inner.alternatives().to_vec()
    }
}

/// Forbids null for an inner property that would otherwise accept it.
#[derive(Clone, Debug)]
pub struct NonNullable {
    inner: Property,
}

impl NonNullable {
    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: impl Into<Property>) -> Self {
        Self {
            inner: inner.into(),
        }
    }
}

impl fmt::Display for NonNullable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NonNullable({})", self.inner)
    }
}

impl PropertyKind for NonNullable {
    fn validate(&self, value: &Value, detail: bool) -> Result<(), ValidationError> {
        if value.is_null() {
            return Err(ValidationError::detailed(detail, || {
                "expected a non-null value".to_owned()
            }));
        }
        self.inner.validate(value, detail)
    }

    fn transform(&self, value: Value) -> Value {
        self.inner.transform(value)
    }

    fn preprocess(&self, value: Value) -> Result<Value, ValidationError> {
        self.inner.kind().preprocess(value)
    }

    fn from_json(&self, json: &Json, models: Option<&ModelIndex>) -> Result<Value, DeserializationError> {
        self.inner.from_json(json, models)
    }

    fn serialize_value(&self, value: &Value) -> Json {
        self.inner.serialize_value(value)
    }

    fn matches(&self, new: &Value, old: &Value) -> bool {
        self.inner.matches(new, old)
    }

    fn type_params(&self) -> &[Property] {
        core::slice::from_ref(&self.inner)
    }

    fn is_container(&self) -> bool {
        self.inner.kind().is_container()
    }

    fn intrinsic_default(&self) -> Option<Value> {
        self.inner.raw_default().filter(|value| !value.is_null())
    }

    fn default_alternatives(&self) -> Vec<Alternative> {
        self.inner.alternatives().to_vec()
    }
}
