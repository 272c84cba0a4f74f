// Copyright 2025 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Container property kinds.
//!
//! Containers never accept [`Value::Null`]; wrap them in
//! [`Nullable`](crate::Nullable) for that. Their intrinsic defaults are empty
//! containers, and every property built from one has an unstable default so
//! instances never share storage.

use std::fmt;

use serde_json::Value as Json;
use smallvec::SmallVec;

use crate::error::{DeserializationError, ValidationError};
use crate::primitive::{Any, Str, json_mismatch};
use crate::property::{Property, PropertyKind};
use crate::value::{ModelIndex, Value, ValueMap};

fn not_an_element(kind: &dyn fmt::Display, value: &Value, detail: bool) -> ValidationError {
    ValidationError::detailed(detail, || format!("expected an element of {kind}, got {value}"))
}

fn invalid_items<'a>(
    kind: &dyn fmt::Display,
    item: &Property,
    items: impl IntoIterator<Item = &'a Value>,
    detail: bool,
) -> Result<(), ValidationError> {
    let mut invalid = items.into_iter().filter(|v| !item.is_valid(v)).peekable();
    if invalid.peek().is_none() {
        return Ok(());
    }
    Err(ValidationError::detailed(detail, || {
        let listed: Vec<String> = invalid.map(ToString::to_string).collect();
        format!(
            "expected an element of {kind}, got seq with invalid items [{}]",
            listed.join(", ")
        )
    }))
}

fn items_from_json(
    item: &Property,
    items: &[Json],
    models: Option<&ModelIndex>,
) -> Result<Vec<Value>, DeserializationError> {
    items.iter().map(|json| item.from_json(json, models)).collect()
}

/// A variable-length list whose items all satisfy one property.
#[derive(Clone, Debug)]
pub struct List {
    item: Property,
}

impl List {
    /// Creates a list of `item`.
    #[must_use]
    pub fn new(item: impl Into<Property>) -> Self {
        Self { item: item.into() }
    }

    /// The item property.
    #[must_use]
    pub fn item(&self) -> &Property {
        &self.item
    }
}

impl fmt::Display for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "List({})", self.item)
    }
}

impl PropertyKind for List {
    fn validate(&self, value: &Value, detail: bool) -> Result<(), ValidationError> {
        match value {
            Value::List(items) => invalid_items(self, &self.item, items, detail),
            _ => Err(not_an_element(self, value, detail)),
        }
    }

    fn transform(&self, value: Value) -> Value {
        match value {
            Value::List(items) => {
                Value::List(items.into_iter().map(|v| self.item.transform(v)).collect())
            }
            other => other,
        }
    }

    fn from_json(&self, json: &Json, models: Option<&ModelIndex>) -> Result<Value, DeserializationError> {
        match json {
            Json::Array(items) => items_from_json(&self.item, items, models).map(Value::List),
            _ => Err(json_mismatch(self, "a list", json)),
        }
    }

    fn serialize_value(&self, value: &Value) -> Json {
        match value {
            Value::List(items) => {
                Json::Array(items.iter().map(|v| self.item.serialize_value(v)).collect())
            }
            other => other.to_json(),
        }
    }

    fn type_params(&self) -> &[Property] {
        core::slice::from_ref(&self.item)
    }

    fn is_container(&self) -> bool {
        true
    }

    fn intrinsic_default(&self) -> Option<Value> {
        Some(Value::List(Vec::new()))
    }
}

/// Any sequence: a list, a tuple, or a numeric array.
#[derive(Clone, Debug)]
pub struct Seq {
    item: Property,
}

impl Seq {
    /// Creates a sequence of `item`.
    #[must_use]
    pub fn new(item: impl Into<Property>) -> Self {
        Self { item: item.into() }
    }
}

impl fmt::Display for Seq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Seq({})", self.item)
    }
}

impl PropertyKind for Seq {
    fn validate(&self, value: &Value, detail: bool) -> Result<(), ValidationError> {
        match value {
            Value::List(items) | Value::Tuple(items) => {
                invalid_items(self, &self.item, items, detail)
            }
            Value::Array(values) => {
                let values: Vec<Value> = values.iter().copied().map(Value::Float).collect();
                invalid_items(self, &self.item, &values, detail)
            }
            _ => Err(not_an_element(self, value, detail)),
        }
    }

    fn transform(&self, value: Value) -> Value {
        match value {
            Value::List(items) => {
                Value::List(items.into_iter().map(|v| self.item.transform(v)).collect())
            }
            Value::Tuple(items) => {
                Value::Tuple(items.into_iter().map(|v| self.item.transform(v)).collect())
            }
            other => other,
        }
    }

    fn from_json(&self, json: &Json, models: Option<&ModelIndex>) -> Result<Value, DeserializationError> {
        match json {
            Json::Array(items) => items_from_json(&self.item, items, models).map(Value::List),
            _ => Err(json_mismatch(self, "a sequence", json)),
        }
    }

    fn type_params(&self) -> &[Property] {
        core::slice::from_ref(&self.item)
    }

    fn is_container(&self) -> bool {
        true
    }

    fn intrinsic_default(&self) -> Option<Value> {
        Some(Value::List(Vec::new()))
    }
}

/// A numeric buffer.
///
/// Lists of valid numbers are accepted and stored as [`Value::Array`].
#[derive(Clone, Debug)]
pub struct Array {
    item: Property,
}

impl Array {
    /// Creates a numeric array whose elements satisfy `item`.
    #[must_use]
    pub fn new(item: impl Into<Property>) -> Self {
        Self { item: item.into() }
    }

    fn numbers(items: &[Value]) -> Option<Vec<f64>> {
        items.iter().map(Value::as_f64).collect()
    }
}

impl fmt::Display for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Array({})", self.item)
    }
}

impl PropertyKind for Array {
    fn validate(&self, value: &Value, detail: bool) -> Result<(), ValidationError> {
        match value {
            Value::Array(values) => {
                let values: Vec<Value> = values.iter().copied().map(Value::Float).collect();
                invalid_items(self, &self.item, &values, detail)
            }
            Value::List(items) if Self::numbers(items).is_some() => {
                invalid_items(self, &self.item, items, detail)
            }
            _ => Err(not_an_element(self, value, detail)),
        }
    }

    fn transform(&self, value: Value) -> Value {
        match value {
            Value::List(items) => match Self::numbers(&items) {
                Some(values) => Value::Array(values),
                None => Value::List(items),
            },
            other => other,
        }
    }

    fn from_json(&self, json: &Json, _models: Option<&ModelIndex>) -> Result<Value, DeserializationError> {
        let values = json
            .as_array()
            .and_then(|items| items.iter().map(Json::as_f64).collect::<Option<Vec<f64>>>());
        values
            .map(Value::Array)
            .ok_or_else(|| json_mismatch(self, "a list of numbers", json))
    }

    fn type_params(&self) -> &[Property] {
        core::slice::from_ref(&self.item)
    }

    fn is_container(&self) -> bool {
        true
    }

    fn intrinsic_default(&self) -> Option<Value> {
        Some(Value::Array(Vec::new()))
    }
}

/// A fixed-length sequence with one property per position.
///
/// Both tuples and lists of the right length are accepted; transformed
/// values are always tuples.
#[derive(Clone, Debug)]
pub struct Tuple {
    params: SmallVec<[Property; 4]>,
}

impl Tuple {
    /// Creates a tuple with one position per property.
    ///
    /// # Panics
    ///
    /// Panics if `params` is empty.
    #[must_use]
    pub fn new(params: impl IntoIterator<Item = Property>) -> Self {
        let params: SmallVec<[Property; 4]> = params.into_iter().collect();
        assert!(!params.is_empty(), "Tuple needs at least one type parameter");
        Self { params }
    }

    fn positions_valid(&self, items: &[Value]) -> bool {
        items.len() == self.params.len()
            && self.params.iter().zip(items).all(|(param, v)| param.is_valid(v))
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Tuple(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{param}")?;
        }
        f.write_str(")")
    }
}

impl PropertyKind for Tuple {
    fn validate(&self, value: &Value, detail: bool) -> Result<(), ValidationError> {
        match value {
            Value::Tuple(items) | Value::List(items) if self.positions_valid(items) => Ok(()),
            _ => Err(not_an_element(self, value, detail)),
        }
    }

    fn transform(&self, value: Value) -> Value {
        match value {
            Value::Tuple(items) | Value::List(items) if items.len() == self.params.len() => {
                Value::Tuple(
                    self.params
                        .iter()
                        .zip(items)
                        .map(|(param, v)| param.transform(v))
                        .collect(),
                )
            }
            other => other,
        }
    }

    fn from_json(&self, json: &Json, models: Option<&ModelIndex>) -> Result<Value, DeserializationError> {
        match json {
            Json::Array(items) if items.len() == self.params.len() => self
                .params
                .iter()
                .zip(items)
                .map(|(param, json)| param.from_json(json, models))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Tuple),
            _ => Err(json_mismatch(
                self,
                &format!("a list of length {}", self.params.len()),
                json,
            )),
        }
    }

    fn serialize_value(&self, value: &Value) -> Json {
        match value {
            Value::Tuple(items) if items.len() == self.params.len() => Json::Array(
                self.params
                    .iter()
                    .zip(items)
                    .map(|(param, v)| param.serialize_value(v))
                    .collect(),
            ),
            other => other.to_json(),
        }
    }

    fn type_params(&self) -> &[Property] {
        &self.params
    }

    fn is_container(&self) -> bool {
        true
    }

    fn intrinsic_default(&self) -> Option<Value> {
        self.params
            .iter()
            .map(Property::raw_default)
            .collect::<Option<Vec<_>>>()
            .map(Value::Tuple)
    }
}

/// A string-keyed map with typed keys and values.
#[derive(Clone, Debug)]
pub struct Dict {
    // [keys, values]
    params: [Property; 2],
}

impl Dict {
    /// Creates a map whose keys satisfy `keys` and values satisfy `values`.
    #[must_use]
    pub fn new(keys: impl Into<Property>, values: impl Into<Property>) -> Self {
        Self {
            params: [keys.into(), values.into()],
        }
    }

    /// The key property.
    #[must_use]
    pub fn keys(&self) -> &Property {
        &self.params[0]
    }

    /// The value property.
    #[must_use]
    pub fn values(&self) -> &Property {
        &self.params[1]
    }

    fn entries_valid(&self, map: &ValueMap) -> bool {
        map.iter().all(|(key, value)| {
            self.keys().is_valid(&Value::String(key.clone())) && self.values().is_valid(value)
        })
    }

    fn validate_as(&self, kind: &dyn fmt::Display, value: &Value, detail: bool) -> Result<(), ValidationError> {
        match value {
            Value::Dict(map) if self.entries_valid(map) => Ok(()),
            _ => Err(not_an_element(kind, value, detail)),
        }
    }

    fn transform_entries(&self, value: Value) -> Value {
        match value {
            Value::Dict(map) => Value::Dict(
                map.into_iter()
                    .map(|(key, v)| (key, self.values().transform(v)))
                    .collect(),
            ),
            other => other,
        }
    }

    fn entries_from_json(
        &self,
        kind: &dyn fmt::Display,
        json: &Json,
        models: Option<&ModelIndex>,
    ) -> Result<Value, DeserializationError> {
        let Json::Object(map) = json else {
            return Err(json_mismatch(kind, "an object", json));
        };
        map.iter()
            .map(|(key, json)| {
                let value = self.values().from_json(json, models)?;
                Ok::<_, DeserializationError>((key.clone(), value))
            })
            .collect::<Result<ValueMap, _>>()
            .map(Value::Dict)
    }

    fn serialize_entries(&self, value: &Value) -> Json {
        match value {
            Value::Dict(map) => Json::Object(
                map.iter()
                    .map(|(key, v)| (key.clone(), self.values().serialize_value(v)))
                    .collect(),
            ),
            other => other.to_json(),
        }
    }
}

impl fmt::Display for Dict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dict({}, {})", self.keys(), self.values())
    }
}

impl PropertyKind for Dict {
    fn validate(&self, value: &Value, detail: bool) -> Result<(), ValidationError> {
        self.validate_as(self, value, detail)
    }

    fn transform(&self, value: Value) -> Value {
        self.transform_entries(value)
    }

    fn from_json(&self, json: &Json, models: Option<&ModelIndex>) -> Result<Value, DeserializationError> {
        self.entries_from_json(self, json, models)
    }

    fn serialize_value(&self, value: &Value) -> Json {
        self.serialize_entries(value)
    }

    fn type_params(&self) -> &[Property] {
        &self.params
    }

    fn is_container(&self) -> bool {
        true
    }

    fn intrinsic_default(&self) -> Option<Value> {
        Some(Value::Dict(ValueMap::new()))
    }
}

/// Columnar data: a map from column name to a sequence of values.
///
/// Properties of this kind get columnar mutation support (stream, patch)
/// on model instances.
#[derive(Clone, Debug)]
pub struct ColumnData {
    dict: Dict,
}

impl ColumnData {
    /// Creates column data with typed column names and columns.
    #[must_use]
    pub fn new(keys: impl Into<Property>, columns: impl Into<Property>) -> Self {
        Self {
            dict: Dict::new(keys, columns),
        }
    }
}

impl Default for ColumnData {
    /// `ColumnData(String, Seq(Any))`.
    fn default() -> Self {
        Self::new(Str, Seq::new(Any))
    }
}

impl fmt::Display for ColumnData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ColumnData({}, {})", self.dict.keys(), self.dict.values())
    }
}

impl PropertyKind for ColumnData {
    fn validate(&self, value: &Value, detail: bool) -> Result<(), ValidationError> {
        self.dict.validate_as(self, value, detail)
    }

    fn transform(&self, value: Value) -> Value {
        self.dict.transform_entries(value)
    }

    fn from_json(&self, json: &Json, models: Option<&ModelIndex>) -> Result<Value, DeserializationError> {
        self.dict.entries_from_json(self, json, models)
    }

    fn serialize_value(&self, value: &Value) -> Json {
        self.dict.serialize_entries(value)
    }

    fn type_params(&self) -> &[Property] {
        self.dict.type_params()
    }

    fn is_container(&self) -> bool {
        true
    }

    fn is_column_data(&self) -> bool {
        true
    }

    fn intrinsic_default(&self) -> Option<Value> {
        Some(Value::Dict(ValueMap::new()))
    }
}
