// Copyright 2025 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dynamic property values.
//!
//! This module provides [`Value`], the dynamically typed value that flows
//! through validation, transformation, storage and serialization, together
//! with [`ModelRef`], a by-id reference to another model.

use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use hashbrown::HashMap;
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::Value as Json;

use crate::datetime::{date_ms, datetime_ms, timedelta_ms};

/// An insertion-ordered, string-keyed map of values.
pub type ValueMap = IndexMap<String, Value>;

/// Models known to a deserializer, keyed by id.
///
/// Used by [`Instance`](crate::Instance) to resolve `{"id": ...}` references.
pub type ModelIndex = HashMap<Arc<str>, ModelRef>;

/// A reference to a model instance.
///
/// References carry the model id and the class lineage of the referenced
/// model (most derived first), which is enough to type-check them against
/// [`Instance`](crate::Instance) properties. Two references are equal when
/// their ids are equal.
#[derive(Clone)]
pub struct ModelRef {
    id: Arc<str>,
    lineage: Arc<[Arc<str>]>,
}

impl ModelRef {
    /// Creates a reference to the model `id` whose class lineage is `lineage`.
    ///
    /// The first lineage entry is the concrete class name, followed by its
    /// bases.
    #[must_use]
    pub fn new<I, S>(id: impl Into<Arc<str>>, lineage: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        Self {
            id: id.into(),
            lineage: lineage.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the id of the referenced model.
    #[must_use]
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the concrete class name of the referenced model.
    #[must_use]
    #[inline]
    pub fn type_name(&self) -> &str {
        self.lineage.first().map_or("", |name| name)
    }

    /// Returns the class lineage, most derived first.
    #[must_use]
    #[inline]
    pub fn lineage(&self) -> &[Arc<str>] {
        &self.lineage
    }

    /// Returns `true` if the referenced model is an instance of `type_name`
    /// or of one of its subclasses.
    #[must_use]
    pub fn is_instance_of(&self, type_name: &str) -> bool {
        self.lineage.iter().any(|name| &**name == type_name)
    }
}

impl PartialEq for ModelRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ModelRef {}

impl core::hash::Hash for ModelRef {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRef")
            .field("id", &self.id)
            .field("type", &self.type_name())
            .finish()
    }
}

impl fmt::Display for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(id={:?})", self.type_name(), self.id)
    }
}

/// A dynamically typed property value.
///
/// `Int` and `Float` compare numerically with each other; every other
/// variant only compares equal to the same variant. Change detection uses
/// [`Value::matches`], which additionally compares numeric arrays
/// element-wise and dicts key-by-key.
#[derive(Clone, Debug, Default)]
pub enum Value {
    /// Absence of a value.
    #[default]
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A floating point number.
    Float(f64),
    /// A string.
    String(String),
    /// A fixed-length heterogeneous sequence.
    Tuple(Vec<Value>),
    /// A variable-length sequence.
    List(Vec<Value>),
    /// An insertion-ordered string-keyed map.
    Dict(ValueMap),
    /// A numeric buffer.
    Array(Vec<f64>),
    /// A calendar date.
    Date(NaiveDate),
    /// A date and time without time zone (interpreted as UTC on the wire).
    Datetime(NaiveDateTime),
    /// A signed duration.
    TimeDelta(TimeDelta),
    /// A reference to another model.
    Model(ModelRef),
}

impl Value {
    /// Builds a [`Value::List`] from an iterator of convertible items.
    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Self>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// Builds a [`Value::Tuple`] from an iterator of convertible items.
    pub fn tuple<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Self>,
    {
        Self::Tuple(items.into_iter().map(Into::into).collect())
    }

    /// Builds a [`Value::Dict`] from key/value pairs, preserving their order.
    pub fn dict<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Self>,
    {
        Self::Dict(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Builds a [`Value::Array`] numeric buffer.
    pub fn array(values: impl IntoIterator<Item = f64>) -> Self {
        Self::Array(values.into_iter().collect())
    }

    /// Returns a short name for the variant, used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "str",
            Self::Tuple(_) => "tuple",
            Self::List(_) => "list",
            Self::Dict(_) => "dict",
            Self::Array(_) => "array",
            Self::Date(_) => "date",
            Self::Datetime(_) => "datetime",
            Self::TimeDelta(_) => "timedelta",
            Self::Model(model) => model.type_name(),
        }
    }

    /// Returns `true` for [`Value::Null`].
    #[must_use]
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns `true` for `Int` and `Float` values. Booleans are not numbers.
    #[must_use]
    #[inline]
    pub fn is_number(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    /// Returns the boolean, if this is a `Bool`.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer, if this is an `Int`.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the number as `f64`, if this is an `Int` or a `Float`.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the string slice, if this is a `String`.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the items of a `List` or `Tuple`.
    #[must_use]
    pub fn as_items(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) | Self::Tuple(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the map, if this is a `Dict`.
    #[must_use]
    pub fn as_dict(&self) -> Option<&ValueMap> {
        match self {
            Self::Dict(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the referenced model, if this is a `Model`.
    #[must_use]
    pub fn as_model(&self) -> Option<&ModelRef> {
        match self {
            Self::Model(model) => Some(model),
            _ => None,
        }
    }

    /// Structural comparison used for change suppression.
    ///
    /// Dicts match when they have the same key set and every value matches.
    /// Lists and tuples match item by item. Numeric arrays are compared
    /// element-wise, so an array holding `NaN` never matches and is always
    /// reported as changed. Everything else uses `==`.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Dict(a), Self::Dict(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(key, value)| b.get(key).is_some_and(|other| value.matches(other)))
            }
            (Self::List(a), Self::List(b)) | (Self::Tuple(a), Self::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.matches(y))
            }
            (Self::Array(a), Self::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x == y)
            }
            _ => self == other,
        }
    }

    /// Converts to the JSON wire representation.
    ///
    /// Dates, datetimes and durations become milliseconds (since the epoch
    /// for the first two), model references become `{"id": ...}`, and
    /// non-finite floats become `null`.
    #[must_use]
    pub fn to_json(&self) -> Json {
        match self {
            Self::Null => Json::Null,
            Self::Bool(b) => Json::Bool(*b),
            Self::Int(i) => Json::from(*i),
            Self::Float(f) => float_json(*f),
            Self::String(s) => Json::String(s.clone()),
            Self::Tuple(items) | Self::List(items) => {
                Json::Array(items.iter().map(Self::to_json).collect())
            }
            Self::Dict(map) => Json::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
            Self::Array(values) => Json::Array(values.iter().copied().map(float_json).collect()),
            Self::Date(date) => float_json(date_ms(date)),
            Self::Datetime(datetime) => float_json(datetime_ms(datetime)),
            Self::TimeDelta(delta) => float_json(timedelta_ms(delta)),
            Self::Model(model) => serde_json::json!({ "id": model.id() }),
        }
    }
}

fn float_json(f: f64) -> Json {
    serde_json::Number::from_f64(f).map_or(Json::Null, Json::Number)
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Int(a), Self::Float(b)) | (Self::Float(b), Self::Int(a)) => *a as f64 == *b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Tuple(a), Self::Tuple(b)) | (Self::List(a), Self::List(b)) => a == b,
            (Self::Dict(a), Self::Dict(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            (Self::Datetime(a), Self::Datetime(b)) => a == b,
            (Self::TimeDelta(a), Self::TimeDelta(b)) => a == b,
            (Self::Model(a), Self::Model(b)) => a == b,
            _ => false,
        }
    }
}

fn write_items(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x:?}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Tuple(items) => {
                f.write_str("(")?;
                write_items(f, items)?;
                f.write_str(")")
            }
            Self::List(items) => {
                f.write_str("[")?;
                write_items(f, items)?;
                f.write_str("]")
            }
            Self::Dict(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key:?}: {value}")?;
                }
                f.write_str("}")
            }
            Self::Array(values) => write!(f, "array({values:?})"),
            Self::Date(date) => write!(f, "{date}"),
            Self::Datetime(datetime) => write!(f, "{datetime}"),
            Self::TimeDelta(delta) => write!(f, "timedelta({delta})"),
            Self::Model(model) => write!(f, "{model}"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<&Json> for Value {
    fn from(json: &Json) -> Self {
        match json {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Self::String(s.clone()),
            Json::Array(items) => Self::List(items.iter().map(Self::from).collect()),
            Json::Object(map) => Self::Dict(
                map.iter()
                    .map(|(key, value)| (key.clone(), Self::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<Json> for Value {
    fn from(json: Json) -> Self {
        Self::from(&json)
    }
}

macro_rules! impl_from {
    ($($ty:ty => |$v:ident| $body:expr),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                #[inline]
                fn from($v: $ty) -> Self {
                    $body
                }
            }
        )*
    };
}

impl_from! {
    bool => |v| Self::Bool(v),
    i32 => |v| Self::Int(i64::from(v)),
    i64 => |v| Self::Int(v),
    u8 => |v| Self::Int(i64::from(v)),
    u32 => |v| Self::Int(i64::from(v)),
    f32 => |v| Self::Float(f64::from(v)),
    f64 => |v| Self::Float(v),
    &str => |v| Self::String(v.to_owned()),
    String => |v| Self::String(v),
    ValueMap => |v| Self::Dict(v),
    Vec<Value> => |v| Self::List(v),
    NaiveDate => |v| Self::Date(v),
    NaiveDateTime => |v| Self::Datetime(v),
    TimeDelta => |v| Self::TimeDelta(v),
    ModelRef => |v| Self::Model(v),
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl<A: Into<Self>, B: Into<Self>> From<(A, B)> for Value {
    fn from((a, b): (A, B)) -> Self {
        Self::Tuple(vec![a.into(), b.into()])
    }
}

impl<A: Into<Self>, B: Into<Self>, C: Into<Self>> From<(A, B, C)> for Value {
    fn from((a, b, c): (A, B, C)) -> Self {
        Self::Tuple(vec![a.into(), b.into(), c.into()])
    }
}

impl<A: Into<Self>, B: Into<Self>, C: Into<Self>, D: Into<Self>> From<(A, B, C, D)> for Value {
    fn from((a, b, c, d): (A, B, C, D)) -> Self {
        Self::Tuple(vec![a.into(), b.into(), c.into(), d.into()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_compare_across_int_and_float() {
        assert_eq!(Value::Int(10), Value::Float(10.0));
        assert_eq!(Value::Float(10.0), Value::Int(10));
        assert_ne!(Value::Int(10), Value::Bool(true));
        assert_ne!(Value::list([1, 2]), Value::tuple([1, 2]));
    }

    #[test]
    fn dicts_match_by_key_set() {
        let a = Value::dict([("value", 1), ("units", 2)]);
        let b = Value::dict([("units", 2), ("value", 1)]);
        assert!(a.matches(&b));

        let c = Value::dict([("value", 1)]);
        assert!(!a.matches(&c));
    }

    #[test]
    fn arrays_compare_element_wise() {
        let a = Value::array([1.0, 2.0, 3.0]);
        assert!(a.matches(&Value::array([1.0, 2.0, 3.0])));
        assert!(!a.matches(&Value::array([1.0, 2.0])));
        assert!(!Value::array([f64::NAN]).matches(&Value::array([f64::NAN])));
    }

    #[test]
    fn model_refs_compare_by_id() {
        let a = ModelRef::new("p1", ["Jitter", "Transform"]);
        let b = ModelRef::new("p1", ["Other"]);
        assert_eq!(a, b);
        assert!(a.is_instance_of("Transform"));
        assert!(!a.is_instance_of("Expression"));
        assert_eq!(a.type_name(), "Jitter");
    }

    #[test]
    fn json_conversion() {
        let value = Value::dict([
            ("a", Value::from(1)),
            ("b", Value::from(2.5)),
            ("c", Value::list(["x", "y"])),
            ("d", Value::Null),
        ]);
        let json = value.to_json();
        assert_eq!(
            json,
            serde_json::json!({"a": 1, "b": 2.5, "c": ["x", "y"], "d": null})
        );
        assert_eq!(Value::from(&json), value);
    }

    #[test]
    fn temporal_values_serialize_as_milliseconds() {
        let date = NaiveDate::from_ymd_opt(2016, 5, 11).unwrap();
        assert_eq!(Value::Date(date).to_json(), serde_json::json!(1_462_924_800_000.0));

        let delta = TimeDelta::days(3) + TimeDelta::seconds(54);
        assert_eq!(Value::TimeDelta(delta).to_json(), serde_json::json!(259_254_000.0));
    }

    #[test]
    fn model_refs_serialize_as_id() {
        let model = ModelRef::new("p1042", ["Jitter"]);
        assert_eq!(Value::from(model).to_json(), serde_json::json!({"id": "p1042"}));
    }

    #[test]
    fn display_is_readable() {
        assert_eq!(Value::from("junk").to_string(), "\"junk\"");
        assert_eq!(Value::from((1, 2.5)).to_string(), "(1, 2.5)");
        assert_eq!(Value::list([1, 2]).to_string(), "[1, 2]");
        assert_eq!(Value::dict([("k", true)]).to_string(), "{\"k\": true}");
    }
}
