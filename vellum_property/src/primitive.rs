// Copyright 2025 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Leaf property kinds.
//!
//! Every kind in this module accepts [`Value::Null`] as the absence of a
//! value. Use [`NonNullable`](crate::NonNullable) to forbid it.

use std::fmt;
use std::sync::LazyLock;

use serde_json::Value as Json;

use crate::error::{DeserializationError, ValidationError};
use crate::property::{Property, PropertyKind};
use crate::value::{ModelIndex, Value};

pub(crate) fn type_mismatch(
    expected: &dyn fmt::Display,
    value: &Value,
    detail: bool,
) -> ValidationError {
    ValidationError::detailed(detail, || {
        format!(
            "expected a value of type {expected}, got {value} of type {}",
            value.type_name()
        )
    })
}

pub(crate) fn json_mismatch(
    kind: &dyn fmt::Display,
    expected: &str,
    json: &Json,
) -> DeserializationError {
    DeserializationError::new(format!("{kind} expected {expected}, got {json}"))
}

fn json_number(kind: &dyn fmt::Display, json: &Json) -> Result<Value, DeserializationError> {
    match json {
        Json::Null | Json::Number(_) => Ok(Value::from(json)),
        _ => Err(json_mismatch(kind, "a number", json)),
    }
}

fn json_string(kind: &dyn fmt::Display, json: &Json) -> Result<Value, DeserializationError> {
    match json {
        Json::Null | Json::String(_) => Ok(Value::from(json)),
        _ => Err(json_mismatch(kind, "a string", json)),
    }
}

macro_rules! display_name {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str($name)
                }
            }
        )*
    };
}

display_name! {
    Bool => "Bool",
    Int => "Int",
    Float => "Float",
    Str => "String",
    Size => "Size",
    Percent => "Percent",
    Angle => "Angle",
    Byte => "Byte",
    Any => "Any",
    JsonText => "JSON",
    FontSize => "FontSize",
}

/// A boolean. Integers are not accepted.
#[derive(Clone, Copy, Debug, Default)]
pub struct Bool;

impl PropertyKind for Bool {
    fn validate(&self, value: &Value, detail: bool) -> Result<(), ValidationError> {
        match value {
            Value::Null | Value::Bool(_) => Ok(()),
            _ => Err(type_mismatch(self, value, detail)),
        }
    }

    fn from_json(&self, json: &Json, _models: Option<&ModelIndex>) -> Result<Value, DeserializationError> {
        match json {
            Json::Null | Json::Bool(_) => Ok(Value::from(json)),
            _ => Err(json_mismatch(self, "a boolean", json)),
        }
    }

    fn intrinsic_default(&self) -> Option<Value> {
        Some(Value::Bool(false))
    }
}

/// A signed integer. Booleans are not accepted.
#[derive(Clone, Copy, Debug, Default)]
pub struct Int;

impl PropertyKind for Int {
    fn validate(&self, value: &Value, detail: bool) -> Result<(), ValidationError> {
        match value {
            Value::Null | Value::Int(_) => Ok(()),
            _ => Err(type_mismatch(self, value, detail)),
        }
    }

    fn from_json(&self, json: &Json, _models: Option<&ModelIndex>) -> Result<Value, DeserializationError> {
        match json {
            Json::Null => Ok(Value::Null),
            Json::Number(n) if n.is_i64() => Ok(Value::from(json)),
            _ => Err(json_mismatch(self, "an integer", json)),
        }
    }

    fn intrinsic_default(&self) -> Option<Value> {
        Some(Value::Int(0))
    }
}

/// A number; integers are accepted as-is.
#[derive(Clone, Copy, Debug, Default)]
pub struct Float;

impl PropertyKind for Float {
    fn validate(&self, value: &Value, detail: bool) -> Result<(), ValidationError> {
        match value {
            Value::Null | Value::Int(_) | Value::Float(_) => Ok(()),
            _ => Err(type_mismatch(self, value, detail)),
        }
    }

    fn from_json(&self, json: &Json, _models: Option<&ModelIndex>) -> Result<Value, DeserializationError> {
        json_number(self, json)
    }

    fn intrinsic_default(&self) -> Option<Value> {
        Some(Value::Float(0.0))
    }
}

/// A string.
#[derive(Clone, Copy, Debug, Default)]
pub struct Str;

impl PropertyKind for Str {
    fn validate(&self, value: &Value, detail: bool) -> Result<(), ValidationError> {
        match value {
            Value::Null | Value::String(_) => Ok(()),
            _ => Err(type_mismatch(self, value, detail)),
        }
    }

    fn from_json(&self, json: &Json, _models: Option<&ModelIndex>) -> Result<Value, DeserializationError> {
        json_string(self, json)
    }

    fn intrinsic_default(&self) -> Option<Value> {
        Some(Value::String(String::new()))
    }
}

/// A string matching a regular expression.
#[derive(Clone, Debug)]
pub struct Regex {
    regex: regex::Regex,
}

impl Regex {
    /// Compiles `pattern` into a regex-constrained string kind.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: regex::Regex::new(pattern)?,
        })
    }

    /// Wraps an already compiled expression.
    #[must_use]
    pub fn from_regex(regex: regex::Regex) -> Self {
        Self { regex }
    }

    /// Returns the source pattern.
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    /// Returns `true` if `text` matches.
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl fmt::Display for Regex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Regex({:?})", self.pattern())
    }
}

impl PropertyKind for Regex {
    fn validate(&self, value: &Value, detail: bool) -> Result<(), ValidationError> {
        match value {
            Value::Null => Ok(()),
            Value::String(text) if self.regex.is_match(text) => Ok(()),
            _ => Err(ValidationError::detailed(detail, || {
                format!(
                    "expected a string matching {:?} pattern, got {value}",
                    self.pattern()
                )
            })),
        }
    }

    fn from_json(&self, json: &Json, _models: Option<&ModelIndex>) -> Result<Value, DeserializationError> {
        json_string(self, json)
    }
}

/// A non-negative number.
#[derive(Clone, Copy, Debug, Default)]
pub struct Size;

impl PropertyKind for Size {
    fn validate(&self, value: &Value, detail: bool) -> Result<(), ValidationError> {
        match value.as_f64() {
            _ if value.is_null() => Ok(()),
            Some(x) if x >= 0.0 => Ok(()),
            Some(_) => Err(ValidationError::detailed(detail, || {
                format!("expected a non-negative number, got {value}")
            })),
            None => Err(type_mismatch(self, value, detail)),
        }
    }

    fn from_json(&self, json: &Json, _models: Option<&ModelIndex>) -> Result<Value, DeserializationError> {
        json_number(self, json)
    }

    fn intrinsic_default(&self) -> Option<Value> {
        Some(Value::Float(0.0))
    }
}

/// A number in the closed range `[0, 1]`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Percent;

impl PropertyKind for Percent {
    fn validate(&self, value: &Value, detail: bool) -> Result<(), ValidationError> {
        match value.as_f64() {
            _ if value.is_null() => Ok(()),
            Some(x) if (0.0..=1.0).contains(&x) => Ok(()),
            Some(_) => Err(ValidationError::detailed(detail, || {
                format!("expected a value in range [0, 1], got {value}")
            })),
            None => Err(type_mismatch(self, value, detail)),
        }
    }

    fn from_json(&self, json: &Json, _models: Option<&ModelIndex>) -> Result<Value, DeserializationError> {
        json_number(self, json)
    }

    fn intrinsic_default(&self) -> Option<Value> {
        Some(Value::Float(0.0))
    }
}

/// An angle, as a plain number.
#[derive(Clone, Copy, Debug, Default)]
pub struct Angle;

impl PropertyKind for Angle {
    fn validate(&self, value: &Value, detail: bool) -> Result<(), ValidationError> {
        Float.validate(value, detail).map_err(|_| type_mismatch(self, value, detail))
    }

    fn from_json(&self, json: &Json, _models: Option<&ModelIndex>) -> Result<Value, DeserializationError> {
        json_number(self, json)
    }

    fn intrinsic_default(&self) -> Option<Value> {
        Some(Value::Float(0.0))
    }
}

/// An integer in `0..=255`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Byte;

impl PropertyKind for Byte {
    fn validate(&self, value: &Value, detail: bool) -> Result<(), ValidationError> {
        match value {
            Value::Null => Ok(()),
            Value::Int(i) if (0..=255).contains(i) => Ok(()),
            Value::Int(_) => Err(ValidationError::detailed(detail, || {
                format!("expected a value of type Int in range [0, 255], got {value}")
            })),
            _ => Err(type_mismatch(self, value, detail)),
        }
    }

    fn from_json(&self, json: &Json, models: Option<&ModelIndex>) -> Result<Value, DeserializationError> {
        Int.from_json(json, models)
    }

    fn intrinsic_default(&self) -> Option<Value> {
        Some(Value::Int(0))
    }
}

/// A numeric property restricted to a closed interval.
#[derive(Clone, Debug)]
pub struct Interval {
    inner: Property,
    start: f64,
    end: f64,
}

impl Interval {
    /// Restricts `inner` (typically [`Int`] or [`Float`]) to `[start, end]`.
    #[must_use]
    pub fn new(inner: impl Into<Property>, start: f64, end: f64) -> Self {
        Self {
            inner: inner.into(),
            start,
            end,
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Interval({}, {}, {})", self.inner, self.start, self.end)
    }
}

impl PropertyKind for Interval {
    fn validate(&self, value: &Value, detail: bool) -> Result<(), ValidationError> {
        if value.is_null() {
            return Ok(());
        }
        let in_range = self.inner.is_valid(value)
            && value
                .as_f64()
                .is_some_and(|x| self.start <= x && x <= self.end);
        if in_range {
            Ok(())
        } else {
            Err(ValidationError::detailed(detail, || {
                format!(
                    "expected a value of type {} in range [{}, {}], got {value}",
                    self.inner, self.start, self.end
                )
            }))
        }
    }

    fn from_json(&self, json: &Json, models: Option<&ModelIndex>) -> Result<Value, DeserializationError> {
        self.inner.from_json(json, models)
    }

    fn type_params(&self) -> &[Property] {
        core::slice::from_ref(&self.inner)
    }
}

/// Any value at all.
#[derive(Clone, Copy, Debug, Default)]
pub struct Any;

impl PropertyKind for Any {}

/// A string holding JSON text.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonText;

impl PropertyKind for JsonText {
    fn validate(&self, value: &Value, detail: bool) -> Result<(), ValidationError> {
        match value {
            Value::Null => Ok(()),
            Value::String(text) if serde_json::from_str::<Json>(text).is_ok() => Ok(()),
            _ => Err(ValidationError::detailed(detail, || {
                format!("expected JSON text, got {value}")
            })),
        }
    }

    fn from_json(&self, json: &Json, _models: Option<&ModelIndex>) -> Result<Value, DeserializationError> {
        json_string(self, json)
    }
}

static FONT_SIZE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::RegexBuilder::new(
        r"^[0-9]+(\.[0-9]+)?(%|em|ex|ch|ic|rem|vw|vh|vi|vb|vmin|vmax|cm|mm|q|in|pc|pt|px)$",
    )
    .case_insensitive(true)
    .build()
    .expect("font size pattern is valid")
});

/// Returns `true` if `text` is a CSS length such as `"10pt"` or `"1.5em"`.
#[must_use]
pub fn is_font_size(text: &str) -> bool {
    FONT_SIZE.is_match(text)
}

/// A CSS length string, such as `"13px"` or `"1.5em"`.
#[derive(Clone, Copy, Debug, Default)]
pub struct FontSize;

impl PropertyKind for FontSize {
    fn validate(&self, value: &Value, detail: bool) -> Result<(), ValidationError> {
        match value {
            Value::Null => Ok(()),
            Value::String(text) if is_font_size(text) => Ok(()),
            _ => Err(ValidationError::detailed(detail, || {
                format!("expected a CSS length such as \"10pt\", got {value}")
            })),
        }
    }

    fn from_json(&self, json: &Json, _models: Option<&ModelIndex>) -> Result<Value, DeserializationError> {
        json_string(self, json)
    }
}
