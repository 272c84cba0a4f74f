// Copyright 2025 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Colors.

use std::fmt;
use std::sync::LazyLock;

use serde_json::Value as Json;

use crate::either::Either;
use crate::enums::{Enum, NAMED_COLOR};
use crate::error::{DeserializationError, ValidationError};
use crate::container::Tuple;
use crate::primitive::{Byte, Percent, Regex};
use crate::property::{Property, PropertyKind};
use crate::value::{ModelIndex, Value};

/// An RGB color with alpha in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rgb {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha.
    pub a: f64,
}

impl Rgb {
    /// An opaque color.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Replaces the alpha.
    #[must_use]
    pub const fn with_alpha(self, a: f64) -> Self {
        Self { a, ..self }
    }

    /// The CSS form: `rgb(r, g, b)` when opaque, `rgba(r, g, b, a)` otherwise.
    #[must_use]
    pub fn to_css(&self) -> String {
        if self.a == 1.0 {
            format!("rgb({}, {}, {})", self.r, self.g, self.b)
        } else {
            format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
        }
    }

    /// Reads a 3- or 4-item numeric sequence.
    ///
    /// Components must already be valid bytes; the alpha must be a number.
    #[must_use]
    pub fn from_items(items: &[Value]) -> Option<Self> {
        let byte = |v: &Value| v.as_i64().and_then(|i| u8::try_from(i).ok());
        match items {
            [r, g, b] => Some(Self::new(byte(r)?, byte(g)?, byte(b)?)),
            [r, g, b, a] => Some(Self::new(byte(r)?, byte(g)?, byte(b)?).with_alpha(a.as_f64()?)),
            _ => None,
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css())
    }
}

impl From<Rgb> for Value {
    fn from(rgb: Rgb) -> Self {
        if rgb.a == 1.0 {
            Self::from((rgb.r, rgb.g, rgb.b))
        } else {
            Self::from((rgb.r, rgb.g, rgb.b, rgb.a))
        }
    }
}

fn regex(pattern: &str) -> Property {
    let kind = Regex::new(pattern).unwrap_or_else(|err| panic!("invalid color pattern: {err}"));
    Property::new(kind)
}

static HEX: LazyLock<[Property; 4]> = LazyLock::new(|| {
    [
        regex(r"^#[0-9a-fA-F]{3}$"),
        regex(r"^#[0-9a-fA-F]{4}$"),
        regex(r"^#[0-9a-fA-F]{6}$"),
        regex(r"^#[0-9a-fA-F]{8}$"),
    ]
});

static CSS_RGB: LazyLock<Property> = LazyLock::new(|| {
    regex(r"^rgba?\(\s*\d{1,3}\s*,\s*\d{1,3}\s*,\s*\d{1,3}\s*(,\s*(\d+(\.\d*)?|\.\d+)\s*)?\)$")
});

static COLOR: LazyLock<Either> = LazyLock::new(|| {
    let bytes = || [Property::new(Byte), Property::new(Byte), Property::new(Byte)];
    let [rgb_a, rgb_b, rgb_c] = bytes();
    Either::new([Property::new(Enum::new(NAMED_COLOR.clone()))])
        .or(HEX[0].clone())
        .or(HEX[1].clone())
        .or(HEX[2].clone())
        .or(HEX[3].clone())
        .or(CSS_RGB.clone())
        .or(Tuple::new(bytes()))
        .or(Tuple::new([rgb_a, rgb_b, rgb_c, Property::new(Percent)]))
});

/// Returns `true` for a named color or a `#RRGGBB` hex color.
///
/// Other hex forms are valid colors but not literals, so data specs treat
/// them as field names.
#[must_use]
pub fn is_color_literal(text: &str) -> bool {
    NAMED_COLOR.contains(text) || HEX[2].is_valid(&Value::from(text))
}

/// Returns `true` for a CSS `rgb(...)` or `rgba(...)` string.
#[must_use]
pub fn is_css_rgb(text: &str) -> bool {
    CSS_RGB.is_valid(&Value::from(text))
}

/// A color: a CSS color name, a hex string, an `rgb()`/`rgba()` string, or
/// a tuple of three bytes with an optional alpha in `[0, 1]`.
///
/// Tuples are transformed into their CSS string.
#[derive(Clone, Copy, Debug, Default)]
pub struct Color;

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Color")
    }
}

impl PropertyKind for Color {
    fn validate(&self, value: &Value, detail: bool) -> Result<(), ValidationError> {
        if value.is_null() {
            return Err(ValidationError::detailed(detail, || {
                "expected a color, got null".to_owned()
            }));
        }
        COLOR.validate(value, detail)
    }

    fn transform(&self, value: Value) -> Value {
        match value.as_items().and_then(Rgb::from_items) {
            Some(rgb) => Value::String(rgb.to_css()),
            None => value,
        }
    }

    fn from_json(&self, json: &Json, models: Option<&ModelIndex>) -> Result<Value, DeserializationError> {
        COLOR.from_json(json, models)
    }

    fn type_params(&self) -> &[Property] {
        COLOR.type_params()
    }
}
