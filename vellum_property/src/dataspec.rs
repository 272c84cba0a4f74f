// Copyright 2025 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Data specifications: a fixed value, a data column, or an expression.
//!
//! A [`DataSpec`] property accepts three shapes:
//!
//! - a plain value of its value type, such as `10` for a number spec,
//! - a string, naming a data column,
//! - a dict with exactly one of `value`, `field` or `expr`, plus an optional
//!   `transform` (and `units` for unit-bearing specs).
//!
//! On the wire every spec value becomes the dict form. A plain value is
//! checked against the value type first, so a string that is a valid value
//! (a color name, a marker type) is a value rather than a field. The
//! [`field`], [`value`] and [`expr`] helpers build the dict form directly
//! when the intent must be explicit.
//!
//! Unit-bearing specs pair the property with a sibling `<name>_units`
//! property. Serialization reads the sibling through
//! [`PropertyOwner::property_value`] and adds `units` only when it differs
//! from the declared default.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value as Json};

use crate::color::{Color, Rgb, is_color_literal};
use crate::container::{Dict, List};
use crate::datetime::{Datetime, TimeDelta, convert_datetime, convert_timedelta};
use crate::either::{Either, Nullable};
use crate::enums::{ANGLE_UNITS, Enum, Enumeration, MARKER_TYPE, SPATIAL_UNITS};
use crate::error::{DeserializationError, ValidationError};
use crate::instance::instance;
use crate::primitive::{Angle, Float, FontSize, Size, Str, is_font_size};
use crate::property::{Alternative, Property, PropertyKind, PropertyOwner};
use crate::value::{ModelIndex, ModelRef, Value};

/// The name of the sibling property holding the units of `name`.
#[must_use]
pub fn units_name(name: &str) -> String {
    format!("{name}_units")
}

/// Kind-specific checks layered on the common shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Flavor {
    Plain,
    NonNegative,
    StringList,
    FontSize,
    Color,
}

/// The units companion of a unit-bearing spec.
#[derive(Clone, Debug)]
pub struct SpecUnits {
    property: Property,
    default: Arc<str>,
}

impl SpecUnits {
    /// The `<name>_units` property: an enum over the allowed units,
    /// defaulting to the declared units and excluded from serialization.
    #[must_use]
    pub fn property(&self) -> &Property {
        &self.property
    }

    /// The declared default units.
    #[must_use]
    pub fn default_units(&self) -> &str {
        &self.default
    }
}

/// A property accepting a fixed value, a field name, or an expression.
#[derive(Clone, Debug)]
pub struct DataSpec {
    name: &'static str,
    value_type: Property,
    shape: Either,
    flavor: Flavor,
    units: Option<SpecUnits>,
}

impl DataSpec {
    /// A spec over an arbitrary value type.
    #[must_use]
    pub fn new(name: &'static str, value_type: impl Into<Property>) -> Self {
        Self::build(name, value_type.into(), Flavor::Plain, None)
    }

    fn build(name: &'static str, value_type: Property, flavor: Flavor, units: Option<SpecUnits>) -> Self {
        let mut keys = vec!["field", "value", "expr", "transform"];
        if units.is_some() {
            keys.push("units");
        }
        let entry = Either::new([
            Property::new(Str),
            instance("Transform"),
            instance("Expression"),
            value_type.clone(),
        ]);
        let key = Enum::new(Enumeration::named("DataSpecKey", keys));
        let shape = Either::new([
            Property::new(Str),
            Property::new(Dict::new(key, entry)),
            value_type.clone(),
        ]);
        Self {
            name,
            value_type,
            shape,
            flavor,
            units,
        }
    }

    /// Adds a units companion.
    ///
    /// # Panics
    ///
    /// Panics if `default_units` is not one of `units`.
    #[must_use]
    pub fn with_units(self, units: Enumeration, default_units: &str) -> Self {
        assert!(
            units.contains(default_units),
            "default units {default_units:?} are not in {units}"
        );
        let property = Property::new(Enum::new(units))
            .with_checked_default(Value::from(default_units))
            .not_serialized();
        let units = SpecUnits {
            property,
            default: default_units.into(),
        };
        Self::build(self.name, self.value_type, self.flavor, Some(units))
    }

    /// A number, also accepting datetimes and durations (converted to
    /// milliseconds).
    #[must_use]
    pub fn number() -> Self {
        Self::number_accepting(true, true)
    }

    /// A number, optionally accepting datetimes and durations.
    #[must_use]
    pub fn number_accepting(datetime: bool, timedelta: bool) -> Self {
        let mut value_type = Property::new(Float);
        if timedelta {
            value_type = value_type.accepts(TimeDelta, convert_timedelta);
        }
        if datetime {
            value_type = value_type.accepts(Datetime, convert_datetime);
        }
        Self::new("NumberSpec", value_type)
    }

    /// A non-negative screen size.
    #[must_use]
    pub fn size() -> Self {
        Self::build("SizeSpec", Property::new(Size), Flavor::NonNegative, None)
    }

    /// A string value. Bare strings are field names; a one-item list is
    /// shorthand for a fixed value.
    #[must_use]
    pub fn string() -> Self {
        Self::build("StringSpec", Property::new(List::new(Str)), Flavor::StringList, None)
    }

    /// A CSS font size such as `"10pt"`.
    #[must_use]
    pub fn font_size() -> Self {
        Self::build("FontSizeSpec", Property::new(FontSize), Flavor::FontSize, None)
    }

    /// A marker type.
    #[must_use]
    pub fn marker() -> Self {
        Self::new("MarkerSpec", Enum::new(MARKER_TYPE.clone()))
    }

    /// A color. Float RGB components are truncated to integers before
    /// validation.
    #[must_use]
    pub fn color() -> Self {
        Self::build("ColorSpec", Property::new(Nullable::new(Color)), Flavor::Color, None)
    }

    /// An angle, in radians unless units say otherwise.
    #[must_use]
    pub fn angle() -> Self {
        Self::new("AngleSpec", Angle).with_units(ANGLE_UNITS.clone(), "rad")
    }

    /// A non-negative distance, in data units unless units say otherwise.
    #[must_use]
    pub fn distance() -> Self {
        Self::build("DistanceSpec", Property::new(Float), Flavor::NonNegative, None)
            .with_units(SPATIAL_UNITS.clone(), "data")
    }

    /// The spec's name, such as `"NumberSpec"`.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The plain value type.
    #[must_use]
    pub fn value_type(&self) -> &Property {
        &self.value_type
    }

    /// The units companion, for unit-bearing specs.
    #[must_use]
    pub fn units(&self) -> Option<&SpecUnits> {
        self.units.as_ref()
    }

    /// Returns `true` for color specs.
    #[must_use]
    pub fn is_color(&self) -> bool {
        self.flavor == Flavor::Color
    }

    /// The wire form of `value` stored on `owner` under `name`.
    ///
    /// Null serializes as `null`. A value valid for the value type becomes
    /// `{"value": ...}`, any other string `{"field": ...}`, and dicts are
    /// copied. Unit-bearing specs add the owner's `<name>_units` when it
    /// differs from the default.
    #[must_use]
    pub fn to_serializable(&self, owner: &dyn PropertyOwner, name: &str, value: &Value) -> Json {
        let mut json = self.wire_form(value);
        if let (Some(units), Json::Object(map)) = (&self.units, &mut json)
            && !map.contains_key("units")
            && let Some(Value::String(current)) = owner.property_value(&units_name(name))
            && current != units.default_units()
        {
            map.insert("units".to_owned(), Json::String(current));
        }
        json
    }

    fn wire_form(&self, value: &Value) -> Json {
        if self.flavor == Flavor::Color {
            return color_wire_form(value);
        }
        match value {
            Value::Null => Json::Null,
            value if self.value_type.is_valid(value) => tagged("value", self.value_type.serialize_value(value)),
            Value::String(text) => tagged("field", Json::String(text.clone())),
            other => other.to_json(),
        }
    }
}

fn tagged(key: &str, json: Json) -> Json {
    let mut map = Map::new();
    map.insert(key.to_owned(), json);
    Json::Object(map)
}

fn color_wire_form(value: &Value) -> Json {
    match value {
        Value::Null => tagged("value", Json::Null),
        Value::String(text) if is_color_literal(text) => tagged("value", Json::String(text.clone())),
        Value::String(text) if text.starts_with("rgb(") || text.starts_with("rgba(") => {
            Json::String(text.clone())
        }
        Value::String(text) => tagged("field", Json::String(text.clone())),
        Value::Tuple(items) | Value::List(items) => match Rgb::from_items(items) {
            Some(rgb) => tagged("value", Json::String(rgb.to_css())),
            None => value.to_json(),
        },
        other => other.to_json(),
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "color components are truncated towards zero on purpose"
)]
fn truncate(x: f64) -> i64 {
    x.trunc() as i64
}

fn coerce_rgb(value: Value) -> Value {
    let (items, is_tuple) = match value {
        Value::Tuple(items) => (items, true),
        Value::List(items) => (items, false),
        other => return other,
    };
    let coercible = matches!(items.len(), 3 | 4) && items.iter().all(Value::is_number);
    if !coercible {
        return if is_tuple { Value::Tuple(items) } else { Value::List(items) };
    }
    let items: Vec<Value> = items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Float(x) if i < 3 => Value::Int(truncate(x)),
            other => other,
        })
        .collect();
    if is_tuple { Value::Tuple(items) } else { Value::List(items) }
}

impl fmt::Display for DataSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl PropertyKind for DataSpec {
    fn validate(&self, value: &Value, detail: bool) -> Result<(), ValidationError> {
        self.shape.validate(value, detail)?;
        if self.flavor == Flavor::FontSize
            && let Value::String(text) = value
        {
            let looks_numeric = text.starts_with(|c: char| c.is_ascii_digit());
            if text.is_empty() || (looks_numeric && !is_font_size(text)) {
                return Err(ValidationError::detailed(detail, || {
                    format!("{value} is not a valid font size value")
                }));
            }
        }
        Ok(())
    }

    fn preprocess(&self, value: Value) -> Result<Value, ValidationError> {
        match self.flavor {
            Flavor::StringList => match value {
                Value::List(mut items) if items.len() == 1 => {
                    Ok(Value::dict([("value", items.remove(0))]))
                }
                Value::List(_) => Err(ValidationError::new(format!(
                    "{self} convenience list values must have length 1, got {value}"
                ))),
                other => Ok(other),
            },
            Flavor::NonNegative => match value.as_f64() {
                Some(x) if x < 0.0 => Err(ValidationError::new(format!(
                    "{self} values must be non-negative, got {value}"
                ))),
                _ => Ok(value),
            },
            Flavor::Color => Ok(coerce_rgb(value)),
            Flavor::Plain | Flavor::FontSize => Ok(value),
        }
    }

    // Values are stored as given; `to_serializable` picks the wire form.
    fn transform(&self, value: Value) -> Value {
        value
    }

    fn from_json(&self, json: &Json, models: Option<&ModelIndex>) -> Result<Value, DeserializationError> {
        self.shape.from_json(json, models)
    }

    fn serialize_value(&self, value: &Value) -> Json {
        self.wire_form(value)
    }

    fn type_params(&self) -> &[Property] {
        self.shape.type_params()
    }

    fn default_alternatives(&self) -> Vec<Alternative> {
        self.value_type.alternatives().to_vec()
    }

    fn as_dataspec(&self) -> Option<&DataSpec> {
        Some(self)
    }
}

/// `{"field": name}`: a reference to a data column.
#[must_use]
pub fn field(name: &str) -> Value {
    Value::dict([("field", name)])
}

/// `{"field": name, "transform": transform}`.
#[must_use]
pub fn field_with_transform(name: &str, transform: ModelRef) -> Value {
    Value::dict([("field", Value::from(name)), ("transform", Value::Model(transform))])
}

/// `{"value": value}`: a fixed value, even if it is a string.
#[must_use]
pub fn value(value: impl Into<Value>) -> Value {
    Value::dict([("value", value.into())])
}

/// `{"value": value, "transform": transform}`.
#[must_use]
pub fn value_with_transform(value: impl Into<Value>, transform: ModelRef) -> Value {
    Value::dict([("value", value.into()), ("transform", Value::Model(transform))])
}

/// `{"expr": expression}`: a value computed on the client.
#[must_use]
pub fn expr(expression: ModelRef) -> Value {
    Value::dict([("expr", Value::Model(expression))])
}

/// `{"expr": expression, "transform": transform}`.
#[must_use]
pub fn expr_with_transform(expression: ModelRef, transform: ModelRef) -> Value {
    Value::dict([
        ("expr", Value::Model(expression)),
        ("transform", Value::Model(transform)),
    ])
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::property::Owner;

    struct Glyph {
        angle_units: &'static str,
    }

    impl PropertyOwner for Glyph {
        fn type_name(&self) -> &str {
            "Glyph"
        }

        fn property_value(&self, name: &str) -> Option<Value> {
            (name == "angle_units").then(|| Value::from(self.angle_units))
        }
    }

    const GLYPH: Glyph = Glyph { angle_units: "rad" };

    #[test]
    fn values_win_over_fields() {
        let spec = DataSpec::number();
        assert_eq!(spec.to_serializable(&GLYPH, "x", &Value::Int(10)), json!({"value": 10}));
        assert_eq!(
            spec.to_serializable(&GLYPH, "x", &Value::from("pressure")),
            json!({"field": "pressure"})
        );
        assert_eq!(spec.to_serializable(&GLYPH, "x", &Value::Null), Json::Null);
        assert_eq!(
            spec.to_serializable(&GLYPH, "x", &field("a")),
            json!({"field": "a"})
        );

        let marker = DataSpec::marker();
        assert_eq!(
            marker.to_serializable(&GLYPH, "marker", &Value::from("circle")),
            json!({"value": "circle"})
        );
        assert_eq!(
            marker.to_serializable(&GLYPH, "marker", &Value::from("kind")),
            json!({"field": "kind"})
        );
    }

    #[test]
    fn number_spec_accepts_durations() {
        let prop = Property::new(DataSpec::number()).with_default(10).unwrap();
        let delta = chrono::TimeDelta::days(3) + chrono::TimeDelta::seconds(54);
        assert_eq!(
            prop.prepare_value(Owner::Class("Glyph"), "x", Value::TimeDelta(delta)),
            Ok(Value::Float(259_254_000.0))
        );
    }

    #[test]
    fn dict_form_is_validated() {
        let spec = DataSpec::number();
        assert!(spec.validate(&Value::dict([("value", 1)]), true).is_ok());
        assert!(spec.validate(&Value::dict([("field", "x")]), true).is_ok());
        assert!(spec.validate(&Value::dict([("bogus", 1)]), true).is_err());
        assert!(spec.validate(&Value::list([1, 2]), true).is_err());
    }

    #[test]
    fn color_spec_wire_forms() {
        let spec = DataSpec::color();
        let to_wire = |v: Value| spec.to_serializable(&GLYPH, "fill_color", &v);
        assert_eq!(to_wire(Value::from((255, 0, 0))), json!({"value": "rgb(255, 0, 0)"}));
        assert_eq!(to_wire(Value::from("red")), json!({"value": "red"}));
        assert_eq!(to_wire(Value::from("#ff0000")), json!({"value": "#ff0000"}));
        assert_eq!(to_wire(Value::from("some_column")), json!({"field": "some_column"}));
        assert_eq!(to_wire(Value::from("rgb(1, 2, 3)")), json!("rgb(1, 2, 3)"));
        assert_eq!(to_wire(Value::Null), json!({"value": null}));
    }

    #[test]
    fn color_spec_truncates_float_components() {
        let prop = Property::new(DataSpec::color());
        let prepared = prop
            .prepare_value(Owner::Class("Glyph"), "fill_color", Value::from((100.2, 57.3, 10.2)))
            .unwrap();
        assert_eq!(prepared, Value::from((100, 57, 10)));
        let spec = prop.as_dataspec().unwrap();
        assert_eq!(
            spec.to_serializable(&GLYPH, "fill_color", &prepared),
            json!({"value": "rgb(100, 57, 10)"})
        );

        let with_alpha = prop
            .prepare_value(Owner::Class("Glyph"), "fill_color", Value::from((1.5, 2.0, 3.9, 0.5)))
            .unwrap();
        assert_eq!(with_alpha, Value::from((1, 2, 3, 0.5)));
        assert_eq!(
            spec.to_serializable(&GLYPH, "fill_color", &with_alpha),
            json!({"value": "rgba(1, 2, 3, 0.5)"})
        );
    }

    #[test]
    fn short_hex_is_a_field_name() {
        let spec = DataSpec::color();
        assert_eq!(
            spec.to_serializable(&GLYPH, "fill_color", &Value::from("#abc")),
            json!({"field": "#abc"})
        );
        assert_eq!(
            spec.to_serializable(&GLYPH, "fill_color", &Value::from("#a240a2ff")),
            json!({"field": "#a240a2ff"})
        );
    }

    #[test]
    fn units_only_when_not_default() {
        let spec = DataSpec::angle();
        assert_eq!(
            spec.to_serializable(&GLYPH, "angle", &Value::Float(1.0)),
            json!({"value": 1.0})
        );
        let degrees = Glyph { angle_units: "deg" };
        assert_eq!(
            spec.to_serializable(&degrees, "angle", &Value::Float(1.0)),
            json!({"value": 1.0, "units": "deg"})
        );
        let units = spec.units().unwrap();
        assert_eq!(units.default_units(), "rad");
        assert!(!units.property().is_serialized());
        assert_eq!(units.property().raw_default(), Some(Value::from("rad")));
    }

    #[test]
    fn distances_reject_negative_numbers() {
        let prop = Property::new(DataSpec::distance());
        assert!(prop.prepare_value(Owner::Class("Glyph"), "radius", Value::Float(-1.0)).is_err());
        assert!(prop.prepare_value(Owner::Class("Glyph"), "radius", Value::Float(1.0)).is_ok());
        assert_eq!(prop.as_dataspec().unwrap().units().unwrap().default_units(), "data");
    }

    #[test]
    fn string_spec_list_shorthand() {
        let prop = Property::new(DataSpec::string());
        assert_eq!(
            prop.prepare_value(Owner::Class("Text"), "text", Value::list(["hello"])),
            Ok(value("hello"))
        );
        assert!(
            prop.prepare_value(Owner::Class("Text"), "text", Value::list(["a", "b"]))
                .is_err()
        );
        let spec = DataSpec::string();
        assert_eq!(
            spec.to_serializable(&GLYPH, "text", &Value::from("label")),
            json!({"field": "label"})
        );
    }

    #[test]
    fn font_size_rejects_bare_numbers() {
        let spec = DataSpec::font_size();
        assert!(spec.validate(&Value::from("10pt"), true).is_ok());
        assert!(spec.validate(&Value::from("size_col"), true).is_ok());
        assert!(spec.validate(&Value::from("6"), true).is_err());
        assert!(spec.validate(&Value::from(""), true).is_err());
        assert_eq!(
            spec.to_serializable(&GLYPH, "text_font_size", &Value::from("10pt")),
            json!({"value": "10pt"})
        );
    }

    #[test]
    fn helpers_build_dict_forms() {
        assert_eq!(field("x"), Value::dict([("field", "x")]));
        assert_eq!(value("x"), Value::dict([("value", "x")]));
        let transform = ModelRef::new("p3", ["Jitter"]);
        assert_eq!(
            field_with_transform("x", transform.clone()).to_json(),
            json!({"field": "x", "transform": {"id": "p3"}})
        );
        assert_eq!(
            expr(transform).to_json(),
            json!({"expr": {"id": "p3"}})
        );
    }
}
