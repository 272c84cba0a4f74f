// Copyright 2025 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Vellum Property: typed, validated, serializable property descriptors.
//!
//! This crate provides the type layer of a declarative model system. A
//! [`Property`] describes which values an attribute accepts, how they are
//! canonicalized, and how they cross the JSON wire. Per-instance storage,
//! defaults resolution and change notification live in `vellum_model`.
//!
//! ## Core Concepts
//!
//! ### Values
//!
//! Properties operate on [`Value`], a dynamic value with numbers, strings,
//! sequences, insertion-ordered dicts, numeric arrays, chrono date/time
//! types and [`ModelRef`] references to other models.
//!
//! ### Kinds
//!
//! A [`PropertyKind`] is the type contract:
//!
//! - **Leaves** - [`Bool`], [`Int`], [`Float`], [`Str`], [`Regex`], [`Size`],
//!   [`Percent`], [`Byte`], [`Interval`], [`FontSize`], [`JsonText`], [`Any`]
//! - **Containers** - [`List`], [`Seq`], [`Array`], [`Tuple`], [`Dict`],
//!   [`ColumnData`]
//! - **Unions** - [`Either`], [`Nullable`], [`NonNullable`]
//! - **Restricted strings** - [`Enum`] over an [`Enumeration`]
//! - **References** - [`Instance`], resolved through a lazy type table
//! - **Date/time** - [`Date`], [`Datetime`], [`TimeDelta`]
//! - **Colors** - [`Color`]
//! - **Data specs** - [`DataSpec`] (number, string, font size, marker, color,
//!   angle, distance)
//!
//! ### Preparing values
//!
//! [`Property::prepare_value`] is the pipeline every stored value goes
//! through: kind preprocessing, validation, alternative conversion when
//! validation fails, transformation, and assertions for live instances.
//!
//! ## Quick Start
//!
//! ```rust
//! use vellum_property::{DataSpec, Float, Owner, Property, Value};
//!
//! let alpha = Property::new(Float).with_default(1.0).unwrap();
//! assert!(alpha.is_valid(&Value::Float(0.5)));
//!
//! let size = Property::new(DataSpec::number()).with_default(10).unwrap();
//! let prepared = size
//!     .prepare_value(Owner::Class("Scatter"), "size", Value::from("pressure"))
//!     .unwrap();
//! assert_eq!(
//!     size.serialize_value(&prepared),
//!     serde_json::json!({"field": "pressure"})
//! );
//! ```
//!
//! ## Validation Toggle
//!
//! Validation can be turned off per thread with [`without_validation`] for
//! trusted bulk loads. Values are still transformed.

mod color;
mod container;
mod dataspec;
mod datetime;
mod either;
mod enums;
mod error;
mod instance;
mod primitive;
mod property;
mod validation;
mod value;

pub use color::{Color, Rgb, is_color_literal, is_css_rgb};
pub use container::{Array, ColumnData, Dict, List, Seq, Tuple};
pub use dataspec::{
    DataSpec, SpecUnits, expr, expr_with_transform, field, field_with_transform, units_name,
    value, value_with_transform,
};
pub use datetime::{
    Date, Datetime, TimeDelta, convert_datetime, convert_timedelta, date_ms, datetime_ms,
    timedelta_ms,
};
pub use either::{Either, NonNullable, Nullable};
pub use enums::{
    ANGLE_UNITS, DASH_PATTERN, Enum, Enumeration, FONT_STYLE, LINE_CAP, LINE_JOIN, MARKER_TYPE,
    NAMED_COLOR, SPATIAL_UNITS, TEXT_ALIGN, TEXT_BASELINE,
};
pub use error::{DeserializationError, PropertyError, ValidationError};
pub use instance::{Instance, instance, is_registered, register_type, resolve_type};
pub use primitive::{
    Angle, Any, Bool, Byte, Float, FontSize, Int, Interval, JsonText, Percent, Regex, Size, Str,
    is_font_size,
};
pub use property::{
    Alternative, Converter, DefaultGenerator, DefaultValue, Owner, Property, PropertyFlags,
    PropertyKind, PropertyOwner,
};
pub use validation::{
    ValidationGuard, set_validation_enabled, validation_enabled, without_validation,
};
pub use value::{ModelIndex, ModelRef, Value, ValueMap};
