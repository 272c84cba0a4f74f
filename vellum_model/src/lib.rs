// Copyright 2025 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Vellum Model: observable model objects with declared properties.
//!
//! This crate builds on `vellum_property`. A [`ModelClass`] collects the
//! properties a model type declares (including those inherited from its
//! base) and registers itself so references by name resolve. A [`HasProps`]
//! instance stores values for a class and reports every change to its
//! [`ChangeSink`]s.
//!
//! ## Core Concepts
//!
//! ### Descriptors
//!
//! Each attribute of a class is served by a [`PropertyDescriptor`]. A
//! data spec with units installs two descriptors: the spec itself and a
//! sibling `<name>_units` attribute. Two declarations in one class that
//! produce the same attribute are rejected at build time.
//!
//! ### Storage layers
//!
//! Instances keep three sparse layers: explicitly set values, cached
//! unstable defaults (containers and generated values, copied per instance)
//! and cached unstable themed defaults. Setting a value explicitly evicts
//! the cached entries for that name.
//!
//! ### Change notification
//!
//! A set that does not change the value (per [`Property::matches`]) is
//! silent. Otherwise a [`PropertyChange`] carrying the old and new values,
//! an optional [`ChangeHint`] and an optional [`Setter`] is delivered to
//! every sink. Container guards ([`PropertyValueList`],
//! [`PropertyValueDict`], [`PropertyValueColumnData`]) report in-place
//! mutations the same way and roll back mutations that fail validation.
//!
//! ### Themes
//!
//! [`ThemedValues`] replace class defaults for one instance without
//! touching explicitly set values. [`Theme`] computes them per class from
//! `{"attrs": {"ClassName": {...}}}` documents.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use vellum_model::{HasProps, ModelClass, RecordingSink};
//! use vellum_property::{DataSpec, Float, Property, Value};
//! use serde_json::json;
//!
//! let scatter = ModelClass::builder("QuickScatter")
//!     .property("alpha", Property::new(Float).with_default(1.0).unwrap())
//!     .property("size", Property::new(DataSpec::number()).with_default(4).unwrap())
//!     .build()
//!     .unwrap();
//!
//! let sink = Arc::new(RecordingSink::new());
//! let mut glyph = HasProps::new(&scatter);
//! glyph.subscribe(sink.clone());
//!
//! glyph.set("alpha", 0.5).unwrap();
//! glyph.set("alpha", 0.5).unwrap();
//! glyph.set("size", "pressure").unwrap();
//! assert_eq!(sink.attrs(), ["alpha", "size"]);
//!
//! let attrs = glyph.properties_with_values(false).unwrap();
//! assert_eq!(attrs["size"], json!({"field": "pressure"}));
//! assert_eq!(glyph.get("alpha").unwrap(), Value::Float(0.5));
//! ```
//!
//! [`Property::matches`]: vellum_property::Property::matches

mod class;
mod descriptor;
mod error;
mod events;
mod has_props;
mod store;
mod theme;
mod wrappers;

pub use class::{ModelClass, ModelClassBuilder, lookup_class, registered_classes};
pub use descriptor::{DescriptorKind, PropertyDescriptor, make_descriptors};
pub use error::ModelError;
pub use events::{
    ChangeHint, ChangeSink, PatchIndex, Patches, PropertyChange, RecordingSink, Setter,
};
pub use has_props::{HasProps, Init};
pub use theme::{Theme, ThemeBuilder, ThemeError, ThemedValues};
pub use wrappers::{PropertyValueColumnData, PropertyValueDict, PropertyValueList};
