// Copyright 2025 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Themes: replacement defaults per class.
//!
//! [`ThemedValues`] is the per-instance mapping handed to
//! [`HasProps::apply_theme`]. A [`Theme`] stores attribute defaults keyed by
//! class name and computes that mapping for a class by walking its lineage
//! from the root base to the class itself, so derived entries win.

use std::sync::Arc;

use hashbrown::HashMap;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::Value as Json;
use tracing::debug;
use vellum_property::Value;

use crate::class::ModelClass;
use crate::error::ModelError;
use crate::has_props::HasProps;

/// A mapping from attribute name to replacement default.
///
/// Cloning is cheap; clones of one mapping compare identical under
/// [`ThemedValues::ptr_eq`], which lets re-applying the same theme skip work.
#[derive(Clone, Debug, Default)]
pub struct ThemedValues {
    inner: Arc<IndexMap<Arc<str>, Value>>,
}

impl ThemedValues {
    /// Returns the value for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.inner.get(name)
    }

    /// Returns `true` if `name` has a value.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    /// Returns the attribute names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.inner.keys().map(|name| &**name)
    }

    /// Returns the name/value pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.inner.iter().map(|(name, value)| (&**name, value))
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns `true` if both share the same storage.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<K, V> FromIterator<(K, V)> for ThemedValues
where
    K: Into<Arc<str>>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            inner: Arc::new(
                iter.into_iter()
                    .map(|(name, value)| (name.into(), value.into()))
                    .collect(),
            ),
        }
    }
}

impl PartialEq for ThemedValues {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.inner == other.inner
    }
}

/// Errors raised while reading a theme.
#[derive(Debug, thiserror::Error)]
pub enum ThemeError {
    /// The input was not valid JSON.
    #[error("invalid theme JSON: {0}")]
    Parse(#[from] serde_json::Error),
    /// A section that must be an object was something else.
    #[error("theme section {path:?} must be an object")]
    NotAnObject {
        /// Where in the document the section sits.
        path: String,
    },
}

type ClassAttrs = IndexMap<Arc<str>, IndexMap<Arc<str>, Value>>;

/// Attribute defaults for a set of classes.
///
/// Themes are immutable after creation. Use [`ThemeBuilder`] or
/// [`Theme::from_json`] to construct them. Cloning is cheap.
///
/// # Example
///
/// ```rust
/// use vellum_model::{HasProps, ModelClass, Theme};
/// use vellum_property::{Float, Property, Value};
///
/// let base = ModelClass::builder("DocThemeBase")
///     .property("alpha", Property::new(Float).with_default(1.0).unwrap())
///     .build()
///     .unwrap();
/// let derived = ModelClass::builder("DocThemeDerived")
///     .extends(&base)
///     .build()
///     .unwrap();
///
/// let theme = Theme::builder()
///     .set("DocThemeBase", "alpha", 0.5)
///     .build();
///
/// let mut obj = HasProps::new(&derived);
/// theme.apply_to(&mut obj).unwrap();
/// assert_eq!(obj.get("alpha").unwrap(), Value::Float(0.5));
/// ```
#[derive(Clone, Debug, Default)]
pub struct Theme {
    inner: Arc<ThemeData>,
}

#[derive(Debug, Default)]
struct ThemeData {
    attrs: ClassAttrs,
    by_class: Mutex<HashMap<Arc<str>, ThemedValues>>,
}

impl Theme {
    /// Creates an empty builder.
    #[must_use]
    pub fn builder() -> ThemeBuilder {
        ThemeBuilder::new()
    }

    /// Reads a theme of the form `{"attrs": {"ClassName": {"attr": value}}}`.
    pub fn from_json(json: &Json) -> Result<Self, ThemeError> {
        let Json::Object(root) = json else {
            return Err(ThemeError::NotAnObject {
                path: String::new(),
            });
        };
        let mut builder = ThemeBuilder::new();
        let Some(attrs) = root.get("attrs") else {
            return Ok(builder.build());
        };
        let Json::Object(attrs) = attrs else {
            return Err(ThemeError::NotAnObject {
                path: "attrs".to_owned(),
            });
        };
        for (class, values) in attrs {
            let Json::Object(values) = values else {
                return Err(ThemeError::NotAnObject {
                    path: format!("attrs.{class}"),
                });
            };
            for (attr, value) in values {
                builder = builder.set(class, attr, Value::from(value));
            }
        }
        Ok(builder.build())
    }

    /// Parses a theme from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, ThemeError> {
        let json: Json = serde_json::from_str(text)?;
        Self::from_json(&json)
    }

    /// Returns `true` if the theme sets nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.attrs.values().all(IndexMap::is_empty)
    }

    /// Returns the names of the classes the theme mentions.
    pub fn classes(&self) -> impl Iterator<Item = &str> + '_ {
        self.inner.attrs.keys().map(|name| &**name)
    }

    /// Returns the values set directly for `class`, ignoring its bases.
    #[must_use]
    pub fn class_attrs(&self, class: &str) -> Option<&IndexMap<Arc<str>, Value>> {
        self.inner.attrs.get(class)
    }

    /// Computes the values for instances of `class`.
    ///
    /// The result is cached per class name, so repeated calls return
    /// mappings that are [`ptr_eq`](ThemedValues::ptr_eq).
    #[must_use]
    pub fn themed_values(&self, class: &ModelClass) -> ThemedValues {
        let mut cache = self.inner.by_class.lock();
        if let Some(values) = cache.get(class.name()) {
            return values.clone();
        }
        let mut merged: IndexMap<Arc<str>, Value> = IndexMap::new();
        for name in class.lineage().iter().rev() {
            if let Some(attrs) = self.inner.attrs.get(name) {
                for (attr, value) in attrs {
                    merged.insert(Arc::clone(attr), value.clone());
                }
            }
        }
        let values = ThemedValues {
            inner: Arc::new(merged),
        };
        cache.insert(class.name().into(), values.clone());
        values
    }

    /// Applies the theme to `obj`.
    pub fn apply_to(&self, obj: &mut HasProps) -> Result<(), ModelError> {
        let values = self.themed_values(obj.class());
        obj.apply_theme(values)
    }
}

/// Builder for constructing [`Theme`] instances.
///
/// # Example
///
/// ```rust
/// use vellum_model::ThemeBuilder;
/// use vellum_property::Value;
///
/// let theme = ThemeBuilder::new()
///     .set("Line", "line_width", 2)
///     .set("Line", "line_width", 3)
///     .build();
///
/// let attrs = theme.class_attrs("Line").unwrap();
/// assert_eq!(attrs.get("line_width"), Some(&Value::Int(3)));
/// ```
#[derive(Debug, Default)]
pub struct ThemeBuilder {
    attrs: ClassAttrs,
}

impl ThemeBuilder {
    /// Creates a new empty theme builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default of `attr` for `class`.
    ///
    /// If the attribute was already set, the value is replaced.
    #[must_use]
    pub fn set(mut self, class: &str, attr: &str, value: impl Into<Value>) -> Self {
        self.attrs
            .entry(class.into())
            .or_default()
            .insert(attr.into(), value.into());
        self
    }

    /// Builds the theme.
    #[must_use]
    pub fn build(self) -> Theme {
        debug!(classes = self.attrs.len(), "built theme");
        Theme {
            inner: Arc::new(ThemeData {
                attrs: self.attrs,
                by_class: Mutex::default(),
            }),
        }
    }
}
