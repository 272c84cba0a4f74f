// Copyright 2025 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Model classes and the process-wide class registry.
//!
//! A [`ModelClass`] is built once with [`ModelClassBuilder`]. Building
//! collects the declared properties (own and inherited) into descriptors,
//! checks for collisions and registers the class name with the
//! [`Instance`](vellum_property::Instance) type table.

use std::fmt;
use std::sync::{Arc, LazyLock};

use hashbrown::HashSet;
use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::{debug, warn};
use vellum_property::{DataSpec, Owner, Property, Value, register_type};

use crate::descriptor::{PropertyDescriptor, make_descriptors};
use crate::error::ModelError;

static CLASSES: LazyLock<RwLock<IndexMap<Arc<str>, Arc<ModelClass>>>> =
    LazyLock::new(|| RwLock::new(IndexMap::new()));

/// Returns the registered class named `name`.
#[must_use]
pub fn lookup_class(name: &str) -> Option<Arc<ModelClass>> {
    CLASSES.read().get(name).cloned()
}

/// Returns the names of every registered class, in registration order.
#[must_use]
pub fn registered_classes() -> Vec<Arc<str>> {
    CLASSES.read().keys().cloned().collect()
}

/// A model type: its name, lineage and property descriptors.
///
/// # Example
///
/// ```rust
/// use vellum_model::ModelClass;
/// use vellum_property::{Float, Property};
///
/// let glyph = ModelClass::builder("DocGlyph")
///     .property("alpha", Property::new(Float).with_default(1.0).unwrap())
///     .build()
///     .unwrap();
/// let line = ModelClass::builder("DocLine")
///     .extends(&glyph)
///     .override_default("alpha", 0.5)
///     .build()
///     .unwrap();
///
/// assert!(line.is_subclass_of("DocGlyph"));
/// assert_eq!(line.properties().collect::<Vec<_>>(), ["alpha"]);
/// ```
pub struct ModelClass {
    name: Arc<str>,
    qualified: Option<Arc<str>>,
    /// Most derived first.
    lineage: Vec<Arc<str>>,
    descriptors: IndexMap<Arc<str>, PropertyDescriptor>,
    overrides: IndexMap<Arc<str>, Value>,
}

impl ModelClass {
    /// Starts declaring a class.
    #[must_use]
    pub fn builder(name: &str) -> ModelClassBuilder {
        ModelClassBuilder::new(name)
    }

    /// Returns the class name.
    #[must_use]
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the qualified name, if one was given.
    #[must_use]
    pub fn qualified_name(&self) -> Option<&str> {
        self.qualified.as_deref()
    }

    /// Returns the class name followed by its bases, most derived first.
    #[must_use]
    pub fn lineage(&self) -> &[Arc<str>] {
        &self.lineage
    }

    /// Returns `true` if this class is `name` or derives from it.
    #[must_use]
    pub fn is_subclass_of(&self, name: &str) -> bool {
        self.lineage.iter().any(|n| &**n == name)
    }

    /// Returns the descriptor for `name`, if the class has one.
    #[must_use]
    pub fn descriptor(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.descriptors.get(name)
    }

    /// Returns the descriptor for `name`, suggesting close names when it is
    /// missing.
    pub fn lookup(&self, name: &str) -> Result<&PropertyDescriptor, ModelError> {
        self.descriptors
            .get(name)
            .ok_or_else(|| self.unknown_attribute(name))
    }

    fn unknown_attribute(&self, name: &str) -> ModelError {
        let mut scored: Vec<(f64, &str)> = self
            .properties()
            .map(|candidate| (similarity(&name.to_lowercase(), candidate), candidate))
            .filter(|(score, _)| *score >= 0.6)
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        let similar = !scored.is_empty();
        let possible: Vec<String> = if similar {
            scored.iter().take(3).map(|(_, n)| (*n).to_owned()).collect()
        } else {
            let mut all: Vec<String> = self.properties().map(str::to_owned).collect();
            all.sort();
            all
        };
        ModelError::UnknownAttribute {
            class: self.name.to_string(),
            name: name.to_owned(),
            similar,
            possible,
        }
    }

    /// Returns every attribute name, own and inherited, in declaration order.
    pub fn properties(&self) -> impl Iterator<Item = &str> + '_ {
        self.descriptors.keys().map(|name| &**name)
    }

    /// Returns every descriptor, in declaration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &PropertyDescriptor> + '_ {
        self.descriptors.values()
    }

    /// Returns the data-spec properties.
    pub fn dataspecs(&self) -> impl Iterator<Item = (&str, &DataSpec)> + '_ {
        self.descriptors
            .values()
            .filter_map(|d| Some((d.name(), d.property().as_dataspec()?)))
    }

    /// Returns the descriptors whose values may hold model references.
    pub fn properties_with_refs(&self) -> impl Iterator<Item = &PropertyDescriptor> + '_ {
        self.descriptors.values().filter(|d| d.has_ref())
    }

    /// Returns the overridden default for `name`, own or inherited.
    #[must_use]
    pub fn overridden_default(&self, name: &str) -> Option<&Value> {
        self.overrides.get(name)
    }

    /// Returns every overridden default.
    #[must_use]
    pub fn overridden_defaults(&self) -> &IndexMap<Arc<str>, Value> {
        &self.overrides
    }
}

impl fmt::Debug for ModelClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelClass")
            .field("name", &self.name)
            .field("qualified", &self.qualified)
            .field("lineage", &self.lineage)
            .field("properties", &self.descriptors.keys().collect::<Vec<_>>())
            .field("overrides", &self.overrides)
            .finish()
    }
}

impl fmt::Display for ModelClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Ratio of matching characters, as `2 * lcs / (len(a) + len(b))`.
fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let mut row = vec![0_usize; b.len() + 1];
    for x in &a {
        let mut diag = 0;
        for (j, y) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if x == y { diag + 1 } else { above.max(row[j]) };
            diag = above;
        }
    }
    let lcs = row[b.len()];
    2.0 * lcs as f64 / (a.len() + b.len()) as f64
}

/// Declares a [`ModelClass`].
#[derive(Debug)]
pub struct ModelClassBuilder {
    name: Arc<str>,
    qualified: Option<Arc<str>>,
    base: Option<Arc<ModelClass>>,
    properties: Vec<(Arc<str>, Property)>,
    overrides: Vec<(Arc<str>, Value)>,
}

impl ModelClassBuilder {
    /// Creates a builder for a class called `name`.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            qualified: None,
            base: None,
            properties: Vec::new(),
            overrides: Vec::new(),
        }
    }

    /// Inherits the properties and overrides of `base`.
    #[must_use]
    pub fn extends(mut self, base: &Arc<ModelClass>) -> Self {
        self.base = Some(Arc::clone(base));
        self
    }

    /// Registers a qualified name (such as `"models.glyphs.Line"`) that
    /// [`Instance`](vellum_property::Instance) properties may refer to.
    #[must_use]
    pub fn qualified(mut self, name: &str) -> Self {
        self.qualified = Some(name.into());
        self
    }

    /// Declares a property.
    #[must_use]
    pub fn property(mut self, name: &str, property: impl Into<Property>) -> Self {
        self.properties.push((name.into(), property.into()));
        self
    }

    /// Replaces the default of an inherited or own property.
    #[must_use]
    pub fn override_default(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.overrides.push((name.into(), value.into()));
        self
    }

    /// Builds and registers the class.
    ///
    /// Fails with [`ModelError::DuplicateDescriptor`] when two declarations
    /// of this class generate the same attribute, and with a property error
    /// when an override is not a valid value.
    pub fn build(self) -> Result<Arc<ModelClass>, ModelError> {
        let mut descriptors = self
            .base
            .as_ref()
            .map(|base| base.descriptors.clone())
            .unwrap_or_default();
        let mut overrides = self
            .base
            .as_ref()
            .map(|base| base.overrides.clone())
            .unwrap_or_default();

        let mut created: HashSet<Arc<str>> = HashSet::new();
        for (name, property) in &self.properties {
            for descriptor in make_descriptors(name, property) {
                let generated = Arc::clone(descriptor.name_arc());
                if !created.insert(Arc::clone(&generated)) {
                    return Err(ModelError::DuplicateDescriptor {
                        class: self.name.to_string(),
                        name: generated.to_string(),
                    });
                }
                if descriptors.insert(Arc::clone(&generated), descriptor).is_some() {
                    warn!(
                        class = %self.name,
                        property = %generated,
                        "property was previously declared on a parent class"
                    );
                }
            }
        }

        for (name, value) in self.overrides {
            let Some(descriptor) = descriptors.get(&name) else {
                warn!(class = %self.name, property = %name, "override does not override anything");
                continue;
            };
            descriptor
                .property()
                .prepare_value(Owner::Class(&self.name), &name, value.clone())?;
            overrides.insert(name, value);
        }

        let mut lineage = vec![Arc::clone(&self.name)];
        if let Some(base) = &self.base {
            lineage.extend(base.lineage.iter().cloned());
        }

        let class = Arc::new(ModelClass {
            name: self.name,
            qualified: self.qualified,
            lineage,
            descriptors,
            overrides,
        });

        register_type(&class.name, class.qualified.as_deref());
        let previous = CLASSES
            .write()
            .insert(Arc::clone(&class.name), Arc::clone(&class));
        if previous.is_some() {
            warn!(class = %class.name, "model class registered twice; replacing");
        }
        debug!(
            class = %class.name,
            properties = class.descriptors.len(),
            "registered model class"
        );
        Ok(class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_property::{ANGLE_UNITS, DataSpec, Enum, Float, Int, is_registered};

    #[test]
    fn inherits_properties_in_order() {
        let base = ModelClass::builder("ClassTestBase")
            .property("x", Property::new(Float))
            .property("y", Property::new(Float))
            .build()
            .unwrap();
        let derived = ModelClass::builder("ClassTestDerived")
            .extends(&base)
            .property("z", Property::new(Int))
            .build()
            .unwrap();

        assert_eq!(derived.properties().collect::<Vec<_>>(), ["x", "y", "z"]);
        assert_eq!(
            derived.lineage().iter().map(|n| &**n).collect::<Vec<_>>(),
            ["ClassTestDerived", "ClassTestBase"]
        );
        assert!(derived.is_subclass_of("ClassTestBase"));
        assert!(!base.is_subclass_of("ClassTestDerived"));
    }

    #[test]
    fn units_collision_fails_at_build() {
        let err = ModelClass::builder("ClassTestCollision")
            .property("x", DataSpec::angle())
            .property("x_units", Enum::new(ANGLE_UNITS.clone()))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ModelError::DuplicateDescriptor {
                class: "ClassTestCollision".into(),
                name: "x_units".into(),
            }
        );
        assert_eq!(
            err.to_string(),
            "two property generators both created ClassTestCollision.x_units"
        );
        assert!(lookup_class("ClassTestCollision").is_none());
    }

    #[test]
    fn redeclaring_inherited_property_replaces_it() {
        let base = ModelClass::builder("ClassTestRedeclareBase")
            .property("x", Property::new(Float))
            .build()
            .unwrap();
        let derived = ModelClass::builder("ClassTestRedeclareDerived")
            .extends(&base)
            .property("x", Property::new(Int))
            .build()
            .unwrap();
        assert_eq!(derived.lookup("x").unwrap().property().to_string(), "Int");
    }

    #[test]
    fn overrides_are_validated_and_inherited() {
        let base = ModelClass::builder("ClassTestOverrideBase")
            .property("alpha", Property::new(Float))
            .build()
            .unwrap();
        let err = ModelClass::builder("ClassTestOverrideBad")
            .extends(&base)
            .override_default("alpha", "opaque")
            .build();
        assert!(matches!(err, Err(ModelError::Property(_))));

        let mid = ModelClass::builder("ClassTestOverrideMid")
            .extends(&base)
            .override_default("alpha", 0.5)
            .override_default("missing", 1)
            .build()
            .unwrap();
        let leaf = ModelClass::builder("ClassTestOverrideLeaf")
            .extends(&mid)
            .build()
            .unwrap();
        assert_eq!(leaf.overridden_default("alpha"), Some(&Value::Float(0.5)));
        assert!(leaf.overridden_default("missing").is_none());
        assert_eq!(
            leaf.lookup("alpha").unwrap().class_default(&leaf).unwrap(),
            Some(Value::Float(0.5))
        );
        assert_eq!(
            base.lookup("alpha").unwrap().class_default(&base).unwrap(),
            Some(Value::Float(0.0))
        );
    }

    #[test]
    fn lookup_suggests_names() {
        let class = ModelClass::builder("ClassTestLookup")
            .property("line_width", Property::new(Float))
            .property("line_color", Property::new(Float))
            .property("alpha", Property::new(Float))
            .build()
            .unwrap();

        match class.lookup("line_widht").unwrap_err() {
            ModelError::UnknownAttribute { similar, possible, .. } => {
                assert!(similar, "close names should be suggested");
                assert_eq!(possible[0], "line_width");
            }
            other => panic!("unexpected error: {other}"),
        }
        match class.lookup("zzz").unwrap_err() {
            ModelError::UnknownAttribute { similar, possible, .. } => {
                assert!(!similar, "nothing is close to zzz");
                assert_eq!(possible, ["alpha", "line_color", "line_width"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn registration() {
        let class = ModelClass::builder("ClassTestRegistered")
            .qualified("tests.ClassTestRegistered")
            .build()
            .unwrap();
        assert!(Arc::ptr_eq(&lookup_class("ClassTestRegistered").unwrap(), &class));
        assert!(registered_classes().iter().any(|n| &**n == "ClassTestRegistered"));
        assert!(is_registered("tests.ClassTestRegistered"));
    }

    #[test]
    fn similarity_ratio() {
        assert_eq!(similarity("abc", "abc"), 1.0);
        assert_eq!(similarity("abc", "xyz"), 0.0);
        assert!(similarity("line_widht", "line_width") > 0.8);
    }
}
