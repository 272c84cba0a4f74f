// Copyright 2025 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Model instances.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexSet;
use serde_json::{Map, Value as Json};
use tracing::{debug, trace, warn};
use vellum_property::{DataSpec, ModelIndex, ModelRef, PropertyOwner, Value};

use crate::class::ModelClass;
use crate::descriptor::PropertyDescriptor;
use crate::error::ModelError;
use crate::events::{ChangeHint, ChangeSink, PropertyChange, Setter};
use crate::store::{Layer, PropertyStore};
use crate::theme::ThemedValues;

static NEXT_ID: AtomicU64 = AtomicU64::new(1000);

fn make_id() -> Arc<str> {
    format!("p{}", NEXT_ID.fetch_add(1, Ordering::Relaxed)).into()
}

/// A constructor value.
#[derive(Clone, Debug, PartialEq)]
pub enum Init {
    /// Set the property to this value.
    Value(Value),
    /// Keep the property's own default.
    Intrinsic,
}

impl Init {
    /// Wraps a value.
    #[must_use]
    pub fn value(value: impl Into<Value>) -> Self {
        Self::Value(value.into())
    }
}

impl From<Value> for Init {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

/// An instance of a [`ModelClass`].
///
/// Instances own their property values and the change sinks attached to
/// them. Every attribute access goes through the class's
/// [`PropertyDescriptor`]s.
///
/// # Example
///
/// ```rust
/// use vellum_model::{HasProps, Init, ModelClass};
/// use vellum_property::{Float, List, Property, Value};
///
/// let class = ModelClass::builder("DocRange")
///     .property("start", Property::new(Float))
///     .property("ticks", Property::new(List::new(Float)))
///     .build()
///     .unwrap();
///
/// let mut range = HasProps::with_values(&class, [("start", Init::value(2.5))]).unwrap();
/// assert_eq!(range.get("start").unwrap(), Value::Float(2.5));
///
/// range.list_mut("ticks").unwrap().push(1.0).unwrap();
/// assert_eq!(range.get("ticks").unwrap(), Value::list([1.0]));
/// ```
pub struct HasProps {
    id: Arc<str>,
    class: Arc<ModelClass>,
    storage: Option<PropertyStore>,
    initialized: bool,
    themed: Option<ThemedValues>,
    sinks: Vec<Arc<dyn ChangeSink>>,
}

impl HasProps {
    // =========================================================================
    // Construction
    // =========================================================================

    /// Creates an initialized instance with every property at its default.
    #[must_use]
    pub fn new(class: &Arc<ModelClass>) -> Self {
        let mut obj = Self::allocate(class, make_id());
        obj.storage = Some(PropertyStore::new());
        obj.initialized = true;
        obj
    }

    /// Creates an instance, applying constructor values before it counts as
    /// initialized (so readonly properties may be given here).
    pub fn with_values<'a>(
        class: &Arc<ModelClass>,
        values: impl IntoIterator<Item = (&'a str, Init)>,
    ) -> Result<Self, ModelError> {
        let mut obj = Self::allocate(class, make_id());
        obj.initialize(values)?;
        Ok(obj)
    }

    /// Creates an instance shell with a known id and no storage.
    ///
    /// Every property access fails with
    /// [`ModelError::ConstructionOrder`] until [`initialize`](Self::initialize)
    /// runs. Deserializers use this to create every model of a document
    /// before filling in references between them.
    #[must_use]
    pub fn allocate(class: &Arc<ModelClass>, id: impl Into<Arc<str>>) -> Self {
        Self {
            id: id.into(),
            class: Arc::clone(class),
            storage: None,
            initialized: false,
            themed: None,
            sinks: Vec::new(),
        }
    }

    /// Creates storage, applies `values` and marks the instance initialized.
    pub fn initialize<'a>(
        &mut self,
        values: impl IntoIterator<Item = (&'a str, Init)>,
    ) -> Result<(), ModelError> {
        if self.storage.is_none() {
            self.storage = Some(PropertyStore::new());
        }
        for (name, init) in values {
            let Init::Value(value) = init else {
                continue;
            };
            let class = Arc::clone(&self.class);
            class.lookup(name)?.set(self, value, None)?;
        }
        self.initialized = true;
        Ok(())
    }

    /// Creates a new instance of the same class with the same explicit
    /// values.
    pub fn duplicate(&self) -> Result<Self, ModelError> {
        let storage = self.storage("attributes")?;
        let values: Vec<(Arc<str>, Value)> = storage
            .explicit_names()
            .filter_map(|name| Some((Arc::clone(name), storage.get(name, Layer::Explicit)?.clone())))
            .collect();
        Self::with_values(
            &self.class,
            values
                .iter()
                .map(|(name, value)| (&**name, Init::Value(value.clone()))),
        )
    }

    // =========================================================================
    // Identity
    // =========================================================================

    /// Returns the model id.
    #[must_use]
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the class.
    #[must_use]
    #[inline]
    pub fn class(&self) -> &Arc<ModelClass> {
        &self.class
    }

    /// Returns `true` once construction has finished.
    #[must_use]
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Returns a reference to this instance, for use as a property value.
    #[must_use]
    pub fn model_ref(&self) -> ModelRef {
        ModelRef::new(Arc::clone(&self.id), self.class.lineage().iter().cloned())
    }

    /// Attaches a change sink.
    pub fn subscribe(&mut self, sink: Arc<dyn ChangeSink>) {
        self.sinks.push(sink);
    }

    /// Detaches every change sink.
    pub fn clear_sinks(&mut self) {
        self.sinks.clear();
    }

    pub(crate) fn has_sinks(&self) -> bool {
        !self.sinks.is_empty()
    }

    // =========================================================================
    // Internal plumbing
    // =========================================================================

    pub(crate) fn storage(&self, name: &str) -> Result<&PropertyStore, ModelError> {
        self.storage
            .as_ref()
            .ok_or_else(|| self.construction_order(name))
    }

    pub(crate) fn storage_mut(&mut self, name: &str) -> Result<&mut PropertyStore, ModelError> {
        let err = self.construction_order(name);
        self.storage.as_mut().ok_or(err)
    }

    fn construction_order(&self, name: &str) -> ModelError {
        ModelError::ConstructionOrder {
            class: self.class.name().to_owned(),
            name: name.to_owned(),
        }
    }

    /// The cache layer used for `name`'s unstable default.
    pub(crate) fn unstable_layer(&self, name: &str) -> Layer {
        if self.themed_value(name).is_some() {
            Layer::UnstableThemed
        } else {
            Layer::UnstableDefault
        }
    }

    pub(crate) fn themed_value(&self, name: &str) -> Option<&Value> {
        self.themed.as_ref()?.get(name)
    }

    /// The storage slot currently backing `descriptor`, materializing the
    /// default in the cache layer when nothing is stored.
    pub(crate) fn slot_mut(&mut self, descriptor: &PropertyDescriptor) -> Result<&mut Value, ModelError> {
        let name = descriptor.name_arc();
        let storage = self.storage(name)?;
        let layer = if storage.contains(name, Layer::Explicit) {
            Layer::Explicit
        } else {
            self.unstable_layer(name)
        };
        let fallback = if storage.contains(name, layer) {
            None
        } else {
            Some(descriptor.get(self)?)
        };
        Ok(self
            .storage_mut(name)?
            .slot(name, layer, || fallback.unwrap_or_default()))
    }

    /// The stored value backing `name`, if any.
    pub(crate) fn stored_ref(&self, name: &str) -> Option<&Value> {
        let storage = self.storage.as_ref()?;
        storage
            .get(name, Layer::Explicit)
            .or_else(|| storage.get(name, self.unstable_layer(name)))
    }

    pub(crate) fn trigger(
        &self,
        attr: &Arc<str>,
        old: Option<Value>,
        new: Value,
        hint: Option<ChangeHint>,
        setter: Option<&Setter>,
    ) {
        trace!(model = %self.id, attr = %attr, "property changed");
        if self.sinks.is_empty() {
            return;
        }
        let change = PropertyChange {
            model: Arc::clone(&self.id),
            attr: Arc::clone(attr),
            old,
            new,
            hint,
            setter: setter.cloned(),
        };
        for sink in &self.sinks {
            sink.property_changed(&change);
        }
    }

    // =========================================================================
    // Attribute access
    // =========================================================================

    /// Returns the descriptor for `name`.
    pub fn lookup(&self, name: &str) -> Result<&PropertyDescriptor, ModelError> {
        self.class.lookup(name)
    }

    /// Returns the current value of `name`, caching unstable defaults.
    pub fn get(&mut self, name: &str) -> Result<Value, ModelError> {
        let class = Arc::clone(&self.class);
        class.lookup(name)?.get(self)
    }

    /// Returns the current value of `name` without touching the cache.
    pub fn resolve(&self, name: &str) -> Result<Value, ModelError> {
        self.lookup(name)?
            .resolve(self)?
            .ok_or_else(|| ModelError::UnsetValue {
                class: self.class.name().to_owned(),
                name: name.to_owned(),
            })
    }

    /// Sets `name`.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), ModelError> {
        let class = Arc::clone(&self.class);
        class.lookup(name)?.set(self, value.into(), None)
    }

    /// Sets `name`, tagging the change with its origin.
    pub fn set_with_setter(
        &mut self,
        name: &str,
        value: impl Into<Value>,
        setter: &Setter,
    ) -> Result<(), ModelError> {
        let class = Arc::clone(&self.class);
        class.lookup(name)?.set(self, value.into(), Some(setter))
    }

    /// Sets several properties in order.
    pub fn update<'a>(
        &mut self,
        values: impl IntoIterator<Item = (&'a str, Value)>,
    ) -> Result<(), ModelError> {
        for (name, value) in values {
            self.set(name, value)?;
        }
        Ok(())
    }

    /// Removes the explicit value of `name`.
    pub fn unset(&mut self, name: &str) -> Result<(), ModelError> {
        let class = Arc::clone(&self.class);
        class.lookup(name)?.unset(self)
    }

    /// Sets `name` from its wire form.
    ///
    /// Attributes the class does not declare are logged and ignored.
    pub fn set_from_json(
        &mut self,
        name: &str,
        json: &Json,
        models: Option<&ModelIndex>,
        setter: Option<&Setter>,
    ) -> Result<(), ModelError> {
        let class = Arc::clone(&self.class);
        let Some(descriptor) = class.descriptor(name) else {
            warn!(
                model = %self,
                attr = name,
                "JSON had an attribute that is client-only or invalid; ignoring it"
            );
            return Ok(());
        };
        trace!(model = %self, attr = name, json = %json, "patching attribute");
        descriptor.set_from_json(self, json, models, setter)
    }

    /// Sets every attribute of a wire attribute map.
    pub fn update_from_json(
        &mut self,
        attributes: &Map<String, Json>,
        models: Option<&ModelIndex>,
        setter: Option<&Setter>,
    ) -> Result<(), ModelError> {
        for (name, json) in attributes {
            self.set_from_json(name, json, models, setter)?;
        }
        Ok(())
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Returns every attribute name, own and inherited.
    pub fn properties(&self) -> impl Iterator<Item = &str> + '_ {
        self.class.properties()
    }

    /// Returns the data-spec properties.
    pub fn dataspecs(&self) -> impl Iterator<Item = (&str, &DataSpec)> + '_ {
        self.class.dataspecs()
    }

    /// Returns the descriptors whose values may hold model references.
    pub fn properties_with_refs(&self) -> impl Iterator<Item = &PropertyDescriptor> + '_ {
        self.class.properties_with_refs()
    }

    /// Returns the wire form of every serialized property.
    ///
    /// Without `include_defaults` only explicitly set, themed and generated
    /// values are included; untouched container defaults are skipped.
    /// Properties that have no value are always skipped.
    pub fn properties_with_values(&self, include_defaults: bool) -> Result<Map<String, Json>, ModelError> {
        let storage = self.storage("attributes")?;
        let mut result = Map::new();
        for descriptor in self.class.descriptors() {
            if !descriptor.is_serialized() {
                continue;
            }
            let name = descriptor.name();
            let wanted = include_defaults
                || storage.contains(name, Layer::Explicit)
                || self.themed_value(name).is_some()
                || (storage.contains(name, Layer::UnstableDefault)
                    && !descriptor.property().kind().is_container());
            if !wanted {
                continue;
            }
            if let Some(json) = descriptor.serializable_value(self)? {
                result.insert(name.to_owned(), json);
            }
        }
        Ok(result)
    }

    /// The object representation:
    /// `{"type": "object", "name", "id", "attributes"}`.
    ///
    /// `attributes` holds the non-default values and is omitted when empty.
    pub fn to_serializable(&self) -> Result<Json, ModelError> {
        let attributes = self.properties_with_values(false)?;
        let mut rep = Map::new();
        rep.insert("type".to_owned(), Json::from("object"));
        rep.insert("name".to_owned(), Json::from(self.class.name()));
        rep.insert("id".to_owned(), Json::from(&*self.id));
        if !attributes.is_empty() {
            rep.insert("attributes".to_owned(), Json::Object(attributes));
        }
        Ok(Json::Object(rep))
    }

    /// Structural equality: same class and every property value matches.
    #[must_use]
    pub fn equals(&self, other: &Self) -> bool {
        if self.class.name() != other.class.name() {
            return false;
        }
        self.class.descriptors().all(|descriptor| {
            match (descriptor.resolve(self), descriptor.resolve(other)) {
                (Ok(Some(a)), Ok(Some(b))) => descriptor.property().matches(&a, &b),
                (Ok(None), Ok(None)) => true,
                _ => false,
            }
        })
    }

    /// Returns the models referenced by this instance's property values,
    /// without duplicates.
    pub fn references(&self) -> Result<Vec<ModelRef>, ModelError> {
        let mut found: IndexSet<ModelRef> = IndexSet::new();
        for descriptor in self.class.properties_with_refs() {
            if let Some(value) = descriptor.resolve(self)? {
                collect_refs(&value, &mut found);
            }
        }
        Ok(found.into_iter().collect())
    }

    // =========================================================================
    // Theming
    // =========================================================================

    /// Returns the applied theme values.
    #[must_use]
    pub fn themed_values(&self) -> Option<&ThemedValues> {
        self.themed.as_ref()
    }

    /// Uses `values` in place of class defaults.
    ///
    /// Explicitly set values are never affected. A change is reported for
    /// each attribute whose resolved value changes.
    pub fn apply_theme(&mut self, values: ThemedValues) -> Result<(), ModelError> {
        if let Some(current) = &self.themed
            && current.ptr_eq(&values)
        {
            return Ok(());
        }

        let class = Arc::clone(&self.class);
        let mut names: IndexSet<&str> = IndexSet::new();
        if let Some(current) = &self.themed {
            names.extend(current.names());
        }
        names.extend(values.names());

        let mut old_values = Vec::with_capacity(names.len());
        for name in names {
            let Some(descriptor) = class.descriptor(name) else {
                continue;
            };
            old_values.push((descriptor, descriptor.resolve(self)?));
        }

        debug!(model = %self.id, themed = values.len(), "applying theme");
        self.themed = (!values.is_empty()).then_some(values);

        let storage = self.storage_mut("attributes")?;
        for (descriptor, _) in &old_values {
            storage.clear(descriptor.name(), Layer::UnstableThemed);
        }
        for (descriptor, old) in old_values {
            descriptor.trigger_if_changed(self, old)?;
        }
        Ok(())
    }

    /// Removes the theme, restoring class defaults.
    pub fn unapply_theme(&mut self) -> Result<(), ModelError> {
        self.apply_theme(ThemedValues::default())
    }
}

fn collect_refs(value: &Value, found: &mut IndexSet<ModelRef>) {
    match value {
        Value::Model(model) => {
            found.insert(model.clone());
        }
        Value::List(items) | Value::Tuple(items) => {
            for item in items {
                collect_refs(item, found);
            }
        }
        Value::Dict(map) => {
            for item in map.values() {
                collect_refs(item, found);
            }
        }
        _ => {}
    }
}

impl PropertyOwner for HasProps {
    fn type_name(&self) -> &str {
        self.class.name()
    }

    fn property_value(&self, name: &str) -> Option<Value> {
        self.lookup(name).ok()?.resolve(self).ok().flatten()
    }
}

impl fmt::Debug for HasProps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HasProps")
            .field("id", &self.id)
            .field("class", &self.class.name())
            .field("initialized", &self.initialized)
            .field("explicit", &self.storage.as_ref().map(PropertyStore::len))
            .field("themed", &self.themed.as_ref().map(ThemedValues::len))
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl fmt::Display for HasProps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(id={:?})", self.class.name(), self.id)
    }
}
