// Copyright 2025 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property descriptors: the binding between a declared [`Property`] and
//! instance storage.
//!
//! A class owns one [`PropertyDescriptor`] per attribute name. Every read
//! and write of an instance attribute goes through it:
//!
//! - **Unset** attributes resolve to the themed or class default. Unstable
//!   defaults (containers and generated values) are cached per instance so
//!   later reads and in-place mutations see the same value.
//! - **Set** attributes return the stored value.
//!
//! Setting prepares the value, compares it with the current one and only
//! stores and notifies when it changed (or when a change hint forces it).

use std::borrow::Cow;
use std::mem;
use std::sync::Arc;

use serde_json::Value as Json;
use vellum_property::{ModelIndex, Owner, Property, PropertyError, Value, units_name};

use crate::class::ModelClass;
use crate::error::ModelError;
use crate::events::{ChangeHint, Setter};
use crate::has_props::HasProps;
use crate::store::Layer;

/// How a descriptor treats its property.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DescriptorKind {
    /// Plain get/set.
    Basic,
    /// A data spec: serialized through
    /// [`DataSpec::to_serializable`](vellum_property::DataSpec::to_serializable)
    /// and decoded with format preservation.
    DataSpec,
    /// A data spec with a sibling units attribute.
    UnitsSpec {
        /// The name of the sibling units attribute.
        units: Arc<str>,
    },
    /// Column data: direct sets always carry a
    /// [`ColumnDataChanged`](ChangeHint::ColumnDataChanged) hint.
    ColumnData,
}

/// The accessor for one attribute of a model class.
#[derive(Clone, Debug)]
pub struct PropertyDescriptor {
    name: Arc<str>,
    property: Property,
    kind: DescriptorKind,
}

/// Creates the descriptors a declared property installs on its class.
///
/// Unit-bearing data specs produce two: the `<name>_units` enum descriptor
/// followed by the spec itself. Everything else produces one.
#[must_use]
pub fn make_descriptors(name: &str, property: &Property) -> Vec<PropertyDescriptor> {
    let name: Arc<str> = name.into();
    let Some(spec) = property.as_dataspec() else {
        let kind = if property.kind().is_column_data() {
            DescriptorKind::ColumnData
        } else {
            DescriptorKind::Basic
        };
        return vec![PropertyDescriptor::new(name, property.clone(), kind)];
    };
    match spec.units() {
        Some(units) => {
            let units_attr: Arc<str> = units_name(&name).into();
            vec![
                PropertyDescriptor::new(
                    Arc::clone(&units_attr),
                    units.property().clone(),
                    DescriptorKind::Basic,
                ),
                PropertyDescriptor::new(
                    name,
                    property.clone(),
                    DescriptorKind::UnitsSpec { units: units_attr },
                ),
            ]
        }
        None => vec![PropertyDescriptor::new(
            name,
            property.clone(),
            DescriptorKind::DataSpec,
        )],
    }
}

impl PropertyDescriptor {
    /// Creates a descriptor.
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>, property: Property, kind: DescriptorKind) -> Self {
        Self {
            name: name.into(),
            property,
            kind,
        }
    }

    /// Returns the attribute name.
    #[must_use]
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn name_arc(&self) -> &Arc<str> {
        &self.name
    }

    /// Returns the property.
    #[must_use]
    #[inline]
    pub fn property(&self) -> &Property {
        &self.property
    }

    /// Returns the descriptor flavor.
    #[must_use]
    #[inline]
    pub fn kind(&self) -> &DescriptorKind {
        &self.kind
    }

    /// Returns `true` if the property is readonly.
    #[must_use]
    pub fn is_readonly(&self) -> bool {
        self.property.is_readonly()
    }

    /// Returns `true` if the property is serialized.
    #[must_use]
    pub fn is_serialized(&self) -> bool {
        self.property.is_serialized()
    }

    /// Returns `true` if values may hold model references.
    #[must_use]
    pub fn has_ref(&self) -> bool {
        self.property.has_ref()
    }

    fn is_dataspec(&self) -> bool {
        matches!(self.kind, DescriptorKind::DataSpec | DescriptorKind::UnitsSpec { .. })
    }

    // =========================================================================
    // Defaults
    // =========================================================================

    /// The default for instances of `class`, ignoring themes.
    ///
    /// Class overrides replace the declared default. Returns `None` when the
    /// property has no default.
    pub fn class_default(&self, class: &ModelClass) -> Result<Option<Value>, ModelError> {
        let raw = match class.overridden_default(&self.name) {
            Some(value) => Some(value.clone()),
            None => self.property.raw_default(),
        };
        self.prepare_default(class, raw)
    }

    /// The default for `obj`: its theme value if any, else the class default.
    pub fn instance_default(&self, obj: &HasProps) -> Result<Option<Value>, ModelError> {
        match obj.themed_value(&self.name) {
            Some(value) => self.prepare_default(obj.class(), Some(value.clone())),
            None => self.class_default(obj.class()),
        }
    }

    fn prepare_default(&self, class: &ModelClass, raw: Option<Value>) -> Result<Option<Value>, ModelError> {
        let Some(raw) = raw else {
            return Ok(None);
        };
        let value = self
            .property
            .prepare_value(Owner::Class(class.name()), &self.name, raw)?;
        Ok(Some(value))
    }

    // =========================================================================
    // Reads
    // =========================================================================

    fn stored(&self, obj: &HasProps) -> Result<Option<Value>, ModelError> {
        let storage = obj.storage(&self.name)?;
        if let Some(value) = storage.get(&self.name, Layer::Explicit) {
            return Ok(Some(value.clone()));
        }
        Ok(storage
            .get(&self.name, obj.unstable_layer(&self.name))
            .cloned())
    }

    /// Resolves the current value without caching unstable defaults.
    ///
    /// Returns `None` when the attribute is unset and has no default.
    pub fn resolve(&self, obj: &HasProps) -> Result<Option<Value>, ModelError> {
        match self.stored(obj)? {
            Some(value) => Ok(Some(value)),
            None => self.instance_default(obj),
        }
    }

    /// Resolves the current value, caching an unstable default in `obj`.
    fn lookup_value(&self, obj: &mut HasProps) -> Result<Option<Value>, ModelError> {
        if let Some(value) = self.stored(obj)? {
            return Ok(Some(value));
        }
        let default = self.instance_default(obj)?;
        if let Some(default) = &default
            && self.property.may_have_unstable_default()
        {
            let layer = obj.unstable_layer(&self.name);
            obj.storage_mut(&self.name)?
                .set(&self.name, layer, default.clone());
        }
        Ok(default)
    }

    /// Returns the current value of the attribute on `obj`.
    pub fn get(&self, obj: &mut HasProps) -> Result<Value, ModelError> {
        self.lookup_value(obj)?
            .ok_or_else(|| ModelError::UnsetValue {
                class: obj.class().name().to_owned(),
                name: self.name.to_string(),
            })
    }

    /// The wire form of the current value, or `None` when it is unset and
    /// has no default.
    pub fn serializable_value(&self, obj: &HasProps) -> Result<Option<Json>, ModelError> {
        let Some(value) = self.resolve(obj)? else {
            return Ok(None);
        };
        let json = match self.property.as_dataspec() {
            Some(spec) if self.is_dataspec() => spec.to_serializable(obj, &self.name, &value),
            _ => self.property.serialize_value(&value),
        };
        Ok(Some(json))
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Sets the attribute on `obj`.
    ///
    /// Readonly properties can only be set while `obj` is being constructed.
    /// Unit-bearing specs route a `units` key of a dict value to the sibling
    /// units attribute.
    pub fn set(&self, obj: &mut HasProps, value: Value, setter: Option<&Setter>) -> Result<(), ModelError> {
        obj.storage(&self.name)?;
        if self.property.is_readonly() && obj.is_initialized() {
            return Err(ModelError::ReadonlyViolation {
                class: obj.class().name().to_owned(),
                name: self.name.to_string(),
            });
        }
        let value = self.extract_units(obj, value, setter)?;
        let hint = matches!(self.kind, DescriptorKind::ColumnData)
            .then_some(ChangeHint::ColumnDataChanged { cols: None });
        self.internal_set(obj, value, hint, setter)
    }

    /// Sets the attribute from its wire form.
    ///
    /// Readonly properties accept wire updates. Data specs keep the format
    /// of the previous value: a plain value stays plain when the update is
    /// `{"value": ...}`, and a field name stays bare when it is
    /// `{"field": ...}`.
    pub fn set_from_json(
        &self,
        obj: &mut HasProps,
        json: &Json,
        models: Option<&ModelIndex>,
        setter: Option<&Setter>,
    ) -> Result<(), ModelError> {
        obj.storage(&self.name)?;
        let json = self.extract_json_units(obj, json, setter)?;
        let json = self.preserve_format(obj, json)?;
        let value = self
            .property
            .from_json(&json, models)
            .map_err(PropertyError::from)?;
        self.internal_set(obj, value, None, setter)
    }

    /// Removes the explicit value, notifying if the resolved value changes.
    pub fn unset(&self, obj: &mut HasProps) -> Result<(), ModelError> {
        let storage = obj.storage_mut(&self.name)?;
        let old = storage.clear(&self.name, Layer::Explicit);
        storage.clear(&self.name, Layer::UnstableDefault);
        match old {
            Some(old) => self.trigger_if_changed(obj, Some(old)),
            None => Ok(()),
        }
    }

    /// Re-prepares the current value after an in-place mutation and
    /// notifies with `hint`.
    ///
    /// `old` is a snapshot taken before the mutation. The mutated value is
    /// moved out of storage while it is re-prepared, so on error the slot is
    /// left empty and the caller must restore `old`.
    pub fn notify_mutated(
        &self,
        obj: &mut HasProps,
        old: &Value,
        hint: Option<ChangeHint>,
    ) -> Result<(), ModelError> {
        let current = mem::take(obj.slot_mut(self)?);
        let value = self
            .property
            .prepare_value(Owner::Instance(&*obj), &self.name, current)?;
        if hint.is_none() && self.property.matches(&value, old) {
            *obj.slot_mut(self)? = value;
            return Ok(());
        }
        let new = obj.has_sinks().then(|| value.clone());
        obj.storage_mut(&self.name)?
            .set_explicit(&self.name, value);
        if let Some(new) = new {
            obj.trigger(&self.name, Some(old.clone()), new, hint, None);
        }
        Ok(())
    }

    fn internal_set(
        &self,
        obj: &mut HasProps,
        value: Value,
        hint: Option<ChangeHint>,
        setter: Option<&Setter>,
    ) -> Result<(), ModelError> {
        let value = self
            .property
            .prepare_value(Owner::Instance(&*obj), &self.name, value)?;
        let old = self.lookup_value(obj)?;
        self.real_set(obj, old, value, hint, setter)
    }

    fn real_set(
        &self,
        obj: &mut HasProps,
        old: Option<Value>,
        value: Value,
        hint: Option<ChangeHint>,
        setter: Option<&Setter>,
    ) -> Result<(), ModelError> {
        if hint.is_none()
            && let Some(old) = &old
            && self.property.matches(&value, old)
        {
            return Ok(());
        }
        let new = obj.has_sinks().then(|| value.clone());
        obj.storage_mut(&self.name)?
            .set_explicit(&self.name, value);
        if let Some(new) = new {
            obj.trigger(&self.name, old, new, hint, setter);
        }
        Ok(())
    }

    pub(crate) fn trigger_if_changed(&self, obj: &mut HasProps, old: Option<Value>) -> Result<(), ModelError> {
        let Some(new) = self.lookup_value(obj)? else {
            return Ok(());
        };
        if old.as_ref().is_some_and(|old| self.property.matches(&new, old)) {
            return Ok(());
        }
        obj.trigger(&self.name, old, new, None, None);
        Ok(())
    }

    // =========================================================================
    // Data spec helpers
    // =========================================================================

    fn units_descriptor(&self, obj: &HasProps) -> Option<(Arc<ModelClass>, Arc<str>)> {
        match &self.kind {
            DescriptorKind::UnitsSpec { units } => Some((Arc::clone(obj.class()), Arc::clone(units))),
            _ => None,
        }
    }

    fn extract_units(&self, obj: &mut HasProps, value: Value, setter: Option<&Setter>) -> Result<Value, ModelError> {
        let Some((class, units)) = self.units_descriptor(obj) else {
            return Ok(value);
        };
        let Value::Dict(mut map) = value else {
            return Ok(value);
        };
        if let Some(unit) = map.shift_remove("units")
            && is_truthy(&unit)
        {
            class.lookup(&units)?.set(obj, unit, setter)?;
        }
        Ok(Value::Dict(map))
    }

    fn extract_json_units<'j>(
        &self,
        obj: &mut HasProps,
        json: &'j Json,
        setter: Option<&Setter>,
    ) -> Result<Cow<'j, Json>, ModelError> {
        let Some((class, units)) = self.units_descriptor(obj) else {
            return Ok(Cow::Borrowed(json));
        };
        let Some(map) = json.as_object().filter(|map| map.contains_key("units")) else {
            return Ok(Cow::Borrowed(json));
        };
        let mut map = map.clone();
        if let Some(unit) = map.remove("units") {
            let unit = Value::from(unit);
            if is_truthy(&unit) {
                class.lookup(&units)?.set(obj, unit, setter)?;
            }
        }
        Ok(Cow::Owned(Json::Object(map)))
    }

    fn preserve_format<'j>(&self, obj: &HasProps, json: Cow<'j, Json>) -> Result<Cow<'j, Json>, ModelError> {
        let Some(spec) = self.property.as_dataspec().filter(|_| self.is_dataspec()) else {
            return Ok(json);
        };
        let unwrapped = match &*json {
            Json::Object(map) => match self.resolve(obj)?.filter(|old| !old.is_null()) {
                Some(old) if spec.value_type().is_valid(&old) => map.get("value").cloned(),
                Some(Value::String(_)) => map.get("field").cloned(),
                _ => None,
            },
            _ => None,
        };
        Ok(unwrapped.map_or(json, Cow::Owned))
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}
