// Copyright 2025 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Model references and the lazy type-name table.
//!
//! [`Instance`] properties name the model type they accept as a string, so
//! declarations can refer to types that are registered later. Names are
//! bound through a process-wide table the first time an `Instance` needs
//! them; unknown names fail with [`PropertyError::UnknownType`].

use std::fmt;
use std::sync::{Arc, LazyLock, OnceLock};

use hashbrown::HashMap;
use parking_lot::RwLock;
use serde_json::Value as Json;
use tracing::debug;

use crate::error::{DeserializationError, PropertyError, ValidationError};
use crate::property::{Property, PropertyKind};
use crate::value::{ModelIndex, Value};

static TYPES: LazyLock<RwLock<HashMap<Arc<str>, Arc<str>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Registers a model type under its short name and, optionally, a qualified
/// name such as `"models.Transform"`.
///
/// Both names resolve to the short name, which is what
/// [`ModelRef::is_instance_of`](crate::ModelRef::is_instance_of) checks.
/// Registering a name again replaces the previous binding.
pub fn register_type(name: &str, qualified: Option<&str>) {
    let canonical: Arc<str> = name.into();
    let mut types = TYPES.write();
    if let Some(qualified) = qualified {
        types.insert(qualified.into(), canonical.clone());
    }
    types.insert(canonical.clone(), canonical);
    debug!(name, qualified, "registered model type");
}

/// Resolves a short or qualified type name to the registered short name.
pub fn resolve_type(name: &str) -> Result<Arc<str>, PropertyError> {
    TYPES
        .read()
        .get(name)
        .cloned()
        .ok_or_else(|| PropertyError::UnknownType(name.to_owned()))
}

/// Returns `true` if `name` has been registered.
#[must_use]
pub fn is_registered(name: &str) -> bool {
    TYPES.read().contains_key(name)
}

/// A reference to a model of a named type or one of its subclasses.
///
/// The type name is resolved on first use and cached.
#[derive(Clone, Debug)]
pub struct Instance {
    type_name: Arc<str>,
    resolved: OnceLock<Arc<str>>,
}

impl Instance {
    /// Accepts models whose class lineage contains `type_name`.
    #[must_use]
    pub fn new(type_name: impl Into<Arc<str>>) -> Self {
        Self {
            type_name: type_name.into(),
            resolved: OnceLock::new(),
        }
    }

    /// The type name as declared.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Binds the declared name through the type table.
    pub fn resolve(&self) -> Result<&str, PropertyError> {
        if let Some(resolved) = self.resolved.get() {
            return Ok(&**resolved);
        }
        let resolved = resolve_type(&self.type_name)?;
        Ok(&**self.resolved.get_or_init(|| resolved))
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instance({})", self.type_name)
    }
}

impl PropertyKind for Instance {
    fn validate(&self, value: &Value, detail: bool) -> Result<(), ValidationError> {
        let Value::Model(model) = value else {
            return Err(ValidationError::detailed(detail, || {
                format!(
                    "expected an instance of type {}, got {value} of type {}",
                    self.type_name,
                    value.type_name()
                )
            }));
        };
        let resolved = self
            .resolve()
            .map_err(|err| ValidationError::detailed(detail, || err.to_string()))?;
        if model.is_instance_of(resolved) {
            Ok(())
        } else {
            Err(ValidationError::detailed(detail, || {
                format!(
                    "expected an instance of type {}, got {model} of type {}",
                    self.type_name,
                    model.type_name()
                )
            }))
        }
    }

    fn from_json(&self, json: &Json, models: Option<&ModelIndex>) -> Result<Value, DeserializationError> {
        match json {
            Json::Null => Ok(Value::Null),
            Json::Object(map) => {
                let id = map.get("id").and_then(Json::as_str).ok_or_else(|| {
                    DeserializationError::new(format!("{self} expected a reference, got {json}"))
                })?;
                models
                    .and_then(|models| models.get(id))
                    .cloned()
                    .map(Value::Model)
                    .ok_or_else(|| {
                        DeserializationError::new(format!(
                            "{self} failed to deserialize reference to {json}"
                        ))
                    })
            }
            _ => Err(DeserializationError::new(format!(
                "{self} expected a reference, got {json}"
            ))),
        }
    }

    fn has_ref(&self) -> bool {
        true
    }
}

/// Shorthand for `Property::new(Instance::new(type_name))`.
#[must_use]
pub fn instance(type_name: &str) -> Property {
    Property::new(Instance::new(type_name))
}
