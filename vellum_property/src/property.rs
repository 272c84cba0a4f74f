// Copyright 2025 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property type descriptors.
//!
//! A [`Property`] pairs a [`PropertyKind`] (the type contract: validation,
//! canonicalization and wire conversion) with declaration-time settings:
//! default value, flags, help text, alternatives and assertions.
//!
//! Properties never hold instance data. They are shared by every instance of
//! the classes that declare them.

use std::fmt;
use std::sync::Arc;

use serde_json::Value as Json;
use tracing::trace;

use crate::dataspec::DataSpec;
use crate::error::{DeserializationError, PropertyError, ValidationError};
use crate::validation::validation_enabled;
use crate::value::{ModelIndex, Value};

/// The type contract of a property.
///
/// Only [`validate`](Self::validate) is usually overridden; every other
/// method has a sensible default.
pub trait PropertyKind: fmt::Debug + fmt::Display + Send + Sync + 'static {
    /// Checks `value` against the type rules.
    ///
    /// With `detail == false` implementations should return terse errors.
    fn validate(&self, value: &Value, detail: bool) -> Result<(), ValidationError> {
        let _ = (value, detail);
        Ok(())
    }

    /// Canonicalizes a value already known to be valid.
    fn transform(&self, value: Value) -> Value {
        value
    }

    /// Runs before validation in [`Property::prepare_value`].
    ///
    /// Used by kinds that coerce convenience forms into shapes validation
    /// understands, or that reject values outright.
    fn preprocess(&self, value: Value) -> Result<Value, ValidationError> {
        Ok(value)
    }

    /// Decodes a wire value.
    fn from_json(&self, json: &Json, models: Option<&ModelIndex>) -> Result<Value, DeserializationError> {
        let _ = models;
        Ok(Value::from(json))
    }

    /// Encodes a value for the wire.
    fn serialize_value(&self, value: &Value) -> Json {
        value.to_json()
    }

    /// Compares values for change suppression.
    fn matches(&self, new: &Value, old: &Value) -> bool {
        new.matches(old)
    }

    /// Nested properties this kind is built from.
    fn type_params(&self) -> &[Property] {
        &[]
    }

    /// Returns `true` if values of this kind may hold model references.
    fn has_ref(&self) -> bool {
        self.type_params().iter().any(Property::has_ref)
    }

    /// Returns `true` for list- and dict-like kinds, whose defaults must be
    /// copied per instance.
    fn is_container(&self) -> bool {
        false
    }

    /// Returns `true` for column-data kinds, which get columnar mutation
    /// support on instances.
    fn is_column_data(&self) -> bool {
        false
    }

    /// The value used when a property is declared without a default.
    fn intrinsic_default(&self) -> Option<Value> {
        None
    }

    /// Alternatives installed whenever a property of this kind is created.
    fn default_alternatives(&self) -> Vec<Alternative> {
        Vec::new()
    }

    /// Returns the data-spec description of this kind, if it is one.
    fn as_dataspec(&self) -> Option<&DataSpec> {
        None
    }
}

/// An object that owns property values, seen from a property's assertions.
pub trait PropertyOwner {
    /// The class name of the owner.
    fn type_name(&self) -> &str;

    /// The current value of another property on the same owner.
    fn property_value(&self, name: &str) -> Option<Value>;
}

/// Who a value is being prepared for.
#[derive(Clone, Copy)]
pub enum Owner<'a> {
    /// A class, when resolving class-level defaults.
    Class(&'a str),
    /// A live instance; assertions only run for instances.
    Instance(&'a dyn PropertyOwner),
}

impl<'a> Owner<'a> {
    /// Returns the owner's class name.
    #[must_use]
    pub fn type_name(&self) -> &'a str {
        match *self {
            Self::Class(name) => name,
            Self::Instance(owner) => owner.type_name(),
        }
    }

    /// Returns the instance, if the owner is one.
    #[must_use]
    pub fn instance(&self) -> Option<&'a dyn PropertyOwner> {
        match *self {
            Self::Class(_) => None,
            Self::Instance(owner) => Some(owner),
        }
    }
}

impl fmt::Debug for Owner<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class(name) => f.debug_tuple("Class").field(name).finish(),
            Self::Instance(owner) => f.debug_tuple("Instance").field(&owner.type_name()).finish(),
        }
    }
}

impl fmt::Display for Owner<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Converts a value accepted by an alternative into the property's own type.
pub type Converter = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Produces a fresh default value for each instance.
pub type DefaultGenerator = Arc<dyn Fn() -> Value + Send + Sync>;

type Predicate = Arc<dyn Fn(&dyn PropertyOwner, &Value) -> bool + Send + Sync>;
type Checker = Arc<dyn Fn(&dyn PropertyOwner, &str, &Value) -> Option<String> + Send + Sync>;

/// A fallback type tried when direct validation fails.
#[derive(Clone)]
pub struct Alternative {
    fallback: Property,
    converter: Converter,
}

impl Alternative {
    /// Accepts values valid for `fallback`, converting them with `converter`.
    pub fn new(
        fallback: impl Into<Property>,
        converter: impl Fn(Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        Self {
            fallback: fallback.into(),
            converter: Arc::new(converter),
        }
    }

    /// The fallback property.
    #[must_use]
    pub fn fallback(&self) -> &Property {
        &self.fallback
    }
}

impl fmt::Debug for Alternative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Alternative")
            .field("fallback", &self.fallback.to_string())
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
enum Assertion {
    Predicate { check: Predicate, message: Arc<str> },
    Checker(Checker),
}

impl Assertion {
    fn run(&self, owner: &dyn PropertyOwner, name: &str, value: &Value) -> Result<(), PropertyError> {
        match self {
            Self::Predicate { check, message } => {
                if check(owner, value) {
                    Ok(())
                } else {
                    Err(PropertyError::Assertion(message.to_string()))
                }
            }
            Self::Checker(checker) => match checker(owner, name, value) {
                None => Ok(()),
                Some(message) => Err(PropertyError::Assertion(message)),
            },
        }
    }
}

/// How a property obtains its default value.
#[derive(Clone)]
pub enum DefaultValue {
    /// The kind's own default, or null if it has none.
    ///
    /// Kinds that need an explicit value start out [`Undefined`](Self::Undefined).
    Intrinsic,
    /// A fixed value.
    Value(Value),
    /// A generator called once per instance.
    Generator(DefaultGenerator),
    /// No default: reading an unset value is an error.
    Undefined,
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Intrinsic => f.write_str("Intrinsic"),
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Generator(_) => f.write_str("Generator"),
            Self::Undefined => f.write_str("Undefined"),
        }
    }
}

bitflags::bitflags! {
    /// Declaration flags of a [`Property`].
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct PropertyFlags: u8 {
        /// Direct sets are refused once the owning instance is initialized.
        const READONLY   = 0b0000_0001;
        /// The value is included in serialized attributes.
        const SERIALIZED = 0b0000_0010;
    }
}

impl Default for PropertyFlags {
    fn default() -> Self {
        Self::SERIALIZED
    }
}

/// A property type descriptor.
///
/// Built from a [`PropertyKind`] and configured with builder methods. All
/// methods that change the default validate it immediately.
///
/// # Example
///
/// ```rust
/// use vellum_property::{Float, Int, Owner, Property, Value};
///
/// let width = Property::new(Float)
///     .with_default(1.5)
///     .unwrap()
///     .help("Width of the stroke, in pixels.");
///
/// assert_eq!(width.raw_default(), Some(Value::Float(1.5)));
/// assert!(Property::new(Int).with_default("wide").is_err());
///
/// let prepared = width.prepare_value(Owner::Class("Line"), "width", Value::Int(3));
/// assert_eq!(prepared, Ok(Value::Int(3)));
/// ```
#[derive(Clone)]
pub struct Property {
    kind: Arc<dyn PropertyKind>,
    default: DefaultValue,
    help: Option<Arc<str>>,
    flags: PropertyFlags,
    alternatives: Vec<Alternative>,
    assertions: Vec<Assertion>,
}

impl Property {
    /// Creates a property of `kind` with its intrinsic default.
    ///
    /// Kinds without an intrinsic default that also reject null (such as
    /// [`Instance`](crate::Instance)) start out undefined.
    #[must_use]
    pub fn new(kind: impl PropertyKind) -> Self {
        let alternatives = kind.default_alternatives();
        let default = if kind.intrinsic_default().is_none() && kind.validate(&Value::Null, false).is_err() {
            DefaultValue::Undefined
        } else {
            DefaultValue::Intrinsic
        };
        Self {
            kind: Arc::new(kind),
            default,
            help: None,
            flags: PropertyFlags::default(),
            alternatives,
            assertions: Vec::new(),
        }
    }

    /// Sets a fixed default, validating it.
    pub fn with_default(mut self, value: impl Into<Value>) -> Result<Self, PropertyError> {
        let value = value.into();
        self.check_default(&value)?;
        self.default = DefaultValue::Value(value);
        Ok(self)
    }

    /// Sets a default the caller has already checked.
    pub(crate) fn with_checked_default(mut self, value: Value) -> Self {
        self.default = DefaultValue::Value(value);
        self
    }

    /// Sets a generated default, validating one generated value.
    pub fn with_default_fn(
        mut self,
        generator: impl Fn() -> Value + Send + Sync + 'static,
    ) -> Result<Self, PropertyError> {
        self.check_default(&generator())?;
        self.default = DefaultValue::Generator(Arc::new(generator));
        Ok(self)
    }

    /// Removes the default: reading the property before setting it fails.
    #[must_use]
    pub fn undefined(mut self) -> Self {
        self.default = DefaultValue::Undefined;
        self
    }

    /// Marks the property readonly.
    #[must_use]
    pub fn readonly(mut self) -> Self {
        self.flags.insert(PropertyFlags::READONLY);
        self
    }

    /// Excludes the property from serialized attributes.
    #[must_use]
    pub fn not_serialized(mut self) -> Self {
        self.flags.remove(PropertyFlags::SERIALIZED);
        self
    }

    /// Attaches documentation.
    #[must_use]
    pub fn help(mut self, text: impl Into<Arc<str>>) -> Self {
        self.help = Some(text.into());
        self
    }

    /// Accepts values of `fallback` when direct validation fails, converting
    /// them with `converter`.
    ///
    /// Alternatives are tried in the order they were added.
    #[must_use]
    pub fn accepts(
        mut self,
        fallback: impl Into<Property>,
        converter: impl Fn(Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.alternatives.push(Alternative::new(fallback, converter));
        self
    }

    /// Requires `check` to hold for values set on instances.
    #[must_use]
    pub fn asserts(
        mut self,
        check: impl Fn(&dyn PropertyOwner, &Value) -> bool + Send + Sync + 'static,
        message: impl Into<Arc<str>>,
    ) -> Self {
        self.assertions.push(Assertion::Predicate {
            check: Arc::new(check),
            message: message.into(),
        });
        self
    }

    /// Runs `checker` for values set on instances; a returned message
    /// rejects the value.
    #[must_use]
    pub fn asserts_with(
        mut self,
        checker: impl Fn(&dyn PropertyOwner, &str, &Value) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.assertions.push(Assertion::Checker(Arc::new(checker)));
        self
    }

    fn check_default(&self, value: &Value) -> Result<(), PropertyError> {
        if !validation_enabled() {
            return Ok(());
        }
        let invalid = |source| PropertyError::InvalidDefault {
            property: self.to_string(),
            source,
        };
        let value = self.kind.preprocess(value.clone()).map_err(invalid)?;
        match self.kind.validate(&value, true) {
            Ok(()) => Ok(()),
            Err(_) if self.alternatives.iter().any(|alt| alt.fallback.is_valid(&value)) => Ok(()),
            Err(err) => Err(invalid(err)),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Returns the type contract.
    #[must_use]
    #[inline]
    pub fn kind(&self) -> &dyn PropertyKind {
        &*self.kind
    }

    /// Returns how the default is produced.
    #[must_use]
    #[inline]
    pub fn default_value(&self) -> &DefaultValue {
        &self.default
    }

    /// Returns the declaration flags.
    #[must_use]
    #[inline]
    pub fn flags(&self) -> PropertyFlags {
        self.flags
    }

    /// Returns `true` if the property is readonly.
    #[must_use]
    #[inline]
    pub fn is_readonly(&self) -> bool {
        self.flags.contains(PropertyFlags::READONLY)
    }

    /// Returns `true` if the property is serialized.
    #[must_use]
    #[inline]
    pub fn is_serialized(&self) -> bool {
        self.flags.contains(PropertyFlags::SERIALIZED)
    }

    /// Returns the help text.
    #[must_use]
    pub fn help_text(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// Returns the registered alternatives, in trial order.
    #[must_use]
    pub fn alternatives(&self) -> &[Alternative] {
        &self.alternatives
    }

    /// Returns nested properties.
    #[must_use]
    pub fn type_params(&self) -> &[Self] {
        self.kind.type_params()
    }

    /// Returns `true` if values may hold model references.
    #[must_use]
    pub fn has_ref(&self) -> bool {
        self.kind.has_ref()
    }

    /// Returns the data-spec description, if this is a data-spec property.
    #[must_use]
    pub fn as_dataspec(&self) -> Option<&DataSpec> {
        self.kind.as_dataspec()
    }

    /// Produces the unprepared default, or `None` for undefined defaults.
    ///
    /// Generated defaults call the generator every time.
    #[must_use]
    pub fn raw_default(&self) -> Option<Value> {
        match &self.default {
            DefaultValue::Intrinsic => Some(self.kind.intrinsic_default().unwrap_or_default()),
            DefaultValue::Value(value) => Some(value.clone()),
            DefaultValue::Generator(generator) => Some(generator()),
            DefaultValue::Undefined => None,
        }
    }

    /// Returns `true` if instances need their own copy of the default.
    #[must_use]
    pub fn may_have_unstable_default(&self) -> bool {
        matches!(self.default, DefaultValue::Generator(_)) || self.kind.is_container()
    }

    // =========================================================================
    // Type contract
    // =========================================================================

    /// Checks `value` against the type rules.
    pub fn validate(&self, value: &Value, detail: bool) -> Result<(), ValidationError> {
        self.kind.validate(value, detail)
    }

    /// Returns `true` if `value` passes validation.
    #[must_use]
    pub fn is_valid(&self, value: &Value) -> bool {
        self.kind.validate(value, false).is_ok()
    }

    /// Canonicalizes a valid value.
    #[must_use]
    pub fn transform(&self, value: Value) -> Value {
        self.kind.transform(value)
    }

    /// Validates, converts and checks a value about to be stored.
    ///
    /// The pipeline is: kind preprocessing, validation (skipped when
    /// validation is disabled on this thread), alternative search on failure,
    /// transformation, then assertions when `owner` is an instance.
    pub fn prepare_value(&self, owner: Owner<'_>, name: &str, value: Value) -> Result<Value, PropertyError> {
        let wrap = |source| PropertyError::Validation {
            owner: owner.to_string(),
            name: name.to_owned(),
            source,
        };

        let mut value = self.kind.preprocess(value).map_err(wrap)?;
        if validation_enabled()
            && let Err(err) = self.kind.validate(&value, true)
        {
            let alternative = self
                .alternatives
                .iter()
                .find(|alt| alt.fallback.is_valid(&value))
                .ok_or_else(|| wrap(err))?;
            trace!(%owner, name, via = %alternative.fallback, "converting through alternative");
            value = (alternative.converter)(value);
        }
        let value = self.kind.transform(value);

        if let Some(instance) = owner.instance() {
            for assertion in &self.assertions {
                assertion.run(instance, name, &value)?;
            }
        }
        Ok(value)
    }

    /// Decodes a wire value.
    pub fn from_json(&self, json: &Json, models: Option<&ModelIndex>) -> Result<Value, DeserializationError> {
        self.kind.from_json(json, models)
    }

    /// Encodes a value for the wire.
    #[must_use]
    pub fn serialize_value(&self, value: &Value) -> Json {
        self.kind.serialize_value(value)
    }

    /// Returns `true` if `new` should be treated as unchanged from `old`.
    #[must_use]
    pub fn matches(&self, new: &Value, old: &Value) -> bool {
        self.kind.matches(new, old)
    }
}

impl<K: PropertyKind> From<K> for Property {
    fn from(kind: K) -> Self {
        Self::new(kind)
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.kind, f)
    }
}

// Manual Debug impl since callbacks aren't Debug
impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("kind", &self.kind.to_string())
            .field("default", &self.default)
            .field("flags", &self.flags)
            .field("alternatives", &self.alternatives.len())
            .field("assertions", &self.assertions.len())
            .finish_non_exhaustive()
    }
}

/// Joins type names as `"A, B or C"`.
pub(crate) fn nice_join<T: fmt::Display>(items: &[T]) -> String {
    match items {
        [] => String::new(),
        [only] => only.to_string(),
        [init @ .., last] => {
            let head: Vec<String> = init.iter().map(ToString::to_string).collect();
            format!("{} or {last}", head.join(", "))
        }
    }
}
