// Copyright 2025 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.

/// A value does not satisfy a property's type contract.
///
/// Validation errors may be terse: when produced with `detail == false`
/// the message is empty. This keeps probing validations (such as those run
/// by [`Either`](crate::Either) over each alternative) cheap.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    /// Creates a validation error with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Creates a validation error, building the message only when `detail`
    /// is requested.
    #[must_use]
    pub fn detailed(detail: bool, message: impl FnOnce() -> String) -> Self {
        Self {
            message: if detail { message() } else { String::new() },
        }
    }

    /// Returns the message, empty for terse errors.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns `true` if the error carries no message.
    #[must_use]
    pub fn is_terse(&self) -> bool {
        self.message.is_empty()
    }
}

/// A JSON value arriving from the wire does not have the expected shape.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct DeserializationError {
    message: String,
}

impl DeserializationError {
    /// Creates a deserialization error with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors raised while preparing or decoding property values.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PropertyError {
    /// The value failed validation and no alternative accepted it.
    #[error("failed to validate {owner}.{name}: {source}")]
    Validation {
        /// The owning class name.
        owner: String,
        /// The attribute name.
        name: String,
        /// The direct validation failure.
        source: ValidationError,
    },
    /// A property was declared with a default it does not accept.
    #[error("invalid default for {property}: {source}")]
    InvalidDefault {
        /// The property type, as displayed.
        property: String,
        /// The validation failure for the default.
        source: ValidationError,
    },
    /// A registered assertion rejected the value.
    #[error("{0}")]
    Assertion(String),
    /// Inbound JSON could not be decoded.
    #[error(transparent)]
    Deserialization(#[from] DeserializationError),
    /// A type name referenced by an `Instance` property was never registered.
    #[error("type `{0}` was never registered")]
    UnknownType(String),
}
