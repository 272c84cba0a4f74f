// Copyright 2025 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.

use vellum_property::PropertyError;

/// Errors raised by model classes and instances.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// A property was accessed on an instance whose storage does not exist
    /// yet.
    #[error("cannot access property {name:?} on a {class} instance before it is initialized")]
    ConstructionOrder {
        /// The class name.
        class: String,
        /// The attribute name.
        name: String,
    },
    /// A readonly property was set after initialization.
    #[error("{class}.{name} is a readonly property")]
    ReadonlyViolation {
        /// The class name.
        class: String,
        /// The attribute name.
        name: String,
    },
    /// Two declarations in one class generated the same attribute.
    #[error("two property generators both created {class}.{name}")]
    DuplicateDescriptor {
        /// The class name.
        class: String,
        /// The attribute name.
        name: String,
    },
    /// A property without a default was read before being set.
    #[error("{class}.{name} doesn't have a value set")]
    UnsetValue {
        /// The class name.
        class: String,
        /// The attribute name.
        name: String,
    },
    /// The class declares no property of that name.
    #[error(
        "unexpected attribute {name:?} to {class}, {} attributes are {}",
        suggestion_label(.similar),
        .possible.join(", ")
    )]
    UnknownAttribute {
        /// The class name.
        class: String,
        /// The attribute name.
        name: String,
        /// Whether `possible` holds close matches rather than every name.
        similar: bool,
        /// Suggested attribute names.
        possible: Vec<String>,
    },
    /// A container view was requested for a value of another shape.
    #[error("{class}.{name} does not hold a {expected}")]
    NotAContainer {
        /// The class name.
        class: String,
        /// The attribute name.
        name: String,
        /// The container shape that was requested.
        expected: &'static str,
    },
    /// An in-place container mutation could not be applied.
    #[error("invalid mutation of {class}.{name}: {reason}")]
    InvalidMutation {
        /// The class name.
        class: String,
        /// The attribute name.
        name: String,
        /// What was wrong with the mutation.
        reason: String,
    },
    /// Preparing or decoding a value failed.
    #[error(transparent)]
    Property(#[from] PropertyError),
}

fn suggestion_label(similar: &bool) -> &'static str {
    if *similar { "similar" } else { "possible" }
}
