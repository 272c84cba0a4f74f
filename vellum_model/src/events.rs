// Copyright 2025 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Change notifications.
//!
//! Every successful mutation of a property produces a [`PropertyChange`],
//! delivered to each [`ChangeSink`] attached to the instance after storage
//! has been updated.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use vellum_property::{Value, ValueMap};

/// An opaque tag identifying where a change came from.
///
/// Collaborators compare it against themselves to drop changes they
/// originated. The model layer only carries it through.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Setter(Arc<str>);

impl Setter {
    /// Creates a tag.
    #[must_use]
    pub fn new(tag: impl Into<Arc<str>>) -> Self {
        Self(tag.into())
    }

    /// Returns the tag text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Setter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The position patched by a column-data patch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PatchIndex {
    /// A single row.
    Index(usize),
    /// Rows `start..end`, replaced by a list of the same length.
    Range {
        /// First row.
        start: usize,
        /// One past the last row.
        end: usize,
    },
}

/// Column patches, keyed by column name.
pub type Patches = IndexMap<String, Vec<(PatchIndex, Value)>>;

/// A description of an in-place change that lets receivers avoid resending
/// the whole value.
#[derive(Clone, Debug, PartialEq)]
pub enum ChangeHint {
    /// Column data changed; `cols` names the columns, `None` means all.
    ColumnDataChanged {
        /// The changed columns.
        cols: Option<Vec<String>>,
    },
    /// Rows were appended to every column.
    ColumnsStreamed {
        /// The appended rows, by column.
        data: ValueMap,
        /// The maximum column length kept after appending.
        rollover: Option<usize>,
    },
    /// Individual rows or row ranges were replaced.
    ColumnsPatched {
        /// The applied patches.
        patches: Patches,
    },
}

/// A change to one property of one model.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyChange {
    /// The model id.
    pub model: Arc<str>,
    /// The attribute name.
    pub attr: Arc<str>,
    /// The previous value, `None` if the property had no value.
    pub old: Option<Value>,
    /// The new value.
    pub new: Value,
    /// How the change was made, for in-place container mutations.
    pub hint: Option<ChangeHint>,
    /// Where the change came from.
    pub setter: Option<Setter>,
}

/// A receiver of property changes.
pub trait ChangeSink: Send + Sync {
    /// Called after a change has been stored.
    fn property_changed(&self, change: &PropertyChange);
}

impl<F> ChangeSink for F
where
    F: Fn(&PropertyChange) + Send + Sync,
{
    fn property_changed(&self, change: &PropertyChange) {
        self(change);
    }
}

/// A sink that keeps every change it receives.
#[derive(Debug, Default)]
pub struct RecordingSink {
    changes: Mutex<Vec<PropertyChange>>,
}

impl RecordingSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns the recorded changes.
    pub fn take(&self) -> Vec<PropertyChange> {
        core::mem::take(&mut *self.changes.lock())
    }

    /// Returns the attribute names of the recorded changes, in order.
    #[must_use]
    pub fn attrs(&self) -> Vec<String> {
        self.changes
            .lock()
            .iter()
            .map(|change| change.attr.to_string())
            .collect()
    }

    /// Returns the number of recorded changes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.lock().len()
    }

    /// Returns `true` if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.lock().is_empty()
    }
}

impl ChangeSink for RecordingSink {
    fn property_changed(&self, change: &PropertyChange) {
        self.changes.lock().push(change.clone());
    }
}
