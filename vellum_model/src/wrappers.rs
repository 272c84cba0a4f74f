// Copyright 2025 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Observed in-place mutation of container values.
//!
//! [`HasProps::list_mut`], [`HasProps::dict_mut`] and
//! [`HasProps::column_data_mut`] borrow an instance and return a guard whose
//! mutating methods edit the stored value directly, then report the change
//! through [`PropertyDescriptor::notify_mutated`]. When the mutated value no
//! longer validates, the previous value is restored and the error returned.

use std::sync::Arc;

use vellum_property::{Value, ValueMap};

use crate::descriptor::PropertyDescriptor;
use crate::error::ModelError;
use crate::events::{ChangeHint, PatchIndex, Patches};
use crate::has_props::HasProps;

static NULL: Value = Value::Null;

/// The shared plumbing of the container guards.
struct ContainerView<'a> {
    obj: &'a mut HasProps,
    descriptor: PropertyDescriptor,
}

impl<'a> ContainerView<'a> {
    fn open(
        obj: &'a mut HasProps,
        name: &str,
        expected: &'static str,
        accepts: fn(&Value) -> bool,
    ) -> Result<Self, ModelError> {
        let descriptor = obj.lookup(name)?.clone();
        let accepted = match obj.stored_ref(name) {
            Some(stored) => accepts(stored),
            None => accepts(&descriptor.get(obj)?),
        };
        if !accepted {
            return Err(ModelError::NotAContainer {
                class: obj.class().name().to_owned(),
                name: name.to_owned(),
                expected,
            });
        }
        Ok(Self { obj, descriptor })
    }

    fn current(&self) -> &Value {
        self.obj
            .stored_ref(self.descriptor.name())
            .unwrap_or(&NULL)
    }

    fn invalid(&self, reason: String) -> ModelError {
        ModelError::InvalidMutation {
            class: self.obj.class().name().to_owned(),
            name: self.descriptor.name().to_owned(),
            reason,
        }
    }

    /// Applies `op` to the stored value and reports the change.
    ///
    /// `op` must leave the value untouched when it fails. The snapshot taken
    /// before `op` runs is the only copy made of the container.
    fn mutate<R>(
        &mut self,
        hint: Option<ChangeHint>,
        op: impl FnOnce(&mut Value) -> Result<R, String>,
    ) -> Result<R, ModelError> {
        let slot = self.obj.slot_mut(&self.descriptor)?;
        let old = slot.clone();
        let out = op(slot).map_err(|reason| self.invalid(reason))?;
        if let Err(err) = self.descriptor.notify_mutated(self.obj, &old, hint) {
            *self.obj.slot_mut(&self.descriptor)? = old;
            return Err(err);
        }
        Ok(out)
    }
}

const NOT_A_LIST: &str = "stored value is not a list";
const NOT_A_DICT: &str = "stored value is not a dict";

fn out_of_range(index: usize, len: usize) -> String {
    format!("index {index} is out of range for length {len}")
}

impl HasProps {
    /// Borrows the list stored in `name` for in-place mutation.
    pub fn list_mut(&mut self, name: &str) -> Result<PropertyValueList<'_>, ModelError> {
        let view = ContainerView::open(self, name, "list", |v| matches!(v, Value::List(_)))?;
        Ok(PropertyValueList { view })
    }

    /// Borrows the dict stored in `name` for in-place mutation.
    pub fn dict_mut(&mut self, name: &str) -> Result<PropertyValueDict<'_>, ModelError> {
        let view = ContainerView::open(self, name, "dict", |v| matches!(v, Value::Dict(_)))?;
        Ok(PropertyValueDict { view })
    }

    /// Borrows the column data stored in `name` for in-place mutation.
    pub fn column_data_mut(&mut self, name: &str) -> Result<PropertyValueColumnData<'_>, ModelError> {
        let view = ContainerView::open(self, name, "column data dict", |v| {
            matches!(v, Value::Dict(_))
        })?;
        Ok(PropertyValueColumnData { view })
    }
}

// =============================================================================
// Lists
// =============================================================================

/// A list value borrowed from an instance.
pub struct PropertyValueList<'a> {
    view: ContainerView<'a>,
}

impl PropertyValueList<'_> {
    fn items(value: &mut Value) -> Result<&mut Vec<Value>, String> {
        match value {
            Value::List(items) => Ok(items),
            _ => Err(NOT_A_LIST.to_owned()),
        }
    }

    /// Returns the current items.
    #[must_use]
    pub fn as_slice(&self) -> &[Value] {
        self.view.current().as_items().unwrap_or_default()
    }

    /// Returns the number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// Returns `true` if the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    /// Returns the item at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.as_slice().get(index)
    }

    /// Appends an item.
    pub fn push(&mut self, item: impl Into<Value>) -> Result<(), ModelError> {
        let item = item.into();
        self.view.mutate(None, |value| {
            Self::items(value)?.push(item);
            Ok(())
        })
    }

    /// Appends every item of `items`.
    pub fn extend<I, V>(&mut self, items: I) -> Result<(), ModelError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let items: Vec<Value> = items.into_iter().map(Into::into).collect();
        self.view.mutate(None, |value| {
            Self::items(value)?.extend(items);
            Ok(())
        })
    }

    /// Inserts an item at `index`.
    pub fn insert(&mut self, index: usize, item: impl Into<Value>) -> Result<(), ModelError> {
        let item = item.into();
        self.view.mutate(None, |value| {
            let items = Self::items(value)?;
            if index > items.len() {
                return Err(out_of_range(index, items.len()));
            }
            items.insert(index, item);
            Ok(())
        })
    }

    /// Replaces the item at `index`, returning the previous item.
    pub fn set(&mut self, index: usize, item: impl Into<Value>) -> Result<Value, ModelError> {
        let item = item.into();
        self.view.mutate(None, |value| {
            let items = Self::items(value)?;
            let len = items.len();
            let slot = items.get_mut(index).ok_or_else(|| out_of_range(index, len))?;
            Ok(core::mem::replace(slot, item))
        })
    }

    /// Removes and returns the item at `index`.
    pub fn remove(&mut self, index: usize) -> Result<Value, ModelError> {
        self.view.mutate(None, |value| {
            let items = Self::items(value)?;
            if index >= items.len() {
                return Err(out_of_range(index, items.len()));
            }
            Ok(items.remove(index))
        })
    }

    /// Removes and returns the last item.
    pub fn pop(&mut self) -> Result<Option<Value>, ModelError> {
        self.view.mutate(None, |value| Ok(Self::items(value)?.pop()))
    }

    /// Keeps the first `len` items.
    pub fn truncate(&mut self, len: usize) -> Result<(), ModelError> {
        self.view.mutate(None, |value| {
            Self::items(value)?.truncate(len);
            Ok(())
        })
    }

    /// Reverses the items in place.
    pub fn reverse(&mut self) -> Result<(), ModelError> {
        self.view.mutate(None, |value| {
            Self::items(value)?.reverse();
            Ok(())
        })
    }

    /// Removes every item.
    pub fn clear(&mut self) -> Result<(), ModelError> {
        self.view.mutate(None, |value| {
            Self::items(value)?.clear();
            Ok(())
        })
    }
}

// =============================================================================
// Dicts
// =============================================================================

fn entries(value: &mut Value) -> Result<&mut ValueMap, String> {
    match value {
        Value::Dict(map) => Ok(map),
        _ => Err(NOT_A_DICT.to_owned()),
    }
}

/// A dict value borrowed from an instance.
pub struct PropertyValueDict<'a> {
    view: ContainerView<'a>,
}

impl PropertyValueDict<'_> {
    /// Returns the current entries.
    #[must_use]
    pub fn as_map(&self) -> Option<&ValueMap> {
        self.view.current().as_dict()
    }

    /// Returns the value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map()?.get(key)
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.as_map().map_or(0, ValueMap::len)
    }

    /// Returns `true` if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inserts an entry, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, item: impl Into<Value>) -> Result<Option<Value>, ModelError> {
        let (key, item) = (key.into(), item.into());
        self.view
            .mutate(None, |value| Ok(entries(value)?.insert(key, item)))
    }

    /// Removes an entry, keeping the order of the others.
    pub fn remove(&mut self, key: &str) -> Result<Option<Value>, ModelError> {
        self.view
            .mutate(None, |value| Ok(entries(value)?.shift_remove(key)))
    }

    /// Inserts every entry of `items`.
    pub fn update<I, K, V>(&mut self, items: I) -> Result<(), ModelError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let items: Vec<(String, Value)> = items
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.view.mutate(None, |value| {
            entries(value)?.extend(items);
            Ok(())
        })
    }

    /// Removes every entry.
    pub fn clear(&mut self) -> Result<(), ModelError> {
        self.view.mutate(None, |value| {
            entries(value)?.clear();
            Ok(())
        })
    }
}

// =============================================================================
// Column data
// =============================================================================

fn column_len(column: &Value) -> Option<usize> {
    match column {
        Value::List(items) => Some(items.len()),
        Value::Array(values) => Some(values.len()),
        _ => None,
    }
}

fn column_items(column: &Value) -> Option<Vec<Value>> {
    match column {
        Value::List(items) => Some(items.clone()),
        Value::Array(values) => Some(values.iter().copied().map(Value::Float).collect()),
        _ => None,
    }
}

/// Turns a numeric array column into a list so it can hold any value.
fn promote(column: &mut Value) {
    if let Value::Array(values) = column {
        let items: Vec<Value> = values.iter().copied().map(Value::Float).collect();
        *column = Value::List(items);
    }
}

fn as_numbers(items: &[Value]) -> Option<Vec<f64>> {
    items.iter().map(Value::as_f64).collect()
}

fn append_rows(column: &mut Value, rows: Vec<Value>) {
    if let Value::Array(values) = column {
        if let Some(numbers) = as_numbers(&rows) {
            values.extend(numbers);
            return;
        }
        promote(column);
    }
    if let Value::List(items) = column {
        items.extend(rows);
    }
}

/// Keeps the last `keep` rows. Zero keeps every row.
fn roll_over(column: &mut Value, keep: usize) {
    if keep == 0 {
        return;
    }
    match column {
        Value::List(items) if items.len() > keep => {
            items.drain(..items.len() - keep);
        }
        Value::Array(values) if values.len() > keep => {
            values.drain(..values.len() - keep);
        }
        _ => {}
    }
}

fn patch_rows(column: &mut Value, start: usize, rows: Vec<Value>) {
    if let Value::Array(values) = column {
        if let Some(numbers) = as_numbers(&rows) {
            values[start..start + numbers.len()].copy_from_slice(&numbers);
            return;
        }
        promote(column);
    }
    if let Value::List(items) = column {
        for (slot, row) in items[start..].iter_mut().zip(rows) {
            *slot = row;
        }
    }
}

/// A column data value (a dict of equal-length columns) borrowed from an
/// instance.
pub struct PropertyValueColumnData<'a> {
    view: ContainerView<'a>,
}

impl PropertyValueColumnData<'_> {
    /// Returns the columns.
    #[must_use]
    pub fn as_map(&self) -> Option<&ValueMap> {
        self.view.current().as_dict()
    }

    /// Returns the column named `name`.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Value> {
        self.as_map()?.get(name)
    }

    /// Returns the column names.
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.as_map()
            .map(|map| map.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Adds or replaces a column.
    pub fn insert(&mut self, name: impl Into<String>, column: impl Into<Value>) -> Result<Option<Value>, ModelError> {
        let (name, column) = (name.into(), column.into());
        let hint = ChangeHint::ColumnDataChanged {
            cols: Some(vec![name.clone()]),
        };
        self.view
            .mutate(Some(hint), |value| Ok(entries(value)?.insert(name, column)))
    }

    /// Removes a column.
    pub fn remove(&mut self, name: &str) -> Result<Option<Value>, ModelError> {
        let hint = ChangeHint::ColumnDataChanged {
            cols: Some(vec![name.to_owned()]),
        };
        self.view
            .mutate(Some(hint), |value| Ok(entries(value)?.shift_remove(name)))
    }

    /// Adds or replaces several columns.
    pub fn update(&mut self, columns: ValueMap) -> Result<(), ModelError> {
        let hint = ChangeHint::ColumnDataChanged {
            cols: Some(columns.keys().cloned().collect()),
        };
        self.view.mutate(Some(hint), |value| {
            entries(value)?.extend(columns);
            Ok(())
        })
    }

    /// Appends rows to every column.
    ///
    /// `new_data` must name exactly the existing columns, each with the same
    /// number of rows. With `rollover`, columns keep only their last
    /// `rollover` rows; a rollover of zero keeps every row.
    pub fn stream(&mut self, new_data: ValueMap, rollover: Option<usize>) -> Result<(), ModelError> {
        let hint = ChangeHint::ColumnsStreamed {
            data: new_data.clone(),
            rollover,
        };
        self.view.mutate(Some(hint), |value| {
            let columns = entries(value)?;

            let missing: Vec<&str> = columns
                .keys()
                .filter(|name| !new_data.contains_key(*name))
                .map(String::as_str)
                .collect();
            if !missing.is_empty() {
                return Err(format!(
                    "must stream updates to all existing columns (missing: {})",
                    missing.join(", ")
                ));
            }
            let extra: Vec<&str> = new_data
                .keys()
                .filter(|name| !columns.contains_key(*name))
                .map(String::as_str)
                .collect();
            if !extra.is_empty() {
                return Err(format!(
                    "must stream to only existing columns (extra: {})",
                    extra.join(", ")
                ));
            }

            let mut rows: Vec<(String, Vec<Value>)> = Vec::with_capacity(new_data.len());
            for (name, update) in &new_data {
                let items = column_items(update)
                    .ok_or_else(|| format!("streamed rows for {name:?} must be a list or array"))?;
                rows.push((name.clone(), items));
            }
            if rows.windows(2).any(|pair| pair[0].1.len() != pair[1].1.len()) {
                return Err("all streaming column updates must be the same length".to_owned());
            }

            for (name, items) in rows {
                if let Some(column) = columns.get_mut(&name) {
                    append_rows(column, items);
                    if let Some(keep) = rollover {
                        roll_over(column, keep);
                    }
                }
            }
            Ok(())
        })
    }

    /// Replaces individual rows or row ranges.
    ///
    /// Every patch is checked before any is applied.
    pub fn patch(&mut self, patches: Patches) -> Result<(), ModelError> {
        let hint = ChangeHint::ColumnsPatched {
            patches: patches.clone(),
        };
        self.view.mutate(Some(hint), |value| {
            let columns = entries(value)?;

            let mut edits: Vec<(&str, usize, Vec<Value>)> = Vec::new();
            for (name, column_patches) in &patches {
                let column = columns
                    .get(name)
                    .ok_or_else(|| format!("can only patch existing columns (missing: {name})"))?;
                let len = column_len(column).ok_or_else(|| format!("column {name:?} is not a list or array"))?;
                for (index, update) in column_patches {
                    match *index {
                        PatchIndex::Index(i) => {
                            if i >= len {
                                return Err(format!("out-of-range index {i} in patch of column {name:?} (length {len})"));
                            }
                            edits.push((name.as_str(), i, vec![update.clone()]));
                        }
                        PatchIndex::Range { start, end } => {
                            if start > end || end > len {
                                return Err(format!(
                                    "out-of-range slice {start}..{end} in patch of column {name:?} (length {len})"
                                ));
                            }
                            let rows = column_items(update)
                                .ok_or_else(|| format!("slice patch of column {name:?} needs a list of rows"))?;
                            if rows.len() != end - start {
                                return Err(format!(
                                    "slice {start}..{end} of column {name:?} needs {} rows, got {}",
                                    end - start,
                                    rows.len()
                                ));
                            }
                            edits.push((name.as_str(), start, rows));
                        }
                    }
                }
            }

            for (name, start, rows) in edits {
                if let Some(column) = columns.get_mut(name) {
                    patch_rows(column, start, rows);
                }
            }
            Ok(())
        })
    }

    /// Removes every column.
    pub fn clear(&mut self) -> Result<(), ModelError> {
        self.view
            .mutate(Some(ChangeHint::ColumnDataChanged { cols: None }), |value| {
                entries(value)?.clear();
                Ok(())
            })
    }
}

impl core::fmt::Debug for PropertyValueList<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("PropertyValueList").field(self.view.current()).finish()
    }
}

impl core::fmt::Debug for PropertyValueDict<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("PropertyValueDict").field(self.view.current()).finish()
    }
}

impl core::fmt::Debug for PropertyValueColumnData<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("PropertyValueColumnData")
            .field(self.view.current())
            .finish()
    }
}
