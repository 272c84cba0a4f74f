// Copyright 2025 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sparse per-instance property storage.
//!
//! This module provides [`PropertyStore`], which holds the values an instance
//! owns in three layers:
//!
//! - **Explicit**: values set by the application or a client.
//! - **Unstable default**: per-instance copies of container or generated
//!   defaults, cached so repeated reads see the same value.
//! - **Unstable themed**: the same cache for values coming from a theme.
//!
//! A name is never present in both the explicit layer and an unstable layer:
//! [`PropertyStore::set_explicit`] evicts the cached entries.

use std::sync::Arc;

use smallvec::SmallVec;
use vellum_property::Value;

/// Number of explicit values stored inline before spilling to the heap.
const INLINE_CAPACITY: usize = 8;

/// The storage layer an entry lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Layer {
    /// Explicitly set values.
    Explicit,
    /// Cached copies of unstable class defaults.
    UnstableDefault,
    /// Cached copies of unstable themed defaults.
    UnstableThemed,
}

type Entry = (Arc<str>, Value);

/// Layered value storage for one instance.
///
/// Entries are sorted by name for O(log n) lookup. Most instances set only a
/// handful of properties, so the explicit layer stays inline for small
/// counts.
#[derive(Clone, Debug, Default)]
pub(crate) struct PropertyStore {
    /// Sorted by name.
    explicit: SmallVec<[Entry; INLINE_CAPACITY]>,
    /// Sorted by name.
    unstable_default: Vec<Entry>,
    /// Sorted by name.
    unstable_themed: Vec<Entry>,
}

impl PropertyStore {
    /// Creates an empty store.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Layer access
    // =========================================================================

    fn entries(&self, layer: Layer) -> &[Entry] {
        match layer {
            Layer::Explicit => &self.explicit,
            Layer::UnstableDefault => &self.unstable_default,
            Layer::UnstableThemed => &self.unstable_themed,
        }
    }

    fn find(&self, name: &str, layer: Layer) -> Result<usize, usize> {
        self.entries(layer)
            .binary_search_by(|(key, _)| (**key).cmp(name))
    }

    /// Returns the value of `name` in `layer`.
    pub(crate) fn get(&self, name: &str, layer: Layer) -> Option<&Value> {
        let idx = self.find(name, layer).ok()?;
        Some(&self.entries(layer)[idx].1)
    }

    /// Returns `true` if `layer` has a value for `name`.
    pub(crate) fn contains(&self, name: &str, layer: Layer) -> bool {
        self.find(name, layer).is_ok()
    }

    /// Sets the value of `name` in `layer`, returning the previous value.
    pub(crate) fn set(&mut self, name: &Arc<str>, layer: Layer, value: Value) -> Option<Value> {
        let found = self.find(name, layer);
        match found {
            Ok(idx) => Some(core::mem::replace(self.value_at(layer, idx), value)),
            Err(idx) => {
                let entry = (Arc::clone(name), value);
                match layer {
                    Layer::Explicit => self.explicit.insert(idx, entry),
                    Layer::UnstableDefault => self.unstable_default.insert(idx, entry),
                    Layer::UnstableThemed => self.unstable_themed.insert(idx, entry),
                }
                None
            }
        }
    }

    /// Returns the value of `name` in `layer`, inserting `init()` first if it
    /// is missing.
    pub(crate) fn slot(
        &mut self,
        name: &Arc<str>,
        layer: Layer,
        init: impl FnOnce() -> Value,
    ) -> &mut Value {
        let idx = match self.find(name, layer) {
            Ok(idx) => idx,
            Err(idx) => {
                let entry = (Arc::clone(name), init());
                match layer {
                    Layer::Explicit => self.explicit.insert(idx, entry),
                    Layer::UnstableDefault => self.unstable_default.insert(idx, entry),
                    Layer::UnstableThemed => self.unstable_themed.insert(idx, entry),
                }
                idx
            }
        };
        self.value_at(layer, idx)
    }

    fn value_at(&mut self, layer: Layer, idx: usize) -> &mut Value {
        match layer {
            Layer::Explicit => &mut self.explicit[idx].1,
            Layer::UnstableDefault => &mut self.unstable_default[idx].1,
            Layer::UnstableThemed => &mut self.unstable_themed[idx].1,
        }
    }

    /// Removes `name` from `layer`, returning the removed value.
    pub(crate) fn clear(&mut self, name: &str, layer: Layer) -> Option<Value> {
        let idx = self.find(name, layer).ok()?;
        let (_, value) = match layer {
            Layer::Explicit => self.explicit.remove(idx),
            Layer::UnstableDefault => self.unstable_default.remove(idx),
            Layer::UnstableThemed => self.unstable_themed.remove(idx),
        };
        Some(value)
    }

    // =========================================================================
    // Explicit values
    // =========================================================================

    /// Stores an explicit value, evicting cached unstable copies of `name`.
    ///
    /// Returns the previous explicit value.
    pub(crate) fn set_explicit(&mut self, name: &Arc<str>, value: Value) -> Option<Value> {
        self.clear(name, Layer::UnstableThemed);
        self.clear(name, Layer::UnstableDefault);
        self.set(name, Layer::Explicit, value)
    }

    /// Returns the names with explicit values, sorted.
    pub(crate) fn explicit_names(&self) -> impl Iterator<Item = &Arc<str>> + '_ {
        self.explicit.iter().map(|(name, _)| name)
    }

    /// Returns the number of explicit values.
    pub(crate) fn len(&self) -> usize {
        self.explicit.len()
    }
}
