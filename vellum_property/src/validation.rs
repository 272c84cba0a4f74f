// Copyright 2025 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Thread-local switch for property validation.
//!
//! Validation is on by default. Bulk loaders that already trust their input
//! can turn it off for a scope with [`without_validation`]; values are then
//! transformed but not checked.

use std::cell::Cell;
use std::marker::PhantomData;

thread_local! {
    static VALIDATION: Cell<bool> = const { Cell::new(true) };
}

/// Returns `true` if property values are validated on this thread.
#[must_use]
pub fn validation_enabled() -> bool {
    VALIDATION.with(Cell::get)
}

/// Enables or disables validation on this thread, returning the previous
/// setting.
pub fn set_validation_enabled(enabled: bool) -> bool {
    VALIDATION.with(|cell| cell.replace(enabled))
}

/// Disables validation until the returned guard is dropped.
///
/// Guards nest: dropping one restores whatever setting was active when it
/// was created.
///
/// ```rust
/// use vellum_property::{validation_enabled, without_validation};
///
/// assert!(validation_enabled());
/// {
///     let _guard = without_validation();
///     assert!(!validation_enabled());
/// }
/// assert!(validation_enabled());
/// ```
pub fn without_validation() -> ValidationGuard {
    ValidationGuard {
        previous: set_validation_enabled(false),
        _not_send: PhantomData,
    }
}

/// Restores the previous validation setting when dropped.
#[must_use = "validation is re-enabled as soon as the guard is dropped"]
#[derive(Debug)]
pub struct ValidationGuard {
    previous: bool,
    _not_send: PhantomData<*const ()>,
}

impl Drop for ValidationGuard {
    fn drop(&mut self) {
        set_validation_enabled(self.previous);
    }
}
