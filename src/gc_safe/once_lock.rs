//! A `OnceCell` whose initialization is serialized with the runtime.
//!
//! The API matches that of [`once_cell::sync::OnceCell`].

use std::fmt;

use once_cell::sync::OnceCell;

use crate::runtime::runtime;

/// A `OnceCell` that is only initialized while the runtime lock is held. See
/// [`once_cell::sync::OnceCell`] for more information.
pub(crate) struct GcSafeOnceLock<T> {
    inner: OnceCell<T>,
}

impl<T> Default for GcSafeOnceLock<T> {
    fn default() -> GcSafeOnceLock<T> {
        GcSafeOnceLock::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for GcSafeOnceLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.inner.fmt(f)
    }
}

impl<T> GcSafeOnceLock<T> {
    #[inline]
    pub(crate) const fn new() -> Self {
        GcSafeOnceLock {
            inner: OnceCell::new(),
        }
    }

    #[inline]
    pub(crate) fn get(&self) -> Option<&T> {
        self.inner.get()
    }

    // Only one thread can hold the runtime lock, so only one thread ever attempts to set the
    // value and no thread ever waits for the cell while holding the lock.
    #[inline]
    pub(crate) fn set(&self, value: T) -> Result<(), T> {
        let _guard = runtime().lock();
        self.inner.set(value)
    }

    pub(crate) fn get_or_try_init<F, E>(&self, f: F) -> Result<&T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(v) = self.get() {
            return Ok(v);
        }

        let _guard = runtime().lock();
        self.inner.get_or_try_init(f)
    }
}
