//! Frames and guards that root managed values.
//!
//! A [`GcFrame`] roots any number of values, all of them are unrooted when the frame is dropped.
//! A [`Rooted`] guard roots a single value until it is dropped. Both push their roots to the
//! root stack of the current thread and release only their own roots, so frames and guards can
//! be dropped in any order. Neither can be sent to another thread.

use std::marker::PhantomData;

use smallvec::SmallVec;

use crate::{
    data::managed::{value::Value, Managed},
    memory::stack::Stack,
    private::Private,
};

/// A frame that roots managed values.
///
/// A frame is created by [`scope`] or [`GcFrame::scope`], values rooted in it remain rooted
/// until the closure that received the frame returns.
///
/// [`scope`]: crate::runtime::scope
pub struct GcFrame {
    roots: SmallVec<[usize; 8]>,
    _not_send: PhantomData<*mut ()>,
}

impl GcFrame {
    // Safety: the runtime lock must be held until the frame is dropped.
    pub(crate) unsafe fn new(_: Private) -> Self {
        GcFrame {
            roots: SmallVec::new(),
            _not_send: PhantomData,
        }
    }

    /// Root `data` in this frame and return it.
    ///
    /// If the root stack of this thread has already been destroyed because the thread is
    /// exiting, `data` is returned without being rooted.
    #[inline]
    pub fn root<M: Managed>(&mut self, data: M) -> M {
        // Safety: `data` is a live value, it can't have been freed yet because we hold the
        // runtime lock.
        let slot =
            Stack::with_local(|stack| unsafe { stack.push_root(data.as_value().unwrap(Private)) });

        match slot {
            Some(slot) => self.roots.push(slot),
            None => log::warn!(
                "root stack of this thread is gone, {:p} is not rooted",
                data.as_value().as_ptr()
            ),
        }

        data
    }

    /// Returns the number of values rooted in this frame.
    #[inline]
    pub fn n_roots(&self) -> usize {
        self.roots.len()
    }

    /// Create a nested scope, the values rooted in its frame are unrooted when `func` returns.
    pub fn scope<T>(&mut self, func: impl FnOnce(&mut GcFrame) -> T) -> T {
        // Safety: the runtime lock is held as long as `self` exists.
        let mut frame = unsafe { GcFrame::new(Private) };
        func(&mut frame)
    }
}

impl Drop for GcFrame {
    fn drop(&mut self) {
        if !self.roots.is_empty() {
            Stack::with_local(|stack| stack.release_roots(&self.roots));
        }
    }
}

/// A guard that roots a single value until it's dropped.
///
/// Guards are independent of each other and of the frame they were created in. Dropping one
/// never unroots the value of another, and a guard that is returned from a [`scope`] keeps its
/// value rooted after the scope has ended.
///
/// [`scope`]: crate::runtime::scope
#[must_use = "the value is unrooted as soon as the guard is dropped"]
pub struct Rooted {
    value: Value,
    slot: Option<usize>,
    _not_send: PhantomData<*mut ()>,
}

impl Rooted {
    /// Returns the rooted value.
    #[inline]
    pub fn value(&self) -> Value {
        self.value
    }
}

impl Drop for Rooted {
    fn drop(&mut self) {
        if let Some(slot) = self.slot {
            Stack::with_local(|stack| stack.release_root(slot));
        }
    }
}

/// Root `data` until the returned guard is dropped.
///
/// Safety: `data` must not have been freed yet. Unless the runtime lock is held by the current
/// thread, it can be collected by another thread before this function returns.
pub unsafe fn root<M: Managed>(data: M) -> Rooted {
    let value = data.as_value();
    let slot = Stack::with_local(|stack| stack.push_root(value.unwrap(Private)));
    if slot.is_none() {
        log::warn!(
            "root stack of this thread is gone, {:p} is not rooted",
            value.as_ptr()
        );
    }

    Rooted {
        value,
        slot,
        _not_send: PhantomData,
    }
}

/// Unroot a value that was rooted with [`root`].
#[inline]
pub fn unroot(guard: Rooted) {
    std::mem::drop(guard)
}
