//! Manage the garbage collector.

use std::cell::Cell;

use super::frame::GcFrame;
use crate::{
    data::managed::{value::Value, Managed},
    error::{GcError, MarshalResult},
    private::Private,
    runtime::runtime,
    sys::Finalizer,
};

/// The different collection modes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GcCollection {
    /// Collect if anything has been allocated since the last collection.
    Auto,
    /// Always collect.
    Full,
}

/// Statistics about the garbage collector.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct GcStats {
    /// The number of objects that are currently allocated.
    pub live_objects: usize,
    /// The number of objects that are pinned with `protect_from_gc`.
    pub pinned_objects: usize,
    /// The number of collections that have run.
    pub collections: usize,
    /// The total number of objects that have been freed.
    pub freed_objects: usize,
    /// The total number of finalizers that have run.
    pub finalizers_run: usize,
}

thread_local! {
    static GC_STRESS: Cell<bool> = Cell::new(false);
}

/// Manage the GC.
///
/// This trait provides several methods that can be used to enable or disable the GC, force a
/// collection, and insert a safepoint. It's implemented for [`GcFrame`].
pub trait Gc: private::GcPriv {
    /// Enable or disable the GC, returns the previous state.
    fn enable_gc(&mut self, on: bool) -> bool {
        enable_gc(on)
    }

    /// Returns `true` if the GC is enabled.
    fn gc_is_enabled(&mut self) -> bool {
        gc_is_enabled()
    }

    /// Force a collection.
    fn gc_collect(&mut self, mode: GcCollection) {
        gc_collect(mode);
    }

    /// Insert a safepoint, a point where the garbage collector may run.
    fn gc_safepoint(&mut self) {
        let rt = runtime();
        let stress = gc_stress_enabled();
        if rt.with_heap(|heap| heap.should_collect(stress)) {
            rt.collect(GcCollection::Full);
        }
    }
}

impl Gc for GcFrame {}

mod private {
    use super::GcFrame;
    pub trait GcPriv {}
    impl GcPriv for GcFrame {}
}

/// Enable or disable the GC, returns the previous state.
pub fn enable_gc(on: bool) -> bool {
    runtime().with_heap(|heap| heap.set_enabled(on))
}

/// Returns `true` if the GC is enabled.
pub fn gc_is_enabled() -> bool {
    runtime().with_heap(|heap| heap.is_enabled())
}

/// Collect garbage, returns the number of objects that were freed.
///
/// Any value that is not reachable from a root can be freed.
pub fn gc_collect(mode: GcCollection) -> usize {
    runtime().collect(mode)
}

/// Returns statistics about the garbage collector.
pub fn gc_stats() -> GcStats {
    runtime().gc_stats()
}

/// Enable or disable GC stress mode for the current thread.
///
/// While it's enabled, a collection runs before every allocation made by this thread. This is
/// useful to find values that aren't rooted while they should be.
pub fn set_gc_stress(on: bool) {
    GC_STRESS.with(|s| s.set(on))
}

/// Returns `true` if GC stress mode is enabled for the current thread.
pub fn gc_stress_enabled() -> bool {
    GC_STRESS.try_with(|s| s.get()).unwrap_or(false)
}

/// Protect `data` from being freed until it is unprotected.
///
/// Protection is counted, data that is protected `n` times must be unprotected `n` times before
/// it can be freed.
pub fn protect_from_gc<M: Managed>(data: M) {
    let ptr = data.as_value().unwrap(Private);
    runtime().with_heap(|heap| heap.pin(ptr))
}

/// Undo one call to [`protect_from_gc`]. Returns `false` if `data` wasn't protected.
pub fn unprotect_from_gc<M: Managed>(data: M) -> bool {
    let ptr = data.as_value().unwrap(Private);
    runtime().with_heap(|heap| heap.unpin(ptr))
}

/// Attach a finalizer to `value`.
///
/// The finalizer is called once, either when `value` is collected or when it's finalized
/// explicitly with [`finalize`]. Finalizers can only be attached to instances of mutable types.
///
/// Safety: the finalizer must not store `value` anywhere, after it returns the value is freed.
pub unsafe fn add_finalizer(value: Value, finalizer: Finalizer) -> MarshalResult<()> {
    let ty = value.datatype();
    if !ty.is_mutable() {
        Err(GcError::ImmutableFinalizer {
            type_name: ty.to_string(),
        })?
    }

    let ptr = value.unwrap(Private);
    runtime().with_heap(|heap| heap.add_finalizer(ptr, finalizer));
    Ok(())
}

/// Run the finalizers of `value` now. Returns the number of finalizers that were run.
///
/// The finalizers are removed, they won't run again when `value` is collected.
///
/// Safety: the finalizers must not invalidate any data that is still in use.
pub unsafe fn finalize(value: Value) -> usize {
    runtime().finalize(value.unwrap(Private))
}
