//! The process-wide host runtime.
//!
//! All interaction with the host happens while the runtime lock is held. The lock is re-entrant:
//! a thread that holds it can call any function in this crate, but other threads block until it
//! is released. Conversion functions take the lock for their own duration. To keep values alive
//! across multiple calls, use [`scope`] and root them in the provided [`GcFrame`].

pub mod builder;

use std::{
    any::Any,
    cell::RefCell,
    panic::{catch_unwind, resume_unwind, AssertUnwindSafe},
    ptr::NonNull,
};

use lock_api::{ReentrantMutex, ReentrantMutexGuard};
use once_cell::sync::OnceCell;
use parking_lot::{RawMutex, RawThreadId};

use self::builder::RuntimeBuilder;
use crate::{
    data::types::registry,
    memory::{
        frame::GcFrame,
        gc::{gc_stress_enabled, GcCollection, GcStats},
        stack::Stack,
    },
    private::Private,
    sys::{
        bootstrap::{bootstrap, Builtins},
        heap::{Finalizers, Heap},
        jl_value_t, Payload,
    },
};

pub(crate) type HeapLock = ReentrantMutex<RawMutex, RawThreadId, RefCell<Heap>>;
pub(crate) type HeapGuard<'a> = ReentrantMutexGuard<'a, RawMutex, RawThreadId, RefCell<Heap>>;

static RUNTIME: OnceCell<Runtime> = OnceCell::new();

/// The host runtime.
pub struct Runtime {
    heap: HeapLock,
    builtins: Builtins,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime").finish_non_exhaustive()
    }
}

impl Runtime {
    fn new(builder: &RuntimeBuilder) -> Self {
        let mut heap = Heap::new(builder.collect_interval);
        // Safety: the heap hasn't been shared yet.
        let builtins = unsafe { bootstrap(&mut heap) };
        heap.add_root_scanner(Stack::mark_all);
        heap.add_root_scanner(registry::mark_registry);

        log::debug!(
            "initialized runtime, collect interval: {:?}",
            builder.collect_interval
        );

        Runtime {
            heap: ReentrantMutex::new(RefCell::new(heap)),
            builtins,
        }
    }

    /// Returns the runtime, starting it with the default settings if necessary.
    #[inline]
    pub fn get() -> &'static Runtime {
        runtime()
    }

    /// Call `func` while holding the runtime lock.
    ///
    /// The frame that is provided to `func` can be used to root values, these roots are popped
    /// when `func` returns.
    pub fn scope<T>(&self, func: impl FnOnce(&mut GcFrame) -> T) -> T {
        let _guard = self.heap.lock();
        // Safety: the frame is dropped before the lock is released.
        let mut frame = unsafe { GcFrame::new(Private) };
        func(&mut frame)
    }

    /// Returns statistics about the garbage collector.
    pub fn gc_stats(&self) -> GcStats {
        self.with_heap(|heap| heap.stats())
    }

    #[inline]
    pub(crate) fn lock(&self) -> HeapGuard<'_> {
        self.heap.lock()
    }

    #[inline]
    pub(crate) fn builtins(&self) -> &Builtins {
        &self.builtins
    }

    // `func` must not call back into the runtime.
    pub(crate) fn with_heap<T>(&self, func: impl FnOnce(&mut Heap) -> T) -> T {
        let guard = self.heap.lock();
        let mut heap = guard.borrow_mut();
        func(&mut heap)
    }

    // Allocate a new object, a collection might be triggered first.
    //
    // Safety: `ty` must be a live datatype whose layout matches `payload`.
    pub(crate) unsafe fn alloc(&self, ty: *mut jl_value_t, payload: Payload) -> NonNull<jl_value_t> {
        let guard = self.heap.lock();
        let collect = guard.borrow().should_collect(gc_stress_enabled());
        if collect {
            // The type of the new object must survive the collection.
            let slot = Stack::with_local(|stack| stack.push_root(ty));
            let collected = catch_unwind(AssertUnwindSafe(|| self.collect_locked(&guard)));
            if let Some(slot) = slot {
                Stack::with_local(|stack| stack.release_root(slot));
            }

            if let Err(payload) = collected {
                resume_unwind(payload);
            }
        }

        let obj = guard.borrow_mut().insert(ty, payload);
        NonNull::new_unchecked(obj)
    }

    pub(crate) fn collect(&self, mode: GcCollection) -> usize {
        let guard = self.heap.lock();
        if mode == GcCollection::Auto && !guard.borrow().has_new_allocations() {
            return 0;
        }

        // Safety: everything that is alive is reachable from a root.
        unsafe { self.collect_locked(&guard) }
    }

    unsafe fn collect_locked(&self, guard: &HeapGuard) -> usize {
        let sweep = match guard.borrow_mut().mark_and_sweep() {
            Some(sweep) => sweep,
            None => return 0,
        };

        let mut n_finalizers = 0;
        let mut panicked = None;
        for (obj, finalizers) in sweep.finalize {
            n_finalizers += run_finalizers(obj, finalizers, &mut panicked);
        }

        let n_freed = sweep.unreachable.len();
        {
            let mut heap = guard.borrow_mut();
            heap.record_finalizers(n_finalizers);
            heap.free(sweep.unreachable);

            log::trace!(
                "collection freed {} objects, {} finalizers run, {} objects alive",
                n_freed,
                n_finalizers,
                heap.stats().live_objects
            );
        }

        // The collection is complete, the heap can be used again.
        if let Some(payload) = panicked {
            resume_unwind(payload);
        }

        n_freed
    }

    // Run and remove all finalizers of `obj`.
    pub(crate) unsafe fn finalize(&self, obj: *mut jl_value_t) -> usize {
        let guard = self.heap.lock();
        let finalizers = guard.borrow_mut().take_finalizers(obj);
        match finalizers {
            Some(finalizers) => {
                let mut panicked = None;
                let n = run_finalizers(obj, finalizers, &mut panicked);
                guard.borrow_mut().record_finalizers(n);
                if let Some(payload) = panicked {
                    resume_unwind(payload);
                }
                n
            }
            None => 0,
        }
    }
}

// Run all `finalizers` of `obj`. If a finalizer panics, the remaining ones still run and the
// first panic is stored in `panicked`.
unsafe fn run_finalizers(
    obj: *mut jl_value_t,
    finalizers: Finalizers,
    panicked: &mut Option<Box<dyn Any + Send>>,
) -> usize {
    let n = finalizers.len();
    for finalizer in finalizers {
        log::trace!("running finalizer of {:p}", obj);
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| finalizer(obj))) {
            log::warn!("finalizer of {:p} panicked", obj);
            panicked.get_or_insert(payload);
        }
    }
    n
}

/// Returns the runtime, starting it with the default settings if necessary.
#[inline]
pub fn runtime() -> &'static Runtime {
    RUNTIME.get_or_init(|| Runtime::new(&RuntimeBuilder::new()))
}

/// Call `func` while holding the runtime lock, see [`Runtime::scope`].
#[inline]
pub fn scope<T>(func: impl FnOnce(&mut GcFrame) -> T) -> T {
    runtime().scope(func)
}
