//! Object allocation and mark-and-sweep collection.
//!
//! The heap owns every managed object. Objects are individually boxed so their addresses are
//! stable for their whole lifetime. A collection marks everything reachable from the roots and
//! sweeps the rest in two steps: `mark_and_sweep` detaches unreachable objects and hands out
//! their finalizers, `free` releases their memory after those finalizers have run. The caller
//! runs the finalizers in between without borrowing the heap, so finalizers are free to use the
//! runtime.

use fnv::FnvHashMap;
use smallvec::SmallVec;

use super::{jl_value_t, Finalizer, Payload};
use crate::memory::gc::GcStats;

pub(crate) type RootScanner = fn(&mut Vec<*mut jl_value_t>);

pub(crate) type Finalizers = SmallVec<[Finalizer; 1]>;

pub(crate) struct Sweep {
    pub(crate) finalize: Vec<(*mut jl_value_t, Finalizers)>,
    pub(crate) unreachable: Vec<*mut jl_value_t>,
}

pub(crate) struct Heap {
    objects: Vec<*mut jl_value_t>,
    finalizers: FnvHashMap<*mut jl_value_t, Finalizers>,
    pinned: FnvHashMap<*mut jl_value_t, usize>,
    root_scanners: Vec<RootScanner>,
    allocs_since_collect: usize,
    collect_interval: Option<usize>,
    enabled: bool,
    collecting: bool,
    stats: GcStats,
}

// The heap is only accessed while the runtime lock is held.
unsafe impl Send for Heap {}

impl Heap {
    pub(crate) fn new(collect_interval: Option<usize>) -> Self {
        Heap {
            objects: Vec::new(),
            finalizers: FnvHashMap::default(),
            pinned: FnvHashMap::default(),
            root_scanners: Vec::new(),
            allocs_since_collect: 0,
            collect_interval,
            enabled: true,
            collecting: false,
            stats: GcStats::default(),
        }
    }

    pub(crate) fn insert(&mut self, ty: *mut jl_value_t, payload: Payload) -> *mut jl_value_t {
        let obj = Box::into_raw(Box::new(jl_value_t::new(ty, payload)));
        self.objects.push(obj);
        self.allocs_since_collect += 1;
        obj
    }

    pub(crate) fn should_collect(&self, stress: bool) -> bool {
        if !self.enabled || self.collecting {
            return false;
        }

        if stress {
            return true;
        }

        match self.collect_interval {
            Some(n) => self.allocs_since_collect >= n,
            None => false,
        }
    }

    #[inline]
    pub(crate) fn has_new_allocations(&self) -> bool {
        self.allocs_since_collect != 0
    }

    pub(crate) fn add_root_scanner(&mut self, scanner: RootScanner) {
        self.root_scanners.push(scanner);
    }

    pub(crate) fn pin(&mut self, obj: *mut jl_value_t) {
        *self.pinned.entry(obj).or_insert(0) += 1;
    }

    // Returns `false` if the object wasn't pinned.
    pub(crate) fn unpin(&mut self, obj: *mut jl_value_t) -> bool {
        match self.pinned.get_mut(&obj) {
            Some(1) => {
                self.pinned.remove(&obj);
                true
            }
            Some(n) => {
                *n -= 1;
                true
            }
            None => false,
        }
    }

    pub(crate) fn add_finalizer(&mut self, obj: *mut jl_value_t, finalizer: Finalizer) {
        self.finalizers.entry(obj).or_default().push(finalizer);
    }

    pub(crate) fn take_finalizers(&mut self, obj: *mut jl_value_t) -> Option<Finalizers> {
        self.finalizers.remove(&obj)
    }

    pub(crate) fn record_finalizers(&mut self, n: usize) {
        self.stats.finalizers_run += n;
    }

    pub(crate) fn set_enabled(&mut self, on: bool) -> bool {
        std::mem::replace(&mut self.enabled, on)
    }

    #[inline]
    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn stats(&self) -> GcStats {
        GcStats {
            live_objects: self.objects.len(),
            pinned_objects: self.pinned.len(),
            ..self.stats
        }
    }

    // Mark everything reachable from the roots and detach the unreachable objects. Returns
    // `None` if the collector is disabled or already running.
    //
    // Safety: all roots must point to live objects.
    pub(crate) unsafe fn mark_and_sweep(&mut self) -> Option<Sweep> {
        if !self.enabled || self.collecting {
            return None;
        }

        self.collecting = true;

        let mut work: Vec<*mut jl_value_t> = self.pinned.keys().copied().collect();
        for scanner in self.root_scanners.iter() {
            scanner(&mut work);
        }

        while let Some(obj) = work.pop() {
            if obj.is_null() {
                continue;
            }

            let obj = &*obj;
            if obj.marked.replace(true) {
                continue;
            }

            obj.children(&mut work);
        }

        let mut live = Vec::with_capacity(self.objects.len());
        let mut unreachable = Vec::new();
        for obj in self.objects.drain(..) {
            if (*obj).marked.replace(false) {
                live.push(obj);
            } else {
                unreachable.push(obj);
            }
        }
        self.objects = live;

        let mut finalize = Vec::new();
        for obj in unreachable.iter().copied() {
            if let Some(fs) = self.finalizers.remove(&obj) {
                finalize.push((obj, fs));
            }
        }

        self.allocs_since_collect = 0;
        self.stats.collections += 1;
        self.stats.freed_objects += unreachable.len();

        Some(Sweep {
            finalize,
            unreachable,
        })
    }

    // Safety: `unreachable` must be the objects detached by the last call to `mark_and_sweep`,
    // their finalizers must have run.
    pub(crate) unsafe fn free(&mut self, unreachable: Vec<*mut jl_value_t>) {
        for obj in unreachable {
            std::mem::drop(Box::from_raw(obj));
        }

        self.collecting = false;
    }
}
