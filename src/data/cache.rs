//! Caching of managed data.
//!
//! The datatype registry caches datatypes for the lifetime of the process. To prevent that this
//! data is ever freed by the garbage collector, it must be rooted. A cache consists of three
//! parts: the actual cache, the set of managed data which is referenced by the cached data, and
//! a RW-lock to orchestrate interactions with the cache.
//!
//! It's the user's resposibility to add all managed data referenced by the cache to the roots,
//! the `mark` method must be called from a root scanner.

use fnv::FnvHashSet;
use parking_lot::RwLock;

use crate::{data::managed::value::Value, private::Private, sys::jl_value_t};

/// Cache for global data
pub(crate) struct Cache<C> {
    inner: RwLock<CacheInner<C>>,
}

impl<C: Default> Default for Cache<C> {
    fn default() -> Self {
        Self::new(C::default())
    }
}

impl<C> Cache<C> {
    pub(crate) fn new(cache: C) -> Self {
        let inner = RwLock::new(CacheInner {
            cache,
            roots: Roots::default(),
        });

        Cache { inner }
    }

    /// Get read access to the cache. `func` must never trigger garbage collection.
    #[inline]
    pub(crate) unsafe fn read<T>(&self, func: impl FnOnce(&CacheInner<C>) -> T) -> T {
        let read_guard = self.inner.read();
        func(&read_guard)
    }

    /// Get write access to the cache. `func` must never trigger garbage collection.
    #[inline]
    pub(crate) unsafe fn write<T>(&self, func: impl FnOnce(&mut CacheInner<C>) -> T) -> T {
        let mut write_guard = self.inner.write();
        func(&mut write_guard)
    }

    // Safety: must only be called during the mark phase from a root scanner.
    #[inline]
    pub(crate) unsafe fn mark(&self, out: &mut Vec<*mut jl_value_t>) {
        // If a collection is triggered while a write guard is held by the collecting thread, a
        // deadlock will occur.
        let read_guard = self.inner.read();
        read_guard.roots.mark(out);
    }
}

// The lock ensures the cache is thread-safe,
unsafe impl<C> Send for Cache<C> {}
unsafe impl<C> Sync for Cache<C> {}

pub(crate) struct CacheInner<C> {
    cache: C,
    roots: Roots,
}

impl<C> CacheInner<C> {
    #[inline(always)]
    pub(crate) fn cache(&self) -> &C {
        &self.cache
    }

    #[inline(always)]
    pub(crate) fn cache_mut(&mut self) -> &mut C {
        &mut self.cache
    }

    #[inline(always)]
    pub(crate) fn roots(&self) -> &Roots {
        &self.roots
    }

    #[inline(always)]
    pub(crate) fn roots_mut(&mut self) -> &mut Roots {
        &mut self.roots
    }
}

#[derive(Default)]
pub(crate) struct Roots {
    data: FnvHashSet<*mut jl_value_t>,
}

impl Roots {
    #[inline(always)]
    pub(crate) fn insert(&mut self, data: Value) -> bool {
        self.data.insert(data.unwrap(Private))
    }

    #[inline(always)]
    pub(crate) fn contains(&self, data: Value) -> bool {
        self.data.contains(&data.unwrap(Private))
    }

    #[inline(always)]
    pub(crate) fn len(&self) -> usize {
        self.data.len()
    }

    fn mark(&self, out: &mut Vec<*mut jl_value_t>) {
        out.extend(self.data.iter().copied());
    }
}
