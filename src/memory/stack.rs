// Every thread has its own root stack.
//
// The main reasons this approach is taken:
//  - the stack only needs to store the roots. Every root is released by its owner, a frame or a
//    guard, by clearing its slot. Cleared slots at the top of the stack are trimmed, so roots can
//    be released in any order without unrooting data that is still in use.
//  - the stack can grow, which makes rooting data an infallible operation.
//  - roots pushed by one thread can't be released by another.
//
// The stacks of all threads are registered globally so the collector can scan them, a stack is
// unregistered when its thread exits.

use std::{
    ptr::null_mut,
    sync::{Arc, Weak},
};

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::sys::jl_value_t;

#[derive(Default)]
pub(crate) struct Stack {
    slots: Mutex<Vec<*mut jl_value_t>>,
}

// The slots are protected by the mutex, the pointers they contain are only dereferenced by the
// collector while the runtime lock is held.
unsafe impl Send for Stack {}
unsafe impl Sync for Stack {}

static STACKS: Lazy<Mutex<Vec<Weak<Stack>>>> = Lazy::new(|| Mutex::new(Vec::new()));

thread_local! {
    static LOCAL_STACK: Arc<Stack> = Stack::register();
}

impl Stack {
    fn register() -> Arc<Stack> {
        let stack = Arc::new(Stack::default());
        let mut stacks = STACKS.lock();
        stacks.retain(|s| s.strong_count() > 0);
        stacks.push(Arc::downgrade(&stack));
        stack
    }

    // Call `func` with the stack of the current thread. Returns `None` if the stack has already
    // been destroyed because the thread is exiting.
    #[inline]
    pub(crate) fn with_local<T>(func: impl FnOnce(&Stack) -> T) -> Option<T> {
        LOCAL_STACK.try_with(|stack| func(stack)).ok()
    }

    // Push a new root to the stack.
    //
    // Safety: `root` must point to data that hasn't been freed yet.
    #[inline]
    pub(crate) unsafe fn push_root(&self, root: *mut jl_value_t) -> usize {
        let mut slots = self.slots.lock();
        let offset = slots.len();
        slots.push(root);

        #[cfg(feature = "mem-debug")]
        log::trace!("pushed root {:p} at depth {}", root, offset);

        offset
    }

    // Release the root in slot `idx`.
    #[inline]
    pub(crate) fn release_root(&self, idx: usize) {
        self.release_roots(&[idx])
    }

    // Release the roots in the given slots.
    pub(crate) fn release_roots(&self, indices: &[usize]) {
        let mut slots = self.slots.lock();
        for idx in indices.iter().copied() {
            if let Some(slot) = slots.get_mut(idx) {
                *slot = null_mut();
            }
        }

        let len = slots.iter().rposition(|slot| !slot.is_null()).map_or(0, |idx| idx + 1);

        #[cfg(feature = "mem-debug")]
        log::trace!(
            "released {} roots, trimmed {} slots",
            indices.len(),
            slots.len() - len
        );

        slots.truncate(len);
    }

    #[inline]
    pub(crate) fn size(&self) -> usize {
        self.slots.lock().len()
    }

    // Root scanner that adds the roots of all threads.
    pub(crate) fn mark_all(out: &mut Vec<*mut jl_value_t>) {
        let stacks = STACKS.lock();
        for stack in stacks.iter().filter_map(Weak::upgrade) {
            out.extend(stack.slots.lock().iter().copied().filter(|root| !root.is_null()));
        }
    }
}
