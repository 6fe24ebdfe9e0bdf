//! Synchronization primitives that can't deadlock with the runtime lock.
//!
//! Naively using synchronization primitives like `OnceCell` while the runtime is in use is
//! dangerous. If a thread that holds the runtime lock waits for a cell that another thread is
//! initializing, and that initializer needs the runtime lock, neither can make progress. The
//! primitives in this module acquire the runtime lock before they can block.

pub(crate) mod once_lock;

pub(crate) use once_lock::GcSafeOnceLock;
