//! Memory management.
//!
//! The host has a garbage collector (GC). Whenever new data is created, the GC is responsible for
//! freeing that data when it has become unreachable. The GC is unaware of references to managed
//! data that exist in Rust, to make it aware of them they must be rooted. While a value is
//! rooted, the GC won't free it. Any data referenced by rooted data is also safe from being
//! freed.
//!
//! Values are rooted in a [`GcFrame`], which is provided by [`scope`]. The roots of a frame are
//! popped from the thread's root stack when the frame is dropped:
//!
//! ```
//! # use jlmarshal::prelude::*;
//! # fn main() -> MarshalResult<()> {
//! scope(|frame| -> MarshalResult<()> {
//!     // This value is guaranteed to live at least until we leave this scope.
//!     let i = frame.root(box_value(1u64)?);
//!
//!     frame.gc_collect(GcCollection::Full);
//!     assert_eq!(unsafe { unbox::<u64>(i)? }, 1);
//!     Ok(())
//! })
//! # }
//! ```
//!
//! A value can also be rooted outside a scope with [`root`], the value is unrooted when the
//! returned guard is dropped. Guards must be dropped in the reverse order they were created in,
//! which is what happens automatically when they're stored in local variables.
//!
//! Values that must live for the remainder of the process can be pinned with
//! [`protect_from_gc`].
//!
//! [`GcFrame`]: crate::memory::frame::GcFrame
//! [`scope`]: crate::runtime::scope
//! [`root`]: crate::memory::frame::root
//! [`protect_from_gc`]: crate::memory::gc::protect_from_gc

pub mod frame;
pub mod gc;
pub(crate) mod stack;
