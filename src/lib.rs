//! Type mapping and value conversion between Rust and a garbage-collected Julia host.
//!
//! jlmarshal is the marshaling core of a native-to-Julia bridge. Given a Rust type it decides
//! how values of that type cross the language boundary, which Julia datatype describes them, and
//! how values are converted, boxed and unboxed in both directions. Native objects handed to the
//! host can be owned by the garbage collector, in which case a finalizer destroys them when the
//! host no longer references them.
//!
//! # Marshaling strategies
//!
//! Every type that crosses the boundary is classified by [`MappingTrait`] into one of four
//! strategies:
//!
//! - [`NoMappingTrait`]: the Rust and Julia layouts are identical, values are passed as-is. This
//!   covers the fundamental scalars and `#[repr(C)]` structs declared with [`mirrored_type!`].
//! - [`WrappedPtrTrait`]: references and raw pointers to described types. On the Julia side they
//!   are wrapped in a struct with a single pointer field, `CxxRef{T}`, `ConstCxxRef{T}`,
//!   `CxxPtr{T}` or `ConstCxxPtr{T}`.
//! - [`DirectPtrTrait`]: Julia's own values, [`Value`] and `*mut jl_value_t`, which pass through
//!   unchanged.
//! - [`CxxWrappedTrait`]: native classes declared with [`wrapped_type!`] passed by value. They
//!   are moved to the heap and the Julia side owns them.
//!
//! The classification is static. A type that has no `MappingTrait` implementation can't be used
//! with any conversion function, and using a conversion that belongs to another strategy is a
//! compile-time error.
//!
//! # Datatypes
//!
//! The Julia datatype that corresponds to a Rust type is returned by [`julia_type`]. Classes are
//! registered once with [`register_type`], datatypes for references and pointers are derived from
//! the registered type the first time they're needed and cached for the rest of the process.
//!
//! ```
//! use jlmarshal::prelude::*;
//!
//! # fn main() -> MarshalResult<()> {
//! let dt = julia_type::<i32>()?;
//! assert_eq!(dt.name(), "Int32");
//!
//! let ref_dt = julia_type::<&mut f64>()?;
//! assert_eq!(ref_dt.to_string(), "CxxRef{Float64}");
//! # Ok(())
//! # }
//! ```
//!
//! # Memory management
//!
//! Julia data is managed by a precise mark-and-sweep collector. Data that is not reachable from
//! a root can be freed whenever a new value is allocated. Values are rooted by a [`GcFrame`],
//! which is available inside a [`scope`]:
//!
//! ```
//! use jlmarshal::prelude::*;
//!
//! # fn main() -> MarshalResult<()> {
//! let sum = scope(|frame| -> MarshalResult<i64> {
//!     let a = frame.root(box_value(3i64)?);
//!     let b = frame.root(box_value(4i64)?);
//!     unsafe { Ok(unbox::<i64>(a)? + unbox::<i64>(b)?) }
//! })?;
//!
//! assert_eq!(sum, 7);
//! # Ok(())
//! # }
//! ```
//!
//! [`MappingTrait`]: crate::data::types::mapping::MappingTrait
//! [`NoMappingTrait`]: crate::data::types::mapping::NoMappingTrait
//! [`WrappedPtrTrait`]: crate::data::types::mapping::WrappedPtrTrait
//! [`DirectPtrTrait`]: crate::data::types::mapping::DirectPtrTrait
//! [`CxxWrappedTrait`]: crate::data::types::mapping::CxxWrappedTrait
//! [`mirrored_type!`]: crate::mirrored_type
//! [`wrapped_type!`]: crate::wrapped_type
//! [`Value`]: crate::data::managed::value::Value
//! [`julia_type`]: crate::data::types::registry::julia_type
//! [`register_type`]: crate::data::types::registry::register_type
//! [`GcFrame`]: crate::memory::frame::GcFrame
//! [`scope`]: crate::runtime::scope

#![forbid(rustdoc::broken_intra_doc_links)]

pub mod convert;
pub mod data;
pub mod error;
pub(crate) mod gc_safe;
pub mod memory;
#[cfg(feature = "prelude")]
pub mod prelude;
pub(crate) mod private;
pub mod runtime;
pub mod sys;
