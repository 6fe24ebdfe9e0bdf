//! Classification of Rust types into marshaling strategies.
//!
//! Every type that crosses the language boundary implements [`MappingTrait`], its associated
//! `Strategy` type selects how values of that type are converted:
//!
//! | Rust type                               | Strategy            |
//! |-----------------------------------------|---------------------|
//! | `&T`, `&mut T`                          | [`WrappedPtrTrait`] |
//! | `Value`, `*mut jl_value_t`              | [`DirectPtrTrait`]  |
//! | `*const T`, `*mut T`                    | [`WrappedPtrTrait`] |
//! | types declared with [`wrapped_type!`]   | [`CxxWrappedTrait`] |
//! | scalars, [`mirrored_type!`] structs     | [`NoMappingTrait`]  |
//!
//! The conversion traits are parametrized by the strategy, each strategy has its own blanket
//! implementation. A type without a `MappingTrait` implementation can't be converted, and
//! requesting a conversion that belongs to another strategy fails to compile.
//!
//! [`wrapped_type!`]: crate::wrapped_type
//! [`mirrored_type!`]: crate::mirrored_type

use std::{mem::size_of, ptr::NonNull};

use super::registry::JuliaType;
use crate::{
    data::managed::{datatype::DataType, value::Value},
    error::{AccessError, MarshalResult, TypeMappingError},
    sys::jl_value_t,
};

/// The strategies, available at runtime.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    /// The value is passed as-is, see [`NoMappingTrait`].
    Direct,
    /// The value is wrapped in a struct with a single pointer field, see [`WrappedPtrTrait`].
    WrappedPtr,
    /// The value is a managed value that is passed through, see [`DirectPtrTrait`].
    DirectPtr,
    /// The value is moved to the heap and owned by the host, see [`CxxWrappedTrait`].
    CxxWrapped,
}

/// A marshaling strategy. This trait is sealed.
pub trait MappingStrategy: private::MappingStrategyPriv + 'static {
    const KIND: StrategyKind;

    /// The datatype that references and pointers to a type with this strategy point to.
    #[doc(hidden)]
    fn pointee_type(ty: DataType, _type_name: &str) -> MarshalResult<DataType> {
        Ok(ty)
    }
}

/// Types whose layout is identical in Rust and Julia.
pub enum NoMappingTrait {}

/// References and pointers to native data.
pub enum WrappedPtrTrait {}

/// Managed values, they're never converted.
pub enum DirectPtrTrait {}

/// Native classes that are passed by value.
///
/// The registered datatype of such a class is a concrete subtype of an abstract type with the
/// same name, references and pointers point to that abstract type.
pub enum CxxWrappedTrait {}

impl MappingStrategy for NoMappingTrait {
    const KIND: StrategyKind = StrategyKind::Direct;
}

impl MappingStrategy for WrappedPtrTrait {
    const KIND: StrategyKind = StrategyKind::WrappedPtr;
}

impl MappingStrategy for DirectPtrTrait {
    const KIND: StrategyKind = StrategyKind::DirectPtr;
}

impl MappingStrategy for CxxWrappedTrait {
    const KIND: StrategyKind = StrategyKind::CxxWrapped;

    fn pointee_type(ty: DataType, type_name: &str) -> MarshalResult<DataType> {
        match ty.super_type() {
            Some(super_type) => Ok(super_type),
            None => Err(TypeMappingError::NoSuperType {
                type_name: type_name.into(),
            })?,
        }
    }
}

mod private {
    use super::*;

    pub trait MappingStrategyPriv {}
    impl MappingStrategyPriv for NoMappingTrait {}
    impl MappingStrategyPriv for WrappedPtrTrait {}
    impl MappingStrategyPriv for DirectPtrTrait {}
    impl MappingStrategyPriv for CxxWrappedTrait {}
}

/// Classify a type.
///
/// Safety: a type with the `NoMappingTrait` strategy must have exactly the same layout as
/// instances of its datatype. Use [`mirrored_type!`] or [`wrapped_type!`] to implement this trait
/// for custom types.
///
/// [`wrapped_type!`]: crate::wrapped_type
/// [`mirrored_type!`]: crate::mirrored_type
pub unsafe trait MappingTrait {
    type Strategy: MappingStrategy;
}

/// Returns the strategy of `T`.
#[inline]
pub fn mapping_strategy<T: MappingTrait + ?Sized>() -> StrategyKind {
    <T::Strategy as MappingStrategy>::KIND
}

unsafe impl<'a, T: JuliaType + MappingTrait + 'static> MappingTrait for &'a T {
    type Strategy = WrappedPtrTrait;
}

unsafe impl<'a, T: JuliaType + MappingTrait + 'static> MappingTrait for &'a mut T {
    type Strategy = WrappedPtrTrait;
}

unsafe impl<T: JuliaType + MappingTrait + 'static> MappingTrait for *const T {
    type Strategy = WrappedPtrTrait;
}

unsafe impl<T: JuliaType + MappingTrait + 'static> MappingTrait for *mut T {
    type Strategy = WrappedPtrTrait;
}

unsafe impl MappingTrait for Value {
    type Strategy = DirectPtrTrait;
}

unsafe impl MappingTrait for *mut jl_value_t {
    type Strategy = DirectPtrTrait;
}

/// Types whose layout is identical in Rust and Julia.
///
/// Instances of these types are copied into and out of managed values. Scalars override the
/// provided methods to use their builtin datatypes directly.
///
/// Safety: the layout of `Self` must match the layout of its datatype. Use [`mirrored_type!`] to
/// implement this trait for custom types.
///
/// [`mirrored_type!`]: crate::mirrored_type
pub unsafe trait Mirrored:
    JuliaType + MappingTrait<Strategy = NoMappingTrait> + Copy + 'static
{
    /// Copy `self` into a new managed value.
    fn box_bits(self) -> MarshalResult<Value> {
        Value::new_bits(Self::julia_type()?, &self)
    }

    /// Copy the contents of `value` into a new instance of `Self`.
    ///
    /// Safety: `value` must be an instance of a type that is layout-compatible with `Self`.
    unsafe fn unbox_bits(value: Value) -> MarshalResult<Self> {
        debug_assert_eq!(value.datatype().size(), size_of::<Self>());
        let ptr = data_ptr(value)?;
        Ok(ptr.cast::<Self>().as_ptr().read_unaligned())
    }
}

pub(crate) fn data_ptr(value: Value) -> MarshalResult<NonNull<u8>> {
    match value.data_ptr() {
        Some(ptr) => Ok(ptr),
        None => Err(AccessError::NotBits {
            type_name: value.datatype_name(),
        })?,
    }
}

/// Declare native classes that are passed by value.
///
/// Each type gets the [`CxxWrappedTrait`] strategy. Its datatype must be registered with
/// [`register_type`] before it can be used, and it must be a mutable handle type, i.e. a type
/// with a single `Ptr{Nothing}` field, whose supertype is the abstract type that references and
/// pointers point to.
///
/// ```
/// use jlmarshal::{prelude::*, wrapped_type};
///
/// #[derive(Clone)]
/// struct Counter {
///     count: u32,
/// }
///
/// wrapped_type!(Counter);
///
/// # fn main() -> MarshalResult<()> {
/// scope(|frame| -> MarshalResult<()> {
///     let base = frame.root(DataType::new_abstract("Counter", DataType::any_type())?);
///     let allocated = frame.root(DataType::new_handle_type("CounterAllocated", base, true)?);
///     register_type::<Counter>(allocated)?;
///
///     assert_eq!(julia_type::<&mut Counter>()?.to_string(), "CxxRef{Counter}");
///     Ok(())
/// })
/// # }
/// ```
///
/// [`register_type`]: crate::data::types::registry::register_type
#[macro_export]
macro_rules! wrapped_type {
    ($($ty:ty),+ $(,)?) => {
        $(
            unsafe impl $crate::data::types::mapping::MappingTrait for $ty {
                type Strategy = $crate::data::types::mapping::CxxWrappedTrait;
            }

            impl $crate::data::types::registry::JuliaType for $ty {
                #[inline]
                fn julia_type() -> $crate::error::MarshalResult<$crate::data::managed::datatype::DataType> {
                    $crate::data::types::registry::registered_type::<Self>()
                }
            }

            unsafe impl $crate::data::types::registry::RegisteredType for $ty {}
        )+
    };
}

/// Declare `#[repr(C)]` types whose layout is identical to their datatype.
///
/// Each type gets the [`NoMappingTrait`] strategy. Its datatype must be registered with
/// [`register_type`] before it can be used.
///
/// Safety: the macro can't check that the layouts match, a mismatch is undefined behavior when
/// values are boxed or unboxed.
///
/// [`register_type`]: crate::data::types::registry::register_type
#[macro_export]
macro_rules! mirrored_type {
    ($($ty:ty),+ $(,)?) => {
        $(
            const _: () = assert!(::std::mem::align_of::<$ty>() <= 8, "mirrored types can't be overaligned");

            unsafe impl $crate::data::types::mapping::MappingTrait for $ty {
                type Strategy = $crate::data::types::mapping::NoMappingTrait;
            }

            impl $crate::data::types::registry::JuliaType for $ty {
                #[inline]
                fn julia_type() -> $crate::error::MarshalResult<$crate::data::managed::datatype::DataType> {
                    $crate::data::types::registry::registered_type::<Self>()
                }
            }

            unsafe impl $crate::data::types::registry::RegisteredType for $ty {}

            unsafe impl $crate::data::types::mapping::Mirrored for $ty {}
        )+
    };
}

#[cfg(test)]
mod tests {
    use std::ffi::c_void;

    use super::*;

    #[test]
    fn classification() {
        assert_eq!(mapping_strategy::<i32>(), StrategyKind::Direct);
        assert_eq!(mapping_strategy::<f64>(), StrategyKind::Direct);
        assert_eq!(mapping_strategy::<bool>(), StrategyKind::Direct);
        assert_eq!(mapping_strategy::<*mut c_void>(), StrategyKind::Direct);
        assert_eq!(mapping_strategy::<&i32>(), StrategyKind::WrappedPtr);
        assert_eq!(mapping_strategy::<&mut f32>(), StrategyKind::WrappedPtr);
        assert_eq!(mapping_strategy::<*const u8>(), StrategyKind::WrappedPtr);
        assert_eq!(mapping_strategy::<*mut i64>(), StrategyKind::WrappedPtr);
        assert_eq!(mapping_strategy::<Value>(), StrategyKind::DirectPtr);
        assert_eq!(mapping_strategy::<*mut jl_value_t>(), StrategyKind::DirectPtr);
    }

    #[test]
    fn pointee_of_wrapped_class_is_supertype() {
        let ty = DataType::voidpointer_type();
        assert_eq!(NoMappingTrait::pointee_type(ty, "Ptr").unwrap(), ty);
        assert_eq!(
            CxxWrappedTrait::pointee_type(ty, "Ptr").unwrap(),
            DataType::any_type()
        );

        let err = CxxWrappedTrait::pointee_type(DataType::any_type(), "Any").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Type mapping error: Any has no supertype"
        );
    }
}
