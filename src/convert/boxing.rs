//! Box Rust data as managed values.
//!
//! The scalar boxing functions produce an instance of the builtin type with exactly the width of
//! their argument, values are never widened or narrowed. Booleans are boxed as the `true` and
//! `false` singletons.
//!
//! [`box_value`] boxes any type that has a mapping strategy:
//!
//! - scalars and mirrored structs are copied into a new value of their datatype,
//! - managed values are returned as-is, a null `*mut jl_value_t` is an error,
//! - references and pointers are boxed as a `CxxRef{T}` or one of its siblings, no finalizer is
//!   attached because the data is still owned by Rust,
//! - classes passed by value are moved to the heap, ownership is transferred to the garbage
//!   collector.

use std::{any::type_name, ffi::c_void};

use super::ownership::{boxed_cpp_pointer, transfer_ownership};
use crate::{
    data::{
        managed::{datatype::DataType, value::Value},
        types::{
            mapping::{
                CxxWrappedTrait, DirectPtrTrait, MappingStrategy, MappingTrait, Mirrored,
                NoMappingTrait, WrappedPtrTrait,
            },
            registry::{JuliaType, RegisteredType},
        },
    },
    error::{AccessError, MarshalResult},
    sys::jl_value_t,
};

macro_rules! impl_boxer {
    ($($(#[$meta:meta])* $name:ident($ty:ty) => $builtin:ident;)+) => {
        $(
            $(#[$meta])*
            #[inline]
            pub fn $name(value: $ty) -> Value {
                // Safety: the builtin type has the layout of the argument.
                unsafe { Value::new_bits_unchecked(DataType::$builtin(), &value) }
            }
        )+
    };
}

impl_boxer! {
    /// Box an `i8` as an `Int8`.
    box_int8(i8) => int8_type;
    /// Box an `i16` as an `Int16`.
    box_int16(i16) => int16_type;
    /// Box an `i32` as an `Int32`.
    box_int32(i32) => int32_type;
    /// Box an `i64` as an `Int64`.
    box_int64(i64) => int64_type;
    /// Box a `u8` as a `UInt8`.
    box_uint8(u8) => uint8_type;
    /// Box a `u16` as a `UInt16`.
    box_uint16(u16) => uint16_type;
    /// Box a `u32` as a `UInt32`.
    box_uint32(u32) => uint32_type;
    /// Box a `u64` as a `UInt64`.
    box_uint64(u64) => uint64_type;
    /// Box an `f32` as a `Float32`.
    box_float32(f32) => float32_type;
    /// Box an `f64` as a `Float64`.
    box_float64(f64) => float64_type;
    /// Box an address as a `Ptr{Nothing}`.
    box_voidpointer(*mut c_void) => voidpointer_type;
}

#[cfg(feature = "f16")]
impl_boxer! {
    /// Box an `f16` as a `Float16`.
    box_float16(half::f16) => float16_type;
}

/// Returns the `true` or `false` singleton.
#[inline]
pub fn box_bool(value: bool) -> Value {
    if value {
        Value::true_v()
    } else {
        Value::false_v()
    }
}

/// Box data as a managed value, implemented by each strategy.
pub trait BoxValue<S: MappingStrategy>: Sized {
    fn box_value(self) -> MarshalResult<Value>;
}

impl<T: Mirrored> BoxValue<NoMappingTrait> for T {
    #[inline]
    fn box_value(self) -> MarshalResult<Value> {
        self.box_bits()
    }
}

impl BoxValue<DirectPtrTrait> for Value {
    #[inline]
    fn box_value(self) -> MarshalResult<Value> {
        Ok(self)
    }
}

impl BoxValue<DirectPtrTrait> for *mut jl_value_t {
    fn box_value(self) -> MarshalResult<Value> {
        // Safety: non-null pointers to managed data point to live objects.
        match unsafe { Value::from_ptr(self) } {
            Some(value) => Ok(value),
            None => Err(AccessError::NullPointer {
                type_name: type_name::<Value>().into(),
            })?,
        }
    }
}

impl<'a, T: JuliaType + MappingTrait + 'static> BoxValue<WrappedPtrTrait> for &'a T {
    fn box_value(self) -> MarshalResult<Value> {
        let ty = <&T as JuliaType>::julia_type()?;
        // Safety: the handle doesn't own the data.
        unsafe { boxed_cpp_pointer(self as *const T as *mut T, ty, false) }
    }
}

impl<'a, T: JuliaType + MappingTrait + 'static> BoxValue<WrappedPtrTrait> for &'a mut T {
    fn box_value(self) -> MarshalResult<Value> {
        let ty = <&mut T as JuliaType>::julia_type()?;
        unsafe { boxed_cpp_pointer(self as *mut T, ty, false) }
    }
}

impl<T: JuliaType + MappingTrait + 'static> BoxValue<WrappedPtrTrait> for *const T {
    fn box_value(self) -> MarshalResult<Value> {
        let ty = <*const T as JuliaType>::julia_type()?;
        unsafe { boxed_cpp_pointer(self as *mut T, ty, false) }
    }
}

impl<T: JuliaType + MappingTrait + 'static> BoxValue<WrappedPtrTrait> for *mut T {
    fn box_value(self) -> MarshalResult<Value> {
        let ty = <*mut T as JuliaType>::julia_type()?;
        unsafe { boxed_cpp_pointer(self, ty, false) }
    }
}

impl<T> BoxValue<CxxWrappedTrait> for T
where
    T: RegisteredType + MappingTrait<Strategy = CxxWrappedTrait>,
{
    #[inline]
    fn box_value(self) -> MarshalResult<Value> {
        transfer_ownership(Box::new(self))
    }
}

/// Box `value` as a managed value.
///
/// The result is not rooted, it can be freed by the next allocation unless it's rooted first.
///
/// ```
/// use jlmarshal::prelude::*;
///
/// # fn main() -> MarshalResult<()> {
/// scope(|frame| -> MarshalResult<()> {
///     let boxed = frame.root(box_value(-1i32)?);
///     assert_eq!(boxed.datatype(), DataType::int32_type());
///     assert_eq!(unsafe { unbox::<i32>(boxed)? }, -1);
///     Ok(())
/// })
/// # }
/// ```
#[inline]
pub fn box_value<T>(value: T) -> MarshalResult<Value>
where
    T: MappingTrait + BoxValue<T::Strategy>,
{
    <T as BoxValue<T::Strategy>>::box_value(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::scope;

    #[test]
    fn booleans_are_singletons() {
        assert_eq!(box_bool(true), Value::true_v());
        assert_eq!(box_bool(false), Value::false_v());
        assert_eq!(box_value(true).unwrap(), Value::true_v());
    }

    #[test]
    fn exact_width() {
        scope(|frame| {
            let a = frame.root(box_uint16(7));
            let b = frame.root(box_int64(7));
            assert_eq!(a.datatype(), DataType::uint16_type());
            assert_eq!(b.datatype(), DataType::int64_type());
            assert_ne!(a, b);
        })
    }

    #[test]
    fn null_value_pointer() {
        let err = box_value(std::ptr::null_mut::<jl_value_t>()).unwrap_err();
        assert!(err.to_string().starts_with("Access error: cannot convert a null pointer"));
    }

    #[test]
    fn reference_is_boxed_as_handle() {
        scope(|frame| {
            let x = 12u8;
            let boxed = frame.root(box_value(&x).unwrap());
            assert_eq!(boxed.datatype_name(), "ConstCxxRef{UInt8}");
            assert!(boxed.datatype().is_handle_type());
        })
    }
}
