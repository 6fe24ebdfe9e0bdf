//! Convert wire representations back to Rust values.
//!
//! The input of each conversion is the wire type of its output, [`StaticJuliaType<T>`]. A null
//! handle can't be converted to a reference or a class: it either never pointed to anything, or
//! its object has been deleted by a finalizer. These conversions fail with
//! `AccessError::ObjectDeleted`. Null raw pointers are passed through.

use std::any::type_name;

use crate::{
    data::{
        managed::value::Value,
        types::{
            mapping::{
                CxxWrappedTrait, DirectPtrTrait, MappingTrait, Mirrored, NoMappingTrait,
                WrappedPtrTrait,
            },
            registry::{JuliaType, RegisteredType},
            static_mapping::{StaticJuliaType, StaticTypeMapping, WrappedCppPtr},
        },
    },
    error::{AccessError, MarshalResult},
    sys::jl_value_t,
};

/// Convert a wire representation to a Rust value, implemented by each strategy.
pub trait ConvertToCpp<S>: Sized
where
    S: StaticTypeMapping<Self>,
{
    /// Safety: a non-null handle must point to a live instance of `Self`, or of its pointee if
    /// `Self` is a reference or pointer. The lifetime of a returned reference is unbounded.
    unsafe fn convert_to_cpp(julia_value: S::Wire) -> MarshalResult<Self>;
}

impl<T: Mirrored> ConvertToCpp<NoMappingTrait> for T {
    #[inline]
    unsafe fn convert_to_cpp(julia_value: T) -> MarshalResult<T> {
        Ok(julia_value)
    }
}

impl ConvertToCpp<DirectPtrTrait> for Value {
    #[inline]
    unsafe fn convert_to_cpp(julia_value: Value) -> MarshalResult<Value> {
        Ok(julia_value)
    }
}

impl ConvertToCpp<DirectPtrTrait> for *mut jl_value_t {
    #[inline]
    unsafe fn convert_to_cpp(julia_value: *mut jl_value_t) -> MarshalResult<*mut jl_value_t> {
        Ok(julia_value)
    }
}

impl<'a, T: JuliaType + MappingTrait + 'static> ConvertToCpp<WrappedPtrTrait> for &'a T {
    #[inline]
    unsafe fn convert_to_cpp(julia_value: WrappedCppPtr) -> MarshalResult<&'a T> {
        Ok(&*checked_pointer::<T>(julia_value)?)
    }
}

impl<'a, T: JuliaType + MappingTrait + 'static> ConvertToCpp<WrappedPtrTrait> for &'a mut T {
    #[inline]
    unsafe fn convert_to_cpp(julia_value: WrappedCppPtr) -> MarshalResult<&'a mut T> {
        Ok(&mut *checked_pointer::<T>(julia_value)?)
    }
}

impl<T: JuliaType + MappingTrait + 'static> ConvertToCpp<WrappedPtrTrait> for *const T {
    #[inline]
    unsafe fn convert_to_cpp(julia_value: WrappedCppPtr) -> MarshalResult<*const T> {
        Ok(julia_value.extract_pointer::<T>())
    }
}

impl<T: JuliaType + MappingTrait + 'static> ConvertToCpp<WrappedPtrTrait> for *mut T {
    #[inline]
    unsafe fn convert_to_cpp(julia_value: WrappedCppPtr) -> MarshalResult<*mut T> {
        Ok(julia_value.extract_pointer::<T>())
    }
}

impl<T> ConvertToCpp<CxxWrappedTrait> for T
where
    T: RegisteredType + MappingTrait<Strategy = CxxWrappedTrait> + Clone,
{
    #[inline]
    unsafe fn convert_to_cpp(julia_value: WrappedCppPtr) -> MarshalResult<T> {
        Ok((*checked_pointer::<T>(julia_value)?).clone())
    }
}

/// Convert `julia_value` to an instance of `T`.
///
/// Safety: see [`ConvertToCpp::convert_to_cpp`].
#[inline]
pub unsafe fn convert_to_cpp<T>(julia_value: StaticJuliaType<T>) -> MarshalResult<T>
where
    T: MappingTrait + ConvertToCpp<T::Strategy>,
    T::Strategy: StaticTypeMapping<T>,
{
    <T as ConvertToCpp<T::Strategy>>::convert_to_cpp(julia_value)
}

/// Extract the pointer from `handle`, fails if it's null.
pub fn checked_pointer<T>(handle: WrappedCppPtr) -> MarshalResult<*mut T> {
    if handle.is_null() {
        Err(AccessError::ObjectDeleted {
            type_name: type_name::<T>().into(),
        })?
    }

    Ok(handle.extract_pointer())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::to_julia::convert_to_julia;

    #[test]
    fn round_trip_reference() {
        let mut x = 9i32;
        let wrapped = convert_to_julia(&mut x).unwrap();
        let r = unsafe { convert_to_cpp::<&mut i32>(wrapped).unwrap() };
        *r += 1;
        assert_eq!(x, 10);
    }

    #[test]
    fn null_reference_is_deleted() {
        let err = unsafe { convert_to_cpp::<&u64>(WrappedCppPtr::null()).unwrap_err() };
        assert!(err.is_object_deleted());
        assert_eq!(err.to_string(), "Access error: C++ object of type u64 was deleted");
    }

    #[test]
    fn null_pointer_is_passed_through() {
        let ptr = unsafe { convert_to_cpp::<*const u64>(WrappedCppPtr::null()).unwrap() };
        assert!(ptr.is_null());
    }
}
