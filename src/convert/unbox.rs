//! Convert managed values to Rust data.
//!
//! Converting a value from Julia to Rust is called unboxing, it's the inverse of boxing. The
//! implementation is selected by the strategy of the target type, the type of the value itself
//! isn't checked in release builds. Unboxing a value as the wrong type is undefined behavior.

use std::{any::type_name, ffi::c_void};

use super::to_cpp::checked_pointer;
use crate::{
    data::{
        managed::value::Value,
        types::{
            mapping::{
                data_ptr, CxxWrappedTrait, DirectPtrTrait, MappingStrategy, MappingTrait,
                Mirrored, NoMappingTrait, WrappedPtrTrait,
            },
            registry::{JuliaType, RegisteredType},
            static_mapping::WrappedCppPtr,
        },
    },
    error::{MarshalResult, TypeMappingError},
    sys::jl_value_t,
};

/// Unbox a managed value, implemented by each strategy.
pub trait UnboxValue<S: MappingStrategy>: Sized {
    /// Safety: `value` must be a value that was boxed as `Self`. The lifetime of a returned
    /// reference is unbounded.
    unsafe fn unbox_value(value: Value) -> MarshalResult<Self>;
}

impl<T: Mirrored> UnboxValue<NoMappingTrait> for T {
    #[inline]
    unsafe fn unbox_value(value: Value) -> MarshalResult<T> {
        debug_assert!(
            T::julia_type().map_or(true, |ty| ty == value.datatype()),
            "cannot unbox a {} as {}",
            value.datatype(),
            type_name::<T>()
        );
        T::unbox_bits(value)
    }
}

impl UnboxValue<DirectPtrTrait> for Value {
    #[inline]
    unsafe fn unbox_value(value: Value) -> MarshalResult<Value> {
        Ok(value)
    }
}

impl UnboxValue<DirectPtrTrait> for *mut jl_value_t {
    #[inline]
    unsafe fn unbox_value(value: Value) -> MarshalResult<*mut jl_value_t> {
        Ok(value.as_ptr())
    }
}

impl<'a, T: JuliaType + MappingTrait + 'static> UnboxValue<WrappedPtrTrait> for &'a T {
    #[inline]
    unsafe fn unbox_value(value: Value) -> MarshalResult<&'a T> {
        Ok(&*checked_pointer::<T>(unbox_wrapped(value)?)?)
    }
}

impl<'a, T: JuliaType + MappingTrait + 'static> UnboxValue<WrappedPtrTrait> for &'a mut T {
    #[inline]
    unsafe fn unbox_value(value: Value) -> MarshalResult<&'a mut T> {
        Ok(&mut *checked_pointer::<T>(unbox_wrapped(value)?)?)
    }
}

impl<T: JuliaType + MappingTrait + 'static> UnboxValue<WrappedPtrTrait> for *const T {
    #[inline]
    unsafe fn unbox_value(value: Value) -> MarshalResult<*const T> {
        unbox_wrapped_ptr::<T>(value).map(|ptr| ptr as *const T)
    }
}

impl<T: JuliaType + MappingTrait + 'static> UnboxValue<WrappedPtrTrait> for *mut T {
    #[inline]
    unsafe fn unbox_value(value: Value) -> MarshalResult<*mut T> {
        unbox_wrapped_ptr::<T>(value)
    }
}

impl<T> UnboxValue<CxxWrappedTrait> for T
where
    T: RegisteredType + MappingTrait<Strategy = CxxWrappedTrait> + Clone,
{
    #[inline]
    unsafe fn unbox_value(value: Value) -> MarshalResult<T> {
        Ok((*checked_pointer::<T>(unbox_wrapped(value)?)?).clone())
    }
}

/// Unbox `value` as an instance of `T`.
///
/// Safety: `value` must have been boxed as a `T`, see [`UnboxValue::unbox_value`].
#[inline]
pub unsafe fn unbox<T>(value: Value) -> MarshalResult<T>
where
    T: MappingTrait + UnboxValue<T::Strategy>,
{
    <T as UnboxValue<T::Strategy>>::unbox_value(value)
}

/// Read the address stored in a handle.
///
/// Fails with `TypeMappingError::NotAHandleType` if `value` is not an instance of a handle type.
pub fn unbox_wrapped(value: Value) -> MarshalResult<WrappedCppPtr> {
    let ty = value.datatype();
    if !ty.is_handle_type() {
        Err(TypeMappingError::NotAHandleType {
            type_name: ty.to_string(),
        })?
    }

    let data = data_ptr(value)?;
    // Safety: the data of a handle is a single aligned address.
    let voidptr = unsafe { data.cast::<*mut c_void>().as_ptr().read() };
    Ok(WrappedCppPtr { voidptr })
}

/// Read the address stored in a handle as a pointer to `T`. The pointer can be null.
#[inline]
pub fn unbox_wrapped_ptr<T>(value: Value) -> MarshalResult<*mut T> {
    unbox_wrapped(value).map(WrappedCppPtr::extract_pointer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{convert::boxing::box_value, runtime::scope};

    #[test]
    fn unbox_scalars() {
        scope(|frame| {
            let a = frame.root(box_value(u64::MAX).unwrap());
            let b = frame.root(box_value(-1i32).unwrap());
            let c = frame.root(box_value(1.5f32).unwrap());
            unsafe {
                assert_eq!(unbox::<u64>(a).unwrap(), u64::MAX);
                assert_eq!(unbox::<i32>(b).unwrap(), -1);
                assert_eq!(unbox::<f32>(c).unwrap(), 1.5);
                assert!(unbox::<bool>(Value::true_v()).unwrap());
                assert!(!unbox::<bool>(Value::false_v()).unwrap());
            }
        })
    }

    #[test]
    fn unbox_reference() {
        scope(|frame| {
            let mut x = 21i16;
            let boxed = frame.root(box_value(&mut x).unwrap());
            unsafe {
                let r = unbox::<&mut i16>(boxed).unwrap();
                *r *= 2;
                assert_eq!(unbox_wrapped_ptr::<i16>(boxed).unwrap(), &mut x as *mut i16);
            }
            assert_eq!(x, 42);
        })
    }

    #[test]
    fn unbox_wrapped_requires_handle() {
        scope(|frame| {
            let v = frame.root(box_value(3u8).unwrap());
            let err = unbox_wrapped(v).unwrap_err();
            assert_eq!(
                err.to_string(),
                "Type mapping error: UInt8 is not a wrapper type, it must have exactly one field of type Ptr{Nothing}"
            );
        })
    }
}
