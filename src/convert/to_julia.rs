//! Convert Rust values to their wire representation.
//!
//! Scalars, mirrored structs and managed values are passed through unchanged, references and
//! pointers are wrapped in a [`WrappedCppPtr`] without transferring ownership. A class passed by
//! value has no storage that Julia can refer to: it's moved to the heap and converted to a
//! managed handle that owns it.

use super::ownership::transfer_ownership;
use crate::{
    data::{
        managed::value::Value,
        types::{
            mapping::{
                CxxWrappedTrait, DirectPtrTrait, MappingStrategy, MappingTrait, Mirrored,
                NoMappingTrait, WrappedPtrTrait,
            },
            registry::{JuliaType, RegisteredType},
            static_mapping::WrappedCppPtr,
        },
    },
    error::MarshalResult,
    sys::jl_value_t,
};

/// Convert a Rust value to its wire representation, implemented by each strategy.
pub trait ConvertToJulia<S: MappingStrategy>: Sized {
    /// The wire representation.
    type Output;

    fn convert_to_julia(self) -> MarshalResult<Self::Output>;
}

impl<T: Mirrored> ConvertToJulia<NoMappingTrait> for T {
    type Output = T;

    #[inline]
    fn convert_to_julia(self) -> MarshalResult<T> {
        Ok(self)
    }
}

impl ConvertToJulia<DirectPtrTrait> for Value {
    type Output = Value;

    #[inline]
    fn convert_to_julia(self) -> MarshalResult<Value> {
        Ok(self)
    }
}

impl ConvertToJulia<DirectPtrTrait> for *mut jl_value_t {
    type Output = *mut jl_value_t;

    #[inline]
    fn convert_to_julia(self) -> MarshalResult<*mut jl_value_t> {
        Ok(self)
    }
}

impl<'a, T: JuliaType + MappingTrait + 'static> ConvertToJulia<WrappedPtrTrait> for &'a T {
    type Output = WrappedCppPtr;

    #[inline]
    fn convert_to_julia(self) -> MarshalResult<WrappedCppPtr> {
        Ok(WrappedCppPtr::new(self as *const T))
    }
}

impl<'a, T: JuliaType + MappingTrait + 'static> ConvertToJulia<WrappedPtrTrait> for &'a mut T {
    type Output = WrappedCppPtr;

    #[inline]
    fn convert_to_julia(self) -> MarshalResult<WrappedCppPtr> {
        Ok(WrappedCppPtr::new(self as *const T))
    }
}

impl<T: JuliaType + MappingTrait + 'static> ConvertToJulia<WrappedPtrTrait> for *const T {
    type Output = WrappedCppPtr;

    #[inline]
    fn convert_to_julia(self) -> MarshalResult<WrappedCppPtr> {
        Ok(WrappedCppPtr::new(self))
    }
}

impl<T: JuliaType + MappingTrait + 'static> ConvertToJulia<WrappedPtrTrait> for *mut T {
    type Output = WrappedCppPtr;

    #[inline]
    fn convert_to_julia(self) -> MarshalResult<WrappedCppPtr> {
        Ok(WrappedCppPtr::new(self as *const T))
    }
}

impl<T> ConvertToJulia<CxxWrappedTrait> for T
where
    T: RegisteredType + MappingTrait<Strategy = CxxWrappedTrait>,
{
    /// The handle that owns the converted value.
    type Output = Value;

    #[inline]
    fn convert_to_julia(self) -> MarshalResult<Value> {
        transfer_ownership(Box::new(self))
    }
}

/// Convert `value` to its wire representation.
///
/// Only classes passed by value allocate, the returned handle is not rooted.
#[inline]
pub fn convert_to_julia<T>(value: T) -> MarshalResult<<T as ConvertToJulia<T::Strategy>>::Output>
where
    T: MappingTrait + ConvertToJulia<T::Strategy>,
{
    <T as ConvertToJulia<T::Strategy>>::convert_to_julia(value)
}
