//! Numbers that must match an argument type exactly.
//!
//! Julia converts numeric arguments implicitly when a method is called. A function that takes a
//! [`StrictlyTypedNumber<N>`] is declared with the argument type `StrictlyTypedNumber{N}`, which
//! only accepts values of type `N`.

use std::fmt;

use super::{
    mapping::{MappingTrait, Mirrored, NoMappingTrait},
    registry::{parametric_type, JuliaType},
};
use crate::{
    data::managed::{datatype::DataType, type_constructor::TypeConstructor, Managed},
    error::MarshalResult,
};

/// A number of type `N` that is never converted implicitly.
#[repr(transparent)]
#[derive(Copy, Clone, Default, PartialEq, PartialOrd)]
pub struct StrictlyTypedNumber<N> {
    pub value: N,
}

impl<N> StrictlyTypedNumber<N> {
    #[inline]
    pub fn new(value: N) -> Self {
        StrictlyTypedNumber { value }
    }
}

impl<N> From<N> for StrictlyTypedNumber<N> {
    #[inline]
    fn from(value: N) -> Self {
        StrictlyTypedNumber { value }
    }
}

impl<N: fmt::Debug> fmt::Debug for StrictlyTypedNumber<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StrictlyTypedNumber({:?})", self.value)
    }
}

unsafe impl<N: Mirrored> MappingTrait for StrictlyTypedNumber<N> {
    type Strategy = NoMappingTrait;
}

impl<N: Mirrored> JuliaType for StrictlyTypedNumber<N> {
    fn julia_type() -> MarshalResult<DataType> {
        parametric_type::<Self>(|| {
            let param = N::julia_type()?;
            TypeConstructor::strictly_typed_number().apply_type(&[param.as_value()])
        })
    }
}

unsafe impl<N: Mirrored> Mirrored for StrictlyTypedNumber<N> {}
