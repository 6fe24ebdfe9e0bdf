//! Mappings of the fundamental scalar types.
//!
//! Scalars use the `NoMappingTrait` strategy and map to builtin datatypes without registration.
//! `isize` and `usize` map to the integer types with the width of a pointer, `*mut c_void` to
//! `Ptr{Nothing}`.

use std::ffi::c_void;

use super::{
    mapping::{data_ptr, MappingTrait, Mirrored, NoMappingTrait},
    registry::JuliaType,
};
use crate::{
    convert::boxing::*,
    data::managed::{datatype::DataType, value::Value},
    error::MarshalResult,
};

macro_rules! impl_fundamental {
    ($($ty:ty => $builtin:ident, $boxer:ident $(as $cast:ty)?;)+) => {
        $(
            unsafe impl MappingTrait for $ty {
                type Strategy = NoMappingTrait;
            }

            impl JuliaType for $ty {
                #[inline]
                fn julia_type() -> MarshalResult<DataType> {
                    Ok(DataType::$builtin())
                }
            }

            unsafe impl Mirrored for $ty {
                #[inline]
                fn box_bits(self) -> MarshalResult<Value> {
                    Ok($boxer(self $(as $cast)?))
                }
            }
        )+
    };
}

impl_fundamental! {
    i8 => int8_type, box_int8;
    i16 => int16_type, box_int16;
    i32 => int32_type, box_int32;
    i64 => int64_type, box_int64;
    u8 => uint8_type, box_uint8;
    u16 => uint16_type, box_uint16;
    u32 => uint32_type, box_uint32;
    u64 => uint64_type, box_uint64;
    f32 => float32_type, box_float32;
    f64 => float64_type, box_float64;
}

cfg_if::cfg_if! {
    if #[cfg(target_pointer_width = "64")] {
        impl_fundamental! {
            isize => int64_type, box_int64 as i64;
            usize => uint64_type, box_uint64 as u64;
        }
    } else {
        impl_fundamental! {
            isize => int32_type, box_int32 as i32;
            usize => uint32_type, box_uint32 as u32;
        }
    }
}

#[cfg(feature = "f16")]
impl_fundamental! {
    half::f16 => float16_type, box_float16;
}

unsafe impl MappingTrait for bool {
    type Strategy = NoMappingTrait;
}

impl JuliaType for bool {
    #[inline]
    fn julia_type() -> MarshalResult<DataType> {
        Ok(DataType::bool_type())
    }
}

unsafe impl Mirrored for bool {
    #[inline]
    fn box_bits(self) -> MarshalResult<Value> {
        Ok(box_bool(self))
    }

    // Any non-zero byte is true.
    unsafe fn unbox_bits(value: Value) -> MarshalResult<Self> {
        Ok(data_ptr(value)?.as_ptr().read() != 0)
    }
}

unsafe impl MappingTrait for *mut c_void {
    type Strategy = NoMappingTrait;
}

unsafe impl Mirrored for *mut c_void {
    #[inline]
    fn box_bits(self) -> MarshalResult<Value> {
        Ok(box_voidpointer(self))
    }
}
