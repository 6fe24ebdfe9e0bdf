//! The native representation of a type at the language boundary.
//!
//! A function that is called from Julia doesn't receive its arguments as the Rust types it
//! declares, but as their wire representation: scalars and mirrored structs are passed as-is,
//! references and pointers are wrapped in a [`WrappedCppPtr`], and managed values are passed as
//! pointers. [`StaticJuliaType<T>`] resolves the wire type of `T` at compile time.

use std::{ffi::c_void, fmt, mem::size_of, ptr::null_mut};

use super::mapping::{
    CxxWrappedTrait, DirectPtrTrait, MappingStrategy, MappingTrait, NoMappingTrait,
    WrappedPtrTrait,
};

/// Maps `T` to its wire type, implemented by each strategy.
pub trait StaticTypeMapping<T: ?Sized>: MappingStrategy {
    type Wire: Copy;
}

impl<T: Copy> StaticTypeMapping<T> for NoMappingTrait {
    type Wire = T;
}

impl<T: ?Sized> StaticTypeMapping<T> for WrappedPtrTrait {
    type Wire = WrappedCppPtr;
}

impl<T: ?Sized> StaticTypeMapping<T> for CxxWrappedTrait {
    type Wire = WrappedCppPtr;
}

impl<T: Copy> StaticTypeMapping<T> for DirectPtrTrait {
    type Wire = T;
}

/// The wire type of `T`.
pub type StaticJuliaType<T> = <<T as MappingTrait>::Strategy as StaticTypeMapping<T>>::Wire;

/// A native address wrapped in a struct, the layout of every handle type.
#[repr(C)]
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct WrappedCppPtr {
    pub voidptr: *mut c_void,
}

const _: () = assert!(size_of::<WrappedCppPtr>() == size_of::<*mut c_void>());

impl WrappedCppPtr {
    #[inline]
    pub fn new<T>(ptr: *const T) -> Self {
        WrappedCppPtr {
            voidptr: ptr as *mut c_void,
        }
    }

    /// A wrapped null pointer.
    #[inline]
    pub fn null() -> Self {
        WrappedCppPtr { voidptr: null_mut() }
    }

    #[inline]
    pub fn is_null(self) -> bool {
        self.voidptr.is_null()
    }

    /// Cast the wrapped address to a pointer to `T`.
    #[inline]
    pub fn extract_pointer<T>(self) -> *mut T {
        self.voidptr.cast()
    }
}

impl fmt::Debug for WrappedCppPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WrappedCppPtr({:p})", self.voidptr)
    }
}

#[cfg(test)]
mod tests {
    use std::any::TypeId;

    use super::*;
    use crate::data::managed::value::Value;

    fn wire_type<T>() -> TypeId
    where
        T: MappingTrait,
        T::Strategy: StaticTypeMapping<T>,
        StaticJuliaType<T>: 'static,
    {
        TypeId::of::<StaticJuliaType<T>>()
    }

    #[test]
    fn wire_types() {
        assert_eq!(wire_type::<i32>(), TypeId::of::<i32>());
        assert_eq!(wire_type::<f64>(), TypeId::of::<f64>());
        assert_eq!(wire_type::<&i32>(), TypeId::of::<WrappedCppPtr>());
        assert_eq!(wire_type::<*mut u8>(), TypeId::of::<WrappedCppPtr>());
        assert_eq!(wire_type::<Value>(), TypeId::of::<Value>());
    }

    #[test]
    fn extract_pointer() {
        let mut x = 3u16;
        let wrapped = WrappedCppPtr::new(&mut x as *mut u16);
        assert!(!wrapped.is_null());
        unsafe { assert_eq!(*wrapped.extract_pointer::<u16>(), 3) };
        assert!(WrappedCppPtr::null().is_null());
    }
}
