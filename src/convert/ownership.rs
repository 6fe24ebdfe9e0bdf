//! Hand native objects to the garbage collector.
//!
//! A native object that is owned by Julia is stored on the heap, its address is boxed as an
//! instance of a mutable handle type and a finalizer is attached to that instance. When the
//! handle is collected or finalized explicitly, the finalizer drops the object and clears the
//! stored address. Converting a cleared handle back to Rust fails with
//! `AccessError::ObjectDeleted` instead of reading freed memory.
//!
//! Handles to data that is still owned by Rust, i.e. boxed references and pointers, never have
//! a finalizer.

use std::{
    any::type_name,
    ffi::c_void,
    ptr::null_mut,
};

use super::boxing::box_voidpointer;
use crate::{
    data::{
        managed::{datatype::DataType, value::Value},
        types::registry::JuliaType,
    },
    error::{GcError, MarshalResult, TypeMappingError},
    memory::gc,
    private::Private,
    runtime::runtime,
    sys::jl_value_t,
};

/// Box `ptr` as an instance of the handle type `ty`.
///
/// `ty` must have a single field of type `Ptr{Nothing}`. If `add_finalizer` is `true`, `ty`
/// must be mutable and a finalizer that drops the pointee as a `Box<T>` is attached.
///
/// Safety: if `add_finalizer` is `true`, `ptr` must have been created with `Box::into_raw` and
/// ownership of it is transferred to the returned value.
pub unsafe fn boxed_cpp_pointer<T>(
    ptr: *mut T,
    ty: DataType,
    add_finalizer: bool,
) -> MarshalResult<Value> {
    if !ty.is_handle_type() {
        Err(TypeMappingError::NotAHandleType {
            type_name: ty.to_string(),
        })?
    }

    if add_finalizer && !ty.is_mutable() {
        Err(GcError::ImmutableFinalizer {
            type_name: ty.to_string(),
        })?
    }

    runtime().scope(|frame| -> MarshalResult<Value> {
        frame.root(ty);
        let address = frame.root(box_voidpointer(ptr.cast()));
        let boxed = frame.root(Value::new_struct(ty, &[address])?);

        if add_finalizer {
            gc::add_finalizer(boxed, finalizer::<T>)?;
        }

        Ok(boxed)
    })
}

/// Move `value` to the heap and transfer its ownership to the garbage collector.
///
/// The datatype of `T` must be a mutable handle type. `value` is dropped when the returned
/// handle is collected or finalized.
pub fn transfer_ownership<T: JuliaType + 'static>(value: Box<T>) -> MarshalResult<Value> {
    let ty = T::julia_type()?;
    let ptr = Box::into_raw(value);

    // Safety: `ptr` was created with `Box::into_raw`.
    match unsafe { boxed_cpp_pointer(ptr, ty, true) } {
        Ok(boxed) => {
            log::debug!(
                "transferred ownership of {} at {:p} to {}",
                type_name::<T>(),
                ptr,
                ty
            );
            Ok(boxed)
        }
        Err(e) => {
            // Safety: ownership hasn't been transferred.
            unsafe { drop(Box::from_raw(ptr)) };
            Err(e)
        }
    }
}

/// Alias of [`transfer_ownership`].
#[inline]
pub fn julia_owned<T: JuliaType + 'static>(value: Box<T>) -> MarshalResult<Value> {
    transfer_ownership(value)
}

unsafe fn finalizer<T>(obj: *mut jl_value_t) {
    let value = Value::wrap(obj, Private);
    let slot = match value.data_ptr() {
        Some(data) => data.cast::<*mut c_void>(),
        None => return,
    };

    let ptr = slot.as_ptr().read();
    if ptr.is_null() {
        log::warn!(
            "finalizer of {} found a cleared handle of type {}",
            type_name::<T>(),
            value.datatype()
        );
        return;
    }

    log::trace!("deleting {} at {:p}", type_name::<T>(), ptr);
    slot.as_ptr().write(null_mut());
    drop(Box::from_raw(ptr.cast::<T>()));
}
