//! Wrapper for arbitrary managed data.
//!
//! A [`Value`] is a pointer to an object owned by the garbage collector. It's the universal
//! dynamically typed value of the host: any managed data can be converted to a `Value`, and a
//! `Value` passes through the conversion functions of this crate unchanged.

use std::{
    fmt,
    mem::{align_of, size_of},
    ptr::{copy_nonoverlapping, NonNull},
};

use smallvec::SmallVec;

use super::{datatype::DataType, module::Module, type_constructor::TypeConstructor, Managed};
use crate::{
    error::{MarshalResult, TypeMappingError},
    memory::frame::GcFrame,
    private::Private,
    runtime::runtime,
    sys::{jl_value_t, Payload},
};

/// Arbitrary managed data.
///
/// A `Value` is only valid while the data it points to is reachable from a root, this is not
/// tracked. Using a `Value` after its data has been freed is undefined behavior.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Value(NonNull<jl_value_t>);

impl Value {
    #[inline]
    pub(crate) unsafe fn wrap_non_null(inner: NonNull<jl_value_t>, _: Private) -> Self {
        Value(inner)
    }

    // Safety: `ptr` must point to a live object.
    #[inline]
    pub(crate) unsafe fn wrap(ptr: *mut jl_value_t, _: Private) -> Self {
        debug_assert!(!ptr.is_null());
        Value(NonNull::new_unchecked(ptr))
    }

    #[inline]
    pub(crate) fn unwrap(self, _: Private) -> *mut jl_value_t {
        self.0.as_ptr()
    }

    #[inline]
    pub(crate) fn object<'a>(self) -> &'a jl_value_t {
        // Safety: values always point to live objects.
        unsafe { self.0.as_ref() }
    }

    /// Convert a raw pointer to a `Value`. Returns `None` if `ptr` is null.
    ///
    /// Safety: if `ptr` isn't null it must point to a live object.
    #[inline]
    pub unsafe fn from_ptr(ptr: *mut jl_value_t) -> Option<Self> {
        NonNull::new(ptr).map(Value)
    }

    /// Returns the raw pointer to this value's object.
    #[inline]
    pub fn as_ptr(self) -> *mut jl_value_t {
        self.0.as_ptr()
    }

    /// Returns the `nothing` singleton.
    pub fn nothing() -> Value {
        // Safety: builtins are pinned.
        unsafe { Value::wrap(runtime().builtins().nothing, Private) }
    }

    /// Returns the `true` singleton.
    pub fn true_v() -> Value {
        unsafe { Value::wrap(runtime().builtins().true_v, Private) }
    }

    /// Returns the `false` singleton.
    pub fn false_v() -> Value {
        unsafe { Value::wrap(runtime().builtins().false_v, Private) }
    }

    /// Returns the datatype of this value.
    #[inline]
    pub fn datatype(self) -> DataType {
        // Safety: every object has a datatype.
        unsafe { DataType::wrap(self.object().ty.get()) }
    }

    /// Returns the name of the datatype of this value, including its parameters.
    pub fn datatype_name(self) -> String {
        self.datatype().to_string()
    }

    /// Returns `true` if this value is an instance of `ty` or one of its subtypes.
    pub fn isa(self, ty: DataType) -> bool {
        self.datatype().is_subtype_of(ty)
    }

    /// Returns `true` if this value is `nothing`.
    pub fn is_nothing(self) -> bool {
        self == Value::nothing()
    }

    /// Returns this value as a `DataType` if it is one.
    pub fn as_datatype(self) -> Option<DataType> {
        match self.object().payload {
            // Safety: the payload is a datatype.
            Payload::DataType(_) => Some(unsafe { DataType::wrap(self.unwrap(Private)) }),
            _ => None,
        }
    }

    /// Returns this value as a `TypeConstructor` if it is one.
    pub fn as_type_constructor(self) -> Option<TypeConstructor> {
        match self.object().payload {
            Payload::Constructor(_) => {
                Some(unsafe { TypeConstructor::wrap(self.unwrap(Private)) })
            }
            _ => None,
        }
    }

    /// Returns this value as a `Module` if it is one.
    pub fn as_module(self) -> Option<Module> {
        match self.object().payload {
            Payload::Module(_) => Some(unsafe { Module::wrap(self.unwrap(Private)) }),
            _ => None,
        }
    }

    /// Returns a pointer to the inline data of this value, or `None` if it has none.
    ///
    /// The data is aligned to at least 8 bytes.
    pub fn data_ptr(self) -> Option<NonNull<u8>> {
        match &self.object().payload {
            // Safety: the buffer is never reallocated.
            Payload::Bits(bits) => unsafe { NonNull::new((*bits.get()).as_mut_ptr().cast()) },
            _ => None,
        }
    }

    /// Create a new instance of `ty` by copying `data`.
    ///
    /// `ty` must be a concrete type whose size is equal to the size of `T`. `T` must not require
    /// an alignment larger than 8 bytes.
    pub fn new_bits<T: Copy>(ty: DataType, data: &T) -> MarshalResult<Value> {
        check_instantiable(ty)?;

        if ty.size() != size_of::<T>() {
            Err(TypeMappingError::InvalidLayout {
                type_name: ty.to_string(),
                reason: format!(
                    "expected {} bytes, {} has {} bytes",
                    ty.size(),
                    std::any::type_name::<T>(),
                    size_of::<T>()
                ),
            })?
        }

        if align_of::<T>() > 8 {
            Err(TypeMappingError::InvalidLayout {
                type_name: ty.to_string(),
                reason: format!("{} is overaligned", std::any::type_name::<T>()),
            })?
        }

        // Safety: the layout has been checked.
        unsafe { Ok(Value::new_bits_unchecked(ty, data)) }
    }

    // Safety: `ty` must be a concrete type whose layout is compatible with `T`.
    pub(crate) unsafe fn new_bits_unchecked<T: Copy>(ty: DataType, data: &T) -> Value {
        let payload = Payload::zeroed_bits(size_of::<T>());
        if let Payload::Bits(bits) = &payload {
            copy_nonoverlapping(
                data as *const T as *const u8,
                (*bits.get()).as_mut_ptr().cast::<u8>(),
                size_of::<T>(),
            );
        }

        let ptr = runtime().alloc(ty.as_value().unwrap(Private), payload);
        Value::wrap_non_null(ptr, Private)
    }

    /// Create a new instance of `ty` with the given field values.
    ///
    /// Every field must have an isbits type, the field values must be instances of exactly that
    /// type.
    pub fn new_struct(ty: DataType, fields: &[Value]) -> MarshalResult<Value> {
        check_instantiable(ty)?;

        let n_fields = ty.n_fields();
        if fields.len() != n_fields {
            Err(TypeMappingError::InvalidLayout {
                type_name: ty.to_string(),
                reason: format!("expected {} field values, got {}", n_fields, fields.len()),
            })?
        }

        // The field data is copied before allocating, the field values don't need to be rooted.
        let mut buffer: SmallVec<[u8; 16]> = SmallVec::from_elem(0, ty.size());
        for (idx, field) in fields.iter().copied().enumerate() {
            let field_ty = ty.field_type(idx).ok_or_else(|| TypeMappingError::InvalidLayout {
                type_name: ty.to_string(),
                reason: format!("field {} has no type", idx),
            })?;

            if field.datatype() != field_ty || !field_ty.is_bits() {
                Err(TypeMappingError::InvalidLayout {
                    type_name: ty.to_string(),
                    reason: format!(
                        "field {} must be an isbits {}, got {}",
                        idx,
                        field_ty,
                        field.datatype()
                    ),
                })?
            }

            let size = field_ty.size();
            if size == 0 {
                continue;
            }

            let offset = ty.field_offset(idx).unwrap_or(0);
            if let Some(src) = field.data_ptr() {
                // Safety: the field type's size matches the size of the field's data.
                unsafe {
                    copy_nonoverlapping(src.as_ptr(), buffer.as_mut_ptr().add(offset), size);
                }
            }
        }

        let payload = Payload::zeroed_bits(buffer.len());
        if let Payload::Bits(bits) = &payload {
            unsafe {
                copy_nonoverlapping(
                    buffer.as_ptr(),
                    (*bits.get()).as_mut_ptr().cast::<u8>(),
                    buffer.len(),
                );
            }
        }

        unsafe {
            let ptr = runtime().alloc(ty.as_value().unwrap(Private), payload);
            Ok(Value::wrap_non_null(ptr, Private))
        }
    }

    /// Root this value in `frame`.
    #[inline]
    pub fn root(self, frame: &mut GcFrame) -> Value {
        frame.root(self)
    }
}

fn check_instantiable(ty: DataType) -> MarshalResult<()> {
    if ty.is_abstract() {
        Err(TypeMappingError::InvalidLayout {
            type_name: ty.to_string(),
            reason: "abstract types can't be instantiated".into(),
        })?
    }

    Ok(())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(dt) = self.as_datatype() {
            return write!(f, "{}", dt);
        }

        if let Some(ctor) = self.as_type_constructor() {
            return write!(f, "{}", ctor);
        }

        if let Some(module) = self.as_module() {
            return write!(f, "{}", module);
        }

        if *self == Value::nothing() {
            return write!(f, "nothing");
        }

        write!(f, "{}({:p})", self.datatype(), self.0.as_ptr())
    }
}

impl_debug!(Value);
