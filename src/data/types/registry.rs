//! The datatype registry.
//!
//! Every type that crosses the language boundary has a Julia datatype, returned by
//! [`julia_type`]. Scalars map to builtin types, classes and mirrored structs must be registered
//! with [`register_type`] before they're used. Datatypes of references and pointers are derived
//! from the datatype of their pointee the first time they're requested.
//!
//! Each Rust type has a single slot in the registry that is set at most once and lives for the
//! remainder of the process. Datatypes stored in a slot are rooted, so they are never freed.

use std::{
    any::{type_name, TypeId},
    ffi::c_void,
};

use fnv::FnvHashMap;
use once_cell::sync::Lazy;

use super::mapping::{mapping_strategy, MappingStrategy, MappingTrait, StrategyKind};
use crate::{
    data::{
        cache::Cache,
        managed::{
            datatype::DataType, module::Module, type_constructor::TypeConstructor, value::Value,
            Managed,
        },
    },
    error::{MarshalResult, TypeMappingError},
    gc_safe::GcSafeOnceLock,
    runtime::runtime,
    sys::jl_value_t,
};

static TYPE_REGISTRY: Lazy<TypeRegistry> = Lazy::new(TypeRegistry::new);

/// The four parametric types that wrap references and pointers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum HandleKind {
    /// `CxxRef{T}`, for `&mut T`.
    CxxRef,
    /// `ConstCxxRef{T}`, for `&T`.
    ConstCxxRef,
    /// `CxxPtr{T}`, for `*mut T`.
    CxxPtr,
    /// `ConstCxxPtr{T}`, for `*const T`.
    ConstCxxPtr,
}

impl HandleKind {
    /// Returns the type constructor of this kind of handle.
    pub fn constructor(self) -> TypeConstructor {
        match self {
            HandleKind::CxxRef => TypeConstructor::cxx_ref(),
            HandleKind::ConstCxxRef => TypeConstructor::const_cxx_ref(),
            HandleKind::CxxPtr => TypeConstructor::cxx_ptr(),
            HandleKind::ConstCxxPtr => TypeConstructor::const_cxx_ptr(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
enum SlotKey {
    Registered(TypeId),
    Derived(TypeId, HandleKind),
    Parametric(TypeId),
}

type Slot = &'static GcSafeOnceLock<DataType>;

struct TypeRegistry {
    slots: Cache<FnvHashMap<SlotKey, Slot>>,
}

impl TypeRegistry {
    fn new() -> Self {
        TypeRegistry {
            slots: Cache::default(),
        }
    }

    fn find(&self, key: SlotKey) -> Option<DataType> {
        // Safety: reading the cache never allocates.
        let slot = unsafe { self.slots.read(|inner| inner.cache().get(&key).copied()) }?;
        slot.get().copied()
    }

    // Slots are never removed, so they can be leaked.
    fn slot(&self, key: SlotKey) -> Slot {
        unsafe {
            if let Some(slot) = self.slots.read(|inner| inner.cache().get(&key).copied()) {
                return slot;
            }

            self.slots.write(|inner| {
                *inner
                    .cache_mut()
                    .entry(key)
                    .or_insert_with(|| Box::leak(Box::new(GcSafeOnceLock::new())))
            })
        }
    }

    fn root(&self, ty: DataType) {
        unsafe {
            self.slots.write(|inner| inner.roots_mut().insert(ty.as_value()));
        }
    }
}

/// Types that have a Julia datatype.
pub trait JuliaType {
    /// Returns the datatype of `Self`.
    fn julia_type() -> MarshalResult<DataType>;
}

/// Types whose datatype must be registered with [`register_type`].
///
/// Safety: implemented by [`mirrored_type!`] and [`wrapped_type!`], the strategy must match the
/// layout of the registered datatype.
///
/// [`wrapped_type!`]: crate::wrapped_type
/// [`mirrored_type!`]: crate::mirrored_type
pub unsafe trait RegisteredType: JuliaType + MappingTrait + 'static {}

/// Returns the datatype of `T`.
///
/// Fails with `TypeMappingError::NotRegistered` if `T`, or the pointee of `T` if it's a
/// reference or pointer, hasn't been registered yet. This error is recoverable: the type can be
/// registered later and the next call succeeds.
#[inline]
pub fn julia_type<T: JuliaType>() -> MarshalResult<DataType> {
    T::julia_type()
}

/// Returns the datatype that is declared as the return type of a function that returns `T`.
///
/// Classes passed by value are returned as boxed handles whose exact type is determined at
/// runtime, so their return type is `Any`.
pub fn julia_return_type<T: JuliaType + MappingTrait>() -> MarshalResult<DataType> {
    match mapping_strategy::<T>() {
        StrategyKind::CxxWrapped => Ok(DataType::any_type()),
        _ => T::julia_type(),
    }
}

/// Register `ty` as the datatype of `T`.
///
/// A mirrored type must be registered with a concrete type of the same size, a class passed by
/// value with a mutable handle type. A type can only be registered once, a second
/// attempt fails with `TypeMappingError::AlreadyRegistered` and leaves the existing datatype in
/// place.
pub fn register_type<T: RegisteredType>(ty: DataType) -> MarshalResult<()> {
    let _guard = runtime().lock();
    let registry = &*TYPE_REGISTRY;
    let slot = registry.slot(SlotKey::Registered(TypeId::of::<T>()));

    if let Some(existing) = slot.get() {
        log::warn!(
            "{} is already registered as {}, ignoring {}",
            type_name::<T>(),
            existing,
            ty
        );
        Err(TypeMappingError::AlreadyRegistered {
            type_name: type_name::<T>().into(),
        })?
    }

    check_registered_layout::<T>(ty)?;

    if slot.set(ty).is_err() {
        Err(TypeMappingError::AlreadyRegistered {
            type_name: type_name::<T>().into(),
        })?
    }

    registry.root(ty);
    log::debug!("registered {} as {}", type_name::<T>(), ty);
    Ok(())
}

/// Register `ty` as the datatype of `T`, see [`register_type`].
///
/// Panics if registration fails.
pub fn set_julia_type<T: RegisteredType>(ty: DataType) {
    if let Err(e) = register_type::<T>(ty) {
        panic!("{}", e)
    }
}

/// Returns `true` if `T` has been registered.
pub fn has_julia_type<T: RegisteredType>() -> bool {
    TYPE_REGISTRY
        .find(SlotKey::Registered(TypeId::of::<T>()))
        .is_some()
}

#[doc(hidden)]
pub fn registered_type<T: RegisteredType>() -> MarshalResult<DataType> {
    match TYPE_REGISTRY.find(SlotKey::Registered(TypeId::of::<T>())) {
        Some(ty) => Ok(ty),
        None => Err(TypeMappingError::NotRegistered {
            type_name: type_name::<T>().into(),
        })?,
    }
}

/// Returns the datatype of a reference or pointer to `T`.
///
/// The datatype is `kind` applied to the datatype of `T`, or to its supertype if `T` is a class
/// passed by value. It's resolved once and cached.
pub fn derived_type<T>(kind: HandleKind) -> MarshalResult<DataType>
where
    T: JuliaType + MappingTrait + 'static,
{
    let registry = &*TYPE_REGISTRY;
    let slot = registry.slot(SlotKey::Derived(TypeId::of::<T>(), kind));

    slot.get_or_try_init(|| -> MarshalResult<DataType> {
        let pointee = T::julia_type()?;
        let pointee = <T::Strategy as MappingStrategy>::pointee_type(pointee, type_name::<T>())?;
        let ty = kind.constructor().apply_type(&[pointee.as_value()])?;
        registry.root(ty);

        log::debug!("resolved {:?} of {} as {}", kind, type_name::<T>(), ty);
        Ok(ty)
    })
    .copied()
}

// Datatypes of parametric wrappers like `StrictlyTypedNumber{N}`, keyed by the Rust type `K`.
pub(crate) fn parametric_type<K: 'static>(
    init: impl FnOnce() -> MarshalResult<DataType>,
) -> MarshalResult<DataType> {
    let registry = &*TYPE_REGISTRY;
    let slot = registry.slot(SlotKey::Parametric(TypeId::of::<K>()));

    slot.get_or_try_init(|| -> MarshalResult<DataType> {
        let ty = init()?;
        registry.root(ty);
        log::debug!("resolved {} as {}", type_name::<K>(), ty);
        Ok(ty)
    })
    .copied()
}

/// Look up a type or type constructor by name.
///
/// If `module` is `None`, the `CxxWrap`, `Core` and `Main` modules are searched in that order.
pub fn julia_type_by_name(name: &str, module: Option<Module>) -> MarshalResult<Value> {
    let value = match module {
        Some(module) => module.global(name)?,
        None => [Module::cxxwrap(), Module::core()]
            .into_iter()
            .find_map(|module| module.global(name).ok())
            .map(Ok)
            .unwrap_or_else(|| Module::main().global(name))?,
    };

    if value.as_datatype().is_none() && value.as_type_constructor().is_none() {
        Err(TypeMappingError::NotAType { name: name.into() })?
    }

    Ok(value)
}

fn check_registered_layout<T: RegisteredType>(ty: DataType) -> MarshalResult<()> {
    match mapping_strategy::<T>() {
        StrategyKind::Direct => {
            if ty.is_abstract() || ty.size() != std::mem::size_of::<T>() {
                Err(TypeMappingError::InvalidLayout {
                    type_name: type_name::<T>().into(),
                    reason: format!(
                        "{} bytes can't be stored in an instance of {}",
                        std::mem::size_of::<T>(),
                        ty
                    ),
                })?
            }
        }
        StrategyKind::CxxWrapped => {
            if !ty.is_handle_type() || !ty.is_mutable() {
                Err(TypeMappingError::NotAHandleType {
                    type_name: ty.to_string(),
                })?
            }
        }
        _ => (),
    }

    Ok(())
}

// Called by the collector during the mark phase.
pub(crate) fn mark_registry(out: &mut Vec<*mut jl_value_t>) {
    if let Some(registry) = Lazy::get(&TYPE_REGISTRY) {
        // Safety: writers never allocate, so they can't be waiting for this collection.
        unsafe { registry.slots.mark(out) }
    }
}

impl<'a, T: JuliaType + MappingTrait + 'static> JuliaType for &'a T {
    #[inline]
    fn julia_type() -> MarshalResult<DataType> {
        derived_type::<T>(HandleKind::ConstCxxRef)
    }
}

impl<'a, T: JuliaType + MappingTrait + 'static> JuliaType for &'a mut T {
    #[inline]
    fn julia_type() -> MarshalResult<DataType> {
        derived_type::<T>(HandleKind::CxxRef)
    }
}

impl<T: JuliaType + MappingTrait + 'static> JuliaType for *const T {
    #[inline]
    fn julia_type() -> MarshalResult<DataType> {
        derived_type::<T>(HandleKind::ConstCxxPtr)
    }
}

impl<T: JuliaType + MappingTrait + 'static> JuliaType for *mut T {
    #[inline]
    fn julia_type() -> MarshalResult<DataType> {
        derived_type::<T>(HandleKind::CxxPtr)
    }
}

impl JuliaType for Value {
    #[inline]
    fn julia_type() -> MarshalResult<DataType> {
        Ok(DataType::any_type())
    }
}

impl JuliaType for *mut jl_value_t {
    #[inline]
    fn julia_type() -> MarshalResult<DataType> {
        Ok(DataType::any_type())
    }
}

impl JuliaType for *mut c_void {
    #[inline]
    fn julia_type() -> MarshalResult<DataType> {
        Ok(DataType::voidpointer_type())
    }
}
