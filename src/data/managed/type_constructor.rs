//! Managed type for parametric types.
//!
//! A [`TypeConstructor`] is a type with free type parameters like `CxxRef{T}`. Applying it to
//! concrete parameters returns a [`DataType`]. Instantiations are cached by the constructor, so
//! applying the same parameters twice returns the identical datatype.

use std::fmt;

use smallvec::SmallVec;

use super::{datatype::DataType, private::ManagedPriv, value::Value, Managed};
use crate::{
    error::{MarshalResult, TypeMappingError},
    private::Private,
    runtime::runtime,
    sys::{
        jl_value_t, ConstructorLayout, DataTypeLayout, FieldLayout, FieldType, Payload, SuperSpec,
        TypeFlags,
    },
};

/// A parametric type.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct TypeConstructor(Value);

macro_rules! builtin_constructors {
    ($($(#[$meta:meta])* $name:ident => $field:ident),+ $(,)?) => {
        $(
            $(#[$meta])*
            #[inline]
            pub fn $name() -> TypeConstructor {
                // Safety: builtins are pinned.
                unsafe { TypeConstructor::wrap(runtime().builtins().$field) }
            }
        )+
    };
}

impl TypeConstructor {
    // Safety: `ptr` must point to a live type constructor.
    #[inline]
    pub(crate) unsafe fn wrap(ptr: *mut jl_value_t) -> Self {
        TypeConstructor(Value::wrap(ptr, Private))
    }

    fn layout<'a>(self) -> &'a ConstructorLayout {
        match &self.0.object().payload {
            Payload::Constructor(layout) => layout,
            _ => unreachable!("type constructor without constructor layout"),
        }
    }

    builtin_constructors! {
        /// `Ref{T}`
        ref_type => ref_ctor,
        /// `CxxWrap.CxxBaseRef{T}`, the supertype of the four reference and pointer types.
        cxx_base_ref => cxx_base_ref_ctor,
        /// `CxxWrap.CxxRef{T}`
        cxx_ref => cxx_ref_ctor,
        /// `CxxWrap.ConstCxxRef{T}`
        const_cxx_ref => const_cxx_ref_ctor,
        /// `CxxWrap.CxxPtr{T}`
        cxx_ptr => cxx_ptr_ctor,
        /// `CxxWrap.ConstCxxPtr{T}`
        const_cxx_ptr => const_cxx_ptr_ctor,
        /// `CxxWrap.StrictlyTypedNumber{T}`
        strictly_typed_number => strictly_typed_number_ctor,
    }

    /// Returns the name of this constructor.
    pub fn name(self) -> String {
        self.layout().name.clone()
    }

    /// Returns the number of type parameters this constructor expects.
    pub fn n_parameters(self) -> usize {
        self.layout().n_params
    }

    /// Returns the number of distinct instantiations that have been created.
    pub fn n_instantiations(self) -> usize {
        let _guard = runtime().lock();
        self.layout().cache.borrow().len()
    }

    /// Instantiate this constructor with `params`.
    ///
    /// Every parameter must be a datatype. If this constructor has already been applied to the
    /// same parameters, the existing datatype is returned.
    pub fn apply_type(self, params: &[Value]) -> MarshalResult<DataType> {
        let rt = runtime();
        rt.scope(|frame| -> MarshalResult<DataType> {
            let layout = self.layout();
            if params.len() != layout.n_params {
                Err(TypeMappingError::ParameterCount {
                    name: layout.name.clone(),
                    expected: layout.n_params,
                    found: params.len(),
                })?
            }

            for param in params.iter().copied() {
                if param.as_datatype().is_none() {
                    Err(TypeMappingError::InvalidTypeParameter {
                        name: layout.name.clone(),
                        parameter: param.to_string(),
                    })?
                }
            }

            if let Some(cached) = self.find_cached(params) {
                return Ok(cached);
            }

            for param in params.iter().copied() {
                frame.root(param);
            }

            let super_type = match layout.super_spec {
                SuperSpec::Fixed(ty) => ty,
                SuperSpec::Applied(ctor) => {
                    // Safety: the super constructor is reachable from this constructor.
                    let ctor = unsafe { TypeConstructor::wrap(ctor) };
                    frame.root(ctor.apply_type(params)?).unwrap(Private)
                }
            };

            let mut fields = Vec::with_capacity(layout.fields.len());
            let mut offset = 0;
            let mut max_align = 1;
            let mut isbits = !layout.is_abstract && !layout.mutable;
            for field in layout.fields.iter() {
                let ty = match field.ty {
                    FieldType::Fixed(ty) => unsafe { DataType::wrap(ty) },
                    FieldType::Parameter(idx) => params[idx]
                        .as_datatype()
                        .filter(|ty| ty.is_bits())
                        .ok_or_else(|| TypeMappingError::InvalidTypeParameter {
                            name: layout.name.clone(),
                            parameter: params[idx].to_string(),
                        })?,
                };

                let size = ty.size();
                let align = size.next_power_of_two().clamp(1, 8);
                max_align = max_align.max(align);
                offset = round_up(offset, align);
                isbits &= ty.is_bits();

                fields.push(FieldLayout {
                    name: field.name.clone(),
                    ty: ty.unwrap(Private),
                    offset,
                });

                offset += size;
            }

            let mut dt_layout = DataTypeLayout::new(layout.name.clone(), super_type);
            dt_layout.parameters = params.iter().map(|p| p.unwrap(Private)).collect();
            dt_layout.fields = fields;
            dt_layout.size = round_up(offset, max_align);
            dt_layout.flags = TypeFlags {
                is_abstract: layout.is_abstract,
                mutable: layout.mutable,
                isbits,
            };
            dt_layout.constructor = self.0.unwrap(Private);

            // Safety: everything the layout references is rooted or reachable from this
            // constructor.
            let dt = unsafe {
                let dt_type = rt.builtins().datatype_type;
                let ptr = rt.alloc(dt_type, Payload::DataType(Box::new(dt_layout)));
                DataType::wrap(ptr.as_ptr())
            };

            layout.cache.borrow_mut().push(dt.unwrap(Private));
            Ok(dt)
        })
    }

    fn find_cached(self, params: &[Value]) -> Option<DataType> {
        let params: SmallVec<[*mut jl_value_t; 2]> =
            params.iter().map(|p| p.unwrap(Private)).collect();

        self.layout()
            .cache
            .borrow()
            .iter()
            .copied()
            .map(|ty| unsafe { DataType::wrap(ty) })
            .find(|ty| ty.layout().parameters == params)
    }
}

fn round_up(n: usize, align: usize) -> usize {
    (n + align - 1) / align * align
}

impl ManagedPriv for TypeConstructor {}
impl Managed for TypeConstructor {
    #[inline]
    fn as_value(self) -> Value {
        self.0
    }
}

impl fmt::Display for TypeConstructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.layout().name)
    }
}

impl_debug!(TypeConstructor);
