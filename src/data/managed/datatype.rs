//! Managed type for `DataType`, the type of types.
//!
//! A [`DataType`] describes the layout and the place in the type hierarchy of the values of its
//! type. Datatypes are managed data themselves: a datatype that is not reachable from a root can
//! be freed like any other value.

use std::fmt;

use smallvec::SmallVec;

use super::{private::ManagedPriv, type_constructor::TypeConstructor, value::Value, Managed};
use crate::{
    error::{MarshalResult, TypeMappingError},
    private::Private,
    runtime::runtime,
    sys::{jl_value_t, DataTypeLayout, FieldLayout, Payload, TypeFlags},
};

/// A field of a new struct type: its name, type and byte offset.
pub type FieldSpec<'a> = (&'a str, DataType, usize);

/// The type of a value.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct DataType(Value);

macro_rules! builtin_types {
    ($($(#[$meta:meta])* $name:ident),+ $(,)?) => {
        $(
            $(#[$meta])*
            #[inline]
            pub fn $name() -> DataType {
                // Safety: builtins are pinned.
                unsafe { DataType::wrap(runtime().builtins().$name) }
            }
        )+
    };
}

impl DataType {
    // Safety: `ptr` must point to a live datatype.
    #[inline]
    pub(crate) unsafe fn wrap(ptr: *mut jl_value_t) -> Self {
        DataType(Value::wrap(ptr, Private))
    }

    pub(crate) fn layout<'a>(self) -> &'a DataTypeLayout {
        match &self.0.object().payload {
            Payload::DataType(layout) => layout,
            _ => unreachable!("datatype without datatype layout"),
        }
    }

    builtin_types! {
        /// The type `DataType`.
        datatype_type,
        /// The type `Any`, the supertype of all types.
        any_type,
        /// The type `Nothing`.
        nothing_type,
        /// The type `Bool`.
        bool_type,
        /// The type `Int8`.
        int8_type,
        /// The type `Int16`.
        int16_type,
        /// The type `Int32`.
        int32_type,
        /// The type `Int64`.
        int64_type,
        /// The type `UInt8`.
        uint8_type,
        /// The type `UInt16`.
        uint16_type,
        /// The type `UInt32`.
        uint32_type,
        /// The type `UInt64`.
        uint64_type,
        /// The type `Float16`.
        float16_type,
        /// The type `Float32`.
        float32_type,
        /// The type `Float64`.
        float64_type,
        /// The type `Ptr{Nothing}`.
        voidpointer_type,
        /// The type `Module`.
        module_type,
        /// The type `UnionAll`.
        unionall_type,
    }

    /// Create a new abstract type.
    pub fn new_abstract(name: &str, super_type: DataType) -> MarshalResult<DataType> {
        check_super_type(name, super_type)?;

        let mut layout = DataTypeLayout::new(name, super_type.unwrap(Private));
        layout.flags.is_abstract = true;
        Ok(alloc_datatype(layout, &[super_type]))
    }

    /// Create a new concrete struct type.
    ///
    /// Every field must have an isbits type and fit in `size` bytes. If the type is immutable
    /// and has only isbits fields it's an isbits type itself.
    pub fn new_struct_type(
        name: &str,
        super_type: DataType,
        fields: &[FieldSpec],
        size: usize,
        mutable: bool,
    ) -> MarshalResult<DataType> {
        check_super_type(name, super_type)?;

        let mut roots: SmallVec<[DataType; 4]> = SmallVec::new();
        roots.push(super_type);

        let mut field_layouts = Vec::with_capacity(fields.len());
        for (field_name, field_ty, offset) in fields.iter().copied() {
            if !field_ty.is_bits() {
                Err(TypeMappingError::InvalidLayout {
                    type_name: name.into(),
                    reason: format!("field {} of type {} is not isbits", field_name, field_ty),
                })?
            }

            if offset + field_ty.size() > size {
                Err(TypeMappingError::InvalidLayout {
                    type_name: name.into(),
                    reason: format!("field {} doesn't fit in {} bytes", field_name, size),
                })?
            }

            roots.push(field_ty);
            field_layouts.push(FieldLayout {
                name: field_name.into(),
                ty: field_ty.unwrap(Private),
                offset,
            });
        }

        let mut layout = DataTypeLayout::new(name, super_type.unwrap(Private));
        layout.fields = field_layouts;
        layout.size = size;
        layout.flags = TypeFlags {
            is_abstract: false,
            mutable,
            isbits: !mutable,
        };

        Ok(alloc_datatype(layout, &roots))
    }

    /// Create a new type with a single field of type `Ptr{Nothing}` named `cpp_object`.
    ///
    /// Instances of a handle type store the address of a native object. If they're mutable,
    /// finalizers can be attached to them.
    pub fn new_handle_type(
        name: &str,
        super_type: DataType,
        mutable: bool,
    ) -> MarshalResult<DataType> {
        let voidptr = DataType::voidpointer_type();
        DataType::new_struct_type(
            name,
            super_type,
            &[("cpp_object", voidptr, 0)],
            voidptr.size(),
            mutable,
        )
    }

    /// Returns the name of this type without its parameters.
    pub fn name(self) -> String {
        self.layout().name.clone()
    }

    /// Returns the direct supertype of this type, `None` if this type is `Any`.
    pub fn super_type(self) -> Option<DataType> {
        let super_type = self.layout().super_type.get();
        if super_type.is_null() || super_type == self.unwrap(Private) {
            return None;
        }

        // Safety: the supertype is reachable from this type.
        unsafe { Some(DataType::wrap(super_type)) }
    }

    /// Returns the type parameters of this type.
    pub fn parameters(self) -> SmallVec<[Value; 2]> {
        self.layout()
            .parameters
            .iter()
            .map(|p| unsafe { Value::wrap(*p, Private) })
            .collect()
    }

    /// Returns the number of type parameters.
    pub fn n_parameters(self) -> usize {
        self.layout().parameters.len()
    }

    /// Returns the type parameter at position `idx`.
    pub fn parameter(self, idx: usize) -> Option<Value> {
        self.layout()
            .parameters
            .get(idx)
            .map(|p| unsafe { Value::wrap(*p, Private) })
    }

    /// Returns the number of fields.
    pub fn n_fields(self) -> usize {
        self.layout().fields.len()
    }

    /// Returns the names of the fields.
    pub fn field_names(self) -> Vec<String> {
        self.layout().fields.iter().map(|f| f.name.clone()).collect()
    }

    /// Returns the type of the field at position `idx`.
    pub fn field_type(self, idx: usize) -> Option<DataType> {
        self.layout()
            .fields
            .get(idx)
            .map(|f| unsafe { DataType::wrap(f.ty) })
    }

    /// Returns the byte offset of the field at position `idx`.
    pub fn field_offset(self, idx: usize) -> Option<usize> {
        self.layout().fields.get(idx).map(|f| f.offset)
    }

    /// Returns the size of an instance of this type in bytes.
    pub fn size(self) -> usize {
        self.layout().size
    }

    pub fn is_abstract(self) -> bool {
        self.layout().flags.is_abstract
    }

    pub fn is_concrete(self) -> bool {
        !self.is_abstract()
    }

    pub fn is_mutable(self) -> bool {
        self.layout().flags.mutable
    }

    /// Returns `true` if instances of this type are immutable and contain no references.
    pub fn is_bits(self) -> bool {
        self.layout().flags.isbits
    }

    /// Returns `true` if this type has exactly one field, of type `Ptr{Nothing}`.
    pub fn is_handle_type(self) -> bool {
        self.n_fields() == 1
            && self.field_type(0) == Some(DataType::voidpointer_type())
            && self.size() == DataType::voidpointer_type().size()
    }

    /// Returns the constructor this type was instantiated from, if it's parametric.
    pub fn type_constructor(self) -> Option<TypeConstructor> {
        let ctor = self.layout().constructor;
        if ctor.is_null() {
            return None;
        }

        // Safety: the constructor is reachable from this type.
        unsafe { Some(TypeConstructor::wrap(ctor)) }
    }

    /// Returns `true` if this type is `other` or one of its subtypes.
    pub fn is_subtype_of(self, other: DataType) -> bool {
        let mut current = Some(self);
        while let Some(ty) = current {
            if ty == other {
                return true;
            }
            current = ty.super_type();
        }

        false
    }
}

/// Returns the printable name of `ty`, including its parameters.
pub fn julia_type_name(ty: DataType) -> String {
    ty.to_string()
}

fn check_super_type(name: &str, super_type: DataType) -> MarshalResult<()> {
    if !super_type.is_abstract() {
        Err(TypeMappingError::InvalidLayout {
            type_name: name.into(),
            reason: format!("supertype {} is not abstract", super_type),
        })?
    }

    Ok(())
}

// The types referenced by `layout` must be passed as `roots`.
fn alloc_datatype(layout: DataTypeLayout, roots: &[DataType]) -> DataType {
    let rt = runtime();
    rt.scope(|frame| {
        for root in roots.iter().copied() {
            frame.root(root);
        }

        // Safety: the layout only references rooted types.
        unsafe {
            let dt_type = rt.builtins().datatype_type;
            let ptr = rt.alloc(dt_type, Payload::DataType(Box::new(layout)));
            DataType::wrap(ptr.as_ptr())
        }
    })
}

impl ManagedPriv for DataType {}
impl Managed for DataType {
    #[inline]
    fn as_value(self) -> Value {
        self.0
    }
}

impl DataType {
    #[inline]
    pub(crate) fn unwrap(self, _: Private) -> *mut jl_value_t {
        self.0.unwrap(Private)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let layout = self.layout();
        f.write_str(&layout.name)?;

        if !layout.parameters.is_empty() {
            f.write_str("{")?;
            for (i, param) in self.parameters().into_iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", param)?;
            }
            f.write_str("}")?;
        }

        Ok(())
    }
}

impl_debug!(DataType);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_hierarchy() {
        let any = DataType::any_type();
        assert_eq!(any.super_type(), None);
        assert_eq!(DataType::int32_type().super_type(), Some(any));
        assert!(DataType::datatype_type().is_subtype_of(any));
        assert!(!any.is_subtype_of(DataType::int32_type()));
    }

    #[test]
    fn builtin_names() {
        assert_eq!(DataType::float64_type().to_string(), "Float64");
        assert_eq!(DataType::voidpointer_type().to_string(), "Ptr{Nothing}");
        assert_eq!(DataType::voidpointer_type().name(), "Ptr");
    }

    #[test]
    fn handle_type_layout() {
        crate::runtime::scope(|frame| {
            let base = frame.root(DataType::new_abstract("HandleBase", DataType::any_type()).unwrap());
            let handle = frame.root(DataType::new_handle_type("HandleAllocated", base, true).unwrap());

            assert!(handle.is_handle_type());
            assert!(handle.is_mutable());
            assert!(!handle.is_bits());
            assert_eq!(handle.field_names(), vec!["cpp_object".to_string()]);
            assert_eq!(handle.super_type(), Some(base));
            assert!(!base.is_handle_type());
        })
    }

    #[test]
    fn struct_type_checks_layout() {
        crate::runtime::scope(|_| {
            let f64_ty = DataType::float64_type();
            let err = DataType::new_struct_type(
                "TooSmall",
                DataType::any_type(),
                &[("x", f64_ty, 0), ("y", f64_ty, 8)],
                12,
                false,
            )
            .unwrap_err();
            assert!(err.to_string().contains("doesn't fit"));

            let err = DataType::new_abstract("NotAbstractSuper", f64_ty).unwrap_err();
            assert!(err.to_string().contains("not abstract"));
        })
    }
}
