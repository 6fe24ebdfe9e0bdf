//! The in-process Julia host.
//!
//! This module contains the raw object model of the host: every managed object is a
//! [`jl_value_t`] that consists of a header and a payload. The header stores the datatype of the
//! object and its mark bit, the payload is either inline data, a datatype, a type constructor, or
//! a module. Objects are allocated by the [`heap`] and can be moved to Rust only as raw pointers
//! or as the handles defined in [`crate::data::managed`].
//!
//! Nothing in this module is synchronized, all access must happen while the runtime lock is
//! held.

pub(crate) mod bootstrap;
pub(crate) mod heap;

use std::{
    cell::{Cell, RefCell, UnsafeCell},
    ptr::null_mut,
};

use fnv::FnvHashMap;
use smallvec::SmallVec;

/// A managed object.
///
/// Pointers to this type are the universal dynamically typed values of the host. They can be
/// passed through conversion functions unchanged.
#[allow(non_camel_case_types)]
pub struct jl_value_t {
    pub(crate) ty: Cell<*mut jl_value_t>,
    pub(crate) marked: Cell<bool>,
    pub(crate) payload: Payload,
}

/// A finalizer, called with the object it was attached to.
pub type Finalizer = unsafe fn(*mut jl_value_t);

pub(crate) enum Payload {
    // Storage is word-sized so the data is aligned to at least 8 bytes.
    Bits(UnsafeCell<SmallVec<[u64; 2]>>),
    DataType(Box<DataTypeLayout>),
    Constructor(Box<ConstructorLayout>),
    Module(Box<ModuleLayout>),
}

impl Payload {
    pub(crate) fn zeroed_bits(size: usize) -> Self {
        let n_words = (size + 7) / 8;
        Payload::Bits(UnsafeCell::new(SmallVec::from_elem(0, n_words)))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct TypeFlags {
    pub(crate) is_abstract: bool,
    pub(crate) mutable: bool,
    pub(crate) isbits: bool,
}

pub(crate) struct FieldLayout {
    pub(crate) name: String,
    pub(crate) ty: *mut jl_value_t,
    pub(crate) offset: usize,
}

pub(crate) struct DataTypeLayout {
    pub(crate) name: String,
    pub(crate) super_type: Cell<*mut jl_value_t>,
    pub(crate) parameters: SmallVec<[*mut jl_value_t; 2]>,
    pub(crate) fields: Vec<FieldLayout>,
    pub(crate) size: usize,
    pub(crate) flags: TypeFlags,
    // The constructor this type was instantiated from, null if the type is not parametric.
    pub(crate) constructor: *mut jl_value_t,
}

impl DataTypeLayout {
    pub(crate) fn new(name: impl Into<String>, super_type: *mut jl_value_t) -> Self {
        DataTypeLayout {
            name: name.into(),
            super_type: Cell::new(super_type),
            parameters: SmallVec::new(),
            fields: Vec::new(),
            size: 0,
            flags: TypeFlags::default(),
            constructor: null_mut(),
        }
    }
}

pub(crate) enum SuperSpec {
    Fixed(*mut jl_value_t),
    // Apply this constructor to the same parameters.
    Applied(*mut jl_value_t),
}

pub(crate) enum FieldType {
    Fixed(*mut jl_value_t),
    Parameter(usize),
}

pub(crate) struct FieldTemplate {
    pub(crate) name: String,
    pub(crate) ty: FieldType,
}

pub(crate) struct ConstructorLayout {
    pub(crate) name: String,
    pub(crate) n_params: usize,
    pub(crate) super_spec: SuperSpec,
    pub(crate) fields: Vec<FieldTemplate>,
    pub(crate) is_abstract: bool,
    pub(crate) mutable: bool,
    pub(crate) cache: RefCell<Vec<*mut jl_value_t>>,
}

pub(crate) struct ModuleLayout {
    pub(crate) name: String,
    pub(crate) globals: RefCell<FnvHashMap<String, *mut jl_value_t>>,
}

impl jl_value_t {
    pub(crate) fn new(ty: *mut jl_value_t, payload: Payload) -> Self {
        jl_value_t {
            ty: Cell::new(ty),
            marked: Cell::new(false),
            payload,
        }
    }

    // Push all objects directly referenced by this one.
    pub(crate) fn children(&self, out: &mut Vec<*mut jl_value_t>) {
        out.push(self.ty.get());

        match &self.payload {
            Payload::Bits(_) => (),
            Payload::DataType(layout) => {
                out.push(layout.super_type.get());
                out.extend(layout.parameters.iter().copied());
                out.extend(layout.fields.iter().map(|f| f.ty));
                out.push(layout.constructor);
            }
            Payload::Constructor(layout) => {
                match layout.super_spec {
                    SuperSpec::Fixed(ty) | SuperSpec::Applied(ty) => out.push(ty),
                }
                for field in layout.fields.iter() {
                    if let FieldType::Fixed(ty) = field.ty {
                        out.push(ty);
                    }
                }
                out.extend(layout.cache.borrow().iter().copied());
            }
            Payload::Module(layout) => {
                out.extend(layout.globals.borrow().values().copied());
            }
        }
    }
}
