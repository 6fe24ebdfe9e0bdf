//! Creation of the builtin types, values and modules.

use std::{cell::RefCell, mem::size_of, ptr::null_mut};

use fnv::FnvHashMap;
use smallvec::smallvec;

use super::{
    heap::Heap, jl_value_t, ConstructorLayout, DataTypeLayout, FieldTemplate, FieldType,
    ModuleLayout, Payload, SuperSpec, TypeFlags,
};

/// Pointers to the builtin objects. All of them are pinned for the lifetime of the process.
pub(crate) struct Builtins {
    pub(crate) datatype_type: *mut jl_value_t,
    pub(crate) any_type: *mut jl_value_t,
    pub(crate) nothing_type: *mut jl_value_t,
    pub(crate) bool_type: *mut jl_value_t,
    pub(crate) int8_type: *mut jl_value_t,
    pub(crate) int16_type: *mut jl_value_t,
    pub(crate) int32_type: *mut jl_value_t,
    pub(crate) int64_type: *mut jl_value_t,
    pub(crate) uint8_type: *mut jl_value_t,
    pub(crate) uint16_type: *mut jl_value_t,
    pub(crate) uint32_type: *mut jl_value_t,
    pub(crate) uint64_type: *mut jl_value_t,
    pub(crate) float16_type: *mut jl_value_t,
    pub(crate) float32_type: *mut jl_value_t,
    pub(crate) float64_type: *mut jl_value_t,
    pub(crate) voidpointer_type: *mut jl_value_t,
    pub(crate) module_type: *mut jl_value_t,
    pub(crate) unionall_type: *mut jl_value_t,
    pub(crate) nothing: *mut jl_value_t,
    pub(crate) true_v: *mut jl_value_t,
    pub(crate) false_v: *mut jl_value_t,
    pub(crate) ref_ctor: *mut jl_value_t,
    pub(crate) cxx_base_ref_ctor: *mut jl_value_t,
    pub(crate) cxx_ref_ctor: *mut jl_value_t,
    pub(crate) const_cxx_ref_ctor: *mut jl_value_t,
    pub(crate) cxx_ptr_ctor: *mut jl_value_t,
    pub(crate) const_cxx_ptr_ctor: *mut jl_value_t,
    pub(crate) strictly_typed_number_ctor: *mut jl_value_t,
    pub(crate) core_module: *mut jl_value_t,
    pub(crate) cxxwrap_module: *mut jl_value_t,
    pub(crate) main_module: *mut jl_value_t,
}

// Builtins are pinned and never mutated after bootstrapping.
unsafe impl Send for Builtins {}
unsafe impl Sync for Builtins {}

unsafe fn set_super(ty: *mut jl_value_t, super_type: *mut jl_value_t) {
    if let Payload::DataType(layout) = &(*ty).payload {
        layout.super_type.set(super_type);
    }
}

fn new_abstract(
    heap: &mut Heap,
    datatype_type: *mut jl_value_t,
    name: &str,
    super_type: *mut jl_value_t,
) -> *mut jl_value_t {
    let mut layout = DataTypeLayout::new(name, super_type);
    layout.flags.is_abstract = true;
    heap.insert(datatype_type, Payload::DataType(Box::new(layout)))
}

fn new_primitive(
    heap: &mut Heap,
    datatype_type: *mut jl_value_t,
    name: &str,
    super_type: *mut jl_value_t,
    size: usize,
) -> *mut jl_value_t {
    let mut layout = DataTypeLayout::new(name, super_type);
    layout.size = size;
    layout.flags.isbits = true;
    heap.insert(datatype_type, Payload::DataType(Box::new(layout)))
}

fn new_opaque(
    heap: &mut Heap,
    datatype_type: *mut jl_value_t,
    name: &str,
    super_type: *mut jl_value_t,
) -> *mut jl_value_t {
    let mut layout = DataTypeLayout::new(name, super_type);
    layout.flags = TypeFlags {
        is_abstract: false,
        mutable: true,
        isbits: false,
    };
    heap.insert(datatype_type, Payload::DataType(Box::new(layout)))
}

fn new_constructor(
    heap: &mut Heap,
    unionall_type: *mut jl_value_t,
    name: &str,
    super_spec: SuperSpec,
    fields: Vec<FieldTemplate>,
    is_abstract: bool,
) -> *mut jl_value_t {
    let layout = ConstructorLayout {
        name: name.into(),
        n_params: 1,
        super_spec,
        fields,
        is_abstract,
        mutable: false,
        cache: RefCell::new(Vec::new()),
    };
    heap.insert(unionall_type, Payload::Constructor(Box::new(layout)))
}

fn new_module(
    heap: &mut Heap,
    module_type: *mut jl_value_t,
    name: &str,
    globals: &[(&str, *mut jl_value_t)],
) -> *mut jl_value_t {
    let globals: FnvHashMap<String, *mut jl_value_t> = globals
        .iter()
        .map(|(name, value)| (String::from(*name), *value))
        .collect();

    let layout = ModuleLayout {
        name: name.into(),
        globals: RefCell::new(globals),
    };
    heap.insert(module_type, Payload::Module(Box::new(layout)))
}

unsafe fn new_bool(heap: &mut Heap, bool_type: *mut jl_value_t, b: bool) -> *mut jl_value_t {
    let obj = heap.insert(bool_type, Payload::zeroed_bits(1));
    if let Payload::Bits(bits) = &(*obj).payload {
        (*bits.get()).as_mut_ptr().cast::<u8>().write(b as u8);
    }
    obj
}

fn handle_fields(voidpointer_type: *mut jl_value_t) -> Vec<FieldTemplate> {
    vec![FieldTemplate {
        name: "cpp_object".into(),
        ty: FieldType::Fixed(voidpointer_type),
    }]
}

// Safety: must be called exactly once, before the heap is shared.
pub(crate) unsafe fn bootstrap(heap: &mut Heap) -> Builtins {
    let mut dt_layout = DataTypeLayout::new("DataType", null_mut());
    dt_layout.flags.mutable = true;
    let datatype_type = heap.insert(null_mut(), Payload::DataType(Box::new(dt_layout)));
    (*datatype_type).ty.set(datatype_type);

    let any_type = new_abstract(heap, datatype_type, "Any", null_mut());
    set_super(any_type, any_type);
    set_super(datatype_type, any_type);

    let dt = datatype_type;
    let nothing_type = new_primitive(heap, dt, "Nothing", any_type, 0);
    let bool_type = new_primitive(heap, dt, "Bool", any_type, 1);
    let int8_type = new_primitive(heap, dt, "Int8", any_type, 1);
    let int16_type = new_primitive(heap, dt, "Int16", any_type, 2);
    let int32_type = new_primitive(heap, dt, "Int32", any_type, 4);
    let int64_type = new_primitive(heap, dt, "Int64", any_type, 8);
    let uint8_type = new_primitive(heap, dt, "UInt8", any_type, 1);
    let uint16_type = new_primitive(heap, dt, "UInt16", any_type, 2);
    let uint32_type = new_primitive(heap, dt, "UInt32", any_type, 4);
    let uint64_type = new_primitive(heap, dt, "UInt64", any_type, 8);
    let float16_type = new_primitive(heap, dt, "Float16", any_type, 2);
    let float32_type = new_primitive(heap, dt, "Float32", any_type, 4);
    let float64_type = new_primitive(heap, dt, "Float64", any_type, 8);

    let mut ptr_layout = DataTypeLayout::new("Ptr", any_type);
    ptr_layout.parameters = smallvec![nothing_type];
    ptr_layout.size = size_of::<*mut std::ffi::c_void>();
    ptr_layout.flags.isbits = true;
    let voidpointer_type = heap.insert(dt, Payload::DataType(Box::new(ptr_layout)));

    let module_type = new_opaque(heap, dt, "Module", any_type);
    let unionall_type = new_opaque(heap, dt, "UnionAll", any_type);

    let nothing = heap.insert(nothing_type, Payload::zeroed_bits(0));
    let true_v = new_bool(heap, bool_type, true);
    let false_v = new_bool(heap, bool_type, false);

    let ua = unionall_type;
    let ref_ctor = new_constructor(heap, ua, "Ref", SuperSpec::Fixed(any_type), vec![], true);
    let cxx_base_ref_ctor =
        new_constructor(heap, ua, "CxxBaseRef", SuperSpec::Applied(ref_ctor), vec![], true);
    let cxx_ref_ctor = new_constructor(
        heap,
        ua,
        "CxxRef",
        SuperSpec::Applied(cxx_base_ref_ctor),
        handle_fields(voidpointer_type),
        false,
    );
    let const_cxx_ref_ctor = new_constructor(
        heap,
        ua,
        "ConstCxxRef",
        SuperSpec::Applied(cxx_base_ref_ctor),
        handle_fields(voidpointer_type),
        false,
    );
    let cxx_ptr_ctor = new_constructor(
        heap,
        ua,
        "CxxPtr",
        SuperSpec::Applied(cxx_base_ref_ctor),
        handle_fields(voidpointer_type),
        false,
    );
    let const_cxx_ptr_ctor = new_constructor(
        heap,
        ua,
        "ConstCxxPtr",
        SuperSpec::Applied(cxx_base_ref_ctor),
        handle_fields(voidpointer_type),
        false,
    );
    let strictly_typed_number_ctor = new_constructor(
        heap,
        ua,
        "StrictlyTypedNumber",
        SuperSpec::Fixed(any_type),
        vec![FieldTemplate {
            name: "value".into(),
            ty: FieldType::Parameter(0),
        }],
        false,
    );

    let core_module = new_module(
        heap,
        module_type,
        "Core",
        &[
            ("Any", any_type),
            ("DataType", datatype_type),
            ("Nothing", nothing_type),
            ("Bool", bool_type),
            ("Int8", int8_type),
            ("Int16", int16_type),
            ("Int32", int32_type),
            ("Int64", int64_type),
            ("UInt8", uint8_type),
            ("UInt16", uint16_type),
            ("UInt32", uint32_type),
            ("UInt64", uint64_type),
            ("Float16", float16_type),
            ("Float32", float32_type),
            ("Float64", float64_type),
            ("Module", module_type),
            ("UnionAll", unionall_type),
            ("Ref", ref_ctor),
            ("nothing", nothing),
            ("true", true_v),
            ("false", false_v),
        ],
    );

    let cxxwrap_module = new_module(
        heap,
        module_type,
        "CxxWrap",
        &[
            ("CxxBaseRef", cxx_base_ref_ctor),
            ("CxxRef", cxx_ref_ctor),
            ("ConstCxxRef", const_cxx_ref_ctor),
            ("CxxPtr", cxx_ptr_ctor),
            ("ConstCxxPtr", const_cxx_ptr_ctor),
            ("StrictlyTypedNumber", strictly_typed_number_ctor),
        ],
    );

    let main_module = new_module(heap, module_type, "Main", &[]);

    let builtins = Builtins {
        datatype_type,
        any_type,
        nothing_type,
        bool_type,
        int8_type,
        int16_type,
        int32_type,
        int64_type,
        uint8_type,
        uint16_type,
        uint32_type,
        uint64_type,
        float16_type,
        float32_type,
        float64_type,
        voidpointer_type,
        module_type,
        unionall_type,
        nothing,
        true_v,
        false_v,
        ref_ctor,
        cxx_base_ref_ctor,
        cxx_ref_ctor,
        const_cxx_ref_ctor,
        cxx_ptr_ctor,
        const_cxx_ptr_ctor,
        strictly_typed_number_ctor,
        core_module,
        cxxwrap_module,
        main_module,
    };

    // Everything else is reachable from the modules.
    heap.pin(core_module);
    heap.pin(cxxwrap_module);
    heap.pin(main_module);
    heap.pin(voidpointer_type);

    builtins
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_survive_collection() {
        let mut heap = Heap::new(None);
        let builtins = unsafe { bootstrap(&mut heap) };
        let before = heap.stats().live_objects;

        unsafe {
            let sweep = heap.mark_and_sweep().unwrap();
            assert!(sweep.unreachable.is_empty());
            heap.free(sweep.unreachable);
        }

        assert_eq!(heap.stats().live_objects, before);
        assert_eq!(unsafe { (*builtins.datatype_type).ty.get() }, builtins.datatype_type);
    }
}
