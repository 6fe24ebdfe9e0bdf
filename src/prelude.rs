//! Reexports structs and traits you're likely to need.

pub use crate::{
    convert::{
        boxing::{box_value, BoxValue},
        ownership::{julia_owned, transfer_ownership},
        to_cpp::{convert_to_cpp, ConvertToCpp},
        to_julia::{convert_to_julia, ConvertToJulia},
        unbox::{unbox, unbox_wrapped, UnboxValue},
    },
    data::{
        managed::{
            datatype::DataType, module::Module, type_constructor::TypeConstructor, value::Value,
            Managed,
        },
        types::{
            mapping::{MappingTrait, Mirrored},
            registry::{julia_type, register_type, set_julia_type, JuliaType, RegisteredType},
            static_mapping::{StaticJuliaType, WrappedCppPtr},
            strictly_typed::StrictlyTypedNumber,
        },
    },
    error::{MarshalError, MarshalResult},
    memory::{
        frame::GcFrame,
        gc::{Gc, GcCollection},
    },
    mirrored_type,
    runtime::{scope, Runtime},
    wrapped_type,
};
