//! Managed type for `Module`, which provides access to global values.
//!
//! Three modules exist: `Core` contains the builtin types and values, `CxxWrap` the parametric
//! reference and pointer types used for native data, and `Main` is available for types created
//! at runtime.

use std::fmt;

use super::{private::ManagedPriv, value::Value, Managed};
use crate::{
    error::{MarshalResult, TypeMappingError},
    private::Private,
    runtime::runtime,
    sys::{jl_value_t, ModuleLayout, Payload},
};

/// A namespace of global values.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Module(Value);

impl Module {
    // Safety: `ptr` must point to a live module.
    #[inline]
    pub(crate) unsafe fn wrap(ptr: *mut jl_value_t) -> Self {
        Module(Value::wrap(ptr, Private))
    }

    fn layout<'a>(self) -> &'a ModuleLayout {
        match &self.0.object().payload {
            Payload::Module(layout) => layout,
            _ => unreachable!("module without module layout"),
        }
    }

    /// Returns the `Core` module.
    pub fn core() -> Self {
        // Safety: builtin modules are pinned.
        unsafe { Module::wrap(runtime().builtins().core_module) }
    }

    /// Returns the `CxxWrap` module.
    pub fn cxxwrap() -> Self {
        unsafe { Module::wrap(runtime().builtins().cxxwrap_module) }
    }

    /// Returns the `Main` module.
    pub fn main() -> Self {
        unsafe { Module::wrap(runtime().builtins().main_module) }
    }

    /// Returns the name of this module.
    pub fn name(self) -> String {
        self.layout().name.clone()
    }

    /// Returns the global named `name`.
    pub fn global(self, name: &str) -> MarshalResult<Value> {
        let _guard = runtime().lock();
        match self.layout().globals.borrow().get(name) {
            // Safety: globals are reachable from the module.
            Some(ptr) => unsafe { Ok(Value::wrap(*ptr, Private)) },
            None => Err(TypeMappingError::TypeNotFound {
                name: name.into(),
                module: self.name(),
            })?,
        }
    }

    /// Set the global named `name` to `value`. Returns the previous value, if any.
    ///
    /// Globals are reachable as long as the module is, so `value` won't be freed until it's
    /// replaced.
    pub fn set_global<M: Managed>(self, name: &str, value: M) -> Option<Value> {
        let _guard = runtime().lock();
        let ptr = value.as_value().unwrap(Private);
        self.layout()
            .globals
            .borrow_mut()
            .insert(name.into(), ptr)
            .map(|old| unsafe { Value::wrap(old, Private) })
    }
}

impl ManagedPriv for Module {}
impl Managed for Module {
    #[inline]
    fn as_value(self) -> Value {
        self.0
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.layout().name)
    }
}

impl_debug!(Module);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::managed::datatype::DataType;

    #[test]
    fn builtin_globals() {
        let int32 = Module::core().global("Int32").unwrap();
        assert_eq!(int32.as_datatype(), Some(DataType::int32_type()));

        let cxx_ref = Module::cxxwrap().global("CxxRef").unwrap();
        assert!(cxx_ref.as_type_constructor().is_some());
    }

    #[test]
    fn missing_global() {
        let err = Module::core().global("DoesNotExist").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Type mapping error: Core has no global named DoesNotExist"
        );
    }

    #[test]
    fn set_global_replaces() {
        let module = Module::main();
        assert!(module.set_global("module_test_global", Value::true_v()).is_none());
        let old = module.set_global("module_test_global", Value::false_v());
        assert_eq!(old, Some(Value::true_v()));
        assert_eq!(module.global("module_test_global").unwrap(), Value::false_v());
    }
}
