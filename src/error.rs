//! Everything related to errors.

use std::error::Error as StdErr;

use thiserror::Error;

/// Alias that is used for most `Result`s in this crate.
pub type MarshalResult<T> = Result<T, Box<MarshalError>>;

/// Datatype-related errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeMappingError {
    #[error("type {type_name} has no Julia wrapper")]
    NotRegistered { type_name: String },
    #[error("type {type_name} already had a mapped type set")]
    AlreadyRegistered { type_name: String },
    #[error("{type_name} is not a wrapper type, it must have exactly one field of type Ptr{{Nothing}}")]
    NotAHandleType { type_name: String },
    #[error("{type_name} has no supertype")]
    NoSuperType { type_name: String },
    #[error("{module} has no global named {name}")]
    TypeNotFound { name: String, module: String },
    #[error("{name} is not a type constructor")]
    NotATypeConstructor { name: String },
    #[error("{name} is not a type")]
    NotAType { name: String },
    #[error("{name} expects {expected} type parameters, got {found}")]
    ParameterCount {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("{parameter} is not a valid parameter for {name}")]
    InvalidTypeParameter { name: String, parameter: String },
    #[error("invalid layout for {type_name}: {reason}")]
    InvalidLayout { type_name: String, reason: String },
}

/// Errors raised while accessing the contents of a value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("C++ object of type {type_name} was deleted")]
    ObjectDeleted { type_name: String },
    #[error("cannot convert a null pointer to a value of type {type_name}")]
    NullPointer { type_name: String },
    #[error("field at index {idx} does not exist: {type_name} has {n_fields} fields")]
    FieldOutOfBounds {
        type_name: String,
        idx: usize,
        n_fields: usize,
    },
    #[error("value of type {type_name} has no inline data")]
    NotBits { type_name: String },
}

/// Errors raised by the garbage collector interface.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GcError {
    #[error("cannot add a finalizer to an instance of the immutable type {type_name}")]
    ImmutableFinalizer { type_name: String },
}

/// Runtime-related errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("the runtime can only be initialized once")]
    AlreadyInitialized,
}

/// All different errors.
#[derive(Debug, Error)]
pub enum MarshalError {
    #[error("Type mapping error: {0}")]
    TypeMapping(#[from] TypeMappingError),
    #[error("Access error: {0}")]
    Access(#[from] AccessError),
    #[error("GC error: {0}")]
    Gc(#[from] GcError),
    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),
    #[error("Other: {0}")]
    Other(Box<dyn StdErr + Send + Sync>),
}

impl MarshalError {
    /// Convert an arbitrary error to `Box<MarshalError::Other>`.
    #[inline]
    pub fn other<E: StdErr + Send + Sync + 'static>(reason: E) -> Box<Self> {
        Box::new(MarshalError::Other(Box::new(reason)))
    }

    /// Returns `true` if this error was raised because a type had no datatype yet.
    pub fn is_not_registered(&self) -> bool {
        matches!(
            self,
            MarshalError::TypeMapping(TypeMappingError::NotRegistered { .. })
        )
    }

    /// Returns `true` if this error was raised by a handle whose native object was deleted.
    pub fn is_object_deleted(&self) -> bool {
        matches!(self, MarshalError::Access(AccessError::ObjectDeleted { .. }))
    }
}

macro_rules! impl_from {
    ($type:ident) => {
        impl From<$type> for Box<MarshalError> {
            #[inline]
            fn from(e: $type) -> Self {
                Box::new(MarshalError::from(e))
            }
        }
    };
}

impl_from!(TypeMappingError);
impl_from!(AccessError);
impl_from!(GcError);
impl_from!(RuntimeError);

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup() -> MarshalResult<()> {
        Err(TypeMappingError::NotRegistered {
            type_name: "foo::Bar".into(),
        })?
    }

    #[test]
    fn category_converts_to_boxed_error() {
        let err = lookup().unwrap_err();
        assert!(err.is_not_registered());
        assert!(!err.is_object_deleted());
        assert_eq!(
            err.to_string(),
            "Type mapping error: type foo::Bar has no Julia wrapper"
        );
    }

    #[test]
    fn handle_message_escapes_braces() {
        let err = TypeMappingError::NotAHandleType {
            type_name: "Point".into(),
        };
        assert_eq!(
            err.to_string(),
            "Point is not a wrapper type, it must have exactly one field of type Ptr{Nothing}"
        );
    }
}
