//! Wrappers for managed data.
//!
//! The most common of these wrappers is [`Value`], it represents some arbitrary data that the
//! host can use. All other wrappers are valid `Value`s.
//!
//! Managed data is only guaranteed to remain valid while it is reachable from a root. The
//! wrappers don't track whether that is the case, see the [`memory`] module for the available
//! ways to root data.
//!
//! [`Value`]: crate::data::managed::value::Value
//! [`memory`]: crate::memory

macro_rules! impl_debug {
    ($type:ty) => {
        impl ::std::fmt::Debug for $type {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "{}", self)
            }
        }
    };
}

pub mod datatype;
pub mod module;
pub mod type_constructor;
pub mod value;

use self::value::Value;

/// Trait implemented by all wrappers for managed data.
pub trait Managed: private::ManagedPriv {
    /// Convert the data to a `Value`.
    fn as_value(self) -> Value;
}

pub(crate) mod private {
    pub trait ManagedPriv: Copy {}
}

impl private::ManagedPriv for Value {}
impl Managed for Value {
    #[inline]
    fn as_value(self) -> Value {
        self
    }
}
