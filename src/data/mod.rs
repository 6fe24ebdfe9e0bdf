//! Managed data and the mapping between Rust types and Julia datatypes.
//!
//! Whenever the host returns data owned by the garbage collector it's returned as a pointer.
//! The [`managed`] module provides several types that wrap these pointers: [`Value`],
//! [`DataType`], [`TypeConstructor`] and [`Module`]. Every managed type can be converted to a
//! `Value`.
//!
//! The [`types`] module contains the classification of Rust types into marshaling strategies
//! and the registry that maps Rust types to their datatypes.
//!
//! [`Value`]: crate::data::managed::value::Value
//! [`DataType`]: crate::data::managed::datatype::DataType
//! [`TypeConstructor`]: crate::data::managed::type_constructor::TypeConstructor
//! [`Module`]: crate::data::managed::module::Module

pub(crate) mod cache;
pub mod managed;
pub mod types;
