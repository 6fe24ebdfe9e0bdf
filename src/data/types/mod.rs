//! Classify Rust types, map them to their wire types, and find their datatypes.

pub mod fundamental;
pub mod mapping;
pub mod registry;
pub mod static_mapping;
pub mod strictly_typed;
