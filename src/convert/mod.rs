//! Convert data between Rust and Julia.
//!
//! Each conversion trait is parametrized by a marshaling strategy and has a blanket
//! implementation per strategy. The free functions select the implementation through the
//! strategy of their type argument:
//!
//! - [`convert_to_julia`] and [`convert_to_cpp`] convert between a Rust value and its wire
//!   representation, the form in which it's passed to and from Julia functions.
//! - [`box_value`] and [`unbox`] convert between a Rust value and a managed [`Value`].
//! - [`transfer_ownership`] moves a Rust value to the heap and hands it to the garbage
//!   collector.
//!
//! [`convert_to_julia`]: crate::convert::to_julia::convert_to_julia
//! [`convert_to_cpp`]: crate::convert::to_cpp::convert_to_cpp
//! [`box_value`]: crate::convert::boxing::box_value
//! [`unbox`]: crate::convert::unbox::unbox
//! [`transfer_ownership`]: crate::convert::ownership::transfer_ownership
//! [`Value`]: crate::data::managed::value::Value

pub mod boxing;
pub mod ownership;
pub mod to_cpp;
pub mod to_julia;
pub mod unbox;
