//! Rule families
//!
//! Each family is a persistent chain over one value type, built from a
//! factory and extended with `with_*` calls:
//!
//! - **Integers**: [`int`], [`int8`] .. [`int64`], [`uint`], [`uint8`] ..
//!   [`uint64`], [`integer`]
//! - **Floats**: [`float32`], [`float64`], [`floating`]
//! - **Text**: [`string`]
//! - **Booleans**: [`boolean`]
//! - **Sequences**: [`slice`], with channel based streaming
//! - **Untyped**: [`any`], and [`WrapAny`] via each family's `any()`

mod macros;

pub mod any;
pub mod boolean;
pub(crate) mod common;
pub mod float;
pub mod int;
pub mod slice;
pub mod string;

pub use any::{AnyRules, WrapAny, any};
pub use boolean::{BoolRules, boolean};
pub use float::{FloatRules, float32, float64, floating};
pub use int::{
    IntRules, int, int8, int16, int32, int64, integer, uint, uint8, uint16, uint32, uint64,
};
pub use slice::{Item, SliceInput, SliceOutput, SliceRules, slice};
pub use string::{StringRules, string};
