//! Core value types shared by the evaluator and the built-in functions.
//!
//! - [`Color`]: RGBA colors with HSL/HSV conversion
//! - [`Dimension`] and [`Unit`]: numbers with composable, convertible units

pub mod color;
pub mod dimension;

pub use color::{Color, ColorParseError};
pub use dimension::{format_number, Dimension, Op, Unit, UnitGroup, UnitMismatch};
