#![doc = include_str!("../README.md")]

//! Term algebra and solver integration for integer exponentiation.
//!
//! Terms built here are handed to a backend that knows nothing about
//! exponentiation: every `Exp` node becomes an application of the
//! uninterpreted function `exp`.

pub mod backends;
pub mod solver;
pub mod sorts;
pub mod terms;
