#![doc = include_str!("../README.md")]

//! Counterexample-guided refinement for integer exponentiation.
//!
//! The entry point is [`Swine`]; [`Config`] selects the semantics of
//! negative exponents and which lemma families and preprocessing passes
//! are enabled.

pub mod brute_force;
pub mod config;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod exp_finder;
pub mod lemmas;
pub mod names;
pub mod numeric;
pub mod preprocess;

#[cfg(any(test, feature = "proptest"))]
pub mod proptest_generators;

pub use config::{Config, LemmaKind, PreprocessingKind, Semantics, SolverKind};
pub use engine::{Statistics, Swine};
pub use error::{EvalError, ExponentOverflow, SwineError};
