#![doc = include_str!("../README.md")]

//! SMT-LIB v2 front end: a pest grammar for S-expressions, a command reader
//! on top of it, and an elaborator that produces `SmtTerm`s.

pub mod ast;
pub mod elaborate;
pub mod errors;
pub mod parser;

pub use elaborate::Elaborator;
pub use errors::{ElaborationError, ParseError};
pub use parser::{parse_script, parse_sexprs};
