use num::BigInt;
use swine_smt::terms::SmtTerm;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SwineError {
    #[error("Solver error: {0}")]
    Solver(String),
    #[error("Malformed term: {0}")]
    MalformedTerm(String),
    #[error("Cannot pop {requested} scope(s): only {open} open")]
    ScopeUnderflow { requested: u32, open: usize },
    #[error("Unknown symbol `{0}`")]
    UnknownSymbol(String),
    #[error("Symbol `{0}` is already declared")]
    DuplicateSymbol(String),
    #[error("No model available: the last check did not answer sat")]
    NoModel,
    #[error("Refinement stalled: no lemma excludes the candidate model ({mismatches} mismatching exponentials)")]
    RefinementStalled { mismatches: usize },
    #[error("Evaluation error: {0}")]
    Eval(#[from] EvalError),
}

impl SwineError {
    pub(crate) fn solver(err: impl std::error::Error) -> Self {
        SwineError::Solver(err.to_string())
    }
}

/// A value too large for exponent bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Exponent overflow in `{term}`: {value} is out of range")]
pub struct ExponentOverflow {
    pub term: SmtTerm,
    pub value: BigInt,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("No value for symbol `{0}`")]
    UnknownSymbol(String),
    #[error("No model value for exp({base}, {exponent})")]
    MissingExpValue { base: BigInt, exponent: BigInt },
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Sort mismatch in `{0}`")]
    SortMismatch(String),
    #[error(transparent)]
    Overflow(#[from] ExponentOverflow),
}
