use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use num::BigInt;

use crate::backends::smtlib_printer::int_to_smtlib;
use crate::sorts::SmtSort;
use crate::terms::SmtTerm;

/// Result of a satisfiability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SatResult {
    Sat,
    Unsat,
    Unknown(String),
}

impl fmt::Display for SatResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SatResult::Sat => write!(f, "sat"),
            SatResult::Unsat => write!(f, "unsat"),
            SatResult::Unknown(_) => write!(f, "unknown"),
        }
    }
}

/// A model (variable assignments) extracted from a SAT result.
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub values: HashMap<String, ModelValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModelValue {
    Int(BigInt),
    Bool(bool),
}

impl ModelValue {
    pub fn as_int(&self) -> Option<&BigInt> {
        match self {
            ModelValue::Int(n) => Some(n),
            ModelValue::Bool(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ModelValue::Bool(b) => Some(*b),
            ModelValue::Int(_) => None,
        }
    }

    /// The value as a literal term.
    pub fn to_term(&self) -> SmtTerm {
        match self {
            ModelValue::Int(n) => SmtTerm::IntLit(n.clone()),
            ModelValue::Bool(b) => SmtTerm::BoolLit(*b),
        }
    }
}

impl fmt::Display for ModelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelValue::Int(n) => f.write_str(&int_to_smtlib(n)),
            ModelValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl Model {
    pub fn get_int(&self, name: &str) -> Option<&BigInt> {
        match self.values.get(name) {
            Some(ModelValue::Int(n)) => Some(n),
            _ => None,
        }
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.values.get(name) {
            Some(ModelValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }
}

/// Abstract SMT solver interface.
///
/// This is the whole surface the exponentiation engine relies on. `Exp`
/// terms must be handled as applications of an uninterpreted function.
pub trait SmtSolver {
    type Error: std::error::Error;

    /// Declare a new variable.
    fn declare_var(&mut self, name: &str, sort: &SmtSort) -> Result<(), Self::Error>;

    /// Assert a constraint.
    fn assert(&mut self, term: &SmtTerm) -> Result<(), Self::Error>;

    /// Push a new scope.
    fn push(&mut self) -> Result<(), Self::Error>;

    /// Pop a scope.
    fn pop(&mut self) -> Result<(), Self::Error>;

    /// Check satisfiability.
    fn check_sat(&mut self) -> Result<SatResult, Self::Error>;

    /// Value of `term` in the model of the last SAT answer.
    fn get_value(&mut self, term: &SmtTerm) -> Result<ModelValue, Self::Error>;

    /// Check satisfiability and extract a model if SAT.
    fn check_sat_with_model(
        &mut self,
        var_names: &[(&str, &SmtSort)],
    ) -> Result<(SatResult, Option<Model>), Self::Error> {
        let result = self.check_sat()?;
        if result != SatResult::Sat {
            return Ok((result, None));
        }
        let mut values = HashMap::new();
        for &(name, _) in var_names {
            let value = self.get_value(&SmtTerm::var(name))?;
            values.insert(name.to_string(), value);
        }
        Ok((SatResult::Sat, Some(Model { values })))
    }

    /// Returns true when the backend supports `check-sat-assuming` with
    /// retrievable UNSAT cores over the provided assumptions.
    fn supports_assumption_unsat_core(&self) -> bool {
        false
    }

    /// Check satisfiability under a set of Boolean assumption variables.
    ///
    /// Assumptions are backend variable names that must be declared as `Bool`.
    fn check_sat_assuming(&mut self, _assumptions: &[String]) -> Result<SatResult, Self::Error> {
        self.check_sat()
    }

    /// Return UNSAT-core assumptions for the previous `check_sat_assuming`.
    fn get_unsat_core_assumptions(&mut self) -> Result<Vec<String>, Self::Error> {
        Ok(Vec::new())
    }

    /// Pass-through for `(set-option :key value)`.
    fn set_option(&mut self, _key: &str, _value: &str) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Pass-through for `(set-logic ...)`. Backends pick their own logic
    /// so that `exp` can be declared; this is advisory.
    fn set_logic(&mut self, _logic: &str) -> Result<(), Self::Error> {
        Ok(())
    }

    /// A new, empty solver with the same configuration.
    fn fresh(&self) -> Result<Self, Self::Error>
    where
        Self: Sized;

    /// Write the current assertion stack to `path` as SMT-LIB.
    fn dump_smt2(&self, path: &Path) -> Result<(), Self::Error>;

    /// Reset the solver state.
    fn reset(&mut self) -> Result<(), Self::Error>;
}
