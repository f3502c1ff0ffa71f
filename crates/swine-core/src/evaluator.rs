//! Evaluation of terms under a candidate model.
//!
//! In [`EvalMode::Abstract`] every `exp` application is looked up in the
//! table of values the solver chose for it, which is how the solver itself
//! sees the formula. [`EvalMode::Exact`] computes `b^|x|` instead wherever
//! the semantics defines it.

use std::collections::HashMap;

use num::{BigInt, Signed, Zero};
use swine_smt::solver::ModelValue;
use swine_smt::terms::SmtTerm;

use crate::config::Semantics;
use crate::error::EvalError;
use crate::numeric::{checked_pow, smt_div, smt_mod};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalMode {
    Abstract,
    Exact,
}

/// Symbol values plus the solver's interpretation of `exp` at the points
/// that were queried.
#[derive(Debug, Clone, Default)]
pub struct Valuation {
    pub vars: HashMap<String, ModelValue>,
    pub exps: HashMap<(BigInt, BigInt), BigInt>,
}

impl Valuation {
    pub fn with_var(mut self, name: impl Into<String>, value: ModelValue) -> Self {
        self.vars.insert(name.into(), value);
        self
    }

    pub fn with_exp(mut self, base: i64, exponent: i64, value: i64) -> Self {
        self.exps
            .insert((BigInt::from(base), BigInt::from(exponent)), BigInt::from(value));
        self
    }
}

pub struct TermEvaluator<'a> {
    valuation: &'a Valuation,
    mode: EvalMode,
    semantics: Semantics,
}

impl<'a> TermEvaluator<'a> {
    pub fn new(valuation: &'a Valuation, mode: EvalMode, semantics: Semantics) -> Self {
        Self {
            valuation,
            mode,
            semantics,
        }
    }

    pub fn eval(&self, term: &SmtTerm) -> Result<ModelValue, EvalError> {
        match term {
            SmtTerm::Var(name) => self
                .valuation
                .vars
                .get(name)
                .cloned()
                .ok_or_else(|| EvalError::UnknownSymbol(name.clone())),
            SmtTerm::IntLit(n) => Ok(ModelValue::Int(n.clone())),
            SmtTerm::BoolLit(b) => Ok(ModelValue::Bool(*b)),
            SmtTerm::Eq(l, r) => Ok(ModelValue::Bool(self.eval(l)? == self.eval(r)?)),
            SmtTerm::Lt(l, r) => Ok(ModelValue::Bool(self.eval_int(l)? < self.eval_int(r)?)),
            SmtTerm::Le(l, r) => Ok(ModelValue::Bool(self.eval_int(l)? <= self.eval_int(r)?)),
            SmtTerm::Gt(l, r) => Ok(ModelValue::Bool(self.eval_int(l)? > self.eval_int(r)?)),
            SmtTerm::Ge(l, r) => Ok(ModelValue::Bool(self.eval_int(l)? >= self.eval_int(r)?)),
            SmtTerm::Not(t) => Ok(ModelValue::Bool(!self.eval_bool(t)?)),
            SmtTerm::And(ts) => {
                for t in ts {
                    if !self.eval_bool(t)? {
                        return Ok(ModelValue::Bool(false));
                    }
                }
                Ok(ModelValue::Bool(true))
            }
            SmtTerm::Or(ts) => {
                for t in ts {
                    if self.eval_bool(t)? {
                        return Ok(ModelValue::Bool(true));
                    }
                }
                Ok(ModelValue::Bool(false))
            }
            SmtTerm::Implies(l, r) => {
                if !self.eval_bool(l)? {
                    return Ok(ModelValue::Bool(true));
                }
                Ok(ModelValue::Bool(self.eval_bool(r)?))
            }
            SmtTerm::Ite(c, t, e) => {
                if self.eval_bool(c)? {
                    self.eval(t)
                } else {
                    self.eval(e)
                }
            }
            _ => self.eval_arith(term).map(ModelValue::Int),
        }
    }

    pub fn eval_int(&self, term: &SmtTerm) -> Result<BigInt, EvalError> {
        match self.eval(term)? {
            ModelValue::Int(n) => Ok(n),
            ModelValue::Bool(_) => Err(EvalError::SortMismatch(term.to_string())),
        }
    }

    pub fn eval_bool(&self, term: &SmtTerm) -> Result<bool, EvalError> {
        match self.eval(term)? {
            ModelValue::Bool(b) => Ok(b),
            ModelValue::Int(_) => Err(EvalError::SortMismatch(term.to_string())),
        }
    }

    fn eval_arith(&self, term: &SmtTerm) -> Result<BigInt, EvalError> {
        match term {
            SmtTerm::Neg(t) => Ok(-self.eval_int(t)?),
            SmtTerm::Abs(t) => Ok(self.eval_int(t)?.abs()),
            SmtTerm::Add(ts) => ts
                .iter()
                .try_fold(BigInt::zero(), |acc, t| Ok(acc + self.eval_int(t)?)),
            SmtTerm::Mul(ts) => ts
                .iter()
                .try_fold(BigInt::from(1), |acc, t| Ok(acc * self.eval_int(t)?)),
            SmtTerm::Sub(l, r) => Ok(self.eval_int(l)? - self.eval_int(r)?),
            SmtTerm::Div(l, r) => {
                smt_div(&self.eval_int(l)?, &self.eval_int(r)?).ok_or(EvalError::DivisionByZero)
            }
            SmtTerm::Mod(l, r) => {
                smt_mod(&self.eval_int(l)?, &self.eval_int(r)?).ok_or(EvalError::DivisionByZero)
            }
            SmtTerm::Exp(base, exponent) => {
                let b = self.eval_int(base)?;
                let e = self.eval_int(exponent)?;
                let defined = self.semantics == Semantics::Total || !e.is_negative();
                if self.mode == EvalMode::Exact && defined {
                    Ok(checked_pow(base, exponent, &b, &e)?)
                } else {
                    self.lookup(b, e)
                }
            }
            other => Err(EvalError::SortMismatch(other.to_string())),
        }
    }

    fn lookup(&self, base: BigInt, exponent: BigInt) -> Result<BigInt, EvalError> {
        let key = (base, exponent);
        match self.valuation.exps.get(&key) {
            Some(value) => Ok(value.clone()),
            None => {
                let (base, exponent) = key;
                Err(EvalError::MissingExpValue { base, exponent })
            }
        }
    }
}
