use std::collections::HashMap;
use std::path::Path;

use num::bigint::Sign;
use num::{BigInt, ToPrimitive};
use thiserror::Error;
use z3::ast::Ast;
use z3::SatResult as Z3SatResult;

use crate::backends::{parse_int_value, EXP_SYMBOL};
use crate::solver::{ModelValue, SatResult, SmtSolver};
use crate::sorts::SmtSort;
use crate::terms::SmtTerm;

#[derive(Debug, Error)]
pub enum Z3Error {
    #[error("Z3 error: {0}")]
    Internal(String),
    #[error("Unknown variable: {0}")]
    UnknownVariable(String),
    #[error("Sort mismatch for variable {0}")]
    SortMismatch(String),
    #[error("No model available: the last check was not SAT")]
    NoModel,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub struct Z3Solver {
    solver: z3::Solver,
    exp: z3::FuncDecl,
    int_vars: HashMap<String, z3::ast::Int>,
    bool_vars: HashMap<String, z3::ast::Bool>,
    last_model: Option<z3::Model>,
    last_assumption_names: Vec<String>,
    last_assumption_terms: Vec<z3::ast::Bool>,
    timeout_secs: u64,
    params: Option<z3::Params>,
}

impl Z3Solver {
    pub fn new() -> Self {
        Self::with_timeout_secs(0)
    }

    pub fn with_timeout_secs(timeout_secs: u64) -> Self {
        let solver = z3::Solver::new();
        let params = (timeout_secs > 0).then(|| {
            let mut params = z3::Params::new();
            let timeout_ms = u32::try_from(timeout_secs.saturating_mul(1000)).unwrap_or(u32::MAX);
            params.set_u32("timeout", timeout_ms);
            solver.set_params(&params);
            params
        });
        Self {
            solver,
            exp: exp_decl(),
            int_vars: HashMap::new(),
            bool_vars: HashMap::new(),
            last_model: None,
            last_assumption_names: Vec::new(),
            last_assumption_terms: Vec::new(),
            timeout_secs,
            params,
        }
    }

    pub fn with_default_config() -> Self {
        Self::new()
    }

    fn translate_term(&self, term: &SmtTerm) -> Result<Z3Term, Z3Error> {
        match term {
            SmtTerm::Var(name) => {
                if let Some(v) = self.int_vars.get(name) {
                    Ok(Z3Term::Int(v.clone()))
                } else if let Some(v) = self.bool_vars.get(name) {
                    Ok(Z3Term::Bool(v.clone()))
                } else {
                    Err(Z3Error::UnknownVariable(name.clone()))
                }
            }
            SmtTerm::IntLit(n) => Ok(Z3Term::Int(int_literal(n))),
            SmtTerm::BoolLit(b) => Ok(Z3Term::Bool(z3::ast::Bool::from_bool(*b))),
            SmtTerm::Neg(inner) => {
                let i = self.translate_term(inner)?.into_int()?;
                Ok(Z3Term::Int(i.unary_minus()))
            }
            SmtTerm::Add(terms) => {
                let ints = self.translate_ints(terms)?;
                let sum = ints
                    .into_iter()
                    .reduce(|acc, t| &acc + &t)
                    .unwrap_or_else(|| z3::ast::Int::from_i64(0));
                Ok(Z3Term::Int(sum))
            }
            SmtTerm::Mul(terms) => {
                let ints = self.translate_ints(terms)?;
                let product = ints
                    .into_iter()
                    .reduce(|acc, t| &acc * &t)
                    .unwrap_or_else(|| z3::ast::Int::from_i64(1));
                Ok(Z3Term::Int(product))
            }
            SmtTerm::Sub(lhs, rhs) => {
                let l = self.translate_term(lhs)?.into_int()?;
                let r = self.translate_term(rhs)?.into_int()?;
                Ok(Z3Term::Int(&l - &r))
            }
            SmtTerm::Div(lhs, rhs) => {
                let l = self.translate_term(lhs)?.into_int()?;
                let r = self.translate_term(rhs)?.into_int()?;
                Ok(Z3Term::Int(&l / &r))
            }
            SmtTerm::Mod(lhs, rhs) => {
                let l = self.translate_term(lhs)?.into_int()?;
                let r = self.translate_term(rhs)?.into_int()?;
                Ok(Z3Term::Int(l.modulo(&r)))
            }
            SmtTerm::Abs(inner) => {
                let i = self.translate_term(inner)?.into_int()?;
                let nonneg = i.ge(&z3::ast::Int::from_i64(0));
                Ok(Z3Term::Int(nonneg.ite(&i, &i.unary_minus())))
            }
            SmtTerm::Exp(base, exponent) => {
                let b = self.translate_term(base)?.into_int()?;
                let e = self.translate_term(exponent)?.into_int()?;
                let app = self.exp.apply(&[&b as &dyn Ast, &e as &dyn Ast]);
                app.as_int()
                    .map(Z3Term::Int)
                    .ok_or_else(|| Z3Error::Internal("exp application is not Int".into()))
            }
            SmtTerm::Eq(lhs, rhs) => {
                let l = self.translate_term(lhs)?;
                let r = self.translate_term(rhs)?;
                match (l, r) {
                    (Z3Term::Int(li), Z3Term::Int(ri)) => Ok(Z3Term::Bool(li.eq(&ri))),
                    (Z3Term::Bool(lb), Z3Term::Bool(rb)) => Ok(Z3Term::Bool(lb.eq(&rb))),
                    _ => Err(Z3Error::Internal("Sort mismatch in Eq".into())),
                }
            }
            SmtTerm::Lt(lhs, rhs) => {
                let (l, r) = self.translate_int_pair(lhs, rhs)?;
                Ok(Z3Term::Bool(l.lt(&r)))
            }
            SmtTerm::Le(lhs, rhs) => {
                let (l, r) = self.translate_int_pair(lhs, rhs)?;
                Ok(Z3Term::Bool(l.le(&r)))
            }
            SmtTerm::Gt(lhs, rhs) => {
                let (l, r) = self.translate_int_pair(lhs, rhs)?;
                Ok(Z3Term::Bool(l.gt(&r)))
            }
            SmtTerm::Ge(lhs, rhs) => {
                let (l, r) = self.translate_int_pair(lhs, rhs)?;
                Ok(Z3Term::Bool(l.ge(&r)))
            }
            SmtTerm::And(terms) => {
                let bools = self.translate_bools(terms)?;
                let refs: Vec<&z3::ast::Bool> = bools.iter().collect();
                Ok(Z3Term::Bool(z3::ast::Bool::and(&refs)))
            }
            SmtTerm::Or(terms) => {
                let bools = self.translate_bools(terms)?;
                let refs: Vec<&z3::ast::Bool> = bools.iter().collect();
                Ok(Z3Term::Bool(z3::ast::Bool::or(&refs)))
            }
            SmtTerm::Not(inner) => {
                let b = self.translate_term(inner)?.into_bool()?;
                Ok(Z3Term::Bool(b.not()))
            }
            SmtTerm::Implies(lhs, rhs) => {
                let l = self.translate_term(lhs)?.into_bool()?;
                let r = self.translate_term(rhs)?.into_bool()?;
                Ok(Z3Term::Bool(l.implies(&r)))
            }
            SmtTerm::Ite(cond, then, els) => {
                let c = self.translate_term(cond)?.into_bool()?;
                let t = self.translate_term(then)?;
                let e = self.translate_term(els)?;
                match (t, e) {
                    (Z3Term::Int(ti), Z3Term::Int(ei)) => Ok(Z3Term::Int(c.ite(&ti, &ei))),
                    (Z3Term::Bool(tb), Z3Term::Bool(eb)) => Ok(Z3Term::Bool(c.ite(&tb, &eb))),
                    _ => Err(Z3Error::Internal("Sort mismatch in ITE".into())),
                }
            }
        }
    }

    fn translate_int_pair(
        &self,
        lhs: &SmtTerm,
        rhs: &SmtTerm,
    ) -> Result<(z3::ast::Int, z3::ast::Int), Z3Error> {
        let l = self.translate_term(lhs)?.into_int()?;
        let r = self.translate_term(rhs)?.into_int()?;
        Ok((l, r))
    }

    fn translate_ints(&self, terms: &[SmtTerm]) -> Result<Vec<z3::ast::Int>, Z3Error> {
        terms
            .iter()
            .map(|t| self.translate_term(t).and_then(Z3Term::into_int))
            .collect()
    }

    fn translate_bools(&self, terms: &[SmtTerm]) -> Result<Vec<z3::ast::Bool>, Z3Error> {
        terms
            .iter()
            .map(|t| self.translate_term(t).and_then(Z3Term::into_bool))
            .collect()
    }

    fn record(&mut self, result: Z3SatResult) -> SatResult {
        match result {
            Z3SatResult::Sat => {
                self.last_model = self.solver.get_model();
                SatResult::Sat
            }
            Z3SatResult::Unsat => {
                self.last_model = None;
                SatResult::Unsat
            }
            Z3SatResult::Unknown => {
                self.last_model = None;
                let reason = self
                    .solver
                    .get_reason_unknown()
                    .unwrap_or_else(|| "Z3 returned unknown".into());
                SatResult::Unknown(reason)
            }
        }
    }
}

fn exp_decl() -> z3::FuncDecl {
    z3::FuncDecl::new(
        EXP_SYMBOL,
        &[&z3::Sort::int(), &z3::Sort::int()],
        &z3::Sort::int(),
    )
}

/// Build an arbitrary-precision literal; values outside `i64` are
/// assembled from 32-bit limbs.
fn int_literal(n: &BigInt) -> z3::ast::Int {
    if let Some(small) = n.to_i64() {
        return z3::ast::Int::from_i64(small);
    }
    let (sign, limbs) = n.to_u32_digits();
    let radix = z3::ast::Int::from_u64(1 << 32);
    let magnitude = limbs
        .iter()
        .rev()
        .fold(z3::ast::Int::from_u64(0), |acc, limb| {
            &(&acc * &radix) + &z3::ast::Int::from_u64(u64::from(*limb))
        });
    if sign == Sign::Minus {
        magnitude.unary_minus()
    } else {
        magnitude
    }
}

enum Z3Term {
    Int(z3::ast::Int),
    Bool(z3::ast::Bool),
}

impl Z3Term {
    fn into_int(self) -> Result<z3::ast::Int, Z3Error> {
        match self {
            Z3Term::Int(i) => Ok(i),
            Z3Term::Bool(_) => Err(Z3Error::Internal("Expected Int, got Bool".into())),
        }
    }

    fn into_bool(self) -> Result<z3::ast::Bool, Z3Error> {
        match self {
            Z3Term::Bool(b) => Ok(b),
            Z3Term::Int(_) => Err(Z3Error::Internal("Expected Bool, got Int".into())),
        }
    }
}

impl Default for Z3Solver {
    fn default() -> Self {
        Self::new()
    }
}

impl SmtSolver for Z3Solver {
    type Error = Z3Error;

    fn declare_var(&mut self, name: &str, sort: &SmtSort) -> Result<(), Z3Error> {
        match sort {
            SmtSort::Int => {
                if self.bool_vars.contains_key(name) {
                    return Err(Z3Error::SortMismatch(name.to_string()));
                }
                let v = z3::ast::Int::new_const(name);
                self.int_vars.insert(name.to_string(), v);
            }
            SmtSort::Bool => {
                if self.int_vars.contains_key(name) {
                    return Err(Z3Error::SortMismatch(name.to_string()));
                }
                let v = z3::ast::Bool::new_const(name);
                self.bool_vars.insert(name.to_string(), v);
            }
        }
        Ok(())
    }

    fn assert(&mut self, term: &SmtTerm) -> Result<(), Z3Error> {
        let z3_term = self.translate_term(term)?.into_bool()?;
        self.solver.assert(&z3_term);
        Ok(())
    }

    fn push(&mut self) -> Result<(), Z3Error> {
        self.solver.push();
        Ok(())
    }

    fn pop(&mut self) -> Result<(), Z3Error> {
        self.solver.pop(1);
        Ok(())
    }

    fn check_sat(&mut self) -> Result<SatResult, Z3Error> {
        let result = self.solver.check();
        Ok(self.record(result))
    }

    fn get_value(&mut self, term: &SmtTerm) -> Result<ModelValue, Z3Error> {
        let model = self.last_model.as_ref().ok_or(Z3Error::NoModel)?;
        match self.translate_term(term)? {
            Z3Term::Int(i) => {
                let value = model
                    .eval(&i, true)
                    .ok_or_else(|| Z3Error::Internal(format!("cannot evaluate {term}")))?;
                parse_int_value(&value.to_string())
                    .map(ModelValue::Int)
                    .ok_or_else(|| Z3Error::Internal(format!("non-numeral value {value}")))
            }
            Z3Term::Bool(b) => {
                let value = model
                    .eval(&b, true)
                    .ok_or_else(|| Z3Error::Internal(format!("cannot evaluate {term}")))?;
                value
                    .as_bool()
                    .map(ModelValue::Bool)
                    .ok_or_else(|| Z3Error::Internal(format!("non-literal value {value}")))
            }
        }
    }

    fn supports_assumption_unsat_core(&self) -> bool {
        true
    }

    fn check_sat_assuming(&mut self, assumptions: &[String]) -> Result<SatResult, Z3Error> {
        let mut asts = Vec::with_capacity(assumptions.len());
        for name in assumptions {
            let Some(var) = self.bool_vars.get(name) else {
                return Err(Z3Error::UnknownVariable(name.clone()));
            };
            asts.push(var.clone());
        }
        self.last_assumption_names = assumptions.to_vec();
        self.last_assumption_terms = asts.clone();
        let result = self.solver.check_assumptions(&asts);
        Ok(self.record(result))
    }

    fn get_unsat_core_assumptions(&mut self) -> Result<Vec<String>, Z3Error> {
        let core = self.solver.get_unsat_core();
        let mut out = Vec::new();
        for core_lit in core {
            if let Some((idx, _)) = self
                .last_assumption_terms
                .iter()
                .enumerate()
                .find(|(_, lit)| **lit == core_lit)
            {
                out.push(self.last_assumption_names[idx].clone());
            }
        }
        Ok(out)
    }

    fn set_option(&mut self, key: &str, value: &str) -> Result<(), Z3Error> {
        let key = key.trim_start_matches(':');
        if key == "random-seed" {
            let seed = value
                .parse::<u32>()
                .map_err(|_| Z3Error::Internal(format!("invalid seed `{value}`")))?;
            let mut params = self.params.take().unwrap_or_else(z3::Params::new);
            params.set_u32("random_seed", seed);
            self.solver.set_params(&params);
            self.params = Some(params);
        }
        Ok(())
    }

    fn fresh(&self) -> Result<Self, Z3Error> {
        Ok(Self::with_timeout_secs(self.timeout_secs))
    }

    fn dump_smt2(&self, path: &Path) -> Result<(), Z3Error> {
        let mut text = format!("(declare-fun {EXP_SYMBOL} (Int Int) Int)\n");
        text.push_str(&self.solver.to_string());
        std::fs::write(path, text)?;
        Ok(())
    }

    fn reset(&mut self) -> Result<(), Z3Error> {
        self.solver.reset();
        // Z3 may drop per-solver parameters on reset; reapply them.
        if let Some(params) = &self.params {
            self.solver.set_params(params);
        }
        self.int_vars.clear();
        self.bool_vars.clear();
        self.last_model = None;
        self.last_assumption_names.clear();
        self.last_assumption_terms.clear();
        Ok(())
    }
}
