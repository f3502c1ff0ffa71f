//! The refinement engine.
//!
//! [`Swine`] wraps an [`SmtSolver`] that sees `exp` as an uninterpreted
//! function. Assertions are preprocessed and forwarded; `check_sat` then
//! alternates between asking the solver for a candidate model and adding
//! lemmas that rule out wrong values of `exp`, until the candidate agrees
//! with real exponentiation or the solver answers UNSAT.

mod frame;
mod refinement;
pub mod statistics;

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use num::BigInt;
use swine_smt::solver::{ModelValue, SatResult, SmtSolver};
use swine_smt::sorts::SmtSort;
use swine_smt::terms::SmtTerm;
use tracing::{debug, info, warn};

use crate::brute_force::BruteForce;
use crate::config::{Config, LemmaKind};
use crate::error::SwineError;
use crate::evaluator::{EvalMode, TermEvaluator, Valuation};
use crate::exp_finder::{build_group, find_exps, ExpGroup};
use crate::lemmas::{bounding, symmetry};
use crate::names::NameAllocator;
use crate::preprocess::Preprocessor;

use self::frame::Frame;
pub use self::statistics::Statistics;

pub struct Swine<S: SmtSolver> {
    solver: S,
    config: Config,
    preprocessor: Preprocessor,
    frames: Vec<Frame>,
    stats: Statistics,
    names: NameAllocator,
    /// Candidate model behind the last SAT answer.
    valuation: Option<Valuation>,
    /// Why the last SAT model failed validation, if it did.
    validation_report: Option<String>,
    reason_unknown: Option<String>,
    /// Literal names passed for the current `check_sat_assuming`, with the
    /// user term each one stands for.
    user_assumptions: Vec<(String, SmtTerm)>,
    unsat_assumptions: Vec<SmtTerm>,
    lemma_core: BTreeMap<LemmaKind, Vec<SmtTerm>>,
}

impl<S: SmtSolver> Swine<S> {
    pub fn new(solver: S, config: Config) -> Self {
        if config.get_lemmas && !solver.supports_assumption_unsat_core() {
            warn!("backend has no assumption cores; lemmas will not be reported");
        }
        Self {
            solver,
            preprocessor: Preprocessor::new(&config),
            config,
            frames: vec![Frame::default()],
            stats: Statistics::default(),
            names: NameAllocator::default(),
            valuation: None,
            validation_report: None,
            reason_unknown: None,
            user_assumptions: Vec::new(),
            unsat_assumptions: Vec::new(),
            lemma_core: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn statistics(&self) -> &Statistics {
        &self.stats
    }

    /// Number of open `push` scopes.
    pub fn context_level(&self) -> usize {
        self.frames.len() - 1
    }

    pub fn declare_const(&mut self, name: &str, sort: SmtSort) -> Result<(), SwineError> {
        if self.symbol_sort(name).is_some() || self.names.owns(name) {
            return Err(SwineError::DuplicateSymbol(name.to_string()));
        }
        self.solver
            .declare_var(name, &sort)
            .map_err(SwineError::solver)?;
        self.top_mut().symbols.insert(name.to_string(), sort);
        Ok(())
    }

    pub fn symbol_sort(&self, name: &str) -> Option<SmtSort> {
        self.frames
            .iter()
            .rev()
            .find_map(|f| f.symbols.get(name).copied())
    }

    pub fn set_option(&mut self, key: &str, value: &str) -> Result<(), SwineError> {
        self.solver
            .set_option(key, value)
            .map_err(SwineError::solver)
    }

    pub fn set_logic(&mut self, logic: &str) -> Result<(), SwineError> {
        self.solver.set_logic(logic).map_err(SwineError::solver)
    }

    pub fn assert_formula(&mut self, term: &SmtTerm) -> Result<(), SwineError> {
        self.check_formula(term)?;
        let preprocessed = self.preprocessor.preprocess(term);
        self.stats.assertions += 1;
        let top = self.top_mut();
        top.assertions.push(term.clone());
        top.preprocessed.push(preprocessed.clone());
        self.register_exps(&preprocessed)?;
        self.solver
            .assert(&preprocessed)
            .map_err(SwineError::solver)
    }

    pub fn check_sat(&mut self) -> Result<SatResult, SwineError> {
        self.check_sat_assuming(&[])
    }

    /// Checks satisfiability under additional Boolean assumptions.
    ///
    /// Declared Boolean constants are passed through by name; any other
    /// formula is bound to a fresh literal first.
    pub fn check_sat_assuming(&mut self, assumptions: &[SmtTerm]) -> Result<SatResult, SwineError> {
        self.valuation = None;
        self.validation_report = None;
        self.reason_unknown = None;
        self.unsat_assumptions.clear();
        self.lemma_core.clear();
        self.user_assumptions = Vec::with_capacity(assumptions.len());
        for assumption in assumptions {
            self.check_formula(assumption)?;
            let name = match assumption {
                SmtTerm::Var(name) if self.symbol_sort(name) == Some(SmtSort::Bool) => name.clone(),
                other => {
                    let preprocessed = self.preprocessor.preprocess(other);
                    self.register_exps(&preprocessed)?;
                    let literal = self.fresh_literal()?;
                    self.solver
                        .assert(&SmtTerm::var(literal.as_str()).implies(preprocessed))
                        .map_err(SwineError::solver)?;
                    literal
                }
            };
            self.user_assumptions.push((name, assumption.clone()));
        }

        info!(
            "check-sat with {} assertion(s) at level {}",
            self.live_assertions().count(),
            self.context_level()
        );
        let result = self.refine()?;
        info!("check-sat answered {result}");
        Ok(result)
    }

    pub fn push(&mut self, n: u32) -> Result<(), SwineError> {
        for _ in 0..n {
            self.solver.push().map_err(SwineError::solver)?;
            self.frames.push(Frame::default());
        }
        Ok(())
    }

    pub fn pop(&mut self, n: u32) -> Result<(), SwineError> {
        let open = self.context_level();
        if n as usize > open {
            return Err(SwineError::ScopeUnderflow { requested: n, open });
        }
        for _ in 0..n {
            self.solver.pop().map_err(SwineError::solver)?;
            self.frames.pop();
        }
        self.valuation = None;
        Ok(())
    }

    /// Value of `term` in the last model, computing `exp` exactly where the
    /// semantics defines it.
    pub fn get_value(&mut self, term: &SmtTerm) -> Result<ModelValue, SwineError> {
        self.check_symbols(term)?;
        let valuation = self.valuation.as_ref().ok_or(SwineError::NoModel)?;
        let evaluator = TermEvaluator::new(valuation, EvalMode::Exact, self.config.semantics);
        match evaluator.eval(term) {
            Ok(value) => Ok(value),
            Err(err) => {
                debug!("falling back to the solver for {term}: {err}");
                let preprocessed = self.preprocessor.preprocess(term);
                self.solver
                    .get_value(&preprocessed)
                    .map_err(SwineError::solver)
            }
        }
    }

    /// Values of all live symbols, in declaration order.
    pub fn get_model(&self) -> Result<Vec<(String, SmtSort, ModelValue)>, SwineError> {
        let valuation = self.valuation.as_ref().ok_or(SwineError::NoModel)?;
        self.frames
            .iter()
            .flat_map(|f| f.symbols.iter())
            .map(|(name, sort)| {
                valuation
                    .vars
                    .get(name)
                    .map(|v| (name.clone(), *sort, v.clone()))
                    .ok_or_else(|| SwineError::UnknownSymbol(name.clone()))
            })
            .collect()
    }

    /// User assumptions in the core of the last UNSAT answer.
    pub fn get_unsat_assumptions(&self) -> &[SmtTerm] {
        &self.unsat_assumptions
    }

    /// Lemmas in the core of the last UNSAT answer, by kind. Only filled
    /// when `get_lemmas` is enabled.
    pub fn lemma_core(&self) -> &BTreeMap<LemmaKind, Vec<SmtTerm>> {
        &self.lemma_core
    }

    /// With `validate_sat`, the violated assertions of the last SAT answer
    /// followed by the model and every tracked exponential.
    pub fn validation_report(&self) -> Option<&str> {
        self.validation_report.as_deref()
    }

    pub fn reason_unknown(&self) -> Option<&str> {
        self.reason_unknown.as_deref()
    }

    /// Forgets everything, including statistics.
    pub fn reset(&mut self) -> Result<(), SwineError> {
        self.reset_assertions()?;
        self.stats = Statistics::default();
        Ok(())
    }

    /// Forgets all assertions, declarations and lemmas but keeps statistics.
    pub fn reset_assertions(&mut self) -> Result<(), SwineError> {
        self.solver.reset().map_err(SwineError::solver)?;
        self.frames = vec![Frame::default()];
        self.names.reset();
        self.valuation = None;
        self.validation_report = None;
        self.reason_unknown = None;
        self.user_assumptions.clear();
        self.unsat_assumptions.clear();
        self.lemma_core.clear();
        Ok(())
    }

    pub fn dump_smt2(&self, path: &Path) -> Result<(), SwineError> {
        self.solver.dump_smt2(path).map_err(SwineError::solver)
    }

    fn top_mut(&mut self) -> &mut Frame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    fn fresh_literal(&mut self) -> Result<String, SwineError> {
        let name = self.names.fresh();
        self.solver
            .declare_var(&name, &SmtSort::Bool)
            .map_err(SwineError::solver)?;
        Ok(name)
    }

    fn live_assertions(&self) -> impl Iterator<Item = &SmtTerm> {
        self.frames.iter().flat_map(|f| f.preprocessed.iter())
    }

    fn live_symbols(&self) -> Vec<(String, SmtSort)> {
        self.frames
            .iter()
            .flat_map(|f| f.symbols.iter().map(|(n, s)| (n.clone(), *s)))
            .collect()
    }

    fn tracked_exps(&self) -> Vec<SmtTerm> {
        self.frames
            .iter()
            .flat_map(|f| f.exps.iter().cloned())
            .collect()
    }

    fn is_tracked(&self, term: &SmtTerm) -> bool {
        self.frames.iter().any(|f| f.exps.contains(term))
    }

    /// The newest live group that `term` belongs to.
    fn group_of(&self, term: &SmtTerm) -> Option<&ExpGroup> {
        self.frames
            .iter()
            .rev()
            .flat_map(|f| f.groups.iter())
            .find(|g| g.contains(term))
    }

    fn lemma_known(&self, lemma: &SmtTerm) -> bool {
        self.frames.iter().any(|f| f.lemmas.contains_key(lemma))
    }

    fn anchors_for(&self, term: &SmtTerm) -> Vec<(BigInt, i64)> {
        self.frames
            .iter()
            .filter_map(|f| f.anchors.get(term))
            .flatten()
            .cloned()
            .collect()
    }

    fn bounding_for(&self, term: &SmtTerm) -> Vec<SmtTerm> {
        self.frames
            .iter()
            .filter_map(|f| f.bounding_lemmas.get(term))
            .flatten()
            .cloned()
            .collect()
    }

    fn check_symbols(&self, term: &SmtTerm) -> Result<(), SwineError> {
        match term {
            SmtTerm::Var(name) if self.symbol_sort(name).is_none() => {
                Err(SwineError::UnknownSymbol(name.clone()))
            }
            other => other
                .children()
                .into_iter()
                .try_for_each(|c| self.check_symbols(c)),
        }
    }

    fn check_formula(&self, term: &SmtTerm) -> Result<(), SwineError> {
        self.check_symbols(term)?;
        let boolean = match term {
            SmtTerm::Var(name) => self.symbol_sort(name) == Some(SmtSort::Bool),
            SmtTerm::BoolLit(_)
            | SmtTerm::Eq(..)
            | SmtTerm::Lt(..)
            | SmtTerm::Le(..)
            | SmtTerm::Gt(..)
            | SmtTerm::Ge(..)
            | SmtTerm::And(_)
            | SmtTerm::Or(_)
            | SmtTerm::Not(_)
            | SmtTerm::Implies(..) => true,
            SmtTerm::Ite(_, then, _) => self.check_formula(then).is_ok(),
            _ => false,
        };
        if boolean {
            Ok(())
        } else {
            Err(SwineError::MalformedTerm(format!("{term} is not a formula")))
        }
    }

    /// Tracks every exponential of `term` that is not tracked yet, together
    /// with the rest of its group.
    fn register_exps(&mut self, term: &SmtTerm) -> Result<(), SwineError> {
        for exp in find_exps(term) {
            if self.is_tracked(&exp) {
                continue;
            }
            let Some(group) = build_group(&exp, &self.preprocessor) else {
                continue;
            };
            let mut new_members = Vec::new();
            for member in group.terms() {
                if self.is_tracked(member) {
                    continue;
                }
                let bounding = bounding::lemmas(member, self.config.semantics)
                    .iter()
                    .map(|l| self.preprocessor.preprocess(l))
                    .filter(|l| l.as_bool_literal() != Some(true))
                    .collect();
                let non_constant = member
                    .as_exp()
                    .is_some_and(|(base, _)| base.as_int_literal().is_none());
                self.stats.non_constant_base |= non_constant;
                let top = self.top_mut();
                top.exps.insert(member.clone());
                top.bounding_lemmas.insert(member.clone(), bounding);
                new_members.push(member.clone());
                debug!("tracking {member}");
            }
            for member in &new_members {
                if let Some((base, exponent)) = member.as_exp() {
                    let (base, exponent) = (base.clone(), exponent.clone());
                    self.register_exps(&base)?;
                    self.register_exps(&exponent)?;
                }
            }
            let eager = if self.config.eager_symmetry && self.config.is_active(LemmaKind::Symmetry) {
                symmetry::eager_lemmas(&group, self.config.semantics)
            } else {
                Vec::new()
            };
            self.top_mut().groups.push(group);
            for lemma in &eager {
                self.add_lemma(lemma, LemmaKind::Symmetry)?;
            }
        }
        Ok(())
    }

    /// Preprocesses and asserts `lemma` unless it is trivial or known.
    /// Returns whether anything was asserted.
    fn add_lemma(&mut self, lemma: &SmtTerm, kind: LemmaKind) -> Result<bool, SwineError> {
        let lemma = self.preprocessor.preprocess(lemma);
        if lemma.as_bool_literal() == Some(true) || self.lemma_known(&lemma) {
            return Ok(false);
        }
        self.register_exps(&lemma)?;
        if self.config.log {
            info!("{kind} lemma: {lemma}");
        } else {
            debug!("{kind} lemma: {lemma}");
        }
        if self.config.get_lemmas && self.solver.supports_assumption_unsat_core() {
            let literal = self.fresh_literal()?;
            self.solver
                .assert(&SmtTerm::var(literal.as_str()).implies(lemma.clone()))
                .map_err(SwineError::solver)?;
            self.top_mut()
                .assumptions
                .insert(literal, (lemma.clone(), kind));
        } else {
            self.solver.assert(&lemma).map_err(SwineError::solver)?;
        }
        self.top_mut().lemmas.insert(lemma, kind);
        self.stats.record_lemma(kind);
        Ok(true)
    }

    /// Searches for a model with small exponents after an UNSAT answer.
    fn brute_force(&mut self, bound: u64) -> Result<(), SwineError> {
        let fresh = self.solver.fresh().map_err(SwineError::solver)?;
        let mut assertions: Vec<SmtTerm> = self.live_assertions().cloned().collect();
        assertions.extend(
            self.user_assumptions
                .iter()
                .map(|(_, term)| self.preprocessor.preprocess(term)),
        );
        let mut search = BruteForce::new(
            fresh,
            self.live_symbols(),
            &assertions,
            self.tracked_exps(),
            self.config.semantics,
        )
        .map_err(SwineError::solver)?;
        let Some(model) = search.search(bound).map_err(SwineError::solver)? else {
            info!("brute force found no model up to weight {bound}");
            return Ok(());
        };

        warn!("sat via brute force");
        let valuation = Valuation {
            vars: model.values,
            exps: HashMap::new(),
        };
        let evaluator = TermEvaluator::new(&valuation, EvalMode::Exact, self.config.semantics);
        for (lemma, kind) in self.frames.iter().flat_map(|f| f.lemmas.iter()) {
            if evaluator.eval_bool(lemma) == Ok(false) {
                warn!("violated {kind} lemma: {lemma}");
            }
        }
        for assertion in &assertions {
            if evaluator.eval_bool(assertion) == Ok(false) {
                warn!("brute-force model violates {assertion}");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
