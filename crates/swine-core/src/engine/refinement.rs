use indexmap::IndexSet;
use num::BigInt;
use swine_smt::solver::{ModelValue, SatResult, SmtSolver};
use swine_smt::terms::SmtTerm;
use tracing::{debug, warn};

use super::Swine;
use crate::config::{LemmaKind, Semantics};
use crate::error::SwineError;
use crate::evaluator::{EvalMode, TermEvaluator, Valuation};
use crate::lemmas::{interpolation, modulo, monotonicity, symmetry, EvaluatedExponential};
use crate::numeric::{check_power, clamp_constraints, to_exponent};

const NEEDS_INTERPOLATION: &str =
    "refinement requires interpolation lemmas; re-run without --no-interpolation";

/// A tracked exponential with the raw values the solver chose.
struct Sample {
    term: SmtTerm,
    base: BigInt,
    exponent: BigInt,
    value: BigInt,
}

enum Evaluation {
    Ready(Vec<EvaluatedExponential>),
    /// Terms whose values are too large to compute with.
    Overflow(Vec<SmtTerm>),
}

impl<S: SmtSolver> Swine<S> {
    pub(super) fn refine(&mut self) -> Result<SatResult, SwineError> {
        let mut iterations = 0u64;
        loop {
            if self
                .config
                .max_iterations
                .is_some_and(|limit| iterations >= limit)
            {
                return Ok(self.unknown("iteration limit"));
            }
            iterations += 1;
            self.stats.iterations += 1;

            let literals = self.assumption_literals();
            let result = if literals.is_empty() {
                self.solver.check_sat()
            } else {
                self.solver.check_sat_assuming(&literals)
            }
            .map_err(SwineError::solver)?;

            match result {
                SatResult::Sat => {}
                SatResult::Unsat => return self.on_unsat(!literals.is_empty()),
                SatResult::Unknown(reason) => return Ok(self.unknown(&reason)),
            }

            let (valuation, samples) = self.snapshot()?;
            let evaluated = match self.evaluate(samples) {
                Evaluation::Ready(evaluated) => evaluated,
                Evaluation::Overflow(terms) => {
                    if !self.clamp(&terms)? {
                        return Ok(self.unknown("overflow"));
                    }
                    continue;
                }
            };

            let mismatched: Vec<&EvaluatedExponential> =
                evaluated.iter().filter(|ev| ev.mismatch()).collect();
            if mismatched.is_empty() {
                return Ok(self.on_sat(valuation));
            }
            debug!(
                "iteration {iterations}: {} of {} exponentials are wrong",
                mismatched.len(),
                evaluated.len()
            );

            let mut refined = false;
            for kind in LemmaKind::ALL {
                if !self.config.is_active(kind) {
                    continue;
                }
                let candidates = self.candidates(kind, &evaluated, &mismatched);
                let lemmas = self.violated(candidates, &valuation);
                if lemmas.is_empty() {
                    continue;
                }
                for lemma in &lemmas {
                    self.add_lemma(lemma, kind)?;
                }
                if kind == LemmaKind::Interpolation {
                    for ev in &mismatched {
                        self.top_mut()
                            .anchors
                            .entry(ev.term.clone())
                            .or_default()
                            .push((ev.base_val.clone(), ev.exponent_val));
                    }
                }
                refined = true;
                break;
            }

            if !refined {
                if self.config.is_active(LemmaKind::Interpolation) {
                    return Err(SwineError::RefinementStalled {
                        mismatches: mismatched.len(),
                    });
                }
                return Ok(self.unknown(NEEDS_INTERPOLATION));
            }
        }
    }

    fn unknown(&mut self, reason: &str) -> SatResult {
        self.reason_unknown = Some(reason.to_string());
        SatResult::Unknown(reason.to_string())
    }

    /// User literals first, then lemma literals of all live frames.
    fn assumption_literals(&self) -> Vec<String> {
        self.user_assumptions
            .iter()
            .map(|(name, _)| name.clone())
            .chain(
                self.frames
                    .iter()
                    .flat_map(|f| f.assumptions.keys().cloned()),
            )
            .collect()
    }

    fn snapshot(&mut self) -> Result<(Valuation, Vec<Sample>), SwineError> {
        let mut valuation = Valuation::default();
        for (name, _) in self.live_symbols() {
            let value = self
                .solver
                .get_value(&SmtTerm::var(name.as_str()))
                .map_err(SwineError::solver)?;
            valuation.vars.insert(name, value);
        }

        let mut samples = Vec::new();
        for term in self.tracked_exps() {
            let Some((base, exponent)) = term.as_exp() else {
                continue;
            };
            let base = self.int_value(base)?;
            let exponent = self.int_value(exponent)?;
            let value = self.int_value(&term)?;
            valuation
                .exps
                .insert((base.clone(), exponent.clone()), value.clone());
            samples.push(Sample {
                term,
                base,
                exponent,
                value,
            });
        }
        Ok((valuation, samples))
    }

    fn int_value(&mut self, term: &SmtTerm) -> Result<BigInt, SwineError> {
        if let Some(n) = term.as_int_literal() {
            return Ok(n.clone());
        }
        match self.solver.get_value(term).map_err(SwineError::solver)? {
            ModelValue::Int(n) => Ok(n),
            ModelValue::Bool(_) => Err(SwineError::MalformedTerm(format!(
                "{term} has a Boolean value"
            ))),
        }
    }

    fn evaluate(&self, samples: Vec<Sample>) -> Evaluation {
        let semantics = self.config.semantics;
        let mut evaluated = Vec::with_capacity(samples.len());
        let mut overflow = Vec::new();
        for sample in samples {
            let Some((base, exponent)) = sample.term.as_exp() else {
                continue;
            };
            if semantics == Semantics::Partial && sample.exponent < BigInt::from(0) {
                continue;
            }
            let checked = to_exponent(exponent, &sample.exponent)
                .and_then(|e| check_power(base, exponent, &sample.base, e).map(|()| e));
            match checked {
                Ok(e) => {
                    if let Some(ev) = EvaluatedExponential::new(
                        sample.term,
                        sample.base,
                        e,
                        sample.value,
                        semantics,
                    ) {
                        evaluated.push(ev);
                    }
                }
                Err(err) => {
                    debug!("{err}");
                    overflow.push(sample.term);
                }
            }
        }
        if overflow.is_empty() {
            Evaluation::Ready(evaluated)
        } else {
            Evaluation::Overflow(overflow)
        }
    }

    /// Confines base and exponent of each term to computable ranges.
    /// Returns false if every term was already confined.
    fn clamp(&mut self, terms: &[SmtTerm]) -> Result<bool, SwineError> {
        let mut clamped_any = false;
        for term in terms {
            if self.frames.iter().any(|f| f.clamped.contains(term)) {
                continue;
            }
            let Some((base, exponent)) = term.as_exp() else {
                continue;
            };
            for bound in clamp_constraints(base, exponent) {
                self.solver.assert(&bound).map_err(SwineError::solver)?;
            }
            warn!("clamping {term} to avoid overflow");
            let top = self.top_mut();
            top.clamped.insert(term.clone());
            top.has_overflow = true;
            self.stats.clamps += 1;
            clamped_any = true;
        }
        Ok(clamped_any)
    }

    fn candidates(
        &self,
        kind: LemmaKind,
        evaluated: &[EvaluatedExponential],
        mismatched: &[&EvaluatedExponential],
    ) -> Vec<SmtTerm> {
        match kind {
            LemmaKind::Symmetry => mismatched
                .iter()
                .flat_map(|ev| match self.group_of(&ev.term) {
                    Some(group) => symmetry::lemmas(ev, group, self.config.semantics),
                    None => Vec::new(),
                })
                .collect(),
            LemmaKind::Bounding => mismatched
                .iter()
                .flat_map(|ev| self.bounding_for(&ev.term))
                .collect(),
            LemmaKind::Monotonicity => monotonicity::lemmas(evaluated),
            LemmaKind::Modulo => mismatched
                .iter()
                .filter_map(|ev| modulo::lemma(ev, self.config.semantics))
                .collect(),
            LemmaKind::Interpolation => mismatched
                .iter()
                .flat_map(|ev| {
                    interpolation::lemmas(ev, &self.anchors_for(&ev.term), self.config.semantics)
                })
                .collect(),
        }
    }

    /// Preprocessed candidates that are new and false in the candidate
    /// model. Candidates the evaluator cannot decide are kept.
    fn violated(&self, candidates: Vec<SmtTerm>, valuation: &Valuation) -> Vec<SmtTerm> {
        let evaluator = TermEvaluator::new(valuation, EvalMode::Abstract, self.config.semantics);
        let mut out = IndexSet::new();
        for candidate in candidates {
            let lemma = self.preprocessor.preprocess(&candidate);
            if lemma.as_bool_literal() == Some(true) || self.lemma_known(&lemma) {
                continue;
            }
            match evaluator.eval_bool(&lemma) {
                Ok(true) => {}
                Ok(false) => {
                    out.insert(lemma);
                }
                Err(err) => {
                    debug!("keeping undecided lemma {lemma}: {err}");
                    out.insert(lemma);
                }
            }
        }
        out.into_iter().collect()
    }

    fn on_sat(&mut self, valuation: Valuation) -> SatResult {
        if self.config.validate_sat {
            let evaluator = TermEvaluator::new(&valuation, EvalMode::Exact, self.config.semantics);
            let originals = self.frames.iter().flat_map(|f| f.assertions.iter());
            let mut failures = Vec::new();
            for assertion in originals.chain(self.live_assertions()) {
                match evaluator.eval_bool(assertion) {
                    Ok(true) => {}
                    Ok(false) => failures.push(format!("model violates {assertion}")),
                    Err(err) => failures.push(format!("cannot validate {assertion}: {err}")),
                }
            }
            if !failures.is_empty() {
                failures.push(self.model_report(&valuation));
                let report = failures.join("\n");
                warn!("validation failed\n{report}");
                self.validation_report = Some(report);
            }
        }
        self.valuation = Some(valuation);
        SatResult::Sat
    }

    /// Values of all live symbols in declaration order, then every tracked
    /// exponential as `base^exponent = value`.
    pub(super) fn model_report(&self, valuation: &Valuation) -> String {
        let mut lines = vec!["model:".to_string()];
        for (name, _) in self.live_symbols() {
            if let Some(value) = valuation.vars.get(&name) {
                lines.push(format!("  {name} = {value}"));
            }
        }
        lines.push("exponentials:".to_string());
        let evaluator = TermEvaluator::new(valuation, EvalMode::Abstract, self.config.semantics);
        for term in self.tracked_exps() {
            let Some((base, exponent)) = term.as_exp() else {
                continue;
            };
            let (Ok(b), Ok(e)) = (evaluator.eval_int(base), evaluator.eval_int(exponent)) else {
                continue;
            };
            match valuation.exps.get(&(b.clone(), e.clone())) {
                Some(value) => lines.push(format!("  {term}: {b}^{e} = {value}")),
                None => lines.push(format!("  {term}: {b}^{e} has no value")),
            }
        }
        lines.join("\n")
    }

    fn on_unsat(&mut self, assumed: bool) -> Result<SatResult, SwineError> {
        if self.frames.iter().any(|f| f.has_overflow) {
            return Ok(self.unknown("overflow"));
        }
        if assumed {
            let core = self
                .solver
                .get_unsat_core_assumptions()
                .map_err(SwineError::solver)?;
            for name in &core {
                if let Some((_, term)) = self.user_assumptions.iter().find(|(n, _)| n == name) {
                    self.unsat_assumptions.push(term.clone());
                    continue;
                }
                let lemma = self
                    .frames
                    .iter()
                    .find_map(|f| f.assumptions.get(name.as_str()));
                if let Some((lemma, kind)) = lemma {
                    self.lemma_core.entry(*kind).or_default().push(lemma.clone());
                }
            }
        }
        if let Some(bound) = self.config.validate_unsat {
            self.brute_force(bound)?;
        }
        Ok(SatResult::Unsat)
    }
}
