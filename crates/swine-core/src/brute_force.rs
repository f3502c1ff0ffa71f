//! Exhaustive search for a model with small exponents.
//!
//! Used to cross-check UNSAT answers: every exponential whose exponent is
//! fixed by an assignment is replaced by the explicit product, so the
//! backend decides the formula without the abstraction. Exponents `x` and
//! `-x` share one search variable.

use indexmap::IndexMap;
use num::BigInt;
use swine_smt::solver::{Model, SatResult, SmtSolver};
use swine_smt::sorts::SmtSort;
use swine_smt::terms::SmtTerm;
use tracing::debug;

use crate::config::Semantics;
use crate::numeric::abs_pow;

/// A symbolic exponent enumerated over `0..`. When only `-x` occurs, `x`
/// runs over `..=0` so that the occurring exponent stays non-negative.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SearchVar {
    term: SmtTerm,
    negated: bool,
}

pub struct BruteForce<S: SmtSolver> {
    solver: S,
    symbols: Vec<(String, SmtSort)>,
    exps: Vec<SmtTerm>,
    vars: Vec<SearchVar>,
    semantics: Semantics,
}

/// `x` for `-x`, and whether the sign was stripped.
fn strip_sign(exponent: &SmtTerm) -> (&SmtTerm, bool) {
    match exponent {
        SmtTerm::Neg(inner) => (inner.as_ref(), true),
        other => (other, false),
    }
}

impl<S: SmtSolver> BruteForce<S> {
    /// `solver` must be empty; the symbols and assertions are replayed into it.
    pub fn new(
        mut solver: S,
        symbols: Vec<(String, SmtSort)>,
        assertions: &[SmtTerm],
        exps: Vec<SmtTerm>,
        semantics: Semantics,
    ) -> Result<Self, S::Error> {
        for (name, sort) in &symbols {
            solver.declare_var(name, sort)?;
        }
        for assertion in assertions {
            solver.assert(assertion)?;
        }
        Ok(Self {
            solver,
            symbols,
            vars: search_vars(&exps),
            exps,
            semantics,
        })
    }

    /// Tries all assignments of total weight `0..=bound` and returns the
    /// first model found.
    pub fn search(&mut self, bound: u64) -> Result<Option<Model>, S::Error> {
        for weight in 0..=bound {
            for assignment in Compositions::new(weight, self.vars.len()) {
                if let Some(model) = self.try_assignment(&assignment)? {
                    debug!("brute force found a model at weight {weight}");
                    return Ok(Some(model));
                }
            }
        }
        Ok(None)
    }

    fn try_assignment(&mut self, assignment: &[u64]) -> Result<Option<Model>, S::Error> {
        self.solver.push()?;
        for (var, value) in self.vars.iter().zip(assignment) {
            let value = BigInt::from(*value);
            let value = if var.negated { -value } else { value };
            self.solver.assert(&var.term.clone().eq(SmtTerm::IntLit(value)))?;
        }
        for t in &self.exps {
            if let Some(unfolded) = unfold(t, &self.vars, assignment, self.semantics) {
                self.solver.assert(&t.clone().eq(unfolded))?;
            }
        }
        let result = self.solver.check_sat()?;
        let model = if result == SatResult::Sat {
            let mut model = Model::default();
            for (name, _) in &self.symbols {
                let value = self.solver.get_value(&SmtTerm::var(name.as_str()))?;
                model.values.insert(name.clone(), value);
            }
            Some(model)
        } else {
            None
        };
        self.solver.pop()?;
        Ok(model)
    }
}

/// One search variable per symbolic exponent up to sign. A variable
/// occurring with both signs is enumerated unnegated.
fn search_vars(exps: &[SmtTerm]) -> Vec<SearchVar> {
    let mut vars: IndexMap<SmtTerm, bool> = IndexMap::new();
    for (_, exponent) in exps.iter().filter_map(|t| t.as_exp()) {
        if exponent.as_int_literal().is_some() {
            continue;
        }
        let (term, negated) = strip_sign(exponent);
        vars.entry(term.clone())
            .and_modify(|n| *n &= negated)
            .or_insert(negated);
    }
    vars.into_iter()
        .map(|(term, negated)| SearchVar { term, negated })
        .collect()
}

/// The value of `exponent` under `assignment`, if it is a literal or a
/// possibly negated search variable.
fn exponent_value(exponent: &SmtTerm, vars: &[SearchVar], assignment: &[u64]) -> Option<i64> {
    if let Some(k) = exponent.as_int_literal() {
        return i64::try_from(k).ok();
    }
    let (term, negated) = strip_sign(exponent);
    let idx = vars.iter().position(|v| v.term == *term)?;
    let magnitude = i64::try_from(assignment[idx]).ok()?;
    Some(if negated == vars[idx].negated {
        magnitude
    } else {
        -magnitude
    })
}

/// `b · … · b` for `t = exp(b, x)` when the value of `x` is known. Negative
/// exponents unfold to `b^|x|` under total semantics and stay abstract
/// under partial semantics.
fn unfold(t: &SmtTerm, vars: &[SearchVar], assignment: &[u64], semantics: Semantics) -> Option<SmtTerm> {
    let (base, exponent) = t.as_exp()?;
    let value = exponent_value(exponent, vars, assignment)?;
    if value < 0 && semantics == Semantics::Partial {
        return None;
    }
    let power = value.unsigned_abs();
    if let Some(b) = base.as_int_literal() {
        let power = i64::try_from(power).ok()?;
        return Some(SmtTerm::IntLit(abs_pow(b, power)));
    }
    Some(match power {
        0 => SmtTerm::int(1),
        1 => base.clone(),
        n => SmtTerm::product(vec![base.clone(); usize::try_from(n).ok()?]),
    })
}

/// All ways to write `weight` as an ordered sum of `parts` non-negative
/// integers, starting from `[weight, 0, …, 0]`.
#[derive(Debug, Clone)]
pub struct Compositions {
    current: Option<Vec<u64>>,
}

impl Compositions {
    pub fn new(weight: u64, parts: usize) -> Self {
        let current = if parts == 0 {
            (weight == 0).then(Vec::new)
        } else {
            let mut first = vec![0; parts];
            first[0] = weight;
            Some(first)
        };
        Self { current }
    }
}

impl Iterator for Compositions {
    type Item = Vec<u64>;

    fn next(&mut self) -> Option<Vec<u64>> {
        let current = self.current.take()?;
        let last = current.len().saturating_sub(1);
        if let Some(i) = (0..last).rev().find(|&i| current[i] > 0) {
            let mut next = current.clone();
            next[i] -= 1;
            let tail: u64 = next[i + 1..].iter().sum();
            next[i + 1] = tail + 1;
            for part in &mut next[i + 2..] {
                *part = 0;
            }
            self.current = Some(next);
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compositions_are_complete_and_ordered() {
        let all: Vec<_> = Compositions::new(2, 3).collect();
        assert_eq!(
            all,
            vec![
                vec![2, 0, 0],
                vec![1, 1, 0],
                vec![1, 0, 1],
                vec![0, 2, 0],
                vec![0, 1, 1],
                vec![0, 0, 2],
            ]
        );
    }

    #[test]
    fn degenerate_compositions() {
        assert_eq!(Compositions::new(3, 1).collect::<Vec<_>>(), vec![vec![3]]);
        assert_eq!(Compositions::new(0, 0).collect::<Vec<_>>(), vec![Vec::<u64>::new()]);
        assert_eq!(Compositions::new(1, 0).count(), 0);
        assert_eq!(Compositions::new(0, 4).collect::<Vec<_>>(), vec![vec![0; 4]]);
    }

    #[test]
    fn composition_counts_match_stars_and_bars() {
        // C(w + n - 1, n - 1)
        assert_eq!(Compositions::new(4, 3).count(), 15);
        assert_eq!(Compositions::new(5, 2).count(), 6);
    }

    fn var(name: &str, negated: bool) -> SearchVar {
        SearchVar {
            term: SmtTerm::var(name),
            negated,
        }
    }

    #[test]
    fn unfolding_uses_assignment_or_literal() {
        let x = SmtTerm::var("x");
        let b = SmtTerm::var("b");
        let vars = vec![var("x", false)];
        let t = SmtTerm::exp(b.clone(), x.clone());
        assert_eq!(
            unfold(&t, &vars, &[3], Semantics::Partial),
            Some(SmtTerm::product(vec![b.clone(), b.clone(), b.clone()]))
        );
        assert_eq!(unfold(&t, &vars, &[0], Semantics::Partial), Some(SmtTerm::int(1)));
        let lit = SmtTerm::exp(SmtTerm::int(3), x);
        assert_eq!(unfold(&lit, &vars, &[4], Semantics::Partial), Some(SmtTerm::int(81)));
        let negative = SmtTerm::exp(b.clone(), SmtTerm::int(-2));
        assert_eq!(unfold(&negative, &vars, &[1], Semantics::Partial), None);
        assert_eq!(
            unfold(&negative, &vars, &[1], Semantics::Total),
            Some(SmtTerm::product(vec![b.clone(), b]))
        );
    }

    #[test]
    fn mirrored_exponents_share_a_search_variable() {
        let x = SmtTerm::var("x");
        let y = SmtTerm::var("y");
        let exps = vec![
            SmtTerm::exp(SmtTerm::int(2), x.clone().neg()),
            SmtTerm::exp(SmtTerm::int(2), x.clone()),
            SmtTerm::exp(SmtTerm::var("b"), x.clone().neg()),
            SmtTerm::exp(SmtTerm::int(3), y.neg()),
            SmtTerm::exp(SmtTerm::int(3), SmtTerm::int(4)),
        ];
        assert_eq!(search_vars(&exps), vec![var("x", false), var("y", true)]);
    }

    #[test]
    fn mirrored_exponents_follow_their_variable() {
        let x = SmtTerm::var("x");
        let vars = vec![var("x", false)];
        let mirrored = SmtTerm::exp(SmtTerm::int(2), x.clone().neg());
        assert_eq!(unfold(&mirrored, &vars, &[0], Semantics::Partial), Some(SmtTerm::int(1)));
        assert_eq!(unfold(&mirrored, &vars, &[3], Semantics::Partial), None);
        assert_eq!(unfold(&mirrored, &vars, &[3], Semantics::Total), Some(SmtTerm::int(8)));

        // Only `-x` occurs, so `x` is enumerated downwards.
        let only_negated = vec![var("x", true)];
        assert_eq!(
            unfold(&mirrored, &only_negated, &[3], Semantics::Partial),
            Some(SmtTerm::int(8))
        );
        assert_eq!(exponent_value(&x, &only_negated, &[3]), Some(-3));
    }
}
