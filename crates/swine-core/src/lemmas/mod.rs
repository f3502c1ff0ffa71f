//! Lemma families used to refine the abstraction of `exp`.
//!
//! Every generator returns raw lemmas; the engine preprocesses them, drops
//! those already known or not violated by the candidate model, and asserts
//! the rest.

pub mod bounding;
pub mod interpolation;
pub mod modulo;
pub mod monotonicity;
pub mod symmetry;

use num::BigInt;
use swine_smt::terms::SmtTerm;

use crate::config::Semantics;
use crate::numeric::abs_pow;

/// A tracked exponential together with its values in the candidate model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluatedExponential {
    pub term: SmtTerm,
    pub base: SmtTerm,
    pub exponent: SmtTerm,
    pub base_val: BigInt,
    pub exponent_val: i64,
    /// What the solver chose for the application.
    pub value: BigInt,
    /// `base_val^|exponent_val|`, or `None` where the semantics leaves the
    /// value open.
    pub expected: Option<BigInt>,
}

impl EvaluatedExponential {
    pub fn new(
        term: SmtTerm,
        base_val: BigInt,
        exponent_val: i64,
        value: BigInt,
        semantics: Semantics,
    ) -> Option<Self> {
        let (base, exponent) = term.as_exp()?;
        let (base, exponent) = (base.clone(), exponent.clone());
        let expected = (semantics == Semantics::Total || exponent_val >= 0)
            .then(|| abs_pow(&base_val, exponent_val));
        Some(Self {
            term,
            base,
            exponent,
            base_val,
            exponent_val,
            value,
            expected,
        })
    }

    pub fn mismatch(&self) -> bool {
        self.expected.as_ref().is_some_and(|e| *e != self.value)
    }

    /// The solver's value is smaller than the real power.
    pub fn too_small(&self) -> bool {
        self.expected.as_ref().is_some_and(|e| self.value < *e)
    }
}

/// `b = β` when the base is symbolic, nothing when it is a literal.
pub(crate) fn base_premise(ev: &EvaluatedExponential) -> Option<SmtTerm> {
    if ev.base.as_int_literal().is_some() {
        None
    } else {
        Some(ev.base.clone().eq(SmtTerm::IntLit(ev.base_val.clone())))
    }
}

/// `premises ⇒ conclusion`, with an empty premise list meaning `true`.
pub(crate) fn guarded(mut premises: Vec<SmtTerm>, conclusion: SmtTerm) -> SmtTerm {
    match premises.len() {
        0 => conclusion,
        1 => premises.remove(0).implies(conclusion),
        _ => SmtTerm::and(premises).implies(conclusion),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(base: SmtTerm, b: i64, x: i64, value: i64, semantics: Semantics) -> EvaluatedExponential {
        EvaluatedExponential::new(
            SmtTerm::exp(base, SmtTerm::var("x")),
            BigInt::from(b),
            x,
            BigInt::from(value),
            semantics,
        )
        .unwrap()
    }

    #[test]
    fn mismatch_respects_semantics() {
        assert!(ev(SmtTerm::int(2), 2, 3, 7, Semantics::Partial).mismatch());
        assert!(!ev(SmtTerm::int(2), 2, 3, 8, Semantics::Partial).mismatch());
        assert!(!ev(SmtTerm::int(2), 2, -3, 7, Semantics::Partial).mismatch());
        assert!(ev(SmtTerm::int(2), 2, -3, 7, Semantics::Total).mismatch());
        assert!(ev(SmtTerm::int(2), 2, -3, 7, Semantics::Total).too_small());
    }

    #[test]
    fn base_premise_only_for_symbolic_bases() {
        assert_eq!(base_premise(&ev(SmtTerm::int(2), 2, 1, 0, Semantics::Partial)), None);
        assert_eq!(
            base_premise(&ev(SmtTerm::var("b"), 5, 1, 0, Semantics::Partial)),
            Some(SmtTerm::var("b").eq(SmtTerm::int(5)))
        );
    }

    #[test]
    fn guards_collapse_when_trivial() {
        let c = SmtTerm::var("c");
        let p = SmtTerm::var("p");
        assert_eq!(guarded(vec![], c.clone()), c);
        assert_eq!(guarded(vec![p.clone()], c.clone()), p.clone().implies(c.clone()));
        assert_eq!(
            guarded(vec![p.clone(), p.clone()], c.clone()),
            SmtTerm::and(vec![p.clone(), p]).implies(c)
        );
    }
}
