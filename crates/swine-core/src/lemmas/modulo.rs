//! Divisibility of powers of a literal base.

use num::{BigInt, Integer, Signed};
use swine_smt::terms::SmtTerm;

use super::EvaluatedExponential;
use crate::config::Semantics;

/// `x > 0 ⇒ t mod |β| = 0` for `t = exp(β, x)` with a literal base
/// `|β| > 1`, when the candidate value is not divisible by `|β|`. Under
/// total semantics the premise is `x ≠ 0`.
pub fn lemma(ev: &EvaluatedExponential, semantics: Semantics) -> Option<SmtTerm> {
    let modulus = ev.base.as_int_literal()?.abs();
    if modulus <= BigInt::from(1) {
        return None;
    }
    let applies = match semantics {
        Semantics::Partial => ev.exponent_val > 0,
        Semantics::Total => ev.exponent_val != 0,
    };
    if !applies || ev.value.mod_floor(&modulus) == BigInt::from(0) {
        return None;
    }
    let premise = match semantics {
        Semantics::Partial => ev.exponent.clone().gt(SmtTerm::int(0)),
        Semantics::Total => ev.exponent.clone().eq(SmtTerm::int(0)).not(),
    };
    Some(premise.implies(
        ev.term
            .clone()
            .modulo(SmtTerm::IntLit(modulus))
            .eq(SmtTerm::int(0)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::{EvalMode, TermEvaluator, Valuation};
    use crate::numeric::{abs_pow, smt_mod};
    use proptest::prelude::*;
    use swine_smt::solver::ModelValue;

    fn evaluated(base: SmtTerm, x: i64, value: i64, semantics: Semantics) -> EvaluatedExponential {
        let b = base.as_int_literal().cloned().unwrap_or_else(|| BigInt::from(3));
        EvaluatedExponential::new(
            SmtTerm::exp(base, SmtTerm::var("x")),
            b,
            x,
            BigInt::from(value),
            semantics,
        )
        .unwrap()
    }

    #[test]
    fn non_multiples_are_refuted() {
        let ev = evaluated(SmtTerm::int(-3), 2, 10, Semantics::Partial);
        let expected = SmtTerm::var("x").gt(SmtTerm::int(0)).implies(
            ev.term
                .clone()
                .modulo(SmtTerm::int(3))
                .eq(SmtTerm::int(0)),
        );
        assert_eq!(lemma(&ev, Semantics::Partial), Some(expected));
    }

    #[test]
    fn only_literal_bases_beyond_one_qualify() {
        assert!(lemma(&evaluated(SmtTerm::var("b"), 2, 10, Semantics::Partial), Semantics::Partial).is_none());
        assert!(lemma(&evaluated(SmtTerm::int(1), 2, 10, Semantics::Partial), Semantics::Partial).is_none());
        assert!(lemma(&evaluated(SmtTerm::int(3), 2, 12, Semantics::Partial), Semantics::Partial).is_none());
        assert!(lemma(&evaluated(SmtTerm::int(3), 0, 10, Semantics::Partial), Semantics::Partial).is_none());
    }

    #[test]
    fn total_semantics_covers_negative_exponents() {
        let ev = evaluated(SmtTerm::int(2), -3, 7, Semantics::Total);
        let out = lemma(&ev, Semantics::Total).unwrap();
        assert!(matches!(out, SmtTerm::Implies(ref p, _) if matches!(**p, SmtTerm::Not(_))));
        assert!(lemma(&ev, Semantics::Partial).is_none());
    }

    proptest! {
        #[test]
        fn lemmas_hold_for_real_powers_and_refute_the_model(
            beta in -6i64..=6,
            xi in -4i64..=8,
            wrong in -60i64..=60,
            total in any::<bool>(),
        ) {
            let semantics = if total { Semantics::Total } else { Semantics::Partial };
            let ev = evaluated(SmtTerm::int(beta), xi, wrong, semantics);
            let Some(lemma) = lemma(&ev, semantics) else {
                return Ok(());
            };
            let modulus = BigInt::from(beta.abs());
            prop_assert!(modulus > BigInt::from(1));
            prop_assert_ne!(smt_mod(&BigInt::from(wrong), &modulus), Some(BigInt::from(0)));

            let candidate = Valuation::default()
                .with_var("x", ModelValue::Int(xi.into()))
                .with_exp(beta, xi, wrong);
            let abstract_eval = TermEvaluator::new(&candidate, EvalMode::Abstract, semantics);
            prop_assert_eq!(abstract_eval.eval_bool(&lemma), Ok(false));

            for x in -5i64..=10 {
                let valuation = Valuation::default().with_var("x", ModelValue::Int(x.into()));
                let exact = TermEvaluator::new(&valuation, EvalMode::Exact, semantics);
                let defined = semantics == Semantics::Total || x >= 0;
                let premise = if total { x != 0 } else { x > 0 };
                if defined {
                    prop_assert_eq!(exact.eval_bool(&lemma), Ok(true), "{} fails at x={}", lemma, x);
                }
                if premise && defined {
                    let power = abs_pow(&BigInt::from(beta), x);
                    prop_assert_eq!(smt_mod(&power, &modulus), Some(BigInt::from(0)));
                }
            }
        }
    }
}
