//! Relations between members of an exponential group.

use num::Signed;
use swine_smt::terms::SmtTerm;

use super::EvaluatedExponential;
use crate::config::Semantics;
use crate::exp_finder::{ExpGroup, Mirror};

const BASE: Mirror = Mirror {
    base: true,
    exponent: false,
};
const EXPONENT: Mirror = Mirror {
    base: false,
    exponent: true,
};

/// Lemmas for a candidate model that picked a negative base or, under total
/// semantics, a negative exponent. Partners are the mirrored members of the
/// group of `ev.term`.
pub fn lemmas(ev: &EvaluatedExponential, group: &ExpGroup, semantics: Semantics) -> Vec<SmtTerm> {
    let mut out = Vec::new();
    for (partner, mirror) in group.mirrors(&ev.term) {
        if mirror == BASE && ev.base_val.is_negative() {
            out.extend(parity_lemmas(&ev.term, partner, semantics));
        } else if mirror == EXPONENT && ev.exponent_val < 0 && semantics == Semantics::Total {
            out.push(ev.term.clone().eq(partner.clone()));
        }
    }
    out
}

/// Every symmetry lemma between members of `group`, independent of any
/// model.
pub fn eager_lemmas(group: &ExpGroup, semantics: Semantics) -> Vec<SmtTerm> {
    let mut out = Vec::new();
    for (term, partner, mirror) in group.pairs() {
        if mirror == BASE {
            out.extend(parity_lemmas(term, partner, semantics));
        } else if mirror == EXPONENT && semantics == Semantics::Total {
            out.push(term.clone().eq(partner.clone()));
        }
    }
    out
}

/// `x mod 2 = 0 ⇒ exp(b, x) = exp(-b, x)` and
/// `x mod 2 = 1 ⇒ exp(b, x) = -exp(-b, x)`, guarded by `x ≥ 0` under
/// partial semantics. `sibling` is the member equal to `exp(-b, x)`.
fn parity_lemmas(term: &SmtTerm, sibling: &SmtTerm, semantics: Semantics) -> Vec<SmtTerm> {
    let Some((_, exponent)) = term.as_exp() else {
        return Vec::new();
    };
    let parity = |p: i64| exponent.clone().modulo(SmtTerm::int(2)).eq(SmtTerm::int(p));
    let premise = |p: i64| match semantics {
        Semantics::Partial => SmtTerm::and(vec![exponent.clone().ge(SmtTerm::int(0)), parity(p)]),
        Semantics::Total => parity(p),
    };
    vec![
        premise(0).implies(term.clone().eq(sibling.clone())),
        premise(1).implies(term.clone().eq(sibling.clone().neg())),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, PreprocessingKind};
    use crate::evaluator::{EvalMode, TermEvaluator, Valuation};
    use crate::exp_finder::build_group;
    use crate::preprocess::Preprocessor;
    use crate::proptest_generators::arb_base_exponent;
    use num::BigInt;
    use proptest::prelude::*;
    use swine_smt::solver::ModelValue;

    fn t() -> SmtTerm {
        SmtTerm::exp(SmtTerm::var("b"), SmtTerm::var("x"))
    }

    fn evaluated(b: i64, x: i64, semantics: Semantics) -> EvaluatedExponential {
        EvaluatedExponential::new(t(), BigInt::from(b), x, BigInt::from(0), semantics).unwrap()
    }

    fn group(pp: &Preprocessor) -> ExpGroup {
        build_group(&t(), pp).unwrap()
    }

    #[test]
    fn positive_bases_need_no_parity_lemma() {
        let pp = Preprocessor::new(&Config::default());
        let group = group(&pp);
        assert!(lemmas(&evaluated(3, 2, Semantics::Partial), &group, Semantics::Partial).is_empty());
        assert_eq!(
            lemmas(&evaluated(-3, 2, Semantics::Partial), &group, Semantics::Partial).len(),
            2
        );
    }

    #[test]
    fn partners_come_from_the_group() {
        let pp = Preprocessor::new(&Config::default());
        let group = group(&pp);
        let mirrored = SmtTerm::exp(SmtTerm::var("b").neg(), SmtTerm::var("x"));
        let ev = EvaluatedExponential::new(
            mirrored.clone(),
            BigInt::from(-2),
            3,
            BigInt::from(0),
            Semantics::Partial,
        )
        .unwrap();
        let out = lemmas(&ev, &group, Semantics::Partial);
        let x = SmtTerm::var("x");
        let odd = SmtTerm::and(vec![
            x.clone().ge(SmtTerm::int(0)),
            x.modulo(SmtTerm::int(2)).eq(SmtTerm::int(1)),
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1], odd.implies(mirrored.eq(t().neg())));

        let stranger = EvaluatedExponential::new(
            SmtTerm::exp(SmtTerm::var("c"), SmtTerm::var("x")),
            BigInt::from(-2),
            3,
            BigInt::from(0),
            Semantics::Partial,
        )
        .unwrap();
        assert!(lemmas(&stranger, &group, Semantics::Partial).is_empty());
    }

    #[test]
    fn literal_bases_fold_into_the_sibling() {
        let pp = Preprocessor::new(&Config::default());
        let t = SmtTerm::exp(SmtTerm::int(-2), SmtTerm::var("x"));
        let sibling = SmtTerm::exp(SmtTerm::int(2), SmtTerm::var("x"));
        let lemmas = eager_lemmas(&build_group(&t, &pp).unwrap(), Semantics::Partial);
        assert!(lemmas.len() >= 2);
        assert!(lemmas[0].to_string().contains(&sibling.to_string()));
        assert!(lemmas[1].to_string().contains(&sibling.to_string()));
        let positive = build_group(&sibling, &pp).unwrap();
        assert!(eager_lemmas(&positive, Semantics::Partial).is_empty());
    }

    #[test]
    fn negative_exponents_relate_only_without_normalisation() {
        let normalising = Preprocessor::new(&Config::default().with_semantics(Semantics::Total));
        let collapsed = group(&normalising);
        assert!(lemmas(&evaluated(3, -2, Semantics::Total), &collapsed, Semantics::Total).is_empty());

        let config = Config::default()
            .with_semantics(Semantics::Total)
            .without_preprocessing(PreprocessingKind::Rewriting);
        let plain = Preprocessor::new(&config);
        let out = lemmas(&evaluated(3, -2, Semantics::Total), &group(&plain), Semantics::Total);
        assert_eq!(
            out,
            vec![t().eq(SmtTerm::exp(SmtTerm::var("b"), SmtTerm::var("x").neg()))]
        );
    }

    proptest! {
        #[test]
        fn eager_lemmas_hold_for_real_powers((b, x) in arb_base_exponent()) {
            for semantics in [Semantics::Partial, Semantics::Total] {
                let config = Config::default()
                    .with_semantics(semantics)
                    .without_preprocessing(PreprocessingKind::Rewriting);
                let pp = Preprocessor::new(&config);
                let valuation = Valuation::default()
                    .with_var("b", ModelValue::Int(b.into()))
                    .with_var("x", ModelValue::Int(x.into()));
                let eval = TermEvaluator::new(&valuation, EvalMode::Exact, semantics);
                for lemma in eager_lemmas(&group(&pp), semantics) {
                    prop_assert_eq!(eval.eval_bool(&lemma), Ok(true), "{} at b={}, x={}", lemma, b, x);
                }
            }
        }
    }
}
