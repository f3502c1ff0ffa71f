//! Pairwise growth of exponentials with bases above one.

use num::BigInt;
use swine_smt::terms::SmtTerm;

use super::EvaluatedExponential;

/// For every ordered pair `(s, l)` whose arguments satisfy
/// `1 < β_s ≤ β_l`, `0 ≤ ξ_s ≤ ξ_l` and are strictly smaller in some
/// dimension, but whose values do not satisfy `τ_s < τ_l`, the lemma
///
/// `1 < b_s ∧ 0 ≤ x_s ∧ b_s ≤ b_l ∧ x_s ≤ x_l ∧ (x_s < x_l ∨ (b_s < b_l ∧ 0 < x_s)) ⇒ t_s < t_l`
///
/// The `0 < x_s` conjunct matters: `b^0 = 1` for every base.
pub fn lemmas(evaluated: &[EvaluatedExponential]) -> Vec<SmtTerm> {
    let mut out = Vec::new();
    for (i, small) in evaluated.iter().enumerate() {
        for (j, large) in evaluated.iter().enumerate() {
            if i != j && violated(small, large) {
                out.push(lemma(small, large));
            }
        }
    }
    out
}

fn violated(s: &EvaluatedExponential, l: &EvaluatedExponential) -> bool {
    let one = BigInt::from(1);
    s.base_val > one
        && s.exponent_val >= 0
        && s.base_val <= l.base_val
        && s.exponent_val <= l.exponent_val
        && (s.exponent_val < l.exponent_val || (s.base_val < l.base_val && s.exponent_val > 0))
        && s.value >= l.value
}

fn lemma(s: &EvaluatedExponential, l: &EvaluatedExponential) -> SmtTerm {
    let zero = || SmtTerm::int(0);
    SmtTerm::and(vec![
        SmtTerm::int(1).lt(s.base.clone()),
        zero().le(s.exponent.clone()),
        s.base.clone().le(l.base.clone()),
        s.exponent.clone().le(l.exponent.clone()),
        SmtTerm::or(vec![
            s.exponent.clone().lt(l.exponent.clone()),
            SmtTerm::and(vec![
                s.base.clone().lt(l.base.clone()),
                zero().lt(s.exponent.clone()),
            ]),
        ]),
    ])
    .implies(s.term.clone().lt(l.term.clone()))
}
