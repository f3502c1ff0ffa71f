//! Model-independent facts about a single exponential.

use swine_smt::terms::SmtTerm;

use crate::config::Semantics;

/// Bounding lemmas for `t = exp(b, x)`:
///
/// * `x = 0 ⇒ t = 1`
/// * `b = 0 ∧ x > 0 ⇒ t = 0`
/// * `b = 1 ∧ x ≥ 0 ⇒ t = 1`
/// * `b > 1 ∧ x > 1 ∧ b + x > 4 ⇒ t > b·x + 1` if `b` or `x` is a literal,
///   `t > b + x + 1` otherwise
///
/// Under total semantics the guards on the sign of `x` are dropped and the
/// last lemma gets a mirror image for `x < -1`.
pub fn lemmas(term: &SmtTerm, semantics: Semantics) -> Vec<SmtTerm> {
    let Some((b, x)) = term.as_exp() else {
        return Vec::new();
    };
    let (b, x, t) = (b.clone(), x.clone(), term.clone());
    let zero = || SmtTerm::int(0);
    let one = || SmtTerm::int(1);
    let total = semantics == Semantics::Total;

    let mut lemmas = vec![x.clone().eq(zero()).implies(t.clone().eq(one()))];

    let x_nonzero = if total {
        x.clone().eq(zero()).not()
    } else {
        x.clone().gt(zero())
    };
    lemmas.push(
        SmtTerm::and(vec![b.clone().eq(zero()), x_nonzero]).implies(t.clone().eq(zero())),
    );

    if total {
        lemmas.push(b.clone().eq(one()).implies(t.clone().eq(one())));
    } else {
        lemmas.push(
            SmtTerm::and(vec![b.clone().eq(one()), x.clone().ge(zero())])
                .implies(t.clone().eq(one())),
        );
    }

    let linear_product = b.as_int_literal().is_some() || x.as_int_literal().is_some();
    let growth = |exponent: SmtTerm, sign_guard: SmtTerm| {
        let bound = if linear_product {
            b.clone().mul(exponent.clone()).add(one())
        } else {
            SmtTerm::sum(vec![b.clone(), exponent.clone(), one()])
        };
        SmtTerm::and(vec![
            b.clone().gt(one()),
            sign_guard,
            b.clone().add(exponent).gt(SmtTerm::int(4)),
        ])
        .implies(t.clone().gt(bound))
    };
    lemmas.push(growth(x.clone(), x.clone().gt(one())));
    if total {
        lemmas.push(growth(x.negated(), x.clone().lt(SmtTerm::int(-1))));
    }
    lemmas
}
