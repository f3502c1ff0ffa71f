//! Replace exponentials with small literal exponents by plain arithmetic.

use num::{BigInt, One, Signed, ToPrimitive, Zero};
use swine_smt::terms::SmtTerm;

use crate::config::Semantics;

pub fn lower(term: &SmtTerm, semantics: Semantics, threshold: u32) -> SmtTerm {
    let lowered = term.map_children(|c| lower(c, semantics, threshold));
    match lowered {
        SmtTerm::Exp(base, exponent) => {
            let lowered = exponent
                .as_int_literal()
                .and_then(|k| lower_literal_exponent(&base, k, semantics, threshold));
            lowered.unwrap_or(SmtTerm::Exp(base, exponent))
        }
        other => other,
    }
}

fn lower_literal_exponent(
    base: &SmtTerm,
    k: &BigInt,
    semantics: Semantics,
    threshold: u32,
) -> Option<SmtTerm> {
    if k.is_negative() && semantics == Semantics::Partial {
        return None;
    }
    let magnitude = k.abs();
    if magnitude.is_zero() {
        return Some(SmtTerm::int(1));
    }
    if magnitude.is_one() {
        return Some(base.clone());
    }
    let n = magnitude.to_u32().filter(|n| *n <= threshold)?;
    let factors = (0..n).map(|_| base.clone()).collect();
    Some(SmtTerm::Mul(factors))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exp(b: SmtTerm, k: i64) -> SmtTerm {
        SmtTerm::exp(b, SmtTerm::int(k))
    }

    fn y() -> SmtTerm {
        SmtTerm::var("y")
    }

    #[test]
    fn trivial_exponents_disappear() {
        assert_eq!(lower(&exp(y(), 0), Semantics::Partial, 10), SmtTerm::int(1));
        assert_eq!(lower(&exp(y(), 1), Semantics::Partial, 10), y());
        assert_eq!(lower(&exp(y(), -1), Semantics::Total, 10), y());
        assert_eq!(lower(&exp(y(), -1), Semantics::Partial, 10), exp(y(), -1));
    }

    #[test]
    fn small_exponents_unroll_up_to_threshold() {
        assert_eq!(
            lower(&exp(y(), 3), Semantics::Partial, 10),
            SmtTerm::product(vec![y(), y(), y()])
        );
        assert_eq!(
            lower(&exp(y(), -2), Semantics::Total, 10),
            SmtTerm::product(vec![y(), y()])
        );
        assert_eq!(lower(&exp(y(), 11), Semantics::Partial, 10), exp(y(), 11));
        assert_eq!(lower(&exp(y(), 2), Semantics::Partial, 0), exp(y(), 2));
    }

    #[test]
    fn symbolic_exponents_stay_abstract() {
        let t = SmtTerm::exp(y(), SmtTerm::var("x"));
        assert_eq!(lower(&t, Semantics::Total, 10), t);
    }
}
