//! Integer helpers shared by the evaluator and the lemma generators.

use num::{BigInt, BigUint, Integer, One, Signed, ToPrimitive, Zero};
use swine_smt::terms::SmtTerm;

use crate::error::ExponentOverflow;

/// Largest power, in bits, the engine computes.
pub const MAX_POWER_BITS: u64 = 1 << 20;

/// Exponent magnitude enforced on a clamped exponential with a non-trivial
/// base. Together with a base inside `i64` this keeps the power below
/// [`MAX_POWER_BITS`].
pub const CLAMPED_EXPONENT: i64 = (MAX_POWER_BITS / 64) as i64;

/// Convert a model value of `exponent` into a native exponent.
pub fn to_exponent(exponent: &SmtTerm, value: &BigInt) -> Result<i64, ExponentOverflow> {
    value.to_i64().ok_or_else(|| ExponentOverflow {
        term: exponent.clone(),
        value: value.clone(),
    })
}

/// Bases -1, 0 and 1 have bounded powers for every exponent.
pub fn is_trivial_base(base: &BigInt) -> bool {
    base.magnitude() <= &BigUint::one()
}

/// Whether `base^|exponent|` has at most `limit` bits.
pub fn power_fits(base: &BigInt, exponent: i64, limit: u64) -> bool {
    is_trivial_base(base)
        || exponent.unsigned_abs() <= 1
        || base.bits().saturating_mul(exponent.unsigned_abs()) <= limit
}

/// Rejects powers too large to compute. The offending term is the base if
/// it does not fit into `i64`, the exponent otherwise.
pub fn check_power(
    base_term: &SmtTerm,
    exponent_term: &SmtTerm,
    base: &BigInt,
    exponent: i64,
) -> Result<(), ExponentOverflow> {
    if power_fits(base, exponent, MAX_POWER_BITS) {
        return Ok(());
    }
    let (term, value) = if base.to_i64().is_none() {
        (base_term, base.clone())
    } else {
        (exponent_term, BigInt::from(exponent))
    };
    Err(ExponentOverflow {
        term: term.clone(),
        value,
    })
}

/// `base^|exponent|`. Callers check [`power_fits`] for non-trivial bases.
pub fn abs_pow(base: &BigInt, exponent: i64) -> BigInt {
    let e = exponent.unsigned_abs();
    if e == 0 {
        return BigInt::one();
    }
    if base.is_zero() || base.is_one() {
        return base.clone();
    }
    if *base == -BigInt::one() {
        return if e % 2 == 0 { BigInt::one() } else { base.clone() };
    }
    base.pow(u32::try_from(e).unwrap_or(u32::MAX))
}

/// Range-checked `base^|exponent|` for model values.
pub fn checked_pow(
    base_term: &SmtTerm,
    exponent_term: &SmtTerm,
    base: &BigInt,
    exponent: &BigInt,
) -> Result<BigInt, ExponentOverflow> {
    let e = to_exponent(exponent_term, exponent)?;
    check_power(base_term, exponent_term, base, e)?;
    Ok(abs_pow(base, e))
}

/// SMT-LIB `div`: `a = b * (a div b) + (a mod b)` with `0 <= a mod b < |b|`.
pub fn smt_div(a: &BigInt, b: &BigInt) -> Option<BigInt> {
    let r = smt_mod(a, b)?;
    Some((a - r) / b)
}

/// SMT-LIB `mod`, always non-negative.
pub fn smt_mod(a: &BigInt, b: &BigInt) -> Option<BigInt> {
    if b.is_zero() {
        None
    } else {
        Some(a.mod_floor(&b.abs()))
    }
}

/// Bounds asserted for an exponential whose values left the supported
/// range: the exponent stays inside `i64`, and for bases other than -1, 0
/// and 1 the base stays inside `i64` and the exponent inside
/// [`CLAMPED_EXPONENT`].
pub fn clamp_constraints(base: &SmtTerm, exponent: &SmtTerm) -> Vec<SmtTerm> {
    let nontrivial = SmtTerm::or(vec![
        base.clone().gt(SmtTerm::int(1)),
        base.clone().lt(SmtTerm::int(-1)),
    ]);
    vec![
        exponent.clone().ge(SmtTerm::int(-i64::MAX)),
        exponent.clone().le(SmtTerm::int(i64::MAX)),
        nontrivial.implies(SmtTerm::and(vec![
            base.clone().ge(SmtTerm::int(-i64::MAX)),
            base.clone().le(SmtTerm::int(i64::MAX)),
            exponent.clone().ge(SmtTerm::int(-CLAMPED_EXPONENT)),
            exponent.clone().le(SmtTerm::int(CLAMPED_EXPONENT)),
        ])),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn big(n: i64) -> BigInt {
        BigInt::from(n)
    }

    #[test]
    fn exponents_overflow_only_outside_i64() {
        let x = SmtTerm::var("x");
        assert_eq!(to_exponent(&x, &big(i64::MAX)), Ok(i64::MAX));
        assert_eq!(to_exponent(&x, &big(-20_000)), Ok(-20_000));
        let beyond = BigInt::from(i64::MAX) + 1;
        let err = to_exponent(&x, &beyond).unwrap_err();
        assert_eq!(err.term, x);
        assert_eq!(err.value, beyond);
    }

    #[test]
    fn trivial_bases_never_overflow() {
        let (b, x) = (SmtTerm::var("b"), SmtTerm::var("x"));
        for base in [-1, 0, 1] {
            assert!(check_power(&b, &x, &big(base), i64::MAX).is_ok());
            assert!(check_power(&b, &x, &big(base), i64::MIN).is_ok());
        }
        assert_eq!(checked_pow(&b, &x, &big(1), &big(i64::MAX)), Ok(big(1)));
        assert_eq!(checked_pow(&b, &x, &big(-1), &big(i64::MAX)), Ok(big(-1)));
        assert_eq!(checked_pow(&b, &x, &big(-1), &big(1 << 40)), Ok(big(1)));
        assert_eq!(checked_pow(&b, &x, &big(0), &big(1 << 40)), Ok(big(0)));
    }

    #[test]
    fn large_powers_are_guarded() {
        let (b, x) = (SmtTerm::var("b"), SmtTerm::var("x"));
        assert!(checked_pow(&b, &x, &big(2), &big(20_000)).is_ok());
        let err = check_power(&b, &x, &big(2), 1 << 21).unwrap_err();
        assert_eq!(err.term, x);
        assert_eq!(err.value, big(1 << 21));

        let huge = BigInt::from(1u8) << 80;
        assert!(check_power(&b, &x, &huge, 1).is_ok());
        assert!(check_power(&b, &x, &huge, 0).is_ok());
        assert!(check_power(&b, &x, &huge, 2).is_ok());
        let err = check_power(&b, &x, &huge, 1 << 15).unwrap_err();
        assert_eq!(err.term, b);
    }

    #[test]
    fn clamped_powers_are_computable() {
        let base = big(i64::MAX);
        assert!(power_fits(&base, CLAMPED_EXPONENT, MAX_POWER_BITS));
        assert!(power_fits(&-base, -CLAMPED_EXPONENT, MAX_POWER_BITS));
    }

    #[test]
    fn powers_use_absolute_exponent() {
        assert_eq!(abs_pow(&big(2), 10), big(1024));
        assert_eq!(abs_pow(&big(-3), -3), big(-27));
        assert_eq!(abs_pow(&big(0), 0), big(1));
        assert_eq!(abs_pow(&big(-1), i64::MIN), big(1));
        assert_eq!(abs_pow(&big(-1), i64::MAX), big(-1));
    }

    #[test]
    fn div_mod_follow_smtlib() {
        assert_eq!(smt_mod(&big(-7), &big(3)), Some(big(2)));
        assert_eq!(smt_div(&big(-7), &big(3)), Some(big(-3)));
        assert_eq!(smt_mod(&big(-7), &big(-3)), Some(big(2)));
        assert_eq!(smt_div(&big(-7), &big(-3)), Some(big(3)));
        assert_eq!(smt_mod(&big(7), &big(0)), None);
    }
}
