//! Bottom-up evaluation of ground subterms and unit/zero simplification.

use indexmap::IndexSet;
use num::{BigInt, One, Signed, Zero};
use swine_smt::terms::SmtTerm;

use crate::config::Semantics;
use crate::numeric::{abs_pow, power_fits, smt_div, smt_mod};

/// Ground powers whose result would exceed this many bits stay abstract.
const FOLD_BIT_LIMIT: u64 = 1 << 16;

pub fn fold(term: &SmtTerm, semantics: Semantics) -> SmtTerm {
    let folded = term.map_children(|c| fold(c, semantics));
    fold_node(folded, semantics)
}

fn fold_node(term: SmtTerm, semantics: Semantics) -> SmtTerm {
    match term {
        SmtTerm::Neg(inner) => match *inner {
            SmtTerm::IntLit(n) => SmtTerm::IntLit(-n),
            other => SmtTerm::Neg(Box::new(other)),
        },
        SmtTerm::Add(terms) => fold_add(terms),
        SmtTerm::Mul(terms) => fold_mul(terms),
        SmtTerm::Sub(l, r) => {
            let (a, b) = literals(&l, &r);
            match (a, b) {
                (Some(a), Some(b)) => SmtTerm::IntLit(a - b),
                (_, Some(b)) if b.is_zero() => *l,
                (Some(a), _) if a.is_zero() => fold_node(SmtTerm::Neg(r), semantics),
                _ if l == r => SmtTerm::int(0),
                _ => SmtTerm::Sub(l, r),
            }
        }
        SmtTerm::Div(l, r) => {
            let (a, b) = literals(&l, &r);
            match (a, b) {
                (Some(a), Some(b)) => match smt_div(&a, &b) {
                    Some(q) => SmtTerm::IntLit(q),
                    None => SmtTerm::Div(l, r),
                },
                (_, Some(b)) if b.is_one() => *l,
                _ => SmtTerm::Div(l, r),
            }
        }
        SmtTerm::Mod(l, r) => {
            let (a, b) = literals(&l, &r);
            match (a, b) {
                (Some(a), Some(b)) => match smt_mod(&a, &b) {
                    Some(m) => SmtTerm::IntLit(m),
                    None => SmtTerm::Mod(l, r),
                },
                (_, Some(b)) if b.abs().is_one() => SmtTerm::int(0),
                _ => SmtTerm::Mod(l, r),
            }
        }
        SmtTerm::Abs(inner) => match *inner {
            SmtTerm::IntLit(n) => SmtTerm::IntLit(n.abs()),
            other => SmtTerm::Abs(Box::new(other)),
        },
        SmtTerm::Exp(b, e) => match fold_exp(&b, &e, semantics) {
            Some(value) => SmtTerm::IntLit(value),
            None => SmtTerm::Exp(b, e),
        },
        SmtTerm::Eq(l, r) => {
            if l == r {
                return SmtTerm::bool(true);
            }
            if let (Some(a), Some(b)) = literals(&l, &r) {
                return SmtTerm::bool(a == b);
            }
            match (l.as_bool_literal(), r.as_bool_literal()) {
                (Some(a), Some(b)) => SmtTerm::bool(a == b),
                (Some(true), None) => *r,
                (None, Some(true)) => *l,
                (Some(false), None) => fold_node(SmtTerm::Not(r), semantics),
                (None, Some(false)) => fold_node(SmtTerm::Not(l), semantics),
                (None, None) => SmtTerm::Eq(l, r),
            }
        }
        SmtTerm::Lt(l, r) => compare(l, r, false, |a, b| a < b, SmtTerm::Lt),
        SmtTerm::Le(l, r) => compare(l, r, true, |a, b| a <= b, SmtTerm::Le),
        SmtTerm::Gt(l, r) => compare(l, r, false, |a, b| a > b, SmtTerm::Gt),
        SmtTerm::Ge(l, r) => compare(l, r, true, |a, b| a >= b, SmtTerm::Ge),
        SmtTerm::Not(inner) => match *inner {
            SmtTerm::BoolLit(b) => SmtTerm::bool(!b),
            SmtTerm::Not(x) => *x,
            other => SmtTerm::Not(Box::new(other)),
        },
        SmtTerm::And(terms) => fold_junction(terms, true),
        SmtTerm::Or(terms) => fold_junction(terms, false),
        SmtTerm::Implies(l, r) => match (l.as_bool_literal(), r.as_bool_literal()) {
            (Some(true), _) => *r,
            (Some(false), _) | (_, Some(true)) => SmtTerm::bool(true),
            (_, Some(false)) => fold_node(SmtTerm::Not(l), semantics),
            _ if l == r => SmtTerm::bool(true),
            _ => SmtTerm::Implies(l, r),
        },
        SmtTerm::Ite(c, t, e) => match c.as_bool_literal() {
            Some(true) => *t,
            Some(false) => *e,
            None if t == e => *t,
            None => SmtTerm::Ite(c, t, e),
        },
        leaf @ (SmtTerm::Var(_) | SmtTerm::IntLit(_) | SmtTerm::BoolLit(_)) => leaf,
    }
}

fn literals(l: &SmtTerm, r: &SmtTerm) -> (Option<BigInt>, Option<BigInt>) {
    (l.as_int_literal().cloned(), r.as_int_literal().cloned())
}

fn compare(
    l: Box<SmtTerm>,
    r: Box<SmtTerm>,
    reflexive: bool,
    holds: impl Fn(&BigInt, &BigInt) -> bool,
    rebuild: fn(Box<SmtTerm>, Box<SmtTerm>) -> SmtTerm,
) -> SmtTerm {
    if l == r {
        return SmtTerm::bool(reflexive);
    }
    match literals(&l, &r) {
        (Some(a), Some(b)) => SmtTerm::bool(holds(&a, &b)),
        _ => rebuild(l, r),
    }
}

/// Value of a ground power, if it is defined and small enough to fold.
fn fold_exp(base: &SmtTerm, exponent: &SmtTerm, semantics: Semantics) -> Option<BigInt> {
    let b = base.as_int_literal()?;
    let e = exponent.as_int_literal()?;
    if e.is_negative() && semantics == Semantics::Partial {
        return None;
    }
    let e = i64::try_from(e).ok()?;
    power_fits(b, e, FOLD_BIT_LIMIT).then(|| abs_pow(b, e))
}

fn fold_add(terms: Vec<SmtTerm>) -> SmtTerm {
    fn collect(term: SmtTerm, constant: &mut BigInt, rest: &mut Vec<SmtTerm>) {
        match term {
            SmtTerm::IntLit(n) => *constant += n,
            SmtTerm::Add(inner) => {
                for t in inner {
                    collect(t, constant, rest);
                }
            }
            other => rest.push(other),
        }
    }

    let mut constant = BigInt::zero();
    let mut rest = Vec::new();
    for t in terms {
        collect(t, &mut constant, &mut rest);
    }
    if !constant.is_zero() {
        rest.push(SmtTerm::IntLit(constant));
    }
    match rest.len() {
        0 => SmtTerm::int(0),
        1 => rest.remove(0),
        _ => SmtTerm::Add(rest),
    }
}

fn fold_mul(terms: Vec<SmtTerm>) -> SmtTerm {
    fn collect(term: SmtTerm, constant: &mut BigInt, rest: &mut Vec<SmtTerm>) {
        match term {
            SmtTerm::IntLit(n) => *constant *= n,
            SmtTerm::Mul(inner) => {
                for t in inner {
                    collect(t, constant, rest);
                }
            }
            other => rest.push(other),
        }
    }

    let mut constant = BigInt::one();
    let mut rest = Vec::new();
    for t in terms {
        collect(t, &mut constant, &mut rest);
    }
    if constant.is_zero() {
        return SmtTerm::int(0);
    }
    if !constant.is_one() {
        rest.insert(0, SmtTerm::IntLit(constant));
    }
    match rest.len() {
        0 => SmtTerm::int(1),
        1 => rest.remove(0),
        _ => SmtTerm::Mul(rest),
    }
}

/// Shared folding for `and` (`conjunction = true`) and `or`.
fn fold_junction(terms: Vec<SmtTerm>, conjunction: bool) -> SmtTerm {
    fn collect(term: SmtTerm, conjunction: bool, out: &mut IndexSet<SmtTerm>) -> bool {
        match term {
            SmtTerm::BoolLit(b) if b == conjunction => true,
            SmtTerm::BoolLit(_) => false,
            SmtTerm::And(inner) if conjunction => inner.into_iter().all(|t| collect(t, conjunction, out)),
            SmtTerm::Or(inner) if !conjunction => inner.into_iter().all(|t| collect(t, conjunction, out)),
            other => {
                out.insert(other);
                true
            }
        }
    }

    let mut kept = IndexSet::new();
    for t in terms {
        if !collect(t, conjunction, &mut kept) {
            // An absorbing literal decides the whole junction.
            return SmtTerm::bool(!conjunction);
        }
    }
    let mut kept: Vec<SmtTerm> = kept.into_iter().collect();
    match kept.len() {
        0 => SmtTerm::bool(conjunction),
        1 => kept.remove(0),
        _ if conjunction => SmtTerm::And(kept),
        _ => SmtTerm::Or(kept),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> SmtTerm {
        SmtTerm::var("x")
    }

    fn fold_partial(t: &SmtTerm) -> SmtTerm {
        fold(t, Semantics::Partial)
    }

    #[test]
    fn folds_ground_powers() {
        let t = SmtTerm::exp(SmtTerm::int(2), SmtTerm::int(3)).eq(SmtTerm::var("y"));
        assert_eq!(fold_partial(&t), SmtTerm::int(8).eq(SmtTerm::var("y")));
        let neg = SmtTerm::exp(SmtTerm::int(-2), SmtTerm::int(3));
        assert_eq!(fold_partial(&neg), SmtTerm::int(-8));
    }

    #[test]
    fn negative_ground_exponents_depend_on_semantics() {
        let t = SmtTerm::exp(SmtTerm::int(2), SmtTerm::int(-3));
        assert_eq!(fold(&t, Semantics::Partial), t);
        assert_eq!(fold(&t, Semantics::Total), SmtTerm::int(8));
    }

    #[test]
    fn huge_ground_powers_stay_abstract() {
        let t = SmtTerm::exp(SmtTerm::int(3), SmtTerm::int(1 << 17));
        assert_eq!(fold_partial(&t), t);
    }

    #[test]
    fn trivial_bases_fold_for_any_exponent() {
        let huge = SmtTerm::int(i64::MAX);
        assert_eq!(fold_partial(&SmtTerm::exp(SmtTerm::int(1), huge.clone())), SmtTerm::int(1));
        assert_eq!(fold_partial(&SmtTerm::exp(SmtTerm::int(-1), huge)), SmtTerm::int(-1));
        let even = SmtTerm::int(1_i64 << 40);
        assert_eq!(fold_partial(&SmtTerm::exp(SmtTerm::int(0), even)), SmtTerm::int(0));
    }

    #[test]
    fn arithmetic_is_flattened_and_normalised() {
        let t = SmtTerm::sum(vec![
            SmtTerm::int(1),
            SmtTerm::sum(vec![x(), SmtTerm::int(2)]),
            SmtTerm::int(-3),
        ]);
        assert_eq!(fold_partial(&t), x());

        let m = SmtTerm::product(vec![SmtTerm::int(2), x(), SmtTerm::int(3)]);
        assert_eq!(
            fold_partial(&m),
            SmtTerm::product(vec![SmtTerm::int(6), x()])
        );
        let zero = SmtTerm::product(vec![x(), SmtTerm::int(0)]);
        assert_eq!(fold_partial(&zero), SmtTerm::int(0));
        assert_eq!(fold_partial(&SmtTerm::int(0).sub(x())), x().neg());
    }

    #[test]
    fn div_mod_fold_like_smtlib() {
        let d = SmtTerm::int(-7).div(SmtTerm::int(2));
        assert_eq!(fold_partial(&d), SmtTerm::int(-4));
        let m = SmtTerm::int(-7).modulo(SmtTerm::int(2));
        assert_eq!(fold_partial(&m), SmtTerm::int(1));
        let by_zero = SmtTerm::int(1).div(SmtTerm::int(0));
        assert_eq!(fold_partial(&by_zero), by_zero);
        assert_eq!(fold_partial(&x().modulo(SmtTerm::int(-1))), SmtTerm::int(0));
    }

    #[test]
    fn boolean_structure_collapses() {
        let t = SmtTerm::and(vec![
            SmtTerm::bool(true),
            x().ge(SmtTerm::int(0)),
            SmtTerm::and(vec![x().ge(SmtTerm::int(0)), SmtTerm::int(1).lt(SmtTerm::int(2))]),
        ]);
        assert_eq!(fold_partial(&t), x().ge(SmtTerm::int(0)));

        let dead = SmtTerm::or(vec![x().gt(SmtTerm::int(0)), SmtTerm::int(2).le(SmtTerm::int(3))]);
        assert_eq!(fold_partial(&dead), SmtTerm::bool(true));

        let imp = x().gt(SmtTerm::int(0)).implies(SmtTerm::int(1).gt(SmtTerm::int(2)));
        assert_eq!(fold_partial(&imp), x().gt(SmtTerm::int(0)).not());
    }

    #[test]
    fn syntactic_equalities_fold() {
        assert_eq!(fold_partial(&x().eq(x())), SmtTerm::bool(true));
        assert_eq!(fold_partial(&x().lt(x())), SmtTerm::bool(false));
        assert_eq!(fold_partial(&x().sub(x())), SmtTerm::int(0));
        let ite = SmtTerm::ite(SmtTerm::var("c"), x(), x());
        assert_eq!(fold_partial(&ite), x());
    }
}
