//! Tangent and secant lemmas.
//!
//! For a fixed base `β ≥ 1` the function `f(x) = β^|x|` is discretely
//! convex on the integers, and for a fixed exponent `ξ ≥ 0` so is
//! `g(b) = b^ξ` on the non-negative integers. A line through two
//! consecutive points of a convex function lies below it everywhere; a
//! secant between two points lies above it in between. Tangents therefore
//! fix values that are too small and secants fix values that are too large.
//!
//! `anchors` are the `(base, exponent)` points at which lemmas were already
//! generated for the same term. Secants reach to the nearest one so that
//! a single lemma covers a whole interval. With a symbolic base the
//! interval is a box in both dimensions and the secant blends a chord over
//! the base with the slope over the exponent.

use num::{BigInt, One, Signed, Zero};
use swine_smt::terms::SmtTerm;

use super::{base_premise, guarded, EvaluatedExponential};
use crate::config::Semantics;
use crate::numeric::{abs_pow, power_fits, MAX_POWER_BITS};

pub fn lemmas(
    ev: &EvaluatedExponential,
    anchors: &[(BigInt, i64)],
    semantics: Semantics,
) -> Vec<SmtTerm> {
    let Some(expected) = ev.expected.clone().filter(|_| ev.mismatch()) else {
        return Vec::new();
    };
    let xi = ev.exponent_val;
    if ev.base_val < BigInt::one() {
        return vec![point_lemma(ev, expected)];
    }

    let symbolic = ev.base.as_int_literal().is_none();
    if symbolic && xi >= 0 && !ev.too_small() {
        let lemma = match nearest_box_anchor(ev, anchors) {
            Some(anchor) => blended_secant(ev, anchor),
            None => upper_point_lemma(ev, expected),
        };
        return vec![lemma];
    }

    let mut out = vec![exponent_dimension(ev, anchors, semantics, expected)];
    if symbolic && xi != 0 && ev.too_small() {
        out.extend(base_tangent(ev));
    }
    out
}

/// `[b = β ∧] x = ξ ⇒ t = β^|ξ|`
fn point_lemma(ev: &EvaluatedExponential, expected: BigInt) -> SmtTerm {
    let mut premises: Vec<SmtTerm> = base_premise(ev).into_iter().collect();
    premises.push(ev.exponent.clone().eq(SmtTerm::int(ev.exponent_val)));
    guarded(premises, ev.term.clone().eq(SmtTerm::IntLit(expected)))
}

/// `[b = β ∧] x = ξ ⇒ t ≤ β^|ξ|`
fn upper_point_lemma(ev: &EvaluatedExponential, expected: BigInt) -> SmtTerm {
    let mut premises: Vec<SmtTerm> = base_premise(ev).into_iter().collect();
    premises.push(ev.exponent.clone().eq(SmtTerm::int(ev.exponent_val)));
    guarded(premises, ev.term.clone().le(SmtTerm::IntLit(expected)))
}

fn exponent_dimension(
    ev: &EvaluatedExponential,
    anchors: &[(BigInt, i64)],
    semantics: Semantics,
    expected: BigInt,
) -> SmtTerm {
    let beta = &ev.base_val;
    let xi = ev.exponent_val;
    let x = &ev.exponent;
    let f = |k: i64| abs_pow(beta, k);
    let mut premises: Vec<SmtTerm> = base_premise(ev).into_iter().collect();

    if ev.too_small() {
        let Some(next) = xi.checked_add(1) else {
            return point_lemma(ev, expected);
        };
        if semantics == Semantics::Partial {
            premises.push(x.clone().ge(SmtTerm::int(0)));
        }
        return guarded(premises, ev.term.clone().ge(tangent(&f(xi), &f(next), x, xi)));
    }

    let nearest = anchors
        .iter()
        .filter(|(b, e)| b == beta && *e != xi && (semantics == Semantics::Total || *e >= 0))
        .map(|(_, e)| *e)
        .min_by_key(|e| (e.abs_diff(xi), *e));
    match nearest {
        Some(other) => {
            let (lo, hi) = (xi.min(other), xi.max(other));
            premises.push(x.clone().ge(SmtTerm::int(lo)));
            premises.push(x.clone().le(SmtTerm::int(hi)));
            guarded(premises, secant(&ev.term, x, (lo, &f(lo)), (hi, &f(hi))))
        }
        None => upper_point_lemma(ev, expected),
    }
}

/// `x = ξ ∧ b ≥ 0 ⇒ t ≥ tangent of b ↦ b^|ξ| at β`
fn base_tangent(ev: &EvaluatedExponential) -> Option<SmtTerm> {
    let beta = &ev.base_val;
    let xi = ev.exponent_val;
    let b = &ev.base;
    let beta_i = i64::try_from(beta).ok()?;
    let g = |c: &BigInt| abs_pow(c, xi);
    let premises = vec![
        ev.exponent.clone().eq(SmtTerm::int(xi)),
        b.clone().ge(SmtTerm::int(0)),
    ];
    Some(guarded(
        premises,
        ev.term.clone().ge(tangent(&g(beta), &g(&(beta + 1)), b, beta_i)),
    ))
}

/// The closest anchor with base at least 1 and a non-negative exponent
/// whose box with the current point stays computable. Ties prefer the
/// smaller exponent, then the smaller base.
fn nearest_box_anchor<'a>(
    ev: &EvaluatedExponential,
    anchors: &'a [(BigInt, i64)],
) -> Option<(&'a BigInt, i64)> {
    let (beta, xi) = (&ev.base_val, ev.exponent_val);
    anchors
        .iter()
        .filter(|(c, e)| *e >= 0 && !c.is_zero() && !c.is_negative() && (c != beta || *e != xi))
        .filter(|(c, e)| power_fits(c.max(beta), xi.max(*e), MAX_POWER_BITS))
        .min_by_key(|(c, e)| {
            let distance = (c - beta).abs() + BigInt::from(e.abs_diff(xi));
            (distance, *e, (*c).clone())
        })
        .map(|(c, e)| (c, *e))
}

/// Upper bound on the box `[b₁, b₂] × [x₁, x₂]` spanned by the current point
/// and `anchor`, for `b₁ ≥ 1` and `x₁ ≥ 0`.
///
/// `b^x` lies below the chord over the exponent at every fixed base, and
/// the rise of that chord is monotone in the base. So either
///
/// `(x₂-x₁)(b₂-b₁)·t ≤ (x₂-x₁)·C₁(b) + (b₂-b₁)(b₂^x₂ - b₂^x₁)·(x - x₁)`
///
/// with `C₁` the scaled chord of `b ↦ b^x₁`, or the mirrored form starting
/// from the chord at `x₂` and falling with the rise at `b₁`. The first is
/// exact at `(b₁, x₁)`, `(b₂, x₁)` and `(b₂, x₂)`; the second at `(b₁, x₁)`,
/// `(b₁, x₂)` and `(b₂, x₂)`. The form that is exact at the current point is
/// used, so the lemma always excludes the candidate value.
fn blended_secant(ev: &EvaluatedExponential, (c, e): (&BigInt, i64)) -> SmtTerm {
    let (beta, xi) = (&ev.base_val, ev.exponent_val);
    let (b, x) = (&ev.base, &ev.exponent);
    let (b_lo, b_hi) = if beta <= c { (beta, c) } else { (c, beta) };
    let (x_lo, x_hi) = (xi.min(e), xi.max(e));
    let width_b = (b_hi - b_lo).max(BigInt::one());
    let width_x = BigInt::from(x_hi.abs_diff(x_lo)).max(BigInt::one());

    // Chord of `b ↦ b^at` through `b_lo` and `b_hi`, scaled by `width_b`.
    let chord = |at: i64| -> (BigInt, BigInt) {
        let (lo, hi) = (abs_pow(b_lo, at), abs_pow(b_hi, at));
        if b_lo == b_hi {
            (BigInt::zero(), lo)
        } else {
            (&hi - &lo, &lo * b_hi - &hi * b_lo)
        }
    };
    let descending = beta < c && xi > e;
    let ((b_slope, intercept), rise, x_ref) = if descending {
        let rise = abs_pow(b_lo, x_hi) - abs_pow(b_lo, x_lo);
        (chord(x_hi), rise, x_hi)
    } else {
        let rise = abs_pow(b_hi, x_hi) - abs_pow(b_hi, x_lo);
        (chord(x_lo), rise, x_lo)
    };

    let x_slope = &width_b * rise;
    let constant = &width_x * intercept - &x_slope * BigInt::from(x_ref);
    let rhs = affine(vec![(&width_x * b_slope, b), (x_slope, x)], constant);
    let premises = vec![
        b.clone().ge(SmtTerm::IntLit(b_lo.clone())),
        b.clone().le(SmtTerm::IntLit(b_hi.clone())),
        x.clone().ge(SmtTerm::int(x_lo)),
        x.clone().le(SmtTerm::int(x_hi)),
    ];
    guarded(
        premises,
        SmtTerm::IntLit(width_x * width_b).mul(ev.term.clone()).le(rhs),
    )
}

/// The line through `(at, f_at)` and `(at + 1, f_next)`, as a term in `var`.
fn tangent(f_at: &BigInt, f_next: &BigInt, var: &SmtTerm, at: i64) -> SmtTerm {
    let slope = f_next - f_at;
    let intercept = f_at - &slope * BigInt::from(at);
    linear(slope, var, intercept)
}

/// `(hi - lo) · t ≤ (f(hi) - f(lo)) · var + f(lo) · hi - f(hi) · lo`
fn secant(
    t: &SmtTerm,
    var: &SmtTerm,
    (lo, f_lo): (i64, &BigInt),
    (hi, f_hi): (i64, &BigInt),
) -> SmtTerm {
    let width = BigInt::from(hi) - BigInt::from(lo);
    let slope = f_hi - f_lo;
    let intercept = f_lo * BigInt::from(hi) - f_hi * BigInt::from(lo);
    SmtTerm::IntLit(width)
        .mul(t.clone())
        .le(linear(slope, var, intercept))
}

fn linear(slope: BigInt, var: &SmtTerm, intercept: BigInt) -> SmtTerm {
    affine(vec![(slope, var)], intercept)
}

/// `Σ cᵢ·vᵢ + constant`, dropping zero coefficients.
fn affine(terms: Vec<(BigInt, &SmtTerm)>, constant: BigInt) -> SmtTerm {
    let mut summands: Vec<SmtTerm> = terms
        .into_iter()
        .filter(|(c, _)| !c.is_zero())
        .map(|(c, v)| SmtTerm::IntLit(c).mul(v.clone()))
        .collect();
    summands.push(SmtTerm::IntLit(constant));
    if summands.len() == 1 {
        summands.remove(0)
    } else {
        SmtTerm::sum(summands)
    }
}
