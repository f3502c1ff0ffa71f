//! Algebraic rewriting of exponentials.
//!
//! Only the double-negation rule is sound under both semantics. The rest
//! rely on `exp(b, x) = b^|x|` for every `x` and are therefore restricted to
//! [`Semantics::Total`]. Rules that would multiply two symbolic terms are
//! skipped so that rewriting never leaves linear arithmetic.

use swine_smt::terms::SmtTerm;

use crate::config::Semantics;

pub fn rewrite(term: &SmtTerm, semantics: Semantics) -> SmtTerm {
    let rewritten = term.map_children(|c| rewrite(c, semantics));
    rewrite_node(rewritten, semantics)
}

fn rewrite_node(term: SmtTerm, semantics: Semantics) -> SmtTerm {
    match term {
        SmtTerm::Neg(inner) => match *inner {
            SmtTerm::Neg(x) => *x,
            other => SmtTerm::Neg(Box::new(other)),
        },
        SmtTerm::Exp(base, exponent) if semantics == Semantics::Total => {
            rewrite_total_exp(*base, exponent.magnitude())
        }
        SmtTerm::Mul(factors) if semantics == Semantics::Total => merge_equal_exponents(factors),
        other => other,
    }
}

/// `exp(exp(b, y), x)` becomes `exp(b, y * x)` when the product is linear.
fn rewrite_total_exp(base: SmtTerm, exponent: SmtTerm) -> SmtTerm {
    match base {
        SmtTerm::Exp(inner_base, inner_exponent)
            if inner_exponent.as_int_literal().is_some() || exponent.as_int_literal().is_some() =>
        {
            SmtTerm::Exp(inner_base, Box::new(SmtTerm::Mul(vec![*inner_exponent, exponent])))
        }
        other => SmtTerm::exp(other, exponent),
    }
}

/// `exp(a, x) * exp(b, x)` becomes `exp(a * b, x)` when `a * b` is linear.
fn merge_equal_exponents(factors: Vec<SmtTerm>) -> SmtTerm {
    let mut merged: Vec<SmtTerm> = Vec::with_capacity(factors.len());
    for factor in factors {
        let partner = match &factor {
            SmtTerm::Exp(base, exponent) => merged.iter().position(|m| match m {
                SmtTerm::Exp(other_base, other_exponent) => {
                    other_exponent == exponent && (other_base.is_ground() || base.is_ground())
                }
                _ => false,
            }),
            _ => None,
        };
        match (partner, factor) {
            (Some(idx), SmtTerm::Exp(base, exponent)) => {
                if let SmtTerm::Exp(other_base, _) = &merged[idx] {
                    let product = SmtTerm::Mul(vec![(**other_base).clone(), *base]);
                    merged[idx] = SmtTerm::Exp(Box::new(product), exponent);
                }
            }
            (_, factor) => merged.push(factor),
        }
    }
    SmtTerm::Mul(merged)
}
