//! Proptest strategies for formulas over `exp`.

use proptest::prelude::*;
use swine_smt::terms::SmtTerm;

/// Integer terms over `x`, `y`, `z` with small literals, linear arithmetic
/// and nested exponentials.
pub fn arb_int_term() -> impl Strategy<Value = SmtTerm> {
    let leaf = prop_oneof![
        (-4i64..=6).prop_map(|n| SmtTerm::int(n)),
        prop::sample::select(vec!["x", "y", "z"]).prop_map(|n| SmtTerm::var(n)),
    ];
    leaf.prop_recursive(3, 24, 3, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a.add(b)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a.sub(b)),
            (-3i64..=3, inner.clone()).prop_map(|(k, a)| SmtTerm::int(k).mul(a)),
            inner.clone().prop_map(|a| a.neg()),
            (inner.clone(), inner).prop_map(|(b, e)| SmtTerm::exp(b, e)),
        ]
    })
}

/// Boolean combinations of comparisons between [`arb_int_term`]s.
pub fn arb_formula() -> impl Strategy<Value = SmtTerm> {
    let atom = (arb_int_term(), arb_int_term(), 0..5u8).prop_map(|(a, b, op)| match op {
        0 => a.eq(b),
        1 => a.lt(b),
        2 => a.le(b),
        3 => a.gt(b),
        _ => a.ge(b),
    });
    atom.prop_recursive(2, 12, 3, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 1..3).prop_map(SmtTerm::and),
            prop::collection::vec(inner.clone(), 1..3).prop_map(SmtTerm::or),
            inner.clone().prop_map(|a| a.not()),
            (inner.clone(), inner).prop_map(|(a, b)| a.implies(b)),
        ]
    })
}

/// Small concrete `(base, exponent)` pairs for lemma soundness checks.
pub fn arb_base_exponent() -> impl Strategy<Value = (i64, i64)> {
    (-6i64..=6, -8i64..=8)
}
