//! Discovery of exponential subterms and their symmetry groups.

use indexmap::IndexSet;
use num::Signed;
use swine_smt::terms::SmtTerm;

use crate::preprocess::Preprocessor;

/// Which signs of a member are negated relative to another member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Mirror {
    pub base: bool,
    pub exponent: bool,
}

impl Mirror {
    fn relative_to(self, other: Mirror) -> Mirror {
        Mirror {
            base: self.base != other.base,
            exponent: self.exponent != other.exponent,
        }
    }
}

/// Exponentials that agree up to the signs of base and exponent.
///
/// The members are preprocessed and deduplicated; the first member is the
/// term that caused the group to be created and every mirror is relative
/// to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpGroup {
    pub members: Vec<(SmtTerm, Mirror)>,
}

impl ExpGroup {
    pub fn contains(&self, term: &SmtTerm) -> bool {
        self.members.iter().any(|(m, _)| m == term)
    }

    pub fn terms(&self) -> impl Iterator<Item = &SmtTerm> {
        self.members.iter().map(|(m, _)| m)
    }

    /// The other members, each with the sign flips that turn `term` into it.
    pub fn mirrors(&self, term: &SmtTerm) -> Vec<(&SmtTerm, Mirror)> {
        let Some(own) = self.members.iter().find(|(m, _)| m == term).map(|(_, f)| *f) else {
            return Vec::new();
        };
        self.members
            .iter()
            .filter(|(m, _)| m != term)
            .map(|(m, flip)| (m, flip.relative_to(own)))
            .collect()
    }

    /// Every unordered pair of members with the flips relating them.
    pub fn pairs(&self) -> impl Iterator<Item = (&SmtTerm, &SmtTerm, Mirror)> {
        self.members.iter().enumerate().flat_map(move |(i, (a, fa))| {
            self.members[i + 1..]
                .iter()
                .map(move |(b, fb)| (a, b, fb.relative_to(*fa)))
        })
    }
}

/// Every `exp` node of `term`, innermost first, without duplicates.
pub fn find_exps(term: &SmtTerm) -> IndexSet<SmtTerm> {
    fn walk(term: &SmtTerm, out: &mut IndexSet<SmtTerm>) {
        for child in term.children() {
            walk(child, out);
        }
        if term.is_exp() {
            out.insert(term.clone());
        }
    }

    let mut out = IndexSet::new();
    walk(term, &mut out);
    out
}

/// Builds the group of `exp(b, x)`: `exp(b, -x)`, and unless `b` is a
/// non-negative literal also `exp(-b, x)` and `exp(-b, -x)`.
pub fn build_group(term: &SmtTerm, preprocessor: &Preprocessor) -> Option<ExpGroup> {
    let (base, exponent) = term.as_exp()?;
    let flip = |base, exponent| Mirror { base, exponent };
    let mut candidates = vec![(SmtTerm::exp(base.clone(), exponent.negated()), flip(false, true))];
    let nonnegative_base = base.as_int_literal().is_some_and(|b| !b.is_negative());
    if !nonnegative_base {
        candidates.push((SmtTerm::exp(base.negated(), exponent.clone()), flip(true, false)));
        candidates.push((SmtTerm::exp(base.negated(), exponent.negated()), flip(true, true)));
    }

    let mut members = vec![(term.clone(), Mirror::default())];
    for (candidate, mirror) in candidates {
        let simplified = preprocessor.preprocess(&candidate);
        if simplified.is_exp() && !members.iter().any(|(m, _)| *m == simplified) {
            members.push((simplified, mirror));
        }
    }
    Some(ExpGroup { members })
}
