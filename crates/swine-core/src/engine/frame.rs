use indexmap::{IndexMap, IndexSet};
use num::BigInt;
use swine_smt::sorts::SmtSort;
use swine_smt::terms::SmtTerm;

use crate::config::LemmaKind;
use crate::exp_finder::ExpGroup;

/// Everything the engine learned between a `push` and its matching `pop`.
///
/// Frame 0 is the base level and is never popped.
#[derive(Debug, Clone, Default)]
pub(crate) struct Frame {
    pub symbols: IndexMap<String, SmtSort>,
    pub assertions: Vec<SmtTerm>,
    pub preprocessed: Vec<SmtTerm>,
    /// Exponentials registered at this level.
    pub exps: IndexSet<SmtTerm>,
    pub groups: Vec<ExpGroup>,
    pub lemmas: IndexMap<SmtTerm, LemmaKind>,
    /// Bounding lemmas per exponential, offered when its value is wrong.
    pub bounding_lemmas: IndexMap<SmtTerm, Vec<SmtTerm>>,
    /// Assumption literal guarding each lemma when lemma tracking is on.
    pub assumptions: IndexMap<String, (SmtTerm, LemmaKind)>,
    /// `(base, exponent)` points at which interpolation lemmas were built.
    pub anchors: IndexMap<SmtTerm, Vec<(BigInt, i64)>>,
    pub clamped: IndexSet<SmtTerm>,
    pub has_overflow: bool,
}
