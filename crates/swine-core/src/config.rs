//! Engine configuration.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

/// Meaning of `exp(b, x)` for negative `x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Semantics {
    /// Unconstrained: the solver may pick any value.
    #[default]
    Partial,
    /// `exp(b, x) = b^|x|`.
    Total,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverKind {
    #[default]
    Z3,
    Cvc5,
}

/// Lemma families, in the order the refinement loop tries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LemmaKind {
    Symmetry,
    Bounding,
    Monotonicity,
    Modulo,
    Interpolation,
}

impl LemmaKind {
    /// All kinds in refinement priority order.
    pub const ALL: [LemmaKind; 5] = [
        LemmaKind::Symmetry,
        LemmaKind::Bounding,
        LemmaKind::Monotonicity,
        LemmaKind::Modulo,
        LemmaKind::Interpolation,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LemmaKind::Symmetry => "symmetry",
            LemmaKind::Bounding => "bounding",
            LemmaKind::Monotonicity => "monotonicity",
            LemmaKind::Modulo => "modulo",
            LemmaKind::Interpolation => "interpolation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PreprocessingKind {
    ConstantFolding,
    Rewriting,
}

impl PreprocessingKind {
    pub const ALL: [PreprocessingKind; 2] =
        [PreprocessingKind::ConstantFolding, PreprocessingKind::Rewriting];

    pub fn as_str(self) -> &'static str {
        match self {
            PreprocessingKind::ConstantFolding => "constant-folding",
            PreprocessingKind::Rewriting => "rewriting",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {what} `{value}`")]
pub struct ParseKindError {
    what: &'static str,
    value: String,
}

macro_rules! lowercase_names {
    ($ty:ty, $what:literal, { $($name:literal => $variant:expr),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = ParseKindError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_ascii_lowercase().as_str() {
                    $($name => Ok($variant),)+
                    _ => Err(ParseKindError { what: $what, value: s.to_string() }),
                }
            }
        }
    };
}

lowercase_names!(Semantics, "semantics", {
    "partial" => Semantics::Partial,
    "total" => Semantics::Total,
});

lowercase_names!(SolverKind, "solver", {
    "z3" => SolverKind::Z3,
    "cvc5" => SolverKind::Cvc5,
});

lowercase_names!(LemmaKind, "lemma kind", {
    "symmetry" => LemmaKind::Symmetry,
    "bounding" => LemmaKind::Bounding,
    "monotonicity" => LemmaKind::Monotonicity,
    "modulo" => LemmaKind::Modulo,
    "interpolation" => LemmaKind::Interpolation,
});

lowercase_names!(PreprocessingKind, "preprocessing kind", {
    "constant-folding" => PreprocessingKind::ConstantFolding,
    "rewriting" => PreprocessingKind::Rewriting,
});

impl fmt::Display for Semantics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Semantics::Partial => write!(f, "partial"),
            Semantics::Total => write!(f, "total"),
        }
    }
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverKind::Z3 => write!(f, "z3"),
            SolverKind::Cvc5 => write!(f, "cvc5"),
        }
    }
}

impl fmt::Display for LemmaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for PreprocessingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default bound for unrolling literal exponents into multiplication.
pub const DEFAULT_REWRITE_THRESHOLD: u32 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub solver_kind: SolverKind,
    pub semantics: Semantics,
    /// Re-evaluate every assertion under exact semantics after SAT.
    pub validate_sat: bool,
    /// After UNSAT, search for a model with exponents up to this total.
    pub validate_unsat: Option<u64>,
    /// Trace lemmas and preprocessing steps at `info` rather than `debug`.
    pub log: bool,
    pub statistics: bool,
    /// Guard lemmas with assumption literals so UNSAT cores name them.
    pub get_lemmas: bool,
    pub active_lemma_kinds: BTreeSet<LemmaKind>,
    pub active_preprocessings: BTreeSet<PreprocessingKind>,
    pub rewrite_threshold: u32,
    /// Assert all symmetry lemmas of a group as soon as it is registered.
    pub eager_symmetry: bool,
    pub max_iterations: Option<u64>,
    pub timeout_secs: u64,
    pub dump_smt2: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            solver_kind: SolverKind::default(),
            semantics: Semantics::default(),
            validate_sat: false,
            validate_unsat: None,
            log: false,
            statistics: false,
            get_lemmas: false,
            active_lemma_kinds: LemmaKind::ALL.into_iter().collect(),
            active_preprocessings: PreprocessingKind::ALL.into_iter().collect(),
            rewrite_threshold: DEFAULT_REWRITE_THRESHOLD,
            eager_symmetry: false,
            max_iterations: None,
            timeout_secs: 0,
            dump_smt2: None,
        }
    }
}

impl Config {
    pub fn is_active(&self, kind: LemmaKind) -> bool {
        self.active_lemma_kinds.contains(&kind)
    }

    pub fn is_preprocessing_active(&self, kind: PreprocessingKind) -> bool {
        self.active_preprocessings.contains(&kind)
    }

    pub fn with_semantics(mut self, semantics: Semantics) -> Self {
        self.semantics = semantics;
        self
    }

    pub fn without_lemma(mut self, kind: LemmaKind) -> Self {
        self.active_lemma_kinds.remove(&kind);
        self
    }

    pub fn without_preprocessing(mut self, kind: PreprocessingKind) -> Self {
        self.active_preprocessings.remove(&kind);
        self
    }
}
