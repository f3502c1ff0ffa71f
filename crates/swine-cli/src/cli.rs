//! Command-line arguments and their translation into an engine [`Config`].

use std::path::PathBuf;

use clap::Parser;
use swine_core::config::{Config, LemmaKind, PreprocessingKind, DEFAULT_REWRITE_THRESHOLD};
use swine_core::{Semantics, SolverKind};

#[derive(Debug, Parser)]
#[command(name = "swine")]
#[command(about = "SMT solver for integer arithmetic with exponentiation")]
#[command(version)]
pub(crate) struct Cli {
    /// SMT-LIB v2 script to run
    pub(crate) input: PathBuf,

    /// Backend solver: z3 | cvc5
    #[arg(long, default_value = "z3")]
    pub(crate) solver: SolverKind,

    /// Meaning of exp for negative exponents: partial | total
    #[arg(long, default_value = "partial")]
    pub(crate) semantics: Semantics,

    /// Re-check every assertion against the final model
    #[arg(long)]
    pub(crate) validate_sat: bool,

    /// After unsat, search for a model with exponents summing to at most N
    #[arg(long, value_name = "N")]
    pub(crate) validate_unsat: Option<u64>,

    /// Report the lemmas in the unsat core, grouped by kind
    #[arg(long)]
    pub(crate) get_lemmas: bool,

    /// Trace lemmas and preprocessing steps
    #[arg(long)]
    pub(crate) log: bool,

    /// Print statistics after each check-sat
    #[arg(long)]
    pub(crate) stats: bool,

    /// Print statistics as JSON (implies --stats)
    #[arg(long)]
    pub(crate) stats_json: bool,

    #[arg(long)]
    pub(crate) no_symmetry: bool,

    #[arg(long)]
    pub(crate) no_bounding: bool,

    #[arg(long)]
    pub(crate) no_interpolation: bool,

    #[arg(long)]
    pub(crate) no_monotonicity: bool,

    #[arg(long)]
    pub(crate) no_modulo: bool,

    #[arg(long)]
    pub(crate) no_constant_folding: bool,

    #[arg(long)]
    pub(crate) no_rewriting: bool,

    /// Unroll literal exponents up to this magnitude into products
    #[arg(long, value_name = "N", default_value_t = DEFAULT_REWRITE_THRESHOLD)]
    pub(crate) rewrite_threshold: u32,

    /// Assert all symmetry lemmas as soon as an exponential appears
    #[arg(long)]
    pub(crate) eager_symmetry: bool,

    /// Give up with `unknown` after N refinement iterations per check-sat
    #[arg(long, value_name = "N")]
    pub(crate) max_iterations: Option<u64>,

    /// Per-query timeout for the backend solver (0 disables)
    #[arg(long, value_name = "SECS", default_value_t = 0)]
    pub(crate) timeout: u64,

    /// Write the backend's assertions to PATH when the script ends
    #[arg(long, value_name = "PATH")]
    pub(crate) dump_smt2: Option<PathBuf>,

    /// Do not print the version banner on stderr
    #[arg(long)]
    pub(crate) no_version: bool,
}

impl Cli {
    pub(crate) fn config(&self) -> Config {
        let mut config = Config {
            solver_kind: self.solver,
            semantics: self.semantics,
            validate_sat: self.validate_sat,
            validate_unsat: self.validate_unsat,
            log: self.log,
            statistics: self.stats || self.stats_json,
            get_lemmas: self.get_lemmas,
            rewrite_threshold: self.rewrite_threshold,
            eager_symmetry: self.eager_symmetry,
            max_iterations: self.max_iterations,
            timeout_secs: self.timeout,
            dump_smt2: self.dump_smt2.clone(),
            ..Config::default()
        };
        let disabled_lemmas = [
            (self.no_symmetry, LemmaKind::Symmetry),
            (self.no_bounding, LemmaKind::Bounding),
            (self.no_interpolation, LemmaKind::Interpolation),
            (self.no_monotonicity, LemmaKind::Monotonicity),
            (self.no_modulo, LemmaKind::Modulo),
        ];
        for (off, kind) in disabled_lemmas {
            if off {
                config = config.without_lemma(kind);
            }
        }
        if self.no_constant_folding {
            config = config.without_preprocessing(PreprocessingKind::ConstantFolding);
        }
        if self.no_rewriting {
            config = config.without_preprocessing(PreprocessingKind::Rewriting);
        }
        config
    }
}
