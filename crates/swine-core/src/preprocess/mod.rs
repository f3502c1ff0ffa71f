//! Simplification applied to every assertion and lemma before it reaches
//! the solver.
//!
//! Constant folding and rewriting alternate until neither changes the term;
//! each round ends by lowering exponentials with small literal exponents
//! into multiplication. The result is a fixpoint, so preprocessing is
//! idempotent.

pub mod constant_folding;
pub mod lowering;
pub mod rewriter;

use swine_smt::terms::SmtTerm;
use tracing::{debug, info, warn};

use crate::config::{Config, PreprocessingKind, Semantics};

/// Safety net for the fixpoint loop.
const MAX_ROUNDS: usize = 64;

#[derive(Debug, Clone)]
pub struct Preprocessor {
    semantics: Semantics,
    constant_folding: bool,
    rewriting: bool,
    rewrite_threshold: u32,
    /// Report every change at `info` instead of `debug`.
    log: bool,
}

impl Preprocessor {
    pub fn new(config: &Config) -> Self {
        Self {
            semantics: config.semantics,
            constant_folding: config.is_preprocessing_active(PreprocessingKind::ConstantFolding),
            rewriting: config.is_preprocessing_active(PreprocessingKind::Rewriting),
            rewrite_threshold: config.rewrite_threshold,
            log: config.log,
        }
    }

    pub fn preprocess(&self, term: &SmtTerm) -> SmtTerm {
        let mut current = term.clone();
        for _ in 0..MAX_ROUNDS {
            let next = self.round(&current);
            if next == current {
                if &current != term && self.log {
                    info!("preprocessed {term} into {current}");
                } else if &current != term {
                    debug!("preprocessed {term} into {current}");
                }
                return current;
            }
            current = next;
        }
        warn!("preprocessing did not reach a fixpoint for {term}");
        current
    }

    fn round(&self, term: &SmtTerm) -> SmtTerm {
        let mut t = term.clone();
        if self.constant_folding {
            t = constant_folding::fold(&t, self.semantics);
        }
        if self.rewriting {
            t = rewriter::rewrite(&t, self.semantics);
        }
        lowering::lower(&t, self.semantics, self.rewrite_threshold)
    }
}
