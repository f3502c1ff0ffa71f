#![doc = include_str!("../README.md")]

mod cli;
mod driver;

use clap::Parser;
use miette::{IntoDiagnostic, WrapErr};
use swine_core::{SolverKind, Swine};
use swine_smt::backends::cvc5_backend::Cvc5Solver;
use swine_smt::backends::z3_backend::Z3Solver;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::driver::{run_script, StatsFormat};

/// Filter used when `RUST_LOG` is unset.
fn default_filter(log: bool) -> &'static str {
    if log {
        "warn,swine=debug,swine_core=debug,swine_smt=debug"
    } else {
        "warn"
    }
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_filter(cli.log))),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if !cli.no_version {
        eprintln!("swine {}", env!("CARGO_PKG_VERSION"));
    }

    let config = cli.config();
    let filename = cli.input.display().to_string();
    let source = std::fs::read_to_string(&cli.input)
        .into_diagnostic()
        .wrap_err_with(|| format!("cannot read {filename}"))?;
    let stats_format = if cli.stats_json {
        StatsFormat::Json
    } else {
        StatsFormat::Text
    };

    let stdout = std::io::stdout();
    let stderr = std::io::stderr();
    match config.solver_kind {
        SolverKind::Z3 => {
            let solver = Z3Solver::with_timeout_secs(config.timeout_secs);
            run_script(
                Swine::new(solver, config),
                &source,
                &filename,
                stdout.lock(),
                stderr.lock(),
                stats_format,
            )?;
        }
        SolverKind::Cvc5 => {
            let solver = Cvc5Solver::with_timeout_secs(config.timeout_secs)
                .into_diagnostic()
                .wrap_err("cannot start cvc5")?;
            run_script(
                Swine::new(solver, config),
                &source,
                &filename,
                stdout.lock(),
                stderr.lock(),
                stats_format,
            )?;
        }
    }
    Ok(())
}
