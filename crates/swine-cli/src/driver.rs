//! Executes a parsed SMT-LIB script against the engine.
//!
//! Responses go to `out` in SMT-LIB syntax; statistics and lemma reports
//! go to `report`. Query errors a script can recover from (no model, bad
//! `pop`, redeclarations) are answered with `(error "...")` as the standard
//! prescribes. Everything else aborts the run.

use std::io::Write;

use miette::Diagnostic;
use swine_core::config::LemmaKind;
use swine_core::{Swine, SwineError};
use swine_smt::backends::smtlib_printer::quote_symbol;
use swine_smt::solver::{SatResult, SmtSolver};
use swine_smtlib::ast::{Command, SExpr, Script, Spanned};
use swine_smtlib::{parse_script, ElaborationError, Elaborator, ParseError};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error, Diagnostic)]
pub(crate) enum DriverError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Elaboration(#[from] ElaborationError),

    #[error(transparent)]
    #[diagnostic(code(swine::engine))]
    Engine(#[from] SwineError),

    #[error("Cannot write output: {0}")]
    #[diagnostic(code(swine::io))]
    Io(#[from] std::io::Error),
}

/// Parses `source` and runs it to completion.
pub(crate) fn run_script<S: SmtSolver, W: Write, R: Write>(
    engine: Swine<S>,
    source: &str,
    filename: &str,
    out: W,
    report: R,
    stats_format: StatsFormat,
) -> Result<(), DriverError> {
    let script = parse_script(source, filename)?;
    info!("read {} command(s) from {filename}", script.len());
    Driver::new(engine, out, report, source, filename)
        .with_stats_format(stats_format)
        .run(&script)
}

/// What a command asks of the driver after it ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Response {
    /// Acknowledged with `success` when `:print-success` is on.
    Success,
    /// The command printed its own response.
    Printed,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StatsFormat {
    Text,
    Json,
}

pub(crate) struct Driver<'a, S: SmtSolver, W: Write, R: Write> {
    engine: Swine<S>,
    elaborator: Elaborator,
    out: W,
    report: R,
    source: &'a str,
    filename: &'a str,
    print_success: bool,
    stats_format: StatsFormat,
}

impl<'a, S: SmtSolver, W: Write, R: Write> Driver<'a, S, W, R> {
    pub(crate) fn new(engine: Swine<S>, out: W, report: R, source: &'a str, filename: &'a str) -> Self {
        Self {
            engine,
            elaborator: Elaborator::new(),
            out,
            report,
            source,
            filename,
            print_success: false,
            stats_format: StatsFormat::Text,
        }
    }

    pub(crate) fn with_stats_format(mut self, format: StatsFormat) -> Self {
        self.stats_format = format;
        self
    }

    /// Runs every command up to the end of the script or the first `exit`.
    pub(crate) fn run(&mut self, script: &Script) -> Result<(), DriverError> {
        for command in script {
            debug!("executing {:?}", command.node);
            if self.execute(command)? == Response::Exit {
                break;
            }
        }
        if let Some(path) = self.engine.config().dump_smt2.clone() {
            info!("writing assertions to {}", path.display());
            self.engine.dump_smt2(&path)?;
        }
        self.out.flush()?;
        Ok(())
    }

    fn execute(&mut self, command: &Spanned<Command>) -> Result<Response, DriverError> {
        match self.dispatch(command) {
            Ok(Response::Success) => {
                if self.print_success {
                    writeln!(self.out, "success")?;
                }
                Ok(Response::Success)
            }
            Err(DriverError::Engine(err)) if recoverable(&err) => {
                writeln!(self.out, "(error \"{}\")", escape(&err.to_string()))?;
                Ok(Response::Printed)
            }
            other => other,
        }
    }

    fn dispatch(&mut self, command: &Spanned<Command>) -> Result<Response, DriverError> {
        let span = command.span;
        match &command.node {
            Command::SetLogic(logic) => self.engine.set_logic(logic)?,
            Command::SetOption { key, value } => {
                if key == "print-success" {
                    self.print_success = value.as_symbol() == Some("true");
                } else {
                    self.engine.set_option(key, &option_value(value))?;
                }
            }
            Command::SetInfo { .. } => {}
            Command::GetInfo(key) => {
                self.get_info(key)?;
                return Ok(Response::Printed);
            }
            Command::DeclareConst { name, sort } => {
                if self.engine.symbol_sort(name).is_some() {
                    return Err(SwineError::DuplicateSymbol(name.clone()).into());
                }
                self.elaborate(|e| e.declare(name, *sort, span))?;
                self.engine.declare_const(name, *sort)?;
            }
            Command::DefineFun(def) => self.elaborate(|e| e.define(def, span))?,
            Command::Assert(term) => {
                let formula = self.elaborate(|e| e.elaborate_formula(term))?;
                self.engine.assert_formula(&formula)?;
            }
            Command::CheckSat => {
                let result = self.engine.check_sat()?;
                self.answer(&result)?;
                return Ok(Response::Printed);
            }
            Command::CheckSatAssuming(literals) => {
                let literals = literals
                    .iter()
                    .map(|l| self.elaborate(|e| e.elaborate_formula(l)))
                    .collect::<Result<Vec<_>, _>>()?;
                let result = self.engine.check_sat_assuming(&literals)?;
                self.answer(&result)?;
                return Ok(Response::Printed);
            }
            Command::GetModel => {
                self.get_model()?;
                return Ok(Response::Printed);
            }
            Command::GetValue(terms) => {
                self.get_value(terms)?;
                return Ok(Response::Printed);
            }
            Command::GetUnsatAssumptions => {
                let shown: Vec<String> = self
                    .engine
                    .get_unsat_assumptions()
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                writeln!(self.out, "({})", shown.join(" "))?;
                return Ok(Response::Printed);
            }
            Command::Push(n) => {
                self.engine.push(*n)?;
                self.elaborator.push(*n);
            }
            Command::Pop(n) => {
                self.engine.pop(*n)?;
                self.elaborator.pop(*n);
            }
            Command::Reset => {
                self.engine.reset()?;
                self.elaborator.reset();
                self.print_success = false;
            }
            Command::ResetAssertions => {
                self.engine.reset_assertions()?;
                self.elaborator.reset();
            }
            Command::Echo(text) => {
                writeln!(self.out, "\"{}\"", escape(text))?;
                return Ok(Response::Printed);
            }
            Command::Exit => return Ok(Response::Exit),
        }
        Ok(Response::Success)
    }

    fn elaborate<T>(
        &mut self,
        f: impl FnOnce(&mut Elaborator) -> Result<T, ElaborationError>,
    ) -> Result<T, DriverError> {
        f(&mut self.elaborator)
            .map_err(|e| DriverError::Elaboration(e.with_source_context(self.source, self.filename)))
    }

    fn answer(&mut self, result: &SatResult) -> Result<(), DriverError> {
        writeln!(self.out, "{result}")?;
        if let SatResult::Unknown(reason) = result {
            info!("unknown: {reason}");
        }
        if *result == SatResult::Unsat && self.engine.config().get_lemmas {
            self.report_lemmas()?;
        }
        if self.engine.config().statistics {
            self.report_statistics()?;
        }
        Ok(())
    }

    fn report_lemmas(&mut self) -> Result<(), DriverError> {
        let core = self.engine.lemma_core();
        if core.is_empty() {
            writeln!(self.report, "no lemmas in the unsat core")?;
            return Ok(());
        }
        for kind in LemmaKind::ALL {
            let Some(lemmas) = core.get(&kind) else {
                continue;
            };
            writeln!(self.report, "{kind} lemmas:")?;
            for lemma in lemmas {
                writeln!(self.report, "  {lemma}")?;
            }
        }
        Ok(())
    }

    fn report_statistics(&mut self) -> Result<(), DriverError> {
        let stats = self.engine.statistics();
        match self.stats_format {
            StatsFormat::Text => write!(self.report, "{stats}")?,
            StatsFormat::Json => {
                let json = stats
                    .to_json()
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
                writeln!(self.report, "{json}")?;
            }
        }
        Ok(())
    }

    fn get_info(&mut self, key: &str) -> Result<(), DriverError> {
        match key {
            "name" => writeln!(self.out, "(:name \"swine\")")?,
            "version" => writeln!(self.out, "(:version \"{}\")", env!("CARGO_PKG_VERSION"))?,
            "reason-unknown" => match self.engine.reason_unknown() {
                Some(reason) => writeln!(self.out, "(:reason-unknown \"{}\")", escape(reason))?,
                None => writeln!(self.out, "(error \"the last check-sat did not answer unknown\")")?,
            },
            "all-statistics" => {
                let stats = self.engine.statistics();
                let mut fields = vec![
                    format!(":assertions {}", stats.assertions),
                    format!(":iterations {}", stats.iterations),
                ];
                for kind in LemmaKind::ALL {
                    fields.push(format!(":{kind}-lemmas {}", stats.lemma_count(kind)));
                }
                fields.push(format!(":clamped-exponentials {}", stats.clamps));
                writeln!(self.out, "({})", fields.join(" "))?;
            }
            _ => writeln!(self.out, "unsupported")?,
        }
        Ok(())
    }

    fn get_model(&mut self) -> Result<(), DriverError> {
        let model = self.engine.get_model()?;
        writeln!(self.out, "(")?;
        for (name, sort, value) in model {
            writeln!(self.out, "  (define-fun {} () {sort} {value})", quote_symbol(&name))?;
        }
        writeln!(self.out, ")")?;
        Ok(())
    }

    /// Echoes each term as written, paired with its value.
    fn get_value(&mut self, terms: &[SExpr]) -> Result<(), DriverError> {
        let elaborated = terms
            .iter()
            .map(|t| self.elaborate(|e| e.elaborate(t)))
            .collect::<Result<Vec<_>, _>>()?;
        let mut pairs = Vec::with_capacity(terms.len());
        for (expr, (term, _)) in terms.iter().zip(&elaborated) {
            let value = self.engine.get_value(term)?;
            pairs.push(format!("({expr} {value})"));
        }
        writeln!(self.out, "({})", pairs.join(" "))?;
        Ok(())
    }
}

/// Errors that only concern the current command.
fn recoverable(err: &SwineError) -> bool {
    matches!(
        err,
        SwineError::NoModel
            | SwineError::ScopeUnderflow { .. }
            | SwineError::DuplicateSymbol(_)
            | SwineError::UnknownSymbol(_)
    )
}

/// Option values as backends expect them: symbols, numerals and strings
/// without SMT-LIB quoting.
fn option_value(value: &SExpr) -> String {
    match value {
        SExpr::Str(text, _) => text.clone(),
        SExpr::Symbol(name, _) => name.clone(),
        other => other.to_string(),
    }
}

fn escape(text: &str) -> String {
    text.replace('"', "\"\"")
}
