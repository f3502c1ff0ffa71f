use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command, Stdio};

use thiserror::Error;

use crate::backends::smtlib_printer::{quote_symbol, sort_to_smtlib, to_smtlib};
use crate::backends::{parse_int_value, EXP_SYMBOL};
use crate::solver::{ModelValue, SatResult, SmtSolver};
use crate::sorts::SmtSort;
use crate::terms::SmtTerm;

/// Logic used for the backend session: linear integer arithmetic is not
/// enough once `exp` is declared, and lemmas may contain `mod`.
const CVC5_LOGIC: &str = "QF_UFNIA";

/// Options owned by the backend itself; user pass-through must not override
/// them.
const RESERVED_OPTIONS: &[&str] = &[
    "produce-models",
    "produce-unsat-assumptions",
    "incremental",
    "print-success",
];

#[derive(Debug, Error)]
pub enum Cvc5Error {
    #[error("cvc5 I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cvc5 not found: {0}")]
    NotFound(String),
    #[error("cvc5 error: {0}")]
    SolverError(String),
    #[error("Failed to parse cvc5 output: {0}")]
    ParseError(String),
}

pub struct Cvc5Solver {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    stderr: BufReader<ChildStderr>,
    command: String,
    timeout_ms: Option<u64>,
    vars: HashMap<String, SmtSort>,
    last_assumptions: Vec<String>,
    transcript: Vec<String>,
}

impl Cvc5Solver {
    pub fn new() -> Result<Self, Cvc5Error> {
        Self::with_command_and_timeout("cvc5", None)
    }

    pub fn with_timeout_secs(timeout_secs: u64) -> Result<Self, Cvc5Error> {
        if timeout_secs == 0 {
            return Self::with_command_and_timeout("cvc5", None);
        }
        let timeout_ms = timeout_secs.saturating_mul(1000);
        Self::with_command_and_timeout("cvc5", Some(timeout_ms))
    }

    pub fn with_command(cmd: &str) -> Result<Self, Cvc5Error> {
        Self::with_command_and_timeout(cmd, None)
    }

    pub fn with_command_and_timeout(cmd: &str, timeout_ms: Option<u64>) -> Result<Self, Cvc5Error> {
        let mut args = vec![
            "--lang".to_string(),
            "smt2".to_string(),
            "--incremental".to_string(),
            "--produce-models".to_string(),
            "--produce-unsat-assumptions".to_string(),
        ];
        if let Some(ms) = timeout_ms {
            args.push(format!("--tlimit-per={ms}"));
        }

        let mut child = Command::new(cmd)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Cvc5Error::NotFound(format!("{cmd}: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Cvc5Error::SolverError("failed to capture cvc5 stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Cvc5Error::SolverError("failed to capture cvc5 stdout".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Cvc5Error::SolverError("failed to capture cvc5 stderr".into()))?;

        let mut solver = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            stderr: BufReader::new(stderr),
            command: cmd.to_string(),
            timeout_ms,
            vars: HashMap::new(),
            last_assumptions: Vec::new(),
            transcript: Vec::new(),
        };

        solver.open_session()?;
        Ok(solver)
    }

    fn open_session(&mut self) -> Result<(), Cvc5Error> {
        self.send_command_no_response(&format!("(set-logic {CVC5_LOGIC})"))?;
        self.send_command_no_response(&format!("(declare-fun {EXP_SYMBOL} (Int Int) Int)"))
    }

    /// Send a command and read one complete S-expression (or atom) back.
    fn send_command(&mut self, cmd: &str) -> Result<String, Cvc5Error> {
        writeln!(self.stdin, "{cmd}")?;
        self.stdin.flush()?;

        let mut response = String::new();
        loop {
            let mut line = String::new();
            let read = self.stdout.read_line(&mut line)?;
            if read == 0 {
                let mut stderr = String::new();
                let _ = self.stderr.read_line(&mut stderr);
                return Err(Cvc5Error::SolverError(format!(
                    "No response from cvc5 for command `{cmd}`. stderr: {}",
                    stderr.trim()
                )));
            }
            response.push_str(&line);
            if paren_depth(&response) <= 0 {
                break;
            }
        }
        let response = response.trim().to_string();
        if response.starts_with("(error") {
            return Err(Cvc5Error::SolverError(response));
        }
        Ok(response)
    }

    fn send_command_no_response(&mut self, cmd: &str) -> Result<(), Cvc5Error> {
        writeln!(self.stdin, "{cmd}")?;
        self.stdin.flush()?;
        self.transcript.push(cmd.to_string());
        Ok(())
    }

    fn parse_check_response(response: &str) -> Result<SatResult, Cvc5Error> {
        match response {
            "sat" => Ok(SatResult::Sat),
            "unsat" => Ok(SatResult::Unsat),
            "unknown" => Ok(SatResult::Unknown("cvc5 returned unknown".into())),
            other => Err(Cvc5Error::SolverError(other.to_string())),
        }
    }
}

fn paren_depth(text: &str) -> i64 {
    let mut depth = 0i64;
    let mut quoted = false;
    for ch in text.chars() {
        match ch {
            '|' => quoted = !quoted,
            '(' if !quoted => depth += 1,
            ')' if !quoted => depth -= 1,
            _ => {}
        }
    }
    depth
}

impl Drop for Cvc5Solver {
    fn drop(&mut self) {
        let _ = writeln!(self.stdin, "(exit)");
        let _ = self.stdin.flush();
        let _ = self.child.wait();
    }
}

impl SmtSolver for Cvc5Solver {
    type Error = Cvc5Error;

    fn declare_var(&mut self, name: &str, sort: &SmtSort) -> Result<(), Cvc5Error> {
        let sort_str = sort_to_smtlib(sort);
        let symbol = quote_symbol(name);
        self.send_command_no_response(&format!("(declare-const {symbol} {sort_str})"))?;
        self.vars.insert(name.to_string(), *sort);
        Ok(())
    }

    fn assert(&mut self, term: &SmtTerm) -> Result<(), Cvc5Error> {
        let smt_str = to_smtlib(term);
        self.send_command_no_response(&format!("(assert {smt_str})"))?;
        Ok(())
    }

    fn push(&mut self) -> Result<(), Cvc5Error> {
        self.send_command_no_response("(push 1)")?;
        Ok(())
    }

    fn pop(&mut self) -> Result<(), Cvc5Error> {
        self.send_command_no_response("(pop 1)")?;
        Ok(())
    }

    fn check_sat(&mut self) -> Result<SatResult, Cvc5Error> {
        let response = self.send_command("(check-sat)")?;
        Self::parse_check_response(&response)
    }

    fn get_value(&mut self, term: &SmtTerm) -> Result<ModelValue, Cvc5Error> {
        let response = self.send_command(&format!("(get-value ({}))", to_smtlib(term)))?;
        parse_cvc5_value(&response).ok_or(Cvc5Error::ParseError(response))
    }

    fn supports_assumption_unsat_core(&self) -> bool {
        true
    }

    fn check_sat_assuming(&mut self, assumptions: &[String]) -> Result<SatResult, Cvc5Error> {
        for name in assumptions {
            match self.vars.get(name) {
                Some(SmtSort::Bool) => {}
                Some(_) => {
                    return Err(Cvc5Error::SolverError(format!(
                        "assumption `{name}` is not declared as Bool"
                    )));
                }
                None => {
                    return Err(Cvc5Error::SolverError(format!(
                        "assumption `{name}` is not declared"
                    )));
                }
            }
        }
        self.last_assumptions = assumptions.to_vec();
        let payload: Vec<String> = assumptions.iter().map(|a| quote_symbol(a)).collect();
        let response =
            self.send_command(&format!("(check-sat-assuming ({}))", payload.join(" ")))?;
        Self::parse_check_response(&response)
    }

    fn get_unsat_core_assumptions(&mut self) -> Result<Vec<String>, Cvc5Error> {
        let response = self.send_command("(get-unsat-assumptions)")?;
        Ok(parse_cvc5_unsat_assumptions(&response)
            .into_iter()
            .filter(|name| self.last_assumptions.iter().any(|a| a == name))
            .collect())
    }

    fn set_option(&mut self, key: &str, value: &str) -> Result<(), Cvc5Error> {
        let key = key.trim_start_matches(':');
        if RESERVED_OPTIONS.contains(&key) {
            return Ok(());
        }
        self.send_command_no_response(&format!("(set-option :{key} {value})"))
    }

    fn fresh(&self) -> Result<Self, Cvc5Error> {
        Self::with_command_and_timeout(&self.command, self.timeout_ms)
    }

    fn dump_smt2(&self, path: &Path) -> Result<(), Cvc5Error> {
        let mut text = self.transcript.join("\n");
        text.push('\n');
        std::fs::write(path, text)?;
        Ok(())
    }

    fn reset(&mut self) -> Result<(), Cvc5Error> {
        self.send_command_no_response("(reset)")?;
        self.transcript.clear();
        self.open_session()?;
        self.vars.clear();
        self.last_assumptions.clear();
        Ok(())
    }
}

/// Extract the value from a `get-value` response `((term value))`.
fn parse_cvc5_value(response: &str) -> Option<ModelValue> {
    let body = response.trim().strip_suffix("))")?.trim_end();
    // The value is the last balanced S-expression in `body`.
    let value = if body.ends_with(')') {
        let mut depth = 0i64;
        let mut start = None;
        for (idx, ch) in body.char_indices().rev() {
            match ch {
                ')' => depth += 1,
                '(' => {
                    depth -= 1;
                    if depth == 0 {
                        start = Some(idx);
                        break;
                    }
                }
                _ => {}
            }
        }
        &body[start?..]
    } else {
        body.rsplit(|c: char| c.is_whitespace() || c == ')')
            .next()?
    };

    match value {
        "true" => Some(ModelValue::Bool(true)),
        "false" => Some(ModelValue::Bool(false)),
        other => parse_int_value(other).map(ModelValue::Int),
    }
}

fn parse_cvc5_unsat_assumptions(response: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut buf = String::new();
    let mut in_quoted_symbol = false;
    for ch in response.trim().chars() {
        match ch {
            '(' | ')' if !in_quoted_symbol => {
                if !buf.is_empty() {
                    out.push(std::mem::take(&mut buf));
                }
            }
            '|' => {
                in_quoted_symbol = !in_quoted_symbol;
                if !buf.is_empty() {
                    out.push(std::mem::take(&mut buf));
                }
            }
            c if c.is_whitespace() && !in_quoted_symbol => {
                if !buf.is_empty() {
                    out.push(std::mem::take(&mut buf));
                }
            }
            other => buf.push(other),
        }
    }
    if !buf.is_empty() {
        out.push(buf);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use num::BigInt;

    #[test]
    fn parse_cvc5_int_value() {
        let v = parse_cvc5_value("((x 42))");
        assert_eq!(v, Some(ModelValue::Int(BigInt::from(42))));
    }

    #[test]
    fn parse_cvc5_negative_int_value() {
        let v = parse_cvc5_value("((x (- 7)))");
        assert_eq!(v, Some(ModelValue::Int(BigInt::from(-7))));
    }

    #[test]
    fn parse_cvc5_value_of_compound_term() {
        let v = parse_cvc5_value("(((exp 2 x) 8))");
        assert_eq!(v, Some(ModelValue::Int(BigInt::from(8))));
        let v = parse_cvc5_value("(((exp (- 2) x) (- 8)))");
        assert_eq!(v, Some(ModelValue::Int(BigInt::from(-8))));
    }

    #[test]
    fn parse_cvc5_bool_value() {
        assert_eq!(
            parse_cvc5_value("((b true))"),
            Some(ModelValue::Bool(true))
        );
        assert_eq!(
            parse_cvc5_value("((b false))"),
            Some(ModelValue::Bool(false))
        );
    }

    #[test]
    fn parse_cvc5_unsat_assumption_list() {
        assert_eq!(
            parse_cvc5_unsat_assumptions("(a b c)"),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
        assert_eq!(
            parse_cvc5_unsat_assumptions("(|a b| c)"),
            vec!["a b".to_string(), "c".to_string()]
        );
    }

    #[test]
    fn paren_depth_ignores_quoted_symbols() {
        assert_eq!(paren_depth("((x 1))"), 0);
        assert_eq!(paren_depth("((|a(| 1"), 2);
    }
}
