use std::collections::{HashMap, VecDeque};
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

use num::BigInt;
use swine_smt::solver::{ModelValue, SatResult, SmtSolver};
use swine_smt::sorts::SmtSort;
use swine_smt::terms::SmtTerm;

use super::*;
use crate::config::{Config, LemmaKind, Semantics};
use crate::error::SwineError;

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Replays scripted answers; a SAT answer carries the values `get_value`
/// reports until the next check.
#[derive(Default)]
struct MockSolver {
    script: VecDeque<(SatResult, HashMap<SmtTerm, ModelValue>)>,
    current: HashMap<SmtTerm, ModelValue>,
    asserted: Vec<SmtTerm>,
    declared: Vec<(String, SmtSort)>,
    assumptions_seen: Vec<Vec<String>>,
    core: Vec<String>,
    depth: usize,
}

impl MockSolver {
    fn answer(mut self, result: SatResult, values: &[(SmtTerm, i64)]) -> Self {
        let values = values
            .iter()
            .map(|(t, v)| (t.clone(), ModelValue::Int(BigInt::from(*v))))
            .collect();
        self.script.push_back((result, values));
        self
    }

    fn sat_big(mut self, values: Vec<(SmtTerm, BigInt)>) -> Self {
        let values = values
            .into_iter()
            .map(|(t, v)| (t, ModelValue::Int(v)))
            .collect();
        self.script.push_back((SatResult::Sat, values));
        self
    }

    fn sat(self, values: &[(SmtTerm, i64)]) -> Self {
        self.answer(SatResult::Sat, values)
    }

    fn unsat(self) -> Self {
        self.answer(SatResult::Unsat, &[])
    }

    fn next(&mut self) -> SatResult {
        match self.script.pop_front() {
            Some((result, values)) => {
                self.current = values;
                result
            }
            None => SatResult::Unknown("script exhausted".into()),
        }
    }
}

impl SmtSolver for MockSolver {
    type Error = io::Error;

    fn declare_var(&mut self, name: &str, sort: &SmtSort) -> Result<(), Self::Error> {
        self.declared.push((name.to_string(), *sort));
        Ok(())
    }

    fn assert(&mut self, term: &SmtTerm) -> Result<(), Self::Error> {
        self.asserted.push(term.clone());
        Ok(())
    }

    fn push(&mut self) -> Result<(), Self::Error> {
        self.depth += 1;
        Ok(())
    }

    fn pop(&mut self) -> Result<(), Self::Error> {
        self.depth -= 1;
        Ok(())
    }

    fn check_sat(&mut self) -> Result<SatResult, Self::Error> {
        Ok(self.next())
    }

    fn supports_assumption_unsat_core(&self) -> bool {
        true
    }

    fn check_sat_assuming(&mut self, assumptions: &[String]) -> Result<SatResult, Self::Error> {
        self.assumptions_seen.push(assumptions.to_vec());
        Ok(self.next())
    }

    fn get_unsat_core_assumptions(&mut self) -> Result<Vec<String>, Self::Error> {
        Ok(self.core.clone())
    }

    fn get_value(&mut self, term: &SmtTerm) -> Result<ModelValue, Self::Error> {
        if let Some(value) = self.current.get(term) {
            return Ok(value.clone());
        }
        match term {
            SmtTerm::IntLit(n) => Ok(ModelValue::Int(n.clone())),
            SmtTerm::Neg(inner) => match self.get_value(inner)? {
                ModelValue::Int(n) => Ok(ModelValue::Int(-n)),
                other => Ok(other),
            },
            // Unscripted applications are unconstrained.
            SmtTerm::Exp(..) => Ok(ModelValue::Int(BigInt::from(0))),
            _ => Err(io::Error::new(io::ErrorKind::NotFound, term.to_string())),
        }
    }

    fn fresh(&self) -> Result<Self, Self::Error> {
        Ok(MockSolver::default())
    }

    fn dump_smt2(&self, _path: &Path) -> Result<(), Self::Error> {
        Ok(())
    }

    fn reset(&mut self) -> Result<(), Self::Error> {
        self.asserted.clear();
        self.declared.clear();
        Ok(())
    }
}

fn x() -> SmtTerm {
    SmtTerm::var("x")
}

fn two_to_x() -> SmtTerm {
    SmtTerm::exp(SmtTerm::int(2), x())
}

fn engine(solver: MockSolver, config: Config) -> Result<Swine<MockSolver>, SwineError> {
    let mut swine = Swine::new(solver, config);
    swine.declare_const("x", SmtSort::Int)?;
    Ok(swine)
}

#[test]
fn duplicate_and_unknown_symbols_are_rejected() -> TestResult {
    let mut swine = engine(MockSolver::default(), Config::default())?;
    assert!(matches!(
        swine.declare_const("x", SmtSort::Bool),
        Err(SwineError::DuplicateSymbol(_))
    ));
    assert!(matches!(
        swine.assert_formula(&SmtTerm::var("y").eq(SmtTerm::int(1))),
        Err(SwineError::UnknownSymbol(name)) if name == "y"
    ));
    assert!(matches!(
        swine.assert_formula(&x().add(SmtTerm::int(1))),
        Err(SwineError::MalformedTerm(_))
    ));
    Ok(())
}

#[test]
fn scopes_track_symbols_and_underflow() -> TestResult {
    let mut swine = engine(MockSolver::default(), Config::default())?;
    swine.push(2)?;
    swine.declare_const("y", SmtSort::Int)?;
    assert_eq!(swine.context_level(), 2);
    swine.pop(1)?;
    assert_eq!(swine.symbol_sort("y"), None);
    assert!(matches!(
        swine.pop(2),
        Err(SwineError::ScopeUnderflow { requested: 2, open: 1 })
    ));
    swine.pop(1)?;
    swine.declare_const("y", SmtSort::Bool)?;
    Ok(())
}

#[test]
fn assertions_are_preprocessed_before_reaching_the_solver() -> TestResult {
    let mut swine = engine(MockSolver::default(), Config::default())?;
    let assertion = SmtTerm::exp(x(), SmtTerm::int(2)).eq(SmtTerm::int(9));
    swine.assert_formula(&assertion)?;
    assert_eq!(
        swine.solver.asserted,
        vec![SmtTerm::product(vec![x(), x()]).eq(SmtTerm::int(9))]
    );
    assert_eq!(swine.statistics().assertions, 1);
    Ok(())
}

#[test]
fn correct_models_are_accepted() -> TestResult {
    let solver = MockSolver::default().sat(&[(x(), 3), (two_to_x(), 8)]);
    let mut swine = engine(solver, Config::default())?;
    swine.assert_formula(&two_to_x().eq(SmtTerm::int(8)))?;
    assert_eq!(swine.check_sat()?, SatResult::Sat);
    assert_eq!(
        swine.get_value(&two_to_x().add(SmtTerm::int(1)))?,
        ModelValue::Int(BigInt::from(9))
    );
    let model = swine.get_model()?;
    assert_eq!(
        model,
        vec![("x".to_string(), SmtSort::Int, ModelValue::Int(BigInt::from(3)))]
    );
    assert_eq!(swine.statistics().iterations, 1);
    assert_eq!(swine.statistics().total_lemmas(), 0);
    Ok(())
}

#[test]
fn failed_validation_reports_model_and_exponentials() -> TestResult {
    let solver = MockSolver::default().sat(&[(x(), 3), (two_to_x(), 8)]);
    let config = Config {
        validate_sat: true,
        ..Config::default()
    };
    let mut swine = engine(solver, config)?;
    swine.assert_formula(&SmtTerm::and(vec![
        two_to_x().eq(SmtTerm::int(8)),
        x().gt(SmtTerm::int(5)),
    ]))?;
    // Validation is a self-check; the answer stays sat.
    assert_eq!(swine.check_sat()?, SatResult::Sat);
    let report = swine.validation_report().ok_or("no validation report")?;
    let lines: Vec<&str> = report.lines().collect();
    assert!(lines[0].starts_with("model violates"), "{report}");
    assert!(lines.contains(&"model:"), "{report}");
    assert!(lines.contains(&"  x = 3"), "{report}");
    assert!(lines.contains(&"exponentials:"), "{report}");
    assert!(lines.contains(&"  (exp 2 x): 2^3 = 8"), "{report}");
    Ok(())
}

#[test]
fn valid_models_leave_no_report() -> TestResult {
    let solver = MockSolver::default().sat(&[(x(), 3), (two_to_x(), 8)]);
    let config = Config {
        validate_sat: true,
        ..Config::default()
    };
    let mut swine = engine(solver, config)?;
    swine.assert_formula(&two_to_x().eq(SmtTerm::int(8)))?;
    assert_eq!(swine.check_sat()?, SatResult::Sat);
    assert_eq!(swine.validation_report(), None);
    Ok(())
}

#[test]
fn wrong_values_are_refined_by_the_cheapest_lemma() -> TestResult {
    let solver = MockSolver::default()
        .sat(&[(x(), 3), (two_to_x(), 5)])
        .unsat();
    let mut swine = engine(solver, Config::default())?;
    swine.assert_formula(&two_to_x().eq(SmtTerm::int(5)))?;
    assert_eq!(swine.check_sat()?, SatResult::Unsat);
    // 2 > 1 ∧ x > 1 ∧ 2 + x > 4 ⇒ 2^x > 2x + 1 rules out 2^3 = 5.
    assert_eq!(swine.statistics().lemma_count(LemmaKind::Bounding), 1);
    assert_eq!(swine.statistics().total_lemmas(), 1);
    assert_eq!(swine.statistics().iterations, 2);
    assert!(matches!(swine.get_value(&x()), Err(SwineError::NoModel)));
    Ok(())
}

#[test]
fn iteration_limit_yields_unknown() -> TestResult {
    let wrong = [(x(), 3), (two_to_x(), 5)];
    let solver = MockSolver::default().sat(&wrong).sat(&wrong);
    let config = Config {
        max_iterations: Some(1),
        ..Config::default()
    };
    let mut swine = engine(solver, config)?;
    swine.assert_formula(&two_to_x().gt(SmtTerm::int(0)))?;
    assert_eq!(
        swine.check_sat()?,
        SatResult::Unknown("iteration limit".into())
    );
    assert_eq!(swine.reason_unknown(), Some("iteration limit"));
    Ok(())
}

#[test]
fn oversized_powers_are_clamped_and_unsat_becomes_unknown() -> TestResult {
    let solver = MockSolver::default()
        .sat(&[(x(), 1 << 21), (two_to_x(), 5)])
        .unsat();
    let mut swine = engine(solver, Config::default())?;
    swine.assert_formula(&two_to_x().gt(SmtTerm::int(0)))?;
    assert_eq!(swine.check_sat()?, SatResult::Unknown("overflow".into()));
    assert_eq!(swine.statistics().clamps, 1);
    for bound in crate::numeric::clamp_constraints(&SmtTerm::int(2), &x()) {
        assert!(swine.solver.asserted.contains(&bound), "missing {bound}");
    }
    Ok(())
}

#[test]
fn exponents_beyond_i64_are_clamped() -> TestResult {
    let b = SmtTerm::var("b");
    let b_to_x = SmtTerm::exp(b.clone(), x());
    let beyond = BigInt::from(i64::MAX) * 4;
    let solver = MockSolver::default()
        .sat_big(vec![
            (b.clone(), BigInt::from(-1)),
            (x(), beyond),
            (b_to_x.clone(), BigInt::from(1)),
        ])
        .unsat();
    let mut swine = engine(solver, Config::default())?;
    swine.declare_const("b", SmtSort::Int)?;
    swine.assert_formula(&b_to_x.eq(SmtTerm::int(1)))?;
    assert_eq!(swine.check_sat()?, SatResult::Unknown("overflow".into()));
    assert!(swine
        .solver
        .asserted
        .contains(&x().le(SmtTerm::int(i64::MAX))));
    Ok(())
}

#[test]
fn large_exponents_of_trivial_bases_are_not_overflow() -> TestResult {
    let b = SmtTerm::var("b");
    let b_to_x = SmtTerm::exp(b.clone(), x());
    let solver = MockSolver::default()
        .sat(&[(b.clone(), 1), (x(), 20_000), (b_to_x.clone(), 1)])
        .unsat();
    let mut swine = engine(solver, Config::default())?;
    swine.declare_const("b", SmtSort::Int)?;
    swine.assert_formula(&SmtTerm::and(vec![
        b_to_x.eq(SmtTerm::int(1)),
        b.eq(SmtTerm::int(1)),
        x().eq(SmtTerm::int(20_000)),
    ]))?;
    assert_eq!(swine.check_sat()?, SatResult::Sat);
    assert_eq!(swine.statistics().clamps, 0);
    assert_eq!(swine.get_value(&x())?, ModelValue::Int(BigInt::from(20_000)));
    Ok(())
}

#[test]
fn large_exponents_of_small_bases_are_computed() -> TestResult {
    let big_power = BigInt::from(2).pow(20_000u32);
    let solver = MockSolver::default()
        .sat_big(vec![(x(), BigInt::from(20_000)), (two_to_x(), big_power.clone())]);
    let mut swine = engine(solver, Config::default())?;
    swine.assert_formula(&two_to_x().gt(SmtTerm::int(0)))?;
    assert_eq!(swine.check_sat()?, SatResult::Sat);
    assert_eq!(swine.statistics().clamps, 0);
    assert_eq!(swine.get_value(&two_to_x())?, ModelValue::Int(big_power));
    Ok(())
}

#[test]
fn without_interpolation_stuck_refinement_is_unknown() -> TestResult {
    let three_to_x = SmtTerm::exp(SmtTerm::int(3), x());
    let solver = MockSolver::default().sat(&[(x(), 2), (three_to_x.clone(), 10)]);
    let config = Config::default()
        .without_lemma(LemmaKind::Interpolation)
        .without_lemma(LemmaKind::Modulo);
    let mut swine = engine(solver, config)?;
    swine.assert_formula(&three_to_x.eq(SmtTerm::int(10)))?;
    match swine.check_sat()? {
        SatResult::Unknown(reason) => assert!(reason.contains("--no-interpolation")),
        other => panic!("expected unknown, got {other}"),
    }
    Ok(())
}

#[test]
fn lemma_cores_are_reported_by_kind() -> TestResult {
    let mut solver = MockSolver::default()
        .sat(&[(x(), 3), (two_to_x(), 5)])
        .unsat();
    solver.core = vec!["swine!a0".to_string()];
    let config = Config {
        get_lemmas: true,
        ..Config::default()
    };
    let mut swine = engine(solver, config)?;
    swine.assert_formula(&two_to_x().eq(SmtTerm::int(5)))?;
    assert_eq!(swine.check_sat()?, SatResult::Unsat);
    assert_eq!(swine.solver.assumptions_seen, vec![vec!["swine!a0".to_string()]]);
    let core = swine.lemma_core();
    assert_eq!(core.len(), 1);
    assert_eq!(core[&LemmaKind::Bounding].len(), 1);
    Ok(())
}

#[test]
fn user_assumptions_appear_in_the_core() -> TestResult {
    let mut solver = MockSolver::default().unsat();
    solver.core = vec!["p".to_string(), "swine!a0".to_string()];
    let mut swine = engine(solver, Config::default())?;
    swine.declare_const("p", SmtSort::Bool)?;
    let p = SmtTerm::var("p");
    let positive = x().gt(SmtTerm::int(0));
    assert_eq!(swine.check_sat_assuming(&[p.clone(), positive.clone()])?, SatResult::Unsat);
    assert_eq!(swine.get_unsat_assumptions(), &[p, positive]);
    Ok(())
}

#[test]
fn eager_symmetry_asserts_parity_lemmas_up_front() -> TestResult {
    let config = Config {
        eager_symmetry: true,
        ..Config::default()
    };
    let mut swine = engine(MockSolver::default(), config)?;
    swine.declare_const("b", SmtSort::Int)?;
    let t = SmtTerm::exp(SmtTerm::var("b"), x());
    swine.assert_formula(&t.gt(SmtTerm::int(0)))?;
    assert!(swine.statistics().lemma_count(LemmaKind::Symmetry) >= 2);
    assert!(swine.statistics().non_constant_base);
    Ok(())
}

#[test]
fn negative_bases_are_related_to_their_group_partner() -> TestResult {
    let b = SmtTerm::var("b");
    let t = SmtTerm::exp(b.clone(), x());
    let partner = SmtTerm::exp(b.clone().neg(), x());
    // (-2)^3 = 8 is wrong and the unscripted partner 2^3 reads as 0.
    let solver = MockSolver::default()
        .sat(&[(b.clone(), -2), (x(), 3), (t.clone(), 8)])
        .unsat();
    let mut swine = engine(solver, Config::default())?;
    swine.declare_const("b", SmtSort::Int)?;
    swine.assert_formula(&t.eq(SmtTerm::int(8)))?;
    assert_eq!(swine.check_sat()?, SatResult::Unsat);
    assert_eq!(swine.statistics().lemma_count(LemmaKind::Symmetry), 1);
    let partner = partner.to_string();
    assert!(swine.solver.asserted.iter().any(|a| a.to_string().contains(&partner)));
    Ok(())
}

#[test]
fn total_semantics_accepts_negative_exponents_computed_exactly() -> TestResult {
    let solver = MockSolver::default().sat(&[(x(), -3), (two_to_x(), 8)]);
    let mut swine = engine(solver, Config::default().with_semantics(Semantics::Total))?;
    swine.assert_formula(&two_to_x().eq(SmtTerm::int(8)))?;
    assert_eq!(swine.check_sat()?, SatResult::Sat);
    Ok(())
}

#[test]
fn reset_clears_statistics_but_reset_assertions_keeps_them() -> TestResult {
    let mut swine = engine(MockSolver::default(), Config::default())?;
    swine.assert_formula(&x().gt(SmtTerm::int(0)))?;
    swine.reset_assertions()?;
    assert_eq!(swine.statistics().assertions, 1);
    assert_eq!(swine.symbol_sort("x"), None);
    swine.reset()?;
    assert_eq!(swine.statistics().assertions, 0);
    Ok(())
}

#[test]
fn brute_force_runs_after_unsat() -> TestResult {
    let solver = MockSolver::default().unsat();
    let config = Config {
        validate_unsat: Some(2),
        ..Config::default()
    };
    let mut swine = engine(solver, config)?;
    swine.assert_formula(&two_to_x().eq(SmtTerm::int(5)))?;
    // The fresh mock answers unknown to every probe, so nothing is found.
    assert_eq!(swine.check_sat()?, SatResult::Unsat);
    Ok(())
}

/// Collects formatted trace output.
#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Runs one refinement round and returns what an `info` subscriber saw.
fn info_trace(log: bool) -> Result<String, Box<dyn std::error::Error>> {
    let capture = Capture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, || -> TestResult {
        let solver = MockSolver::default()
            .sat(&[(x(), 3), (two_to_x(), 5)])
            .unsat();
        let config = Config {
            log,
            ..Config::default()
        };
        let mut swine = engine(solver, config)?;
        let ground = SmtTerm::exp(SmtTerm::int(2), SmtTerm::int(3)).add(x());
        swine.assert_formula(&ground.gt(SmtTerm::int(0)))?;
        swine.assert_formula(&two_to_x().eq(SmtTerm::int(5)))?;
        swine.check_sat()?;
        Ok(())
    })?;
    let bytes = capture.0.lock().unwrap().clone();
    Ok(String::from_utf8(bytes)?)
}

#[test]
fn log_flag_traces_lemmas_and_preprocessing_at_info() -> TestResult {
    let verbose = info_trace(true)?;
    assert!(verbose.contains("bounding lemma:"), "{verbose}");
    assert!(verbose.contains("preprocessed"), "{verbose}");

    let quiet = info_trace(false)?;
    assert!(!quiet.contains("lemma:"), "{quiet}");
    assert!(!quiet.contains("preprocessed"), "{quiet}");
    assert!(quiet.contains("check-sat answered"), "{quiet}");
    Ok(())
}
