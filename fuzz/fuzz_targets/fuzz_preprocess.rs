#![no_main]
use libfuzzer_sys::fuzz_target;
use swine_core::config::{Config, Semantics};
use swine_core::preprocess::Preprocessor;
use swine_smtlib::ast::Command;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(script) = swine_smtlib::parse_script(s, "fuzz.smt2") else {
        return;
    };
    let mut elaborator = swine_smtlib::Elaborator::new();
    let partial = Preprocessor::new(&Config::default());
    let total = Preprocessor::new(&Config::default().with_semantics(Semantics::Total));
    for command in &script {
        match &command.node {
            Command::DeclareConst { name, sort } => {
                let _ = elaborator.declare(name, *sort, command.span);
            }
            Command::Assert(term) => {
                if let Ok(formula) = elaborator.elaborate_formula(term) {
                    // Preprocessing must terminate and be idempotent.
                    for pp in [&partial, &total] {
                        let once = pp.preprocess(&formula);
                        assert_eq!(pp.preprocess(&once), once);
                    }
                }
            }
            _ => {}
        }
    }
});
