#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Neither reading nor elaborating a script may panic.
        if let Ok(script) = swine_smtlib::parse_script(s, "fuzz.smt2") {
            let mut elaborator = swine_smtlib::Elaborator::new();
            for command in &script {
                match &command.node {
                    swine_smtlib::ast::Command::DeclareConst { name, sort } => {
                        let _ = elaborator.declare(name, *sort, command.span);
                    }
                    swine_smtlib::ast::Command::DefineFun(def) => {
                        let _ = elaborator.define(def, command.span);
                    }
                    swine_smtlib::ast::Command::Assert(term) => {
                        let _ = elaborator.elaborate(term);
                    }
                    _ => {}
                }
            }
        }
    }
});
