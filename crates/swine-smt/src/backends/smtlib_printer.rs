use num::{BigInt, Signed};

use crate::sorts::SmtSort;
use crate::terms::SmtTerm;

/// Print an SmtTerm as SMT-LIB2 format.
pub fn to_smtlib(term: &SmtTerm) -> String {
    match term {
        SmtTerm::Var(name) => quote_symbol(name),
        SmtTerm::IntLit(n) => int_to_smtlib(n),
        SmtTerm::BoolLit(b) => {
            if *b {
                "true".to_string()
            } else {
                "false".to_string()
            }
        }
        SmtTerm::Neg(inner) => format!("(- {})", to_smtlib(inner)),
        SmtTerm::Add(terms) => nary("+", terms, "0"),
        SmtTerm::Mul(terms) => nary("*", terms, "1"),
        SmtTerm::Sub(lhs, rhs) => format!("(- {} {})", to_smtlib(lhs), to_smtlib(rhs)),
        SmtTerm::Div(lhs, rhs) => format!("(div {} {})", to_smtlib(lhs), to_smtlib(rhs)),
        SmtTerm::Mod(lhs, rhs) => format!("(mod {} {})", to_smtlib(lhs), to_smtlib(rhs)),
        SmtTerm::Abs(inner) => format!("(abs {})", to_smtlib(inner)),
        SmtTerm::Exp(base, exponent) => {
            format!("(exp {} {})", to_smtlib(base), to_smtlib(exponent))
        }
        SmtTerm::Eq(lhs, rhs) => format!("(= {} {})", to_smtlib(lhs), to_smtlib(rhs)),
        SmtTerm::Lt(lhs, rhs) => format!("(< {} {})", to_smtlib(lhs), to_smtlib(rhs)),
        SmtTerm::Le(lhs, rhs) => format!("(<= {} {})", to_smtlib(lhs), to_smtlib(rhs)),
        SmtTerm::Gt(lhs, rhs) => format!("(> {} {})", to_smtlib(lhs), to_smtlib(rhs)),
        SmtTerm::Ge(lhs, rhs) => format!("(>= {} {})", to_smtlib(lhs), to_smtlib(rhs)),
        SmtTerm::And(terms) => nary("and", terms, "true"),
        SmtTerm::Or(terms) => nary("or", terms, "false"),
        SmtTerm::Not(inner) => format!("(not {})", to_smtlib(inner)),
        SmtTerm::Implies(lhs, rhs) => {
            format!("(=> {} {})", to_smtlib(lhs), to_smtlib(rhs))
        }
        SmtTerm::Ite(cond, then, els) => {
            format!(
                "(ite {} {} {})",
                to_smtlib(cond),
                to_smtlib(then),
                to_smtlib(els)
            )
        }
    }
}

fn nary(op: &str, terms: &[SmtTerm], unit: &str) -> String {
    match terms {
        [] => unit.to_string(),
        [single] => to_smtlib(single),
        _ => {
            let inner: Vec<String> = terms.iter().map(to_smtlib).collect();
            format!("({op} {})", inner.join(" "))
        }
    }
}

/// Integer literal in SMT-LIB form; negative values become `(- n)`.
pub fn int_to_smtlib(n: &BigInt) -> String {
    if n.is_negative() {
        format!("(- {})", n.abs())
    } else {
        n.to_string()
    }
}

/// Symbols outside the simple-symbol alphabet are wrapped in `|...|`.
pub fn quote_symbol(name: &str) -> String {
    let simple = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "~!@$%^&*_-+=<>.?/".contains(c));
    if simple {
        name.to_string()
    } else {
        format!("|{name}|")
    }
}

/// Print a sort as SMT-LIB2 format.
pub fn sort_to_smtlib(sort: &SmtSort) -> &'static str {
    match sort {
        SmtSort::Bool => "Bool",
        SmtSort::Int => "Int",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn print_simple_term() {
        let term = SmtTerm::var("x").add(SmtTerm::int(1)).ge(SmtTerm::int(0));
        assert_eq!(to_smtlib(&term), "(>= (+ x 1) 0)");
    }

    #[test]
    fn print_exp_and_negative_literals() {
        let term = SmtTerm::exp(SmtTerm::int(-3), SmtTerm::var("x").neg());
        assert_eq!(to_smtlib(&term), "(exp (- 3) (- x))");
    }

    #[test]
    fn print_degenerate_nary_terms() {
        assert_eq!(to_smtlib(&SmtTerm::and(vec![])), "true");
        assert_eq!(to_smtlib(&SmtTerm::or(vec![])), "false");
        assert_eq!(to_smtlib(&SmtTerm::sum(vec![])), "0");
        assert_eq!(to_smtlib(&SmtTerm::product(vec![SmtTerm::var("y")])), "y");
    }

    #[test]
    fn quotes_non_simple_symbols() {
        assert_eq!(quote_symbol("x_1"), "x_1");
        assert_eq!(quote_symbol("a b"), "|a b|");
        assert_eq!(quote_symbol("1x"), "|1x|");
    }
}
