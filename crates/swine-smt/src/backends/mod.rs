//! Concrete solver backends and SMT-LIB helpers they share.

use num::BigInt;

pub mod cvc5_backend;
pub mod smtlib_printer;
pub mod z3_backend;

/// Name of the uninterpreted function symbol standing for exponentiation.
pub const EXP_SYMBOL: &str = "exp";

/// Parse an SMT-LIB integer value as printed by solvers: `42`, `-42`,
/// `(- 42)`.
pub fn parse_int_value(text: &str) -> Option<BigInt> {
    let text = text.trim();
    if let Some(inner) = text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        let inner = inner.trim();
        let digits = inner.strip_prefix('-')?.trim();
        return digits.parse::<BigInt>().ok().map(|n| -n);
    }
    text.parse::<BigInt>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_negated_numerals() {
        assert_eq!(parse_int_value("42"), Some(BigInt::from(42)));
        assert_eq!(parse_int_value("-42"), Some(BigInt::from(-42)));
        assert_eq!(parse_int_value("(- 7)"), Some(BigInt::from(-7)));
        assert_eq!(
            parse_int_value("340282366920938463463374607431768211456"),
            Some(BigInt::from(1u8) << 128)
        );
        assert_eq!(parse_int_value("(+ 1 2)"), None);
        assert_eq!(parse_int_value("true"), None);
    }
}
