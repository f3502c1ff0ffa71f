use std::fmt;

use num::BigInt;
use swine_smt::backends::smtlib_printer::quote_symbol;
use swine_smt::sorts::SmtSort;

/// Source span for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// A spanned AST node.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// An untyped S-expression.
///
/// Terms stay in this form until elaboration, so that `get-value` can echo
/// them back exactly as the user wrote them.
#[derive(Debug, Clone, PartialEq)]
pub enum SExpr {
    /// Simple or quoted symbol, with the bars of a quoted symbol removed.
    Symbol(String, Span),
    /// `:name`, stored without the colon.
    Keyword(String, Span),
    Numeral(BigInt, Span),
    /// Decimal, hexadecimal and binary constants, kept verbatim.
    Constant(String, Span),
    /// String literal with `""` escapes resolved.
    Str(String, Span),
    List(Vec<SExpr>, Span),
}

impl SExpr {
    pub fn span(&self) -> Span {
        match self {
            SExpr::Symbol(_, span)
            | SExpr::Keyword(_, span)
            | SExpr::Numeral(_, span)
            | SExpr::Constant(_, span)
            | SExpr::Str(_, span)
            | SExpr::List(_, span) => *span,
        }
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            SExpr::Symbol(name, _) => Some(name),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[SExpr]> {
        match self {
            SExpr::List(items, _) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for SExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SExpr::Symbol(name, _) => f.write_str(&quote_symbol(name)),
            SExpr::Keyword(name, _) => write!(f, ":{name}"),
            SExpr::Numeral(n, _) => write!(f, "{n}"),
            SExpr::Constant(text, _) => f.write_str(text),
            SExpr::Str(text, _) => write!(f, "\"{}\"", text.replace('"', "\"\"")),
            SExpr::List(items, _) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// A `define-fun` with its body left unelaborated.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<(String, SmtSort)>,
    pub sort: SmtSort,
    pub body: SExpr,
}

/// The SMT-LIB commands the solver understands.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetLogic(String),
    /// Option name without the colon, and its value as written.
    SetOption { key: String, value: SExpr },
    SetInfo { key: String, value: Option<SExpr> },
    GetInfo(String),
    /// Also produced by a nullary `declare-fun`.
    DeclareConst { name: String, sort: SmtSort },
    DefineFun(FunctionDef),
    Assert(SExpr),
    CheckSat,
    CheckSatAssuming(Vec<SExpr>),
    GetModel,
    GetValue(Vec<SExpr>),
    GetUnsatAssumptions,
    Push(u32),
    Pop(u32),
    Reset,
    ResetAssertions,
    Echo(String),
    Exit,
}

/// A parsed script.
pub type Script = Vec<Spanned<Command>>;
