#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

use crate::ast::Span;

fn source_span(span: Span) -> miette::SourceSpan {
    (span.start, span.end.saturating_sub(span.start)).into()
}

fn named(source: &str, filename: &str) -> miette::NamedSource<String> {
    miette::NamedSource::new(filename, source.to_owned())
}

#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    #[error("Syntax error: {message}")]
    #[diagnostic(code(swine::parse::syntax))]
    Syntax {
        message: String,
        #[label("here")]
        span: miette::SourceSpan,
        #[source_code]
        src: miette::NamedSource<String>,
    },

    #[error("Malformed command: {message}")]
    #[diagnostic(code(swine::parse::command))]
    MalformedCommand {
        message: String,
        #[label("in this command")]
        span: miette::SourceSpan,
        #[source_code]
        src: miette::NamedSource<String>,
    },

    #[error("Unsupported command `{command}`")]
    #[diagnostic(
        code(swine::parse::unsupported_command),
        help("only quantifier-free integer arithmetic with exp is supported")
    )]
    UnsupportedCommand {
        command: String,
        #[label("unsupported")]
        span: miette::SourceSpan,
        #[source_code]
        src: miette::NamedSource<String>,
    },
}

impl ParseError {
    pub fn syntax(message: impl Into<String>, span: Span, source: &str, filename: &str) -> Self {
        ParseError::Syntax {
            message: message.into(),
            span: source_span(span),
            src: named(source, filename),
        }
    }

    pub fn malformed(message: impl Into<String>, span: Span, source: &str, filename: &str) -> Self {
        ParseError::MalformedCommand {
            message: message.into(),
            span: source_span(span),
            src: named(source, filename),
        }
    }

    pub fn unsupported(command: impl Into<String>, span: Span, source: &str, filename: &str) -> Self {
        ParseError::UnsupportedCommand {
            command: command.into(),
            span: source_span(span),
            src: named(source, filename),
        }
    }
}

/// Errors found while resolving and type-checking terms.
///
/// The elaborator only knows byte offsets; the driver attaches the script
/// with [`ElaborationError::with_source_context`] before rendering.
#[derive(Debug, Error, Diagnostic)]
pub enum ElaborationError {
    #[error("Unknown symbol `{name}`")]
    #[diagnostic(code(swine::elaborate::unknown_symbol))]
    UnknownSymbol {
        name: String,
        #[label("not declared")]
        span: miette::SourceSpan,
        #[source_code]
        src: miette::NamedSource<String>,
    },

    #[error("Symbol `{name}` is already declared")]
    #[diagnostic(code(swine::elaborate::duplicate))]
    Duplicate {
        name: String,
        #[label("duplicate")]
        span: miette::SourceSpan,
        #[source_code]
        src: miette::NamedSource<String>,
    },

    #[error("Sort mismatch: expected {expected}, found {found}")]
    #[diagnostic(code(swine::elaborate::sort))]
    SortMismatch {
        expected: String,
        found: String,
        #[label("has sort {found}")]
        span: miette::SourceSpan,
        #[source_code]
        src: miette::NamedSource<String>,
    },

    #[error("`{name}` expects {expected} argument(s), got {found}")]
    #[diagnostic(code(swine::elaborate::arity))]
    Arity {
        name: String,
        expected: String,
        found: usize,
        #[label("wrong number of arguments")]
        span: miette::SourceSpan,
        #[source_code]
        src: miette::NamedSource<String>,
    },

    #[error("Unsupported term: {what}")]
    #[diagnostic(
        code(swine::elaborate::unsupported),
        help("terms may use Int and Bool constants, linear arithmetic, div, mod, abs and exp")
    )]
    Unsupported {
        what: String,
        #[label("unsupported")]
        span: miette::SourceSpan,
        #[source_code]
        src: miette::NamedSource<String>,
    },
}

impl ElaborationError {
    pub fn unknown_symbol(name: impl Into<String>, span: Span) -> Self {
        ElaborationError::UnknownSymbol {
            name: name.into(),
            span: source_span(span),
            src: named("", ""),
        }
    }

    pub fn duplicate(name: impl Into<String>, span: Span) -> Self {
        ElaborationError::Duplicate {
            name: name.into(),
            span: source_span(span),
            src: named("", ""),
        }
    }

    pub fn sort_mismatch(expected: impl ToString, found: impl ToString, span: Span) -> Self {
        ElaborationError::SortMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
            span: source_span(span),
            src: named("", ""),
        }
    }

    pub fn arity(name: impl Into<String>, expected: impl Into<String>, found: usize, span: Span) -> Self {
        ElaborationError::Arity {
            name: name.into(),
            expected: expected.into(),
            found,
            span: source_span(span),
            src: named("", ""),
        }
    }

    pub fn unsupported(what: impl Into<String>, span: Span) -> Self {
        ElaborationError::Unsupported {
            what: what.into(),
            span: source_span(span),
            src: named("", ""),
        }
    }

    /// Attaches the script text so miette can render a snippet.
    pub fn with_source_context(self, source: &str, filename: &str) -> Self {
        let src = named(source, filename);
        match self {
            ElaborationError::UnknownSymbol { name, span, .. } => {
                ElaborationError::UnknownSymbol { name, span, src }
            }
            ElaborationError::Duplicate { name, span, .. } => {
                ElaborationError::Duplicate { name, span, src }
            }
            ElaborationError::SortMismatch {
                expected,
                found,
                span,
                ..
            } => ElaborationError::SortMismatch {
                expected,
                found,
                span,
                src,
            },
            ElaborationError::Arity {
                name,
                expected,
                found,
                span,
                ..
            } => ElaborationError::Arity {
                name,
                expected,
                found,
                span,
                src,
            },
            ElaborationError::Unsupported { what, span, .. } => {
                ElaborationError::Unsupported { what, span, src }
            }
        }
    }

    pub fn span(&self) -> miette::SourceSpan {
        match self {
            ElaborationError::UnknownSymbol { span, .. }
            | ElaborationError::Duplicate { span, .. }
            | ElaborationError::SortMismatch { span, .. }
            | ElaborationError::Arity { span, .. }
            | ElaborationError::Unsupported { span, .. } => *span,
        }
    }
}
