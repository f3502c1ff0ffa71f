#![allow(clippy::result_large_err)]

use num::BigInt;
use pest::Parser;
use pest_derive::Parser;
use swine_smt::sorts::SmtSort;

use crate::ast::*;
use crate::errors::ParseError;

#[derive(Parser)]
#[grammar = "smtlib.pest"]
struct SmtLibParser;

type Pair<'a> = pest::iterators::Pair<'a, Rule>;

fn span_from(pair: &Pair<'_>) -> Span {
    let s = pair.as_span();
    Span::new(s.start(), s.end())
}

/// Parse source text into S-expressions without interpreting commands.
pub fn parse_sexprs(source: &str, filename: &str) -> Result<Vec<SExpr>, ParseError> {
    let pairs = SmtLibParser::parse(Rule::script, source).map_err(|e| {
        let (start, end) = match e.location {
            pest::error::InputLocation::Pos(p) => (p, p + 1),
            pest::error::InputLocation::Span((s, e)) => (s, e),
        };
        ParseError::syntax(format!("{e}"), Span::new(start, end), source, filename)
    })?;

    let mut exprs = Vec::new();
    for script in pairs {
        for pair in script.into_inner() {
            if pair.as_rule() == Rule::EOI {
                continue;
            }
            exprs.push(build_sexpr(pair, source, filename)?);
        }
    }
    Ok(exprs)
}

/// Parse an SMT-LIB script.
pub fn parse_script(source: &str, filename: &str) -> Result<Script, ParseError> {
    let reader = CommandReader { source, filename };
    parse_sexprs(source, filename)?
        .iter()
        .map(|expr| reader.command(expr))
        .collect()
}

fn build_sexpr(pair: Pair<'_>, source: &str, filename: &str) -> Result<SExpr, ParseError> {
    let span = span_from(&pair);
    let text = pair.as_str();
    Ok(match pair.as_rule() {
        Rule::list => {
            let items = pair
                .into_inner()
                .map(|inner| build_sexpr(inner, source, filename))
                .collect::<Result<Vec<_>, _>>()?;
            SExpr::List(items, span)
        }
        Rule::numeral => {
            let n = text.parse::<BigInt>().map_err(|e| {
                ParseError::syntax(format!("bad numeral: {e}"), span, source, filename)
            })?;
            SExpr::Numeral(n, span)
        }
        Rule::decimal | Rule::hexadecimal | Rule::binary => SExpr::Constant(text.to_string(), span),
        Rule::string => {
            let inner = &text[1..text.len() - 1];
            SExpr::Str(inner.replace("\"\"", "\""), span)
        }
        Rule::keyword => SExpr::Keyword(text[1..].to_string(), span),
        Rule::quoted_symbol => SExpr::Symbol(text[1..text.len() - 1].to_string(), span),
        Rule::simple_symbol => SExpr::Symbol(text.to_string(), span),
        other => {
            return Err(ParseError::syntax(
                format!("unexpected {other:?}"),
                span,
                source,
                filename,
            ))
        }
    })
}

struct CommandReader<'a> {
    source: &'a str,
    filename: &'a str,
}

impl CommandReader<'_> {
    fn malformed(&self, message: impl Into<String>, span: Span) -> ParseError {
        ParseError::malformed(message, span, self.source, self.filename)
    }

    fn command(&self, expr: &SExpr) -> Result<Spanned<Command>, ParseError> {
        let span = expr.span();
        let Some(items) = expr.as_list() else {
            return Err(self.malformed("expected a parenthesized command", span));
        };
        let Some((head, args)) = items.split_first() else {
            return Err(self.malformed("empty command", span));
        };
        let Some(name) = head.as_symbol() else {
            return Err(self.malformed("command name must be a symbol", head.span()));
        };

        let command = match name {
            "set-logic" => Command::SetLogic(self.symbol_arg(name, args, span)?),
            "set-option" => match args {
                [SExpr::Keyword(key, _), value] => Command::SetOption {
                    key: key.clone(),
                    value: value.clone(),
                },
                _ => return Err(self.malformed("usage: (set-option :key value)", span)),
            },
            "set-info" => match args {
                [SExpr::Keyword(key, _)] => Command::SetInfo {
                    key: key.clone(),
                    value: None,
                },
                [SExpr::Keyword(key, _), value] => Command::SetInfo {
                    key: key.clone(),
                    value: Some(value.clone()),
                },
                _ => return Err(self.malformed("usage: (set-info :key [value])", span)),
            },
            "get-info" => match args {
                [SExpr::Keyword(key, _)] => Command::GetInfo(key.clone()),
                _ => return Err(self.malformed("usage: (get-info :key)", span)),
            },
            "declare-const" => match args {
                [SExpr::Symbol(name, _), sort] => Command::DeclareConst {
                    name: name.clone(),
                    sort: self.sort(sort)?,
                },
                _ => return Err(self.malformed("usage: (declare-const name sort)", span)),
            },
            "declare-fun" => match args {
                [SExpr::Symbol(name, _), SExpr::List(params, params_span), sort] => {
                    if !params.is_empty() {
                        return Err(ParseError::unsupported(
                            "declare-fun with arguments",
                            *params_span,
                            self.source,
                            self.filename,
                        ));
                    }
                    Command::DeclareConst {
                        name: name.clone(),
                        sort: self.sort(sort)?,
                    }
                }
                _ => return Err(self.malformed("usage: (declare-fun name () sort)", span)),
            },
            "define-fun" => match args {
                [SExpr::Symbol(name, _), SExpr::List(params, _), sort, body] => {
                    Command::DefineFun(FunctionDef {
                        name: name.clone(),
                        params: params
                            .iter()
                            .map(|p| self.sorted_var(p))
                            .collect::<Result<_, _>>()?,
                        sort: self.sort(sort)?,
                        body: body.clone(),
                    })
                }
                _ => {
                    return Err(self.malformed(
                        "usage: (define-fun name ((param sort)*) sort body)",
                        span,
                    ))
                }
            },
            "assert" => match args {
                [term] => Command::Assert(term.clone()),
                _ => return Err(self.malformed("usage: (assert term)", span)),
            },
            "check-sat" => {
                self.no_args(name, args, span)?;
                Command::CheckSat
            }
            "check-sat-assuming" => match args {
                [SExpr::List(literals, _)] => Command::CheckSatAssuming(literals.clone()),
                _ => return Err(self.malformed("usage: (check-sat-assuming (literal*))", span)),
            },
            "get-model" => {
                self.no_args(name, args, span)?;
                Command::GetModel
            }
            "get-value" => match args {
                [SExpr::List(terms, _)] if !terms.is_empty() => Command::GetValue(terms.clone()),
                _ => return Err(self.malformed("usage: (get-value (term+))", span)),
            },
            "get-unsat-assumptions" => {
                self.no_args(name, args, span)?;
                Command::GetUnsatAssumptions
            }
            "push" => Command::Push(self.levels(args, span)?),
            "pop" => Command::Pop(self.levels(args, span)?),
            "reset" => {
                self.no_args(name, args, span)?;
                Command::Reset
            }
            "reset-assertions" => {
                self.no_args(name, args, span)?;
                Command::ResetAssertions
            }
            "echo" => match args {
                [SExpr::Str(text, _)] => Command::Echo(text.clone()),
                _ => return Err(self.malformed("usage: (echo \"text\")", span)),
            },
            "exit" => {
                self.no_args(name, args, span)?;
                Command::Exit
            }
            other => {
                return Err(ParseError::unsupported(
                    other,
                    head.span(),
                    self.source,
                    self.filename,
                ))
            }
        };
        Ok(Spanned::new(command, span))
    }

    fn no_args(&self, name: &str, args: &[SExpr], span: Span) -> Result<(), ParseError> {
        if args.is_empty() {
            Ok(())
        } else {
            Err(self.malformed(format!("`{name}` takes no arguments"), span))
        }
    }

    fn symbol_arg(&self, name: &str, args: &[SExpr], span: Span) -> Result<String, ParseError> {
        match args {
            [SExpr::Symbol(value, _)] => Ok(value.clone()),
            _ => Err(self.malformed(format!("`{name}` expects one symbol"), span)),
        }
    }

    fn levels(&self, args: &[SExpr], span: Span) -> Result<u32, ParseError> {
        match args {
            [] => Ok(1),
            [SExpr::Numeral(n, n_span)] => u32::try_from(n)
                .map_err(|_| self.malformed(format!("scope count {n} is too large"), *n_span)),
            _ => Err(self.malformed("expected an optional numeral", span)),
        }
    }

    fn sort(&self, expr: &SExpr) -> Result<SmtSort, ParseError> {
        match expr {
            SExpr::Symbol(name, _) if name == "Int" => Ok(SmtSort::Int),
            SExpr::Symbol(name, _) if name == "Bool" => Ok(SmtSort::Bool),
            other => Err(ParseError::unsupported(
                format!("sort {other}"),
                other.span(),
                self.source,
                self.filename,
            )),
        }
    }

    fn sorted_var(&self, expr: &SExpr) -> Result<(String, SmtSort), ParseError> {
        match expr.as_list() {
            Some([SExpr::Symbol(name, _), sort]) => Ok((name.clone(), self.sort(sort)?)),
            _ => Err(self.malformed("expected (name sort)", expr.span())),
        }
    }
}
