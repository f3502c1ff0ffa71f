//! Resolution and sort checking of S-expression terms.
//!
//! The [`Elaborator`] keeps its own scoped symbol table in step with the
//! script's `push`/`pop`, so terms can be checked before they reach the
//! engine. `define-fun` bodies are expanded at every use and `let` bindings
//! are substituted, which leaves only constants in the resulting terms.

#![allow(clippy::result_large_err)]

use std::collections::HashMap;

use indexmap::IndexMap;
use swine_smt::sorts::SmtSort;
use swine_smt::terms::SmtTerm;

use crate::ast::{FunctionDef, SExpr, Span};
use crate::errors::ElaborationError;

type Result<T> = std::result::Result<T, ElaborationError>;

const INT: SmtSort = SmtSort::Int;
const BOOL: SmtSort = SmtSort::Bool;

/// Let-bound names visible at a point in a term, innermost last.
type Bindings = Vec<HashMap<String, (SmtTerm, SmtSort)>>;

#[derive(Debug, Default)]
struct Scope {
    constants: IndexMap<String, SmtSort>,
    functions: IndexMap<String, FunctionDef>,
}

/// An elaborated argument together with where it came from.
struct Arg {
    term: SmtTerm,
    sort: SmtSort,
    span: Span,
}

#[derive(Debug)]
pub struct Elaborator {
    scopes: Vec<Scope>,
}

impl Default for Elaborator {
    fn default() -> Self {
        Self::new()
    }
}

impl Elaborator {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
        }
    }

    pub fn declare(&mut self, name: &str, sort: SmtSort, span: Span) -> Result<()> {
        self.check_fresh(name, span)?;
        self.top_mut().constants.insert(name.to_string(), sort);
        Ok(())
    }

    /// Checks a `define-fun` body and records it for expansion.
    pub fn define(&mut self, def: &FunctionDef, span: Span) -> Result<()> {
        self.check_fresh(&def.name, span)?;
        let params = def
            .params
            .iter()
            .map(|(name, sort)| (name.clone(), (SmtTerm::var(name.as_str()), *sort)))
            .collect();
        let body = self.term(&def.body, &mut vec![params])?;
        if body.1 != def.sort {
            return Err(ElaborationError::sort_mismatch(
                def.sort,
                body.1,
                def.body.span(),
            ));
        }
        self.top_mut()
            .functions
            .insert(def.name.clone(), def.clone());
        Ok(())
    }

    pub fn push(&mut self, n: u32) {
        for _ in 0..n {
            self.scopes.push(Scope::default());
        }
    }

    /// Drops up to `n` scopes; the global scope is never dropped.
    pub fn pop(&mut self, n: u32) {
        for _ in 0..n {
            if self.scopes.len() == 1 {
                break;
            }
            self.scopes.pop();
        }
    }

    pub fn reset(&mut self) {
        self.scopes = vec![Scope::default()];
    }

    pub fn sort_of(&self, name: &str) -> Option<SmtSort> {
        self.scopes
            .iter()
            .rev()
            .find_map(|s| s.constants.get(name).copied())
    }

    pub fn elaborate(&self, expr: &SExpr) -> Result<(SmtTerm, SmtSort)> {
        self.term(expr, &mut Vec::new())
    }

    pub fn elaborate_formula(&self, expr: &SExpr) -> Result<SmtTerm> {
        let (term, sort) = self.elaborate(expr)?;
        if sort != SmtSort::Bool {
            return Err(ElaborationError::sort_mismatch(SmtSort::Bool, sort, expr.span()));
        }
        Ok(term)
    }

    fn top_mut(&mut self) -> &mut Scope {
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }

    fn function(&self, name: &str) -> Option<&FunctionDef> {
        self.scopes.iter().rev().find_map(|s| s.functions.get(name))
    }

    fn check_fresh(&self, name: &str, span: Span) -> Result<()> {
        if self.sort_of(name).is_some() || self.function(name).is_some() {
            return Err(ElaborationError::duplicate(name, span));
        }
        Ok(())
    }

    fn term(&self, expr: &SExpr, bindings: &mut Bindings) -> Result<(SmtTerm, SmtSort)> {
        match expr {
            SExpr::Numeral(n, _) => Ok((SmtTerm::int(n.clone()), SmtSort::Int)),
            SExpr::Symbol(name, span) => self.symbol(name, *span, bindings),
            SExpr::List(items, span) => match items.split_first() {
                Some((SExpr::Symbol(head, head_span), args)) => {
                    self.application(head, *head_span, args, *span, bindings)
                }
                Some((other, _)) => Err(ElaborationError::unsupported(
                    format!("application of {other}"),
                    other.span(),
                )),
                None => Err(ElaborationError::unsupported("empty application", *span)),
            },
            SExpr::Constant(text, span) => Err(ElaborationError::unsupported(
                format!("constant {text}"),
                *span,
            )),
            SExpr::Str(_, span) => Err(ElaborationError::unsupported("string literal", *span)),
            SExpr::Keyword(name, span) => Err(ElaborationError::unsupported(
                format!("keyword :{name}"),
                *span,
            )),
        }
    }

    fn symbol(&self, name: &str, span: Span, bindings: &mut Bindings) -> Result<(SmtTerm, SmtSort)> {
        if let Some(bound) = bindings.iter().rev().find_map(|b| b.get(name)) {
            return Ok(bound.clone());
        }
        match name {
            "true" => return Ok((SmtTerm::bool(true), SmtSort::Bool)),
            "false" => return Ok((SmtTerm::bool(false), SmtSort::Bool)),
            _ => {}
        }
        if let Some(sort) = self.sort_of(name) {
            return Ok((SmtTerm::var(name), sort));
        }
        if self.function(name).is_some() {
            return self.expand(name, &[], span, bindings);
        }
        Err(ElaborationError::unknown_symbol(name, span))
    }

    fn application(
        &self,
        head: &str,
        head_span: Span,
        args: &[SExpr],
        span: Span,
        bindings: &mut Bindings,
    ) -> Result<(SmtTerm, SmtSort)> {
        match head {
            "let" => return self.let_binding(args, span, bindings),
            "!" => {
                return match args.first() {
                    Some(inner) => self.term(inner, bindings),
                    None => Err(ElaborationError::arity("!", "at least 1", 0, span)),
                }
            }
            "_" => return Err(ElaborationError::unsupported("indexed identifier", span)),
            "forall" | "exists" => {
                return Err(ElaborationError::unsupported("quantifier", head_span))
            }
            _ => {}
        }
        if self.function(head).is_some()
            && bindings.iter().all(|b| !b.contains_key(head))
        {
            return self.expand(head, args, span, bindings);
        }

        let args = args
            .iter()
            .map(|a| {
                let (term, sort) = self.term(a, bindings)?;
                Ok(Arg {
                    term,
                    sort,
                    span: a.span(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        match head {
            "+" => {
                at_least(head, &args, 1, span)?;
                Ok((SmtTerm::sum(expect_all(args, INT)?), INT))
            }
            "*" => {
                at_least(head, &args, 1, span)?;
                Ok((SmtTerm::product(expect_all(args, INT)?), INT))
            }
            "-" => {
                at_least(head, &args, 1, span)?;
                let mut terms = expect_all(args, INT)?.into_iter();
                let Some(first) = terms.next() else {
                    return Err(ElaborationError::arity(head, "at least 1", 0, span));
                };
                if terms.as_slice().is_empty() {
                    return Ok((negate(first), INT));
                }
                Ok((terms.fold(first, SmtTerm::sub), INT))
            }
            "div" => {
                at_least(head, &args, 2, span)?;
                let mut terms = expect_all(args, INT)?.into_iter();
                let first = terms.next().unwrap_or_else(|| SmtTerm::int(0));
                Ok((terms.fold(first, SmtTerm::div), INT))
            }
            "mod" => {
                let [lhs, rhs] = exactly::<2>(head, args, span)?;
                Ok((expect(lhs, INT)?.modulo(expect(rhs, INT)?), INT))
            }
            "abs" => {
                let [inner] = exactly::<1>(head, args, span)?;
                Ok((expect(inner, INT)?.abs(), INT))
            }
            "exp" | "^" => {
                let [base, exponent] = exactly::<2>(head, args, span)?;
                Ok((SmtTerm::exp(expect(base, INT)?, expect(exponent, INT)?), INT))
            }
            "<" | "<=" | ">" | ">=" => {
                at_least(head, &args, 2, span)?;
                let terms = expect_all(args, INT)?;
                let compare: fn(SmtTerm, SmtTerm) -> SmtTerm = match head {
                    "<" => SmtTerm::lt,
                    "<=" => SmtTerm::le,
                    ">" => SmtTerm::gt,
                    _ => SmtTerm::ge,
                };
                Ok((chain(&terms, compare), BOOL))
            }
            "=" => {
                at_least(head, &args, 2, span)?;
                let sort = args[0].sort;
                let terms = expect_all(args, sort)?;
                Ok((chain(&terms, SmtTerm::eq), BOOL))
            }
            "distinct" => {
                at_least(head, &args, 2, span)?;
                let sort = args[0].sort;
                let terms = expect_all(args, sort)?;
                let mut pairs = Vec::new();
                for (i, lhs) in terms.iter().enumerate() {
                    for rhs in &terms[i + 1..] {
                        pairs.push(lhs.clone().eq(rhs.clone()).not());
                    }
                }
                Ok((conjunction(pairs), BOOL))
            }
            "and" => Ok((SmtTerm::and(expect_all(args, BOOL)?), BOOL)),
            "or" => Ok((SmtTerm::or(expect_all(args, BOOL)?), BOOL)),
            "not" => {
                let [inner] = exactly::<1>(head, args, span)?;
                Ok((expect(inner, BOOL)?.not(), BOOL))
            }
            "=>" => {
                at_least(head, &args, 2, span)?;
                let mut terms = expect_all(args, BOOL)?;
                let mut result = terms.pop().unwrap_or_else(|| SmtTerm::bool(true));
                while let Some(premise) = terms.pop() {
                    result = premise.implies(result);
                }
                Ok((result, BOOL))
            }
            "xor" => {
                at_least(head, &args, 2, span)?;
                let mut terms = expect_all(args, BOOL)?.into_iter();
                let first = terms.next().unwrap_or_else(|| SmtTerm::bool(false));
                Ok((terms.fold(first, |acc, t| acc.eq(t).not()), BOOL))
            }
            "ite" => {
                let [cond, then, els] = exactly::<3>(head, args, span)?;
                let sort = then.sort;
                Ok((
                    SmtTerm::ite(expect(cond, BOOL)?, expect(then, sort)?, expect(els, sort)?),
                    sort,
                ))
            }
            _ if self.sort_of(head).is_some() => {
                Err(ElaborationError::arity(head, "0", args.len(), span))
            }
            _ => Err(ElaborationError::unknown_symbol(head, head_span)),
        }
    }

    /// `(let ((x t) ...) body)`: all right-hand sides are elaborated in the
    /// outer bindings.
    fn let_binding(
        &self,
        args: &[SExpr],
        span: Span,
        bindings: &mut Bindings,
    ) -> Result<(SmtTerm, SmtSort)> {
        let [SExpr::List(pairs, _), body] = args else {
            return Err(ElaborationError::arity("let", "2", args.len(), span));
        };
        let mut frame = HashMap::new();
        for pair in pairs {
            let Some([SExpr::Symbol(name, _), value]) = pair.as_list() else {
                return Err(ElaborationError::unsupported(
                    format!("let binding {pair}"),
                    pair.span(),
                ));
            };
            let value = self.term(value, bindings)?;
            frame.insert(name.clone(), value);
        }
        bindings.push(frame);
        let result = self.term(body, bindings);
        bindings.pop();
        result
    }

    fn expand(
        &self,
        name: &str,
        args: &[SExpr],
        span: Span,
        bindings: &mut Bindings,
    ) -> Result<(SmtTerm, SmtSort)> {
        let Some(def) = self.function(name) else {
            return Err(ElaborationError::unknown_symbol(name, span));
        };
        if def.params.len() != args.len() {
            return Err(ElaborationError::arity(
                name,
                def.params.len().to_string(),
                args.len(),
                span,
            ));
        }
        let mut frame = HashMap::new();
        for ((param, sort), arg) in def.params.iter().zip(args) {
            let (term, found) = self.term(arg, bindings)?;
            if found != *sort {
                return Err(ElaborationError::sort_mismatch(sort, found, arg.span()));
            }
            frame.insert(param.clone(), (term, *sort));
        }
        // The body only sees its parameters, not the caller's let bindings.
        self.term(&def.body, &mut vec![frame])
    }
}

fn negate(term: SmtTerm) -> SmtTerm {
    match term {
        SmtTerm::IntLit(n) => SmtTerm::IntLit(-n),
        other => other.neg(),
    }
}

fn expect(arg: Arg, sort: SmtSort) -> Result<SmtTerm> {
    if arg.sort == sort {
        Ok(arg.term)
    } else {
        Err(ElaborationError::sort_mismatch(sort, arg.sort, arg.span))
    }
}

fn expect_all(args: Vec<Arg>, sort: SmtSort) -> Result<Vec<SmtTerm>> {
    args.into_iter().map(|a| expect(a, sort)).collect()
}

fn at_least(name: &str, args: &[Arg], min: usize, span: Span) -> Result<()> {
    if args.len() < min {
        return Err(ElaborationError::arity(
            name,
            format!("at least {min}"),
            args.len(),
            span,
        ));
    }
    Ok(())
}

fn exactly<const N: usize>(name: &str, args: Vec<Arg>, span: Span) -> Result<[Arg; N]> {
    let found = args.len();
    args.try_into()
        .map_err(|_| ElaborationError::arity(name, N.to_string(), found, span))
}

/// `(op a b c)` as `(and (op a b) (op b c))`.
fn chain(terms: &[SmtTerm], op: fn(SmtTerm, SmtTerm) -> SmtTerm) -> SmtTerm {
    let links = terms
        .windows(2)
        .map(|w| op(w[0].clone(), w[1].clone()))
        .collect();
    conjunction(links)
}

fn conjunction(mut terms: Vec<SmtTerm>) -> SmtTerm {
    if terms.len() == 1 {
        terms.remove(0)
    } else {
        SmtTerm::and(terms)
    }
}
