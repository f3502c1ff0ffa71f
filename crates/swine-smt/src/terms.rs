use std::fmt;

use num::{BigInt, Signed};

use crate::backends::smtlib_printer::to_smtlib;

/// Abstract SMT term representation, solver-agnostic.
///
/// `Exp` is the only node the backends do not interpret: it is translated to
/// an application of the uninterpreted function `exp : Int × Int → Int`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SmtTerm {
    /// Variable reference by name.
    Var(String),
    /// Integer literal.
    IntLit(BigInt),
    /// Boolean literal.
    BoolLit(bool),

    // Arithmetic
    Neg(Box<SmtTerm>),
    Add(Vec<SmtTerm>),
    Sub(Box<SmtTerm>, Box<SmtTerm>),
    Mul(Vec<SmtTerm>),
    /// SMT-LIB `div` (floor towards negative infinity for positive divisors).
    Div(Box<SmtTerm>, Box<SmtTerm>),
    /// SMT-LIB `mod` (always non-negative).
    Mod(Box<SmtTerm>, Box<SmtTerm>),
    Abs(Box<SmtTerm>),
    /// Abstract exponentiation `exp(base, exponent)`.
    Exp(Box<SmtTerm>, Box<SmtTerm>),

    // Comparison
    Eq(Box<SmtTerm>, Box<SmtTerm>),
    Lt(Box<SmtTerm>, Box<SmtTerm>),
    Le(Box<SmtTerm>, Box<SmtTerm>),
    Gt(Box<SmtTerm>, Box<SmtTerm>),
    Ge(Box<SmtTerm>, Box<SmtTerm>),

    // Boolean logic
    And(Vec<SmtTerm>),
    Or(Vec<SmtTerm>),
    Not(Box<SmtTerm>),
    Implies(Box<SmtTerm>, Box<SmtTerm>),

    // If-then-else
    Ite(Box<SmtTerm>, Box<SmtTerm>, Box<SmtTerm>),
}

#[allow(clippy::should_implement_trait)]
impl SmtTerm {
    pub fn var(name: impl Into<String>) -> Self {
        SmtTerm::Var(name.into())
    }

    pub fn int(n: impl Into<BigInt>) -> Self {
        SmtTerm::IntLit(n.into())
    }

    pub fn bool(b: bool) -> Self {
        SmtTerm::BoolLit(b)
    }

    pub fn exp(base: SmtTerm, exponent: SmtTerm) -> Self {
        SmtTerm::Exp(Box::new(base), Box::new(exponent))
    }

    pub fn neg(self) -> Self {
        SmtTerm::Neg(Box::new(self))
    }

    pub fn add(self, other: SmtTerm) -> Self {
        SmtTerm::Add(vec![self, other])
    }

    pub fn sub(self, other: SmtTerm) -> Self {
        SmtTerm::Sub(Box::new(self), Box::new(other))
    }

    pub fn mul(self, other: SmtTerm) -> Self {
        SmtTerm::Mul(vec![self, other])
    }

    pub fn div(self, other: SmtTerm) -> Self {
        SmtTerm::Div(Box::new(self), Box::new(other))
    }

    pub fn modulo(self, other: SmtTerm) -> Self {
        SmtTerm::Mod(Box::new(self), Box::new(other))
    }

    pub fn abs(self) -> Self {
        SmtTerm::Abs(Box::new(self))
    }

    pub fn sum(terms: Vec<SmtTerm>) -> Self {
        SmtTerm::Add(terms)
    }

    pub fn product(terms: Vec<SmtTerm>) -> Self {
        SmtTerm::Mul(terms)
    }

    pub fn eq(self, other: SmtTerm) -> Self {
        SmtTerm::Eq(Box::new(self), Box::new(other))
    }

    pub fn lt(self, other: SmtTerm) -> Self {
        SmtTerm::Lt(Box::new(self), Box::new(other))
    }

    pub fn le(self, other: SmtTerm) -> Self {
        SmtTerm::Le(Box::new(self), Box::new(other))
    }

    pub fn gt(self, other: SmtTerm) -> Self {
        SmtTerm::Gt(Box::new(self), Box::new(other))
    }

    pub fn ge(self, other: SmtTerm) -> Self {
        SmtTerm::Ge(Box::new(self), Box::new(other))
    }

    pub fn and(terms: Vec<SmtTerm>) -> Self {
        SmtTerm::And(terms)
    }

    pub fn or(terms: Vec<SmtTerm>) -> Self {
        SmtTerm::Or(terms)
    }

    pub fn not(self) -> Self {
        SmtTerm::Not(Box::new(self))
    }

    pub fn implies(self, other: SmtTerm) -> Self {
        SmtTerm::Implies(Box::new(self), Box::new(other))
    }

    pub fn ite(cond: SmtTerm, then: SmtTerm, els: SmtTerm) -> Self {
        SmtTerm::Ite(Box::new(cond), Box::new(then), Box::new(els))
    }

    /// The arithmetic negation of `self`, folding literals and stripping a
    /// leading `Neg` instead of stacking another one.
    pub fn negated(&self) -> Self {
        match self {
            SmtTerm::IntLit(n) => SmtTerm::IntLit(-n),
            SmtTerm::Neg(inner) => (**inner).clone(),
            other => SmtTerm::Neg(Box::new(other.clone())),
        }
    }

    /// `|self|` for literals, `self` with one leading `Neg` removed otherwise.
    pub fn magnitude(&self) -> Self {
        match self {
            SmtTerm::IntLit(n) => SmtTerm::IntLit(n.abs()),
            SmtTerm::Neg(inner) => (**inner).clone(),
            other => other.clone(),
        }
    }

    pub fn as_int_literal(&self) -> Option<&BigInt> {
        match self {
            SmtTerm::IntLit(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_bool_literal(&self) -> Option<bool> {
        match self {
            SmtTerm::BoolLit(b) => Some(*b),
            _ => None,
        }
    }

    /// Decompose an abstract exponentiation into `(base, exponent)`.
    pub fn as_exp(&self) -> Option<(&SmtTerm, &SmtTerm)> {
        match self {
            SmtTerm::Exp(base, exponent) => Some((base, exponent)),
            _ => None,
        }
    }

    pub fn is_exp(&self) -> bool {
        matches!(self, SmtTerm::Exp(_, _))
    }

    /// True if no variable occurs in the term.
    pub fn is_ground(&self) -> bool {
        match self {
            SmtTerm::Var(_) => false,
            SmtTerm::IntLit(_) | SmtTerm::BoolLit(_) => true,
            other => other.children().into_iter().all(SmtTerm::is_ground),
        }
    }

    /// True if an `Exp` node occurs anywhere in the term.
    pub fn contains_exp(&self) -> bool {
        self.is_exp() || self.children().into_iter().any(SmtTerm::contains_exp)
    }

    /// Direct subterms, left to right.
    pub fn children(&self) -> Vec<&SmtTerm> {
        match self {
            SmtTerm::Var(_) | SmtTerm::IntLit(_) | SmtTerm::BoolLit(_) => Vec::new(),
            SmtTerm::Neg(t) | SmtTerm::Abs(t) | SmtTerm::Not(t) => vec![t],
            SmtTerm::Add(ts) | SmtTerm::Mul(ts) | SmtTerm::And(ts) | SmtTerm::Or(ts) => {
                ts.iter().collect()
            }
            SmtTerm::Sub(l, r)
            | SmtTerm::Div(l, r)
            | SmtTerm::Mod(l, r)
            | SmtTerm::Exp(l, r)
            | SmtTerm::Eq(l, r)
            | SmtTerm::Lt(l, r)
            | SmtTerm::Le(l, r)
            | SmtTerm::Gt(l, r)
            | SmtTerm::Ge(l, r)
            | SmtTerm::Implies(l, r) => vec![l, r],
            SmtTerm::Ite(c, t, e) => vec![c, t, e],
        }
    }

    /// Rebuild the node with every direct child replaced by `f(child)`.
    pub fn map_children(&self, mut f: impl FnMut(&SmtTerm) -> SmtTerm) -> SmtTerm {
        let mut bx = |t: &SmtTerm| Box::new(f(t));
        match self {
            SmtTerm::Var(_) | SmtTerm::IntLit(_) | SmtTerm::BoolLit(_) => self.clone(),
            SmtTerm::Neg(t) => SmtTerm::Neg(bx(t)),
            SmtTerm::Abs(t) => SmtTerm::Abs(bx(t)),
            SmtTerm::Not(t) => SmtTerm::Not(bx(t)),
            SmtTerm::Add(ts) => SmtTerm::Add(ts.iter().map(|t| *bx(t)).collect()),
            SmtTerm::Mul(ts) => SmtTerm::Mul(ts.iter().map(|t| *bx(t)).collect()),
            SmtTerm::And(ts) => SmtTerm::And(ts.iter().map(|t| *bx(t)).collect()),
            SmtTerm::Or(ts) => SmtTerm::Or(ts.iter().map(|t| *bx(t)).collect()),
            SmtTerm::Sub(l, r) => SmtTerm::Sub(bx(l), bx(r)),
            SmtTerm::Div(l, r) => SmtTerm::Div(bx(l), bx(r)),
            SmtTerm::Mod(l, r) => SmtTerm::Mod(bx(l), bx(r)),
            SmtTerm::Exp(l, r) => SmtTerm::Exp(bx(l), bx(r)),
            SmtTerm::Eq(l, r) => SmtTerm::Eq(bx(l), bx(r)),
            SmtTerm::Lt(l, r) => SmtTerm::Lt(bx(l), bx(r)),
            SmtTerm::Le(l, r) => SmtTerm::Le(bx(l), bx(r)),
            SmtTerm::Gt(l, r) => SmtTerm::Gt(bx(l), bx(r)),
            SmtTerm::Ge(l, r) => SmtTerm::Ge(bx(l), bx(r)),
            SmtTerm::Implies(l, r) => SmtTerm::Implies(bx(l), bx(r)),
            SmtTerm::Ite(c, t, e) => SmtTerm::Ite(bx(c), bx(t), bx(e)),
        }
    }

    /// Number of nodes in the term tree.
    pub fn size(&self) -> usize {
        1 + self
            .children()
            .into_iter()
            .map(SmtTerm::size)
            .sum::<usize>()
    }
}

impl fmt::Display for SmtTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_smtlib(self))
    }
}

impl From<bool> for SmtTerm {
    fn from(b: bool) -> Self {
        SmtTerm::BoolLit(b)
    }
}

impl From<BigInt> for SmtTerm {
    fn from(n: BigInt) -> Self {
        SmtTerm::IntLit(n)
    }
}
