//! The surface AST produced by the parser.
//!
//! Every node carries the byte span it was parsed from. Expressions,
//! patterns and scalar values are closed enums; later phases match over
//! them exhaustively.

use std::fmt;

use livy_common::span::Span;

use crate::types::Type;

/// A surface expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub span: Span,
    pub kind: ExprKind,
}

impl Expr {
    pub fn new(span: Span, kind: ExprKind) -> Self {
        Expr { span, kind }
    }

    /// The unit expression `()`.
    pub fn unit(span: Span) -> Self {
        Expr::new(span, ExprKind::Unit)
    }

    /// A name reference.
    pub fn name(span: Span, name: impl Into<String>) -> Self {
        Expr::new(span, ExprKind::Name(name.into()))
    }

    /// A function application `func arg`.
    pub fn apply(span: Span, func: Expr, arg: Expr) -> Self {
        Expr::new(
            span,
            ExprKind::Apply {
                func: Box::new(func),
                arg: Box::new(arg),
            },
        )
    }

    /// A block, collapsing to its sole expression or to unit.
    ///
    /// Blocks are never empty in the tree; an empty statement list
    /// becomes `Unit` and a single statement stands on its own.
    pub fn block(span: Span, mut body: Vec<Expr>) -> Self {
        match body.len() {
            0 => Expr::unit(span),
            1 => body.pop().expect("length checked"),
            _ => Expr::new(span, ExprKind::Block(body)),
        }
    }
}

/// The expression variants of the Livy surface language.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// `func arg` -- application by juxtaposition, curried.
    Apply { func: Box<Expr>, arg: Box<Expr> },
    /// A sequence of statements. Never empty.
    Block(Vec<Expr>),
    /// `if pred then cons else alt`.
    Cond {
        pred: Box<Expr>,
        cons: Box<Expr>,
        alt: Box<Expr>,
    },
    /// `let target = value`.
    Define { target: Pattern, value: Box<Expr> },
    /// `\param -> body`.
    Function { param: Pattern, body: Box<Expr> },
    /// `[a, b, c]`.
    List(Vec<Expr>),
    /// `match subject | pat -> body | ...`.
    Match {
        subject: Box<Expr>,
        cases: Vec<MatchCase>,
    },
    /// `(first, second)`.
    Pair { first: Box<Expr>, second: Box<Expr> },
    /// A name reference.
    Name(String),
    /// A literal scalar value.
    Scalar(ScalarValue),
    /// `()`.
    Unit,
    /// `name :: Type` -- a standalone type annotation statement.
    Annotation { name: String, ty: Type },
}

/// One `| pattern -> body` case of a match expression.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCase {
    pub pattern: Pattern,
    pub body: Expr,
}

/// A literal scalar: one of the four scalar kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl ScalarValue {
    /// The nominal type name of this scalar.
    pub fn type_name(&self) -> &'static str {
        match self {
            ScalarValue::Bool(_) => "Bool",
            ScalarValue::Int(_) => "Int",
            ScalarValue::Float(_) => "Float",
            ScalarValue::String(_) => "String",
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Bool(true) => write!(f, "True"),
            ScalarValue::Bool(false) => write!(f, "False"),
            ScalarValue::Int(value) => write!(f, "{value}"),
            ScalarValue::Float(value) => write!(f, "{value}"),
            ScalarValue::String(value) => write!(f, "{value:?}"),
        }
    }
}

/// A pattern: a structural predicate that matches and binds parts of a
/// value.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub span: Span,
    pub kind: PatternKind,
}

impl Pattern {
    pub fn new(span: Span, kind: PatternKind) -> Self {
        Pattern { span, kind }
    }

    /// Whether this is the wildcard `_`, which binds nothing.
    pub fn is_wildcard(&self) -> bool {
        matches!(&self.kind, PatternKind::FreeName(name) if name == "_")
    }
}

/// The pattern variants.
#[derive(Debug, Clone, PartialEq)]
pub enum PatternKind {
    /// A binding name; `_` is the wildcard that binds nothing.
    FreeName(String),
    /// `^name` -- an equality check against an existing binding.
    PinnedName(String),
    /// A literal that the value must equal.
    Scalar(ScalarValue),
    /// `(first, second)`.
    Pair {
        first: Box<Pattern>,
        second: Box<Pattern>,
    },
    /// `[p1, p2, ..rest]`. With no initials and no rest this tests for
    /// the empty list.
    List {
        initials: Vec<Pattern>,
        rest: Option<RestName>,
    },
    /// `()`.
    Unit,
}

/// The `..rest` binder of a list pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct RestName {
    pub span: Span,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_collapses_small_bodies() {
        let span = Span::new(0, 4);
        assert_eq!(Expr::block(span, vec![]).kind, ExprKind::Unit);

        let single = Expr::name(Span::new(0, 1), "x");
        assert_eq!(Expr::block(span, vec![single.clone()]), single);

        let double = Expr::block(span, vec![single.clone(), single]);
        assert!(matches!(double.kind, ExprKind::Block(ref body) if body.len() == 2));
    }

    #[test]
    fn wildcard_is_only_underscore() {
        let wild = Pattern::new(Span::zero(), PatternKind::FreeName("_".into()));
        let name = Pattern::new(Span::zero(), PatternKind::FreeName("x".into()));
        assert!(wild.is_wildcard());
        assert!(!name.is_wildcard());
    }

    #[test]
    fn scalar_display_matches_source_syntax() {
        assert_eq!(ScalarValue::Bool(true).to_string(), "True");
        assert_eq!(ScalarValue::Int(-3).to_string(), "-3");
        assert_eq!(ScalarValue::String("hi".into()).to_string(), "\"hi\"");
    }
}
