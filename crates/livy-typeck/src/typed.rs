//! The typed AST: the surface tree with a type on every expression.
//!
//! Patterns are carried over from the surface AST unchanged -- they are
//! scrutinised structurally, not polymorphically, so they need no types
//! of their own.

use livy_common::span::Span;
use livy_parser::ast::{Pattern, ScalarValue};
use livy_parser::types::Type;

/// A typed expression.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedExpr {
    pub span: Span,
    pub ty: Type,
    pub kind: TypedExprKind,
}

impl TypedExpr {
    pub fn new(span: Span, ty: Type, kind: TypedExprKind) -> Self {
        TypedExpr { span, ty, kind }
    }
}

/// The expression variants, mirroring the surface AST.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedExprKind {
    Apply {
        func: Box<TypedExpr>,
        arg: Box<TypedExpr>,
    },
    Block(Vec<TypedExpr>),
    Cond {
        pred: Box<TypedExpr>,
        cons: Box<TypedExpr>,
        alt: Box<TypedExpr>,
    },
    Define {
        target: Pattern,
        value: Box<TypedExpr>,
    },
    Function {
        param: Pattern,
        body: Box<TypedExpr>,
    },
    List(Vec<TypedExpr>),
    Match {
        subject: Box<TypedExpr>,
        cases: Vec<TypedMatchCase>,
    },
    Pair {
        first: Box<TypedExpr>,
        second: Box<TypedExpr>,
    },
    Name(String),
    Scalar(ScalarValue),
    Unit,
    /// A `name :: Type` statement; the declared type is recorded in
    /// scope during inference and the statement itself has type `Unit`.
    Annotation { name: String, declared: Type },
}

/// One typed case of a match expression.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedMatchCase {
    pub pattern: Pattern,
    pub body: TypedExpr,
}
