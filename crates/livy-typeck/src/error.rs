use std::fmt;

use livy_common::diag::Diagnostic;
use livy_common::span::Span;
use livy_parser::types::{Type, TypeVar};

/// An error raised during type inference.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeError {
    /// Two types that cannot be made equal.
    Mismatch { left: Type, right: Type },
    /// A unification variable occurring inside its own solution, which
    /// would produce an infinite type.
    Circular { var: TypeVar, ty: Type },
    /// A name used without a definition in any enclosing scope.
    UndefinedName { name: String, span: Span },
}

impl TypeError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            TypeError::Mismatch { left, right } => Diagnostic::new(
                "type_mismatch",
                format!("expected `{left}` but found `{right}`"),
            )
            .with_span(left.span().merge(right.span()))
            .with_note("the two sides of this expression must have the same type"),
            TypeError::Circular { var, ty } => Diagnostic::new(
                "circular_type",
                format!("the type `{}` would have to contain itself", var.name),
            )
            .with_span(var.span.merge(ty.span()))
            .with_note(format!("solving here requires `{}` = `{ty}`", var.name)),
            TypeError::UndefinedName { name, span } => {
                Diagnostic::new("undefined_name", format!("`{name}` is not defined"))
                    .with_span(*span)
            }
        }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::Mismatch { left, right } => {
                write!(f, "cannot unify `{left}` with `{right}`")
            }
            TypeError::Circular { var, .. } => {
                write!(f, "infinite type arising from `{}`", var.name)
            }
            TypeError::UndefinedName { name, .. } => write!(f, "`{name}` is not defined"),
        }
    }
}

impl std::error::Error for TypeError {}
