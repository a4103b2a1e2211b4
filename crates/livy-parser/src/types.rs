//! The type AST shared by annotations and inference.
//!
//! Types are curried applications over nominal constructors: a function
//! type is `((->) a) b` and a pair type is `((,) a) b`, so the whole tier
//! needs only four variants. `TypeVar` identity is its name -- spans are
//! carried for diagnostics but ignored by equality and hashing, which is
//! what lets substitution maps treat two mentions of `a` as one variable.

use std::fmt;
use std::hash::{Hash, Hasher};

use rustc_hash::FxHashSet;

use livy_common::span::Span;

/// A unification variable, identified by name.
#[derive(Debug, Clone)]
pub struct TypeVar {
    pub span: Span,
    pub name: String,
}

impl TypeVar {
    pub fn new(span: Span, name: impl Into<String>) -> Self {
        TypeVar {
            span,
            name: name.into(),
        }
    }
}

impl PartialEq for TypeVar {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for TypeVar {}

impl Hash for TypeVar {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

/// A Livy type.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// A nominal type: `Int`, `Float`, `Bool`, `String`, `Unit`, `List`,
    /// `->`, `,`.
    Name { span: Span, name: String },
    /// A curried type application.
    Apply {
        span: Span,
        caller: Box<Type>,
        callee: Box<Type>,
    },
    /// A unification variable.
    Var(TypeVar),
    /// A universally quantified type. Never nested directly inside
    /// another scheme.
    Scheme {
        span: Span,
        body: Box<Type>,
        bound: FxHashSet<TypeVar>,
    },
}

impl Type {
    pub fn span(&self) -> Span {
        match self {
            Type::Name { span, .. } => *span,
            Type::Apply { span, .. } => *span,
            Type::Var(var) => var.span,
            Type::Scheme { span, .. } => *span,
        }
    }

    pub fn name(span: Span, name: impl Into<String>) -> Self {
        Type::Name {
            span,
            name: name.into(),
        }
    }

    pub fn var(span: Span, name: impl Into<String>) -> Self {
        Type::Var(TypeVar::new(span, name))
    }

    pub fn apply(span: Span, caller: Type, callee: Type) -> Self {
        Type::Apply {
            span,
            caller: Box::new(caller),
            callee: Box::new(callee),
        }
    }

    /// A function type `arg -> ret`, i.e. `((->) arg) ret`.
    pub fn func(span: Span, arg: Type, ret: Type) -> Self {
        Type::apply(span, Type::apply(span, Type::name(span, "->"), arg), ret)
    }

    /// A pair type `(first, second)`, i.e. `((,) first) second`.
    pub fn pair(span: Span, first: Type, second: Type) -> Self {
        Type::apply(
            span,
            Type::apply(span, Type::name(span, ","), first),
            second,
        )
    }

    /// A list type `List[elem]`.
    pub fn list(span: Span, elem: Type) -> Self {
        Type::apply(span, Type::name(span, "List"), elem)
    }

    pub fn unit(span: Span) -> Self {
        Type::name(span, "Unit")
    }

    /// Deconstruct `((->) a) b` into `(a, b)`.
    pub fn as_func(&self) -> Option<(&Type, &Type)> {
        self.as_binary("->")
    }

    /// Deconstruct `((,) a) b` into `(a, b)`.
    pub fn as_pair(&self) -> Option<(&Type, &Type)> {
        self.as_binary(",")
    }

    fn as_binary(&self, op: &str) -> Option<(&Type, &Type)> {
        if let Type::Apply { caller, callee, .. } = self {
            if let Type::Apply {
                caller: inner,
                callee: left,
                ..
            } = caller.as_ref()
            {
                if matches!(inner.as_ref(), Type::Name { name, .. } if name == op) {
                    return Some((left, callee));
                }
            }
        }
        None
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some((arg, ret)) = self.as_func() {
            // Parenthesise a function on the left so `(a -> b) -> c`
            // stays distinguishable from `a -> b -> c`.
            return if arg.as_func().is_some() {
                write!(f, "({arg}) -> {ret}")
            } else {
                write!(f, "{arg} -> {ret}")
            };
        }
        if let Some((first, second)) = self.as_pair() {
            return write!(f, "({first}, {second})");
        }
        match self {
            Type::Name { name, .. } => write!(f, "{name}"),
            Type::Var(var) => write!(f, "{}", var.name),
            Type::Apply { .. } => {
                // Flatten a curried application into `Base[a, b]`.
                let mut args = Vec::new();
                let mut current = self;
                while let Type::Apply { caller, callee, .. } = current {
                    args.push(callee.as_ref());
                    current = caller.as_ref();
                }
                args.reverse();
                write!(f, "{current}[")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, "]")
            }
            Type::Scheme { body, bound, .. } => {
                let mut names: Vec<&str> =
                    bound.iter().map(|var| var.name.as_str()).collect();
                names.sort_unstable();
                write!(f, "forall {}. {body}", names.join(" "))
            }
        }
    }
}
