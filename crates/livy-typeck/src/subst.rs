//! Unification over substitution maps.
//!
//! A substitution is a finite map from type variables to types. `unify`
//! produces the most general substitution making its arguments equal;
//! `merge_substitutions` combines two of them, unifying the values of any
//! shared keys and eagerly self-substituting so that lookups never have to
//! chase long chains; `instantiate` and `generalise` move between types
//! and type schemes at use and definition sites.

use rustc_hash::{FxHashMap, FxHashSet};

use livy_common::span::Span;
use livy_parser::types::{Type, TypeVar};

use crate::error::TypeError;

/// A finite map from type variables to types.
pub type Substitution = FxHashMap<TypeVar, Type>;

/// The threaded generator for fresh anonymous type variables.
///
/// Generated names start with `$`, which user-written variables cannot
/// contain, so fresh variables never collide with annotations.
#[derive(Debug, Default)]
pub struct IdGen {
    next: u32,
}

impl IdGen {
    pub fn new() -> Self {
        IdGen { next: 0 }
    }

    pub fn fresh(&mut self, span: Span) -> TypeVar {
        self.next += 1;
        TypeVar::new(span, format!("${}", self.next))
    }

    pub fn fresh_var(&mut self, span: Span) -> Type {
        Type::Var(self.fresh(span))
    }
}

/// Build a substitution that makes `left` and `right` equal, or fail.
///
/// Type schemes on either side are instantiated with fresh variables
/// before comparison.
pub fn unify(left: &Type, right: &Type, ids: &mut IdGen) -> Result<Substitution, TypeError> {
    let left = instantiate(left, ids);
    let right = instantiate(right, ids);
    match (&left, &right) {
        (Type::Var(l), Type::Var(r)) if l == r => Ok(Substitution::default()),
        (Type::Var(var), other) | (other, Type::Var(var)) => {
            if free_type_vars(other).contains(var) {
                return Err(TypeError::Circular {
                    var: var.clone(),
                    ty: other.clone(),
                });
            }
            let mut sub = Substitution::default();
            sub.insert(var.clone(), other.clone());
            Ok(sub)
        }
        (Type::Name { name: l, .. }, Type::Name { name: r, .. }) if l == r => {
            Ok(Substitution::default())
        }
        (
            Type::Apply {
                caller: lc,
                callee: le,
                ..
            },
            Type::Apply {
                caller: rc,
                callee: re,
                ..
            },
        ) => {
            let callers = unify(lc, rc, ids)?;
            let callees = unify(le, re, ids)?;
            merge_substitutions(callers, callees, ids)
        }
        _ => Err(TypeError::Mismatch {
            left: left.clone(),
            right: right.clone(),
        }),
    }
}

/// Combine two substitutions without losing any mapping.
///
/// Keys present in both sides have their values unified, and the result
/// is eagerly self-substituted so every entry maps straight to its final
/// form.
pub fn merge_substitutions(
    left: Substitution,
    right: Substitution,
    ids: &mut IdGen,
) -> Result<Substitution, TypeError> {
    if left.is_empty() {
        return Ok(right);
    }
    if right.is_empty() {
        return Ok(left);
    }

    let mut conflicts = Substitution::default();
    for (key, value) in &left {
        if let Some(other) = right.get(key) {
            let parts = unify(value, other, ids)?;
            conflicts = merge_substitutions(conflicts, parts, ids)?;
        }
    }

    let mut full = left;
    full.extend(right);
    full.extend(conflicts);
    let snapshot = full.clone();
    Ok(full
        .into_iter()
        .map(|(key, value)| {
            let value = substitute(&value, &snapshot);
            (key, value)
        })
        .collect())
}

/// Replace the free type variables of `ty` using `sub`.
///
/// Variables are chased through the map until a non-variable or an
/// unmapped variable is reached.
pub fn substitute(ty: &Type, sub: &Substitution) -> Type {
    match ty {
        Type::Name { .. } => ty.clone(),
        Type::Var(_) => {
            // Chase through the map until a non-variable or an unmapped
            // variable is reached. Eager self-substitution in
            // `merge_substitutions` keeps these chains short; the hop
            // bound makes termination unconditional.
            let mut current = ty;
            for _ in 0..=sub.len() {
                match current {
                    Type::Var(var) => match sub.get(var) {
                        Some(next) => current = next,
                        None => break,
                    },
                    _ => break,
                }
            }
            current.clone()
        }
        Type::Apply {
            span,
            caller,
            callee,
        } => Type::apply(*span, substitute(caller, sub), substitute(callee, sub)),
        Type::Scheme { span, body, bound } => {
            // Only the free variables of the scheme may be replaced.
            let narrowed: Substitution = sub
                .iter()
                .filter(|(var, _)| !bound.contains(*var))
                .map(|(var, value)| (var.clone(), value.clone()))
                .collect();
            Type::Scheme {
                span: *span,
                body: Box::new(substitute(body, &narrowed)),
                bound: bound.clone(),
            }
        }
    }
}

/// Replace a scheme's bound variables with fresh anonymous ones.
///
/// Non-scheme types are returned unchanged.
pub fn instantiate(ty: &Type, ids: &mut IdGen) -> Type {
    match ty {
        Type::Scheme { span, body, bound } => {
            let sub: Substitution = bound
                .iter()
                .map(|var| (var.clone(), ids.fresh_var(*span)))
                .collect();
            substitute(body, &sub)
        }
        _ => ty.clone(),
    }
}

/// Quantify the free variables of `ty` into a scheme.
///
/// A type without free variables is returned unchanged; nested schemes
/// are folded into one.
pub fn generalise(ty: Type) -> Type {
    let free = free_type_vars(&ty);
    if free.is_empty() {
        return ty;
    }
    let span = ty.span();
    fold_schemes(span, Box::new(ty), free)
}

/// Merge directly nested schemes into a single one.
fn fold_schemes(span: Span, body: Box<Type>, bound: FxHashSet<TypeVar>) -> Type {
    match *body {
        Type::Scheme {
            body: inner_body,
            bound: inner_bound,
            ..
        } => {
            let mut merged = bound;
            merged.extend(inner_bound);
            fold_schemes(span, inner_body, merged)
        }
        other => Type::Scheme {
            span,
            body: Box::new(other),
            bound,
        },
    }
}

/// The free type variables of `ty`.
pub fn free_type_vars(ty: &Type) -> FxHashSet<TypeVar> {
    match ty {
        Type::Name { .. } => FxHashSet::default(),
        Type::Var(var) => std::iter::once(var.clone()).collect(),
        Type::Apply { caller, callee, .. } => {
            let mut vars = free_type_vars(caller);
            vars.extend(free_type_vars(callee));
            vars
        }
        Type::Scheme { body, bound, .. } => {
            let mut vars = free_type_vars(body);
            for var in bound {
                vars.remove(var);
            }
            vars
        }
    }
}
