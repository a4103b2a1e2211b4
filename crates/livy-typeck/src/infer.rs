//! Constraint generation and substitution.
//!
//! Inference is two passes over the tree. The generator walks the
//! surface AST, mirrors it into a typed AST whose types are mostly fresh
//! variables, and accumulates type equations on the side. The equations
//! are then solved into one substitution (a left fold of
//! `merge_substitutions` over each equation's unifier), and the
//! substitutor walks the typed tree replacing every type with its
//! solved form, re-generalising definitions.

use livy_common::scope::Scope;
use livy_common::span::Span;
use livy_parser::ast::{Expr, ExprKind, Pattern, PatternKind};
use livy_parser::types::{Type, TypeVar};

use crate::error::TypeError;
use crate::subst::{
    generalise, instantiate, merge_substitutions, substitute, unify, IdGen, Substitution,
};
use crate::typed::{TypedExpr, TypedExprKind, TypedMatchCase};

/// Fill in a type for every expression in the tree.
pub fn infer_types(tree: Expr) -> Result<TypedExpr, TypeError> {
    let mut generator = ConstraintGenerator::new();
    let typed = generator.generate(tree)?;

    let ConstraintGenerator {
        equations, mut ids, ..
    } = generator;
    let mut solution = Substitution::default();
    for (left, right) in equations {
        let sub = unify(&left, &right, &mut ids)?;
        solution = merge_substitutions(solution, sub, &mut ids)?;
    }
    Ok(substitute_tree(typed, &solution))
}

// ── Built-in scope ─────────────────────────────────────────────────────

/// A scheme `forall vars. body`.
fn forall(vars: &[&str], body: Type) -> Type {
    Type::Scheme {
        span: Span::zero(),
        bound: vars
            .iter()
            .map(|name| TypeVar::new(Span::zero(), *name))
            .collect(),
        body: Box::new(body),
    }
}

/// The root scope: operator types, the runtime list and pair globals,
/// and the `main` entry point.
fn builtin_scope() -> Scope<Type> {
    let sp = Span::zero();
    let bool_ty = Type::name(sp, "Bool");
    let int_ty = Type::name(sp, "Int");
    let x = Type::var(sp, "x");
    let a = Type::var(sp, "a");
    let b = Type::var(sp, "b");
    let func2 = |p1: Type, p2: Type, ret: Type| Type::func(sp, p1, Type::func(sp, p2, ret));

    let mut scope = Scope::new();
    for op in ["=", "/=", "<", ">", "<=", ">="] {
        scope.insert(
            op,
            forall(&["x"], func2(x.clone(), x.clone(), bool_ty.clone())),
        );
    }
    for op in ["+", "-", "*", "/", "%", "^"] {
        scope.insert(op, forall(&["x"], func2(x.clone(), x.clone(), x.clone())));
    }
    scope.insert(
        "and",
        func2(bool_ty.clone(), bool_ty.clone(), bool_ty.clone()),
    );
    scope.insert(
        "or",
        func2(bool_ty.clone(), bool_ty.clone(), bool_ty.clone()),
    );
    scope.insert("not", Type::func(sp, bool_ty.clone(), bool_ty.clone()));
    scope.insert("~", forall(&["x"], Type::func(sp, x.clone(), x.clone())));
    scope.insert(
        "<>",
        forall(
            &["x"],
            func2(
                Type::list(sp, x.clone()),
                Type::list(sp, x.clone()),
                Type::list(sp, x.clone()),
            ),
        ),
    );

    // Runtime globals used for pair projection and list scrutiny.
    scope.insert(
        "first",
        forall(
            &["a", "b"],
            Type::func(sp, Type::pair(sp, a.clone(), b.clone()), a.clone()),
        ),
    );
    scope.insert(
        "second",
        forall(
            &["a", "b"],
            Type::func(sp, Type::pair(sp, a.clone(), b.clone()), b.clone()),
        ),
    );
    scope.insert(
        "length",
        forall(
            &["a"],
            Type::func(sp, Type::list(sp, a.clone()), int_ty.clone()),
        ),
    );
    scope.insert(
        "at",
        forall(
            &["a"],
            Type::func(
                sp,
                Type::pair(sp, Type::list(sp, a.clone()), int_ty.clone()),
                a.clone(),
            ),
        ),
    );
    scope.insert(
        "drop",
        forall(
            &["a"],
            Type::func(
                sp,
                Type::pair(sp, Type::list(sp, a.clone()), int_ty.clone()),
                Type::list(sp, a.clone()),
            ),
        ),
    );

    scope.insert(
        "main",
        Type::func(
            sp,
            Type::list(sp, Type::name(sp, "String")),
            int_ty,
        ),
    );
    scope
}

// ── Constraint generation ──────────────────────────────────────────────

struct ConstraintGenerator {
    equations: Vec<(Type, Type)>,
    scope: Scope<Type>,
    ids: IdGen,
}

impl ConstraintGenerator {
    fn new() -> Self {
        ConstraintGenerator {
            equations: Vec::new(),
            scope: builtin_scope(),
            ids: IdGen::new(),
        }
    }

    fn push(&mut self, left: Type, right: Type) {
        self.equations.push((left, right));
    }

    fn generate(&mut self, expr: Expr) -> Result<TypedExpr, TypeError> {
        let span = expr.span;
        let typed = match expr.kind {
            ExprKind::Apply { func, arg } => {
                let func = self.generate(*func)?;
                let arg = self.generate(*arg)?;
                let result = self.ids.fresh_var(span);
                self.push(
                    func.ty.clone(),
                    Type::func(span, arg.ty.clone(), result.clone()),
                );
                TypedExpr::new(
                    span,
                    result,
                    TypedExprKind::Apply {
                        func: Box::new(func),
                        arg: Box::new(arg),
                    },
                )
            }
            ExprKind::Block(body) => {
                self.scope.push_scope();
                let body = body
                    .into_iter()
                    .map(|stmt| self.generate(stmt))
                    .collect::<Result<Vec<_>, _>>()?;
                self.scope.pop_scope();
                let ty = body
                    .last()
                    .map(|last| last.ty.clone())
                    .unwrap_or_else(|| Type::unit(span));
                TypedExpr::new(span, ty, TypedExprKind::Block(body))
            }
            ExprKind::Cond { pred, cons, alt } => {
                let pred = self.generate(*pred)?;
                let cons = self.generate(*cons)?;
                let alt = self.generate(*alt)?;
                self.push(pred.ty.clone(), Type::name(pred.span, "Bool"));
                self.push(cons.ty.clone(), alt.ty.clone());
                let ty = cons.ty.clone();
                TypedExpr::new(
                    span,
                    ty,
                    TypedExprKind::Cond {
                        pred: Box::new(pred),
                        cons: Box::new(cons),
                        alt: Box::new(alt),
                    },
                )
            }
            ExprKind::Define { target, value } => self.generate_define(span, target, *value)?,
            ExprKind::Function { param, body } => {
                self.scope.push_scope();
                let (bindings, param_ty) = self.pattern_bindings(&param)?;
                for (name, ty) in bindings {
                    self.scope.insert(name, ty);
                }
                let body = self.generate(*body)?;
                self.scope.pop_scope();
                let ty = Type::func(span, param_ty, body.ty.clone());
                TypedExpr::new(
                    span,
                    ty,
                    TypedExprKind::Function {
                        param,
                        body: Box::new(body),
                    },
                )
            }
            ExprKind::List(elems) => {
                let elems = elems
                    .into_iter()
                    .map(|elem| self.generate(elem))
                    .collect::<Result<Vec<_>, _>>()?;
                let elem_ty = elems
                    .first()
                    .map(|first| first.ty.clone())
                    .unwrap_or_else(|| self.ids.fresh_var(span));
                for elem in &elems {
                    self.push(elem_ty.clone(), elem.ty.clone());
                }
                let ty = Type::list(span, elem_ty);
                TypedExpr::new(span, ty, TypedExprKind::List(elems))
            }
            ExprKind::Match { subject, cases } => {
                let subject = self.generate(*subject)?;
                let result = self.ids.fresh_var(span);
                let mut typed_cases = Vec::with_capacity(cases.len());
                for case in cases {
                    self.scope.push_scope();
                    let (bindings, pattern_ty) = self.pattern_bindings(&case.pattern)?;
                    for (name, ty) in bindings {
                        self.scope.insert(name, ty);
                    }
                    self.push(pattern_ty, subject.ty.clone());
                    let body = self.generate(case.body)?;
                    self.push(result.clone(), body.ty.clone());
                    self.scope.pop_scope();
                    typed_cases.push(TypedMatchCase {
                        pattern: case.pattern,
                        body,
                    });
                }
                TypedExpr::new(
                    span,
                    result,
                    TypedExprKind::Match {
                        subject: Box::new(subject),
                        cases: typed_cases,
                    },
                )
            }
            ExprKind::Pair { first, second } => {
                let first = self.generate(*first)?;
                let second = self.generate(*second)?;
                let ty = Type::pair(span, first.ty.clone(), second.ty.clone());
                TypedExpr::new(
                    span,
                    ty,
                    TypedExprKind::Pair {
                        first: Box::new(first),
                        second: Box::new(second),
                    },
                )
            }
            ExprKind::Name(name) => {
                let Some(known) = self.scope.get(&name) else {
                    return Err(TypeError::UndefinedName { name, span });
                };
                let known = known.clone();
                let ty = instantiate(&known, &mut self.ids);
                TypedExpr::new(span, ty, TypedExprKind::Name(name))
            }
            ExprKind::Scalar(value) => {
                let ty = Type::name(span, value.type_name());
                TypedExpr::new(span, ty, TypedExprKind::Scalar(value))
            }
            ExprKind::Unit => TypedExpr::new(span, Type::unit(span), TypedExprKind::Unit),
            ExprKind::Annotation { name, ty } => {
                self.scope.insert(name.clone(), generalise(ty.clone()));
                TypedExpr::new(
                    span,
                    Type::unit(span),
                    TypedExprKind::Annotation { name, declared: ty },
                )
            }
        };
        Ok(typed)
    }

    /// `let` definitions. A plain-name target is pre-bound so the value
    /// can refer to it (and so a prior annotation constrains it), then
    /// rebound to its generalised type. Composite targets derive a
    /// binding environment from the pattern instead.
    fn generate_define(
        &mut self,
        span: Span,
        target: Pattern,
        value: Expr,
    ) -> Result<TypedExpr, TypeError> {
        let (value, node_ty) = if let PatternKind::FreeName(name) = &target.kind {
            if name == "_" {
                let value = self.generate(value)?;
                let node_ty = generalise(value.ty.clone());
                (value, node_ty)
            } else {
                let name = name.clone();
                // An existing binding (an annotation, or a builtin such
                // as `main`) becomes the constraint the definition must
                // satisfy; otherwise the target starts as a fresh var.
                let initial = self
                    .scope
                    .get(&name)
                    .cloned()
                    .unwrap_or_else(|| self.ids.fresh_var(target.span));
                self.scope.insert(name.clone(), initial.clone());
                let value = self.generate(value)?;
                let node_ty = generalise(value.ty.clone());
                self.push(initial, node_ty.clone());
                self.scope.insert(name, node_ty.clone());
                (value, node_ty)
            }
        } else {
            let (bindings, pattern_ty) = self.pattern_bindings(&target)?;
            for (name, ty) in bindings {
                self.scope.insert(name, ty);
            }
            let value = self.generate(value)?;
            self.push(pattern_ty, value.ty.clone());
            let node_ty = generalise(value.ty.clone());
            (value, node_ty)
        };
        Ok(TypedExpr::new(
            span,
            node_ty,
            TypedExprKind::Define {
                target,
                value: Box::new(value),
            },
        ))
    }

    /// Derive the names a pattern binds and the type of the values it
    /// admits. List element types are related through equations solved
    /// with everything else.
    fn pattern_bindings(
        &mut self,
        pattern: &Pattern,
    ) -> Result<(Vec<(String, Type)>, Type), TypeError> {
        match &pattern.kind {
            PatternKind::FreeName(name) => {
                let ty = self.ids.fresh_var(pattern.span);
                let bindings = if name == "_" {
                    Vec::new()
                } else {
                    vec![(name.clone(), ty.clone())]
                };
                Ok((bindings, ty))
            }
            PatternKind::PinnedName(name) => {
                let Some(known) = self.scope.get(name) else {
                    return Err(TypeError::UndefinedName {
                        name: name.clone(),
                        span: pattern.span,
                    });
                };
                let known = known.clone();
                Ok((Vec::new(), instantiate(&known, &mut self.ids)))
            }
            PatternKind::Scalar(value) => {
                Ok((Vec::new(), Type::name(pattern.span, value.type_name())))
            }
            PatternKind::Unit => Ok((Vec::new(), Type::unit(pattern.span))),
            PatternKind::Pair { first, second } => {
                let (mut bindings, first_ty) = self.pattern_bindings(first)?;
                let (second_bindings, second_ty) = self.pattern_bindings(second)?;
                bindings.extend(second_bindings);
                Ok((bindings, Type::pair(pattern.span, first_ty, second_ty)))
            }
            PatternKind::List { initials, rest } => {
                let elem_ty = self.ids.fresh_var(pattern.span);
                let mut bindings = Vec::new();
                for initial in initials {
                    let (initial_bindings, initial_ty) = self.pattern_bindings(initial)?;
                    bindings.extend(initial_bindings);
                    self.push(elem_ty.clone(), initial_ty);
                }
                let list_ty = Type::list(pattern.span, elem_ty);
                if let Some(rest) = rest {
                    bindings.push((rest.name.clone(), list_ty.clone()));
                }
                Ok((bindings, list_ty))
            }
        }
    }
}

// ── Substitution pass ──────────────────────────────────────────────────

/// Apply the solved substitution to every type in the tree.
fn substitute_tree(expr: TypedExpr, sub: &Substitution) -> TypedExpr {
    let span = expr.span;
    let ty = substitute(&expr.ty, sub);
    match expr.kind {
        TypedExprKind::Apply { func, arg } => TypedExpr::new(
            span,
            ty,
            TypedExprKind::Apply {
                func: Box::new(substitute_tree(*func, sub)),
                arg: Box::new(substitute_tree(*arg, sub)),
            },
        ),
        TypedExprKind::Block(body) => TypedExpr::new(
            span,
            ty,
            TypedExprKind::Block(
                body.into_iter()
                    .map(|stmt| substitute_tree(stmt, sub))
                    .collect(),
            ),
        ),
        TypedExprKind::Cond { pred, cons, alt } => TypedExpr::new(
            span,
            ty,
            TypedExprKind::Cond {
                pred: Box::new(substitute_tree(*pred, sub)),
                cons: Box::new(substitute_tree(*cons, sub)),
                alt: Box::new(substitute_tree(*alt, sub)),
            },
        ),
        TypedExprKind::Define { target, value } => {
            // Definitions re-generalise over their value's solved type.
            let value = substitute_tree(*value, sub);
            let ty = generalise(value.ty.clone());
            TypedExpr::new(
                span,
                ty,
                TypedExprKind::Define {
                    target,
                    value: Box::new(value),
                },
            )
        }
        TypedExprKind::Function { param, body } => TypedExpr::new(
            span,
            ty,
            TypedExprKind::Function {
                param,
                body: Box::new(substitute_tree(*body, sub)),
            },
        ),
        TypedExprKind::List(elems) => TypedExpr::new(
            span,
            ty,
            TypedExprKind::List(
                elems
                    .into_iter()
                    .map(|elem| substitute_tree(elem, sub))
                    .collect(),
            ),
        ),
        TypedExprKind::Match { subject, cases } => TypedExpr::new(
            span,
            ty,
            TypedExprKind::Match {
                subject: Box::new(substitute_tree(*subject, sub)),
                cases: cases
                    .into_iter()
                    .map(|case| TypedMatchCase {
                        pattern: case.pattern,
                        body: substitute_tree(case.body, sub),
                    })
                    .collect(),
            },
        ),
        TypedExprKind::Pair { first, second } => TypedExpr::new(
            span,
            ty,
            TypedExprKind::Pair {
                first: Box::new(substitute_tree(*first, sub)),
                second: Box::new(substitute_tree(*second, sub)),
            },
        ),
        kind @ (TypedExprKind::Name(_)
        | TypedExprKind::Scalar(_)
        | TypedExprKind::Unit
        | TypedExprKind::Annotation { .. }) => TypedExpr::new(span, ty, kind),
    }
}
