//! Lowering: typed AST to the operation-oriented IR.
//!
//! Three transformations happen here. Applications of the primitive
//! operators become `NativeOp` nodes. Irrefutable patterns on
//! definitions and function parameters are decomposed into `first`/
//! `second` projections and rest-bindings, spliced into the enclosing
//! statement list. And `match` expressions are compiled into a cascade
//! of conditionals by the decision-tree builder below.

use livy_parser::ast::{Pattern, PatternKind, ScalarValue};
use livy_typeck::exhaustiveness::{PatternPosition, RefutablePatternError};
use livy_typeck::typed::{TypedExpr, TypedExprKind, TypedMatchCase};

use crate::lowered::{Lowered, NativeOp};

/// Lower the typed AST into the IR.
///
/// Exhaustiveness has already vetted every pattern position, so a
/// refutable pattern here means a pass upstream let one through; it is
/// still reported rather than ignored.
pub fn lower(tree: TypedExpr) -> Result<Lowered, RefutablePatternError> {
    Simplifier::new().lower_expr(tree)
}

/// Generator of synthetic parameter names for decomposed function
/// parameters. The `$` prefix keeps them apart from source names.
struct Simplifier {
    param_index: u32,
}

impl Simplifier {
    fn new() -> Self {
        Simplifier { param_index: 0 }
    }

    fn fresh_param(&mut self) -> String {
        self.param_index += 1;
        format!("$param{}", self.param_index)
    }

    fn lower_expr(&mut self, expr: TypedExpr) -> Result<Lowered, RefutablePatternError> {
        match expr.kind {
            TypedExprKind::Apply { func, arg } => {
                let func = self.lower_expr(*func)?;
                let arg = self.lower_expr(*arg)?;
                Ok(lower_apply(func, arg))
            }
            TypedExprKind::Block(body) => {
                let mut stmts = Vec::with_capacity(body.len());
                for stmt in body {
                    self.lower_stmt_into(stmt, &mut stmts)?;
                }
                Ok(Lowered::block(stmts))
            }
            TypedExprKind::Cond { pred, cons, alt } => Ok(Lowered::cond(
                self.lower_expr(*pred)?,
                self.lower_expr(*cons)?,
                self.lower_expr(*alt)?,
            )),
            TypedExprKind::Define { target, value } => {
                let value = self.lower_expr(*value)?;
                let stmts = decompose_irrefutable(&target, value, PatternPosition::Target)?;
                Ok(Lowered::block(stmts))
            }
            TypedExprKind::Function { param, body } => self.lower_function(param, *body),
            TypedExprKind::List(elems) => Ok(Lowered::List(
                elems
                    .into_iter()
                    .map(|elem| self.lower_expr(elem))
                    .collect::<Result<Vec<_>, _>>()?,
            )),
            TypedExprKind::Match { subject, cases } => self.lower_match(*subject, cases),
            TypedExprKind::Pair { first, second } => Ok(Lowered::pair(
                self.lower_expr(*first)?,
                self.lower_expr(*second)?,
            )),
            TypedExprKind::Name(name) => Ok(Lowered::Name(name)),
            TypedExprKind::Scalar(value) => Ok(Lowered::Scalar(value)),
            TypedExprKind::Unit => Ok(Lowered::Unit),
            // Annotations have served their purpose during inference.
            TypedExprKind::Annotation { .. } => Ok(Lowered::Unit),
        }
    }

    /// Lower one block statement, splicing decomposed definitions
    /// directly into the enclosing statement list.
    fn lower_stmt_into(
        &mut self,
        stmt: TypedExpr,
        out: &mut Vec<Lowered>,
    ) -> Result<(), RefutablePatternError> {
        if let TypedExprKind::Define { target, value } = stmt.kind {
            let value = self.lower_expr(*value)?;
            out.extend(decompose_irrefutable(
                &target,
                value,
                PatternPosition::Target,
            )?);
            return Ok(());
        }
        out.push(self.lower_expr(stmt)?);
        Ok(())
    }

    /// Functions with a composite parameter get a synthetic name and a
    /// projection prologue in front of their body.
    fn lower_function(
        &mut self,
        param: Pattern,
        body: TypedExpr,
    ) -> Result<Lowered, RefutablePatternError> {
        if let PatternKind::FreeName(name) = &param.kind {
            let name = name.clone();
            return Ok(Lowered::function(name, self.lower_expr(body)?));
        }

        let fresh = self.fresh_param();
        let mut stmts =
            decompose_irrefutable(&param, Lowered::name(&fresh), PatternPosition::Parameter)?;
        match self.lower_expr(body)? {
            Lowered::Block(rest) => stmts.extend(rest),
            other => stmts.push(other),
        }
        Ok(Lowered::function(fresh, Lowered::block(stmts)))
    }

    // ── Decision trees ─────────────────────────────────────────────────

    /// Expand a `match` into a right-associated cascade of conditionals.
    ///
    /// Each case becomes a predicate and a list of bindings; predicates
    /// reduce away constant parts, and the first case whose predicate is
    /// always true becomes the innermost default.
    fn lower_match(
        &mut self,
        subject: TypedExpr,
        cases: Vec<TypedMatchCase>,
    ) -> Result<Lowered, RefutablePatternError> {
        let subject = self.lower_expr(subject)?;
        let mut branches: Vec<(Lowered, Lowered)> = Vec::new();
        for case in cases {
            let (pred, defs) = build_branch(&subject, &case.pattern);
            let mut stmts = defs;
            match self.lower_expr(case.body)? {
                Lowered::Block(rest) => stmts.extend(rest),
                other => stmts.push(other),
            }
            let then = Lowered::block(stmts);
            match reduce_pred(pred) {
                None => return Ok(fold_branches(branches, then)),
                Some(pred) => branches.push((pred, then)),
            }
        }

        // No case matched unconditionally; the last one is the default.
        let (_, default) = branches.pop().expect("parser requires at least one case");
        Ok(fold_branches(branches, default))
    }
}

fn fold_branches(branches: Vec<(Lowered, Lowered)>, default: Lowered) -> Lowered {
    branches
        .into_iter()
        .rev()
        .fold(default, |alt, (pred, cons)| Lowered::cond(pred, cons, alt))
}

/// Turn `op l r` applications into native operations.
fn lower_apply(func: Lowered, arg: Lowered) -> Lowered {
    if func == Lowered::name("~") {
        return Lowered::native(NativeOp::Neg, arg, None);
    }
    if let Lowered::Apply {
        func: inner,
        arg: left,
    } = &func
    {
        if let Lowered::Name(name) = inner.as_ref() {
            if let Some(op) = NativeOp::binary_from_name(name) {
                return Lowered::native(op, (**left).clone(), Some(arg));
            }
        }
    }
    Lowered::apply(func, arg)
}

// ── Irrefutable-pattern decomposition ──────────────────────────────────

/// Break a pattern-to-value binding into plain `Define` statements.
///
/// Wildcards keep the value for its effect; pairs project with `first`
/// and `second`; a bare `..rest` list pattern binds the whole value.
fn decompose_irrefutable(
    pattern: &Pattern,
    value: Lowered,
    position: PatternPosition,
) -> Result<Vec<Lowered>, RefutablePatternError> {
    match &pattern.kind {
        PatternKind::Unit => Ok(vec![value]),
        PatternKind::FreeName(name) if name == "_" => Ok(vec![value]),
        PatternKind::FreeName(name) => Ok(vec![Lowered::define(name.clone(), value)]),
        PatternKind::Pair { first, second } => {
            let mut stmts = decompose_irrefutable(
                first,
                Lowered::apply(Lowered::name("first"), value.clone()),
                position,
            )?;
            stmts.extend(decompose_irrefutable(
                second,
                Lowered::apply(Lowered::name("second"), value),
                position,
            )?);
            Ok(stmts)
        }
        PatternKind::List { initials, rest: Some(rest) } if initials.is_empty() => {
            Ok(vec![Lowered::define(rest.name.clone(), value)])
        }
        _ => Err(refutable(position, pattern)),
    }
}

fn refutable(position: PatternPosition, pattern: &Pattern) -> RefutablePatternError {
    RefutablePatternError {
        position,
        span: pattern.span,
        offender: Some(pattern.clone()),
    }
}

// ── Branch construction ────────────────────────────────────────────────

/// Build one decision-tree branch: a predicate equivalent to the
/// pattern, plus the bindings the pattern introduces.
fn build_branch(subject: &Lowered, pattern: &Pattern) -> (Lowered, Vec<Lowered>) {
    match &pattern.kind {
        PatternKind::Unit => (Lowered::bool(true), Vec::new()),
        PatternKind::FreeName(name) if name == "_" => (Lowered::bool(true), Vec::new()),
        PatternKind::FreeName(name) => (
            Lowered::bool(true),
            vec![Lowered::define(name.clone(), subject.clone())],
        ),
        PatternKind::Scalar(ScalarValue::Bool(true)) => (subject.clone(), Vec::new()),
        PatternKind::Scalar(ScalarValue::Bool(false)) => (
            Lowered::apply(Lowered::name("not"), subject.clone()),
            Vec::new(),
        ),
        PatternKind::Scalar(value) => (
            Lowered::native(
                NativeOp::Equal,
                Lowered::Scalar(value.clone()),
                Some(subject.clone()),
            ),
            Vec::new(),
        ),
        PatternKind::PinnedName(name) => (
            Lowered::native(
                NativeOp::Equal,
                Lowered::name(name.clone()),
                Some(subject.clone()),
            ),
            Vec::new(),
        ),
        PatternKind::Pair { first, second } => {
            let first_subject = Lowered::apply(Lowered::name("first"), subject.clone());
            let (first_pred, mut defs) = build_branch(&first_subject, first);
            let second_subject = Lowered::apply(Lowered::name("second"), subject.clone());
            let (second_pred, second_defs) = build_branch(&second_subject, second);
            defs.extend(second_defs);
            (ast_and(first_pred, second_pred), defs)
        }
        PatternKind::List { initials, rest } => build_list_branch(subject, initials, rest.as_ref()),
    }
}

fn build_list_branch(
    subject: &Lowered,
    initials: &[Pattern],
    rest: Option<&livy_parser::ast::RestName>,
) -> (Lowered, Vec<Lowered>) {
    let length_of = |subject: &Lowered| Lowered::apply(Lowered::name("length"), subject.clone());

    if initials.is_empty() && rest.is_none() {
        // `[]` tests for emptiness.
        return (
            Lowered::native(NativeOp::Equal, length_of(subject), Some(Lowered::int(0))),
            Vec::new(),
        );
    }

    let mut preds: Vec<Lowered> = Vec::new();
    if !initials.is_empty() {
        preds.push(Lowered::apply(
            Lowered::apply(Lowered::name(">="), length_of(subject)),
            Lowered::int(initials.len() as i64),
        ));
    }

    let mut defs: Vec<Lowered> = Vec::new();
    for (index, sub_pattern) in initials.iter().enumerate() {
        let element = Lowered::apply(
            Lowered::name("at"),
            Lowered::pair(subject.clone(), Lowered::int(index as i64)),
        );
        let (sub_pred, sub_defs) = build_branch(&element, sub_pattern);
        preds.push(sub_pred);
        defs.extend(sub_defs);
    }

    if let Some(rest) = rest {
        defs.push(Lowered::define(
            rest.name.clone(),
            Lowered::apply(
                Lowered::name("drop"),
                Lowered::pair(subject.clone(), Lowered::int(initials.len() as i64)),
            ),
        ));
    }

    let pred = preds
        .into_iter()
        .reduce(ast_and)
        .unwrap_or_else(|| Lowered::bool(true));
    (pred, defs)
}

fn ast_and(left: Lowered, right: Lowered) -> Lowered {
    Lowered::apply(Lowered::apply(Lowered::name("and"), left), right)
}

fn ast_or(left: Lowered, right: Lowered) -> Lowered {
    Lowered::apply(Lowered::apply(Lowered::name("or"), left), right)
}

/// Reduce a predicate over its known parts. `None` means the predicate
/// is always true and its branch can serve as the default.
fn reduce_pred(pred: Lowered) -> Option<Lowered> {
    if pred == Lowered::bool(true) {
        return None;
    }

    // Only `and`/`or` conjunction chains built by `build_branch` reduce
    // further; anything else is already a real runtime check.
    let junction = match &pred {
        Lowered::Apply { func, .. } => match func.as_ref() {
            Lowered::Apply { func: op, .. } => match op.as_ref() {
                Lowered::Name(name) if name == "and" => Some(true),
                Lowered::Name(name) if name == "or" => Some(false),
                _ => None,
            },
            _ => None,
        },
        _ => None,
    };
    let Some(is_and) = junction else {
        return Some(pred);
    };

    let Lowered::Apply { func, arg: right } = pred else {
        unreachable!("junction shape was checked above");
    };
    let Lowered::Apply { arg: left, .. } = *func else {
        unreachable!("junction shape was checked above");
    };
    if is_and {
        match (reduce_pred(*left), reduce_pred(*right)) {
            (None, None) => None,
            (None, Some(only)) | (Some(only), None) => Some(only),
            (Some(l), Some(r)) => Some(ast_and(l, r)),
        }
    } else {
        match (reduce_pred(*left), reduce_pred(*right)) {
            (None, _) | (_, None) => None,
            (Some(l), Some(r)) => Some(ast_or(l, r)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduce_collapses_true() {
        assert_eq!(reduce_pred(Lowered::bool(true)), None);
    }

    #[test]
    fn reduce_and_drops_true_operands() {
        let check = Lowered::native(NativeOp::Equal, Lowered::int(1), Some(Lowered::int(2)));
        assert_eq!(
            reduce_pred(ast_and(Lowered::bool(true), check.clone())),
            Some(check.clone())
        );
        assert_eq!(
            reduce_pred(ast_and(check.clone(), Lowered::bool(true))),
            Some(check)
        );
        assert_eq!(
            reduce_pred(ast_and(Lowered::bool(true), Lowered::bool(true))),
            None
        );
    }

    #[test]
    fn reduce_or_short_circuits_on_true() {
        let check = Lowered::native(NativeOp::Equal, Lowered::int(1), Some(Lowered::int(2)));
        assert_eq!(reduce_pred(ast_or(Lowered::bool(true), check.clone())), None);
        assert_eq!(reduce_pred(ast_or(check, Lowered::bool(true))), None);
    }

    #[test]
    fn reduce_leaves_real_predicates_alone() {
        let check = Lowered::native(NativeOp::Less, Lowered::int(1), Some(Lowered::int(2)));
        assert_eq!(reduce_pred(check.clone()), Some(check));
    }
}
