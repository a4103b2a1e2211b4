//! Definition sorting for `--sort-defs`.
//!
//! Reorders the statements of every block so that definitions come
//! before the statements that use them, via Kahn's algorithm over the
//! def/use graph. Statements with no ordering constraint between them
//! keep their original relative order, and any cyclic remainder (e.g.
//! mutually recursive definitions) is appended unchanged.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;

use crate::ast::{Expr, ExprKind, MatchCase, Pattern, PatternKind};

/// Sort every block in the tree so definitions precede usages.
pub fn sort_defs(expr: Expr) -> Expr {
    let span = expr.span;
    let kind = match expr.kind {
        ExprKind::Block(body) => {
            let body: Vec<Expr> = body.into_iter().map(sort_defs).collect();
            ExprKind::Block(sort_block(body))
        }
        ExprKind::Apply { func, arg } => ExprKind::Apply {
            func: Box::new(sort_defs(*func)),
            arg: Box::new(sort_defs(*arg)),
        },
        ExprKind::Cond { pred, cons, alt } => ExprKind::Cond {
            pred: Box::new(sort_defs(*pred)),
            cons: Box::new(sort_defs(*cons)),
            alt: Box::new(sort_defs(*alt)),
        },
        ExprKind::Define { target, value } => ExprKind::Define {
            target,
            value: Box::new(sort_defs(*value)),
        },
        ExprKind::Function { param, body } => ExprKind::Function {
            param,
            body: Box::new(sort_defs(*body)),
        },
        ExprKind::List(elems) => ExprKind::List(elems.into_iter().map(sort_defs).collect()),
        ExprKind::Match { subject, cases } => ExprKind::Match {
            subject: Box::new(sort_defs(*subject)),
            cases: cases
                .into_iter()
                .map(|case| MatchCase {
                    pattern: case.pattern,
                    body: sort_defs(case.body),
                })
                .collect(),
        },
        ExprKind::Pair { first, second } => ExprKind::Pair {
            first: Box::new(sort_defs(*first)),
            second: Box::new(sort_defs(*second)),
        },
        other @ (ExprKind::Name(_)
        | ExprKind::Scalar(_)
        | ExprKind::Unit
        | ExprKind::Annotation { .. }) => other,
    };
    Expr::new(span, kind)
}

/// Topologically sort one block's statements.
fn sort_block(stmts: Vec<Expr>) -> Vec<Expr> {
    if stmts.len() < 2 {
        return stmts;
    }

    let defined: Vec<FxHashSet<String>> = stmts.iter().map(defined_names).collect();
    let used: Vec<FxHashSet<String>> = stmts.iter().map(free_names).collect();

    // deps[i] holds the indices of statements that must come before i.
    // Self-dependencies (recursive definitions) impose no ordering.
    let deps: Vec<Vec<usize>> = (0..stmts.len())
        .map(|i| {
            (0..stmts.len())
                .filter(|&j| j != i && used[i].intersection(&defined[j]).next().is_some())
                .collect()
        })
        .collect();

    let mut incoming: Vec<usize> = deps.iter().map(Vec::len).collect();
    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); stmts.len()];
    for (i, dep) in deps.iter().enumerate() {
        for &j in dep {
            outgoing[j].push(i);
        }
    }

    let mut ready: VecDeque<usize> = (0..stmts.len()).filter(|&i| incoming[i] == 0).collect();
    let mut order: Vec<usize> = Vec::with_capacity(stmts.len());
    while let Some(index) = ready.pop_front() {
        order.push(index);
        for &next in &outgoing[index] {
            incoming[next] -= 1;
            if incoming[next] == 0 {
                ready.push_back(next);
            }
        }
    }
    // A cyclic remainder keeps its original order at the end.
    for i in 0..stmts.len() {
        if !order.contains(&i) {
            order.push(i);
        }
    }

    let mut slots: Vec<Option<Expr>> = stmts.into_iter().map(Some).collect();
    order
        .into_iter()
        .map(|i| slots[i].take().expect("each index appears once"))
        .collect()
}

/// The names a statement defines for its siblings.
fn defined_names(stmt: &Expr) -> FxHashSet<String> {
    match &stmt.kind {
        ExprKind::Define { target, .. } => binding_names(target),
        _ => FxHashSet::default(),
    }
}

/// The names a pattern binds.
fn binding_names(pattern: &Pattern) -> FxHashSet<String> {
    let mut out = FxHashSet::default();
    collect_binding_names(pattern, &mut out);
    out
}

fn collect_binding_names(pattern: &Pattern, out: &mut FxHashSet<String>) {
    match &pattern.kind {
        PatternKind::FreeName(name) => {
            if name != "_" {
                out.insert(name.clone());
            }
        }
        PatternKind::Pair { first, second } => {
            collect_binding_names(first, out);
            collect_binding_names(second, out);
        }
        PatternKind::List { initials, rest } => {
            for initial in initials {
                collect_binding_names(initial, out);
            }
            if let Some(rest) = rest {
                out.insert(rest.name.clone());
            }
        }
        PatternKind::PinnedName(_) | PatternKind::Scalar(_) | PatternKind::Unit => {}
    }
}

/// The pinned names a pattern requires from the enclosing scope.
fn pinned_names(pattern: &Pattern, out: &mut FxHashSet<String>) {
    match &pattern.kind {
        PatternKind::PinnedName(name) => {
            out.insert(name.clone());
        }
        PatternKind::Pair { first, second } => {
            pinned_names(first, out);
            pinned_names(second, out);
        }
        PatternKind::List { initials, .. } => {
            for initial in initials {
                pinned_names(initial, out);
            }
        }
        PatternKind::FreeName(_) | PatternKind::Scalar(_) | PatternKind::Unit => {}
    }
}

/// The free names of an expression (used but not bound within it).
fn free_names(expr: &Expr) -> FxHashSet<String> {
    match &expr.kind {
        ExprKind::Name(name) => std::iter::once(name.clone()).collect(),
        ExprKind::Scalar(_) | ExprKind::Unit | ExprKind::Annotation { .. } => {
            FxHashSet::default()
        }
        ExprKind::Apply { func, arg } => union(free_names(func), free_names(arg)),
        ExprKind::Pair { first, second } => union(free_names(first), free_names(second)),
        ExprKind::Cond { pred, cons, alt } => union(
            free_names(pred),
            union(free_names(cons), free_names(alt)),
        ),
        ExprKind::List(elems) => elems
            .iter()
            .map(free_names)
            .fold(FxHashSet::default(), union),
        ExprKind::Define { target, value } => {
            let mut uses = free_names(value);
            pinned_names(target, &mut uses);
            uses
        }
        ExprKind::Function { param, body } => {
            let mut uses = free_names(body);
            for name in binding_names(param) {
                uses.remove(&name);
            }
            pinned_names(param, &mut uses);
            uses
        }
        ExprKind::Match { subject, cases } => {
            let mut uses = free_names(subject);
            for case in cases {
                let mut body_uses = free_names(&case.body);
                for name in binding_names(&case.pattern) {
                    body_uses.remove(&name);
                }
                pinned_names(&case.pattern, &mut body_uses);
                uses = union(uses, body_uses);
            }
            uses
        }
        ExprKind::Block(body) => {
            let mut bound = FxHashSet::default();
            let mut uses = FxHashSet::default();
            for stmt in body {
                for name in free_names(stmt) {
                    if !bound.contains(&name) {
                        uses.insert(name);
                    }
                }
                bound.extend(defined_names(stmt));
            }
            uses
        }
    }
}

fn union(mut left: FxHashSet<String>, right: FxHashSet<String>) -> FxHashSet<String> {
    left.extend(right);
    left
}

#[cfg(test)]
mod tests {
    use super::*;
    use livy_common::span::Span;

    fn define(name: &str, value: Expr) -> Expr {
        Expr::new(
            Span::zero(),
            ExprKind::Define {
                target: Pattern::new(Span::zero(), PatternKind::FreeName(name.into())),
                value: Box::new(value),
            },
        )
    }

    fn name(text: &str) -> Expr {
        Expr::name(Span::zero(), text)
    }

    fn block(stmts: Vec<Expr>) -> Expr {
        Expr::new(Span::zero(), ExprKind::Block(stmts))
    }

    fn defined_name_of(stmt: &Expr) -> &str {
        match &stmt.kind {
            ExprKind::Define { target, .. } => match &target.kind {
                PatternKind::FreeName(n) => n,
                _ => panic!("expected free name target"),
            },
            _ => panic!("expected define"),
        }
    }

    #[test]
    fn use_before_definition_is_reordered() {
        let tree = block(vec![define("a", name("b")), define("b", name("c"))]);
        let sorted = sort_defs(tree);
        let ExprKind::Block(stmts) = sorted.kind else {
            panic!("expected block");
        };
        assert_eq!(defined_name_of(&stmts[0]), "b");
        assert_eq!(defined_name_of(&stmts[1]), "a");
    }

    #[test]
    fn independent_statements_keep_their_order() {
        let tree = block(vec![define("a", name("x")), define("b", name("y"))]);
        let sorted = sort_defs(tree);
        let ExprKind::Block(stmts) = sorted.kind else {
            panic!("expected block");
        };
        assert_eq!(defined_name_of(&stmts[0]), "a");
        assert_eq!(defined_name_of(&stmts[1]), "b");
    }

    #[test]
    fn self_recursion_does_not_block_sorting() {
        let recursive = define(
            "f",
            Expr::new(
                Span::zero(),
                ExprKind::Function {
                    param: Pattern::new(Span::zero(), PatternKind::FreeName("x".into())),
                    body: Box::new(name("f")),
                },
            ),
        );
        let tree = block(vec![name("f"), recursive]);
        let sorted = sort_defs(tree);
        let ExprKind::Block(stmts) = sorted.kind else {
            panic!("expected block");
        };
        assert!(matches!(stmts[0].kind, ExprKind::Define { .. }));
        assert!(matches!(stmts[1].kind, ExprKind::Name(_)));
    }

    #[test]
    fn cyclic_definitions_are_appended_unchanged() {
        let tree = block(vec![define("a", name("b")), define("b", name("a"))]);
        let sorted = sort_defs(tree);
        let ExprKind::Block(stmts) = sorted.kind else {
            panic!("expected block");
        };
        assert_eq!(stmts.len(), 2);
        assert_eq!(defined_name_of(&stmts[0]), "a");
        assert_eq!(defined_name_of(&stmts[1]), "b");
    }
}
