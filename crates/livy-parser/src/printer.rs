//! Indented tree rendering of the surface AST, for the `--parse` dump.

use crate::ast::{Expr, ExprKind, Pattern, PatternKind};

/// Render the AST as an indented tree, one node per line.
pub fn show_ast(expr: &Expr) -> String {
    let mut out = String::new();
    write_expr(expr, 0, &mut out);
    out
}

fn line(depth: usize, text: &str, out: &mut String) {
    for _ in 0..depth {
        out.push_str("  ");
    }
    out.push_str(text);
    out.push('\n');
}

pub(crate) fn write_expr(expr: &Expr, depth: usize, out: &mut String) {
    match &expr.kind {
        ExprKind::Apply { func, arg } => {
            line(depth, "apply", out);
            write_expr(func, depth + 1, out);
            write_expr(arg, depth + 1, out);
        }
        ExprKind::Block(body) => {
            line(depth, "block", out);
            for stmt in body {
                write_expr(stmt, depth + 1, out);
            }
        }
        ExprKind::Cond { pred, cons, alt } => {
            line(depth, "cond", out);
            write_expr(pred, depth + 1, out);
            write_expr(cons, depth + 1, out);
            write_expr(alt, depth + 1, out);
        }
        ExprKind::Define { target, value } => {
            line(depth, "define", out);
            write_pattern(target, depth + 1, out);
            write_expr(value, depth + 1, out);
        }
        ExprKind::Function { param, body } => {
            line(depth, "function", out);
            write_pattern(param, depth + 1, out);
            write_expr(body, depth + 1, out);
        }
        ExprKind::List(elems) => {
            line(depth, "list", out);
            for elem in elems {
                write_expr(elem, depth + 1, out);
            }
        }
        ExprKind::Match { subject, cases } => {
            line(depth, "match", out);
            write_expr(subject, depth + 1, out);
            for case in cases {
                line(depth + 1, "case", out);
                write_pattern(&case.pattern, depth + 2, out);
                write_expr(&case.body, depth + 2, out);
            }
        }
        ExprKind::Pair { first, second } => {
            line(depth, "pair", out);
            write_expr(first, depth + 1, out);
            write_expr(second, depth + 1, out);
        }
        ExprKind::Name(name) => line(depth, &format!("name {name}"), out),
        ExprKind::Scalar(value) => line(depth, &format!("scalar {value}"), out),
        ExprKind::Unit => line(depth, "unit", out),
        ExprKind::Annotation { name, ty } => {
            line(depth, &format!("annotation {name} :: {ty}"), out)
        }
    }
}

/// Pattern rendering shared with the typed-AST dump.
pub fn write_pattern_for_dump(pattern: &Pattern, depth: usize, out: &mut String) {
    write_pattern(pattern, depth, out);
}

fn write_pattern(pattern: &Pattern, depth: usize, out: &mut String) {
    match &pattern.kind {
        PatternKind::FreeName(name) => line(depth, &format!("free-name {name}"), out),
        PatternKind::PinnedName(name) => line(depth, &format!("pinned-name {name}"), out),
        PatternKind::Scalar(value) => line(depth, &format!("scalar-pattern {value}"), out),
        PatternKind::Pair { first, second } => {
            line(depth, "pair-pattern", out);
            write_pattern(first, depth + 1, out);
            write_pattern(second, depth + 1, out);
        }
        PatternKind::List { initials, rest } => {
            line(depth, "list-pattern", out);
            for initial in initials {
                write_pattern(initial, depth + 1, out);
            }
            if let Some(rest) = rest {
                line(depth + 1, &format!("rest {}", rest.name), out);
            }
        }
        PatternKind::Unit => line(depth, "unit-pattern", out),
    }
}
