//! Indented tree rendering of the typed AST, for the `--type-check` dump.

use livy_parser::printer::write_pattern_for_dump;

use crate::typed::{TypedExpr, TypedExprKind};

/// Render the typed AST as an indented tree with `: type` suffixes.
pub fn show_typed_ast(expr: &TypedExpr) -> String {
    let mut out = String::new();
    write_typed(expr, 0, &mut out);
    out
}

fn line(depth: usize, text: &str, out: &mut String) {
    for _ in 0..depth {
        out.push_str("  ");
    }
    out.push_str(text);
    out.push('\n');
}

fn write_typed(expr: &TypedExpr, depth: usize, out: &mut String) {
    let ty = &expr.ty;
    match &expr.kind {
        TypedExprKind::Apply { func, arg } => {
            line(depth, &format!("apply : {ty}"), out);
            write_typed(func, depth + 1, out);
            write_typed(arg, depth + 1, out);
        }
        TypedExprKind::Block(body) => {
            line(depth, &format!("block : {ty}"), out);
            for stmt in body {
                write_typed(stmt, depth + 1, out);
            }
        }
        TypedExprKind::Cond { pred, cons, alt } => {
            line(depth, &format!("cond : {ty}"), out);
            write_typed(pred, depth + 1, out);
            write_typed(cons, depth + 1, out);
            write_typed(alt, depth + 1, out);
        }
        TypedExprKind::Define { target, value } => {
            line(depth, &format!("define : {ty}"), out);
            write_pattern_for_dump(target, depth + 1, out);
            write_typed(value, depth + 1, out);
        }
        TypedExprKind::Function { param, body } => {
            line(depth, &format!("function : {ty}"), out);
            write_pattern_for_dump(param, depth + 1, out);
            write_typed(body, depth + 1, out);
        }
        TypedExprKind::List(elems) => {
            line(depth, &format!("list : {ty}"), out);
            for elem in elems {
                write_typed(elem, depth + 1, out);
            }
        }
        TypedExprKind::Match { subject, cases } => {
            line(depth, &format!("match : {ty}"), out);
            write_typed(subject, depth + 1, out);
            for case in cases {
                line(depth + 1, "case", out);
                write_pattern_for_dump(&case.pattern, depth + 2, out);
                write_typed(&case.body, depth + 2, out);
            }
        }
        TypedExprKind::Pair { first, second } => {
            line(depth, &format!("pair : {ty}"), out);
            write_typed(first, depth + 1, out);
            write_typed(second, depth + 1, out);
        }
        TypedExprKind::Name(name) => line(depth, &format!("name {name} : {ty}"), out),
        TypedExprKind::Scalar(value) => line(depth, &format!("scalar {value} : {ty}"), out),
        TypedExprKind::Unit => line(depth, &format!("unit : {ty}"), out),
        TypedExprKind::Annotation { name, declared } => {
            line(depth, &format!("annotation {name} :: {declared}"), out)
        }
    }
}
