//! Integration tests for the Livy parser.
//!
//! Each test lexes real source text, runs EOL inference, parses, and
//! asserts on the shape of the resulting AST.

use livy_lexer::{infer_eols, Lexer};
use livy_parser::ast::{Expr, ExprKind, PatternKind, ScalarValue};
use livy_parser::{parse, ParseErrorKind};

// ── Helpers ────────────────────────────────────────────────────────────

fn parse_source(source: &str) -> Expr {
    let tokens = infer_eols(Lexer::tokenize(source).expect("lexing should succeed"));
    parse(tokens).expect("parsing should succeed")
}

fn parse_error(source: &str) -> ParseErrorKind {
    let tokens = infer_eols(Lexer::tokenize(source).expect("lexing should succeed"));
    parse(tokens).expect_err("parsing should fail").kind
}

/// Unwrap `Apply { func, arg }`.
fn as_apply(expr: &Expr) -> (&Expr, &Expr) {
    match &expr.kind {
        ExprKind::Apply { func, arg } => (func, arg),
        other => panic!("expected apply, got {other:?}"),
    }
}

fn as_name(expr: &Expr) -> &str {
    match &expr.kind {
        ExprKind::Name(name) => name,
        other => panic!("expected name, got {other:?}"),
    }
}

fn as_int(expr: &Expr) -> i64 {
    match &expr.kind {
        ExprKind::Scalar(ScalarValue::Int(value)) => *value,
        other => panic!("expected int scalar, got {other:?}"),
    }
}

// ── Statements and definitions ─────────────────────────────────────────

#[test]
fn define_with_binary_operator() {
    // let x = 1 + 2  =>  Define(x, Apply(Apply(+, 1), 2))
    let ast = parse_source("let x = 1 + 2");
    let ExprKind::Define { target, value } = &ast.kind else {
        panic!("expected define, got {:?}", ast.kind);
    };
    assert_eq!(target.kind, PatternKind::FreeName("x".into()));

    let (func, arg) = as_apply(value);
    assert_eq!(as_int(arg), 2);
    let (op, left) = as_apply(func);
    assert_eq!(as_name(op), "+");
    assert_eq!(as_int(left), 1);
}

#[test]
fn define_function_shorthand_curries_parameters() {
    // let f a b = a  =>  Define(f, Function(a, Function(b, a)))
    let ast = parse_source("let f a b = a");
    let ExprKind::Define { value, .. } = &ast.kind else {
        panic!("expected define");
    };
    let ExprKind::Function { param, body } = &value.kind else {
        panic!("expected outer function");
    };
    assert_eq!(param.kind, PatternKind::FreeName("a".into()));
    let ExprKind::Function { param, body } = &body.kind else {
        panic!("expected inner function");
    };
    assert_eq!(param.kind, PatternKind::FreeName("b".into()));
    assert_eq!(as_name(body), "a");
}

#[test]
fn define_with_pair_pattern_target() {
    let ast = parse_source("let (a, b) = p");
    let ExprKind::Define { target, .. } = &ast.kind else {
        panic!("expected define");
    };
    assert!(matches!(target.kind, PatternKind::Pair { .. }));
}

#[test]
fn block_define_collects_statements_until_end() {
    let ast = parse_source("let x :=\n1\n2\nend");
    let ExprKind::Define { value, .. } = &ast.kind else {
        panic!("expected define");
    };
    let ExprKind::Block(body) = &value.kind else {
        panic!("expected block value, got {:?}", value.kind);
    };
    assert_eq!(body.len(), 2);
}

#[test]
fn program_of_many_statements_is_a_block() {
    let ast = parse_source("let x = 1\nlet y = 2\nx");
    let ExprKind::Block(body) = &ast.kind else {
        panic!("expected block, got {:?}", ast.kind);
    };
    assert_eq!(body.len(), 3);
}

// ── Expressions ────────────────────────────────────────────────────────

#[test]
fn lambda_parses_to_function() {
    let ast = parse_source("\\x -> x");
    let ExprKind::Function { param, body } = &ast.kind else {
        panic!("expected function, got {:?}", ast.kind);
    };
    assert_eq!(param.kind, PatternKind::FreeName("x".into()));
    assert_eq!(as_name(body), "x");
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    // 1 + 2 * 3  =>  (+ 1 (* 2 3))
    let ast = parse_source("1 + 2 * 3");
    let (func, arg) = as_apply(&ast);
    let (op, left) = as_apply(func);
    assert_eq!(as_name(op), "+");
    assert_eq!(as_int(left), 1);
    let (inner_func, inner_arg) = as_apply(arg);
    assert_eq!(as_name(as_apply(inner_func).0), "*");
    assert_eq!(as_int(as_apply(inner_func).1), 2);
    assert_eq!(as_int(inner_arg), 3);
}

#[test]
fn division_associates_right() {
    // 8 / 4 / 2  =>  (/ 8 (/ 4 2))
    let ast = parse_source("8 / 4 / 2");
    let (func, arg) = as_apply(&ast);
    assert_eq!(as_int(as_apply(func).1), 8);
    let (inner_func, inner_arg) = as_apply(arg);
    assert_eq!(as_int(as_apply(inner_func).1), 4);
    assert_eq!(as_int(inner_arg), 2);
}

#[test]
fn subtraction_associates_left() {
    // 8 - 4 - 2  =>  (- (- 8 4) 2)
    let ast = parse_source("8 - 4 - 2");
    let (func, arg) = as_apply(&ast);
    assert_eq!(as_int(arg), 2);
    let (_, left) = as_apply(func);
    let (inner_func, inner_arg) = as_apply(left);
    assert_eq!(as_int(as_apply(inner_func).1), 8);
    assert_eq!(as_int(inner_arg), 4);
}

#[test]
fn comma_builds_right_nested_pairs() {
    // 1, 2, 3  =>  Pair(1, Pair(2, 3))
    let ast = parse_source("1, 2, 3");
    let ExprKind::Pair { first, second } = &ast.kind else {
        panic!("expected pair");
    };
    assert_eq!(as_int(first), 1);
    assert!(matches!(second.kind, ExprKind::Pair { .. }));
}

#[test]
fn application_is_left_folded() {
    // f a b  =>  Apply(Apply(f, a), b)
    let ast = parse_source("f a b");
    let (func, arg) = as_apply(&ast);
    assert_eq!(as_name(arg), "b");
    let (inner_func, inner_arg) = as_apply(func);
    assert_eq!(as_name(inner_func), "f");
    assert_eq!(as_name(inner_arg), "a");
}

#[test]
fn unary_minus_becomes_tilde_application() {
    let ast = parse_source("-x");
    let (func, arg) = as_apply(&ast);
    assert_eq!(as_name(func), "~");
    assert_eq!(as_name(arg), "x");
}

#[test]
fn empty_parens_are_unit() {
    assert_eq!(parse_source("()").kind, ExprKind::Unit);
}

#[test]
fn if_then_else_parses_to_cond() {
    let ast = parse_source("if p then 1 else 2");
    let ExprKind::Cond { pred, cons, alt } = &ast.kind else {
        panic!("expected cond");
    };
    assert_eq!(as_name(pred), "p");
    assert_eq!(as_int(cons), 1);
    assert_eq!(as_int(alt), 2);
}

#[test]
fn list_literal_with_trailing_content() {
    let ast = parse_source("[1, 2, 3]");
    let ExprKind::List(elems) = &ast.kind else {
        panic!("expected list");
    };
    assert_eq!(elems.len(), 3);
}

// ── Match expressions and patterns ─────────────────────────────────────

#[test]
fn match_with_list_patterns() {
    let ast = parse_source("match xs | [] -> 0 | [y, ..ys] -> 1");
    let ExprKind::Match { subject, cases } = &ast.kind else {
        panic!("expected match, got {:?}", ast.kind);
    };
    assert_eq!(as_name(subject), "xs");
    assert_eq!(cases.len(), 2);

    let PatternKind::List { initials, rest } = &cases[0].pattern.kind else {
        panic!("expected list pattern");
    };
    assert!(initials.is_empty());
    assert!(rest.is_none());

    let PatternKind::List { initials, rest } = &cases[1].pattern.kind else {
        panic!("expected list pattern");
    };
    assert_eq!(initials.len(), 1);
    assert_eq!(rest.as_ref().map(|r| r.name.as_str()), Some("ys"));
}

#[test]
fn pinned_and_scalar_patterns() {
    let ast = parse_source("match x | ^y -> 1 | 0 -> 2 | _ -> 3");
    let ExprKind::Match { cases, .. } = &ast.kind else {
        panic!("expected match");
    };
    assert_eq!(cases[0].pattern.kind, PatternKind::PinnedName("y".into()));
    assert_eq!(
        cases[1].pattern.kind,
        PatternKind::Scalar(ScalarValue::Int(0))
    );
    assert!(cases[2].pattern.is_wildcard());
}

#[test]
fn match_without_cases_is_rejected() {
    let err = parse_error("match x");
    assert!(matches!(err, ParseErrorKind::UnexpectedToken { .. }));
}

// ── Annotations and types ──────────────────────────────────────────────

#[test]
fn annotation_statement_parses_the_type() {
    let ast = parse_source("main :: List[String] -> Int");
    let ExprKind::Annotation { name, ty } = &ast.kind else {
        panic!("expected annotation, got {:?}", ast.kind);
    };
    assert_eq!(name, "main");
    assert_eq!(ty.to_string(), "List[String] -> Int");
}

#[test]
fn arrow_types_associate_right() {
    let ast = parse_source("f :: Int -> Int -> Bool");
    let ExprKind::Annotation { ty, .. } = &ast.kind else {
        panic!("expected annotation");
    };
    let (arg, ret) = ty.as_func().expect("should be a function type");
    assert_eq!(arg.to_string(), "Int");
    assert_eq!(ret.to_string(), "Int -> Bool");
}

#[test]
fn lowercase_type_names_are_variables() {
    let ast = parse_source("id :: a -> a");
    let ExprKind::Annotation { ty, .. } = &ast.kind else {
        panic!("expected annotation");
    };
    assert_eq!(ty.to_string(), "a -> a");
}

// ── Errors ─────────────────────────────────────────────────────────────

#[test]
fn unclosed_group_is_rejected() {
    // The synthetic end-of-statement terminator arrives where `)` was
    // expected.
    let err = parse_error("(1 + 2");
    assert!(matches!(
        err,
        ParseErrorKind::UnexpectedToken {
            found: livy_common::token::TokenKind::Eol,
            ..
        }
    ));
}

#[test]
fn unfinished_block_define_reports_eof() {
    let err = parse_error("let x :=\n1");
    assert!(matches!(err, ParseErrorKind::UnexpectedEof { .. }));
}

#[test]
fn huge_integer_literal_overflows() {
    let err = parse_error("99999999999999999999999999");
    assert_eq!(err, ParseErrorKind::NumberOverflow);
}

#[test]
fn stray_operator_is_unexpected() {
    let err = parse_error("let x = * 2");
    assert!(matches!(err, ParseErrorKind::UnexpectedToken { .. }));
}
