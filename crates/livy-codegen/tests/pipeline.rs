//! End-to-end pipeline tests: source text through lexing, parsing,
//! inference, lowering, folding, inlining, and instruction generation.

use livy_codegen::{
    expand_inline, fold_constants, generate_instructions, lower, to_bytecode, Instruction,
    Lowered, NativeOp,
};
use livy_lexer::{infer_eols, Lexer};
use livy_parser::parse;
use livy_typeck::{check_exhaustiveness, infer_types};

// ── Helpers ────────────────────────────────────────────────────────────

fn lower_source(source: &str) -> Lowered {
    let tokens = infer_eols(Lexer::tokenize(source).expect("lexing should succeed"));
    let ast = parse(tokens).expect("parsing should succeed");
    let typed = infer_types(ast).expect("inference should succeed");
    check_exhaustiveness(&typed).expect("patterns should be exhaustive");
    lower(typed).expect("lowering should succeed")
}

fn optimise_source(source: &str) -> Lowered {
    expand_inline(fold_constants(lower_source(source)), 1)
}

fn instructions_for(source: &str) -> Vec<Instruction> {
    generate_instructions(&optimise_source(source))
}

// ── Lowering shapes ────────────────────────────────────────────────────

#[test]
fn operator_application_lowers_to_native_op() {
    let lowered = lower_source("1 + 2");
    assert_eq!(
        lowered,
        Lowered::native(NativeOp::Add, Lowered::int(1), Some(Lowered::int(2)))
    );
}

#[test]
fn unary_minus_lowers_to_native_negate() {
    let lowered = lower_source("let y = 1\n-y");
    let Lowered::Block(body) = lowered else {
        panic!("expected block");
    };
    assert_eq!(
        body[1],
        Lowered::native(NativeOp::Neg, Lowered::name("y"), None)
    );
}

#[test]
fn pair_parameter_decomposes_into_projections() {
    // let pair (a, b) = a
    let lowered = lower_source("let pair (a, b) = a");
    let Lowered::Define { name, value } = lowered else {
        panic!("expected define");
    };
    assert_eq!(name, "pair");
    let Lowered::Function { param, body } = *value else {
        panic!("expected function value");
    };
    let Lowered::Block(stmts) = *body else {
        panic!("expected projection block");
    };
    assert_eq!(
        stmts[0],
        Lowered::define(
            "a",
            Lowered::apply(Lowered::name("first"), Lowered::name(&param)),
        )
    );
    assert_eq!(
        stmts[1],
        Lowered::define(
            "b",
            Lowered::apply(Lowered::name("second"), Lowered::name(&param)),
        )
    );
    assert_eq!(stmts[2], Lowered::name("a"));
}

#[test]
fn match_on_lists_becomes_a_conditional_cascade() {
    // match xs | [] -> 0 | [y, ..ys] -> 1
    let lowered = lower_source("let xs = [9]\nmatch xs | [] -> 0 | [y, ..ys] -> 1");
    let Lowered::Block(body) = lowered else {
        panic!("expected block");
    };
    let Lowered::Cond { pred, cons, alt } = &body[1] else {
        panic!("expected cond, got {:?}", body[1]);
    };

    // Predicate: length(xs) = 0.
    assert_eq!(
        **pred,
        Lowered::native(
            NativeOp::Equal,
            Lowered::apply(Lowered::name("length"), Lowered::name("xs")),
            Some(Lowered::int(0)),
        )
    );
    assert_eq!(**cons, Lowered::int(0));

    // Default branch binds y and ys, then yields 1.
    let Lowered::Block(stmts) = alt.as_ref() else {
        panic!("expected default block, got {alt:?}");
    };
    assert_eq!(
        stmts[0],
        Lowered::define(
            "y",
            Lowered::apply(
                Lowered::name("at"),
                Lowered::pair(Lowered::name("xs"), Lowered::int(0)),
            ),
        )
    );
    assert_eq!(
        stmts[1],
        Lowered::define(
            "ys",
            Lowered::apply(
                Lowered::name("drop"),
                Lowered::pair(Lowered::name("xs"), Lowered::int(1)),
            ),
        )
    );
    assert_eq!(stmts[2], Lowered::int(1));
}

#[test]
fn wildcard_definition_keeps_only_the_value() {
    let lowered = lower_source("let _ = 1 + 2");
    assert_eq!(
        lowered,
        Lowered::native(NativeOp::Add, Lowered::int(1), Some(Lowered::int(2)))
    );
}

// ── Folding and inlining over real programs ────────────────────────────

#[test]
fn constant_definition_folds_to_one_load() {
    // Scenario: let x = 1 + 2 compiles to LOAD_INT 3, STORE_NAME 0.
    assert_eq!(
        instructions_for("let x = 1 + 2"),
        vec![Instruction::LoadInt(3), Instruction::StoreName(0)]
    );
}

#[test]
fn known_conditional_folds_to_its_branch() {
    // Scenario: if True then 1 else 2 compiles to LOAD_INT 1.
    assert_eq!(
        instructions_for("if True then 1 else 2"),
        vec![Instruction::LoadInt(1)]
    );
}

#[test]
fn lambda_compiles_to_a_function_load() {
    // Scenario: \x -> x emits LOAD_FUNC over a single parameter load.
    assert_eq!(
        instructions_for("\\x -> x"),
        vec![Instruction::LoadFunc(vec![Instruction::LoadName {
            depth: 1,
            index: 0
        }])]
    );
}

#[test]
fn small_named_function_is_inlined_at_its_call_site() {
    let instructions = instructions_for("let inc = \\n -> n + 1\ninc 41");
    // The call is gone: the tail of the stream is the substituted body
    // (right operand, left operand, NATIVE add) with no APPLY.
    assert!(
        !instructions.contains(&Instruction::Apply),
        "the call should have been inlined, got {instructions:?}"
    );
    assert_eq!(
        &instructions[instructions.len() - 3..],
        &[
            Instruction::LoadInt(1),
            Instruction::LoadInt(41),
            Instruction::Native(1),
        ]
    );
}

// ── Full bytecode ──────────────────────────────────────────────────────

#[test]
fn bytecode_stream_is_slot_aligned() {
    let tree = optimise_source("let x = 1 + 2\nlet y = x");
    let bytecode = to_bytecode(&generate_instructions(&tree), false).unwrap();
    // tag (2) + header (32) + separator (3), then 8-byte slots.
    assert_eq!((bytecode.len() - 2 - 32 - 3) % 8, 0);
}

#[test]
fn compression_roundtrips_the_body() {
    let tree = optimise_source("let x = 0\nlet y = 0\nlet z = 0");
    let instructions = generate_instructions(&tree);
    let plain = to_bytecode(&instructions, false).unwrap();
    let tagged = to_bytecode(&instructions, true).unwrap();
    match tagged[1] {
        0xFF => assert_eq!(livy_codegen::rle::decompress(&tagged[2..]), &plain[2..]),
        0x00 => assert_eq!(tagged, plain),
        other => panic!("unexpected format tag byte {other:#x}"),
    }
}
