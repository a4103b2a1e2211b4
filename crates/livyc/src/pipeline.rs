//! The compilation pipeline, phase by phase.
//!
//! `run_source` threads the raw file bytes through decoding, lexing,
//! EOL inference, parsing, optional definition sorting, type inference,
//! exhaustiveness checking, lowering, the two optimisation passes, and
//! bytecode encoding. The `--lex`/`--parse`/`--type-check` switches stop
//! the pipeline at the named phase and return a textual dump instead.

use livy_codegen::{
    expand_inline, fold_constants, generate_instructions, lower, to_bytecode,
};
use livy_common::diag::Diagnostic;
use livy_lexer::{
    decode_source, infer_eols, normalise_newlines, show_tokens, Lexer, ALL_NEWLINE_FORMS,
};
use livy_parser::printer::show_ast;
use livy_parser::sort::sort_defs;
use livy_parser::parse;
use livy_typeck::printer::show_typed_ast;
use livy_typeck::{check_exhaustiveness, infer_types};

/// Pipeline configuration collected from the command line.
pub struct Options {
    pub encoding: Option<String>,
    pub show_tokens: bool,
    pub show_ast: bool,
    pub show_types: bool,
    pub sort_defs: bool,
    pub compress: bool,
    pub expansion_level: u32,
}

/// What a successful run produced.
pub enum Outcome {
    /// A phase dump requested by `--lex`, `--parse`, or `--type-check`.
    Dump(String),
    /// The encoded bytecode file image.
    Bytecode(Vec<u8>),
}

/// A failed run: the diagnostic plus the decoded source for rendering.
pub struct Failure {
    pub diagnostic: Diagnostic,
    pub source: String,
}

/// Run the whole pipeline over one source file.
pub fn run_source(bytes: &[u8], options: &Options) -> Result<Outcome, Failure> {
    let raw = decode_source(bytes, options.encoding.as_deref()).map_err(|err| Failure {
        diagnostic: err.to_diagnostic(),
        source: String::new(),
    })?;
    let fail = |diagnostic: Diagnostic, source: &str| Failure {
        diagnostic,
        source: source.to_owned(),
    };

    let source = normalise_newlines(&raw, &ALL_NEWLINE_FORMS)
        .map_err(|err| fail(err.to_diagnostic(), &raw))?;

    let tokens = Lexer::tokenize(&source).map_err(|err| fail(err.to_diagnostic(), &source))?;
    let tokens = infer_eols(tokens);
    if options.show_tokens {
        return Ok(Outcome::Dump(show_tokens(&tokens)));
    }

    let ast = parse(tokens).map_err(|err| fail(err.to_diagnostic(), &source))?;
    let ast = if options.sort_defs { sort_defs(ast) } else { ast };
    if options.show_ast {
        return Ok(Outcome::Dump(show_ast(&ast)));
    }

    let typed = infer_types(ast).map_err(|err| fail(err.to_diagnostic(), &source))?;
    if options.show_types {
        return Ok(Outcome::Dump(show_typed_ast(&typed)));
    }
    check_exhaustiveness(&typed).map_err(|err| fail(err.to_diagnostic(), &source))?;

    let lowered = lower(typed).map_err(|err| fail(err.to_diagnostic(), &source))?;
    let folded = fold_constants(lowered);
    let expanded = expand_inline(folded, options.expansion_level);
    let instructions = generate_instructions(&expanded);
    let bytecode = to_bytecode(&instructions, options.compress)
        .map_err(|err| fail(err.to_diagnostic(), &source))?;
    Ok(Outcome::Bytecode(bytecode))
}
