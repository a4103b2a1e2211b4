//! The Livy compiler CLI.
//!
//! `livyc FILE` compiles a Livy source file to bytecode, written next
//! to the input with a `.livy` extension (or to `-o`). The
//! `--lex`/`--parse`/`--type-check` switches stop after the named phase
//! and print a dump instead. Errors render in the format selected with
//! `-r` and go to the output sink.
//!
//! Exit codes: 0 on success, 64 when the file argument is missing, 65
//! when the path is a directory, 66 when the input cannot be read, and
//! 1 for compilation errors.

mod pipeline;

use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use livy_common::diag::{render, Diagnostic, ReportFormat};
use pipeline::{Options, Outcome};

const EXIT_MISSING_FILE: u8 = 64;
const EXIT_IS_FOLDER: u8 = 65;
const EXIT_UNREADABLE: u8 = 66;

#[derive(Parser)]
#[command(
    name = "livyc",
    version,
    about = "The Livy compiler",
    disable_version_flag = true
)]
struct Cli {
    /// The source file to compile.
    file: Option<PathBuf>,

    /// Print the version number and quit.
    #[arg(short = 'v', long = "version")]
    version: bool,

    /// Where to write the output. Also accepts "stdout" and "stderr".
    #[arg(short, long)]
    out: Option<String>,

    /// The format of any error message that may arise.
    #[arg(short = 'r', long = "report-fmt", value_enum, default_value_t = ReportFmt::Long)]
    report_fmt: ReportFmt,

    /// The encoding of the file.
    #[arg(short, long)]
    encoding: Option<String>,

    /// Lex the file and show the resulting tokens.
    #[arg(long = "lex")]
    lex: bool,

    /// Parse the file and show the resulting AST.
    #[arg(long = "parse")]
    parse: bool,

    /// Type check the file and show the resulting AST with types.
    #[arg(long = "type-check")]
    type_check: bool,

    /// Sort statements so definitions come before usages.
    #[arg(long = "sort-defs")]
    sort_defs: bool,

    /// Skip the run-length compression of the bytecode.
    #[arg(long = "no-compress")]
    no_compress: bool,

    /// How aggressive inline expansion should be.
    #[arg(
        long = "expansion-level",
        default_value_t = 1,
        value_parser = clap::value_parser!(u32).range(1..=3)
    )]
    expansion_level: u32,
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportFmt {
    Json,
    Long,
    Short,
}

impl From<ReportFmt> for ReportFormat {
    fn from(fmt: ReportFmt) -> ReportFormat {
        match fmt {
            ReportFmt::Json => ReportFormat::Json,
            ReportFmt::Long => ReportFormat::Long,
            ReportFmt::Short => ReportFormat::Short,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    run(cli)
}

fn run(cli: Cli) -> ExitCode {
    let format = ReportFormat::from(cli.report_fmt);
    if cli.version {
        println!("livyc {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }
    let Some(file) = cli.file.as_deref() else {
        report_cmd_error(
            Diagnostic::new("cmd_error", "no source file was given"),
            format,
        );
        return ExitCode::from(EXIT_MISSING_FILE);
    };
    if file.is_dir() {
        report_cmd_error(
            Diagnostic::new(
                "cmd_error",
                format!("`{}` is a folder, not a source file", file.display()),
            ),
            format,
        );
        return ExitCode::from(EXIT_IS_FOLDER);
    }
    let bytes = match std::fs::read(file) {
        Ok(bytes) => bytes,
        Err(err) => {
            let reason = match err.kind() {
                std::io::ErrorKind::PermissionDenied => "cannot be read (no permission)",
                _ => "could not be found",
            };
            report_cmd_error(
                Diagnostic::new(
                    "cmd_error",
                    format!("`{}` {reason}", file.display()),
                ),
                format,
            );
            return ExitCode::from(EXIT_UNREADABLE);
        }
    };

    let options = Options {
        encoding: cli.encoding.clone(),
        show_tokens: cli.lex,
        show_ast: cli.parse,
        show_types: cli.type_check,
        sort_defs: cli.sort_defs,
        compress: !cli.no_compress,
        expansion_level: cli.expansion_level,
    };

    // Anything that escapes the error taxonomy surfaces as a
    // FatalInternal diagnostic rather than a panic message.
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        pipeline::run_source(&bytes, &options)
    }))
    .unwrap_or_else(|_| {
            Err(pipeline::Failure {
                diagnostic: Diagnostic::fatal_internal(),
                source: String::from_utf8_lossy(&bytes).into_owned(),
            })
        });

    match result {
        Ok(Outcome::Dump(text)) => {
            write_text(cli.out.as_deref(), &text);
            ExitCode::SUCCESS
        }
        Ok(Outcome::Bytecode(bytecode)) => write_bytecode(file, cli.out.as_deref(), &bytecode),
        Err(failure) => {
            let rendered = render(
                &failure.diagnostic,
                format,
                &failure.source,
                &file.display().to_string(),
            );
            write_text(cli.out.as_deref(), &rendered);
            ExitCode::FAILURE
        }
    }
}

fn report_cmd_error(diagnostic: Diagnostic, format: ReportFormat) {
    eprintln!("{}", render(&diagnostic, format, "", "livyc"));
}

/// Diagnostics and dumps go to the selected sink; stdout by default.
fn write_text(out: Option<&str>, text: &str) {
    match out {
        None | Some("stdout") => println!("{text}"),
        Some("stderr") => eprintln!("{text}"),
        Some(path) => {
            if std::fs::write(path, text).is_err() {
                eprintln!("{text}");
            }
        }
    }
}

/// Bytecode goes to the `-o` path, or next to the input with a `.livy`
/// extension. It is written atomically and never to a terminal.
fn write_bytecode(input: &Path, out: Option<&str>, bytecode: &[u8]) -> ExitCode {
    let path = match out {
        Some("stdout") => {
            if std::io::stdout().is_terminal() {
                eprintln!("error: refusing to write bytecode to a terminal");
                return ExitCode::FAILURE;
            }
            let mut stdout = std::io::stdout().lock();
            if stdout.write_all(bytecode).and_then(|()| stdout.flush()).is_err() {
                return ExitCode::FAILURE;
            }
            return ExitCode::SUCCESS;
        }
        Some("stderr") => {
            if std::io::stderr().is_terminal() {
                eprintln!("error: refusing to write bytecode to a terminal");
                return ExitCode::FAILURE;
            }
            let mut stderr = std::io::stderr().lock();
            if stderr.write_all(bytecode).and_then(|()| stderr.flush()).is_err() {
                return ExitCode::FAILURE;
            }
            return ExitCode::SUCCESS;
        }
        Some(path) => PathBuf::from(path),
        None => input.with_extension("livy"),
    };

    match write_atomic(&path, bytecode) {
        Ok(()) => {
            eprintln!("bytecode written to {}", path.display());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: cannot write `{}`: {err}", path.display());
            let code = match err.kind() {
                std::io::ErrorKind::PermissionDenied | std::io::ErrorKind::NotFound => {
                    EXIT_UNREADABLE
                }
                _ => 1,
            };
            ExitCode::from(code)
        }
    }
}

/// Write through a sibling temp file and rename it into place, so a
/// failed run never leaves a truncated output file behind.
fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)
}
