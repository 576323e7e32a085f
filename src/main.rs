use blc::{
    diagnostics::{emit_syntax_errors, report_io_error},
    driver::{run_interactive, run_program, SessionConfig, Summary},
    language::parser::parse_source,
    runtime::context::DEFAULT_MAX_DEPTH,
};
use clap::Parser;
use miette::{miette, IntoDiagnostic};
use std::{
    fs,
    io::{self, Read},
    path::PathBuf,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "blc")]
#[command(about = "Interpret and compile programs written in the blc expression language")]
struct Options {
    /// Source file; reads stdin when omitted
    file: Option<PathBuf>,

    /// Run each statement of stdin as soon as it is complete
    #[arg(long, conflicts_with = "file")]
    interactive: bool,

    /// Skip interpretation
    #[arg(long)]
    no_interpret: bool,

    /// Print the syntax tree of every statement as JSON
    #[arg(long)]
    tree: bool,

    /// Print the generated LLVM IR
    #[arg(long)]
    llvm: bool,

    /// Run the generated IR with the JIT and print each input's result
    #[arg(long)]
    jit: bool,

    /// Write the generated LLVM IR to this file
    #[arg(long, value_name = "PATH")]
    emit_ir: Option<PathBuf>,

    /// Abort a statement after this many interpreter steps
    #[arg(long)]
    step_limit: Option<u64>,

    /// Maximum nesting of calls and deferred reads
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,
}

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("BLC_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let options = Options::parse();
    let config = SessionConfig {
        interpret: !options.no_interpret,
        tree: options.tree,
        llvm: options.llvm,
        jit: options.jit,
        emit_ir: options.emit_ir.clone(),
        step_limit: options.step_limit,
        max_depth: options.max_depth,
    };
    let mut stdout = io::stdout();

    let summary = if options.interactive {
        run_interactive(io::stdin().lock(), config, io::stdout(), &mut stdout).into_diagnostic()?
    } else {
        run_batch(&options, config, &mut stdout)?
    };

    if summary.failures() > 0 {
        return Err(miette!("{} statement(s) failed", summary.failures()));
    }
    Ok(())
}

/// Parses the whole source up front and runs it only when it is error free.
fn run_batch(
    options: &Options,
    config: SessionConfig,
    stdout: &mut io::Stdout,
) -> miette::Result<Summary> {
    let (name, source) = read_source(options)?;

    let program = match parse_source(&source) {
        Ok(program) => program,
        Err(errors) => {
            emit_syntax_errors(&name, &source, &errors);
            return Err(miette!("{} syntax error(s) in {}", errors.errors.len(), name));
        }
    };
    tracing::debug!(statements = program.statements.len(), "parsed {name}");
    run_program(&program, config, io::stdout(), stdout).into_diagnostic()
}

fn read_source(options: &Options) -> miette::Result<(String, String)> {
    match &options.file {
        Some(path) => match fs::read_to_string(path) {
            Ok(source) => Ok((path.display().to_string(), source)),
            Err(err) => {
                report_io_error(path, &err);
                Err(miette!("could not read {}", path.display()))
            }
        },
        None => {
            let mut source = String::new();
            io::stdin().read_to_string(&mut source).into_diagnostic()?;
            Ok(("<stdin>".to_string(), source))
        }
    }
}
