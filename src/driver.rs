use crate::{
    compiler::{CodegenError, Compiler},
    diagnostics::{emit_syntax_errors, report_codegen_error, report_runtime_error},
    language::{ast::*, errors::SyntaxErrors, parser::parse_source, tree::TreeDocument},
    runtime::{
        context::{Context, DEFAULT_MAX_DEPTH},
        error::RuntimeError,
    },
};
use inkwell::context::Context as LlvmContext;
use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Failed to write output: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to serialize syntax tree: {0}")]
    Tree(#[from] serde_json::Error),
    #[error(transparent)]
    Codegen(#[from] CodegenError),
}

/// What a session does with every parsed statement.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub interpret: bool,
    pub tree: bool,
    pub llvm: bool,
    pub jit: bool,
    /// Where to write the module as textual IR once the session finishes.
    pub emit_ir: Option<PathBuf>,
    pub step_limit: Option<u64>,
    pub max_depth: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            interpret: true,
            tree: false,
            llvm: false,
            jit: false,
            emit_ir: None,
            step_limit: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl SessionConfig {
    fn lowers(&self) -> bool {
        self.llvm || self.jit || self.emit_ir.is_some()
    }
}

#[derive(Debug, Default)]
pub struct Summary {
    pub statements: usize,
    /// Interpreter results, one per statement that ran to completion.
    pub results: Vec<f64>,
    /// JIT results, one per successfully lowered statement.
    pub jit_results: Vec<f64>,
    pub runtime_errors: Vec<RuntimeError>,
    pub codegen_errors: Vec<CodegenError>,
    /// Syntax errors of inputs rejected in interactive mode.
    pub syntax_errors: usize,
    /// Recovered runtime diagnostics plus codegen warnings.
    pub warnings: usize,
}

impl Summary {
    /// Fatal errors only; recovered diagnostics and codegen warnings do not count.
    pub fn failures(&self) -> usize {
        self.runtime_errors.len() + self.codegen_errors.len() + self.syntax_errors
    }
}

/// Runs statements one at a time through the engines enabled in the config,
/// sharing one interpreter context and one compiler across all of them.
pub struct Session<'ast, 'ctx> {
    config: SessionConfig,
    context: Context<'ast>,
    compiler: Option<Compiler<'ast, 'ctx>>,
    summary: Summary,
}

impl<'ast, 'ctx> Session<'ast, 'ctx> {
    pub fn new(
        config: SessionConfig,
        llvm: &'ctx LlvmContext,
        output: impl Write + 'static,
    ) -> Self {
        let mut context = Context::with_output(output).with_max_depth(config.max_depth);
        if let Some(limit) = config.step_limit {
            context = context.with_step_limit(limit);
        }
        let compiler = config.lowers().then(|| Compiler::new(llvm, "blc"));
        Self {
            config,
            context,
            compiler,
            summary: Summary::default(),
        }
    }

    pub fn feed(
        &mut self,
        statement: &'ast Statement,
        out: &mut dyn Write,
    ) -> Result<(), DriverError> {
        self.summary.statements += 1;

        if self.config.interpret {
            match self.context.interpret(statement) {
                Ok(value) => self.summary.results.push(value),
                Err(err) => {
                    report_runtime_error(&err);
                    self.summary.runtime_errors.push(err);
                }
            }
            self.summary.warnings += self.context.take_diagnostics().len();
        }

        if self.config.tree {
            let document = TreeDocument::statement(statement);
            writeln!(out, "Parsed Syntax Tree:\n{}", document.to_json_pretty()?)?;
        }

        if let Some(compiler) = self.compiler.as_mut() {
            if let Err(err) = compiler.lower(statement) {
                report_codegen_error(&err);
                self.summary.codegen_errors.push(err);
            }
            self.summary.warnings += compiler.take_diagnostics().len();
        }
        Ok(())
    }

    /// Renders an input that failed to parse; the session carries on.
    pub fn reject(&mut self, name: &str, source: &str, errors: &SyntaxErrors) {
        emit_syntax_errors(name, source, errors);
        self.summary.syntax_errors += errors.errors.len();
    }

    /// Prints, writes and runs the module as requested.
    pub fn finish(mut self, out: &mut dyn Write) -> Result<Summary, DriverError> {
        if let Some(compiler) = self.compiler.as_ref() {
            if self.config.llvm {
                write!(out, "{}", compiler.print_ir())?;
            }
            if let Some(path) = &self.config.emit_ir {
                compiler.write_ir_to(path)?;
                tracing::debug!(path = %path.display(), "wrote IR");
            }
            if self.config.jit {
                let results = compiler.run()?;
                for value in &results {
                    writeln!(out, "jit => {value}")?;
                }
                self.summary.jit_results = results;
            }
        }
        out.flush()?;
        Ok(self.summary)
    }
}

/// Runs a whole program through one session.
pub fn run_program(
    program: &Program,
    config: SessionConfig,
    output: impl Write + 'static,
    out: &mut dyn Write,
) -> Result<Summary, DriverError> {
    let llvm = LlvmContext::create();
    let mut session = Session::new(config, &llvm, output);
    for statement in &program.statements {
        session.feed(statement, out)?;
    }
    session.finish(out)
}

/// Reads `input` line by line and runs every statement as soon as the text
/// read so far parses. Text that is merely unfinished waits for more lines;
/// text with any other syntax error is reported and dropped.
pub fn run_interactive(
    input: impl BufRead,
    config: SessionConfig,
    output: impl Write + 'static,
    out: &mut dyn Write,
) -> Result<Summary, DriverError> {
    let llvm = LlvmContext::create();
    let mut session = Session::new(config, &llvm, output);
    let mut pending = String::new();
    let mut first_line = 1;

    for (index, line) in input.lines().enumerate() {
        if pending.is_empty() {
            first_line = index + 1;
        }
        pending.push_str(&line?);
        pending.push('\n');
        match parse_source(&pending) {
            Ok(program) => {
                session.feed_input(program, out)?;
                pending.clear();
            }
            Err(errors) if errors.ends_early(&pending) => continue,
            Err(errors) => {
                session.reject(&format!("<stdin>:{first_line}"), &pending, &errors);
                pending.clear();
            }
        }
    }

    if !pending.trim().is_empty() {
        match parse_source(&pending) {
            Ok(program) => session.feed_input(program, out)?,
            Err(errors) => session.reject(&format!("<stdin>:{first_line}"), &pending, &errors),
        }
    }
    session.finish(out)
}

impl<'ctx> Session<'static, 'ctx> {
    /// Feeds every statement of one interactive input. Bindings and function
    /// registrations borrow the tree for the rest of the session, so the input
    /// is kept alive until the process exits.
    fn feed_input(&mut self, program: Program, out: &mut dyn Write) -> Result<(), DriverError> {
        let program: &'static Program = Box::leak(Box::new(program));
        for statement in &program.statements {
            self.feed(statement, out)?;
        }
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::parser::parse_source;
    use pretty_assertions::assert_eq;

    #[test]
    fn interpretation_continues_after_fatal_statement() {
        let program = parse_source("x = 1; while (1) x = x + 1; y = 2; y;").expect("parse");
        let config = SessionConfig {
            step_limit: Some(50),
            ..SessionConfig::default()
        };
        let mut out = Vec::new();
        let summary = run_program(&program, config, io::sink(), &mut out).expect("run");
        assert_eq!(summary.statements, 4);
        assert_eq!(summary.runtime_errors.len(), 1);
        assert_eq!(summary.results, vec![1.0, 2.0, 2.0]);
    }

    #[test]
    fn tree_dump_is_written_per_statement() {
        let program = parse_source("a = 1; a + 2;").expect("parse");
        let config = SessionConfig {
            interpret: false,
            tree: true,
            ..SessionConfig::default()
        };
        let mut out = Vec::new();
        run_program(&program, config, io::sink(), &mut out).expect("run");
        let text = String::from_utf8(out).expect("utf8");
        assert_eq!(text.matches("Parsed Syntax Tree:").count(), 2);
        assert!(text.contains("\"type\": \"ValueAssign\""), "{text}");
        assert!(text.contains("\"operator\": \"+\""), "{text}");
    }

    #[test]
    fn both_engines_agree_through_a_session() {
        let program = parse_source("fn sq(v) { v * v; } n = 3; sq(n) + 1;").expect("parse");
        let config = SessionConfig {
            llvm: true,
            jit: true,
            ..SessionConfig::default()
        };
        let mut out = Vec::new();
        let summary = run_program(&program, config, io::sink(), &mut out).expect("run");
        assert_eq!(summary.results, vec![0.0, 3.0, 10.0]);
        assert_eq!(summary.jit_results, summary.results);
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("define double @sq(double %v)"), "{text}");
        assert!(text.contains("jit => 10"), "{text}");
    }

    #[test]
    fn codegen_errors_are_collected() {
        let program = parse_source("x := x + 1; missing();").expect("parse");
        let config = SessionConfig {
            interpret: false,
            llvm: true,
            ..SessionConfig::default()
        };
        let mut out = Vec::new();
        let summary = run_program(&program, config, io::sink(), &mut out).expect("run");
        assert_eq!(summary.codegen_errors.len(), 1);
        assert_eq!(summary.warnings, 1);
        assert_eq!(summary.failures(), 1);
    }

    #[test]
    fn interactive_input_runs_as_soon_as_it_parses() {
        let input = "a = 1;\nb = (;\n{\n  a = a + 1;\n}\na;\nfn inc(v) {\n  v + 1;\n}\ninc(a);\nc = 3";
        let mut out = Vec::new();
        let summary = run_interactive(
            io::Cursor::new(input),
            SessionConfig::default(),
            io::sink(),
            &mut out,
        )
        .expect("run");
        assert_eq!(summary.statements, 5);
        assert_eq!(summary.results, vec![1.0, 0.0, 2.0, 0.0, 3.0]);
        assert_eq!(summary.syntax_errors, 2);
        assert_eq!(summary.failures(), 2);
    }

    #[test]
    fn emit_ir_writes_the_module() {
        let program = parse_source("x = 2; x * 3;").expect("parse");
        let path = std::env::temp_dir().join(format!("blc-emit-{}.ll", std::process::id()));
        let config = SessionConfig {
            interpret: false,
            emit_ir: Some(path.clone()),
            ..SessionConfig::default()
        };
        let mut out = Vec::new();
        run_program(&program, config, io::sink(), &mut out).expect("run");
        let text = std::fs::read_to_string(&path).expect("IR file");
        std::fs::remove_file(&path).ok();
        assert!(text.contains("@x = global double 0.000000e+00"), "{text}");
        assert!(text.contains("define double @__input-1()"), "{text}");
        assert!(out.is_empty());
    }
}
