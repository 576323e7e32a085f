use crate::{
    compiler::CodegenError,
    language::errors::{SyntaxError, SyntaxErrors},
    runtime::error::RuntimeError,
};
use miette::{Diagnostic, NamedSource, Report, SourceSpan};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic, Clone)]
#[error("{message}")]
#[diagnostic(code(blc::syntax))]
pub struct SyntaxDiagnostic {
    #[source_code]
    src: NamedSource<String>,
    #[label("{label}")]
    span: SourceSpan,
    #[help]
    help: Option<String>,
    message: String,
    label: String,
}

impl SyntaxDiagnostic {
    pub fn from_error(src: NamedSource<String>, err: SyntaxError) -> Self {
        Self {
            src,
            span: err.to_source_span(),
            help: err.help,
            message: err.message,
            label: err.label,
        }
    }
}

/// Renders each syntax error with its source snippet.
pub fn render_syntax_errors(name: &str, source: &str, errors: &SyntaxErrors) -> Vec<String> {
    let src = NamedSource::new(name, source.to_string());
    errors
        .errors
        .iter()
        .map(|err| {
            let diagnostic = SyntaxDiagnostic::from_error(src.clone(), err.clone());
            format!("{:?}", Report::new(diagnostic))
        })
        .collect()
}

pub fn emit_syntax_errors(name: &str, source: &str, errors: &SyntaxErrors) {
    for rendered in render_syntax_errors(name, source, errors) {
        eprintln!("{rendered}");
    }
}

pub fn report_runtime_error(error: &RuntimeError) {
    eprintln!("Runtime error: {}", error);
}

pub fn report_codegen_error(error: &CodegenError) {
    if error.is_warning() {
        eprintln!("Codegen warning: {}", error);
    } else {
        eprintln!("Codegen error: {}", error);
    }
}

pub fn report_io_error(path: &Path, error: &std::io::Error) {
    eprintln!("Failed to access {}: {}", path.display(), error);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::parser::parse_source;

    #[test]
    fn rendered_error_names_source_and_message() {
        let source = "x = 1 +;";
        let errors = parse_source(source).expect_err("incomplete expression");
        let rendered = render_syntax_errors("input.bl", source, &errors);
        assert_eq!(rendered.len(), 1);
        assert!(rendered[0].contains("input.bl"), "{}", rendered[0]);
        assert!(rendered[0].contains("Unexpected `;` in expression"), "{}", rendered[0]);
    }
}
