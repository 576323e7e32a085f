use inkwell::builder::BuilderError;
use thiserror::Error;

pub type CodegenResult<T> = Result<T, CodegenError>;

#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("Unknown variable `{name}`")]
    UnknownVariable { name: String },
    #[error("Deferred binding `{name}` refers to itself")]
    CyclicDeferred { name: String },
    #[error("Deferred binding `{name}` would only hold on some paths through an `if` or `while`")]
    DeferredUnderBranch { name: String },
    #[error("Call to undefined function `{name}`")]
    UnknownFunction { name: String },
    #[error("Function `{name}` expected {expected} arguments but received {received}")]
    ArityMismatch {
        name: String,
        expected: usize,
        received: usize,
    },
    #[error("LLVM builder error: {0}")]
    Builder(#[from] BuilderError),
    #[error("Generated function `{name}` is invalid")]
    InvalidFunction { name: String },
    #[error("Module failed verification: {0}")]
    InvalidModule(String),
    #[error("Failed to write IR: {0}")]
    WriteIr(String),
    #[error("JIT execution failed: {0}")]
    Jit(String),
}

impl CodegenError {
    /// Warnings lower to a constant 0 instead of aborting the input.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            CodegenError::UnknownFunction { .. } | CodegenError::ArityMismatch { .. }
        )
    }
}
