use thiserror::Error;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Use of undefined variable `{name}`")]
    UndefinedVariable { name: String },
    #[error("Call to undefined function `{name}`")]
    UndefinedFunction { name: String },
    #[error("Function `{name}` expected {expected} arguments but received {received}")]
    ArityMismatch {
        name: String,
        expected: usize,
        received: usize,
    },
    #[error("Step limit of {limit} exceeded")]
    StepLimitExceeded { limit: u64 },
    #[error("Recursion depth limit of {limit} exceeded")]
    RecursionLimit { limit: usize },
    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

impl RuntimeError {
    /// Recoverable errors are reported and replaced by 0; the rest abort the
    /// current top-level statement.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RuntimeError::UndefinedVariable { .. }
                | RuntimeError::UndefinedFunction { .. }
                | RuntimeError::ArityMismatch { .. }
        )
    }
}
