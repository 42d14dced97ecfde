//! Compilation errors
//!
//! Every failure is terminal for the compilation unit. Internal-consistency
//! variants carry the callable, binding and scope involved so a defect in
//! the analysis pipeline can be located without a debugger.

use thiserror::Error;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("{callable}: no storage registered for binding '{binding}' declared in {scope}")]
    UnregisteredBinding {
        callable: String,
        binding: String,
        scope: String,
    },

    #[error("{callable}: binding '{binding}' lives in {scope}, which is missing from the scope chain")]
    MissingChainScope {
        callable: String,
        binding: String,
        scope: String,
    },

    #[error("{callable}: unknown scope {scope}")]
    UnknownScope { callable: String, scope: String },

    #[error("{callable}: malformed exception regions: {message}")]
    MalformedRegions { callable: String, message: String },

    #[error("{callable}: invalid suspension point: {message}")]
    InvalidSuspension { callable: String, message: String },

    #[error("{callable}: invalid jump: {message}")]
    InvalidJump { callable: String, message: String },

    #[error("Unsupported feature: {feature}")]
    UnsupportedFeature { feature: String },

    #[error("Invalid compile options: {message}")]
    Config { message: String },

    #[error("Internal compiler error: {message}")]
    Internal { message: String },
}

impl CompileError {
    /// Shorthand for an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        CompileError::Internal {
            message: message.into(),
        }
    }

    /// Whether this error indicates a defect in the compiler itself rather
    /// than in its input
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            CompileError::UnregisteredBinding { .. }
                | CompileError::MissingChainScope { .. }
                | CompileError::UnknownScope { .. }
                | CompileError::MalformedRegions { .. }
                | CompileError::Internal { .. }
        )
    }
}
