//! Error types for the script runtime

/// Faults raised while executing script callbacks.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ScriptError {
    /// Wrong number of arguments for a fixed-arity function
    #[error("Function '{name}' expected {expected} arguments but got {got}")]
    Arity {
        name: String,
        expected: usize,
        got: usize,
    },

    /// A value had the wrong type for the operation
    #[error("Type error: expected {expected}, found {found}")]
    Type {
        expected: &'static str,
        found: &'static str,
    },

    /// Runtime error raised by the script itself
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// A platform call made from a script failed
    #[error("Platform error: {0}")]
    Platform(String),

    /// The callback panicked; caught at the invoker boundary
    #[error("Callback '{0}' panicked")]
    Panicked(String),

    /// The interpreter is shutting down and accepts no more work
    #[error("Interpreter is shutting down")]
    ShuttingDown,
}

impl From<crate::errors::Error> for ScriptError {
    fn from(err: crate::errors::Error) -> Self {
        Self::Platform(err.to_string())
    }
}

/// Result type for script operations
pub type Result<T> = std::result::Result<T, ScriptError>;
