use thiserror::Error;

use crate::bytecode::block::MAX_CONSTANTS;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// The pass reported syntax errors; the details went to the diagnostics
    /// sink as they were found.
    #[error("compile error: {errors} syntax error(s)")]
    Syntax { errors: usize },

    /// The constant pool cannot be addressed by a 16-bit operand any more.
    #[error("compile error: too many constants in one code block (limit {})", MAX_CONSTANTS)]
    TooManyConstants,

    /// Internal compiler error (shouldn't happen in normal use)
    #[error("compile error: internal error: {0}")]
    Internal(String),
}

impl CompileError {
    pub fn internal(msg: impl Into<String>) -> Self {
        CompileError::Internal(msg.into())
    }
}
