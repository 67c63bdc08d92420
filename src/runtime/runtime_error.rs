use thiserror::Error;

use crate::bytecode::op::OpCode;
use crate::bytecode::stack_check::StackCheckError;
use crate::lang::coerce::CoerceError;

/// What went wrong while executing an instruction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeErrorKind {
    #[error("nothing value in expression")]
    NothingOperand,

    #[error("{0}")]
    InvalidConversion(String),

    #[error("{op} is not supported on {type_name} objects")]
    UnsupportedObjectOp { op: OpCode, type_name: &'static str },

    #[error("arithmetic operation on boolean type")]
    BooleanArithmetic,

    #[error("division by zero")]
    DivisionByZero,

    #[error("expected number or bool")]
    BadNegOperand,

    #[error("unknown opcode {0}")]
    UnknownOpcode(u16),

    #[error("stack underflow")]
    StackUnderflow,

    #[error("stack size limit exceeded ({0})")]
    StackOverflow(usize),

    #[error("execution step limit exceeded ({0})")]
    StepLimit(usize),

    #[error("invalid bytecode: {0}")]
    InvalidBytecode(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("runtime error: {kind} (at offset {offset})")]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    /// Offset of the instruction that failed.
    pub offset: usize,
}

impl RuntimeError {
    pub fn new(kind: RuntimeErrorKind, offset: usize) -> Self {
        RuntimeError { kind, offset }
    }

    /// The message without the offset, as reported to the user.
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

impl From<CoerceError> for RuntimeErrorKind {
    fn from(err: CoerceError) -> Self {
        match err {
            CoerceError::NothingOperand => RuntimeErrorKind::NothingOperand,
            other => RuntimeErrorKind::InvalidConversion(other.to_string()),
        }
    }
}

impl From<StackCheckError> for RuntimeError {
    fn from(err: StackCheckError) -> Self {
        RuntimeError::new(RuntimeErrorKind::InvalidBytecode(err.message), err.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::value::ValueKind;

    #[test]
    fn test_display_includes_offset() {
        let err = RuntimeError::new(RuntimeErrorKind::DivisionByZero, 7);
        assert_eq!(err.to_string(), "runtime error: division by zero (at offset 7)");
        assert_eq!(err.message(), "division by zero");
    }

    #[test]
    fn test_from_coerce_error() {
        let kind: RuntimeErrorKind = CoerceError::NothingOperand.into();
        assert_eq!(kind, RuntimeErrorKind::NothingOperand);

        let kind: RuntimeErrorKind = CoerceError::InvalidText {
            text: "abc".to_string(),
            to: ValueKind::Int,
        }
        .into();
        assert_eq!(kind.to_string(), "cannot convert \"abc\" to signed int");
    }

    #[test]
    fn test_unsupported_object_op_message() {
        let kind = RuntimeErrorKind::UnsupportedObjectOp {
            op: OpCode::Sub,
            type_name: "string",
        };
        assert_eq!(kind.to_string(), "OP_SUB is not supported on string objects");
    }

    #[test]
    fn test_from_stack_check_error() {
        let err: RuntimeError = StackCheckError {
            message: "stack underflow at offset 1".to_string(),
            offset: 1,
        }
        .into();
        assert_eq!(err.offset, 1);
        assert!(matches!(err.kind, RuntimeErrorKind::InvalidBytecode(_)));
    }
}
