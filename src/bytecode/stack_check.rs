use thiserror::Error;

use crate::bytecode::block::{CodeBlock, Instruction, Instructions};
use crate::bytecode::op::OpCode;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("stack-check error: {message}")]
pub struct StackCheckError {
    pub message: String,
    pub offset: usize,
}

impl StackCheckError {
    fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

/// Returns (pops, pushes) for an opcode.
fn effect(op: OpCode) -> (i32, i32) {
    use OpCode::*;
    match op {
        Constant | Nothing | True | False => (0, 1),
        Neg | Not => (1, 1),
        Add | Sub | Mul | Div | Mod => (2, 1),
        Equality | Neq | Lt | Gt | Lte | Gte => (2, 1),
        Return => (1, 1),
    }
}

/// Check every segment of `code` starting at `start`.
///
/// A segment is the run of instructions up to and including an OP_RETURN;
/// each one is what a single interpret cycle executes. Every segment starts
/// from an empty stack and must leave exactly one value for OP_RETURN.
pub fn check_code(code: &[u16], constants_len: usize, start: usize) -> Result<(), StackCheckError> {
    let mut height: i32 = 0;
    let mut segment_open = false;

    for (offset, instruction) in Instructions::new(code, start) {
        segment_open = true;
        let op = match instruction {
            Instruction::Simple(op) => op,
            Instruction::Constant(index) => {
                if index as usize >= constants_len {
                    return Err(StackCheckError::new(
                        offset,
                        format!(
                            "constant index {} out of range at offset {} (pool has {})",
                            index, offset, constants_len
                        ),
                    ));
                }
                OpCode::Constant
            }
            Instruction::Unknown(word) => {
                return Err(StackCheckError::new(
                    offset,
                    format!("unknown opcode {} at offset {}", word, offset),
                ));
            }
            Instruction::MissingOperand => {
                return Err(StackCheckError::new(
                    offset,
                    format!("OP_CONSTANT without operand at offset {}", offset),
                ));
            }
        };

        let (pops, pushes) = effect(op);
        height -= pops;
        if height < 0 {
            return Err(StackCheckError::new(
                offset,
                format!("stack underflow at offset {}, op={}, needed {} items", offset, op, pops),
            ));
        }
        height += pushes;

        if op == OpCode::Return {
            if height != 1 {
                return Err(StackCheckError::new(
                    offset,
                    format!("OP_RETURN at offset {} leaves {} values, expected 1", offset, height),
                ));
            }
            height = 0;
            segment_open = false;
        }
    }

    if segment_open {
        return Err(StackCheckError::new(
            code.len(),
            "code block does not end with OP_RETURN",
        ));
    }
    Ok(())
}

/// Check a whole block.
pub fn check_block(block: &CodeBlock) -> Result<(), StackCheckError> {
    check_code(block.code(), block.constants().len(), 0)
}

/// Check the part of a block that starts at `start`.
pub fn check_block_from(block: &CodeBlock, start: usize) -> Result<(), StackCheckError> {
    check_code(block.code(), block.constants().len(), start)
}
