use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bytecode::compile_error::CompileError;
use crate::bytecode::op::OpCode;
use crate::bytecode::stack_check::{StackCheckError, check_block};
use crate::lang::value::Value;

/// A constant index is one 16-bit operand word.
pub const MAX_CONSTANTS: usize = u16::MAX as usize + 1;

const FILE_MAGIC: [u8; 4] = *b"ATBC";
const FILE_VERSION: u16 = 1;

/// A compiled program: the instruction stream and its constant pool.
///
/// Both sequences only grow, except for [`CodeBlock::truncate`] which rolls
/// back a failed compile pass. Constant indices are stable once assigned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeBlock {
    code: Vec<u16>,
    constants: Vec<Value>,
}

/// Sizes of a block at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockMark {
    pub code_len: usize,
    pub constants_len: usize,
}

impl CodeBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn code(&self) -> &[u16] {
        &self.code
    }

    pub fn constants(&self) -> &[Value] {
        &self.constants
    }

    pub fn constant(&self, index: u16) -> Option<&Value> {
        self.constants.get(index as usize)
    }

    /// Length of the instruction stream in words.
    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn word(&self, offset: usize) -> Option<u16> {
        self.code.get(offset).copied()
    }

    pub fn write_word(&mut self, word: u16) {
        self.code.push(word);
    }

    pub fn write_op(&mut self, op: OpCode) {
        self.code.push(op.word());
    }

    /// Append a value to the constant pool and return its index.
    pub fn add_constant(&mut self, value: Value) -> Result<u16, CompileError> {
        if self.constants.len() >= MAX_CONSTANTS {
            return Err(CompileError::TooManyConstants);
        }
        let index = self.constants.len() as u16;
        self.constants.push(value);
        Ok(index)
    }

    /// Append a value to the pool and emit the OP_CONSTANT that loads it.
    pub fn emit_constant(&mut self, value: Value) -> Result<u16, CompileError> {
        let index = self.add_constant(value)?;
        self.write_op(OpCode::Constant);
        self.write_word(index);
        Ok(index)
    }

    pub fn mark(&self) -> BlockMark {
        BlockMark {
            code_len: self.code.len(),
            constants_len: self.constants.len(),
        }
    }

    /// Drop everything appended after `mark`.
    pub fn truncate(&mut self, mark: BlockMark) {
        self.code.truncate(mark.code_len);
        self.constants.truncate(mark.constants_len);
    }

    pub fn instructions(&self) -> Instructions<'_> {
        Instructions::new(&self.code, 0)
    }

    /// Decode starting from `offset`.
    pub fn instructions_from(&self, offset: usize) -> Instructions<'_> {
        Instructions::new(&self.code, offset)
    }

    // ==========================================================================
    // Serialization
    // ==========================================================================

    pub fn to_bytes(&self) -> Result<Vec<u8>, BytecodeFileError> {
        let file = BytecodeFileRef {
            magic: FILE_MAGIC,
            version: FILE_VERSION,
            block: self,
        };
        Ok(postcard::to_allocvec(&file)?)
    }

    /// Decode and verify a serialized block.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BytecodeFileError> {
        let file: BytecodeFile = postcard::from_bytes(bytes)?;
        if file.magic != FILE_MAGIC {
            return Err(BytecodeFileError::BadMagic);
        }
        if file.version != FILE_VERSION {
            return Err(BytecodeFileError::UnsupportedVersion(file.version));
        }
        check_block(&file.block)?;
        Ok(file.block)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), BytecodeFileError> {
        let bytes = self.to_bytes()?;
        std::fs::write(path.as_ref(), bytes)?;
        tracing::debug!(path = %path.as_ref().display(), words = self.code.len(), "code block written");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, BytecodeFileError> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_bytes(&bytes)
    }
}

#[derive(Serialize)]
struct BytecodeFileRef<'a> {
    magic: [u8; 4],
    version: u16,
    block: &'a CodeBlock,
}

#[derive(Deserialize)]
struct BytecodeFile {
    magic: [u8; 4],
    version: u16,
    block: CodeBlock,
}

#[derive(Debug, Error)]
pub enum BytecodeFileError {
    #[error("bytecode file: {0}")]
    Io(#[from] std::io::Error),

    #[error("bytecode file: malformed encoding: {0}")]
    Codec(#[from] postcard::Error),

    #[error("bytecode file: not an atlang code block")]
    BadMagic,

    #[error("bytecode file: unsupported version {0}")]
    UnsupportedVersion(u16),

    #[error("bytecode file: {0}")]
    Verify(#[from] StackCheckError),
}

// =============================================================================
// Instruction decoding
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// An opcode without operands.
    Simple(OpCode),
    /// OP_CONSTANT with its pool index.
    Constant(u16),
    /// A word that is not an opcode.
    Unknown(u16),
    /// OP_CONSTANT as the last word, without its operand.
    MissingOperand,
}

impl Instruction {
    /// Words occupied in the stream.
    pub fn width(self) -> usize {
        match self {
            Instruction::Constant(_) => 2,
            _ => 1,
        }
    }
}

/// Iterator over `(offset, instruction)` pairs of an instruction stream.
pub struct Instructions<'a> {
    code: &'a [u16],
    offset: usize,
}

impl<'a> Instructions<'a> {
    pub fn new(code: &'a [u16], offset: usize) -> Self {
        Self { code, offset }
    }
}

impl Iterator for Instructions<'_> {
    type Item = (usize, Instruction);

    fn next(&mut self) -> Option<Self::Item> {
        let offset = self.offset;
        let word = *self.code.get(offset)?;

        let instruction = match OpCode::from_word(word) {
            Some(OpCode::Constant) => match self.code.get(offset + 1) {
                Some(index) => Instruction::Constant(*index),
                None => Instruction::MissingOperand,
            },
            Some(op) => Instruction::Simple(op),
            None => Instruction::Unknown(word),
        };

        self.offset += instruction.width();
        Some((offset, instruction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CodeBlock {
        let mut block = CodeBlock::new();
        block.emit_constant(Value::Int(1)).unwrap();
        block.emit_constant(Value::string("two")).unwrap();
        block.write_op(OpCode::Add);
        block.write_op(OpCode::Return);
        block
    }

    #[test]
    fn test_emit_constant_layout() {
        let block = sample();
        assert_eq!(block.code(), &[0, 0, 0, 1, OpCode::Add.word(), OpCode::Return.word()]);
        assert_eq!(block.constants().len(), 2);
        assert_eq!(block.constant(1).and_then(|v| v.as_str()), Some("two"));
    }

    #[test]
    fn test_instructions() {
        let block = sample();
        let decoded: Vec<_> = block.instructions().collect();
        assert_eq!(
            decoded,
            vec![
                (0, Instruction::Constant(0)),
                (2, Instruction::Constant(1)),
                (4, Instruction::Simple(OpCode::Add)),
                (5, Instruction::Simple(OpCode::Return)),
            ]
        );
    }

    #[test]
    fn test_instructions_bad_words() {
        let code = [99, OpCode::Constant.word()];
        let decoded: Vec<_> = Instructions::new(&code, 0).collect();
        assert_eq!(
            decoded,
            vec![(0, Instruction::Unknown(99)), (1, Instruction::MissingOperand)]
        );
    }

    #[test]
    fn test_mark_and_truncate() {
        let mut block = sample();
        let mark = block.mark();
        block.emit_constant(Value::Int(3)).unwrap();
        block.write_op(OpCode::Neg);
        block.truncate(mark);
        assert_eq!(block, sample());
    }

    #[test]
    fn test_constant_limit() {
        let mut block = CodeBlock::new();
        for i in 0..MAX_CONSTANTS {
            block.add_constant(Value::Int(i as i64)).unwrap();
        }
        assert_eq!(
            block.add_constant(Value::Nothing),
            Err(CompileError::TooManyConstants)
        );
    }

    #[test]
    fn test_bytes_round_trip() {
        let block = sample();
        let bytes = block.to_bytes().unwrap();
        assert_eq!(CodeBlock::from_bytes(&bytes).unwrap(), block);
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        assert!(CodeBlock::from_bytes(&[1, 2, 3]).is_err());
    }

    #[test]
    fn test_from_bytes_verifies() {
        let mut block = CodeBlock::new();
        block.write_op(OpCode::Add);
        block.write_op(OpCode::Return);
        let bytes = block.to_bytes().unwrap();
        let err = CodeBlock::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, BytecodeFileError::Verify(_)));
    }
}
