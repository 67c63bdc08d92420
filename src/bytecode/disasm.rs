use std::collections::HashMap;
use std::fmt::Write;

use crate::bytecode::block::{CodeBlock, Instruction};
use crate::bytecode::op::OpCode;

/// Return the disassembly of a whole block as a String.
pub fn disassemble_block(block: &CodeBlock, name: &str) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "== {} ==", name);
    for (offset, instruction) in block.instructions() {
        output.push_str(&format_instruction(block, offset, instruction));
        output.push('\n');
    }
    output
}

/// Disassemble the instruction at `offset`. Returns the text and the offset
/// of the next instruction.
pub fn disassemble_instruction(block: &CodeBlock, offset: usize) -> Option<(String, usize)> {
    let (at, instruction) = block.instructions_from(offset).next()?;
    Some((
        format_instruction(block, at, instruction),
        at + instruction.width(),
    ))
}

fn format_instruction(block: &CodeBlock, offset: usize, instruction: Instruction) -> String {
    let body = match instruction {
        Instruction::Simple(op) => op.name().to_string(),
        Instruction::Constant(index) => {
            let value = match block.constant(index) {
                Some(v) => v.to_string(),
                None => "<invalid constant>".to_string(),
            };
            format!("{:<16} {:4} {}", OpCode::Constant.name(), index, value)
        }
        Instruction::Unknown(word) => format!("OPCODE ERROR: Unknown opcode {}", word),
        Instruction::MissingOperand => {
            format!("{:<16} <missing operand>", OpCode::Constant.name())
        }
    };
    format!("{:04} {}", offset, body)
}

/// Print disassembly of a code block
pub fn print_block(block: &CodeBlock, name: &str) {
    println!("\ndisassemble block\n");
    print!("{}", disassemble_block(block, name));
}

// =============================================================================
// Statistics
// =============================================================================

/// Opcode frequencies, most frequent first, ties by name.
pub fn op_counts(block: &CodeBlock) -> Vec<(&'static str, usize)> {
    let mut counts: HashMap<&'static str, usize> = HashMap::new();
    for (_, instruction) in block.instructions() {
        let name = match instruction {
            Instruction::Simple(op) => op.name(),
            Instruction::Constant(_) | Instruction::MissingOperand => OpCode::Constant.name(),
            Instruction::Unknown(_) => "UNKNOWN",
        };
        *counts.entry(name).or_insert(0) += 1;
    }

    let mut sorted: Vec<_> = counts.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    sorted
}

pub fn stats_to_string(block: &CodeBlock) -> String {
    let mut output = String::new();
    let instructions = block.instructions().count();

    let _ = writeln!(output, "=== BYTECODE STATISTICS ===\n");
    let _ = writeln!(output, "Words:            {}", block.len());
    let _ = writeln!(output, "Instructions:     {}", instructions);
    let _ = writeln!(output, "Constants:        {}", block.constants().len());
    let _ = writeln!(output);
    let _ = writeln!(output, "Op frequency:");
    for (name, count) in op_counts(block) {
        let pct = if instructions > 0 {
            (count as f64 / instructions as f64) * 100.0
        } else {
            0.0
        };
        let _ = writeln!(output, "  {:<16} {:>6}  ({:>5.1}%)", name, count, pct);
    }
    output
}

/// Print bytecode statistics
pub fn print_stats(block: &CodeBlock) {
    print!("{}", stats_to_string(block));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::value::Value;

    fn sample() -> CodeBlock {
        let mut block = CodeBlock::new();
        block.emit_constant(Value::Int(1)).unwrap();
        block.emit_constant(Value::Float(2.5)).unwrap();
        block.write_op(OpCode::Add);
        block.write_op(OpCode::Return);
        block
    }

    #[test]
    fn test_listing() {
        let text = disassemble_block(&sample(), "test");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "== test ==");
        assert_eq!(lines[1], "0000 OP_CONSTANT         0 1");
        assert_eq!(lines[2], "0002 OP_CONSTANT         1 2.500");
        assert_eq!(lines[3], "0004 OP_ADD");
        assert_eq!(lines[4], "0005 OP_RETURN");
    }

    #[test]
    fn test_unknown_and_invalid() {
        let mut block = CodeBlock::new();
        block.write_word(77);
        block.write_op(OpCode::Constant);
        block.write_word(9);
        let text = disassemble_block(&block, "bad");
        assert!(text.contains("0000 OPCODE ERROR: Unknown opcode 77"));
        assert!(text.contains("0001 OP_CONSTANT         9 <invalid constant>"));
    }

    #[test]
    fn test_single_instruction() {
        let block = sample();
        let (text, next) = disassemble_instruction(&block, 2).unwrap();
        assert_eq!(text, "0002 OP_CONSTANT         1 2.500");
        assert_eq!(next, 4);
        assert!(disassemble_instruction(&block, 6).is_none());
    }

    #[test]
    fn test_op_counts() {
        let counts = op_counts(&sample());
        assert_eq!(counts[0], ("OP_CONSTANT", 2));
        assert_eq!(counts.len(), 3);
        assert!(stats_to_string(&sample()).contains("Constants:        2"));
    }
}
