// =============================================================================
// OPCODES - one 16-bit word each in the instruction stream
// =============================================================================

/// Instruction opcode. `Constant` is followed by one operand word holding a
/// constant pool index; every other opcode stands alone.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    Constant = 0,

    // arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Neg,

    // literals
    Nothing,
    True,
    False,

    // logic / comparison
    Not,
    Equality,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,

    Return,
}

impl OpCode {
    pub const ALL: [OpCode; 18] = [
        OpCode::Constant,
        OpCode::Add,
        OpCode::Sub,
        OpCode::Mul,
        OpCode::Div,
        OpCode::Mod,
        OpCode::Neg,
        OpCode::Nothing,
        OpCode::True,
        OpCode::False,
        OpCode::Not,
        OpCode::Equality,
        OpCode::Neq,
        OpCode::Lt,
        OpCode::Gt,
        OpCode::Lte,
        OpCode::Gte,
        OpCode::Return,
    ];

    pub fn word(self) -> u16 {
        self as u16
    }

    /// Decode an instruction word.
    pub fn from_word(word: u16) -> Option<OpCode> {
        Self::ALL.get(word as usize).copied()
    }

    /// Number of operand words following the opcode.
    pub fn operand_count(self) -> usize {
        match self {
            OpCode::Constant => 1,
            _ => 0,
        }
    }

    /// Name used in disassembly listings.
    pub fn name(self) -> &'static str {
        match self {
            OpCode::Constant => "OP_CONSTANT",
            OpCode::Add => "OP_ADD",
            OpCode::Sub => "OP_SUB",
            OpCode::Mul => "OP_MUL",
            OpCode::Div => "OP_DIV",
            OpCode::Mod => "OP_MOD",
            OpCode::Neg => "OP_NEG",
            OpCode::Nothing => "OP_NOTHING",
            OpCode::True => "OP_TRUE",
            OpCode::False => "OP_FALSE",
            OpCode::Not => "OP_NOT",
            OpCode::Equality => "OP_EQUALITY",
            OpCode::Neq => "OP_NEQ",
            OpCode::Lt => "OP_LT",
            OpCode::Gt => "OP_GT",
            OpCode::Lte => "OP_LTE",
            OpCode::Gte => "OP_GTE",
            OpCode::Return => "OP_RETURN",
        }
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div | OpCode::Mod
        )
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            OpCode::Equality | OpCode::Neq | OpCode::Lt | OpCode::Gt | OpCode::Lte | OpCode::Gte
        )
    }
}

impl TryFrom<u16> for OpCode {
    type Error = u16;

    fn try_from(word: u16) -> Result<Self, Self::Error> {
        OpCode::from_word(word).ok_or(word)
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words_round_trip() {
        for (i, op) in OpCode::ALL.iter().enumerate() {
            assert_eq!(op.word() as usize, i);
            assert_eq!(OpCode::try_from(op.word()), Ok(*op));
        }
    }

    #[test]
    fn test_unknown_word() {
        assert_eq!(OpCode::try_from(18), Err(18));
        assert_eq!(OpCode::from_word(u16::MAX), None);
    }

    #[test]
    fn test_operands() {
        assert_eq!(OpCode::Constant.operand_count(), 1);
        assert_eq!(OpCode::Return.operand_count(), 0);
        assert_eq!(OpCode::Equality.to_string(), "OP_EQUALITY");
    }
}
