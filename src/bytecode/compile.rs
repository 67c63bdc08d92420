//! Single-pass Pratt compiler: tokens in, bytecode out, no syntax tree.

use crate::bytecode::block::CodeBlock;
use crate::bytecode::compile_error::CompileError;
use crate::bytecode::op::OpCode;
use crate::diagnostics::Diagnostics;
use crate::frontend::scanner::Scanner;
use crate::frontend::token::{Token, TokenKind};
use crate::lang::value::Value;

/// Binding strength, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    None,
    Assignment,
    Or,
    And,
    Equality,
    Comparison,
    Term,
    Factor,
    Unary,
    Call,
    Primary,
}

impl Precedence {
    /// One level tighter. Used for the right operand of left-associative
    /// operators.
    pub fn next(self) -> Self {
        use Precedence::*;
        match self {
            None => Assignment,
            Assignment => Or,
            Or => And,
            And => Equality,
            Equality => Comparison,
            Comparison => Term,
            Term => Factor,
            Factor => Unary,
            Unary => Call,
            Call | Primary => Primary,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prefix {
    Unum,
    Inum,
    Fnum,
    Onum,
    String,
    Grouping,
    Unary,
    Literal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Infix {
    Arithmetic,
    Comparison,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseRule {
    pub prefix: Option<Prefix>,
    pub infix: Option<Infix>,
    pub precedence: Precedence,
}

impl ParseRule {
    const fn new(prefix: Option<Prefix>, infix: Option<Infix>, precedence: Precedence) -> Self {
        Self {
            prefix,
            infix,
            precedence,
        }
    }
}

/// The operator table.
pub fn rule(kind: TokenKind) -> ParseRule {
    use TokenKind as T;
    match kind {
        T::Unum => ParseRule::new(Some(Prefix::Unum), None, Precedence::None),
        T::Inum => ParseRule::new(Some(Prefix::Inum), None, Precedence::None),
        T::Fnum => ParseRule::new(Some(Prefix::Fnum), None, Precedence::None),
        T::Onum => ParseRule::new(Some(Prefix::Onum), None, Precedence::None),
        T::QString => ParseRule::new(Some(Prefix::String), None, Precedence::None),
        T::OpenParen => ParseRule::new(Some(Prefix::Grouping), None, Precedence::None),

        T::True | T::False | T::Nothing => {
            ParseRule::new(Some(Prefix::Literal), None, Precedence::None)
        }
        T::Not => ParseRule::new(Some(Prefix::Unary), None, Precedence::None),
        T::Sub => ParseRule::new(Some(Prefix::Unary), Some(Infix::Arithmetic), Precedence::Term),
        T::Add => ParseRule::new(None, Some(Infix::Arithmetic), Precedence::Term),
        T::Mul | T::Slash | T::Mod => {
            ParseRule::new(None, Some(Infix::Arithmetic), Precedence::Factor)
        }

        T::Equality | T::Neq => {
            ParseRule::new(None, Some(Infix::Comparison), Precedence::Equality)
        }
        T::Lt | T::Gt | T::Lte | T::Gte => {
            ParseRule::new(None, Some(Infix::Comparison), Precedence::Comparison)
        }

        _ => ParseRule::new(None, None, Precedence::None),
    }
}

pub struct Compiler<'a> {
    scanner: &'a mut Scanner,
    block: &'a mut CodeBlock,
    diag: &'a mut Diagnostics,

    previous: Token,
    current: Token,

    had_error: bool,
    panic_mode: bool,

    /// First error that makes the rest of the pass pointless.
    fatal: Option<CompileError>,
}

impl<'a> Compiler<'a> {
    pub fn new(scanner: &'a mut Scanner, block: &'a mut CodeBlock, diag: &'a mut Diagnostics) -> Self {
        Self {
            scanner,
            block,
            diag,
            previous: Token::new(TokenKind::EndOfInput, "", 0, 0),
            current: Token::new(TokenKind::EndOfInput, "", 0, 0),
            had_error: false,
            panic_mode: false,
            fatal: None,
        }
    }

    /// Compile one expression from the open input and append it, followed by
    /// OP_RETURN, to the block.
    ///
    /// When the pass fails the block is rolled back to the length it had on
    /// entry, so nothing half-compiled is ever executed.
    pub fn compile(mut self) -> Result<(), CompileError> {
        let mark = self.block.mark();
        let errors_before = self.diag.error_count();

        self.had_error = false;
        self.panic_mode = false;

        self.advance();
        self.expression();
        self.consume(TokenKind::EndOfFile);
        self.consume(TokenKind::EndOfInput);
        self.emit_op(OpCode::Return);

        let errors = self.diag.error_count() - errors_before;
        let failure = match self.fatal.take() {
            Some(err) => Some(err),
            None if self.had_error || errors > 0 => Some(CompileError::Syntax {
                errors: errors.max(1),
            }),
            None => None,
        };

        match failure {
            Some(err) => {
                self.block.truncate(mark);
                tracing::debug!(%err, "compile pass rolled back");
                Err(err)
            }
            None => {
                tracing::debug!(
                    words = self.block.len() - mark.code_len,
                    constants = self.block.constants().len() - mark.constants_len,
                    "compile pass finished"
                );
                Ok(())
            }
        }
    }

    // ==========================================================================
    // Token plumbing
    // ==========================================================================

    /// Move one token ahead. Error tokens were already reported by the
    /// scanner and are skipped.
    fn advance(&mut self) {
        let mut next = self.scanner.next_token(self.diag);
        while next.kind == TokenKind::Error {
            next = self.scanner.next_token(self.diag);
        }
        self.previous = std::mem::replace(&mut self.current, next);
    }

    fn consume(&mut self, expected: TokenKind) {
        if self.current.kind == expected {
            self.advance();
            return;
        }
        let message = format!(
            "expected a {} but got a {}",
            expected.describe(),
            self.current.kind.describe()
        );
        self.error(message);
    }

    /// Report a syntax error unless one is already being recovered from.
    fn error(&mut self, message: impl Into<String>) {
        if self.panic_mode {
            return;
        }
        self.had_error = true;
        self.panic_mode = true;
        let location = self.scanner.location();
        self.diag.syntax(message, location);
    }

    fn internal_error(&mut self, message: String) {
        if self.fatal.is_none() {
            self.fatal = Some(CompileError::internal(message));
        }
    }

    fn emit_op(&mut self, op: OpCode) {
        self.block.write_op(op);
    }

    fn emit_constant(&mut self, value: Value) {
        if let Err(err) = self.block.emit_constant(value) {
            if self.fatal.is_none() {
                self.diag.syntax(err.to_string(), self.scanner.location());
                self.fatal = Some(err);
            }
            self.had_error = true;
            self.panic_mode = true;
        }
    }

    // ==========================================================================
    // Expressions
    // ==========================================================================

    fn expression(&mut self) {
        self.parse_precedence(Precedence::Assignment);
    }

    fn parse_precedence(&mut self, precedence: Precedence) {
        self.advance();
        let Some(prefix) = rule(self.previous.kind).prefix else {
            let message = format!("expected an expression but got {}", self.previous.kind.describe());
            self.error(message);
            return;
        };
        self.prefix(prefix);

        while precedence <= rule(self.current.kind).precedence {
            self.advance();
            if let Some(infix) = rule(self.previous.kind).infix {
                self.infix(infix);
            }
        }
    }

    fn prefix(&mut self, prefix: Prefix) {
        match prefix {
            Prefix::Unum => self.unum(),
            Prefix::Inum => self.inum(),
            Prefix::Fnum => self.fnum(),
            Prefix::Onum => self.onum(),
            Prefix::String => self.string(),
            Prefix::Grouping => self.grouping(),
            Prefix::Unary => self.unary(),
            Prefix::Literal => self.literal(),
        }
    }

    fn infix(&mut self, infix: Infix) {
        match infix {
            Infix::Arithmetic => self.arithmetic(),
            Infix::Comparison => self.comparison(),
        }
    }

    fn literal_out_of_range(&mut self) {
        let message = format!("integer literal out of range: {}", self.previous.text);
        self.error(message);
    }

    fn inum(&mut self) {
        match self.previous.text.parse::<i64>() {
            Ok(n) => self.emit_constant(Value::Int(n)),
            Err(_) => self.literal_out_of_range(),
        }
    }

    fn unum(&mut self) {
        let text = &self.previous.text;
        let digits = text
            .strip_prefix("0x")
            .or_else(|| text.strip_prefix("0X"))
            .unwrap_or(text);
        // a bare "0x" is zero
        let parsed = if digits.is_empty() {
            Ok(0)
        } else {
            u64::from_str_radix(digits, 16)
        };
        match parsed {
            Ok(n) => self.emit_constant(Value::Uint(n)),
            Err(_) => self.literal_out_of_range(),
        }
    }

    fn onum(&mut self) {
        match i64::from_str_radix(&self.previous.text, 8) {
            Ok(n) => self.emit_constant(Value::Int(n)),
            Err(_) => self.literal_out_of_range(),
        }
    }

    fn fnum(&mut self) {
        match self.previous.text.parse::<f64>() {
            Ok(n) => self.emit_constant(Value::Float(n)),
            Err(_) => {
                let message = format!("malformed float number: {}", self.previous.text);
                self.error(message);
            }
        }
    }

    fn string(&mut self) {
        let value = Value::string(self.previous.text.as_str());
        self.emit_constant(value);
    }

    fn grouping(&mut self) {
        self.expression();
        self.consume(TokenKind::CloseParen);
    }

    fn literal(&mut self) {
        match self.previous.kind {
            TokenKind::True => self.emit_op(OpCode::True),
            TokenKind::False => self.emit_op(OpCode::False),
            TokenKind::Nothing => self.emit_op(OpCode::Nothing),
            other => {
                self.internal_error(format!("no literal for {:?}", other));
            }
        }
    }

    fn unary(&mut self) {
        let operator = self.previous.kind;
        self.parse_precedence(Precedence::Unary);
        match operator {
            TokenKind::Sub => self.emit_op(OpCode::Neg),
            TokenKind::Not => self.emit_op(OpCode::Not),
            other => {
                self.internal_error(format!("no unary operator for {:?}", other));
            }
        }
    }

    fn arithmetic(&mut self) {
        let operator = self.previous.kind;
        self.parse_precedence(rule(operator).precedence.next());
        let op = match operator {
            TokenKind::Add => OpCode::Add,
            TokenKind::Sub => OpCode::Sub,
            TokenKind::Mul => OpCode::Mul,
            TokenKind::Slash => OpCode::Div,
            TokenKind::Mod => OpCode::Mod,
            other => {
                self.internal_error(format!("no arithmetic operator for {:?}", other));
                return;
            }
        };
        self.emit_op(op);
    }

    fn comparison(&mut self) {
        let operator = self.previous.kind;
        self.parse_precedence(rule(operator).precedence.next());
        let op = match operator {
            TokenKind::Equality => OpCode::Equality,
            TokenKind::Neq => OpCode::Neq,
            TokenKind::Lt => OpCode::Lt,
            TokenKind::Gt => OpCode::Gt,
            TokenKind::Lte => OpCode::Lte,
            TokenKind::Gte => OpCode::Gte,
            other => {
                self.internal_error(format!("no comparison operator for {:?}", other));
                return;
            }
        };
        self.emit_op(op);
    }
}

/// Compile the input already open in `scanner` into `block`.
pub fn compile(scanner: &mut Scanner, block: &mut CodeBlock, diag: &mut Diagnostics) -> Result<(), CompileError> {
    Compiler::new(scanner, block, diag).compile()
}
