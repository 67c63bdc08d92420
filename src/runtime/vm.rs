use std::cmp::Ordering;
use std::rc::Rc;

use crate::bytecode::block::CodeBlock;
use crate::bytecode::op::OpCode;
use crate::bytecode::stack_check::check_block_from;
use crate::diagnostics::Diagnostics;
use crate::lang::coerce::{Normalized, normalize, normalize_equality};
use crate::lang::value::{Value, ValueKind};
use crate::runtime::runtime_error::{RuntimeError, RuntimeErrorKind};

pub const FLOAT_EQUALITY_WARNING: &str = "comparing floats for equality can produce unexpected results";

#[derive(Debug, Clone)]
pub struct VmConfig {
    pub max_stack_size: usize,
    pub max_steps: Option<usize>,
    /// Statically check each segment before it runs.
    pub verify: bool,
    /// Emit a trace event for every dispatched instruction.
    pub trace: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            max_stack_size: 10_000,
            max_steps: None,
            verify: true,
            trace: false,
        }
    }
}

/// Stack machine over a [`CodeBlock`].
///
/// The instruction pointer survives between runs: each compile pass appends
/// one segment ending in OP_RETURN, and the next [`Vm::run`] starts where the
/// previous one stopped.
pub struct Vm {
    block: CodeBlock,
    stack: Vec<Value>,
    ip: usize,
    config: VmConfig,
    steps: usize,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Self {
        Self {
            block: CodeBlock::new(),
            stack: Vec::new(),
            ip: 0,
            config,
            steps: 0,
        }
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    pub fn block(&self) -> &CodeBlock {
        &self.block
    }

    /// The block compile passes append to.
    pub fn block_mut(&mut self) -> &mut CodeBlock {
        &mut self.block
    }

    /// Replace the block and start over from its first instruction.
    pub fn load_block(&mut self, block: CodeBlock) {
        self.block = block;
        self.ip = 0;
        self.stack.clear();
    }

    pub fn ip(&self) -> usize {
        self.ip
    }

    /// True when every segment of the block has been executed.
    pub fn at_end(&self) -> bool {
        self.ip >= self.block.len()
    }

    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    pub fn peek(&self) -> Option<&Value> {
        self.stack.last()
    }

    pub fn reset_stack(&mut self) {
        self.stack.clear();
    }

    /// Execute the next segment.
    ///
    /// Returns the value OP_RETURN found on top of the stack, or `None` when
    /// there is nothing left to run. A failure is recorded in `diag` and the
    /// instruction pointer skips to the end of the block, so the broken
    /// segment is never resumed.
    pub fn run(&mut self, diag: &mut Diagnostics) -> Result<Option<Value>, RuntimeError> {
        if self.at_end() {
            return Ok(None);
        }
        self.steps = 0;

        let result = self.verify().and_then(|_| self.execute(diag));
        if let Err(err) = &result {
            tracing::debug!(offset = err.offset, error = %err.kind, "execution aborted");
            diag.runtime_error(err.message());
            self.ip = self.block.len();
        }
        result.map(Some)
    }

    fn verify(&self) -> Result<(), RuntimeError> {
        if self.config.verify {
            check_block_from(&self.block, self.ip)?;
        }
        Ok(())
    }

    // ==========================================================================
    // Execution
    // ==========================================================================

    fn check_limits(&mut self, offset: usize) -> Result<(), RuntimeError> {
        self.steps += 1;

        if let Some(max) = self.config.max_steps {
            if self.steps > max {
                return Err(RuntimeError::new(RuntimeErrorKind::StepLimit(max), offset));
            }
        }
        Ok(())
    }

    fn push(&mut self, value: Value, offset: usize) -> Result<(), RuntimeError> {
        if self.stack.len() >= self.config.max_stack_size {
            return Err(RuntimeError::new(
                RuntimeErrorKind::StackOverflow(self.config.max_stack_size),
                offset,
            ));
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self, offset: usize) -> Result<Value, RuntimeError> {
        self.stack
            .pop()
            .ok_or_else(|| RuntimeError::new(RuntimeErrorKind::StackUnderflow, offset))
    }

    fn read_operand(&mut self, offset: usize) -> Result<u16, RuntimeError> {
        let word = self.block.word(self.ip).ok_or_else(|| {
            RuntimeError::new(
                RuntimeErrorKind::InvalidBytecode("OP_CONSTANT without operand".to_string()),
                offset,
            )
        })?;
        self.ip += 1;
        Ok(word)
    }

    fn execute(&mut self, diag: &mut Diagnostics) -> Result<Value, RuntimeError> {
        loop {
            let offset = self.ip;
            let word = self.block.word(offset).ok_or_else(|| {
                RuntimeError::new(
                    RuntimeErrorKind::InvalidBytecode("code block does not end with OP_RETURN".to_string()),
                    offset,
                )
            })?;
            self.ip += 1;
            self.check_limits(offset)?;

            let op = OpCode::from_word(word)
                .ok_or_else(|| RuntimeError::new(RuntimeErrorKind::UnknownOpcode(word), offset))?;

            if self.config.trace {
                tracing::trace!(target: "atlang::vm", offset, op = %op, stack = ?self.stack, "dispatch");
            }

            match op {
                OpCode::Constant => {
                    let index = self.read_operand(offset)?;
                    let value = self.block.constant(index).cloned().ok_or_else(|| {
                        RuntimeError::new(
                            RuntimeErrorKind::InvalidBytecode(format!("constant index {} out of range", index)),
                            offset,
                        )
                    })?;
                    self.push(value, offset)?;
                }

                OpCode::Nothing => self.push(Value::Nothing, offset)?,
                OpCode::True => self.push(Value::Bool(true), offset)?,
                OpCode::False => self.push(Value::Bool(false), offset)?,

                OpCode::Neg => {
                    let value = self.pop(offset)?;
                    let result = negate(value).map_err(|kind| RuntimeError::new(kind, offset))?;
                    self.push(result, offset)?;
                }
                OpCode::Not => {
                    let value = self.pop(offset)?;
                    self.push(Value::Bool(!value.truthy()), offset)?;
                }

                OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div | OpCode::Mod => {
                    let operands = self.binary_operands(op, offset, diag)?;
                    let result = arithmetic(op, operands).map_err(|kind| RuntimeError::new(kind, offset))?;
                    self.push(result, offset)?;
                }

                OpCode::Equality | OpCode::Neq | OpCode::Lt | OpCode::Gt | OpCode::Lte | OpCode::Gte => {
                    let operands = self.binary_operands(op, offset, diag)?;
                    if operands.common == ValueKind::Float
                        && matches!(op, OpCode::Equality | OpCode::Neq)
                    {
                        diag.runtime_warning(FLOAT_EQUALITY_WARNING);
                    }
                    let result = compare(op, operands).map_err(|kind| RuntimeError::new(kind, offset))?;
                    self.push(Value::Bool(result), offset)?;
                }

                OpCode::Return => {
                    let value = self.peek().cloned().ok_or_else(|| {
                        RuntimeError::new(RuntimeErrorKind::StackUnderflow, offset)
                    })?;
                    tracing::debug!(ip = self.ip, steps = self.steps, "segment finished");
                    return Ok(value);
                }
            }
        }
    }

    /// Pop `b`, pop `a` and normalize the pair for `op`. Conversion warnings
    /// go to `diag`.
    fn binary_operands(
        &mut self,
        op: OpCode,
        offset: usize,
        diag: &mut Diagnostics,
    ) -> Result<Normalized, RuntimeError> {
        let b = self.pop(offset)?;
        let a = self.pop(offset)?;
        let normalized = match op {
            OpCode::Equality | OpCode::Neq => normalize_equality(a, b),
            _ => normalize(a, b),
        };
        let operands = normalized.map_err(|err| RuntimeError::new(err.into(), offset))?;
        if let Some(warning) = operands.warning {
            diag.runtime_warning(warning);
        }
        Ok(operands)
    }
}

fn negate(value: Value) -> Result<Value, RuntimeErrorKind> {
    match value {
        Value::Int(n) => Ok(Value::Int(n.wrapping_neg())),
        Value::Uint(n) => Ok(Value::Uint(n.wrapping_neg())),
        Value::Float(n) => Ok(Value::Float(-n)),
        // -1 is still true
        Value::Bool(b) => Ok(Value::Bool(b)),
        Value::Nothing | Value::Obj(_) => Err(RuntimeErrorKind::BadNegOperand),
    }
}

fn not_normalized(operands: &Normalized) -> RuntimeErrorKind {
    RuntimeErrorKind::InvalidConversion(format!(
        "operands not normalized: {} and {}",
        operands.left.kind(),
        operands.right.kind()
    ))
}

fn arithmetic(op: OpCode, operands: Normalized) -> Result<Value, RuntimeErrorKind> {
    match (&operands.left, &operands.right) {
        (Value::Int(a), Value::Int(b)) => {
            let (a, b) = (*a, *b);
            let n = match op {
                OpCode::Add => a.wrapping_add(b),
                OpCode::Sub => a.wrapping_sub(b),
                OpCode::Mul => a.wrapping_mul(b),
                OpCode::Div if b == 0 => return Err(RuntimeErrorKind::DivisionByZero),
                OpCode::Div => a.wrapping_div(b),
                OpCode::Mod if b == 0 => return Err(RuntimeErrorKind::DivisionByZero),
                OpCode::Mod => a.wrapping_rem(b),
                _ => return Err(RuntimeErrorKind::UnknownOpcode(op.word())),
            };
            Ok(Value::Int(n))
        }
        (Value::Uint(a), Value::Uint(b)) => {
            let (a, b) = (*a, *b);
            let n = match op {
                OpCode::Add => a.wrapping_add(b),
                OpCode::Sub => a.wrapping_sub(b),
                OpCode::Mul => a.wrapping_mul(b),
                OpCode::Div | OpCode::Mod if b == 0 => return Err(RuntimeErrorKind::DivisionByZero),
                OpCode::Div => a / b,
                OpCode::Mod => a % b,
                _ => return Err(RuntimeErrorKind::UnknownOpcode(op.word())),
            };
            Ok(Value::Uint(n))
        }
        (Value::Float(a), Value::Float(b)) => {
            let n = match op {
                OpCode::Add => a + b,
                OpCode::Sub => a - b,
                OpCode::Mul => a * b,
                OpCode::Div => a / b,
                OpCode::Mod => a % b,
                _ => return Err(RuntimeErrorKind::UnknownOpcode(op.word())),
            };
            Ok(Value::Float(n))
        }
        (Value::Bool(_), Value::Bool(_)) => Err(RuntimeErrorKind::BooleanArithmetic),
        (Value::Obj(a), Value::Obj(b)) => {
            let unsupported = RuntimeErrorKind::UnsupportedObjectOp {
                op,
                type_name: a.type_name(),
            };
            if op != OpCode::Add {
                return Err(unsupported);
            }
            a.add(b).map(|obj| Value::Obj(Rc::new(obj))).ok_or(unsupported)
        }
        _ => Err(not_normalized(&operands)),
    }
}

fn compare(op: OpCode, operands: Normalized) -> Result<bool, RuntimeErrorKind> {
    let ordering = match (&operands.left, &operands.right) {
        (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
        (Value::Uint(a), Value::Uint(b)) => a.partial_cmp(b),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.partial_cmp(b),
        (Value::Obj(a), Value::Obj(b)) => {
            return match op {
                OpCode::Equality => Ok(a.equals(b)),
                OpCode::Neq => Ok(!a.equals(b)),
                _ => Err(RuntimeErrorKind::UnsupportedObjectOp {
                    op,
                    type_name: a.type_name(),
                }),
            };
        }
        _ => return Err(not_normalized(&operands)),
    };

    // NaN compares unordered: only != holds
    let result = match op {
        OpCode::Equality => ordering == Some(Ordering::Equal),
        OpCode::Neq => ordering != Some(Ordering::Equal),
        OpCode::Lt => ordering == Some(Ordering::Less),
        OpCode::Gt => ordering == Some(Ordering::Greater),
        OpCode::Lte => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        OpCode::Gte => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
        _ => return Err(RuntimeErrorKind::UnknownOpcode(op.word())),
    };
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Severity;
    use crate::lang::coerce::{FLOAT_TO_BOOL_WARNING, UNSIGNED_FLOAT_WARNING};

    // ============================================================
    // Test Helpers
    // ============================================================

    enum Item {
        Const(Value),
        Op(OpCode),
    }

    use Item::{Const, Op};

    fn block_from(items: Vec<Item>) -> CodeBlock {
        let mut block = CodeBlock::new();
        for item in items {
            match item {
                Const(value) => {
                    block.emit_constant(value).unwrap();
                }
                Op(op) => block.write_op(op),
            }
        }
        block
    }

    fn run_with(items: Vec<Item>, config: VmConfig) -> (Result<Option<Value>, RuntimeError>, Vm, Diagnostics) {
        let mut vm = Vm::with_config(config);
        vm.load_block(block_from(items));
        let mut diag = Diagnostics::new();
        let result = vm.run(&mut diag);
        (result, vm, diag)
    }

    /// Run one segment and return its result
    fn run(items: Vec<Item>) -> Result<Value, RuntimeError> {
        let (result, _, _) = run_with(items, VmConfig::default());
        result.map(|v| v.unwrap())
    }

    fn binary(a: Value, b: Value, op: OpCode) -> Result<Value, RuntimeError> {
        run(vec![Const(a), Const(b), Op(op), Op(OpCode::Return)])
    }

    fn assert_binary(a: Value, b: Value, op: OpCode, expected: Value) {
        let result = binary(a, b, op).expect("execution should succeed");
        assert_eq!(result, expected);
    }

    /// Assert execution fails with the given kind
    fn assert_error(a: Value, b: Value, op: OpCode, expected: RuntimeErrorKind) {
        match binary(a, b, op) {
            Ok(v) => panic!("expected {:?}, got value {:?}", expected, v),
            Err(e) => assert_eq!(e.kind, expected),
        }
    }

    // ============================================================
    // Literals and unary operators
    // ============================================================

    #[test]
    fn test_literals() {
        assert_eq!(run(vec![Op(OpCode::True), Op(OpCode::Return)]).unwrap(), Value::Bool(true));
        assert_eq!(run(vec![Op(OpCode::False), Op(OpCode::Return)]).unwrap(), Value::Bool(false));
        assert_eq!(run(vec![Op(OpCode::Nothing), Op(OpCode::Return)]).unwrap(), Value::Nothing);
    }

    #[test]
    fn test_neg() {
        let neg = |v| run(vec![Const(v), Op(OpCode::Neg), Op(OpCode::Return)]);
        assert_eq!(neg(Value::Int(5)).unwrap(), Value::Int(-5));
        assert_eq!(neg(Value::Float(2.5)).unwrap(), Value::Float(-2.5));
        assert_eq!(neg(Value::Uint(1)).unwrap(), Value::Uint(u64::MAX));
        assert_eq!(neg(Value::Bool(true)).unwrap(), Value::Bool(true));
        assert_eq!(neg(Value::Int(i64::MIN)).unwrap(), Value::Int(i64::MIN));
        assert_eq!(neg(Value::Nothing).unwrap_err().kind, RuntimeErrorKind::BadNegOperand);
        assert_eq!(neg(Value::string("x")).unwrap_err().kind, RuntimeErrorKind::BadNegOperand);
    }

    #[test]
    fn test_not() {
        let not = |v| run(vec![Const(v), Op(OpCode::Not), Op(OpCode::Return)]).unwrap();
        assert_eq!(not(Value::Nothing), Value::Bool(true));
        assert_eq!(not(Value::Bool(false)), Value::Bool(true));
        assert_eq!(not(Value::Int(0)), Value::Bool(true));
        assert_eq!(not(Value::Float(0.5)), Value::Bool(false));
        assert_eq!(not(Value::string("")), Value::Bool(false));
    }

    // ============================================================
    // Arithmetic
    // ============================================================

    #[test]
    fn test_integer_arithmetic() {
        assert_binary(Value::Int(7), Value::Int(2), OpCode::Add, Value::Int(9));
        assert_binary(Value::Int(7), Value::Int(2), OpCode::Sub, Value::Int(5));
        assert_binary(Value::Int(7), Value::Int(2), OpCode::Mul, Value::Int(14));
        assert_binary(Value::Int(7), Value::Int(2), OpCode::Div, Value::Int(3));
        assert_binary(Value::Int(-7), Value::Int(2), OpCode::Mod, Value::Int(-1));
        assert_binary(Value::Int(i64::MAX), Value::Int(1), OpCode::Add, Value::Int(i64::MIN));
    }

    #[test]
    fn test_division_by_zero() {
        assert_error(Value::Int(1), Value::Int(0), OpCode::Div, RuntimeErrorKind::DivisionByZero);
        assert_error(Value::Int(1), Value::Int(0), OpCode::Mod, RuntimeErrorKind::DivisionByZero);
        assert_error(Value::Uint(1), Value::Uint(0), OpCode::Div, RuntimeErrorKind::DivisionByZero);
        let inf = binary(Value::Float(1.0), Value::Float(0.0), OpCode::Div).unwrap();
        assert_eq!(inf, Value::Float(f64::INFINITY));
    }

    #[test]
    fn test_mixed_numeric() {
        // int left, float right: left becomes float
        assert_binary(Value::Int(1), Value::Float(0.5), OpCode::Add, Value::Float(1.5));
        // float left, int right
        assert_binary(Value::Float(0.5), Value::Int(2), OpCode::Mul, Value::Float(1.0));
        // uint left, int right: both uint
        assert_binary(Value::Uint(10), Value::Int(3), OpCode::Sub, Value::Uint(7));
        // int left, uint right: both int
        assert_binary(Value::Int(10), Value::Uint(3), OpCode::Sub, Value::Int(7));
    }

    #[test]
    fn test_boolean_arithmetic_is_an_error() {
        assert_error(Value::Bool(true), Value::Int(1), OpCode::Add, RuntimeErrorKind::BooleanArithmetic);
        assert_error(Value::Int(1), Value::Bool(true), OpCode::Add, RuntimeErrorKind::BooleanArithmetic);
        // float left wins over bool
        assert_binary(Value::Float(1.5), Value::Bool(true), OpCode::Add, Value::Float(2.5));
    }

    #[test]
    fn test_nothing_operand() {
        assert_error(Value::Nothing, Value::Int(1), OpCode::Add, RuntimeErrorKind::NothingOperand);
        assert_error(Value::Int(1), Value::Nothing, OpCode::Add, RuntimeErrorKind::NothingOperand);
        assert_error(Value::Nothing, Value::Nothing, OpCode::Equality, RuntimeErrorKind::NothingOperand);
    }

    #[test]
    fn test_string_concatenation() {
        let result = binary(Value::string("ab"), Value::string("cd"), OpCode::Add).unwrap();
        assert_eq!(result.as_str(), Some("abcd"));

        let result = binary(Value::string("n="), Value::Int(5), OpCode::Add).unwrap();
        assert_eq!(result.as_str(), Some("n=5"));
    }

    #[test]
    fn test_string_unsupported_ops() {
        assert_error(
            Value::string("a"),
            Value::string("b"),
            OpCode::Sub,
            RuntimeErrorKind::UnsupportedObjectOp {
                op: OpCode::Sub,
                type_name: "string",
            },
        );
        assert!(matches!(
            binary(Value::string("a"), Value::string("b"), OpCode::Lt).unwrap_err().kind,
            RuntimeErrorKind::UnsupportedObjectOp { .. }
        ));
    }

    #[test]
    fn test_object_to_scalar_conversion() {
        assert_binary(Value::Int(1), Value::string("41"), OpCode::Add, Value::Int(42));
        assert!(matches!(
            binary(Value::Int(1), Value::string("x"), OpCode::Add).unwrap_err().kind,
            RuntimeErrorKind::InvalidConversion(_)
        ));
    }

    // ============================================================
    // Comparison
    // ============================================================

    #[test]
    fn test_comparisons() {
        assert_binary(Value::Int(1), Value::Int(2), OpCode::Lt, Value::Bool(true));
        assert_binary(Value::Int(1), Value::Int(2), OpCode::Gte, Value::Bool(false));
        assert_binary(Value::Uint(2), Value::Uint(2), OpCode::Lte, Value::Bool(true));
        assert_binary(Value::Int(3), Value::Int(2), OpCode::Gt, Value::Bool(true));
        assert_binary(Value::Int(3), Value::Int(3), OpCode::Neq, Value::Bool(false));
        assert_binary(Value::Bool(true), Value::Bool(false), OpCode::Gt, Value::Bool(true));
    }

    #[test]
    fn test_string_equality() {
        assert_binary(Value::string("ab"), Value::string("ab"), OpCode::Equality, Value::Bool(true));
        assert_binary(Value::string("ab"), Value::string("ac"), OpCode::Equality, Value::Bool(false));
        assert_binary(Value::string("ab"), Value::string("ac"), OpCode::Neq, Value::Bool(true));
        assert_binary(Value::Int(1), Value::string("1"), OpCode::Equality, Value::Bool(true));
        assert_binary(Value::string("1"), Value::Int(1), OpCode::Equality, Value::Bool(true));
    }

    #[test]
    fn test_scalar_object_equality_is_textual() {
        assert_binary(Value::Int(1), Value::string("abc"), OpCode::Equality, Value::Bool(false));
        assert_binary(Value::Int(1), Value::string("01"), OpCode::Neq, Value::Bool(true));
        assert_binary(Value::Uint(0x1F), Value::string("0x1F"), OpCode::Equality, Value::Bool(true));
        assert_binary(Value::Float(0.5), Value::string("0.5"), OpCode::Equality, Value::Bool(true));
        // ordered comparisons still parse the text
        assert_error(
            Value::Int(1),
            Value::string("abc"),
            OpCode::Lt,
            RuntimeErrorKind::InvalidConversion("cannot convert \"abc\" to signed int".to_string()),
        );
    }

    #[test]
    fn test_nan_comparisons() {
        let nan = || Value::Float(f64::NAN);
        assert_binary(nan(), nan(), OpCode::Equality, Value::Bool(false));
        assert_binary(nan(), nan(), OpCode::Neq, Value::Bool(true));
        assert_binary(nan(), Value::Float(1.0), OpCode::Lt, Value::Bool(false));
    }

    // ============================================================
    // Warnings
    // ============================================================

    fn warnings_of(a: Value, b: Value, op: OpCode) -> Vec<String> {
        let (result, _, diag) = run_with(
            vec![Const(a), Const(b), Op(op), Op(OpCode::Return)],
            VmConfig::default(),
        );
        assert!(result.is_ok());
        diag.entries()
            .iter()
            .filter(|d| d.severity == Severity::RuntimeWarning)
            .map(|d| d.message.clone())
            .collect()
    }

    #[test]
    fn test_float_equality_warns() {
        let warnings = warnings_of(Value::Float(0.1), Value::Float(0.1), OpCode::Equality);
        assert_eq!(warnings, vec![FLOAT_EQUALITY_WARNING.to_string()]);
        assert!(warnings_of(Value::Float(0.1), Value::Float(0.1), OpCode::Lt).is_empty());
    }

    #[test]
    fn test_conversion_warnings() {
        assert_eq!(
            warnings_of(Value::Bool(true), Value::Float(0.5), OpCode::Equality),
            vec![FLOAT_TO_BOOL_WARNING.to_string()]
        );
        assert_eq!(
            warnings_of(Value::Uint(1), Value::Float(0.5), OpCode::Gt),
            vec![UNSIGNED_FLOAT_WARNING.to_string()]
        );
    }

    // ============================================================
    // Control and limits
    // ============================================================

    #[test]
    fn test_error_is_recorded_and_ip_skips_to_end() {
        let items = vec![
            Op(OpCode::Nothing),
            Op(OpCode::Neg),
            Op(OpCode::Return),
        ];
        let (result, vm, diag) = run_with(items, VmConfig::default());
        assert!(result.is_err());
        assert_eq!(vm.ip(), vm.block().len());
        assert_eq!(diag.count_of(Severity::RuntimeError), 1);
        assert!(diag.entries()[0].message.contains("expected number or bool"));
    }

    #[test]
    fn test_segments_run_in_order() {
        let mut vm = Vm::new();
        vm.load_block(block_from(vec![
            Const(Value::Int(1)),
            Op(OpCode::Return),
            Op(OpCode::True),
            Op(OpCode::Return),
        ]));
        let mut diag = Diagnostics::new();

        assert_eq!(vm.run(&mut diag).unwrap(), Some(Value::Int(1)));
        assert_eq!(vm.ip(), 3);
        vm.reset_stack();
        assert_eq!(vm.run(&mut diag).unwrap(), Some(Value::Bool(true)));
        assert!(vm.at_end());
        assert_eq!(vm.run(&mut diag).unwrap(), None);
    }

    #[test]
    fn test_unknown_opcode_without_verify() {
        let mut block = CodeBlock::new();
        block.write_word(999);
        block.write_op(OpCode::Return);
        let mut vm = Vm::with_config(VmConfig {
            verify: false,
            ..VmConfig::default()
        });
        vm.load_block(block);
        let err = vm.run(&mut Diagnostics::new()).unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::UnknownOpcode(999));
        assert_eq!(err.offset, 0);
    }

    #[test]
    fn test_verify_rejects_bad_segment() {
        let (result, _, _) = run_with(vec![Op(OpCode::Add), Op(OpCode::Return)], VmConfig::default());
        assert!(matches!(result.unwrap_err().kind, RuntimeErrorKind::InvalidBytecode(_)));
    }

    #[test]
    fn test_step_limit() {
        let config = VmConfig {
            max_steps: Some(2),
            ..VmConfig::default()
        };
        let items = vec![
            Const(Value::Int(1)),
            Op(OpCode::Neg),
            Op(OpCode::Neg),
            Op(OpCode::Return),
        ];
        let (result, _, _) = run_with(items, config);
        assert_eq!(result.unwrap_err().kind, RuntimeErrorKind::StepLimit(2));
    }

    #[test]
    fn test_stack_limit() {
        let config = VmConfig {
            max_stack_size: 1,
            ..VmConfig::default()
        };
        let items = vec![
            Op(OpCode::True),
            Op(OpCode::True),
            Op(OpCode::Equality),
            Op(OpCode::Return),
        ];
        let (result, _, _) = run_with(items, config);
        assert_eq!(result.unwrap_err().kind, RuntimeErrorKind::StackOverflow(1));
    }
}
