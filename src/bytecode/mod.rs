pub mod block;
pub mod compile;
pub mod compile_error;
pub mod disasm;
pub mod op;
pub mod stack_check;

pub use block::{CodeBlock, Instruction};
pub use compile_error::CompileError;
pub use op::OpCode;
