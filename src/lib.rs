//! atlang: an expression language compiled to a stack-machine bytecode.

pub mod bytecode;
pub mod diagnostics;
pub mod frontend;
pub mod interpreter;
pub mod lang;
pub mod runtime;

use tracing_subscriber::{EnvFilter, fmt};

pub use bytecode::{CodeBlock, CompileError, OpCode};
pub use diagnostics::{Diagnostic, Diagnostics, Location, Severity};
pub use interpreter::{InterpretError, Interpreter, Source};
pub use lang::value::Value;
pub use runtime::{RuntimeError, Vm, VmConfig};

/// Install the global tracing subscriber. `RUST_LOG` wins over `verbosity`.
pub fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
