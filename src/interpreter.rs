//! One interpreter session. Each input is appended to the block as a new segment.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::bytecode::block::CodeBlock;
use crate::bytecode::compile::compile;
use crate::bytecode::compile_error::CompileError;
use crate::bytecode::disasm::print_block;
use crate::diagnostics::Diagnostics;
use crate::frontend::input::InputError;
use crate::frontend::scanner::Scanner;
use crate::frontend::token::Token;
use crate::lang::value::Value;
use crate::runtime::runtime_error::RuntimeError;
use crate::runtime::vm::{Vm, VmConfig};

/// Where a program comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    File(PathBuf),
    /// In-memory text, reported under the default string source name.
    Text(String),
    Named { name: String, text: String },
}

impl Source {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Source::File(path.into())
    }

    pub fn text(text: impl Into<String>) -> Self {
        Source::Text(text.into())
    }

    pub fn named(name: impl Into<String>, text: impl Into<String>) -> Self {
        Source::Named {
            name: name.into(),
            text: text.into(),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::File(path) => write!(f, "{}", path.display()),
            Source::Text(_) => f.write_str(crate::frontend::input::STRING_SOURCE_NAME),
            Source::Named { name, .. } => f.write_str(name),
        }
    }
}

/// Outcome of a failed interpret cycle. The details have already been
/// recorded in the session's diagnostics.
#[derive(Debug, Error)]
pub enum InterpretError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

pub struct Interpreter {
    scanner: Scanner,
    vm: Vm,
    diag: Diagnostics,
    /// Print the block after every successful compile pass.
    print_code: bool,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_config(VmConfig::default(), Diagnostics::new())
    }

    pub fn with_config(config: VmConfig, diag: Diagnostics) -> Self {
        Self {
            scanner: Scanner::new(),
            vm: Vm::with_config(config),
            diag,
            print_code: false,
        }
    }

    pub fn set_print_code(&mut self, print_code: bool) {
        self.print_code = print_code;
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diag
    }

    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diag
    }

    pub fn vm(&self) -> &Vm {
        &self.vm
    }

    pub fn block(&self) -> &CodeBlock {
        self.vm.block()
    }

    fn open(&mut self, source: &Source) -> Result<(), InputError> {
        let opened = match source {
            Source::File(path) => self.scanner.open_file(path),
            Source::Text(text) => self.scanner.open_string(text),
            Source::Named { name, text } => self.scanner.open_named_string(name, text),
        };
        if let Err(err) = &opened {
            self.diag.fatal(err.to_string());
        }
        opened
    }

    /// Compile `source` onto the end of the block without running it.
    pub fn compile(&mut self, source: &Source) -> Result<(), InterpretError> {
        self.open(source)?;
        let result = compile(&mut self.scanner, self.vm.block_mut(), &mut self.diag);
        // a failed pass can stop in the middle of the input
        self.scanner.input_mut().close_all();
        result?;

        if self.print_code {
            print_block(self.vm.block(), &source.to_string());
        }
        Ok(())
    }

    /// Compile and run one program. Returns the value of its expression.
    pub fn interpret(&mut self, source: &Source) -> Result<Option<Value>, InterpretError> {
        tracing::debug!(%source, "interpret");
        self.vm.reset_stack();
        self.compile(source)?;
        Ok(self.vm.run(&mut self.diag)?)
    }

    /// Replace the session's block with `block` and run every segment in it.
    /// Stops at the first runtime error.
    pub fn run_block(&mut self, block: CodeBlock) -> Result<Vec<Value>, InterpretError> {
        self.vm.load_block(block);
        let mut results = Vec::new();
        while !self.vm.at_end() {
            self.vm.reset_stack();
            if let Some(value) = self.vm.run(&mut self.diag)? {
                results.push(value);
            }
        }
        Ok(results)
    }

    /// Scan `source` to the end and return its tokens, END_OF_INPUT included.
    pub fn tokens(&mut self, source: &Source) -> Result<Vec<Token>, InputError> {
        self.open(source)?;
        let tokens = self.scanner.tokenize(&mut self.diag);
        self.scanner.input_mut().close_all();
        Ok(tokens)
    }
}
