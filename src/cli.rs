use std::path::PathBuf;

use clap::Parser;

use atlang::{Source, VmConfig};

#[derive(Parser, Debug)]
#[command(name = "atlang")]
#[command(about = "Compile and run atlang expressions")]
pub struct Args {
    /// Programs to run in order. Without files, --eval or --load a REPL starts.
    pub files: Vec<PathBuf>,

    /// Run an expression given on the command line (after the files)
    #[arg(short, long, value_name = "EXPR")]
    pub eval: Option<String>,

    /// Raise the log level (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Write the compiled code block to FILE
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Run every segment of a code block written by --output
    #[arg(long, value_name = "FILE", conflicts_with_all = ["files", "eval"])]
    pub load: Option<PathBuf>,

    /// Print the disassembly after each compile
    #[arg(long)]
    pub disasm: bool,

    /// Print opcode statistics of the final code block
    #[arg(long)]
    pub stats: bool,

    /// Trace every executed instruction (needs -vvv or RUST_LOG=trace)
    #[arg(long)]
    pub trace: bool,

    /// Dump the token stream instead of running
    #[arg(long)]
    pub tokens: bool,

    /// Disable colored token output
    #[arg(long)]
    pub no_color: bool,
}

impl Args {
    pub fn vm_config(&self) -> VmConfig {
        VmConfig {
            trace: self.trace,
            ..VmConfig::default()
        }
    }

    /// Inputs in execution order.
    pub fn sources(&self) -> Vec<Source> {
        let mut sources: Vec<Source> = self.files.iter().map(Source::file).collect();
        if let Some(text) = &self.eval {
            sources.push(Source::text(text.as_str()));
        }
        sources
    }

    pub fn wants_repl(&self) -> bool {
        self.files.is_empty() && self.eval.is_none() && self.load.is_none()
    }
}
