mod cli;

use std::process::ExitCode;

use clap::Parser;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use atlang::bytecode::disasm::print_stats;
use atlang::frontend::token_dumper::TokenDumper;
use atlang::{CodeBlock, Interpreter, Source};

use crate::cli::Args;

fn main() -> ExitCode {
    let args = Args::parse();
    atlang::init_logging(args.verbose);

    let mut interp = Interpreter::with_config(args.vm_config(), atlang::Diagnostics::echoing());
    interp.set_print_code(args.disasm);

    if args.tokens {
        dump_tokens(&mut interp, &args);
    } else if let Some(path) = &args.load {
        match CodeBlock::load(path) {
            Ok(block) => {
                if let Ok(values) = interp.run_block(block) {
                    for value in values {
                        println!("Value = {}", value);
                    }
                }
            }
            Err(e) => interp.diagnostics_mut().fatal(e.to_string()),
        }
    } else if args.wants_repl() {
        if let Err(e) = repl(&mut interp) {
            interp.diagnostics_mut().fatal(format!("readline: {}", e));
        }
    } else {
        for source in args.sources() {
            match interp.interpret(&source) {
                Ok(Some(value)) => println!("Value = {}", value),
                Ok(None) => {}
                Err(_) => break,
            }
        }
    }

    if let Some(path) = &args.output {
        if let Err(e) = interp.block().save(path) {
            interp.diagnostics_mut().fatal(e.to_string());
        }
    }

    if args.stats {
        print_stats(interp.block());
    }

    let diag = interp.diagnostics();
    eprintln!("\n    errors: {} warnings: {}", diag.error_count(), diag.warning_count());
    ExitCode::from(diag.error_count().min(u8::MAX as usize) as u8)
}

fn dump_tokens(interp: &mut Interpreter, args: &Args) {
    let dumper = if args.no_color {
        TokenDumper::new().no_color()
    } else {
        TokenDumper::new()
    };

    for source in args.sources() {
        println!("== {} ==", source);
        match interp.tokens(&source) {
            Ok(tokens) => dumper.dump(&tokens),
            Err(_) => break,
        }
    }
}

fn repl(interp: &mut Interpreter) -> Result<(), ReadlineError> {
    let mut rl = DefaultEditor::new()?;
    println!("\natlang v0.1 REPL interface. (Ctrl-D to exit)\n");

    loop {
        match rl.readline(">> ") {
            Ok(line) => {
                if line.is_empty() {
                    continue;
                }
                rl.add_history_entry(line.as_str())?;
                if line == ".quit" {
                    break;
                }
                if let Ok(Some(value)) = interp.interpret(&Source::text(line)) {
                    println!("Value = {}", value);
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e),
        }
    }
    println!();
    Ok(())
}
