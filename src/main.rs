use std::fs;
use std::io::prelude::*;
use std::io::BufReader;

use anyhow::{Context, Result};

use skiff::execute;
use skiff::interpreter::stock_interpreter;
use skiff::reporter::WriteReporter;

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let script_path = args.next();
    if args.next().is_some() {
        eprintln!("Usage: skiff [script]");
        std::process::exit(64);
    }
    match script_path {
        Some(path) => {
            let script = fs::read_to_string(&path)
                .with_context(|| format!("Unable to read script file {}", path))?;
            run_script(&script);
            Ok(())
        }
        None => run_prompt(),
    }
}

fn run_script(script: &str) {
    let mut interpreter = stock_interpreter();
    let mut reporter = WriteReporter::new(std::io::stderr());
    if execute(script, &mut interpreter, &mut reporter, false).is_none() {
        std::process::exit(65);
    }
}

fn run_prompt() -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    let mut reader = BufReader::new(std::io::stdin().lock());
    let mut line = String::new();

    let mut interpreter = stock_interpreter();
    let mut reporter = WriteReporter::new(std::io::stderr());

    loop {
        stdout.write_all(b"> ")?;
        stdout.flush()?;
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Ok(());
        }
        if line.trim() == ".env" {
            // Inspection helper: show the bindings of the current scope
            interpreter.env().print_state(&mut stdout)?;
        } else if let Some(results) = execute(&line, &mut interpreter, &mut reporter, true) {
            for result in results {
                writeln!(stdout, "{}", result)?;
            }
        }
    }
}
