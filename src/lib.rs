pub mod ast;
pub mod env;
pub mod interpreter;
pub mod parser;
pub mod reporter;
pub mod scanner;

use interpreter::Interpreter;
use parser::Parser;
use reporter::Reporter;
use scanner::Scanner;

/// Scan, parse, and evaluate one source unit against a live interpreter.
/// Parse failures have already been reported and yield `None`; otherwise the
/// display form of every top level result is returned, in order.
pub fn execute<R: Reporter>(
    source: &str,
    interpreter: &mut Interpreter,
    reporter: &mut R,
    interactive: bool,
) -> Option<Vec<String>> {
    let scanner = Scanner::new(source);
    let parser = Parser::new(scanner, interpreter.env(), reporter);
    match parser.parse() {
        Ok(program) => Some(interpreter.evaluate(&program, interactive, reporter)),
        Err(_) => None,
    }
}
