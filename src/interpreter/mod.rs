mod builtin;
mod callable;
mod runtime;

use std::io::{self, Write};

pub use builtin::populate_builtin;
pub use callable::{Func, RustFunc, ScriptFunc};
pub use runtime::{display_form, Interpreter, RuntimeError, UnwindCause, Value};

use crate::env::Environment;

/// An interpreter with the built-in functions installed, printing to stdout.
pub fn stock_interpreter() -> Interpreter {
    stock_interpreter_to(Box::new(io::stdout()))
}

/// As `stock_interpreter`, but printing to the given sink.
pub fn stock_interpreter_to(out: Box<dyn Write>) -> Interpreter {
    let mut global_env = Environment::new_global();
    populate_builtin(&mut global_env);
    Interpreter::new(global_env, out)
}
