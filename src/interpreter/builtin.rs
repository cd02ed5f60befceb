use std::rc::Rc;
use std::time::SystemTime;

use super::callable::RustFunc;
use super::runtime::{Interpreter, RuntimeError, Value};
use crate::env::Environment;

fn system_time(_: &mut Interpreter, _: Vec<Value>) -> Result<Value, RuntimeError> {
    // A clock before the epoch reads as zero rather than failing the script
    let seconds = SystemTime::UNIX_EPOCH
        .elapsed()
        .map_or(0f64, |elapsed| elapsed.as_secs_f64());
    Ok(Value::Number(seconds))
}

const NATIVES: [RustFunc; 1] = [RustFunc {
    name: "system_time",
    arity: 0,
    call: system_time,
}];

/// Install the native functions as constant bindings in the global scope.
pub fn populate_builtin(global_env: &mut Environment) {
    for native in NATIVES {
        global_env.define(native.name, Value::Callable(Rc::new(native)), true);
    }
}
