use super::runtime::{Interpreter, RuntimeError, UnwindCause, Value};
use crate::ast::Block;

pub trait Func {
    fn name(&self) -> &str;
    fn arity(&self) -> u8;
    fn call(&self, interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError>;
}

/// A function provided by the host, installed into the global scope.
#[derive(Debug, Clone, PartialEq)]
pub struct RustFunc {
    pub name: &'static str,
    pub arity: u8,
    pub call: fn(&mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError>,
}

impl Func for RustFunc {
    fn name(&self) -> &str {
        self.name
    }

    fn arity(&self) -> u8 {
        self.arity
    }

    fn call(&self, interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError> {
        (self.call)(interpreter, args)
    }
}

/// A function declared in source. The body block was moved out of its
/// declaration and lives as long as the binding does.
#[derive(Clone)]
pub struct ScriptFunc {
    pub name: String,
    pub parameters: Vec<String>,
    pub body: Block,
}

impl Func for ScriptFunc {
    fn name(&self) -> &str {
        &self.name
    }

    fn arity(&self) -> u8 {
        self.parameters.len().try_into().unwrap_or(u8::MAX)
    }

    fn call(&self, interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError> {
        interpreter.begin_scope();
        for (parameter, value) in self.parameters.iter().zip(args.into_iter()) {
            interpreter.define_in_current_scope(parameter, value);
        }
        let result = interpreter.execute_block(&self.body);
        interpreter.end_scope();
        match result {
            // A body that runs off the end produces nil
            Ok(_) => Ok(Value::Nil),
            Err(UnwindCause::Return(value)) => Ok(value),
            Err(UnwindCause::Error(error)) => Err(error),
        }
    }
}
