use std::collections::HashMap;
use std::io::Write;

use crate::interpreter::{RuntimeError, Value};

#[derive(Clone, Debug)]
struct Binding {
    value: Value,
    constant: bool,
}

#[derive(Clone, Debug, Default)]
struct Frame {
    bindings: HashMap<String, Binding>,
}

/// The scope chain. Frame 0 is the global scope and lives as long as the
/// interpreter; the frames above it nest strictly, pushed on block entry and
/// popped on every exit path.
#[derive(Clone, Debug)]
pub struct Environment {
    frames: Vec<Frame>,
}

impl Environment {
    pub fn new_global() -> Environment {
        Environment {
            frames: vec![Frame::default()],
        }
    }

    /// Look a name up, innermost scope first, so that inner bindings shadow
    /// outer ones. A `None` means there is no binding anywhere in the chain.
    pub fn get(&self, name: &str) -> Option<Value> {
        for frame in self.frames.iter().rev() {
            if let Some(binding) = frame.bindings.get(name) {
                return Some(binding.value.clone());
            }
        }
        None
    }

    pub fn contains(&self, name: &str) -> bool {
        self.frames
            .iter()
            .any(|frame| frame.bindings.contains_key(name))
    }

    /// Assign to an existing binding, searching innermost scope first. A name
    /// with no visible binding is planted in the innermost scope.
    pub fn set(&mut self, name: &str, value: Value) -> Result<(), RuntimeError> {
        for frame in self.frames.iter_mut().rev() {
            if let Some(binding) = frame.bindings.get_mut(name) {
                if binding.constant {
                    return Err(RuntimeError::ConstAssignment(name.to_string()));
                }
                binding.value = value;
                return Ok(());
            }
        }
        self.define(name, value, false);
        Ok(())
    }

    /// Bind in the innermost scope unconditionally. Declarations and call
    /// parameters go through here so shadowing works.
    pub fn define(&mut self, name: &str, value: Value, constant: bool) {
        // Unwrap is fine, the global frame is never popped
        let frame = self.frames.last_mut().unwrap();
        frame
            .bindings
            .insert(name.to_string(), Binding { value, constant });
    }

    pub fn begin_scope(&mut self) {
        self.frames.push(Frame::default());
    }

    pub fn end_scope(&mut self) {
        // The global frame stays put no matter how unbalanced the caller is
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Dump the innermost scope's bindings, one per line. The REPL exposes
    /// this as the `.env` command.
    pub fn print_state(&self, out: &mut dyn Write) -> std::io::Result<()> {
        // Unwrap is fine, the global frame is never popped
        let frame = self.frames.last().unwrap();
        let mut names: Vec<&String> = frame.bindings.keys().collect();
        names.sort();
        for name in names {
            let binding = &frame.bindings[name];
            writeln!(out, "{} => {}", name, binding.value)?;
        }
        Ok(())
    }
}
