use std::{
    fmt::{Debug, Display},
    io::{self, Write},
    rc::Rc,
};

use thiserror::Error;

use super::callable::{Func, ScriptFunc};
use crate::ast::{
    BinaryOp, Block, Body, Decl, DeclInner, Expr, ExprInner, Literal, LogicalOp, Program, Stmt,
    StmtInner, UnaryOp,
};
use crate::env::Environment;
use crate::reporter::Reporter;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("divide by zero")]
    DivideByZero,
    #[error("Undefined variable '{0}'")]
    UnboundVariable(String),
    #[error("Function '{0}' already defined")]
    AlreadyDefined(String),
    #[error("Constant '{0}' cannot be reassigned")]
    ConstAssignment(String),
    #[error("Expected a number for '{0}' operator")]
    NumberOperands(&'static str),
    #[error("Expected a number or string for '+' operator")]
    AddOperands,
    #[error("Expected a number or string for '{0}' operator")]
    CompareOperands(&'static str),
    #[error("Expected a number after '-' operator")]
    NegateOperand,
    #[error("Expected a number or string after '!' operator")]
    BangOperand,
    #[error("not callable: {0}")]
    NotCallable(String),
    #[error("arity mismatch: {0}")]
    ArityMismatch(String),
    #[error("return outside of a function")]
    InvalidReturn,
    #[error("io error: {0}")]
    IOError(#[from] io::Error),
}

/// Why evaluation is unwinding. `Return` is not an error, it carries the
/// value of a `return` up to the nearest call and must pop every scope it
/// crosses on the way.
#[derive(Debug)]
pub enum UnwindCause {
    Error(RuntimeError),
    Return(Value),
}

#[derive(Clone)]
pub enum Value {
    String(Rc<String>),
    Number(f64),
    Bool(bool),
    Callable(Rc<dyn Func>),
    Nil,
}

impl Value {
    pub fn to_bool(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Nil => false,
            _ => true,
        }
    }

    fn to_callable(&self) -> Option<&dyn Func> {
        match self {
            Self::Callable(callable) => Some(callable.as_ref()),
            _ => None,
        }
    }
}

// Manual because `Rc<dyn Func>` has no Debug; callables show their name
impl Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Nil => f.write_str("Nil"),
            Value::Callable(func) => write!(f, "Callable({})", func.name()),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            Value::Number(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Nil => f.write_str("nil"),
            Value::Callable(func) => write!(f, "[fn {}]", func.name()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::String(left), Self::String(right)) => left == right,
            (Self::Number(left), Self::Number(right)) => left == right,
            (Self::Bool(left), Self::Bool(right)) => left == right,
            (Self::Nil, Self::Nil) => true,
            // Two callables are never observably the same value
            (Self::Callable(_), Self::Callable(_)) => false,
            _ => false,
        }
    }
}

/// Render a value the way the top level result list wants it, which differs
/// from `Display`: nil prints as "null" and callables as "undefined".
pub fn display_form(value: &Value) -> String {
    match value {
        Value::String(s) => s.as_ref().clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Nil => "null".to_string(),
        Value::Callable(_) => "undefined".to_string(),
    }
}

// The arithmetic operators are std::ops impls so the Binary arm of eval can
// write `lhs + rhs`; each one encodes its own coercion rule
impl std::ops::Add for Value {
    type Output = Result<Value, UnwindCause>;

    fn add(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Value::Number(l), Value::Number(r)) => Ok(Value::Number(l + r)),
            (Value::String(l), Value::String(r)) => Ok(Value::String(Rc::new(format!("{}{}", l, r)))),
            (Value::String(l), Value::Number(r)) => Ok(Value::String(Rc::new(format!("{}{}", l, r)))),
            (Value::Number(l), Value::String(r)) => Ok(Value::String(Rc::new(format!("{}{}", l, r)))),
            _ => Err(UnwindCause::Error(RuntimeError::AddOperands)),
        }
    }
}

impl std::ops::Sub for Value {
    type Output = Result<Value, UnwindCause>;

    fn sub(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Value::Number(l), Value::Number(r)) => Ok(Value::Number(l - r)),
            _ => Err(UnwindCause::Error(RuntimeError::NumberOperands("-"))),
        }
    }
}

impl std::ops::Mul for Value {
    type Output = Result<Value, UnwindCause>;

    fn mul(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Value::Number(l), Value::Number(r)) => Ok(Value::Number(l * r)),
            _ => Err(UnwindCause::Error(RuntimeError::NumberOperands("*"))),
        }
    }
}

impl std::ops::Div for Value {
    type Output = Result<Value, UnwindCause>;

    fn div(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Value::Number(l), Value::Number(r)) => {
                if r == 0f64 {
                    Err(UnwindCause::Error(RuntimeError::DivideByZero))
                } else {
                    Ok(Value::Number(l / r))
                }
            }
            _ => Err(UnwindCause::Error(RuntimeError::NumberOperands("/"))),
        }
    }
}

pub struct Interpreter {
    env: Environment,
    out: Box<dyn Write>,
}

impl Interpreter {
    pub fn new(env: Environment, out: Box<dyn Write>) -> Interpreter {
        Interpreter { env, out }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Run every top level declaration, collecting the display form of each
    /// produced value. Runtime faults go to the reporter; in interactive mode
    /// only the current form is abandoned, otherwise evaluation stops.
    pub fn evaluate<R: Reporter>(
        &mut self,
        program: &Program,
        interactive: bool,
        reporter: &mut R,
    ) -> Vec<String> {
        let mut results = Vec::new();
        for decl in &program.0 {
            match self.execute_decl(decl) {
                Ok(values) => results.extend(values.iter().map(display_form)),
                Err(cause) => {
                    let error = match cause {
                        UnwindCause::Return(_) => RuntimeError::InvalidReturn,
                        UnwindCause::Error(error) => error,
                    };
                    reporter.report(decl.pos, "runtime", &error.to_string());
                    if !interactive {
                        break;
                    }
                }
            }
        }
        results
    }

    pub fn execute_decl(&mut self, decl: &Decl) -> Result<Vec<Value>, UnwindCause> {
        match &decl.inner {
            DeclInner::Stmt(stmt) => Ok(vec![self.execute_stmt(stmt)?]),
            DeclInner::Var {
                name,
                init,
                constant,
            } => {
                let value = match init {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Nil,
                };
                self.env.define(name, value.clone(), *constant);
                Ok(vec![value])
            }
            DeclInner::Fun(fun) => {
                if self.env.get(&fun.name).is_some() {
                    return Err(UnwindCause::Error(RuntimeError::AlreadyDefined(
                        fun.name.clone(),
                    )));
                }
                let func = ScriptFunc {
                    name: fun.name.clone(),
                    parameters: fun.parameters.clone(),
                    body: fun.body.clone(),
                };
                let value = Value::Callable(Rc::new(func));
                self.env.define(&fun.name, value.clone(), false);
                Ok(vec![value])
            }
            DeclInner::Block(block) => self.execute_block(block),
        }
    }

    /// Run a block in a fresh scope. The scope is popped on every exit path,
    /// including errors and return unwinds.
    pub fn execute_block(&mut self, block: &Block) -> Result<Vec<Value>, UnwindCause> {
        self.env.begin_scope();
        let result = self.execute_block_decls(block);
        self.env.end_scope();
        result
    }

    fn execute_block_decls(&mut self, block: &Block) -> Result<Vec<Value>, UnwindCause> {
        let mut values = Vec::new();
        for decl in &block.0 {
            values.extend(self.execute_decl(decl)?);
        }
        Ok(values)
    }

    pub fn begin_scope(&mut self) {
        self.env.begin_scope();
    }

    pub fn end_scope(&mut self) {
        self.env.end_scope();
    }

    pub fn define_in_current_scope(&mut self, name: &str, value: Value) {
        self.env.define(name, value, false);
    }

    fn execute_stmt(&mut self, stmt: &Stmt) -> Result<Value, UnwindCause> {
        match &stmt.inner {
            StmtInner::Expr(expr) => self.eval(expr),
            StmtInner::Print(expr) => {
                let value = self.eval(expr)?;
                writeln!(self.out, "{}", value)
                    .map_err(|e| UnwindCause::Error(RuntimeError::from(e)))?;
                Ok(value)
            }
            StmtInner::If {
                branch,
                elifs,
                or_else,
            } => {
                if self.eval(&branch.test)?.to_bool() {
                    self.execute_body(&branch.body)?;
                    return Ok(Value::Nil);
                }
                for elif in elifs {
                    if self.eval(&elif.test)?.to_bool() {
                        self.execute_body(&elif.body)?;
                        return Ok(Value::Nil);
                    }
                }
                if let Some(body) = or_else {
                    self.execute_body(body)?;
                }
                Ok(Value::Nil)
            }
            StmtInner::Return(expr) => {
                let value = match expr {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Nil,
                };
                Err(UnwindCause::Return(value))
            }
            StmtInner::For(for_stmt) => {
                if let Some(init) = &for_stmt.init {
                    self.execute_decl(init)?;
                }
                while self.eval(&for_stmt.test)?.to_bool() {
                    self.execute_body(&for_stmt.body)?;
                    if let Some(step) = &for_stmt.step {
                        self.eval(step)?;
                    }
                }
                Ok(Value::Nil)
            }
        }
    }

    fn execute_body(&mut self, body: &Body) -> Result<(), UnwindCause> {
        match body {
            Body::Block(block) => {
                self.execute_block(block)?;
            }
            Body::Single(stmt) => {
                self.execute_stmt(stmt)?;
            }
        }
        Ok(())
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value, UnwindCause> {
        match &expr.inner {
            ExprInner::Ternary {
                test,
                if_true,
                if_false,
            } => {
                if self.eval(test)?.to_bool() {
                    self.eval(if_true)
                } else {
                    self.eval(if_false)
                }
            }
            ExprInner::Binary { left, op, right } => {
                let lhs = self.eval(left)?;
                let rhs = self.eval(right)?;
                match op {
                    BinaryOp::Equal => Ok(Value::Bool(eq(&lhs, &rhs))),
                    BinaryOp::NotEqual => Ok(Value::Bool(!eq(&lhs, &rhs))),
                    BinaryOp::LessThan
                    | BinaryOp::LessThanEqual
                    | BinaryOp::GreaterThan
                    | BinaryOp::GreaterThanEqual => {
                        if !comparable(&lhs, &rhs) {
                            return Err(UnwindCause::Error(RuntimeError::CompareOperands(
                                compare_op_text(*op),
                            )));
                        }
                        let result = match op {
                            BinaryOp::LessThan => lt(&lhs, &rhs),
                            BinaryOp::LessThanEqual => lt(&lhs, &rhs) || eq(&lhs, &rhs),
                            BinaryOp::GreaterThan => !lt(&lhs, &rhs) && !eq(&lhs, &rhs),
                            BinaryOp::GreaterThanEqual => !lt(&lhs, &rhs),
                            _ => unreachable!(),
                        };
                        Ok(Value::Bool(result))
                    }
                    BinaryOp::Add => lhs + rhs,
                    BinaryOp::Subtract => lhs - rhs,
                    BinaryOp::Multiply => lhs * rhs,
                    BinaryOp::Divide => lhs / rhs,
                }
            }
            ExprInner::Logical {
                left,
                op: LogicalOp::Coalesce,
                right,
            } => {
                let left_val = self.eval(left)?;
                if matches!(left_val, Value::Nil) {
                    self.eval(right)
                } else {
                    Ok(left_val)
                }
            }
            ExprInner::Logical {
                left,
                op: LogicalOp::And,
                right,
            } => {
                let left_val = self.eval(left)?;
                if left_val.to_bool() {
                    let right_val = self.eval(right)?;
                    Ok(Value::Bool(right_val.to_bool()))
                } else {
                    // A falsy left side short-circuits to the no-value result
                    Ok(Value::Nil)
                }
            }
            ExprInner::Logical {
                left,
                op: LogicalOp::Or,
                right,
            } => {
                let left_val = self.eval(left)?;
                if left_val.to_bool() {
                    Ok(Value::Bool(true))
                } else {
                    let right_val = self.eval(right)?;
                    Ok(Value::Bool(right_val.to_bool()))
                }
            }
            ExprInner::Unary { op, expr } => {
                let val = self.eval(expr)?;
                match op {
                    UnaryOp::Negative => match val {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(UnwindCause::Error(RuntimeError::NegateOperand)),
                    },
                    UnaryOp::Not => {
                        // false, zero, and the empty string are the bang-falsy values
                        let falsy = match &val {
                            Value::Bool(b) => !*b,
                            Value::Number(n) => *n == 0f64,
                            Value::String(s) => s.is_empty(),
                            _ => return Err(UnwindCause::Error(RuntimeError::BangOperand)),
                        };
                        Ok(Value::Bool(falsy))
                    }
                }
            }
            ExprInner::Group(expr) => self.eval(expr),
            ExprInner::Literal(Literal::Number(f)) => Ok(Value::Number(**f)),
            ExprInner::Literal(Literal::String(s)) => Ok(Value::String(Rc::new(s.to_string()))),
            ExprInner::Literal(Literal::Boolean(b)) => Ok(Value::Bool(*b)),
            ExprInner::Literal(Literal::Nil) => Ok(Value::Nil),
            ExprInner::Variable { name } => self
                .env
                .get(name)
                .ok_or_else(|| UnwindCause::Error(RuntimeError::UnboundVariable(name.clone()))),
            ExprInner::Assignment { target, expr } => {
                let value = self.eval(expr)?;
                self.env
                    .set(target, value.clone())
                    .map_err(UnwindCause::Error)?;
                Ok(value)
            }
            ExprInner::Call { callee, arguments } => {
                let callee = self.eval(callee)?;
                let args = arguments
                    .iter()
                    .map(|expr| self.eval(expr))
                    .collect::<Result<Vec<_>, _>>()?;
                if let Some(callable) = callee.to_callable() {
                    if args.len() != callable.arity().into() {
                        Err(UnwindCause::Error(RuntimeError::ArityMismatch(
                            callable.name().to_string(),
                        )))
                    } else {
                        callable.call(self, args).map_err(UnwindCause::Error)
                    }
                } else {
                    Err(UnwindCause::Error(RuntimeError::NotCallable(
                        callee.to_string(),
                    )))
                }
            }
        }
    }
}

// Equality is typed: values of different types are unequal, never an error
fn eq(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::String(l), Value::String(r)) => l == r,
        (Value::Number(l), Value::Number(r)) => l == r,
        (Value::Bool(l), Value::Bool(r)) => l == r,
        (Value::Nil, Value::Nil) => true,
        _ => false,
    }
}

fn lt(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::String(l), Value::String(r)) => l < r,
        (Value::Number(l), Value::Number(r)) => l < r,
        _ => false,
    }
}

// Ordering is only defined within numbers and within strings
fn comparable(lhs: &Value, rhs: &Value) -> bool {
    matches!(
        (lhs, rhs),
        (Value::Number(_), Value::Number(_)) | (Value::String(_), Value::String(_))
    )
}

fn compare_op_text(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::LessThan => "<",
        BinaryOp::LessThanEqual => "<=",
        BinaryOp::GreaterThan => ">",
        BinaryOp::GreaterThanEqual => ">=",
        _ => unreachable!("not a comparison operator"),
    }
}
