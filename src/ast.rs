use std::fmt::Display;

use ordered_float::OrderedFloat;

use crate::scanner::Pos;

#[derive(Debug, PartialEq, Eq)]
pub struct Program(pub Vec<Decl>);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunDecl {
    pub name: String,
    pub parameters: Vec<String>,
    pub body: Block,
}

/// A brace-delimited sequence of declarations. Evaluating one pushes a scope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block(pub Vec<Decl>);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decl {
    pub pos: Pos,
    pub inner: DeclInner,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeclInner {
    Var {
        name: String,
        init: Option<Expr>,
        constant: bool,
    },
    Fun(FunDecl),
    Block(Block),
    Stmt(Stmt),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stmt {
    pub pos: Pos,
    pub inner: StmtInner,
}

/// The body of an if/elif/else arm or a for loop: either a full block or a
/// single undelimited statement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Body {
    Block(Block),
    Single(Box<Stmt>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CondBranch {
    pub test: Expr,
    pub body: Body,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForStmt {
    pub init: Option<Box<Decl>>,
    pub test: Expr,
    pub step: Option<Expr>,
    pub body: Body,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StmtInner {
    Expr(Expr),
    Print(Expr),
    If {
        branch: CondBranch,
        elifs: Vec<CondBranch>,
        or_else: Option<Body>,
    },
    Return(Option<Expr>),
    For(Box<ForStmt>),
}

/// Every node records where it began; diagnostics lean on it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expr {
    pub pos: Pos,
    pub inner: ExprInner,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExprInner {
    Ternary {
        test: Box<Expr>,
        if_true: Box<Expr>,
        if_false: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    Logical {
        left: Box<Expr>,
        op: LogicalOp,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Group(Box<Expr>),
    Literal(Literal),
    Variable {
        name: String,
    },
    Assignment {
        target: String,
        expr: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        arguments: Vec<Expr>,
    },
}

impl Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            ExprInner::Literal(lit) => write!(f, "{}", lit),
            ExprInner::Group(expr) => write!(f, "(group {})", expr),
            ExprInner::Unary { op, expr } => write!(f, "({} {})", op, expr),
            ExprInner::Binary { left, op, right } => write!(f, "({} {} {})", op, left, right),
            ExprInner::Logical { left, op, right } => write!(f, "({} {} {})", op, left, right),
            ExprInner::Ternary {
                test,
                if_true,
                if_false,
            } => write!(f, "(? {} : {} {})", test, if_true, if_false),
            ExprInner::Variable { name } => write!(f, "(ident {})", name),
            ExprInner::Assignment { target, expr } => write!(f, "(= {} {})", target, expr),
            ExprInner::Call { callee, arguments } => {
                write!(f, "(call {}", callee)?;
                for arg in arguments {
                    write!(f, " {}", arg)?;
                }
                f.write_str(")")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Equal,
    NotEqual,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinaryOp::Equal => f.write_str("=="),
            BinaryOp::NotEqual => f.write_str("!="),
            BinaryOp::LessThan => f.write_str("<"),
            BinaryOp::LessThanEqual => f.write_str("<="),
            BinaryOp::GreaterThan => f.write_str(">"),
            BinaryOp::GreaterThanEqual => f.write_str(">="),
            BinaryOp::Add => f.write_str("+"),
            BinaryOp::Subtract => f.write_str("-"),
            BinaryOp::Multiply => f.write_str("*"),
            BinaryOp::Divide => f.write_str("/"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negative,
}

impl Display for UnaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnaryOp::Not => f.write_str("!"),
            UnaryOp::Negative => f.write_str("-"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Coalesce,
}

impl Display for LogicalOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogicalOp::And => f.write_str("&&"),
            LogicalOp::Or => f.write_str("||"),
            LogicalOp::Coalesce => f.write_str("??"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Number(OrderedFloat<f64>),
    String(String),
    Boolean(bool),
    Nil,
}

impl Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Number(OrderedFloat(dbl)) => write!(f, "{}", dbl),
            Literal::String(s) => f.write_str(s),
            Literal::Boolean(b) => write!(f, "{}", b),
            Literal::Nil => f.write_str("nil"),
        }
    }
}
