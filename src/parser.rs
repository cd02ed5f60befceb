use std::collections::HashSet;

use ordered_float::OrderedFloat;
use thiserror::Error;

use crate::ast::{
    BinaryOp, Block, Body, CondBranch, Decl, DeclInner, Expr, ExprInner, ForStmt, FunDecl, Literal,
    LogicalOp, Program, Stmt, StmtInner, UnaryOp,
};
use crate::env::Environment;
use crate::reporter::Reporter;
use crate::scanner::{Keyword, Pos, Scanner, Symbol, Token, TokenType};

/// What callers see when a program has at least one syntax error. The details
/// went to the reporter as they were found.
#[derive(Error, Debug)]
#[error("parse error")]
pub struct ParseError {}

/// Unwinds a single declaration after its error was reported. Carries nothing.
#[derive(Error, Debug)]
#[error("internal parse error")]
struct InternalError {}

/// Wraps the caller's reporter and remembers whether anything came through,
/// which is how `parse` decides between a usable program and `ParseError`.
struct StateTrackingReporter<'a, R> {
    reporter: &'a mut R,
    errored: bool,
}

impl<'a, R> StateTrackingReporter<'a, R>
where
    R: Reporter,
{
    fn report(&mut self, pos: Pos, msg: &str) {
        self.errored = true;
        self.reporter.report(pos, "parse", msg);
    }
}

// Operator sets, one per precedence level
const EQUALITY_SYMBOLS: [Symbol; 2] = [Symbol::EqualEqual, Symbol::BangEqual];

const COMPARISON_SYMBOLS: [Symbol; 4] = [
    Symbol::Greater,
    Symbol::GreaterEqual,
    Symbol::Less,
    Symbol::LessEqual,
];

const TERM_SYMBOLS: [Symbol; 2] = [Symbol::Minus, Symbol::Plus];

const FACTOR_SYMBOLS: [Symbol; 2] = [Symbol::Star, Symbol::Slash];

const UNARY_SYMBOLS: [Symbol; 2] = [Symbol::Minus, Symbol::Bang];

// Every infix operator symbol. When one of these opens an expression, the
// operand before it is missing and primary produces a dedicated diagnostic
const INFIX_SYMBOLS: [Symbol; 13] = [
    Symbol::EqualEqual,
    Symbol::BangEqual,
    Symbol::Greater,
    Symbol::GreaterEqual,
    Symbol::Less,
    Symbol::LessEqual,
    Symbol::Minus,
    Symbol::Plus,
    Symbol::Star,
    Symbol::Slash,
    Symbol::AndAnd,
    Symbol::OrOr,
    Symbol::QuestionQuestion,
];

// Tokens that can begin a declaration; synchronize stops just before one
const BOUNDARY_KEYWORDS: [Keyword; 9] = [
    Keyword::Class,
    Keyword::Fun,
    Keyword::Var,
    Keyword::Const,
    Keyword::For,
    Keyword::If,
    Keyword::While,
    Keyword::Print,
    Keyword::Return,
];

pub struct Parser<'src, 'a, R>
where
    R: Reporter,
{
    scanner: Scanner<'src>,
    reporter: StateTrackingReporter<'a, R>,
    /// Bindings of the session the parsed unit will run against. Lets a REPL
    /// line reference names declared by earlier lines.
    env: &'a Environment,
    /// Names declared so far in the unit being parsed, one set per scope.
    /// Declarations are checked for uniqueness against their own scope only,
    /// assignments against the whole stack.
    declared: Vec<HashSet<String>>,
}

impl<'src, 'a, R> Parser<'src, 'a, R>
where
    R: Reporter,
{
    pub fn new(scanner: Scanner<'src>, env: &'a Environment, reporter: &'a mut R) -> Self {
        Parser {
            scanner,
            reporter: StateTrackingReporter {
                reporter,
                errored: false,
            },
            env,
            declared: vec![HashSet::new()],
        }
    }

    /// Parse a whole program. Errors are reported as they are found; after
    /// each one the parser synchronizes to the next statement boundary and
    /// keeps going, so one pass surfaces as many diagnostics as possible.
    pub fn parse(mut self) -> Result<Program, ParseError> {
        let mut decls = Vec::new();
        while !self.scanner.is_at_eof() {
            match self.declaration() {
                Ok(decl) => decls.push(decl),
                Err(InternalError {}) => self.synchronize(),
            }
        }
        if self.reporter.errored {
            Err(ParseError {})
        } else {
            Ok(Program(decls))
        }
    }

    // Panic mode recovery: discard tokens until a statement boundary, either
    // just past a ';' or just before a keyword that can begin a declaration
    fn synchronize(&mut self) {
        loop {
            match self.scanner.peek() {
                Ok(Token {
                    data: TokenType::Eof,
                    pos: _,
                }) => return,
                Ok(Token {
                    data: TokenType::Keyword(kw),
                    pos: _,
                }) if BOUNDARY_KEYWORDS.contains(&kw) => return,
                _ => {}
            }
            if let Ok(token) = self.scanner.next() {
                if token.data == Symbol::Semicolon {
                    return;
                }
            }
        }
    }

    fn declaration(&mut self) -> Result<Decl, InternalError> {
        let pos = self.peek_pos();
        if self.eat_keyword(Keyword::Var) {
            self.var_decl(pos, false)
        } else if self.eat_keyword(Keyword::Const) {
            self.var_decl(pos, true)
        } else if self.eat_keyword(Keyword::Fun) {
            self.fun_decl(pos)
        } else if self.eat_symbol(Symbol::LeftBrace) {
            Ok(Decl {
                pos,
                inner: DeclInner::Block(self.block()?),
            })
        } else {
            Ok(Decl {
                pos,
                inner: DeclInner::Stmt(self.statement()?),
            })
        }
    }

    fn var_decl(&mut self, pos: Pos, constant: bool) -> Result<Decl, InternalError> {
        let ident_pos = self.peek_pos();
        let name = self.expect_identifier("Expected variable name")?;
        if self.is_declared_here(&name) {
            self.reporter
                .report(ident_pos, &format!("Variable '{}' already declared", name));
            return Err(InternalError {});
        }
        let init = if self.eat_symbol(Symbol::Equal) {
            Some(self.expression()?)
        } else {
            if constant {
                self.reporter
                    .report(ident_pos, "Expected '=' after constant name");
                return Err(InternalError {});
            }
            None
        };
        self.expect_symbol(Symbol::Semicolon, "Expected ';' after variable declaration")?;
        self.declare(&name);
        Ok(Decl {
            pos,
            inner: DeclInner::Var {
                name,
                init,
                constant,
            },
        })
    }

    fn fun_decl(&mut self, pos: Pos) -> Result<Decl, InternalError> {
        let ident_pos = self.peek_pos();
        let name = self.expect_identifier("Expected function name")?;
        if self.is_declared_here(&name) {
            self.reporter
                .report(ident_pos, &format!("Function '{}' already declared", name));
            return Err(InternalError {});
        }
        self.expect_symbol(Symbol::LeftParen, "Expected '(' after function name")?;
        let mut parameters = Vec::new();
        if !self.peek_is_symbol(Symbol::RightParen) {
            loop {
                parameters.push(self.expect_identifier("Expected parameter name")?);
                if !self.eat_symbol(Symbol::Comma) {
                    break;
                }
            }
        }
        self.expect_symbol(Symbol::RightParen, "Expected ')' after parameters")?;
        // Declared before the body parses so the function can call itself
        self.declare(&name);
        self.expect_symbol(Symbol::LeftBrace, "Expected '{' before function body")?;
        self.declared.push(parameters.iter().cloned().collect());
        let body = self.block();
        self.declared.pop();
        Ok(Decl {
            pos,
            inner: DeclInner::Fun(FunDecl {
                name,
                parameters,
                body: body?,
            }),
        })
    }

    // Parses the declarations after the opening '{' has been consumed
    fn block(&mut self) -> Result<Block, InternalError> {
        self.declared.push(HashSet::new());
        let result = self.block_decls();
        self.declared.pop();
        result
    }

    fn block_decls(&mut self) -> Result<Block, InternalError> {
        let mut decls = Vec::new();
        while !self.scanner.is_at_eof() && !self.peek_is_symbol(Symbol::RightBrace) {
            decls.push(self.declaration()?);
        }
        self.expect_symbol(Symbol::RightBrace, "Expected '}' after block")?;
        Ok(Block(decls))
    }

    fn statement(&mut self) -> Result<Stmt, InternalError> {
        let pos = self.peek_pos();
        if self.eat_keyword(Keyword::Print) {
            self.print_stmt(pos)
        } else if self.eat_keyword(Keyword::If) {
            self.if_stmt(pos)
        } else if self.eat_keyword(Keyword::For) {
            self.for_stmt(pos)
        } else if self.eat_keyword(Keyword::Return) {
            self.return_stmt(pos)
        } else {
            self.expr_stmt(pos)
        }
    }

    fn print_stmt(&mut self, pos: Pos) -> Result<Stmt, InternalError> {
        self.expect_symbol(Symbol::LeftParen, "Expected '(' after print")?;
        let expr = self.expression()?;
        self.expect_symbol(Symbol::RightParen, "Expected ')' after print")?;
        self.expect_symbol(Symbol::Semicolon, "Expected ';' after print statement")?;
        Ok(Stmt {
            pos,
            inner: StmtInner::Print(expr),
        })
    }

    fn if_stmt(&mut self, pos: Pos) -> Result<Stmt, InternalError> {
        let branch = self.cond_branch()?;
        let mut elifs = Vec::new();
        while self.eat_keyword(Keyword::Elif) {
            elifs.push(self.cond_branch()?);
        }
        let or_else = if self.eat_keyword(Keyword::Else) {
            Some(self.body()?)
        } else {
            None
        };
        Ok(Stmt {
            pos,
            inner: StmtInner::If {
                branch,
                elifs,
                or_else,
            },
        })
    }

    fn cond_branch(&mut self) -> Result<CondBranch, InternalError> {
        self.expect_symbol(Symbol::LeftParen, "Expected '(' after condition keyword")?;
        let test = self.expression()?;
        self.expect_symbol(Symbol::RightParen, "Expected ')' after condition")?;
        let body = self.body()?;
        Ok(CondBranch { test, body })
    }

    // The body of a condition arm or loop, either a block or one bare statement
    fn body(&mut self) -> Result<Body, InternalError> {
        if self.eat_symbol(Symbol::LeftBrace) {
            Ok(Body::Block(self.block()?))
        } else {
            Ok(Body::Single(Box::new(self.statement()?)))
        }
    }

    fn for_stmt(&mut self, pos: Pos) -> Result<Stmt, InternalError> {
        self.expect_symbol(Symbol::LeftParen, "Expected '(' after for")?;
        let init = if self.eat_symbol(Symbol::Semicolon) {
            None
        } else {
            let init_pos = self.peek_pos();
            let decl = if self.eat_keyword(Keyword::Var) {
                self.var_decl(init_pos, false)?
            } else {
                Decl {
                    pos: init_pos,
                    inner: DeclInner::Stmt(self.expr_stmt(init_pos)?),
                }
            };
            Some(Box::new(decl))
        };
        let test = self.expression()?;
        self.expect_symbol(Symbol::Semicolon, "Expected ';' after loop condition")?;
        let step = if self.peek_is_symbol(Symbol::RightParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect_symbol(Symbol::RightParen, "Expected ')' after for clauses")?;
        let body = self.body()?;
        Ok(Stmt {
            pos,
            inner: StmtInner::For(Box::new(ForStmt {
                init,
                test,
                step,
                body,
            })),
        })
    }

    fn return_stmt(&mut self, pos: Pos) -> Result<Stmt, InternalError> {
        let expr = if self.peek_is_symbol(Symbol::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect_symbol(Symbol::Semicolon, "Expected ';' after return value")?;
        Ok(Stmt {
            pos,
            inner: StmtInner::Return(expr),
        })
    }

    fn expr_stmt(&mut self, pos: Pos) -> Result<Stmt, InternalError> {
        let expr = self.expression()?;
        self.expect_symbol(Symbol::Semicolon, "Expected ';' after expression")?;
        Ok(Stmt {
            pos,
            inner: StmtInner::Expr(expr),
        })
    }

    fn expression(&mut self) -> Result<Expr, InternalError> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr, InternalError> {
        // Two-token lookahead: an identifier directly followed by '=' is an
        // assignment target, anything else falls through to the operators
        let before = self.scanner.clone();
        let pos = self.peek_pos();
        if let Ok(Token {
            data: TokenType::Identifier(name),
            pos: ident_pos,
        }) = self.scanner.next()
        {
            if self.eat_symbol(Symbol::Equal) {
                let target = name.to_string();
                // The target must already be declared somewhere visible
                if !self.is_visible(&target) {
                    self.reporter
                        .report(ident_pos, &format!("Undefined variable '{}'", target));
                    return Err(InternalError {});
                }
                let expr = self.assignment()?;
                return Ok(Expr {
                    pos,
                    inner: ExprInner::Assignment {
                        target,
                        expr: Box::new(expr),
                    },
                });
            }
        }
        self.scanner = before;
        self.ternary()
    }

    fn ternary(&mut self) -> Result<Expr, InternalError> {
        let pos = self.peek_pos();
        let expr = self.coalesce()?;
        if self.eat_symbol(Symbol::Question) {
            let if_true = self.expression()?;
            self.expect_symbol(Symbol::Colon, "Expected ':' in ternary expression")?;
            let if_false = self.ternary()?;
            Ok(Expr {
                pos,
                inner: ExprInner::Ternary {
                    test: Box::new(expr),
                    if_true: Box::new(if_true),
                    if_false: Box::new(if_false),
                },
            })
        } else {
            Ok(expr)
        }
    }

    fn coalesce(&mut self) -> Result<Expr, InternalError> {
        self.logical_level(Symbol::QuestionQuestion, LogicalOp::Coalesce, Self::logic_or)
    }

    fn logic_or(&mut self) -> Result<Expr, InternalError> {
        self.logical_level(Symbol::OrOr, LogicalOp::Or, Self::logic_and)
    }

    fn logic_and(&mut self) -> Result<Expr, InternalError> {
        self.logical_level(Symbol::AndAnd, LogicalOp::And, Self::equality)
    }

    fn equality(&mut self) -> Result<Expr, InternalError> {
        self.left_assoc_level(&EQUALITY_SYMBOLS, Self::comparison)
    }

    fn comparison(&mut self) -> Result<Expr, InternalError> {
        self.left_assoc_level(&COMPARISON_SYMBOLS, Self::term)
    }

    fn term(&mut self) -> Result<Expr, InternalError> {
        self.left_assoc_level(&TERM_SYMBOLS, Self::factor)
    }

    fn factor(&mut self) -> Result<Expr, InternalError> {
        self.left_assoc_level(&FACTOR_SYMBOLS, Self::unary)
    }

    /// One left-associative binary level: a chain of `next_level` operands
    /// joined by this level's symbols, folded into a left-leaning tree.
    fn left_assoc_level<F>(&mut self, symbols: &[Symbol], next_level: F) -> Result<Expr, InternalError>
    where
        F: Fn(&mut Self) -> Result<Expr, InternalError>,
    {
        let pos = self.peek_pos();
        let mut lhs = next_level(self)?;
        while let Some(symbol) = self.eat_symbol_of(symbols) {
            let rhs = next_level(self)?;
            lhs = Expr {
                pos,
                inner: ExprInner::Binary {
                    left: Box::new(lhs),
                    op: binary_op_for(symbol),
                    right: Box::new(rhs),
                },
            };
        }
        Ok(lhs)
    }

    // Same fold as left_assoc_level, but each of the three short-circuit
    // levels has exactly one symbol and builds a Logical node
    fn logical_level<F>(
        &mut self,
        symbol: Symbol,
        op: LogicalOp,
        next_level: F,
    ) -> Result<Expr, InternalError>
    where
        F: Fn(&mut Self) -> Result<Expr, InternalError>,
    {
        let pos = self.peek_pos();
        let mut lhs = next_level(self)?;
        while self.eat_symbol(symbol) {
            let rhs = next_level(self)?;
            lhs = Expr {
                pos,
                inner: ExprInner::Logical {
                    left: Box::new(lhs),
                    op,
                    right: Box::new(rhs),
                },
            };
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, InternalError> {
        let pos = self.peek_pos();
        if let Some(symbol) = self.eat_symbol_of(&UNARY_SYMBOLS) {
            let operand = self.unary()?;
            Ok(Expr {
                pos,
                inner: ExprInner::Unary {
                    op: unary_op_for(symbol),
                    expr: Box::new(operand),
                },
            })
        } else {
            self.call()
        }
    }

    fn call(&mut self) -> Result<Expr, InternalError> {
        let pos = self.peek_pos();
        let mut expr = self.primary()?;
        while self.eat_symbol(Symbol::LeftParen) {
            let mut arguments = Vec::new();
            if !self.peek_is_symbol(Symbol::RightParen) {
                loop {
                    arguments.push(self.expression()?);
                    if !self.eat_symbol(Symbol::Comma) {
                        break;
                    }
                }
            }
            self.expect_symbol(Symbol::RightParen, "Expected ')' after arguments")?;
            expr = Expr {
                pos,
                inner: ExprInner::Call {
                    callee: Box::new(expr),
                    arguments,
                },
            };
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, InternalError> {
        match self.scanner.next() {
            Ok(token) => {
                let inner = match token.data {
                    TokenType::Keyword(Keyword::True) => ExprInner::Literal(Literal::Boolean(true)),
                    TokenType::Keyword(Keyword::False) => {
                        ExprInner::Literal(Literal::Boolean(false))
                    }
                    TokenType::Keyword(Keyword::Nil) => ExprInner::Literal(Literal::Nil),
                    TokenType::String(string) => {
                        ExprInner::Literal(Literal::String(string.to_string()))
                    }
                    TokenType::Number(number) => {
                        ExprInner::Literal(Literal::Number(OrderedFloat(number)))
                    }
                    TokenType::Identifier(name) => ExprInner::Variable {
                        name: name.to_string(),
                    },
                    TokenType::Symbol(Symbol::LeftParen) => {
                        let inner = self.expression()?;
                        self.expect_symbol(Symbol::RightParen, "Expected ')' after expression")?;
                        ExprInner::Group(Box::new(inner))
                    }
                    // An infix operator with nothing before it. Pin the
                    // diagnostic on the operator, then parse out the dangling
                    // right side so recovery lands somewhere sensible
                    TokenType::Symbol(symbol) if INFIX_SYMBOLS.contains(&symbol) => {
                        self.reporter
                            .report(token.pos, "binary operator without a left-hand side");
                        let _ = self.expression();
                        return Err(InternalError {});
                    }
                    _ => {
                        self.reporter.report(
                            token.pos,
                            "unexpected token: expected true, false, nil, number, string, identifier or (",
                        );
                        return Err(InternalError {});
                    }
                };
                Ok(Expr {
                    pos: token.pos,
                    inner,
                })
            }
            Err(scan_err) => {
                self.reporter.report(scan_err.pos, scan_err.error.message());
                Err(InternalError {})
            }
        }
    }

    // Name bookkeeping for the parse-time declaration checks

    fn declare(&mut self, name: &str) {
        // Unwrap is fine, the outermost set is never popped
        self.declared.last_mut().unwrap().insert(name.to_string());
    }

    fn is_declared_here(&self, name: &str) -> bool {
        self.declared.last().unwrap().contains(name)
            || (self.declared.len() == 1 && self.env.contains(name))
    }

    fn is_visible(&self, name: &str) -> bool {
        self.declared.iter().any(|scope| scope.contains(name)) || self.env.contains(name)
    }

    // Token-level helpers over the streaming scanner

    fn peek_pos(&self) -> Pos {
        match self.scanner.peek() {
            Ok(token) => token.pos,
            Err(err) => err.pos,
        }
    }

    fn peek_is_symbol(&self, symbol: Symbol) -> bool {
        matches!(self.scanner.peek(), Ok(token) if token.data == symbol)
    }

    fn eat_symbol(&mut self, symbol: Symbol) -> bool {
        self.scanner.next_if(|data| *data == symbol).is_some()
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        self.scanner.next_if(|data| *data == keyword).is_some()
    }

    fn eat_symbol_of(&mut self, set: &[Symbol]) -> Option<Symbol> {
        self.scanner.next_if_some(|token| match token.data {
            TokenType::Symbol(symbol) if set.contains(&symbol) => Some(symbol),
            _ => None,
        })
    }

    fn expect_identifier(&mut self, err_msg: &str) -> Result<String, InternalError> {
        let result = self.scanner.next_if_some(|token| match token.data {
            TokenType::Identifier(name) => Some(name.to_string()),
            _ => None,
        });
        match result {
            Some(name) => Ok(name),
            None => {
                let pos = self.peek_pos();
                self.reporter.report(pos, err_msg);
                Err(InternalError {})
            }
        }
    }

    fn expect_symbol(&mut self, symbol: Symbol, err_msg: &str) -> Result<(), InternalError> {
        match self.scanner.next() {
            Ok(token) => {
                if token.data == symbol {
                    Ok(())
                } else {
                    self.reporter.report(token.pos, err_msg);
                    Err(InternalError {})
                }
            }
            Err(scan_err) => {
                self.reporter.report(scan_err.pos, scan_err.error.message());
                Err(InternalError {})
            }
        }
    }
}

fn unary_op_for(symbol: Symbol) -> UnaryOp {
    match symbol {
        Symbol::Bang => UnaryOp::Not,
        Symbol::Minus => UnaryOp::Negative,
        s => panic!("not a unary operator symbol: {}", s),
    }
}

fn binary_op_for(symbol: Symbol) -> BinaryOp {
    match symbol {
        Symbol::EqualEqual => BinaryOp::Equal,
        Symbol::BangEqual => BinaryOp::NotEqual,
        Symbol::Less => BinaryOp::LessThan,
        Symbol::LessEqual => BinaryOp::LessThanEqual,
        Symbol::Greater => BinaryOp::GreaterThan,
        Symbol::GreaterEqual => BinaryOp::GreaterThanEqual,
        Symbol::Plus => BinaryOp::Add,
        Symbol::Minus => BinaryOp::Subtract,
        Symbol::Star => BinaryOp::Multiply,
        Symbol::Slash => BinaryOp::Divide,
        s => panic!("not a binary operator symbol: {}", s),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::reporter::NoopReporter;

    struct CountingReporter {
        count: usize,
        last: String,
    }

    impl Reporter for CountingReporter {
        fn report(&mut self, _pos: Pos, _phase: &str, msg: &str) {
            self.count += 1;
            self.last = msg.to_string();
        }
    }

    fn parse_source(code: &str) -> Result<Program, ParseError> {
        let env = Environment::new_global();
        let mut reporter = NoopReporter {};
        Parser::new(Scanner::new(code), &env, &mut reporter).parse()
    }

    fn parse_counting(code: &str) -> (Result<Program, ParseError>, usize, String) {
        let env = Environment::new_global();
        let mut reporter = CountingReporter {
            count: 0,
            last: String::new(),
        };
        let result = Parser::new(Scanner::new(code), &env, &mut reporter).parse();
        (result, reporter.count, reporter.last)
    }

    fn expr_display(code: &str) -> String {
        let program = parse_source(code).expect("expression should parse");
        match &program.0[0].inner {
            DeclInner::Stmt(Stmt {
                inner: StmtInner::Expr(expr),
                pos: _,
            }) => expr.to_string(),
            other => panic!("expected an expression statement, got {:?}", other),
        }
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        assert_eq!("(+ 1 (* 2 3))", expr_display("1 + 2 * 3;"));
    }

    #[test]
    fn grouping_overrides_precedence() {
        assert_eq!("(* (group (+ 1 2)) 3)", expr_display("(1 + 2) * 3;"));
    }

    #[test]
    fn subtraction_is_left_associative() {
        assert_eq!("(- (- 1 2) 3)", expr_display("1 - 2 - 3;"));
    }

    #[test]
    fn comparison_binds_tighter_than_equality() {
        assert_eq!("(== (< 1 2) true)", expr_display("1 < 2 == true;"));
    }

    #[test]
    fn logical_precedence_chain() {
        assert_eq!("(|| (&& 1 2) 3)", expr_display("1 && 2 || 3;"));
        assert_eq!("(?? (|| 1 2) 3)", expr_display("1 || 2 ?? 3;"));
    }

    #[test]
    fn coalesce_is_left_associative() {
        assert_eq!("(?? (?? nil 2) 3)", expr_display("nil ?? 2 ?? 3;"));
    }

    #[test]
    fn ternary_parses() {
        assert_eq!("(? 1 : 2 3)", expr_display("1 ? 2 : 3;"));
    }

    #[test]
    fn unary_nests_through_grouping() {
        assert_eq!("(- (group (- 5)))", expr_display("-(-5);"));
        assert_eq!("(! (! true))", expr_display("!!true;"));
    }

    #[test]
    fn call_with_arguments() {
        assert_eq!("(call (ident f) 1 2)", expr_display("f(1, 2);"));
        assert_eq!("(call (call (ident f)) 3)", expr_display("f()(3);"));
    }

    #[test]
    fn assignment_of_declared_variable() {
        let program = parse_source("var x = 1; x = 2;").unwrap();
        match &program.0[1].inner {
            DeclInner::Stmt(Stmt {
                inner: StmtInner::Expr(expr),
                pos: _,
            }) => assert_eq!("(= x 2)", expr.to_string()),
            other => panic!("expected an assignment statement, got {:?}", other),
        }
    }

    #[test]
    fn assignment_to_undeclared_variable_errors() {
        let (result, count, last) = parse_counting("x = 1;");
        assert!(result.is_err());
        assert_eq!(1, count);
        assert_eq!("Undefined variable 'x'", last);
    }

    #[test]
    fn double_declaration_in_one_scope_errors() {
        let (result, count, last) = parse_counting("var x = 1; var x = 2;");
        assert!(result.is_err());
        assert_eq!(1, count);
        assert_eq!("Variable 'x' already declared", last);
    }

    #[test]
    fn shadowing_in_an_inner_scope_is_allowed() {
        assert!(parse_source("var x = 1; { var x = 2; }").is_ok());
        assert!(parse_source("{ var x = 1; } { var x = 2; }").is_ok());
    }

    #[test]
    fn session_environment_seeds_the_checks() {
        let mut env = Environment::new_global();
        env.define("x", crate::interpreter::Value::Number(1f64), false);
        let mut reporter = NoopReporter {};
        // x came from an earlier line of the session, assigning to it is fine
        let parsed = Parser::new(Scanner::new("x = 2;"), &env, &mut reporter).parse();
        assert!(parsed.is_ok());
        // ...but re-declaring it is not
        let mut reporter = NoopReporter {};
        let parsed = Parser::new(Scanner::new("var x = 2;"), &env, &mut reporter).parse();
        assert!(parsed.is_err());
    }

    #[test]
    fn function_declaration_parses_and_allows_recursion() {
        assert!(parse_source("fun f(n) { return f(n - 1); }").is_ok());
    }

    #[test]
    fn function_parameters_are_visible_in_the_body() {
        assert!(parse_source("fun f(a, b) { a = a + b; return a; }").is_ok());
    }

    #[test]
    fn const_requires_an_initializer() {
        let (result, _, last) = parse_counting("const k;");
        assert!(result.is_err());
        assert_eq!("Expected '=' after constant name", last);
    }

    #[test]
    fn elif_chain_parses() {
        let parsed = parse_source(
            "var x = 2; if (x == 1) { x; } elif (x == 2) { x; } elif (x == 3) { x; } else { x; }",
        );
        let program = parsed.unwrap();
        match &program.0[1].inner {
            DeclInner::Stmt(Stmt {
                inner: StmtInner::If { elifs, or_else, .. },
                pos: _,
            }) => {
                assert_eq!(2, elifs.len());
                assert!(or_else.is_some());
            }
            other => panic!("expected an if statement, got {:?}", other),
        }
    }

    #[test]
    fn for_loop_clauses_parse() {
        let program = parse_source("for (var j = 0; j < 3; j = j + 1) { j; }").unwrap();
        match &program.0[0].inner {
            DeclInner::Stmt(Stmt {
                inner: StmtInner::For(for_stmt),
                pos: _,
            }) => {
                assert!(for_stmt.init.is_some());
                assert!(for_stmt.step.is_some());
                assert_eq!("(< (ident j) 3)", for_stmt.test.to_string());
            }
            other => panic!("expected a for statement, got {:?}", other),
        }
    }

    #[test]
    fn for_loop_with_empty_clauses_parses() {
        assert!(parse_source("var j = 0; for (; j < 1; ) { j = j + 1; }").is_ok());
    }

    #[test]
    fn recovery_reports_every_error() {
        // The first fault consumes up to its ';', recovery resumes at 'var'
        let (result, count, _) = parse_counting("1 +; var x = 1; 2 *;");
        assert!(result.is_err());
        assert_eq!(2, count);
    }

    #[test]
    fn recovery_still_parses_sound_declarations() {
        let (result, count, _) = parse_counting("1 +; var x = 1; x = 2;");
        assert!(result.is_err());
        assert_eq!(1, count);
    }

    #[test]
    fn binary_operator_without_lhs_is_reported() {
        let (result, _, last) = parse_counting("* 3;");
        assert!(result.is_err());
        assert_eq!("binary operator without a left-hand side", last);
    }

    #[test]
    fn missing_paren_is_reported() {
        let (result, _, last) = parse_counting("(1 + 2;");
        assert!(result.is_err());
        assert_eq!("Expected ')' after expression", last);
    }

    #[test]
    fn blocks_keep_their_nesting() {
        let program = parse_source("{ var a = 1; { var b = 2; } }").unwrap();
        match &program.0[0].inner {
            DeclInner::Block(Block(decls)) => {
                assert_eq!(2, decls.len());
                assert!(matches!(decls[1].inner, DeclInner::Block(_)));
            }
            other => panic!("expected a block, got {:?}", other),
        }
    }
}
