use std::fmt::{self, Display, Formatter};
use thiserror::Error;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Pos {
    pub offset_in_line: usize,
    pub line: usize,
}

impl Display for Pos {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.offset_in_line)
    }
}

#[derive(Clone, Error, Debug, PartialEq, Eq)]
#[error("scan error: {error:?} {pos}")]
pub struct Error {
    pub error: ErrorType,
    pub pos: Pos,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorType {
    UnterminatedString,
    UnrecognizedToken,
}

impl ErrorType {
    pub fn message(&self) -> &'static str {
        match self {
            Self::UnterminatedString => "unterminated string",
            Self::UnrecognizedToken => "unrecognized token",
        }
    }
}

/// One token of input, tagged with where it began. An `Eof` token is emitted
/// at the end of input so every consumer sees a position, even past the last
/// real character.
#[derive(Debug, PartialEq, Clone)]
pub struct Token<'code> {
    pub data: TokenType<'code>,
    pub pos: Pos,
}

#[derive(Debug, PartialEq, Clone)]
pub enum TokenType<'code> {
    Symbol(Symbol),
    Keyword(Keyword),
    Identifier(&'code str),
    String(&'code str),
    Number(f64),
    Eof,
}

impl<'code> PartialEq<Symbol> for TokenType<'code> {
    fn eq(&self, other: &Symbol) -> bool {
        matches!(self, TokenType::Symbol(sym) if sym == other)
    }
}

impl<'code> PartialEq<Keyword> for TokenType<'code> {
    fn eq(&self, other: &Keyword) -> bool {
        matches!(self, TokenType::Keyword(key) if key == other)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Symbol {
    // Stand-alone punctuation
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Comma,
    Minus,
    Plus,
    Semicolon,
    Slash,
    Star,
    Colon,

    // Operators that may pair with a second character
    Question,
    QuestionQuestion,
    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    AndAnd,
    OrOr,
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Keyword {
    Class,
    Const,
    Elif,
    Else,
    False,
    Fun,
    For,
    If,
    Nil,
    Print,
    Return,
    True,
    Var,
    While,
}

fn keyword(text: &str) -> Option<Keyword> {
    let kw = match text {
        "class" => Keyword::Class,
        "const" => Keyword::Const,
        "elif" => Keyword::Elif,
        "else" => Keyword::Else,
        "false" => Keyword::False,
        "fun" => Keyword::Fun,
        "for" => Keyword::For,
        "if" => Keyword::If,
        "nil" => Keyword::Nil,
        "print" => Keyword::Print,
        "return" => Keyword::Return,
        "true" => Keyword::True,
        "var" => Keyword::Var,
        "while" => Keyword::While,
        _ => return None,
    };
    Some(kw)
}

impl Display for Keyword {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A streaming tokenizer over a source string. Works byte by byte; the source
/// is utf-8 but every byte the grammar cares about is ascii, so multi-byte
/// characters only ever appear inside string literals, where they pass
/// through untouched.
#[derive(Clone)]
pub struct Scanner<'code> {
    code: &'code [u8],
    /// Index of the next unread byte.
    offset: usize,
    /// Line number of the byte at `offset`, and the index where that line
    /// begins. Column positions fall out of the difference, so individual
    /// token paths never track widths themselves.
    line: usize,
    line_start: usize,
}

impl<'lex> Scanner<'lex> {
    pub fn new(code: &'lex str) -> Scanner<'lex> {
        Scanner {
            code: code.as_bytes(),
            offset: 0,
            line: 0,
            line_start: 0,
        }
    }

    /// Whether the next token returned would be `Eof`. Trailing whitespace and
    /// comments don't count as input, hence the peek rather than a length test.
    pub fn is_at_eof(&self) -> bool {
        matches!(
            self.peek(),
            Ok(Token {
                data: TokenType::Eof,
                ..
            })
        )
    }

    /// Read the next token without consuming it.
    pub fn peek(&self) -> Result<Token<'lex>, Error> {
        self.clone().next()
    }

    /// Consume the next token only when the predicate accepts it; otherwise
    /// the scanner is left exactly where it was. Scan errors never match.
    pub fn next_if<P>(&mut self, predicate: P) -> Option<Token<'lex>>
    where
        P: FnOnce(&TokenType<'lex>) -> bool,
    {
        self.next_if_some(|token| {
            if predicate(&token.data) {
                Some(token.clone())
            } else {
                None
            }
        })
    }

    /// Consume the next token only when `filter_map` produces a value from
    /// it, and yield that value. The conditional-consume primitive the parser
    /// builds its one-token lookahead on.
    pub fn next_if_some<F, A>(&mut self, filter_map: F) -> Option<A>
    where
        F: FnOnce(&Token<'lex>) -> Option<A>,
    {
        let checkpoint = self.clone();
        if let Ok(token) = self.next() {
            if let Some(result) = filter_map(&token) {
                return Some(result);
            }
        }
        *self = checkpoint;
        None
    }

    pub fn next(&mut self) -> Result<Token<'lex>, Error> {
        self.skip_trivia();
        let pos = self.current_pos();
        let start = self.offset;
        let Some(ch) = self.bump() else {
            return Ok(Token {
                data: TokenType::Eof,
                pos,
            });
        };
        let data = match ch {
            b'(' => TokenType::Symbol(Symbol::LeftParen),
            b')' => TokenType::Symbol(Symbol::RightParen),
            b'{' => TokenType::Symbol(Symbol::LeftBrace),
            b'}' => TokenType::Symbol(Symbol::RightBrace),
            b',' => TokenType::Symbol(Symbol::Comma),
            b';' => TokenType::Symbol(Symbol::Semicolon),
            b':' => TokenType::Symbol(Symbol::Colon),
            b'+' => TokenType::Symbol(Symbol::Plus),
            b'-' => TokenType::Symbol(Symbol::Minus),
            b'*' => TokenType::Symbol(Symbol::Star),
            // Comments were consumed as trivia, so a '/' is always division
            b'/' => TokenType::Symbol(Symbol::Slash),
            b'?' => TokenType::Symbol(if self.eat(b'?') {
                Symbol::QuestionQuestion
            } else {
                Symbol::Question
            }),
            b'!' => TokenType::Symbol(if self.eat(b'=') {
                Symbol::BangEqual
            } else {
                Symbol::Bang
            }),
            b'=' => TokenType::Symbol(if self.eat(b'=') {
                Symbol::EqualEqual
            } else {
                Symbol::Equal
            }),
            b'<' => TokenType::Symbol(if self.eat(b'=') {
                Symbol::LessEqual
            } else {
                Symbol::Less
            }),
            b'>' => TokenType::Symbol(if self.eat(b'=') {
                Symbol::GreaterEqual
            } else {
                Symbol::Greater
            }),
            // '&' and '|' exist only doubled; a single one is not a token
            b'&' if self.eat(b'&') => TokenType::Symbol(Symbol::AndAnd),
            b'|' if self.eat(b'|') => TokenType::Symbol(Symbol::OrOr),
            b'"' => return self.string_literal(start, pos),
            b'0'..=b'9' => return Ok(self.number(start, pos)),
            ch if ch.is_ascii_alphabetic() || ch == b'_' => return Ok(self.word(start, pos)),
            _ => {
                return Err(Error {
                    error: ErrorType::UnrecognizedToken,
                    pos,
                })
            }
        };
        Ok(Token { data, pos })
    }

    pub fn current_pos(&self) -> Pos {
        Pos {
            line: self.line,
            offset_in_line: self.offset - self.line_start,
        }
    }

    /// Discard whitespace and `//` comments. All newline accounting happens
    /// in `bump`, so multi-line runs of either need no special handling.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek_byte() {
                Some(b' ' | b'\t' | b'\r' | b'\n') => {
                    self.bump();
                }
                Some(b'/') if self.code.get(self.offset + 1) == Some(&b'/') => {
                    // Leave the newline for the whitespace arm
                    self.eat_while(|b| b != b'\n');
                }
                _ => return,
            }
        }
    }

    fn string_literal(&mut self, start: usize, pos: Pos) -> Result<Token<'lex>, Error> {
        // Strings run to the closing quote, across newlines if need be
        loop {
            match self.bump() {
                Some(b'"') => {
                    // The delimiters are not part of the value
                    let content = self.text(start + 1, self.offset - 1);
                    return Ok(Token {
                        data: TokenType::String(content),
                        pos,
                    });
                }
                Some(_) => {}
                None => {
                    return Err(Error {
                        error: ErrorType::UnterminatedString,
                        pos,
                    })
                }
            }
        }
    }

    fn number(&mut self, start: usize, pos: Pos) -> Token<'lex> {
        self.eat_while(|b| b.is_ascii_digit());
        // A '.' belongs to the number only when a digit follows it
        if self.peek_byte() == Some(b'.')
            && self
                .code
                .get(self.offset + 1)
                .is_some_and(|b| b.is_ascii_digit())
        {
            self.bump();
            self.eat_while(|b| b.is_ascii_digit());
        }
        // The scanned bytes are digits and at most one dot, a valid f64
        let number = self.text(start, self.offset).parse::<f64>().unwrap();
        Token {
            data: TokenType::Number(number),
            pos,
        }
    }

    fn word(&mut self, start: usize, pos: Pos) -> Token<'lex> {
        self.eat_while(|b| b.is_ascii_alphanumeric() || b == b'_');
        let text = self.text(start, self.offset);
        let data = match keyword(text) {
            Some(kw) => TokenType::Keyword(kw),
            None => TokenType::Identifier(text),
        };
        Token { data, pos }
    }

    fn peek_byte(&self) -> Option<u8> {
        self.code.get(self.offset).copied()
    }

    /// Advance one byte. This is the only place `offset` moves forward, which
    /// keeps the line bookkeeping in one spot.
    fn bump(&mut self) -> Option<u8> {
        let ch = self.peek_byte()?;
        self.offset += 1;
        if ch == b'\n' {
            self.line += 1;
            self.line_start = self.offset;
        }
        Some(ch)
    }

    fn eat(&mut self, expected: u8) -> bool {
        if self.peek_byte() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn eat_while(&mut self, pred: impl Fn(u8) -> bool) {
        while self.peek_byte().is_some_and(|b| pred(b)) {
            self.bump();
        }
    }

    fn text(&self, start: usize, end: usize) -> &'lex str {
        let code = self.code;
        // Token boundaries always land on ascii bytes, so the slice is valid utf-8
        std::str::from_utf8(&code[start..end]).expect("source was not valid utf-8")
    }
}
