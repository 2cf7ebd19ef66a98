//! Literal codec for generated navigation scripts.
//!
//! Only the subset of JavaScript the documentation generator emits is
//! understood: top-level `var NAME = <literal>;` declarations whose values are
//! nested arrays, objects, strings, non-negative integers, booleans and `null`.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use thiserror::Error;

/// Nesting limit for arrays and objects.
const MAX_DEPTH: usize = 256;

/// A parsed literal value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Null,
    Bool(bool),
    Number(u64),
    Str(String),
    Array(Vec<Literal>),
    /// Keys keep their first insertion position; a repeated key overwrites the value.
    Object(Vec<(String, Literal)>),
}

impl Literal {
    /// Short type name used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Literal::Null => "null",
            Literal::Bool(_) => "boolean",
            Literal::Number(_) => "number",
            Literal::Str(_) => "string",
            Literal::Array(_) => "array",
            Literal::Object(_) => "object",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Literal]> {
        match self {
            Literal::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&[(String, Literal)]> {
        match self {
            Literal::Object(members) => Some(members),
            _ => None,
        }
    }
}

/// 1-based line and column of a character in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptErrorKind {
    #[error("unexpected character {0:?}")]
    UnexpectedChar(char),

    #[error("unterminated string")]
    UnterminatedString,

    #[error("line terminator in string")]
    LineTerminatorInString,

    #[error("unterminated comment")]
    UnterminatedComment,

    #[error("invalid escape sequence")]
    InvalidEscape,

    #[error("number out of range")]
    NumberOutOfRange,

    #[error("nesting deeper than 256 levels")]
    TooDeep,

    #[error("expected {expected}, found {found}")]
    Expected {
        expected: &'static str,
        found: String,
    },
}

/// Lexing or parsing failure with the position it occurred at.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} at {position}")]
pub struct ScriptError {
    pub kind: ScriptErrorKind,
    pub position: Position,
}

impl ScriptError {
    fn new(kind: ScriptErrorKind, position: Position) -> Self {
        Self { kind, position }
    }
}

type ScriptResult<T> = Result<T, ScriptError>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Str(String),
    Number(u64),
    Punct(char),
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(name) => write!(f, "identifier `{name}`"),
            Token::Str(_) => write!(f, "string"),
            Token::Number(n) => write!(f, "number {n}"),
            Token::Punct(c) => write!(f, "`{c}`"),
            Token::Eof => write!(f, "end of input"),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            chars: src.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn position(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_trivia(&mut self) -> ScriptResult<()> {
        loop {
            match self.chars.peek() {
                Some(c) if c.is_whitespace() || *c == '\u{feff}' => {
                    self.bump();
                }
                Some('/') => {
                    let start = self.position();
                    let mut ahead = self.chars.clone();
                    ahead.next();
                    match ahead.peek() {
                        Some('/') => {
                            while let Some(c) = self.bump() {
                                if c == '\n' {
                                    break;
                                }
                            }
                        }
                        Some('*') => {
                            self.bump();
                            self.bump();
                            let mut prev = '\0';
                            loop {
                                match self.bump() {
                                    Some('/') if prev == '*' => break,
                                    Some(c) => prev = c,
                                    None => {
                                        return Err(ScriptError::new(
                                            ScriptErrorKind::UnterminatedComment,
                                            start,
                                        ))
                                    }
                                }
                            }
                        }
                        _ => return Ok(()),
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn next_token(&mut self) -> ScriptResult<(Token, Position)> {
        self.skip_trivia()?;
        let start = self.position();
        let Some(&c) = self.chars.peek() else {
            return Ok((Token::Eof, start));
        };
        let token = match c {
            '=' | ';' | ',' | ':' | '[' | ']' | '{' | '}' => {
                self.bump();
                Token::Punct(c)
            }
            '"' | '\'' => Token::Str(self.string(start)?),
            '0'..='9' => Token::Number(self.number(start)?),
            c if is_ident_start(c) => Token::Ident(self.ident()),
            other => {
                return Err(ScriptError::new(
                    ScriptErrorKind::UnexpectedChar(other),
                    start,
                ))
            }
        };
        Ok((token, start))
    }

    fn ident(&mut self) -> String {
        let mut out = String::new();
        while let Some(&c) = self.chars.peek() {
            if !is_ident_continue(c) {
                break;
            }
            out.push(c);
            self.bump();
        }
        out
    }

    fn number(&mut self, start: Position) -> ScriptResult<u64> {
        let mut value: u64 = 0;
        while let Some(d) = self.chars.peek().and_then(|c| c.to_digit(10)) {
            self.bump();
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(u64::from(d)))
                .ok_or_else(|| ScriptError::new(ScriptErrorKind::NumberOutOfRange, start))?;
        }
        Ok(value)
    }

    fn string(&mut self, start: Position) -> ScriptResult<String> {
        let quote = self.bump();
        let mut out = String::new();
        loop {
            let pos = self.position();
            match self.bump() {
                None => {
                    return Err(ScriptError::new(
                        ScriptErrorKind::UnterminatedString,
                        start,
                    ))
                }
                Some(c) if Some(c) == quote => return Ok(out),
                Some('\n') | Some('\r') => {
                    return Err(ScriptError::new(
                        ScriptErrorKind::LineTerminatorInString,
                        pos,
                    ))
                }
                Some('\\') => out.push(self.escape(pos)?),
                Some(c) => out.push(c),
            }
        }
    }

    fn escape(&mut self, pos: Position) -> ScriptResult<char> {
        let invalid = || ScriptError::new(ScriptErrorKind::InvalidEscape, pos);
        let c = self.bump().ok_or_else(invalid)?;
        let decoded = match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'v' => '\u{b}',
            '0' => '\0',
            '\\' | '"' | '\'' | '/' => c,
            'u' => {
                let high = self.hex4().ok_or_else(invalid)?;
                if (0xD800..0xDC00).contains(&high) {
                    if self.bump() != Some('\\') || self.bump() != Some('u') {
                        return Err(invalid());
                    }
                    let low = self.hex4().ok_or_else(invalid)?;
                    if !(0xDC00..0xE000).contains(&low) {
                        return Err(invalid());
                    }
                    let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                    char::from_u32(code).ok_or_else(invalid)?
                } else {
                    char::from_u32(high).ok_or_else(invalid)?
                }
            }
            _ => return Err(invalid()),
        };
        Ok(decoded)
    }

    fn hex4(&mut self) -> Option<u32> {
        let mut code = 0u32;
        for _ in 0..4 {
            code = code * 16 + self.bump()?.to_digit(16)?;
        }
        Some(code)
    }
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    position: Position,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> ScriptResult<Self> {
        let mut lexer = Lexer::new(src);
        let (current, position) = lexer.next_token()?;
        Ok(Self {
            lexer,
            current,
            position,
        })
    }

    fn advance(&mut self) -> ScriptResult<Token> {
        let (next, position) = self.lexer.next_token()?;
        self.position = position;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn unexpected(&self, expected: &'static str) -> ScriptError {
        ScriptError::new(
            ScriptErrorKind::Expected {
                expected,
                found: self.current.to_string(),
            },
            self.position,
        )
    }

    fn expect_punct(&mut self, c: char, expected: &'static str) -> ScriptResult<()> {
        if self.current == Token::Punct(c) {
            self.advance()?;
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn eat_punct(&mut self, c: char) -> ScriptResult<bool> {
        if self.current == Token::Punct(c) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn script(&mut self) -> ScriptResult<Script> {
        let mut declarations = Vec::new();
        loop {
            match &self.current {
                Token::Eof => break,
                Token::Punct(';') => {
                    self.advance()?;
                }
                Token::Ident(kw) if matches!(kw.as_str(), "var" | "let" | "const") => {
                    self.advance()?;
                    let name = match &self.current {
                        Token::Ident(name) => name.clone(),
                        _ => return Err(self.unexpected("declaration name")),
                    };
                    self.advance()?;
                    self.expect_punct('=', "`=`")?;
                    let value = self.literal(0)?;
                    self.eat_punct(';')?;
                    declarations.push(Declaration { name, value });
                }
                _ => return Err(self.unexpected("`var` declaration")),
            }
        }
        Ok(Script { declarations })
    }

    fn literal(&mut self, depth: usize) -> ScriptResult<Literal> {
        if depth > MAX_DEPTH {
            return Err(ScriptError::new(ScriptErrorKind::TooDeep, self.position));
        }
        match &self.current {
            Token::Punct('[') => {
                self.advance()?;
                let mut items = Vec::new();
                while !self.eat_punct(']')? {
                    items.push(self.literal(depth + 1)?);
                    if !self.eat_punct(',')? {
                        self.expect_punct(']', "`,` or `]`")?;
                        break;
                    }
                }
                Ok(Literal::Array(items))
            }
            Token::Punct('{') => {
                self.advance()?;
                let mut members: Vec<(String, Literal)> = Vec::new();
                while !self.eat_punct('}')? {
                    let key = match &self.current {
                        Token::Str(s) | Token::Ident(s) => s.clone(),
                        Token::Number(n) => n.to_string(),
                        _ => return Err(self.unexpected("object key")),
                    };
                    self.advance()?;
                    self.expect_punct(':', "`:`")?;
                    let value = self.literal(depth + 1)?;
                    match members.iter_mut().find(|(k, _)| *k == key) {
                        Some(slot) => slot.1 = value,
                        None => members.push((key, value)),
                    }
                    if !self.eat_punct(',')? {
                        self.expect_punct('}', "`,` or `}`")?;
                        break;
                    }
                }
                Ok(Literal::Object(members))
            }
            Token::Str(_) | Token::Number(_) => match self.advance()? {
                Token::Str(s) => Ok(Literal::Str(s)),
                Token::Number(n) => Ok(Literal::Number(n)),
                _ => unreachable!("matched string or number token"),
            },
            Token::Ident(word) => {
                let literal = match word.as_str() {
                    "null" => Literal::Null,
                    "true" => Literal::Bool(true),
                    "false" => Literal::Bool(false),
                    _ => return Err(self.unexpected("literal value")),
                };
                self.advance()?;
                Ok(literal)
            }
            _ => Err(self.unexpected("literal value")),
        }
    }
}

/// A single `var NAME = value;` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub value: Literal,
}

/// All top-level declarations of a script, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Script {
    declarations: Vec<Declaration>,
}

impl Script {
    pub fn parse(src: &str) -> Result<Self, ScriptError> {
        Parser::new(src)?.script()
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    /// Value of the named declaration. A redeclared name resolves to its last value.
    pub fn get(&self, name: &str) -> Option<&Literal> {
        self.declarations
            .iter()
            .rev()
            .find(|d| d.name == name)
            .map(|d| &d.value)
    }
}
