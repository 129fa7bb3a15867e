//! Filter tokenizer.
//!
//! Splits a filter expression into literals, quoted strings, operator runs
//! and parentheses. Whitespace only terminates literals.

use crate::error::{HubError, Result};

pub const COLON: char = ':';
pub const COMMA: char = ',';
pub const AND: char = COMMA;
pub const OR: char = '|';
pub const EQ: char = '=';
pub const LIKE: char = '~';
pub const NOT: char = '!';
pub const LT: char = '<';
pub const GT: char = '>';
pub const QUOTE: char = '"';
pub const SQUOTE: char = '\'';
pub const ESCAPE: char = '\\';
pub const LPAREN: char = '(';
pub const RPAREN: char = ')';

/// Kind of a scanned token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Literal,
    String,
    Operator,
    LParen,
    RParen,
}

/// A scanned token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Self::new(TokenKind::Literal, value)
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::new(TokenKind::String, value)
    }

    pub fn operator(value: impl Into<String>) -> Self {
        Self::new(TokenKind::Operator, value)
    }

    /// True for literal and quoted-string tokens.
    pub fn is_atom(&self) -> bool {
        matches!(self.kind, TokenKind::Literal | TokenKind::String)
    }

    /// First character of an operator token.
    pub fn operator_char(&self) -> Option<char> {
        match self.kind {
            TokenKind::Operator => self.value.chars().next(),
            _ => None,
        }
    }
}

/// True when `ch` may appear in an operator run.
pub fn is_operator(ch: char) -> bool {
    matches!(ch, COLON | COMMA | OR | EQ | LIKE | NOT | LT | GT)
}

/// Token stream with one token of push-back.
#[derive(Debug, Default)]
pub struct Lexer {
    tokens: Vec<Token>,
    index: usize,
}

impl Lexer {
    /// Tokenize `filter`.
    pub fn new(filter: &str) -> Result<Self> {
        let mut reader = Reader::new(filter);
        let mut tokens = Vec::new();
        let mut literal = String::new();

        let flush = |literal: &mut String, tokens: &mut Vec<Token>| {
            if !literal.is_empty() {
                tokens.push(Token::literal(std::mem::take(literal)));
            }
        };

        while let Some(ch) = reader.next() {
            match ch {
                QUOTE | SQUOTE => {
                    flush(&mut literal, &mut tokens);
                    tokens.push(read_quoted(&mut reader, ch)?);
                }
                LPAREN => {
                    flush(&mut literal, &mut tokens);
                    tokens.push(Token::new(TokenKind::LParen, LPAREN.to_string()));
                }
                RPAREN => {
                    flush(&mut literal, &mut tokens);
                    tokens.push(Token::new(TokenKind::RParen, RPAREN.to_string()));
                }
                ch if ch.is_whitespace() => flush(&mut literal, &mut tokens),
                ch if is_operator(ch) => {
                    flush(&mut literal, &mut tokens);
                    reader.put();
                    tokens.push(read_operator(&mut reader)?);
                }
                ch => literal.push(ch),
            }
        }
        flush(&mut literal, &mut tokens);

        Ok(Self { tokens, index: 0 })
    }

    /// Next token, if any.
    pub fn next_token(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.index).cloned();
        if token.is_some() {
            self.index += 1;
        }
        token
    }

    /// Rewind by one token.
    pub fn put(&mut self) {
        self.index = self.index.saturating_sub(1);
    }

    /// All scanned tokens.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }
}

/// Character reader with one character of push-back.
struct Reader {
    input: Vec<char>,
    index: usize,
}

impl Reader {
    fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            index: 0,
        }
    }

    fn next(&mut self) -> Option<char> {
        let ch = self.input.get(self.index).copied();
        if ch.is_some() {
            self.index += 1;
        }
        ch
    }

    fn put(&mut self) {
        self.index = self.index.saturating_sub(1);
    }
}

/// Read a quoted string; the opening quote has been consumed.
fn read_quoted(reader: &mut Reader, quote: char) -> Result<Token> {
    let mut value = String::new();
    while let Some(ch) = reader.next() {
        if ch == quote {
            if value.ends_with(ESCAPE) {
                value.pop();
                value.push(ch);
                continue;
            }
            return Ok(Token::string(value));
        }
        value.push(ch);
    }
    Err(HubError::Lex {
        message: format!("End ({}) not found.", quote),
    })
}

/// Read a maximal run of operator characters.
fn read_operator(reader: &mut Reader) -> Result<Token> {
    let mut value = String::new();
    while let Some(ch) = reader.next() {
        if is_operator(ch) {
            value.push(ch);
            continue;
        }
        reader.put();
        return Ok(Token::operator(value));
    }
    Err(HubError::Lex {
        message: "End of operator not found.".to_string(),
    })
}
