//! Lexical analyzer for template source text.
//!
//! Converts source text into a sequence of [`Token`]s. Whitespace and `#`
//! line comments are skipped. Words run over `[A-Za-z0-9_.+-/]` so that
//! unquoted template names such as `site/os-base` lex as one token.

use std::path::Path;

use panc_source::SourceLocation;

use crate::error::SyntaxError;
use crate::token::{Token, TokenKind};

/// Lexes the given source text into a vector of tokens.
///
/// The returned vector always ends with a [`TokenKind::Eof`] token.
pub fn lex(source: &str, file: &Path) -> Result<Vec<Token>, SyntaxError> {
    let mut lexer = Lexer {
        source: source.as_bytes(),
        text: source,
        pos: 0,
        file,
    };
    lexer.lex_all()
}

struct Lexer<'a> {
    source: &'a [u8],
    text: &'a str,
    pos: usize,
    file: &'a Path,
}

impl<'a> Lexer<'a> {
    fn lex_all(&mut self) -> Result<Vec<Token>, SyntaxError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace_and_comments();
            if self.pos >= self.source.len() {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    start: self.pos,
                    end: self.pos,
                });
                return Ok(tokens);
            }
            tokens.push(self.next_token()?);
        }
    }

    fn peek(&self) -> u8 {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> u8 {
        self.source.get(self.pos + offset).copied().unwrap_or(0)
    }

    fn error(&self, offset: usize, message: impl Into<String>) -> SyntaxError {
        SyntaxError::Parse {
            location: SourceLocation::from_offset(self.file, self.text, offset),
            message: message.into(),
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        while self.pos < self.source.len() {
            let b = self.source[self.pos];
            if b.is_ascii_whitespace() {
                self.pos += 1;
            } else if b == b'#' {
                while self.pos < self.source.len() && self.source[self.pos] != b'\n' {
                    self.pos += 1;
                }
            } else {
                return;
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, SyntaxError> {
        let start = self.pos;
        let b = self.peek();
        let kind = match b {
            b';' => self.single(TokenKind::Semi),
            b'=' => self.single(TokenKind::Assign),
            b'(' => self.single(TokenKind::LParen),
            b')' => self.single(TokenKind::RParen),
            b',' => self.single(TokenKind::Comma),
            b'-' => self.single(TokenKind::Minus),
            b'.' if self.peek_at(1) == b'.' => {
                self.pos += 2;
                TokenKind::DotDot
            }
            b'\'' | b'"' => self.string(b)?,
            b'0'..=b'9' => self.number(),
            b if b.is_ascii_alphabetic() || b == b'_' => self.word(),
            _ => {
                let ch = self.text[start..].chars().next().unwrap_or('?');
                return Err(self.error(start, format!("unexpected character '{ch}'")));
            }
        };
        Ok(Token {
            kind,
            start,
            end: self.pos,
        })
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.pos += 1;
        kind
    }

    fn string(&mut self, quote: u8) -> Result<TokenKind, SyntaxError> {
        let start = self.pos;
        self.pos += 1;
        while self.pos < self.source.len() {
            let b = self.source[self.pos];
            if b == b'\\' && quote == b'"' {
                self.pos += 2;
                continue;
            }
            self.pos += 1;
            if b == quote {
                return Ok(TokenKind::Str);
            }
        }
        Err(self.error(start, "unterminated string literal"))
    }

    fn number(&mut self) -> TokenKind {
        while self.peek().is_ascii_digit() {
            self.pos += 1;
        }
        if self.peek() == b'.' && self.peek_at(1).is_ascii_digit() {
            self.pos += 1;
            while self.peek().is_ascii_digit() {
                self.pos += 1;
            }
            if matches!(self.peek(), b'e' | b'E') {
                self.pos += 1;
                if matches!(self.peek(), b'+' | b'-') {
                    self.pos += 1;
                }
                while self.peek().is_ascii_digit() {
                    self.pos += 1;
                }
            }
            return TokenKind::Double;
        }
        TokenKind::Long
    }

    fn word(&mut self) -> TokenKind {
        while self.pos < self.source.len() && is_word_byte(self.source[self.pos]) {
            // `..` never belongs to a word, so `a..b` stays three tokens.
            if self.source[self.pos] == b'.' && self.peek_at(1) == b'.' {
                break;
            }
            self.pos += 1;
        }
        TokenKind::Word
    }
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'+' | b'-' | b'/')
}

/// Decodes the contents of a string token, removing the quotes.
///
/// Single-quoted strings are taken literally. Double-quoted strings support
/// the escapes `\n`, `\t`, `\\` and `\"`.
pub fn unquote(text: &str) -> String {
    let quote = text.as_bytes().first().copied().unwrap_or(b'\'');
    let inner = &text[1..text.len().saturating_sub(1).max(1)];
    if quote == b'\'' {
        return inner.to_string();
    }
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
