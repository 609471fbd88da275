//! Token types for the template lexer.
//!
//! Tokens carry only their kind and byte range; literal text is sliced out of
//! the source by the parser.

/// A template token kind.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TokenKind {
    /// A bare word: keyword, function name or unquoted template name.
    Word,
    /// A single- or double-quoted string literal (range includes the quotes).
    Str,
    /// An integer literal.
    Long,
    /// A floating-point literal.
    Double,
    /// `;`
    Semi,
    /// `=`
    Assign,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `,`
    Comma,
    /// `..`
    DotDot,
    /// `-`
    Minus,
    /// End of input.
    Eof,
}

/// A token paired with its byte range in the source.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Token {
    /// The token kind.
    pub kind: TokenKind,
    /// Byte offset of the first character.
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
}

impl Token {
    /// Returns the token's source text.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }
}

/// Human-readable description of a token kind for error messages.
pub fn describe(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::Word => "word",
        TokenKind::Str => "string",
        TokenKind::Long => "integer",
        TokenKind::Double => "number",
        TokenKind::Semi => "';'",
        TokenKind::Assign => "'='",
        TokenKind::LParen => "'('",
        TokenKind::RParen => "')'",
        TokenKind::Comma => "','",
        TokenKind::DotDot => "'..'",
        TokenKind::Minus => "'-'",
        TokenKind::Eof => "end of file",
    }
}
