//! Tokenizer for job files.
//!
//! [`Tokenizer`] is a character-driven state machine that yields [`Token`]s
//! left to right. The sequence ends with exactly one [`TokenKind::Eof`] or
//! [`TokenKind::Error`] token and cannot be restarted. [`TokenStream`] moves
//! a tokenizer onto its own worker thread and hands tokens over through a
//! bounded queue.
use std::fmt;

mod stream;
pub use stream::{DEFAULT_QUEUE_CAPACITY, TokenStream};

mod tokenizer;
pub use tokenizer::Tokenizer;

/// Token category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Clean end of input.
    Eof,
    /// Invalid input; the value holds the message.
    Error,
    Comment,
    Provider,
    ResourceTitle,
    PropertyName,
    ScalarValue,
    ArrayValue,
    MapName,
    MapValue,
    OpenBrace,
    CloseBrace,
    OpenBracket,
    CloseBracket,
}

impl TokenKind {
    /// Returns `true` for the two kinds that close a stream.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, TokenKind::Eof | TokenKind::Error)
    }
}

/// A lexical token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
}

impl Token {
    /// Create a token with the given kind and value.
    pub fn new(kind: TokenKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    pub(crate) fn bare(kind: TokenKind) -> Self {
        Self {
            kind,
            value: String::new(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.value.is_empty() {
            write!(f, "{:?}", self.kind)
        } else {
            write!(f, "{:?}({})", self.kind, self.value)
        }
    }
}
