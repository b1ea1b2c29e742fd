use std::iter::FusedIterator;

use crate::lexer::{Token, TokenKind};

const LINE_BREAK: [char; 2] = ['\r', '\n'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Block,
    Comment,
    Provider,
    ResourceTitle,
    ResourceBlock,
    PropertyName,
    PropertyValue,
    PropertyArray,
    PropertyMap,
    MapValue,
    Done,
}

#[inline]
fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

#[inline]
fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t')
}

#[inline]
fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// State machine over one job file.
///
/// Every call to [`Iterator::next`] runs the machine until it emits one token.
/// After an `Eof` or `Error` token the tokenizer yields `None` forever.
#[derive(Debug)]
pub struct Tokenizer {
    input: String,
    /// Byte offset of the next unread character.
    pos: usize,
    /// Byte width of the last character read, for a single `unread`.
    width: usize,
    buf: String,
    state: State,
}

impl Tokenizer {
    /// Create a tokenizer over the given text.
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            pos: 0,
            width: 0,
            buf: String::new(),
            state: State::Block,
        }
    }

    /// Byte offset of the next unread character.
    #[inline]
    pub fn offset(&self) -> usize {
        self.pos
    }

    fn next_char(&mut self) -> Option<char> {
        match self.input[self.pos..].chars().next() {
            Some(c) => {
                self.width = c.len_utf8();
                self.pos += self.width;
                Some(c)
            }
            None => {
                self.width = 0;
                None
            }
        }
    }

    fn unread(&mut self) {
        self.pos -= self.width;
        self.width = 0;
    }

    fn emit(&mut self, kind: TokenKind) -> Token {
        Token::new(kind, std::mem::take(&mut self.buf))
    }

    fn invalid(&mut self, c: char, expecting: &str) -> Token {
        self.state = State::Done;
        let offset = self.pos - c.len_utf8();
        Token::new(
            TokenKind::Error,
            format!("invalid character when expecting {expecting} [pos: {offset}, char: {c:?}]"),
        )
    }

    fn end_of_input(&mut self, reading: &str) -> Token {
        self.state = State::Done;
        if self.buf.is_empty() {
            return Token::bare(TokenKind::Eof);
        }
        let partial = std::mem::take(&mut self.buf);
        Token::new(
            TokenKind::Error,
            format!(
                "unexpected end of input while reading {reading} {partial:?} [pos: {}]",
                self.pos
            ),
        )
    }

    /// Reads up to a line break or one of `stop`, leaving the terminator unread.
    fn read_line(&mut self, stop: &[char]) -> String {
        let mut line = String::new();
        while let Some(c) = self.next_char() {
            if LINE_BREAK.contains(&c) || stop.contains(&c) {
                self.unread();
                break;
            }
            line.push(c);
        }
        let kept = line.trim_end_matches(is_blank).len();
        line.truncate(kept);
        line
    }

    fn lex_block(&mut self) -> Option<Token> {
        match self.next_char() {
            None => Some(self.end_of_input("block")),
            Some(c) if is_whitespace(c) => None,
            Some('/') => {
                self.unread();
                self.state = State::Comment;
                None
            }
            Some(c) if is_name_char(c) => {
                self.unread();
                self.state = State::Provider;
                None
            }
            Some(c) => Some(self.invalid(c, "provider or comment")),
        }
    }

    fn lex_comment(&mut self) -> Option<Token> {
        let text = self.read_line(&[]);
        self.state = State::Block;
        Some(Token::new(TokenKind::Comment, text))
    }

    fn lex_provider(&mut self) -> Option<Token> {
        match self.next_char() {
            None => Some(self.end_of_input("provider name")),
            Some(c) if is_name_char(c) => {
                self.buf.push(c);
                None
            }
            Some(c) if is_whitespace(c) => {
                self.state = State::ResourceTitle;
                Some(self.emit(TokenKind::Provider))
            }
            Some(c) => Some(self.invalid(c, "provider name")),
        }
    }

    fn lex_resource_title(&mut self) -> Option<Token> {
        match self.next_char() {
            None => Some(self.end_of_input("resource title")),
            Some(c) if is_name_char(c) => {
                self.buf.push(c);
                None
            }
            Some(c) if is_whitespace(c) && self.buf.is_empty() => None,
            Some(c) if is_whitespace(c) => {
                self.state = State::ResourceBlock;
                Some(self.emit(TokenKind::ResourceTitle))
            }
            Some(c) => Some(self.invalid(c, "resource title")),
        }
    }

    fn lex_resource_block(&mut self) -> Option<Token> {
        match self.next_char() {
            None => Some(self.end_of_input("resource block")),
            Some(c) if is_whitespace(c) => None,
            Some('{') => {
                self.state = State::PropertyName;
                Some(Token::bare(TokenKind::OpenBrace))
            }
            Some(c) => Some(self.invalid(c, "'{'")),
        }
    }

    fn lex_property_name(&mut self) -> Option<Token> {
        match self.next_char() {
            None => Some(self.end_of_input("property name")),
            Some(c) if is_whitespace(c) => None,
            Some(c) if is_name_char(c) => {
                self.buf.push(c);
                None
            }
            Some(':') if !self.buf.is_empty() => {
                self.state = State::PropertyValue;
                Some(self.emit(TokenKind::PropertyName))
            }
            Some('}') if self.buf.is_empty() => {
                self.state = State::Block;
                Some(Token::bare(TokenKind::CloseBrace))
            }
            Some(c) => Some(self.invalid(c, "property name")),
        }
    }

    fn lex_property_value(&mut self) -> Option<Token> {
        match self.next_char() {
            None => Some(self.end_of_input("property value")),
            Some(c) if is_blank(c) => None,
            Some('[') => {
                while let Some(c) = self.next_char() {
                    if !is_whitespace(c) {
                        self.unread();
                        break;
                    }
                }
                self.state = State::PropertyArray;
                Some(Token::bare(TokenKind::OpenBracket))
            }
            Some('{') => {
                self.state = State::PropertyMap;
                Some(Token::bare(TokenKind::OpenBrace))
            }
            Some(_) => {
                self.unread();
                let value = self.read_line(&[]);
                self.state = State::PropertyName;
                Some(Token::new(TokenKind::ScalarValue, value))
            }
        }
    }

    fn lex_property_array(&mut self) -> Option<Token> {
        match self.next_char() {
            None => Some(self.end_of_input("array")),
            Some(c) if is_whitespace(c) => None,
            Some(']') => {
                self.state = State::PropertyName;
                Some(Token::bare(TokenKind::CloseBracket))
            }
            Some(_) => {
                self.unread();
                let item = self.read_line(&[']']);
                Some(Token::new(TokenKind::ArrayValue, item))
            }
        }
    }

    fn lex_property_map(&mut self) -> Option<Token> {
        match self.next_char() {
            None => Some(self.end_of_input("map key")),
            Some(c) if is_whitespace(c) => None,
            Some('}') if self.buf.is_empty() => {
                self.state = State::PropertyName;
                Some(Token::bare(TokenKind::CloseBrace))
            }
            Some(c @ ('}' | ':')) if c == '}' || self.buf.is_empty() => {
                Some(self.invalid(c, "map key"))
            }
            Some(':') => {
                self.state = State::MapValue;
                Some(self.emit(TokenKind::MapName))
            }
            Some(c) => {
                self.buf.push(c);
                None
            }
        }
    }

    fn lex_map_value(&mut self) -> Option<Token> {
        while let Some(c) = self.next_char() {
            if !is_blank(c) {
                self.unread();
                break;
            }
        }
        let value = self.read_line(&['}']);
        self.state = State::PropertyMap;
        Some(Token::new(TokenKind::MapValue, value))
    }
}

impl Iterator for Tokenizer {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            let token = match self.state {
                State::Done => return None,
                State::Block => self.lex_block(),
                State::Comment => self.lex_comment(),
                State::Provider => self.lex_provider(),
                State::ResourceTitle => self.lex_resource_title(),
                State::ResourceBlock => self.lex_resource_block(),
                State::PropertyName => self.lex_property_name(),
                State::PropertyValue => self.lex_property_value(),
                State::PropertyArray => self.lex_property_array(),
                State::PropertyMap => self.lex_property_map(),
                State::MapValue => self.lex_map_value(),
            };
            if token.is_some() {
                return token;
            }
        }
    }
}

impl FusedIterator for Tokenizer {}
