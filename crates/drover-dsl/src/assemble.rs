use tracing::trace;

use crate::{
    error::DslError,
    json::escape,
    lexer::{Token, TokenKind},
};

/// Value group of the property currently being written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Group {
    /// Name written, value not started yet.
    Pending,
    /// Scalar or a closed array/map.
    Closed,
    Array { items: usize },
    Map { entries: usize },
}

/// Incremental JSON writer driven by tokens.
///
/// Produces `[{"provider":..,"name":..,"properties":[{"K":V},..]},..]`.
#[derive(Debug)]
struct Assembler {
    out: String,
    blocks: usize,
    in_block: bool,
    props: usize,
    group: Option<Group>,
}

impl Assembler {
    fn new() -> Self {
        Self {
            out: String::from("["),
            blocks: 0,
            in_block: false,
            props: 0,
            group: None,
        }
    }

    fn push_str_value(&mut self, value: &str) {
        self.out.push('"');
        self.out.push_str(&escape(value));
        self.out.push('"');
    }

    /// Close the open property entry, including an unterminated array or map.
    fn close_property(&mut self) {
        match self.group.take() {
            None => return,
            Some(Group::Pending) => self.out.push_str("\"\""),
            Some(Group::Array { .. }) => self.out.push(']'),
            Some(Group::Map { .. }) => self.out.push('}'),
            Some(Group::Closed) => {}
        }
        self.out.push('}');
    }

    fn close_block(&mut self) {
        if !self.in_block {
            return;
        }
        self.close_property();
        self.out.push_str("]}");
        self.in_block = false;
    }

    fn feed(&mut self, token: Token) -> Result<(), DslError> {
        trace!(token = %token, "assembling");
        match token.kind {
            TokenKind::Comment | TokenKind::Eof => {}
            TokenKind::Error => return Err(DslError::Syntax(token.value)),
            TokenKind::Provider => {
                self.close_block();
                if self.blocks > 0 {
                    self.out.push(',');
                }
                self.out.push_str("{\"provider\":");
                self.push_str_value(&token.value);
                self.out.push(',');
                self.blocks += 1;
                self.props = 0;
                self.in_block = true;
            }
            TokenKind::ResourceTitle => {
                self.out.push_str("\"name\":");
                self.push_str_value(&token.value);
                self.out.push_str(",\"properties\":[");
            }
            TokenKind::PropertyName => {
                self.close_property();
                if self.props > 0 {
                    self.out.push(',');
                }
                self.out.push('{');
                self.push_str_value(&token.value);
                self.out.push(':');
                self.props += 1;
                self.group = Some(Group::Pending);
            }
            TokenKind::ScalarValue => {
                self.push_str_value(&token.value);
                self.group = Some(Group::Closed);
            }
            TokenKind::OpenBracket => {
                self.out.push('[');
                self.group = Some(Group::Array { items: 0 });
            }
            TokenKind::ArrayValue => {
                if let Some(Group::Array { items }) = self.group {
                    if items > 0 {
                        self.out.push(',');
                    }
                    self.push_str_value(&token.value);
                    self.group = Some(Group::Array { items: items + 1 });
                }
            }
            TokenKind::CloseBracket => {
                self.out.push(']');
                self.group = Some(Group::Closed);
            }
            TokenKind::OpenBrace => {
                // The brace after a title opens the block itself.
                if self.group == Some(Group::Pending) {
                    self.out.push('{');
                    self.group = Some(Group::Map { entries: 0 });
                }
            }
            TokenKind::MapName => {
                if let Some(Group::Map { entries }) = self.group {
                    if entries > 0 {
                        self.out.push(',');
                    }
                    self.push_str_value(&token.value);
                    self.out.push(':');
                }
            }
            TokenKind::MapValue => {
                if let Some(Group::Map { entries }) = self.group {
                    self.push_str_value(&token.value);
                    self.group = Some(Group::Map {
                        entries: entries + 1,
                    });
                }
            }
            TokenKind::CloseBrace => match self.group {
                Some(Group::Map { .. }) => {
                    self.out.push('}');
                    self.group = Some(Group::Closed);
                }
                _ => self.close_block(),
            },
        }
        Ok(())
    }

    fn finish(mut self) -> String {
        self.close_block();
        self.out.push(']');
        self.out
    }
}

/// Assemble a token sequence into the intermediate JSON block document.
///
/// Stops at the first error token and returns it as [`DslError::Syntax`].
pub fn assemble<I>(tokens: I) -> Result<String, DslError>
where
    I: IntoIterator<Item = Token>,
{
    let mut assembler = Assembler::new();
    for token in tokens {
        assembler.feed(token)?;
    }
    Ok(assembler.finish())
}
