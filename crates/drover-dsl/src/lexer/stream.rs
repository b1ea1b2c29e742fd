use std::{
    sync::mpsc::{Receiver, SyncSender, sync_channel},
    thread,
};

use tracing::trace;

use crate::{
    error::DslError,
    lexer::{Token, Tokenizer},
};

/// Default size of the handoff queue between tokenizer and consumer.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Tokens produced by a [`Tokenizer`] running on its own worker thread.
///
/// The producer blocks once `capacity` tokens are waiting. Dropping the stream
/// early makes the producer's next send fail, which ends the worker.
#[derive(Debug)]
pub struct TokenStream {
    rx: Receiver<Token>,
}

impl TokenStream {
    /// Spawn a worker with the default queue capacity.
    pub fn spawn(tokenizer: Tokenizer) -> Result<Self, DslError> {
        Self::with_capacity(tokenizer, DEFAULT_QUEUE_CAPACITY)
    }

    /// Spawn a worker with an explicit queue capacity (at least 1).
    pub fn with_capacity(tokenizer: Tokenizer, capacity: usize) -> Result<Self, DslError> {
        let (tx, rx) = sync_channel(capacity.max(1));
        thread::Builder::new()
            .name("drover-lexer".into())
            .spawn(move || produce(tokenizer, tx))
            .map_err(DslError::Worker)?;
        Ok(Self { rx })
    }
}

fn produce(tokenizer: Tokenizer, tx: SyncSender<Token>) {
    for token in tokenizer {
        if tx.send(token).is_err() {
            trace!("token consumer went away; stopping tokenizer");
            return;
        }
    }
}

impl Iterator for TokenStream {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        self.rx.recv().ok()
    }
}
