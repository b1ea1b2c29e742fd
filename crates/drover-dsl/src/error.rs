use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DslError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to start tokenizer worker: {0}")]
    Worker(#[source] std::io::Error),

    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("malformed job document: {0}")]
    Document(#[from] serde_json::Error),

    #[error("job '{job}' uses unknown provider '{provider}'")]
    UnknownProvider { job: String, provider: String },

    #[error("job '{job}' declares task title '{title}' more than once")]
    DuplicateTitle { job: String, title: String },

    #[error("job '{0}' declares no tasks")]
    Empty(String),
}

pub type DslResult<T> = Result<T, DslError>;
