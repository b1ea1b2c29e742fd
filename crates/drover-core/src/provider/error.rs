use thiserror::Error;

use drover_model::ModelError;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("cannot decode properties: {0}")]
    Properties(#[from] ModelError),

    #[error("execution failed: {0}")]
    Execution(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
