use thiserror::Error;

use drover_model::ModelError;

use crate::job::EngineError;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("provider not found: {0}")]
    UnknownProvider(String),

    #[error("provider '{0}' is already registered")]
    DuplicateProvider(String),

    #[error("instance key '{key}' is bound to provider '{bound}', task requested '{requested}'")]
    InstanceKeyConflict {
        key: String,
        bound: String,
        requested: String,
    },

    #[error("invalid job: {0}")]
    Model(#[from] ModelError),

    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}
