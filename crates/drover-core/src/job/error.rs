use thiserror::Error;

use crate::provider::ProviderError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("task '{title}' ({provider}) failed: {source}")]
    TaskFailed {
        provider: String,
        title: String,
        #[source]
        source: ProviderError,
    },

    #[error("task '{title}' ({provider}) rejected its settings: {source}")]
    RegisterFailed {
        provider: String,
        title: String,
        #[source]
        source: ProviderError,
    },

    #[error("provider instance is not bound to any task of job '{0}'")]
    NotInChain(String),

    #[error("job was released before the trigger fired")]
    Released,
}
