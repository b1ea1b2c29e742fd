use thiserror::Error;

use drover_core::ProviderError;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to spawn '{file}': {source}")]
    Spawn {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("process '{file}' exited with {}: {stderr}", exit_label(.code))]
    NonZeroExit {
        file: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("process '{file}' was killed on cancellation")]
    Cancelled { file: String },
}

impl From<ExecError> for ProviderError {
    fn from(e: ExecError) -> Self {
        match e {
            ExecError::Io(io) => ProviderError::Io(io),
            other => ProviderError::Execution(other.to_string()),
        }
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("code {c}"),
        None => "a signal".to_string(),
    }
}
