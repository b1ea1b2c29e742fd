use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("job '{0}' has no tasks")]
    EmptyJob(String),

    #[error("job '{job}' declares task title '{title}' more than once")]
    DuplicateTitle { job: String, title: String },

    #[error("job '{job}': task {index} is out of order")]
    TaskOrder { job: String, index: usize },

    #[error("invalid properties: {0}")]
    Properties(#[from] serde_json::Error),

    #[error("invalid model: {0}")]
    Invalid(String),
}

pub type ModelResult<T> = Result<T, ModelError>;
