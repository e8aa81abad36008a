use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Schema error: {message}")]
    Schema { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Empty input: zero rows after load")]
    EmptyInput,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
