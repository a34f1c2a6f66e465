// Shared result and error types

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Rejected input: blank query name, malformed boolean expression.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The backing blob store refused the write.
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;
