use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors raised at the crate's fallible edges (loading data, reading config).
/// The analytics themselves never fail; they degrade to empty results instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}
