use thiserror::Error;

/// Main error type for mubingraph
#[derive(Error, Debug)]
pub enum MubinGraphError {
    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Persisted artifact (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HashId failed range or format validation
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Source reference is neither a configured name nor a directory
    #[error("Source not found: {0}")]
    SourceNotFound(String),

    /// XML parse errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenient Result type using MubinGraphError
pub type Result<T> = std::result::Result<T, MubinGraphError>;
