use std::path::PathBuf;
use thiserror::Error;

/// Result type for splitter operations
pub type Result<T> = std::result::Result<T, SplitterError>;

/// Errors that can occur while splitting markdown
#[derive(Error, Debug)]
pub enum SplitterError {
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The heading pattern failed to compile
    #[error("Heading pattern error: {0}")]
    Pattern(#[from] regex::Error),

    /// Failed to read a source document
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
