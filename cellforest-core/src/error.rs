//! Structured error types for the cellforest workspace.

use thiserror::Error;

/// Unified error type for all cellforest operations.
#[derive(Debug, Error)]
pub enum CellforestError {
    /// I/O error (permission denied, unreadable file, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error (malformed input data)
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid input (bad arguments, out-of-range values)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Matrix shape disagrees with the supplied labels
    #[error("construction error: {0}")]
    Construction(String),

    /// A required label or position is absent from an index
    #[error("lookup error: {0}")]
    Lookup(String),

    /// Operation deliberately not supported (e.g. stacking labeled matrices)
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// A required input file is missing
    #[error("not found: {0}")]
    NotFound(String),

    /// Compression or decompression failure
    #[error("compression error: {0}")]
    Compression(String),

    /// Binary (de)serialization failure
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Catch-all for other errors
    #[error("{0}")]
    Other(String),
}

impl CellforestError {
    /// Wrap an I/O error with the path it occurred on.
    pub fn io_at(path: &std::path::Path, e: std::io::Error) -> Self {
        CellforestError::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {}", path.display(), e),
        ))
    }
}

/// Convenience alias used throughout the cellforest workspace.
pub type Result<T> = std::result::Result<T, CellforestError>;
