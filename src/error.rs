use std::path::PathBuf;
use thiserror::Error;

/// Possible errors that arise while loading, mining or clustering set stores.
#[derive(Debug, Error)]
pub enum SmhError {
    /// The file to load does not exist.
    #[error("file not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// Any other I/O failure while reading or writing a file.
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A set store or weights file is malformed.
    #[error("malformed input at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// An item or row id lies outside the valid range.
    #[error("{what} {index} out of range (limit {limit})")]
    OutOfRange {
        what: &'static str,
        index: usize,
        limit: usize,
    },

    /// A parameter is invalid for the call it was passed to.
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter { name: &'static str, message: String },

    /// Open addressing visited every bucket without finding a free one.
    #[error("hash table with {table_size} buckets is full")]
    TableFull { table_size: usize },
}

/// Result type used throughout this crate.
pub type Result<T> = std::result::Result<T, SmhError>;

impl SmhError {
    pub(crate) fn item_out_of_range(item: usize, dim: usize) -> Self {
        SmhError::OutOfRange { what: "item", index: item, limit: dim }
    }

    pub(crate) fn row_out_of_range(row: usize, size: usize) -> Self {
        SmhError::OutOfRange { what: "row", index: row, limit: size }
    }

    pub(crate) fn invalid(name: &'static str, message: impl Into<String>) -> Self {
        SmhError::InvalidParameter { name, message: message.into() }
    }
}
