//! Error types for mapping parsing and resolution.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MappingError>;

#[derive(Error, Debug)]
pub enum MappingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The first line is neither a Tiny v1 nor a Tiny v2 header.
    #[error("Unrecognised mapping header: {0:?}")]
    UnknownHeader(String),

    #[error("Mapping file is empty")]
    Empty,

    /// A line could not be parsed.
    #[error("Line {line}: {message}")]
    Syntax { line: usize, message: String },

    /// A namespace was requested that the tree does not declare.
    #[error("Unknown namespace '{0}'")]
    UnknownNamespace(String),
}
