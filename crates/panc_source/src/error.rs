//! Error types for source entities and lookups.

use std::path::PathBuf;

use panc_common::SourceKind;

/// Errors raised when constructing or reading source entities.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// A present kind was given without a file path.
    #[error("source '{name}' of kind {kind} requires a file path")]
    MissingPath {
        /// The entity name.
        name: String,
        /// The entity kind.
        kind: SourceKind,
    },

    /// An absent kind was given a file path.
    #[error("absent source '{name}' of kind {kind} cannot have a file path ({path})")]
    UnexpectedPath {
        /// The entity name.
        name: String,
        /// The entity kind.
        kind: SourceKind,
        /// The path that was supplied.
        path: PathBuf,
    },

    /// The file path does not end with the entity's name and extension.
    #[error("path {path} does not match source name '{name}'")]
    NameMismatch {
        /// The entity name.
        name: String,
        /// The path that was supplied.
        path: PathBuf,
    },

    /// An I/O error occurred while reading a source file.
    #[error("cannot read {path}: {source}")]
    Io {
        /// The file being read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}
