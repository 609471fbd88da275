//! Error types for configuration loading and validation.

use crate::types::OutputFormat;

/// Errors that can occur when loading or validating a `panc.toml` configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An I/O error occurred while reading the configuration file.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A required field is missing from the configuration.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// `output.formats` names the same format twice.
    #[error("output format '{0}' is listed more than once")]
    DuplicateFormat(OutputFormat),

    /// `dependencies.ignore` is not a valid regular expression.
    #[error("invalid dependencies.ignore pattern '{pattern}': {source}")]
    InvalidIgnorePattern {
        /// The pattern as written.
        pattern: String,
        /// Why it does not compile.
        #[source]
        source: regex::Error,
    },

    /// A configuration value failed validation.
    #[error("validation error: {0}")]
    ValidationError(String),
}
