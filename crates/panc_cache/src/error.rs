//! Error types for cache operations.

use std::path::PathBuf;

/// Errors reading, parsing or writing dependency records.
///
/// The staleness checker folds all of these into "outdated"; they surface
/// only to callers that read records directly.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading a record or template.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A record line does not have the expected shape.
    #[error("malformed dependency record line {line}: {reason}")]
    MalformedLine {
        /// One-based line number.
        line: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// A directory could not be expressed as a `file:` URI, or a URI could
    /// not be turned back into a directory.
    #[error("invalid dependency location '{location}'")]
    InvalidLocation {
        /// The offending path or URI.
        location: String,
    },

    /// The dependency ignore pattern is not a valid regular expression.
    #[error("invalid dependency ignore pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// The template's header could not be read to determine its name.
    #[error("cannot determine template name of {path}: {reason}")]
    TemplateName {
        /// The template file.
        path: PathBuf,
        /// Why the header was unusable.
        reason: String,
    },
}

/// Failures of the memoizing cache itself, as opposed to failures of the
/// computations it runs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MemoError {
    /// A computation asked its own cache for its own key.
    #[error("{cache} of '{key}' depends on itself")]
    Reentrant {
        /// Name of the cache.
        cache: &'static str,
        /// The key being computed.
        key: String,
    },

    /// A computation panicked before producing a result.
    #[error("{cache} of '{key}' panicked")]
    Panicked {
        /// Name of the cache.
        cache: &'static str,
        /// The key being computed.
        key: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_line_display() {
        let err = CacheError::MalformedLine {
            line: 3,
            reason: "expected 3 fields, found 1".into(),
        };
        assert_eq!(
            err.to_string(),
            "malformed dependency record line 3: expected 3 fields, found 1"
        );
    }

    #[test]
    fn memo_error_display() {
        let err = MemoError::Reentrant {
            cache: "build",
            key: "site/a".into(),
        };
        assert_eq!(err.to_string(), "build of 'site/a' depends on itself");
    }
}
