//! Error types for profile serialization.

use std::path::PathBuf;

/// Errors raised while serializing or writing a profile.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// Writing to the output stream failed.
    #[error("cannot write {format} output: {source}")]
    Io {
        /// The formatter key.
        format: &'static str,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// JSON serialization failed.
    #[error("cannot serialize profile as json: {0}")]
    Json(#[from] serde_json::Error),

    /// XML serialization failed.
    #[error("cannot serialize profile as xml: {0}")]
    Xml(String),

    /// The tree contains a value the format cannot represent.
    #[error("cannot represent {what} at {path} in {format} output")]
    Unrepresentable {
        /// The formatter key.
        format: &'static str,
        /// The offending node's path.
        path: String,
        /// What could not be represented.
        what: String,
    },

    /// An output file could not be created.
    #[error("cannot create {path}: {source}")]
    Create {
        /// The file being created.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_display() {
        let err = OutputError::Io {
            format: "pan",
            source: std::io::Error::new(std::io::ErrorKind::WriteZero, "disk full"),
        };
        assert_eq!(err.to_string(), "cannot write pan output: disk full");
    }

    #[test]
    fn unrepresentable_display() {
        let err = OutputError::Unrepresentable {
            format: "json",
            path: "/a".to_string(),
            what: "an undefined value".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "cannot represent an undefined value at /a in json output"
        );
    }

    #[test]
    fn create_display() {
        let err = OutputError::Create {
            path: PathBuf::from("/out/a.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().starts_with("cannot create /out/a.json"));
    }
}
