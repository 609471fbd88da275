//! Error types for template compilation and evaluation.

use std::path::PathBuf;
use std::sync::Arc;

use panc_common::TemplateName;
use panc_source::SourceLocation;

/// Errors raised while reading and parsing a template file.
///
/// These are fatal for the template concerned and are never retried.
#[derive(Debug, thiserror::Error)]
pub enum SyntaxError {
    /// The file could not be read.
    #[error("cannot read template {path}: {source}")]
    Io {
        /// The template file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The text does not follow the template grammar.
    #[error("{location}: {message}")]
    Parse {
        /// Where the problem was found.
        location: SourceLocation,
        /// What was expected.
        message: String,
    },

    /// The declared template name does not match the file's path.
    #[error("template name '{declared}' does not match file {path}")]
    NameMismatch {
        /// The template file.
        path: PathBuf,
        /// The name in the template header.
        declared: String,
    },
}

/// Errors raised while evaluating or validating a template.
///
/// Every variant that originates in template text carries the source location
/// of the offending statement.
#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    /// A statement failed.
    #[error("{location}: {message}")]
    Statement {
        /// The statement's location.
        location: SourceLocation,
        /// What went wrong.
        message: String,
    },

    /// A referenced template could not be found on the include path.
    #[error("{location}: cannot locate template '{name}'")]
    TemplateNotFound {
        /// The `include` or `create` location.
        location: SourceLocation,
        /// The missing template.
        name: TemplateName,
    },

    /// Includes nested deeper than the configured limit.
    #[error("{location}: maximum include depth of {limit} exceeded")]
    RecursionLimit {
        /// The `include` that went too deep.
        location: SourceLocation,
        /// The configured limit.
        limit: usize,
    },

    /// A path bound to a type holds a value the type rejects.
    #[error("{file}: value at {path} does not match type {type_name}: {reason}")]
    Validation {
        /// The bound path.
        path: String,
        /// The type the path is bound to.
        type_name: String,
        /// The template containing the `bind` statement.
        file: PathBuf,
        /// Why the value was rejected.
        reason: String,
    },

    /// Another template or object this one uses has failed.
    #[error("cannot use '{object}': {source}")]
    Upstream {
        /// The template or object that was referenced.
        object: TemplateName,
        /// The failure reported for that object.
        source: Arc<dyn std::error::Error + Send + Sync>,
    },

    /// A template failed to compile while being loaded.
    #[error(transparent)]
    Syntax(Arc<SyntaxError>),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> SourceLocation {
        SourceLocation::new("/t/ns/a.pan", 4, 1)
    }

    #[test]
    fn parse_error_display() {
        let err = SyntaxError::Parse {
            location: loc(),
            message: "expected ';'".to_string(),
        };
        assert_eq!(err.to_string(), "/t/ns/a.pan:4:1: expected ';'");
    }

    #[test]
    fn name_mismatch_display() {
        let err = SyntaxError::NameMismatch {
            path: PathBuf::from("/t/ns/a.pan"),
            declared: "ns/b".to_string(),
        };
        assert!(err.to_string().contains("'ns/b' does not match"));
    }

    #[test]
    fn template_not_found_display() {
        let err = EvaluationError::TemplateNotFound {
            location: loc(),
            name: TemplateName::parse("ns/missing").unwrap(),
        };
        assert_eq!(
            err.to_string(),
            "/t/ns/a.pan:4:1: cannot locate template 'ns/missing'"
        );
    }

    #[test]
    fn validation_display_names_path_type_and_file() {
        let err = EvaluationError::Validation {
            path: "/system/ncpu".to_string(),
            type_name: "long(1..256)".to_string(),
            file: PathBuf::from("/t/ns/types.pan"),
            reason: "0 is below 1".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/system/ncpu"));
        assert!(msg.contains("long(1..256)"));
        assert!(msg.contains("/t/ns/types.pan"));
    }

    #[test]
    fn upstream_display() {
        let cause: Arc<dyn std::error::Error + Send + Sync> = Arc::new(std::io::Error::new(
            std::io::ErrorKind::Other,
            "boom",
        ));
        let err = EvaluationError::Upstream {
            object: TemplateName::parse("ns/b").unwrap(),
            source: cause,
        };
        assert_eq!(err.to_string(), "cannot use 'ns/b': boom");
    }
}
