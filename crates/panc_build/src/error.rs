//! Error type for per-artifact build failures.

use std::path::PathBuf;
use std::sync::Arc;

use panc_cache::MemoError;
use panc_common::TemplateName;
use panc_output::OutputError;
use panc_source::SourceError;
use panc_template::{EvaluationError, SyntaxError};

/// Why an artifact failed to compile.
///
/// Errors are stored in the stage caches as `Arc<CompileError>`, so every
/// stage and caller waiting on the same artifact sees the same instance.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// The template could not be read or parsed.
    #[error(transparent)]
    Syntax(Arc<SyntaxError>),

    /// A requested file does not sit where its template name says it should.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The template's statements failed to evaluate, or a type binding
    /// rejected a value.
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    /// The tree still holds an undefined value after building.
    #[error("object '{name}': value at {path} is undefined")]
    Undefined {
        /// The object template.
        name: TemplateName,
        /// Path of the first undefined node found.
        path: String,
    },

    /// An object this one references failed validation.
    #[error("object '{name}' depends on '{dependency}', which failed: {source}")]
    Validation {
        /// The object being validated.
        name: TemplateName,
        /// The referenced object that failed.
        dependency: TemplateName,
        /// The dependency's own error.
        source: Arc<CompileError>,
    },

    /// An output file or directory could not be written.
    #[error("cannot write {path}: {source}")]
    System {
        /// The file or directory.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A formatter could not serialize the tree.
    #[error("cannot format object '{name}': {source}")]
    Output {
        /// The object template.
        name: TemplateName,
        /// The formatter's error.
        source: OutputError,
    },

    /// Objects reference each other while building, so none could finish.
    #[error("circular object dependency: {chain}")]
    Cycle {
        /// The cycle, written `a -> b -> a`.
        chain: String,
    },

    /// A stage asked for its own result while computing it.
    #[error("{stage} of '{name}' depends on itself")]
    Reentrant {
        /// The stage.
        stage: &'static str,
        /// The artifact.
        name: String,
    },

    /// A stage panicked.
    #[error("{stage} of '{name}' panicked")]
    Panicked {
        /// The stage.
        stage: &'static str,
        /// The artifact.
        name: String,
    },

    /// No template with this name exists on the include path.
    #[error("cannot locate object template '{name}'")]
    MissingSource {
        /// The requested name.
        name: TemplateName,
    },
}

impl From<MemoError> for CompileError {
    fn from(err: MemoError) -> Self {
        match err {
            MemoError::Reentrant { cache, key } => CompileError::Reentrant {
                stage: cache,
                name: key,
            },
            MemoError::Panicked { cache, key } => CompileError::Panicked {
                stage: cache,
                name: key,
            },
        }
    }
}

impl From<SyntaxError> for CompileError {
    fn from(err: SyntaxError) -> Self {
        CompileError::Syntax(Arc::new(err))
    }
}

/// Shorthand for wrapping a fresh error for publication in a stage cache.
pub(crate) fn shared(err: impl Into<CompileError>) -> Arc<CompileError> {
    Arc::new(err.into())
}
