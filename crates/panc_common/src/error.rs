//! Error types for name and path parsing.

/// Errors produced when a string is not a valid template name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    /// The name was empty.
    #[error("template name is empty")]
    Empty,

    /// A segment of the name was empty (leading, trailing or doubled `/`).
    #[error("template name '{name}' contains an empty segment")]
    EmptySegment {
        /// The rejected name.
        name: String,
    },

    /// A segment was `.` or `..`.
    #[error("template name '{name}' contains a relative segment")]
    RelativeSegment {
        /// The rejected name.
        name: String,
    },

    /// The name contains a character outside `[A-Za-z0-9_.+-]` and `/`.
    #[error("template name '{name}' contains invalid character '{ch}'")]
    InvalidChar {
        /// The rejected name.
        name: String,
        /// The first offending character.
        ch: char,
    },
}

/// Errors produced when a string is not a valid configuration tree path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// The path string was empty.
    #[error("path is empty")]
    Empty,

    /// A path term is not a valid dictionary key or list index.
    #[error("invalid term '{term}' in path '{path}'")]
    InvalidTerm {
        /// The full path being parsed.
        path: String,
        /// The offending term.
        term: String,
    },

    /// The authority (object name) of an external path is invalid.
    #[error("invalid object name in external path '{path}': {source}")]
    InvalidAuthority {
        /// The full path being parsed.
        path: String,
        /// Why the authority was rejected.
        source: NameError,
    },
}
