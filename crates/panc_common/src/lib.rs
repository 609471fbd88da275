//! Shared foundational types used across the pan compiler.
//!
//! This crate provides validated template names, the kinds of source entities
//! a build can consult, configuration tree paths, and the error types for
//! parsing names and paths.

#![warn(missing_docs)]

pub mod error;
pub mod kind;
pub mod name;
pub mod path;

pub use error::{NameError, PathError};
pub use kind::{SourceKind, UnknownKind, TEMPLATE_KINDS};
pub use name::TemplateName;
pub use path::{PathTerm, TreePath};
