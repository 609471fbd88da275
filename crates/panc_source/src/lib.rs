//! Source lookup for the pan compiler.
//!
//! This crate resolves template and text names against an ordered list of
//! include directories (optionally overlaid by a session directory), and
//! describes every source entity a build consults so that it can be recorded
//! in the artifact's dependency record.

#![warn(missing_docs)]

pub mod error;
pub mod location;
pub mod repository;
pub mod source_file;

pub use error::SourceError;
pub use location::{LineIndex, SourceLocation};
pub use repository::SourceRepository;
pub use source_file::SourceFile;
