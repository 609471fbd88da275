//! Parsing and validation of `panc.toml` compiler configuration files.
//!
//! This crate reads the configuration file and produces a strongly-typed
//! [`PancConfig`], then resolves it against the file's directory into a
//! [`ResolvedConfig`] with absolute paths and concrete thread counts.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_file, load_config_from_str, CONFIG_FILE_NAME};
pub use resolve::{available_threads, resolve_config, ResolvedConfig};
pub use types::*;
