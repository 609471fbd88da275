//! Resolution of a parsed configuration against its base directory.

use std::path::{Path, PathBuf};

use crate::types::{OutputFormat, PancConfig, ThreadConfig};

/// A configuration with absolute paths and concrete thread counts.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute include directories in search order.
    pub include_dirs: Vec<PathBuf>,
    /// Absolute session directory, if configured.
    pub session_dir: Option<PathBuf>,
    /// Absolute output directory.
    pub output_dir: PathBuf,
    /// Profile formats to write.
    pub formats: Vec<OutputFormat>,
    /// Whether profiles are gzipped.
    pub gzip: bool,
    /// Ignore pattern for dependency staleness, as written.
    pub ignore_dependency_pattern: Option<String>,
    /// Maximum include nesting depth.
    pub max_recursion: usize,
    /// Only check syntax.
    pub syntax_only: bool,
    /// Thread counts with zero replaced by the available parallelism.
    pub threads: ThreadConfig,
}

/// Resolves relative paths against `base_dir` (normally the directory holding
/// `panc.toml`) and replaces zero thread counts with the CPU count.
pub fn resolve_config(config: &PancConfig, base_dir: &Path) -> ResolvedConfig {
    let cpus = available_threads();
    let threads = ThreadConfig {
        compile: or_default(config.threads.compile, cpus),
        build: or_default(config.threads.build, cpus),
        validate: or_default(config.threads.validate, cpus),
        emit: or_default(config.threads.emit, cpus),
    };
    ResolvedConfig {
        include_dirs: config
            .paths
            .include
            .iter()
            .map(|p| absolutize(base_dir, p))
            .collect(),
        session_dir: config
            .paths
            .session
            .as_deref()
            .map(|p| absolutize(base_dir, p)),
        output_dir: absolutize(base_dir, &config.paths.output),
        formats: config.output.formats.clone(),
        gzip: config.output.gzip,
        ignore_dependency_pattern: config.dependencies.ignore.clone(),
        max_recursion: config.compiler.max_recursion,
        syntax_only: config.compiler.syntax_only,
        threads,
    }
}

/// Returns the number of CPUs available to this process, at least one.
pub fn available_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn or_default(requested: usize, default: usize) -> usize {
    if requested == 0 {
        default
    } else {
        requested
    }
}

fn absolutize(base_dir: &Path, path: &str) -> PathBuf {
    let joined = base_dir.join(path);
    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            std::path::Component::CurDir => {}
            std::path::Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}
