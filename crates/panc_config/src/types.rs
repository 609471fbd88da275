//! Configuration types deserialized from `panc.toml`.

use std::fmt;

use serde::Deserialize;

/// The top-level compiler configuration parsed from `panc.toml`.
///
/// Every table is optional; an empty file yields a configuration that
/// compiles templates found in the config file's directory and writes JSON
/// profiles to `build/profiles`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PancConfig {
    /// Search path, session overlay and output locations.
    #[serde(default)]
    pub paths: PathsConfig,
    /// Output formats and compression.
    #[serde(default)]
    pub output: OutputConfig,
    /// Dependency tracking settings.
    #[serde(default)]
    pub dependencies: DependencyConfig,
    /// Evaluation limits and modes.
    #[serde(default)]
    pub compiler: CompilerConfig,
    /// Worker pool sizes.
    #[serde(default)]
    pub threads: ThreadConfig,
}

/// Filesystem locations, relative to the configuration file's directory.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    /// Include directories searched in order when resolving names.
    #[serde(default = "default_include")]
    pub include: Vec<String>,
    /// Optional session directory consulted before the include directories.
    #[serde(default)]
    pub session: Option<String>,
    /// Directory receiving profiles and dependency files.
    #[serde(default = "default_output_dir")]
    pub output: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            include: default_include(),
            session: None,
            output: default_output_dir(),
        }
    }
}

fn default_include() -> Vec<String> {
    vec![".".to_string()]
}

fn default_output_dir() -> String {
    "build/profiles".to_string()
}

/// Profile output settings.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Formats written for every object template. The dependency file is
    /// always written in addition to these.
    #[serde(default = "default_formats")]
    pub formats: Vec<OutputFormat>,
    /// Whether to gzip profile files.
    #[serde(default)]
    pub gzip: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            formats: default_formats(),
            gzip: false,
        }
    }
}

fn default_formats() -> Vec<OutputFormat> {
    vec![OutputFormat::Json]
}

/// A profile serialization format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Pretty-printed JSON.
    Json,
    /// The XML "pan" profile format.
    Pan,
    /// One `path = value` line per leaf.
    Txt,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Pan => write!(f, "pan"),
            OutputFormat::Txt => write!(f, "txt"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(OutputFormat::Json),
            "pan" => Ok(OutputFormat::Pan),
            "txt" => Ok(OutputFormat::Txt),
            other => Err(format!("unknown output format '{other}'")),
        }
    }
}

/// Dependency tracking settings.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DependencyConfig {
    /// Regular expression of dependency names to ignore when checking
    /// staleness. Must match the whole name. Entries matching it are never
    /// considered stale, so use with care.
    #[serde(default)]
    pub ignore: Option<String>,
}

/// Evaluation settings.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompilerConfig {
    /// Maximum include nesting depth.
    #[serde(default = "default_max_recursion")]
    pub max_recursion: usize,
    /// Only check syntax; do not build or write profiles.
    #[serde(default)]
    pub syntax_only: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            max_recursion: default_max_recursion(),
            syntax_only: false,
        }
    }
}

fn default_max_recursion() -> usize {
    50
}

/// Worker pool sizes per pipeline stage family. Zero means one thread per
/// available CPU.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThreadConfig {
    /// Threads parsing templates.
    #[serde(default)]
    pub compile: usize,
    /// Threads evaluating object templates.
    #[serde(default)]
    pub build: usize,
    /// Threads running both validation stages.
    #[serde(default)]
    pub validate: usize,
    /// Threads writing output files.
    #[serde(default)]
    pub emit: usize,
}
