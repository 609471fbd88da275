//! Configuration file loading and validation.

use std::collections::HashSet;
use std::path::Path;

use crate::error::ConfigError;
use crate::types::PancConfig;

/// The configuration file name looked up in a project directory.
pub const CONFIG_FILE_NAME: &str = "panc.toml";

/// Loads and validates `panc.toml` from a project directory.
pub fn load_config(project_dir: &Path) -> Result<PancConfig, ConfigError> {
    load_config_file(&project_dir.join(CONFIG_FILE_NAME))
}

/// Loads and validates a configuration file at an explicit path.
pub fn load_config_file(path: &Path) -> Result<PancConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<PancConfig, ConfigError> {
    let config: PancConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that required fields are present and values are consistent.
fn validate_config(config: &PancConfig) -> Result<(), ConfigError> {
    if config.paths.include.is_empty() {
        return Err(ConfigError::MissingField("paths.include".to_string()));
    }
    if config.paths.output.is_empty() {
        return Err(ConfigError::MissingField("paths.output".to_string()));
    }
    let mut seen = HashSet::new();
    for format in &config.output.formats {
        if !seen.insert(*format) {
            return Err(ConfigError::DuplicateFormat(*format));
        }
    }
    if let Some(pattern) = &config.dependencies.ignore {
        regex::Regex::new(pattern).map_err(|source| ConfigError::InvalidIgnorePattern {
            pattern: pattern.clone(),
            source,
        })?;
    }
    if config.compiler.max_recursion == 0 {
        return Err(ConfigError::ValidationError(
            "compiler.max_recursion must be greater than zero".to_string(),
        ));
    }
    Ok(())
}
