//! Shared pipeline helpers for CLI commands.
//!
//! Contains the utilities used by `build`, `check` and `outdated`: project
//! root resolution, configuration loading with command-line overrides, and
//! template discovery under the include directories.

use std::path::{Path, PathBuf};

use panc_build::{BuildReport, Statistics, ThreadCounts};
use panc_config::{PancConfig, ResolvedConfig, ThreadConfig, CONFIG_FILE_NAME};
use panc_template::TemplateKind;

use crate::{GlobalArgs, PathArgs};

/// Walks up from `start` looking for the nearest directory containing `panc.toml`.
///
/// Returns the directory containing `panc.toml`, or `None` if there is none.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE_NAME).exists() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Loads the configuration selected by the global CLI args.
///
/// With `--config` the given file is loaded (a directory means its
/// `panc.toml`). Otherwise the nearest `panc.toml` above the current
/// directory is used; without one the defaults apply relative to the current
/// directory. Returns the resolved configuration.
pub fn load_project(global: &GlobalArgs) -> Result<ResolvedConfig, Box<dyn std::error::Error>> {
    let cwd = std::env::current_dir()?;
    let (config, base_dir) = match &global.config {
        Some(config_path) => {
            let p = cwd.join(config_path);
            let file = if p.is_dir() { p.join(CONFIG_FILE_NAME) } else { p };
            let base = file
                .parent()
                .map(|d| d.to_path_buf())
                .unwrap_or_else(|| cwd.clone());
            (panc_config::load_config_file(&file)?, base)
        }
        None => match find_project_root(&cwd) {
            Some(root) => (panc_config::load_config(&root)?, root),
            None => {
                tracing::debug!(dir = %cwd.display(), "no {CONFIG_FILE_NAME} found, using defaults");
                (PancConfig::default(), cwd.clone())
            }
        },
    };
    tracing::debug!(base = %base_dir.display(), "configuration loaded");
    Ok(panc_config::resolve_config(&config, &base_dir))
}

/// Applies search path and output overrides given on the command line.
///
/// Relative paths are taken against `cwd`.
pub fn apply_path_args(config: &mut ResolvedConfig, args: &PathArgs, cwd: &Path) {
    if !args.include.is_empty() {
        config.include_dirs = args.include.iter().map(|d| cwd.join(d)).collect();
    }
    if let Some(session) = &args.session {
        config.session_dir = Some(cwd.join(session));
    }
    if let Some(output) = &args.output {
        config.output_dir = cwd.join(output);
    }
    if !args.format.is_empty() {
        config.formats = args.format.clone();
    }
}

/// Overrides every stage's thread count; zero means all CPUs.
pub fn apply_threads(config: &mut ResolvedConfig, threads: Option<usize>) {
    if let Some(n) = threads {
        let resolved = ThreadCounts::uniform(n).resolved();
        config.threads = ThreadConfig {
            compile: resolved.compile,
            build: resolved.build,
            validate: resolved.validate,
            emit: resolved.emit,
        };
    }
}

/// Turns command-line file arguments into absolute paths.
pub fn absolute_files(files: &[String], cwd: &Path) -> Vec<PathBuf> {
    files.iter().map(|f| cwd.join(f)).collect()
}

/// Discovers template files (`.pan`, `.tpl`) under the given directories.
///
/// Returns the files sorted by path, without duplicates.
pub fn discover_templates(dirs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();
    for dir in dirs {
        for entry in walkdir::WalkDir::new(dir)
            .follow_links(true)
            .into_iter()
            .filter_map(Result::ok)
        {
            if entry.file_type().is_file() && is_template_file(entry.path()) {
                files.push(entry.into_path());
            }
        }
    }
    files.sort();
    files.dedup();
    files
}

/// Discovers object templates under the given directories.
///
/// Only the header of each file is parsed. Unreadable files and files whose
/// header does not parse are left out; `panc check` reports those.
pub fn discover_object_templates(dirs: &[PathBuf]) -> Vec<PathBuf> {
    discover_templates(dirs)
        .into_iter()
        .filter(|path| {
            let source = match std::fs::read_to_string(path) {
                Ok(source) => source,
                Err(err) => {
                    tracing::debug!(path = %path.display(), error = %err, "skipping unreadable file");
                    return false;
                }
            };
            match panc_template::parse_header(path, &source) {
                Ok(header) => header.kind == TemplateKind::Object,
                Err(err) => {
                    tracing::debug!(path = %path.display(), error = %err, "skipping file with bad header");
                    false
                }
            }
        })
        .collect()
}

fn is_template_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("pan") | Some("tpl")
    )
}

/// Prints every failure of a run, and every success when verbose.
pub fn print_report(report: &BuildReport, global: &GlobalArgs) {
    for (artifact, err) in &report.failed {
        eprintln!("error: {artifact}: {err}");
    }
    if global.verbose {
        for artifact in &report.succeeded {
            eprintln!("          ok {artifact}");
        }
        for file in &report.skipped {
            eprintln!("     current {}", file.display());
        }
    }
    if !global.quiet {
        print_summary(&report.statistics, report.skipped.len());
    }
}

fn print_summary(statistics: &Statistics, skipped: usize) {
    if skipped > 0 {
        eprintln!("    Finished {statistics} ({skipped} up to date)");
    } else {
        eprintln!("    Finished {statistics}");
    }
}
