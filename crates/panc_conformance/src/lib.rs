//! Conformance test helpers for the panc compiler.
//!
//! Provides a scratch [`Workspace`] that lays out template repositories on
//! disk and builds compilers and dependency checkers over them, so the
//! integration tests can exercise full build and incremental-check cycles.

#![warn(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use filetime::FileTime;
use panc_build::{Compiler, CompilerOptions, ThreadCounts};
use panc_cache::DependencyChecker;
use panc_common::TemplateName;
use panc_output::{Formatter, JsonFormatter};
use panc_source::SourceRepository;
use tempfile::TempDir;

/// A temporary directory holding template repositories and an output
/// directory.
///
/// Repositories are plain subdirectories named by the caller (`repoA`,
/// `repoB`, ...). Profiles go to `out/`.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Creates an empty workspace.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp dir"),
        }
    }

    /// The workspace root.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// The directory of the repository called `repo`.
    pub fn repo(&self, repo: &str) -> PathBuf {
        self.path().join(repo)
    }

    /// The directory receiving profiles and dependency files.
    pub fn output_dir(&self) -> PathBuf {
        self.path().join("out")
    }

    /// Writes `text` to `rel` inside `repo` and returns the file's path.
    pub fn write(&self, repo: &str, rel: &str, text: &str) -> PathBuf {
        let path = self.repo(repo).join(rel);
        fs::create_dir_all(path.parent().expect("file has a parent")).expect("create dirs");
        fs::write(&path, text).expect("write template");
        path
    }

    /// Writes an object template `name` into `repo`.
    pub fn object(&self, repo: &str, name: &str, body: &str) -> PathBuf {
        self.write(
            repo,
            &format!("{name}.pan"),
            &format!("object template {name};\n{body}"),
        )
    }

    /// Writes an ordinary template `name` into `repo`.
    pub fn template(&self, repo: &str, name: &str, body: &str) -> PathBuf {
        self.write(
            repo,
            &format!("{name}.pan"),
            &format!("template {name};\n{body}"),
        )
    }

    /// Compiler options over `repos` (in search order) writing JSON profiles.
    pub fn options(&self, repos: &[&str]) -> CompilerOptions {
        let mut options = CompilerOptions::new(self.repository(repos), self.output_dir());
        options.formatters = json();
        options.threads = ThreadCounts::uniform(4);
        options
    }

    /// A compiler built from [`options`](Self::options).
    pub fn compiler(&self, repos: &[&str]) -> Compiler {
        Compiler::new(self.options(repos)).expect("valid options")
    }

    /// A dependency checker over `repos` for JSON profiles.
    pub fn checker(&self, repos: &[&str]) -> DependencyChecker {
        DependencyChecker::new(self.repository(repos), self.output_dir(), json())
    }

    /// The output file of object `name` for `formatter`.
    pub fn target(&self, formatter: &dyn Formatter, name: &str) -> PathBuf {
        self.output_dir().join(formatter.result_path(&self::name(name)))
    }

    /// The dependency record of object `name`.
    pub fn dep_file(&self, name: &str) -> PathBuf {
        panc_cache::DependencyRecord::path_for(&self.output_dir(), &self::name(name))
    }

    fn repository(&self, repos: &[&str]) -> SourceRepository {
        SourceRepository::new(repos.iter().map(|r| self.repo(r)).collect())
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

/// The JSON formatter as a formatter list.
pub fn json() -> Vec<Arc<dyn Formatter>> {
    vec![Arc::new(JsonFormatter)]
}

/// Parses a template name.
pub fn name(s: &str) -> TemplateName {
    TemplateName::parse(s).expect("valid template name")
}

/// The modification time of `path`.
pub fn mtime(path: &Path) -> SystemTime {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .expect("file has an mtime")
}

/// Sets the modification time of `path`.
pub fn set_mtime(path: &Path, time: SystemTime) {
    filetime::set_file_mtime(path, FileTime::from_system_time(time)).expect("set mtime");
}

/// Moves the mtime of `path` to `secs` seconds after (positive) or before
/// (negative) the mtime of `reference`.
pub fn set_mtime_relative(path: &Path, reference: &Path, secs: i64) {
    let base = mtime(reference);
    let offset = Duration::from_secs(secs.unsigned_abs());
    let time = if secs >= 0 { base + offset } else { base - offset };
    set_mtime(path, time);
}
