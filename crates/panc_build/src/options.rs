//! Compiler options.

use std::path::PathBuf;
use std::sync::Arc;

use panc_config::{available_threads, ResolvedConfig, ThreadConfig};
use panc_output::{formatter_for, Formatter};
use panc_source::SourceRepository;

/// Worker threads per stage family. Zero means one per available CPU.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ThreadCounts {
    /// Compile pool size.
    pub compile: usize,
    /// Build pool size.
    pub build: usize,
    /// Pool size shared by both validation stages.
    pub validate: usize,
    /// Emit pool size.
    pub emit: usize,
}

impl ThreadCounts {
    /// The same count for every family.
    pub fn uniform(threads: usize) -> Self {
        Self {
            compile: threads,
            build: threads,
            validate: threads,
            emit: threads,
        }
    }

    /// Replaces zero counts with the number of available CPUs.
    pub fn resolved(self) -> Self {
        let cpus = available_threads();
        let or_cpus = |n: usize| if n == 0 { cpus } else { n };
        Self {
            compile: or_cpus(self.compile),
            build: or_cpus(self.build),
            validate: or_cpus(self.validate),
            emit: or_cpus(self.emit),
        }
    }
}

impl From<ThreadConfig> for ThreadCounts {
    fn from(config: ThreadConfig) -> Self {
        Self {
            compile: config.compile,
            build: config.build,
            validate: config.validate,
            emit: config.emit,
        }
    }
}

/// Everything a [`Compiler`](crate::Compiler) needs to know about a run.
#[derive(Clone)]
pub struct CompilerOptions {
    /// Where templates and text files are looked up.
    pub repository: SourceRepository,
    /// Root directory of all output files.
    pub output_dir: PathBuf,
    /// Active output formats. With none, objects stop after validation.
    pub formatters: Vec<Arc<dyn Formatter>>,
    /// Maximum nesting of `include` and `create`.
    pub max_recursion: usize,
    /// Dependency names the staleness check ignores (full match).
    pub ignore_dependency_pattern: Option<String>,
    /// Only parse the requested files.
    pub syntax_only: bool,
    /// Pool sizes.
    pub threads: ThreadCounts,
}

impl CompilerOptions {
    /// Options with no formatters and default limits.
    pub fn new(repository: SourceRepository, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            repository,
            output_dir: output_dir.into(),
            formatters: Vec::new(),
            max_recursion: panc_template::EvalOptions::default().max_recursion,
            ignore_dependency_pattern: None,
            syntax_only: false,
            threads: ThreadCounts::default(),
        }
    }

    /// Options equivalent to a resolved `panc.toml`.
    pub fn from_config(config: &ResolvedConfig) -> Self {
        let repository = match &config.session_dir {
            Some(session) => {
                SourceRepository::with_session_dir(config.include_dirs.clone(), session.clone())
            }
            None => SourceRepository::new(config.include_dirs.clone()),
        };
        Self {
            repository,
            output_dir: config.output_dir.clone(),
            formatters: config
                .formats
                .iter()
                .map(|&format| formatter_for(format, config.gzip))
                .collect(),
            max_recursion: config.max_recursion,
            ignore_dependency_pattern: config.ignore_dependency_pattern.clone(),
            syntax_only: config.syntax_only,
            threads: config.threads.into(),
        }
    }
}

impl std::fmt::Debug for CompilerOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let formats: Vec<&str> = self.formatters.iter().map(|fmt| fmt.key()).collect();
        f.debug_struct("CompilerOptions")
            .field("repository", &self.repository)
            .field("output_dir", &self.output_dir)
            .field("formatters", &formats)
            .field("max_recursion", &self.max_recursion)
            .field("ignore_dependency_pattern", &self.ignore_dependency_pattern)
            .field("syntax_only", &self.syntax_only)
            .field("threads", &self.threads)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use panc_config::OutputFormat;
    use std::path::Path;

    #[test]
    fn zero_threads_resolve_to_cpus() {
        let counts = ThreadCounts {
            compile: 0,
            build: 3,
            validate: 0,
            emit: 1,
        }
        .resolved();
        assert_eq!(counts.compile, available_threads());
        assert_eq!(counts.build, 3);
        assert_eq!(counts.emit, 1);
    }

    #[test]
    fn from_config_maps_formats_and_session() {
        let config = ResolvedConfig {
            include_dirs: vec![PathBuf::from("/p/site")],
            session_dir: Some(PathBuf::from("/p/session")),
            output_dir: PathBuf::from("/p/out"),
            formats: vec![OutputFormat::Json, OutputFormat::Pan],
            gzip: true,
            ignore_dependency_pattern: Some("ns/.*".into()),
            max_recursion: 7,
            syntax_only: false,
            threads: ThreadConfig {
                compile: 1,
                build: 2,
                validate: 3,
                emit: 4,
            },
        };
        let options = CompilerOptions::from_config(&config);
        assert_eq!(options.repository.session_dir(), Some(Path::new("/p/session")));
        let keys: Vec<_> = options.formatters.iter().map(|f| f.key()).collect();
        assert_eq!(keys, ["json", "pan"]);
        assert!(options.formatters[0].suffix().ends_with(".gz"));
        assert_eq!(options.max_recursion, 7);
        assert_eq!(options.threads.validate, 3);
    }
}
