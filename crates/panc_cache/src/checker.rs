//! Decides whether an object template must be rebuilt.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use panc_common::TemplateName;
use panc_output::Formatter;
use panc_source::{SourceFile, SourceRepository};
use rayon::prelude::*;
use regex::Regex;

use crate::error::CacheError;
use crate::record::{DependencyEntry, DependencyRecord};
use crate::stat::FileStatCache;

/// Result of checking one object template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Staleness {
    /// Every target exists and nothing the object depends on has changed.
    Current,
    /// The object must be rebuilt, for the given reason.
    Outdated(String),
}

impl Staleness {
    /// Whether the object must be rebuilt.
    pub fn is_outdated(&self) -> bool {
        matches!(self, Staleness::Outdated(_))
    }
}

/// Compares an object's output files and dependency record with the current
/// state of the include path.
///
/// An object is current only if every configured target exists, the record
/// is at least as new as the oldest target, and every recorded dependency
/// still resolves the way it did. Unreadable templates, unreadable or
/// malformed records and every other failure count as outdated.
pub struct DependencyChecker {
    repository: SourceRepository,
    output_dir: PathBuf,
    formatters: Vec<Arc<dyn Formatter>>,
    ignore: Option<Regex>,
}

impl DependencyChecker {
    /// Creates a checker for targets produced by `formatters` under
    /// `output_dir`.
    pub fn new(
        repository: SourceRepository,
        output_dir: impl Into<PathBuf>,
        formatters: Vec<Arc<dyn Formatter>>,
    ) -> Self {
        Self {
            repository,
            output_dir: output_dir.into(),
            formatters,
            ignore: None,
        }
    }

    /// Skips dependencies whose whole name matches `pattern`.
    pub fn with_ignore_pattern(mut self, pattern: &str) -> Result<Self, CacheError> {
        self.ignore = Some(Regex::new(&format!("^(?:{pattern})$"))?);
        Ok(self)
    }

    /// Whether the object template in `file` must be rebuilt.
    pub fn is_outdated(&self, file: &Path) -> bool {
        self.check(file, &FileStatCache::new()).is_outdated()
    }

    /// Returns the files that must be rebuilt, in input order.
    ///
    /// All files are checked against one [`FileStatCache`], so shared
    /// dependencies are stat'ed once.
    pub fn filter_outdated(&self, files: &[PathBuf]) -> Vec<PathBuf> {
        let stats = FileStatCache::new();
        files
            .par_iter()
            .filter(|file| self.check(file, &stats).is_outdated())
            .cloned()
            .collect()
    }

    /// Checks one object template using the given stat cache.
    pub fn check(&self, file: &Path, stats: &FileStatCache) -> Staleness {
        let staleness = match self.staleness(file, stats) {
            Ok(staleness) => staleness,
            Err(err) => {
                tracing::warn!(file = %file.display(), error = %err, "dependency check failed");
                Staleness::Outdated(err.to_string())
            }
        };
        if let Staleness::Outdated(reason) = &staleness {
            tracing::debug!(file = %file.display(), reason = %reason, "outdated");
        }
        staleness
    }

    fn staleness(&self, file: &Path, stats: &FileStatCache) -> Result<Staleness, CacheError> {
        let name = declared_name(file)?;

        let mut oldest_target: Option<SystemTime> = None;
        for formatter in &self.formatters {
            let target = self.output_dir.join(formatter.result_path(&name));
            let Some(mtime) = stats.mtime(&target) else {
                return Ok(outdated(format!("target {} is missing", target.display())));
            };
            oldest_target = Some(oldest_target.map_or(mtime, |t| t.min(mtime)));
        }
        let Some(target_time) = oldest_target else {
            return Ok(outdated("no output formats are configured".to_string()));
        };

        let record_path = DependencyRecord::path_for(&self.output_dir, &name);
        if stats.is_missing_or_modified_before(&record_path, target_time) {
            return Ok(outdated(format!(
                "dependency record {} is missing or older than its targets",
                record_path.display()
            )));
        }

        let record = DependencyRecord::read(&record_path)?;
        for entry in record.entries() {
            if self.is_ignored(&entry.name) {
                continue;
            }
            if let Some(reason) = self.entry_staleness(entry, target_time, stats) {
                return Ok(outdated(reason));
            }
        }
        Ok(Staleness::Current)
    }

    fn is_ignored(&self, name: &TemplateName) -> bool {
        self.ignore
            .as_ref()
            .is_some_and(|re| re.is_match(name.as_str()))
    }

    fn entry_staleness(
        &self,
        entry: &DependencyEntry,
        target_time: SystemTime,
        stats: &FileStatCache,
    ) -> Option<String> {
        let current = self.lookup(entry, stats);
        match entry.file() {
            None => current
                .path()
                .map(|p| format!("{} now exists at {}", entry.name, p.display())),
            Some(recorded) => {
                if stats.is_missing_or_modified_after(&recorded, target_time) {
                    return Some(format!(
                        "{} is missing or newer than the targets",
                        recorded.display()
                    ));
                }
                // A dependency found nowhere on the path keeps the object current.
                match current.path() {
                    Some(found) if found != recorded => Some(format!(
                        "{} now resolves to {}",
                        entry.name,
                        found.display()
                    )),
                    _ => None,
                }
            }
        }
    }

    fn lookup(&self, entry: &DependencyEntry, stats: &FileStatCache) -> SourceFile {
        let exists = |p: &Path| stats.exists(p);
        if entry.kind.is_text() {
            self.repository.lookup_text_with(&entry.name, exists)
        } else {
            self.repository.lookup_template_with(&entry.name, exists)
        }
    }
}

fn outdated(reason: String) -> Staleness {
    Staleness::Outdated(reason)
}

fn declared_name(file: &Path) -> Result<TemplateName, CacheError> {
    let text = fs::read_to_string(file).map_err(|source| CacheError::Io {
        path: file.to_path_buf(),
        source,
    })?;
    panc_template::parse_header(file, &text)
        .map(|header| header.name)
        .map_err(|e| CacheError::TemplateName {
            path: file.to_path_buf(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::DepFormatter;
    use filetime::{set_file_mtime, FileTime};
    use panc_output::JsonFormatter;
    use tempfile::TempDir;

    struct Fixture {
        _tmp: TempDir,
        repo: PathBuf,
        out: PathBuf,
    }

    const BUILT: i64 = 2_000_000;

    fn at(secs: i64) -> FileTime {
        FileTime::from_unix_time(secs, 0)
    }

    fn write(path: &Path, text: &str, mtime: i64) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
        set_file_mtime(path, at(mtime)).unwrap();
    }

    impl Fixture {
        /// An object `n1` including `inc`, built at `BUILT`.
        fn new() -> Self {
            let tmp = TempDir::new().unwrap();
            let repo = tmp.path().join("repo");
            let out = tmp.path().join("out");
            let fx = Fixture {
                _tmp: tmp,
                repo,
                out,
            };
            write(&fx.repo.join("n1.pan"), "object template n1;\ninclude inc;\n", BUILT - 10);
            write(&fx.repo.join("inc.pan"), "template inc;\n", BUILT - 10);
            write(&fx.out.join("n1.json"), "{}\n", BUILT);
            let uri = url::Url::from_directory_path(&fx.repo).unwrap();
            write(
                &fx.out.join("n1.dep"),
                &format!("inc PAN {uri}\nn1 PAN {uri}\nmissing ABSENT_SOURCE\n"),
                BUILT,
            );
            fx
        }

        fn checker(&self) -> DependencyChecker {
            DependencyChecker::new(
                SourceRepository::new(vec![self.repo.clone()]),
                &self.out,
                vec![Arc::new(JsonFormatter) as Arc<dyn Formatter>],
            )
        }

        fn object(&self) -> PathBuf {
            self.repo.join("n1.pan")
        }
    }

    #[test]
    fn fresh_build_is_current() {
        let fx = Fixture::new();
        assert_eq!(fx.checker().check(&fx.object(), &FileStatCache::new()), Staleness::Current);
    }

    #[test]
    fn missing_target_is_outdated() {
        let fx = Fixture::new();
        fs::remove_file(fx.out.join("n1.json")).unwrap();
        assert!(fx.checker().is_outdated(&fx.object()));
    }

    #[test]
    fn record_older_than_target_is_outdated() {
        let fx = Fixture::new();
        set_file_mtime(fx.out.join("n1.dep"), at(BUILT - 1)).unwrap();
        assert!(fx.checker().is_outdated(&fx.object()));
    }

    #[test]
    fn dependency_modified_after_build_is_outdated() {
        let fx = Fixture::new();
        set_file_mtime(fx.repo.join("inc.pan"), at(BUILT + 1)).unwrap();
        assert!(fx.checker().is_outdated(&fx.object()));
    }

    #[test]
    fn dependency_modified_at_build_time_is_current() {
        let fx = Fixture::new();
        set_file_mtime(fx.repo.join("inc.pan"), at(BUILT)).unwrap();
        assert!(!fx.checker().is_outdated(&fx.object()));
    }

    #[test]
    fn absent_dependency_appearing_is_outdated() {
        let fx = Fixture::new();
        write(&fx.repo.join("missing.tpl"), "template missing;\n", BUILT - 10);
        assert!(fx.checker().is_outdated(&fx.object()));
    }

    #[test]
    fn ignored_dependency_does_not_count() {
        let fx = Fixture::new();
        write(&fx.repo.join("missing.tpl"), "template missing;\n", BUILT - 10);
        let checker = fx.checker().with_ignore_pattern("miss.*").unwrap();
        assert!(!checker.is_outdated(&fx.object()));
        let partial = fx.checker().with_ignore_pattern("miss").unwrap();
        assert!(partial.is_outdated(&fx.object()));
    }

    #[test]
    fn malformed_record_is_outdated() {
        let fx = Fixture::new();
        write(&fx.out.join("n1.dep"), "inc PANX file:///x/\n", BUILT);
        assert!(fx.checker().is_outdated(&fx.object()));
    }

    #[test]
    fn unreadable_template_is_outdated() {
        let fx = Fixture::new();
        assert!(fx.checker().is_outdated(&fx.repo.join("nope.pan")));
    }

    #[test]
    fn every_formatter_target_must_exist() {
        let fx = Fixture::new();
        let checker = DependencyChecker::new(
            SourceRepository::new(vec![fx.repo.clone()]),
            &fx.out,
            vec![
                Arc::new(JsonFormatter) as Arc<dyn Formatter>,
                Arc::new(panc_output::TxtFormatter),
            ],
        );
        assert!(checker.is_outdated(&fx.object()));
        write(&fx.out.join("n1.txt"), "", BUILT);
        assert!(!checker.is_outdated(&fx.object()));
    }

    #[test]
    fn no_formatters_means_outdated() {
        let fx = Fixture::new();
        let checker = DependencyChecker::new(SourceRepository::new(vec![fx.repo.clone()]), &fx.out, vec![]);
        assert!(checker.is_outdated(&fx.object()));
    }

    #[test]
    fn filter_keeps_input_order() {
        let fx = Fixture::new();
        let ghost = fx.repo.join("ghost.pan");
        let files = vec![ghost.clone(), fx.object(), fx.repo.join("other.pan")];
        assert_eq!(
            fx.checker().filter_outdated(&files),
            vec![ghost, fx.repo.join("other.pan")]
        );
    }

    #[test]
    fn dep_formatter_path_matches_record_path() {
        let n1 = TemplateName::parse("n1").unwrap();
        let fx = Fixture::new();
        assert_eq!(
            fx.out.join(DepFormatter.result_path(&n1)),
            DependencyRecord::path_for(&fx.out, &n1)
        );
    }
}
