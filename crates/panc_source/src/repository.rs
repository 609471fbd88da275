//! Template and text lookup across the include path.

use std::path::{Path, PathBuf};

use panc_common::{SourceKind, TemplateName, TEMPLATE_KINDS};

use crate::source_file::SourceFile;

/// Outcome of probing one directory for a name.
enum Probe {
    Found(PathBuf, SourceKind),
    Deleted,
    NotFound,
}

/// Resolves names to files using an ordered list of include directories.
///
/// When a session directory is configured it is consulted before each include
/// directory. A `<name>.del` marker in a directory hides that name there: a
/// marker in the session directory hides the name everywhere, a marker in an
/// include directory only skips that directory.
///
/// Within one directory templates are tried as `.pan` first, then `.tpl`.
#[derive(Clone, Debug)]
pub struct SourceRepository {
    include_dirs: Vec<PathBuf>,
    session_dir: Option<PathBuf>,
}

impl SourceRepository {
    /// Creates a repository over the given include directories.
    pub fn new(include_dirs: Vec<PathBuf>) -> Self {
        Self {
            include_dirs,
            session_dir: None,
        }
    }

    /// Creates a repository whose lookups consult `session_dir` first.
    pub fn with_session_dir(include_dirs: Vec<PathBuf>, session_dir: PathBuf) -> Self {
        Self {
            include_dirs,
            session_dir: Some(session_dir),
        }
    }

    /// The include directories, in search order.
    pub fn include_dirs(&self) -> &[PathBuf] {
        &self.include_dirs
    }

    /// The session overlay directory, if any.
    pub fn session_dir(&self) -> Option<&Path> {
        self.session_dir.as_deref()
    }

    /// Looks up a template by name.
    ///
    /// Returns a present [`SourceFile`] of kind `Pan` or `Tpl`, or an
    /// `AbsentSource` entity when nothing matches.
    pub fn lookup_template(&self, name: &TemplateName) -> SourceFile {
        self.lookup_template_with(name, |p| p.is_file())
    }

    /// Looks up a text file by name.
    ///
    /// Returns a present `Text` entity or an `AbsentText` entity.
    pub fn lookup_text(&self, name: &TemplateName) -> SourceFile {
        self.lookup_text_with(name, |p| p.is_file())
    }

    /// Like [`lookup_template`](Self::lookup_template), but asks `exists`
    /// instead of the filesystem whether a candidate file is there.
    pub fn lookup_template_with(
        &self,
        name: &TemplateName,
        exists: impl Fn(&Path) -> bool,
    ) -> SourceFile {
        self.lookup(name, &TEMPLATE_KINDS, &exists)
            .unwrap_or_else(|| SourceFile::absent(name.clone(), SourceKind::AbsentSource))
    }

    /// Like [`lookup_text`](Self::lookup_text), but asks `exists` instead of
    /// the filesystem whether a candidate file is there.
    pub fn lookup_text_with(&self, name: &TemplateName, exists: impl Fn(&Path) -> bool) -> SourceFile {
        self.lookup(name, &[SourceKind::Text], &exists)
            .unwrap_or_else(|| SourceFile::absent(name.clone(), SourceKind::AbsentText))
    }

    fn lookup(
        &self,
        name: &TemplateName,
        kinds: &[SourceKind],
        exists: &dyn Fn(&Path) -> bool,
    ) -> Option<SourceFile> {
        'dirs: for dir in &self.include_dirs {
            if let Some(session) = &self.session_dir {
                match probe(session, name, kinds, exists) {
                    Probe::Found(path, kind) => return present(name, kind, path),
                    Probe::Deleted => continue 'dirs,
                    Probe::NotFound => {}
                }
            }
            match probe(dir, name, kinds, exists) {
                Probe::Found(path, kind) => return present(name, kind, path),
                Probe::Deleted | Probe::NotFound => {}
            }
        }
        None
    }

    /// Returns the template name a file would be found under, if the file lies
    /// beneath one of the search directories and has a template extension.
    pub fn template_name_for(&self, file: &Path) -> Option<TemplateName> {
        let kind = TEMPLATE_KINDS.into_iter().find(|k| {
            file.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| k.extension().strip_prefix('.') == Some(e))
        })?;
        self.session_dir
            .iter()
            .chain(self.include_dirs.iter())
            .find_map(|dir| {
                let rel = file.strip_prefix(dir).ok()?;
                let rel = rel.to_str()?.replace(std::path::MAIN_SEPARATOR, "/");
                let stem = rel.strip_suffix(kind.extension())?;
                TemplateName::parse(stem).ok()
            })
    }
}

fn probe(
    dir: &Path,
    name: &TemplateName,
    kinds: &[SourceKind],
    exists: &dyn Fn(&Path) -> bool,
) -> Probe {
    if exists(&dir.join(name.local_path(".del"))) {
        return Probe::Deleted;
    }
    for &kind in kinds {
        let candidate = dir.join(name.local_path(kind.extension()));
        if exists(&candidate) {
            return Probe::Found(candidate, kind);
        }
    }
    Probe::NotFound
}

fn present(name: &TemplateName, kind: SourceKind, path: PathBuf) -> Option<SourceFile> {
    match SourceFile::new(name.clone(), kind, Some(path)) {
        Ok(sf) => Some(sf),
        Err(err) => {
            tracing::warn!(name = %name, error = %err, "ignoring inconsistent lookup result");
            None
        }
    }
}
