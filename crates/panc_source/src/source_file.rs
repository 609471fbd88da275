//! A single source entity consulted while building an artifact.

use std::fmt;
use std::path::{Path, PathBuf};

use panc_common::{SourceKind, TemplateName};

use crate::error::SourceError;

/// A template or text file that a build looked up, whether or not it exists.
///
/// Present kinds carry the absolute path they resolved to; the path always
/// ends with the name plus the kind's extension, so the search directory it
/// was found under can be recovered with [`location`](SourceFile::location).
/// Absent kinds never carry a path.
///
/// Entities order by name, then kind, then path, which gives dependency
/// records a stable line order.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceFile {
    name: TemplateName,
    kind: SourceKind,
    path: Option<PathBuf>,
}

impl SourceFile {
    /// Creates a source entity, checking that the path agrees with the kind
    /// and the name.
    pub fn new(
        name: TemplateName,
        kind: SourceKind,
        path: Option<PathBuf>,
    ) -> Result<Self, SourceError> {
        match (&path, kind.is_absent()) {
            (None, false) => {
                return Err(SourceError::MissingPath {
                    name: name.to_string(),
                    kind,
                })
            }
            (Some(p), true) => {
                return Err(SourceError::UnexpectedPath {
                    name: name.to_string(),
                    kind,
                    path: p.clone(),
                })
            }
            (Some(p), false) => {
                if !p.ends_with(name.local_path(kind.extension())) {
                    return Err(SourceError::NameMismatch {
                        name: name.to_string(),
                        path: p.clone(),
                    });
                }
            }
            (None, true) => {}
        }
        Ok(Self { name, kind, path })
    }

    /// Creates an entity recording that a lookup for `name` found nothing.
    ///
    /// `kind` is normalized to the matching absent kind.
    pub fn absent(name: TemplateName, kind: SourceKind) -> Self {
        let kind = if kind.is_text() {
            SourceKind::AbsentText
        } else {
            SourceKind::AbsentSource
        };
        Self {
            name,
            kind,
            path: None,
        }
    }

    /// The name this entity was looked up by.
    pub fn name(&self) -> &TemplateName {
        &self.name
    }

    /// The kind of the entity.
    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// The resolved file path, for present kinds.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether the lookup found nothing.
    pub fn is_absent(&self) -> bool {
        self.kind.is_absent()
    }

    /// The search directory this entity resolved under: the path with the
    /// `name + extension` tail removed.
    pub fn location(&self) -> Option<PathBuf> {
        let path = self.path.as_deref()?;
        let depth = self.name.as_str().split('/').count();
        path.ancestors().nth(depth).map(Path::to_path_buf)
    }

    /// Reads the file contents as UTF-8 text.
    pub fn read_to_string(&self) -> Result<String, SourceError> {
        let Some(path) = self.path.as_deref() else {
            return Err(SourceError::MissingPath {
                name: self.name.to_string(),
                kind: self.kind,
            });
        };
        std::fs::read_to_string(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl fmt::Display for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location() {
            Some(dir) => write!(f, "{} {} {}", self.name, self.kind, dir.display()),
            None => write!(f, "{} {}", self.name, self.kind),
        }
    }
}
