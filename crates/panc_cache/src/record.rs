//! The dependency record written next to every profile.
//!
//! A record lists every source entity consulted while building an object,
//! one per line, sorted:
//!
//! ```text
//! site/node01 PAN file:///srv/profiles/
//! site/base TPL file:///srv/shared/
//! files/motd ABSENT_TEXT
//! ```
//!
//! Present kinds carry the URI of the search directory the file was found
//! in; absent kinds carry nothing else.

use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use panc_common::{SourceKind, TemplateName};
use panc_output::{Formatter, OutputError, Profile};
use panc_source::SourceFile;
use url::Url;

use crate::error::CacheError;

/// File suffix of dependency records, without the leading dot.
pub const DEP_SUFFIX: &str = "dep";

/// One line of a dependency record.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct DependencyEntry {
    /// The template or text file name.
    pub name: TemplateName,
    /// How the name was found, or that it was not.
    pub kind: SourceKind,
    /// The search directory holding the file; `None` for absent kinds.
    pub location: Option<PathBuf>,
}

impl DependencyEntry {
    /// The full path of the recorded file, for present kinds.
    pub fn file(&self) -> Option<PathBuf> {
        self.location
            .as_ref()
            .map(|dir| dir.join(self.name.local_path(self.kind.extension())))
    }

    fn render(&self) -> Result<String, CacheError> {
        match &self.location {
            None => Ok(format!("{} {}", self.name, self.kind.token())),
            Some(dir) => {
                let uri = Url::from_directory_path(dir).map_err(|()| CacheError::InvalidLocation {
                    location: dir.display().to_string(),
                })?;
                Ok(format!("{} {} {}", self.name, self.kind.token(), uri))
            }
        }
    }

    fn parse(text: &str, line: usize) -> Result<Self, CacheError> {
        let malformed = |reason: String| CacheError::MalformedLine { line, reason };
        let fields: Vec<&str> = text.split_whitespace().collect();
        if fields.len() < 2 || fields.len() > 3 {
            return Err(malformed(format!("expected 2 or 3 fields, found {}", fields.len())));
        }
        let name = TemplateName::parse(fields[0]).map_err(|e| malformed(e.to_string()))?;
        let kind = fields[1]
            .parse::<SourceKind>()
            .map_err(|e| malformed(e.to_string()))?;
        let location = match (kind.is_absent(), fields.get(2)) {
            (true, None) => None,
            (false, Some(uri)) => Some(directory_from_uri(uri)?),
            (true, Some(_)) => {
                return Err(malformed(format!("{} entries take no location", kind.token())))
            }
            (false, None) => {
                return Err(malformed(format!("{} entries need a location", kind.token())))
            }
        };
        Ok(Self {
            name,
            kind,
            location,
        })
    }
}

fn directory_from_uri(text: &str) -> Result<PathBuf, CacheError> {
    let invalid = || CacheError::InvalidLocation {
        location: text.to_string(),
    };
    let uri = Url::parse(text).map_err(|_| invalid())?;
    if uri.scheme() != "file" {
        return Err(invalid());
    }
    uri.to_file_path().map_err(|()| invalid())
}

impl From<&SourceFile> for DependencyEntry {
    fn from(source: &SourceFile) -> Self {
        Self {
            name: source.name().clone(),
            kind: source.kind(),
            location: source.location(),
        }
    }
}

/// The parsed contents of a dependency record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DependencyRecord {
    entries: Vec<DependencyEntry>,
}

impl DependencyRecord {
    /// Builds a record from the source entities an object consulted.
    pub fn from_sources<'a>(sources: impl IntoIterator<Item = &'a SourceFile>) -> Self {
        let entries: BTreeSet<DependencyEntry> =
            sources.into_iter().map(DependencyEntry::from).collect();
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// The entries, in file order.
    pub fn entries(&self) -> &[DependencyEntry] {
        &self.entries
    }

    /// Renders the record text, one newline-terminated line per entry.
    pub fn render(&self) -> Result<String, CacheError> {
        let mut text = String::new();
        for entry in &self.entries {
            text.push_str(&entry.render()?);
            text.push('\n');
        }
        Ok(text)
    }

    /// Parses record text. Any malformed line fails the whole record.
    pub fn parse(text: &str) -> Result<Self, CacheError> {
        let entries = text
            .lines()
            .enumerate()
            .map(|(i, line)| DependencyEntry::parse(line, i + 1))
            .collect::<Result<_, _>>()?;
        Ok(Self { entries })
    }

    /// Reads and parses a record file.
    pub fn read(path: &Path) -> Result<Self, CacheError> {
        let text = fs::read_to_string(path).map_err(|source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// The record file for `name` under `output_dir`.
    pub fn path_for(output_dir: &Path, name: &TemplateName) -> PathBuf {
        output_dir.join(DepFormatter.result_path(name))
    }
}

/// Writes an object's dependency record as `<name>.dep`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DepFormatter;

impl Formatter for DepFormatter {
    fn key(&self) -> &'static str {
        "dep"
    }

    fn suffix(&self) -> String {
        DEP_SUFFIX.to_string()
    }

    fn write(&self, profile: &Profile<'_>, out: &mut dyn Write) -> Result<(), OutputError> {
        let text = DependencyRecord::from_sources(profile.dependencies)
            .render()
            .map_err(|e| OutputError::Unrepresentable {
                format: "dep",
                path: profile.name.to_string(),
                what: e.to_string(),
            })?;
        out.write_all(text.as_bytes())
            .map_err(|source| OutputError::Io { format: "dep", source })
    }
}
