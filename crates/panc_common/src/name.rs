//! Validated, namespaced template names.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::NameError;

/// A namespaced template name such as `site/os/kernel`.
///
/// Names are `/`-separated segments built from `[A-Za-z0-9_.+-]`. They never
/// start or end with `/`, never contain `//`, and never contain `.` or `..`
/// segments, so converting a name to a relative file path cannot escape the
/// directory it is joined onto.
///
/// The name of an object template doubles as the artifact name: every
/// pipeline cache is keyed by it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateName(String);

impl TemplateName {
    /// Parses and validates a template name.
    pub fn parse(name: &str) -> Result<Self, NameError> {
        if name.is_empty() {
            return Err(NameError::Empty);
        }
        for segment in name.split('/') {
            if segment.is_empty() {
                return Err(NameError::EmptySegment {
                    name: name.to_string(),
                });
            }
            if segment == "." || segment == ".." {
                return Err(NameError::RelativeSegment {
                    name: name.to_string(),
                });
            }
            if let Some(ch) = segment.chars().find(|c| !is_name_char(*c)) {
                return Err(NameError::InvalidChar {
                    name: name.to_string(),
                    ch,
                });
            }
        }
        Ok(Self(name.to_string()))
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the relative file path for this name with the given extension
    /// appended verbatim (pass `""` for text files).
    pub fn local_path(&self, extension: &str) -> PathBuf {
        let mut path = PathBuf::new();
        let mut segments = self.0.split('/').peekable();
        while let Some(segment) = segments.next() {
            if segments.peek().is_none() {
                path.push(format!("{segment}{extension}"));
            } else {
                path.push(segment);
            }
        }
        path
    }

    /// Returns the namespace part of the name (everything before the last `/`),
    /// or `None` for a name with a single segment.
    pub fn namespace(&self) -> Option<&str> {
        self.0.rsplit_once('/').map(|(ns, _)| ns)
    }
}

/// Returns true for characters allowed inside a name segment.
pub(crate) fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '+' | '-')
}

impl fmt::Display for TemplateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TemplateName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for TemplateName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
