//! Kinds of source entities consulted while building an artifact.

use std::fmt;
use std::str::FromStr;

/// The kind of a source entity recorded in a dependency record.
///
/// Present kinds (`Tpl`, `Pan`, `Text`) resolve to a file under some search
/// directory. Absent kinds record that a lookup was attempted and found
/// nothing; they matter because a file appearing later would change the
/// result of the build.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceKind {
    /// A template with the `.tpl` extension.
    Tpl,
    /// A template with the `.pan` extension.
    Pan,
    /// A text file read or probed by name, without extension.
    Text,
    /// A template lookup that found nothing.
    AbsentSource,
    /// A text file lookup that found nothing.
    AbsentText,
}

/// Template extensions in lookup order.
pub const TEMPLATE_KINDS: [SourceKind; 2] = [SourceKind::Pan, SourceKind::Tpl];

/// Error returned when a kind token is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown source kind '{0}'")]
pub struct UnknownKind(pub String);

impl SourceKind {
    /// Returns the file extension for this kind, including the leading dot.
    ///
    /// Text files and absent kinds have no extension.
    pub fn extension(self) -> &'static str {
        match self {
            SourceKind::Tpl => ".tpl",
            SourceKind::Pan => ".pan",
            SourceKind::Text | SourceKind::AbsentSource | SourceKind::AbsentText => "",
        }
    }

    /// Returns the token used for this kind in dependency records.
    pub fn token(self) -> &'static str {
        match self {
            SourceKind::Tpl => "TPL",
            SourceKind::Pan => "PAN",
            SourceKind::Text => "TEXT",
            SourceKind::AbsentSource => "ABSENT_SOURCE",
            SourceKind::AbsentText => "ABSENT_TEXT",
        }
    }

    /// Whether this kind records a lookup that found nothing.
    pub fn is_absent(self) -> bool {
        matches!(self, SourceKind::AbsentSource | SourceKind::AbsentText)
    }

    /// Whether this kind refers to a template (present or absent).
    pub fn is_source(self) -> bool {
        matches!(
            self,
            SourceKind::Tpl | SourceKind::Pan | SourceKind::AbsentSource
        )
    }

    /// Whether this kind refers to a text file (present or absent).
    pub fn is_text(self) -> bool {
        matches!(self, SourceKind::Text | SourceKind::AbsentText)
    }

    /// Returns the template kind matching a file extension (with leading dot).
    pub fn from_template_extension(ext: &str) -> Option<SourceKind> {
        TEMPLATE_KINDS.into_iter().find(|k| k.extension() == ext)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for SourceKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TPL" => Ok(SourceKind::Tpl),
            "PAN" => Ok(SourceKind::Pan),
            "TEXT" => Ok(SourceKind::Text),
            "ABSENT_SOURCE" => Ok(SourceKind::AbsentSource),
            "ABSENT_TEXT" => Ok(SourceKind::AbsentText),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}
