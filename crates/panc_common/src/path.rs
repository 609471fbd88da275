//! Paths into a configuration tree.

use std::fmt;
use std::str::FromStr;

use crate::error::PathError;
use crate::name::{is_name_char, TemplateName};

/// One step of a tree path: a dictionary key or a list index.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathTerm {
    /// A dictionary key.
    Key(String),
    /// A zero-based list index.
    Index(usize),
}

impl PathTerm {
    fn parse(term: &str, path: &str) -> Result<Self, PathError> {
        let invalid = || PathError::InvalidTerm {
            path: path.to_string(),
            term: term.to_string(),
        };
        if term.is_empty() {
            return Err(invalid());
        }
        if term.bytes().all(|b| b.is_ascii_digit()) {
            return term.parse().map(PathTerm::Index).map_err(|_| invalid());
        }
        if term.chars().all(is_name_char) {
            Ok(PathTerm::Key(term.to_string()))
        } else {
            Err(invalid())
        }
    }
}

impl fmt::Display for PathTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathTerm::Key(k) => f.write_str(k),
            PathTerm::Index(i) => write!(f, "{i}"),
        }
    }
}

/// A parsed configuration tree path.
///
/// Three forms exist:
///
/// - absolute, `/system/hostname`, addressing the tree being built;
/// - relative, `hostname`, used inside structure templates;
/// - external, `site/node02:/system/hostname` (or the older
///   `//node02/system/hostname`), addressing another object's tree.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TreePath {
    /// A path rooted at the current object's tree.
    Absolute(Vec<PathTerm>),
    /// A path relative to the structure being built.
    Relative(Vec<PathTerm>),
    /// A path into another object template's tree.
    External {
        /// The object template owning the tree.
        authority: TemplateName,
        /// Terms from that tree's root.
        terms: Vec<PathTerm>,
    },
}

impl TreePath {
    /// Parses a path string.
    pub fn parse(path: &str) -> Result<Self, PathError> {
        if path.is_empty() {
            return Err(PathError::Empty);
        }
        if let Some(rest) = path.strip_prefix("//") {
            let (authority, tail) = match rest.split_once('/') {
                Some((a, t)) => (a, t),
                None => (rest, ""),
            };
            return Ok(TreePath::External {
                authority: parse_authority(authority, path)?,
                terms: parse_terms(tail, path)?,
            });
        }
        if let Some((authority, tail)) = path.split_once(':') {
            let Some(tail) = tail.strip_prefix('/') else {
                return Err(PathError::InvalidTerm {
                    path: path.to_string(),
                    term: tail.to_string(),
                });
            };
            return Ok(TreePath::External {
                authority: parse_authority(authority, path)?,
                terms: parse_terms(tail, path)?,
            });
        }
        match path.strip_prefix('/') {
            Some(tail) => Ok(TreePath::Absolute(parse_terms(tail, path)?)),
            None => Ok(TreePath::Relative(parse_terms(path, path)?)),
        }
    }

    /// The root path `/`.
    pub fn root() -> Self {
        TreePath::Absolute(Vec::new())
    }

    /// Returns the path terms, regardless of the path's form.
    pub fn terms(&self) -> &[PathTerm] {
        match self {
            TreePath::Absolute(t) | TreePath::Relative(t) => t,
            TreePath::External { terms, .. } => terms,
        }
    }

    /// Returns the object this path points into, for external paths.
    pub fn authority(&self) -> Option<&TemplateName> {
        match self {
            TreePath::External { authority, .. } => Some(authority),
            _ => None,
        }
    }

    /// Whether this is an absolute path.
    pub fn is_absolute(&self) -> bool {
        matches!(self, TreePath::Absolute(_))
    }

    /// Whether this is a relative path.
    pub fn is_relative(&self) -> bool {
        matches!(self, TreePath::Relative(_))
    }

    /// Returns a new path of the same form with `term` appended.
    pub fn child(&self, term: PathTerm) -> Self {
        let mut next = self.clone();
        match &mut next {
            TreePath::Absolute(t) | TreePath::Relative(t) => t.push(term),
            TreePath::External { terms, .. } => terms.push(term),
        }
        next
    }
}

fn parse_authority(authority: &str, path: &str) -> Result<TemplateName, PathError> {
    TemplateName::parse(authority).map_err(|source| PathError::InvalidAuthority {
        path: path.to_string(),
        source,
    })
}

fn parse_terms(tail: &str, path: &str) -> Result<Vec<PathTerm>, PathError> {
    if tail.is_empty() {
        return Ok(Vec::new());
    }
    tail.split('/').map(|t| PathTerm::parse(t, path)).collect()
}

fn write_terms(f: &mut fmt::Formatter<'_>, terms: &[PathTerm]) -> fmt::Result {
    for (i, term) in terms.iter().enumerate() {
        if i > 0 {
            f.write_str("/")?;
        }
        write!(f, "{term}")?;
    }
    Ok(())
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreePath::Absolute(terms) => {
                f.write_str("/")?;
                write_terms(f, terms)
            }
            TreePath::Relative(terms) => write_terms(f, terms),
            TreePath::External { authority, terms } => {
                write!(f, "{authority}:/")?;
                write_terms(f, terms)
            }
        }
    }
}

impl FromStr for TreePath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(k: &str) -> PathTerm {
        PathTerm::Key(k.to_string())
    }

    #[test]
    fn parse_absolute() {
        let p = TreePath::parse("/system/network/0").unwrap();
        assert_eq!(
            p,
            TreePath::Absolute(vec![key("system"), key("network"), PathTerm::Index(0)])
        );
        assert_eq!(p.to_string(), "/system/network/0");
    }

    #[test]
    fn parse_root() {
        assert_eq!(TreePath::parse("/").unwrap(), TreePath::root());
        assert_eq!(TreePath::root().to_string(), "/");
    }

    #[test]
    fn parse_relative() {
        let p = TreePath::parse("name/first").unwrap();
        assert!(p.is_relative());
        assert_eq!(p.terms(), &[key("name"), key("first")]);
    }

    #[test]
    fn parse_external_colon_form() {
        let p = TreePath::parse("site/node02:/system/hostname").unwrap();
        assert_eq!(p.authority().unwrap().as_str(), "site/node02");
        assert_eq!(p.terms(), &[key("system"), key("hostname")]);
        assert_eq!(p.to_string(), "site/node02:/system/hostname");
    }

    #[test]
    fn parse_external_legacy_form() {
        let p = TreePath::parse("//node02/system/hostname").unwrap();
        assert_eq!(p.authority().unwrap().as_str(), "node02");
        assert_eq!(p.terms(), &[key("system"), key("hostname")]);
    }

    #[test]
    fn parse_external_root() {
        let p = TreePath::parse("ns/obj:/").unwrap();
        assert!(p.terms().is_empty());
        assert!(p.authority().is_some());
    }

    #[test]
    fn external_requires_slash_after_colon() {
        assert!(TreePath::parse("ns/obj:system").is_err());
    }

    #[test]
    fn reject_empty_and_bad_terms() {
        assert_eq!(TreePath::parse(""), Err(PathError::Empty));
        assert!(matches!(
            TreePath::parse("/a//b"),
            Err(PathError::InvalidTerm { .. })
        ));
        assert!(matches!(
            TreePath::parse("/a/b c"),
            Err(PathError::InvalidTerm { .. })
        ));
    }

    #[test]
    fn reject_bad_authority() {
        assert!(matches!(
            TreePath::parse("bad name:/a"),
            Err(PathError::InvalidAuthority { .. })
        ));
    }

    #[test]
    fn child_appends_term() {
        let p = TreePath::parse("/a").unwrap().child(PathTerm::Index(3));
        assert_eq!(p.to_string(), "/a/3");
    }
}
