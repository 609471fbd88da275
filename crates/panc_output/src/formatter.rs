//! The formatter contract shared by every output format.

use std::collections::BTreeSet;
use std::io::Write;
use std::path::PathBuf;

use panc_common::TemplateName;
use panc_source::SourceFile;
use panc_template::Element;

use crate::error::OutputError;

/// Everything a formatter may serialize for one object template.
#[derive(Clone, Copy, Debug)]
pub struct Profile<'a> {
    /// The object template name.
    pub name: &'a TemplateName,
    /// The validated configuration tree.
    pub tree: &'a Element,
    /// Every source entity consulted while building the tree, across the
    /// object's whole dependency closure.
    pub dependencies: &'a BTreeSet<SourceFile>,
}

/// A serializer turning a profile into one output file.
///
/// The key identifies the format in configuration and on the command line.
/// [`result_path`](Formatter::result_path) gives the output file relative to
/// the output directory; both the build and the staleness check derive
/// target files from it, so it must depend on the name only.
pub trait Formatter: Send + Sync {
    /// Unique key of the format.
    fn key(&self) -> &'static str;

    /// File suffix without the leading dot.
    fn suffix(&self) -> String;

    /// Output file for `name`, relative to the output directory.
    fn result_path(&self, name: &TemplateName) -> PathBuf {
        name.local_path(&format!(".{}", self.suffix()))
    }

    /// Serializes the profile.
    fn write(&self, profile: &Profile<'_>, out: &mut dyn Write) -> Result<(), OutputError>;
}

/// Wraps an I/O error with the formatter key.
pub(crate) fn io_error(format: &'static str) -> impl FnOnce(std::io::Error) -> OutputError {
    move |source| OutputError::Io { format, source }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    impl Formatter for Fixed {
        fn key(&self) -> &'static str {
            "fixed"
        }

        fn suffix(&self) -> String {
            "fx".to_string()
        }

        fn write(&self, profile: &Profile<'_>, out: &mut dyn Write) -> Result<(), OutputError> {
            writeln!(out, "{}", profile.name).map_err(io_error("fixed"))
        }
    }

    #[test]
    fn default_result_path_uses_suffix() {
        let name = TemplateName::parse("cluster/node01").unwrap();
        assert_eq!(
            Fixed.result_path(&name),
            PathBuf::from("cluster").join("node01.fx")
        );
    }

    #[test]
    fn write_receives_profile() {
        let name = TemplateName::parse("n").unwrap();
        let tree = Element::empty_dict();
        let deps = BTreeSet::new();
        let mut buf = Vec::new();
        Fixed
            .write(
                &Profile {
                    name: &name,
                    tree: &tree,
                    dependencies: &deps,
                },
                &mut buf,
            )
            .unwrap();
        assert_eq!(buf, b"n\n");
    }
}
