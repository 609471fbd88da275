//! Pretty-printed JSON profiles.

use std::io::Write;

use crate::error::OutputError;
use crate::formatter::{io_error, Formatter, Profile};

/// Writes the tree as pretty-printed JSON, dictionaries with sorted keys.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn key(&self) -> &'static str {
        "json"
    }

    fn suffix(&self) -> String {
        "json".to_string()
    }

    fn write(&self, profile: &Profile<'_>, mut out: &mut dyn Write) -> Result<(), OutputError> {
        serde_json::to_writer_pretty(&mut out, profile.tree)?;
        out.write_all(b"\n").map_err(io_error("json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use panc_common::{TemplateName, TreePath};
    use panc_template::Element;
    use std::collections::BTreeSet;

    #[test]
    fn writes_pretty_json() {
        let mut tree = Element::empty_dict();
        tree.set(
            TreePath::parse("/system/hostname").unwrap().terms(),
            Element::Str("node01".into()),
        )
        .unwrap();
        let name = TemplateName::parse("node01").unwrap();
        let deps = BTreeSet::new();
        let mut buf = Vec::new();
        JsonFormatter
            .write(
                &Profile {
                    name: &name,
                    tree: &tree,
                    dependencies: &deps,
                },
                &mut buf,
            )
            .unwrap();
        let text = String::from_utf8(buf).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["system"]["hostname"], "node01");
        assert!(text.ends_with("}\n"));
        assert!(text.contains("\n  \"system\""));
    }
}
