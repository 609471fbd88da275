//! A plain listing of leaf values, one per line.

use std::io::Write;

use panc_common::{PathTerm, TreePath};
use panc_template::Element;

use crate::error::OutputError;
use crate::formatter::{io_error, Formatter, Profile};

/// Writes `path = value` for every leaf, in tree order. Strings are quoted.
#[derive(Debug, Default, Clone, Copy)]
pub struct TxtFormatter;

impl Formatter for TxtFormatter {
    fn key(&self) -> &'static str {
        "txt"
    }

    fn suffix(&self) -> String {
        "txt".to_string()
    }

    fn write(&self, profile: &Profile<'_>, out: &mut dyn Write) -> Result<(), OutputError> {
        let mut terms = Vec::new();
        write_leaves(out, profile.tree, &mut terms)
    }
}

fn write_leaves(
    out: &mut dyn Write,
    element: &Element,
    terms: &mut Vec<PathTerm>,
) -> Result<(), OutputError> {
    let value = match element {
        Element::Dict(map) => {
            for (key, child) in map {
                terms.push(PathTerm::Key(key.clone()));
                write_leaves(out, child, terms)?;
                terms.pop();
            }
            return Ok(());
        }
        Element::List(items) => {
            for (i, child) in items.iter().enumerate() {
                terms.push(PathTerm::Index(i));
                write_leaves(out, child, terms)?;
                terms.pop();
            }
            return Ok(());
        }
        Element::Str(s) => format!("{s:?}"),
        Element::Long(n) => n.to_string(),
        Element::Double(d) => d.to_string(),
        Element::Bool(b) => b.to_string(),
        Element::Undef => "undef".to_string(),
    };
    let path = TreePath::Absolute(terms.clone());
    writeln!(out, "{path} = {value}").map_err(io_error("txt"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use panc_common::TemplateName;
    use std::collections::BTreeSet;

    #[test]
    fn lists_leaves_in_order() {
        let mut tree = Element::empty_dict();
        for (p, v) in [
            ("/b/0", Element::Long(1)),
            ("/a", Element::Str("x y".into())),
            ("/b/1", Element::Double(0.5)),
        ] {
            tree.set(TreePath::parse(p).unwrap().terms(), v).unwrap();
        }
        let name = TemplateName::parse("n").unwrap();
        let deps = BTreeSet::new();
        let mut buf = Vec::new();
        TxtFormatter
            .write(
                &Profile {
                    name: &name,
                    tree: &tree,
                    dependencies: &deps,
                },
                &mut buf,
            )
            .unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "/a = \"x y\"\n/b/0 = 1\n/b/1 = 0.5\n"
        );
    }
}
