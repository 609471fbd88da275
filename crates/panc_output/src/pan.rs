//! The XML "pan" profile format.
//!
//! Each node becomes an element named after its type. Dictionary children
//! carry a `name` attribute; list items do not:
//!
//! ```text
//! <?xml version="1.0" encoding="UTF-8"?>
//! <nlist format="pan" name="profile">
//!   <nlist name="system">
//!     <string name="hostname">node01</string>
//!     <list name="cpus"><long>2</long></list>
//!   </nlist>
//! </nlist>
//! ```

use std::io::Write;

use panc_common::{PathTerm, TreePath};
use panc_template::Element;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::OutputError;
use crate::formatter::{io_error, Formatter, Profile};

/// Writes the tree in the XML pan format.
#[derive(Debug, Default, Clone, Copy)]
pub struct PanFormatter;

impl Formatter for PanFormatter {
    fn key(&self) -> &'static str {
        "pan"
    }

    fn suffix(&self) -> String {
        "xml".to_string()
    }

    fn write(&self, profile: &Profile<'_>, out: &mut dyn Write) -> Result<(), OutputError> {
        let mut writer = Writer::new_with_indent(&mut *out, b' ', 2);
        emit(
            &mut writer,
            Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
        )?;
        let mut terms = Vec::new();
        write_node(&mut writer, profile.tree, Some("profile"), true, &mut terms)?;
        drop(writer);
        out.write_all(b"\n").map_err(io_error("pan"))
    }
}

fn emit<W: Write>(writer: &mut Writer<W>, event: Event<'_>) -> Result<(), OutputError> {
    writer
        .write_event(event)
        .map_err(|e| OutputError::Xml(e.to_string()))
}

fn tag(element: &Element) -> &'static str {
    match element {
        Element::Dict(_) => "nlist",
        Element::List(_) => "list",
        Element::Str(_) => "string",
        Element::Long(_) => "long",
        Element::Double(_) => "double",
        Element::Bool(_) => "boolean",
        Element::Undef => "undef",
    }
}

fn write_node<W: Write>(
    writer: &mut Writer<W>,
    element: &Element,
    name: Option<&str>,
    root: bool,
    terms: &mut Vec<PathTerm>,
) -> Result<(), OutputError> {
    let tag = tag(element);
    let mut start = BytesStart::new(tag);
    if root {
        start.push_attribute(("format", "pan"));
    }
    if let Some(name) = name {
        start.push_attribute(("name", name));
    }
    let text = match element {
        Element::Dict(map) => {
            emit(writer, Event::Start(start))?;
            for (key, child) in map {
                terms.push(PathTerm::Key(key.clone()));
                write_node(writer, child, Some(key), false, terms)?;
                terms.pop();
            }
            return emit(writer, Event::End(BytesEnd::new(tag)));
        }
        Element::List(items) => {
            emit(writer, Event::Start(start))?;
            for (i, child) in items.iter().enumerate() {
                terms.push(PathTerm::Index(i));
                write_node(writer, child, None, false, terms)?;
                terms.pop();
            }
            return emit(writer, Event::End(BytesEnd::new(tag)));
        }
        Element::Str(s) => s.clone(),
        Element::Long(n) => n.to_string(),
        Element::Double(d) => d.to_string(),
        Element::Bool(b) => b.to_string(),
        Element::Undef => {
            return Err(OutputError::Unrepresentable {
                format: "pan",
                path: TreePath::Absolute(terms.clone()).to_string(),
                what: "an undefined value".to_string(),
            })
        }
    };
    emit(writer, Event::Start(start))?;
    emit(writer, Event::Text(BytesText::new(&text)))?;
    emit(writer, Event::End(BytesEnd::new(tag)))
}
