//! Syntax tree for compiled templates.

use std::fmt;
use std::path::PathBuf;

use panc_common::{TemplateName, TreePath};
use panc_source::SourceLocation;

use crate::types::FullType;

/// The kind declared in a template header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    /// A template without modifier; may be included any number of times.
    Ordinary,
    /// Produces one machine profile.
    Object,
    /// Builds a detached subtree through `create`; uses relative paths.
    Structure,
    /// Holds only `bind` and `include` statements; included at most once.
    Declaration,
    /// Included at most once per object.
    Unique,
}

impl TemplateKind {
    /// The header keyword for this kind, empty for ordinary templates.
    pub fn keyword(self) -> &'static str {
        match self {
            TemplateKind::Ordinary => "",
            TemplateKind::Object => "object",
            TemplateKind::Structure => "structure",
            TemplateKind::Declaration => "declaration",
            TemplateKind::Unique => "unique",
        }
    }

    /// Whether a second `include` of this template within one object is a no-op.
    pub fn is_included_once(self) -> bool {
        matches!(self, TemplateKind::Declaration | TemplateKind::Unique)
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateKind::Ordinary => f.write_str("ordinary"),
            other => f.write_str(other.keyword()),
        }
    }
}

/// An expression on the right-hand side of an assignment.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// A string literal.
    Str(String),
    /// An integer literal.
    Long(i64),
    /// A floating-point literal.
    Double(f64),
    /// `true` or `false`.
    Bool(bool),
    /// `undef`: a placeholder that must be replaced before validation.
    Undef,
    /// `null`: deletes the assigned path.
    Null,
    /// `list(e, ...)`.
    List(Vec<Expr>),
    /// `dict('k', e, ...)`.
    Dict(Vec<(String, Expr)>),
    /// `value('path')`.
    Value(TreePath),
    /// `file_contents('name')`.
    FileContents(TemplateName),
    /// `file_exists('name')`.
    FileExists(TemplateName),
    /// `create('ns/structure')`.
    Create(TemplateName),
}

/// One statement of a template body.
#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    /// `include 'name';` or `include if_exists('name');`.
    Include {
        /// The template to include.
        name: TemplateName,
        /// Whether a missing template is tolerated.
        if_exists: bool,
        /// Statement location.
        location: SourceLocation,
    },
    /// `'/path' = expr;`.
    Assign {
        /// The assigned path.
        path: TreePath,
        /// The value.
        value: Expr,
        /// Statement location.
        location: SourceLocation,
    },
    /// `bind '/path' = type;`.
    Bind {
        /// The bound path.
        path: TreePath,
        /// The type values at the path must satisfy.
        full_type: FullType,
        /// Statement location.
        location: SourceLocation,
    },
}

impl Statement {
    /// The statement's source location.
    pub fn location(&self) -> &SourceLocation {
        match self {
            Statement::Include { location, .. }
            | Statement::Assign { location, .. }
            | Statement::Bind { location, .. } => location,
        }
    }
}

/// The immutable result of compiling one template file.
#[derive(Clone, Debug, PartialEq)]
pub struct CompiledTemplate {
    /// The declared template name; matches the file's path.
    pub name: TemplateName,
    /// The declared kind.
    pub kind: TemplateKind,
    /// The file the template was compiled from.
    pub file: PathBuf,
    /// The body statements, in order.
    pub statements: Vec<Statement>,
}

impl CompiledTemplate {
    /// Whether this is an object template.
    pub fn is_object(&self) -> bool {
        self.kind == TemplateKind::Object
    }
}
