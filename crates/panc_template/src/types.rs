//! Built-in types and validation of path bindings.

use std::collections::BTreeSet;
use std::fmt;

use panc_common::{TemplateName, TreePath};
use panc_source::SourceLocation;

use crate::element::{Element, ProtectedTree};
use crate::error::EvaluationError;

/// The built-in base types a path can be bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BaseType {
    /// Any defined value.
    Any,
    /// A string; the range limits its length.
    String,
    /// An integer; the range limits its value.
    Long,
    /// A float or integer; the range limits its value.
    Double,
    /// A boolean.
    Boolean,
    /// A list; the range limits its length.
    List,
    /// A dictionary; the range limits its size.
    Dict,
    /// A string holding an absolute or external path that must exist.
    Link,
}

impl BaseType {
    /// Looks up a base type by its keyword.
    pub fn from_keyword(word: &str) -> Option<Self> {
        Some(match word {
            "any" => BaseType::Any,
            "string" => BaseType::String,
            "long" => BaseType::Long,
            "double" => BaseType::Double,
            "boolean" => BaseType::Boolean,
            "list" => BaseType::List,
            "dict" => BaseType::Dict,
            "link" => BaseType::Link,
            _ => return None,
        })
    }

    fn keyword(self) -> &'static str {
        match self {
            BaseType::Any => "any",
            BaseType::String => "string",
            BaseType::Long => "long",
            BaseType::Double => "double",
            BaseType::Boolean => "boolean",
            BaseType::List => "list",
            BaseType::Dict => "dict",
            BaseType::Link => "link",
        }
    }
}

/// An inclusive range; either bound may be open.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TypeRange {
    /// Lower bound.
    pub min: Option<i64>,
    /// Upper bound.
    pub max: Option<i64>,
}

impl TypeRange {
    fn check(&self, value: f64, what: &str) -> Result<(), String> {
        if let Some(min) = self.min {
            if value < min as f64 {
                return Err(format!("{what} {value} is below {min}"));
            }
        }
        if let Some(max) = self.max {
            if value > max as f64 {
                return Err(format!("{what} {value} is above {max}"));
            }
        }
        Ok(())
    }
}

impl fmt::Display for TypeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(min) = self.min {
            write!(f, "{min}")?;
        }
        f.write_str("..")?;
        if let Some(max) = self.max {
            write!(f, "{max}")?;
        }
        Ok(())
    }
}

/// A base type with an optional range restriction.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FullType {
    /// The base type.
    pub base: BaseType,
    /// The range restriction, if any.
    pub range: Option<TypeRange>,
}

impl fmt::Display for FullType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.base.keyword())?;
        if let Some(range) = &self.range {
            write!(f, "({range})")?;
        }
        Ok(())
    }
}

/// Resolves other objects' trees while validating `link` values.
///
/// Unlike build-time references, validation-time lookups are not checked for
/// cycles: two objects may link to each other.
pub trait LinkResolver {
    /// Returns the validated tree of another object.
    fn resolve(&self, object: &TemplateName) -> Result<ProtectedTree, EvaluationError>;
}

impl FullType {
    /// Checks `value` against this type.
    ///
    /// Object names reached through `link` values are added to `objects`.
    pub fn validate(
        &self,
        value: &Element,
        root: &Element,
        resolver: &dyn LinkResolver,
        objects: &mut BTreeSet<TemplateName>,
    ) -> Result<(), String> {
        let range = self.range.unwrap_or_default();
        match (self.base, value) {
            (BaseType::Any, _) => Ok(()),
            (BaseType::String, Element::Str(s)) => range.check(s.chars().count() as f64, "length"),
            (BaseType::Long, Element::Long(n)) => range.check(*n as f64, "value"),
            (BaseType::Double, Element::Double(d)) => range.check(*d, "value"),
            (BaseType::Double, Element::Long(n)) => range.check(*n as f64, "value"),
            (BaseType::Boolean, Element::Bool(_)) => Ok(()),
            (BaseType::List, Element::List(items)) => range.check(items.len() as f64, "length"),
            (BaseType::Dict, Element::Dict(map)) => range.check(map.len() as f64, "size"),
            (BaseType::Link, Element::Str(target)) => check_link(target, root, resolver, objects),
            (_, other) => Err(format!("found {}", other.type_name())),
        }
    }
}

fn check_link(
    target: &str,
    root: &Element,
    resolver: &dyn LinkResolver,
    objects: &mut BTreeSet<TemplateName>,
) -> Result<(), String> {
    let path = TreePath::parse(target).map_err(|e| e.to_string())?;
    let found = match &path {
        TreePath::Absolute(terms) => root.get(terms).is_some(),
        TreePath::External { authority, terms } => {
            objects.insert(authority.clone());
            let tree = resolver.resolve(authority).map_err(|e| e.to_string())?;
            tree.get(terms).is_some()
        }
        TreePath::Relative(_) => return Err(format!("link '{target}' must not be relative")),
    };
    if found {
        Ok(())
    } else {
        Err(format!("link target '{target}' does not exist"))
    }
}

/// A path-to-type binding recorded while building an object.
#[derive(Clone, Debug, PartialEq)]
pub struct Binding {
    /// The absolute bound path.
    pub path: TreePath,
    /// The bound type.
    pub full_type: FullType,
    /// Where the `bind` statement appeared.
    pub location: SourceLocation,
}

/// Validates every binding against `root`.
///
/// Paths with no value are accepted. On success returns the objects reached
/// through `link` values, which become object dependencies of `root`'s owner.
pub fn validate_bindings(
    root: &Element,
    bindings: &[Binding],
    resolver: &dyn LinkResolver,
) -> Result<BTreeSet<TemplateName>, EvaluationError> {
    let mut objects = BTreeSet::new();
    for binding in bindings {
        let Some(value) = root.get(binding.path.terms()) else {
            continue;
        };
        binding
            .full_type
            .validate(value, root, resolver, &mut objects)
            .map_err(|reason| EvaluationError::Validation {
                path: binding.path.to_string(),
                type_name: binding.full_type.to_string(),
                file: binding.location.file.clone(),
                reason,
            })?;
    }
    Ok(objects)
}
