//! Configuration tree values.

use std::collections::BTreeMap;
use std::ops::Deref;
use std::sync::Arc;

use panc_common::{PathTerm, TreePath};
use serde::Serialize;

/// A node of a configuration tree.
///
/// Dictionaries keep their keys sorted so every serialization of a tree is
/// deterministic.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Element {
    /// A dictionary of named children.
    Dict(BTreeMap<String, Element>),
    /// An ordered list of children.
    List(Vec<Element>),
    /// A string.
    Str(String),
    /// A 64-bit integer.
    Long(i64),
    /// A double-precision float.
    Double(f64),
    /// A boolean.
    Bool(bool),
    /// A value left undefined; invalid in a finished tree.
    Undef,
}

impl Element {
    /// An empty dictionary, the root of every object tree.
    pub fn empty_dict() -> Self {
        Element::Dict(BTreeMap::new())
    }

    /// The type name used in messages and by the `pan` formatter.
    pub fn type_name(&self) -> &'static str {
        match self {
            Element::Dict(_) => "dict",
            Element::List(_) => "list",
            Element::Str(_) => "string",
            Element::Long(_) => "long",
            Element::Double(_) => "double",
            Element::Bool(_) => "boolean",
            Element::Undef => "undef",
        }
    }

    /// Returns the node at `terms`, if present.
    pub fn get(&self, terms: &[PathTerm]) -> Option<&Element> {
        let mut node = self;
        for term in terms {
            node = match (node, term) {
                (Element::Dict(map), PathTerm::Key(k)) => map.get(k)?,
                (Element::List(items), PathTerm::Index(i)) => items.get(*i)?,
                _ => return None,
            };
        }
        Some(node)
    }

    /// Stores `value` at `terms`, creating intermediate dictionaries (for
    /// keys) and lists (for indices) as needed.
    ///
    /// A list index may address an existing item or the position just past
    /// the end, which appends.
    pub fn set(&mut self, terms: &[PathTerm], value: Element) -> Result<(), String> {
        let Some((last, parents)) = terms.split_last() else {
            *self = value;
            return Ok(());
        };
        let mut node = self;
        for (depth, term) in parents.iter().enumerate() {
            let next_is_index = matches!(terms[depth + 1], PathTerm::Index(_));
            node = child_mut(node, term, next_is_index)?;
        }
        match (node, last) {
            (Element::Dict(map), PathTerm::Key(k)) => {
                map.insert(k.clone(), value);
                Ok(())
            }
            (Element::List(items), PathTerm::Index(i)) if *i < items.len() => {
                items[*i] = value;
                Ok(())
            }
            (Element::List(items), PathTerm::Index(i)) if *i == items.len() => {
                items.push(value);
                Ok(())
            }
            (Element::List(items), PathTerm::Index(i)) => Err(format!(
                "index {i} is beyond the end of a list of {} items",
                items.len()
            )),
            (other, term) => Err(format!(
                "cannot address '{term}' inside a {}",
                other.type_name()
            )),
        }
    }

    /// Removes the node at `terms`. Missing nodes are ignored.
    pub fn remove(&mut self, terms: &[PathTerm]) {
        let Some((last, parents)) = terms.split_last() else {
            *self = Element::empty_dict();
            return;
        };
        let mut node = self;
        for term in parents {
            node = match (node, term) {
                (Element::Dict(map), PathTerm::Key(k)) => match map.get_mut(k) {
                    Some(n) => n,
                    None => return,
                },
                (Element::List(items), PathTerm::Index(i)) => match items.get_mut(*i) {
                    Some(n) => n,
                    None => return,
                },
                _ => return,
            };
        }
        match (node, last) {
            (Element::Dict(map), PathTerm::Key(k)) => {
                map.remove(k);
            }
            (Element::List(items), PathTerm::Index(i)) if *i < items.len() => {
                items.remove(*i);
            }
            _ => {}
        }
    }

    /// Depth-first search for the first [`Element::Undef`] node.
    ///
    /// Returns its absolute path, or `None` when the tree is fully defined.
    pub fn first_undefined(&self) -> Option<TreePath> {
        let mut terms = Vec::new();
        if find_undef(self, &mut terms) {
            Some(TreePath::Absolute(terms))
        } else {
            None
        }
    }

    /// Makes the tree read-only so it can be shared across threads.
    pub fn protect(self) -> ProtectedTree {
        ProtectedTree(Arc::new(self))
    }
}

fn child_mut<'a>(
    node: &'a mut Element,
    term: &PathTerm,
    next_is_index: bool,
) -> Result<&'a mut Element, String> {
    let fresh = || {
        if next_is_index {
            Element::List(Vec::new())
        } else {
            Element::empty_dict()
        }
    };
    match (node, term) {
        (Element::Dict(map), PathTerm::Key(k)) => Ok(map.entry(k.clone()).or_insert_with(fresh)),
        (Element::List(items), PathTerm::Index(i)) => {
            if *i == items.len() {
                items.push(fresh());
            }
            let len = items.len();
            items
                .get_mut(*i)
                .ok_or_else(|| format!("index {i} is beyond the end of a list of {len} items"))
        }
        (other, term) => Err(format!(
            "cannot address '{term}' inside a {}",
            other.type_name()
        )),
    }
}

fn find_undef(node: &Element, terms: &mut Vec<PathTerm>) -> bool {
    match node {
        Element::Undef => true,
        Element::Dict(map) => {
            for (key, child) in map {
                terms.push(PathTerm::Key(key.clone()));
                if find_undef(child, terms) {
                    return true;
                }
                terms.pop();
            }
            false
        }
        Element::List(items) => {
            for (i, child) in items.iter().enumerate() {
                terms.push(PathTerm::Index(i));
                if find_undef(child, terms) {
                    return true;
                }
                terms.pop();
            }
            false
        }
        _ => false,
    }
}

/// A configuration tree that can no longer be modified.
///
/// The only way to obtain one is [`Element::protect`]. Clones share the same
/// tree. Callers wanting to change it must take a deep copy with
/// [`to_mutable`](ProtectedTree::to_mutable).
#[derive(Clone, Debug, PartialEq)]
pub struct ProtectedTree(Arc<Element>);

impl ProtectedTree {
    /// Returns a private, mutable copy of the tree.
    pub fn to_mutable(&self) -> Element {
        (*self.0).clone()
    }

    /// Whether two handles share the same underlying tree.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl Deref for ProtectedTree {
    type Target = Element;

    fn deref(&self) -> &Element {
        &self.0
    }
}
