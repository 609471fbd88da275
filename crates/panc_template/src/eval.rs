//! Evaluation of object templates into configuration trees.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use panc_common::{TemplateName, TreePath};
use panc_source::{SourceFile, SourceLocation};

use crate::ast::{CompiledTemplate, Expr, Statement, TemplateKind};
use crate::element::{Element, ProtectedTree};
use crate::error::EvaluationError;
use crate::types::Binding;

/// Access to templates, text files and other objects during evaluation.
///
/// Implementations decide where compiled templates come from and how other
/// objects' trees are obtained; the evaluator only records what it consulted.
pub trait TemplateLoader {
    /// Resolves a template name on the include path.
    fn lookup_template(&self, name: &TemplateName) -> SourceFile;

    /// Returns the compiled form of a template found by
    /// [`lookup_template`](TemplateLoader::lookup_template).
    fn load_template(&self, source: &SourceFile) -> Result<Arc<CompiledTemplate>, EvaluationError>;

    /// Resolves a text file name on the include path.
    fn lookup_text(&self, name: &TemplateName) -> SourceFile;

    /// Returns the built tree of another object template.
    fn external_tree(&self, object: &TemplateName) -> Result<ProtectedTree, EvaluationError>;
}

/// Limits applied while evaluating.
#[derive(Clone, Debug)]
pub struct EvalOptions {
    /// Maximum nesting of `include` and `create`.
    pub max_recursion: usize,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self { max_recursion: 50 }
    }
}

/// What an object's evaluation recorded besides the tree itself.
#[derive(Clone, Debug, Default)]
pub struct ObjectContext {
    /// Path-to-type bindings, in statement order.
    pub bindings: Vec<Binding>,
    /// Every template and text file consulted, present or absent, including
    /// the object template itself.
    pub dependencies: BTreeSet<SourceFile>,
    /// Other object templates whose trees were read.
    pub object_dependencies: BTreeSet<TemplateName>,
}

/// Evaluates an object template.
///
/// `source` is the object template's own source entity; it is recorded as the
/// first dependency. The returned tree is protected.
pub fn build_object(
    template: &CompiledTemplate,
    source: &SourceFile,
    loader: &dyn TemplateLoader,
    options: &EvalOptions,
) -> Result<(ProtectedTree, ObjectContext), EvaluationError> {
    if template.kind != TemplateKind::Object {
        return Err(EvaluationError::Statement {
            location: SourceLocation::new(&template.file, 1, 1),
            message: format!("'{}' is not an object template", template.name),
        });
    }
    let mut evaluator = Evaluator {
        object: &template.name,
        loader,
        options,
        context: ObjectContext::default(),
        root: Element::empty_dict(),
        structures: Vec::new(),
        included_once: HashSet::new(),
        depth: 0,
    };
    evaluator.context.dependencies.insert(source.clone());
    evaluator.execute(template)?;
    tracing::trace!(
        object = %template.name,
        dependencies = evaluator.context.dependencies.len(),
        "object evaluated"
    );
    Ok((evaluator.root.protect(), evaluator.context))
}

struct Evaluator<'a> {
    object: &'a TemplateName,
    loader: &'a dyn TemplateLoader,
    options: &'a EvalOptions,
    context: ObjectContext,
    root: Element,
    structures: Vec<Element>,
    included_once: HashSet<TemplateName>,
    depth: usize,
}

fn statement_error(location: &SourceLocation, message: impl Into<String>) -> EvaluationError {
    EvaluationError::Statement {
        location: location.clone(),
        message: message.into(),
    }
}

impl Evaluator<'_> {
    fn execute(&mut self, template: &CompiledTemplate) -> Result<(), EvaluationError> {
        for statement in &template.statements {
            match statement {
                Statement::Include {
                    name,
                    if_exists,
                    location,
                } => self.include(name, *if_exists, location)?,
                Statement::Assign {
                    path,
                    value,
                    location,
                } => {
                    let value = match value {
                        Expr::Null => None,
                        other => Some(self.eval(other, location)?),
                    };
                    let target = match self.structures.last_mut() {
                        Some(structure) => structure,
                        None => &mut self.root,
                    };
                    match value {
                        Some(v) => target
                            .set(path.terms(), v)
                            .map_err(|m| statement_error(location, format!("{path}: {m}")))?,
                        None => target.remove(path.terms()),
                    }
                }
                Statement::Bind {
                    path,
                    full_type,
                    location,
                } => self.context.bindings.push(Binding {
                    path: path.clone(),
                    full_type: full_type.clone(),
                    location: location.clone(),
                }),
            }
        }
        Ok(())
    }

    fn enter(&mut self, location: &SourceLocation) -> Result<(), EvaluationError> {
        if self.depth >= self.options.max_recursion {
            return Err(EvaluationError::RecursionLimit {
                location: location.clone(),
                limit: self.options.max_recursion,
            });
        }
        self.depth += 1;
        Ok(())
    }

    fn find_template(
        &mut self,
        name: &TemplateName,
        location: &SourceLocation,
    ) -> Result<Option<Arc<CompiledTemplate>>, EvaluationError> {
        let source = self.loader.lookup_template(name);
        self.context.dependencies.insert(source.clone());
        if source.is_absent() {
            return Ok(None);
        }
        let template = self.loader.load_template(&source)?;
        if template.kind == TemplateKind::Object {
            return Err(statement_error(
                location,
                format!("object template '{name}' cannot be included"),
            ));
        }
        Ok(Some(template))
    }

    fn include(
        &mut self,
        name: &TemplateName,
        if_exists: bool,
        location: &SourceLocation,
    ) -> Result<(), EvaluationError> {
        let Some(template) = self.find_template(name, location)? else {
            if if_exists {
                return Ok(());
            }
            return Err(EvaluationError::TemplateNotFound {
                location: location.clone(),
                name: name.clone(),
            });
        };
        if template.kind == TemplateKind::Structure {
            return Err(statement_error(
                location,
                format!("structure template '{name}' can only be used with create"),
            ));
        }
        if template.kind.is_included_once() && !self.included_once.insert(name.clone()) {
            return Ok(());
        }
        self.enter(location)?;
        let result = self.execute(&template);
        self.depth -= 1;
        result
    }

    fn eval(&mut self, expr: &Expr, location: &SourceLocation) -> Result<Element, EvaluationError> {
        Ok(match expr {
            Expr::Str(s) => Element::Str(s.clone()),
            Expr::Long(n) => Element::Long(*n),
            Expr::Double(d) => Element::Double(*d),
            Expr::Bool(b) => Element::Bool(*b),
            Expr::Undef => Element::Undef,
            Expr::Null => return Err(statement_error(location, "null is only allowed as a whole value")),
            Expr::List(items) => Element::List(
                items
                    .iter()
                    .map(|e| self.eval(e, location))
                    .collect::<Result<_, _>>()?,
            ),
            Expr::Dict(pairs) => {
                let mut map = std::collections::BTreeMap::new();
                for (key, value) in pairs {
                    map.insert(key.clone(), self.eval(value, location)?);
                }
                Element::Dict(map)
            }
            Expr::Value(path) => self.value(path, location)?,
            Expr::FileContents(name) => {
                let source = self.loader.lookup_text(name);
                self.context.dependencies.insert(source.clone());
                if source.is_absent() {
                    return Err(statement_error(location, format!("cannot locate file '{name}'")));
                }
                let text = source
                    .read_to_string()
                    .map_err(|e| statement_error(location, e.to_string()))?;
                Element::Str(text)
            }
            Expr::FileExists(name) => {
                let source = self.loader.lookup_text(name);
                let exists = !source.is_absent();
                self.context.dependencies.insert(source);
                Element::Bool(exists)
            }
            Expr::Create(name) => self.create(name, location)?,
        })
    }

    fn value(&mut self, path: &TreePath, location: &SourceLocation) -> Result<Element, EvaluationError> {
        let found = match path {
            TreePath::Absolute(terms) => self.root.get(terms).cloned(),
            TreePath::Relative(terms) => match self.structures.last() {
                Some(structure) => structure.get(terms).cloned(),
                None => {
                    return Err(statement_error(
                        location,
                        format!("relative path '{path}' outside a structure"),
                    ))
                }
            },
            TreePath::External { authority, terms } if authority == self.object => {
                self.root.get(terms).cloned()
            }
            TreePath::External { authority, terms } => {
                self.context.object_dependencies.insert(authority.clone());
                let tree = self.loader.external_tree(authority)?;
                tree.get(terms).cloned()
            }
        };
        found.ok_or_else(|| statement_error(location, format!("path '{path}' has no value")))
    }

    fn create(&mut self, name: &TemplateName, location: &SourceLocation) -> Result<Element, EvaluationError> {
        let Some(template) = self.find_template(name, location)? else {
            return Err(EvaluationError::TemplateNotFound {
                location: location.clone(),
                name: name.clone(),
            });
        };
        if template.kind != TemplateKind::Structure {
            return Err(statement_error(
                location,
                format!("'{name}' is not a structure template"),
            ));
        }
        self.enter(location)?;
        self.structures.push(Element::empty_dict());
        let result = self.execute(&template);
        self.depth -= 1;
        let tree = self.structures.pop().unwrap_or_else(Element::empty_dict);
        result.map(|()| tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::compile;
    use panc_common::SourceKind;
    use std::collections::HashMap;
    use std::path::PathBuf;

    /// An in-memory loader: templates by name, text files by name, and other
    /// objects' trees by name.
    #[derive(Default)]
    struct MemLoader {
        templates: HashMap<String, Arc<CompiledTemplate>>,
        texts: HashMap<String, PathBuf>,
        objects: HashMap<String, ProtectedTree>,
    }

    impl MemLoader {
        fn add(&mut self, name: &str, src: &str) {
            let path = PathBuf::from("/repo").join(format!("{name}.pan"));
            let t = compile(&path, src).unwrap();
            self.templates.insert(name.to_string(), Arc::new(t));
        }
    }

    impl TemplateLoader for MemLoader {
        fn lookup_template(&self, name: &TemplateName) -> SourceFile {
            match self.templates.get(name.as_str()) {
                Some(t) => SourceFile::new(name.clone(), SourceKind::Pan, Some(t.file.clone())).unwrap(),
                None => SourceFile::absent(name.clone(), SourceKind::AbsentSource),
            }
        }

        fn load_template(&self, source: &SourceFile) -> Result<Arc<CompiledTemplate>, EvaluationError> {
            Ok(self.templates[source.name().as_str()].clone())
        }

        fn lookup_text(&self, name: &TemplateName) -> SourceFile {
            match self.texts.get(name.as_str()) {
                Some(p) => SourceFile::new(name.clone(), SourceKind::Text, Some(p.clone())).unwrap(),
                None => SourceFile::absent(name.clone(), SourceKind::AbsentText),
            }
        }

        fn external_tree(&self, object: &TemplateName) -> Result<ProtectedTree, EvaluationError> {
            self.objects.get(object.as_str()).cloned().ok_or_else(|| {
                statement_error(&SourceLocation::new("ext", 1, 1), format!("no object {object}"))
            })
        }
    }

    fn build(loader: &MemLoader, name: &str) -> Result<(ProtectedTree, ObjectContext), EvaluationError> {
        let template = loader.templates[name].clone();
        let source = loader.lookup_template(&TemplateName::parse(name).unwrap());
        build_object(&template, &source, loader, &EvalOptions::default())
    }

    fn get<'t>(tree: &'t ProtectedTree, path: &str) -> Option<&'t Element> {
        tree.get(TreePath::parse(path).unwrap().terms())
    }

    #[test]
    fn assignments_and_value() {
        let mut loader = MemLoader::default();
        loader.add(
            "node",
            "object template node;\n'/a' = 1;\n'/b' = value('/a');\n'/c' = list('x', dict('k', true));\n",
        );
        let (tree, ctx) = build(&loader, "node").unwrap();
        assert_eq!(get(&tree, "/b"), Some(&Element::Long(1)));
        assert_eq!(get(&tree, "/c/1/k"), Some(&Element::Bool(true)));
        assert_eq!(ctx.dependencies.len(), 1);
    }

    #[test]
    fn include_records_dependencies_and_runs_statements() {
        let mut loader = MemLoader::default();
        loader.add("ns/base", "template ns/base;\n'/os' = 'linux';\n");
        loader.add(
            "node",
            "object template node;\ninclude 'ns/base';\ninclude if_exists('ns/ghost');\n",
        );
        let (tree, ctx) = build(&loader, "node").unwrap();
        assert_eq!(get(&tree, "/os"), Some(&Element::Str("linux".into())));
        let kinds: Vec<(String, SourceKind)> = ctx
            .dependencies
            .iter()
            .map(|d| (d.name().to_string(), d.kind()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("node".to_string(), SourceKind::Pan),
                ("ns/base".to_string(), SourceKind::Pan),
                ("ns/ghost".to_string(), SourceKind::AbsentSource),
            ]
        );
    }

    #[test]
    fn missing_include_fails_with_location() {
        let mut loader = MemLoader::default();
        loader.add("node", "object template node;\ninclude 'ns/missing';\n");
        let err = build(&loader, "node").unwrap_err();
        match err {
            EvaluationError::TemplateNotFound { location, name } => {
                assert_eq!(name.as_str(), "ns/missing");
                assert_eq!(location.line, 2);
            }
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn unique_templates_run_once() {
        let mut loader = MemLoader::default();
        loader.add("ns/u", "unique template ns/u;\n'/list/0' = 'once';\n");
        loader.add(
            "node",
            "object template node;\ninclude 'ns/u';\n'/list/1' = 'after';\ninclude 'ns/u';\n",
        );
        let (tree, _) = build(&loader, "node").unwrap();
        assert_eq!(
            get(&tree, "/list"),
            Some(&Element::List(vec![
                Element::Str("once".into()),
                Element::Str("after".into())
            ]))
        );
    }

    #[test]
    fn recursive_include_hits_limit() {
        let mut loader = MemLoader::default();
        loader.add("ns/loop", "template ns/loop;\ninclude 'ns/loop';\n");
        loader.add("node", "object template node;\ninclude 'ns/loop';\n");
        let err = build(&loader, "node").unwrap_err();
        assert!(matches!(err, EvaluationError::RecursionLimit { limit: 50, .. }));
    }

    #[test]
    fn including_object_template_fails() {
        let mut loader = MemLoader::default();
        loader.add("other", "object template other;\n");
        loader.add("node", "object template node;\ninclude 'other';\n");
        let err = build(&loader, "node").unwrap_err();
        assert!(err.to_string().contains("cannot be included"));
    }

    #[test]
    fn create_builds_structure() {
        let mut loader = MemLoader::default();
        loader.add(
            "ns/nic",
            "structure template ns/nic;\n'driver' = 'e1000';\n'mtu' = 1500;\n'copy' = value('mtu');\n",
        );
        loader.add("node", "object template node;\n'/net/eth0' = create('ns/nic');\n");
        let (tree, ctx) = build(&loader, "node").unwrap();
        assert_eq!(get(&tree, "/net/eth0/driver"), Some(&Element::Str("e1000".into())));
        assert_eq!(get(&tree, "/net/eth0/copy"), Some(&Element::Long(1500)));
        assert!(ctx.dependencies.iter().any(|d| d.name().as_str() == "ns/nic"));
    }

    #[test]
    fn null_deletes_path() {
        let mut loader = MemLoader::default();
        loader.add("node", "object template node;\n'/a/b' = 1;\n'/a/b' = null;\n");
        let (tree, _) = build(&loader, "node").unwrap();
        assert_eq!(get(&tree, "/a/b"), None);
        assert!(get(&tree, "/a").is_some());
    }

    #[test]
    fn external_value_records_object_dependency() {
        let mut loader = MemLoader::default();
        let mut other = Element::empty_dict();
        other
            .set(TreePath::parse("/kernel").unwrap().terms(), Element::Str("6.1".into()))
            .unwrap();
        loader.objects.insert("ns/defaults".to_string(), other.protect());
        loader.add("node", "object template node;\n'/k' = value('ns/defaults:/kernel');\n");
        let (tree, ctx) = build(&loader, "node").unwrap();
        assert_eq!(get(&tree, "/k"), Some(&Element::Str("6.1".into())));
        assert!(ctx
            .object_dependencies
            .contains(&TemplateName::parse("ns/defaults").unwrap()));
    }

    #[test]
    fn self_reference_reads_own_tree() {
        let mut loader = MemLoader::default();
        loader.add("node", "object template node;\n'/a' = 1;\n'/b' = value('node:/a');\n");
        let (tree, ctx) = build(&loader, "node").unwrap();
        assert_eq!(get(&tree, "/b"), Some(&Element::Long(1)));
        assert!(ctx.object_dependencies.is_empty());
    }

    #[test]
    fn missing_value_fails() {
        let mut loader = MemLoader::default();
        loader.add("node", "object template node;\n'/b' = value('/nothing');\n");
        let err = build(&loader, "node").unwrap_err();
        assert!(err.to_string().contains("has no value"));
    }

    #[test]
    fn text_files_are_recorded() {
        let tmp = tempfile::TempDir::new().unwrap();
        let motd = tmp.path().join("files").join("motd");
        std::fs::create_dir_all(motd.parent().unwrap()).unwrap();
        std::fs::write(&motd, "hello\n").unwrap();
        let mut loader = MemLoader::default();
        loader.texts.insert("files/motd".to_string(), motd);
        loader.add(
            "node",
            "object template node;\n'/motd' = file_contents('files/motd');\n'/issue' = file_exists('files/issue');\n",
        );
        let (tree, ctx) = build(&loader, "node").unwrap();
        assert_eq!(get(&tree, "/motd"), Some(&Element::Str("hello\n".into())));
        assert_eq!(get(&tree, "/issue"), Some(&Element::Bool(false)));
        let text_kinds: Vec<SourceKind> = ctx
            .dependencies
            .iter()
            .filter(|d| d.kind().is_text())
            .map(|d| d.kind())
            .collect();
        assert_eq!(text_kinds, vec![SourceKind::AbsentText, SourceKind::Text]);
    }

    #[test]
    fn bindings_are_collected() {
        let mut loader = MemLoader::default();
        loader.add("ns/types", "declaration template ns/types;\nbind '/n' = long(1..4);\n");
        loader.add("node", "object template node;\ninclude 'ns/types';\n'/n' = 2;\n");
        let (_, ctx) = build(&loader, "node").unwrap();
        assert_eq!(ctx.bindings.len(), 1);
        assert_eq!(ctx.bindings[0].full_type.to_string(), "long(1..4)");
    }

    #[test]
    fn non_object_rejected() {
        let mut loader = MemLoader::default();
        loader.add("ns/base", "template ns/base;\n");
        assert!(build(&loader, "ns/base").is_err());
    }
}
