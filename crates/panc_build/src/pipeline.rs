//! The stage computations and the caches that hold their results.

use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use dashmap::DashMap;
use filetime::FileTime;
use panc_cache::{DepFormatter, MemoCache};
use panc_common::{SourceKind, TemplateName};
use panc_output::{Formatter, Profile};
use panc_source::SourceFile;
use panc_template::{
    build_object, compile_file, parse_header, validate_bindings, CompiledTemplate, EvalOptions,
    EvaluationError, LinkResolver, ObjectContext, ProtectedTree, TemplateKind, TemplateLoader,
};

use crate::error::{shared, CompileError};
use crate::objects::ObjectDependencies;
use crate::options::CompilerOptions;
use crate::stage::Stage;
use crate::statistics::Counters;

/// Result type of every stage.
pub type StageResult<T> = Result<Arc<T>, Arc<CompileError>>;

/// Output of the build stage.
#[derive(Debug)]
pub struct BuiltObject {
    /// The object template's own source.
    pub source: SourceFile,
    /// The configuration tree.
    pub tree: ProtectedTree,
    /// Bindings and dependencies recorded while building.
    pub context: ObjectContext,
}

/// Output of the validate-own stage.
#[derive(Debug)]
pub struct ValidatedObject {
    /// The validated tree.
    pub tree: ProtectedTree,
    /// Source entities consulted while building this object.
    pub dependencies: BTreeSet<SourceFile>,
    /// Objects referenced while building or through `link` values.
    pub object_dependencies: BTreeSet<TemplateName>,
}

/// Output of the validate-transitive stage.
#[derive(Debug)]
pub struct FinalObject {
    /// The object template.
    pub name: TemplateName,
    /// The validated tree.
    pub tree: ProtectedTree,
    /// When validation finished; every emitted file gets this mtime.
    pub timestamp: SystemTime,
    /// Objects this one references directly.
    pub object_dependencies: BTreeSet<TemplateName>,
    /// Source entities consulted by this object and every object it
    /// reaches, deduplicated.
    pub dependencies: BTreeSet<SourceFile>,
}

/// Output of the emit stage.
#[derive(Debug)]
pub struct EmittedObject {
    /// Files written, targets first and the dependency record last.
    pub files: Vec<PathBuf>,
}

/// Compile cache key: an absolute source path.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct SourceKey(PathBuf);

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// The five stage caches plus what the stages share.
///
/// Each stage method returns the memoized result for its key, computing it
/// on the calling thread if no one has yet. A stage needing an upstream
/// result, for its own name or another one, simply calls the upstream
/// method.
pub struct Pipeline {
    options: CompilerOptions,
    eval_options: EvalOptions,
    compiled: MemoCache<SourceKey, CompiledTemplate, CompileError>,
    built: MemoCache<TemplateName, BuiltObject, CompileError>,
    validated: MemoCache<TemplateName, ValidatedObject, CompileError>,
    finished: MemoCache<TemplateName, FinalObject, CompileError>,
    emitted: MemoCache<TemplateName, EmittedObject, CompileError>,
    requested: DashMap<TemplateName, SourceFile>,
    objects: ObjectDependencies,
    pub(crate) counters: Counters,
}

impl Pipeline {
    /// Creates a pipeline with empty caches.
    pub fn new(options: CompilerOptions) -> Self {
        let eval_options = EvalOptions {
            max_recursion: options.max_recursion,
        };
        Self {
            options,
            eval_options,
            compiled: MemoCache::new(Stage::Compile.name()),
            built: MemoCache::new(Stage::Build.name()),
            validated: MemoCache::new(Stage::ValidateOwn.name()),
            finished: MemoCache::new(Stage::ValidateTransitive.name()),
            emitted: MemoCache::new(Stage::Emit.name()),
            requested: DashMap::new(),
            objects: ObjectDependencies::new(),
            counters: Counters::default(),
        }
    }

    /// The options this pipeline was created with.
    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    fn stage<V>(
        &self,
        stage: Stage,
        key: &dyn fmt::Display,
        work: impl FnOnce() -> Result<V, Arc<CompileError>>,
    ) -> Result<V, Arc<CompileError>> {
        self.counters.started(stage);
        tracing::debug!(stage = stage.name(), name = %key, "stage started");
        let result = work();
        self.counters.finished(stage, result.is_ok());
        match &result {
            Ok(_) => tracing::debug!(stage = stage.name(), name = %key, "stage finished"),
            Err(err) => tracing::debug!(stage = stage.name(), name = %key, error = %err, "stage failed"),
        }
        result
    }

    /// Compiles a source file, once per path.
    pub fn compile(&self, path: &Path) -> StageResult<CompiledTemplate> {
        self.compiled.get_or_compute(SourceKey(path.to_path_buf()), || {
            self.stage(Stage::Compile, &path.display(), || {
                compile_file(path).map_err(shared)
            })
        })
    }

    /// Parses a source file without caching the result.
    pub fn check(&self, path: &Path) -> Result<(), Arc<CompileError>> {
        self.stage(Stage::Compile, &path.display(), || {
            compile_file(path).map(|_| ()).map_err(shared)
        })
    }

    /// Makes a requested object template file the source of its declared
    /// name, so that every build of that name, whoever asks first, reads
    /// this file.
    ///
    /// Only the header is read. Files that cannot be read or whose header
    /// does not parse are left to the compile stage to report.
    pub(crate) fn register_request(&self, path: &Path) {
        let Ok(text) = fs::read_to_string(path) else {
            return;
        };
        let Ok(header) = parse_header(path, &text) else {
            return;
        };
        if header.kind != TemplateKind::Object {
            return;
        }
        let kind = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(|e| SourceKind::from_template_extension(&format!(".{e}")))
            .unwrap_or(SourceKind::Pan);
        match SourceFile::new(header.name.clone(), kind, Some(path.to_path_buf())) {
            Ok(source) => {
                tracing::trace!(name = %header.name, path = %path.display(), "object requested by file");
                self.requested.insert(header.name, source);
            }
            Err(err) => tracing::debug!(path = %path.display(), error = %err, "request not registered"),
        }
    }

    fn object_source(&self, name: &TemplateName) -> Result<SourceFile, Arc<CompileError>> {
        if let Some(source) = self.requested.get(name) {
            return Ok(source.value().clone());
        }
        let source = self.options.repository.lookup_template(name);
        if source.is_absent() {
            return Err(shared(CompileError::MissingSource { name: name.clone() }));
        }
        Ok(source)
    }

    /// The compiled template for a present source. A requested file's
    /// compile job may already be running; the compile cache joins it.
    fn compiled(&self, source: &SourceFile) -> StageResult<CompiledTemplate> {
        match source.path() {
            Some(path) => self.compile(path),
            None => Err(shared(CompileError::MissingSource {
                name: source.name().clone(),
            })),
        }
    }

    /// Evaluates an object template into its tree.
    pub fn build(&self, name: &TemplateName) -> StageResult<BuiltObject> {
        self.built.get_or_compute(name.clone(), || {
            self.stage(Stage::Build, name, || {
                let source = self.object_source(name)?;
                let template = self.compiled(&source)?;
                let loader = ObjectLoader {
                    pipeline: self,
                    object: name,
                };
                let (tree, context) =
                    build_object(&template, &source, &loader, &self.eval_options).map_err(shared)?;
                Ok(BuiltObject {
                    source,
                    tree,
                    context,
                })
            })
        })
    }

    /// Checks an object's own tree: no undefined values, and every bound
    /// path holds a value of its type.
    pub fn validate_own(&self, name: &TemplateName) -> StageResult<ValidatedObject> {
        self.validated.get_or_compute(name.clone(), || {
            self.stage(Stage::ValidateOwn, name, || {
                let built = self.build(name)?;
                if let Some(path) = built.tree.first_undefined() {
                    return Err(shared(CompileError::Undefined {
                        name: name.clone(),
                        path: path.to_string(),
                    }));
                }
                let links = validate_bindings(
                    &built.tree,
                    &built.context.bindings,
                    &LinkLookup { pipeline: self },
                )
                .map_err(shared)?;
                let mut object_dependencies = built.context.object_dependencies.clone();
                object_dependencies.extend(links);
                object_dependencies.remove(name);
                Ok(ValidatedObject {
                    tree: built.tree.clone(),
                    dependencies: built.context.dependencies.clone(),
                    object_dependencies,
                })
            })
        })
    }

    /// Validates every object reachable from `name` and gathers the
    /// dependencies of all of them.
    ///
    /// Each reachable object is visited once, so reference cycles terminate.
    /// The first failing object stops the walk with an error naming it.
    pub fn validate_transitive(&self, name: &TemplateName) -> StageResult<FinalObject> {
        self.finished.get_or_compute(name.clone(), || {
            self.stage(Stage::ValidateTransitive, name, || {
                let own = self.validate_own(name)?;
                let mut dependencies = own.dependencies.clone();
                let mut visited = BTreeSet::from([name.clone()]);
                let mut pending: VecDeque<TemplateName> =
                    own.object_dependencies.iter().cloned().collect();
                while let Some(dependency) = pending.pop_front() {
                    if !visited.insert(dependency.clone()) {
                        continue;
                    }
                    let other = self.validate_own(&dependency).map_err(|source| {
                        shared(CompileError::Validation {
                            name: name.clone(),
                            dependency: dependency.clone(),
                            source,
                        })
                    })?;
                    dependencies.extend(other.dependencies.iter().cloned());
                    pending.extend(
                        other
                            .object_dependencies
                            .iter()
                            .filter(|d| !visited.contains(*d))
                            .cloned(),
                    );
                }
                tracing::trace!(name = %name, objects = visited.len(), "closure validated");
                Ok(FinalObject {
                    name: name.clone(),
                    tree: own.tree.clone(),
                    timestamp: SystemTime::now(),
                    object_dependencies: own.object_dependencies.clone(),
                    dependencies,
                })
            })
        })
    }

    /// Writes every configured output file, then the dependency record, and
    /// stamps all of them with the validation timestamp.
    pub fn emit(&self, name: &TemplateName) -> StageResult<EmittedObject> {
        self.emitted.get_or_compute(name.clone(), || {
            self.stage(Stage::Emit, name, || {
                let object = self.validate_transitive(name)?;
                let profile = Profile {
                    name,
                    tree: &object.tree,
                    dependencies: &object.dependencies,
                };
                let mut files = Vec::with_capacity(self.options.formatters.len() + 1);
                for formatter in &self.options.formatters {
                    files.push(self.write_target(formatter.as_ref(), &profile)?);
                }
                files.push(self.write_target(&DepFormatter, &profile)?);
                let mtime = FileTime::from_system_time(object.timestamp);
                for file in &files {
                    filetime::set_file_mtime(file, mtime).map_err(|source| {
                        shared(CompileError::System {
                            path: file.clone(),
                            source,
                        })
                    })?;
                }
                Ok(EmittedObject { files })
            })
        })
    }

    fn write_target(
        &self,
        formatter: &dyn Formatter,
        profile: &Profile<'_>,
    ) -> Result<PathBuf, Arc<CompileError>> {
        let path = self.options.output_dir.join(formatter.result_path(profile.name));
        let system = |path: &Path| {
            let path = path.to_path_buf();
            move |source| shared(CompileError::System { path, source })
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(system(parent))?;
        }
        let file = File::create(&path).map_err(system(path.as_path()))?;
        let mut out = BufWriter::new(file);
        formatter.write(profile, &mut out).map_err(|source| {
            shared(CompileError::Output {
                name: profile.name.clone(),
                source,
            })
        })?;
        out.flush().map_err(system(path.as_path()))?;
        tracing::trace!(path = %path.display(), format = formatter.key(), "written");
        Ok(path)
    }

    /// The build result for `name`, if it has finished.
    pub fn built(&self, name: &TemplateName) -> Option<StageResult<BuiltObject>> {
        self.built.peek(name)
    }

    /// The validate-transitive result for `name`, if it has finished.
    pub fn finished(&self, name: &TemplateName) -> Option<StageResult<FinalObject>> {
        self.finished.peek(name)
    }
}

/// Gives the evaluator access to templates and other objects through the
/// stage caches.
struct ObjectLoader<'a> {
    pipeline: &'a Pipeline,
    object: &'a TemplateName,
}

impl TemplateLoader for ObjectLoader<'_> {
    fn lookup_template(&self, name: &TemplateName) -> SourceFile {
        self.pipeline.options.repository.lookup_template(name)
    }

    fn load_template(&self, source: &SourceFile) -> Result<Arc<CompiledTemplate>, EvaluationError> {
        self.pipeline.compiled(source).map_err(|err| match &*err {
            CompileError::Syntax(syntax) => EvaluationError::Syntax(Arc::clone(syntax)),
            _ => EvaluationError::Upstream {
                object: source.name().clone(),
                source: err,
            },
        })
    }

    fn lookup_text(&self, name: &TemplateName) -> SourceFile {
        self.pipeline.options.repository.lookup_text(name)
    }

    fn external_tree(&self, object: &TemplateName) -> Result<ProtectedTree, EvaluationError> {
        let upstream = |err: Arc<CompileError>| EvaluationError::Upstream {
            object: object.clone(),
            source: err,
        };
        let _waiting = self
            .pipeline
            .objects
            .wait_on(self.object, object)
            .map_err(|err| upstream(shared(err)))?;
        let built = self.pipeline.build(object).map_err(upstream)?;
        Ok(built.tree.clone())
    }
}

/// Resolves `link` targets in other objects. Only their build is needed, so
/// objects may link to each other.
struct LinkLookup<'a> {
    pipeline: &'a Pipeline,
}

impl LinkResolver for LinkLookup<'_> {
    fn resolve(&self, object: &TemplateName) -> Result<ProtectedTree, EvaluationError> {
        self.pipeline
            .build(object)
            .map(|built| built.tree.clone())
            .map_err(|err| EvaluationError::Upstream {
                object: object.clone(),
                source: err,
            })
    }
}
