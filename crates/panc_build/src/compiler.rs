//! The orchestrator: worker pools and the run loop.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};
use panc_cache::{CacheError, DependencyChecker};
use panc_common::TemplateName;
use panc_template::CompiledTemplate;
use rayon::prelude::*;
use rayon::ThreadPool;

use crate::error::CompileError;
use crate::options::CompilerOptions;
use crate::pipeline::Pipeline;
use crate::report::{Artifact, BuildReport};

/// Where a stage family's jobs run.
enum StagePool {
    Rayon(ThreadPool),
    Inline,
}

impl StagePool {
    /// Builds a pool of `threads` workers, halving the size when the OS
    /// refuses threads and running jobs inline when it refuses all of them.
    fn new(family: &'static str, threads: usize) -> Self {
        let mut threads = threads.max(1);
        loop {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(move |i| format!("panc-{family}-{i}"))
                .build()
            {
                Ok(pool) => return StagePool::Rayon(pool),
                Err(err) if threads > 1 => {
                    tracing::warn!(family, threads, error = %err, "cannot start worker pool, retrying smaller");
                    threads /= 2;
                }
                Err(err) => {
                    tracing::warn!(family, error = %err, "cannot start worker pool, running inline");
                    return StagePool::Inline;
                }
            }
        }
    }

    fn spawn(&self, job: impl FnOnce() + Send + 'static) {
        match self {
            StagePool::Rayon(pool) => pool.spawn(job),
            StagePool::Inline => job(),
        }
    }
}

struct Pools {
    compile: StagePool,
    build: StagePool,
    validate: StagePool,
    emit: StagePool,
}

/// Work submitted to a pool.
enum Job {
    Compile(PathBuf),
    Check(PathBuf),
    Build(TemplateName),
    Validate(TemplateName),
    Emit(TemplateName),
}

/// What a finished job reports back to the run loop.
enum Event {
    Compiled(PathBuf, Result<Arc<CompiledTemplate>, Arc<CompileError>>),
    Checked(PathBuf, Result<(), Arc<CompileError>>),
    Built(TemplateName, Result<(), Arc<CompileError>>),
    Validated(TemplateName, Result<(), Arc<CompileError>>),
    Emitted(TemplateName, Result<(), Arc<CompileError>>),
}

/// Drives requested files and names through the pipeline.
///
/// Each stage family has its own worker pool. When a stage finishes for a
/// name, the run loop submits the next stage for that name to the next
/// family's pool. Caches live as long as the compiler, so a second run
/// reuses everything the first one computed.
pub struct Compiler {
    pipeline: Arc<Pipeline>,
    pools: Pools,
    checker: DependencyChecker,
}

impl Compiler {
    /// Creates a compiler. Fails only if the dependency ignore pattern is
    /// not a valid regular expression.
    pub fn new(options: CompilerOptions) -> Result<Self, CacheError> {
        let mut checker = DependencyChecker::new(
            options.repository.clone(),
            options.output_dir.clone(),
            options.formatters.clone(),
        );
        if let Some(pattern) = &options.ignore_dependency_pattern {
            checker = checker.with_ignore_pattern(pattern)?;
        }
        let threads = options.threads.resolved();
        let pools = Pools {
            compile: StagePool::new("compile", threads.compile),
            build: StagePool::new("build", threads.build),
            validate: StagePool::new("validate", threads.validate),
            emit: StagePool::new("emit", threads.emit),
        };
        Ok(Self {
            pipeline: Arc::new(Pipeline::new(options)),
            pools,
            checker,
        })
    }

    /// The stage caches.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// The staleness checker for this compiler's outputs.
    pub fn checker(&self) -> &DependencyChecker {
        &self.checker
    }

    /// Compiles the given source files and object names.
    ///
    /// Object templates among the files are registered as the source of
    /// their names before any job starts. Files go through every stage;
    /// object templates found among them are built, validated and, when
    /// formatters are configured, emitted. Other templates only need to
    /// compile. Names skip the compile submission and
    /// start at the build stage. In syntax-only mode files are only parsed
    /// and names are ignored.
    pub fn run(&self, files: &[PathBuf], names: &[TemplateName]) -> BuildReport {
        let started = Instant::now();
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut in_flight = 0usize;
        let syntax_only = self.pipeline.options().syntax_only;

        if !syntax_only {
            let pipeline = &self.pipeline;
            files
                .par_iter()
                .for_each(|file| pipeline.register_request(file));
        }
        for file in files {
            self.pipeline.counters.file_requested();
            let job = if syntax_only {
                Job::Check(file.clone())
            } else {
                Job::Compile(file.clone())
            };
            self.submit(job, &tx);
            in_flight += 1;
        }
        if syntax_only && !names.is_empty() {
            tracing::warn!(count = names.len(), "object names are ignored when only checking syntax");
        } else {
            for name in names {
                self.submit(Job::Build(name.clone()), &tx);
                in_flight += 1;
            }
        }

        let mut report = BuildReport::default();
        self.drain(&rx, &tx, in_flight, &mut report);
        report.statistics = self.pipeline.counters.snapshot(started.elapsed());
        report.sort();
        tracing::info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "run finished"
        );
        report
    }

    /// Like [`run`](Self::run), but first drops files whose outputs are
    /// current; those are listed as skipped.
    pub fn run_incremental(&self, files: &[PathBuf], names: &[TemplateName]) -> BuildReport {
        let outdated = self.checker.filter_outdated(files);
        let rebuild: HashSet<&PathBuf> = outdated.iter().collect();
        let skipped: Vec<PathBuf> = files
            .iter()
            .filter(|f| !rebuild.contains(f))
            .cloned()
            .collect();
        tracing::info!(
            outdated = outdated.len(),
            skipped = skipped.len(),
            "dependency check finished"
        );
        let mut report = self.run(&outdated, names);
        report.skipped = skipped;
        report.sort();
        report
    }

    fn drain(
        &self,
        rx: &Receiver<Event>,
        tx: &Sender<Event>,
        mut in_flight: usize,
        report: &mut BuildReport,
    ) {
        while in_flight > 0 {
            let Ok(event) = rx.recv() else {
                break;
            };
            in_flight -= 1;
            if let Some(job) = self.advance(event, report) {
                self.submit(job, tx);
                in_flight += 1;
            }
        }
    }

    /// Records a finished job and returns the next job for the same name.
    fn advance(&self, event: Event, report: &mut BuildReport) -> Option<Job> {
        match event {
            Event::Compiled(file, Ok(template)) => {
                if !template.is_object() {
                    report.succeeded.push(Artifact::File(file));
                    return None;
                }
                Some(Job::Build(template.name.clone()))
            }
            Event::Compiled(file, Err(err)) | Event::Checked(file, Err(err)) => {
                report.failed.push((Artifact::File(file), err));
                None
            }
            Event::Checked(file, Ok(())) => {
                report.succeeded.push(Artifact::File(file));
                None
            }
            Event::Built(name, Ok(())) => Some(Job::Validate(name)),
            Event::Validated(name, Ok(())) => {
                if self.pipeline.options().formatters.is_empty() {
                    report.succeeded.push(Artifact::Object(name));
                    None
                } else {
                    Some(Job::Emit(name))
                }
            }
            Event::Emitted(name, Ok(())) => {
                report.succeeded.push(Artifact::Object(name));
                None
            }
            Event::Built(name, Err(err))
            | Event::Validated(name, Err(err))
            | Event::Emitted(name, Err(err)) => {
                tracing::warn!(name = %name, error = %err, "object failed");
                report.failed.push((Artifact::Object(name), err));
                None
            }
        }
    }

    fn submit(&self, job: Job, tx: &Sender<Event>) {
        let pipeline = Arc::clone(&self.pipeline);
        let tx = tx.clone();
        let send = move |event| {
            if tx.send(event).is_err() {
                tracing::warn!("run loop ended before a stage reported");
            }
        };
        match job {
            Job::Compile(file) => self.pools.compile.spawn(move || {
                let result = pipeline.compile(&file);
                send(Event::Compiled(file, result));
            }),
            Job::Check(file) => self.pools.compile.spawn(move || {
                let result = pipeline.check(&file);
                send(Event::Checked(file, result));
            }),
            Job::Build(name) => self.pools.build.spawn(move || {
                let result = pipeline.build(&name).map(drop);
                send(Event::Built(name, result));
            }),
            Job::Validate(name) => self.pools.validate.spawn(move || {
                let result = pipeline.validate_transitive(&name).map(drop);
                send(Event::Validated(name, result));
            }),
            Job::Emit(name) => self.pools.emit.spawn(move || {
                let result = pipeline.emit(&name).map(drop);
                send(Event::Emitted(name, result));
            }),
        }
    }
}
