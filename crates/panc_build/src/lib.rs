//! The staged, memoizing build pipeline of the pan compiler.
//!
//! Every requested object template goes through five stages, each backed by
//! its own [`MemoCache`](panc_cache::MemoCache):
//!
//! 1. **Compile** parses a source file into a `CompiledTemplate`.
//! 2. **Build** evaluates an object template into a configuration tree.
//! 3. **Validate-Own** rejects undefined values and checks type bindings.
//! 4. **Validate-Transitive** validates every object reachable through
//!    external references and collects the full dependency set.
//! 5. **Emit** writes one file per formatter and the dependency record.
//!
//! The [`Compiler`] owns the caches and one worker pool per stage family, and
//! pushes each requested name from stage to stage. Stages that need another
//! object's results pull them through the caches on their own thread.

#![warn(missing_docs)]

pub mod compiler;
pub mod error;
pub mod objects;
pub mod options;
pub mod pipeline;
pub mod report;
pub mod stage;
pub mod statistics;

pub use compiler::Compiler;
pub use error::CompileError;
pub use objects::ObjectDependencies;
pub use options::{CompilerOptions, ThreadCounts};
pub use pipeline::{BuiltObject, EmittedObject, FinalObject, Pipeline, ValidatedObject};
pub use report::{Artifact, BuildReport};
pub use stage::Stage;
pub use statistics::Statistics;
