//! The pipeline stages.

use std::fmt;

/// One stage of the pipeline, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    /// Source file to compiled template.
    Compile,
    /// Compiled object template to configuration tree.
    Build,
    /// Checks of the object's own tree.
    ValidateOwn,
    /// Checks of every object reachable from this one.
    ValidateTransitive,
    /// Output files and dependency record.
    Emit,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 5] = [
        Stage::Compile,
        Stage::Build,
        Stage::ValidateOwn,
        Stage::ValidateTransitive,
        Stage::Emit,
    ];

    /// Name used in logs, errors and statistics.
    pub fn name(self) -> &'static str {
        match self {
            Stage::Compile => "compile",
            Stage::Build => "build",
            Stage::ValidateOwn => "validate-own",
            Stage::ValidateTransitive => "validate-transitive",
            Stage::Emit => "emit",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
