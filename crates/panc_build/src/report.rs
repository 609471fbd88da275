//! Per-run outcome report.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use panc_common::TemplateName;

use crate::error::CompileError;
use crate::statistics::Statistics;

/// Something a run was asked to produce.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Artifact {
    /// A source file; used until the file's template name is known.
    File(PathBuf),
    /// An object template.
    Object(TemplateName),
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Artifact::File(path) => write!(f, "{}", path.display()),
            Artifact::Object(name) => write!(f, "{name}"),
        }
    }
}

/// The result of one [`Compiler::run`](crate::Compiler::run).
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Artifacts that went through every stage that applies to them.
    pub succeeded: Vec<Artifact>,
    /// Artifacts that failed, with the error that stopped them.
    pub failed: Vec<(Artifact, Arc<CompileError>)>,
    /// Files left out because their outputs were already current.
    pub skipped: Vec<PathBuf>,
    /// Stage counters and timing.
    pub statistics: Statistics,
}

impl BuildReport {
    /// Whether no artifact failed.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub(crate) fn sort(&mut self) {
        self.succeeded.sort();
        self.failed.sort_by(|a, b| a.0.cmp(&b.0));
        self.skipped.sort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_display() {
        assert_eq!(Artifact::File(PathBuf::from("/s/a.pan")).to_string(), "/s/a.pan");
        assert_eq!(
            Artifact::Object(TemplateName::parse("ns/a").unwrap()).to_string(),
            "ns/a"
        );
    }

    #[test]
    fn empty_report_is_success() {
        assert!(BuildReport::default().is_success());
    }
}
