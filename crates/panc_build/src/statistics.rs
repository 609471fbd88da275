//! Run statistics.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::stage::Stage;

/// Live counters updated by the stages.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    files: AtomicUsize,
    started: [AtomicUsize; 5],
    finished: [AtomicUsize; 5],
    failed: [AtomicUsize; 5],
}

impl Counters {
    pub(crate) fn file_requested(&self) {
        self.files.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn started(&self, stage: Stage) {
        self.started[stage.index()].fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn finished(&self, stage: Stage, ok: bool) {
        self.finished[stage.index()].fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.failed[stage.index()].fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn snapshot(&self, elapsed: Duration) -> Statistics {
        let load = |counters: &[AtomicUsize; 5]| counters.each_ref().map(|c| c.load(Ordering::Relaxed));
        Statistics {
            files: self.files.load(Ordering::Relaxed),
            started: load(&self.started),
            finished: load(&self.finished),
            failed: load(&self.failed),
            elapsed,
        }
    }
}

/// What a run did, per stage.
///
/// Counts cover every computation the stage caches performed, including
/// objects pulled in only because a requested object references them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Statistics {
    /// Source files submitted to the compile stage.
    pub files: usize,
    started: [usize; 5],
    finished: [usize; 5],
    failed: [usize; 5],
    /// Wall-clock time of the run.
    pub elapsed: Duration,
}

impl Statistics {
    /// Computations the stage began.
    pub fn started(&self, stage: Stage) -> usize {
        self.started[stage.index()]
    }

    /// Computations the stage completed, successfully or not.
    pub fn finished(&self, stage: Stage) -> usize {
        self.finished[stage.index()]
    }

    /// Computations the stage completed with an error.
    pub fn failed(&self, stage: Stage) -> usize {
        self.failed[stage.index()]
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} files", self.files)?;
        for stage in Stage::ALL {
            write!(f, ", {} {}", self.finished(stage), stage.name())?;
            let failed = self.failed(stage);
            if failed > 0 {
                write!(f, " ({failed} failed)")?;
            }
        }
        write!(f, " in {:.2}s", self.elapsed.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_snapshot() {
        let counters = Counters::default();
        counters.file_requested();
        counters.started(Stage::Build);
        counters.finished(Stage::Build, false);
        counters.started(Stage::Emit);
        let stats = counters.snapshot(Duration::from_millis(1500));
        assert_eq!(stats.files, 1);
        assert_eq!(stats.started(Stage::Build), 1);
        assert_eq!(stats.failed(Stage::Build), 1);
        assert_eq!(stats.started(Stage::Emit), 1);
        assert_eq!(stats.finished(Stage::Emit), 0);
    }

    #[test]
    fn display_summarizes_stages() {
        let counters = Counters::default();
        counters.finished(Stage::Compile, true);
        counters.finished(Stage::Build, false);
        let text = counters.snapshot(Duration::from_secs(2)).to_string();
        assert_eq!(
            text,
            "0 files, 1 compile, 1 build (1 failed), 0 validate-own, 0 validate-transitive, 0 emit in 2.00s"
        );
    }
}
