//! Build-time references between objects.

use std::collections::HashMap;

use panc_common::TemplateName;
use parking_lot::Mutex;

use crate::error::CompileError;

/// Which object each running build is currently waiting on.
///
/// A build that reads another object's tree must wait for that object's
/// build. If the other object is itself (directly or not) waiting on the
/// first one, neither could ever finish, so the edge is refused and a
/// [`CompileError::Cycle`] returned instead.
///
/// The recorded edges never form a cycle, so walking them always ends.
#[derive(Debug, Default)]
pub struct ObjectDependencies {
    waiting: Mutex<HashMap<TemplateName, TemplateName>>,
}

impl ObjectDependencies {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `from` is about to wait for `to`.
    ///
    /// The edge is removed when the returned guard is dropped.
    pub fn wait_on<'a>(
        &'a self,
        from: &'a TemplateName,
        to: &TemplateName,
    ) -> Result<WaitGuard<'a>, CompileError> {
        let mut waiting = self.waiting.lock();
        let mut chain = vec![from.to_string(), to.to_string()];
        let mut current = to.clone();
        while &current != from {
            let Some(next) = waiting.get(&current).cloned() else {
                waiting.insert(from.clone(), to.clone());
                return Ok(WaitGuard { owner: self, from });
            };
            chain.push(next.to_string());
            current = next;
        }
        Err(CompileError::Cycle {
            chain: chain.join(" -> "),
        })
    }

    /// Number of builds currently waiting.
    pub fn len(&self) -> usize {
        self.waiting.lock().len()
    }

    /// Whether no build is waiting.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Removes a waiting edge when dropped.
#[derive(Debug)]
pub struct WaitGuard<'a> {
    owner: &'a ObjectDependencies,
    from: &'a TemplateName,
}

impl Drop for WaitGuard<'_> {
    fn drop(&mut self) {
        self.owner.waiting.lock().remove(self.from);
    }
}
