//! Result caching and staleness detection for the pan compiler.
//!
//! Two independent pieces live here:
//!
//! - [`MemoCache`], the keyed memoizing cache every compiler stage stores its
//!   results in. A computation for a key runs at most once; concurrent
//!   requesters block until it finishes and then share the result (or the
//!   error).
//! - [`DependencyChecker`], which decides from the dependency records written
//!   next to each profile whether an object template must be rebuilt. It
//!   never fails: anything it cannot establish counts as outdated.
//!
//! The dependency record format itself is defined by [`DependencyRecord`],
//! and [`DepFormatter`] writes it as one more output format.

#![warn(missing_docs)]

pub mod checker;
pub mod error;
pub mod memo;
pub mod record;
pub mod stat;

pub use checker::{DependencyChecker, Staleness};
pub use error::{CacheError, MemoError};
pub use memo::{MemoCache, Outcome};
pub use record::{DepFormatter, DependencyEntry, DependencyRecord, DEP_SUFFIX};
pub use stat::FileStatCache;
