//! Gzip compression around another formatter.

use std::io::Write;
use std::sync::Arc;

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::OutputError;
use crate::formatter::{io_error, Formatter, Profile};

/// Compresses the output of an inner formatter and appends `.gz` to its
/// suffix. The key is unchanged.
#[derive(Clone)]
pub struct Gzipped {
    inner: Arc<dyn Formatter>,
}

impl Gzipped {
    /// Wraps `inner`.
    pub fn new(inner: Arc<dyn Formatter>) -> Self {
        Self { inner }
    }
}

impl Formatter for Gzipped {
    fn key(&self) -> &'static str {
        self.inner.key()
    }

    fn suffix(&self) -> String {
        format!("{}.gz", self.inner.suffix())
    }

    fn write(&self, profile: &Profile<'_>, out: &mut dyn Write) -> Result<(), OutputError> {
        let mut encoder = GzEncoder::new(out, Compression::default());
        self.inner.write(profile, &mut encoder)?;
        encoder.finish().map_err(io_error(self.inner.key()))?;
        Ok(())
    }
}
