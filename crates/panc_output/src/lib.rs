//! Profile serializers for the pan compiler.
//!
//! Every output format implements the [`Formatter`] trait, which names the
//! format, computes the file a profile is written to, and serializes a
//! [`Profile`]. [`formatter_for`] maps a configured [`OutputFormat`] to its
//! implementation, optionally wrapped in gzip compression.

#![warn(missing_docs)]

pub mod error;
pub mod formatter;
pub mod gzip;
pub mod json;
pub mod pan;
pub mod txt;

use std::sync::Arc;

pub use error::OutputError;
pub use formatter::{Formatter, Profile};
pub use gzip::Gzipped;
pub use json::JsonFormatter;
pub use pan::PanFormatter;
pub use txt::TxtFormatter;

use panc_config::OutputFormat;

/// Returns the formatter for a configured output format.
pub fn formatter_for(format: OutputFormat, gzip: bool) -> Arc<dyn Formatter> {
    let plain: Arc<dyn Formatter> = match format {
        OutputFormat::Json => Arc::new(JsonFormatter),
        OutputFormat::Pan => Arc::new(PanFormatter),
        OutputFormat::Txt => Arc::new(TxtFormatter),
    };
    if gzip {
        Arc::new(Gzipped::new(plain))
    } else {
        plain
    }
}
