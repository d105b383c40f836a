//! Persistence of enriched rows and run parameters.

mod csv;
mod manifest;

pub use self::csv::{CsvRowWriter, CSV_HEADER};
pub use manifest::{RunManifest, MANIFEST_FILE};

use std::path::PathBuf;

use crate::pipeline::EnrichedRow;
use crate::source::DateWindow;

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization failed: {0}")]
    Serialize(String),
}

/// Destination for the final rows of a run.
pub trait RowSink: Send + Sync {
    /// Persist `rows` for `window`, returning where they went.
    fn write(&self, window: &DateWindow, rows: &[EnrichedRow]) -> Result<PathBuf, OutputError>;
}
