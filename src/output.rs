//! Result types returned by the `process*` entry points.

use crate::error::{FileError, StripError};
use serde::{Deserialize, Serialize};

/// The outcome of a successful split or merge run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessOutput {
    /// Finished zip archive. Empty when the archive was persisted to disk by
    /// [`crate::process::process_to_file`].
    #[serde(skip)]
    pub archive: Vec<u8>,

    /// Archive entries in write order.
    pub entries: Vec<ArchiveEntry>,

    /// Input files that were left out or could not be cleaned up.
    pub skipped: Vec<FileError>,

    pub stats: ProcessStats,
}

/// One image written into the archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Encoded size in bytes.
    pub bytes: usize,
}

/// Counters for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessStats {
    /// `"split"` or `"merge"`.
    pub operation: String,
    /// Images decoded and handed to the transform.
    pub input_images: usize,
    /// Output images in the archive.
    pub output_images: usize,
    /// Rows discarded by a split under [`crate::config::RemainderPolicy::Drop`].
    pub dropped_rows: u32,
    /// On-disk sources deleted after packaging.
    pub consumed_sources: usize,
    /// Size of the finished archive.
    pub archive_bytes: usize,
    pub total_duration_ms: u64,
}

/// The `{ "error": "..." }` body handed back to callers on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub error: String,
}

impl From<&StripError> for ErrorPayload {
    fn from(e: &StripError) -> Self {
        Self {
            error: e.to_string(),
        }
    }
}
