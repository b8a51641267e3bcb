//! Error types for the stripcut library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`StripError`] is **fatal**: the run cannot produce an archive at all
//!   (no images, wrong image count for the operation, packaging failure).
//!   Returned as `Err(StripError)` from the top-level `process*` functions.
//!
//! * [`FileError`] is **non-fatal**: a single input file was skipped
//!   (undecodable bytes, unsupported extension) or a consumed source could not
//!   be removed afterwards. Stored inside [`crate::output::ProcessOutput`] so
//!   callers can report partial input problems without losing the archive.
//!
//! Set [`crate::config::StripConfig::strict_decode`] to turn the first decode
//! failure into a fatal [`StripError::Decode`] instead.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the stripcut library.
///
/// Per-file failures use [`FileError`] and are stored in
/// [`crate::output::ProcessOutput::skipped`] rather than propagated here.
#[derive(Debug, Error)]
pub enum StripError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The on-disk source directory does not exist or is not a directory.
    #[error("Image folder not found: '{path}'")]
    DirectoryNotFound { path: PathBuf },

    /// The folder could not be listed.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The source contained no file with a supported image extension.
    #[error("No images found in {source_label} (accepted: .png, .jpg, .jpeg, .webp)")]
    NoImagesFound { source_label: String },

    /// Every candidate file failed to decode.
    #[error("All {total} images failed to decode.\nFirst error: {first_error}")]
    AllDecodesFailed { total: usize, first_error: String },

    /// A file failed to decode while `strict_decode` is enabled.
    #[error("Failed to decode image '{name}': {detail}")]
    Decode { name: String, detail: String },

    // ── Operation errors ──────────────────────────────────────────────────
    /// Split was requested on a set that does not hold exactly one image.
    #[error("Invalid operation: select exactly one image to split (got {count})")]
    SplitRequiresSingleImage { count: usize },

    /// Merge was requested with a group larger than the number of images.
    #[error(
        "Invalid operation: merge needs {group_size} images per group but only {available} images are available"
    )]
    InsufficientImages { available: usize, group_size: usize },

    /// A split/merge parameter is out of range for the given images.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    // ── Output errors ─────────────────────────────────────────────────────
    /// Encoding a transformed image failed.
    #[error("Failed to encode output '{name}': {detail}")]
    Encode { name: String, detail: String },

    /// Writing the zip archive failed. No partial archive is exposed.
    #[error("Failed to package archive: {detail}")]
    Packaging { detail: String },

    /// Could not create or persist the output archive file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<zip::result::ZipError> for StripError {
    fn from(e: zip::result::ZipError) -> Self {
        StripError::Packaging {
            detail: e.to_string(),
        }
    }
}

/// A non-fatal problem with a single input file.
///
/// The run continues; the file is left out of the transform (or, for
/// [`FileError::CleanupFailed`], left on disk).
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum FileError {
    /// The bytes could not be decoded by any supported codec.
    #[error("{name}: decode failed: {detail}")]
    DecodeFailed { name: String, detail: String },

    /// The file was listed but its bytes could not be read.
    #[error("{name}: read failed: {detail}")]
    ReadFailed { name: String, detail: String },

    /// An in-memory upload whose name does not carry an accepted extension.
    #[error("{name}: unsupported file extension")]
    UnsupportedExtension { name: String },

    /// A consumed on-disk source could not be deleted after packaging.
    #[error("{name}: could not remove consumed source: {detail}")]
    CleanupFailed { name: String, detail: String },
}

impl FileError {
    /// Name of the file this error refers to.
    pub fn name(&self) -> &str {
        match self {
            FileError::DecodeFailed { name, .. }
            | FileError::ReadFailed { name, .. }
            | FileError::UnsupportedExtension { name }
            | FileError::CleanupFailed { name, .. } => name,
        }
    }
}
