//! Progress-callback trait for per-image pipeline events.
//!
//! Inject an [`Arc<dyn StripProgressCallback>`] via
//! [`crate::config::StripConfigBuilder::progress_callback`] to receive events
//! as the pipeline moves through its stages and produces each output image.
//!
//! # Example
//!
//! ```rust
//! use stripcut::{StripConfig, StripProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     written: AtomicUsize,
//! }
//!
//! impl StripProgressCallback for CountingCallback {
//!     fn on_output_complete(&self, index: usize, total: usize, name: &str, bytes: usize) {
//!         self.written.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{}/{} {} ({} bytes)", index + 1, total, name, bytes);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { written: AtomicUsize::new(0) });
//!
//! let config = StripConfig::builder()
//!     .progress_callback(counter as Arc<dyn StripProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Pipeline state reached by a run.
///
/// `Loaded → Ordered → Transformed → Packaged → Cleaned`. `Cleaned` is only
/// reported when the run had on-disk sources to consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    Loaded,
    Ordered,
    Transformed,
    Packaged,
    Cleaned,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Loaded => "loaded",
            Stage::Ordered => "ordered",
            Stage::Transformed => "transformed",
            Stage::Packaged => "packaged",
            Stage::Cleaned => "cleaned",
        };
        f.write_str(s)
    }
}

/// Called by the pipeline as it runs.
///
/// The pipeline is sequential, so methods are never called concurrently for
/// one run; the `Send + Sync` bound lets a callback be shared by runs on
/// different threads. All methods default to no-ops.
pub trait StripProgressCallback: Send + Sync {
    /// Called once the image set is decoded.
    ///
    /// # Arguments
    /// * `images`: number of decoded images
    /// * `skipped`: number of files left out (decode failure, bad extension)
    fn on_load_complete(&self, images: usize, skipped: usize) {
        let _ = (images, skipped);
    }

    /// Called each time the run reaches a new [`Stage`].
    fn on_stage(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when an input file is skipped.
    fn on_file_skipped(&self, name: &str, error: &str) {
        let _ = (name, error);
    }

    /// Called before the first output image is produced.
    ///
    /// # Arguments
    /// * `total_outputs`: number of strips or groups that will be written
    fn on_transform_start(&self, total_outputs: usize) {
        let _ = total_outputs;
    }

    /// Called after each output image is encoded.
    ///
    /// # Arguments
    /// * `index`: 0-based output index
    /// * `total`: total outputs
    /// * `name`: archive entry name
    /// * `bytes`: encoded size
    fn on_output_complete(&self, index: usize, total: usize, name: &str, bytes: usize) {
        let _ = (index, total, name, bytes);
    }

    /// Called once after the archive is built (and sources consumed).
    fn on_run_complete(&self, outputs: usize) {
        let _ = outputs;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl StripProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::StripConfig`].
pub type ProgressCallback = Arc<dyn StripProgressCallback>;
