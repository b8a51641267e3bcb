//! # stripcut
//!
//! Split long vertical manga/webtoon images into equal-height strips, or
//! merge ordered strips back into taller pages, and package the results as a
//! zip archive.
//!
//! ## Pipeline Overview
//!
//! ```text
//! folder or uploaded buffers
//!  │
//!  ├─ 1. Load     decode .png/.jpg/.jpeg/.webp, optional resize
//!  ├─ 2. Order    stable natural sort on numbers in file names
//!  ├─ 3. Split    one image → P bands of floor(H / P) rows
//!  │    or Merge  N images → ceil(N / K) stacked strips
//!  ├─ 4. Encode   flatten alpha, JPEG q95 (or PNG)
//!  ├─ 5. Package  zip, in memory or atomically on disk
//!  └─ 6. Clean    on-disk sources consumed by the run are deleted
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stripcut::{process_blocking, ImageSource, Operation, SplitMode, StripConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = StripConfig::default();
//!     let output = process_blocking(
//!         ImageSource::on_disk("chapter_01"),
//!         &Operation::Split(SplitMode::Parts(3)),
//!         &config,
//!     )?;
//!     std::fs::write("processed_images.zip", &output.archive)?;
//!     eprintln!("{} strips", output.stats.output_images);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `stripcut` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! stripcut = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    AlphaPolicy, NamingScheme, OrderingKey, OutputFormat, RemainderPolicy, ResizeSpec,
    StripConfig, StripConfigBuilder,
};
pub use error::{FileError, StripError};
pub use output::{ArchiveEntry, ErrorPayload, ProcessOutput, ProcessStats};
pub use pipeline::input::{ImageSet, ImageSource, InputImage, LoadedImage};
pub use pipeline::split::{SplitMode, SplitPlan};
pub use process::{
    process, process_blocking, process_to_file, process_to_file_blocking, Operation,
};
pub use progress::{NoopProgressCallback, ProgressCallback, Stage, StripProgressCallback};
