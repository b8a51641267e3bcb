//! Split/merge entry points.
//!
//! One call runs the whole pipeline for one request:
//! `Loaded → Ordered → Transformed → Packaged → Cleaned`. Nothing is shared
//! between calls; in-memory sources never touch the file system, and the
//! only file a run creates is the archive written by [`process_to_file`].
//! On error nothing is returned but the error, and any partially written
//! archive has already been removed.

use crate::config::StripConfig;
use crate::error::{FileError, StripError};
use crate::output::{ArchiveEntry, ProcessOutput, ProcessStats};
use crate::pipeline::input::{self, ImageSource, LoadedImage};
use crate::pipeline::split::{self, SplitMode};
use crate::pipeline::{encode, merge, order, package};
use crate::progress::Stage;
use image::{DynamicImage, RgbImage};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// What to do with the loaded images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Cut the single loaded image into strips.
    Split(SplitMode),
    /// Stack consecutive images, `group_size` per output.
    Merge { group_size: usize },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Split(_) => "split",
            Operation::Merge { .. } => "merge",
        }
    }
}

/// Where the finished archive goes.
enum ArchiveSink<'a> {
    Memory,
    File(&'a Path),
}

/// Run the pipeline on the current thread and return the archive in memory.
///
/// # Errors
/// Any [`StripError`]; see the variants for which stage raises which.
/// Undecodable files are skipped (and listed in
/// [`ProcessOutput::skipped`]) unless `config.strict_decode` is set.
pub fn process_blocking(
    source: ImageSource,
    operation: &Operation,
    config: &StripConfig,
) -> Result<ProcessOutput, StripError> {
    run(source, operation, config, ArchiveSink::Memory)
}

/// Run the pipeline on the current thread and write the archive to `path`.
pub fn process_to_file_blocking(
    source: ImageSource,
    operation: &Operation,
    config: &StripConfig,
    path: impl AsRef<Path>,
) -> Result<ProcessOutput, StripError> {
    run(source, operation, config, ArchiveSink::File(path.as_ref()))
}

/// Async wrapper around [`process_blocking`].
///
/// Decoding, cropping and encoding are CPU-bound, so the run is moved to
/// tokio's blocking pool.
pub async fn process(
    source: ImageSource,
    operation: Operation,
    config: &StripConfig,
) -> Result<ProcessOutput, StripError> {
    let config = config.clone();
    tokio::task::spawn_blocking(move || process_blocking(source, &operation, &config))
        .await
        .map_err(|e| StripError::Internal(format!("Processing task panicked: {e}")))?
}

/// Async variant of [`process_to_file_blocking`].
///
/// The returned [`ProcessOutput::archive`] is empty; the archive lives at
/// `output_path`.
pub async fn process_to_file(
    source: ImageSource,
    operation: Operation,
    config: &StripConfig,
    output_path: impl AsRef<Path>,
) -> Result<ProcessOutput, StripError> {
    let config = config.clone();
    let path: PathBuf = output_path.as_ref().to_path_buf();
    tokio::task::spawn_blocking(move || {
        process_to_file_blocking(source, &operation, &config, &path)
    })
    .await
    .map_err(|e| StripError::Internal(format!("Processing task panicked: {e}")))?
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn run(
    source: ImageSource,
    operation: &Operation,
    config: &StripConfig,
    sink: ArchiveSink<'_>,
) -> Result<ProcessOutput, StripError> {
    let start = Instant::now();
    let on_disk = source.is_on_disk();
    let stage = |s: Stage| {
        debug!("Stage: {}", s);
        if let Some(ref cb) = config.progress_callback {
            cb.on_stage(s);
        }
    };
    info!("Starting {}", operation.name());

    // ── Load ─────────────────────────────────────────────────────────────
    let mut set = input::load_image_set(source, config)?;
    stage(Stage::Loaded);

    // ── Order ────────────────────────────────────────────────────────────
    order::natural_sort(&mut set.images, config.ordering, |img| img.name.as_str());
    debug!("Reading order: {:?}", set.names());
    stage(Stage::Ordered);

    let id = output_identifier(config.output_prefix.as_deref(), &set.label);

    // ── Transform ────────────────────────────────────────────────────────
    let (outputs, consumed, dropped_rows) = transform(&set.images, operation, config, &id)?;

    let (entries, named) = encode_outputs(outputs, config)?;
    stage(Stage::Transformed);

    // ── Package ──────────────────────────────────────────────────────────
    let (archive, archive_bytes) = match sink {
        ArchiveSink::Memory => {
            let bytes = package::write_archive(&named)?;
            let len = bytes.len();
            (bytes, len)
        }
        ArchiveSink::File(path) => {
            let size = package::persist_archive(&named, path)?;
            (Vec::new(), size as usize)
        }
    };
    stage(Stage::Packaged);

    // ── Clean ────────────────────────────────────────────────────────────
    let mut skipped = std::mem::take(&mut set.skipped);
    let mut consumed_sources = 0;
    if on_disk && config.consume_sources {
        for img in consumed.iter().map(|&i| &set.images[i]) {
            let Some(ref path) = img.path else { continue };
            match std::fs::remove_file(path) {
                Ok(()) => consumed_sources += 1,
                Err(e) => {
                    warn!("Could not remove {}: {}", path.display(), e);
                    skipped.push(FileError::CleanupFailed {
                        name: img.name.clone(),
                        detail: e.to_string(),
                    });
                }
            }
        }
        stage(Stage::Cleaned);
    }

    let stats = ProcessStats {
        operation: operation.name().to_string(),
        input_images: set.images.len(),
        output_images: entries.len(),
        dropped_rows,
        consumed_sources,
        archive_bytes,
        total_duration_ms: start.elapsed().as_millis() as u64,
    };

    info!(
        "{} complete: {} → {} images, {}ms",
        operation.name(),
        stats.input_images,
        stats.output_images,
        stats.total_duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(stats.output_images);
    }

    Ok(ProcessOutput {
        archive,
        entries,
        skipped,
        stats,
    })
}

/// Named output images, indices of the consumed inputs, dropped rows.
type Transformed = (Vec<(String, RgbImage)>, Vec<usize>, u32);

fn transform(
    images: &[LoadedImage],
    operation: &Operation,
    config: &StripConfig,
    id: &str,
) -> Result<Transformed, StripError> {
    let format = config.output_format;
    match *operation {
        Operation::Split(mode) => {
            let [source] = images else {
                return Err(StripError::SplitRequiresSingleImage {
                    count: images.len(),
                });
            };
            let (strips, plan) =
                split::split_image(&source.image, mode, config.remainder, config.alpha)?;
            if plan.dropped_rows > 0 {
                info!(
                    "Dropping last {} rows of {} ({} bands of {}px)",
                    plan.dropped_rows,
                    source.name,
                    plan.bands.len(),
                    plan.bands[0].height
                );
            }
            let named = strips
                .into_iter()
                .enumerate()
                .map(|(i, strip)| (config.naming.split_name(id, i, format), strip))
                .collect();
            Ok((named, vec![0], plan.dropped_rows))
        }
        Operation::Merge { group_size } => {
            merge::validate_group_size(images.len(), group_size)?;
            let refs: Vec<&DynamicImage> = images.iter().map(|img| &img.image).collect();
            let merged = merge::merge_images(&refs, group_size, config.alpha)?;
            let named = merged
                .into_iter()
                .enumerate()
                .map(|(i, strip)| (config.naming.merge_name(id, i, format), strip))
                .collect();
            Ok((named, (0..images.len()).collect(), 0))
        }
    }
}

fn encode_outputs(
    outputs: Vec<(String, RgbImage)>,
    config: &StripConfig,
) -> Result<(Vec<ArchiveEntry>, Vec<(String, Vec<u8>)>), StripError> {
    let total = outputs.len();
    if let Some(ref cb) = config.progress_callback {
        cb.on_transform_start(total);
    }

    let mut entries = Vec::with_capacity(total);
    let mut named = Vec::with_capacity(total);
    for (i, (name, img)) in outputs.into_iter().enumerate() {
        let bytes = encode::encode_image(&img, config.output_format).map_err(|e| {
            StripError::Encode {
                name: name.clone(),
                detail: e.to_string(),
            }
        })?;
        if let Some(ref cb) = config.progress_callback {
            cb.on_output_complete(i, total, &name, bytes.len());
        }
        entries.push(ArchiveEntry {
            name: name.clone(),
            width: img.width(),
            height: img.height(),
            bytes: bytes.len(),
        });
        named.push((name, bytes));
    }
    Ok((entries, named))
}

/// Identifier used in `Source`-scheme names, made safe as a file-name part.
fn output_identifier(prefix: Option<&str>, label: &str) -> String {
    let raw = prefix.unwrap_or(label);
    let cleaned: String = raw
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        "images".to_string()
    } else {
        cleaned.to_string()
    }
}
