//! ImageSet loading: turn a folder or a list of uploaded buffers into decoded
//! images.
//!
//! Both source kinds go through [`ImageSource`], so every later stage works on
//! an [`ImageSet`] and never needs to know where the pixels came from. Only
//! files whose names end in `.png`, `.jpg`, `.jpeg` or `.webp`
//! (case-insensitive) are considered. Source files are never modified here.

use crate::config::StripConfig;
use crate::error::{FileError, StripError};
use image::imageops::FilterType;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Extensions accepted by the loader, lower-case, without the dot.
pub const ACCEPTED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

/// One uploaded image buffer.
#[derive(Debug, Clone)]
pub struct InputImage {
    /// Original file name; used for extension filtering and ordering.
    pub name: String,
    pub bytes: Vec<u8>,
}

impl InputImage {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Where a run's images come from.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Every accepted file directly inside a folder. Consumed files are
    /// deleted after a successful run unless
    /// [`StripConfig::consume_sources`] is off.
    OnDisk(PathBuf),
    /// Buffers held in memory; nothing touches the file system.
    InMemory {
        /// Identifier used in output names (the folder name plays this role
        /// for on-disk sources).
        label: String,
        images: Vec<InputImage>,
    },
}

impl ImageSource {
    pub fn on_disk(path: impl Into<PathBuf>) -> Self {
        ImageSource::OnDisk(path.into())
    }

    pub fn in_memory(label: impl Into<String>, images: Vec<InputImage>) -> Self {
        ImageSource::InMemory {
            label: label.into(),
            images,
        }
    }

    /// True for folder sources.
    pub fn is_on_disk(&self) -> bool {
        matches!(self, ImageSource::OnDisk(_))
    }
}

/// A decoded image plus the name it was loaded under.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub name: String,
    /// Backing file for on-disk sources.
    pub path: Option<PathBuf>,
    pub image: DynamicImage,
}

impl LoadedImage {
    pub fn new(name: impl Into<String>, image: DynamicImage) -> Self {
        Self {
            name: name.into(),
            path: None,
            image,
        }
    }
}

/// The ordered images one run operates on.
#[derive(Debug, Clone)]
pub struct ImageSet {
    /// Source identifier: folder name or in-memory label.
    pub label: String,
    pub images: Vec<LoadedImage>,
    /// Files left out while loading.
    pub skipped: Vec<FileError>,
}

impl ImageSet {
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.images.iter().map(|i| i.name.as_str()).collect()
    }
}

/// Check a file name against [`ACCEPTED_EXTENSIONS`] by its suffix, so a
/// bare `.png` counts too.
pub fn has_accepted_extension(name: &str) -> bool {
    let lower = name.to_lowercase();
    ACCEPTED_EXTENSIONS.iter().any(|ext| {
        lower
            .strip_suffix(ext)
            .is_some_and(|rest| rest.ends_with('.'))
    })
}

/// Load and decode every accepted image from `source`.
///
/// Files are returned in file-name order; reading order is established later
/// by [`crate::pipeline::order`]. The optional resize pre-step from
/// `config.resize` is applied to each decoded image.
///
/// # Errors
/// - [`StripError::DirectoryNotFound`] / [`StripError::ReadFailed`] when the
///   folder cannot be listed
/// - [`StripError::NoImagesFound`] when nothing has an accepted extension
/// - [`StripError::Decode`] on the first bad file when `strict_decode` is set
/// - [`StripError::AllDecodesFailed`] when every candidate was skipped
pub fn load_image_set(source: ImageSource, config: &StripConfig) -> Result<ImageSet, StripError> {
    let (label, candidates, mut skipped) = match source {
        ImageSource::OnDisk(dir) => {
            let label = folder_label(&dir);
            let (candidates, skipped) = read_folder(&dir)?;
            (label, candidates, skipped)
        }
        ImageSource::InMemory { label, images } => {
            let (accepted, rejected): (Vec<_>, Vec<_>) = images
                .into_iter()
                .partition(|img| has_accepted_extension(&img.name));
            let skipped = rejected
                .into_iter()
                .map(|img| FileError::UnsupportedExtension { name: img.name })
                .collect();
            let candidates = accepted
                .into_iter()
                .map(|img| Candidate {
                    name: img.name,
                    path: None,
                    bytes: img.bytes,
                })
                .collect();
            (label, candidates, skipped)
        }
    };

    if candidates.is_empty() {
        return Err(StripError::NoImagesFound {
            source_label: format!("'{label}'"),
        });
    }

    let total = candidates.len();
    let mut images = Vec::with_capacity(total);

    for candidate in candidates {
        match image::load_from_memory(&candidate.bytes) {
            Ok(img) => {
                let img = apply_resize(img, config);
                debug!(
                    "Decoded {} → {}x{} ({:?})",
                    candidate.name,
                    img.width(),
                    img.height(),
                    img.color()
                );
                images.push(LoadedImage {
                    name: candidate.name,
                    path: candidate.path,
                    image: img,
                });
            }
            Err(e) if config.strict_decode => {
                return Err(StripError::Decode {
                    name: candidate.name,
                    detail: e.to_string(),
                });
            }
            Err(e) => {
                warn!("Skipping {}: {}", candidate.name, e);
                skipped.push(FileError::DecodeFailed {
                    name: candidate.name,
                    detail: e.to_string(),
                });
            }
        }
    }

    if let Some(ref cb) = config.progress_callback {
        for s in &skipped {
            cb.on_file_skipped(s.name(), &s.to_string());
        }
        cb.on_load_complete(images.len(), skipped.len());
    }

    if images.is_empty() {
        let first_error = skipped
            .first()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Unknown error".to_string());
        return Err(StripError::AllDecodesFailed { total, first_error });
    }

    info!(
        "Loaded {} images from '{}' ({} skipped)",
        images.len(),
        label,
        skipped.len()
    );

    Ok(ImageSet {
        label,
        images,
        skipped,
    })
}

struct Candidate {
    name: String,
    path: Option<PathBuf>,
    bytes: Vec<u8>,
}

/// Folder base name, resolving `.`/`..` through the canonical path.
fn folder_label(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .or_else(|| {
            dir.canonicalize()
                .ok()
                .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        })
        .unwrap_or_else(|| "images".to_string())
}

/// List accepted files directly inside `dir`, sorted by file name, and read
/// their bytes.
fn read_folder(dir: &Path) -> Result<(Vec<Candidate>, Vec<FileError>), StripError> {
    if !dir.is_dir() {
        return Err(StripError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }

    let entries = std::fs::read_dir(dir).map_err(|e| StripError::ReadFailed {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut paths: Vec<(String, PathBuf)> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StripError::ReadFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if has_accepted_extension(&name) {
            paths.push((name, path));
        }
    }
    paths.sort_by(|a, b| a.0.cmp(&b.0));

    let mut candidates = Vec::with_capacity(paths.len());
    let mut skipped = Vec::new();
    for (name, path) in paths {
        match std::fs::read(&path) {
            Ok(bytes) => candidates.push(Candidate {
                name,
                path: Some(path),
                bytes,
            }),
            Err(e) => {
                warn!("Cannot read {}: {}", path.display(), e);
                skipped.push(FileError::ReadFailed {
                    name,
                    detail: e.to_string(),
                });
            }
        }
    }

    // Unreadable files still count as found; only an empty listing is
    // NoImagesFound.
    if candidates.is_empty() && !skipped.is_empty() {
        return Err(StripError::AllDecodesFailed {
            total: skipped.len(),
            first_error: skipped[0].to_string(),
        });
    }

    Ok((candidates, skipped))
}

/// Apply `config.resize`, if any. Missing dimensions keep the original size.
fn apply_resize(img: DynamicImage, config: &StripConfig) -> DynamicImage {
    match config.resize {
        Some(spec) => {
            let (w, h) = spec.target(img.width(), img.height());
            if (w, h) == (img.width(), img.height()) {
                img
            } else {
                debug!("Resizing {}x{} → {}x{}", img.width(), img.height(), w, h);
                img.resize_exact(w, h, FilterType::CatmullRom)
            }
        }
        None => img,
    }
}
