//! Zip packaging of encoded outputs.
//!
//! Entries are written in the given order under the given names; names are
//! never rewritten, and a duplicate name fails the whole archive before any
//! byte is written. The in-memory path returns the finished buffer only after
//! the central directory is written. The on-disk path streams into a
//! temporary file beside the destination and renames it into place, so a
//! failed run never leaves a truncated `.zip` behind.

use crate::error::StripError;
use std::collections::HashSet;
use std::io::{Cursor, Seek, Write};
use std::path::Path;
use tracing::{debug, info};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Build the archive in memory.
pub fn write_archive(entries: &[(String, Vec<u8>)]) -> Result<Vec<u8>, StripError> {
    let cursor = write_entries(Cursor::new(Vec::new()), entries)?;
    let bytes = cursor.into_inner();
    info!("Packaged {} entries ({} bytes)", entries.len(), bytes.len());
    Ok(bytes)
}

/// Stream the archive to `path` atomically. Returns the archive size.
pub fn persist_archive(entries: &[(String, Vec<u8>)], path: &Path) -> Result<u64, StripError> {
    let write_err = |source: std::io::Error| StripError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(write_err)?;

    // Dropping `tmp` on any error path deletes the partial file.
    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(write_err)?;
    write_entries(tmp.as_file_mut(), entries)?;
    tmp.as_file().sync_all().map_err(write_err)?;

    let file = tmp.persist(path).map_err(|e| write_err(e.error))?;
    let size = file.metadata().map_err(write_err)?.len();
    info!(
        "Wrote {} entries to {} ({} bytes)",
        entries.len(),
        path.display(),
        size
    );
    Ok(size)
}

fn write_entries<W: Write + Seek>(
    writer: W,
    entries: &[(String, Vec<u8>)],
) -> Result<W, StripError> {
    ensure_unique_names(entries)?;

    let mut zip = ZipWriter::new(writer);
    // JPEG/PNG payloads are already compressed.
    let options = FileOptions::default().compression_method(CompressionMethod::Stored);

    for (name, bytes) in entries {
        zip.start_file(name.as_str(), options)?;
        zip.write_all(bytes).map_err(|e| StripError::Packaging {
            detail: format!("writing '{name}': {e}"),
        })?;
        debug!("Archived {} ({} bytes)", name, bytes.len());
    }

    Ok(zip.finish()?)
}

fn ensure_unique_names(entries: &[(String, Vec<u8>)]) -> Result<(), StripError> {
    let mut seen = HashSet::with_capacity(entries.len());
    for (name, _) in entries {
        if name.is_empty() {
            return Err(StripError::Packaging {
                detail: "empty entry name".into(),
            });
        }
        if !seen.insert(name.as_str()) {
            return Err(StripError::Packaging {
                detail: format!("duplicate entry name '{name}'"),
            });
        }
    }
    Ok(())
}
