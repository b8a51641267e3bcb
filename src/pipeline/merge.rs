//! Vertical merging of consecutive images into combined strips.
//!
//! The ordered images are cut into groups of `group_size`; the last group
//! holds whatever is left and is merged as-is. Each group becomes one canvas
//! as wide as its widest member and as tall as all members stacked. Members
//! are pasted top to bottom at x = 0, so narrower images leave a black margin
//! on the right.

use crate::config::AlphaPolicy;
use crate::error::StripError;
use crate::pipeline::encode::flatten_alpha;
use image::{imageops, DynamicImage, RgbImage};
use std::ops::Range;
use tracing::debug;

/// Index ranges of the consecutive groups for `total` images.
///
/// Produces `ceil(total / group_size)` ranges; all but possibly the last hold
/// exactly `group_size` indices.
pub fn partition_groups(total: usize, group_size: usize) -> Vec<Range<usize>> {
    if group_size == 0 {
        return Vec::new();
    }
    (0..total)
        .step_by(group_size)
        .map(|start| start..(start + group_size).min(total))
        .collect()
}

/// Stack `images` vertically on one RGB canvas.
///
/// # Errors
/// [`StripError::InvalidParameter`] for an empty group or a canvas taller
/// than `u32::MAX` rows.
pub fn merge_group(images: &[&DynamicImage], alpha: AlphaPolicy) -> Result<RgbImage, StripError> {
    if images.is_empty() {
        return Err(StripError::InvalidParameter(
            "cannot merge an empty group".into(),
        ));
    }

    let total_height: u64 = images.iter().map(|img| img.height() as u64).sum();
    let height = u32::try_from(total_height).map_err(|_| {
        StripError::InvalidParameter(format!(
            "merged strip would be {total_height}px tall, which exceeds the supported maximum"
        ))
    })?;
    let width = images.iter().map(|img| img.width()).max().unwrap_or(0);

    let mut canvas = RgbImage::new(width, height);
    let mut offset: u32 = 0;
    for img in images {
        let rgb = flatten_alpha(img, alpha);
        debug!(
            "Pasting {}x{} at y={}",
            rgb.width(),
            rgb.height(),
            offset
        );
        imageops::replace(&mut canvas, &rgb, 0, offset as i64);
        offset += rgb.height();
    }

    Ok(canvas)
}

/// Merge ordered images in groups of `group_size`.
///
/// # Errors
/// - [`StripError::InvalidParameter`] when `group_size` is zero
/// - [`StripError::InsufficientImages`] when fewer than `group_size` images
///   are available
pub fn merge_images(
    images: &[&DynamicImage],
    group_size: usize,
    alpha: AlphaPolicy,
) -> Result<Vec<RgbImage>, StripError> {
    validate_group_size(images.len(), group_size)?;
    partition_groups(images.len(), group_size)
        .into_iter()
        .map(|range| merge_group(&images[range], alpha))
        .collect()
}

/// Check the merge preconditions for `available` images.
pub fn validate_group_size(available: usize, group_size: usize) -> Result<(), StripError> {
    if group_size == 0 {
        return Err(StripError::InvalidParameter(
            "images per group must be at least 1".into(),
        ));
    }
    if available < group_size {
        return Err(StripError::InsufficientImages {
            available,
            group_size,
        });
    }
    Ok(())
}
