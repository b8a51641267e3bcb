//! Splitting one tall image into equal-height horizontal strips.
//!
//! A [`SplitPlan`] is computed from the image height first, then applied as
//! full-width crops. With `P` parts every band is `floor(H / P)` rows tall and
//! the trailing `H - P * floor(H / P)` rows are dropped, unless
//! [`RemainderPolicy::Extend`] hands them to the last band instead.

use crate::config::{AlphaPolicy, RemainderPolicy};
use crate::error::StripError;
use crate::pipeline::encode::flatten_alpha;
use image::{imageops, DynamicImage, RgbImage};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How the number of strips is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitMode {
    /// Exactly this many strips.
    Parts(u32),
    /// As many strips of at least this height as fit: `floor(H / min_height)`.
    /// An image shorter than `min_height` yields a single strip.
    MinHeight(u32),
}

impl SplitMode {
    /// Resolve to a part count for an image `height` rows tall.
    pub fn parts_for(&self, height: u32) -> Result<u32, StripError> {
        match *self {
            SplitMode::Parts(0) => Err(StripError::InvalidParameter(
                "parts must be at least 1".into(),
            )),
            SplitMode::Parts(p) => Ok(p),
            SplitMode::MinHeight(0) => Err(StripError::InvalidParameter(
                "minimum strip height must be at least 1px".into(),
            )),
            SplitMode::MinHeight(min) => Ok((height / min).max(1)),
        }
    }
}

/// One horizontal band `[top, top + height)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Band {
    pub top: u32,
    pub height: u32,
}

impl Band {
    pub fn bottom(&self) -> u32 {
        self.top + self.height
    }
}

/// Non-overlapping bands covering `[0, height - dropped_rows)` in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitPlan {
    pub width: u32,
    pub source_height: u32,
    pub bands: Vec<Band>,
    /// Rows past the last band that no output contains.
    pub dropped_rows: u32,
}

/// Compute the bands for a `width × height` image.
///
/// # Errors
/// [`StripError::InvalidParameter`] when the part count is zero or larger
/// than the image height (bands would be empty).
pub fn plan_split(
    width: u32,
    height: u32,
    mode: SplitMode,
    remainder: RemainderPolicy,
) -> Result<SplitPlan, StripError> {
    let parts = mode.parts_for(height)?;
    let band_height = height / parts;
    if band_height == 0 {
        return Err(StripError::InvalidParameter(format!(
            "cannot split a {height}px tall image into {parts} parts"
        )));
    }

    let mut bands: Vec<Band> = (0..parts)
        .map(|i| Band {
            top: i * band_height,
            height: band_height,
        })
        .collect();

    let leftover = height - parts * band_height;
    let dropped_rows = match remainder {
        RemainderPolicy::Drop => leftover,
        RemainderPolicy::Extend => {
            if let Some(last) = bands.last_mut() {
                last.height += leftover;
            }
            0
        }
    };

    Ok(SplitPlan {
        width,
        source_height: height,
        bands,
        dropped_rows,
    })
}

/// Crop `image` along `plan`, flattening alpha first.
pub fn apply_plan(image: &DynamicImage, plan: &SplitPlan, alpha: AlphaPolicy) -> Vec<RgbImage> {
    let rgb = flatten_alpha(image, alpha);
    plan.bands
        .iter()
        .map(|band| {
            debug!("Cropping rows {}..{}", band.top, band.bottom());
            imageops::crop_imm(&rgb, 0, band.top, plan.width, band.height).to_image()
        })
        .collect()
}

/// Plan and cut a single image. Returns the strips and the plan used.
pub fn split_image(
    image: &DynamicImage,
    mode: SplitMode,
    remainder: RemainderPolicy,
    alpha: AlphaPolicy,
) -> Result<(Vec<RgbImage>, SplitPlan), StripError> {
    let plan = plan_split(image.width(), image.height(), mode, remainder)?;
    let strips = apply_plan(image, &plan, alpha);
    Ok((strips, plan))
}
