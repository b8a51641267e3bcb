//! Colour flattening and output encoding.
//!
//! Every output is opaque RGB. Sources with an alpha channel lose it before
//! any crop or paste: [`AlphaPolicy::Discard`] keeps the stored colour values
//! under transparent pixels, [`AlphaPolicy::Background`] composites them over
//! a solid colour. Either way the conversion is lossy for transparent images.

use crate::config::{AlphaPolicy, OutputFormat};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use tracing::debug;

/// Convert any decoded image to 8-bit opaque RGB.
pub fn flatten_alpha(img: &DynamicImage, policy: AlphaPolicy) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    match policy {
        AlphaPolicy::Discard => img.to_rgb8(),
        AlphaPolicy::Background(bg) => {
            let rgba = img.to_rgba8();
            RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
                let [r, g, b, a] = rgba.get_pixel(x, y).0;
                Rgb([blend(r, bg[0], a), blend(g, bg[1], a), blend(b, bg[2], a)])
            })
        }
    }
}

fn blend(fg: u8, bg: u8, alpha: u8) -> u8 {
    let a = alpha as u32;
    ((fg as u32 * a + bg as u32 * (255 - a) + 127) / 255) as u8
}

/// Encode a strip in the configured output format.
pub fn encode_image(img: &RgbImage, format: OutputFormat) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    match format {
        OutputFormat::Jpeg { quality } => {
            let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
            encoder.encode_image(img)?;
        }
        OutputFormat::Png => {
            img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
        }
    }
    debug!(
        "Encoded {}x{} → {} bytes ({})",
        img.width(),
        img.height(),
        buf.len(),
        format.extension()
    );
    Ok(buf)
}
