//! Synthesized stand-in for images no origin could serve.

use std::io::Cursor;

use bytes::Bytes;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use tracing::warn;

use super::memory::LoadedImage;

/// Placeholder edge length in pixels.
pub const PLACEHOLDER_SIZE: u32 = 64;

/// Neutral light grey, opaque.
const PLACEHOLDER_FILL: Rgba<u8> = Rgba([0xE5, 0xE5, 0xEA, 0xFF]);

/// Build the placeholder image. Identical on every call.
pub fn placeholder() -> LoadedImage {
    let pixels = RgbaImage::from_pixel(PLACEHOLDER_SIZE, PLACEHOLDER_SIZE, PLACEHOLDER_FILL);

    let mut png = Vec::new();
    let encoded = match DynamicImage::ImageRgba8(pixels.clone())
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
    {
        Ok(()) => Bytes::from(png),
        Err(e) => {
            warn!(error = %e, "failed to encode placeholder image");
            Bytes::new()
        }
    };
    LoadedImage::placeholder(encoded, pixels)
}
