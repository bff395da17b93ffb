//! Screenshot pipeline: bound the frame, encode as PNG, wrap in base64.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use image::imageops::FilterType;
use image::{ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// Largest canvas a transmitted screenshot may occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Bound {
    pub max_width: u32,
    pub max_height: u32,
}

impl Bound {
    pub const fn new(max_width: u32, max_height: u32) -> Self {
        Self {
            max_width,
            max_height,
        }
    }
}

/// Computes the dimensions an image of `width` x `height` is shrunk to.
///
/// Width is fitted first; the height check then runs against the result of
/// that first pass, recomputing the width from the original aspect ratio when
/// the height still overflows. Both divisions truncate. An image that already
/// fits keeps its size exactly.
pub fn scaled_dimensions(width: u32, height: u32, bound: Bound) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (width, height);
    }

    let (ow, oh) = (u64::from(width), u64::from(height));
    let (bw, bh) = (u64::from(bound.max_width), u64::from(bound.max_height));
    let (mut nw, mut nh) = (ow, oh);

    if ow > bw {
        nw = bw;
        nh = nw * oh / ow;
    }

    if nh > bh {
        nh = bh;
        nw = nh * ow / oh;
    }

    // Both results are at most the original u32 dimensions.
    (
        u32::try_from(nw).unwrap_or(width),
        u32::try_from(nh).unwrap_or(height),
    )
}

/// Shrinks `image` into `bound`, keeping its aspect ratio. Never enlarges.
pub fn scale_to_fit(image: &RgbaImage, bound: Bound) -> RgbaImage {
    let (width, height) = scaled_dimensions(image.width(), image.height(), bound);
    if (width, height) == image.dimensions() {
        return image.clone();
    }
    // Extreme aspect ratios can truncate a side to zero.
    image::imageops::resize(image, width.max(1), height.max(1), FilterType::Triangle)
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .with_context(|| {
            format!(
                "Failed to encode {}x{} screenshot as PNG",
                image.width(),
                image.height()
            )
        })?;
    Ok(bytes)
}

/// PNG-encodes the image and returns it as padded standard base64.
pub fn encode_base64(image: &RgbaImage) -> Result<String> {
    Ok(BASE64.encode(encode_png(image)?))
}

/// Scales a captured frame into `bound` and encodes it for upload.
pub fn prepare_upload(frame: &RgbaImage, bound: Bound) -> Result<String> {
    let scaled = scale_to_fit(frame, bound);
    tracing::debug!(
        from_width = frame.width(),
        from_height = frame.height(),
        to_width = scaled.width(),
        to_height = scaled.height(),
        "Scaled screenshot"
    );
    encode_base64(&scaled)
}

#[cfg(test)]
#[path = "tests/screenshot_tests.rs"]
mod tests;
