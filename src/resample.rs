//! Working-resolution bound
//!
//! Inputs whose longest side exceeds the cap are shrunk (Lanczos3) before
//! removal and the result is stretched back (Lanczos3) afterwards. This caps
//! flood-fill stack size and per-pixel loop cost on very large images at the
//! price of sub-pixel accuracy along the cutout. Below the cap nothing is
//! resampled and the output matches native-resolution processing exactly.

use image::imageops::{self, FilterType};
use image::RgbaImage;

/// Size that fits `(width, height)` inside `max_dimension`, or `None` if it
/// already does. Aspect ratio is preserved and no side drops below one pixel.
pub fn working_size(width: u32, height: u32, max_dimension: u32) -> Option<(u32, u32)> {
    let longest = width.max(height);
    if longest <= max_dimension {
        return None;
    }

    let scale = max_dimension as f64 / longest as f64;
    let fit = |side: u32| ((side as f64 * scale).round() as u32).clamp(1, max_dimension);
    Some((fit(width), fit(height)))
}

pub fn downscale(img: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    imageops::resize(img, width, height, FilterType::Lanczos3)
}

/// Stretch a processed working image back to the size of `original`
///
/// Pixels fully transparent in `original` stay fully transparent, so
/// interpolation ringing cannot bring back opacity the input never had.
pub fn upscale_to(result: &RgbaImage, original: &RgbaImage) -> RgbaImage {
    let (width, height) = original.dimensions();
    let mut upscaled = imageops::resize(result, width, height, FilterType::Lanczos3);

    for (pixel, source) in upscaled.pixels_mut().zip(original.pixels()) {
        if source[3] == 0 {
            pixel[3] = 0;
        }
    }

    upscaled
}
