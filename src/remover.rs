//! Smart background removal
//!
//! Pipeline, run once per call with no state carried between calls:
//! 1. Resample - shrink oversized inputs to the working cap
//! 2. Sample border colors and group them
//! 3. Classify - pick tolerance and background colors from border brightness
//! 4. Flood fill from the border and zero alpha on removed pixels
//! 5. Cleanup - majority snapping, dark-halo erosion, optional smoothing
//! 6. Resample back to the input size
//!
//! Images whose border yields no samples (e.g. 1x1, or a sample depth larger
//! than the image) come back unchanged.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::RgbaImage;
use log::{debug, info, warn};
use serde::Serialize;
use std::io::Cursor;
use crate::classify::{classify_background, BorderTone};
use crate::cleanup::{apply_removal, erode_dark_halo, smooth_edges, snap_partial_alpha};
use crate::color::{group_colors, sample_edge_colors, ColorGroup, GROUP_THRESHOLD};
use crate::error::{Result, BgRemovalError};
use crate::flood::flood_fill;
use crate::options::RemovalOptions;
use crate::resample::{downscale, upscale_to, working_size};

/// Border depth used by the suitability probe
pub const PROBE_DEPTH: u32 = 5;
/// Share of border pixels the dominant group must exceed
pub const PROBE_DOMINANCE: f64 = 0.30;

// ============================================================================
// RESULTS
// ============================================================================

/// Summary of one removal call
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovalReport {
    pub original_size: (u32, u32),
    /// Size the pipeline actually ran at
    pub working_size: (u32, u32),
    pub resized: bool,
    /// True when no border colors were found and the input was returned as-is
    pub fallback: bool,
    pub tone: Option<BorderTone>,
    pub average_brightness: f32,
    pub effective_tolerance: u32,
    pub background_colors: Vec<ColorGroup>,
    /// Counts below are at working resolution
    pub removed_pixels: usize,
    pub snapped_pixels: usize,
    pub halo_pixels: usize,
}

impl RemovalReport {
    fn untouched(size: (u32, u32), working: (u32, u32), resized: bool) -> Self {
        Self {
            original_size: size,
            working_size: working,
            resized,
            fallback: true,
            tone: None,
            average_brightness: 0.0,
            effective_tolerance: 0,
            background_colors: Vec::new(),
            removed_pixels: 0,
            snapped_pixels: 0,
            halo_pixels: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Removal {
    pub image: RgbaImage,
    pub report: RemovalReport,
}

// ============================================================================
// CORE PIPELINE
// ============================================================================

/// Run removal at whatever resolution `img` has
fn remove_at_working_size(img: &mut RgbaImage, options: &RemovalOptions, report: &mut RemovalReport) {
    let edges = sample_edge_colors(img, options.sample_depth);
    if edges.is_empty() {
        warn!(
            "No border samples for {}x{} image at depth {}, returning input unchanged",
            img.width(),
            img.height(),
            options.sample_depth
        );
        return;
    }

    let groups = group_colors(&edges.samples, GROUP_THRESHOLD);
    debug!(
        "Border: {} pixels, {} distinct colors kept, {} groups",
        edges.total,
        edges.samples.len(),
        groups.len()
    );

    let classification = classify_background(&groups, options.tolerance);
    debug!(
        "Background {:?}: brightness {:.1}, tolerance {}, {} colors",
        classification.tone,
        classification.average_brightness,
        classification.effective_tolerance,
        classification.background.len()
    );

    let states = flood_fill(img, &classification.background, classification.match_threshold());
    let removed = apply_removal(img, &states);
    let snapped = snap_partial_alpha(img);
    let halo = if classification.tone == BorderTone::Dark {
        erode_dark_halo(img)
    } else {
        0
    };

    if options.edge_smoothing {
        smooth_edges(img);
    }

    report.fallback = false;
    report.tone = Some(classification.tone);
    report.average_brightness = classification.average_brightness;
    report.effective_tolerance = classification.effective_tolerance;
    report.background_colors = classification.background;
    report.removed_pixels = removed;
    report.snapped_pixels = snapped;
    report.halo_pixels = halo;
}

/// Remove the border-connected background from an in-memory image
///
/// Options are validated before any work is done. The returned image always
/// has the dimensions of `img`.
pub fn remove_background(img: &RgbaImage, options: &RemovalOptions) -> Result<Removal> {
    options.validate()?;

    let size = img.dimensions();
    let target = working_size(size.0, size.1, options.max_dimension);
    let mut working = match target {
        Some((w, h)) => downscale(img, w, h),
        None => img.clone(),
    };

    let mut report = RemovalReport::untouched(size, working.dimensions(), target.is_some());
    remove_at_working_size(&mut working, options, &mut report);

    if report.fallback {
        return Ok(Removal { image: img.clone(), report });
    }

    let image = match target {
        Some(_) => upscale_to(&working, img),
        None => working,
    };

    info!(
        "Removed background from {}x{} image{}: {} pixels cleared, {} snapped, {} halo",
        size.0,
        size.1,
        if report.resized { " (resampled)" } else { "" },
        report.removed_pixels,
        report.snapped_pixels,
        report.halo_pixels
    );

    Ok(Removal { image, report })
}

// ============================================================================
// SUITABILITY PROBE
// ============================================================================

/// Whether the border has a single clearly dominant color
///
/// Callers can use a `false` answer to route the image to a different
/// removal strategy. Never mutates the image.
pub fn is_suitable(img: &RgbaImage) -> bool {
    let edges = sample_edge_colors(img, PROBE_DEPTH);
    if edges.is_empty() || edges.total == 0 {
        return false;
    }

    let groups = group_colors(&edges.samples, GROUP_THRESHOLD);
    let dominant = groups.first().map_or(0, |g| g.count);
    let share = dominant as f64 / edges.total as f64;
    debug!("Suitability: dominant border group covers {:.1}%", share * 100.0);

    share > PROBE_DOMINANCE
}

// ============================================================================
// ENCODED ENTRY POINTS
// ============================================================================

/// Decode any format the codec understands into RGBA
pub fn decode_image(bytes: &[u8]) -> Result<RgbaImage> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

/// Encode image as PNG bytes
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, image::ImageFormat::Png)?;
    Ok(buffer.into_inner())
}

/// Strip an optional `data:<mime>;base64,` prefix and decode
fn decode_base64(input: &str) -> Result<Vec<u8>> {
    let trimmed = input.trim();
    let payload = match trimmed.strip_prefix("data:") {
        Some(rest) => rest
            .split_once(',')
            .map(|(_, data)| data)
            .ok_or_else(|| BgRemovalError::InvalidParameter("malformed data URL".to_string()))?,
        None => trimmed,
    };
    Ok(STANDARD.decode(payload)?)
}

/// Encoded image in, PNG with alpha out
pub fn remove_background_bytes(input: &[u8], options: &RemovalOptions) -> Result<Vec<u8>> {
    options.validate()?;
    let img = decode_image(input)?;
    let removal = remove_background(&img, options)?;
    encode_png(&removal.image)
}

/// Base64 image in, base64 PNG out
pub fn remove_background_base64(input: &str, options: &RemovalOptions) -> Result<String> {
    options.validate()?;
    let bytes = decode_base64(input)?;
    let png = remove_background_bytes(&bytes, options)?;
    Ok(STANDARD.encode(png))
}

pub fn is_suitable_bytes(input: &[u8]) -> Result<bool> {
    Ok(is_suitable(&decode_image(input)?))
}

pub fn is_suitable_base64(input: &str) -> Result<bool> {
    is_suitable_bytes(&decode_base64(input)?)
}

// ============================================================================
// TESTS
// ============================================================================
