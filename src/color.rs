//! Border color statistics
//!
//! Everything the pipeline knows about the background comes from here:
//! 1. Edge sampling - exact RGB tally over a band around the image border
//! 2. Color grouping - greedy merge of perceptually close samples
//! 3. The weighted RGB distance shared by grouping and flood fill

use image::RgbaImage;
use serde::Serialize;
use std::collections::HashMap;

/// Distinct colors kept from the edge tally
pub const MAX_EDGE_SAMPLES: usize = 10;

/// Distance under which two samples merge into one group (default: 40)
pub const GROUP_THRESHOLD: f32 = 40.0;

// ============================================================================
// COLOR TYPES
// ============================================================================

/// One distinct border color and how often it occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorSample {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub count: u32,
}

/// Running count-weighted average of merged samples
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColorGroup {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub count: u32,
}

impl ColorGroup {
    fn from_sample(sample: &ColorSample) -> Self {
        Self {
            r: sample.r as f32,
            g: sample.g as f32,
            b: sample.b as f32,
            count: sample.count,
        }
    }

    fn merge(&mut self, sample: &ColorSample) {
        let total = (self.count + sample.count) as f32;
        let own = self.count as f32;
        let other = sample.count as f32;
        self.r = (self.r * own + sample.r as f32 * other) / total;
        self.g = (self.g * own + sample.g as f32 * other) / total;
        self.b = (self.b * own + sample.b as f32 * other) / total;
        self.count += sample.count;
    }

    pub fn rgb(&self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    pub fn brightness(&self) -> f32 {
        (self.r + self.g + self.b) / 3.0
    }
}

/// Result of scanning the border band
#[derive(Debug, Clone, Default)]
pub struct EdgeSamples {
    /// Most frequent colors first, at most `MAX_EDGE_SAMPLES`
    pub samples: Vec<ColorSample>,
    /// Number of pixels visited, including those of colors cut from `samples`
    pub total: u64,
}

impl EdgeSamples {
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

// ============================================================================
// DISTANCE
// ============================================================================

/// Weighted RGB distance: sqrt(2·Δr² + 4·Δg² + 3·Δb²)
///
/// Green differences count most, then blue, then red.
#[inline]
pub fn color_distance(a: [f32; 3], b: [f32; 3]) -> f32 {
    let dr = a[0] - b[0];
    let dg = a[1] - b[1];
    let db = a[2] - b[2];
    (2.0 * dr * dr + 4.0 * dg * dg + 3.0 * db * db).sqrt()
}

#[inline]
pub fn rgb_f32(r: u8, g: u8, b: u8) -> [f32; 3] {
    [r as f32, g as f32, b as f32]
}

/// Mean of the three channels, 0-255
#[inline]
pub fn brightness(r: u8, g: u8, b: u8) -> f32 {
    (r as f32 + g as f32 + b as f32) / 3.0
}

#[inline]
fn pack_rgb(r: u8, g: u8, b: u8) -> u32 {
    ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}

#[inline]
fn unpack_rgb(key: u32) -> (u8, u8, u8) {
    ((key >> 16) as u8, (key >> 8) as u8, key as u8)
}

// ============================================================================
// EDGE SAMPLING
// ============================================================================

/// Tally exact RGB colors in a border band `depth` pixels deep
///
/// Scans the top and bottom `depth` rows in full, then the left and right
/// `depth` columns of the rows in between. Alpha is ignored. Returns nothing
/// when the band does not fit inside the image.
pub fn sample_edge_colors(img: &RgbaImage, depth: u32) -> EdgeSamples {
    let (width, height) = img.dimensions();

    if depth == 0 || depth > width || depth > height {
        return EdgeSamples::default();
    }

    let mut counts: HashMap<u32, u32> = HashMap::new();
    let mut total = 0u64;
    let mut tally = |x: u32, y: u32| {
        let pixel = img.get_pixel(x, y);
        *counts.entry(pack_rgb(pixel[0], pixel[1], pixel[2])).or_insert(0) += 1;
        total += 1;
    };

    // Top and bottom strips
    for y in (0..depth).chain(height - depth..height) {
        for x in 0..width {
            tally(x, y);
        }
    }

    // Left and right strips, between the horizontal ones
    for y in depth..height.saturating_sub(depth) {
        for x in (0..depth).chain(width - depth..width) {
            tally(x, y);
        }
    }

    let mut items: Vec<(u32, u32)> = counts.into_iter().collect();
    items.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let samples = items
        .into_iter()
        .take(MAX_EDGE_SAMPLES)
        .map(|(key, count)| {
            let (r, g, b) = unpack_rgb(key);
            ColorSample { r, g, b, count }
        })
        .collect();

    EdgeSamples { samples, total }
}

// ============================================================================
// GROUPING
// ============================================================================

/// Greedy first-fit clustering of samples
///
/// Each sample joins the first group whose current average lies within
/// `threshold`, otherwise it seeds a new group. Order-sensitive: feeding
/// samples most-frequent first lets the dominant color seed group 0.
pub fn group_colors(samples: &[ColorSample], threshold: f32) -> Vec<ColorGroup> {
    let mut groups: Vec<ColorGroup> = Vec::new();

    for sample in samples {
        let rgb = rgb_f32(sample.r, sample.g, sample.b);
        match groups
            .iter_mut()
            .find(|group| color_distance(rgb, group.rgb()) < threshold)
        {
            Some(group) => group.merge(sample),
            None => groups.push(ColorGroup::from_sample(sample)),
        }
    }

    groups.sort_by(|a, b| b.count.cmp(&a.count));
    groups
}
