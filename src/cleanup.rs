//! Alpha compositing and artifact cleanup
//!
//! Runs after the flood fill, on the RGBA buffer itself:
//! 1. Alpha compositing - zero alpha on every removed pixel
//! 2. Majority snapping - settle semi-transparent pixels by their neighbors
//! 3. Dark-halo erosion - peel dark fringes off the cutout (dark borders only)
//! 4. Edge smoothing - optional soft edge from a blurred alpha channel

use image::{GrayImage, Luma, RgbaImage};
use imageproc::filter::gaussian_blur_f32;
use crate::color::brightness;
use crate::flood::{PixelState, PixelStates};

/// Neighbors out of eight that decide a majority snap
const MAJORITY: u8 = 5;
/// Pixels darker than this may be eroded as halo
const HALO_BRIGHTNESS: f32 = 50.0;
/// Upper bound on erosion passes
const HALO_MAX_PASSES: usize = 3;
/// Sigma for legacy edge smoothing
const SMOOTHING_SIGMA: f32 = 1.0;

#[derive(Debug, Clone, Copy)]
enum Connectivity {
    Four,
    Eight,
}

const FOUR: [(i64, i64); 4] = [(0, -1), (-1, 0), (1, 0), (0, 1)];
const EIGHT: [(i64, i64); 8] = [
    (-1, -1), (0, -1), (1, -1),
    (-1, 0), (1, 0),
    (-1, 1), (0, 1), (1, 1),
];

/// In-bounds neighbor indices of pixel `idx` in a `width` x `height` grid
fn neighbors(
    idx: usize,
    width: u32,
    height: u32,
    connectivity: Connectivity,
) -> impl Iterator<Item = usize> {
    let (w, h) = (width as i64, height as i64);
    let x = idx as i64 % w;
    let y = idx as i64 / w;
    let offsets: &'static [(i64, i64)] = match connectivity {
        Connectivity::Four => &FOUR,
        Connectivity::Eight => &EIGHT,
    };

    offsets.iter().filter_map(move |&(dx, dy)| {
        let nx = x + dx;
        let ny = y + dy;
        (nx >= 0 && ny >= 0 && nx < w && ny < h).then(|| (ny * w + nx) as usize)
    })
}

fn alpha_channel(img: &RgbaImage) -> Vec<u8> {
    img.pixels().map(|p| p[3]).collect()
}

// ============================================================================
// ALPHA COMPOSITING
// ============================================================================

/// Zero alpha on every pixel classified `Remove`
///
/// All other pixels are left byte-for-byte unchanged. Returns the number of
/// pixels touched.
pub fn apply_removal(img: &mut RgbaImage, states: &PixelStates) -> usize {
    debug_assert_eq!(img.dimensions(), states.dimensions());

    let mut removed = 0;
    for (pixel, state) in img.pixels_mut().zip(states.as_slice()) {
        if *state == PixelState::Remove {
            pixel[3] = 0;
            removed += 1;
        }
    }
    removed
}

// ============================================================================
// MAJORITY SNAPPING
// ============================================================================

/// Snap semi-transparent pixels to the alpha most of their neighbors share
///
/// A pixel with 0 < alpha < 255 becomes opaque when at least five of its
/// eight neighbors are fully opaque, transparent when at least five are fully
/// transparent, and is left alone otherwise. Neighbor alpha comes from a
/// snapshot taken before the pass, so visiting order does not matter.
pub fn snap_partial_alpha(img: &mut RgbaImage) -> usize {
    let (width, height) = img.dimensions();
    let alpha = alpha_channel(img);
    let mut snapped = 0;

    for (idx, pixel) in img.pixels_mut().enumerate() {
        let a = alpha[idx];
        if a == 0 || a == 255 {
            continue;
        }

        let (mut opaque, mut transparent) = (0u8, 0u8);
        for n in neighbors(idx, width, height, Connectivity::Eight) {
            match alpha[n] {
                255 => opaque += 1,
                0 => transparent += 1,
                _ => {}
            }
        }

        if opaque >= MAJORITY {
            pixel[3] = 255;
            snapped += 1;
        } else if transparent >= MAJORITY {
            pixel[3] = 0;
            snapped += 1;
        }
    }

    snapped
}

// ============================================================================
// DARK HALO EROSION
// ============================================================================

/// Peel dark fringe pixels off the cutout edge
///
/// Each pass clears every visible pixel darker than the halo threshold that
/// touches a fully transparent pixel (4-connectivity, read from the pass's
/// starting alpha). Stops after three passes or the first pass that clears
/// nothing. Returns the total number of pixels cleared.
pub fn erode_dark_halo(img: &mut RgbaImage) -> usize {
    let (width, height) = img.dimensions();
    let mut total = 0;

    for _ in 0..HALO_MAX_PASSES {
        let alpha = alpha_channel(img);
        let mut cleared = 0;

        for (idx, pixel) in img.pixels_mut().enumerate() {
            if alpha[idx] == 0 || brightness(pixel[0], pixel[1], pixel[2]) >= HALO_BRIGHTNESS {
                continue;
            }
            if neighbors(idx, width, height, Connectivity::Four).any(|n| alpha[n] == 0) {
                pixel[3] = 0;
                cleared += 1;
            }
        }

        total += cleared;
        if cleared == 0 {
            break;
        }
    }

    total
}

// ============================================================================
// EDGE SMOOTHING (legacy)
// ============================================================================

/// Soften the cutout edge with a blurred copy of the alpha channel
///
/// Only pixels with both a transparent and a visible 8-neighbor are touched,
/// and their alpha can only go down.
pub fn smooth_edges(img: &mut RgbaImage) {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return;
    }

    let alpha = alpha_channel(img);
    let mask = GrayImage::from_fn(width, height, |x, y| Luma([alpha[(y * width + x) as usize]]));
    let blurred = gaussian_blur_f32(&mask, SMOOTHING_SIGMA);

    for (idx, (pixel, soft)) in img.pixels_mut().zip(blurred.pixels()).enumerate() {
        if alpha[idx] == 0 {
            continue;
        }
        let mut has_transparent = false;
        let mut has_visible = false;
        for n in neighbors(idx, width, height, Connectivity::Eight) {
            if alpha[n] == 0 {
                has_transparent = true;
            } else {
                has_visible = true;
            }
        }
        if has_transparent && has_visible {
            pixel[3] = pixel[3].min(soft[0]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::ColorGroup;
    use crate::flood::flood_fill;
    use image::Rgba;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;

    #[test]
    fn test_neighbors_4way() {
        assert_eq!(neighbors(55, 10, 10, Connectivity::Four).count(), 4);
    }

    #[test]
    fn test_neighbors_8way() {
        assert_eq!(neighbors(55, 10, 10, Connectivity::Eight).count(), 8);
    }

    #[test]
    fn test_neighbors_corner() {
        assert_eq!(neighbors(0, 10, 10, Connectivity::Four).count(), 2);
        assert_eq!(neighbors(0, 10, 10, Connectivity::Eight).count(), 3);
        assert_eq!(neighbors(99, 10, 10, Connectivity::Eight).count(), 3);
    }

    #[test]
    fn test_apply_removal_only_touches_removed() {
        let mut img = RgbaImage::from_pixel(12, 12, Rgba([255, 255, 255, 255]));
        draw_filled_rect_mut(&mut img, Rect::at(4, 4).of_size(4, 4), Rgba([10, 200, 30, 77]));
        let original = img.clone();

        let bg = [ColorGroup { r: 255.0, g: 255.0, b: 255.0, count: 1 }];
        let states = flood_fill(&img, &bg, 75.0);
        let removed = apply_removal(&mut img, &states);

        assert_eq!(removed, 144 - 16);
        assert_eq!(img.get_pixel(0, 0), &Rgba([255, 255, 255, 0]));
        for y in 4..8 {
            for x in 4..8 {
                assert_eq!(img.get_pixel(x, y), original.get_pixel(x, y));
            }
        }
    }

    #[test]
    fn test_snap_to_opaque_majority() {
        let mut img = RgbaImage::from_pixel(3, 3, Rgba([50, 50, 50, 255]));
        img.put_pixel(1, 1, Rgba([50, 50, 50, 128]));
        img.put_pixel(0, 0, Rgba([50, 50, 50, 0]));
        assert_eq!(snap_partial_alpha(&mut img), 1);
        assert_eq!(img.get_pixel(1, 1)[3], 255);
    }

    #[test]
    fn test_snap_to_transparent_majority() {
        let mut img = RgbaImage::from_pixel(3, 3, Rgba([50, 50, 50, 0]));
        img.put_pixel(1, 1, Rgba([50, 50, 50, 90]));
        assert_eq!(snap_partial_alpha(&mut img), 1);
        assert_eq!(img.get_pixel(1, 1)[3], 0);
    }

    #[test]
    fn test_snap_leaves_split_and_edges() {
        // Four opaque, four transparent neighbors: no majority
        let mut img = RgbaImage::from_pixel(3, 3, Rgba([50, 50, 50, 0]));
        for x in 0..3 {
            img.put_pixel(x, 0, Rgba([50, 50, 50, 255]));
        }
        img.put_pixel(0, 1, Rgba([50, 50, 50, 255]));
        img.put_pixel(1, 1, Rgba([50, 50, 50, 100]));
        assert_eq!(snap_partial_alpha(&mut img), 0);
        assert_eq!(img.get_pixel(1, 1)[3], 100);

        // A corner pixel has only three neighbors and can never reach five
        let mut corner = RgbaImage::from_pixel(3, 3, Rgba([0, 0, 0, 255]));
        corner.put_pixel(0, 0, Rgba([0, 0, 0, 10]));
        assert_eq!(snap_partial_alpha(&mut corner), 0);
    }

    #[test]
    fn test_snap_reads_snapshot() {
        // (1,1) snaps to opaque; (2,1) has four opaque neighbors before the
        // pass and must not count its freshly snapped neighbor as a fifth
        let opaque = Rgba([0, 0, 0, 255]);
        let clear = Rgba([0, 0, 0, 0]);
        let partial = Rgba([0, 0, 0, 100]);
        let mut img = RgbaImage::from_pixel(4, 3, clear);
        for x in 0..4 {
            img.put_pixel(x, 0, opaque);
        }
        img.put_pixel(0, 1, opaque);
        img.put_pixel(1, 1, partial);
        img.put_pixel(2, 1, partial);
        img.put_pixel(3, 1, opaque);
        img.put_pixel(0, 2, opaque);

        assert_eq!(snap_partial_alpha(&mut img), 1);
        assert_eq!(img.get_pixel(1, 1)[3], 255);
        assert_eq!(img.get_pixel(2, 1)[3], 100);
    }

    #[test]
    fn test_halo_erosion_peels_dark_ring() {
        // Transparent canvas, 2px dark ring around a bright core
        let mut img = RgbaImage::from_pixel(20, 20, Rgba([0, 0, 0, 0]));
        draw_filled_rect_mut(&mut img, Rect::at(4, 4).of_size(12, 12), Rgba([20, 20, 20, 255]));
        draw_filled_rect_mut(&mut img, Rect::at(6, 6).of_size(8, 8), Rgba([220, 220, 220, 255]));

        let cleared = erode_dark_halo(&mut img);

        assert_eq!(cleared, 12 * 12 - 8 * 8);
        assert_eq!(img.get_pixel(4, 4)[3], 0);
        assert_eq!(img.get_pixel(5, 10)[3], 0);
        assert_eq!(img.get_pixel(6, 6)[3], 255);
    }

    #[test]
    fn test_halo_erosion_stops_after_three_passes() {
        let mut img = RgbaImage::from_pixel(20, 1, Rgba([10, 10, 10, 255]));
        img.put_pixel(0, 0, Rgba([10, 10, 10, 0]));

        let cleared = erode_dark_halo(&mut img);

        assert_eq!(cleared, 3);
        assert_eq!(img.get_pixel(3, 0)[3], 0);
        assert_eq!(img.get_pixel(4, 0)[3], 255);
    }

    #[test]
    fn test_halo_erosion_ignores_bright_and_isolated() {
        let mut img = RgbaImage::from_pixel(6, 6, Rgba([10, 10, 10, 255]));
        img.put_pixel(0, 0, Rgba([200, 200, 200, 0]));
        img.put_pixel(1, 0, Rgba([200, 200, 200, 255]));
        img.put_pixel(0, 1, Rgba([200, 200, 200, 255]));
        assert_eq!(erode_dark_halo(&mut img), 0);
    }

    #[test]
    fn test_smooth_edges_never_raises_alpha() {
        let mut img = RgbaImage::from_pixel(16, 16, Rgba([0, 0, 0, 0]));
        draw_filled_rect_mut(&mut img, Rect::at(4, 4).of_size(8, 8), Rgba([200, 100, 50, 255]));
        let before = img.clone();

        smooth_edges(&mut img);

        for (a, b) in before.pixels().zip(img.pixels()) {
            assert!(b[3] <= a[3]);
            if a[3] == 0 {
                assert_eq!(b[3], 0);
            }
        }
        // Boundary softened, interior untouched
        assert!(img.get_pixel(4, 8)[3] < 255);
        assert_eq!(img.get_pixel(8, 8)[3], 255);
    }
}
