//! Border-seeded flood fill
//!
//! Classification spreads inward from every border pixel. A pixel close to
//! any background color becomes `Remove` and hands the fill on to its eight
//! neighbors; anything else becomes `Keep` and stops it. Background-colored
//! regions walled off by kept pixels are therefore never reached.

use image::RgbaImage;
use crate::color::{color_distance, rgb_f32, ColorGroup};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PixelState {
    Unvisited,
    Keep,
    Remove,
}

/// Per-pixel classification, one byte per pixel in row-major order
#[derive(Debug, Clone)]
pub struct PixelStates {
    width: u32,
    height: u32,
    states: Vec<PixelState>,
}

impl PixelStates {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            states: vec![PixelState::Unvisited; width as usize * height as usize],
        }
    }

    pub fn get(&self, x: u32, y: u32) -> PixelState {
        self.states[(y * self.width + x) as usize]
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn as_slice(&self) -> &[PixelState] {
        &self.states
    }

    pub fn count(&self, state: PixelState) -> usize {
        self.states.iter().filter(|&&s| s == state).count()
    }
}

/// Flat indices of every pixel on the four image edges
fn border_indices(width: u32, height: u32) -> Vec<usize> {
    let (w, h) = (width as usize, height as usize);
    let mut seeds = Vec::with_capacity(2 * (w + h));

    for x in 0..w {
        seeds.push(x);
        seeds.push((h - 1) * w + x);
    }
    for y in 1..h.saturating_sub(1) {
        seeds.push(y * w);
        seeds.push(y * w + w - 1);
    }

    seeds
}

/// Classify every pixel reachable from the border
///
/// `threshold` is compared against `color_distance` to each background
/// color. Uses an explicit stack, which holds at most eight entries per
/// removed pixel on top of the border seeds.
pub fn flood_fill(img: &RgbaImage, background: &[ColorGroup], threshold: f32) -> PixelStates {
    let (width, height) = img.dimensions();
    let mut states = PixelStates::new(width, height);

    if width == 0 || height == 0 || background.is_empty() {
        return states;
    }

    let raw = img.as_raw();
    let bg: Vec<[f32; 3]> = background.iter().map(ColorGroup::rgb).collect();
    let is_background = |idx: usize| {
        let p = &raw[idx * 4..idx * 4 + 3];
        let rgb = rgb_f32(p[0], p[1], p[2]);
        bg.iter().any(|&c| color_distance(rgb, c) <= threshold)
    };

    let (w, h) = (width as i64, height as i64);
    let mut stack = border_indices(width, height);

    while let Some(idx) = stack.pop() {
        if states.states[idx] != PixelState::Unvisited {
            continue;
        }

        if !is_background(idx) {
            states.states[idx] = PixelState::Keep;
            continue;
        }
        states.states[idx] = PixelState::Remove;

        let x = idx as i64 % w;
        let y = idx as i64 / w;
        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = x + dx;
                let ny = y + dy;
                if nx < 0 || ny < 0 || nx >= w || ny >= h {
                    continue;
                }
                let nidx = (ny * w + nx) as usize;
                if states.states[nidx] == PixelState::Unvisited {
                    stack.push(nidx);
                }
            }
        }
    }

    states
}
