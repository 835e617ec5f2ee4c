use serde::Serialize;
use crate::color::ColorGroup;

/// Average border brightness under which the background counts as dark
pub const DARK_BRIGHTNESS: f32 = 80.0;
/// Average border brightness over which the background counts as light
pub const LIGHT_BRIGHTNESS: f32 = 200.0;

const DARK_MIN_TOLERANCE: u32 = 55;
const LIGHT_MIN_TOLERANCE: u32 = 35;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BorderTone {
    Dark,
    Light,
    Mid,
}

impl BorderTone {
    fn from_brightness(brightness: f32) -> Self {
        if brightness < DARK_BRIGHTNESS {
            BorderTone::Dark
        } else if brightness > LIGHT_BRIGHTNESS {
            BorderTone::Light
        } else {
            BorderTone::Mid
        }
    }

    /// How many of the largest groups are treated as background
    pub fn group_budget(self) -> usize {
        match self {
            BorderTone::Dark => 8,
            BorderTone::Light => 5,
            BorderTone::Mid => 3,
        }
    }

    /// Floor applied to the caller's tolerance
    ///
    /// Gradient and antialiased borders, most common on near-black and
    /// near-white backgrounds, need a looser match than flat mid tones.
    pub fn effective_tolerance(self, tolerance: u32) -> u32 {
        match self {
            BorderTone::Dark => tolerance.max(DARK_MIN_TOLERANCE),
            BorderTone::Light => tolerance.max(LIGHT_MIN_TOLERANCE),
            BorderTone::Mid => tolerance,
        }
    }
}

/// Which colors count as background, and how loosely to match them
#[derive(Debug, Clone)]
pub struct Classification {
    pub tone: BorderTone,
    pub average_brightness: f32,
    pub effective_tolerance: u32,
    pub background: Vec<ColorGroup>,
}

impl Classification {
    /// Distance threshold used by the flood fill
    pub fn match_threshold(&self) -> f32 {
        self.effective_tolerance as f32 * 3.0
    }
}

/// Pick tolerance and background set from the grouped border colors
///
/// `groups` must be sorted by descending count. Brightness is the plain mean
/// over the top three groups, not weighted by count.
pub fn classify_background(groups: &[ColorGroup], tolerance: u32) -> Classification {
    let top = &groups[..groups.len().min(3)];
    let average_brightness = if top.is_empty() {
        0.0
    } else {
        top.iter().map(ColorGroup::brightness).sum::<f32>() / top.len() as f32
    };

    let tone = BorderTone::from_brightness(average_brightness);
    let budget = tone.group_budget().min(groups.len());

    Classification {
        tone,
        average_brightness,
        effective_tolerance: tone.effective_tolerance(tolerance),
        background: groups[..budget].to_vec(),
    }
}
