//! Color Palette
//!
//! Each label owns a finite pool of concrete colors laid out on an HSL ramp.
//! Pools never overlap, so a color value identifies its participant.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

use crate::error::{CanvasError, CanvasResult};
use crate::types::{ColorLabel, ColorValue};

/// Colors per label
pub const POOL_SIZE: usize = 16;

const STANDARD_LIGHTNESS: [f64; 4] = [0.38, 0.48, 0.58, 0.68];
const STANDARD_SATURATION: [f64; 4] = [0.55, 0.70, 0.85, 1.0];
const EARTH_LIGHTNESS: [f64; 4] = [0.18, 0.24, 0.30, 0.36];
const EARTH_SATURATION: [f64; 4] = [0.35, 0.45, 0.55, 0.65];

fn hue(label: ColorLabel) -> f64 {
    match label {
        ColorLabel::Red => 0.0,
        ColorLabel::Orange => 28.0,
        ColorLabel::Yellow => 52.0,
        ColorLabel::Green => 125.0,
        ColorLabel::Blue => 215.0,
        ColorLabel::Purple => 275.0,
        ColorLabel::Pink => 325.0,
        ColorLabel::Brown => 22.0,
    }
}

/// Full pool for a label, in a stable order
pub fn pool(label: ColorLabel) -> Vec<ColorValue> {
    let (lightness, saturation) = match label {
        ColorLabel::Brown => (EARTH_LIGHTNESS, EARTH_SATURATION),
        _ => (STANDARD_LIGHTNESS, STANDARD_SATURATION),
    };
    let h = hue(label);
    lightness
        .iter()
        .flat_map(|l| saturation.iter().map(move |s| hsl_to_color(h, *s, *l)))
        .collect()
}

/// Pick a random pool member not in `used`
pub fn pick_unused<R: Rng + ?Sized>(
    label: ColorLabel,
    used: &HashSet<ColorValue>,
    rng: &mut R,
) -> CanvasResult<ColorValue> {
    let free: Vec<ColorValue> = pool(label)
        .into_iter()
        .filter(|value| !used.contains(value))
        .collect();
    free.choose(rng)
        .cloned()
        .ok_or(CanvasError::ColorPoolExhausted {
            label: label.to_string(),
        })
}

fn hsl_to_color(h: f64, s: f64, l: f64) -> ColorValue {
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let hp = h / 60.0;
    let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
    let (r1, g1, b1) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    let channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    ColorValue::from_rgb(channel(r1), channel(g1), channel(b1))
}
