//! Colour-space helpers shared by the engines and the palette generator.

use crate::frame::{unit, Hsl, Rgb};

/// Wraps a hue in degrees into `[0, 360)`.
pub fn wrap_hue(degrees: f32) -> f32 {
    if !degrees.is_finite() {
        return 0.0;
    }
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs.
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Wraps a normalised hue into `[0, 1)`.
pub fn wrap_unit_hue(hue: f32) -> f32 {
    wrap_hue(hue * 360.0) / 360.0
}

/// Interpolates between two hues along the shorter arc.
pub fn lerp_hue(from: f32, to: f32, t: f32) -> f32 {
    let mut from = from;
    let mut to = to;
    let diff = to - from;
    if diff.abs() > 180.0 {
        if diff > 0.0 {
            from += 360.0;
        } else {
            to += 360.0;
        }
    }
    wrap_hue(from + (to - from) * unit(t))
}

pub fn hsl_to_rgb(color: Hsl) -> Rgb {
    let h = wrap_unit_hue(color.h);
    let s = unit(color.s);
    let l = unit(color.l);

    if s <= f32::EPSILON {
        let grey = to_byte(l);
        return Rgb::new(grey, grey, grey);
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;

    Rgb::new(
        to_byte(hue_channel(p, q, h + 1.0 / 3.0)),
        to_byte(hue_channel(p, q, h)),
        to_byte(hue_channel(p, q, h - 1.0 / 3.0)),
    )
}

/// Raises lightness by `percent` points, saturating at full white.
pub fn boost_lightness(color: Hsl, percent: f32) -> Hsl {
    Hsl::new(color.h, color.s, color.l + percent / 100.0)
}

fn hue_channel(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

fn to_byte(value: f32) -> u8 {
    (unit(value) * 255.0).round() as u8
}
