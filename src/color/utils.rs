use libm::{fabsf, fmodf, roundf};

use crate::color::{Hsv, Rgb};

/// Round a normalized intensity to the nearest 8-bit level
///
/// Out-of-range and NaN inputs saturate to `0..=255`.
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn quantize(value: f32) -> u8 {
    let rounded = roundf(value);
    if rounded >= 255.0 {
        255
    } else if rounded > 0.0 {
        rounded as u8
    } else {
        0
    }
}

/// Round `value` to the nearest multiple of `interval`
pub fn round_to_interval(value: f32, interval: f32) -> f32 {
    roundf(value / interval) * interval
}

/// Blend two RGB colors
///
/// # Arguments
/// * `a` - First color
/// * `b` - Second color
/// * `amount_of_b` - Blend factor (0.0 = all a, 1.0 = all b), clamped
#[inline]
pub fn blend_colors(a: Rgb, b: Rgb, amount_of_b: f32) -> Rgb {
    let t = if amount_of_b.is_nan() {
        0.0
    } else {
        amount_of_b.clamp(0.0, 1.0)
    };
    Rgb {
        r: blend_channel(a.r, b.r, t),
        g: blend_channel(a.g, b.g, t),
        b: blend_channel(a.b, b.b, t),
    }
}

#[inline]
fn blend_channel(a: u8, b: u8, t: f32) -> u8 {
    let a = f32::from(a);
    let b = f32::from(b);
    quantize(a + (b - a) * t)
}

/// Convert a floating point HSV color to RGB
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn hsv2rgb(hsv: Hsv) -> Rgb {
    let mut hue = fmodf(hsv.hue, 360.0);
    if hue < 0.0 {
        hue += 360.0;
    }
    let sat = hsv.sat.clamp(0.0, 1.0);
    let val = hsv.val.clamp(0.0, 1.0);

    let chroma = val * sat;
    let sector = hue / 60.0;
    let x = chroma * (1.0 - fabsf(fmodf(sector, 2.0) - 1.0));
    let m = val - chroma;

    let (r, g, b) = match sector as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };

    Rgb {
        r: quantize((r + m) * 255.0),
        g: quantize((g + m) * 255.0),
        b: quantize((b + m) * 255.0),
    }
}
