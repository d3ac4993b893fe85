use crate::color::{Rgb, blend_colors};

/// Fill `leds` with a linear RGB gradient from `start` to `end`
///
/// The first pixel is exactly `start` and the last exactly `end`. A single
/// pixel gets `start`.
#[allow(clippy::cast_precision_loss)]
pub fn fill_gradient(leds: &mut [Rgb], start: Rgb, end: Rgb) {
    let Some(last) = leds.len().checked_sub(1) else {
        return;
    };
    if last == 0 {
        leds[0] = start;
        return;
    }

    let span = last as f32;
    for (i, led) in leds.iter_mut().enumerate() {
        *led = blend_colors(start, end, i as f32 / span);
    }
}
