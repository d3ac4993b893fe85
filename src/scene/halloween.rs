//! Flickering orange cross-fades
//!
//! Every [`FADE_SECONDS`] each pixel picks a new random orange and fades
//! towards it from the previous one. Colors are derived from a hash of the
//! fade epoch and pixel index, so the scene needs no per-pixel storage and
//! adapts to any buffer length.

use super::Effect;
use crate::color::{BLACK, Hsv, Rgb, blend_colors};

const FADE_SECONDS: f32 = 4.0;
const SEED: u32 = 349_875_232;

#[derive(Debug, Clone)]
pub struct Halloween {
    /// Seconds into the current fade
    elapsed: f32,
    /// Fade target generation, 0 is the initial black
    epoch: u32,
}

impl Default for Halloween {
    fn default() -> Self {
        Self::new()
    }
}

impl Halloween {
    pub const fn new() -> Self {
        // Starts at the end of a fade so the first update begins fading in
        Self {
            elapsed: FADE_SECONDS,
            epoch: 0,
        }
    }

    fn color(epoch: u32, index: u32) -> Rgb {
        if epoch == 0 {
            return BLACK;
        }
        let mut state = mix(SEED ^ epoch.wrapping_mul(0x9E37_79B9) ^ index.wrapping_mul(0x85EB_CA6B));
        let hue = lerp(10.0, 20.0, unit(&mut state));
        let sat = lerp(0.9, 1.0, unit(&mut state));
        let val = lerp(0.3, 0.7, unit(&mut state));
        Hsv::new(hue, sat, val).to_rgb()
    }
}

impl Effect for Halloween {
    #[allow(clippy::cast_possible_truncation)]
    fn update(&mut self, leds: &mut [Rgb], dt: f32, _param: f32) {
        self.elapsed += dt.max(0.0);
        while self.elapsed >= FADE_SECONDS {
            self.elapsed -= FADE_SECONDS;
            self.epoch = self.epoch.wrapping_add(1).max(1);
        }

        let amount = self.elapsed / FADE_SECONDS;
        let previous = self.epoch.wrapping_sub(1);
        for (i, led) in leds.iter_mut().enumerate() {
            let index = i as u32;
            *led = blend_colors(
                Self::color(previous, index),
                Self::color(self.epoch, index),
                amount,
            );
        }
    }

    fn reset(&mut self) {
        *self = Self::new();
    }
}

/// 32-bit avalanche finalizer
const fn mix(mut x: u32) -> u32 {
    x ^= x >> 16;
    x = x.wrapping_mul(0x7FEB_352D);
    x ^= x >> 15;
    x = x.wrapping_mul(0x846C_A68B);
    x ^= x >> 16;
    x
}

/// Next pseudo-random value in `[0, 1)` (xorshift32 over a mixed seed)
#[allow(clippy::cast_precision_loss)]
fn unit(state: &mut u32) -> f32 {
    let mut x = *state | 1;
    x ^= x << 13;
    x ^= x >> 17;
    x ^= x << 5;
    *state = x;
    (x >> 8) as f32 / (1u32 << 24) as f32
}

fn lerp(min: f32, max: f32, t: f32) -> f32 {
    min + (max - min) * t
}
