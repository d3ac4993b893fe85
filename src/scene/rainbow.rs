//! Cycling rainbow

use libm::fmodf;

use super::Effect;
use crate::color::{Hsv, Rgb};

/// Seconds for one full hue cycle
const CYCLE_SECONDS: f32 = 10.0;

/// Full rainbow across the buffer, rotating once per [`CYCLE_SECONDS`]
#[derive(Debug, Clone, Default)]
pub struct GamerRgb {
    t: f32,
}

impl GamerRgb {
    pub const fn new() -> Self {
        Self { t: 0.0 }
    }
}

impl Effect for GamerRgb {
    #[allow(clippy::cast_precision_loss)]
    fn update(&mut self, leds: &mut [Rgb], dt: f32, _param: f32) {
        self.t = fmodf(self.t + dt, CYCLE_SECONDS);
        if leds.is_empty() {
            return;
        }

        let base_hue = self.t * (360.0 / CYCLE_SECONDS);
        let hue_step = 360.0 / leds.len() as f32;
        for (i, led) in leds.iter_mut().enumerate() {
            let hue = fmodf(base_hue + i as f32 * hue_step, 360.0);
            *led = Hsv::new(hue, 1.0, 1.0).to_rgb();
        }
    }

    fn reset(&mut self) {
        self.t = 0.0;
    }
}
