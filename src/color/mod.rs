mod correction;
mod gradient;
mod utils;

pub use correction::{Calibration, ColorBalance, CorrectionLut, correct_component};
pub use gradient::fill_gradient;
use smart_leds::RGB8;
pub use utils::{blend_colors, hsv2rgb, quantize, round_to_interval};

pub type Rgb = RGB8;

pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

/// Hue/saturation/value color
///
/// Hue is in degrees (any value, wrapped into `[0, 360)`), saturation and
/// value are normalized to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Hsv {
    pub hue: f32,
    pub sat: f32,
    pub val: f32,
}

impl Hsv {
    pub const fn new(hue: f32, sat: f32, val: f32) -> Self {
        Self { hue, sat, val }
    }

    /// Convert to an 8-bit RGB pixel
    pub fn to_rgb(self) -> Rgb {
        hsv2rgb(self)
    }
}
