//! Solid color scenes

use super::Effect;
use crate::color::{Hsv, Rgb};

const WARM_WHITE: Rgb = Rgb {
    r: 255,
    g: 139,
    b: 39,
};

/// Fills every pixel with a warm white
#[derive(Debug, Clone, Copy, Default)]
pub struct WarmWhite;

impl Effect for WarmWhite {
    fn update(&mut self, leds: &mut [Rgb], _dt: f32, _param: f32) {
        leds.fill(WARM_WHITE);
    }
}

/// Fills every pixel with one fully saturated hue
///
/// The parameter selects the hue, `0.0` and `1.0` are both red.
#[derive(Debug, Clone, Copy, Default)]
pub struct PureColor;

impl Effect for PureColor {
    fn update(&mut self, leds: &mut [Rgb], _dt: f32, param: f32) {
        leds.fill(Hsv::new(param * 360.0, 1.0, 1.0).to_rgb());
    }
}
