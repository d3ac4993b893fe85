//! Built-in scenes
//!
//! The scene set is fixed at compile time, so scenes live in a closed enum
//! instead of behind trait objects. Each variant wraps a struct implementing
//! [`Effect`].

mod halloween;
mod rainbow;
mod static_color;

pub use halloween::Halloween;
pub use rainbow::GamerRgb;
pub use static_color::{PureColor, WarmWhite};

use crate::color::Rgb;

/// Number of built-in scenes
pub const SCENE_COUNT: usize = 4;

const SCENE_NAME_WARM_WHITE: &str = "warm_white";
const SCENE_NAME_HALLOWEEN: &str = "halloween";
const SCENE_NAME_GAMER_RGB: &str = "gamer_rgb";
const SCENE_NAME_PURE_COLOR: &str = "pure_color";

pub trait Effect {
    /// Advance by `dt` seconds and draw into `leds`
    ///
    /// `param` is the user adjustable scene parameter in `[0, 1]`.
    fn update(&mut self, leds: &mut [Rgb], dt: f32, param: f32);

    /// Reset animation state
    fn reset(&mut self) {}
}

/// A built-in scene
#[derive(Debug, Clone)]
pub enum Scene {
    /// Constant warm white
    WarmWhite(WarmWhite),
    /// Slow cross-fades between flickering orange tones
    Halloween(Halloween),
    /// Rainbow spread over the whole buffer, cycling in hue
    GamerRgb(GamerRgb),
    /// Solid fully saturated color picked by the parameter
    PureColor(PureColor),
}

impl Scene {
    /// All scenes in selection order
    pub fn builtin() -> [Self; SCENE_COUNT] {
        [
            Self::WarmWhite(WarmWhite),
            Self::Halloween(Halloween::new()),
            Self::GamerRgb(GamerRgb::new()),
            Self::PureColor(PureColor),
        ]
    }

    pub fn update(&mut self, leds: &mut [Rgb], dt: f32, param: f32) {
        match self {
            Self::WarmWhite(scene) => scene.update(leds, dt, param),
            Self::Halloween(scene) => scene.update(leds, dt, param),
            Self::GamerRgb(scene) => scene.update(leds, dt, param),
            Self::PureColor(scene) => scene.update(leds, dt, param),
        }
    }

    pub fn reset(&mut self) {
        match self {
            Self::WarmWhite(scene) => Effect::reset(scene),
            Self::Halloween(scene) => Effect::reset(scene),
            Self::GamerRgb(scene) => Effect::reset(scene),
            Self::PureColor(scene) => Effect::reset(scene),
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::WarmWhite(_) => SCENE_NAME_WARM_WHITE,
            Self::Halloween(_) => SCENE_NAME_HALLOWEEN,
            Self::GamerRgb(_) => SCENE_NAME_GAMER_RGB,
            Self::PureColor(_) => SCENE_NAME_PURE_COLOR,
        }
    }
}
