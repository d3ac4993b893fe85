//! Per-channel color correction
//!
//! Every streamed component goes through the same curve:
//! scale by the channel's color balance and the global brightness, normalize
//! to `[0, 1]`, raise to the channel's gamma and requantize to 8 bits.
//! Channels evaluate the curve through a [`CorrectionLut`] that is only
//! rebuilt when calibration or brightness change.

use libm::powf;

use crate::color::{Rgb, quantize};

/// Per-component color balance multiplier
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorBalance {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl ColorBalance {
    /// Neutral balance, leaves colors untouched
    pub const IDENTITY: Self = Self::new(1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    const fn components(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

impl Default for ColorBalance {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Calibration pair of one output channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub color_balance: ColorBalance,
    pub gamma: f32,
}

impl Calibration {
    pub const IDENTITY: Self = Self {
        color_balance: ColorBalance::IDENTITY,
        gamma: 1.0,
    };

    pub const fn new(color_balance: ColorBalance, gamma: f32) -> Self {
        Self {
            color_balance,
            gamma,
        }
    }

    /// Correct a single pixel without a lookup table
    pub fn correct(&self, pixel: Rgb, brightness: f32) -> Rgb {
        let balance = self.color_balance;
        Rgb {
            r: correct_component(pixel.r, balance.r, brightness, self.gamma),
            g: correct_component(pixel.g, balance.g, brightness, self.gamma),
            b: correct_component(pixel.b, balance.b, brightness, self.gamma),
        }
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Correct one 8-bit component
#[allow(clippy::float_cmp)]
pub fn correct_component(value: u8, balance: f32, brightness: f32, gamma: f32) -> u8 {
    let scaled = f32::from(value) * balance * brightness / 255.0;
    if scaled.is_nan() {
        return 0;
    }
    let normalized = scaled.clamp(0.0, 1.0);
    let curved = if gamma == 1.0 {
        normalized
    } else {
        powf(normalized, gamma)
    };
    quantize(curved * 255.0)
}

/// Cached correction curve for all three components
#[derive(Debug, Clone)]
pub struct CorrectionLut {
    tables: [[u8; 256]; 3],
    key: Option<(Calibration, f32)>,
}

impl CorrectionLut {
    pub const fn new() -> Self {
        Self {
            tables: [[0; 256]; 3],
            key: None,
        }
    }

    /// Make the table match `calibration` at `brightness`
    ///
    /// Does nothing if it already does.
    #[allow(clippy::cast_possible_truncation)]
    pub fn prepare(&mut self, calibration: &Calibration, brightness: f32) {
        let key = (*calibration, brightness);
        if self.key == Some(key) {
            return;
        }

        let balance = calibration.color_balance.components();
        for (table, balance) in self.tables.iter_mut().zip(balance) {
            for (value, entry) in table.iter_mut().enumerate() {
                *entry = correct_component(value as u8, balance, brightness, calibration.gamma);
            }
        }
        self.key = Some(key);
    }

    /// Correct a pixel with the prepared curve
    #[inline]
    pub fn apply(&self, pixel: Rgb) -> Rgb {
        Rgb {
            r: self.tables[0][usize::from(pixel.r)],
            g: self.tables[1][usize::from(pixel.g)],
            b: self.tables[2][usize::from(pixel.b)],
        }
    }
}

impl Default for CorrectionLut {
    fn default() -> Self {
        Self::new()
    }
}
