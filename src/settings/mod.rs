//! Persisted configuration
//!
//! [`Settings`] is the in-memory configuration record, [`image`] its on-flash
//! encoding and [`SettingsStore`] the dual-slot flash persistence.

pub mod image;
mod store;

pub use store::{FlashLayout, SettingsStore, StoreError};

use crate::bounds::{ChannelWindow, MAX_CHAIN_END, required_length};
use crate::color::ColorBalance;

/// Number of LED chains the record keeps settings for
pub const CHAIN_COUNT: usize = 4;

/// Unique identity of the board the record was written on
pub type DeviceId = [u8; 8];

/// Mapping and calibration of one chain
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainSettings {
    pub length: u32,
    pub offset: u32,
    pub color_balance: ColorBalance,
    pub gamma: f32,
}

impl ChainSettings {
    pub const DISABLED: Self = Self::with_length(0);

    pub const fn with_length(length: u32) -> Self {
        Self {
            length,
            offset: 0,
            color_balance: ColorBalance::IDENTITY,
            gamma: 1.0,
        }
    }

    pub const fn window(&self) -> ChannelWindow {
        ChannelWindow::new(self.offset as usize, self.length as usize)
    }
}

/// The configuration record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settings {
    pub device_id: DeviceId,
    /// Index of the active scene
    pub scene: u32,
    /// Global brightness, `[0, 1]`
    pub brightness: f32,
    /// Scene specific parameter, `[0, 1]`
    pub param: f32,
    /// Persist changes without an explicit `flash` command
    pub autosave: bool,
    pub chains: [ChainSettings; CHAIN_COUNT],
}

impl Settings {
    /// Factory defaults: a single one-pixel chain at full brightness
    pub const fn defaults(device_id: DeviceId) -> Self {
        Self {
            device_id,
            scene: 0,
            brightness: 1.0,
            param: 0.0,
            autosave: false,
            chains: [
                ChainSettings::with_length(1),
                ChainSettings::DISABLED,
                ChainSettings::DISABLED,
                ChainSettings::DISABLED,
            ],
        }
    }

    pub fn chain_mut(&mut self, id: usize) -> Option<&mut ChainSettings> {
        self.chains.get_mut(id)
    }

    /// Length of the shared buffer needed by the configured chains
    pub fn buffer_length(&self) -> usize {
        required_length(self.chains.iter().map(ChainSettings::window))
    }

    /// Reset every out-of-range field to a safe default
    ///
    /// Returns whether anything had to be corrected.
    pub fn validate(&mut self, scene_count: usize) -> bool {
        let mut corrected = false;

        corrected |= clamp_unit(&mut self.brightness, 1.0);
        corrected |= clamp_unit(&mut self.param, 0.0);

        if usize::try_from(self.scene).map_or(true, |scene| scene >= scene_count) {
            self.scene = 0;
            corrected = true;
        }

        for chain in &mut self.chains {
            if chain.length > MAX_CHAIN_END {
                chain.length = 0;
                corrected = true;
            }
            if chain.offset > MAX_CHAIN_END - chain.length {
                chain.offset = 0;
                corrected = true;
            }
            for component in [
                &mut chain.color_balance.r,
                &mut chain.color_balance.g,
                &mut chain.color_balance.b,
            ] {
                if !(component.is_finite() && *component >= 0.0) {
                    *component = 1.0;
                    corrected = true;
                }
            }
            if !(chain.gamma.is_finite() && chain.gamma > 0.0) {
                chain.gamma = 1.0;
                corrected = true;
            }
        }

        corrected
    }
}

/// Whether `value` is a valid unit interval value (NaN is not)
pub fn is_unit(value: f32) -> bool {
    (0.0..=1.0).contains(&value)
}

fn clamp_unit(value: &mut f32, default: f32) -> bool {
    if is_unit(*value) {
        return false;
    }
    *value = default;
    true
}
