//! Board and timing constants.

use embassy_time::Duration;

/// Target frame rate of the control loop.
pub const TARGET_FPS: u64 = 20;

/// Frame period derived from [`TARGET_FPS`].
pub const FRAME_DURATION: Duration = Duration::from_micros(1_000_000 / TARGET_FPS);

/// Frame period in seconds, as handed to scenes and hold ramps.
#[allow(clippy::cast_precision_loss)]
pub const FRAME_SECONDS: f32 = 1.0 / TARGET_FPS as f32;

/// Output pins of the four LED chains, in chain order.
pub const CHAIN_PINS: [u8; 4] = [22, 26, 27, 28];

/// Sequencer clock divisor matching the strip protocol's bit time.
pub const BIT_CLOCK_DIVISOR: f32 = 5.0;

/// Minimum time between two physical settings writes.
pub const SAVE_COOLDOWN: Duration = Duration::from_secs(15);

/// Total size of the on-board flash part.
pub const FLASH_SIZE: u32 = 2 * 1024 * 1024;

/// Smallest erasable flash unit.
pub const FLASH_SECTOR_SIZE: u32 = 4096;

/// Longest console line accepted; extra characters are dropped.
pub const MAX_LINE_LENGTH: usize = 1023;

/// Rate of change per second while a ramping button is held.
pub const HOLD_RAMP_PER_SECOND: f32 = 0.2;

/// Step applied by a single tap on the brightness or param buttons.
pub const TAP_STEP: f32 = 0.1;
