#![no_std]

pub mod bounds;
pub mod color;
pub mod config;
pub mod console;
pub mod control;
pub mod frame_scheduler;
pub mod input;
pub mod output;
pub mod scene;
pub mod settings;

pub use bounds::{ChannelWindow, MAX_BUFFER_LENGTH, MAX_CHAIN_END, PixelBuffer};
pub use color::{Calibration, ColorBalance, Hsv, Rgb};
pub use console::{Command, CommandError, Console, LineBuffer};
pub use control::{App, ButtonPins, Buttons, ControlLoop, SystemControl};
pub use frame_scheduler::{FrameResult, FrameScheduler};
pub use input::{BootSelect, Button, ButtonSource, ChipSelectOverride, HoldConfig};
pub use output::{Channel, OutputBlock, OutputError, Sequencer, TxQueue, stream_frame};
pub use scene::{SCENE_COUNT, Scene};
pub use settings::{
    CHAIN_COUNT, ChainSettings, DeviceId, FlashLayout, Settings, SettingsStore, StoreError,
};

pub use embassy_time::{Duration, Instant};
