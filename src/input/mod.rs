//! Push buttons
//!
//! [`Button`] samples a [`ButtonSource`] once per frame and derives edges,
//! press and release durations and an optional hold/auto-repeat action.

mod boot_select;

pub use boot_select::{BootSelect, ChipSelectOverride};
use embassy_time::{Duration, Instant};
use embedded_hal::digital::InputPin;

/// Hold detection timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoldConfig {
    /// Press duration before the first hold activation
    pub activation: Duration,
    /// Interval between repeated activations, zero repeats every update
    pub repeat: Duration,
}

impl Default for HoldConfig {
    fn default() -> Self {
        Self {
            activation: Duration::from_millis(1000),
            repeat: Duration::from_millis(0),
        }
    }
}

/// Plain GPIO button input
pub struct GpioInput<P> {
    pin: P,
    active_low: bool,
}

impl<P: InputPin> GpioInput<P> {
    pub const fn new(pin: P, active_low: bool) -> Self {
        Self { pin, active_low }
    }

    /// A read error counts as released
    fn is_pressed(&mut self) -> bool {
        let level = if self.active_low {
            self.pin.is_low()
        } else {
            self.pin.is_high()
        };
        level.unwrap_or(false)
    }
}

/// Where a button reads its state from
pub enum ButtonSource<P, C> {
    /// Pulled-up GPIO or any other [`InputPin`]
    Gpio(GpioInput<P>),
    /// Boot-select button sharing the flash chip-select line
    BootSelect(BootSelect<C>),
}

impl<P: InputPin, C: ChipSelectOverride> ButtonSource<P, C> {
    fn is_pressed(&mut self) -> bool {
        match self {
            Self::Gpio(input) => input.is_pressed(),
            Self::BootSelect(input) => input.sample(),
        }
    }
}

/// Debounced-by-frame button with edge and hold detection
pub struct Button<P, C> {
    source: ButtonSource<P, C>,
    state: bool,
    last_state: bool,
    state_since: Instant,
    hold: Option<HoldConfig>,
    hold_deadline: Instant,
    hold_activate: bool,
    /// Swallow the release edge ending a hold
    suppress_release: bool,
}

impl<P: InputPin, C: ChipSelectOverride> Button<P, C> {
    /// Create a button and take an initial sample
    ///
    /// A button that is already down at creation does not report a press
    /// edge.
    pub fn new(mut source: ButtonSource<P, C>, hold: Option<HoldConfig>, now: Instant) -> Self {
        let state = source.is_pressed();
        let activation = hold.map_or(Duration::from_ticks(0), |hold| hold.activation);
        Self {
            source,
            state,
            last_state: state,
            state_since: now,
            hold,
            hold_deadline: now + activation,
            hold_activate: false,
            suppress_release: false,
        }
    }

    /// Active-low GPIO button, the usual wiring with a pull-up
    pub fn gpio(pin: P, hold: Option<HoldConfig>, now: Instant) -> Self {
        Self::new(ButtonSource::Gpio(GpioInput::new(pin, true)), hold, now)
    }

    pub fn boot_select(chip_select: C, now: Instant) -> Self {
        Self::new(
            ButtonSource::BootSelect(BootSelect::new(chip_select)),
            None,
            now,
        )
    }

    /// Sample the source, call once per frame
    pub fn update(&mut self, now: Instant) {
        self.last_state = self.state;
        self.state = self.source.is_pressed();
        if self.last_state != self.state {
            self.state_since = now;
        }

        let Some(hold) = self.hold else {
            return;
        };

        if self.button_down() {
            self.hold_deadline = now + hold.activation;
        }

        if self.button_up() && self.suppress_release {
            self.last_state = self.state;
            self.suppress_release = false;
        }

        if self.state && self.hold_deadline <= now {
            self.hold_activate = true;
            self.hold_deadline = now + hold.repeat;
            self.suppress_release = true;
        } else {
            self.hold_activate = false;
        }
    }

    pub const fn pressed(&self) -> bool {
        self.state
    }

    /// Pressed since the previous update
    pub const fn button_down(&self) -> bool {
        self.state && !self.last_state
    }

    /// Released since the previous update, unless the press was a hold
    pub const fn button_up(&self) -> bool {
        !self.state && self.last_state
    }

    /// A hold activation fired on the last update
    pub const fn held_activate(&self) -> bool {
        self.hold_activate
    }

    /// How long the button has been down, zero while released
    pub fn held_time(&self, now: Instant) -> Duration {
        if self.state {
            now.saturating_duration_since(self.state_since)
        } else {
            Duration::from_ticks(0)
        }
    }

    /// How long the button has been up, zero while pressed
    pub fn released_time(&self, now: Instant) -> Duration {
        if self.state {
            Duration::from_ticks(0)
        } else {
            now.saturating_duration_since(self.state_since)
        }
    }
}
