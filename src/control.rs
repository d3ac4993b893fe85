//! Application state and the fixed-rate control loop
//!
//! [`App`] owns everything the loop mutates: the settings store, the shared
//! pixel buffer, the output channels and the scenes. [`ControlLoop`] adds the
//! console line buffer, the buttons and frame pacing, and runs one
//! [`ControlLoop::tick`] per frame.

use core::fmt::Write;

use embassy_time::{Instant, Timer};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::InputPin;
use embedded_storage::nor_flash::NorFlash;
use heapless::Vec;

use crate::bounds::{MAX_CHAIN_END, PixelBuffer};
use crate::color::{BLACK, Rgb, fill_gradient, round_to_interval};
use crate::config::{CHAIN_PINS, FRAME_DURATION, FRAME_SECONDS, HOLD_RAMP_PER_SECOND, TAP_STEP};
use crate::console::{Command, CommandError, Console, LineBuffer};
use crate::frame_scheduler::{FrameResult, FrameScheduler};
use crate::input::{Button, ChipSelectOverride, HoldConfig};
use crate::output::{Channel, OutputBlock, OutputError, Sequencer};
use crate::scene::{SCENE_COUNT, Scene};
use crate::settings::{CHAIN_COUNT, Settings, SettingsStore, StoreError};

const ATTENTION_RED: Rgb = Rgb { r: 128, g: 0, b: 0 };

/// Attention pattern shown before entering the bootloader, (color, hold ms)
const ATTENTION_PATTERN: [(Rgb, u32); 7] = [
    (BLACK, 200),
    (ATTENTION_RED, 100),
    (BLACK, 200),
    (ATTENTION_RED, 100),
    (BLACK, 200),
    (ATTENTION_RED, 100),
    (BLACK, 100),
];

/// Board level reset control
pub trait SystemControl: DelayNs {
    /// Restart the firmware
    fn reset(&mut self) -> !;

    /// Restart into the USB bootloader for reprogramming
    fn reset_to_bootloader(&mut self) -> !;
}

/// Application state shared by console commands and buttons
pub struct App<'a, S: Sequencer, F> {
    store: SettingsStore<F>,
    buffer: PixelBuffer,
    channels: Vec<Channel<'a, S>, CHAIN_COUNT>,
    scenes: [Scene; SCENE_COUNT],
    halted: bool,
}

impl<'a, S: Sequencer, F: NorFlash> App<'a, S, F> {
    /// Open one channel per chain pin and apply the stored settings
    ///
    /// If the store came up with defaults or corrected values, a save is
    /// attempted right away.
    pub fn new(
        block: &'a OutputBlock<S>,
        store: SettingsStore<F>,
        now: Instant,
    ) -> Result<Self, OutputError> {
        let mut channels = Vec::new();
        for pin in CHAIN_PINS {
            let channel = block.open_channel(pin)?;
            channels
                .push(channel)
                .map_err(|_| OutputError::ResourceExhausted)?;
        }

        let mut app = Self {
            store,
            buffer: PixelBuffer::new(),
            channels,
            scenes: Scene::builtin(),
            halted: false,
        };
        app.apply_settings();

        if app.store.is_dirty() {
            log_save(app.store.save(now, false));
        }

        Ok(app)
    }

    /// Push chain windows and calibrations to the channels
    ///
    /// The buffer is resized to exactly what the chains cover, so it shrinks
    /// when chains are shortened.
    pub fn apply_settings(&mut self) {
        let settings = *self.store.settings();
        for (channel, chain) in self.channels.iter_mut().zip(&settings.chains) {
            channel.set_window(chain.window());
            channel.set_calibration(chain.color_balance, chain.gamma);
        }
        self.buffer.resize(settings.buffer_length());
    }

    /// Advance the active scene by `dt` seconds, unless halted
    pub fn render(&mut self, dt: f32) {
        if self.halted {
            return;
        }
        let settings = self.store.settings();
        let param = settings.param;
        let Some(scene) = usize::try_from(settings.scene)
            .ok()
            .and_then(|index| self.scenes.get_mut(index))
        else {
            return;
        };
        scene.update(&mut self.buffer, dt, param);
    }

    /// Stream the buffer to every channel
    pub fn stream(&mut self) {
        let brightness = self.store.settings().brightness;
        crate::output::stream_frame(&self.buffer, &mut self.channels, brightness);
    }

    /// Save if autosave is enabled, subject to the write cooldown
    pub fn autosave(&mut self, now: Instant) {
        if self.store.settings().autosave && self.store.is_dirty() {
            log_save(self.store.save(now, false));
        }
    }

    pub fn save(&mut self, now: Instant, force: bool) -> Result<bool, StoreError> {
        self.store.save(now, force)
    }

    /// Select the next scene, wrapping around
    pub fn next_scene(&mut self) -> u32 {
        let current = self.store.settings().scene;
        let next = usize::try_from(current).map_or(0, |scene| (scene + 1) % SCENE_COUNT);
        let next = u32::try_from(next).unwrap_or(0);
        self.select_scene(next);
        next
    }

    /// Make `scene` active, restarting its animation from the beginning
    pub fn select_scene(&mut self, scene: u32) {
        self.store.settings_mut().scene = scene;
        if let Some(active) = usize::try_from(scene)
            .ok()
            .and_then(|index| self.scenes.get_mut(index))
        {
            active.reset();
        }
    }

    /// Parse and execute one console line, replying on `console`
    ///
    /// Successful commands end with `ok`, failures with their error text.
    pub fn handle_line<C, Y>(&mut self, line: &str, now: Instant, console: &mut C, system: &mut Y)
    where
        C: Console + ?Sized,
        Y: SystemControl + ?Sized,
    {
        let result = match Command::parse(line) {
            Ok(None) => return,
            Ok(Some(command)) => self.execute(command, now, console, system),
            Err(err) => Err(err),
        };

        match result {
            Ok(()) => {
                self.apply_settings();
                let _ = writeln!(console, "ok");
            }
            Err(err) => {
                #[cfg(feature = "defmt")]
                defmt::debug!("console: command failed: {}", err);
                let _ = writeln!(console, "{err}");
            }
        }
    }

    /// Execute a parsed command
    pub fn execute<C, Y>(
        &mut self,
        command: Command,
        now: Instant,
        console: &mut C,
        system: &mut Y,
    ) -> Result<(), CommandError>
    where
        C: Console + ?Sized,
        Y: SystemControl + ?Sized,
    {
        match command {
            Command::Count { chain, count } => {
                let settings = self.store.settings_mut();
                let chain_settings = settings.chain_mut(chain).ok_or(CommandError::BadChain)?;
                if count > MAX_CHAIN_END.saturating_sub(chain_settings.offset) {
                    return Err(CommandError::BadCount);
                }
                chain_settings.length = count;
                let _ = writeln!(console, "chain {chain} count set: {count}");
            }
            Command::Offset { chain, offset } => {
                let settings = self.store.settings_mut();
                let chain_settings = settings.chain_mut(chain).ok_or(CommandError::BadChain)?;
                if offset > MAX_CHAIN_END.saturating_sub(chain_settings.length) {
                    return Err(CommandError::BadOffset);
                }
                chain_settings.offset = offset;
                let _ = writeln!(console, "chain {chain} offset set: {offset}");
            }
            Command::Color { chain, balance } => {
                let settings = self.store.settings_mut();
                settings.chain_mut(chain).ok_or(CommandError::BadChain)?.color_balance = balance;
                let _ = writeln!(
                    console,
                    "chain {chain} color balance set: {}, {}, {}",
                    balance.r, balance.g, balance.b
                );
            }
            Command::Gamma { chain, gamma } => {
                let settings = self.store.settings_mut();
                settings.chain_mut(chain).ok_or(CommandError::BadChain)?.gamma = gamma;
                let _ = writeln!(console, "chain {chain} gamma set: {gamma}");
            }
            Command::Scene(scene) => {
                self.select_scene(scene);
                let _ = writeln!(console, "scene set: {scene}");
            }
            Command::Brightness(brightness) => {
                self.store.settings_mut().brightness = brightness;
                let _ = writeln!(console, "brightness set: {brightness}");
            }
            Command::Param(param) => {
                self.store.settings_mut().param = param;
                let _ = writeln!(console, "param set: {param}");
            }
            Command::Autosave(autosave) => {
                self.store.settings_mut().autosave = autosave;
                let _ = writeln!(console, "autosave set: {}", u8::from(autosave));
            }
            Command::Defaults => self.store.restore_defaults(),
            Command::Flash => {
                self.store
                    .save(now, true)
                    .map_err(|_| CommandError::FlashWrite)?;
            }
            Command::Poke { index, color } => {
                if !self.buffer.set(index, color) {
                    return Err(CommandError::IndexOutOfRange);
                }
            }
            Command::Fill(color) => self.buffer.fill(color),
            Command::FillRange { begin, end, color } => {
                if begin > end || !self.buffer.fill_range(begin, end, color) {
                    return Err(CommandError::IndexOutOfRange);
                }
            }
            Command::Gradient(start, end) => fill_gradient(&mut self.buffer, start, end),
            Command::Dump => self.dump(console),
            Command::Halt => self.halted = true,
            Command::Resume => self.halted = false,
            Command::Reboot => {
                let _ = writeln!(console, "ok");
                self.reboot(now, system);
            }
            Command::Prog => {
                let _ = writeln!(console, "ok");
                self.enter_bootloader(now, system);
            }
            Command::Info => self.info(console),
        }
        Ok(())
    }

    fn dump<C: Console + ?Sized>(&self, console: &mut C) {
        let _ = writeln!(console, "Dumping display buffer...");
        for (i, pixel) in self.buffer.iter().enumerate() {
            let _ = writeln!(console, "idx {i} ({} , {} , {} )", pixel.r, pixel.g, pixel.b);
        }
        let _ = writeln!(console, "End of display buffer");
    }

    fn info<C: Console + ?Sized>(&self, console: &mut C) {
        let settings = self.store.settings();
        let _ = write!(console, "device id: ");
        for byte in settings.device_id {
            let _ = write!(console, "{byte:02x}");
        }
        let _ = writeln!(console);

        let scene_name = usize::try_from(settings.scene)
            .ok()
            .and_then(|index| self.scenes.get(index))
            .map_or("?", Scene::as_str);
        let _ = writeln!(console, "scene: {} ({scene_name})", settings.scene);
        let _ = writeln!(console, "brightness: {}", settings.brightness);
        let _ = writeln!(console, "param: {}", settings.param);
        let _ = writeln!(console, "autosave: {}", u8::from(settings.autosave));
        let _ = writeln!(console, "buffer length: {}", self.buffer.len());
        for (id, (chain, channel)) in settings.chains.iter().zip(&self.channels).enumerate() {
            let balance = chain.color_balance;
            let _ = writeln!(
                console,
                "chain {id}: pin {} count {} offset {} color balance {}, {}, {} gamma {}",
                channel.pin(),
                chain.length,
                chain.offset,
                balance.r,
                balance.g,
                balance.b,
                chain.gamma
            );
        }
        let _ = writeln!(console, "halted: {}", u8::from(self.halted));
        let _ = writeln!(console, "unsaved changes: {}", u8::from(self.store.is_dirty()));
    }

    /// Save and restart the firmware
    pub fn reboot<Y: SystemControl + ?Sized>(&mut self, now: Instant, system: &mut Y) -> ! {
        log_save(self.store.save(now, true));
        system.reset()
    }

    /// Save, flash every chain red three times and restart into the bootloader
    pub fn enter_bootloader<Y: SystemControl + ?Sized>(&mut self, now: Instant, system: &mut Y) -> ! {
        log_save(self.store.save(now, true));

        #[cfg(feature = "defmt")]
        defmt::info!("entering bootloader");

        for (color, hold_ms) in ATTENTION_PATTERN {
            for channel in &mut self.channels {
                let length = channel.window().length;
                channel.write_colors(core::iter::repeat_n(color, length), 1.0);
            }
            system.delay_ms(hold_ms);
        }
        system.reset_to_bootloader()
    }

    pub fn settings(&self) -> &Settings {
        self.store.settings()
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        self.store.settings_mut()
    }

    pub fn store(&self) -> &SettingsStore<F> {
        &self.store
    }

    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut PixelBuffer {
        &mut self.buffer
    }

    pub fn channels(&self) -> &[Channel<'a, S>] {
        &self.channels
    }

    pub const fn is_halted(&self) -> bool {
        self.halted
    }
}

/// Input pins of the front panel buttons
pub struct ButtonPins<P> {
    /// Saves settings (GPIO 16)
    pub flash: P,
    /// Steps or ramps the scene parameter (GPIO 17)
    pub param: P,
    /// Next scene on tap, brightness ramp on hold (GPIO 18)
    pub scene_brightness: P,
    /// Next scene (GPIO 19)
    pub scene: P,
    /// Steps or ramps brightness down (GPIO 20)
    pub brightness: P,
}

/// Front panel buttons plus the boot-select button
pub struct Buttons<P, C> {
    pub flash: Button<P, C>,
    pub param: Button<P, C>,
    pub scene_brightness: Button<P, C>,
    pub scene: Button<P, C>,
    pub brightness: Button<P, C>,
    pub boot_select: Button<P, C>,
}

impl<P: InputPin, C: ChipSelectOverride> Buttons<P, C> {
    pub fn new(pins: ButtonPins<P>, chip_select: C, now: Instant) -> Self {
        let hold = Some(HoldConfig::default());
        Self {
            flash: Button::gpio(pins.flash, None, now),
            param: Button::gpio(pins.param, hold, now),
            scene_brightness: Button::gpio(pins.scene_brightness, hold, now),
            scene: Button::gpio(pins.scene, None, now),
            brightness: Button::gpio(pins.brightness, hold, now),
            boot_select: Button::boot_select(chip_select, now),
        }
    }

    /// Sample every button, call once per frame
    pub fn update(&mut self, now: Instant) {
        self.scene.update(now);
        self.param.update(now);
        self.brightness.update(now);
        self.scene_brightness.update(now);
        self.flash.update(now);
        self.boot_select.update(now);
    }
}

/// The cooperative 20 Hz main loop
pub struct ControlLoop<'a, S: Sequencer, F, P, C> {
    app: App<'a, S, F>,
    buttons: Buttons<P, C>,
    line: LineBuffer,
    scheduler: FrameScheduler,
}

impl<'a, S, F, P, C> ControlLoop<'a, S, F, P, C>
where
    S: Sequencer,
    F: NorFlash,
    P: InputPin,
    C: ChipSelectOverride,
{
    /// Create the loop with its first frame due at `start`
    pub fn new(app: App<'a, S, F>, buttons: Buttons<P, C>, start: Instant) -> Self {
        Self {
            app,
            buttons,
            line: LineBuffer::new(),
            scheduler: FrameScheduler::new(start, FRAME_DURATION),
        }
    }

    /// Run one frame
    ///
    /// Handles at most one console line, then buttons, autosave, remapping,
    /// the scene and finally streams the frame. Returns when the next frame
    /// is due.
    pub fn tick<Con, Y>(&mut self, now: Instant, console: &mut Con, system: &mut Y) -> FrameResult
    where
        Con: Console + ?Sized,
        Y: SystemControl + ?Sized,
    {
        if let Some(line) = self.line.poll(console) {
            self.app.handle_line(&line, now, console, system);
        }

        self.buttons.update(now);
        self.apply_buttons(now, console, system);

        self.app.autosave(now);
        self.app.apply_settings();
        self.app.render(FRAME_SECONDS);
        self.app.stream();

        self.scheduler.advance(now)
    }

    fn apply_buttons<Con, Y>(&mut self, now: Instant, console: &mut Con, system: &mut Y)
    where
        Con: Console + ?Sized,
        Y: SystemControl + ?Sized,
    {
        let buttons = &self.buttons;
        let app = &mut self.app;

        if buttons.scene.button_up() {
            let scene = app.next_scene();
            let _ = writeln!(console, "scene set: {scene}");
        }

        if buttons.param.held_activate() {
            let settings = app.settings_mut();
            settings.param = wrap_above(settings.param + HOLD_RAMP_PER_SECOND * FRAME_SECONDS);
        }
        if buttons.param.button_up() {
            let settings = app.settings_mut();
            settings.param = wrap_above(round_to_interval(settings.param + TAP_STEP, TAP_STEP));
            let _ = writeln!(console, "param set: {}", settings.param);
        }

        if buttons.brightness.held_activate() {
            ramp_brightness(app.settings_mut());
        }
        if buttons.brightness.button_up() {
            let settings = app.settings_mut();
            settings.brightness =
                wrap_below(round_to_interval(settings.brightness - TAP_STEP, TAP_STEP));
            let _ = writeln!(console, "brightness set: {}", settings.brightness);
        }

        if buttons.scene_brightness.held_activate() {
            ramp_brightness(app.settings_mut());
        }
        if buttons.scene_brightness.button_up() {
            let scene = app.next_scene();
            let _ = writeln!(console, "scene set: {scene}");
        }

        if buttons.flash.button_up() {
            log_save(app.save(now, true));
        }

        if buttons.boot_select.pressed() {
            app.enter_bootloader(now, system);
        }
    }

    /// Run forever, one [`ControlLoop::tick`] per frame deadline
    pub async fn run<Con, Y>(&mut self, console: &mut Con, system: &mut Y) -> !
    where
        Con: Console + ?Sized,
        Y: SystemControl + ?Sized,
    {
        loop {
            Timer::at(self.scheduler.deadline()).await;
            self.tick(Instant::now(), console, system);
        }
    }

    pub fn app(&self) -> &App<'a, S, F> {
        &self.app
    }

    pub fn app_mut(&mut self) -> &mut App<'a, S, F> {
        &mut self.app
    }

    pub fn buttons(&self) -> &Buttons<P, C> {
        &self.buttons
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }
}

fn log_save(result: Result<bool, StoreError>) {
    if let Err(_err) = result {
        #[cfg(feature = "defmt")]
        defmt::error!("settings: save failed: {}", _err);
    }
}

fn ramp_brightness(settings: &mut Settings) {
    settings.brightness = wrap_below(settings.brightness - HOLD_RAMP_PER_SECOND * FRAME_SECONDS);
}

/// Values stepped past 1 start over at 0
fn wrap_above(value: f32) -> f32 {
    if value > 1.0 { 0.0 } else { value }
}

/// Values stepped below 0 start over at 1
fn wrap_below(value: f32) -> f32 {
    if value < 0.0 { 1.0 } else { value }
}
