//! Host stand-ins for the hardware seams
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, InputPin};
use embedded_storage::nor_flash::{
    self, NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash,
};
use picoled_core::config::{FLASH_SECTOR_SIZE, FLASH_SIZE};
use picoled_core::settings::DeviceId;
use picoled_core::{
    ChipSelectOverride, Console, FlashLayout, SCENE_COUNT, Sequencer, SettingsStore,
    SystemControl, TxQueue,
};

pub const DEVICE_ID: DeviceId = [0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88];
pub const OTHER_DEVICE_ID: DeviceId = [0xA0, 0xA1, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7];

pub static PROGRAM: [u16; 4] = [0x6221, 0x1123, 0x1400, 0xA442];

pub const LATCH: u32 = 0xFF00_0000;

// ---------------------------------------------------------------------------
// Sequencer

/// Transmit FIFO that drains one word every `drain_every` fullness polls
#[derive(Debug)]
pub struct QueueState {
    pub unit: u8,
    pub pin: u8,
    pub origin: u8,
    pub clock_divisor: f32,
    /// Every word ever pushed, in order
    pub pushed: Vec<u32>,
    depth: usize,
    drain_every: usize,
    occupancy: usize,
    polls: usize,
    log: Rc<RefCell<Vec<(u8, u32)>>>,
}

#[derive(Debug, Clone)]
pub struct MockQueue(Rc<RefCell<QueueState>>);

impl MockQueue {
    pub fn pushed(&self) -> Vec<u32> {
        self.0.borrow().pushed.clone()
    }

    pub fn pin(&self) -> u8 {
        self.0.borrow().pin
    }

    pub fn clock_divisor(&self) -> f32 {
        self.0.borrow().clock_divisor
    }

    pub fn clear(&self) {
        self.0.borrow_mut().pushed.clear();
    }
}

impl TxQueue for MockQueue {
    fn is_full(&self) -> bool {
        let mut state = self.0.borrow_mut();
        state.polls += 1;
        if state.polls % state.drain_every == 0 && state.occupancy > 0 {
            state.occupancy -= 1;
        }
        state.occupancy >= state.depth
    }

    fn push(&mut self, word: u32) {
        let mut state = self.0.borrow_mut();
        assert!(state.occupancy < state.depth, "push into a full FIFO");
        state.occupancy += 1;
        state.pushed.push(word);
        let unit = state.unit;
        state.log.borrow_mut().push((unit, word));
    }
}

#[derive(Debug)]
pub struct SequencerState {
    pub free_units: Vec<u8>,
    pub program_space: usize,
    pub loaded: Option<u8>,
    pub loads: usize,
    pub unloads: usize,
    pub queues: Vec<MockQueue>,
    /// `(unit, word)` in global push order
    pub log: Rc<RefCell<Vec<(u8, u32)>>>,
    /// Per pin `(depth, drain_every)`
    pub pin_config: Vec<(u8, usize, usize)>,
}

#[derive(Debug, Clone)]
pub struct MockSequencer(pub Rc<RefCell<SequencerState>>);

impl MockSequencer {
    pub fn new(units: u8, program_space: usize) -> Self {
        Self(Rc::new(RefCell::new(SequencerState {
            free_units: (0..units).rev().collect(),
            program_space,
            loaded: None,
            loads: 0,
            unloads: 0,
            queues: Vec::new(),
            log: Rc::new(RefCell::new(Vec::new())),
            pin_config: Vec::new(),
        })))
    }

    /// Queue depth and drain rate for channels later bound to `pin`
    pub fn configure_pin(&self, pin: u8, depth: usize, drain_every: usize) {
        self.0.borrow_mut().pin_config.push((pin, depth, drain_every));
    }

    pub fn queue_for_pin(&self, pin: u8) -> MockQueue {
        self.0
            .borrow()
            .queues
            .iter()
            .rev()
            .find(|queue| queue.pin() == pin)
            .cloned()
            .expect("no queue bound to pin")
    }

    pub fn free_units(&self) -> usize {
        self.0.borrow().free_units.len()
    }

    pub fn loads(&self) -> usize {
        self.0.borrow().loads
    }

    pub fn unloads(&self) -> usize {
        self.0.borrow().unloads
    }

    pub fn log(&self) -> Vec<(u8, u32)> {
        self.0.borrow().log.borrow().clone()
    }

    pub fn clear(&self) {
        let state = self.0.borrow();
        state.log.borrow_mut().clear();
        for queue in &state.queues {
            queue.clear();
        }
    }
}

impl Sequencer for MockSequencer {
    type Queue = MockQueue;

    fn claim_unit(&mut self) -> Option<u8> {
        self.0.borrow_mut().free_units.pop()
    }

    fn release_unit(&mut self, unit: u8) {
        self.0.borrow_mut().free_units.push(unit);
    }

    fn load_program(&mut self, code: &[u16]) -> Option<u8> {
        let mut state = self.0.borrow_mut();
        if code.len() > state.program_space {
            return None;
        }
        state.loads += 1;
        let origin = u8::try_from(state.program_space - code.len()).unwrap();
        state.loaded = Some(origin);
        Some(origin)
    }

    fn unload_program(&mut self, _code: &[u16], origin: u8) {
        let mut state = self.0.borrow_mut();
        assert_eq!(state.loaded, Some(origin));
        state.loaded = None;
        state.unloads += 1;
    }

    fn bind(&mut self, unit: u8, origin: u8, pin: u8, clock_divisor: f32) -> MockQueue {
        let mut state = self.0.borrow_mut();
        let (depth, drain_every) = state
            .pin_config
            .iter()
            .find(|(configured, _, _)| *configured == pin)
            .map_or((8, 1), |&(_, depth, drain_every)| (depth, drain_every));
        let queue = MockQueue(Rc::new(RefCell::new(QueueState {
            unit,
            pin,
            origin,
            clock_divisor,
            pushed: Vec::new(),
            depth,
            drain_every,
            occupancy: 0,
            polls: 0,
            log: state.log.clone(),
        })));
        state.queues.push(queue.clone());
        queue
    }
}

/// Split a pushed word stream into `(pixels, latch count)`
pub fn decode_words(words: &[u32]) -> (Vec<(u8, u8, u8)>, usize) {
    let latches = words.iter().filter(|&&word| word == LATCH).count();
    let pixels = words
        .iter()
        .filter(|&&word| word != LATCH)
        .map(|&word| {
            let g = (word >> 16) as u8;
            let r = (word >> 8) as u8;
            let b = word as u8;
            (r, g, b)
        })
        .collect();
    (pixels, latches)
}

// ---------------------------------------------------------------------------
// Flash

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFlashError {
    PowerLoss,
    NotAligned,
    OutOfBounds,
}

impl NorFlashError for MockFlashError {
    fn kind(&self) -> NorFlashErrorKind {
        match self {
            Self::PowerLoss => NorFlashErrorKind::Other,
            Self::NotAligned => NorFlashErrorKind::NotAligned,
            Self::OutOfBounds => NorFlashErrorKind::OutOfBounds,
        }
    }
}

/// Bytes that reach the cells when power fails during programming
const PARTIAL_WRITE: usize = 32;

#[derive(Debug)]
pub struct FlashState {
    pub data: Vec<u8>,
    pub erases: usize,
    pub writes: usize,
    /// Erase/program operations left before power is cut
    ops_left: Option<usize>,
    powered: bool,
}

/// NOR flash with erase-to-`0xFF` and program-by-AND semantics
///
/// Clones share the same memory, so a test can keep a handle while the store
/// owns another.
#[derive(Debug, Clone)]
pub struct MockFlash(pub Rc<RefCell<FlashState>>);

impl Default for MockFlash {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFlash {
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(FlashState {
            data: vec![0xFF; FLASH_SIZE as usize],
            erases: 0,
            writes: 0,
            ops_left: None,
            powered: true,
        })))
    }

    /// Let `ops` more erase/program operations complete, then lose power
    /// during the next one
    pub fn cut_power_after(&self, ops: usize) {
        self.0.borrow_mut().ops_left = Some(ops);
    }

    pub fn restore_power(&self) {
        let mut state = self.0.borrow_mut();
        state.ops_left = None;
        state.powered = true;
    }

    pub fn erases(&self) -> usize {
        self.0.borrow().erases
    }

    pub fn writes(&self) -> usize {
        self.0.borrow().writes
    }

    pub fn bytes(&self, offset: u32, len: usize) -> Vec<u8> {
        let offset = offset as usize;
        self.0.borrow().data[offset..offset + len].to_vec()
    }

    /// Overwrite raw bytes, bypassing erase semantics
    pub fn poke(&self, offset: u32, bytes: &[u8]) {
        let offset = offset as usize;
        self.0.borrow_mut().data[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    /// Flip one bit to simulate corruption
    pub fn corrupt(&self, offset: u32) {
        self.0.borrow_mut().data[offset as usize] ^= 0x01;
    }

    /// Consume one operation of the power budget, `false` if power is lost
    fn spend_op(state: &mut FlashState) -> bool {
        if !state.powered {
            return false;
        }
        match state.ops_left {
            Some(0) => {
                state.powered = false;
                false
            }
            Some(ref mut left) => {
                *left -= 1;
                true
            }
            None => true,
        }
    }
}

impl nor_flash::ErrorType for MockFlash {
    type Error = MockFlashError;
}

impl ReadNorFlash for MockFlash {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let offset = offset as usize;
        let state = self.0.borrow();
        let data = state
            .data
            .get(offset..offset + bytes.len())
            .ok_or(MockFlashError::OutOfBounds)?;
        bytes.copy_from_slice(data);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.0.borrow().data.len()
    }
}

impl NorFlash for MockFlash {
    const WRITE_SIZE: usize = 256;
    const ERASE_SIZE: usize = FLASH_SECTOR_SIZE as usize;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        let (from, to) = (from as usize, to as usize);
        if from % Self::ERASE_SIZE != 0 || to % Self::ERASE_SIZE != 0 || from > to {
            return Err(MockFlashError::NotAligned);
        }
        let mut state = self.0.borrow_mut();
        if to > state.data.len() {
            return Err(MockFlashError::OutOfBounds);
        }
        if !Self::spend_op(&mut state) {
            return Err(MockFlashError::PowerLoss);
        }
        state.data[from..to].fill(0xFF);
        state.erases += 1;
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        let offset = offset as usize;
        if offset % Self::WRITE_SIZE != 0 || bytes.len() % Self::WRITE_SIZE != 0 {
            return Err(MockFlashError::NotAligned);
        }
        let mut state = self.0.borrow_mut();
        if offset + bytes.len() > state.data.len() {
            return Err(MockFlashError::OutOfBounds);
        }
        let powered = Self::spend_op(&mut state);
        // Power loss lands after the first few bytes are programmed
        let len = if powered { bytes.len() } else { PARTIAL_WRITE.min(bytes.len()) };
        for (cell, byte) in state.data[offset..offset + len].iter_mut().zip(bytes) {
            *cell &= byte;
        }
        if !powered {
            return Err(MockFlashError::PowerLoss);
        }
        state.writes += 1;
        Ok(())
    }
}

pub fn layout() -> FlashLayout {
    FlashLayout::top_of(FLASH_SIZE, FLASH_SECTOR_SIZE)
}

pub fn open_store(flash: MockFlash) -> SettingsStore<MockFlash> {
    SettingsStore::open(flash, layout(), DEVICE_ID, SCENE_COUNT)
}

// ---------------------------------------------------------------------------
// Console

#[derive(Debug, Default)]
pub struct MockConsole {
    input: VecDeque<u8>,
    pub output: String,
}

impl MockConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn type_str(&mut self, text: &str) {
        self.input.extend(text.bytes());
    }

    pub fn type_line(&mut self, line: &str) {
        self.type_str(line);
        self.input.push_back(b'\n');
    }

    pub fn pending_input(&self) -> usize {
        self.input.len()
    }

    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }
}

impl std::fmt::Write for MockConsole {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        self.output.push_str(s);
        Ok(())
    }
}

impl Console for MockConsole {
    fn read_byte(&mut self) -> Option<u8> {
        self.input.pop_front()
    }
}

// ---------------------------------------------------------------------------
// Buttons

/// GPIO input level, starts high (released with a pull-up)
#[derive(Debug, Clone)]
pub struct MockPin(Rc<Cell<bool>>);

impl Default for MockPin {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPin {
    pub fn new() -> Self {
        Self(Rc::new(Cell::new(true)))
    }

    pub fn press(&self) {
        self.0.set(false);
    }

    pub fn release(&self) {
        self.0.set(true);
    }
}

impl digital::ErrorType for MockPin {
    type Error = Infallible;
}

impl InputPin for MockPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.0.get())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.0.get())
    }
}

/// Flash chip-select line that records every access
#[derive(Debug, Clone, Default)]
pub struct MockChipSelect {
    pub calls: Rc<RefCell<Vec<&'static str>>>,
    pressed: Rc<Cell<bool>>,
    floated: Rc<Cell<bool>>,
}

impl MockChipSelect {
    pub fn press(&self) {
        self.pressed.set(true);
    }

    pub fn release(&self) {
        self.pressed.set(false);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.borrow().clone()
    }
}

impl ChipSelectOverride for MockChipSelect {
    fn float_high_impedance(&mut self) {
        self.floated.set(true);
        self.calls.borrow_mut().push("float");
    }

    fn restore(&mut self) {
        self.floated.set(false);
        self.calls.borrow_mut().push("restore");
    }

    fn is_low(&mut self) -> bool {
        self.calls.borrow_mut().push("sample");
        // The flash drives the line high unless it is floated
        self.floated.get() && self.pressed.get()
    }

    fn settle(&mut self) {
        self.calls.borrow_mut().push("settle");
    }
}

// ---------------------------------------------------------------------------
// System

/// Records delays; resets unwind with `"reset"` or `"bootloader"`
#[derive(Debug, Default)]
pub struct MockSystem {
    pub delays_ms: Vec<u32>,
}

impl DelayNs for MockSystem {
    fn delay_ns(&mut self, _ns: u32) {}

    fn delay_ms(&mut self, ms: u32) {
        self.delays_ms.push(ms);
    }
}

impl SystemControl for MockSystem {
    fn reset(&mut self) -> ! {
        panic!("reset");
    }

    fn reset_to_bootloader(&mut self) -> ! {
        panic!("bootloader");
    }
}

/// Run `f`, expecting it to end in a reset; returns the reset kind
pub fn expect_reset(f: impl FnOnce()) -> String {
    let payload = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f))
        .expect_err("expected a reset");
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_default()
}
