//! Output engine
//!
//! Owns the hardware sequencer units that shift pixel data out to the LED
//! chains and streams frames to them. Each [`Channel`] exclusively owns one
//! transmit queue; all channels of one [`OutputBlock`] share a single loaded
//! transmit program.

mod block;
mod channel;
mod stream;

pub use block::{OutputBlock, SequencerLease};
pub use channel::Channel;
pub use stream::stream_frame;

use crate::color::Rgb;

/// Word that terminates a frame, the sequencer holds the line low to latch
pub const LATCH_WORD: u32 = 0xFF << 24;

/// Pack a corrected pixel into the wire word ordering (`G`, `R`, `B`)
#[inline]
#[allow(clippy::cast_lossless)]
pub const fn pack_grb(pixel: Rgb) -> u32 {
    (pixel.g as u32) << 16 | (pixel.r as u32) << 8 | pixel.b as u32
}

/// Errors raised while acquiring output hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputError {
    /// No free sequencer unit is left
    ResourceExhausted,
    /// The transmit program does not fit in sequencer program memory
    ProgramMemoryExhausted,
}

impl core::fmt::Display for OutputError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ResourceExhausted => f.write_str("no sequencer unit available"),
            Self::ProgramMemoryExhausted => f.write_str("transmit program does not fit"),
        }
    }
}

/// Hardware transmit FIFO feeding one sequencer unit
pub trait TxQueue {
    /// Whether the FIFO currently has no room for another word
    fn is_full(&self) -> bool;

    /// Push a word without waiting
    ///
    /// Callers check [`TxQueue::is_full`] first.
    fn push(&mut self, word: u32);

    /// Push a word, spinning until the FIFO has room
    fn push_blocking(&mut self, word: u32) {
        while self.is_full() {
            core::hint::spin_loop();
        }
        self.push(word);
    }
}

/// Block of programmable sequencer units sharing one program memory
///
/// Implement this trait to support different hardware platforms.
pub trait Sequencer {
    type Queue: TxQueue;

    /// Claim an unused sequencer unit
    fn claim_unit(&mut self) -> Option<u8>;

    /// Return a unit claimed with [`Sequencer::claim_unit`]
    fn release_unit(&mut self, unit: u8);

    /// Load program code, returning its origin in program memory
    fn load_program(&mut self, code: &[u16]) -> Option<u8>;

    /// Remove program code loaded at `origin`
    fn unload_program(&mut self, code: &[u16], origin: u8);

    /// Start `unit` running the program at `origin` on `pin`
    ///
    /// Returns the transmit queue feeding the unit.
    fn bind(&mut self, unit: u8, origin: u8, pin: u8, clock_divisor: f32) -> Self::Queue;
}
