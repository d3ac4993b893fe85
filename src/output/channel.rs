use super::{LATCH_WORD, Sequencer, SequencerLease, TxQueue, pack_grb};
use crate::bounds::{ChannelWindow, sample};
use crate::color::{Calibration, ColorBalance, CorrectionLut, Rgb};

/// One physical LED chain output
///
/// Owns its transmit queue and its sequencer lease; dropping the channel
/// stops using the unit and hands it back to the [`super::OutputBlock`].
pub struct Channel<'a, S: Sequencer> {
    queue: S::Queue,
    pin: u8,
    calibration: Calibration,
    window: ChannelWindow,
    lut: CorrectionLut,
    /// Next window pixel to queue during [`super::stream_frame`]
    cursor: usize,
    latched: bool,
    lease: SequencerLease<'a, S>,
}

impl<'a, S: Sequencer> Channel<'a, S> {
    pub(super) fn new(lease: SequencerLease<'a, S>, pin: u8, queue: S::Queue) -> Self {
        Self {
            queue,
            pin,
            calibration: Calibration::IDENTITY,
            window: ChannelWindow::default(),
            lut: CorrectionLut::new(),
            cursor: 0,
            latched: true,
            lease,
        }
    }

    pub const fn pin(&self) -> u8 {
        self.pin
    }

    /// Sequencer unit driving this channel
    pub const fn unit(&self) -> u8 {
        self.lease.unit()
    }

    pub const fn calibration(&self) -> Calibration {
        self.calibration
    }

    /// Set color balance and gamma, effective from the next frame
    ///
    /// Values are taken as is, validation happens in the settings layer.
    pub fn set_calibration(&mut self, color_balance: ColorBalance, gamma: f32) {
        self.calibration = Calibration::new(color_balance, gamma);
    }

    pub const fn window(&self) -> ChannelWindow {
        self.window
    }

    /// Map the channel onto a window of the shared buffer
    pub fn set_window(&mut self, window: ChannelWindow) {
        self.window = window;
    }

    /// Stream `colors` on this channel alone, waiting on the queue as needed
    ///
    /// Applies the same correction as [`super::stream_frame`] and ends with a
    /// latch word.
    pub fn write_colors<I>(&mut self, colors: I, brightness: f32)
    where
        I: IntoIterator<Item = Rgb>,
    {
        self.lut.prepare(&self.calibration, brightness);
        for color in colors {
            self.queue.push_blocking(pack_grb(self.lut.apply(color)));
        }
        self.queue.push_blocking(LATCH_WORD);
    }

    /// Rewind the cursor for a new frame at `brightness`
    pub(super) fn begin_frame(&mut self, brightness: f32) {
        self.lut.prepare(&self.calibration, brightness);
        self.cursor = 0;
        self.latched = false;
    }

    /// Queue as many pixels as the FIFO accepts right now
    ///
    /// Never waits. Returns `true` once the whole window and the latch word
    /// have been queued.
    pub(super) fn pump(&mut self, buffer: &[Rgb]) -> bool {
        while !self.latched && !self.queue.is_full() {
            if self.cursor < self.window.length {
                let pixel = sample(buffer, self.window, self.cursor);
                self.queue.push(pack_grb(self.lut.apply(pixel)));
                self.cursor += 1;
            } else {
                self.queue.push(LATCH_WORD);
                self.latched = true;
            }
        }
        self.latched
    }
}
