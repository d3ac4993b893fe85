use core::ops::{Deref, DerefMut};

use heapless::Vec;

use crate::color::{BLACK, Rgb};

/// Hard ceiling of the shared pixel buffer
pub const MAX_BUFFER_LENGTH: usize = MAX_CHAIN_END as usize;

/// Largest `offset + length` a chain may reach, in settings units
pub const MAX_CHAIN_END: u32 = 10_000;

/// Window of the shared buffer that one channel outputs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelWindow {
    pub offset: usize,
    pub length: usize,
}

impl ChannelWindow {
    pub const fn new(offset: usize, length: usize) -> Self {
        Self { offset, length }
    }

    /// One past the last buffer index covered by the window
    pub const fn end(self) -> usize {
        self.offset.saturating_add(self.length)
    }

    /// Buffer index of the `cursor`-th pixel of the window
    ///
    /// Clamped to the last valid index, so a window reaching past the buffer
    /// repeats the last pixel. Returns `None` for an empty buffer.
    pub fn sample_index(self, cursor: usize, buffer_len: usize) -> Option<usize> {
        let last = buffer_len.checked_sub(1)?;
        Some(cursor.saturating_add(self.offset).min(last))
    }
}

/// Buffer length needed to cover all `windows`, clamped to [`MAX_BUFFER_LENGTH`]
pub fn required_length(windows: impl IntoIterator<Item = ChannelWindow>) -> usize {
    windows
        .into_iter()
        .map(ChannelWindow::end)
        .max()
        .unwrap_or(0)
        .min(MAX_BUFFER_LENGTH)
}

/// Sample `buffer` for the `cursor`-th pixel of `window`
#[inline]
pub fn sample(buffer: &[Rgb], window: ChannelWindow, cursor: usize) -> Rgb {
    window
        .sample_index(cursor, buffer.len())
        .map_or(BLACK, |index| buffer[index])
}

/// Shared draw buffer all channels are mapped onto
#[derive(Debug, Clone, Default)]
pub struct PixelBuffer {
    pixels: Vec<Rgb, MAX_BUFFER_LENGTH>,
}

impl PixelBuffer {
    pub const fn new() -> Self {
        Self { pixels: Vec::new() }
    }

    /// Resize to `len` pixels, clamped to [`MAX_BUFFER_LENGTH`]
    ///
    /// Existing pixels are kept, new ones start black.
    pub fn resize(&mut self, len: usize) {
        let len = len.min(MAX_BUFFER_LENGTH);
        // Cannot fail, `len` is within capacity
        let _ = self.pixels.resize(len, BLACK);
    }

    /// Set a single pixel, returns `false` if `index` is out of range
    pub fn set(&mut self, index: usize, color: Rgb) -> bool {
        match self.pixels.get_mut(index) {
            Some(pixel) => {
                *pixel = color;
                true
            }
            None => false,
        }
    }

    pub fn fill(&mut self, color: Rgb) {
        self.pixels.fill(color);
    }

    /// Fill the half-open range `begin..end`
    ///
    /// Returns `false` without touching the buffer if the range is invalid.
    pub fn fill_range(&mut self, begin: usize, end: usize, color: Rgb) -> bool {
        match self.pixels.get_mut(begin..end) {
            Some(range) => {
                range.fill(color);
                true
            }
            None => false,
        }
    }
}

impl Deref for PixelBuffer {
    type Target = [Rgb];

    fn deref(&self) -> &Self::Target {
        &self.pixels
    }
}

impl DerefMut for PixelBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.pixels
    }
}
