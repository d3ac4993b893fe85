//! Line-oriented serial console
//!
//! Characters are echoed as they arrive and collected into a [`LineBuffer`];
//! a newline hands the line to [`Command::parse`].

mod command;

pub use command::{Command, CommandError};
use heapless::String;

use crate::config::MAX_LINE_LENGTH;

/// Byte-oriented serial port
///
/// Output goes through [`core::fmt::Write`], so replies can use `write!`.
pub trait Console: core::fmt::Write {
    /// Next received byte, `None` if nothing is pending
    fn read_byte(&mut self) -> Option<u8>;
}

/// A complete console line
pub type Line = String<MAX_LINE_LENGTH>;

/// Accumulates console input between newlines
#[derive(Debug, Default)]
pub struct LineBuffer {
    line: Line,
}

impl LineBuffer {
    pub const fn new() -> Self {
        Self { line: String::new() }
    }

    /// Drain pending input until a line completes or input runs dry
    ///
    /// Printable ASCII is appended and echoed; characters past
    /// [`MAX_LINE_LENGTH`] are dropped without echo. Other control characters
    /// (such as `\r`) are ignored. Returns at most one line per call, any
    /// further input stays queued in the console.
    pub fn poll<C: Console + ?Sized>(&mut self, console: &mut C) -> Option<Line> {
        while let Some(byte) = console.read_byte() {
            match byte {
                b'\n' => {
                    let _ = console.write_char('\n');
                    return Some(core::mem::take(&mut self.line));
                }
                32..=126 => {
                    let ch = char::from(byte);
                    if self.line.push(ch).is_ok() {
                        let _ = console.write_char(ch);
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// Characters collected so far
    pub fn pending(&self) -> &str {
        &self.line
    }
}
