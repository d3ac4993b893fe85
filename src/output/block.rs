use core::cell::RefCell;

use critical_section::Mutex;

use super::{Channel, OutputError, Sequencer};
use crate::config::BIT_CLOCK_DIVISOR;

struct BlockState<S> {
    sequencer: S,
    /// Origin of the transmit program while at least one lease holds it
    origin: Option<u8>,
    leases: usize,
}

/// A sequencer block and the transmit program shared by its channels
///
/// The program is loaded by the first [`OutputBlock::open_channel`] call and
/// unloaded when the last channel is dropped. Interior state is guarded by a
/// critical section so channels can hand their units back from `Drop`.
pub struct OutputBlock<S: Sequencer> {
    program: &'static [u16],
    state: Mutex<RefCell<BlockState<S>>>,
}

impl<S: Sequencer> OutputBlock<S> {
    /// Create a block driving `sequencer` with the given transmit program
    pub const fn new(sequencer: S, program: &'static [u16]) -> Self {
        Self {
            program,
            state: Mutex::new(RefCell::new(BlockState {
                sequencer,
                origin: None,
                leases: 0,
            })),
        }
    }

    /// Claim a sequencer unit and bind it to `pin`
    pub fn open_channel(&self, pin: u8) -> Result<Channel<'_, S>, OutputError> {
        let (unit, queue) = critical_section::with(|cs| {
            let mut state = self.state.borrow(cs).borrow_mut();
            let unit = state
                .sequencer
                .claim_unit()
                .ok_or(OutputError::ResourceExhausted)?;

            let origin = match state.origin {
                Some(origin) => origin,
                None => {
                    let Some(origin) = state.sequencer.load_program(self.program) else {
                        state.sequencer.release_unit(unit);
                        return Err(OutputError::ProgramMemoryExhausted);
                    };
                    state.origin = Some(origin);
                    origin
                }
            };
            state.leases += 1;

            let queue = state
                .sequencer
                .bind(unit, origin, pin, BIT_CLOCK_DIVISOR);
            Ok((unit, queue))
        })?;

        #[cfg(feature = "defmt")]
        defmt::debug!("output: unit {} bound to pin {}", unit, pin);

        Ok(Channel::new(SequencerLease { block: self, unit }, pin, queue))
    }

    /// Number of channels currently holding the transmit program
    pub fn active_channels(&self) -> usize {
        critical_section::with(|cs| self.state.borrow(cs).borrow().leases)
    }

    /// Whether the transmit program is resident in program memory
    pub fn is_program_loaded(&self) -> bool {
        critical_section::with(|cs| self.state.borrow(cs).borrow().origin.is_some())
    }

    fn release(&self, unit: u8) {
        critical_section::with(|cs| {
            let mut state = self.state.borrow(cs).borrow_mut();
            state.sequencer.release_unit(unit);
            state.leases = state.leases.saturating_sub(1);
            if state.leases == 0 {
                if let Some(origin) = state.origin.take() {
                    state.sequencer.unload_program(self.program, origin);
                }
            }
        });
    }
}

/// Claim on one sequencer unit and a reference on the shared program
///
/// Both are released when the lease is dropped.
pub struct SequencerLease<'a, S: Sequencer> {
    block: &'a OutputBlock<S>,
    unit: u8,
}

impl<S: Sequencer> SequencerLease<'_, S> {
    pub const fn unit(&self) -> u8 {
        self.unit
    }
}

impl<S: Sequencer> Drop for SequencerLease<'_, S> {
    fn drop(&mut self) {
        self.block.release(self.unit);
    }
}
