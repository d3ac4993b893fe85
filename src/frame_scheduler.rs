//! Frame scheduling and timing utilities.
//!
//! Provides fixed-rate frame pacing on absolute deadlines. The scheduler
//! only does the bookkeeping; the caller waits until the returned deadline.

use embassy_time::{Duration, Instant};

use crate::config::FRAME_DURATION;

/// Frames the loop may fall behind before the backlog is dropped.
const MAX_DRIFT_FRAMES: u32 = 2;

/// Result of a frame tick operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameResult {
    /// The deadline for the next frame.
    pub next_deadline: Instant,
    /// How long to wait until the next frame (may be zero if behind schedule).
    pub sleep_duration: Duration,
}

/// Absolute-deadline frame pacer.
///
/// Deadlines advance by exactly one frame period per tick, so a late frame
/// shortens the next wait instead of shifting the whole schedule. After a
/// stall of more than two frames the schedule restarts from the current time
/// rather than running the missed frames back to back.
///
/// # Usage
///
/// ```ignore
/// let mut scheduler = FrameScheduler::new(Instant::now(), FRAME_DURATION);
///
/// loop {
///     Timer::at(scheduler.deadline()).await;
///     render_frame();
///     scheduler.advance(Instant::now());
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FrameScheduler {
    next_frame: Instant,
    frame_duration: Duration,
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new(Instant::from_ticks(0), FRAME_DURATION)
    }
}

impl FrameScheduler {
    /// Create a scheduler whose first frame is due at `start`.
    pub const fn new(start: Instant, frame_duration: Duration) -> Self {
        Self {
            next_frame: start,
            frame_duration,
        }
    }

    /// Deadline of the frame about to run.
    pub const fn deadline(&self) -> Instant {
        self.next_frame
    }

    pub const fn frame_duration(&self) -> Duration {
        self.frame_duration
    }

    /// Finish the current frame and schedule the next one.
    pub fn advance(&mut self, now: Instant) -> FrameResult {
        let max_drift = self.frame_duration * MAX_DRIFT_FRAMES;
        if now > self.next_frame + max_drift {
            #[cfg(feature = "defmt")]
            defmt::debug!("frame: fell behind, resynchronising");
            self.next_frame = now;
        }

        self.next_frame += self.frame_duration;

        FrameResult {
            next_deadline: self.next_frame,
            sleep_duration: self.next_frame.saturating_duration_since(now),
        }
    }
}
