use super::{Channel, Sequencer};
use crate::color::Rgb;

/// Stream one frame of `buffer` to all `channels`
///
/// Channels are served round-robin and only while their FIFO has room, so a
/// slow or long chain never holds back the others: every chain starts
/// shifting in the same frame window. Each channel gets exactly its window
/// length of corrected pixels followed by one latch word.
///
/// Returns once everything is queued; the hardware keeps transmitting on its
/// own. A FIFO that never drains keeps this function spinning, bounding frame
/// time is up to the caller.
pub fn stream_frame<S: Sequencer>(buffer: &[Rgb], channels: &mut [Channel<'_, S>], brightness: f32) {
    for channel in channels.iter_mut() {
        channel.begin_frame(brightness);
    }

    loop {
        let mut pending = false;
        for channel in channels.iter_mut() {
            if !channel.pump(buffer) {
                pending = true;
            }
        }
        if !pending {
            break;
        }
    }
}
