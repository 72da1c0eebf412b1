//! One-shot frame counter report from a background thread.

use std::io;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::scheduler::FrameCounter;

/// Sleeps for `after`, then logs the frame counter once.
///
/// The thread only reads the counter. The handle yields the value it saw.
pub fn spawn_frame_report(
    counter: FrameCounter,
    after: Duration,
    time_step: f32,
) -> io::Result<JoinHandle<u64>> {
    thread::Builder::new()
        .name("sph-frame-report".into())
        .spawn(move || {
            thread::sleep(after);
            let frames = counter.get();
            log::info!(
                "after {:.1}s wall time: {frames} steps, {:.4}s simulated",
                after.as_secs_f64(),
                frames as f64 * time_step as f64
            );
            frames
        })
}
