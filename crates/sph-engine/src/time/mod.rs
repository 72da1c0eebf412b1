//! Time subsystem.
//!
//! Provides frame timing utilities without coupling to the runtime.
//! Intended usage:
//! - start a `FrameStopwatch` at the top of each frame
//! - `mark_cpu()` once host-side input handling is done
//! - `finish()` after present to obtain `FrameTimings`

mod stopwatch;

pub use stopwatch::{FrameStopwatch, FrameTimings};
