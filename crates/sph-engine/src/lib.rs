//! SPH engine crate.
//!
//! This crate owns the platform + GPU runtime pieces used by the simulation:
//! device/surface context, the window event loop, input translation, frame
//! timing and logging setup.

pub mod device;
pub mod window;
pub mod input;
pub mod time;
pub mod core;

pub mod logging;
pub mod render;

pub use wgpu;
