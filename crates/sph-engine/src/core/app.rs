use anyhow::Result;

use crate::device::Gpu;
use crate::input::InputEvent;

use super::ctx::FrameCtx;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract implemented by higher layers.
pub trait App {
    /// Called once after the window and GPU context exist, before the first frame.
    ///
    /// An error aborts the runtime before any frame is driven.
    fn on_init(&mut self, gpu: &Gpu<'_>) -> Result<()> {
        let _ = gpu;
        Ok(())
    }

    /// Called for every translated input event, in arrival order.
    ///
    /// The default closes on a close request. Apps that need to finish
    /// in-flight work first should override this and exit from `on_frame`.
    fn on_input(&mut self, event: &InputEvent) -> AppControl {
        match event {
            InputEvent::CloseRequested => AppControl::Exit,
            _ => AppControl::Continue,
        }
    }

    /// Called once per frame.
    ///
    /// An error is fatal: the runtime stops and returns it from `Runtime::run`.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> Result<AppControl>;
}
