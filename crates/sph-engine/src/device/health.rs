use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared "device is unusable" flag.
///
/// Set from wgpu callbacks (device lost, uncaptured errors) which may run on
/// any thread; read by the frame loop before and after submitting work.
#[derive(Debug, Clone, Default)]
pub(crate) struct DeviceHealth {
    lost: Arc<AtomicBool>,
}

impl DeviceHealth {
    /// Routes device loss and every error not captured by an error scope into
    /// this flag. Without the error handler wgpu panics on such errors.
    pub(crate) fn install(&self, device: &wgpu::Device) {
        let health = self.clone();
        device.set_device_lost_callback(move |reason, message| {
            health.mark_lost(&format!("device lost ({reason:?}): {message}"));
        });

        let health = self.clone();
        device.on_uncaptured_error(Arc::new(move |error: wgpu::Error| {
            health.record_error(&error);
        }));
    }

    pub(crate) fn record_error(&self, error: &wgpu::Error) {
        self.mark_lost(&format!("uncaptured GPU error: {error}"));
    }

    pub(crate) fn mark_lost(&self, message: &str) {
        log::error!("{message}");
        self.lost.store(true, Ordering::SeqCst);
    }

    /// Once set this never clears.
    pub(crate) fn is_lost(&self) -> bool {
        self.lost.load(Ordering::SeqCst)
    }
}
