use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::audio_models::IoHandle;
use crate::traits::native::NativeAudio;

const VOIP_ON: &str = "voip=on";
const VOIP_OFF: &str = "voip=off";

/// Reference-counted guard over the platform voice-routing switch.
///
/// The switch is turned on at the 0→1 edge and off at the 1→0 edge. The
/// count and the platform call happen under one lock, so concurrent
/// acquire/release from capture and playback filters cannot double-toggle.
pub struct VoiceModeGuard {
    native: Arc<dyn NativeAudio>,
    io_handle: IoHandle,
    count: Mutex<u32>,
}

impl VoiceModeGuard {
    pub fn new(native: Arc<dyn NativeAudio>, io_handle: IoHandle) -> Arc<Self> {
        Arc::new(Self {
            native,
            io_handle,
            count: Mutex::new(0),
        })
    }

    /// Raises voice mode for as long as the returned lease lives.
    pub fn acquire(self: &Arc<Self>) -> VoiceModeLease {
        let mut count = self.count.lock();
        *count += 1;
        if *count == 1 {
            self.toggle(VOIP_ON);
        }
        VoiceModeLease {
            guard: Some(Arc::clone(self)),
        }
    }

    /// Number of live leases.
    pub fn refcount(&self) -> u32 {
        *self.count.lock()
    }

    fn release(&self) {
        let mut count = self.count.lock();
        match *count {
            0 => log::warn!("voice mode released more often than acquired"),
            1 => {
                *count = 0;
                self.toggle(VOIP_OFF);
            }
            _ => *count -= 1,
        }
    }

    fn toggle(&self, params: &str) {
        match self.native.set_parameters(self.io_handle, params) {
            Ok(()) => log::info!("{} is set.", params),
            Err(e) => log::warn!("Could not set {}: {}", params, e),
        }
    }
}

/// One hold on voice mode; released explicitly or on drop.
pub struct VoiceModeLease {
    guard: Option<Arc<VoiceModeGuard>>,
}

impl VoiceModeLease {
    pub fn release(mut self) {
        if let Some(guard) = self.guard.take() {
            guard.release();
        }
    }
}

impl Drop for VoiceModeLease {
    fn drop(&mut self) {
        if let Some(guard) = self.guard.take() {
            guard.release();
        }
    }
}
