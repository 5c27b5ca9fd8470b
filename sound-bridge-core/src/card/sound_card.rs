use std::sync::Arc;

use crate::card::negotiation::{self, CaptureFormat};
use crate::card::voice_mode::VoiceModeGuard;
use crate::filters::capture::CaptureFilter;
use crate::filters::playback::PlaybackFilter;
use crate::models::audio_models::IoHandle;
use crate::models::config::SoundCardConfig;
use crate::traits::native::NativeAudio;

/// Process-lifetime card record shared by every filter created from the card.
pub struct CardData {
    pub voice_mode: Arc<VoiceModeGuard>,
    pub io_handle: IoHandle,
    pub playback_rate: u32,
    pub capture: Option<CaptureFormat>,
}

/// A registered sound card. Cloning shares the same card data.
#[derive(Clone)]
pub struct SoundCard {
    name: String,
    driver: &'static str,
    native: Arc<dyn NativeAudio>,
    data: Arc<CardData>,
    config: Arc<SoundCardConfig>,
}

impl SoundCard {
    pub const DEFAULT_NAME: &'static str = "android sound card";

    /// Creates the card and runs the one-time rate negotiation.
    ///
    /// Voice mode is raised for the duration of the negotiation only.
    pub fn new(driver: &'static str, native: Arc<dyn NativeAudio>, config: SoundCardConfig) -> Self {
        let io_handle = IoHandle::default();
        let voice_mode = VoiceModeGuard::new(Arc::clone(&native), io_handle);

        let lease = voice_mode.acquire();
        let rates = negotiation::negotiate(&*native, &config.candidate_rates);
        lease.release();

        Self {
            name: Self::DEFAULT_NAME.to_string(),
            driver,
            native,
            data: Arc::new(CardData {
                voice_mode,
                io_handle,
                playback_rate: rates.playback_rate,
                capture: rates.capture,
            }),
            config: Arc::new(config),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the card descriptor that produced this card.
    pub fn driver(&self) -> &'static str {
        self.driver
    }

    pub fn data(&self) -> &CardData {
        &self.data
    }

    pub fn config(&self) -> &SoundCardConfig {
        &self.config
    }

    pub fn native(&self) -> &Arc<dyn NativeAudio> {
        &self.native
    }

    pub fn voice_mode(&self) -> &Arc<VoiceModeGuard> {
        &self.data.voice_mode
    }

    /// Whether negotiation found a usable capture rate.
    pub fn can_capture(&self) -> bool {
        self.data.capture.is_some()
    }

    pub fn create_reader(&self) -> CaptureFilter {
        CaptureFilter::new(self.clone())
    }

    pub fn create_writer(&self) -> PlaybackFilter {
        PlaybackFilter::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeAudio, FakeScript};

    #[test]
    fn negotiation_brackets_voice_mode() {
        let fake = FakeAudio::new(FakeScript::default());
        let card = SoundCard::new("libmedia", fake.clone(), SoundCardConfig::default());

        assert_eq!(fake.parameters(), vec!["voip=on", "voip=off"]);
        assert_eq!(card.voice_mode().refcount(), 0);
        assert_eq!(card.name(), "android sound card");
        assert_eq!(card.driver(), "libmedia");
    }

    #[test]
    fn adopts_negotiated_rates() {
        let fake = FakeAudio::new(FakeScript {
            hardware_rate: Some(44100),
            record_rates: vec![44100],
            record_min_frames: 640,
            ..FakeScript::default()
        });
        let card = SoundCard::new("libmedia", fake, SoundCardConfig::default());

        assert_eq!(card.data().playback_rate, 44100);
        assert_eq!(
            card.data().capture,
            Some(CaptureFormat {
                sample_rate: 44100,
                min_frame_count: 640
            })
        );
        assert!(card.can_capture());
    }

    #[test]
    fn clones_share_card_data() {
        let fake = FakeAudio::new(FakeScript::default());
        let card = SoundCard::new("libmedia", fake, SoundCardConfig::default());
        let other = card.clone();

        let _lease = card.voice_mode().acquire();
        assert_eq!(other.voice_mode().refcount(), 1);
    }
}
