use crate::models::audio_models::{PcmFormat, StreamType};
use crate::models::error::SoundError;
use crate::traits::native::NativeAudio;

/// Capture format settled on at card creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureFormat {
    pub sample_rate: u32,
    pub min_frame_count: usize,
}

/// Outcome of the one-time hardware negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiatedRates {
    pub playback_rate: u32,
    /// `None` when no candidate rate supports capture.
    pub capture: Option<CaptureFormat>,
}

/// Queries the hardware output rate and walks `candidates` for a capture rate.
///
/// Voice mode must already be raised by the caller. The hardware rate is
/// tried first, then every candidate strictly below it, highest first.
pub fn negotiate(native: &dyn NativeAudio, candidates: &[u32]) -> NegotiatedRates {
    let hardware_rate = match native.output_sampling_rate(StreamType::VoiceCall) {
        Ok(rate) => {
            log::info!("Hardware output sampling rate is {}", rate);
            rate
        }
        Err(e) => {
            let fallback = candidates.first().copied().unwrap_or(8000);
            log::warn!("Could not read hardware output sampling rate ({}), assuming {}", e, fallback);
            fallback
        }
    };

    let capture = find_capture_rate(native, hardware_rate, candidates);
    if capture.is_err() {
        log::error!("Cannot find suitable sampling rate for recording !");
    }

    NegotiatedRates {
        playback_rate: hardware_rate,
        capture: capture.ok(),
    }
}

fn find_capture_rate(
    native: &dyn NativeAudio,
    hardware_rate: u32,
    candidates: &[u32],
) -> Result<CaptureFormat, SoundError> {
    let below = candidates.iter().copied().filter(|&rate| rate < hardware_rate);
    for rate in std::iter::once(hardware_rate).chain(below) {
        match native.record_min_frame_count(rate, PcmFormat::Pcm16Bit, 1) {
            Ok(frames) => {
                log::info!("Minimal AudioRecord buf frame size at {} Hz is {}", rate, frames);
                return Ok(CaptureFormat {
                    sample_rate: rate,
                    min_frame_count: frames,
                });
            }
            Err(e) => log::warn!("Recording at {} Hz is not supported: {}", rate, e),
        }
    }
    Err(SoundError::NoCaptureRate)
}
