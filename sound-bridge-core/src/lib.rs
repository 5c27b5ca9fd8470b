//! # sound-bridge-core
//!
//! Platform-agnostic core of the native sound card plugin.
//!
//! Provides card negotiation, the voice-mode guard, the clock synchronizer,
//! and the capture/playback filters driven by the host graph. Platform
//! backends (Android `libmedia`) implement the `NativeAudio` trait and plug
//! into `SoundCard`.
//!
//! ## Architecture
//!
//! ```text
//! sound-bridge-core (this crate)
//! ├── traits/       ← NativeAudio, NativeRecord, NativeTrack, SoundFilter, Ticker, TimeSource
//! ├── models/       ← SoundError, SoundCardConfig, FilterState, AudioSource, channel masks
//! ├── processing/   ← MessageQueue, Bufferizer, ClockSynchronizer
//! ├── card/         ← SoundCard, CardData, VoiceModeGuard, negotiation, SoundCardManager
//! └── filters/      ← CaptureFilter, PlaybackFilter
//! ```

pub mod card;
pub mod filters;
pub mod models;
pub mod processing;
pub mod traits;

#[cfg(test)]
mod testing;

// Re-export key types at crate root for convenience.
pub use card::manager::{SoundCardDescriptor, SoundCardManager};
pub use card::negotiation::{CaptureFormat, NegotiatedRates};
pub use card::sound_card::{CardData, SoundCard};
pub use card::voice_mode::{VoiceModeGuard, VoiceModeLease};
pub use filters::capture::{CaptureFilter, CAPTURE_DESCRIPTOR};
pub use filters::playback::{PlaybackFilter, PLAYBACK_DESCRIPTOR};
pub use models::audio_models::{AudioSource, IoHandle, PcmFormat, StreamType};
pub use models::config::{RatePolicy, SoundCardConfig, STANDARD_SAMPLE_RATES};
pub use models::error::SoundError;
pub use models::state::FilterState;
pub use processing::bufferizer::Bufferizer;
pub use processing::clock_sync::{ClockSynchronizer, MonotonicClock, SynchronizedClock};
pub use processing::message_queue::MessageQueue;
pub use traits::host::{FilterCategory, FilterDescriptor, FilterMethod, MethodReply, SoundFilter, Ticker, TimeSource};
pub use traits::native::{
    NativeAudio, NativeRecord, NativeTrack, RecordCallback, RecordEvent, RecordParams, TrackCallback, TrackEvent,
    TrackParams,
};
