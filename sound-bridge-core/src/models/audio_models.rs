use serde::{Deserialize, Serialize};

/// Bytes per sample of the only PCM format the card speaks (16-bit linear).
pub const BYTES_PER_SAMPLE: usize = 2;

/// Capture source passed to the native record object.
///
/// Discriminants are the platform's `audio_source_t` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioSource {
    Default = 0,
    Mic = 1,
    VoiceCall = 4,
    VoiceCommunication = 7,
}

impl AudioSource {
    /// Sources tried in order when opening a capture stream.
    pub const FALLBACK_ORDER: [AudioSource; 3] =
        [AudioSource::VoiceCommunication, AudioSource::VoiceCall, AudioSource::Mic];

    pub fn native(self) -> i32 {
        self as i32
    }
}

/// Playback stream type (`audio_stream_type_t`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamType {
    VoiceCall = 0,
}

impl StreamType {
    pub fn native(self) -> i32 {
        self as i32
    }
}

/// Sample format (`audio_format_t`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PcmFormat {
    Pcm16Bit = 1,
}

impl PcmFormat {
    pub fn native(self) -> i32 {
        self as i32
    }
}

/// Opaque audio I/O handle used when setting platform parameters (0 = global).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IoHandle(pub i32);

/// Input channel mask for `count` channels; 0 when the count has no mask.
pub fn channel_in_mask(count: u16) -> u32 {
    match count {
        1 => 0x10,
        2 => 0x0C,
        _ => 0,
    }
}

/// Output channel mask for `count` channels; 0 when the count has no mask.
pub fn channel_out_mask(count: u16) -> u32 {
    const FRONT_LEFT: u32 = 0x1;
    const FRONT_RIGHT: u32 = 0x2;
    const FRONT_CENTER: u32 = 0x4;
    const LOW_FREQUENCY: u32 = 0x8;
    const BACK_LEFT: u32 = 0x10;
    const BACK_RIGHT: u32 = 0x20;
    const BACK_CENTER: u32 = 0x100;
    const SIDE_LEFT: u32 = 0x200;
    const SIDE_RIGHT: u32 = 0x400;

    const STEREO: u32 = FRONT_LEFT | FRONT_RIGHT;
    const QUAD: u32 = STEREO | BACK_LEFT | BACK_RIGHT;
    const FIVE_POINT_ONE: u32 = QUAD | FRONT_CENTER | LOW_FREQUENCY;

    match count {
        1 => FRONT_LEFT,
        2 => STEREO,
        3 => STEREO | FRONT_CENTER,
        4 => QUAD,
        5 => QUAD | FRONT_CENTER,
        6 => FIVE_POINT_ONE,
        7 => FIVE_POINT_ONE | BACK_CENTER,
        8 => FIVE_POINT_ONE | SIDE_LEFT | SIDE_RIGHT,
        _ => 0,
    }
}

/// Size in bytes of `ms` milliseconds of 16-bit audio.
pub fn pcm_bytes_for_ms(ms: u32, rate: u32, channels: u16) -> usize {
    (u64::from(ms) * u64::from(channels) * BYTES_PER_SAMPLE as u64 * u64::from(rate) / 1000) as usize
}
