use std::sync::Arc;

use crate::models::audio_models::{AudioSource, IoHandle, PcmFormat, StreamType};
use crate::models::error::SoundError;

/// Event delivered by a native record object on the platform audio thread.
#[derive(Debug)]
pub enum RecordEvent<'a> {
    /// A captured buffer: `frame_count` frames of interleaved 16-bit PCM.
    MoreData { frame_count: usize, data: &'a [u8] },
    Overrun,
    Other(i32),
}

/// Event delivered by a native track object on the platform audio thread.
#[derive(Debug)]
pub enum TrackEvent<'a> {
    /// The track wants `data.len()` bytes (`frame_count` frames).
    /// The callback writes the bytes it provides and sets `served`;
    /// leaving `served` at 0 plays nothing for this period.
    MoreData {
        frame_count: usize,
        data: &'a mut [u8],
        served: usize,
    },
    Underrun,
    Other(i32),
}

/// Callback invoked by the native record object.
///
/// Fires on a platform-owned thread, concurrently with graph processing.
pub type RecordCallback = Arc<dyn Fn(RecordEvent<'_>) + Send + Sync + 'static>;

/// Callback invoked by the native track object.
pub type TrackCallback = Arc<dyn Fn(&mut TrackEvent<'_>) + Send + Sync + 'static>;

/// Parameters for opening a native capture stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordParams {
    pub source: AudioSource,
    pub sample_rate: u32,
    pub format: PcmFormat,
    pub channel_mask: u32,
    pub frame_count: usize,
    pub notification_frames: usize,
}

/// Parameters for opening a native playback stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackParams {
    pub stream: StreamType,
    pub sample_rate: u32,
    pub format: PcmFormat,
    pub channel_mask: u32,
    pub frame_count: usize,
    pub notification_frames: usize,
}

/// A constructed, init-checked native capture stream.
///
/// Dropping the value releases the native object.
pub trait NativeRecord: Send {
    fn start(&mut self) -> Result<(), SoundError>;

    fn stop(&mut self);
}

/// A constructed, init-checked native playback stream.
pub trait NativeTrack: Send {
    fn start(&mut self);

    fn stop(&mut self);

    fn flush(&mut self);

    /// Whether the platform stopped the stream on its own.
    fn stopped(&self) -> bool;

    /// Estimated output latency in milliseconds.
    fn latency_ms(&self) -> u32;
}

/// The platform audio system: system queries plus record/track factories.
///
/// Implemented over runtime-resolved `libmedia` symbols on Android and by
/// fakes in tests.
pub trait NativeAudio: Send + Sync {
    /// Hardware output sampling rate for `stream`.
    fn output_sampling_rate(&self, stream: StreamType) -> Result<u32, SoundError>;

    /// Sets a `key=value` routing parameter on `io`.
    fn set_parameters(&self, io: IoHandle, params: &str) -> Result<(), SoundError>;

    /// Minimum capture buffer, in frames, for the given rate/format/channels.
    fn record_min_frame_count(
        &self,
        sample_rate: u32,
        format: PcmFormat,
        channels: u16,
    ) -> Result<usize, SoundError>;

    /// Minimum playback buffer, in frames.
    fn track_min_frame_count(&self, stream: StreamType, sample_rate: u32) -> Result<usize, SoundError>;

    /// Constructs a record object and runs its init check.
    /// A failed init check releases the object and returns an error.
    fn open_record(
        &self,
        params: RecordParams,
        callback: RecordCallback,
    ) -> Result<Box<dyn NativeRecord>, SoundError>;

    /// Constructs a track object and runs its init check.
    fn open_track(
        &self,
        params: TrackParams,
        callback: TrackCallback,
    ) -> Result<Box<dyn NativeTrack>, SoundError>;
}
