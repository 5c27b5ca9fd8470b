//! In-crate fakes for the native platform and the host ticker.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::audio_models::{AudioSource, IoHandle, PcmFormat, StreamType};
use crate::models::error::SoundError;
use crate::traits::host::{Ticker, TimeSource};
use crate::traits::native::{
    NativeAudio, NativeRecord, NativeTrack, RecordCallback, RecordEvent, RecordParams, TrackCallback,
    TrackEvent, TrackParams,
};

/// Scripted platform behavior.
pub struct FakeScript {
    pub hardware_rate: Option<u32>,
    pub record_rates: Vec<u32>,
    pub record_min_frames: usize,
    pub track_min_frames: Option<usize>,
    pub failing_sources: Vec<AudioSource>,
    pub track_init_fails: bool,
    pub failing_parameters: bool,
}

impl Default for FakeScript {
    fn default() -> Self {
        Self {
            hardware_rate: Some(44100),
            record_rates: vec![44100, 16000, 8000],
            record_min_frames: 1024,
            track_min_frames: Some(2048),
            failing_sources: Vec::new(),
            track_init_fails: false,
            failing_parameters: false,
        }
    }
}

#[derive(Default)]
pub struct FakeLog {
    pub parameters: Vec<String>,
    pub record_rate_queries: Vec<u32>,
    pub record_attempts: Vec<RecordParams>,
    pub track_attempts: Vec<TrackParams>,
}

pub struct FakeAudio {
    pub script: Mutex<FakeScript>,
    pub log: Mutex<FakeLog>,
    records: Mutex<Vec<Arc<RecordProbe>>>,
    tracks: Mutex<Vec<Arc<TrackProbe>>>,
}

impl FakeAudio {
    pub fn new(script: FakeScript) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script),
            log: Mutex::new(FakeLog::default()),
            records: Mutex::new(Vec::new()),
            tracks: Mutex::new(Vec::new()),
        })
    }

    pub fn last_record(&self) -> Option<Arc<RecordProbe>> {
        self.records.lock().last().cloned()
    }

    pub fn last_track(&self) -> Option<Arc<TrackProbe>> {
        self.tracks.lock().last().cloned()
    }

    pub fn parameters(&self) -> Vec<String> {
        self.log.lock().parameters.clone()
    }
}

impl NativeAudio for FakeAudio {
    fn output_sampling_rate(&self, _stream: StreamType) -> Result<u32, SoundError> {
        self.script.lock().hardware_rate.ok_or(SoundError::NativeStatus(-19))
    }

    fn set_parameters(&self, _io: IoHandle, params: &str) -> Result<(), SoundError> {
        self.log.lock().parameters.push(params.to_string());
        if self.script.lock().failing_parameters {
            return Err(SoundError::NativeStatus(-38));
        }
        Ok(())
    }

    fn record_min_frame_count(&self, sample_rate: u32, _format: PcmFormat, _channels: u16) -> Result<usize, SoundError> {
        self.log.lock().record_rate_queries.push(sample_rate);
        let script = self.script.lock();
        if script.record_rates.contains(&sample_rate) {
            Ok(script.record_min_frames)
        } else {
            Err(SoundError::NativeStatus(-22))
        }
    }

    fn track_min_frame_count(&self, _stream: StreamType, _sample_rate: u32) -> Result<usize, SoundError> {
        self.script.lock().track_min_frames.ok_or(SoundError::NativeStatus(-22))
    }

    fn open_record(&self, params: RecordParams, callback: RecordCallback) -> Result<Box<dyn NativeRecord>, SoundError> {
        self.log.lock().record_attempts.push(params);
        if self.script.lock().failing_sources.contains(&params.source) {
            return Err(SoundError::NativeStatus(-19));
        }
        let probe = Arc::new(RecordProbe {
            params,
            callback,
            started: AtomicBool::new(false),
            released: AtomicBool::new(false),
        });
        self.records.lock().push(Arc::clone(&probe));
        Ok(Box::new(FakeRecord { probe }))
    }

    fn open_track(&self, params: TrackParams, callback: TrackCallback) -> Result<Box<dyn NativeTrack>, SoundError> {
        self.log.lock().track_attempts.push(params);
        if self.script.lock().track_init_fails {
            return Err(SoundError::NativeStatus(-12));
        }
        let probe = Arc::new(TrackProbe {
            params,
            callback,
            running: AtomicBool::new(false),
            released: AtomicBool::new(false),
            flushed: AtomicBool::new(false),
            start_count: AtomicUsize::new(0),
        });
        self.tracks.lock().push(Arc::clone(&probe));
        Ok(Box::new(FakeTrack { probe }))
    }
}

/// Test-side view of a fake record object.
pub struct RecordProbe {
    pub params: RecordParams,
    callback: RecordCallback,
    pub started: AtomicBool,
    pub released: AtomicBool,
}

impl RecordProbe {
    /// Delivers one captured buffer as the platform audio thread would.
    pub fn deliver(&self, data: &[u8], frame_count: usize) {
        (self.callback)(RecordEvent::MoreData { frame_count, data });
    }

    pub fn overrun(&self) {
        (self.callback)(RecordEvent::Overrun);
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

struct FakeRecord {
    probe: Arc<RecordProbe>,
}

impl NativeRecord for FakeRecord {
    fn start(&mut self) -> Result<(), SoundError> {
        self.probe.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) {
        self.probe.started.store(false, Ordering::SeqCst);
    }
}

impl Drop for FakeRecord {
    fn drop(&mut self) {
        self.probe.released.store(true, Ordering::SeqCst);
    }
}

/// Test-side view of a fake track object.
pub struct TrackProbe {
    pub params: TrackParams,
    callback: TrackCallback,
    pub running: AtomicBool,
    pub released: AtomicBool,
    pub flushed: AtomicBool,
    pub start_count: AtomicUsize,
}

impl TrackProbe {
    /// Asks the filter for `size` bytes. Returns the bytes served and the buffer.
    pub fn request(&self, size: usize) -> (usize, Vec<u8>) {
        let mut data = vec![0u8; size];
        let frame_count = size / (2 * self.channel_count());
        let mut event = TrackEvent::MoreData {
            frame_count,
            data: &mut data,
            served: 0,
        };
        (self.callback)(&mut event);
        let served = match event {
            TrackEvent::MoreData { served, .. } => served,
            _ => 0,
        };
        (served, data)
    }

    pub fn underrun(&self) {
        (self.callback)(&mut TrackEvent::Underrun);
    }

    /// Simulates the platform stopping the stream behind our back.
    pub fn halt(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn starts(&self) -> usize {
        self.start_count.load(Ordering::SeqCst)
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    fn channel_count(&self) -> usize {
        (self.params.channel_mask.count_ones() as usize).max(1)
    }
}

struct FakeTrack {
    probe: Arc<TrackProbe>,
}

impl NativeTrack for FakeTrack {
    fn start(&mut self) {
        self.probe.running.store(true, Ordering::SeqCst);
        self.probe.start_count.fetch_add(1, Ordering::SeqCst);
    }

    fn stop(&mut self) {
        self.probe.running.store(false, Ordering::SeqCst);
    }

    fn flush(&mut self) {
        self.probe.flushed.store(true, Ordering::SeqCst);
    }

    fn stopped(&self) -> bool {
        !self.probe.running.load(Ordering::SeqCst)
    }

    fn latency_ms(&self) -> u32 {
        40
    }
}

impl Drop for FakeTrack {
    fn drop(&mut self) {
        self.probe.released.store(true, Ordering::SeqCst);
    }
}

/// Ticker that remembers its custom time source.
#[derive(Default)]
pub struct FakeTicker {
    source: Mutex<Option<Arc<dyn TimeSource>>>,
}

impl FakeTicker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn has_custom_source(&self) -> bool {
        self.source.lock().is_some()
    }

    pub fn now_ms(&self) -> Option<u64> {
        self.source.lock().as_ref().map(|s| s.now_ms())
    }
}

impl Ticker for FakeTicker {
    fn interval_ms(&self) -> u64 {
        10
    }

    fn set_time_source(&self, source: Option<Arc<dyn TimeSource>>) {
        *self.source.lock() = source;
    }
}
