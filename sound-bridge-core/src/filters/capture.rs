use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::card::sound_card::SoundCard;
use crate::card::voice_mode::VoiceModeLease;
use crate::models::audio_models::{channel_in_mask, AudioSource, PcmFormat};
use crate::models::config::RatePolicy;
use crate::models::error::SoundError;
use crate::models::state::FilterState;
use crate::processing::clock_sync::{ClockSynchronizer, MonotonicClock, SynchronizedClock};
use crate::processing::message_queue::MessageQueue;
use crate::traits::host::{FilterCategory, FilterDescriptor, SoundFilter, Ticker};
use crate::traits::native::{NativeRecord, RecordCallback, RecordEvent, RecordParams};

pub static CAPTURE_DESCRIPTOR: FilterDescriptor = FilterDescriptor {
    name: "MSAndroidSndRead",
    text: "android sound source",
    category: FilterCategory::Other,
    inputs: 0,
    outputs: 1,
};

const DEFAULT_RATE: u32 = 8000;
const DEFAULT_CHANNELS: u16 = 1;

/// State touched by the platform audio thread, behind one lock.
struct CaptureInner {
    queue: MessageQueue,
    ticker: Option<Arc<dyn Ticker>>,
    synchronizer: Option<Arc<Mutex<ClockSynchronizer>>>,
    read_samples: u64,
    rate: u32,
    callbacks: u64,
}

struct CaptureShared {
    started: AtomicBool,
    skew_log_interval: u64,
    inner: Mutex<CaptureInner>,
}

impl CaptureShared {
    fn on_event(&self, event: RecordEvent<'_>) {
        if !self.started.load(Ordering::Acquire) {
            return;
        }
        match event {
            RecordEvent::MoreData { frame_count, data } => {
                let block = data.to_vec();

                let mut inner = self.inner.lock();
                // Re-checked under the lock: postprocess may have run meanwhile.
                if !self.started.load(Ordering::Acquire) {
                    return;
                }
                let Some(synchronizer) = inner.synchronizer_or_attach() else {
                    return;
                };
                inner.read_samples += frame_count as u64;
                let sound_ms = inner.read_samples * 1000 / u64::from(inner.rate.max(1));
                let skew = synchronizer.lock().set_external_time(sound_ms);
                inner.callbacks += 1;
                if inner.callbacks % self.skew_log_interval == 0 {
                    log::info!("sound/wall clock skew is average={} ms", skew);
                }
                inner.queue.put(block);
            }
            RecordEvent::Overrun => log::warn!("AudioRecord overrun"),
            RecordEvent::Other(code) => log::debug!("Ignoring AudioRecord event {}", code),
        }
    }
}

impl CaptureInner {
    /// Returns the synchronizer, creating it and handing the ticker its
    /// corrected clock on first use. `None` once the ticker is detached.
    fn synchronizer_or_attach(&mut self) -> Option<Arc<Mutex<ClockSynchronizer>>> {
        if let Some(sync) = &self.synchronizer {
            return Some(Arc::clone(sync));
        }
        let ticker = self.ticker.as_ref()?;
        let sync = Arc::new(Mutex::new(ClockSynchronizer::new(
            Arc::new(MonotonicClock),
            ticker.interval_ms(),
        )));
        ticker.set_time_source(Some(Arc::new(SynchronizedClock::new(Arc::clone(&sync)))));
        self.synchronizer = Some(Arc::clone(&sync));
        Some(sync)
    }
}

/// Sound source filter: native capture stream → one output port.
pub struct CaptureFilter {
    card: SoundCard,
    rate: u32,
    channels: u16,
    source: AudioSource,
    state: FilterState,
    shared: Arc<CaptureShared>,
    record: Option<Box<dyn NativeRecord>>,
    lease: Option<VoiceModeLease>,
    ticker: Option<Arc<dyn Ticker>>,
    emitted: u64,
}

impl CaptureFilter {
    pub fn new(card: SoundCard) -> Self {
        let mut rate = DEFAULT_RATE;
        if card.config().rate_policy == RatePolicy::Hardware {
            if let Some(capture) = card.data().capture {
                rate = capture.sample_rate;
            }
        }
        let skew_log_interval = u64::from(card.config().skew_log_interval.max(1));

        Self {
            card,
            rate,
            channels: DEFAULT_CHANNELS,
            source: AudioSource::Default,
            state: FilterState::Uninitialized,
            shared: Arc::new(CaptureShared {
                started: AtomicBool::new(false),
                skew_log_interval,
                inner: Mutex::new(CaptureInner {
                    queue: MessageQueue::new(),
                    ticker: None,
                    synchronizer: None,
                    read_samples: 0,
                    rate,
                    callbacks: 0,
                }),
            }),
            record: None,
            lease: None,
            ticker: None,
            emitted: 0,
        }
    }

    pub fn state(&self) -> FilterState {
        self.state
    }

    /// Whether a native record object is currently held.
    pub fn has_native_handle(&self) -> bool {
        self.record.is_some()
    }

    /// Source the current record object was opened with.
    pub fn source(&self) -> AudioSource {
        self.source
    }

    /// Buffers emitted on the output port since creation.
    pub fn emitted_buffers(&self) -> u64 {
        self.emitted
    }

    /// Frames captured in the current run.
    pub fn captured_frames(&self) -> u64 {
        self.shared.inner.lock().read_samples
    }

    /// Minimum native frame count for the current rate, if capture is possible.
    fn min_frame_count(&self) -> Result<usize, SoundError> {
        let capture = self.card.data().capture.ok_or(SoundError::NoCaptureRate)?;
        if capture.sample_rate == self.rate && self.channels == 1 {
            return Ok(capture.min_frame_count);
        }
        self.card
            .native()
            .record_min_frame_count(self.rate, PcmFormat::Pcm16Bit, self.channels)
    }

    fn open_record(&mut self) {
        let min_frames = match self.min_frame_count() {
            Ok(frames) => frames,
            Err(e) => {
                log::error!("Sound capture disabled at {} Hz: {}", self.rate, e);
                return;
            }
        };
        let config = self.card.config();
        let frame_count = min_frames * config.capture_buffer_multiplier as usize;
        let notification_frames = config.notification_frames(self.rate);

        let shared = Arc::clone(&self.shared);
        let callback: RecordCallback = Arc::new(move |event: RecordEvent<'_>| shared.on_event(event));

        let sources = AudioSource::FALLBACK_ORDER;
        for (attempt, &source) in sources.iter().enumerate() {
            let params = RecordParams {
                source,
                sample_rate: self.rate,
                format: PcmFormat::Pcm16Bit,
                channel_mask: channel_in_mask(self.channels),
                frame_count,
                notification_frames,
            };
            match self.card.native().open_record(params, Arc::clone(&callback)) {
                Ok(record) => {
                    self.source = source;
                    self.record = Some(record);
                    return;
                }
                Err(e) => {
                    log::error!(
                        "Problem when setting up AudioRecord: {} source={:?}, rate={}, framecount={}",
                        e,
                        source,
                        self.rate,
                        frame_count
                    );
                    if let Some(next) = sources.get(attempt + 1) {
                        log::error!("Retrying with {:?}", next);
                    }
                }
            }
        }
        log::error!("No audio source could be opened, sound capture disabled for this run");
    }
}

impl SoundFilter for CaptureFilter {
    fn descriptor(&self) -> &'static FilterDescriptor {
        &CAPTURE_DESCRIPTOR
    }

    fn preprocess(&mut self, ticker: Arc<dyn Ticker>) {
        self.state = FilterState::Preprocessing;
        self.lease = Some(self.card.voice_mode().acquire());

        {
            let mut inner = self.shared.inner.lock();
            inner.ticker = Some(Arc::clone(&ticker));
            inner.synchronizer = None;
            inner.read_samples = 0;
            inner.rate = self.rate;
            inner.callbacks = 0;
        }
        self.ticker = Some(ticker);
        self.source = AudioSource::Default;

        self.open_record();
        self.state = FilterState::Running;
    }

    fn process(&mut self, port: &mut MessageQueue) {
        if !self.state.is_running() {
            return;
        }
        let Some(record) = self.record.as_mut() else {
            return;
        };
        if !self.shared.started.load(Ordering::Acquire) {
            self.shared.started.store(true, Ordering::Release);
            if let Err(e) = record.start() {
                log::error!("AudioRecord start failed: {}", e);
            }
        }

        let moved = self.shared.inner.lock().queue.drain_into(port);
        self.emitted += moved as u64;
    }

    fn postprocess(&mut self) {
        self.state = FilterState::Postprocessing;
        log::info!("Stopping sound capture");

        self.shared.started.store(false, Ordering::Release);
        if let Some(mut record) = self.record.take() {
            record.stop();
        }
        {
            // Detached under the lock so a callback mid-attach cannot win afterwards.
            let mut inner = self.shared.inner.lock();
            inner.ticker = None;
            inner.synchronizer = None;
            if let Some(ticker) = self.ticker.take() {
                ticker.set_time_source(None);
            }
            inner.read_samples = 0;
            if !inner.queue.is_empty() {
                log::debug!(
                    "Discarding {} captured buffers ({} bytes)",
                    inner.queue.len(),
                    inner.queue.byte_len()
                );
                inner.queue.flush();
            }
        }
        log::info!("Sound capture stopped");

        if let Some(lease) = self.lease.take() {
            lease.release();
        }
        self.state = FilterState::Uninitialized;
    }

    fn sample_rate(&self) -> u32 {
        self.rate
    }

    fn set_sample_rate(&mut self, rate: u32) -> Result<(), SoundError> {
        match self.card.config().rate_policy {
            RatePolicy::Hardware => Err(SoundError::RateFixed),
            RatePolicy::FilterControlled if rate == 0 => {
                Err(SoundError::InvalidParameter("sample rate must be positive".into()))
            }
            RatePolicy::FilterControlled => {
                self.rate = rate;
                Ok(())
            }
        }
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn set_channels(&mut self, channels: u16) -> Result<(), SoundError> {
        self.channels = channels;
        Ok(())
    }
}

impl Drop for CaptureFilter {
    fn drop(&mut self) {
        if !self.state.is_idle() {
            self.postprocess();
        }
    }
}
