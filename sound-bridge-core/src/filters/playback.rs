use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::card::sound_card::SoundCard;
use crate::card::voice_mode::VoiceModeLease;
use crate::models::audio_models::{channel_out_mask, pcm_bytes_for_ms, PcmFormat, StreamType};
use crate::models::config::RatePolicy;
use crate::models::error::SoundError;
use crate::models::state::FilterState;
use crate::processing::bufferizer::Bufferizer;
use crate::processing::message_queue::MessageQueue;
use crate::traits::host::{FilterCategory, FilterDescriptor, SoundFilter, Ticker};
use crate::traits::native::{NativeTrack, TrackCallback, TrackEvent, TrackParams};

pub static PLAYBACK_DESCRIPTOR: FilterDescriptor = FilterDescriptor {
    name: "MSAndroidSndWrite",
    text: "android sound output",
    category: FilterCategory::Other,
    inputs: 1,
    outputs: 0,
};

const DEFAULT_RATE: u32 = 8000;
const DEFAULT_CHANNELS: u16 = 1;

struct PlaybackShared {
    buffer: Mutex<Bufferizer>,
    /// Backlog in bytes kept after serving a callback.
    max_backlog: AtomicUsize,
    callbacks: AtomicU64,
    frames_requested: AtomicU64,
}

impl PlaybackShared {
    fn on_event(&self, event: &mut TrackEvent<'_>) {
        match event {
            TrackEvent::MoreData {
                frame_count,
                data,
                served,
            } => {
                let mut buffer = self.buffer.lock();
                if self.callbacks.load(Ordering::Acquire) == 0 && !buffer.is_empty() {
                    // The device took a while to start; what piled up meanwhile is stale.
                    log::debug!("Purging {} bytes buffered before playback started", buffer.available());
                    buffer.flush();
                }

                let wanted = data.len();
                if buffer.available() >= wanted {
                    *served = buffer.read(data);
                    let backlog = buffer.available();
                    if backlog > self.max_backlog.load(Ordering::Relaxed) {
                        log::warn!("Too many samples waiting in sound writer, dropping {} bytes", backlog);
                        buffer.skip(backlog);
                    }
                } else {
                    log::warn!(
                        "PCM playback underrun: {} bytes buffered, {} requested",
                        buffer.available(),
                        wanted
                    );
                    *served = 0;
                }
                drop(buffer);

                self.callbacks.fetch_add(1, Ordering::AcqRel);
                self.frames_requested.fetch_add(*frame_count as u64, Ordering::Relaxed);
            }
            TrackEvent::Underrun => log::warn!("PCM playback underrun"),
            TrackEvent::Other(code) => log::error!("Untracked event {}", code),
        }
    }
}

/// Sound output filter: one input port → native playback stream.
pub struct PlaybackFilter {
    card: SoundCard,
    rate: u32,
    channels: u16,
    state: FilterState,
    shared: Arc<PlaybackShared>,
    track: Option<Box<dyn NativeTrack>>,
    lease: Option<VoiceModeLease>,
    started: bool,
}

impl PlaybackFilter {
    pub fn new(card: SoundCard) -> Self {
        let rate = match card.config().rate_policy {
            RatePolicy::Hardware => card.data().playback_rate,
            RatePolicy::FilterControlled => DEFAULT_RATE,
        };
        Self {
            card,
            rate,
            channels: DEFAULT_CHANNELS,
            state: FilterState::Uninitialized,
            shared: Arc::new(PlaybackShared {
                buffer: Mutex::new(Bufferizer::new()),
                max_backlog: AtomicUsize::new(0),
                callbacks: AtomicU64::new(0),
                frames_requested: AtomicU64::new(0),
            }),
            track: None,
            lease: None,
            started: false,
        }
    }

    pub fn state(&self) -> FilterState {
        self.state
    }

    pub fn has_native_handle(&self) -> bool {
        self.track.is_some()
    }

    /// Native callbacks served in the current run.
    pub fn callback_count(&self) -> u64 {
        self.shared.callbacks.load(Ordering::Acquire)
    }

    /// Frames requested by the device in the current run.
    pub fn frames_requested(&self) -> u64 {
        self.shared.frames_requested.load(Ordering::Relaxed)
    }

    pub fn buffered_bytes(&self) -> usize {
        self.shared.buffer.lock().available()
    }

    /// Largest backlog kept after a callback, for the current rate and channels.
    pub fn max_backlog_bytes(&self) -> usize {
        pcm_bytes_for_ms(self.card.config().max_playback_latency_ms, self.rate, self.channels)
    }

    fn open_track(&mut self) {
        let native = Arc::clone(self.card.native());
        let min_frames = match native.track_min_frame_count(StreamType::VoiceCall, self.rate) {
            Ok(frames) => {
                log::info!("AudioTrack: min frame count is {}", frames);
                frames
            }
            Err(e) => {
                log::error!("AudioTrack::getMinFrameCount() error: {}", e);
                return;
            }
        };

        let params = TrackParams {
            stream: StreamType::VoiceCall,
            sample_rate: self.rate,
            format: PcmFormat::Pcm16Bit,
            channel_mask: channel_out_mask(self.channels),
            frame_count: min_frames,
            notification_frames: self.card.config().notification_frames(self.rate),
        };
        let shared = Arc::clone(&self.shared);
        let callback: TrackCallback = Arc::new(move |event: &mut TrackEvent<'_>| shared.on_event(event));

        match native.open_track(params, callback) {
            Ok(track) => {
                log::info!("AudioTrack latency estimated to {} ms", track.latency_ms());
                self.track = Some(track);
            }
            Err(e) => log::error!("Problem setting up AudioTrack: {}", e),
        }
    }
}

impl SoundFilter for PlaybackFilter {
    fn descriptor(&self) -> &'static FilterDescriptor {
        &PLAYBACK_DESCRIPTOR
    }

    fn preprocess(&mut self, _ticker: Arc<dyn Ticker>) {
        self.state = FilterState::Preprocessing;
        self.lease = Some(self.card.voice_mode().acquire());

        self.shared.callbacks.store(0, Ordering::Release);
        self.shared.frames_requested.store(0, Ordering::Relaxed);
        self.shared.max_backlog.store(self.max_backlog_bytes(), Ordering::Relaxed);
        self.started = false;

        self.open_track();
        self.state = FilterState::Running;
    }

    fn process(&mut self, port: &mut MessageQueue) {
        let Some(track) = self.track.as_mut() else {
            port.flush();
            return;
        };
        if !self.started {
            track.start();
            self.started = true;
        }

        self.shared.buffer.lock().put_from_queue(port);

        if track.stopped() {
            log::warn!("AudioTrack stopped unexpectedly, needs to be restarted");
            track.start();
        }
    }

    fn postprocess(&mut self) {
        self.state = FilterState::Postprocessing;
        if let Some(mut track) = self.track.take() {
            log::info!("Stopping sound playback");
            track.stop();
            track.flush();
            log::info!("Sound playback stopped");
        }
        self.shared.buffer.lock().flush();

        if let Some(lease) = self.lease.take() {
            lease.release();
        }
        self.started = false;
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

impl Drop for PlaybackFilter {
    fn drop(&mut self) {
        if !self.state.is_idle() {
            self.postprocess();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::SoundCardConfig;
    use crate::testing::{FakeAudio, FakeScript, FakeTicker};

    fn card_with(script: FakeScript, config: SoundCardConfig) -> (Arc<FakeAudio>, SoundCard) {
        let fake = FakeAudio::new(script);
        let card = SoundCard::new("libmedia", fake.clone(), config);
        (fake, card)
    }

    fn default_card() -> (Arc<FakeAudio>, SoundCard) {
        card_with(FakeScript::default(), SoundCardConfig::default())
    }

    fn queue_of(bytes: &[u8]) -> MessageQueue {
        let mut q = MessageQueue::new();
        q.put(bytes.to_vec());
        q
    }

    /// Preprocesses, runs one tick and one empty callback so the startup purge is behind us.
    fn running_filter(card: &SoundCard, fake: &FakeAudio) -> PlaybackFilter {
        let mut filter = card.create_writer();
        filter.preprocess(FakeTicker::new());
        filter.process(&mut MessageQueue::new());
        fake.last_track().unwrap().request(320);
        filter
    }

    #[test]
    fn inherits_hardware_rate() {
        let (_fake, card) = card_with(
            FakeScript {
                hardware_rate: Some(48000),
                ..FakeScript::default()
            },
            SoundCardConfig::default(),
        );
        let mut filter = card.create_writer();

        assert_eq!(filter.sample_rate(), 48000);
        assert_eq!(filter.set_sample_rate(8000), Err(SoundError::RateFixed));
        assert!(filter.set_channels(2).is_ok());
        assert_eq!(filter.descriptor().name, "MSAndroidSndWrite");
        assert_eq!(filter.descriptor().inputs, 1);
    }

    #[test]
    fn filter_controlled_rate_is_used_for_the_track() {
        let config = SoundCardConfig {
            rate_policy: RatePolicy::FilterControlled,
            ..SoundCardConfig::default()
        };
        let (fake, card) = card_with(FakeScript::default(), config);
        let mut filter = card.create_writer();
        assert_eq!(filter.sample_rate(), 8000);
        filter.set_sample_rate(16000).unwrap();
        filter.set_channels(2).unwrap();

        filter.preprocess(FakeTicker::new());
        let track = fake.last_track().unwrap();
        assert_eq!(track.params.sample_rate, 16000);
        assert_eq!(track.params.channel_mask, 0x3);
        assert_eq!(filter.max_backlog_bytes(), 6400);
        filter.postprocess();
    }

    #[test]
    fn track_params_follow_card() {
        let (fake, card) = default_card();
        let mut filter = card.create_writer();
        filter.preprocess(FakeTicker::new());

        let track = fake.last_track().unwrap();
        assert_eq!(track.params.stream, StreamType::VoiceCall);
        assert_eq!(track.params.sample_rate, 44100);
        assert_eq!(track.params.frame_count, 2048);
        assert_eq!(track.params.notification_frames, 441);
        assert_eq!(track.params.channel_mask, 0x1);
        filter.postprocess();
    }

    #[test]
    fn min_frame_count_failure_acts_as_null_sink() {
        let (fake, card) = card_with(
            FakeScript {
                track_min_frames: None,
                ..FakeScript::default()
            },
            SoundCardConfig::default(),
        );
        let mut filter = card.create_writer();
        filter.preprocess(FakeTicker::new());

        assert!(!filter.has_native_handle());
        assert!(fake.log.lock().track_attempts.is_empty());

        let mut port = queue_of(&[1, 2, 3, 4]);
        filter.process(&mut port);
        assert!(port.is_empty());
        assert_eq!(filter.buffered_bytes(), 0);

        filter.postprocess();
        assert_eq!(card.voice_mode().refcount(), 0);
    }

    #[test]
    fn init_failure_acts_as_null_sink() {
        let (fake, card) = card_with(
            FakeScript {
                track_init_fails: true,
                ..FakeScript::default()
            },
            SoundCardConfig::default(),
        );
        let mut filter = card.create_writer();
        filter.preprocess(FakeTicker::new());

        assert!(!filter.has_native_handle());
        assert_eq!(fake.log.lock().track_attempts.len(), 1);
        let mut port = queue_of(&[0; 64]);
        filter.process(&mut port);
        assert!(port.is_empty());
        filter.postprocess();
        assert_eq!(card.voice_mode().refcount(), 0);
    }

    #[test]
    fn starts_once_and_restarts_when_halted() {
        let (fake, card) = default_card();
        let mut filter = card.create_writer();
        filter.preprocess(FakeTicker::new());
        let track = fake.last_track().unwrap();

        filter.process(&mut MessageQueue::new());
        filter.process(&mut MessageQueue::new());
        assert_eq!(track.starts(), 1);

        track.halt();
        filter.process(&mut MessageQueue::new());
        assert_eq!(track.starts(), 2);
        filter.postprocess();
    }

    #[test]
    fn first_callback_purges_startup_backlog() {
        let (fake, card) = default_card();
        let mut filter = card.create_writer();
        filter.preprocess(FakeTicker::new());
        filter.process(&mut queue_of(&[7; 1000]));
        assert_eq!(filter.buffered_bytes(), 1000);

        let track = fake.last_track().unwrap();
        let (served, _) = track.request(320);
        assert_eq!(served, 0);
        assert_eq!(filter.buffered_bytes(), 0);

        let pattern: Vec<u8> = (0..=255u8).chain(0..64u8).collect();
        filter.process(&mut queue_of(&pattern));
        let (served, data) = track.request(320);
        assert_eq!(served, 320);
        assert_eq!(data, pattern);
        assert_eq!(filter.callback_count(), 2);
        assert_eq!(filter.frames_requested(), 320);
        filter.postprocess();
    }

    #[test]
    fn starved_callback_serves_nothing() {
        let (fake, card) = default_card();
        let mut filter = running_filter(&card, &fake);

        filter.process(&mut queue_of(&[5; 100]));
        let (served, data) = fake.last_track().unwrap().request(320);
        assert_eq!(served, 0);
        assert!(data.iter().all(|&b| b == 0));
        assert_eq!(filter.buffered_bytes(), 100);
        filter.postprocess();
    }

    #[test]
    fn backlog_over_latency_bound_is_dropped() {
        let (fake, card) = default_card();
        let mut filter = running_filter(&card, &fake);
        let limit = filter.max_backlog_bytes();
        assert_eq!(limit, 8820);

        filter.process(&mut queue_of(&vec![1; 20_000]));
        let (served, _) = fake.last_track().unwrap().request(320);
        assert_eq!(served, 320);
        assert_eq!(filter.buffered_bytes(), 0);

        filter.process(&mut queue_of(&vec![1; 5_000]));
        let (served, _) = fake.last_track().unwrap().request(320);
        assert_eq!(served, 320);
        assert_eq!(filter.buffered_bytes(), 4_680);
        assert!(filter.buffered_bytes() <= limit);
        filter.postprocess();
    }

    #[test]
    fn backlog_bound_holds_after_every_callback() {
        let (fake, card) = default_card();
        let mut filter = running_filter(&card, &fake);
        let limit = filter.max_backlog_bytes();
        let track = fake.last_track().unwrap();

        for tick in 0..200usize {
            let burst = (tick % 7) * 900;
            filter.process(&mut queue_of(&vec![0; burst]));
            track.request(882);
            assert!(filter.buffered_bytes() <= limit);
        }
        filter.postprocess();
    }

    #[test]
    fn underrun_and_unknown_events_are_only_logged() {
        let (fake, card) = default_card();
        let mut filter = running_filter(&card, &fake);
        let track = fake.last_track().unwrap();

        track.underrun();
        filter.process(&mut queue_of(&[1; 320]));
        assert_eq!(track.request(320).0, 320);
        filter.postprocess();
    }

    #[test]
    fn postprocess_stops_flushes_and_releases() {
        let (fake, card) = default_card();
        let mut filter = running_filter(&card, &fake);
        filter.process(&mut queue_of(&[1; 64]));
        let track = fake.last_track().unwrap();

        filter.postprocess();
        assert!(track.is_released());
        assert!(track.flushed.load(Ordering::SeqCst));
        assert!(!filter.has_native_handle());
        assert_eq!(filter.buffered_bytes(), 0);
        assert_eq!(filter.state(), FilterState::Uninitialized);
    }

    #[test]
    fn repeated_runs_leave_no_stale_handle() {
        let (fake, card) = default_card();
        let mut filter = card.create_writer();

        for _ in 0..3 {
            assert!(!filter.has_native_handle());
            filter.preprocess(FakeTicker::new());
            assert!(filter.has_native_handle());
            assert_eq!(filter.callback_count(), 0);
            filter.process(&mut queue_of(&[0; 32]));
            fake.last_track().unwrap().request(32);
            filter.postprocess();
            assert!(!filter.has_native_handle());
        }
        assert_eq!(card.voice_mode().refcount(), 0);
    }

    #[test]
    fn capture_and_playback_share_voice_mode() {
        let (fake, card) = default_card();
        let mut reader = card.create_reader();
        let mut writer = card.create_writer();

        reader.preprocess(FakeTicker::new());
        writer.preprocess(FakeTicker::new());
        assert_eq!(card.voice_mode().refcount(), 2);
        reader.postprocess();
        writer.postprocess();

        // Negotiation toggles once, then one on/off pair for both filters.
        assert_eq!(fake.parameters(), vec!["voip=on", "voip=off", "voip=on", "voip=off"]);
    }
}
