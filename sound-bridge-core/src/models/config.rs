use serde::{Deserialize, Serialize};

use super::error::SoundError;

/// Standard sampling rates walked during capture negotiation, highest first.
pub const STANDARD_SAMPLE_RATES: [u32; 6] = [48000, 44100, 32000, 22050, 16000, 8000];

/// Who decides the sampling rate of the filters created from a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatePolicy {
    /// The rate negotiated with the hardware always wins; `set_sample_rate` is rejected.
    #[default]
    Hardware,
    /// Filters accept the rate the graph asks for.
    FilterControlled,
}

/// Configuration shared by a sound card and every filter created from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundCardConfig {
    /// Rate ownership (default: hardware).
    pub rate_policy: RatePolicy,

    /// Native callback granularity in milliseconds (default: 10).
    pub notification_ms: u32,

    /// Playback backlog kept after each callback, in milliseconds (default: 100).
    pub max_playback_latency_ms: u32,

    /// Capture buffer size as a multiple of the minimum frame count (default: 4).
    pub capture_buffer_multiplier: u32,

    /// Capture negotiation candidates, strictly descending.
    pub candidate_rates: Vec<u32>,

    /// Log the clock skew once every this many capture callbacks (default: 100).
    pub skew_log_interval: u32,
}

impl SoundCardConfig {
    pub fn validate(&self) -> Result<(), SoundError> {
        if self.notification_ms == 0 {
            return Err(SoundError::Configuration("notification interval must be positive".into()));
        }
        if self.max_playback_latency_ms == 0 {
            return Err(SoundError::Configuration("playback latency bound must be positive".into()));
        }
        if self.capture_buffer_multiplier == 0 {
            return Err(SoundError::Configuration("capture buffer multiplier must be positive".into()));
        }
        if self.candidate_rates.is_empty() {
            return Err(SoundError::Configuration("candidate rate list is empty".into()));
        }
        if self.candidate_rates.windows(2).any(|w| w[0] <= w[1]) {
            return Err(SoundError::Configuration(format!(
                "candidate rates must be strictly descending: {:?}",
                self.candidate_rates
            )));
        }
        if self.candidate_rates.contains(&0) {
            return Err(SoundError::Configuration("candidate rates must be positive".into()));
        }
        if self.skew_log_interval == 0 {
            return Err(SoundError::Configuration("skew log interval must be positive".into()));
        }
        Ok(())
    }

    /// Parses and validates a JSON configuration. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, SoundError> {
        let config: SoundCardConfig = serde_json::from_str(json)
            .map_err(|e| SoundError::Configuration(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Frames delivered per native callback at `rate`.
    pub fn notification_frames(&self, rate: u32) -> usize {
        (u64::from(rate) * u64::from(self.notification_ms) / 1000) as usize
    }
}

impl Default for SoundCardConfig {
    fn default() -> Self {
        Self {
            rate_policy: RatePolicy::Hardware,
            notification_ms: 10,
            max_playback_latency_ms: 100,
            capture_buffer_multiplier: 4,
            candidate_rates: STANDARD_SAMPLE_RATES.to_vec(),
            skew_log_interval: 100,
        }
    }
}
