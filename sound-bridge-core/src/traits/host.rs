use std::sync::Arc;

use crate::models::error::SoundError;
use crate::processing::message_queue::MessageQueue;

/// A millisecond clock the ticker can be driven by.
pub trait TimeSource: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// The host's scheduling clock driving the processing graph.
pub trait Ticker: Send + Sync {
    /// Tick period in milliseconds.
    fn interval_ms(&self) -> u64;

    /// Replaces the ticker's time function; `None` restores the default wall clock.
    fn set_time_source(&self, source: Option<Arc<dyn TimeSource>>);
}

/// Filter category as reported to the host registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterCategory {
    Other,
}

/// Static description of a filter kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterDescriptor {
    pub name: &'static str,
    pub text: &'static str,
    pub category: FilterCategory,
    pub inputs: usize,
    pub outputs: usize,
}

/// Entries of the filter method table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMethod {
    SetSampleRate(u32),
    GetSampleRate,
    SetNChannels(u16),
    GetNChannels,
}

/// Result of a method table call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodReply {
    Done,
    SampleRate(u32),
    Channels(u16),
}

/// Lifecycle hooks invoked by the host graph thread, strictly in sequence.
///
/// Init is construction, uninit is `Drop`. Hooks never fail: problems are
/// logged and the filter degrades to a no-op for the current run.
pub trait SoundFilter: Send {
    fn descriptor(&self) -> &'static FilterDescriptor;

    fn preprocess(&mut self, ticker: Arc<dyn Ticker>);

    /// One graph tick. `port` is the filter's single input or output queue.
    fn process(&mut self, port: &mut MessageQueue);

    fn postprocess(&mut self);

    fn sample_rate(&self) -> u32;

    fn set_sample_rate(&mut self, rate: u32) -> Result<(), SoundError>;

    fn channels(&self) -> u16;

    /// Always accepted; applied on the next preprocess.
    fn set_channels(&mut self, channels: u16) -> Result<(), SoundError>;

    fn call_method(&mut self, method: FilterMethod) -> Result<MethodReply, SoundError> {
        match method {
            FilterMethod::SetSampleRate(rate) => self.set_sample_rate(rate).map(|_| MethodReply::Done),
            FilterMethod::GetSampleRate => Ok(MethodReply::SampleRate(self.sample_rate())),
            FilterMethod::SetNChannels(channels) => self.set_channels(channels).map(|_| MethodReply::Done),
            FilterMethod::GetNChannels => Ok(MethodReply::Channels(self.channels())),
        }
    }
}
