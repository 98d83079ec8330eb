//! Audio stream primitives shared by the DSP core and its hosts
//!
//! The DSP objects themselves never fail on the audio thread; these types
//! validate the stream shape once, before any processing object is built.

use super::dsp::params;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur in the audio subsystem
#[derive(Debug, Error)]
pub enum AudioError {
    /// Invalid configuration for a processor or stream
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Stream shape the engine cannot process
    #[error("Unsupported configuration: {0}")]
    UnsupportedConfiguration(String),
}

pub type Result<T> = std::result::Result<T, AudioError>;

/// Audio sample rate in Hz
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleRate {
    Hz44100,
    Hz48000,
    Hz88200,
    Hz96000,
    Hz192000,
    Custom(u32),
}

impl SampleRate {
    /// Lowest rate the filter can run at while keeping the modulation ceiling
    /// meaningful
    pub const MIN_HZ: u32 = params::SAMPLE_RATE_MIN as u32;
    /// Highest supported rate
    pub const MAX_HZ: u32 = params::SAMPLE_RATE_MAX as u32;

    pub fn hz(&self) -> u32 {
        match self {
            SampleRate::Hz44100 => 44100,
            SampleRate::Hz48000 => 48000,
            SampleRate::Hz88200 => 88200,
            SampleRate::Hz96000 => 96000,
            SampleRate::Hz192000 => 192000,
            SampleRate::Custom(hz) => *hz,
        }
    }

    /// Rate as the `f64` the DSP objects are reset with
    pub fn as_f64(&self) -> f64 {
        f64::from(self.hz())
    }

    /// Nyquist frequency in Hz
    pub fn nyquist(&self) -> f64 {
        self.as_f64() / 2.0
    }

    pub fn from_hz(hz: u32) -> Self {
        match hz {
            44100 => SampleRate::Hz44100,
            48000 => SampleRate::Hz48000,
            88200 => SampleRate::Hz88200,
            96000 => SampleRate::Hz96000,
            192000 => SampleRate::Hz192000,
            hz => SampleRate::Custom(hz),
        }
    }

    /// Build a sample rate, rejecting values outside the supported range
    pub fn validated(hz: u32) -> Result<Self> {
        if !(Self::MIN_HZ..=Self::MAX_HZ).contains(&hz) {
            return Err(AudioError::UnsupportedConfiguration(format!(
                "sample rate {} Hz outside {}..={} Hz",
                hz,
                Self::MIN_HZ,
                Self::MAX_HZ
            )));
        }
        Ok(Self::from_hz(hz))
    }
}

impl Default for SampleRate {
    fn default() -> Self {
        SampleRate::Hz48000
    }
}

/// Number of audio channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelCount {
    Mono,
    Stereo,
    Surround(u16),
}

impl ChannelCount {
    pub fn count(&self) -> u16 {
        match self {
            ChannelCount::Mono => 1,
            ChannelCount::Stereo => 2,
            ChannelCount::Surround(n) => *n,
        }
    }

    /// Build a channel count, rejecting zero channels
    pub fn from_count(count: u16) -> Result<Self> {
        match count {
            0 => Err(AudioError::UnsupportedConfiguration(
                "stream must have at least one channel".to_string(),
            )),
            1 => Ok(ChannelCount::Mono),
            2 => Ok(ChannelCount::Stereo),
            n => Ok(ChannelCount::Surround(n)),
        }
    }
}
