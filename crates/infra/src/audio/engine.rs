//! Real-time Auto-Q engine over interleaved buffers
//!
//! The engine owns one [`AutoQ`] per channel. At the top of each buffer it
//! picks up the newest parameter snapshot and bypass request from its
//! [`ParameterReceiver`], then processes the buffer in place and publishes
//! metering to its [`MeterTap`].

use autoq_core::domain::audio::{AudioError, ChannelCount, Result, SampleRate};
use autoq_core::domain::dsp::{AutoQ, EffectParameters, SignalProcessor};
use std::sync::Arc;
use tracing::{debug, info};

use super::exchange::ParameterReceiver;
use super::meter::{MeterReading, MeterTap};

/// Multichannel Auto-Q processor
pub struct AutoQEngine {
    followers: Vec<AutoQ>,
    channels: ChannelCount,
    sample_rate: SampleRate,
    params: EffectParameters,
    bypassed: bool,
    receiver: Option<ParameterReceiver>,
    meter: Arc<MeterTap>,
}

impl AutoQEngine {
    /// Create an engine with one follower per channel
    pub fn new(sample_rate: SampleRate, channels: ChannelCount, params: EffectParameters) -> Self {
        let followers = (0..channels.count())
            .map(|_| AutoQ::with_parameters(params, sample_rate.as_f64()))
            .collect();

        info!(
            "Auto-Q engine created: channels={}, rate={}Hz",
            channels.count(),
            sample_rate.hz()
        );

        Self {
            followers,
            channels,
            sample_rate,
            params: params.clamped(),
            bypassed: false,
            receiver: None,
            meter: Arc::new(MeterTap::new()),
        }
    }

    /// Attach the audio-thread end of a parameter mailbox
    pub fn with_receiver(mut self, receiver: ParameterReceiver) -> Self {
        self.receiver = Some(receiver);
        self
    }

    /// Shared handle to the metering tap
    pub fn meter(&self) -> Arc<MeterTap> {
        Arc::clone(&self.meter)
    }

    pub fn params(&self) -> EffectParameters {
        self.params
    }

    pub fn channels(&self) -> ChannelCount {
        self.channels
    }

    pub fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }

    /// Follower for one channel
    pub fn channel(&self, index: usize) -> Option<&AutoQ> {
        self.followers.get(index)
    }

    /// Apply a snapshot to every channel
    ///
    /// Returns `false` when nothing changed.
    pub fn set_parameters(&mut self, params: EffectParameters) -> bool {
        let mut changed = false;
        for follower in &mut self.followers {
            changed |= follower.set_parameters(params);
        }
        if changed {
            self.params = params.clamped();
            debug!(
                "Engine parameters swapped: {} fc={:.1}Hz Q={:.3}",
                self.params.filter_algorithm.as_str(),
                self.params.fc,
                self.params.q
            );
        }
        changed
    }

    /// Enable or disable bypass
    ///
    /// Follower state is cleared on every transition so neither direction
    /// replays a stale envelope or filter state.
    pub fn set_bypass(&mut self, bypass: bool) {
        if bypass != self.bypassed {
            self.bypassed = bypass;
            self.reset();
            debug!(bypass, "Engine bypass changed");
        }
    }

    pub fn is_bypassed(&self) -> bool {
        self.bypassed
    }

    /// Clear all follower state
    pub fn reset(&mut self) {
        let rate = self.sample_rate.as_f64();
        for follower in &mut self.followers {
            follower.reset(rate);
        }
    }

    /// Process an interleaved buffer in place
    ///
    /// The buffer must hold a whole number of frames.
    pub fn process_interleaved(&mut self, buffer: &mut [f32]) -> Result<()> {
        let channel_count = self.followers.len();
        if channel_count == 0 || buffer.len() % channel_count != 0 {
            return Err(AudioError::InvalidConfiguration(format!(
                "Buffer of {} samples is not a whole number of {}-channel frames",
                buffer.len(),
                channel_count
            )));
        }

        self.sync_controls();

        if self.bypassed {
            self.meter.publish(&MeterReading::silent());
            return Ok(());
        }

        for frame in buffer.chunks_exact_mut(channel_count) {
            for (sample, follower) in frame.iter_mut().zip(self.followers.iter_mut()) {
                *sample = follower.process_sample(f64::from(*sample)) as f32;
            }
        }

        let reading = MeterReading::from_channels(self.followers.iter().map(AutoQ::metering));
        self.meter.publish(&reading);
        Ok(())
    }

    fn sync_controls(&mut self) {
        let Some(receiver) = self.receiver.as_ref() else {
            return;
        };
        let latest = receiver.latest();
        let bypass = receiver.bypass_requested();

        if let Some(params) = latest {
            self.set_parameters(params);
        }
        self.set_bypass(bypass);
    }
}
