//! Digital Signal Processing for the Auto-Q envelope filter
//!
//! The effect is a pipeline of three objects, run once per sample:
//! - [`AudioDetector`]: rectifies and smooths the input into a level in dB
//! - [`ModulationComputer`]: turns the level into a cutoff above the threshold
//! - [`StateVariableFilter`]: a zero-delay-feedback two-pole SVF
//!
//! [`AutoQ`] wires them together. All of them are designed for:
//! - Zero allocations in the hot path
//! - Bounded, input-independent work per sample
//! - Coefficient recomputation only when an input actually changed

pub mod detector;
pub mod filter;
pub mod follower;
pub mod modulation;

pub use detector::{AudioDetector, DetectMode, DetectorParams};
pub use filter::{FilterAlgorithm, FilterParams, StateVariableFilter};
pub use follower::{AutoQ, EffectParameters, Metering};
pub use modulation::{compute_cutoff, unipolar_from_min, ModulationComputer, ModulationContext};

/// Core trait for the per-sample processors
///
/// Every object in the chain processes one `f64` sample at a time and is
/// reset with the stream sample rate before first use.
pub trait SignalProcessor: Send {
    /// Clear internal state and recompute rate-dependent coefficients
    fn reset(&mut self, sample_rate: f64);

    /// Process a single sample
    ///
    /// # Requirements
    /// - No allocations, locks, or I/O
    /// - Bounded work independent of the input value
    fn process_sample(&mut self, xn: f64) -> f64;

    /// Process a buffer of samples in-place
    fn process(&mut self, buffer: &mut [f64]) {
        for sample in buffer.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }

    /// Get processor name for debugging/display
    fn name(&self) -> &str;
}

/// Parameter constraints for the Auto-Q chain
///
/// Out-of-range values handed to `set_parameters` are clamped to these ranges
/// and the clamped value becomes the active one.
pub mod params {
    /// Lowest cutoff the filter accepts (Hz)
    pub const MIN_FILTER_FREQUENCY: f64 = 20.0;
    /// Modulation ceiling and highest base cutoff (Hz)
    pub const MAX_FILTER_FREQUENCY: f64 = 20480.0;
    /// Cutoff is additionally held below this fraction of the sample rate
    pub const NYQUIST_LIMIT_RATIO: f64 = 0.49;

    /// Resonance range
    pub const Q_MIN: f64 = 0.1;
    pub const Q_MAX: f64 = 40.0;
    /// Q at which the SVF response stops peaking
    pub const Q_BUTTERWORTH: f64 = 0.707;

    /// Detector time constant range in milliseconds
    pub const TIME_MIN_MS: f64 = 0.01;
    pub const TIME_MAX_MS: f64 = 10_000.0;

    /// Level reported for silence; also the lowest usable threshold
    pub const DETECTOR_FLOOR_DB: f64 = -96.0;
    pub const THRESHOLD_MAX_DB: f64 = 0.0;

    /// Sensitivity scales the linear overshoot before the unipolar warp
    pub const SENSITIVITY_MIN: f64 = 0.0;
    pub const SENSITIVITY_MAX: f64 = 20.0;

    /// Output trim range in dB
    pub const GAIN_MIN_DB: f64 = -60.0;
    pub const GAIN_MAX_DB: f64 = 24.0;

    /// Sample rates handed to `reset` are held inside this range. The floor
    /// keeps `0.49 * fs` above [`MIN_FILTER_FREQUENCY`].
    pub const SAMPLE_RATE_MIN: f64 = 8000.0;
    pub const SAMPLE_RATE_MAX: f64 = 768_000.0;

    /// Tolerance for deciding whether a float parameter changed
    pub const PARAM_EPSILON: f64 = f32::EPSILON as f64;
}

/// Smallest positive normal `f32`; anything closer to zero is flushed
const UNDERFLOW_LIMIT: f64 = f32::MIN_POSITIVE as f64;

/// Convert decibels to a linear amplitude factor
#[inline]
pub fn db_to_raw(db: f64) -> f64 {
    10.0_f64.powf(db / 20.0)
}

/// Convert a linear amplitude to decibels, floored at the detector floor
#[inline]
pub fn raw_to_db(raw: f64) -> f64 {
    let floor = db_to_raw(params::DETECTOR_FLOOR_DB);
    20.0 * raw.max(floor).log10()
}

/// Hold a sample rate inside the supported range; NaN lands on the floor
#[inline]
pub fn limit_sample_rate(sample_rate: f64) -> f64 {
    sample_rate
        .max(params::SAMPLE_RATE_MIN)
        .min(params::SAMPLE_RATE_MAX)
}

/// Float comparison used for parameter diffing
#[inline]
pub fn is_float_equal(a: f64, b: f64) -> bool {
    (a - b).abs() < params::PARAM_EPSILON
}

/// Flush values too small to matter to exactly zero
#[inline]
pub(crate) fn flush_underflow(value: f64) -> f64 {
    if value.abs() < UNDERFLOW_LIMIT {
        0.0
    } else {
        value
    }
}
