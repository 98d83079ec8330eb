//! Loudness detector
//!
//! A rectifying one-pole envelope follower with separate attack and release
//! time constants. In RMS mode the squared input is smoothed and the square
//! root taken on the way out; in dB mode the linear value is floored at
//! [`params::DETECTOR_FLOOR_DB`] before the log.

use super::{
    flush_underflow, is_float_equal, limit_sample_rate, params, raw_to_db, SignalProcessor,
};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Sample rate assumed until the first `reset`
pub const DEFAULT_SAMPLE_RATE: f64 = 48000.0;

/// How the instantaneous magnitude is computed before smoothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DetectMode {
    /// Absolute value
    Peak,
    /// Squared value, reported as mean square
    MeanSquare,
    /// Squared value, reported as root mean square
    #[default]
    Rms,
}

/// Detector parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectorParams {
    pub attack_ms: f64,
    pub release_ms: f64,
    pub mode: DetectMode,
    /// Report the level in dB instead of linear
    pub detect_db: bool,
    /// Cap the envelope at 1.0
    pub clamp_to_unity: bool,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            attack_ms: 20.0,
            release_ms: 500.0,
            mode: DetectMode::Rms,
            detect_db: true,
            clamp_to_unity: false,
        }
    }
}

impl DetectorParams {
    /// Clamp time constants into the supported range
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            attack_ms: clamp_time_ms(self.attack_ms),
            release_ms: clamp_time_ms(self.release_ms),
            ..self
        }
    }

    fn times_differ(&self, other: &Self) -> bool {
        !is_float_equal(self.attack_ms, other.attack_ms)
            || !is_float_equal(self.release_ms, other.release_ms)
    }
}

/// NaN collapses to the minimum so the coefficients stay finite.
fn clamp_time_ms(ms: f64) -> f64 {
    if ms.is_nan() {
        params::TIME_MIN_MS
    } else {
        ms.clamp(params::TIME_MIN_MS, params::TIME_MAX_MS)
    }
}

/// One-pole coefficient for a time constant: `exp(-1 / (t * fs))`
#[inline]
pub fn time_constant_coeff(time_ms: f64, sample_rate: f64) -> f64 {
    (-1.0 / (time_ms * 0.001 * sample_rate)).exp()
}

/// Envelope detector feeding the modulation computer
#[derive(Debug, Clone, PartialEq)]
pub struct AudioDetector {
    params: DetectorParams,
    sample_rate: f64,
    // Coefficients (pre-computed for performance)
    attack_coeff: f64,
    release_coeff: f64,
    // Smoothed envelope (linear, squared in MS/RMS modes)
    envelope: f64,
    coefficient_updates: u64,
}

impl AudioDetector {
    /// Create a detector with default parameters, silent and ready at 48 kHz
    pub fn new() -> Self {
        let mut detector = Self {
            params: DetectorParams::default(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            envelope: 0.0,
            coefficient_updates: 0,
        };
        detector.update_coefficients();
        detector
    }

    /// Get current parameter values
    pub fn params(&self) -> DetectorParams {
        self.params
    }

    /// Set all parameters at once
    ///
    /// Time constants are compared with an epsilon so that values which only
    /// differ by round-trip noise do not trigger a recomputation. Returns
    /// `true` if anything changed.
    pub fn set_parameters(&mut self, params: DetectorParams) -> bool {
        let params = params.clamped();
        if params == self.params {
            return false;
        }

        let recalc = params.times_differ(&self.params);
        self.params = params;
        if recalc {
            self.update_coefficients();
        }
        true
    }

    /// Convert time constants to filter coefficients
    fn update_coefficients(&mut self) {
        self.attack_coeff = time_constant_coeff(self.params.attack_ms, self.sample_rate);
        self.release_coeff = time_constant_coeff(self.params.release_ms, self.sample_rate);
        self.coefficient_updates += 1;

        trace!(
            "Detector updated: attack={:.2}ms, release={:.2}ms @ {:.0}Hz",
            self.params.attack_ms,
            self.params.release_ms,
            self.sample_rate
        );
    }

    /// Current smoothed envelope (linear; squared in MS/RMS modes)
    pub fn envelope(&self) -> f64 {
        self.envelope
    }

    /// Number of times the time-constant coefficients were recomputed
    pub fn coefficient_updates(&self) -> u64 {
        self.coefficient_updates
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
}

impl Default for AudioDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalProcessor for AudioDetector {
    fn reset(&mut self, sample_rate: f64) {
        self.sample_rate = limit_sample_rate(sample_rate);
        self.envelope = 0.0;
        self.update_coefficients();
    }

    #[inline]
    fn process_sample(&mut self, xn: f64) -> f64 {
        let mut input = xn.abs();
        if self.params.mode != DetectMode::Peak {
            input *= input;
        }

        // Use attack coefficient for rising, release for falling
        let coeff = if input > self.envelope {
            self.attack_coeff
        } else {
            self.release_coeff
        };

        let mut envelope = flush_underflow(coeff * (self.envelope - input) + input);
        if self.params.clamp_to_unity {
            envelope = envelope.min(1.0);
        }
        envelope = envelope.max(0.0);
        self.envelope = envelope;

        let level = if self.params.mode == DetectMode::Rms {
            envelope.sqrt()
        } else {
            envelope
        };

        if self.params.detect_db {
            raw_to_db(level)
        } else {
            level
        }
    }

    fn name(&self) -> &str {
        "AudioDetector"
    }
}
