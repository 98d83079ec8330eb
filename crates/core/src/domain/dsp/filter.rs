//! Zero-delay-feedback state-variable filter
//!
//! Topology-preserving two-pole SVF with low-pass, high-pass and band-pass
//! taps of the same integrator pair. Coefficients use the pre-warped tangent
//! mapping `g = tan(pi * fc / fs)`, so the analog prototype response is kept
//! up to the top of the band.
//!
//! Optional behaviours:
//! - Nyquist matching (LP only) adds a scaled copy of the first integrator so
//!   the gain near Nyquist follows the analog prototype instead of falling to
//!   zero
//! - Self-oscillation removes the damping term entirely
//! - Gain compensation attenuates the input by half of the resonant peak
//! - NLP soft-clips the band-pass node before it feeds the second integrator
//!
//! Cutoff is clamped to `[20 Hz, min(20480 Hz, 0.49 * fs)]` and Q to
//! `[0.1, 40]`.

use super::detector::DEFAULT_SAMPLE_RATE;
use super::{
    db_to_raw, flush_underflow, is_float_equal, limit_sample_rate, params, SignalProcessor,
};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::trace;

/// Which tap of the SVF is returned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FilterAlgorithm {
    #[default]
    Lowpass,
    Highpass,
    Bandpass,
}

impl FilterAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterAlgorithm::Lowpass => "lowpass",
            FilterAlgorithm::Highpass => "highpass",
            FilterAlgorithm::Bandpass => "bandpass",
        }
    }
}

/// Filter parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterParams {
    pub algorithm: FilterAlgorithm,
    /// Base cutoff in Hz
    pub fc: f64,
    pub q: f64,
    pub output_gain_db: f64,
    pub enable_gain_comp: bool,
    pub match_analog_nyquist: bool,
    pub self_oscillate: bool,
    pub enable_nlp: bool,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            algorithm: FilterAlgorithm::Lowpass,
            fc: 1000.0,
            q: params::Q_BUTTERWORTH,
            output_gain_db: 0.0,
            enable_gain_comp: false,
            match_analog_nyquist: true,
            self_oscillate: false,
            enable_nlp: true,
        }
    }
}

impl FilterParams {
    /// Clamp every numeric field into its valid domain
    ///
    /// NaN fields fall back to the lower bound.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            fc: self
                .fc
                .max(params::MIN_FILTER_FREQUENCY)
                .min(params::MAX_FILTER_FREQUENCY),
            q: self.q.max(params::Q_MIN).min(params::Q_MAX),
            output_gain_db: self
                .output_gain_db
                .max(params::GAIN_MIN_DB)
                .min(params::GAIN_MAX_DB),
            ..self
        }
    }

    /// True if any field differs, comparing floats with an epsilon
    pub fn differs_from(&self, other: &Self) -> bool {
        self.algorithm != other.algorithm
            || !is_float_equal(self.fc, other.fc)
            || !is_float_equal(self.q, other.q)
            || !is_float_equal(self.output_gain_db, other.output_gain_db)
            || self.enable_gain_comp != other.enable_gain_comp
            || self.match_analog_nyquist != other.match_analog_nyquist
            || self.self_oscillate != other.self_oscillate
            || self.enable_nlp != other.enable_nlp
    }
}

/// Peak gain of the resonant response in dB; zero when the response does not
/// peak
pub fn peak_gain_db_for_q(q: f64) -> f64 {
    if q <= params::Q_BUTTERWORTH {
        return 0.0;
    }
    20.0 * (q * q / (q * q - 0.25).sqrt()).log10()
}

/// Stateless saturator with unity slope at the origin
#[inline]
pub fn soft_clip(xn: f64) -> f64 {
    xn.signum() * (1.0 - (-xn.abs()).exp())
}

/// Two-pole state-variable filter with a per-sample modulated cutoff
#[derive(Debug, Clone, PartialEq)]
pub struct StateVariableFilter {
    params: FilterParams,
    sample_rate: f64,
    max_cutoff: f64,
    /// Effective (possibly modulated) cutoff
    cutoff: f64,
    // Frequency-dependent coefficients
    alpha: f64,
    alpha0: f64,
    rho: f64,
    analog_match_sigma: f64,
    // Q and flag dependent coefficients
    damping: f64,
    gain_comp: f64,
    output_gain: f64,
    integrator_z: [f64; 2],
    coefficient_updates: u64,
    frequency_updates: u64,
}

impl StateVariableFilter {
    /// Create a filter with default parameters, silent and ready at 48 kHz
    pub fn new() -> Self {
        let params = FilterParams::default();
        let mut filter = Self {
            params,
            sample_rate: DEFAULT_SAMPLE_RATE,
            max_cutoff: Self::cutoff_ceiling(DEFAULT_SAMPLE_RATE),
            cutoff: params.fc,
            alpha: 0.0,
            alpha0: 0.0,
            rho: 0.0,
            analog_match_sigma: 0.0,
            damping: 0.0,
            gain_comp: 1.0,
            output_gain: 1.0,
            integrator_z: [0.0; 2],
            coefficient_updates: 0,
            frequency_updates: 0,
        };
        filter.update_coefficients();
        filter
    }

    fn cutoff_ceiling(sample_rate: f64) -> f64 {
        params::MAX_FILTER_FREQUENCY.min(params::NYQUIST_LIMIT_RATIO * sample_rate)
    }

    /// Get current parameter values
    pub fn params(&self) -> FilterParams {
        self.params
    }

    /// Set all parameters at once
    ///
    /// Nothing is recomputed if the snapshot matches the cached one. A change
    /// also moves the effective cutoff back to the base `fc`. Returns `true`
    /// if anything changed.
    pub fn set_parameters(&mut self, params: FilterParams) -> bool {
        let params = params.clamped();
        if !params.differs_from(&self.params) {
            return false;
        }
        self.params = params;
        self.update_coefficients();
        true
    }

    /// Move the effective cutoff
    ///
    /// This is the per-sample hot path: only the frequency-dependent terms are
    /// recomputed, and nothing at all if the (clamped) cutoff is unchanged.
    #[inline]
    pub fn set_cutoff(&mut self, fc: f64) {
        let fc = self.limit_cutoff(fc);
        if fc == self.cutoff {
            return;
        }
        self.cutoff = fc;
        self.update_frequency_terms();
    }

    /// `max`/`min` rather than `clamp` so NaN lands on the floor
    #[inline]
    fn limit_cutoff(&self, fc: f64) -> f64 {
        fc.max(params::MIN_FILTER_FREQUENCY).min(self.max_cutoff)
    }

    /// Recompute Q and flag dependent terms, then the frequency terms
    fn update_coefficients(&mut self) {
        self.damping = if self.params.self_oscillate {
            0.0
        } else {
            1.0 / (2.0 * self.params.q)
        };

        self.gain_comp = if self.params.enable_gain_comp {
            let peak_db = peak_gain_db_for_q(self.params.q);
            if peak_db > 0.0 {
                db_to_raw(-peak_db / 2.0)
            } else {
                1.0
            }
        } else {
            1.0
        };

        self.output_gain = db_to_raw(self.params.output_gain_db);
        self.cutoff = self.limit_cutoff(self.params.fc);
        self.update_frequency_terms();
        self.coefficient_updates += 1;

        trace!(
            "SVF updated: {} fc={:.1}Hz Q={:.3} gain={:.1}dB comp={} nyquist={} osc={} nlp={}",
            self.params.algorithm.as_str(),
            self.cutoff,
            self.params.q,
            self.params.output_gain_db,
            self.params.enable_gain_comp,
            self.params.match_analog_nyquist,
            self.params.self_oscillate,
            self.params.enable_nlp
        );
    }

    #[inline]
    fn update_frequency_terms(&mut self) {
        let g = (PI * self.cutoff / self.sample_rate).tan();
        self.alpha = g;
        self.alpha0 = 1.0 / (1.0 + 2.0 * self.damping * g + g * g);
        self.rho = 2.0 * self.damping + g;

        let f_o = (self.sample_rate / 2.0) / self.cutoff;
        self.analog_match_sigma = 1.0 / (g * f_o * f_o);
        self.frequency_updates += 1;
    }

    /// Magnitude of the linear transfer function at `freq_hz`
    ///
    /// Ignores the NLP stage. Includes Nyquist matching, gain compensation and
    /// output trim. `freq_hz` is limited to just below Nyquist.
    pub fn magnitude_response(&self, freq_hz: f64) -> f64 {
        let freq = freq_hz.max(0.0).min(0.4999 * self.sample_rate);
        let z = Complex64::from_polar(1.0, 2.0 * PI * freq / self.sample_rate);
        let one = Complex64::new(1.0, 0.0);
        let v = (z - one) / (z + one);

        let g = self.alpha;
        let denominator = v * v + v * (2.0 * self.damping * g) + g * g;
        let lpf = Complex64::new(g * g, 0.0) / denominator;
        let bpf = v * g / denominator;
        let hpf = v * v / denominator;

        let response = match self.params.algorithm {
            FilterAlgorithm::Lowpass if self.params.match_analog_nyquist => {
                lpf + bpf * 2.0 * self.analog_match_sigma / (z + one)
            }
            FilterAlgorithm::Lowpass => lpf,
            FilterAlgorithm::Highpass => hpf,
            FilterAlgorithm::Bandpass => bpf,
        };

        response.norm() * self.gain_comp * self.output_gain
    }

    /// Effective cutoff after modulation and clamping
    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    /// Highest cutoff reachable at the current sample rate
    pub fn max_cutoff(&self) -> f64 {
        self.max_cutoff
    }

    /// Number of full coefficient recomputations
    pub fn coefficient_updates(&self) -> u64 {
        self.coefficient_updates
    }

    /// Number of frequency-term recomputations (includes full ones)
    pub fn frequency_updates(&self) -> u64 {
        self.frequency_updates
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
}

impl Default for StateVariableFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalProcessor for StateVariableFilter {
    fn reset(&mut self, sample_rate: f64) {
        self.sample_rate = limit_sample_rate(sample_rate);
        self.max_cutoff = Self::cutoff_ceiling(self.sample_rate);
        self.integrator_z = [0.0; 2];
        self.update_coefficients();
    }

    #[inline]
    fn process_sample(&mut self, xn: f64) -> f64 {
        let xn = xn * self.gain_comp;
        let [z1, z2] = self.integrator_z;

        // HP first, then the two integrator taps
        let hpf = self.alpha0 * (xn - self.rho * z1 - z2);
        let mut bpf = self.alpha * hpf + z1;
        if self.params.enable_nlp {
            bpf = soft_clip(bpf);
        }
        let lpf = self.alpha * bpf + z2;

        self.integrator_z = [
            flush_underflow(self.alpha * hpf + bpf),
            flush_underflow(self.alpha * bpf + lpf),
        ];

        let yn = match self.params.algorithm {
            FilterAlgorithm::Lowpass if self.params.match_analog_nyquist => {
                lpf + self.analog_match_sigma * z1
            }
            FilterAlgorithm::Lowpass => lpf,
            FilterAlgorithm::Highpass => hpf,
            FilterAlgorithm::Bandpass => bpf,
        };

        yn * self.output_gain
    }

    fn name(&self) -> &str {
        "StateVariableFilter"
    }
}
