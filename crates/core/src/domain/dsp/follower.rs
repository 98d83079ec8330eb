//! The Auto-Q envelope follower
//!
//! One detector, one modulation computer and one filter, run in that order
//! for every sample so the cutoff applied to sample `n` comes from the level
//! detected at sample `n`.

use super::detector::{AudioDetector, DetectMode, DetectorParams};
use super::filter::{FilterAlgorithm, FilterParams, StateVariableFilter};
use super::modulation::ModulationComputer;
use super::{params, SignalProcessor};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Complete parameter snapshot for one Auto-Q instance
///
/// Hosts replace it wholesale; the follower diffs it against the cached copy
/// and only recomputes what changed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectParameters {
    // Filter parameters
    pub filter_algorithm: FilterAlgorithm,
    pub fc: f64,
    pub q: f64,
    pub output_gain_db: f64,
    pub enable_gain_comp: bool,
    pub match_analog_nyquist: bool,
    pub self_oscillate: bool,
    pub enable_nlp: bool,

    // Detector parameters
    pub attack_ms: f64,
    pub release_ms: f64,
    pub threshold_db: f64,
    pub sensitivity: f64,
}

impl Default for EffectParameters {
    fn default() -> Self {
        Self {
            filter_algorithm: FilterAlgorithm::Lowpass,
            fc: 1000.0,
            q: params::Q_BUTTERWORTH,
            output_gain_db: 0.0,
            enable_gain_comp: false,
            match_analog_nyquist: true,
            self_oscillate: false,
            enable_nlp: true,
            attack_ms: 20.0,
            release_ms: 500.0,
            threshold_db: -6.0,
            sensitivity: 1.0,
        }
    }
}

impl EffectParameters {
    /// Clamp every numeric field into its valid domain
    #[must_use]
    pub fn clamped(&self) -> Self {
        let filter = self.filter_params().clamped();
        let detector = self.detector_params().clamped();
        Self {
            fc: filter.fc,
            q: filter.q,
            output_gain_db: filter.output_gain_db,
            attack_ms: detector.attack_ms,
            release_ms: detector.release_ms,
            threshold_db: self
                .threshold_db
                .max(params::DETECTOR_FLOOR_DB)
                .min(params::THRESHOLD_MAX_DB),
            sensitivity: self
                .sensitivity
                .max(params::SENSITIVITY_MIN)
                .min(params::SENSITIVITY_MAX),
            ..*self
        }
    }

    /// Replace the component-owned fields with the values they hold
    fn accepted_by(&self, filter: &FilterParams, detector: &DetectorParams) -> Self {
        Self {
            filter_algorithm: filter.algorithm,
            fc: filter.fc,
            q: filter.q,
            output_gain_db: filter.output_gain_db,
            enable_gain_comp: filter.enable_gain_comp,
            match_analog_nyquist: filter.match_analog_nyquist,
            self_oscillate: filter.self_oscillate,
            enable_nlp: filter.enable_nlp,
            attack_ms: detector.attack_ms,
            release_ms: detector.release_ms,
            ..*self
        }
    }

    /// The filter's share of the snapshot
    pub fn filter_params(&self) -> FilterParams {
        FilterParams {
            algorithm: self.filter_algorithm,
            fc: self.fc,
            q: self.q,
            output_gain_db: self.output_gain_db,
            enable_gain_comp: self.enable_gain_comp,
            match_analog_nyquist: self.match_analog_nyquist,
            self_oscillate: self.self_oscillate,
            enable_nlp: self.enable_nlp,
        }
    }

    /// The detector's share of the snapshot: RMS, reported in dB, unclamped
    pub fn detector_params(&self) -> DetectorParams {
        DetectorParams {
            attack_ms: self.attack_ms,
            release_ms: self.release_ms,
            mode: DetectMode::Rms,
            detect_db: true,
            clamp_to_unity: false,
        }
    }
}

/// Latest per-sample status, polled by hosts for metering
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metering {
    pub level_db: f64,
    pub threshold_exceeded: bool,
    /// Cutoff applied to the last sample
    pub cutoff: f64,
}

impl Metering {
    fn idle(cutoff: f64) -> Self {
        Self {
            level_db: params::DETECTOR_FLOOR_DB,
            threshold_exceeded: false,
            cutoff,
        }
    }
}

/// Envelope-modulated resonant filter for one channel
#[derive(Debug, Clone)]
pub struct AutoQ {
    params: EffectParameters,
    detector: AudioDetector,
    modulation: ModulationComputer,
    filter: StateVariableFilter,
    metering: Metering,
}

impl AutoQ {
    /// Create a follower with default parameters, silent and ready at 48 kHz
    pub fn new() -> Self {
        let params = EffectParameters::default();
        let mut detector = AudioDetector::new();
        detector.set_parameters(params.detector_params());
        let mut filter = StateVariableFilter::new();
        filter.set_parameters(params.filter_params());

        Self {
            params,
            detector,
            modulation: ModulationComputer::new(&params),
            metering: Metering::idle(filter.cutoff()),
            filter,
        }
    }

    /// Create a follower and reset it for `sample_rate`
    pub fn with_parameters(params: EffectParameters, sample_rate: f64) -> Self {
        let mut follower = Self::new();
        follower.set_parameters(params);
        follower.reset(sample_rate);
        follower
    }

    /// Get current parameter values
    pub fn params(&self) -> EffectParameters {
        self.params
    }

    /// Apply a complete parameter snapshot
    ///
    /// The snapshot is clamped first. Each component then decides what it
    /// accepts, and the stored snapshot mirrors those accepted values, so a
    /// value within the change tolerance of the active one is not taken.
    /// Returns `false` without touching any coefficient when nothing changed.
    pub fn set_parameters(&mut self, params: EffectParameters) -> bool {
        let params = params.clamped();
        if params == self.params {
            return false;
        }

        self.filter.set_parameters(params.filter_params());
        self.detector.set_parameters(params.detector_params());
        let params = params.accepted_by(&self.filter.params(), &self.detector.params());
        if params == self.params {
            return false;
        }

        self.modulation = ModulationComputer::new(&params);
        self.params = params;

        trace!(
            "Auto-Q updated: fc={:.1}Hz Q={:.3} threshold={:.1}dB sensitivity={:.2}",
            params.fc,
            params.q,
            params.threshold_db,
            params.sensitivity
        );
        true
    }

    /// Latest level, threshold status and cutoff
    pub fn metering(&self) -> Metering {
        self.metering
    }

    pub fn level_db(&self) -> f64 {
        self.metering.level_db
    }

    pub fn threshold_exceeded(&self) -> bool {
        self.metering.threshold_exceeded
    }

    pub fn detector(&self) -> &AudioDetector {
        &self.detector
    }

    pub fn filter(&self) -> &StateVariableFilter {
        &self.filter
    }
}

impl Default for AutoQ {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalProcessor for AutoQ {
    fn reset(&mut self, sample_rate: f64) {
        self.filter.reset(sample_rate);
        self.detector.reset(sample_rate);
        self.metering = Metering::idle(self.filter.cutoff());
    }

    #[inline]
    fn process_sample(&mut self, xn: f64) -> f64 {
        // Detector -> modulation -> cutoff -> filter, all on the same sample
        let level_db = self.detector.process_sample(xn);
        let context = self.modulation.compute(level_db);
        self.filter.set_cutoff(context.cutoff);

        self.metering = Metering {
            level_db,
            threshold_exceeded: context.threshold_exceeded,
            cutoff: self.filter.cutoff(),
        };

        self.filter.process_sample(xn)
    }

    fn name(&self) -> &str {
        "AutoQ"
    }
}
