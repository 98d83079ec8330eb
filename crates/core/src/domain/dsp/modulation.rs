//! Threshold-driven cutoff modulation
//!
//! The detected level and the threshold are compared as linear amplitudes.
//! Below the threshold the base cutoff passes through unchanged; above it the
//! overshoot, scaled by the sensitivity, drives a unipolar sweep from the base
//! cutoff up to [`params::MAX_FILTER_FREQUENCY`].

use super::follower::EffectParameters;
use super::{db_to_raw, params};

/// Per-sample modulation result
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModulationContext {
    /// Detected level minus threshold, linear
    pub delta: f64,
    pub threshold_exceeded: bool,
    /// Cutoff to apply to the filter for this sample
    pub cutoff: f64,
}

/// Map a unipolar modulator onto `[min_value, max_value]`
///
/// The modulator is bounded to `[0, 1]` first (NaN counts as 0), so the result
/// never leaves the range however large the modulator gets.
#[inline]
pub fn unipolar_from_min(modulator: f64, min_value: f64, max_value: f64) -> f64 {
    let modulator = modulator.max(0.0).min(1.0);
    (modulator * (max_value - min_value) + min_value).min(max_value)
}

/// Cached threshold/sensitivity state for the per-sample cutoff computation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModulationComputer {
    threshold_linear: f64,
    sensitivity: f64,
    base_fc: f64,
}

impl ModulationComputer {
    /// Pre-compute the linear threshold from a (clamped) parameter snapshot
    pub fn new(params: &EffectParameters) -> Self {
        let params = params.clamped();
        Self {
            threshold_linear: db_to_raw(params.threshold_db),
            sensitivity: params.sensitivity,
            base_fc: params.fc,
        }
    }

    /// Compute the cutoff for a detected level in dB
    #[inline]
    pub fn compute(&self, level_db: f64) -> ModulationContext {
        let delta = db_to_raw(level_db) - self.threshold_linear;

        if delta > 0.0 {
            ModulationContext {
                delta,
                threshold_exceeded: true,
                cutoff: unipolar_from_min(
                    delta * self.sensitivity,
                    self.base_fc,
                    params::MAX_FILTER_FREQUENCY,
                ),
            }
        } else {
            ModulationContext {
                delta,
                threshold_exceeded: false,
                cutoff: self.base_fc,
            }
        }
    }

    pub fn threshold_linear(&self) -> f64 {
        self.threshold_linear
    }

    pub fn base_fc(&self) -> f64 {
        self.base_fc
    }
}

impl Default for ModulationComputer {
    fn default() -> Self {
        Self::new(&EffectParameters::default())
    }
}

/// Cutoff for `level_db` under `params`
pub fn compute_cutoff(level_db: f64, params: &EffectParameters) -> f64 {
    ModulationComputer::new(params).compute(level_db).cutoff
}
