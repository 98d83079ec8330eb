//! Command-line arguments

use autoq_core::domain::dsp::{EffectParameters, FilterAlgorithm};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "autoq")]
#[command(version, about = "Envelope-driven resonant filter", long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration directory (defaults to the per-user config dir)
    #[arg(long, global = true, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Process a WAV file through the filter
    Render(RenderArgs),

    /// Manage presets
    #[command(subcommand)]
    Presets(PresetCommand),

    /// Print the filter response and modulation curve for a setting
    Inspect(InspectArgs),
}

#[derive(Args)]
pub struct RenderArgs {
    /// Input WAV file
    pub input: PathBuf,

    /// Output WAV file (32-bit float)
    pub output: PathBuf,

    #[command(flatten)]
    pub source: EffectSource,

    /// Frames per processing block (defaults to the configured block size)
    #[arg(long)]
    pub block_size: Option<u32>,

    /// Copy input to output without filtering
    #[arg(long)]
    pub bypass: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum PresetCommand {
    /// List presets in the preset directory
    List,

    /// Print a preset as TOML
    Show {
        name: String,
    },

    /// Write the factory presets into the preset directory
    Install {
        /// Replace presets that already exist
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args)]
pub struct InspectArgs {
    #[command(flatten)]
    pub source: EffectSource,

    /// Sample rate to evaluate at (defaults to the configured rate)
    #[arg(long)]
    pub sample_rate: Option<u32>,

    /// Frequencies to evaluate (Hz)
    #[arg(long, value_delimiter = ',')]
    pub freqs: Option<Vec<f64>>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Where the effect parameters come from, plus per-field overrides
#[derive(Args)]
pub struct EffectSource {
    /// Named preset (preset directory first, then factory presets)
    #[arg(long, conflicts_with = "config")]
    pub preset: Option<String>,

    /// Configuration file whose [effect] table is used
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: EffectOverrides,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Topology {
    #[value(alias = "lp")]
    Lowpass,
    #[value(alias = "hp")]
    Highpass,
    #[value(alias = "bp")]
    Bandpass,
}

impl From<Topology> for FilterAlgorithm {
    fn from(topology: Topology) -> Self {
        match topology {
            Topology::Lowpass => FilterAlgorithm::Lowpass,
            Topology::Highpass => FilterAlgorithm::Highpass,
            Topology::Bandpass => FilterAlgorithm::Bandpass,
        }
    }
}

#[derive(Args, Default)]
pub struct EffectOverrides {
    /// Filter topology
    #[arg(long, value_enum)]
    pub algorithm: Option<Topology>,

    /// Base cutoff (Hz)
    #[arg(long)]
    pub fc: Option<f64>,

    /// Resonance
    #[arg(long)]
    pub q: Option<f64>,

    /// Output trim (dB)
    #[arg(long, allow_negative_numbers = true)]
    pub gain: Option<f64>,

    /// Detector attack (ms)
    #[arg(long)]
    pub attack: Option<f64>,

    /// Detector release (ms)
    #[arg(long)]
    pub release: Option<f64>,

    /// Modulation threshold (dB)
    #[arg(long, allow_negative_numbers = true)]
    pub threshold: Option<f64>,

    /// Modulation sensitivity
    #[arg(long)]
    pub sensitivity: Option<f64>,

    /// Compensate the resonant peak
    #[arg(long)]
    pub gain_comp: bool,

    /// Remove all damping
    #[arg(long)]
    pub self_oscillate: bool,

    /// Disable the soft clipper in the resonance path
    #[arg(long)]
    pub no_nlp: bool,

    /// Disable analog Nyquist matching on the low-pass output
    #[arg(long)]
    pub no_nyquist_match: bool,
}

impl EffectOverrides {
    /// Overlay the given overrides onto `base`
    pub fn apply(&self, base: EffectParameters) -> EffectParameters {
        let mut params = base;
        if let Some(algorithm) = self.algorithm {
            params.filter_algorithm = algorithm.into();
        }
        if let Some(fc) = self.fc {
            params.fc = fc;
        }
        if let Some(q) = self.q {
            params.q = q;
        }
        if let Some(gain) = self.gain {
            params.output_gain_db = gain;
        }
        if let Some(attack) = self.attack {
            params.attack_ms = attack;
        }
        if let Some(release) = self.release {
            params.release_ms = release;
        }
        if let Some(threshold) = self.threshold {
            params.threshold_db = threshold;
        }
        if let Some(sensitivity) = self.sensitivity {
            params.sensitivity = sensitivity;
        }
        params.enable_gain_comp |= self.gain_comp;
        params.self_oscillate |= self.self_oscillate;
        if self.no_nlp {
            params.enable_nlp = false;
        }
        if self.no_nyquist_match {
            params.match_analog_nyquist = false;
        }
        params
    }
}
