//! Domain entities and business rules

pub mod audio;
pub mod config;
pub mod dsp;

// Re-export specific items to avoid ambiguous glob imports
pub use audio::{AudioError, ChannelCount, SampleRate};
pub use config::{AppConfig, AutoQConfig, ConfigError, ConfigManager, Preset, PresetManager};
pub use dsp::{
    AudioDetector, AutoQ, DetectMode, DetectorParams, EffectParameters, FilterAlgorithm,
    FilterParams, Metering, ModulationComputer, ModulationContext, SignalProcessor,
    StateVariableFilter,
};
