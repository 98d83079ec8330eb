//! Configuration management for Auto-Q
//!
//! This module provides:
//! - Application settings and the effect parameter snapshot, as TOML
//! - Named presets stored one per file in a preset directory
//! - A built-in set of factory presets
//! - The per-user configuration file with corrupt-file recovery

use crate::domain::audio::SampleRate;
use crate::domain::dsp::{params, EffectParameters, FilterAlgorithm};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, error, info, instrument, warn};

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur during configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Preset not found: {0}")]
    PresetNotFound(String),
}

/// Largest processing block accepted, in frames
pub const MAX_BLOCK_SIZE: u32 = 65_536;

/// Application-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Processing sample rate used when no input file dictates one
    pub sample_rate: u32,

    /// Frames processed per block
    pub block_size: u32,

    /// Preset directory
    pub preset_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            block_size: 512,
            preset_dir: PathBuf::from("presets"),
        }
    }
}

impl AppConfig {
    /// Check sample rate and block size
    pub fn validate(&self) -> Result<()> {
        SampleRate::validated(self.sample_rate)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if self.block_size == 0 || self.block_size > MAX_BLOCK_SIZE {
            return Err(ConfigError::Invalid(format!(
                "Block size must be between 1 and {} frames, got {}",
                MAX_BLOCK_SIZE, self.block_size
            )));
        }
        Ok(())
    }
}

/// Complete Auto-Q configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoQConfig {
    pub app: AppConfig,
    pub effect: EffectParameters,
}

impl AutoQConfig {
    /// Load configuration from TOML file
    #[instrument(skip(path))]
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        let contents = fs::read_to_string(path).await?;
        let config: Self = toml::from_str(&contents)?;
        config.app.validate()?;

        debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Save configuration to TOML file
    #[instrument(skip(self, path))]
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        info!(path = %path.display(), "Saving configuration");

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let toml_str = toml::to_string_pretty(self)?;
        fs::write(path, toml_str).await?;

        debug!("Configuration saved successfully");
        Ok(())
    }
}

/// A named effect setting stored as `<preset_dir>/<name>.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub effect: EffectParameters,
}

impl Preset {
    pub fn new(name: impl Into<String>, description: impl Into<String>, effect: EffectParameters) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            effect,
        }
    }

    /// Presets shipped with the application
    pub fn factory_presets() -> Vec<Preset> {
        vec![
            Preset::new(
                "default",
                "Low-pass opening from 1 kHz above -6 dB",
                EffectParameters::default(),
            ),
            Preset::new(
                "wah",
                "High-Q band-pass wah with a fast attack",
                EffectParameters {
                    filter_algorithm: FilterAlgorithm::Bandpass,
                    fc: 350.0,
                    q: 12.0,
                    enable_gain_comp: true,
                    attack_ms: 5.0,
                    release_ms: 150.0,
                    threshold_db: -24.0,
                    sensitivity: 4.0,
                    ..Default::default()
                },
            ),
            Preset::new(
                "self-oscillating-sweep",
                "Self-oscillating low-pass swept by the input envelope",
                EffectParameters {
                    fc: 200.0,
                    self_oscillate: true,
                    enable_nlp: true,
                    output_gain_db: -12.0,
                    attack_ms: 50.0,
                    release_ms: 1000.0,
                    threshold_db: -30.0,
                    sensitivity: 2.0,
                    ..Default::default()
                },
            ),
            Preset::new(
                "gentle-opener",
                "Soft high-pass that thins out loud passages",
                EffectParameters {
                    filter_algorithm: FilterAlgorithm::Highpass,
                    fc: 40.0,
                    q: params::Q_BUTTERWORTH,
                    attack_ms: 100.0,
                    release_ms: 2000.0,
                    threshold_db: -12.0,
                    sensitivity: 0.05,
                    ..Default::default()
                },
            ),
        ]
    }

    /// Look up a factory preset by name
    pub fn factory(name: &str) -> Option<Preset> {
        Self::factory_presets().into_iter().find(|p| p.name == name)
    }
}

/// Preset manager
pub struct PresetManager {
    preset_dir: PathBuf,
}

impl PresetManager {
    /// Create a new preset manager
    pub fn new(preset_dir: PathBuf) -> Self {
        Self { preset_dir }
    }

    pub fn preset_dir(&self) -> &Path {
        &self.preset_dir
    }

    fn preset_path(&self, name: &str) -> Result<PathBuf> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(ConfigError::Invalid(format!("Invalid preset name: {:?}", name)));
        }
        Ok(self.preset_dir.join(format!("{}.toml", name)))
    }

    /// List all available presets
    #[instrument(skip(self))]
    pub async fn list_presets(&self) -> Result<Vec<String>> {
        let mut presets = Vec::new();

        let mut entries = match fs::read_dir(&self.preset_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.preset_dir.display(), "Preset directory missing");
                return Ok(presets);
            }
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map(|e| e == "toml").unwrap_or(false) {
                if let Some(name) = path.file_stem().and_then(|n| n.to_str()) {
                    presets.push(name.to_string());
                }
            }
        }

        presets.sort();
        debug!(count = presets.len(), "Listed presets");
        Ok(presets)
    }

    /// Load a preset by name
    #[instrument(skip(self))]
    pub async fn load_preset(&self, name: &str) -> Result<Preset> {
        let path = self.preset_path(name)?;

        if !path.exists() {
            return Err(ConfigError::PresetNotFound(name.to_string()));
        }

        let contents = fs::read_to_string(&path).await?;
        let preset: Preset = toml::from_str(&contents)?;
        debug!(name, "Preset loaded");
        Ok(preset)
    }

    /// Save a preset under its own name
    #[instrument(skip(self, preset), fields(name = %preset.name))]
    pub async fn save_preset(&self, preset: &Preset) -> Result<()> {
        let path = self.preset_path(&preset.name)?;
        fs::create_dir_all(&self.preset_dir).await?;

        let toml_str = toml::to_string_pretty(preset)?;
        fs::write(&path, toml_str).await?;
        info!(path = %path.display(), "Preset saved");
        Ok(())
    }

    /// Delete a preset by name
    #[instrument(skip(self))]
    pub async fn delete_preset(&self, name: &str) -> Result<()> {
        let path = self.preset_path(name)?;

        if !path.exists() {
            return Err(ConfigError::PresetNotFound(name.to_string()));
        }

        fs::remove_file(&path).await?;
        info!(name, "Preset deleted");
        Ok(())
    }

    /// Check if a preset exists
    pub async fn preset_exists(&self, name: &str) -> bool {
        match self.preset_path(name) {
            Ok(path) => fs::try_exists(path).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Write the factory presets, leaving existing files alone unless `overwrite`
    ///
    /// Returns the names actually written.
    #[instrument(skip(self))]
    pub async fn install_factory_presets(&self, overwrite: bool) -> Result<Vec<String>> {
        let mut installed = Vec::new();
        for preset in Preset::factory_presets() {
            if !overwrite && self.preset_exists(&preset.name).await {
                debug!(name = %preset.name, "Keeping existing preset");
                continue;
            }
            self.save_preset(&preset).await?;
            installed.push(preset.name);
        }

        info!(count = installed.len(), "Factory presets installed");
        Ok(installed)
    }

    /// Resolve a preset from disk, falling back to the factory set
    pub async fn resolve(&self, name: &str) -> Result<Preset> {
        match self.load_preset(name).await {
            Err(ConfigError::PresetNotFound(_)) => {
                Preset::factory(name).ok_or_else(|| ConfigError::PresetNotFound(name.to_string()))
            }
            other => other,
        }
    }
}

/// Configuration manager for the main Auto-Q config
///
/// Manages the main configuration file at `~/.config/autoq/config.toml`.
pub struct ConfigManager {
    config_dir: PathBuf,
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager rooted at `config_dir`
    pub fn new(config_dir: PathBuf) -> Self {
        let config_path = config_dir.join("config.toml");
        Self {
            config_dir,
            config_path,
        }
    }

    /// Get the default config directory path
    ///
    /// Returns `~/.config/autoq` on Linux, the platform equivalent elsewhere.
    pub fn default_config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("autoq"))
            .ok_or_else(|| ConfigError::Invalid("Could not determine config directory".to_string()))
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Get the config file path
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Preset directory, resolved against the config directory when relative
    pub fn preset_dir(&self, config: &AutoQConfig) -> PathBuf {
        if config.app.preset_dir.is_absolute() {
            config.app.preset_dir.clone()
        } else {
            self.config_dir.join(&config.app.preset_dir)
        }
    }

    /// Load configuration from file
    ///
    /// A missing file yields the defaults (and writes them out). A corrupt
    /// file is copied aside as `config.toml.corrupt` and the defaults are used.
    #[instrument(skip(self))]
    pub async fn load(&self) -> AutoQConfig {
        if !self.config_path.exists() {
            info!(
                path = %self.config_path.display(),
                "Config file not found, creating default"
            );

            let config = AutoQConfig::default();
            if let Err(e) = self.save(&config).await {
                warn!(
                    path = %self.config_path.display(),
                    error = %e,
                    "Failed to save default config"
                );
            }
            return config;
        }

        match AutoQConfig::load_from_file(&self.config_path).await {
            Ok(config) => config,
            Err(e) => {
                error!(
                    path = %self.config_path.display(),
                    error = %e,
                    "Failed to load config, using defaults"
                );

                let backup_path = self.config_path.with_extension("toml.corrupt");
                if let Err(copy_err) = fs::copy(&self.config_path, &backup_path).await {
                    error!(
                        path = %backup_path.display(),
                        error = %copy_err,
                        "Failed to backup corrupt config"
                    );
                }

                AutoQConfig::default()
            }
        }
    }

    /// Save configuration to file
    #[instrument(skip(self, config))]
    pub async fn save(&self, config: &AutoQConfig) -> Result<()> {
        config.app.validate()?;
        fs::create_dir_all(&self.config_dir).await?;
        config.save_to_file(&self.config_path).await
    }

    /// Check if config file exists
    pub fn exists(&self) -> bool {
        self.config_path.exists()
    }
}
