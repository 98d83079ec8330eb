//! Offline rendering of WAV files through the Auto-Q engine
//!
//! Input may be any integer or float WAV hound can read. Output is always
//! 32-bit float with the input's channel count and sample rate. Processing
//! runs block by block exactly as a real-time host would call the engine.

use autoq_core::domain::audio::{AudioError, ChannelCount, SampleRate};
use autoq_core::domain::dsp::{raw_to_db, EffectParameters};
use serde::Serialize;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use super::engine::AutoQEngine;

pub type Result<T> = std::result::Result<T, RenderError>;

/// Errors that can occur while rendering
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error("Invalid render options: {0}")]
    InvalidOptions(String),
}

/// Rendering options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Frames per engine call
    pub block_size: usize,
    /// Pass audio through untouched
    pub bypass: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            block_size: 512,
            bypass: false,
        }
    }
}

/// Summary of a finished render
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderReport {
    pub sample_rate: u32,
    pub channels: u16,
    pub frames: u64,
    pub blocks: u64,
    /// Blocks after which any channel was above threshold
    pub blocks_above_threshold: u64,
    pub input_peak: f32,
    pub output_peak: f32,
    /// Highest cutoff seen at a block boundary (Hz)
    pub max_cutoff: f64,
}

impl RenderReport {
    /// Fraction of blocks that ended above threshold
    pub fn threshold_fraction(&self) -> f64 {
        if self.blocks == 0 {
            0.0
        } else {
            self.blocks_above_threshold as f64 / self.blocks as f64
        }
    }

    pub fn input_peak_db(&self) -> f64 {
        raw_to_db(f64::from(self.input_peak))
    }

    pub fn output_peak_db(&self) -> f64 {
        raw_to_db(f64::from(self.output_peak))
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.frames as f64 / f64::from(self.sample_rate)
        }
    }
}

fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
}

/// Run an interleaved buffer through `engine` in blocks of `block_size` frames
///
/// Trailing samples that do not form a whole frame are left untouched.
pub fn render_buffer(
    engine: &mut AutoQEngine,
    samples: &mut [f32],
    block_size: usize,
) -> Result<RenderReport> {
    if block_size == 0 {
        return Err(RenderError::InvalidOptions(
            "block size must be at least one frame".to_string(),
        ));
    }

    let channels = engine.channels().count();
    let channel_count = usize::from(channels.max(1));
    let whole = samples.len() - samples.len() % channel_count;
    if whole != samples.len() {
        warn!(
            dropped = samples.len() - whole,
            "Input ends with a partial frame; trailing samples left unprocessed"
        );
    }

    let samples = &mut samples[..whole];
    let input_peak = peak(samples);
    let meter = engine.meter();

    let mut blocks = 0u64;
    let mut blocks_above_threshold = 0u64;
    let mut max_cutoff = 0.0f64;

    for block in samples.chunks_mut(block_size * channel_count) {
        engine.process_interleaved(block)?;

        let reading = meter.reading();
        blocks += 1;
        if reading.threshold_exceeded {
            blocks_above_threshold += 1;
        }
        max_cutoff = max_cutoff.max(reading.cutoff);

        if blocks % 1024 == 0 {
            debug!(blocks, level_db = reading.level_db, "Render progress");
        }
    }

    Ok(RenderReport {
        sample_rate: engine.sample_rate().hz(),
        channels,
        frames: (whole / channel_count) as u64,
        blocks,
        blocks_above_threshold,
        input_peak,
        output_peak: peak(samples),
        max_cutoff,
    })
}

/// Read a WAV file as interleaved `f32` in `[-1, 1]`
pub fn read_wav(path: &Path) -> Result<(hound::WavSpec, Vec<f32>)> {
    let reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    let samples = match spec.sample_format {
        hound::SampleFormat::Int => {
            let max_val = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?,
    };

    Ok((spec, samples))
}

/// Write interleaved samples as a 32-bit float WAV file
pub fn write_wav(path: &Path, sample_rate: u32, channels: u16, samples: &[f32]) -> Result<()> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    for &s in samples {
        writer.write_sample(s)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Render `input` through a fresh engine into `output`
#[instrument(skip_all, fields(input = %input.display(), output = %output.display()))]
pub fn render_file(
    input: &Path,
    output: &Path,
    params: EffectParameters,
    options: RenderOptions,
) -> Result<RenderReport> {
    let (spec, mut samples) = read_wav(input)?;
    info!(
        "Input: {} ch, {} Hz, {}-bit {:?}, {} frames",
        spec.channels,
        spec.sample_rate,
        spec.bits_per_sample,
        spec.sample_format,
        samples.len() / usize::from(spec.channels.max(1))
    );

    let sample_rate = SampleRate::validated(spec.sample_rate)?;
    let channels = ChannelCount::from_count(spec.channels)?;

    let mut engine = AutoQEngine::new(sample_rate, channels, params);
    engine.set_bypass(options.bypass);

    let report = render_buffer(&mut engine, &mut samples, options.block_size)?;
    write_wav(output, spec.sample_rate, spec.channels, &samples)?;

    info!(
        frames = report.frames,
        blocks = report.blocks,
        peak_db = report.output_peak_db(),
        "Render complete"
    );
    Ok(report)
}
