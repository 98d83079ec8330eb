//! End-to-end WAV rendering tests

use autoq_core::domain::config::Preset;
use autoq_core::domain::dsp::EffectParameters;
use autoq_infra::audio::render::{read_wav, write_wav, RenderError};
use autoq_infra::audio::{render_file, RenderOptions};
use autoq_tests::{bursts, interleave, sine};
use std::path::Path;
use tempfile::TempDir;

fn write_float_wav(path: &Path, channels: u16, samples: &[f32]) {
    write_wav(path, 48000, channels, samples).unwrap();
}

#[test]
fn test_render_round_trip_preserves_format() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.wav");
    let output = dir.path().join("out.wav");

    let stereo = interleave(&[bursts(220.0, 4800, 4), sine(880.0, 0.3, 19200)]);
    write_float_wav(&input, 2, &stereo);

    let report = render_file(
        &input,
        &output,
        EffectParameters::default(),
        RenderOptions::default(),
    )
    .unwrap();

    assert_eq!(report.frames, 19200);
    assert_eq!(report.channels, 2);
    assert_eq!(report.sample_rate, 48000);
    assert_eq!(report.blocks, 38);

    let (spec, rendered) = read_wav(&output).unwrap();
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.sample_rate, 48000);
    assert_eq!(spec.sample_format, hound::SampleFormat::Float);
    assert_eq!(rendered.len(), stereo.len());
    assert!(rendered.iter().all(|s| s.is_finite()));
}

#[test]
fn test_wah_preset_reports_threshold_activity() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.wav");
    let output = dir.path().join("out.wav");

    // One second loud, one second near-silent, twice
    let mono: Vec<f32> = bursts(220.0, 48000, 4).iter().map(|&x| x as f32).collect();
    write_float_wav(&input, 1, &mono);

    let wah = Preset::factory("wah").unwrap();
    let report = render_file(&input, &output, wah.effect, RenderOptions::default()).unwrap();

    let fraction = report.threshold_fraction();
    assert!(fraction > 0.3 && fraction < 1.0, "fraction {}", fraction);
    assert!(report.max_cutoff > wah.effect.fc);
    // Band-pass with the soft clipper never reaches full scale
    assert!(report.output_peak < 1.0);
    assert!(report.input_peak > 0.89);
}

#[test]
fn test_render_24_bit_input() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in24.wav");
    let output = dir.path().join("out.wav");

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 44100,
        bits_per_sample: 24,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&input, spec).unwrap();
    for x in sine(440.0, 0.5, 4410) {
        writer.write_sample((x * 8_388_607.0) as i32).unwrap();
    }
    writer.finalize().unwrap();

    let options = RenderOptions {
        block_size: 100,
        ..Default::default()
    };
    let report = render_file(&input, &output, EffectParameters::default(), options).unwrap();

    assert_eq!(report.sample_rate, 44100);
    assert_eq!(report.frames, 4410);
    assert_eq!(report.blocks, 45);
    assert!((report.input_peak - 0.5).abs() < 1e-3);
}

#[test]
fn test_unsupported_sample_rate_is_rejected() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("slow.wav");
    write_wav(&input, 4000, 1, &[0.0; 64]).unwrap();

    let result = render_file(
        &input,
        &dir.path().join("out.wav"),
        EffectParameters::default(),
        RenderOptions::default(),
    );
    assert!(matches!(result, Err(RenderError::Audio(_))));
}
