//! Configuration, presets and the engine working together

use autoq_core::domain::audio::{ChannelCount, SampleRate};
use autoq_core::domain::config::{AutoQConfig, ConfigManager, Preset, PresetManager};
use autoq_core::domain::dsp::FilterAlgorithm;
use autoq_infra::audio::AutoQEngine;
use tempfile::TempDir;

#[tokio::test]
async fn test_config_drives_engine() {
    let temp_dir = TempDir::new().unwrap();
    let manager = ConfigManager::new(temp_dir.path().to_path_buf());

    let mut config = AutoQConfig::default();
    config.app.sample_rate = 96000;
    config.effect.filter_algorithm = FilterAlgorithm::Highpass;
    config.effect.fc = 150.0;
    manager.save(&config).await.unwrap();

    let loaded = manager.load().await;
    let sample_rate = SampleRate::validated(loaded.app.sample_rate).unwrap();
    let engine = AutoQEngine::new(sample_rate, ChannelCount::Stereo, loaded.effect);

    assert_eq!(engine.sample_rate(), SampleRate::Hz96000);
    assert_eq!(engine.params().filter_algorithm, FilterAlgorithm::Highpass);
    assert_eq!(engine.channel(0).unwrap().filter().sample_rate(), 96000.0);
}

#[tokio::test]
async fn test_installed_presets_load_into_engine() {
    let temp_dir = TempDir::new().unwrap();
    let presets = PresetManager::new(temp_dir.path().join("presets"));
    presets.install_factory_presets(false).await.unwrap();

    for name in presets.list_presets().await.unwrap() {
        let preset = presets.load_preset(&name).await.unwrap();
        assert_eq!(Some(preset.clone()), Preset::factory(&name));

        let mut engine = AutoQEngine::new(SampleRate::Hz48000, ChannelCount::Mono, preset.effect);
        let mut buffer = vec![0.25f32; 512];
        engine.process_interleaved(&mut buffer).unwrap();
        assert!(buffer.iter().all(|s| s.is_finite()), "{}", name);
    }
}

#[tokio::test]
async fn test_out_of_range_file_values_are_clamped_by_engine() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("wild.toml");
    tokio::fs::write(
        &path,
        "[effect]\nfc = 99999.0\nq = 500.0\nthreshold_db = -300.0\nsensitivity = 100.0\n",
    )
    .await
    .unwrap();

    let config = AutoQConfig::load_from_file(&path).await.unwrap();
    let engine = AutoQEngine::new(SampleRate::Hz48000, ChannelCount::Mono, config.effect);

    let params = engine.params();
    assert_eq!(params.fc, 20480.0);
    assert_eq!(params.q, 40.0);
    assert_eq!(params.threshold_db, -96.0);
    assert_eq!(params.sensitivity, 20.0);
}
