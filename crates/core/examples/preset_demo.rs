//! Example walking through the configuration and preset system
//!
//! Run with: cargo run --package autoq-core --example preset_demo

use autoq_core::domain::config::{AutoQConfig, Preset, PresetManager};
use autoq_core::domain::dsp::{AutoQ, SignalProcessor};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("autoq_core=debug,info")
        .init();

    println!("=== Auto-Q Preset Demo ===\n");

    let workdir = std::env::temp_dir().join("autoq-preset-demo");

    println!("1. Saving default configuration...");
    let config = AutoQConfig::default();
    let config_path = workdir.join("config.toml");
    config.save_to_file(&config_path).await?;
    println!("   saved to {}", config_path.display());

    println!("\n2. Installing factory presets...");
    let manager = PresetManager::new(workdir.join("presets"));
    let installed = manager.install_factory_presets(true).await?;
    for name in &installed {
        println!("   - {}", name);
    }

    println!("\n3. Running each preset over a 440 Hz burst:");
    let sample_rate = config.app.sample_rate as f64;
    for name in manager.list_presets().await? {
        let preset: Preset = manager.load_preset(&name).await?;
        let mut follower = AutoQ::with_parameters(preset.effect, sample_rate);

        let mut peak = 0.0f64;
        let mut exceeded = 0usize;
        for i in 0..sample_rate as usize {
            let x = 0.8 * (2.0 * std::f64::consts::PI * 440.0 * i as f64 / sample_rate).sin();
            peak = peak.max(follower.process_sample(x).abs());
            if follower.threshold_exceeded() {
                exceeded += 1;
            }
        }

        println!(
            "   {:<24} peak {:>6.3}  above threshold {:>5.1}%  final cutoff {:>8.1} Hz",
            name,
            peak,
            100.0 * exceeded as f64 / sample_rate,
            follower.metering().cutoff
        );
    }

    tokio::fs::remove_dir_all(&workdir).await?;
    println!("\n=== Demo Complete ===");
    Ok(())
}
