//! Auto-Q CLI Application

mod args;

use anyhow::{bail, Context};
use args::{Cli, Command, EffectSource, InspectArgs, PresetCommand, RenderArgs};
use autoq_core::domain::config::{AutoQConfig, ConfigManager, PresetManager};
use autoq_core::domain::dsp::{
    compute_cutoff, raw_to_db, EffectParameters, SignalProcessor, StateVariableFilter,
};
use autoq_core::domain::SampleRate;
use autoq_infra::audio::{render_file, RenderOptions, RenderReport};
use clap::Parser;
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_INSPECT_FREQS: [f64; 10] = [
    50.0, 100.0, 250.0, 500.0, 1000.0, 2000.0, 5000.0, 10000.0, 15000.0, 20000.0,
];
const INSPECT_LEVELS_DB: [f64; 6] = [-48.0, -24.0, -12.0, -6.0, -3.0, 0.0];

/// Loaded configuration plus the directories it points at
struct AppContext {
    config: AutoQConfig,
    presets: PresetManager,
}

impl AppContext {
    async fn load(cli: &Cli) -> anyhow::Result<Self> {
        let config_dir = match &cli.config_dir {
            Some(dir) => dir.clone(),
            None => ConfigManager::default_config_dir()?,
        };
        let manager = ConfigManager::new(config_dir);
        let config = manager.load().await;
        let preset_dir = manager.preset_dir(&config);
        debug!(
            config = %manager.config_path().display(),
            presets = %preset_dir.display(),
            "Configuration resolved"
        );

        Ok(Self {
            config,
            presets: PresetManager::new(preset_dir),
        })
    }

    /// Base parameters from a preset, a config file or the user config, then overrides
    async fn effect(&self, source: &EffectSource) -> anyhow::Result<EffectParameters> {
        let base = if let Some(path) = &source.config {
            AutoQConfig::load_from_file(path)
                .await
                .with_context(|| format!("Failed to load config {}", path.display()))?
                .effect
        } else if let Some(name) = &source.preset {
            self.presets
                .resolve(name)
                .await
                .with_context(|| format!("Failed to load preset '{}'", name))?
                .effect
        } else {
            self.config.effect
        };

        Ok(source.overrides.apply(base).clamped())
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let ctx = AppContext::load(&cli).await?;

    match &cli.command {
        Command::Render(args) => render(&ctx, args).await,
        Command::Presets(command) => presets(&ctx, command).await,
        Command::Inspect(args) => inspect(&ctx, args).await,
    }
}

async fn render(ctx: &AppContext, args: &RenderArgs) -> anyhow::Result<()> {
    let params = ctx.effect(&args.source).await?;
    let block_size = args.block_size.unwrap_or(ctx.config.app.block_size);
    if block_size == 0 {
        bail!("Block size must be at least one frame");
    }

    let options = RenderOptions {
        block_size: block_size as usize,
        bypass: args.bypass,
    };
    let input = args.input.clone();
    let output = args.output.clone();
    info!(
        input = %input.display(),
        output = %output.display(),
        block_size,
        "Rendering"
    );

    let report = tokio::task::spawn_blocking(move || render_file(&input, &output, params, options))
        .await
        .context("Render task panicked")?
        .with_context(|| format!("Failed to render {}", args.input.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &RenderReport) {
    println!(
        "Rendered {} frames ({:.2} s) at {} Hz, {} channel(s)",
        report.frames,
        report.duration_secs(),
        report.sample_rate,
        report.channels
    );
    println!("  input peak:      {:>7.2} dBFS", report.input_peak_db());
    println!("  output peak:     {:>7.2} dBFS", report.output_peak_db());
    println!(
        "  above threshold: {:>7.1} % of {} blocks",
        report.threshold_fraction() * 100.0,
        report.blocks
    );
    println!("  highest cutoff:  {:>7.1} Hz", report.max_cutoff);
}

async fn presets(ctx: &AppContext, command: &PresetCommand) -> anyhow::Result<()> {
    match command {
        PresetCommand::List => {
            let names = ctx.presets.list_presets().await?;
            if names.is_empty() {
                println!(
                    "No presets in {} (run `autoq presets install`)",
                    ctx.presets.preset_dir().display()
                );
            }
            for name in names {
                println!("{}", name);
            }
        }
        PresetCommand::Show { name } => {
            let preset = ctx
                .presets
                .resolve(name)
                .await
                .with_context(|| format!("Failed to load preset '{}'", name))?;
            print!("{}", toml::to_string_pretty(&preset)?);
        }
        PresetCommand::Install { force } => {
            let installed = ctx.presets.install_factory_presets(*force).await?;
            println!(
                "Installed {} preset(s) into {}",
                installed.len(),
                ctx.presets.preset_dir().display()
            );
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct ResponsePoint {
    freq_hz: f64,
    magnitude_db: f64,
}

#[derive(Serialize)]
struct ModulationPoint {
    level_db: f64,
    cutoff_hz: f64,
}

#[derive(Serialize)]
struct InspectReport {
    sample_rate: u32,
    params: EffectParameters,
    response: Vec<ResponsePoint>,
    modulation: Vec<ModulationPoint>,
}

async fn inspect(ctx: &AppContext, args: &InspectArgs) -> anyhow::Result<()> {
    let params = ctx.effect(&args.source).await?;
    let rate = args.sample_rate.unwrap_or(ctx.config.app.sample_rate);
    let sample_rate = SampleRate::validated(rate)?;

    let mut filter = StateVariableFilter::new();
    filter.set_parameters(params.filter_params());
    filter.reset(sample_rate.as_f64());

    let freqs = args
        .freqs
        .clone()
        .unwrap_or_else(|| DEFAULT_INSPECT_FREQS.to_vec());
    let response = freqs
        .into_iter()
        .filter(|&f| f > 0.0 && f < sample_rate.nyquist())
        .map(|freq_hz| ResponsePoint {
            freq_hz,
            magnitude_db: raw_to_db(filter.magnitude_response(freq_hz)),
        })
        .collect();
    let modulation = INSPECT_LEVELS_DB
        .iter()
        .map(|&level_db| ModulationPoint {
            level_db,
            cutoff_hz: compute_cutoff(level_db, &params),
        })
        .collect();

    let report = InspectReport {
        sample_rate: sample_rate.hz(),
        params,
        response,
        modulation,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{} fc={:.1} Hz Q={:.3} at {} Hz",
        params.filter_algorithm.as_str(),
        params.fc,
        params.q,
        report.sample_rate
    );
    println!("\nResponse:");
    for point in &report.response {
        println!("  {:>8.1} Hz  {:>7.2} dB", point.freq_hz, point.magnitude_db);
    }
    println!(
        "\nModulation (threshold {:.1} dB, sensitivity {:.2}):",
        params.threshold_db, params.sensitivity
    );
    for point in &report.modulation {
        println!("  {:>6.1} dB -> {:>8.1} Hz", point.level_db, point.cutoff_hz);
    }
    Ok(())
}
