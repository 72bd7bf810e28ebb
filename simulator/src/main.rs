use anyhow::Context;
use clap::Parser;
use doacore::interface::to_json_line;
use doacore::{BeamformerMethod, DoaMethod};
use log::{info, warn};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use workflow::config::{ArraySpec, ScenarioConfig};
use workflow::runner::Runner;

mod generator;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Offline driver for the microphone-array DOA engine")]
struct Args {
    /// Load a scenario from YAML; the source options below are then ignored
    #[arg(long)]
    scenario: Option<PathBuf>,
    /// JSON array description replacing the scenario's array
    #[arg(long)]
    geometry: Option<PathBuf>,
    #[arg(long, default_value_t = 45.0, allow_hyphen_values = true)]
    azimuth: f64,
    #[arg(long, default_value_t = 30.0, allow_hyphen_values = true)]
    elevation: f64,
    #[arg(long, default_value_t = 1024)]
    frames: usize,
    #[arg(long, default_value_t = 4)]
    blocks: usize,
    /// Half-width of the uniform sensor noise
    #[arg(long, default_value_t = 0.0)]
    noise: f64,
    #[arg(long, default_value = "srp-phat")]
    doa: DoaMethod,
    #[arg(long, default_value = "delay-and-sum")]
    beamformer: BeamformerMethod,
    /// Append a JSON summary line to this file
    #[arg(long, default_value = "tools/data/doa_report.jsonl")]
    report: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut scenario = if let Some(path) = &args.scenario {
        ScenarioConfig::load(path)?
    } else {
        ScenarioConfig::from_args(
            args.azimuth,
            args.elevation,
            args.frames,
            args.blocks,
            args.noise,
            args.doa,
            args.beamformer,
        )
    };
    if let Some(path) = args.geometry {
        scenario.array = ArraySpec::File { path };
    }

    info!("running scenario '{}'", scenario.name);
    let result = Runner::new(scenario).execute()?;

    for (estimate, beam) in result.estimates.iter().zip(&result.beamformed) {
        println!(
            "t={:.3}s {} -> az {:.1} el {:.1} conf {:.4} | {} rms {:.4} fallback {}",
            estimate.timestamp,
            estimate.method,
            estimate.azimuth_deg,
            estimate.elevation_deg,
            estimate.confidence,
            beam.method,
            beam.output_rms,
            beam.fallback_bins
        );
    }
    let levels: Vec<String> = result
        .input_rms
        .iter()
        .map(|rms| format!("{:.4}", rms))
        .collect();
    println!("input rms per channel: [{}]", levels.join(", "));
    println!(
        "mean real-time factor {:.3} over {} blocks",
        result.mean_real_time_factor(),
        result.timings.len()
    );
    if result.overruns() > 0 {
        warn!(
            "{} of {} blocks exceeded their real-time budget",
            result.overruns(),
            result.timings.len()
        );
    }

    let mut line = to_json_line(&result).context("serialising run report")?;
    line.push('\n');
    if let Some(parent) = args.report.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating report directory {}", parent.display()))?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&args.report)
        .with_context(|| format!("opening report {}", args.report.display()))?;
    file.write_all(line.as_bytes())?;

    Ok(())
}
