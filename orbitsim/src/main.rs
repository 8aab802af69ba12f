use orbitsim::{bench_tick, BodyHandle, ImpactHooks, Scenario, ScenarioConfig, Simulation};
use orbitsim::simulation::engine::DEFAULT_GRACE;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
struct Args {
    /// Scenario file under `scenarios/`
    #[arg(short, long = "file", default_value = "default.yaml")]
    file_name: String,

    /// How long to let the simulation run
    #[arg(short, long, default_value_t = 10.0)]
    seconds: f64,

    /// Interval between logged frames
    #[arg(long, default_value_t = 1000)]
    sample_ms: u64,

    /// Run the tick benchmark instead of a scenario
    #[arg(long)]
    bench: bool,
}

/// Stands in for the renderer and the sound player: logs every event.
struct LoggingHooks;

impl ImpactHooks for LoggingHooks {
    fn on_flash(&self, body: BodyHandle) {
        tracing::debug!(%body, "flash");
    }

    fn on_impact(&self, body: BodyHandle, intensity: f64) {
        info!(%body, intensity_db = %format_args!("{intensity:.2}"), "impact");
    }
}

// load here to keep main clean
fn load_scenario_from_yaml(file_name: &str) -> Result<ScenarioConfig> {
    let config_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios").join(file_name);
    ScenarioConfig::from_path(&config_path)
        .with_context(|| format!("failed to load scenario {}", config_path.display()))
}

/// `--seconds` as a duration; negative and NaN mean zero.
fn run_length(seconds: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(seconds.max(0.0))
        .with_context(|| format!("--seconds {seconds} is not a usable run length"))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_thread_names(true)
        .init();

    let args = Args::parse();

    if args.bench {
        bench_tick()?;
        return Ok(());
    }

    let scenario_cfg = load_scenario_from_yaml(&args.file_name)?;
    let scenario = Scenario::build_scenario(scenario_cfg)?;

    let sim = Simulation::with_hooks(scenario.parameters.clone(), Arc::new(LoggingHooks))?;
    scenario.populate(&sim)?;
    sim.start_all()?;

    let run_for = run_length(args.seconds)?;
    let sample = Duration::from_millis(args.sample_ms.max(1));
    let started = Instant::now();
    let mut frame: u64 = 0;

    while started.elapsed() < run_for {
        thread::sleep(sample.min(run_for.saturating_sub(started.elapsed())));
        frame += 1;
        for snap in sim.snapshots() {
            info!(
                frame,
                body = %snap.handle,
                name = %snap.name,
                x = %format_args!("{:.1}", snap.position.x),
                y = %format_args!("{:.1}", snap.position.y),
                color = ?snap.color,
                "frame"
            );
        }
    }

    sim.teardown(DEFAULT_GRACE);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_length_accepts_finite_seconds() {
        assert_eq!(run_length(1.5).unwrap(), Duration::from_millis(1500));
        assert_eq!(run_length(-3.0).unwrap(), Duration::ZERO);
    }

    #[test]
    fn run_length_rejects_infinity() {
        let err = run_length(f64::INFINITY).unwrap_err();
        assert!(err.to_string().contains("--seconds"));
    }
}
