//! `forgehr-regress`: replay a fixture file through the decision pipeline and
//! fail when the pass rate drops below the required threshold.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use forgehr_ai::{RegressionFixture, RegressionHarness, ScenarioStatus};

#[derive(Parser)]
#[command(
    name = "forgehr-regress",
    version,
    about = "Replay regression fixtures against the decision pipeline"
)]
struct Cli {
    /// JSON array of regression fixtures
    fixtures: PathBuf,

    /// Minimum pass rate (0.0-1.0) for a zero exit code
    #[arg(long, env = "FORGEHR_MIN_PASS_RATE", default_value_t = 1.0)]
    min_pass_rate: f64,

    /// Override the confidence floor from configuration
    #[arg(long)]
    confidence_floor: Option<f64>,

    /// Print the full report as JSON instead of a summary
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    forgehr_observability::init();
    let cli = Cli::parse();

    if !(0.0..=1.0).contains(&cli.min_pass_rate) {
        bail!("--min-pass-rate must be within 0.0..=1.0, got {}", cli.min_pass_rate);
    }

    let mut config = forgehr_infra::load_config()?;
    if let Some(floor) = cli.confidence_floor {
        config.regression.confidence_floor = floor;
    }

    let raw = std::fs::read_to_string(&cli.fixtures)
        .with_context(|| format!("reading fixtures from {}", cli.fixtures.display()))?;
    let fixtures: Vec<RegressionFixture> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing fixtures from {}", cli.fixtures.display()))?;

    let registry = Arc::new(config.registry()?);
    let harness = RegressionHarness::new(registry, fixtures, config.regression)?;
    let report = harness.run().await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for s in &report.scenarios {
            let status = match s.status {
                ScenarioStatus::Passed => "PASS",
                ScenarioStatus::NearMiss => "NEAR",
                ScenarioStatus::Mismatch => "FAIL",
                ScenarioStatus::Errored => "ERR ",
            };
            println!(
                "{status} {:<32} expected={:<20} actual={:<20} confidence={}",
                s.name,
                s.expected_label,
                s.actual_label.as_deref().unwrap_or("-"),
                s.confidence.map(|c| format!("{c:.2}")).unwrap_or_else(|| "-".to_string()),
            );
            if let Some(err) = &s.error {
                println!("     {err}");
            }
        }
        println!(
            "passed {}/{} (pass rate {:.3}, required {:.3})",
            report.passed, report.total, report.pass_rate, cli.min_pass_rate
        );
    }

    if report.pass_rate < cli.min_pass_rate {
        tracing::warn!(
            pass_rate = report.pass_rate,
            required = cli.min_pass_rate,
            "regression pass rate below threshold"
        );
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
