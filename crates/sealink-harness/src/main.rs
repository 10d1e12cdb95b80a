//! Sealink simulation runner.
//!
//! # Usage
//!
//! ```bash
//! # Owned-device handshake with seed 7
//! sealink-sim --scenario owned-devices --seed 7
//!
//! # Contact handshake with a flaky store
//! sealink-sim --scenario contact-devices --store-failure-rate 0.2
//! ```

use clap::Parser;
use sealink_harness::{Scenario, ScenarioKind};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Sealink channel-creation simulator
#[derive(Parser, Debug)]
#[command(name = "sealink-sim")]
#[command(about = "Run a deterministic channel-creation scenario")]
#[command(version)]
struct Args {
    /// Scenario to run
    #[arg(long, value_enum, default_value = "owned-devices")]
    scenario: ScenarioKind,

    /// Seed of the simulated environment
    #[arg(short, long, default_value = "0")]
    seed: u64,

    /// Delivery budget
    #[arg(long, default_value = "1000")]
    max_steps: usize,

    /// Probability that a store operation fails
    #[arg(long, default_value = "0.0")]
    store_failure_rate: f64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    if !(0.0..=1.0).contains(&args.store_failure_rate) {
        return Err(format!("store failure rate {} is outside [0, 1]", args.store_failure_rate).into());
    }

    let mut scenario = Scenario::new(args.scenario, args.seed);
    scenario.max_steps = args.max_steps;
    if args.store_failure_rate > 0.0 {
        scenario = scenario.with_store_failure_rate(args.store_failure_rate);
    }

    let report = scenario.run()?;
    tracing::info!(
        steps = report.steps,
        rejected = report.rejected,
        ignored = report.ignored,
        dropped = report.dropped,
        retries = report.retries,
        "simulation complete"
    );

    if !report.established {
        return Err("channel was not established".into());
    }
    tracing::info!("channel established");
    Ok(())
}
