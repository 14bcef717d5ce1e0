//! `doorlock-sim`: run both door-lock nodes from the command line.
//!
//! ```text
//! doorlock-sim --fresh --keys "12345 12345 - 12345" --tick-ms 100
//! doorlock-sim --stored 99999 --keys "- 11111 11111 11111 99999"
//! ```
//!
//! Set `RUST_LOG=debug` to see every byte and state transition.

use std::process::ExitCode;

use clap::Parser;
use doorlock_sim::{Args, run};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    match run(&args).await {
        Ok(report) => {
            tracing::info!(
                ticks = report.ticks,
                hmi = report.hmi_state.name(),
                control = report.control_state.name(),
                door_cycles = report.door_cycles,
                alarms = report.alarms,
                provisioned = report.stored.is_some(),
                faults = report.hmi_faults + report.control_faults,
                "simulation finished"
            );
            ExitCode::SUCCESS
        },
        Err(err) => {
            tracing::error!(%err, "simulation failed");
            ExitCode::FAILURE
        },
    }
}
