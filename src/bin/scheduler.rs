//! Scheduler entry point: binds the scheduler's ingress port and runs its
//! dispatch loop until killed.

use anyhow::Result;
use clap::Parser;
use elevsim::config::BuildingConfig;
use elevsim::sim::scheduler::Scheduler;

#[derive(Parser)]
#[command(name = "scheduler")]
#[command(about = "Elevator bank scheduler: dispatch, ETA tracking, fault arbitration")]
#[command(version)]
struct Cli {
    /// Building configuration file
    #[arg(short, long, default_value = "building.toml")]
    config: String,

    /// Verbose logging (-v, -vv for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = BuildingConfig::load(&cli.config).await?;
    init_logging(&config, cli.verbose);

    let mut scheduler = Scheduler::bind(config).await?;
    scheduler.run().await
}

fn init_logging(config: &BuildingConfig, verbosity: u8) {
    let base_level = match verbosity {
        0 => config.logging.level.parse().unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(base_level).init();
}
