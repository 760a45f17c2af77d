//! Elevator subsystem entry point: binds one car's ingress port and runs its
//! three-state motion sequencer until killed.

use anyhow::Result;
use clap::Parser;
use elevsim::config::BuildingConfig;
use elevsim::sim::elevator::Elevator;

#[derive(Parser)]
#[command(name = "elevator")]
#[command(about = "Elevator subsystem: one per car, drives motion and door cycles")]
#[command(version)]
struct Cli {
    /// Building configuration file
    #[arg(short, long, default_value = "building.toml")]
    config: String,

    /// Car index, 0-based
    #[arg(long)]
    car: u8,

    /// Verbose logging (-v, -vv for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = BuildingConfig::load(&cli.config).await?;
    init_logging(&config, cli.verbose);

    if cli.car >= config.building.elevators {
        anyhow::bail!(
            "car index {} out of range for a {}-car building",
            cli.car,
            config.building.elevators
        );
    }

    let mut elevator = Elevator::bind(config, cli.car).await?;
    elevator.run().await
}

fn init_logging(config: &BuildingConfig, verbosity: u8) {
    let base_level = match verbosity {
        0 => config.logging.level.parse().unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(base_level).init();
}
