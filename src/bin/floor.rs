//! Floor subsystem entry point: replays the scenario file into the
//! scheduler and tracks the building's call lamp matrix.

use anyhow::Result;
use clap::Parser;
use elevsim::config::BuildingConfig;
use elevsim::sim::floor::Floor;

/// Scenario file path is a fixed constant; per the core design, there is no
/// override flag for it.
const SCENARIO_PATH: &str = "scenario.txt";

#[derive(Parser)]
#[command(name = "floor")]
#[command(about = "Floor subsystem: scenario driver and call lamp matrix")]
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

    let mut floor = Floor::bind(config, SCENARIO_PATH).await?;
    floor.run().await
}

fn init_logging(config: &BuildingConfig, verbosity: u8) {
    let base_level = match verbosity {
        0 => config.logging.level.parse().unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(base_level).init();
}
