//! Combined entry point: runs the scheduler, the floor subsystem, and one
//! elevator subsystem task per car in a single process.
//!
//! The four-entry-point CLI the core design describes maps naturally onto
//! four cooperating async tasks; this binary is the ambient convenience of
//! running all of them together instead of four separate processes.

use anyhow::Result;
use clap::Parser;
use elevsim::config::BuildingConfig;
use elevsim::sim::elevator::Elevator;
use elevsim::sim::floor::Floor;
use elevsim::sim::scheduler::Scheduler;

const SCENARIO_PATH: &str = "scenario.txt";

#[derive(Parser)]
#[command(name = "sim")]
#[command(about = "Runs the full elevator bank simulation in one process")]
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

    log::info!(
        "starting simulation: {} floors, {} elevators",
        config.building.floors,
        config.building.elevators
    );

    let mut scheduler = Scheduler::bind(config.clone()).await?;
    let mut floor = Floor::bind(config.clone(), SCENARIO_PATH).await?;
    let mut elevators = Vec::new();
    for car in 0..config.building.elevators {
        elevators.push(Elevator::bind(config.clone(), car).await?);
    }

    let mut tasks = vec![
        tokio::spawn(async move { scheduler.run().await }),
        tokio::spawn(async move { floor.run().await }),
    ];
    tasks.extend(
        elevators
            .into_iter()
            .map(|mut elevator| tokio::spawn(async move { elevator.run().await })),
    );

    // Every subsystem loops forever under normal operation; whichever task
    // returns first does so because of a fatal error, which we propagate.
    let (result, _index, _remaining) = futures::future::select_all(tasks).await;
    result??;
    Ok(())
}

fn init_logging(config: &BuildingConfig, verbosity: u8) {
    let base_level = match verbosity {
        0 => config.logging.level.parse().unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(base_level).init();
}
