//! # Building Configuration
//!
//! Central configuration for the elevator simulation, covering the building
//! layout (floors, cars), the kinematic model, fault-repair probability, and
//! the per-subsystem networking and logging knobs.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use elevsim::config::BuildingConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = BuildingConfig::load("building.toml").await?;
//!     println!("{} floors, {} cars", config.building.floors, config.building.elevators);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [building]
//! floors = 10
//! elevators = 4
//! max_speed = 1.0
//! acceleration = 1.0
//! door_cycle_seconds = 1.0
//! repair_probability = 0.8
//! max_queue = 256
//!
//! [network]
//! scheduler_port = 23
//! elevator_base_port = 69
//! floor_port = 667
//! visualization_port = 22
//!
//! [logging]
//! level = "info"
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

/// Physical and timing parameters for the building being simulated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BuildingParams {
    /// Number of floors, numbered `0..floors`.
    pub floors: u8,
    /// Number of elevator cars, numbered `0..elevators`.
    pub elevators: u8,
    /// Maximum car speed, floors/sec.
    pub max_speed: f64,
    /// Car acceleration, floors/sec^2.
    pub acceleration: f64,
    /// Time for one door-open or one door-close cycle, seconds.
    pub door_cycle_seconds: f64,
    /// Probability that a `FIX_ELEVATOR_ERROR` repair attempt succeeds, in [0, 1].
    pub repair_probability: f64,
    /// Maximum number of messages a subsystem's ingress queue holds before it
    /// starts dropping new submissions.
    pub max_queue: usize,
}

impl Default for BuildingParams {
    fn default() -> Self {
        Self {
            floors: 10,
            elevators: 4,
            max_speed: 1.0,
            acceleration: 1.0,
            door_cycle_seconds: 1.0,
            repair_probability: 0.8,
            max_queue: 256,
        }
    }
}

impl BuildingParams {
    fn validate(&self) -> Result<()> {
        if self.floors < 2 {
            return Err(anyhow!("building.floors must be at least 2"));
        }
        if self.elevators < 1 {
            return Err(anyhow!("building.elevators must be at least 1"));
        }
        if self.max_speed <= 0.0 || self.acceleration <= 0.0 {
            return Err(anyhow!(
                "building.max_speed and building.acceleration must be positive"
            ));
        }
        if self.door_cycle_seconds < 0.0 {
            return Err(anyhow!("building.door_cycle_seconds must be non-negative"));
        }
        if !(0.0..=1.0).contains(&self.repair_probability) {
            return Err(anyhow!("building.repair_probability must be in [0, 1]"));
        }
        if self.max_queue == 0 {
            return Err(anyhow!("building.max_queue must be at least 1"));
        }
        Ok(())
    }

    /// Time to reach top speed, `V/A`.
    pub fn time_to_top_speed(&self) -> f64 {
        self.max_speed / self.acceleration
    }
}

/// Well-known UDP ports (loopback) that the subsystems bind to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub scheduler_port: u16,
    pub elevator_base_port: u16,
    pub floor_port: u16,
    pub visualization_port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            scheduler_port: 23,
            elevator_base_port: 69,
            floor_port: 667,
            visualization_port: 22,
        }
    }
}

impl NetworkConfig {
    /// Port for elevator subsystem `car`.
    pub fn elevator_port(&self, car: u8) -> u16 {
        self.elevator_base_port + car as u16
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Top-level configuration document, loaded once per binary at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildingConfig {
    #[serde(default)]
    pub building: BuildingParams,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BuildingConfig {
    /// Load configuration from a TOML file. A malformed or missing file is a
    /// fatal startup error, never silently substituted with defaults.
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("failed to read config file {}: {}", path, e))?;

        let config: BuildingConfig = toml::from_str(&content)
            .map_err(|e| anyhow!("failed to parse config file {}: {}", path, e))?;

        config.building.validate()?;
        Ok(config)
    }

    /// Write the default configuration document to `path`.
    pub async fn create_default(path: &str) -> Result<()> {
        let config = BuildingConfig::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("failed to serialize default config: {}", e))?;
        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("failed to write config file {}: {}", path, e))?;
        Ok(())
    }
}
