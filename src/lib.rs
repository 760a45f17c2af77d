//! # elevsim - an elevator bank dispatch simulation
//!
//! Simulates a building's elevator bank as three cooperating subsystems
//! talking over UDP datagrams: a **scheduler** that dispatches calls and
//! watches for stuck cars, one **elevator subsystem** task per car that
//! drives a three-state motion sequencer, and a **floor subsystem** that
//! replays a scenario file of calls and fault injections while tracking
//! per-floor call lamps.
//!
//! ## Module Organization
//!
//! - [`config`] - building/network/logging configuration, loaded from TOML
//! - [`error`] - the per-domain error taxonomies (`ScenarioError`, `WireError`)
//! - [`metrics`] - in-process atomic counters and a point-in-time snapshot
//! - [`net`] - wire framing and the priority ingress queue shared by every subsystem
//! - [`sim`] - the domain model and the three subsystem state machines
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use elevsim::config::BuildingConfig;
//! use elevsim::sim::scheduler::Scheduler;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = BuildingConfig::load("building.toml").await?;
//!     let mut scheduler = Scheduler::bind(config).await?;
//!     scheduler.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod metrics;
pub mod net;
pub mod sim;
