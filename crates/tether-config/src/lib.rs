//! Configuration for the simulation and synchronization layers.
//!
//! Settings persist to disk as RON files with full defaults, so a missing
//! or partial file is never an error. CLI flags (via clap) override loaded
//! values.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    Config, DebugConfig, FollowSettings, InterpolationSettings, NetworkConfig, SimulationConfig,
};
pub use error::ConfigError;
