//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Command-line arguments. CLI values override settings loaded from
/// `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "tether", about = "Tether simulation runtime")]
pub struct CliArgs {
    /// Fixed simulation rate in Hz.
    #[arg(long)]
    pub tick_rate: Option<u32>,

    /// Local client identifier.
    #[arg(long)]
    pub client_id: Option<u64>,

    /// Follower trailing distance in pixels.
    #[arg(long)]
    pub follow_distance: Option<f32>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to the config file (overrides the default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Applies CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(tick_rate) = args.tick_rate {
            self.simulation.tick_rate = tick_rate;
        }
        if let Some(client_id) = args.client_id {
            self.network.client_id = client_id;
        }
        if let Some(follow_distance) = args.follow_distance {
            self.follow.follow_distance = follow_distance;
        }
        if let Some(log_level) = &args.log_level {
            self.debug.log_level = log_level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_apply_only_present_flags() {
        let mut config = Config::default();
        let args = CliArgs {
            tick_rate: Some(30),
            log_level: Some("trace".to_string()),
            ..Default::default()
        };

        config.apply_cli_overrides(&args);
        assert_eq!(config.simulation.tick_rate, 30);
        assert_eq!(config.debug.log_level, "trace");
        // Untouched fields keep their defaults.
        assert_eq!(config.network.client_id, 1);
    }
}
