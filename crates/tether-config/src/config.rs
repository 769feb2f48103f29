//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Tick loop settings.
    pub simulation: SimulationConfig,
    /// Replica pose smoothing settings.
    pub interpolation: InterpolationSettings,
    /// Reconciliation / follower settings.
    pub follow: FollowSettings,
    /// Network/session settings.
    pub network: NetworkConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Tick loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    /// Fixed simulation rate in Hz.
    pub tick_rate: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self { tick_rate: 60 }
    }
}

/// Replica pose smoothing. Mirrors the runtime interpolation tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InterpolationSettings {
    /// Exponential convergence rate toward the staged target (per second).
    pub smoothing_rate: f32,
    /// Ceiling on interpolation speed in pixels per second.
    pub max_speed: f32,
    /// Heading blend rate (per second).
    pub rotation_rate: f32,
    /// Snap-to-target distance in pixels.
    pub snap_epsilon: f32,
}

impl Default for InterpolationSettings {
    fn default() -> Self {
        Self {
            smoothing_rate: 12.0,
            max_speed: 900.0,
            rotation_rate: 16.0,
            snap_epsilon: 0.5,
        }
    }
}

/// Reconciliation and local-fallback follower tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FollowSettings {
    /// Trailing distance behind the owner, in pixels.
    pub follow_distance: f32,
    /// Cruise speed in pixels per second.
    pub base_speed: f32,
    /// Maximum catch-up speed in pixels per second.
    pub catchup_speed: f32,
    /// Reference distance for the catch-up ramp, in pixels.
    pub catchup_distance: f32,
    /// Snapshots older than this many seconds are discarded.
    pub snapshot_stale_after: f64,
    /// Snapshot gap beyond which the position snaps instead of blending.
    pub hard_snap_distance: f32,
    /// External-move gap that re-seeds the runtime state.
    pub teleport_distance: f32,
}

impl Default for FollowSettings {
    fn default() -> Self {
        Self {
            follow_distance: 60.0,
            base_speed: 140.0,
            catchup_speed: 420.0,
            catchup_distance: 240.0,
            snapshot_stale_after: 0.6,
            hard_snap_distance: 300.0,
            teleport_distance: 1200.0,
        }
    }
}

/// Network/session configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    /// Identifier this client presents to the server.
    pub client_id: u64,
    /// Identifier recorded as the owner of server replicas.
    pub server_id: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            client_id: 1,
            server_id: 0,
        }
    }
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log filter (e.g. `"info"`, `"debug,tether_sync=trace"`). Empty
    /// means use the built-in default.
    pub log_level: String,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: String::new(),
        }
    }
}

impl Config {
    /// Default location of the config file (`<config_dir>/tether/config.ron`),
    /// when the platform exposes a config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tether").join("config.ron"))
    }

    /// Loads from `path`, or returns defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file exists but cannot be read or
    /// parsed.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::info!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        ron::from_str(&contents).map_err(|source| ConfigError::Malformed {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Saves to `path`, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on serialization or I/O failure.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let pretty = ron::ser::PrettyConfig::default();
        let contents =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::Serialize)?;
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(path, contents).map_err(io_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.simulation.tick_rate, 60);
        assert!(config.follow.catchup_speed > config.follow.base_speed);
        assert!(config.follow.teleport_distance > config.follow.hard_snap_distance);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(&dir.path().join("nope.ron")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ron");

        let mut config = Config::default();
        config.simulation.tick_rate = 30;
        config.follow.follow_distance = 90.0;
        config.debug.log_level = "debug".to_string();

        config.save(&path).unwrap();
        let loaded = Config::load_or_default(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.ron");
        std::fs::write(&path, "(simulation: (tick_rate: 20))").unwrap();

        let loaded = Config::load_or_default(&path).unwrap();
        assert_eq!(loaded.simulation.tick_rate, 20);
        assert_eq!(loaded.follow, FollowSettings::default());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ron");
        std::fs::write(&path, "this is not ron {").unwrap();

        let err = Config::load_or_default(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }));
    }
}
