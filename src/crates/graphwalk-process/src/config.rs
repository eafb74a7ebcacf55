//! Engine configuration.
//!
//! Configuration can be built in code, read from environment variables with a
//! prefix, or parsed from YAML. Sources are combined with [`EngineConfig::merge`]
//! and checked with [`EngineConfig::validate`].
//!
//! # Environment variables
//!
//! With prefix `GRAPHWALK_`:
//!
//! | Variable | Field |
//! |---|---|
//! | `GRAPHWALK_WORKERS` | `computer.workers` |
//! | `GRAPHWALK_MAX_SUPERSTEPS` | `computer.max_supersteps` |
//! | `GRAPHWALK_MAX_LOOPS` | `traversal.max_loops` |
//! | `GRAPHWALK_PATH_TRACKING` | `traversal.path_tracking` |
//!
//! # YAML
//!
//! ```yaml
//! computer:
//!   workers: 4
//!   max_supersteps: 200
//! traversal:
//!   max_loops: 16
//!   path_tracking: true
//! ```

use crate::error::{ProcessError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Default bound on the number of supersteps of a computation.
pub const DEFAULT_MAX_SUPERSTEPS: u64 = 1000;

/// Settings for the graph computer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputerConfig {
    /// Number of worker tasks a superstep is split across
    pub workers: usize,
    /// Supersteps allowed before the job fails
    pub max_supersteps: u64,
}

impl Default for ComputerConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            max_supersteps: DEFAULT_MAX_SUPERSTEPS,
        }
    }
}

impl ComputerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(ProcessError::configuration("workers must be at least 1"));
        }
        if self.max_supersteps == 0 {
            return Err(ProcessError::configuration(
                "max_supersteps must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Settings applied to traversals spawned from a source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraversalConfig {
    /// Bound applied to `repeat` steps that do not set their own
    pub max_loops: Option<u32>,
    /// Track paths even when no step requires them
    pub path_tracking: bool,
}

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub computer: ComputerConfig,
    pub traversal: TraversalConfig,
}

impl EngineConfig {
    /// Read configuration from `{prefix}WORKERS`, `{prefix}MAX_SUPERSTEPS`,
    /// `{prefix}MAX_LOOPS` and `{prefix}PATH_TRACKING`.
    ///
    /// Unset variables keep their defaults; unparsable ones are an error.
    pub fn from_env(prefix: &str) -> Result<Self> {
        let mut config = Self::default();
        if let Some(workers) = env_parse::<usize>(&format!("{}WORKERS", prefix))? {
            config.computer.workers = workers;
        }
        if let Some(max) = env_parse::<u64>(&format!("{}MAX_SUPERSTEPS", prefix))? {
            config.computer.max_supersteps = max;
        }
        if let Some(max) = env_parse::<u32>(&format!("{}MAX_LOOPS", prefix))? {
            config.traversal.max_loops = Some(max);
        }
        if let Some(tracking) = env_bool(&format!("{}PATH_TRACKING", prefix))? {
            config.traversal.path_tracking = tracking;
        }
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from YAML. Missing fields take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay `other` on top of `self`.
    ///
    /// Fields of `other` that differ from the defaults win.
    pub fn merge(mut self, other: EngineConfig) -> Self {
        let defaults = EngineConfig::default();
        if other.computer.workers != defaults.computer.workers {
            self.computer.workers = other.computer.workers;
        }
        if other.computer.max_supersteps != defaults.computer.max_supersteps {
            self.computer.max_supersteps = other.computer.max_supersteps;
        }
        if other.traversal.max_loops.is_some() {
            self.traversal.max_loops = other.traversal.max_loops;
        }
        if other.traversal.path_tracking {
            self.traversal.path_tracking = true;
        }
        self
    }

    /// Check invariants: at least one worker and one superstep.
    pub fn validate(&self) -> Result<()> {
        self.computer.validate()
    }
}

fn env_var(key: &str) -> Result<Option<String>> {
    match env::var(key) {
        Ok(val) => Ok(Some(val)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(ProcessError::configuration(format!(
            "Environment variable {} contains invalid UTF-8",
            key
        ))),
    }
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_var(key)? {
        Some(val) => val.trim().parse::<T>().map(Some).map_err(|e| {
            ProcessError::configuration(format!(
                "Failed to parse environment variable {}: {}",
                key, e
            ))
        }),
        None => Ok(None),
    }
}

fn env_bool(key: &str) -> Result<Option<bool>> {
    match env_var(key)? {
        Some(val) => match val.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" => Ok(Some(false)),
            _ => Err(ProcessError::configuration(format!(
                "Invalid boolean value for {}: {}",
                key, val
            ))),
        },
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!(config.computer.workers >= 1);
        assert_eq!(config.computer.max_supersteps, DEFAULT_MAX_SUPERSTEPS);
        assert_eq!(config.traversal.max_loops, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_yaml_partial() {
        let config = EngineConfig::from_yaml_str(
            "computer:\n  max_supersteps: 20\ntraversal:\n  max_loops: 5\n",
        )
        .unwrap();
        assert_eq!(config.computer.max_supersteps, 20);
        assert_eq!(config.traversal.max_loops, Some(5));
        assert!(!config.traversal.path_tracking);
    }

    #[test]
    fn test_from_yaml_rejects_zero_workers() {
        let err = EngineConfig::from_yaml_str("computer:\n  workers: 0\n").unwrap_err();
        assert!(matches!(err, ProcessError::Configuration(_)));
    }

    #[test]
    fn test_from_env() {
        env::set_var("GW_CFG_TEST_WORKERS", "3");
        env::set_var("GW_CFG_TEST_PATH_TRACKING", "yes");
        let config = EngineConfig::from_env("GW_CFG_TEST_").unwrap();
        assert_eq!(config.computer.workers, 3);
        assert!(config.traversal.path_tracking);

        env::set_var("GW_CFG_BAD_MAX_LOOPS", "many");
        assert!(EngineConfig::from_env("GW_CFG_BAD_").is_err());
    }

    #[test]
    fn test_merge_prefers_overrides() {
        let mut overrides = EngineConfig::default();
        overrides.computer.max_supersteps = 10;
        overrides.traversal.max_loops = Some(2);
        let merged = EngineConfig::default().merge(overrides);
        assert_eq!(merged.computer.max_supersteps, 10);
        assert_eq!(merged.traversal.max_loops, Some(2));
    }
}
