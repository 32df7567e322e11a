//! Configuration loading for the sync engine.
//!
//! Configuration is loaded from a TOML file (default: `cloudsync.toml`).
//! Every section and field is optional.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use sync_core::FileFilter;
use sync_types::StrategyKind;

/// Root configuration for the engine.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineConfig {
    /// Orchestrator configuration.
    #[serde(default)]
    pub sync: SyncSettings,
    /// Periodic reconciliation configuration.
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    /// Predicate used by the selective strategy.
    #[serde(default)]
    pub selective: FileFilter,
}

/// Orchestrator configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncSettings {
    /// Maximum files synchronized at once (default: 3).
    #[serde(default = "default_max_concurrent_syncs")]
    pub max_concurrent_syncs: usize,
    /// Strategy active at startup (default: delta).
    #[serde(default)]
    pub strategy: StrategyKind,
}

/// Reconciliation task configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconcileConfig {
    /// Enable the reconciliation task (default: true).
    #[serde(default = "default_reconcile_enabled")]
    pub enabled: bool,
    /// Interval between passes in seconds (default: 60).
    #[serde(default = "default_reconcile_interval")]
    pub interval_secs: u64,
}

// Default value functions
fn default_max_concurrent_syncs() -> usize {
    3
}

fn default_reconcile_enabled() -> bool {
    true
}

fn default_reconcile_interval() -> u64 {
    60
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            max_concurrent_syncs: default_max_concurrent_syncs(),
            strategy: StrategyKind::default(),
        }
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            enabled: default_reconcile_enabled(),
            interval_secs: default_reconcile_interval(),
        }
    }
}

impl EngineConfig {
    /// Load and validate configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sync.max_concurrent_syncs == 0 {
            return Err(ConfigError::Invalid(
                "sync.max_concurrent_syncs must be at least 1".into(),
            ));
        }
        if self.reconcile.interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "reconcile.interval_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
