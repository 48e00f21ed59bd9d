//! Configuration management for agentkernel
//!
//! TOML-based configuration with defaults and validation.
//! Default location: ~/.agentkernel/config.toml
//!
//! ```toml
//! [tools]
//! max_workers = 4
//! default_timeout_secs = 5.0
//!
//! [storage]
//! checkpoint_dir = ".checkpoints"
//! trace_dir = ".traces"
//!
//! [lifecycle]
//! on_logic_error = "record"
//! ```

use crate::agent::logic::LogicErrorPolicy;
use crate::checkpoint::DEFAULT_CHECKPOINT_DIR;
use crate::errors::{KernelError, Result};
use crate::telemetry::DEFAULT_TRACE_DIR;
use crate::tools::{DEFAULT_MAX_WORKERS, DEFAULT_TOOL_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KernelConfig {
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
}

/// Tool execution configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub max_workers: usize,
    pub default_timeout_secs: f64,
}

/// Checkpoint and trace locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub checkpoint_dir: PathBuf,
    pub trace_dir: PathBuf,
}

/// Lifecycle behavior
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    pub on_logic_error: LogicErrorPolicy,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            default_timeout_secs: DEFAULT_TOOL_TIMEOUT.as_secs_f64(),
        }
    }
}

impl ToolsConfig {
    /// Default timeout as a duration
    ///
    /// Falls back to [`DEFAULT_TOOL_TIMEOUT`] when the value is not a
    /// representable duration; [`KernelConfig::validate`] rejects those.
    pub fn default_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.default_timeout_secs).unwrap_or(DEFAULT_TOOL_TIMEOUT)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            checkpoint_dir: PathBuf::from(DEFAULT_CHECKPOINT_DIR),
            trace_dir: PathBuf::from(DEFAULT_TRACE_DIR),
        }
    }
}

impl KernelConfig {
    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            KernelError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Load from the default location, falling back to defaults when absent
    pub fn load_or_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    /// Parse and validate TOML
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: KernelConfig = toml::from_str(contents)
            .map_err(|e| KernelError::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| KernelError::Config(format!("failed to serialize config: {}", e)))
    }

    /// Get the default configuration file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".agentkernel").join("config.toml"))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.tools.max_workers == 0 {
            return Err(KernelError::Config("max_workers must be > 0".to_string()));
        }

        let timeout = self.tools.default_timeout_secs;
        if !timeout.is_finite() || timeout <= 0.0 {
            return Err(KernelError::Config(
                "default_timeout_secs must be a positive number".to_string(),
            ));
        }
        if Duration::try_from_secs_f64(timeout).is_err() {
            return Err(KernelError::Config(format!(
                "default_timeout_secs {} is out of range",
                timeout
            )));
        }

        Ok(())
    }
}
