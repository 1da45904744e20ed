//! Configuration loading for the pairq CLI

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};

use pairq_core::SizeConstraint;
use pairq_rl::AgentConfig;

/// Configuration for the CLI
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub agent: AgentConfig,
    pub learning: LearningConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// Episodes to learn from before testing or answering queries
    pub episodes: usize,
    /// Episodes run after learning whose results are reported separately
    pub test_episodes: usize,
    /// Concurrent episode workers; 1 runs the agent directly
    pub workers: usize,
    /// Per-episode timeout when running with more than one worker
    pub episode_timeout_ms: u64,
    /// Width of the generation square; 0 generates unconstrained problems
    pub square_size: u32,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            episodes: 1000,
            test_episodes: 0,
            workers: 1,
            episode_timeout_ms: 5000,
            square_size: 0,
        }
    }
}

impl LearningConfig {
    pub fn constraint(&self) -> SizeConstraint {
        SizeConstraint::from_square_size(self.square_size)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        Self::load_from(Self::find_config_file().as_deref())
    }

    /// Load configuration from `path` (if any), overlaid with `PAIRQ__`
    /// environment variables
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut builder = ConfigBuilder::<config::builder::DefaultState>::default();

        if let Some(path) = path {
            tracing::debug!("Loading config from: {:?}", path);
            builder = builder.add_source(File::from(path.to_path_buf()).required(false));
        } else {
            tracing::debug!("No config file found, using defaults");
        }

        // PAIRQ__AGENT__ROUNDING_UNIT=10 sets agent.rounding_unit
        builder = builder.add_source(
            Environment::with_prefix("PAIRQ")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to read configuration")?;

        let config: Config = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.agent.validate().context("Invalid agent configuration")?;
        Ok(config)
    }

    /// Find the configuration file
    fn find_config_file() -> Option<PathBuf> {
        // Check in order: PAIRQ_CONFIG env, ./pairq.toml, ~/.config/pairq/pairq.toml
        if let Ok(path) = std::env::var("PAIRQ_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let local = PathBuf::from("pairq.toml");
        if local.exists() {
            return Some(local);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".config").join("pairq").join("pairq.toml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        None
    }

    /// Effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}
