//! Configuration management for the hinted handoff engine.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Environment variable overrides
//! - Configuration file support
//! - Component-wise validation
mod cluster;
mod handoff;

pub use cluster::*;
pub use handoff::*;

#[cfg(test)]
mod config_test;

//---
use std::env;
use std::fmt::Debug;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Main configuration container for the handoff engine.
///
/// Combines all subsystem configurations with hierarchical override support:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables (highest priority)
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct HandoffNodeConfig {
    /// Cluster topology and local storage settings
    pub cluster: ClusterConfig,
    /// Hint delivery knobs
    pub handoff: HandoffConfig,
}

impl Debug for HandoffNodeConfig {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("HandoffNodeConfig")
            .field("cluster", &self.cluster)
            .finish()
    }
}

impl HandoffNodeConfig {
    /// Creates a new configuration with hierarchical override support.
    ///
    /// Configuration sources are merged in the following order (later sources
    /// override earlier ones):
    /// 1. Type defaults (lowest priority)
    /// 2. Configuration file from `CONFIG_PATH` environment variable
    /// 3. Environment variables with `HANDOFF__` prefix (highest priority)
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path));
        }

        builder = builder.add_source(Environment::with_prefix("HANDOFF").separator("__"));

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Layers an additional configuration file on top of the current settings.
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let builder = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path));

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validates all subsystem configurations
    pub fn validate(&self) -> Result<()> {
        self.cluster.validate()?;
        self.handoff.validate()?;
        Ok(())
    }
}
