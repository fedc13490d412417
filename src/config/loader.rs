//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading engine
//! configuration from YAML files.

use std::fs;
use std::path::Path;

use crate::calculation::LateFeePolicy;
use crate::error::{EngineError, EngineResult};
use crate::models::JurisdictionFormula;
use crate::money::MoneyContext;

use super::types::{EngineConfig, EngineMetadata, EngineSettings, JurisdictionsConfig};

/// Loads and provides access to the engine configuration.
///
/// # Directory Structure
///
/// The configuration directory should have the following structure:
/// ```text
/// config/default/
/// ├── engine.yaml        # Metadata and money settings
/// ├── late_fees.yaml     # Late-fee and arrears policy
/// └── jurisdictions.yaml # Per-capita formulas by jurisdiction
/// ```
///
/// # Example
///
/// ```no_run
/// use dues_engine::config::ConfigLoader;
///
/// let loader = ConfigLoader::load("./config/default").unwrap();
/// let policy = loader.late_fee_policy();
/// println!("Grace period: {} days", policy.grace_period_days);
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config: EngineConfig,
}

impl ConfigLoader {
    /// Loads configuration from the specified directory.
    ///
    /// Fails with [`EngineError::ConfigNotFound`] when a required file is
    /// missing and [`EngineError::ConfigParse`] when a file is not valid
    /// YAML for its schema.
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();

        let settings = Self::load_yaml::<EngineSettings>(&path.join("engine.yaml"))?;
        let late_fees = Self::load_yaml::<LateFeePolicy>(&path.join("late_fees.yaml"))?;
        let jurisdictions =
            Self::load_yaml::<JurisdictionsConfig>(&path.join("jurisdictions.yaml"))?;

        late_fees.validate()?;

        Ok(Self {
            config: EngineConfig {
                metadata: settings.metadata,
                money: settings.money,
                late_fees,
                jurisdictions: jurisdictions.jurisdictions,
            },
        })
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParse {
            path: path_str,
            message: e.to_string(),
        })
    }

    /// Engine metadata.
    pub fn metadata(&self) -> &EngineMetadata {
        &self.config.metadata
    }

    /// The configured monetary arithmetic context.
    pub fn money_context(&self) -> MoneyContext {
        self.config.money
    }

    /// The configured late-fee policy.
    pub fn late_fee_policy(&self) -> &LateFeePolicy {
        &self.config.late_fees
    }

    /// The per-capita formula for a jurisdiction, if configured.
    pub fn jurisdiction(&self, jurisdiction_id: &str) -> Option<&JurisdictionFormula> {
        self.config.jurisdictions.get(jurisdiction_id)
    }

    /// All configured jurisdiction ids, sorted.
    pub fn jurisdiction_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.config.jurisdictions.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}
