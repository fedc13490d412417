//! Configuration file schemas.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::calculation::LateFeePolicy;
use crate::models::JurisdictionFormula;
use crate::money::MoneyContext;

/// Engine metadata from `engine.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineMetadata {
    /// Deployment name (e.g., "default").
    pub name: String,
    /// Configuration version string.
    pub version: String,
}

/// Schema of `engine.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Engine metadata.
    pub metadata: EngineMetadata,
    /// Monetary arithmetic settings.
    #[serde(default)]
    pub money: MoneyContext,
}

/// Schema of `jurisdictions.yaml`: per-capita formulas keyed by
/// jurisdiction id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JurisdictionsConfig {
    /// Formula per jurisdiction.
    pub jurisdictions: HashMap<String, JurisdictionFormula>,
}

/// The fully loaded engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Metadata from `engine.yaml`.
    pub metadata: EngineMetadata,
    /// Monetary arithmetic context from `engine.yaml`.
    pub money: MoneyContext,
    /// Late-fee policy from `late_fees.yaml`.
    pub late_fees: LateFeePolicy,
    /// Per-capita formulas from `jurisdictions.yaml`.
    pub jurisdictions: HashMap<String, JurisdictionFormula>,
}
