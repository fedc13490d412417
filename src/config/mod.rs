//! Configuration loading for the engine.
//!
//! Configuration lives in a YAML directory (see [`ConfigLoader`] for the
//! layout) covering money settings, the late-fee policy, and per-capita
//! jurisdiction formulas.

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{EngineConfig, EngineMetadata, EngineSettings, JurisdictionsConfig};
