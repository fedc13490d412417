//! Application state for the dues engine API.
//!
//! This module defines the shared application state that is available
//! to all request handlers.

use std::sync::Arc;

use crate::batch::RunAdmissions;
use crate::config::ConfigLoader;

/// Shared application state.
///
/// Holds the loaded configuration and the run admission registry. The
/// registry is shared so that concurrent HTTP run requests for the same
/// organization and period conflict with each other.
#[derive(Clone)]
pub struct AppState {
    config: Arc<ConfigLoader>,
    admissions: RunAdmissions,
}

impl AppState {
    /// Creates a new application state with the given configuration loader.
    pub fn new(config: ConfigLoader) -> Self {
        Self {
            config: Arc::new(config),
            admissions: RunAdmissions::new(),
        }
    }

    /// Returns a reference to the configuration loader.
    pub fn config(&self) -> &ConfigLoader {
        &self.config
    }

    /// Returns the shared run admission registry.
    pub fn admissions(&self) -> &RunAdmissions {
        &self.admissions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_is_clone() {
        // axum requires Clone state
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }
}
