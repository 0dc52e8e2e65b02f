//! # Bootstrap Configuration
//!
//! Layered configuration for the bootstrap layer, loaded with the `config`
//! crate. Sources, lowest precedence first:
//!
//! 1. built-in defaults
//! 2. `config/durable.toml` (or an explicit file)
//! 3. `config/durable.<environment>.toml`
//! 4. `DURABLE__*` environment variables (`__` separates nesting levels)
//!
//! ```toml
//! provisioning_timeout_seconds = 30
//!
//! [storage_provider]
//! type = "cloud_store"
//! hub_name = "OrdersHub"
//! partition_count = 8
//!
//! [connections]
//! Storage = "UseDevelopmentStorage=true"
//! ```

pub mod loader;

use crate::backend::RawOptions;
use crate::error::{BootstrapError, BootstrapResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

pub use loader::{detect_environment, ConfigManager};

pub(crate) const DEFAULT_PROVISIONING_TIMEOUT_SECONDS: u64 = 30;

/// Root configuration document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Environment the configuration was loaded for
    pub environment: String,
    /// Upper bound on backend provisioning during service construction
    pub provisioning_timeout_seconds: u64,
    /// Raw backend options; the `type` key selects the backend
    pub storage_provider: RawOptions,
    /// Static connection values by name
    pub connections: HashMap<String, String>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            provisioning_timeout_seconds: DEFAULT_PROVISIONING_TIMEOUT_SECONDS,
            storage_provider: RawOptions::new(),
            connections: HashMap::new(),
        }
    }
}

impl BootstrapConfig {
    pub fn provisioning_timeout(&self) -> Duration {
        Duration::from_secs(self.provisioning_timeout_seconds)
    }

    pub fn validate(&self) -> BootstrapResult<()> {
        if self.provisioning_timeout_seconds == 0 {
            return Err(BootstrapError::Configuration(
                "provisioning_timeout_seconds must be greater than zero".to_string(),
            ));
        }
        if self.environment.trim().is_empty() {
            return Err(BootstrapError::Configuration(
                "environment must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
