//! Configuration Loader
//!
//! Environment-aware loading: base file, environment overlay, then
//! environment variables.

use super::{BootstrapConfig, DEFAULT_PROVISIONING_TIMEOUT_SECONDS};
use crate::error::BootstrapResult;
use config::{Config, Environment, File};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const BASE_FILE_STEM: &str = "durable";
const ENV_PREFIX: &str = "DURABLE";
const ENV_SEPARATOR: &str = "__";

/// Current environment: `DURABLE_ENV`, then `APP_ENV`, else `development`
pub fn detect_environment() -> String {
    env::var("DURABLE_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
        .to_lowercase()
}

/// Loaded configuration plus where it came from
#[derive(Debug)]
pub struct ConfigManager {
    config: BootstrapConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> BootstrapResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> BootstrapResult<Arc<ConfigManager>> {
        let environment = detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment.
    ///
    /// Reads `durable.toml` and `durable.<environment>.toml` from the
    /// directory; both are optional.
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> BootstrapResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(|| PathBuf::from("config"));
        let base = config_directory.join(format!("{BASE_FILE_STEM}.toml"));
        Self::build(base, false, config_directory, environment)
    }

    /// Load an explicit configuration file, which must exist.
    ///
    /// The environment overlay is looked up next to it.
    pub fn load_from_file(path: &Path, environment: &str) -> BootstrapResult<Arc<ConfigManager>> {
        let config_directory = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::build(path.to_path_buf(), true, config_directory, environment)
    }

    fn build(
        base: PathBuf,
        base_required: bool,
        config_directory: PathBuf,
        environment: &str,
    ) -> BootstrapResult<Arc<ConfigManager>> {
        let overlay = config_directory.join(format!("{BASE_FILE_STEM}.{environment}.toml"));
        debug!(
            environment,
            base = %base.display(),
            overlay = %overlay.display(),
            "Loading bootstrap configuration"
        );

        let config: BootstrapConfig = Config::builder()
            .set_default("environment", environment)?
            .set_default(
                "provisioning_timeout_seconds",
                DEFAULT_PROVISIONING_TIMEOUT_SECONDS as i64,
            )?
            .add_source(File::from(base.clone()).required(base_required))
            .add_source(File::from(overlay).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;

        let manager = ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        };
        debug!(
            "Configuration loaded: {}",
            serde_json::to_string(&manager.debug_config())
                .unwrap_or_else(|_| "[serialization error]".to_string())
        );
        info!(
            environment,
            timeout_seconds = manager.config.provisioning_timeout_seconds,
            connections = manager.config.connections.len(),
            "✅ Bootstrap configuration loaded"
        );
        Ok(Arc::new(manager))
    }

    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Configuration as JSON with connection values and sensitive fields masked
    pub fn debug_config(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(&self.config).unwrap_or(serde_json::Value::Null);
        if let Some(connections) = value
            .get_mut("connections")
            .and_then(serde_json::Value::as_object_mut)
        {
            for connection in connections.values_mut() {
                *connection = serde_json::Value::String("[MASKED]".to_string());
            }
        }
        sanitize_json_recursive(&mut value, &["password", "secret", "key", "token"]);
        value
    }
}

// `key_prefix` is not a secret.
fn sanitize_json_recursive(value: &mut serde_json::Value, sensitive_patterns: &[&str]) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                let key_lower = key.to_lowercase();
                let is_sensitive = key_lower != "key_prefix"
                    && sensitive_patterns
                        .iter()
                        .any(|pattern| key_lower.contains(pattern));
                if is_sensitive && !val.is_object() {
                    *val = serde_json::Value::String("[MASKED]".to_string());
                } else {
                    sanitize_json_recursive(val, sensitive_patterns);
                }
            }
        }
        serde_json::Value::Array(items) => {
            for item in items.iter_mut() {
                sanitize_json_recursive(item, sensitive_patterns);
            }
        }
        _ => {}
    }
}
