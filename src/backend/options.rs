//! # Orchestration Options
//!
//! A base record shared by every backend plus one backend-specific extension
//! per `BackendKind`. Each backend declares its own defaults through `Default`
//! and its own rules through `BackendOptions::validate`.

use super::BackendKind;
use crate::error::{BootstrapError, BootstrapResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

const DEFAULT_HUB_NAME: &str = "DurableFunctionsHub";
const CLOUD_STORE_MAX_PARTITIONS: i32 = 16;
const CLOUD_STORE_MAX_CONTROL_BATCH: u32 = 32;
const CLOUD_STORE_HUB_NAME_MIN: usize = 3;
const CLOUD_STORE_HUB_NAME_MAX: usize = 45;
const KEY_VALUE_MAX_DATABASE: i32 = 15;

/// Retry policy applied by the engine to failed work items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryOptions {
    pub max_attempts: u32,
    pub first_retry_interval_ms: u64,
    pub backoff_coefficient: f64,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            first_retry_interval_ms: 1000,
            backoff_coefficient: 2.0,
        }
    }
}

/// Options shared by every backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommonOptions {
    /// Task hub the engine operates in
    pub hub_name: String,
    pub max_concurrent_activity_functions: u32,
    pub max_concurrent_orchestrator_functions: u32,
    pub retry: RetryOptions,
    /// Host identity used for lease ownership; `None` lets the engine pick one
    pub host_id: Option<String>,
}

impl Default for CommonOptions {
    fn default() -> Self {
        Self {
            hub_name: DEFAULT_HUB_NAME.to_string(),
            max_concurrent_activity_functions: 10,
            max_concurrent_orchestrator_functions: 10,
            retry: RetryOptions::default(),
            host_id: None,
        }
    }
}

impl CommonOptions {
    fn validate(&self, backend: BackendKind) -> BootstrapResult<()> {
        if self.hub_name.trim().is_empty() {
            return Err(BootstrapError::invalid_configuration(
                backend,
                "hub_name",
                "must not be empty",
            ));
        }
        if self.max_concurrent_activity_functions == 0 {
            return Err(BootstrapError::invalid_configuration(
                backend,
                "max_concurrent_activity_functions",
                "must be greater than zero",
            ));
        }
        if self.max_concurrent_orchestrator_functions == 0 {
            return Err(BootstrapError::invalid_configuration(
                backend,
                "max_concurrent_orchestrator_functions",
                "must be greater than zero",
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(BootstrapError::invalid_configuration(
                backend,
                "retry.max_attempts",
                "must be at least 1",
            ));
        }
        if self.retry.first_retry_interval_ms == 0 {
            return Err(BootstrapError::invalid_configuration(
                backend,
                "retry.first_retry_interval_ms",
                "must be greater than zero",
            ));
        }
        if !self.retry.backoff_coefficient.is_finite() || self.retry.backoff_coefficient < 1.0 {
            return Err(BootstrapError::invalid_configuration(
                backend,
                "retry.backoff_coefficient",
                format!(
                    "must be a finite number >= 1.0, got {}",
                    self.retry.backoff_coefficient
                ),
            ));
        }
        if let Some(host_id) = &self.host_id {
            if host_id.trim().is_empty() {
                return Err(BootstrapError::invalid_configuration(
                    backend,
                    "host_id",
                    "must not be blank when set",
                ));
            }
        }
        Ok(())
    }
}

/// Contract every backend-specific options type fulfils
pub trait BackendOptions:
    Default
    + Clone
    + PartialEq
    + std::fmt::Debug
    + Serialize
    + DeserializeOwned
    + Into<OrchestrationOptions>
    + Send
    + Sync
    + 'static
{
    /// Backend this options type belongs to
    const KIND: BackendKind;

    /// Concrete type name reported in dispatch errors
    const TYPE_NAME: &'static str;

    fn common(&self) -> &CommonOptions;

    /// Backend-specific validation, including the common record
    fn validate(&self) -> BootstrapResult<()>;
}

/// Cloud blob/queue/table store options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudStoreOptions {
    #[serde(flatten)]
    pub common: CommonOptions,
    /// Name of the connection holding the storage account connection string
    pub connection_name: String,
    /// Number of control-queue partitions (1..=16)
    pub partition_count: i32,
    pub control_queue_batch_size: u32,
    pub work_item_visibility_timeout_seconds: u64,
    pub max_queue_polling_interval_seconds: u64,
    /// Only the lease holder processes the hub when several apps share it
    pub use_app_lease: bool,
}

impl Default for CloudStoreOptions {
    fn default() -> Self {
        Self {
            common: CommonOptions::default(),
            connection_name: "Storage".to_string(),
            partition_count: 4,
            control_queue_batch_size: 32,
            work_item_visibility_timeout_seconds: 300,
            max_queue_polling_interval_seconds: 30,
            use_app_lease: true,
        }
    }
}

impl CloudStoreOptions {
    /// Control queue names, one per partition
    pub fn control_queue_names(&self) -> Vec<String> {
        let hub = self.common.hub_name.to_ascii_lowercase();
        (0..self.partition_count.max(0))
            .map(|partition| format!("{hub}-control-{partition:02}"))
            .collect()
    }

    pub fn work_item_queue_name(&self) -> String {
        format!("{}-workitems", self.common.hub_name.to_ascii_lowercase())
    }
}

impl BackendOptions for CloudStoreOptions {
    const KIND: BackendKind = BackendKind::CloudStore;
    const TYPE_NAME: &'static str = "CloudStoreOptions";

    fn common(&self) -> &CommonOptions {
        &self.common
    }

    fn validate(&self) -> BootstrapResult<()> {
        let kind = Self::KIND;
        self.common.validate(kind)?;

        let hub = &self.common.hub_name;
        if hub.len() < CLOUD_STORE_HUB_NAME_MIN || hub.len() > CLOUD_STORE_HUB_NAME_MAX {
            return Err(BootstrapError::invalid_configuration(
                kind,
                "hub_name",
                format!(
                    "must be {CLOUD_STORE_HUB_NAME_MIN}-{CLOUD_STORE_HUB_NAME_MAX} characters, got {}",
                    hub.len()
                ),
            ));
        }
        let starts_with_letter = hub.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
        if !starts_with_letter || !hub.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(BootstrapError::invalid_configuration(
                kind,
                "hub_name",
                "must start with a letter and contain only letters and digits",
            ));
        }
        if self.connection_name.trim().is_empty() {
            return Err(BootstrapError::invalid_configuration(
                kind,
                "connection_name",
                "must not be empty",
            ));
        }
        if !(1..=CLOUD_STORE_MAX_PARTITIONS).contains(&self.partition_count) {
            return Err(BootstrapError::invalid_configuration(
                kind,
                "partition_count",
                format!(
                    "must be between 1 and {CLOUD_STORE_MAX_PARTITIONS}, got {}",
                    self.partition_count
                ),
            ));
        }
        if !(1..=CLOUD_STORE_MAX_CONTROL_BATCH).contains(&self.control_queue_batch_size) {
            return Err(BootstrapError::invalid_configuration(
                kind,
                "control_queue_batch_size",
                format!(
                    "must be between 1 and {CLOUD_STORE_MAX_CONTROL_BATCH}, got {}",
                    self.control_queue_batch_size
                ),
            ));
        }
        if self.work_item_visibility_timeout_seconds == 0 {
            return Err(BootstrapError::invalid_configuration(
                kind,
                "work_item_visibility_timeout_seconds",
                "must be greater than zero",
            ));
        }
        if self.max_queue_polling_interval_seconds == 0 {
            return Err(BootstrapError::invalid_configuration(
                kind,
                "max_queue_polling_interval_seconds",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Key-value store options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyValueStoreOptions {
    #[serde(flatten)]
    pub common: CommonOptions,
    /// Name of the connection holding the key-value server endpoint
    pub connection_name: String,
    /// Logical database index (0..=15)
    pub database: i32,
    /// Prefix for every key the engine writes; defaults to the hub name
    pub key_prefix: Option<String>,
}

impl Default for KeyValueStoreOptions {
    fn default() -> Self {
        Self {
            common: CommonOptions::default(),
            connection_name: "Cache".to_string(),
            database: 0,
            key_prefix: None,
        }
    }
}

impl KeyValueStoreOptions {
    pub fn effective_key_prefix(&self) -> &str {
        self.key_prefix
            .as_deref()
            .unwrap_or(self.common.hub_name.as_str())
    }
}

impl BackendOptions for KeyValueStoreOptions {
    const KIND: BackendKind = BackendKind::KeyValueStore;
    const TYPE_NAME: &'static str = "KeyValueStoreOptions";

    fn common(&self) -> &CommonOptions {
        &self.common
    }

    fn validate(&self) -> BootstrapResult<()> {
        let kind = Self::KIND;
        self.common.validate(kind)?;

        if self.common.hub_name.chars().any(char::is_whitespace) {
            return Err(BootstrapError::invalid_configuration(
                kind,
                "hub_name",
                "must not contain whitespace",
            ));
        }
        if self.connection_name.trim().is_empty() {
            return Err(BootstrapError::invalid_configuration(
                kind,
                "connection_name",
                "must not be empty",
            ));
        }
        if !(0..=KEY_VALUE_MAX_DATABASE).contains(&self.database) {
            return Err(BootstrapError::invalid_configuration(
                kind,
                "database",
                format!(
                    "must be between 0 and {KEY_VALUE_MAX_DATABASE}, got {}",
                    self.database
                ),
            ));
        }
        if let Some(prefix) = &self.key_prefix {
            if prefix.is_empty() || prefix.chars().any(char::is_whitespace) {
                return Err(BootstrapError::invalid_configuration(
                    kind,
                    "key_prefix",
                    "must be non-empty and contain no whitespace",
                ));
            }
        }
        Ok(())
    }
}

/// In-memory emulator options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmulatorOptions {
    #[serde(flatten)]
    pub common: CommonOptions,
    pub max_orchestration_instances: usize,
}

impl Default for EmulatorOptions {
    fn default() -> Self {
        Self {
            common: CommonOptions::default(),
            max_orchestration_instances: 1000,
        }
    }
}

impl BackendOptions for EmulatorOptions {
    const KIND: BackendKind = BackendKind::Emulator;
    const TYPE_NAME: &'static str = "EmulatorOptions";

    fn common(&self) -> &CommonOptions {
        &self.common
    }

    fn validate(&self) -> BootstrapResult<()> {
        self.common.validate(Self::KIND)?;
        if self.max_orchestration_instances == 0 {
            return Err(BootstrapError::invalid_configuration(
                Self::KIND,
                "max_orchestration_instances",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Options for exactly one backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrchestrationOptions {
    CloudStore(CloudStoreOptions),
    KeyValueStore(KeyValueStoreOptions),
    Emulator(EmulatorOptions),
}

impl OrchestrationOptions {
    /// Backend-declared defaults for `kind`
    pub fn default_for(kind: BackendKind) -> Self {
        match kind {
            BackendKind::CloudStore => CloudStoreOptions::default().into(),
            BackendKind::KeyValueStore => KeyValueStoreOptions::default().into(),
            BackendKind::Emulator => EmulatorOptions::default().into(),
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Self::CloudStore(_) => BackendKind::CloudStore,
            Self::KeyValueStore(_) => BackendKind::KeyValueStore,
            Self::Emulator(_) => BackendKind::Emulator,
        }
    }

    /// Concrete options type name, as reported in dispatch errors
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::CloudStore(_) => CloudStoreOptions::TYPE_NAME,
            Self::KeyValueStore(_) => KeyValueStoreOptions::TYPE_NAME,
            Self::Emulator(_) => EmulatorOptions::TYPE_NAME,
        }
    }

    pub fn common(&self) -> &CommonOptions {
        match self {
            Self::CloudStore(options) => options.common(),
            Self::KeyValueStore(options) => options.common(),
            Self::Emulator(options) => options.common(),
        }
    }

    pub fn validate(&self) -> BootstrapResult<()> {
        match self {
            Self::CloudStore(options) => options.validate(),
            Self::KeyValueStore(options) => options.validate(),
            Self::Emulator(options) => options.validate(),
        }
    }
}

impl From<CloudStoreOptions> for OrchestrationOptions {
    fn from(options: CloudStoreOptions) -> Self {
        Self::CloudStore(options)
    }
}

impl From<KeyValueStoreOptions> for OrchestrationOptions {
    fn from(options: KeyValueStoreOptions) -> Self {
        Self::KeyValueStore(options)
    }
}

impl From<EmulatorOptions> for OrchestrationOptions {
    fn from(options: EmulatorOptions) -> Self {
        Self::Emulator(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(err: BootstrapError) -> String {
        match err {
            BootstrapError::InvalidConfiguration { field, .. } => field,
            other => panic!("expected InvalidConfiguration, got {other:?}"),
        }
    }

    #[test]
    fn test_defaults_validate_for_every_backend() {
        for kind in BackendKind::ALL {
            let options = OrchestrationOptions::default_for(kind);
            assert_eq!(options.kind(), kind);
            options.validate().expect("defaults must validate");
        }
    }

    #[test]
    fn test_negative_partition_count_is_rejected() {
        let options = CloudStoreOptions {
            partition_count: -1,
            ..Default::default()
        };
        assert_eq!(field_of(options.validate().unwrap_err()), "partition_count");
    }

    #[test]
    fn test_cloud_store_hub_name_rules() {
        let mut options = CloudStoreOptions::default();
        options.common.hub_name = "ab".to_string();
        assert_eq!(field_of(options.validate().unwrap_err()), "hub_name");

        options.common.hub_name = "1hub".to_string();
        assert_eq!(field_of(options.validate().unwrap_err()), "hub_name");

        options.common.hub_name = "my-hub".to_string();
        assert_eq!(field_of(options.validate().unwrap_err()), "hub_name");
    }

    #[test]
    fn test_retry_backoff_must_be_at_least_one() {
        let mut options = EmulatorOptions::default();
        options.common.retry.backoff_coefficient = 0.5;
        assert_eq!(
            field_of(options.validate().unwrap_err()),
            "retry.backoff_coefficient"
        );
    }

    #[test]
    fn test_key_value_database_range() {
        let options = KeyValueStoreOptions {
            database: 16,
            ..Default::default()
        };
        assert_eq!(field_of(options.validate().unwrap_err()), "database");
    }

    #[test]
    fn test_key_prefix_defaults_to_hub_name() {
        let mut options = KeyValueStoreOptions::default();
        assert_eq!(options.effective_key_prefix(), "DurableFunctionsHub");
        options.key_prefix = Some("orders".to_string());
        assert_eq!(options.effective_key_prefix(), "orders");
    }

    #[test]
    fn test_control_queue_names_follow_partitions() {
        let mut options = CloudStoreOptions::default();
        options.common.hub_name = "OrdersHub".to_string();
        options.partition_count = 2;
        assert_eq!(
            options.control_queue_names(),
            vec!["ordershub-control-00", "ordershub-control-01"]
        );
        assert_eq!(options.work_item_queue_name(), "ordershub-workitems");
    }

    #[test]
    fn test_type_names_match_variants() {
        assert_eq!(
            OrchestrationOptions::default_for(BackendKind::CloudStore).type_name(),
            "CloudStoreOptions"
        );
        assert_eq!(
            OrchestrationOptions::default_for(BackendKind::Emulator).type_name(),
            "EmulatorOptions"
        );
    }
}
