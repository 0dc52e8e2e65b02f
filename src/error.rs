//! # Bootstrap Error Types
//!
//! Structured errors for backend selection and extension bootstrap. Every
//! variant aborts initialization of the current host instance; none of them
//! are recovered inside this crate.

use crate::backend::BackendKind;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced to the hosting runtime during extension bootstrap
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BootstrapError {
    /// Options variant (or configured backend type) outside the known set,
    /// or options handed to a bootstrap built for another backend
    #[error("Unsupported backend: options of type `{type_name}` are not supported{}", expected_suffix(.expected))]
    UnsupportedBackend {
        type_name: String,
        expected: Option<BackendKind>,
    },

    /// Required connection could not be resolved
    #[error("Missing connection `{connection_name}` required by the {backend} backend")]
    MissingConnection {
        backend: BackendKind,
        connection_name: String,
    },

    /// Bound options failed backend-specific validation
    #[error("Invalid configuration for the {backend} backend: `{field}` {reason}")]
    InvalidConfiguration {
        backend: BackendKind,
        field: String,
        reason: String,
    },

    /// Backend provisioning did not finish within its bound
    #[error("Provisioning of the {backend} backend timed out after {timeout:?}")]
    ProvisioningTimeout {
        backend: BackendKind,
        timeout: Duration,
    },

    /// Backend client reported a provisioning failure
    #[error("Provisioning of the {backend} backend failed: {reason}")]
    ProvisioningFailed { backend: BackendKind, reason: String },

    /// Lifecycle re-entry on a host instance that already left `Created`
    #[error("Extension for the {backend} backend already initialized (state: {state})")]
    AlreadyInitialized { backend: BackendKind, state: String },

    /// Configuration sources could not be loaded or deserialized
    #[error("Configuration error: {0}")]
    Configuration(String),
}

fn expected_suffix(expected: &Option<BackendKind>) -> String {
    match expected {
        Some(kind) => format!(" by the {kind} bootstrap"),
        None => String::new(),
    }
}

impl BootstrapError {
    /// Create an unsupported backend error for an unknown options type
    pub fn unsupported_backend(type_name: impl Into<String>) -> Self {
        Self::UnsupportedBackend {
            type_name: type_name.into(),
            expected: None,
        }
    }

    /// Create an unsupported backend error for options handed to the wrong bootstrap
    pub fn mismatched_backend(type_name: impl Into<String>, expected: BackendKind) -> Self {
        Self::UnsupportedBackend {
            type_name: type_name.into(),
            expected: Some(expected),
        }
    }

    /// Create a missing connection error
    pub fn missing_connection(backend: BackendKind, connection_name: impl Into<String>) -> Self {
        Self::MissingConnection {
            backend,
            connection_name: connection_name.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_configuration(
        backend: BackendKind,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidConfiguration {
            backend,
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a provisioning failure error
    pub fn provisioning_failed(backend: BackendKind, reason: impl Into<String>) -> Self {
        Self::ProvisioningFailed {
            backend,
            reason: reason.into(),
        }
    }

    /// Backend kind the error relates to, when known
    pub fn backend_kind(&self) -> Option<BackendKind> {
        match self {
            Self::UnsupportedBackend { expected, .. } => *expected,
            Self::MissingConnection { backend, .. }
            | Self::InvalidConfiguration { backend, .. }
            | Self::ProvisioningTimeout { backend, .. }
            | Self::ProvisioningFailed { backend, .. }
            | Self::AlreadyInitialized { backend, .. } => Some(*backend),
            Self::Configuration(_) => None,
        }
    }

    /// Whether a caller may reasonably retry the whole initialization
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ProvisioningTimeout { .. })
    }
}

impl From<config::ConfigError> for BootstrapError {
    fn from(error: config::ConfigError) -> Self {
        BootstrapError::Configuration(error.to_string())
    }
}

pub type BootstrapResult<T> = std::result::Result<T, BootstrapError>;
