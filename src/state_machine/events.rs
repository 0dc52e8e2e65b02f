use serde::{Deserialize, Serialize};

/// Events that drive the extension bootstrap lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum BootstrapEvent {
    /// Options bound and defaulted
    ApplyDefaults,
    /// Backend loader hook present in the registry
    RegisterLoaderHooks,
    /// Factory produced a service handle
    ConstructService,
    /// Registration handed to the host
    RegisterWithHost,
    /// Any step failed
    Fail(String),
}

impl BootstrapEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ApplyDefaults => "apply_defaults",
            Self::RegisterLoaderHooks => "register_loader_hooks",
            Self::ConstructService => "construct_service",
            Self::RegisterWithHost => "register_with_host",
            Self::Fail(_) => "fail",
        }
    }

    /// Extract error message if this is a failure event
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Fail(msg) => Some(msg),
            _ => None,
        }
    }
}
