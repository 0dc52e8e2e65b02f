use super::events::BootstrapEvent;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Extension bootstrap lifecycle states
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum BootstrapState {
    /// Initial state; nothing has happened yet
    Created,
    /// Options are bound and fully defaulted
    Defaulted,
    /// Backend loader hook is active
    LoaderHooksRegistered,
    /// Service handle constructed by the backend factory
    ServiceConstructed,
    /// Registration handed to the host
    Registered,
    /// Initialization aborted
    Failed(String),
}

impl BootstrapState {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Registered | Self::Failed(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// State reached by applying `event`, or `None` if the transition is illegal
    pub fn next(&self, event: &BootstrapEvent) -> Option<BootstrapState> {
        match (self, event) {
            (state, BootstrapEvent::Fail(reason)) if !state.is_terminal() => {
                Some(Self::Failed(reason.clone()))
            }
            (Self::Created, BootstrapEvent::ApplyDefaults) => Some(Self::Defaulted),
            (Self::Defaulted, BootstrapEvent::RegisterLoaderHooks) => {
                Some(Self::LoaderHooksRegistered)
            }
            (Self::LoaderHooksRegistered, BootstrapEvent::ConstructService) => {
                Some(Self::ServiceConstructed)
            }
            (Self::ServiceConstructed, BootstrapEvent::RegisterWithHost) => Some(Self::Registered),
            _ => None,
        }
    }
}

impl fmt::Display for BootstrapState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Defaulted => write!(f, "defaulted"),
            Self::LoaderHooksRegistered => write!(f, "loader_hooks_registered"),
            Self::ServiceConstructed => write!(f, "service_constructed"),
            Self::Registered => write!(f, "registered"),
            Self::Failed(reason) => write!(f, "failed({reason})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_sequence() {
        let events = [
            BootstrapEvent::ApplyDefaults,
            BootstrapEvent::RegisterLoaderHooks,
            BootstrapEvent::ConstructService,
            BootstrapEvent::RegisterWithHost,
        ];
        let mut state = BootstrapState::Created;
        for event in &events {
            state = state.next(event).expect("legal transition");
        }
        assert_eq!(state, BootstrapState::Registered);
        assert!(state.is_terminal());
    }

    #[test]
    fn test_steps_cannot_be_skipped() {
        assert_eq!(
            BootstrapState::Created.next(&BootstrapEvent::ConstructService),
            None
        );
        assert_eq!(
            BootstrapState::Defaulted.next(&BootstrapEvent::RegisterWithHost),
            None
        );
    }

    #[test]
    fn test_fail_reachable_from_every_non_terminal_state() {
        for state in [
            BootstrapState::Created,
            BootstrapState::Defaulted,
            BootstrapState::LoaderHooksRegistered,
            BootstrapState::ServiceConstructed,
        ] {
            let failed = state.next(&BootstrapEvent::Fail("boom".into()));
            assert_eq!(failed, Some(BootstrapState::Failed("boom".into())));
        }
    }

    #[test]
    fn test_terminal_states_accept_nothing() {
        let failed = BootstrapState::Failed("earlier".into());
        assert_eq!(failed.next(&BootstrapEvent::Fail("again".into())), None);
        assert_eq!(
            BootstrapState::Registered.next(&BootstrapEvent::ApplyDefaults),
            None
        );
    }
}
