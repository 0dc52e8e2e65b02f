//! # Durability Backends
//!
//! The closed set of durability backends and their strongly-typed options.
//!
//! ```text
//! BackendKind (closed enum)
//!   ├── CloudStore     <- blob/queue/table storage account
//!   ├── KeyValueStore  <- key-value server
//!   └── Emulator       <- in-process, no external configuration
//! ```
//!
//! `OrchestrationOptions` carries exactly one backend-specific payload, so the
//! variant of an options value is always the backend it belongs to.

pub mod binder;
pub mod options;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use binder::{
    backend_kind_of, bind_raw, binder_for, OptionsBinder, RawOptions, TypedOptionsBinder,
    BACKEND_TYPE_KEY,
};
pub use options::{
    BackendOptions, CloudStoreOptions, CommonOptions, EmulatorOptions, KeyValueStoreOptions,
    OrchestrationOptions, RetryOptions,
};

/// Durability backend discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Cloud blob/queue/table-backed store
    CloudStore,
    /// Key-value-store-backed store
    KeyValueStore,
    /// Local in-memory emulator
    Emulator,
}

impl BackendKind {
    /// Every known backend, in dispatch order
    pub const ALL: [BackendKind; 3] = [Self::CloudStore, Self::KeyValueStore, Self::Emulator];

    /// Stable identifier used in configuration and logs
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CloudStore => "cloud_store",
            Self::KeyValueStore => "key_value_store",
            Self::Emulator => "emulator",
        }
    }

    /// Extension name the host registers this backend under
    pub fn extension_name(self) -> &'static str {
        match self {
            Self::CloudStore => "DurableTask",
            Self::KeyValueStore => "DurableTaskKeyValue",
            Self::Emulator => "DurableTaskEmulator",
        }
    }

    /// Dense index, used for per-kind guards
    pub(crate) fn index(self) -> usize {
        match self {
            Self::CloudStore => 0,
            Self::KeyValueStore => 1,
            Self::Emulator => 2,
        }
    }

    /// Parse the configured backend type.
    ///
    /// Accepts the snake_case identifier or the PascalCase variant name,
    /// case-insensitively. Anything else is `None`, never a default.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL.into_iter().find(|kind| {
            value.eq_ignore_ascii_case(kind.as_str())
                || value.eq_ignore_ascii_case(kind.variant_name())
        })
    }

    fn variant_name(self) -> &'static str {
        match self {
            Self::CloudStore => "CloudStore",
            Self::KeyValueStore => "KeyValueStore",
            Self::Emulator => "Emulator",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_known_spellings() {
        assert_eq!(BackendKind::parse("CloudStore"), Some(BackendKind::CloudStore));
        assert_eq!(BackendKind::parse("cloud_store"), Some(BackendKind::CloudStore));
        assert_eq!(
            BackendKind::parse(" Key_Value_Store "),
            Some(BackendKind::KeyValueStore)
        );
        assert_eq!(BackendKind::parse("EMULATOR"), Some(BackendKind::Emulator));
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert_eq!(BackendKind::parse("Unknown"), None);
        assert_eq!(BackendKind::parse(""), None);
    }

    #[test]
    fn test_parse_rejects_mangled_separators() {
        assert_eq!(BackendKind::parse("clo-ud_store"), None);
        assert_eq!(BackendKind::parse("e_m_u_l_a_t_o_r"), None);
        assert_eq!(BackendKind::parse("key-value-store"), None);
        assert_eq!(BackendKind::parse("Cloud_Store_"), None);
    }

    #[test]
    fn test_indices_are_dense_and_unique() {
        let mut seen = [false; 3];
        for kind in BackendKind::ALL {
            assert!(!seen[kind.index()]);
            seen[kind.index()] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for kind in BackendKind::ALL {
            assert_eq!(BackendKind::parse(&kind.to_string()), Some(kind));
        }
    }
}
