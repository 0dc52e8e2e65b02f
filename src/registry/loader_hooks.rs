//! # Loader Hook Registry
//!
//! Resource-resolution hooks, at most one per backend. A hook maps a requested
//! module name to the backend's module reference when the name carries the
//! backend's prefix, and passes through (`None`) otherwise.
//!
//! ## Thread Safety
//!
//! Each backend has its own `OnceLock` slot. Registration is register-if-absent
//! and publishes the hook with release ordering; `resolve` reads with acquire
//! ordering, so a resolver running on another thread either sees a fully
//! initialized hook or no hook at all. Hooks hold only `'static` immutable data
//! and may run concurrently and re-entrantly. Nothing is ever unregistered.

use crate::backend::BackendKind;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

/// Reference to a backend module, returned on a prefix match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleRef {
    pub backend: BackendKind,
    pub name: &'static str,
    pub version: &'static str,
}

/// Resolution hook for one backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderHook {
    backend: BackendKind,
    prefix: &'static str,
    module: ModuleRef,
}

impl LoaderHook {
    /// The hook each backend installs
    pub fn for_backend(backend: BackendKind) -> Self {
        let prefix = match backend {
            BackendKind::CloudStore => "durabletask.cloudstore",
            BackendKind::KeyValueStore => "durabletask.keyvalue",
            BackendKind::Emulator => "durabletask.emulator",
        };
        Self {
            backend,
            prefix,
            module: ModuleRef {
                backend,
                name: prefix,
                version: env!("CARGO_PKG_VERSION"),
            },
        }
    }

    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    pub fn prefix(&self) -> &'static str {
        self.prefix
    }

    /// Module reference when `requested` starts with this hook's prefix
    pub fn resolve(&self, requested: &str) -> Option<ModuleRef> {
        requested.starts_with(self.prefix).then_some(self.module)
    }
}

/// Registry of active resolution hooks
#[derive(Debug)]
pub struct LoaderHookRegistry {
    slots: [OnceLock<LoaderHook>; 3],
}

static PROCESS_REGISTRY: OnceLock<Arc<LoaderHookRegistry>> = OnceLock::new();

impl LoaderHookRegistry {
    /// Fresh, empty registry (tests, embedded hosts)
    pub fn new() -> Self {
        Self {
            slots: [OnceLock::new(), OnceLock::new(), OnceLock::new()],
        }
    }

    /// Process-wide registry shared by every host instance in the process
    pub fn process() -> Arc<LoaderHookRegistry> {
        PROCESS_REGISTRY
            .get_or_init(|| Arc::new(LoaderHookRegistry::new()))
            .clone()
    }

    /// Register `hook` unless its backend already has one.
    ///
    /// Returns `true` when this call installed the hook. A duplicate is a
    /// silent no-op.
    pub fn register(&self, hook: LoaderHook) -> bool {
        let installed = self.slots[hook.backend.index()].set(hook).is_ok();
        if installed {
            info!(backend = %hook.backend, prefix = hook.prefix, "Loader hook registered");
        } else {
            debug!(backend = %hook.backend, "Loader hook already registered");
        }
        installed
    }

    pub fn is_registered(&self, backend: BackendKind) -> bool {
        self.slots[backend.index()].get().is_some()
    }

    pub fn active_hooks(&self) -> Vec<LoaderHook> {
        self.slots.iter().filter_map(|slot| slot.get().copied()).collect()
    }

    /// Ask every active hook, in backend order; `None` when nothing matches
    pub fn resolve(&self, requested: &str) -> Option<ModuleRef> {
        self.slots
            .iter()
            .filter_map(OnceLock::get)
            .find_map(|hook| hook.resolve(requested))
    }
}

impl Default for LoaderHookRegistry {
    fn default() -> Self {
        Self::new()
    }
}
