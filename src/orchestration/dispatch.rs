//! # Backend Selector
//!
//! Single point of polymorphic dispatch. Maps an options value (typed, raw or
//! absent) to the matching backend strategy and runs its bootstrap.
//!
//! A selector stands for one host instance: `initialize` and
//! `initialize_from_config` succeed or fail once, and every later call is
//! rejected with `AlreadyInitialized`.

use super::bootstrap::{BackendStrategy, ExtensionBootstrap, OptionsInput};
use super::host::{ExtensionHost, ExtensionRegistration};
use super::provisioner::{InMemoryProvisioner, StorageProvisioner};
use crate::backend::{backend_kind_of, BackendKind, OrchestrationOptions, RawOptions};
use crate::config::BootstrapConfig;
use crate::connection::{
    ChainedConnectionSource, ConnectionResolver, EnvironmentConnectionSource,
    StaticConnectionSource,
};
use crate::error::{BootstrapError, BootstrapResult};
use crate::registry::LoaderHookRegistry;
use crate::state_machine::BootstrapState;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const DEFAULT_PROVISIONING_TIMEOUT: Duration = Duration::from_secs(30);

/// Selects and runs the bootstrap for a host instance
#[derive(Debug)]
pub struct BackendSelector {
    resolver: Arc<ConnectionResolver>,
    loader_hooks: Arc<LoaderHookRegistry>,
    provisioner: Arc<dyn StorageProvisioner>,
    provisioning_timeout: Duration,
    /// Backend and latest lifecycle state of this host's initialization
    host_state: Mutex<Option<(BackendKind, BootstrapState)>>,
}

impl BackendSelector {
    pub fn new(
        resolver: Arc<ConnectionResolver>,
        loader_hooks: Arc<LoaderHookRegistry>,
        provisioner: Arc<dyn StorageProvisioner>,
        provisioning_timeout: Duration,
    ) -> Self {
        Self {
            resolver,
            loader_hooks,
            provisioner,
            provisioning_timeout,
            host_state: Mutex::new(None),
        }
    }

    /// Selector over the process-wide hook registry with environment connections
    pub fn from_environment(provisioner: Arc<dyn StorageProvisioner>) -> Self {
        Self::new(
            Arc::new(ConnectionResolver::from_environment()),
            LoaderHookRegistry::process(),
            provisioner,
            DEFAULT_PROVISIONING_TIMEOUT,
        )
    }

    /// Selector built from loaded configuration.
    ///
    /// Connections come from the `connections` section first, then the
    /// environment.
    pub fn from_config(config: &BootstrapConfig, provisioner: Arc<dyn StorageProvisioner>) -> Self {
        let source = ChainedConnectionSource::new(vec![
            Arc::new(StaticConnectionSource::new(config.connections.clone())),
            Arc::new(EnvironmentConnectionSource),
        ]);
        Self::new(
            Arc::new(ConnectionResolver::new(Arc::new(source))),
            LoaderHookRegistry::process(),
            provisioner,
            config.provisioning_timeout(),
        )
    }

    pub fn resolver(&self) -> &Arc<ConnectionResolver> {
        &self.resolver
    }

    pub fn loader_hooks(&self) -> &Arc<LoaderHookRegistry> {
        &self.loader_hooks
    }

    /// Backend and lifecycle state of this host's initialization, if any ran
    pub fn host_state(&self) -> Option<(BackendKind, BootstrapState)> {
        self.host_state.lock().clone()
    }

    /// Strategy for `kind`
    pub fn strategy_for(&self, kind: BackendKind) -> BackendStrategy {
        BackendStrategy::for_backend(kind, self.provisioner.clone(), self.provisioning_timeout)
    }

    /// Bootstrap for typed options; the options' own variant picks the backend
    pub fn bootstrap_for(&self, options: OrchestrationOptions) -> ExtensionBootstrap {
        let kind = options.kind();
        self.bootstrap_with(kind, OptionsInput::Bound(options))
    }

    /// Bootstrap for raw configuration; the `type` key picks the backend
    pub fn bootstrap_for_raw(&self, raw: RawOptions) -> BootstrapResult<ExtensionBootstrap> {
        let kind = backend_kind_of(&raw)?;
        Ok(self.bootstrap_with(kind, OptionsInput::Raw(raw)))
    }

    /// Bootstrap for `kind` with explicit input
    pub fn bootstrap_with(&self, kind: BackendKind, input: OptionsInput) -> ExtensionBootstrap {
        info!(backend = %kind, "🔀 Backend selected");
        ExtensionBootstrap::new(
            self.strategy_for(kind),
            input,
            self.resolver.clone(),
            self.loader_hooks.clone(),
        )
    }

    /// Select, bootstrap and register in one call
    pub async fn initialize(
        &self,
        options: OrchestrationOptions,
        host: &dyn ExtensionHost,
    ) -> BootstrapResult<ExtensionRegistration> {
        self.initialize_once(self.bootstrap_for(options), host).await
    }

    /// Select from the `storage_provider` section of `config` and register
    pub async fn initialize_from_config(
        &self,
        config: &BootstrapConfig,
        host: &dyn ExtensionHost,
    ) -> BootstrapResult<ExtensionRegistration> {
        let bootstrap = self.bootstrap_for_raw(config.storage_provider.clone())?;
        self.initialize_once(bootstrap, host).await
    }

    async fn initialize_once(
        &self,
        mut bootstrap: ExtensionBootstrap,
        host: &dyn ExtensionHost,
    ) -> BootstrapResult<ExtensionRegistration> {
        let kind = bootstrap.backend_kind();
        self.claim_host(kind)?;
        let result = bootstrap.initialize(host).await;
        *self.host_state.lock() = Some((kind, bootstrap.state().clone()));
        result
    }

    fn claim_host(&self, kind: BackendKind) -> BootstrapResult<()> {
        let mut host_state = self.host_state.lock();
        if let Some((backend, state)) = host_state.as_ref() {
            warn!(
                backend = %backend,
                requested = %kind,
                state = %state,
                "⚠️ Host instance already initialized"
            );
            return Err(BootstrapError::AlreadyInitialized {
                backend: *backend,
                state: state.to_string(),
            });
        }
        *host_state = Some((kind, BootstrapState::Created));
        Ok(())
    }
}

impl Default for BackendSelector {
    fn default() -> Self {
        Self::from_environment(Arc::new(InMemoryProvisioner::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::KeyValueStoreOptions;
    use crate::error::BootstrapError;
    use crate::orchestration::host::InMemoryExtensionHost;
    use serde_json::json;

    fn selector() -> BackendSelector {
        let source = StaticConnectionSource::default().with("Cache", "localhost:6379");
        BackendSelector::new(
            Arc::new(ConnectionResolver::new(Arc::new(source))),
            Arc::new(LoaderHookRegistry::new()),
            Arc::new(InMemoryProvisioner::new()),
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_strategy_matches_requested_kind() {
        let selector = selector();
        for kind in BackendKind::ALL {
            let strategy = selector.strategy_for(kind);
            assert_eq!(strategy.kind(), kind);
            assert_eq!(strategy.binder().backend_kind(), kind);
            assert_eq!(strategy.factory().backend_kind(), kind);
            assert_eq!(strategy.loader_hook().backend(), kind);
        }
    }

    #[test]
    fn test_typed_options_select_their_own_backend() {
        let selector = selector();
        let bootstrap =
            selector.bootstrap_for(OrchestrationOptions::KeyValueStore(KeyValueStoreOptions::default()));
        assert_eq!(bootstrap.backend_kind(), BackendKind::KeyValueStore);
    }

    #[test]
    fn test_unknown_raw_type_is_unsupported() {
        let raw = json!({ "type": "Unknown" }).as_object().cloned().unwrap();
        let err = selector().bootstrap_for_raw(raw).unwrap_err();
        assert_eq!(err, BootstrapError::unsupported_backend("Unknown"));
    }

    #[tokio::test]
    async fn test_second_initialize_on_same_host_is_rejected() {
        let selector = selector();
        let host = InMemoryExtensionHost::new();

        selector
            .initialize(OrchestrationOptions::default_for(BackendKind::Emulator), &host)
            .await
            .unwrap();
        let err = selector
            .initialize(OrchestrationOptions::default_for(BackendKind::Emulator), &host)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            BootstrapError::AlreadyInitialized {
                backend: BackendKind::Emulator,
                state: "registered".to_string(),
            }
        );
        assert_eq!(host.registration_count(), 1);
        assert_eq!(
            selector.host_state(),
            Some((BackendKind::Emulator, BootstrapState::Registered))
        );
    }

    #[tokio::test]
    async fn test_failed_initialize_blocks_later_attempts() {
        let selector = selector();
        let host = InMemoryExtensionHost::new();

        let first = selector
            .initialize(OrchestrationOptions::default_for(BackendKind::CloudStore), &host)
            .await
            .unwrap_err();
        assert!(matches!(first, BootstrapError::MissingConnection { .. }));

        let second = selector
            .initialize(OrchestrationOptions::default_for(BackendKind::Emulator), &host)
            .await
            .unwrap_err();
        assert!(matches!(
            second,
            BootstrapError::AlreadyInitialized { backend: BackendKind::CloudStore, .. }
        ));
        assert_eq!(host.registration_count(), 0);
    }

    #[tokio::test]
    async fn test_hosts_sharing_hook_registry_register_hook_once() {
        let hooks = Arc::new(LoaderHookRegistry::new());
        let host = InMemoryExtensionHost::new();

        for _ in 0..2 {
            let selector = BackendSelector::new(
                Arc::new(ConnectionResolver::new(Arc::new(StaticConnectionSource::default()))),
                hooks.clone(),
                Arc::new(InMemoryProvisioner::new()),
                Duration::from_secs(5),
            );
            selector
                .initialize(OrchestrationOptions::default_for(BackendKind::Emulator), &host)
                .await
                .unwrap();
        }

        assert_eq!(host.registration_count(), 2);
        assert_eq!(hooks.active_hooks().len(), 1);
    }
}
