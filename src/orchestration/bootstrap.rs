//! # Extension Bootstrap
//!
//! Drives one host instance through the bootstrap lifecycle:
//!
//! ```text
//! Created -> Defaulted -> LoaderHooksRegistered -> ServiceConstructed -> Registered
//!    \___________\_______________\_______________________\--> Failed(reason)
//! ```
//!
//! Every backend runs the same lifecycle. What differs per backend is carried
//! by a `BackendStrategy`: its options binder, service factory, loader hook and
//! specialty capability builder.

use super::factory::{factory_for, OrchestrationServiceFactory};
use super::host::{ExtensionHost, ExtensionRegistration};
use super::provisioner::StorageProvisioner;
use super::specialty::{capability_for, CapabilityBuilder};
use crate::backend::{binder_for, BackendKind, OptionsBinder, OrchestrationOptions, RawOptions};
use crate::connection::ConnectionResolver;
use crate::error::{BootstrapError, BootstrapResult};
use crate::logging::log_bootstrap_operation;
use crate::registry::{LoaderHook, LoaderHookRegistry};
use crate::state_machine::{BootstrapEvent, BootstrapState};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Per-backend parts of the lifecycle
#[derive(Clone)]
pub struct BackendStrategy {
    kind: BackendKind,
    binder: Arc<dyn OptionsBinder>,
    factory: Arc<dyn OrchestrationServiceFactory>,
    loader_hook: LoaderHook,
    capability: CapabilityBuilder,
}

impl BackendStrategy {
    /// Assemble a strategy from explicit parts.
    ///
    /// Every part must belong to `kind`; mixing backends is rejected.
    pub fn new(
        kind: BackendKind,
        binder: Arc<dyn OptionsBinder>,
        factory: Arc<dyn OrchestrationServiceFactory>,
        loader_hook: LoaderHook,
        capability: CapabilityBuilder,
    ) -> BootstrapResult<Self> {
        let parts = [
            ("binder", binder.backend_kind()),
            ("factory", factory.backend_kind()),
            ("loader_hook", loader_hook.backend()),
        ];
        if let Some((part, other)) = parts.iter().find(|(_, part_kind)| *part_kind != kind) {
            return Err(BootstrapError::Configuration(format!(
                "{kind} strategy was given a {part} for the {other} backend"
            )));
        }
        Ok(Self {
            kind,
            binder,
            factory,
            loader_hook,
            capability,
        })
    }

    /// Standard strategy for `kind`
    pub fn for_backend(
        kind: BackendKind,
        provisioner: Arc<dyn StorageProvisioner>,
        provisioning_timeout: Duration,
    ) -> Self {
        Self {
            kind,
            binder: binder_for(kind),
            factory: factory_for(kind, provisioner, provisioning_timeout),
            loader_hook: LoaderHook::for_backend(kind),
            capability: capability_for(kind),
        }
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    pub fn binder(&self) -> &Arc<dyn OptionsBinder> {
        &self.binder
    }

    pub fn factory(&self) -> &Arc<dyn OrchestrationServiceFactory> {
        &self.factory
    }

    pub fn loader_hook(&self) -> LoaderHook {
        self.loader_hook
    }
}

impl fmt::Debug for BackendStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendStrategy")
            .field("kind", &self.kind)
            .field("factory", &self.factory)
            .field("loader_hook", &self.loader_hook)
            .finish()
    }
}

/// Options as supplied by the caller
#[derive(Debug, Clone, PartialEq)]
pub enum OptionsInput {
    /// Typed options; validated but not re-defaulted
    Bound(OrchestrationOptions),
    /// Raw configuration, bound through the backend's binder
    Raw(RawOptions),
    /// Nothing supplied; the backend's defaults are used
    Unconfigured,
}

impl From<OrchestrationOptions> for OptionsInput {
    fn from(options: OrchestrationOptions) -> Self {
        Self::Bound(options)
    }
}

impl From<RawOptions> for OptionsInput {
    fn from(raw: RawOptions) -> Self {
        Self::Raw(raw)
    }
}

/// Lifecycle driver for one host instance
#[derive(Debug)]
pub struct ExtensionBootstrap {
    strategy: BackendStrategy,
    input: Option<OptionsInput>,
    options: Option<OrchestrationOptions>,
    state: BootstrapState,
    resolver: Arc<ConnectionResolver>,
    loader_hooks: Arc<LoaderHookRegistry>,
}

impl ExtensionBootstrap {
    pub fn new(
        strategy: BackendStrategy,
        input: impl Into<OptionsInput>,
        resolver: Arc<ConnectionResolver>,
        loader_hooks: Arc<LoaderHookRegistry>,
    ) -> Self {
        Self {
            strategy,
            input: Some(input.into()),
            options: None,
            state: BootstrapState::Created,
            resolver,
            loader_hooks,
        }
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.strategy.kind
    }

    pub fn state(&self) -> &BootstrapState {
        &self.state
    }

    /// Fully defaulted options, once the lifecycle reached `Defaulted`
    pub fn options(&self) -> Option<&OrchestrationOptions> {
        self.options.as_ref()
    }

    /// Run the lifecycle and register with `host`.
    ///
    /// Valid only from `Created`. Any step error moves the bootstrap to
    /// `Failed` and is returned unchanged.
    pub async fn initialize(
        &mut self,
        host: &dyn ExtensionHost,
    ) -> BootstrapResult<ExtensionRegistration> {
        if self.state != BootstrapState::Created {
            return Err(BootstrapError::AlreadyInitialized {
                backend: self.strategy.kind,
                state: self.state.to_string(),
            });
        }

        info!(backend = %self.strategy.kind, "🚀 BOOTSTRAP: Initializing durable extension");
        match self.run_lifecycle(host).await {
            Ok(registration) => {
                info!(
                    backend = %self.strategy.kind,
                    extension = registration.extension_name,
                    hub = %registration.service.hub_name(),
                    "🎉 BOOTSTRAP: Extension registered"
                );
                Ok(registration)
            }
            Err(e) => {
                error!(backend = %self.strategy.kind, state = %self.state, error = %e, "❌ BOOTSTRAP: Initialization failed");
                self.transition(BootstrapEvent::Fail(e.to_string()))?;
                Err(e)
            }
        }
    }

    async fn run_lifecycle(
        &mut self,
        host: &dyn ExtensionHost,
    ) -> BootstrapResult<ExtensionRegistration> {
        let kind = self.strategy.kind;

        let options = self.apply_defaults()?;
        self.options = Some(options.clone());
        self.transition(BootstrapEvent::ApplyDefaults)?;

        self.loader_hooks.register(self.strategy.loader_hook);
        self.transition(BootstrapEvent::RegisterLoaderHooks)?;

        let service = Arc::new(
            self.strategy
                .factory
                .create(&options, &self.resolver)
                .await?,
        );
        self.transition(BootstrapEvent::ConstructService)?;

        let specialty = (self.strategy.capability)(&service);
        let registration = ExtensionRegistration::new(kind, service, specialty);
        host.register_extension(registration.clone())?;
        self.transition(BootstrapEvent::RegisterWithHost)?;

        Ok(registration)
    }

    fn apply_defaults(&mut self) -> BootstrapResult<OrchestrationOptions> {
        let kind = self.strategy.kind;
        match self.input.take().unwrap_or(OptionsInput::Unconfigured) {
            OptionsInput::Bound(options) => {
                if options.kind() != kind {
                    return Err(BootstrapError::mismatched_backend(options.type_name(), kind));
                }
                match serde_json::to_value(&options) {
                    Ok(Value::Object(raw)) if has_setting_reference(&raw) => self.bind_expanded(raw),
                    _ => {
                        options.validate()?;
                        Ok(options)
                    }
                }
            }
            OptionsInput::Raw(raw) => self.bind_expanded(raw),
            OptionsInput::Unconfigured => Ok(self.strategy.binder.default_options()),
        }
    }

    fn bind_expanded(&self, mut raw: RawOptions) -> BootstrapResult<OrchestrationOptions> {
        self.resolver.expand_setting_references(&mut raw, self.strategy.kind)?;
        self.strategy.binder.bind(&raw)
    }

    fn transition(&mut self, event: BootstrapEvent) -> BootstrapResult<()> {
        let next = self
            .state
            .next(&event)
            .ok_or_else(|| BootstrapError::AlreadyInitialized {
                backend: self.strategy.kind,
                state: self.state.to_string(),
            })?;
        log_bootstrap_operation(self.strategy.kind, &event, &self.state, &next);
        self.state = next;
        Ok(())
    }
}

fn has_setting_reference(raw: &RawOptions) -> bool {
    raw.values().any(|value| match value {
        Value::String(text) => text.contains('%'),
        Value::Object(nested) => has_setting_reference(nested),
        _ => false,
    })
}
