//! # Orchestration Service Factories
//!
//! One factory per backend. A factory accepts only options of its own variant,
//! resolves the connections its backend needs, performs bounded and idempotent
//! provisioning, and returns a handle ready to start.
//!
//! ```text
//! CloudStore    -> resolve `connection_name` -> ensure control + work-item queues
//! KeyValueStore -> resolve `connection_name` -> ensure key namespace
//! Emulator      -> nothing external
//! ```

use super::handle::{OrchestrationServiceHandle, ServiceTarget};
use super::provisioner::{InMemoryProvisioner, ProvisioningRequest, StorageProvisioner};
use crate::backend::{
    BackendKind, BackendOptions, CloudStoreOptions, EmulatorOptions, KeyValueStoreOptions,
    OrchestrationOptions,
};
use crate::connection::ConnectionResolver;
use crate::error::{BootstrapError, BootstrapResult};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Constructs an engine handle for one backend
#[async_trait]
pub trait OrchestrationServiceFactory: Send + Sync + fmt::Debug {
    fn backend_kind(&self) -> BackendKind;

    /// Build a handle from options of this factory's variant
    async fn create(
        &self,
        options: &OrchestrationOptions,
        resolver: &ConnectionResolver,
    ) -> BootstrapResult<OrchestrationServiceHandle>;
}

/// Run `ensure_task_hub` within `timeout`, mapping the outcome into bootstrap errors.
///
/// On failure or timeout the connection is dropped from the resolver cache so
/// a later host instance re-reads it.
async fn provision_bounded(
    provisioner: &dyn StorageProvisioner,
    request: &ProvisioningRequest,
    resolver: &ConnectionResolver,
    timeout: Duration,
) -> BootstrapResult<()> {
    let backend = request.backend;
    debug!(backend = %backend, hub = %request.hub_name, ?timeout, "Provisioning task hub");

    let outcome = tokio::time::timeout(timeout, provisioner.ensure_task_hub(request)).await;
    let result = match outcome {
        Ok(Ok(())) => {
            info!(
                backend = %backend,
                hub = %request.hub_name,
                resources = request.resources.len(),
                "✅ Task hub provisioned"
            );
            return Ok(());
        }
        Ok(Err(e)) => {
            error!(backend = %backend, hub = %request.hub_name, error = %e, "❌ Task hub provisioning failed");
            BootstrapError::provisioning_failed(backend, format!("{e:#}"))
        }
        Err(_) => {
            error!(backend = %backend, hub = %request.hub_name, ?timeout, "❌ Task hub provisioning timed out");
            BootstrapError::ProvisioningTimeout { backend, timeout }
        }
    };

    if let Some(connection) = &request.connection {
        resolver.invalidate(connection.name());
    }
    Err(result)
}

fn non_negative(backend: BackendKind, field: &str, value: i32) -> BootstrapResult<u32> {
    u32::try_from(value).map_err(|_| {
        BootstrapError::invalid_configuration(
            backend,
            field,
            format!("must not be negative, got {value}"),
        )
    })
}

/// Factory for the cloud blob/queue/table store
#[derive(Debug, Clone)]
pub struct CloudStoreServiceFactory {
    provisioner: Arc<dyn StorageProvisioner>,
    provisioning_timeout: Duration,
}

impl CloudStoreServiceFactory {
    pub fn new(provisioner: Arc<dyn StorageProvisioner>, provisioning_timeout: Duration) -> Self {
        Self {
            provisioner,
            provisioning_timeout,
        }
    }

    fn target(
        options: &CloudStoreOptions,
        resolver: &ConnectionResolver,
    ) -> BootstrapResult<ServiceTarget> {
        let partition_count =
            non_negative(BackendKind::CloudStore, "partition_count", options.partition_count)?;
        let connection = resolver.require(&options.connection_name, BackendKind::CloudStore)?;
        Ok(ServiceTarget::CloudStore {
            connection,
            partition_count,
            control_queues: options.control_queue_names(),
            work_item_queue: options.work_item_queue_name(),
            use_app_lease: options.use_app_lease,
        })
    }
}

#[async_trait]
impl OrchestrationServiceFactory for CloudStoreServiceFactory {
    fn backend_kind(&self) -> BackendKind {
        BackendKind::CloudStore
    }

    async fn create(
        &self,
        options: &OrchestrationOptions,
        resolver: &ConnectionResolver,
    ) -> BootstrapResult<OrchestrationServiceHandle> {
        let OrchestrationOptions::CloudStore(options) = options else {
            return Err(BootstrapError::mismatched_backend(
                options.type_name(),
                BackendKind::CloudStore,
            ));
        };
        // Options are validated before any connection lookup
        options.validate()?;
        let target = Self::target(options, resolver)?;

        let handle = OrchestrationServiceHandle::new(
            options.common.hub_name.clone(),
            options.common.host_id.clone(),
            target,
            self.provisioner.clone(),
        );
        provision_bounded(
            self.provisioner.as_ref(),
            &handle.provisioning_request(),
            resolver,
            self.provisioning_timeout,
        )
        .await?;
        Ok(handle)
    }
}

/// Factory for the key-value store
#[derive(Debug, Clone)]
pub struct KeyValueStoreServiceFactory {
    provisioner: Arc<dyn StorageProvisioner>,
    provisioning_timeout: Duration,
}

impl KeyValueStoreServiceFactory {
    pub fn new(provisioner: Arc<dyn StorageProvisioner>, provisioning_timeout: Duration) -> Self {
        Self {
            provisioner,
            provisioning_timeout,
        }
    }

    fn target(
        options: &KeyValueStoreOptions,
        resolver: &ConnectionResolver,
    ) -> BootstrapResult<ServiceTarget> {
        let database = non_negative(BackendKind::KeyValueStore, "database", options.database)?;
        let connection = resolver.require(&options.connection_name, BackendKind::KeyValueStore)?;
        Ok(ServiceTarget::KeyValueStore {
            connection,
            database,
            key_prefix: options.effective_key_prefix().to_string(),
        })
    }
}

#[async_trait]
impl OrchestrationServiceFactory for KeyValueStoreServiceFactory {
    fn backend_kind(&self) -> BackendKind {
        BackendKind::KeyValueStore
    }

    async fn create(
        &self,
        options: &OrchestrationOptions,
        resolver: &ConnectionResolver,
    ) -> BootstrapResult<OrchestrationServiceHandle> {
        let OrchestrationOptions::KeyValueStore(options) = options else {
            return Err(BootstrapError::mismatched_backend(
                options.type_name(),
                BackendKind::KeyValueStore,
            ));
        };
        options.validate()?;
        let target = Self::target(options, resolver)?;

        let handle = OrchestrationServiceHandle::new(
            options.common.hub_name.clone(),
            options.common.host_id.clone(),
            target,
            self.provisioner.clone(),
        );
        provision_bounded(
            self.provisioner.as_ref(),
            &handle.provisioning_request(),
            resolver,
            self.provisioning_timeout,
        )
        .await?;
        Ok(handle)
    }
}

/// Factory for the in-process emulator.
///
/// Never consults the connection resolver and provisions nothing.
#[derive(Debug, Default, Clone)]
pub struct EmulatorServiceFactory;

impl EmulatorServiceFactory {
    pub fn new() -> Self {
        Self
    }

    fn target(options: &EmulatorOptions) -> ServiceTarget {
        ServiceTarget::Emulator {
            max_instances: options.max_orchestration_instances,
        }
    }
}

#[async_trait]
impl OrchestrationServiceFactory for EmulatorServiceFactory {
    fn backend_kind(&self) -> BackendKind {
        BackendKind::Emulator
    }

    async fn create(
        &self,
        options: &OrchestrationOptions,
        _resolver: &ConnectionResolver,
    ) -> BootstrapResult<OrchestrationServiceHandle> {
        let OrchestrationOptions::Emulator(options) = options else {
            return Err(BootstrapError::mismatched_backend(
                options.type_name(),
                BackendKind::Emulator,
            ));
        };
        options.validate()?;

        debug!(
            max_instances = options.max_orchestration_instances,
            "Constructing in-memory emulator"
        );
        Ok(OrchestrationServiceHandle::new(
            options.common.hub_name.clone(),
            options.common.host_id.clone(),
            Self::target(options),
            Arc::new(InMemoryProvisioner::new()),
        ))
    }
}

/// Factory for `kind`, sharing one provisioner and timeout
pub fn factory_for(
    kind: BackendKind,
    provisioner: Arc<dyn StorageProvisioner>,
    provisioning_timeout: Duration,
) -> Arc<dyn OrchestrationServiceFactory> {
    match kind {
        BackendKind::CloudStore => Arc::new(CloudStoreServiceFactory::new(
            provisioner,
            provisioning_timeout,
        )),
        BackendKind::KeyValueStore => Arc::new(KeyValueStoreServiceFactory::new(
            provisioner,
            provisioning_timeout,
        )),
        BackendKind::Emulator => Arc::new(EmulatorServiceFactory::new()),
    }
}
