//! # Specialty Operations
//!
//! Backend-specific administrative operations behind one capability trait.
//! Backends without such operations get `NoSpecialtyOperations`, which answers
//! every call with `SpecialtyOutcome::Unsupported` instead of failing.

use super::handle::OrchestrationServiceHandle;
use crate::backend::BackendKind;
use crate::error::{BootstrapError, BootstrapResult};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Administrative operations a backend may offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialtyOperation {
    ForcePurgeHistory,
    MakeCurrentAppPrimary,
}

impl fmt::Display for SpecialtyOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ForcePurgeHistory => write!(f, "force_purge_history"),
            Self::MakeCurrentAppPrimary => write!(f, "make_current_app_primary"),
        }
    }
}

/// Result of a specialty operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SpecialtyOutcome {
    Completed {
        operation: SpecialtyOperation,
    },
    /// The backend has no such operation
    Unsupported {
        backend: BackendKind,
        operation: SpecialtyOperation,
    },
}

impl SpecialtyOutcome {
    pub fn is_supported(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Capability attached to every registration
#[async_trait]
pub trait SpecialtyOperations: Send + Sync + fmt::Debug {
    fn backend_kind(&self) -> BackendKind;

    fn supports(&self, operation: SpecialtyOperation) -> bool;

    /// Delete all orchestration history for the task hub
    async fn force_purge_history(&self) -> BootstrapResult<SpecialtyOutcome>;

    /// Make this application the primary lease holder for the task hub
    async fn make_current_app_primary(&self) -> BootstrapResult<SpecialtyOutcome>;
}

/// Builds the capability for a constructed handle
pub type CapabilityBuilder = fn(&Arc<OrchestrationServiceHandle>) -> Arc<dyn SpecialtyOperations>;

/// Cloud store administrative client
#[derive(Debug, Clone)]
pub struct CloudStoreSpecialOperations {
    handle: Arc<OrchestrationServiceHandle>,
}

impl CloudStoreSpecialOperations {
    pub fn new(handle: Arc<OrchestrationServiceHandle>) -> Self {
        Self { handle }
    }
}

#[async_trait]
impl SpecialtyOperations for CloudStoreSpecialOperations {
    fn backend_kind(&self) -> BackendKind {
        BackendKind::CloudStore
    }

    fn supports(&self, _operation: SpecialtyOperation) -> bool {
        true
    }

    async fn force_purge_history(&self) -> BootstrapResult<SpecialtyOutcome> {
        let request = self.handle.provisioning_request();
        warn!(hub = %request.hub_name, "🧹 Force-purging all orchestration history");
        self.handle
            .client()
            .delete_task_hub(&request)
            .await
            .map_err(|e| {
                BootstrapError::provisioning_failed(BackendKind::CloudStore, format!("{e:#}"))
            })?;
        Ok(SpecialtyOutcome::Completed {
            operation: SpecialtyOperation::ForcePurgeHistory,
        })
    }

    async fn make_current_app_primary(&self) -> BootstrapResult<SpecialtyOutcome> {
        let host_id = self.handle.host_id().ok_or_else(|| {
            BootstrapError::invalid_configuration(
                BackendKind::CloudStore,
                "host_id",
                "is required to claim the app lease",
            )
        })?;
        let request = self.handle.provisioning_request();
        self.handle
            .client()
            .claim_app_lease(&request, host_id)
            .await
            .map_err(|e| {
                BootstrapError::provisioning_failed(BackendKind::CloudStore, format!("{e:#}"))
            })?;
        info!(hub = %request.hub_name, host_id, "👑 App lease claimed");
        Ok(SpecialtyOutcome::Completed {
            operation: SpecialtyOperation::MakeCurrentAppPrimary,
        })
    }
}

/// Null capability for backends without administrative operations
#[derive(Debug, Clone, Copy)]
pub struct NoSpecialtyOperations {
    backend: BackendKind,
}

impl NoSpecialtyOperations {
    pub fn new(backend: BackendKind) -> Self {
        Self { backend }
    }

    fn unsupported(&self, operation: SpecialtyOperation) -> SpecialtyOutcome {
        SpecialtyOutcome::Unsupported {
            backend: self.backend,
            operation,
        }
    }
}

#[async_trait]
impl SpecialtyOperations for NoSpecialtyOperations {
    fn backend_kind(&self) -> BackendKind {
        self.backend
    }

    fn supports(&self, _operation: SpecialtyOperation) -> bool {
        false
    }

    async fn force_purge_history(&self) -> BootstrapResult<SpecialtyOutcome> {
        Ok(self.unsupported(SpecialtyOperation::ForcePurgeHistory))
    }

    async fn make_current_app_primary(&self) -> BootstrapResult<SpecialtyOutcome> {
        Ok(self.unsupported(SpecialtyOperation::MakeCurrentAppPrimary))
    }
}

fn cloud_store_capability(
    handle: &Arc<OrchestrationServiceHandle>,
) -> Arc<dyn SpecialtyOperations> {
    Arc::new(CloudStoreSpecialOperations::new(handle.clone()))
}

fn no_capability(handle: &Arc<OrchestrationServiceHandle>) -> Arc<dyn SpecialtyOperations> {
    Arc::new(NoSpecialtyOperations::new(handle.backend_kind()))
}

/// Capability builder for `kind`
pub fn capability_for(kind: BackendKind) -> CapabilityBuilder {
    match kind {
        BackendKind::CloudStore => cloud_store_capability,
        BackendKind::KeyValueStore | BackendKind::Emulator => no_capability,
    }
}
