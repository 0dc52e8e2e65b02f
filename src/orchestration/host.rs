//! Registration point offered by the hosting runtime.

use super::handle::OrchestrationServiceHandle;
use super::specialty::SpecialtyOperations;
use crate::backend::BackendKind;
use crate::error::BootstrapResult;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Record handed to the host once per host startup
#[derive(Debug, Clone)]
pub struct ExtensionRegistration {
    pub id: Uuid,
    pub extension_name: &'static str,
    pub backend_kind: BackendKind,
    pub service: Arc<OrchestrationServiceHandle>,
    pub specialty: Arc<dyn SpecialtyOperations>,
    pub registered_at: DateTime<Utc>,
}

impl ExtensionRegistration {
    pub fn new(
        backend_kind: BackendKind,
        service: Arc<OrchestrationServiceHandle>,
        specialty: Arc<dyn SpecialtyOperations>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            extension_name: backend_kind.extension_name(),
            backend_kind,
            service,
            specialty,
            registered_at: Utc::now(),
        }
    }
}

/// Hosting runtime's registration point
pub trait ExtensionHost: Send + Sync {
    fn register_extension(&self, registration: ExtensionRegistration) -> BootstrapResult<()>;
}

/// Host that keeps registrations in memory
#[derive(Debug, Default)]
pub struct InMemoryExtensionHost {
    registrations: Mutex<Vec<ExtensionRegistration>>,
}

impl InMemoryExtensionHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registrations(&self) -> Vec<ExtensionRegistration> {
        self.registrations.lock().clone()
    }

    pub fn registration_count(&self) -> usize {
        self.registrations.lock().len()
    }

    /// Stop every registered service (host shutdown)
    pub fn shutdown(&self) -> BootstrapResult<()> {
        let drained: Vec<_> = self.registrations.lock().drain(..).collect();
        for registration in drained {
            registration.service.stop()?;
        }
        Ok(())
    }
}

impl ExtensionHost for InMemoryExtensionHost {
    fn register_extension(&self, registration: ExtensionRegistration) -> BootstrapResult<()> {
        info!(
            extension = registration.extension_name,
            backend = %registration.backend_kind,
            id = %registration.id,
            "Extension registered with host"
        );
        self.registrations.lock().push(registration);
        Ok(())
    }
}
