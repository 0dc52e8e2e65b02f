//! Engine handle constructed by a backend factory.
//!
//! The handle is opaque to the bootstrap layer beyond lifecycle calls. It keeps
//! the backend client it was provisioned with, so specialty capabilities can
//! be derived from it after construction.

use super::provisioner::{ProvisioningRequest, StorageProvisioner};
use crate::backend::BackendKind;
use crate::connection::ConnectionDescriptor;
use crate::error::BootstrapResult;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Backend resources a handle is bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceTarget {
    CloudStore {
        connection: ConnectionDescriptor,
        partition_count: u32,
        control_queues: Vec<String>,
        work_item_queue: String,
        use_app_lease: bool,
    },
    KeyValueStore {
        connection: ConnectionDescriptor,
        database: u32,
        key_prefix: String,
    },
    Emulator {
        max_instances: usize,
    },
}

impl ServiceTarget {
    pub fn backend_kind(&self) -> BackendKind {
        match self {
            Self::CloudStore { .. } => BackendKind::CloudStore,
            Self::KeyValueStore { .. } => BackendKind::KeyValueStore,
            Self::Emulator { .. } => BackendKind::Emulator,
        }
    }

    /// Connection the target was built from; the emulator has none
    pub fn connection(&self) -> Option<&ConnectionDescriptor> {
        match self {
            Self::CloudStore { connection, .. } | Self::KeyValueStore { connection, .. } => {
                Some(connection)
            }
            Self::Emulator { .. } => None,
        }
    }

    /// Backend resources provisioned for the hub
    pub fn resources(&self) -> Vec<String> {
        match self {
            Self::CloudStore {
                control_queues,
                work_item_queue,
                ..
            } => control_queues
                .iter()
                .cloned()
                .chain(std::iter::once(work_item_queue.clone()))
                .collect(),
            Self::KeyValueStore {
                database,
                key_prefix,
                ..
            } => vec![format!("db{database}:{key_prefix}:*")],
            Self::Emulator { .. } => Vec::new(),
        }
    }
}

/// Running engine instance for one backend
#[derive(Debug)]
pub struct OrchestrationServiceHandle {
    hub_name: String,
    host_id: Option<String>,
    target: ServiceTarget,
    client: Arc<dyn StorageProvisioner>,
    running: AtomicBool,
    created_at: DateTime<Utc>,
}

impl OrchestrationServiceHandle {
    pub fn new(
        hub_name: impl Into<String>,
        host_id: Option<String>,
        target: ServiceTarget,
        client: Arc<dyn StorageProvisioner>,
    ) -> Self {
        Self {
            hub_name: hub_name.into(),
            host_id,
            target,
            client,
            running: AtomicBool::new(false),
            created_at: Utc::now(),
        }
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.target.backend_kind()
    }

    pub fn hub_name(&self) -> &str {
        &self.hub_name
    }

    pub fn host_id(&self) -> Option<&str> {
        self.host_id.as_deref()
    }

    pub fn target(&self) -> &ServiceTarget {
        &self.target
    }

    /// Backend client the handle was provisioned with
    pub fn client(&self) -> &Arc<dyn StorageProvisioner> {
        &self.client
    }

    /// Request addressing this handle's task hub
    pub fn provisioning_request(&self) -> ProvisioningRequest {
        ProvisioningRequest {
            backend: self.backend_kind(),
            hub_name: self.hub_name.clone(),
            connection: self.target.connection().cloned(),
            resources: self.target.resources(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Start the engine; starting a running engine is a no-op
    pub fn start(&self) -> BootstrapResult<()> {
        if self.running.swap(true, Ordering::AcqRel) {
            warn!(backend = %self.backend_kind(), hub = %self.hub_name, "Orchestration service already running");
        } else {
            info!(backend = %self.backend_kind(), hub = %self.hub_name, "▶️ Orchestration service started");
        }
        Ok(())
    }

    /// Stop the engine; stopping a stopped engine is a no-op
    pub fn stop(&self) -> BootstrapResult<()> {
        if self.running.swap(false, Ordering::AcqRel) {
            info!(backend = %self.backend_kind(), hub = %self.hub_name, "🛑 Orchestration service stopped");
        } else {
            warn!(backend = %self.backend_kind(), hub = %self.hub_name, "Orchestration service already stopped");
        }
        Ok(())
    }

    pub fn status(&self) -> ServiceStatus {
        ServiceStatus {
            backend: self.backend_kind(),
            hub_name: self.hub_name.clone(),
            running: self.is_running(),
            connection_name: self.target.connection().map(|c| c.name().to_string()),
            resource_count: self.target.resources().len(),
            created_at: self.created_at,
        }
    }
}

/// Service status information
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceStatus {
    pub backend: BackendKind,
    pub hub_name: String,
    pub running: bool,
    pub connection_name: Option<String>,
    pub resource_count: usize,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestration::provisioner::InMemoryProvisioner;

    fn cloud_handle() -> OrchestrationServiceHandle {
        OrchestrationServiceHandle::new(
            "TestHub",
            Some("host-1".to_string()),
            ServiceTarget::CloudStore {
                connection: ConnectionDescriptor::new("Storage", "AccountKey=secret"),
                partition_count: 2,
                control_queues: vec!["testhub-control-00".into(), "testhub-control-01".into()],
                work_item_queue: "testhub-workitems".into(),
                use_app_lease: true,
            },
            Arc::new(InMemoryProvisioner::new()),
        )
    }

    #[test]
    fn test_start_stop_toggle_running() {
        let handle = cloud_handle();
        assert!(!handle.is_running());

        handle.start().unwrap();
        handle.start().unwrap();
        assert!(handle.is_running());

        handle.stop().unwrap();
        assert!(!handle.is_running());
        handle.stop().unwrap();
    }

    #[test]
    fn test_status_reports_target() {
        let handle = cloud_handle();
        let status = handle.status();
        assert_eq!(status.backend, BackendKind::CloudStore);
        assert_eq!(status.hub_name, "TestHub");
        assert_eq!(status.connection_name.as_deref(), Some("Storage"));
        assert_eq!(status.resource_count, 3);
        assert!(!status.running);
    }

    #[test]
    fn test_provisioning_request_matches_target() {
        let handle = cloud_handle();
        let request = handle.provisioning_request();
        assert_eq!(request.backend, BackendKind::CloudStore);
        assert_eq!(request.hub_name, "TestHub");
        assert!(request.resources.contains(&"testhub-workitems".to_string()));
    }

    #[test]
    fn test_emulator_target_has_no_connection() {
        let target = ServiceTarget::Emulator { max_instances: 10 };
        assert!(target.connection().is_none());
        assert!(target.resources().is_empty());
        assert_eq!(target.backend_kind(), BackendKind::Emulator);
    }
}
