//! # Storage Provisioning Boundary
//!
//! Narrow, constructor-style calls into a backend's own client library. The
//! storage protocols themselves live behind this trait; factories only ask for
//! idempotent provisioning, and the specialty client for administrative
//! actions.

use crate::backend::BackendKind;
use crate::connection::ConnectionDescriptor;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::fmt;

/// Everything a client library needs to address one task hub
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningRequest {
    pub backend: BackendKind,
    pub hub_name: String,
    pub connection: Option<ConnectionDescriptor>,
    /// Backend resources the hub needs (queues, key namespaces)
    pub resources: Vec<String>,
}

/// Backend client library operations used during bootstrap and by specialty clients
#[async_trait]
pub trait StorageProvisioner: Send + Sync + fmt::Debug + 'static {
    /// Create the task hub and its resources if they do not exist (idempotent)
    async fn ensure_task_hub(&self, request: &ProvisioningRequest) -> anyhow::Result<()>;

    /// Delete the task hub and all of its history
    async fn delete_task_hub(&self, request: &ProvisioningRequest) -> anyhow::Result<()>;

    /// Take the application lease for `host_id`
    async fn claim_app_lease(
        &self,
        request: &ProvisioningRequest,
        host_id: &str,
    ) -> anyhow::Result<()>;
}

/// Provisioned hub as tracked by `InMemoryProvisioner`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedHub {
    pub resources: Vec<String>,
    pub lease_owner: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// In-process stand-in for a backend client library.
///
/// Keeps provisioned hubs in memory, keyed by backend and hub name. Used by
/// the emulator path, the `bootstrap-check` binary and tests.
#[derive(Debug, Default)]
pub struct InMemoryProvisioner {
    hubs: DashMap<(BackendKind, String), ProvisionedHub>,
}

impl InMemoryProvisioner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hub(&self, backend: BackendKind, hub_name: &str) -> Option<ProvisionedHub> {
        self.hubs
            .get(&(backend, hub_name.to_string()))
            .map(|entry| entry.clone())
    }

    pub fn hub_count(&self) -> usize {
        self.hubs.len()
    }
}

#[async_trait]
impl StorageProvisioner for InMemoryProvisioner {
    async fn ensure_task_hub(&self, request: &ProvisioningRequest) -> anyhow::Result<()> {
        self.hubs
            .entry((request.backend, request.hub_name.clone()))
            .or_insert_with(|| ProvisionedHub {
                resources: request.resources.clone(),
                lease_owner: None,
                created_at: Utc::now(),
            });
        Ok(())
    }

    async fn delete_task_hub(&self, request: &ProvisioningRequest) -> anyhow::Result<()> {
        self.hubs
            .remove(&(request.backend, request.hub_name.clone()))
            .map(|_| ())
            .ok_or_else(|| anyhow::anyhow!("task hub `{}` does not exist", request.hub_name))
    }

    async fn claim_app_lease(
        &self,
        request: &ProvisioningRequest,
        host_id: &str,
    ) -> anyhow::Result<()> {
        let mut hub = self
            .hubs
            .get_mut(&(request.backend, request.hub_name.clone()))
            .ok_or_else(|| anyhow::anyhow!("task hub `{}` does not exist", request.hub_name))?;
        hub.lease_owner = Some(host_id.to_string());
        Ok(())
    }
}
