//! Test doubles for connection sources and backend client libraries.

use async_trait::async_trait;
use durable_bootstrap::connection::{ConnectionSource, StaticConnectionSource};
use durable_bootstrap::orchestration::{ProvisioningRequest, StorageProvisioner};
use durable_bootstrap::{
    BackendSelector, ConnectionResolver, InMemoryProvisioner, LoaderHookRegistry,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Static source that counts every lookup
#[derive(Debug, Default)]
pub struct CountingSource {
    inner: StaticConnectionSource,
    lookups: AtomicUsize,
}

impl CountingSource {
    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.inner = self.inner.with(name, value);
        self
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl ConnectionSource for CountingSource {
    fn lookup(&self, name: &str) -> Option<String> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.lookup(name)
    }

    fn source_name(&self) -> &'static str {
        "counting"
    }
}

/// Provisioner whose `ensure_task_hub` never finishes in time
#[derive(Debug)]
pub struct SlowProvisioner {
    pub delay: Duration,
}

#[async_trait]
impl StorageProvisioner for SlowProvisioner {
    async fn ensure_task_hub(&self, _request: &ProvisioningRequest) -> anyhow::Result<()> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }

    async fn delete_task_hub(&self, _request: &ProvisioningRequest) -> anyhow::Result<()> {
        Ok(())
    }

    async fn claim_app_lease(
        &self,
        _request: &ProvisioningRequest,
        _host_id: &str,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Provisioner that always reports a backend failure
#[derive(Debug)]
pub struct FailingProvisioner {
    pub message: &'static str,
}

#[async_trait]
impl StorageProvisioner for FailingProvisioner {
    async fn ensure_task_hub(&self, _request: &ProvisioningRequest) -> anyhow::Result<()> {
        anyhow::bail!(self.message)
    }

    async fn delete_task_hub(&self, _request: &ProvisioningRequest) -> anyhow::Result<()> {
        anyhow::bail!(self.message)
    }

    async fn claim_app_lease(
        &self,
        _request: &ProvisioningRequest,
        _host_id: &str,
    ) -> anyhow::Result<()> {
        anyhow::bail!(self.message)
    }
}

/// Selector wired to `source` and `provisioner`, with a private hook registry
pub fn selector_with(
    source: Arc<CountingSource>,
    provisioner: Arc<dyn StorageProvisioner>,
    timeout: Duration,
) -> BackendSelector {
    BackendSelector::new(
        Arc::new(ConnectionResolver::new(source)),
        Arc::new(LoaderHookRegistry::new()),
        provisioner,
        timeout,
    )
}

/// Selector with both standard connections resolvable
pub fn standard_selector() -> (BackendSelector, Arc<CountingSource>, Arc<InMemoryProvisioner>) {
    let source = Arc::new(
        CountingSource::default()
            .with("Storage", "UseDevelopmentStorage=true")
            .with("Cache", "localhost:6379"),
    );
    let provisioner = Arc::new(InMemoryProvisioner::new());
    let selector = selector_with(source.clone(), provisioner.clone(), Duration::from_secs(5));
    (selector, source, provisioner)
}
