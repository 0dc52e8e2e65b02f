//! End-to-end bootstrap scenarios against an in-memory host.

mod common;

use common::*;
use durable_bootstrap::orchestration::ServiceTarget;
use durable_bootstrap::{
    BackendKind, BootstrapError, BootstrapState, InMemoryExtensionHost, InMemoryProvisioner,
    OrchestrationOptions, SpecialtyOutcome,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_cloud_store_with_resolvable_storage_registers() {
    let (selector, source, provisioner) = standard_selector();
    let host = InMemoryExtensionHost::new();
    let mut bootstrap =
        selector.bootstrap_for(OrchestrationOptions::default_for(BackendKind::CloudStore));

    let registration = bootstrap.initialize(&host).await.unwrap();

    assert_eq!(bootstrap.state(), &BootstrapState::Registered);
    assert_eq!(registration.backend_kind, BackendKind::CloudStore);
    assert_eq!(registration.extension_name, "DurableTask");
    match registration.service.target() {
        ServiceTarget::CloudStore {
            connection,
            partition_count,
            ..
        } => {
            assert_eq!(connection.name(), "Storage");
            assert_eq!(*partition_count, 4);
        }
        other => panic!("expected a cloud store target, got {other:?}"),
    }
    assert_eq!(source.lookups(), 1);
    assert!(provisioner
        .hub(BackendKind::CloudStore, "DurableFunctionsHub")
        .is_some());
    assert_eq!(host.registration_count(), 1);
}

#[tokio::test]
async fn test_key_value_store_without_cache_fails() {
    let source = Arc::new(CountingSource::default().with("Storage", "UseDevelopmentStorage=true"));
    let selector = selector_with(
        source,
        Arc::new(InMemoryProvisioner::new()),
        Duration::from_secs(5),
    );
    let host = InMemoryExtensionHost::new();
    let mut bootstrap =
        selector.bootstrap_for(OrchestrationOptions::default_for(BackendKind::KeyValueStore));

    let err = bootstrap.initialize(&host).await.unwrap_err();

    assert_eq!(
        err,
        BootstrapError::missing_connection(BackendKind::KeyValueStore, "Cache")
    );
    assert!(bootstrap.state().is_failed());
    assert_eq!(host.registration_count(), 0);
}

#[tokio::test]
async fn test_emulator_without_configuration_needs_no_connections() {
    let (selector, source, provisioner) = standard_selector();
    let host = InMemoryExtensionHost::new();
    let mut bootstrap = selector.bootstrap_with(
        BackendKind::Emulator,
        durable_bootstrap::orchestration::OptionsInput::Unconfigured,
    );

    let registration = bootstrap.initialize(&host).await.unwrap();

    assert_eq!(bootstrap.state(), &BootstrapState::Registered);
    assert_eq!(
        bootstrap.options(),
        Some(&OrchestrationOptions::default_for(BackendKind::Emulator))
    );
    assert_eq!(registration.backend_kind, BackendKind::Emulator);
    assert_eq!(source.lookups(), 0);
    assert_eq!(provisioner.hub_count(), 0);
}

#[tokio::test]
async fn test_every_backend_reaches_registered_with_defaults() {
    for kind in BackendKind::ALL {
        let (selector, _source, _provisioner) = standard_selector();
        let host = InMemoryExtensionHost::new();

        let registration = selector
            .initialize(OrchestrationOptions::default_for(kind), &host)
            .await
            .unwrap();

        assert_eq!(registration.backend_kind, kind);
        assert_eq!(registration.service.backend_kind(), kind);
        assert_eq!(registration.specialty.backend_kind(), kind);
    }
}

#[tokio::test]
async fn test_second_initialize_is_already_initialized() {
    let (selector, _source, _provisioner) = standard_selector();
    let host = InMemoryExtensionHost::new();
    let mut bootstrap =
        selector.bootstrap_for(OrchestrationOptions::default_for(BackendKind::CloudStore));
    bootstrap.initialize(&host).await.unwrap();

    let err = bootstrap.initialize(&host).await.unwrap_err();

    assert_eq!(
        err,
        BootstrapError::AlreadyInitialized {
            backend: BackendKind::CloudStore,
            state: "registered".to_string(),
        }
    );
    assert_eq!(host.registration_count(), 1);
}

#[tokio::test]
async fn test_initialize_after_failure_is_rejected() {
    let source = Arc::new(CountingSource::default());
    let selector = selector_with(
        source,
        Arc::new(InMemoryProvisioner::new()),
        Duration::from_secs(5),
    );
    let host = InMemoryExtensionHost::new();
    let mut bootstrap =
        selector.bootstrap_for(OrchestrationOptions::default_for(BackendKind::CloudStore));
    bootstrap.initialize(&host).await.unwrap_err();

    let err = bootstrap.initialize(&host).await.unwrap_err();
    assert!(matches!(err, BootstrapError::AlreadyInitialized { .. }));
}

#[tokio::test]
async fn test_slow_provisioning_times_out_and_is_retryable() {
    let source = Arc::new(CountingSource::default().with("Storage", "UseDevelopmentStorage=true"));
    let selector = selector_with(
        source.clone(),
        Arc::new(SlowProvisioner {
            delay: Duration::from_secs(10),
        }),
        Duration::from_millis(50),
    );
    let host = InMemoryExtensionHost::new();
    let mut bootstrap =
        selector.bootstrap_for(OrchestrationOptions::default_for(BackendKind::CloudStore));

    let err = bootstrap.initialize(&host).await.unwrap_err();

    assert_eq!(
        err,
        BootstrapError::ProvisioningTimeout {
            backend: BackendKind::CloudStore,
            timeout: Duration::from_millis(50),
        }
    );
    assert!(err.is_retryable());
    assert!(bootstrap.state().is_failed());
    assert_eq!(selector.resolver().cached_connections(), 0);
}

#[tokio::test]
async fn test_backend_reported_failure_is_provisioning_failed() {
    let source = Arc::new(CountingSource::default().with("Cache", "localhost:6379"));
    let selector = selector_with(
        source,
        Arc::new(FailingProvisioner {
            message: "server refused connection",
        }),
        Duration::from_secs(5),
    );
    let host = InMemoryExtensionHost::new();

    let err = selector
        .initialize(
            OrchestrationOptions::default_for(BackendKind::KeyValueStore),
            &host,
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        BootstrapError::ProvisioningFailed { backend: BackendKind::KeyValueStore, ref reason }
            if reason.contains("refused")
    ));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_cloud_store_specialty_purges_history() {
    let (selector, _source, provisioner) = standard_selector();
    let host = InMemoryExtensionHost::new();
    let registration = selector
        .initialize(OrchestrationOptions::default_for(BackendKind::CloudStore), &host)
        .await
        .unwrap();

    let outcome = registration.specialty.force_purge_history().await.unwrap();

    assert!(outcome.is_supported());
    assert!(provisioner
        .hub(BackendKind::CloudStore, "DurableFunctionsHub")
        .is_none());
}

#[tokio::test]
async fn test_other_backends_expose_null_specialty() {
    for kind in [BackendKind::KeyValueStore, BackendKind::Emulator] {
        let (selector, _source, _provisioner) = standard_selector();
        let host = InMemoryExtensionHost::new();
        let registration = selector
            .initialize(OrchestrationOptions::default_for(kind), &host)
            .await
            .unwrap();

        let outcome = registration.specialty.make_current_app_primary().await.unwrap();
        assert!(matches!(
            outcome,
            SpecialtyOutcome::Unsupported { backend, .. } if backend == kind
        ));
    }
}

#[tokio::test]
async fn test_registered_service_lifecycle() {
    let (selector, _source, _provisioner) = standard_selector();
    let host = InMemoryExtensionHost::new();
    let registration = selector
        .initialize(OrchestrationOptions::default_for(BackendKind::Emulator), &host)
        .await
        .unwrap();

    registration.service.start().unwrap();
    assert!(registration.service.status().running);

    host.shutdown().unwrap();
    assert!(!registration.service.is_running());
}
