//! # Orchestration Bootstrap
//!
//! Backend selection and construction for the durable orchestration engine.
//!
//! ## Core Components
//!
//! - **BackendSelector**: maps options to the matching backend strategy
//! - **ExtensionBootstrap**: runs the lifecycle for one host instance
//! - **OrchestrationServiceFactory**: builds an engine handle per backend
//! - **SpecialtyOperations**: backend administrative capability (null object when absent)
//! - **StorageProvisioner**: narrow boundary into backend client libraries
//! - **ExtensionHost**: the hosting runtime's registration point

pub mod bootstrap;
pub mod dispatch;
pub mod factory;
pub mod handle;
pub mod host;
pub mod provisioner;
pub mod specialty;

pub use bootstrap::{BackendStrategy, ExtensionBootstrap, OptionsInput};
pub use dispatch::BackendSelector;
pub use factory::{
    factory_for, CloudStoreServiceFactory, EmulatorServiceFactory, KeyValueStoreServiceFactory,
    OrchestrationServiceFactory,
};
pub use handle::{OrchestrationServiceHandle, ServiceStatus, ServiceTarget};
pub use host::{ExtensionHost, ExtensionRegistration, InMemoryExtensionHost};
pub use provisioner::{
    InMemoryProvisioner, ProvisionedHub, ProvisioningRequest, StorageProvisioner,
};
pub use specialty::{
    capability_for, CapabilityBuilder, CloudStoreSpecialOperations, NoSpecialtyOperations,
    SpecialtyOperation, SpecialtyOperations, SpecialtyOutcome,
};
