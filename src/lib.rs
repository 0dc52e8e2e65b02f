#![allow(clippy::doc_markdown)] // Allow technical terms in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Durable Bootstrap
//!
//! Selects, configures and constructs one of several interchangeable
//! durability backends for a durable orchestration engine, then hands the
//! ready engine handle to the hosting runtime.
//!
//! ## Backends
//!
//! - **CloudStore**: blob/queue/table storage account, with specialty
//!   administrative operations (force purge, app lease)
//! - **KeyValueStore**: key-value server
//! - **Emulator**: in-process, needs no external configuration
//!
//! ## Module Organization
//!
//! - [`backend`] - Backend kinds, typed options and the options binder
//! - [`connection`] - Named connection resolution with per-host caching
//! - [`orchestration`] - Selector, bootstrap lifecycle, factories and capabilities
//! - [`registry`] - Process-wide loader hook registry
//! - [`state_machine`] - Bootstrap lifecycle states and events
//! - [`config`] - Layered configuration loading
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use durable_bootstrap::{BackendSelector, ConfigManager, InMemoryExtensionHost, InMemoryProvisioner};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let selector = BackendSelector::from_config(manager.config(), Arc::new(InMemoryProvisioner::new()));
//!
//! let host = InMemoryExtensionHost::new();
//! let registration = selector.initialize_from_config(manager.config(), &host).await?;
//! registration.service.start()?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod connection;
pub mod error;
pub mod logging;
pub mod orchestration;
pub mod registry;
pub mod state_machine;

pub use backend::{
    BackendKind, CloudStoreOptions, EmulatorOptions, KeyValueStoreOptions, OrchestrationOptions,
    RawOptions,
};
pub use config::{BootstrapConfig, ConfigManager};
pub use connection::{ConnectionDescriptor, ConnectionResolver, ConnectionSource, Requirement};
pub use error::{BootstrapError, BootstrapResult};
pub use orchestration::{
    BackendSelector, ExtensionBootstrap, ExtensionHost, ExtensionRegistration,
    InMemoryExtensionHost, InMemoryProvisioner, OrchestrationServiceHandle, SpecialtyOperations,
    SpecialtyOutcome, StorageProvisioner,
};
pub use registry::LoaderHookRegistry;
pub use state_machine::{BootstrapEvent, BootstrapState};
