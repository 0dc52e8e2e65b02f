//! # Registry Infrastructure
//!
//! Process-wide registries shared by every host instance in the process.
//!
//! ```text
//! Registry Infrastructure
//! └── LoaderHookRegistry    (one resolution hook per backend, never unregistered)
//! ```

pub mod loader_hooks;

pub use loader_hooks::{LoaderHook, LoaderHookRegistry, ModuleRef};
