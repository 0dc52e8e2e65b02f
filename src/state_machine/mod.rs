// Extension bootstrap lifecycle state machine
//
// Created -> Defaulted -> LoaderHooksRegistered -> ServiceConstructed -> Registered,
// with Failed reachable from every non-terminal state.

pub mod events;
pub mod states;

pub use events::BootstrapEvent;
pub use states::BootstrapState;
