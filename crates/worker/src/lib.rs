//! Offline caching worker for the dxquiz game.
//!
//! This crate provides:
//! - Request routing by origin, method and resource kind
//! - The versioned `CacheController` and its lifecycle
//! - `Registration`, the host that dispatches lifecycle events

pub mod controller;
pub mod lifecycle;
pub mod registration;
pub mod routing;

#[cfg(test)]
mod testing;

pub use controller::{CacheController, ControllerConfig};
pub use lifecycle::{
    ActivateEvent, ActivateOutcome, ClientId, FetchDisposition, FetchEvent, InstallEvent, InstallOutcome,
    LifecycleHandler, LifecycleState,
};
pub use registration::{RegisterOutcome, Registration, RegistrationStatus};
pub use routing::{ResourceKind, Route, classify, route};
