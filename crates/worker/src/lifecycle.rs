//! Lifecycle events and the handler interface the host dispatches them to.

use std::fmt;

use async_trait::async_trait;
use dxquiz_core::{Error, Request, Response};
use serde::Serialize;

/// Where a controller is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Constructed, no event received yet.
    Pending,
    Installing,
    /// Installed and waiting to be activated.
    Installed,
    Activating,
    Active,
    /// Replaced by a newer version, or failed to install.
    Superseded,
}

impl LifecycleState {
    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Pending, Installing)
                | (Installing, Installed)
                | (Installed, Activating)
                | (Activating, Active)
                | (Activating, Installed)
                | (_, Superseded)
        )
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Pending => "pending",
            LifecycleState::Installing => "installing",
            LifecycleState::Installed => "installed",
            LifecycleState::Activating => "activating",
            LifecycleState::Active => "active",
            LifecycleState::Superseded => "superseded",
        };
        f.write_str(name)
    }
}

/// Identifies an open page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, schemars::JsonSchema)]
pub struct ClientId(pub u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct InstallEvent {
    /// Version currently in control, if any.
    pub active_version: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ActivateEvent {
    /// Version being replaced, if any.
    pub previous_version: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FetchEvent {
    /// Page that issued the request.
    pub client: Option<ClientId>,
    pub request: Request,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct InstallOutcome {
    pub version: String,
    /// Number of manifest entries stored.
    pub cached: usize,
    /// Activate without waiting for pages controlled by an older version.
    pub skip_waiting: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct ActivateOutcome {
    pub version: String,
    /// Stores deleted by the sweep.
    pub purged: Vec<String>,
    /// Take control of every open page.
    pub claim: bool,
}

/// What the handler did with a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchDisposition {
    /// Answered by the worker.
    Respond(Response),
    /// Not intercepted; the host fetches it normally.
    PassThrough,
}

/// Handlers for lifecycle events, registered with a [`crate::Registration`].
#[async_trait]
pub trait LifecycleHandler: Send + Sync {
    /// Cache version this handler owns.
    fn version(&self) -> &str;

    fn state(&self) -> LifecycleState;

    async fn on_install(&self, event: InstallEvent) -> Result<InstallOutcome, Error>;

    async fn on_activate(&self, event: ActivateEvent) -> Result<ActivateOutcome, Error>;

    /// Never fails: every intercepted request resolves to some response.
    async fn on_fetch(&self, event: FetchEvent) -> FetchDisposition;

    /// Release the handler once a newer version has replaced it.
    fn on_dispose(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        use LifecycleState::*;
        assert!(Pending.can_transition(Installing));
        assert!(Installing.can_transition(Installed));
        assert!(Installed.can_transition(Activating));
        assert!(Activating.can_transition(Active));
        assert!(Active.can_transition(Superseded));
    }

    #[test]
    fn test_illegal_transitions() {
        use LifecycleState::*;
        assert!(!Pending.can_transition(Active));
        assert!(!Active.can_transition(Installing));
        assert!(!Superseded.can_transition(Active));
        assert!(!Installing.can_transition(Activating));
    }

    #[test]
    fn test_any_state_can_be_superseded() {
        use LifecycleState::*;
        for state in [Pending, Installing, Installed, Activating, Active] {
            assert!(state.can_transition(Superseded), "{state}");
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(LifecycleState::Installed.to_string(), "installed");
        assert_eq!(ClientId(3).to_string(), "client-3");
    }
}
