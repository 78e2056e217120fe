//! Session state and the store that owns it.
//!
//! The store is pure data plus a small mutation API — no validation, no
//! policy. Every mutation is synchronous and immediately visible to readers;
//! the manager serializes access when the store is shared across tasks.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::PortalConfig;

/// The device being bound to a billing account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    /// Monotonic: flips false→true exactly once, never resets.
    pub is_bound: bool,
}

/// A minor's profile attached under parental consent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Child {
    pub name: String,
    /// Derived from a date of birth at attachment time, never stored raw.
    pub age: u32,
}

/// The billing-account holder created by the account step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub is_parent: bool,
    pub name: String,
    pub email: String,
    pub has_verified_email: bool,
    pub children: Vec<Child>,
}

/// Whether the session was seeded by an external host application or
/// started standalone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationContext {
    Standalone,
    FromApp,
}

impl Default for InvocationContext {
    fn default() -> Self {
        Self::Standalone
    }
}

impl InvocationContext {
    pub fn is_from_app(&self) -> bool {
        matches!(self, Self::FromApp)
    }
}

/// Mutable workflow state for one onboarding session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: Uuid,
    /// 1-based position in the five-step sequence.
    pub current_step: u8,
    pub invocation_context: InvocationContext,
    pub device: Device,
    pub user: Option<User>,
    /// Child identity supplied by the external app, copied into the user's
    /// children when the account step completes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_child: Option<Child>,
}

/// Owns the [`SessionState`] for one onboarding session.
///
/// Reset only by constructing a new store — there is no in-place reset hook.
#[derive(Debug, Clone)]
pub struct SessionStore {
    state: SessionState,
}

impl SessionStore {
    /// Create a fresh session with the configured device defaults.
    pub fn new(config: &PortalConfig) -> Self {
        Self {
            state: SessionState {
                session_id: Uuid::new_v4(),
                current_step: 1,
                invocation_context: InvocationContext::Standalone,
                device: Device {
                    id: config.device_id.clone(),
                    name: config.device_name.clone(),
                    is_bound: false,
                },
                user: None,
                pending_child: None,
            },
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn set_user(&mut self, user: Option<User>) {
        self.state.user = user;
    }

    /// Mutate the current user in place, if one exists.
    pub fn update_user(&mut self, f: impl FnOnce(&mut User)) {
        if let Some(ref mut user) = self.state.user {
            f(user);
        }
    }

    pub fn set_invocation_context(&mut self, context: InvocationContext) {
        self.state.invocation_context = context;
    }

    pub fn set_step(&mut self, step: u8) {
        self.state.current_step = step;
    }

    /// Seed device identity from an external payload.
    pub fn set_device_identity(&mut self, id: impl Into<String>, name: impl Into<String>) {
        self.state.device.id = id.into();
        self.state.device.name = name.into();
    }

    pub fn set_pending_child(&mut self, child: Option<Child>) {
        self.state.pending_child = child;
    }

    /// Flip `device.is_bound` to true. Idempotent — calling twice has no
    /// additional effect, and nothing ever sets it back.
    pub fn bind_device(&mut self) {
        if !self.state.device.is_bound {
            self.state.device.is_bound = true;
            tracing::info!(device_id = %self.state.device.id, "Device bound");
        }
    }
}
