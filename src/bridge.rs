//! External app bridge.
//!
//! The host application can seed a session with identity data before the
//! portal opens, and receives a single "return to app" signal once the
//! onboarding completes.

use serde::{Deserialize, Serialize};

use crate::error::ConsistencyError;
use crate::session::{Child, InvocationContext, SessionState, SessionStore};

/// Optional bootstrap payload from the host application. Its presence is
/// what flips the session into the `FromApp` invocation context.
#[derive(Debug, Clone, Deserialize)]
pub struct AppSeed {
    pub device_id: String,
    pub device_name: String,
    pub child_name: String,
    pub child_age: u32,
}

impl AppSeed {
    /// Apply the seed to a fresh session.
    pub fn apply(&self, store: &mut SessionStore) {
        store.set_invocation_context(InvocationContext::FromApp);
        store.set_device_identity(&self.device_id, &self.device_name);
        store.set_pending_child(Some(Child {
            name: self.child_name.clone(),
            age: self.child_age,
        }));
        tracing::info!(
            device_id = %self.device_id,
            child = %self.child_name,
            "Session seeded from app"
        );
    }
}

/// The terminal hand-back to the host application. Carries no payload beyond
/// "onboarding complete" — the host re-reads everything it needs itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReturnToApp {
    /// External scheme to open, e.g. `rapsodo://`.
    pub scheme: String,
}

/// Build the return-to-app signal.
///
/// Fires only when the device is bound and a user exists; anything else is
/// a contract violation, not a user-correctable state.
pub fn return_to_app(
    state: &SessionState,
    scheme: &str,
) -> Result<ReturnToApp, ConsistencyError> {
    if !state.device.is_bound {
        return Err(ConsistencyError::DeviceNotBound);
    }
    if state.user.is_none() {
        return Err(ConsistencyError::UserMissing {
            step: state.current_step,
        });
    }
    tracing::info!(scheme, "Returning control to app");
    Ok(ReturnToApp {
        scheme: scheme.to_string(),
    })
}
