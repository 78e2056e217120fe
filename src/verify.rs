//! Simulated email verification.
//!
//! Verification is the one background operation in the workflow: a
//! two-phase delay (in progress, then verified) before the completion
//! callback fires. Navigating away drops the task handle, which aborts the
//! pending verification silently.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Observable state of an in-flight verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationPhase {
    Pending,
    Verified,
}

/// Backend that paces the two verification phases.
#[async_trait]
pub trait VerificationBackend: Send + Sync {
    /// Resolves when the verification link has been "clicked".
    async fn deliver(&self, email: &str);

    /// The pause between the verified confirmation and handing control back.
    async fn confirm(&self);
}

/// Timed backend matching the demo flow.
pub struct SimulatedVerification {
    pub send_delay: Duration,
    pub confirm_delay: Duration,
}

#[async_trait]
impl VerificationBackend for SimulatedVerification {
    async fn deliver(&self, _email: &str) {
        tokio::time::sleep(self.send_delay).await;
    }

    async fn confirm(&self) {
        tokio::time::sleep(self.confirm_delay).await;
    }
}

/// Instant backend for tests.
pub struct InstantVerification;

#[async_trait]
impl VerificationBackend for InstantVerification {
    async fn deliver(&self, _email: &str) {}
    async fn confirm(&self) {}
}

/// Handle to an in-flight verification. Dropping it cancels the task.
pub struct VerificationTask {
    handle: Option<JoinHandle<()>>,
    rx: watch::Receiver<VerificationPhase>,
}

impl VerificationTask {
    pub fn phase(&self) -> VerificationPhase {
        *self.rx.borrow()
    }

    /// Wait for the verification to run to completion. Returns false if the
    /// task was aborted.
    pub async fn completed(mut self) -> bool {
        match self.handle.take() {
            Some(handle) => handle.await.is_ok(),
            None => false,
        }
    }

    /// Abandon the pending verification (navigation-away).
    pub fn cancel(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::debug!("Verification abandoned");
        }
    }
}

impl Drop for VerificationTask {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Start a verification round-trip for `email`.
pub fn spawn_verification(
    backend: Arc<dyn VerificationBackend>,
    email: String,
) -> VerificationTask {
    let (tx, rx) = watch::channel(VerificationPhase::Pending);
    let handle = tokio::spawn(async move {
        backend.deliver(&email).await;
        let _ = tx.send(VerificationPhase::Verified);
        tracing::info!(email, "Email verified");
        backend.confirm().await;
    });
    VerificationTask {
        handle: Some(handle),
        rx,
    }
}
