//! PortalManager — coordinates the session store, step registry, slot
//! ledger, and the simulated verification task.
//!
//! The workflow itself assumes one user action at a time; the manager is
//! what makes that safe when the portal is served over HTTP, by funneling
//! every session-store write through a single `RwLock`.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::bridge::{self, AppSeed, ReturnToApp};
use crate::config::PortalConfig;
use crate::error::{ConsistencyError, Result};
use crate::ledger::{ConsentAttempt, Invitee, SlotLedger};
use crate::navigator::{ChildForm, CreateAccountForm, NavAction, Navigator, SignInForm};
use crate::payment::{PaymentForm, PaymentOutcome};
use crate::session::{Device, SessionState, SessionStore};
use crate::steps::{Step, StepRegistry};
use crate::verify::{spawn_verification, VerificationBackend, VerificationPhase, VerificationTask};

/// Why a player identity is associated with the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationKind {
    InitialRequest,
    Owner,
    Invited,
}

/// One entry in the activation summary.
#[derive(Debug, Clone, Serialize)]
pub struct AssociatedUser {
    pub name: String,
    pub email: String,
    pub approved: bool,
    pub kind: AssociationKind,
}

/// Final report shown on the Complete step.
#[derive(Debug, Clone, Serialize)]
pub struct ActivationSummary {
    pub device: Device,
    pub associated_users: Vec<AssociatedUser>,
}

/// Snapshot for the REST surface.
#[derive(Debug, Clone, Serialize)]
pub struct PortalStatus {
    pub session: SessionState,
    pub step: Step,
    pub step_label: &'static str,
    pub total_players: usize,
    pub max_players: usize,
    pub can_add_more: bool,
    pub invitees: Vec<Invitee>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerificationPhase>,
}

/// Coordinates one onboarding session end to end.
pub struct PortalManager {
    config: PortalConfig,
    navigator: Navigator,
    store: Arc<RwLock<SessionStore>>,
    ledger: Arc<RwLock<SlotLedger>>,
    backend: Arc<dyn VerificationBackend>,
    /// In-flight email verification, if any. Dropped (and thus aborted) on
    /// navigation-away.
    verification: Arc<RwLock<Option<VerificationTask>>>,
    /// Retry state of the currently open consent dialog, if any.
    consent: Arc<RwLock<Option<ConsentAttempt>>>,
    /// Retry state of the child-account form.
    child_attempt: Arc<RwLock<ConsentAttempt>>,
}

impl PortalManager {
    pub fn new(config: PortalConfig, backend: Arc<dyn VerificationBackend>) -> Self {
        let store = SessionStore::new(&config);
        let ledger = SlotLedger::new(config.max_players);
        Self {
            config,
            navigator: Navigator::new(StepRegistry::default()),
            store: Arc::new(RwLock::new(store)),
            ledger: Arc::new(RwLock::new(ledger)),
            backend,
            verification: Arc::new(RwLock::new(None)),
            consent: Arc::new(RwLock::new(None)),
            child_attempt: Arc::new(RwLock::new(ConsentAttempt::new())),
        }
    }

    /// Apply the host application's bootstrap payload, if one was supplied.
    pub async fn bootstrap(&self, seed: Option<AppSeed>) {
        if let Some(seed) = seed {
            let mut store = self.store.write().await;
            seed.apply(&mut store);
        }
    }

    pub async fn status(&self) -> PortalStatus {
        let store = self.store.read().await;
        let ledger = self.ledger.read().await;
        let verification = self.verification.read().await;
        let state = store.state().clone();
        let step = Step::from_index(state.current_step).unwrap_or(Step::Account);
        PortalStatus {
            step,
            step_label: step.label(),
            total_players: ledger.total_players(),
            max_players: ledger.max_players(),
            can_add_more: ledger.can_add_more(),
            invitees: ledger.invitees().to_vec(),
            verification: verification.as_ref().map(VerificationTask::phase),
            session: state,
        }
    }

    // ── Account step ─────────────────────────────────────────────────────

    pub async fn sign_in(&self, form: SignInForm) -> Result<Step> {
        let mut store = self.store.write().await;
        let step = self.navigator.enter_sign_in(&mut store, &form)?;
        Ok(step)
    }

    pub async fn create_account(&self, form: CreateAccountForm) -> Result<Step> {
        let mut store = self.store.write().await;
        let step = self.navigator.enter_create_account(&mut store, &form)?;
        Ok(step)
    }

    /// Start the simulated verification round-trip for the current user's
    /// email address.
    pub async fn begin_verification(&self) -> Result<()> {
        let email = {
            let store = self.store.read().await;
            match store.state().user {
                Some(ref user) => user.email.clone(),
                None => {
                    return Err(ConsistencyError::UserMissing {
                        step: store.state().current_step,
                    }
                    .into());
                }
            }
        };
        let task = spawn_verification(Arc::clone(&self.backend), email);
        *self.verification.write().await = Some(task);
        Ok(())
    }

    /// Wait for the in-flight verification to finish, then mark the email
    /// verified and advance. Returns `None` when no verification is in
    /// flight or it was abandoned.
    pub async fn complete_verification(&self) -> Result<Option<Step>> {
        let task = self.verification.write().await.take();
        let Some(task) = task else {
            return Ok(None);
        };
        if !task.completed().await {
            tracing::warn!("Verification task was abandoned before completing");
            return Ok(None);
        }
        let mut store = self.store.write().await;
        store.update_user(|user| user.has_verified_email = true);
        let step = self.navigator.advance(&mut store)?;
        Ok(Some(step))
    }

    // ── Navigation ───────────────────────────────────────────────────────

    pub async fn advance(&self) -> Result<Step> {
        let mut store = self.store.write().await;
        self.navigator.advance(&mut store)
    }

    /// Go back one step. Navigating away abandons any pending verification
    /// and discards any open consent dialog.
    pub async fn retreat(&self) -> NavAction {
        if let Some(task) = self.verification.write().await.take() {
            task.cancel();
        }
        *self.consent.write().await = None;
        let mut store = self.store.write().await;
        self.navigator.retreat(&mut store)
    }

    // ── Payment step ─────────────────────────────────────────────────────

    /// Submit card details. A valid form with auto-renewal off returns the
    /// warning outcome without advancing; the caller resolves it with
    /// [`continue_without_auto_renew`](Self::continue_without_auto_renew)
    /// or by resubmitting with auto-renewal on.
    pub async fn submit_payment(&self, form: PaymentForm) -> Result<PaymentOutcome> {
        let outcome = form.submit()?;
        if outcome == PaymentOutcome::Accepted {
            let mut store = self.store.write().await;
            self.navigator.advance(&mut store)?;
        }
        Ok(outcome)
    }

    /// Explicitly accept the auto-renewal warning and move on.
    pub async fn continue_without_auto_renew(&self) -> Result<Step> {
        let mut store = self.store.write().await;
        self.navigator.advance(&mut store)
    }

    // ── Device assignment step ───────────────────────────────────────────

    pub async fn confirm_binding(&self, confirmed: bool) -> Result<Step> {
        let mut store = self.store.write().await;
        self.navigator.confirm_binding(&mut store, confirmed)
    }

    // ── Access request step ──────────────────────────────────────────────

    /// Open the consent dialog for the pending initial request. A fresh
    /// dialog gets a fresh retry state.
    pub async fn open_consent(&self) {
        *self.consent.write().await = Some(ConsentAttempt::new());
    }

    /// Close the consent dialog, discarding its retry state.
    pub async fn close_consent(&self) {
        *self.consent.write().await = None;
    }

    /// Confirm the child's details in the open consent dialog. On approval
    /// the initial access request is granted and the dialog closes.
    pub async fn confirm_consent(&self, dob: &str, agreed_to_terms: bool) -> Result<()> {
        let mut consent = self.consent.write().await;
        let attempt = consent.get_or_insert_with(ConsentAttempt::new);
        attempt.confirm(dob, agreed_to_terms)?;
        *consent = None;
        drop(consent);

        self.ledger.write().await.approve_initial_request();
        Ok(())
    }

    pub async fn invite_player(&self, email: &str, birthday: &str) -> Result<()> {
        self.ledger.write().await.invite(email, birthday)
    }

    pub async fn cancel_invite(&self, index: usize) {
        self.ledger.write().await.cancel_invite(index);
    }

    pub async fn accept_invite(&self, index: usize) {
        self.ledger.write().await.mark_accepted(index);
    }

    pub async fn set_owner_added(&self, added: bool) {
        self.ledger.write().await.set_owner_added(added);
    }

    // ── Child account form ───────────────────────────────────────────────

    /// Reset the child form's retry state (a freshly opened form).
    pub async fn open_child_form(&self) {
        *self.child_attempt.write().await = ConsentAttempt::new();
    }

    pub async fn attach_child(&self, form: ChildForm) -> Result<()> {
        let mut attempt = self.child_attempt.write().await;
        let mut store = self.store.write().await;
        self.navigator
            .attach_child(&mut store, &form, &mut attempt, Utc::now().date_naive())
    }

    // ── Completion ───────────────────────────────────────────────────────

    /// Build the activation summary for the Complete step.
    pub async fn summary(&self) -> ActivationSummary {
        let store = self.store.read().await;
        let ledger = self.ledger.read().await;
        let state = store.state();

        let mut associated_users = Vec::new();
        if ledger.initial_request_approved() {
            let name = state
                .pending_child
                .as_ref()
                .map(|c| c.name.clone())
                .or_else(|| {
                    state
                        .user
                        .as_ref()
                        .and_then(|u| u.children.first().map(|c| c.name.clone()))
                })
                .unwrap_or_else(|| "Requesting player".to_string());
            associated_users.push(AssociatedUser {
                name,
                email: String::new(),
                approved: true,
                kind: AssociationKind::InitialRequest,
            });
        }
        if ledger.owner_added() {
            let email = state
                .user
                .as_ref()
                .map(|u| u.email.clone())
                .unwrap_or_default();
            let name = state
                .user
                .as_ref()
                .filter(|u| !u.name.is_empty())
                .map(|u| u.name.clone())
                .unwrap_or_else(|| "Account Owner".to_string());
            associated_users.push(AssociatedUser {
                name,
                email,
                approved: true,
                kind: AssociationKind::Owner,
            });
        }
        for invitee in ledger.invitees() {
            associated_users.push(AssociatedUser {
                name: invitee.email.clone(),
                email: invitee.email.clone(),
                approved: invitee.status == crate::ledger::InviteStatus::Accepted,
                kind: AssociationKind::Invited,
            });
        }

        ActivationSummary {
            device: state.device.clone(),
            associated_users,
        }
    }

    /// Fire the terminal return-to-app signal.
    pub async fn return_to_app(&self) -> Result<ReturnToApp> {
        let store = self.store.read().await;
        let signal = bridge::return_to_app(store.state(), &self.config.return_scheme)?;
        Ok(signal)
    }
}
