//! The workflow state machine.
//!
//! Computes next/previous steps from the registry's predicates and applies
//! the account-entry transitions. Every operation validates first and
//! commits second — a non-empty error set is returned before any session
//! state is touched.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ConsistencyError, Error, Result, ValidationErrors};
use crate::ledger::{self, ConsentAttempt};
use crate::session::{Child, SessionStore, User};
use crate::steps::{Step, StepRegistry};

/// Result of a backward navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NavAction {
    /// Moved to this step.
    Step(Step),
    /// Already at the first step — the caller should leave the portal for
    /// the landing page. A terminal action, not a state.
    ExitToLanding,
}

/// Credentials for the sign-in path.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
}

/// Fields for the create-account path.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateAccountForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Child details submitted with parental consent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChildForm {
    pub name: String,
    /// `YYYY-MM-DD`.
    pub dob: String,
    pub agree_to_terms: bool,
}

/// Orchestrates step transitions over an explicitly passed session store.
#[derive(Debug, Clone, Default)]
pub struct Navigator {
    registry: StepRegistry,
}

impl Navigator {
    pub fn new(registry: StepRegistry) -> Self {
        Self { registry }
    }

    /// Advance to the next step, honoring skip rules and clamping at the
    /// terminal step.
    ///
    /// Advancing without a user account is a contract violation — the UI
    /// structurally prevents it, a headless caller gets a loud error.
    pub fn advance(&self, store: &mut SessionStore) -> Result<Step> {
        let current = store.state().current_step;
        if store.state().user.is_none() {
            return Err(ConsistencyError::UserMissing { step: current }.into());
        }

        let next = self
            .registry
            .compute_next_index(current, store.state())
            .min(Step::Complete.index());
        let step = Step::from_index(next)
            .ok_or(ConsistencyError::StepOutOfRange { index: next })?;

        store.set_step(next);
        tracing::info!(from = current, to = next, step = %step, "Advanced");
        Ok(step)
    }

    /// Go back exactly one step. No skip-awareness on the way back, so step
    /// 1 is always reachable; at step 1 this exits to the landing page
    /// without mutating anything.
    pub fn retreat(&self, store: &mut SessionStore) -> NavAction {
        let current = store.state().current_step;
        if current > 1 {
            let previous = current - 1;
            store.set_step(previous);
            tracing::info!(from = current, to = previous, "Retreated");
            // current > 1 and dense indices make this infallible.
            NavAction::Step(Step::from_index(previous).expect("dense step indices"))
        } else {
            NavAction::ExitToLanding
        }
    }

    /// Sign in to an existing account.
    ///
    /// An existing account's email is already verified, so this jumps
    /// directly to step 2, bypassing the remaining Account sub-flow. This is
    /// a special-cased transition, not a skip-table entry.
    pub fn enter_sign_in(
        &self,
        store: &mut SessionStore,
        form: &SignInForm,
    ) -> std::result::Result<Step, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if form.email.is_empty() {
            errors.add("email", "Email is required");
        } else if !ledger::valid_email_shape(&form.email) {
            errors.add("email", "Email is invalid");
        }
        if form.password.is_empty() {
            errors.add("password", "Password is required");
        }
        errors.into_result()?;

        let children = self.seeded_children(store);
        store.set_user(Some(User {
            is_parent: true,
            name: String::new(),
            email: form.email.clone(),
            has_verified_email: true,
            children,
        }));
        store.set_step(Step::Payment.index());
        tracing::info!(email = %form.email, "Signed in, skipping to payment");
        Ok(Step::Payment)
    }

    /// Create a new account.
    ///
    /// The new account is unverified; the workflow re-enters step 1's
    /// verification sub-state rather than advancing.
    pub fn enter_create_account(
        &self,
        store: &mut SessionStore,
        form: &CreateAccountForm,
    ) -> std::result::Result<Step, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if form.email.is_empty() {
            errors.add("email", "Email is required");
        } else if !ledger::valid_email_shape(&form.email) {
            errors.add("email", "Email is invalid");
        }
        if form.password.is_empty() {
            errors.add("password", "Password is required");
        } else if form.password.len() < 8 {
            errors.add("password", "Password must be at least 8 characters");
        }
        if form.password != form.confirm_password {
            errors.add("confirm_password", "Passwords do not match");
        }
        if form.first_name.is_empty() {
            errors.add("first_name", "First name is required");
        }
        if form.last_name.is_empty() {
            errors.add("last_name", "Last name is required");
        }
        errors.into_result()?;

        let children = self.seeded_children(store);
        store.set_user(Some(User {
            is_parent: true,
            name: format!("{} {}", form.first_name, form.last_name),
            email: form.email.clone(),
            has_verified_email: false,
            children,
        }));
        store.set_step(Step::Account.index());
        tracing::info!(email = %form.email, "Account created, verification pending");
        Ok(Step::Account)
    }

    /// Confirm device ownership and bind.
    ///
    /// Binding is permanent; the confirmation checkbox is mandatory. On
    /// success the device is bound and the workflow advances.
    pub fn confirm_binding(&self, store: &mut SessionStore, confirmed: bool) -> Result<Step> {
        if !confirmed {
            let mut errors = ValidationErrors::new();
            errors.add(
                "confirm",
                "You must confirm the device ID and ownership before binding",
            );
            return Err(errors.into());
        }
        if store.state().user.is_none() {
            return Err(ConsistencyError::UserMissing {
                step: store.state().current_step,
            }
            .into());
        }
        store.bind_device();
        self.advance(store)
    }

    /// Attach (or confirm) the child's profile under parental consent.
    ///
    /// When the session came from the app the child identity is pre-seeded
    /// and the first DOB submission fails with a scripted mismatch; the
    /// immediate retry with the same inputs succeeds. Standalone sessions
    /// enter the child's details directly with no re-verification.
    pub fn attach_child(
        &self,
        store: &mut SessionStore,
        form: &ChildForm,
        attempt: &mut ConsentAttempt,
        today: NaiveDate,
    ) -> Result<()> {
        if store.state().user.is_none() {
            return Err(ConsistencyError::UserMissing {
                step: store.state().current_step,
            }
            .into());
        }

        let from_app = store.state().invocation_context.is_from_app();
        let seeded_name = store
            .state()
            .pending_child
            .as_ref()
            .map(|c| c.name.clone());
        let name = if from_app {
            seeded_name.unwrap_or_else(|| form.name.clone())
        } else {
            form.name.clone()
        };

        let mut errors = ValidationErrors::new();
        let mut dob = None;

        if name.is_empty() {
            errors.add("name", "Child name is required");
        }

        if form.dob.is_empty() {
            errors.add("dob", "Date of birth is required");
        } else if from_app && !attempt.has_attempted() {
            attempt.record_attempt();
            errors.add("dob", "Date of birth does not match the entered date of birth");
        } else {
            match NaiveDate::parse_from_str(&form.dob, "%Y-%m-%d") {
                Ok(parsed) => dob = Some(parsed),
                Err(_) => errors.add("dob", "Date of birth is invalid"),
            }
        }

        if !form.agree_to_terms {
            errors.add("terms", "You must agree to the terms");
        }

        errors.into_result().map_err(Error::Validation)?;

        let age = ledger::compute_age(dob.expect("validated above"), today);
        store.update_user(|user| {
            user.children = vec![Child {
                name: name.clone(),
                age,
            }];
        });
        tracing::info!(child = %name, age, "Child account attached");
        Ok(())
    }

    fn seeded_children(&self, store: &SessionStore) -> Vec<Child> {
        if store.state().invocation_context.is_from_app() {
            store.state().pending_child.clone().into_iter().collect()
        } else {
            Vec::new()
        }
    }
}
