//! Player-slot accounting and the child-consent retry policy.
//!
//! The ledger tracks every player identity associated with the device —
//! the approved initial requester, the account owner (if self-added), and
//! invited players — and refuses additions once the cap is reached.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{CapacityError, Error, Result, ValidationErrors};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\S+@\S+\.\S+$").unwrap());

/// Basic `local@domain.tld` shape check.
pub fn valid_email_shape(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Lifecycle of an invited player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InviteStatus {
    Pending,
    Accepted,
}

/// A player invited by email. Removed only by explicit cancellation;
/// accepted never reverts to pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitee {
    pub email: String,
    pub status: InviteStatus,
}

/// One consent dialog's retry state.
///
/// The first confirmation against a fresh attempt reports a DOB mismatch
/// deterministically; the next one succeeds. This is a fixed fixture for
/// scenario reproducibility, not a bug — a real deployment would call an
/// identity-matching service here. Scoped to one dialog and discarded when
/// it closes.
#[derive(Debug, Clone, Default)]
pub struct ConsentAttempt {
    has_attempted_once: bool,
}

impl ConsentAttempt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_attempted(&self) -> bool {
        self.has_attempted_once
    }

    /// Consume the scripted first failure without running the full
    /// confirmation checks. Used by flows that only re-verify the DOB when
    /// the session came from the app.
    pub fn record_attempt(&mut self) {
        self.has_attempted_once = true;
    }

    /// Validate a consent confirmation.
    ///
    /// A non-empty DOB flips the attempt flag even when the terms check also
    /// fails, so the retry clock starts on the first real submission.
    pub fn confirm(
        &mut self,
        dob: &str,
        agreed_to_terms: bool,
    ) -> std::result::Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if dob.is_empty() {
            errors.add("dob", "Date of birth is required");
        } else if !self.has_attempted_once {
            self.has_attempted_once = true;
            errors.add("dob", "Date of birth does not match our records");
        }

        if !agreed_to_terms {
            errors.add("terms", "You must agree to the terms");
        }

        errors.into_result()
    }
}

/// Integer age from a date of birth, by calendar month/day comparison.
///
/// The year difference is decremented when today's month/day precedes the
/// birthday within the year; an exact month/day match is not decremented.
/// A DOB later than `today` clamps to zero.
pub fn compute_age(dob: NaiveDate, today: NaiveDate) -> u32 {
    let mut age = today.year() - dob.year();
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        age -= 1;
    }
    age.max(0) as u32
}

/// Tracks how many player identities are associated with the device and
/// enforces the cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotLedger {
    invitees: Vec<Invitee>,
    owner_added: bool,
    initial_request_approved: bool,
    max_players: usize,
}

impl SlotLedger {
    pub fn new(max_players: usize) -> Self {
        Self {
            invitees: Vec::new(),
            owner_added: false,
            initial_request_approved: false,
            max_players,
        }
    }

    pub fn invitees(&self) -> &[Invitee] {
        &self.invitees
    }

    pub fn owner_added(&self) -> bool {
        self.owner_added
    }

    pub fn initial_request_approved(&self) -> bool {
        self.initial_request_approved
    }

    pub fn max_players(&self) -> usize {
        self.max_players
    }

    /// Every identity counted against the cap: invitees, the owner (if
    /// self-added), and the approved initial requester.
    pub fn total_players(&self) -> usize {
        self.invitees.len()
            + usize::from(self.owner_added)
            + usize::from(self.initial_request_approved)
    }

    pub fn can_add_more(&self) -> bool {
        self.total_players() < self.max_players
    }

    /// Toggle "add myself as a player".
    pub fn set_owner_added(&mut self, added: bool) {
        self.owner_added = added;
    }

    /// Approve the pending initial access request (after consent).
    pub fn approve_initial_request(&mut self) {
        if !self.initial_request_approved {
            self.initial_request_approved = true;
            tracing::info!("Initial access request approved");
        }
    }

    /// Invite a new player by email.
    ///
    /// Field errors are computed before any mutation; at the cap the action
    /// is refused outright and the invitee list is unchanged.
    pub fn invite(&mut self, email: &str, birthday: &str) -> Result<()> {
        let mut errors = ValidationErrors::new();

        if email.is_empty() {
            errors.add("email", "Email is required");
        } else if !valid_email_shape(email) {
            errors.add("email", "Please enter a valid email address");
        }

        if birthday.is_empty() {
            errors.add("birthday", "Birthday is required");
        }

        errors.into_result().map_err(Error::Validation)?;

        if !self.can_add_more() {
            return Err(CapacityError::MaxPlayersReached {
                max: self.max_players,
            }
            .into());
        }

        tracing::info!(email, "Player invited");
        self.invitees.push(Invitee {
            email: email.to_string(),
            status: InviteStatus::Pending,
        });
        Ok(())
    }

    /// Remove the invitee at `index`. Out-of-range is a defensive no-op —
    /// the UI never produces invalid indices, headless callers might.
    pub fn cancel_invite(&mut self, index: usize) {
        if index < self.invitees.len() {
            let removed = self.invitees.remove(index);
            tracing::info!(email = %removed.email, "Invite cancelled");
        }
    }

    /// Mark the invitee at `index` as accepted. No-op out of range; an
    /// accepted invitee stays accepted.
    pub fn mark_accepted(&mut self, index: usize) {
        if let Some(invitee) = self.invitees.get_mut(index) {
            invitee.status = InviteStatus::Accepted;
        }
    }
}
