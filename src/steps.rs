//! The ordered step sequence and its skip rules.
//!
//! Declarative only — the navigator consumes this to decide transitions.

use serde::{Deserialize, Serialize};

use crate::session::SessionState;

/// The five numbered steps of the onboarding sequence.
///
/// Progresses linearly: Account → Payment → DeviceAssignment →
/// AccessRequest → Complete. Email verification is a sub-state of Account,
/// not a numbered step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Account,
    Payment,
    DeviceAssignment,
    AccessRequest,
    Complete,
}

impl Step {
    /// 1-based position in the sequence.
    pub fn index(&self) -> u8 {
        match self {
            Self::Account => 1,
            Self::Payment => 2,
            Self::DeviceAssignment => 3,
            Self::AccessRequest => 4,
            Self::Complete => 5,
        }
    }

    pub fn from_index(index: u8) -> Option<Step> {
        match index {
            1 => Some(Self::Account),
            2 => Some(Self::Payment),
            3 => Some(Self::DeviceAssignment),
            4 => Some(Self::AccessRequest),
            5 => Some(Self::Complete),
            _ => None,
        }
    }

    /// Whether this step is terminal (the workflow is done).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete)
    }

    /// The next step in the linear progression, if any.
    pub fn next(&self) -> Option<Step> {
        Self::from_index(self.index() + 1)
    }

    /// Human-readable label, as shown in the progress indicator.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Account => "Account",
            Self::Payment => "Payment",
            Self::DeviceAssignment => "Device Assignment",
            Self::AccessRequest => "Access Request",
            Self::Complete => "Complete",
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Account => "account",
            Self::Payment => "payment",
            Self::DeviceAssignment => "device_assignment",
            Self::AccessRequest => "access_request",
            Self::Complete => "complete",
        };
        write!(f, "{s}")
    }
}

/// A pure predicate deciding whether a step is bypassed when it would be
/// entered next.
pub type SkipRule = fn(&SessionState) -> bool;

fn email_already_verified(state: &SessionState) -> bool {
    state
        .user
        .as_ref()
        .is_some_and(|user| user.has_verified_email)
}

/// Ordered step descriptors with per-step skip rules.
#[derive(Debug, Clone)]
pub struct StepRegistry {
    skip_rules: Vec<(Step, SkipRule)>,
}

impl Default for StepRegistry {
    fn default() -> Self {
        // The only skip in this design: a user whose email is already
        // verified advances past the step following Account without being
        // re-prompted, and the counter still moves one net step.
        Self {
            skip_rules: vec![(Step::Payment, email_already_verified)],
        }
    }
}

impl StepRegistry {
    /// Whether `step` is bypassed for the given state.
    pub fn skips(&self, step: Step, state: &SessionState) -> bool {
        self.skip_rules
            .iter()
            .any(|(s, rule)| *s == step && rule(state))
    }

    /// Compute the raw next index from `current`.
    ///
    /// Returns `current + 1` unless a registered skip rule for that step
    /// holds, in which case `current + 2`. Skip rules never chain: two
    /// consecutive skippable steps are not supported, so exactly one level
    /// is resolved here. Clamping at the terminal index is the caller's job.
    pub fn compute_next_index(&self, current: u8, state: &SessionState) -> u8 {
        let next = current + 1;
        match Step::from_index(next) {
            Some(step) if self.skips(step, state) => next + 1,
            _ => next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PortalConfig;
    use crate::session::{SessionStore, User};

    fn state_with_user(verified: bool) -> crate::session::SessionState {
        let mut store = SessionStore::new(&PortalConfig::default());
        store.set_user(Some(User {
            is_parent: true,
            name: "A B".to_string(),
            email: "a@b.com".to_string(),
            has_verified_email: verified,
            children: Vec::new(),
        }));
        store.state().clone()
    }

    #[test]
    fn indices_are_one_based_and_dense() {
        let steps = [
            Step::Account,
            Step::Payment,
            Step::DeviceAssignment,
            Step::AccessRequest,
            Step::Complete,
        ];
        for (i, step) in steps.iter().enumerate() {
            assert_eq!(step.index() as usize, i + 1);
            assert_eq!(Step::from_index(step.index()), Some(*step));
        }
        assert_eq!(Step::from_index(0), None);
        assert_eq!(Step::from_index(6), None);
    }

    #[test]
    fn next_walks_all_steps() {
        let mut current = Step::Account;
        let expected = [
            Step::Payment,
            Step::DeviceAssignment,
            Step::AccessRequest,
            Step::Complete,
        ];
        for expected_next in expected {
            let next = current.next().unwrap();
            assert_eq!(next, expected_next);
            current = next;
        }
        assert!(current.next().is_none());
        assert!(current.is_terminal());
    }

    #[test]
    fn display_matches_serde() {
        let steps = [
            Step::Account,
            Step::Payment,
            Step::DeviceAssignment,
            Step::AccessRequest,
            Step::Complete,
        ];
        for step in steps {
            let display = format!("{step}");
            let json = serde_json::to_string(&step).unwrap();
            assert_eq!(format!("\"{display}\""), json);
        }
    }

    #[test]
    fn verified_email_skips_one_step_from_account() {
        let registry = StepRegistry::default();
        assert_eq!(registry.compute_next_index(1, &state_with_user(true)), 3);
    }

    #[test]
    fn unverified_email_advances_normally() {
        let registry = StepRegistry::default();
        assert_eq!(registry.compute_next_index(1, &state_with_user(false)), 2);
    }

    #[test]
    fn no_user_advances_normally() {
        let registry = StepRegistry::default();
        let store = SessionStore::new(&PortalConfig::default());
        assert_eq!(registry.compute_next_index(1, store.state()), 2);
    }

    #[test]
    fn skip_rule_only_fires_when_entering_the_registered_step() {
        let registry = StepRegistry::default();
        let state = state_with_user(true);
        // Past the Account boundary the verified flag no longer matters.
        assert_eq!(registry.compute_next_index(2, &state), 3);
        assert_eq!(registry.compute_next_index(3, &state), 4);
        assert_eq!(registry.compute_next_index(4, &state), 5);
    }
}
