//! Error types for the portal flow.

use std::collections::BTreeMap;

/// Top-level error type for the workflow.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Capacity error: {0}")]
    Capacity(#[from] CapacityError),

    #[error("Consistency error: {0}")]
    Consistency(#[from] ConsistencyError),
}

/// A field-keyed set of validation failures.
///
/// One message per invalid field; multiple fields may fail in a single
/// submission. Absence of a key means the field is valid. The workflow stays
/// on the current step when any of these are returned — validation never
/// mutates session state.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ValidationErrors {
    pub fields: BTreeMap<String, String>,
}

impl std::error::Error for ValidationErrors {}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure for `field`. Later messages for the same field win.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields.insert(field.into(), message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Return `Ok(())` when no field failed, else `Err(self)`.
    pub fn into_result(self) -> std::result::Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, message) in &self.fields {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

/// The slot ledger refused an action.
///
/// Surfaced as a disabled-action state by callers, never as a panic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CapacityError {
    #[error("Maximum number of players ({max}) reached")]
    MaxPlayersReached { max: usize },
}

/// A programming-contract violation.
///
/// The UI structurally prevents these; a headless caller can hit them, and
/// they fail loudly rather than being absorbed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsistencyError {
    #[error("Cannot advance past step {step}: no user account exists")]
    UserMissing { step: u8 },

    #[error("Cannot return to app: device is not bound")]
    DeviceNotBound,

    #[error("Step index {index} is out of range")]
    StepOutOfRange { index: u8 },
}

/// Result type alias for the workflow.
pub type Result<T> = std::result::Result<T, Error>;
