//! Portal Flow — device onboarding workflow core.
//!
//! A guided flow that binds a device to a billing account, optionally
//! attaches a minor's profile under parental consent, collects payment
//! details, and grants multi-user device access before handing control back
//! to the host application. Rendering, real email delivery, and real
//! payment processing live outside this crate; the workflow state machine,
//! its session state, and the slot/consent accounting live here.

pub mod bridge;
pub mod config;
pub mod error;
pub mod ledger;
pub mod manager;
pub mod navigator;
pub mod payment;
pub mod routes;
pub mod session;
pub mod steps;
pub mod verify;
