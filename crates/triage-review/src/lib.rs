//! Human review state machine (C7, `spec.md` §4.7): `pending -> in_review ->
//! {approved, rejected, escalated}` (also `pending -> escalated`), with
//! `assign` and `act` both guarded by the persistence layer's
//! compare-and-set so two reviewers racing on the same entry can't both
//! win.

pub mod error;
pub mod state_machine;

pub use error::{Result, ReviewError};
pub use state_machine::{ReviewAction, ReviewStateMachine, ReviewStats};
