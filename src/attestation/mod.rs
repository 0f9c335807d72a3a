//! Attestation ledger and verification.
//!
//! Holds the `(account, signature)` pairs collected for a statement and
//! reconciles them against the statement text.

pub mod ledger;

#[cfg(test)]
mod proptests;

pub use ledger::{
    AttestationEntry, AttestationLedger, Rejection, RejectionReason, VerificationReport,
};
