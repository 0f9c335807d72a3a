//! Attestation ledger
//!
//! Stores raw `(account, signature)` pairs for the current statement and
//! derives, on demand, the subset that verifies against a given statement.
//!
//! ## Design
//!
//! - **Storage**: `BTreeMap` keyed by canonical account, so iteration is
//!   lexicographic by account and there is at most one entry per account
//! - **Upsert**: last write wins per account, no validation at insert time
//! - **Verification**: pure function of `(content, entries)`; recovery errors
//!   exclude the entry and never abort the pass
//!
//! ## Security Properties
//!
//! - Loaded bundles are never trusted: every entry is re-verified
//! - A crafted signature field can only fail to verify, it cannot crash or
//!   short-circuit the verifier
//! - Exported bundles contain verified entries only

use crate::account::AccountId;
use crate::crypto::traits::{RecoveryError, SignatureRecovery};
use crate::serialization::Bundle;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// One signer's claim over a statement.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AttestationEntry {
    /// Canonical account identifier
    pub account: AccountId,

    /// Opaque signature blob produced by the account's key over the content
    pub signature: String,
}

impl AttestationEntry {
    pub fn new(account: impl Into<AccountId>, signature: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            signature: signature.into(),
        }
    }
}

/// Why an entry was left out of the verified set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    /// The signature blob could not be decoded or recovered
    Malformed(RecoveryError),

    /// The signature is well formed but was made by someone else, or over
    /// different content
    Mismatch { recovered: AccountId },
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(e) => write!(f, "malformed signature: {}", e),
            Self::Mismatch { recovered } => write!(f, "recovers to {}", recovered),
        }
    }
}

/// An entry that did not verify, with the reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub account: AccountId,
    pub reason: RejectionReason,
}

/// Outcome of verifying every ledger entry against one statement
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationReport {
    /// Entries whose signature recovers to their account, ordered by account
    pub verified: Vec<AttestationEntry>,

    /// Everything else, ordered by account
    pub rejected: Vec<Rejection>,
}

impl VerificationReport {
    /// True when every entry verified
    pub fn all_verified(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Deduplicated collection of attestations for the current statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttestationLedger {
    entries: BTreeMap<AccountId, String>,
}

impl AttestationLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `account`.
    ///
    /// Returns the signature previously stored for the account, if any.
    pub fn upsert(
        &mut self,
        account: impl Into<AccountId>,
        signature: impl Into<String>,
    ) -> Option<String> {
        self.entries.insert(account.into(), signature.into())
    }

    /// Replace the whole ledger. Duplicate accounts resolve last-write-wins.
    pub fn replace_all(&mut self, entries: impl IntoIterator<Item = AttestationEntry>) {
        self.entries = entries
            .into_iter()
            .map(|entry| (entry.account, entry.signature))
            .collect();
    }

    /// Remove the entry for `account`
    pub fn remove(&mut self, account: &AccountId) -> Option<String> {
        self.entries.remove(account)
    }

    /// Stored signature for `account`
    pub fn get(&self, account: &AccountId) -> Option<&str> {
        self.entries.get(account).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All raw entries, verified or not, ordered by account
    pub fn entries(&self) -> Vec<AttestationEntry> {
        self.entries
            .iter()
            .map(|(account, signature)| AttestationEntry::new(account.clone(), signature.clone()))
            .collect()
    }

    /// Verify every entry against `content`, keeping the reasons for failures.
    pub fn verify_report<R>(&self, content: &str, recovery: &R) -> VerificationReport
    where
        R: SignatureRecovery + ?Sized,
    {
        let mut report = VerificationReport::default();

        for (account, signature) in &self.entries {
            let reason = match recovery.recover(content, signature) {
                Ok(recovered) if &recovered == account => {
                    report
                        .verified
                        .push(AttestationEntry::new(account.clone(), signature.clone()));
                    continue;
                }
                Ok(recovered) => RejectionReason::Mismatch { recovered },
                Err(e) => RejectionReason::Malformed(e),
            };

            debug!(account = %account, reason = ?reason, "attestation did not verify");
            report.rejected.push(Rejection {
                account: account.clone(),
                reason,
            });
        }

        report
    }

    /// Entries whose signature recovers to their account over `content`,
    /// ordered ascending by account.
    pub fn verified_against<R>(&self, content: &str, recovery: &R) -> Vec<AttestationEntry>
    where
        R: SignatureRecovery + ?Sized,
    {
        self.verify_report(content, recovery).verified
    }

    /// Exportable bundle: `content` plus the verified entries only.
    pub fn to_bundle<R>(&self, content: &str, recovery: &R) -> Bundle
    where
        R: SignatureRecovery + ?Sized,
    {
        Bundle::new(content, self.verified_against(content, recovery))
    }

    /// Split a parsed bundle into its raw fields.
    ///
    /// Performs no verification: callers load the entries and re-verify.
    pub fn from_bundle(bundle: Bundle) -> (String, Vec<AttestationEntry>) {
        bundle.into_parts()
    }
}

impl FromIterator<AttestationEntry> for AttestationLedger {
    fn from_iter<I: IntoIterator<Item = AttestationEntry>>(iter: I) -> Self {
        let mut ledger = Self::new();
        ledger.replace_all(iter);
        ledger
    }
}
