//! Attest - Off-chain attestation bundles
//!
//! Compose a short statement, sign it with Ethereum accounts, and exchange the
//! statement plus collected signatures as a portable `attest.json` bundle.
//!
//! Key principles:
//! - NO on-chain state (bundles are plain files)
//! - Signatures in a bundle are never trusted, always re-verified
//! - One signature per account, last write wins
//! - Verification runs once the statement has settled, not per keystroke

pub mod account;
pub mod attestation;
pub mod crypto;
pub mod pipeline;
pub mod serialization;
pub mod statement;

pub use account::AccountId;
pub use attestation::{AttestationEntry, AttestationLedger, VerificationReport};
pub use crypto::{LocalWallet, PersonalSignRecovery, SignatureRecovery, Signer, SignerError};
pub use pipeline::{Command, Coordinator, Update};
pub use serialization::{Bundle, BundleFormatError};
pub use statement::{Revision, StatementState};
