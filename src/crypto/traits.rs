//! Signing and recovery capabilities
//!
//! The core never talks to a wallet directly. It is handed a
//! [`SignatureRecovery`] (pure, synchronous) and optionally a [`Signer`]
//! (asynchronous, may be absent until a wallet connects). Both are mockable.

use crate::account::AccountId;
use async_trait::async_trait;

/// Errors produced while recovering a signer from a signature blob.
///
/// Internal to verification: a recovery error means "did not verify" and is
/// never propagated past the ledger.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecoveryError {
    #[error("signature is not valid hex")]
    InvalidHex,

    #[error("signature must be {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid recovery id: {0}")]
    InvalidRecoveryId(u8),

    #[error("malformed signature: {0}")]
    Malformed(String),
}

/// Result type for signer operations
pub type SignerResult<T> = Result<T, SignerError>;

/// Errors reported by an external signer
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignerError {
    /// No wallet is connected, or it went away mid-request
    #[error("signer unavailable: {0}")]
    Connection(String),

    /// The holder declined the request (e.g. dismissed the wallet prompt)
    #[error("signing request rejected: {0}")]
    Rejected(String),

    /// The signer accepted the request but failed to produce a signature
    #[error("signing failed: {0}")]
    Signing(String),

    /// The signer does not hold a key for the requested account
    #[error("signer does not control account {0}")]
    AccountMismatch(AccountId),
}

/// Recover the signing account from a `(content, signature)` pair.
///
/// Implementations must be pure and must not panic on any input.
pub trait SignatureRecovery: Send + Sync {
    fn recover(&self, content: &str, signature: &str) -> Result<AccountId, RecoveryError>;
}

impl<T: SignatureRecovery + ?Sized> SignatureRecovery for std::sync::Arc<T> {
    fn recover(&self, content: &str, signature: &str) -> Result<AccountId, RecoveryError> {
        (**self).recover(content, signature)
    }
}

/// Signs statement text on behalf of an account.
///
/// This is the only true suspension point in the system besides file IO.
/// Callers tag each request with the statement revision it was issued for and
/// drop results whose revision is no longer current.
#[async_trait]
pub trait Signer: Send + Sync {
    /// Account currently available for signing, if connected.
    fn account(&self) -> Option<AccountId>;

    /// Sign `content` with the key held for `account`.
    async fn sign(&self, content: &str, account: &AccountId) -> SignerResult<String>;
}
