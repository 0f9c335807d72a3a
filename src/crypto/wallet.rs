//! In-process secp256k1 wallet
//!
//! `LocalWallet` holds a single private key and signs statements the way a
//! browser wallet's `personal_sign` does, so its output verifies with
//! [`PersonalSignRecovery`](super::personal_sign::PersonalSignRecovery).
//!
//! # Security
//!
//! - Hex key material passed in is copied into `Zeroizing` buffers and wiped
//!   after parsing
//! - `k256::ecdsa::SigningKey` zeroizes itself on drop

use crate::account::AccountId;
use crate::crypto::personal_sign::{address_of, encode_signature, hash_message};
use crate::crypto::traits::{Signer, SignerError, SignerResult};
use async_trait::async_trait;
use k256::ecdsa::SigningKey;
use thiserror::Error;
use zeroize::Zeroizing;

/// Errors loading a private key
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("private key is not valid hex")]
    InvalidHex,

    #[error("private key must be 32 bytes, got {0}")]
    InvalidLength(usize),

    #[error("private key is not a valid secp256k1 scalar")]
    InvalidScalar,
}

/// Wallet backed by a private key held in memory.
#[derive(Clone)]
pub struct LocalWallet {
    key: SigningKey,
    address: AccountId,
}

impl LocalWallet {
    /// Wrap an existing signing key.
    pub fn new(key: SigningKey) -> Self {
        let address = address_of(key.verifying_key());
        Self { key, address }
    }

    /// Generate a fresh random key.
    pub fn random() -> Self {
        Self::new(SigningKey::random(&mut rand::rngs::OsRng))
    }

    /// Parse a 32-byte private key from hex (optional `0x` prefix).
    pub fn from_hex(key_hex: &str) -> Result<Self, KeyError> {
        let trimmed = key_hex.trim();
        let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = Zeroizing::new(hex::decode(digits).map_err(|_| KeyError::InvalidHex)?);
        if bytes.len() != 32 {
            return Err(KeyError::InvalidLength(bytes.len()));
        }
        let key = SigningKey::from_slice(&bytes).map_err(|_| KeyError::InvalidScalar)?;
        Ok(Self::new(key))
    }

    /// Hex encoding of the private key, for writing key files.
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.key.to_bytes()))
    }

    /// Account this wallet signs for.
    pub fn address(&self) -> AccountId {
        self.address.clone()
    }

    /// Sign a statement synchronously.
    pub fn sign_message(&self, content: &str) -> SignerResult<String> {
        let digest = hash_message(content);
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(&digest)
            .map_err(|e| SignerError::Signing(e.to_string()))?;
        Ok(encode_signature(&signature, recovery_id))
    }
}

impl std::fmt::Debug for LocalWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalWallet")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Signer for LocalWallet {
    fn account(&self) -> Option<AccountId> {
        Some(self.address.clone())
    }

    async fn sign(&self, content: &str, account: &AccountId) -> SignerResult<String> {
        if account != &self.address {
            return Err(SignerError::AccountMismatch(account.clone()));
        }
        self.sign_message(content)
    }
}
