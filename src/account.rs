//! Canonical account identifiers
//!
//! Accounts are Ethereum-style addresses. Wallets hand them out in mixed case
//! (EIP-55 checksum form) while recovery produces raw bytes, so every
//! comparison in this crate goes through one canonical form:
//!
//! - surrounding whitespace trimmed
//! - ASCII lowercased (`0xabc...`)
//!
//! Ledger keys, per-account deduplication and the verification equality check
//! all use the canonical string. Ordering is lexicographic on that string.

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;

/// Length of an Ethereum address in bytes
pub const ADDRESS_LEN: usize = 20;

/// Case-normalized account identifier.
///
/// Construction never fails: an identifier that is not a well-formed address
/// is still a valid ledger key, it just can never verify.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct AccountId(String);

impl AccountId {
    /// Canonicalize a raw identifier.
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_ascii_lowercase())
    }

    /// Build the identifier for a 20-byte address.
    pub fn from_address(address: &[u8; ADDRESS_LEN]) -> Self {
        Self(format!("0x{}", hex::encode(address)))
    }

    /// Canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode to raw address bytes, if this is a well-formed `0x` address.
    pub fn to_address(&self) -> Option<[u8; ADDRESS_LEN]> {
        let digits = self.0.strip_prefix("0x")?;
        if digits.len() != ADDRESS_LEN * 2 {
            return None;
        }
        let mut address = [0u8; ADDRESS_LEN];
        hex::decode_to_slice(digits, &mut address).ok()?;
        Some(address)
    }

    /// EIP-55 mixed-case checksum rendering, for display.
    ///
    /// Returns `None` when the identifier is not a well-formed address.
    pub fn to_checksum(&self) -> Option<String> {
        let address = self.to_address()?;
        let lower = hex::encode(address);
        let hash = Keccak256::digest(lower.as_bytes());

        let mut out = String::with_capacity(2 + lower.len());
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let byte = hash[i / 2];
            let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        Some(out)
    }

    /// Whether this identifier could ever match a recovered signer.
    pub fn is_address(&self) -> bool {
        self.to_address().is_some()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for AccountId {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<&str> for AccountId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<AccountId> for String {
    fn from(account: AccountId) -> Self {
        account.0
    }
}

impl AsRef<str> for AccountId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
