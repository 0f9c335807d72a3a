//! Ethereum `personal_sign` (EIP-191) hashing and signer recovery
//!
//! ## Message format
//!
//! `keccak256("\x19Ethereum Signed Message:\n" || len(message) || message)`
//!
//! where `len` is the decimal byte length. Content that is a strict hex string
//! (`0x` followed only by hex digits) is signed as the decoded bytes, the same
//! way web3's `accounts.recover` treats it: digits pair up from the left and an
//! odd trailing digit becomes its own byte (`0xabc` is `[0xab, 0x0c]`).
//! Everything else is signed as UTF-8.
//!
//! ## Signature format
//!
//! 65 bytes `r || s || v`, hex encoded with an optional `0x` prefix. `v` may be
//! a raw recovery id (0/1), the legacy 27/28, or an EIP-155 value (>= 35).
//! High-`s` signatures are normalized before recovery.

use crate::account::{AccountId, ADDRESS_LEN};
use crate::crypto::traits::{RecoveryError, SignatureRecovery};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use sha3::{Digest, Keccak256};
use std::borrow::Cow;

/// Encoded signature length in bytes (r, s, v)
pub const SIGNATURE_LEN: usize = 65;

const MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n";

/// Bytes actually signed for a statement.
pub fn message_bytes(content: &str) -> Cow<'_, [u8]> {
    match strict_hex_digits(content) {
        Some(digits) => Cow::Owned(
            digits
                .as_bytes()
                .chunks(2)
                .map(|pair| pair.iter().fold(0u8, |byte, &digit| (byte << 4) | nibble(digit)))
                .collect(),
        ),
        None => Cow::Borrowed(content.as_bytes()),
    }
}

/// Value of one ASCII hex digit; callers validate the digit first
fn nibble(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        b'A'..=b'F' => digit - b'A' + 10,
        _ => 0,
    }
}

fn strict_hex_digits(content: &str) -> Option<&str> {
    let digits = content
        .strip_prefix("0x")
        .or_else(|| content.strip_prefix("0X"))?;
    digits
        .bytes()
        .all(|b| b.is_ascii_hexdigit())
        .then_some(digits)
}

/// EIP-191 digest of a statement.
pub fn hash_message(content: &str) -> [u8; 32] {
    let message = message_bytes(content);
    let mut hasher = Keccak256::new();
    hasher.update(MESSAGE_PREFIX);
    hasher.update(message.len().to_string().as_bytes());
    hasher.update(&message);
    hasher.finalize().into()
}

/// Decode a hex signature into its ECDSA parts.
///
/// The returned signature is always low-`s`, with the recovery id adjusted to
/// match.
pub fn decode_signature(signature: &str) -> Result<(Signature, RecoveryId), RecoveryError> {
    let trimmed = signature.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let bytes = hex::decode(digits).map_err(|_| RecoveryError::InvalidHex)?;

    if bytes.len() != SIGNATURE_LEN {
        return Err(RecoveryError::InvalidLength {
            expected: SIGNATURE_LEN,
            actual: bytes.len(),
        });
    }

    let v = bytes[64];
    let recovery_byte = match v {
        0 | 1 => v,
        27 | 28 => v - 27,
        v if v >= 35 => 1 - (v % 2),
        other => return Err(RecoveryError::InvalidRecoveryId(other)),
    };
    let recovery_id =
        RecoveryId::from_byte(recovery_byte).ok_or(RecoveryError::InvalidRecoveryId(v))?;

    let parsed = Signature::from_slice(&bytes[..64])
        .map_err(|e| RecoveryError::Malformed(e.to_string()))?;

    Ok(match parsed.normalize_s() {
        Some(low) => (
            low,
            RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced()),
        ),
        None => (parsed, recovery_id),
    })
}

/// Encode a signature the way wallets return it: `0x` + hex(r || s || 27 + id).
pub fn encode_signature(signature: &Signature, recovery_id: RecoveryId) -> String {
    let mut bytes = Vec::with_capacity(SIGNATURE_LEN);
    bytes.extend_from_slice(&signature.to_bytes());
    bytes.push(27 + recovery_id.to_byte());
    format!("0x{}", hex::encode(bytes))
}

/// Ethereum address of a public key.
pub fn address_of(key: &VerifyingKey) -> AccountId {
    let point = key.to_encoded_point(false);
    let hash = Keccak256::digest(&point.as_bytes()[1..]);
    let mut address = [0u8; ADDRESS_LEN];
    address.copy_from_slice(&hash[32 - ADDRESS_LEN..]);
    AccountId::from_address(&address)
}

/// Recover the signer of a `personal_sign` signature over `content`.
pub fn recover(content: &str, signature: &str) -> Result<AccountId, RecoveryError> {
    let (signature, recovery_id) = decode_signature(signature)?;
    let digest = hash_message(content);
    let key = VerifyingKey::recover_from_prehash(&digest, &signature, recovery_id)
        .map_err(|e| RecoveryError::Malformed(e.to_string()))?;
    Ok(address_of(&key))
}

/// [`SignatureRecovery`] for Ethereum `personal_sign` signatures.
#[derive(Debug, Clone, Copy, Default)]
pub struct PersonalSignRecovery;

impl SignatureRecovery for PersonalSignRecovery {
    fn recover(&self, content: &str, signature: &str) -> Result<AccountId, RecoveryError> {
        recover(content, signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::wallet::LocalWallet;

    fn wallet() -> LocalWallet {
        LocalWallet::from_hex(&format!("{:0>64}", "1")).unwrap()
    }

    #[test]
    fn test_hash_message_known_vector() {
        assert_eq!(
            hex::encode(hash_message("Hello World")),
            "a1de988600a42c4b4ab089b619297c17d53cffae5d5120d82d8a92d0bb3b78f2"
        );
    }

    #[test]
    fn test_hex_content_signed_as_bytes() {
        assert_eq!(message_bytes("0x48656c6c6f").as_ref(), b"Hello");
        assert_eq!(message_bytes("0X00ff").as_ref(), &[0x00, 0xff]);
        assert_eq!(message_bytes("0xabc").as_ref(), &[0xab, 0x0c]);
        assert_eq!(message_bytes("0xF").as_ref(), &[0x0f]);
        assert_eq!(message_bytes("0x").as_ref(), b"");
        // Not strict hex: signed as text
        assert_eq!(message_bytes("0xnope").as_ref(), b"0xnope");
        assert_eq!(message_bytes("hello").as_ref(), b"hello");
        assert_eq!(hash_message("0x48656c6c6f"), hash_message("Hello"));
    }

    #[test]
    fn test_recover_roundtrip() {
        let wallet = wallet();
        let signature = wallet.sign_message("hello").unwrap();
        assert_eq!(recover("hello", &signature).unwrap(), wallet.address());
    }

    #[test]
    fn test_recover_different_content_yields_other_account() {
        let wallet = wallet();
        let signature = wallet.sign_message("hello").unwrap();
        let recovered = recover("hello!", &signature);
        assert_ne!(recovered, Ok(wallet.address()));
    }

    #[test]
    fn test_accepts_raw_recovery_id_and_missing_prefix() {
        let wallet = wallet();
        let signature = wallet.sign_message("statement").unwrap();
        let mut bytes = hex::decode(&signature[2..]).unwrap();
        bytes[64] -= 27;
        let raw = hex::encode(&bytes);
        assert_eq!(recover("statement", &raw).unwrap(), wallet.address());
    }

    #[test]
    fn test_accepts_eip155_v() {
        let wallet = wallet();
        let signature = wallet.sign_message("statement").unwrap();
        let mut bytes = hex::decode(&signature[2..]).unwrap();
        // chain id 1: v = 35 + 2 + recovery id
        bytes[64] = 37 + (bytes[64] - 27);
        let encoded = format!("0x{}", hex::encode(&bytes));
        assert_eq!(recover("statement", &encoded).unwrap(), wallet.address());
    }

    #[test]
    fn test_high_s_signature_is_normalized() {
        let wallet = wallet();
        let signature = wallet.sign_message("statement").unwrap();
        let (sig, recovery_id) = decode_signature(&signature).unwrap();

        let (r, s) = sig.split_scalars();
        let high = Signature::from_scalars(r.to_bytes(), (-*s).to_bytes()).unwrap();
        let flipped = RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced());
        let encoded = encode_signature(&high, flipped);

        assert_eq!(recover("statement", &encoded).unwrap(), wallet.address());
    }

    #[test]
    fn test_malformed_signatures_are_errors_not_panics() {
        assert_eq!(recover("x", "not hex"), Err(RecoveryError::InvalidHex));
        assert_eq!(
            recover("x", "0x1234"),
            Err(RecoveryError::InvalidLength {
                expected: 65,
                actual: 2
            })
        );
        let bad_v = format!("0x{}{}", "11".repeat(64), "05");
        assert_eq!(recover("x", &bad_v), Err(RecoveryError::InvalidRecoveryId(5)));
        let zero = format!("0x{}1b", "00".repeat(64));
        assert!(matches!(recover("x", &zero), Err(RecoveryError::Malformed(_))));
        assert!(recover("x", "").is_err());
    }

    #[test]
    fn test_personal_sign_recovery_trait() {
        let wallet = wallet();
        let signature = wallet.sign_message("trait").unwrap();
        let recovery = PersonalSignRecovery;
        assert_eq!(
            recovery.recover("trait", &signature).unwrap(),
            wallet.address()
        );
    }
}
