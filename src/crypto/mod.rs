//! Cryptographic collaborators for attestation
//!
//! This module provides:
//! - `SignatureRecovery` / `Signer` capability traits injected into the core
//! - Ethereum `personal_sign` (EIP-191) hashing and signer recovery
//! - An in-process secp256k1 wallet and a scriptable mock signer
pub mod mock;
pub mod personal_sign;
pub mod traits;
pub mod wallet;

pub use personal_sign::{hash_message, recover, PersonalSignRecovery};
pub use traits::{RecoveryError, SignatureRecovery, Signer, SignerError, SignerResult};
pub use wallet::{KeyError, LocalWallet};
