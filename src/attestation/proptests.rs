//! Property-based tests for the attestation ledger
//!
//! Tests for:
//! - Verification: determinism, soundness, completeness, ordering
//! - Deduplication: last write wins per account
//! - Bundles: export then import yields (content, verified entries)

use super::ledger::{AttestationEntry, AttestationLedger};
use crate::account::AccountId;
use crate::crypto::personal_sign::PersonalSignRecovery;
use crate::crypto::traits::{RecoveryError, SignatureRecovery};
use crate::crypto::wallet::LocalWallet;
use crate::serialization::Bundle;
use proptest::prelude::*;

/// Cheap stand-in for ECDSA: "<account>|<content>" recovers to <account>.
struct StubRecovery;

impl SignatureRecovery for StubRecovery {
    fn recover(&self, content: &str, signature: &str) -> Result<AccountId, RecoveryError> {
        match signature.split_once('|') {
            Some((account, signed)) if signed == content => Ok(AccountId::new(account)),
            Some(_) => Ok(AccountId::new("0xffff")),
            None => Err(RecoveryError::Malformed("no separator".to_string())),
        }
    }
}

/// One upsert: account, and how its signature is produced
#[derive(Debug, Clone)]
enum Claim {
    /// Valid over the statement under test
    Valid,
    /// Valid, but over other content
    OtherContent(String),
    /// Signed by a different account
    Impersonated(String),
    /// Arbitrary bytes
    Garbage(String),
}

fn claim() -> impl Strategy<Value = Claim> {
    prop_oneof![
        Just(Claim::Valid),
        "[a-z ]{0,12}".prop_map(Claim::OtherContent),
        "0x[0-9a-f]{2}".prop_map(Claim::Impersonated),
        "[^|]{0,20}".prop_map(Claim::Garbage),
    ]
}

fn build_ledger(content: &str, claims: &[(String, Claim)]) -> AttestationLedger {
    let mut ledger = AttestationLedger::new();
    for (account, claim) in claims {
        let signature = match claim {
            Claim::Valid => format!("{account}|{content}"),
            Claim::OtherContent(other) => format!("{account}|{content}{other}x"),
            Claim::Impersonated(other) => format!("{other}|{content}"),
            Claim::Garbage(bytes) => bytes.clone(),
        };
        ledger.upsert(account.as_str(), signature);
    }
    ledger
}

fn claims() -> impl Strategy<Value = Vec<(String, Claim)>> {
    prop::collection::vec(("0x[0-9a-fA-F]{2}", claim()), 0..24)
}

proptest! {
    /// Property: Verification is deterministic
    /// Same (content, entries) always yields the same ordered sequence
    #[test]
    fn verification_is_deterministic(content in ".{0,40}", claims in claims()) {
        let ledger = build_ledger(&content, &claims);
        let first = ledger.verified_against(&content, &StubRecovery);
        let second = ledger.verified_against(&content, &StubRecovery);
        prop_assert_eq!(first, second);
    }

    /// Property: Soundness
    /// Every verified entry recovers to its own account
    #[test]
    fn verified_entries_recover_to_their_account(content in ".{0,40}", claims in claims()) {
        let ledger = build_ledger(&content, &claims);
        for entry in ledger.verified_against(&content, &StubRecovery) {
            prop_assert_eq!(
                StubRecovery.recover(&content, &entry.signature),
                Ok(entry.account.clone())
            );
        }
    }

    /// Property: Completeness
    /// Every stored entry that recovers to its account is in the verified set
    #[test]
    fn matching_entries_are_never_dropped(content in ".{0,40}", claims in claims()) {
        let ledger = build_ledger(&content, &claims);
        let verified = ledger.verified_against(&content, &StubRecovery);
        for entry in ledger.entries() {
            if StubRecovery.recover(&content, &entry.signature) == Ok(entry.account.clone()) {
                prop_assert!(verified.contains(&entry));
            }
        }
    }

    /// Property: Verified set is a subset of the ledger, sorted by account
    #[test]
    fn verified_is_sorted_subset(content in ".{0,40}", claims in claims()) {
        let ledger = build_ledger(&content, &claims);
        let stored = ledger.entries();
        let verified = ledger.verified_against(&content, &StubRecovery);

        prop_assert!(verified.iter().all(|e| stored.contains(e)));
        prop_assert!(verified.windows(2).all(|w| w[0].account < w[1].account));
    }

    /// Property: Upsert dedups per account, last write wins
    #[test]
    fn upsert_last_write_wins(account in "0x[0-9a-fA-F]{4}", s1 in ".*", s2 in ".*") {
        let mut ledger = AttestationLedger::new();
        ledger.upsert(account.as_str(), s1);
        ledger.upsert(account.to_uppercase().replace("0X", "0x"), s2.clone());

        prop_assert_eq!(ledger.len(), 1);
        prop_assert_eq!(ledger.get(&AccountId::new(&account)), Some(s2.as_str()));
    }

    /// Property: Bundle export then import returns (content, verified entries)
    #[test]
    fn bundle_roundtrip_yields_verified_entries(content in ".{0,40}", claims in claims()) {
        let ledger = build_ledger(&content, &claims);
        let verified = ledger.verified_against(&content, &StubRecovery);

        let json = ledger.to_bundle(&content, &StubRecovery).to_json_pretty().unwrap();
        let parsed = Bundle::from_slice(json.as_bytes()).unwrap();

        prop_assert_eq!(AttestationLedger::from_bundle(parsed), (content, verified));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Property: Real personal_sign signatures verify only for the exact content
    #[test]
    fn personal_sign_binds_exact_content(content in ".{0,64}", suffix in ".{1,8}") {
        let wallet = LocalWallet::random();
        let mut ledger = AttestationLedger::new();
        ledger.upsert(wallet.address(), wallet.sign_message(&content).unwrap());

        let verified = ledger.verified_against(&content, &PersonalSignRecovery);
        prop_assert_eq!(
            verified,
            vec![AttestationEntry::new(wallet.address(), wallet.sign_message(&content).unwrap())]
        );

        let edited = format!("{content}{suffix}");
        prop_assume!(crate::crypto::hash_message(&edited) != crate::crypto::hash_message(&content));
        prop_assert!(ledger.verified_against(&edited, &PersonalSignRecovery).is_empty());
    }
}
