use attest::attestation::{AttestationLedger, VerificationReport};
use attest::crypto::PersonalSignRecovery;
use attest::serialization::Bundle;
use serde_json::json;
use std::fs;

/// Verify every attestation in a bundle file against its statement.
///
/// Fails when the bundle cannot be parsed or any attestation is rejected.
pub fn execute(bundle: String, as_json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let bytes =
        fs::read(&bundle).map_err(|e| format!("Failed to read bundle '{}': {}", bundle, e))?;
    let parsed = Bundle::from_slice(&bytes).map_err(|e| format!("Invalid bundle: {}", e))?;

    let ledger: AttestationLedger = parsed.attestations().iter().cloned().collect();
    let report = ledger.verify_report(parsed.content(), &PersonalSignRecovery);

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report_json(&parsed, &report))?);
    } else {
        print_report(&parsed, &report);
    }

    if report.all_verified() {
        Ok(())
    } else {
        Err(format!(
            "{} of {} attestation(s) did not verify",
            report.rejected.len(),
            ledger.len()
        )
        .into())
    }
}

fn print_report(bundle: &Bundle, report: &VerificationReport) {
    println!("🔍 Verifying attestations");
    println!();
    println!("  Statement: {:?}", bundle.content());
    println!();

    if report.verified.is_empty() && report.rejected.is_empty() {
        println!("  (no attestations)");
    }
    for entry in &report.verified {
        println!(
            "  ✅ {}",
            entry
                .account
                .to_checksum()
                .unwrap_or_else(|| entry.account.to_string())
        );
    }
    for rejection in &report.rejected {
        println!("  ❌ {} ({})", rejection.account, rejection.reason);
    }

    println!();
    println!(
        "  {} verified, {} rejected",
        report.verified.len(),
        report.rejected.len()
    );
}

fn report_json(bundle: &Bundle, report: &VerificationReport) -> serde_json::Value {
    json!({
        "content": bundle.content(),
        "verified": report.verified,
        "rejected": report
            .rejected
            .iter()
            .map(|rejection| json!({
                "account": rejection.account,
                "reason": rejection.reason.to_string(),
            }))
            .collect::<Vec<_>>(),
    })
}
