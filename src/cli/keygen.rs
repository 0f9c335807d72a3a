use super::key::save_key_to_file;
use attest::crypto::LocalWallet;
use std::path::Path;

/// Generate a fresh secp256k1 key and write it to `out`
pub fn execute(out: String, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(&out);
    if path.exists() && !force {
        return Err(format!(
            "Key file already exists: {} (use --force to overwrite)",
            path.display()
        )
        .into());
    }

    let wallet = LocalWallet::random();
    save_key_to_file(&wallet.to_hex(), path)?;

    let account = wallet.address();
    println!("🔑 New key written to {}", path.display());
    println!(
        "   Account: {}",
        account.to_checksum().unwrap_or_else(|| account.to_string())
    );
    println!();
    println!("⚠️  Anyone holding this file can sign as this account. Back it up privately.");

    Ok(())
}
