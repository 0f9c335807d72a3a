use super::config::ExportConfig;
use super::key::load_wallet;
use attest::crypto::PersonalSignRecovery;
use attest::pipeline::{Coordinator, SignOutcome};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// Where the statement to sign comes from
#[derive(Debug)]
pub enum StatementInput {
    Text(String),
    File(String),
    /// Co-sign the statement of an existing bundle
    Bundle(String),
}

impl StatementInput {
    pub fn from_args(
        content: Option<String>,
        content_file: Option<String>,
        bundle: Option<String>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        match (content, content_file, bundle) {
            (Some(text), None, None) => Ok(Self::Text(text)),
            (None, Some(path), None) => Ok(Self::File(path)),
            (None, None, Some(path)) => Ok(Self::Bundle(path)),
            (None, None, None) => {
                Err("Nothing to sign: pass --content, --content-file or --bundle".into())
            }
            _ => Err("--content, --content-file and --bundle are mutually exclusive".into()),
        }
    }
}

/// Sign a statement with a local key and write the resulting bundle.
///
/// With `--bundle`, existing attestations are re-verified and kept; the new
/// signature replaces any previous one from the same account.
pub async fn execute(
    input: StatementInput,
    key_file: Option<String>,
    out: Option<String>,
    export: &ExportConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut coordinator = Coordinator::new("", PersonalSignRecovery);

    match input {
        StatementInput::Text(text) => {
            coordinator.content_changed(text);
        }
        StatementInput::File(path) => {
            let text = fs::read_to_string(&path)
                .map_err(|e| format!("Failed to read statement file '{}': {}", path, e))?;
            coordinator.content_changed(text.trim_end_matches(['\r', '\n']));
        }
        StatementInput::Bundle(path) => {
            let bytes =
                fs::read(&path).map_err(|e| format!("Failed to read bundle '{}': {}", path, e))?;
            coordinator
                .load_bundle(&bytes)
                .map_err(|e| format!("Invalid bundle '{}': {}", path, e))?;
        }
    }

    let wallet = load_wallet(key_file)?;
    let account = wallet.address();
    coordinator.connect(Arc::new(wallet));

    let request = coordinator.begin_sign()?;
    let completion = request.execute().await;
    match coordinator.complete_sign(completion)? {
        SignOutcome::Applied { .. } => {}
        SignOutcome::Discarded { revision } => {
            return Err(format!("Signature for {} was discarded", revision).into());
        }
    }

    let exported = coordinator.export_bundle()?;
    let path = match out {
        Some(out) => PathBuf::from(out),
        None => export.output_path(&exported.file_name),
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create output directory: {}", e))?;
        }
    }
    fs::write(&path, &exported.json)
        .map_err(|e| format!("Failed to write bundle '{}': {}", path.display(), e))?;

    let verified = coordinator.ledger().verified_against(
        coordinator.content(),
        &PersonalSignRecovery,
    );
    println!(
        "✍️  Signed as {}",
        account.to_checksum().unwrap_or_else(|| account.to_string())
    );
    println!(
        "✅ Wrote {} with {} verified attestation(s)",
        path.display(),
        verified.len()
    );
    let dropped = coordinator.ledger().len() - verified.len();
    if dropped > 0 {
        println!("⚠️  Dropped {} attestation(s) that did not verify", dropped);
    }

    Ok(())
}
