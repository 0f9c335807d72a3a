use attest::crypto::LocalWallet;
use std::fs;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use zeroize::Zeroizing;

/// Env var holding a hex private key (fallback, warned as insecure)
pub const KEY_ENV_VAR: &str = "ATTEST_PRIVATE_KEY";

/// Modes for private key delivery, checked in order
#[derive(Debug)]
pub enum KeySource {
    /// From --key-file /path/to/key
    File(String),
    /// From ATTEST_PRIVATE_KEY env var
    EnvVar,
    /// From stdin prompt (interactive, masked input)
    Stdin,
}

/// Determine key source from CLI arguments
///
/// 1. If key_file is Some, use File
/// 2. If ATTEST_PRIVATE_KEY is set, use EnvVar
/// 3. Otherwise, use Stdin
pub fn determine_key_source(key_file: Option<String>) -> KeySource {
    if let Some(file) = key_file {
        KeySource::File(file)
    } else if std::env::var(KEY_ENV_VAR).is_ok() {
        KeySource::EnvVar
    } else {
        KeySource::Stdin
    }
}

/// Read a hex private key from `source`
pub fn read_key(source: KeySource) -> Result<Zeroizing<String>, Box<dyn std::error::Error>> {
    let key = match source {
        KeySource::File(path) => {
            if !Path::new(&path).exists() {
                return Err(format!("Key file not found: {}", path).into());
            }

            let raw = Zeroizing::new(
                fs::read_to_string(&path).map_err(|e| format!("Failed to read key file: {}", e))?,
            );
            Zeroizing::new(raw.trim().to_string())
        }
        KeySource::EnvVar => {
            eprintln!("⚠️  WARNING: Using {} env var is insecure", KEY_ENV_VAR);
            eprintln!("   Consider using --key-file instead");
            eprintln!();

            let raw = Zeroizing::new(
                std::env::var(KEY_ENV_VAR)
                    .map_err(|_| format!("{} env var not set", KEY_ENV_VAR))?,
            );
            Zeroizing::new(raw.trim().to_string())
        }
        KeySource::Stdin => {
            let raw = Zeroizing::new(
                rpassword::prompt_password("Enter private key (hex): ")
                    .map_err(|e| format!("Failed to read private key from stdin: {}", e))?,
            );
            Zeroizing::new(raw.trim().to_string())
        }
    };

    if key.is_empty() {
        return Err("Private key is empty".into());
    }

    Ok(key)
}

/// Resolve the key source and build a wallet from it
pub fn load_wallet(key_file: Option<String>) -> Result<LocalWallet, Box<dyn std::error::Error>> {
    let key = read_key(determine_key_source(key_file))?;
    let wallet = LocalWallet::from_hex(&key).map_err(|e| format!("Invalid private key: {}", e))?;
    Ok(wallet)
}

/// Write a hex private key with owner-only permissions
pub fn save_key_to_file(key_hex: &str, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create key directory: {}", e))?;
        }
    }

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options
        .open(path)
        .map_err(|e| format!("Failed to create key file '{}': {}", path.display(), e))?;

    writeln!(file, "{}", key_hex)
        .map_err(|e| format!("Failed to write key to '{}': {}", path.display(), e))?;

    Ok(())
}
