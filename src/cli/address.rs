use super::key::load_wallet;

/// Print the account a key signs for
pub fn execute(key_file: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let wallet = load_wallet(key_file)?;
    let account = wallet.address();

    match account.to_checksum() {
        Some(checksum) => println!("{}", checksum),
        None => println!("{}", account),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::key::save_key_to_file;
    use tempfile::TempDir;

    #[test]
    fn test_address_from_key_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("signer.key");
        save_key_to_file(&format!("{:0>64}", "2"), &path).unwrap();

        assert!(execute(Some(path.to_string_lossy().to_string())).is_ok());
    }

    #[test]
    fn test_address_missing_key_file() {
        let result = execute(Some("/nonexistent/signer.key".to_string()));
        assert!(result.is_err());
    }
}
