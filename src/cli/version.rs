/// Display version information
pub fn execute() {
    println!("attest {}", env!("CARGO_PKG_VERSION"));
    println!("Sign statements with Ethereum accounts and verify attestation bundles");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_execute() {
        execute();
    }
}
