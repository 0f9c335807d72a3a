// Integration tests for CLI commands
// These run the real binary against temp directories: key generation,
// signing, co-signing, verification and config handling.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn attest(config_dir: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_attest"));
    command
        .arg("--config")
        .arg(config_dir.join("config.toml"))
        .env_remove("ATTEST_PRIVATE_KEY")
        .env_remove("RUST_LOG");
    command
}

fn run(command: &mut Command) -> Output {
    command.output().expect("Failed to execute command")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn keygen(dir: &TempDir, name: &str) -> String {
    let path = dir.path().join(name);
    let output = run(attest(dir.path()).arg("keygen").arg("--out").arg(&path));
    assert!(output.status.success(), "keygen failed: {}", stderr(&output));
    path.to_string_lossy().to_string()
}

fn address(dir: &TempDir, key: &str) -> String {
    let output = run(attest(dir.path()).arg("address").arg("--key-file").arg(key));
    assert!(output.status.success());
    stdout(&output).trim().to_string()
}

#[test]
fn test_cli_help() {
    let dir = TempDir::new().unwrap();
    let output = run(attest(dir.path()).arg("--help"));

    assert!(output.status.success());
    let stdout = stdout(&output);
    for command in ["keygen", "address", "sign", "verify", "session", "config", "version"] {
        assert!(stdout.contains(command), "help is missing {}", command);
    }
}

#[test]
fn test_cli_version() {
    let dir = TempDir::new().unwrap();
    let output = run(attest(dir.path()).arg("version"));

    assert!(output.status.success());
    assert!(stdout(&output).contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_address_is_checksummed() {
    let dir = TempDir::new().unwrap();
    let key = dir.path().join("one.key");
    fs::write(&key, format!("0x{:0>64}\n", "1")).unwrap();

    let output = run(attest(dir.path()).arg("address").arg("--key-file").arg(&key));

    assert!(output.status.success());
    assert_eq!(
        stdout(&output).trim(),
        "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf"
    );
}

#[test]
fn test_cli_sign_cosign_verify() {
    let dir = TempDir::new().unwrap();
    let alice = keygen(&dir, "alice.key");
    let bob = keygen(&dir, "bob.key");
    let bundle = dir.path().join("attest.json");

    let output = run(attest(dir.path())
        .arg("sign")
        .arg("--content")
        .arg("We agree.")
        .arg("--key-file")
        .arg(&alice)
        .arg("--out")
        .arg(&bundle));
    assert!(output.status.success(), "sign failed: {}", stderr(&output));

    let output = run(attest(dir.path())
        .arg("sign")
        .arg("--bundle")
        .arg(&bundle)
        .arg("--key-file")
        .arg(&bob)
        .arg("--out")
        .arg(&bundle));
    assert!(output.status.success(), "co-sign failed: {}", stderr(&output));

    let json: serde_json::Value = serde_json::from_slice(&fs::read(&bundle).unwrap()).unwrap();
    assert_eq!(json["content"], "We agree.");
    assert_eq!(json["version"], 1);
    assert_eq!(json["attestations"].as_array().unwrap().len(), 2);

    let output = run(attest(dir.path()).arg("verify").arg(&bundle));
    assert!(output.status.success(), "verify failed: {}", stderr(&output));
    let report = stdout(&output);
    assert!(report.contains(&address(&dir, &alice)));
    assert!(report.contains(&address(&dir, &bob)));
    assert!(report.contains("2 verified, 0 rejected"));
}

#[test]
fn test_cli_verify_detects_tampered_content() {
    let dir = TempDir::new().unwrap();
    let key = keygen(&dir, "signer.key");
    let bundle = dir.path().join("attest.json");

    let output = run(attest(dir.path())
        .arg("sign")
        .arg("--content")
        .arg("Pay 10")
        .arg("--key-file")
        .arg(&key)
        .arg("--out")
        .arg(&bundle));
    assert!(output.status.success());

    let mut json: serde_json::Value =
        serde_json::from_slice(&fs::read(&bundle).unwrap()).unwrap();
    json["content"] = "Pay 1000".into();
    fs::write(&bundle, serde_json::to_vec(&json).unwrap()).unwrap();

    let output = run(attest(dir.path()).arg("verify").arg("--json").arg(&bundle));
    assert!(!output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["verified"].as_array().unwrap().len(), 0);
    assert_eq!(report["rejected"].as_array().unwrap().len(), 1);
    assert!(stderr(&output).contains("did not verify"));
}

#[test]
fn test_cli_verify_names_bad_field() {
    let dir = TempDir::new().unwrap();
    let bundle = dir.path().join("attest.json");
    fs::write(&bundle, r#"{"content": "x", "attestations": [{"account": 7}]}"#).unwrap();

    let output = run(attest(dir.path()).arg("verify").arg(&bundle));

    assert!(!output.status.success());
    assert!(stderr(&output).contains("attestations[0].account"));
}

#[test]
fn test_cli_sign_requires_statement() {
    let dir = TempDir::new().unwrap();
    let key = keygen(&dir, "signer.key");

    let output = run(attest(dir.path()).arg("sign").arg("--key-file").arg(&key));

    assert!(!output.status.success());
    assert!(stderr(&output).contains("Nothing to sign"));
}

#[test]
fn test_cli_keygen_refuses_overwrite() {
    let dir = TempDir::new().unwrap();
    let key = keygen(&dir, "signer.key");

    let output = run(attest(dir.path()).arg("keygen").arg("--out").arg(&key));

    assert!(!output.status.success());
    assert!(stderr(&output).contains("already exists"));
}

#[test]
fn test_cli_config_init_and_show() {
    let dir = TempDir::new().unwrap();

    let output = run(attest(dir.path()).arg("config").arg("init"));
    assert!(output.status.success());
    assert!(dir.path().join("config.toml").exists());

    let output = run(attest(dir.path()).arg("config").arg("show"));
    assert!(output.status.success());
    assert!(stdout(&output).contains("debounce = \"2s\""));

    let output = run(attest(dir.path()).arg("config").arg("init"));
    assert!(!output.status.success());
}

#[test]
fn test_cli_export_directory_from_config() {
    let dir = TempDir::new().unwrap();
    let key = keygen(&dir, "signer.key");
    let export_dir = dir.path().join("bundles");
    fs::write(
        dir.path().join("config.toml"),
        format!("[export]\ndirectory = {:?}\n", export_dir.to_string_lossy()),
    )
    .unwrap();

    let output = run(attest(dir.path())
        .arg("sign")
        .arg("--content")
        .arg("hello")
        .arg("--key-file")
        .arg(&key));

    assert!(output.status.success(), "sign failed: {}", stderr(&output));
    assert!(export_dir.join("attest.json").exists());
}
