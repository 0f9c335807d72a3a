//! Interactive statement session
//!
//! Reads lines from stdin and drives a running pipeline. Plain lines replace
//! the statement; lines starting with `:` are session commands. Updates from
//! the pipeline are printed as they arrive.

use super::config::ExportConfig;
use super::key::{load_wallet, KEY_ENV_VAR};
use attest::account::AccountId;
use attest::crypto::PersonalSignRecovery;
use attest::pipeline::{self, Command, Coordinator, Update};
use futures::StreamExt;
use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

const HELP: &str = "\
Commands:
  <text>                    replace the statement with <text>
  :set <text>               same, allows text starting with ':'
  :sign                     sign the statement with the loaded key
  :add <account> <sig>      add a signature collected elsewhere
  :load <path>              import a bundle
  :save [path]              export verified attestations
  :disconnect               drop the signer; pending signatures are discarded
  :show                     print the last verified set
  :help                     this text
  :quit                     leave the session";

/// One parsed input line
#[derive(Debug)]
pub enum Input {
    Send(Command),
    Load(PathBuf),
    Save(Option<PathBuf>),
    Show,
    Help,
    Quit,
}

/// Parse one line of session input
pub fn parse_line(line: &str) -> Result<Input, String> {
    let Some(rest) = line.strip_prefix(':') else {
        return Ok(Input::Send(Command::ContentChanged(line.to_string())));
    };

    let (name, args) = match rest.split_once(' ') {
        Some((name, args)) => (name, args),
        None => (rest, ""),
    };

    match name {
        "set" => Ok(Input::Send(Command::ContentChanged(args.to_string()))),
        "sign" => Ok(Input::Send(Command::SignRequested)),
        "add" => {
            let mut parts = args.split_whitespace();
            match (parts.next(), parts.next(), parts.next()) {
                (Some(account), Some(signature), None) => {
                    Ok(Input::Send(Command::SignatureSubmitted {
                        account: AccountId::new(account),
                        signature: signature.to_string(),
                    }))
                }
                _ => Err("usage: :add <account> <signature>".to_string()),
            }
        }
        "load" => match args.trim() {
            "" => Err("usage: :load <path>".to_string()),
            path => Ok(Input::Load(PathBuf::from(path))),
        },
        "save" => match args.trim() {
            "" => Ok(Input::Save(None)),
            path => Ok(Input::Save(Some(PathBuf::from(path)))),
        },
        "disconnect" => Ok(Input::Send(Command::Disconnect)),
        "show" => Ok(Input::Show),
        "help" => Ok(Input::Help),
        "quit" | "q" => Ok(Input::Quit),
        other => Err(format!("unknown command ':{}' (try :help)", other)),
    }
}

/// Prints updates and remembers what the user may ask for again
struct SessionView {
    export: ExportConfig,
    pending_saves: VecDeque<Option<PathBuf>>,
    last_verified: Option<Update>,
}

impl SessionView {
    fn new(export: ExportConfig) -> Self {
        Self {
            export,
            pending_saves: VecDeque::new(),
            last_verified: None,
        }
    }

    fn show(&self) {
        match &self.last_verified {
            Some(Update::StableVerifiedSet { revision, entries }) => {
                println!("Verified at {}: {} attestation(s)", revision, entries.len());
                for entry in entries {
                    println!("  ✅ {}", entry.account);
                }
            }
            _ => println!("No verified set yet"),
        }
    }

    fn apply(&mut self, update: Update) {
        match update {
            Update::VerificationPending { revision } => {
                println!("⏳ {} waiting to settle", revision);
            }
            Update::StableVerifiedSet { .. } => {
                self.last_verified = Some(update);
                self.show();
            }
            Update::SerializedBundle(bundle) => {
                let path = self
                    .pending_saves
                    .pop_front()
                    .flatten()
                    .unwrap_or_else(|| self.export.output_path(&bundle.file_name));
                match fs::write(&path, &bundle.json) {
                    Ok(()) => println!("💾 Saved {}", path.display()),
                    Err(e) => println!("❌ Failed to write '{}': {}", path.display(), e),
                }
            }
            Update::FormatError(e) => println!("❌ Invalid bundle: {}", e),
            Update::SigningFailed(e) => println!("❌ Signing failed: {}", e),
            Update::SignatureDiscarded { revision } => {
                println!("⚠️  Signature for {} discarded: statement changed", revision);
            }
        }
    }
}

/// Run an interactive session until `:quit` or end of input
pub async fn execute(
    bundle: Option<String>,
    key_file: Option<String>,
    window: Duration,
    export: ExportConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut coordinator = Coordinator::with_window("", PersonalSignRecovery, window);

    if let Some(path) = bundle {
        let bytes =
            fs::read(&path).map_err(|e| format!("Failed to read bundle '{}': {}", path, e))?;
        coordinator
            .load_bundle(&bytes)
            .map_err(|e| format!("Invalid bundle '{}': {}", path, e))?;
    }

    // The stdin prompt would fight the session for input, so only file/env keys
    if key_file.is_some() || std::env::var(KEY_ENV_VAR).is_ok() {
        let wallet = load_wallet(key_file)?;
        println!("🔑 Signing as {}", wallet.address());
        coordinator.connect(Arc::new(wallet));
    }

    println!("Statement: {:?}", coordinator.content());
    println!("Type :help for commands");

    let handle = pipeline::spawn(coordinator);
    let commands = handle.commands;
    let mut updates = handle.updates;
    let mut view = SessionView::new(export);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_line(&line) {
                    Ok(Input::Send(command)) => {
                        debug!(?command, "session command");
                        commands.send(command).await?;
                    }
                    Ok(Input::Load(path)) => match fs::read(&path) {
                        Ok(bytes) => commands.send(Command::BundleLoaded(bytes)).await?,
                        Err(e) => println!("❌ Failed to read '{}': {}", path.display(), e),
                    },
                    Ok(Input::Save(path)) => {
                        view.pending_saves.push_back(path);
                        commands.send(Command::BundleExportRequested).await?;
                    }
                    Ok(Input::Show) => view.show(),
                    Ok(Input::Help) => println!("{}", HELP),
                    Ok(Input::Quit) => break,
                    Err(e) => println!("{}", e),
                }
            }
            Some(update) = updates.next() => view.apply(update),
        }
    }

    // Closing the channel stops the pipeline; flush what it already produced
    drop(commands);
    while let Some(update) = updates.next().await {
        view.apply(update);
    }
    handle.task.await?;

    Ok(())
}
