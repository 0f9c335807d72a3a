use clap::{Parser, Subcommand};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

pub mod address;
pub mod config;
pub mod key;
pub mod keygen;
pub mod session;
pub mod sign;
pub mod verify;
pub mod version;

use config::{AttestConfig, LoggingConfig};

#[derive(Parser)]
#[command(name = "attest")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Sign statements with Ethereum accounts and verify attestation bundles", long_about = None)]
pub struct Cli {
    /// Path to config file (default: ~/.config/attest/config.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a new signing key
    Keygen {
        /// Where to write the hex private key (created with mode 0600)
        #[arg(long)]
        out: String,

        /// Overwrite an existing key file
        #[arg(long)]
        force: bool,
    },

    /// Print the account for a key
    Address {
        /// Path to file containing the hex private key
        #[arg(long)]
        key_file: Option<String>,
    },

    /// Sign a statement, or co-sign an existing bundle, and write attest.json
    Sign {
        /// Statement text
        #[arg(long)]
        content: Option<String>,

        /// Read the statement from a file
        #[arg(long)]
        content_file: Option<String>,

        /// Co-sign the statement of an existing bundle
        #[arg(long)]
        bundle: Option<String>,

        /// Path to file containing the hex private key
        #[arg(long)]
        key_file: Option<String>,

        /// Output path (default: attest.json in the export directory)
        #[arg(long)]
        out: Option<String>,
    },

    /// Verify every attestation in a bundle
    Verify {
        /// Bundle file to check
        bundle: String,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Edit a statement interactively and collect signatures
    Session {
        /// Start from an existing bundle
        #[arg(long)]
        bundle: Option<String>,

        /// Path to file containing the hex private key
        #[arg(long)]
        key_file: Option<String>,

        /// Settle window override, e.g. "500ms"
        #[arg(long)]
        debounce: Option<String>,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Display version information
    Version,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Write a commented default configuration
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

pub async fn execute(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = cli
        .config
        .map(PathBuf::from)
        .unwrap_or_else(config::default_config_path);

    // `config init` must work even when the existing file is broken
    if let Commands::Config {
        action: ConfigAction::Init { force },
    } = cli.command
    {
        AttestConfig::create_default(&config_path, force)?;
        println!("✅ Wrote {}", config_path.display());
        return Ok(());
    }

    let config = AttestConfig::load_or_default(&config_path)?;
    init_logging(&config.logging)?;

    match cli.command {
        Commands::Keygen { out, force } => keygen::execute(out, force),
        Commands::Address { key_file } => address::execute(key_file),
        Commands::Sign {
            content,
            content_file,
            bundle,
            key_file,
            out,
        } => {
            let input = sign::StatementInput::from_args(content, content_file, bundle)?;
            sign::execute(input, key_file, out, &config.export).await
        }
        Commands::Verify { bundle, json } => verify::execute(bundle, json),
        Commands::Session {
            bundle,
            key_file,
            debounce,
        } => {
            let window = match debounce {
                Some(value) => config::parse_duration(&value)?,
                None => config.statement.window()?,
            };
            session::execute(bundle, key_file, window, config.export).await
        }
        Commands::Config {
            action: ConfigAction::Show,
        } => {
            println!("# {}", config_path.display());
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
        Commands::Config {
            action: ConfigAction::Init { .. },
        } => Ok(()),
        Commands::Version => {
            version::execute();
            Ok(())
        }
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level. Logs go to stderr unless a
/// file is configured, so stdout stays clean for command output.
fn init_logging(logging: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .map_err(|e| format!("Invalid log level '{}': {}", logging.level, e))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| format!("Failed to open log file '{}': {}", path.display(), e))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .map_err(|e| format!("Failed to initialize logging: {}", e))?;
        }
        None => {
            builder
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| format!("Failed to initialize logging: {}", e))?;
        }
    }

    Ok(())
}
