//! Attest configuration file handling
//!
//! Configuration is TOML and lives under the platform config directory
//! (`~/.config/attest/config.toml` on Linux). Every section is optional; a
//! missing file means defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default log level
const DEFAULT_LOG_LEVEL: &str = "info";

/// Default settle window, in humantime notation
const DEFAULT_DEBOUNCE: &str = "2s";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to write config file '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("config file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("invalid debounce '{value}': {source}")]
    InvalidDuration {
        value: String,
        source: humantime::DurationError,
    },
}

/// Attest CLI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttestConfig {
    /// Statement editing behaviour
    #[serde(default)]
    pub statement: StatementConfig,

    /// Where bundles are written
    #[serde(default)]
    pub export: ExportConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementConfig {
    /// Quiet period after the last edit before verification runs
    #[serde(default = "default_debounce")]
    pub debounce: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory for `attest.json` when no explicit output is given
    pub directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

fn default_debounce() -> String {
    DEFAULT_DEBOUNCE.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for StatementConfig {
    fn default() -> Self {
        Self {
            debounce: default_debounce(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl StatementConfig {
    /// Parsed settle window
    pub fn window(&self) -> Result<Duration, ConfigError> {
        parse_duration(&self.debounce)
    }
}

impl ExportConfig {
    /// Output path for a bundle named `file_name`
    pub fn output_path(&self, file_name: &str) -> PathBuf {
        match &self.directory {
            Some(dir) => dir.join(file_name),
            None => PathBuf::from(file_name),
        }
    }
}

/// Parse a humantime duration such as `2s` or `750ms`
pub fn parse_duration(value: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(value.trim()).map_err(|source| ConfigError::InvalidDuration {
        value: value.to_string(),
        source,
    })
}

impl AttestConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: AttestConfig = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        // Reject a bad debounce at load time rather than mid-session
        config.statement.window()?;

        Ok(config)
    }

    /// Load `path` if it exists, defaults otherwise
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Render the effective configuration as TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Generate default configuration content as a string with comments
    pub fn generate_default_toml() -> String {
        format!(
            r#"# Attest configuration
#
# Every section is optional. Remove a key to fall back to its default.

[statement]
# Quiet period after the last edit before signatures are re-verified
# (humantime notation: "2s", "750ms", "1m")
debounce = "{debounce}"

[export]
# Directory for attest.json when no --out is given
# Defaults to the current directory
# directory = "/home/user/attestations"

[logging]
# Log level: trace, debug, info, warn, error
# RUST_LOG overrides this when set
level = "{level}"

# Log file path (optional, logs to stderr if not specified)
# file = "/tmp/attest.log"
"#,
            debounce = DEFAULT_DEBOUNCE,
            level = DEFAULT_LOG_LEVEL,
        )
    }

    /// Create and save a default configuration file
    pub fn create_default(config_path: &Path, force: bool) -> Result<(), ConfigError> {
        if config_path.exists() && !force {
            return Err(ConfigError::AlreadyExists(config_path.to_path_buf()));
        }
        write_file(config_path, &Self::generate_default_toml())
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), ConfigError> {
    let write_error = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
    }

    fs::write(path, contents).map_err(write_error)
}

/// Get the default config file path
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("attest")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AttestConfig::default();

        assert_eq!(config.statement.window().unwrap(), Duration::from_secs(2));
        assert!(config.export.directory.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_shown_config_loads_back() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let mut config = AttestConfig::default();
        config.statement.debounce = "500ms".to_string();
        config.export.directory = Some(temp_dir.path().join("out"));
        fs::write(&config_path, config.to_toml_string().unwrap()).unwrap();

        let loaded = AttestConfig::load(&config_path).unwrap();
        assert_eq!(
            loaded.statement.window().unwrap(),
            Duration::from_millis(500)
        );
        assert_eq!(loaded.export.directory, Some(temp_dir.path().join("out")));
    }

    #[test]
    fn test_create_default_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        AttestConfig::create_default(&config_path, false).unwrap();
        assert!(config_path.exists());

        let config = AttestConfig::load(&config_path).unwrap();
        assert_eq!(config.statement.debounce, "2s");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_create_default_refuses_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "[logging]\nlevel = \"debug\"\n").unwrap();

        let err = AttestConfig::create_default(&config_path, false).unwrap_err();
        assert!(matches!(err, ConfigError::AlreadyExists(_)));

        AttestConfig::create_default(&config_path, true).unwrap();
        let config = AttestConfig::load(&config_path).unwrap();
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_config_with_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "[export]\ndirectory = \"/tmp/out\"\n").unwrap();

        let config = AttestConfig::load(&config_path).unwrap();

        assert_eq!(config.statement.debounce, "2s");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.export.directory, Some(PathBuf::from("/tmp/out")));
    }

    #[test]
    fn test_load_rejects_bad_debounce() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "[statement]\ndebounce = \"soon\"\n").unwrap();

        let err = AttestConfig::load(&config_path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDuration { .. }));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let config = AttestConfig::load_or_default(&temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.statement.debounce, "2s");
    }

    #[test]
    fn test_output_path() {
        let export = ExportConfig::default();
        assert_eq!(export.output_path("attest.json"), PathBuf::from("attest.json"));

        let export = ExportConfig {
            directory: Some(PathBuf::from("/data")),
        };
        assert_eq!(
            export.output_path("attest.json"),
            PathBuf::from("/data/attest.json")
        );
    }

    #[test]
    fn test_default_config_path() {
        let path = default_config_path();
        assert!(path.ends_with("attest/config.toml"));
    }

    #[test]
    fn test_generate_default_toml_parses() {
        let toml = AttestConfig::generate_default_toml();
        assert!(toml.contains("debounce = \"2s\""));

        let config: AttestConfig = toml::from_str(&toml).unwrap();
        assert_eq!(config.logging.level, "info");
    }
}
