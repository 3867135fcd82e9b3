//! Configuration for the Junos client
//!
//! Handles loading and merging configuration from multiple sources:
//! - Default values
//! - User configuration (~/.junos/config.toml)
//! - Project configuration (./junos.toml)
//! - The file named by `$JUNOS_CONFIG`
//! - Environment variables
//!
//! Later sources override earlier ones. An explicit path replaces the file
//! search entirely; environment overrides still apply on top of it.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[cfg(feature = "russh")]
use crate::transport::ssh::{Credentials, SshOptions};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Device connection settings
    pub device: DeviceConfig,

    /// Junos Space server, if one is used
    pub space: Option<SpaceConfig>,

    /// Logging settings
    pub logging: LoggingConfig,
}

/// NETCONF device settings
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Device hostname or address
    pub host: String,

    /// NETCONF port
    pub port: u16,

    /// Login user
    pub username: Option<String>,

    /// Login password
    pub password: Option<String>,

    /// Private key file, preferred over the password when both are set
    pub private_key: Option<PathBuf>,

    /// Passphrase for the private key
    pub passphrase: Option<String>,

    /// Accept hosts missing from known_hosts
    pub accept_unknown_hosts: bool,

    /// TCP and SSH handshake timeout
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// Pause after lock, commit and unlock
    #[serde(with = "humantime_serde")]
    pub commit_timeout: Option<Duration>,

    /// Deadline for a single RPC; none waits forever
    #[serde(with = "humantime_serde")]
    pub rpc_timeout: Option<Duration>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: crate::transport::netconf::DEFAULT_PORT,
            username: None,
            password: None,
            private_key: None,
            passphrase: None,
            accept_unknown_hosts: true,
            connect_timeout: Duration::from_secs(30),
            commit_timeout: None,
            rpc_timeout: None,
        }
    }
}

impl fmt::Debug for DeviceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("private_key", &self.private_key)
            .field("accept_unknown_hosts", &self.accept_unknown_hosts)
            .field("connect_timeout", &self.connect_timeout)
            .field("commit_timeout", &self.commit_timeout)
            .field("rpc_timeout", &self.rpc_timeout)
            .finish()
    }
}

#[cfg(feature = "russh")]
impl DeviceConfig {
    /// SSH credentials; a private key wins over a password.
    pub fn credentials(&self) -> crate::error::Result<Credentials> {
        let username = self
            .username
            .clone()
            .ok_or_else(|| crate::error::Error::Config("device username is not set".to_string()))?;

        match (&self.private_key, &self.password) {
            (Some(key), _) => {
                let credentials = Credentials::private_key(username, key.clone());
                Ok(match &self.passphrase {
                    Some(passphrase) => credentials.with_passphrase(passphrase.clone()),
                    None => credentials,
                })
            }
            (None, Some(password)) => Ok(Credentials::password(username, password.clone())),
            (None, None) => Err(crate::error::Error::Config(
                "device needs a password or a private key".to_string(),
            )),
        }
    }

    pub fn ssh_options(&self) -> SshOptions {
        SshOptions {
            port: self.port,
            connect_timeout: self.connect_timeout,
            rpc_timeout: self.rpc_timeout,
            accept_unknown_hosts: self.accept_unknown_hosts,
        }
    }
}

/// Junos Space server settings
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpaceConfig {
    /// Server hostname
    pub host: String,

    /// API user
    pub username: String,

    /// API password
    pub password: String,

    /// Skip TLS certificate verification (self-signed lab servers)
    pub accept_invalid_certs: bool,
}

impl fmt::Debug for SpaceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpaceConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .finish()
    }
}

/// Log level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("Unknown log level: {}", s)),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, human friendly
    Pretty,
    /// One line per event
    #[default]
    Compact,
    /// Newline-delimited JSON
    Json,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is unset
    pub level: LogLevel,

    /// Output format
    pub format: LogFormat,

    /// Filter directive overriding `level` (e.g. `junos=debug`)
    pub filter: Option<String>,

    /// ANSI colors
    pub ansi_colors: bool,

    /// Include the event target
    pub with_target: bool,

    /// Log span open/close events
    pub with_spans: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            filter: None,
            ansi_colors: true,
            with_target: true,
            with_spans: false,
        }
    }
}

impl Config {
    /// Load configuration from all sources
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Config::default();

        for path in Self::get_config_paths(config_path) {
            if path.exists() {
                config = config.merge_from_file(&path)?;
            }
        }

        config.apply_env_overrides()?;

        Ok(config)
    }

    /// Get the list of configuration file paths to check, lowest priority first
    fn get_config_paths(explicit_path: Option<&PathBuf>) -> Vec<PathBuf> {
        if let Some(path) = explicit_path {
            return vec![path.clone()];
        }

        let mut paths = Vec::new();

        // User config
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".junos/config.toml"));
        }

        // Project config (current directory)
        paths.push(PathBuf::from("junos.toml"));

        // Environment variable
        if let Ok(env_config) = std::env::var("JUNOS_CONFIG") {
            paths.push(PathBuf::from(env_config));
        }

        paths
    }

    /// Merge configuration from a file
    fn merge_from_file(&self, path: &Path) -> Result<Self> {
        let file_config = Self::parse_file(path)?;
        Ok(self.merge(file_config))
    }

    fn parse_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        // Determine format based on extension
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let config = match extension {
            "yml" | "yaml" => serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
            "json" => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
            "toml" => toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
            _ => {
                // Try TOML first, then YAML
                toml::from_str(&content)
                    .or_else(|_| serde_yaml::from_str(&content))
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))?
            }
        };
        Ok(config)
    }

    /// Merge another config into this one; set values in `other` win
    fn merge(&self, other: Config) -> Config {
        let defaults = DeviceConfig::default();
        let base = &self.device;
        let device = DeviceConfig {
            host: if other.device.host.is_empty() {
                base.host.clone()
            } else {
                other.device.host
            },
            port: if other.device.port != defaults.port {
                other.device.port
            } else {
                base.port
            },
            username: other.device.username.or_else(|| base.username.clone()),
            password: other.device.password.or_else(|| base.password.clone()),
            private_key: other.device.private_key.or_else(|| base.private_key.clone()),
            passphrase: other.device.passphrase.or_else(|| base.passphrase.clone()),
            accept_unknown_hosts: other.device.accept_unknown_hosts,
            connect_timeout: if other.device.connect_timeout != defaults.connect_timeout {
                other.device.connect_timeout
            } else {
                base.connect_timeout
            },
            commit_timeout: other.device.commit_timeout.or(base.commit_timeout),
            rpc_timeout: other.device.rpc_timeout.or(base.rpc_timeout),
        };

        Config {
            device,
            space: other.space.or_else(|| self.space.clone()),
            logging: other.logging,
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var("JUNOS_HOST") {
            self.device.host = host;
        }

        if let Ok(port) = std::env::var("JUNOS_PORT") {
            self.device.port = port
                .parse()
                .with_context(|| format!("JUNOS_PORT is not a port number: {}", port))?;
        }

        if let Ok(user) = std::env::var("JUNOS_USER") {
            self.device.username = Some(user);
        }

        if let Ok(password) = std::env::var("JUNOS_PASSWORD") {
            self.device.password = Some(password);
        }

        if let Ok(key) = std::env::var("JUNOS_PRIVATE_KEY") {
            self.device.private_key = Some(PathBuf::from(key));
        }

        if let Ok(timeout) = std::env::var("JUNOS_COMMIT_TIMEOUT") {
            let timeout = humantime_serde::re::humantime::parse_duration(&timeout)
                .with_context(|| format!("JUNOS_COMMIT_TIMEOUT is not a duration: {}", timeout))?;
            self.device.commit_timeout = Some(timeout);
        }

        let space_host = std::env::var("JUNOS_SPACE_HOST").ok();
        let space_user = std::env::var("JUNOS_SPACE_USER").ok();
        let space_password = std::env::var("JUNOS_SPACE_PASSWORD").ok();
        if space_host.is_some() || space_user.is_some() || space_password.is_some() {
            let space = self.space.get_or_insert_with(SpaceConfig::default);
            if let Some(host) = space_host {
                space.host = host;
            }
            if let Some(user) = space_user {
                space.username = user;
            }
            if let Some(password) = space_password {
                space.password = password;
            }
        }

        if let Ok(level) = std::env::var("JUNOS_LOG_LEVEL") {
            self.logging.level = level.parse().map_err(anyhow::Error::msg)?;
        }

        Ok(())
    }

    /// Load from a specific file without environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Config::default().merge_from_file(path.as_ref())
    }
}
