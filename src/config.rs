//! Server configuration.
//!
//! The config file is line-oriented `key = value` text: blank lines and
//! `#` comments are skipped, whitespace around keys and values is trimmed.
//! All recognized keys are required when a file is given; without a file
//! the built-in defaults apply.

use std::collections::HashMap;
use std::path::Path;

use tracing::warn;

use crate::error::GarrisonError;

pub const DEFAULT_PORT: u16 = 4040;
pub const DEFAULT_MAX_USERS: usize = 2000;
pub const DEFAULT_MAX_CHANNELS: usize = 1000;
pub const DEFAULT_SERVER_NAME: &str = "Test-Server";
pub const DEFAULT_MOTD: &str = "Welcome to test Server!";
pub const DEFAULT_POOL_SIZE: usize = 10;

const MIN_PORT: u32 = 1024;
const MAX_PORT: u32 = 65535;
const MIN_USERS: usize = 1;
const MAX_USERS: usize = 10000;
const MAX_CHANNELS: usize = 1000;

/// Runtime settings for a [`Server`](crate::server::Server).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub max_users: usize,
    pub max_channels: usize,
    pub server_name: String,
    pub motd: String,
    /// Number of session workers. Not read from the config file.
    pub pool_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            max_users: DEFAULT_MAX_USERS,
            max_channels: DEFAULT_MAX_CHANNELS,
            server_name: DEFAULT_SERVER_NAME.to_string(),
            motd: DEFAULT_MOTD.to_string(),
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

impl ServerConfig {
    /// Load settings from a config file. Every recognized key must be
    /// present and parse; out-of-range values are rejected.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GarrisonError> {
        let entries = read_config(path.as_ref())?;

        let port = parse_number::<u32>(&entries, "port")?;
        if !(MIN_PORT..=MAX_PORT).contains(&port) {
            return Err(GarrisonError::Config("Invalid port number.".to_string()));
        }

        let max_users = parse_number::<usize>(&entries, "maxusers")?;
        if !(MIN_USERS..=MAX_USERS).contains(&max_users) {
            return Err(GarrisonError::Config("Invalid max users value".to_string()));
        }

        let max_channels = parse_number::<usize>(&entries, "maxchannels")?;
        if max_channels > MAX_CHANNELS {
            return Err(GarrisonError::Config(
                "Invalid max channels value".to_string(),
            ));
        }

        let server_name = require_key(&entries, "servername")?;
        if server_name.is_empty() {
            return Err(GarrisonError::Config(
                "Server name cannot be empty".to_string(),
            ));
        }

        let motd = require_key(&entries, "motd")?;

        Ok(Self {
            port: port as u16,
            max_users,
            max_channels,
            server_name,
            motd,
            pool_size: DEFAULT_POOL_SIZE,
        })
    }
}

fn require_key(entries: &HashMap<String, String>, key: &str) -> Result<String, GarrisonError> {
    entries.get(key).cloned().ok_or_else(|| {
        GarrisonError::Config(format!("Missing required configuration parameter '{key}'"))
    })
}

fn parse_number<T: std::str::FromStr>(
    entries: &HashMap<String, String>,
    key: &str,
) -> Result<T, GarrisonError> {
    require_key(entries, key)?.parse::<T>().map_err(|_| {
        GarrisonError::Config(format!("Invalid configuration parameter value for '{key}'"))
    })
}

/// Read a `key = value` file into a map.
///
/// Lines without `=` and lines with an empty key are skipped with a warning;
/// a file that yields no entries at all is an error.
pub fn read_config(path: &Path) -> Result<HashMap<String, String>, GarrisonError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        GarrisonError::Config(format!("Failed to open config file at {}: {e}", path.display()))
    })?;

    let mut entries = HashMap::new();
    for (line_number, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match line.split_once('=') {
            Some((key, value)) => {
                let key = key.trim();
                if key.is_empty() {
                    warn!("Empty key at line {}", line_number + 1);
                    continue;
                }
                entries.insert(key.to_string(), value.trim().to_string());
            }
            None => warn!("Invalid format at line {}: {line}", line_number + 1),
        }
    }

    if entries.is_empty() {
        return Err(GarrisonError::Config(format!(
            "No valid configuration entries found in {}",
            path.display()
        )));
    }
    Ok(entries)
}
