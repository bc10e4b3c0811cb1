//! Configuration loaded from environment variables.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::source::UpdateMode;

/// Mission Control server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address.
    pub addr: SocketAddr,
    /// SQLite database URL. Store-backed endpoints refuse to run without it.
    pub database_url: Option<String>,
    /// Root of the on-disk agent tree and shared files.
    pub openclaw_base: PathBuf,
    /// Optional beads issue log.
    pub beads_log: Option<PathBuf>,
    /// Optional catalog file replacing the built-in agent/project table.
    pub catalog_path: Option<PathBuf>,
    pub update_mode: UpdateMode,
    pub poll_interval: Duration,
    /// Run one reconciliation in the background at startup.
    pub sync_on_start: bool,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `MISSION_CONTROL_ADDR` | Server bind address | `127.0.0.1:8788` |
    /// | `DATABASE_URL` | SQLite database URL | (unset) |
    /// | `OPENCLAW_BASE` | Agent tree root | `$HOME/.openclaw` |
    /// | `BEADS_LOG` | Beads issue log (JSONL) | (unset) |
    /// | `MISSION_CONTROL_CATALOG` | Catalog JSON file | (built-in) |
    /// | `DASHBOARD_UPDATES` | `poll` or `push` | `push` |
    /// | `POLL_INTERVAL_SECS` | Poll period in seconds | `30` |
    /// | `SYNC_ON_START` | Reconcile once at startup | `true` |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let addr = var("MISSION_CONTROL_ADDR")
            .unwrap_or_else(|| "127.0.0.1:8788".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidAddr)?;

        let database_url = var("DATABASE_URL");

        let openclaw_base = match var("OPENCLAW_BASE") {
            Some(base) => PathBuf::from(base),
            None => PathBuf::from(var("HOME").unwrap_or_default()).join(".openclaw"),
        };

        let beads_log = var("BEADS_LOG").map(PathBuf::from);
        let catalog_path = var("MISSION_CONTROL_CATALOG").map(PathBuf::from);

        let update_mode = match var("DASHBOARD_UPDATES") {
            Some(mode) => {
                UpdateMode::parse(&mode).ok_or(ConfigError::InvalidUpdateMode(mode))?
            }
            None => UpdateMode::Push,
        };

        let poll_interval = match var("POLL_INTERVAL_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => return Err(ConfigError::InvalidPollInterval(raw)),
            },
            None => Duration::from_secs(30),
        };

        let sync_on_start = match var("SYNC_ON_START") {
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::InvalidBool {
                var: "SYNC_ON_START",
                value: raw,
            })?,
            None => true,
        };

        Ok(Self {
            addr,
            database_url,
            openclaw_base,
            beads_log,
            catalog_path,
            update_mode,
            poll_interval,
            sync_on_start,
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid MISSION_CONTROL_ADDR format")]
    InvalidAddr,

    #[error("DASHBOARD_UPDATES must be 'poll' or 'push', got '{0}'")]
    InvalidUpdateMode(String),

    #[error("POLL_INTERVAL_SECS must be a positive integer, got '{0}'")]
    InvalidPollInterval(String),

    #[error("{var} must be a boolean, got '{value}'")]
    InvalidBool { var: &'static str, value: String },
}
