use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

use crate::safety::audit::DEFAULT_FLUSH_THRESHOLD;

/// Application-level constants
pub const APP_NAME: &str = "Medsafe";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8787";

pub const ENV_BIND: &str = "MEDSAFE_BIND";
pub const ENV_KNOWLEDGE_BASE: &str = "MEDSAFE_KNOWLEDGE_BASE";
pub const ENV_AUDIT_DB: &str = "MEDSAFE_AUDIT_DB";
pub const ENV_AUDIT_FLUSH: &str = "MEDSAFE_AUDIT_FLUSH";

/// Get the application data directory.
/// ~/Medsafe/ on all platforms, or the working directory when no home is known.
pub fn app_data_dir() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(APP_NAME),
        None => PathBuf::from(".").join(APP_NAME),
    }
}

/// Default location of the override audit database.
pub fn audit_db_path() -> PathBuf {
    app_data_dir().join("audit.db")
}

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> String {
    "medsafe=info".to_string()
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid bind address in {var}: {value}")]
    InvalidBindAddr { var: &'static str, value: String },

    #[error("Invalid audit flush threshold in {var}: {value}")]
    InvalidFlushThreshold { var: &'static str, value: String },

    #[error("{var} is set but empty")]
    Empty { var: &'static str },
}

/// Runtime settings for the HTTP service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub bind_addr: SocketAddr,
    /// JSON rule file. `None` uses the bundled rule set.
    pub knowledge_base_path: Option<PathBuf>,
    /// `None` keeps override events in memory only.
    pub audit_db_path: Option<PathBuf>,
    pub audit_flush_threshold: usize,
}

impl ServiceConfig {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read settings through `lookup` (variable name to value).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_value =
            non_empty(ENV_BIND, lookup(ENV_BIND))?.unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_value
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidBindAddr {
                var: ENV_BIND,
                value: bind_value.clone(),
            })?;

        let knowledge_base_path =
            non_empty(ENV_KNOWLEDGE_BASE, lookup(ENV_KNOWLEDGE_BASE))?.map(PathBuf::from);

        let audit_db_path = match non_empty(ENV_AUDIT_DB, lookup(ENV_AUDIT_DB))? {
            Some(value) if value.eq_ignore_ascii_case("off") => None,
            Some(value) => Some(PathBuf::from(value)),
            None => Some(audit_db_path()),
        };

        let audit_flush_threshold = match non_empty(ENV_AUDIT_FLUSH, lookup(ENV_AUDIT_FLUSH))? {
            Some(value) => match value.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidFlushThreshold {
                        var: ENV_AUDIT_FLUSH,
                        value,
                    })
                }
            },
            None => DEFAULT_FLUSH_THRESHOLD,
        };

        Ok(Self {
            bind_addr,
            knowledge_base_path,
            audit_db_path,
            audit_flush_threshold,
        })
    }
}

fn non_empty(var: &'static str, value: Option<String>) -> Result<Option<String>, ConfigError> {
    match value {
        Some(v) if v.trim().is_empty() => Err(ConfigError::Empty { var }),
        Some(v) => Ok(Some(v.trim().to_string())),
        None => Ok(None),
    }
}
