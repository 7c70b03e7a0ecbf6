//! Core runtime configuration.
//!
//! # Responsibility
//! - Deserialize host-supplied JSON settings with per-field defaults.
//! - Validate settings before they reach logging, storage or retrieval.
//!
//! # Invariants
//! - Every field is optional in input; missing fields take [`CoreConfig::default`].
//! - A validated config has an absolute log dir, a non-zero timeout and
//!   http(s) endpoints.

use crate::db::{open_db, open_db_in_memory, DbResult};
use crate::repo::SqliteKvStore;
use crate::resource::FetchRequest;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

static ENDPOINT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://[^\s/?#]+[^\s]*$").expect("valid endpoint regex"));

pub const DEFAULT_USERS_ENDPOINT: &str = "https://jsonplaceholder.typicode.com/users";
pub const DEFAULT_TODOS_ENDPOINT: &str = "https://jsonplaceholder.typicode.com/todos";
pub const DEFAULT_POSTS_ENDPOINT: &str = "https://jsonplaceholder.typicode.com/posts";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    /// Input is not valid JSON for [`CoreConfig`].
    Parse(serde_json::Error),
    /// A field holds an unusable value.
    Invalid { field: &'static str, reason: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid config json: {err}"),
            Self::Invalid { field, reason } => write!(f, "invalid config `{field}`: {reason}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::Invalid { .. } => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
    /// SQLite file for persisted collections; `None` keeps them in memory.
    pub db_path: Option<PathBuf>,
    pub users_endpoint: String,
    pub todos_endpoint: String,
    /// Base posts endpoint; the user filter is appended per request.
    pub posts_endpoint: String,
    pub request_timeout_ms: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: crate::logging::default_log_level().to_string(),
            log_dir: None,
            db_path: None,
            users_endpoint: DEFAULT_USERS_ENDPOINT.to_string(),
            todos_endpoint: DEFAULT_TODOS_ENDPOINT.to_string(),
            posts_endpoint: DEFAULT_POSTS_ENDPOINT.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

impl CoreConfig {
    /// Parses and validates a JSON config document.
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(dir) = &self.log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid {
                    field: "log_dir",
                    reason: format!("must be an absolute path, got `{}`", dir.display()),
                });
            }
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "request_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        for (field, endpoint) in [
            ("users_endpoint", &self.users_endpoint),
            ("todos_endpoint", &self.todos_endpoint),
            ("posts_endpoint", &self.posts_endpoint),
        ] {
            if !ENDPOINT_RE.is_match(endpoint) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("expected an http(s) url, got `{endpoint}`"),
                });
            }
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }

    /// Opens the slot store at `db_path`, or an in-memory one when unset.
    pub fn open_slot_store(&self) -> DbResult<SqliteKvStore> {
        let conn = match &self.db_path {
            Some(path) => open_db(path)?,
            None => open_db_in_memory()?,
        };
        Ok(SqliteKvStore::new(conn))
    }

    pub fn users_request(&self) -> FetchRequest {
        FetchRequest::new(&self.users_endpoint).with_timeout(self.request_timeout())
    }

    pub fn todos_request(&self) -> FetchRequest {
        FetchRequest::new(&self.todos_endpoint).with_timeout(self.request_timeout())
    }

    /// Posts written by `user_id`.
    pub fn posts_request(&self, user_id: u64) -> FetchRequest {
        let separator = if self.posts_endpoint.contains('?') { '&' } else { '?' };
        FetchRequest::new(format!("{}{separator}userId={user_id}", self.posts_endpoint))
            .with_timeout(self.request_timeout())
    }
}
