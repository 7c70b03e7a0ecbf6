//! Retrieval contract used by the resource loader.

use crate::model::error_info::ErrorInfo;
use serde::de::DeserializeOwned;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::time::Duration;

/// One external retrieval target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub timeout: Option<Duration>,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Retrieval failure.
#[derive(Debug)]
pub enum FetchError {
    /// Connection, timeout or body-read failure.
    Transport(String),
    /// Server answered with a non-success status.
    Status { status: u16, url: String },
    /// Body was received but is not a valid payload.
    Decode(String),
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(message) => write!(f, "transport failure: {message}"),
            Self::Status { status, url } => write!(f, "HTTP error! status: {status} ({url})"),
            Self::Decode(message) => write!(f, "malformed response body: {message}"),
        }
    }
}

impl Error for FetchError {}

impl FetchError {
    /// Stable short code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Status { .. } => "status",
            Self::Decode(_) => "decode",
        }
    }

    pub fn to_error_info(&self) -> ErrorInfo {
        ErrorInfo::retrieval(format!("Failed to fetch: {self}"))
    }
}

/// Async source of one decoded payload.
///
/// Implementations must treat partial or garbled bodies as failures.
pub trait Fetch<T>: Send + Sync {
    fn fetch(&self, request: &FetchRequest) -> impl Future<Output = Result<T, FetchError>> + Send;
}

/// Decodes a JSON body; any syntax or shape mismatch is a [`FetchError::Decode`].
pub fn decode_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, FetchError> {
    serde_json::from_slice(body).map_err(|err| FetchError::Decode(err.to_string()))
}
