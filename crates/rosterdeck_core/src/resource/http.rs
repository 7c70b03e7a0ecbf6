//! reqwest-backed JSON fetcher.

use super::fetch::{decode_json, Fetch, FetchError, FetchRequest};
use log::debug;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Instant;

/// Fetches JSON payloads over HTTP(S).
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl<T> Fetch<T> for HttpFetcher
where
    T: DeserializeOwned + Send + 'static,
{
    async fn fetch(&self, request: &FetchRequest) -> Result<T, FetchError> {
        let started_at = Instant::now();
        let mut builder = self.client.get(&request.url);
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: request.url.clone(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;
        debug!(
            "event=http_fetch module=resource status=ok http_status={} bytes={} duration_ms={}",
            status.as_u16(),
            body.len(),
            started_at.elapsed().as_millis()
        );

        decode_json(&body)
    }
}
