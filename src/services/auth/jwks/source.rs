//! Where the provider key set comes from.
use std::time::Duration;

use async_trait::async_trait;
use axum::http::header;
use thiserror::Error;
use url::Url;

use crate::services::auth::jwks::record::JwksDocument;

/// Why a key-set fetch failed. Always surfaced to callers as
/// `KeyServiceUnavailable`; the detail is for logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyFetchError {
    #[error("jwks client error: {0}")]
    Client(String),
    #[error("jwks request failed: {0}")]
    Transport(String),
    #[error("jwks endpoint returned status {0}")]
    Status(u16),
    #[error("jwks document is invalid: {0}")]
    Document(String),
    #[error("jwks fetch timed out")]
    Timeout,
}

/// A read-only supplier of the provider key set.
///
/// Implementations are shared across requests, so they must be `Send + Sync`.
#[async_trait]
pub trait JwksSource: Send + Sync + 'static {
    // Where the keys come from (for logging).
    fn endpoint(&self) -> &str;

    async fn fetch(&self) -> Result<JwksDocument, KeyFetchError>;
}

/// Fetches the key set over HTTP(S) from the provider's well-known endpoint.
#[derive(Clone, Debug)]
pub struct HttpJwksSource {
    client: reqwest::Client,
    url: Url,
}

impl HttpJwksSource {
    /// `timeout` bounds the whole request, connect included.
    pub fn new(url: Url, timeout: Duration) -> Result<Self, KeyFetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| KeyFetchError::Client(e.to_string()))?;

        Ok(Self::with_client(client, url))
    }

    pub fn with_client(client: reqwest::Client, url: Url) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl JwksSource for HttpJwksSource {
    fn endpoint(&self) -> &str {
        self.url.as_str()
    }

    async fn fetch(&self) -> Result<JwksDocument, KeyFetchError> {
        let response = self
            .client
            .get(self.url.clone())
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(KeyFetchError::Status(status.as_u16()));
        }

        response
            .json::<JwksDocument>()
            .await
            .map_err(|e| {
                if e.is_decode() {
                    KeyFetchError::Document(e.to_string())
                } else {
                    transport_error(e)
                }
            })
    }
}

fn transport_error(e: reqwest::Error) -> KeyFetchError {
    if e.is_timeout() {
        KeyFetchError::Timeout
    } else {
        KeyFetchError::Transport(e.to_string())
    }
}
