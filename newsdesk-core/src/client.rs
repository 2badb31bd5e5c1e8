use std::error::Error as StdError;
use std::io;
use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::article::ApiErrorResponse;
use crate::config::ApiConfig;
use crate::endpoint::Endpoint;
use crate::error::NewsError;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Stateless JSON-over-HTTP client for the headline API.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, NewsError> {
        Self::with_timeout(base_url, api_key, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, NewsError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("newsdesk/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| NewsError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, NewsError> {
        Self::with_timeout(
            config.base_url.clone(),
            config.api_key.clone(),
            Duration::from_secs(config.request_timeout_seconds),
        )
    }

    /// Issues a GET for `endpoint` and decodes the body into `T`.
    ///
    /// The status code is classified before any decoding is attempted, so a
    /// 4xx/5xx body never surfaces as a decoding error.
    pub async fn fetch<T: DeserializeOwned>(&self, endpoint: &Endpoint) -> Result<T, NewsError> {
        let url = endpoint.url(&self.base_url, &self.api_key)?;
        debug!(path = endpoint.path(), "sending request");

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        classify_status(status.as_u16(), &body)?;
        if body.is_empty() {
            return Err(NewsError::NoData);
        }

        serde_json::from_slice(&body).map_err(|e| NewsError::Decoding(e.to_string()))
    }
}

/// Maps an HTTP status (and its body, for client errors) onto the error
/// taxonomy. `Ok(())` means the body should be decoded.
pub fn classify_status(status: u16, body: &[u8]) -> Result<(), NewsError> {
    match status {
        200..=299 => Ok(()),
        401 => Err(NewsError::Unauthorized),
        429 => Err(NewsError::RateLimitExceeded),
        400..=499 => {
            let message = serde_json::from_slice::<ApiErrorResponse>(body)
                .map(|envelope| envelope.message)
                .unwrap_or_else(|_| format!("Client error: {status}"));
            Err(NewsError::Api(message))
        }
        500..=599 => Err(NewsError::Api(format!("Server error: {status}"))),
        _ => Err(NewsError::Unknown),
    }
}

/// Classifies a failure where no usable response was received.
pub fn classify_transport_error(err: &reqwest::Error) -> NewsError {
    if err.is_timeout() {
        NewsError::Network("Request timed out".into())
    } else if connection_lost(err) {
        NewsError::Network("No internet connection".into())
    } else if err.is_connect() {
        NewsError::Network("Cannot connect to server".into())
    } else {
        NewsError::Network(err.to_string())
    }
}

fn connection_lost(err: &(dyn StdError + 'static)) -> bool {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            if matches!(
                io_err.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::NotConnected
            ) {
                return true;
            }
        }
        source = cause.source();
    }
    false
}
