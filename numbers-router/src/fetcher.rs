//! Fetch-and-extract for a single upstream.

use crate::errors::FetchError;
use hyper::StatusCode;
use serde::Deserialize;
use serde::de::Error as _;
use std::time::Duration;

/// Largest upstream body accepted unless configured otherwise.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1 << 20;

/// Body an upstream is expected to answer with.
///
/// Both fields default to empty so that a payload carrying only one of them
/// still decodes and is then judged by [`UpstreamPayload::into_numbers`].
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct UpstreamPayload {
    pub numbers: Vec<i64>,
    pub strings: Vec<String>,
}

impl UpstreamPayload {
    /// Accepts the payload only if it carries numbers and no strings.
    pub fn into_numbers(self) -> Result<Vec<i64>, FetchError> {
        if self.numbers.is_empty() || !self.strings.is_empty() {
            return Err(FetchError::InvalidShape);
        }
        Ok(self.numbers)
    }
}

/// HTTP client wrapper with a fixed per-request timeout.
///
/// Cloning is cheap and shares the underlying connection pool.
#[derive(Clone, Debug)]
pub struct Fetcher {
    client: reqwest::Client,
    max_body_bytes: usize,
}

impl Fetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        })
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    /// Performs one GET against `url` and extracts its numbers.
    ///
    /// The response is owned by this call and dropped before it returns, on
    /// success and failure alike. There are no retries.
    pub async fn fetch(&self, url: &str) -> Result<Vec<i64>, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(FetchError::Network)?;

        let status = response.status();
        if status != StatusCode::OK {
            // Drain so the connection can go back to the pool
            let _ = read_body(response, self.max_body_bytes).await;
            return Err(FetchError::BadStatus(status));
        }

        let body = read_body(response, self.max_body_bytes).await?;
        decode_first_value(&body)?.into_numbers()
    }
}

/// Collects the body, failing as soon as it grows past `limit`.
async fn read_body(mut response: reqwest::Response, limit: usize) -> Result<Vec<u8>, FetchError> {
    if response
        .content_length()
        .is_some_and(|length| length > limit as u64)
    {
        return Err(body_too_large(limit));
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(FetchError::Network)? {
        if body.len() + chunk.len() > limit {
            return Err(body_too_large(limit));
        }
        body.extend_from_slice(&chunk);
    }

    Ok(body)
}

fn body_too_large(limit: usize) -> FetchError {
    FetchError::Decode(serde_json::Error::custom(format!(
        "body exceeds {limit} bytes"
    )))
}

/// Decodes the first JSON value of `body`; anything after it is ignored.
fn decode_first_value(body: &[u8]) -> Result<UpstreamPayload, FetchError> {
    serde_json::Deserializer::from_slice(body)
        .into_iter::<UpstreamPayload>()
        .next()
        .unwrap_or_else(|| Err(serde_json::Error::custom("empty body")))
        .map_err(FetchError::Decode)
}
