//! Fetching circuit IR over HTTP.

use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::{Client, StatusCode, Url};
use tracing::{debug, info};

use crate::error::{PipelineError, PipelineResult};

/// Host whose downloads require a bearer token.
pub const RESTRICTED_HOST: &str = "platform.planqk.de";

/// Default cap on a downloaded body (16 MiB).
pub const DEFAULT_MAX_BYTES: usize = 16 * 1024 * 1024;

/// HTTP client for circuit downloads. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
    max_bytes: usize,
}

impl Downloader {
    /// Build a client whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("qexec/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            max_bytes: DEFAULT_MAX_BYTES,
        })
    }

    /// Refuse bodies larger than `max_bytes`.
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Download `url` as text.
    ///
    /// Authentication failures are reported as [`PipelineError::AuthError`]
    /// and are never retried.
    pub async fn fetch(&self, url: &str, bearer_token: Option<&str>) -> PipelineResult<String> {
        let download_error = |reason: String| PipelineError::DownloadError {
            url: url.to_string(),
            reason,
        };

        let parsed = Url::parse(url).map_err(|e| download_error(e.to_string()))?;
        let authorization = authorization_for(&parsed, bearer_token)?;

        let mut request = self.client.get(parsed);
        if let Some(value) = authorization {
            request = request.header(AUTHORIZATION, value);
        }

        debug!(%url, "downloading circuit");
        let mut response = request
            .send()
            .await
            .map_err(|e| download_error(e.to_string()))?;

        match response.status() {
            StatusCode::UNAUTHORIZED => {
                return Err(PipelineError::AuthError(format!("{url} answered 401")));
            }
            status if !status.is_success() => {
                return Err(download_error(format!("HTTP {status}")));
            }
            _ => {}
        }

        let too_large = || download_error(format!("body exceeds {} bytes", self.max_bytes));
        if response
            .content_length()
            .is_some_and(|len| len > self.max_bytes as u64)
        {
            return Err(too_large());
        }

        // Content-Length is advisory.
        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| download_error(e.to_string()))?
        {
            if bytes.len() + chunk.len() > self.max_bytes {
                return Err(too_large());
            }
            bytes.extend_from_slice(&chunk);
        }
        let body = String::from_utf8(bytes)
            .map_err(|e| download_error(format!("body is not UTF-8: {e}")))?;
        info!(%url, bytes = body.len(), "downloaded circuit");
        Ok(body)
    }
}

/// `Authorization` header value required to download `url`, if any.
///
/// The restricted host needs a raw token: an empty token, or one that
/// already carries the `Bearer` scheme, is refused before any request.
pub fn authorization_for(url: &Url, bearer_token: Option<&str>) -> PipelineResult<Option<String>> {
    if url.host_str() != Some(RESTRICTED_HOST) {
        return Ok(None);
    }

    match bearer_token.unwrap_or_default() {
        "" => Err(PipelineError::AuthError(format!(
            "a bearer token is required to download from {RESTRICTED_HOST}"
        ))),
        token if token.starts_with("Bearer") => Err(PipelineError::AuthError(
            "the bearer token must not start with \"Bearer\"".to_string(),
        )),
        token => Ok(Some(format!("Bearer {token}"))),
    }
}
