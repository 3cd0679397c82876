//! HTTP retrieval of image bytes.

use cellpic_model::CellValue;
use reqwest::Url;

use crate::config::HttpConfig;
use crate::error::SkipReason;
use crate::retry::{retry_with_delays, RetryPolicy};

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("server responded with HTTP {status}")]
    Status { status: u16 },
    #[error("response body too large (limit {limit} bytes, {observed})")]
    BodyTooLarge { limit: usize, observed: String },
}

impl FetchError {
    /// Transport failures, 5xx and 429 are worth another attempt; anything
    /// else will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Transport(err) => {
                err.is_timeout() || err.is_connect() || err.is_request() || err.is_body()
            }
            FetchError::Status { status } => *status >= 500 || *status == 429,
            FetchError::BodyTooLarge { .. } => false,
        }
    }
}

/// Interpret a URL cell.
///
/// Only absolute `http`/`https` URLs with a host are fetched; surrounding
/// whitespace is ignored.
pub fn parse_image_url(value: &CellValue) -> Result<Url, SkipReason> {
    let text = match value {
        CellValue::Empty => return Err(SkipReason::EmptyUrl),
        CellValue::String(s) => s.trim(),
        other => return Err(SkipReason::InvalidUrl(display_value(other))),
    };
    if text.is_empty() {
        return Err(SkipReason::EmptyUrl);
    }

    let url = Url::parse(text).map_err(|_| SkipReason::InvalidUrl(text.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(SkipReason::InvalidUrl(text.to_string()));
    }
    Ok(url)
}

fn display_value(value: &CellValue) -> String {
    match value {
        CellValue::Empty => String::new(),
        CellValue::Number(n) | CellValue::DateTime(n) => n.to_string(),
        CellValue::String(s) => s.clone(),
        CellValue::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        CellValue::Error(e) => e.as_str().to_string(),
    }
}

/// Shared HTTP client with per-request timeout, retry and body cap.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
    retry: RetryPolicy,
    max_body_bytes: usize,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            client,
            retry: config.retry_policy(),
            max_body_bytes: config.max_body_bytes,
        })
    }

    /// GET `url`, retrying transient failures with exponential backoff.
    pub async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let delays = self.retry.delays();
        retry_with_delays(
            move |attempt| self.fetch_once(url, attempt),
            &delays,
            |err: &FetchError| err.is_retryable(),
            tokio::time::sleep,
        )
        .await
    }

    async fn fetch_once(&self, url: &Url, attempt: u32) -> Result<Vec<u8>, FetchError> {
        let result = self.request(url).await;
        if let Err(err) = &result {
            log::debug!(
                "GET {url} attempt {attempt}/{} failed: {err}",
                self.retry.max_attempts
            );
        }
        result
    }

    async fn request(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(FetchError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        read_capped_body(response, self.max_body_bytes).await
    }
}

/// Collect an image body, giving up as soon as it is known to exceed `limit`.
///
/// A declared length over the limit is rejected without reading anything.
async fn read_capped_body(
    mut response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let declared = response.content_length();
    if let Some(declared) = declared.filter(|len| *len > limit as u64) {
        return Err(FetchError::BodyTooLarge {
            limit,
            observed: format!("Content-Length {declared} bytes"),
        });
    }

    let mut body = Vec::with_capacity(declared.map_or(0, |len| len as usize));
    while let Some(chunk) = response.chunk().await.map_err(FetchError::Transport)? {
        let total = body.len() + chunk.len();
        if total > limit {
            return Err(FetchError::BodyTooLarge {
                limit,
                observed: format!("received {total} bytes"),
            });
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}
