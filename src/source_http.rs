//! HTTP analysis backend.
//!
//! Fetches `GET {base_url}/analyses/{id}/functions` and decodes the body
//! with [`parse_function_list`]. The analysis id is percent-encoded as a
//! single path segment, so ids containing `/` cannot escape the route.
//!
//! # Retry Strategy
//!
//! - HTTP 404 → [`FetchError::NotFound`], no retry
//! - HTTP 429 and 5xx → retry with exponential backoff
//! - Other non-2xx → fail immediately with [`FetchError::Status`]
//! - Network errors (including the request timeout) → retry
//! - Backoff: `retry_backoff_ms × 2^(attempt-1)`, exponent capped at 5

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use tierlist_core::models::{parse_function_list, FunctionRecord};
use tierlist_core::source::{FetchError, FunctionSource};

use crate::config::SourceConfig;

/// Longest backend error body carried into a [`FetchError::Status`] message.
const MAX_ERROR_BODY_CHARS: usize = 200;

pub struct HttpSource {
    client: reqwest::Client,
    base_url: Url,
    max_retries: u32,
    retry_backoff: Duration,
}

impl HttpSource {
    /// Build a client from `[source]` config.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is missing, unparsable, or cannot
    /// carry path segments (e.g. `mailto:`).
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let raw = config
            .base_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("source.base_url required for http provider"))?;
        let base_url =
            Url::parse(raw).with_context(|| format!("Invalid source.base_url: {}", raw))?;
        if base_url.cannot_be_a_base() {
            bail!("source.base_url cannot carry a path: {}", raw);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url,
            max_retries: config.max_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        })
    }

    /// Endpoint for one analysis.
    pub fn functions_url(&self, analysis_id: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["analyses", analysis_id, "functions"]);
        }
        url
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.retry_backoff * (1u32 << (attempt - 1).min(5))
    }
}

#[async_trait]
impl FunctionSource for HttpSource {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch_functions(&self, analysis_id: &str) -> Result<Vec<FunctionRecord>, FetchError> {
        let url = self.functions_url(analysis_id);
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.backoff(attempt);
                tracing::debug!(%url, attempt, ?delay, "retrying analysis fetch");
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .get(url.clone())
                .header(reqwest::header::ACCEPT, "application/json")
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let body = response
                            .bytes()
                            .await
                            .map_err(|e| FetchError::Transport(e.to_string()))?;
                        return parse_function_list(&body);
                    }

                    if status == StatusCode::NOT_FOUND {
                        return Err(FetchError::NotFound(analysis_id.to_string()));
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    let err = FetchError::Status {
                        status: status.as_u16(),
                        message: error_message(status, &body_text),
                    };

                    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                        tracing::warn!(%url, attempt, error = %err, "transient backend error");
                        last_err = Some(err);
                        continue;
                    }

                    return Err(err);
                }
                Err(e) => {
                    tracing::warn!(%url, attempt, error = %e, "request failed");
                    last_err = Some(FetchError::Transport(e.to_string()));
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            FetchError::Transport("analysis fetch failed after retries".to_string())
        }))
    }
}

/// Short human-readable message for a failed response.
fn error_message(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string();
    }
    let mut message: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
    if body.chars().count() > MAX_ERROR_BODY_CHARS {
        message.push_str("...");
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(base_url: &str) -> HttpSource {
        let config = SourceConfig {
            base_url: Some(base_url.to_string()),
            ..SourceConfig::default()
        };
        HttpSource::new(&config).unwrap()
    }

    #[test]
    fn test_functions_url_appends_segments() {
        let s = source("http://localhost:8000");
        assert_eq!(
            s.functions_url("a1").as_str(),
            "http://localhost:8000/analyses/a1/functions"
        );

        let prefixed = source("http://localhost:8000/api/");
        assert_eq!(
            prefixed.functions_url("a1").as_str(),
            "http://localhost:8000/api/analyses/a1/functions"
        );
    }

    #[test]
    fn test_functions_url_encodes_id() {
        let s = source("http://localhost:8000");
        assert_eq!(
            s.functions_url("../x y").as_str(),
            "http://localhost:8000/analyses/..%2Fx%20y/functions"
        );
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let config = SourceConfig {
            base_url: Some("not a url".to_string()),
            ..SourceConfig::default()
        };
        assert!(HttpSource::new(&config).is_err());

        let config = SourceConfig {
            base_url: Some("mailto:ops@example.com".to_string()),
            ..SourceConfig::default()
        };
        assert!(HttpSource::new(&config).is_err());
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let s = source("http://localhost:8000");
        assert_eq!(s.backoff(1), Duration::from_millis(500));
        assert_eq!(s.backoff(2), Duration::from_millis(1000));
        assert_eq!(s.backoff(9), Duration::from_millis(500 * 32));
    }

    #[test]
    fn test_error_message() {
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, "  "),
            "Bad Request".to_string()
        );
        let long = "x".repeat(500);
        let msg = error_message(StatusCode::BAD_REQUEST, &long);
        assert_eq!(msg.len(), MAX_ERROR_BODY_CHARS + 3);
    }
}
