//! A thin JSON-over-HTTPS client shared by the remote collaborators.

use std::time::Duration;

use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use switchboard_contracts::error::{SwitchboardError, SwitchboardResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Failures talking to a remote service.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("request timed out: {reason}")]
    Timeout { reason: String },

    #[error("connection failed: {reason}")]
    Connect { reason: String },

    #[error("authentication failed: {message}")]
    Auth { message: String },

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("failed to decode response: {reason}")]
    Decode { reason: String },
}

impl RemoteError {
    /// Whether the request never got an answer, so trying again may work.
    pub fn is_transient(&self) -> bool {
        matches!(self, RemoteError::Timeout { .. } | RemoteError::Connect { .. })
    }
}

/// Timeouts and refused connections stay `Connection` errors; an answered
/// request that was rejected becomes `Upstream`.
impl From<RemoteError> for SwitchboardError {
    fn from(e: RemoteError) -> Self {
        if e.is_transient() {
            SwitchboardError::Connection { reason: e.to_string() }
        } else {
            SwitchboardError::Upstream { reason: e.to_string() }
        }
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Pull a readable message out of an error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

#[derive(Debug, Clone)]
pub struct JsonClient {
    client: Client,
    base_url: String,
    authorization: String,
}

impl JsonClient {
    /// `authorization` is the full header value, e.g. `"Bearer sk-…"`.
    pub fn new(base_url: &str, authorization: String) -> SwitchboardResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SwitchboardError::Config {
                reason: format!("failed to create HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            authorization,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, RemoteError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.url(path);
        debug!(%url, "POST");

        let response = self
            .client
            .post(&url)
            .header("Authorization", &self.authorization)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RemoteError::Timeout { reason: e.to_string() }
                } else {
                    RemoteError::Connect { reason: e.to_string() }
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RemoteError::Decode { reason: e.to_string() })?;

        if !status.is_success() {
            let message = error_message(&text);
            return Err(match status.as_u16() {
                401 | 403 => RemoteError::Auth { message },
                code => RemoteError::Status { status: code, message },
            });
        }

        serde_json::from_str(&text).map_err(|e| RemoteError::Decode {
            reason: format!("{} - body: {}", e, text),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_double_slashes() {
        let client = JsonClient::new("https://api.example.com/v1/", "Bearer x".to_string()).unwrap();
        assert_eq!(client.url("/realtime/sessions"), "https://api.example.com/v1/realtime/sessions");
        assert_eq!(client.url("chat/completions"), "https://api.example.com/v1/chat/completions");
    }

    #[test]
    fn error_message_prefers_the_api_message() {
        assert_eq!(
            error_message(r#"{"error": {"message": "Incorrect API key", "type": "invalid_request_error"}}"#),
            "Incorrect API key"
        );
        assert_eq!(error_message("  upstream unavailable \n"), "upstream unavailable");
    }

    #[test]
    fn unanswered_requests_become_connection_errors() {
        for e in [
            RemoteError::Timeout { reason: "30s".to_string() },
            RemoteError::Connect { reason: "refused".to_string() },
        ] {
            assert!(e.is_transient());
            let err: SwitchboardError = e.into();
            assert!(matches!(err, SwitchboardError::Connection { .. }));
        }
    }

    #[test]
    fn rejected_requests_become_upstream_errors() {
        for e in [
            RemoteError::Auth { message: "Incorrect API key".to_string() },
            RemoteError::Status { status: 400, message: "bad schema".to_string() },
            RemoteError::Decode { reason: "expected value".to_string() },
        ] {
            assert!(!e.is_transient());
            let err: SwitchboardError = e.into();
            assert!(matches!(err, SwitchboardError::Upstream { .. }), "got {:?}", err);
            assert!(!err.is_fatal());
        }
    }
}
