//! Error taxonomy for the client. Transport failures, non-success HTTP
//! responses, and auth-operation failures are kept distinct so callers can
//! branch on them, while `friendly_message` collapses any of them into a
//! user-presentable string.

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Network or connection failure, including response decoding failures
    /// surfaced by the transport.
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),
    /// Non-2xx response. The body is kept as JSON so callers can extract
    /// server-provided detail.
    #[error("request failed ({status})")]
    Http { status: StatusCode, body: Value },
    /// Auth operation failure carrying a message already extracted for
    /// display.
    #[error("{0}")]
    Auth(String),
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config error: {0}")]
    Config(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Build an `Http` error from a non-success response, consuming the body.
    /// A body that is not JSON is recorded as `null`.
    pub(crate) async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        Self::Http { status, body }
    }

    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Extract a human-readable message from a failed call.
///
/// Server-provided fields win over transport detail: `detail`, then
/// `message`, then `error` from the response body, then the transport error
/// message, then the caller-supplied default.
#[must_use]
pub fn friendly_message(error: &Error, default: &str) -> String {
    match error {
        Error::Http { body, .. } => ["detail", "message", "error"]
            .into_iter()
            .find_map(|key| body.get(key).and_then(Value::as_str))
            .unwrap_or(default)
            .to_string(),
        Error::Transport(err) => {
            let message = err.to_string();
            if message.is_empty() {
                default.to_string()
            } else {
                message
            }
        }
        _ => default.to_string(),
    }
}
