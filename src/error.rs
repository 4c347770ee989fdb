use std::fmt;
use std::io;

use serde_json::Value;
use thiserror::Error;

use crate::domain::form::FieldErrors;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("invalid form: {0}")]
    Validation(FieldErrors),
    #[error("session expired: {0}")]
    Unauthorized(RequestFailure),
    #[error("request failed: {0}")]
    Request(RequestFailure),
    #[error("unexpected response from {realm}: {message}")]
    Decode { realm: String, message: String },
    #[error("another submission is still in progress")]
    SubmitInProgress,
    #[error("{0}")]
    ActionDisabled(String),
    #[error("ticket {0} not found")]
    NotFound(String),
    #[error("operation cancelled")]
    Cancelled,
    #[error("session store error: {0}")]
    Session(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type AppResult<T> = Result<T, AppError>;

/// Failure reported by a realm for a non-2xx response or a transport error.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestFailure {
    pub message: String,
    pub status: Option<u16>,
    pub code: Option<String>,
    pub details: Option<Value>,
}

impl RequestFailure {
    pub const NETWORK_CODE: &'static str = "ERR_NETWORK";

    pub fn network(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            code: Some(Self::NETWORK_CODE.to_string()),
            details: None,
        }
    }

    /// Builds a failure from a response status and its (possibly empty) body.
    pub fn from_response(status: u16, body: &str) -> Self {
        let details = if body.trim().is_empty() {
            None
        } else {
            Some(
                serde_json::from_str::<Value>(body)
                    .unwrap_or_else(|_| Value::String(body.to_string())),
            )
        };

        let server_field = |name: &str| {
            details
                .as_ref()
                .and_then(|value| value.get(name))
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        let message = server_field("message")
            .unwrap_or_else(|| format!("Request failed with status code {status}"));
        let code = server_field("code").or_else(|| {
            let fallback = if status >= 500 {
                "ERR_BAD_RESPONSE"
            } else {
                "ERR_BAD_REQUEST"
            };
            Some(fallback.to_string())
        });

        Self {
            message,
            status: Some(status),
            code,
            details,
        }
    }
}

impl fmt::Display for RequestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} (HTTP {status})", self.message),
            None => f.write_str(&self.message),
        }
    }
}
