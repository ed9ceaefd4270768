use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

pub mod context;
pub mod retry;

/// One entry of a remote GraphQL `errors` or `userErrors` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteErrorDetail {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl RemoteErrorDetail {
    pub fn new(message: impl Into<String>, path: Option<String>) -> Self {
        Self {
            message: message.into(),
            path,
        }
    }
}

/// Closed failure taxonomy shared by every adapter component.
///
/// Serialized with an explicit `kind` discriminator so callers switch on
/// the tag rather than on type identity.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all_fields = "camelCase")]
pub enum AdapterError {
    #[error("Validation error: {field} {reason}")]
    ValidationError { field: String, reason: String },

    #[error("Remote protocol error: {}", join_remote_errors(.remote_errors))]
    RemoteProtocolError { remote_errors: Vec<RemoteErrorDetail> },

    #[error("Transport error{}: {reason}", status_suffix(.status_code))]
    TransportError {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status_code: Option<u16>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<String>,
        reason: String,
    },

    #[error("Rate limit exceeded: retry after {retry_after_seconds}s")]
    RateLimitError { retry_after_seconds: u64 },
}

fn join_remote_errors(errors: &[RemoteErrorDetail]) -> String {
    if errors.is_empty() {
        return "remote rejected the operation".to_string();
    }
    errors
        .iter()
        .map(|e| match &e.path {
            Some(path) => format!("{} (at {})", e.message, path),
            None => e.message.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn status_suffix(status_code: &Option<u16>) -> String {
    status_code
        .map(|code| format!(" (HTTP {})", code))
        .unwrap_or_default()
}

impl AdapterError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        AdapterError::ValidationError {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn remote_protocol(remote_errors: Vec<RemoteErrorDetail>) -> Self {
        AdapterError::RemoteProtocolError { remote_errors }
    }

    pub fn transport(
        status_code: Option<u16>,
        body: Option<String>,
        reason: impl Into<String>,
    ) -> Self {
        AdapterError::TransportError {
            status_code,
            body,
            reason: reason.into(),
        }
    }

    pub fn rate_limited(retry_after_seconds: u64) -> Self {
        AdapterError::RateLimitError {
            retry_after_seconds,
        }
    }

    /// The `kind` discriminator as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            AdapterError::ValidationError { .. } => "ValidationError",
            AdapterError::RemoteProtocolError { .. } => "RemoteProtocolError",
            AdapterError::TransportError { .. } => "TransportError",
            AdapterError::RateLimitError { .. } => "RateLimitError",
        }
    }

    /// Rate limits and server-side or network-level transport failures are
    /// transient; everything else is a defect in the request or its content.
    pub fn is_retryable(&self) -> bool {
        match self {
            AdapterError::RateLimitError { .. } => true,
            AdapterError::TransportError { status_code, .. } => {
                status_code.map_or(true, |code| code >= 500)
            }
            AdapterError::ValidationError { .. } | AdapterError::RemoteProtocolError { .. } => {
                false
            }
        }
    }

    /// Status the inbound HTTP surface answers with for this failure.
    pub fn http_status(&self) -> StatusCode {
        match self {
            AdapterError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        let reason = if err.is_timeout() {
            format!("request timed out: {}", err)
        } else {
            format!("request failed: {}", err)
        };
        AdapterError::TransportError {
            status_code: err.status().map(|s| s.as_u16()),
            body: None,
            reason,
        }
    }
}

/// The failure half of a translation envelope.
///
/// Carries the tagged error plus its rendered message; the stack trace is
/// only captured when the invocation runs with the debug flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    #[serde(flatten)]
    pub error: AdapterError,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
}

impl ErrorReport {
    /// Build the report for `error`.
    ///
    /// With `debug` set, the stack trace is captured here, where the
    /// orchestrator turns the error into an envelope. It shows the path to
    /// that boundary, not the frame that first raised the error.
    pub fn from_error(error: AdapterError, debug: bool) -> Self {
        let stack_trace =
            debug.then(|| std::backtrace::Backtrace::force_capture().to_string());
        Self {
            message: error.to_string(),
            error,
            stack_trace,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.error.kind()
    }
}

pub type Result<T> = std::result::Result<T, AdapterError>;
