//! Structured error payloads and failure classification.
//!
//! Every failure that crosses the client boundary is an [`ErrorPayload`];
//! raw transport errors never escape.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier of the upstream provider, embedded in every payload.
pub const PROVIDER: &str = "aviationstack";

/// Substrings marking a body-embedded error as rate-limit related.
const RATE_LIMIT_MARKERS: [&str; 2] = ["rate_limit", "quota"];

/// Provider-agnostic description of a failed API call.
///
/// `rate_limited == true` implies `retryable == true` at classification
/// time; the terminal [`ErrorPayload::into_retries_exhausted`] shape is the
/// only place that clears `retryable` while keeping `rate_limited`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub provider: String,
    pub code: Option<String>,
    pub message: String,
    pub status_code: Option<u16>,
    pub retryable: bool,
    pub rate_limited: bool,
    pub retry_after_seconds: Option<f64>,
}

impl ErrorPayload {
    fn base(message: String) -> Self {
        Self {
            provider: PROVIDER.to_string(),
            code: None,
            message,
            status_code: None,
            retryable: false,
            rate_limited: false,
            retry_after_seconds: None,
        }
    }

    /// The required credential is absent; raised before any network I/O.
    pub fn missing_api_key(env_var: &str) -> Self {
        Self {
            code: Some("missing_api_key".to_string()),
            ..Self::base(format!("{} environment variable is not set", env_var))
        }
    }

    /// The underlying HTTP client could not be constructed.
    pub fn client_initialization_failed(message: impl Into<String>) -> Self {
        Self {
            code: Some("client_initialization_failed".to_string()),
            ..Self::base(message.into())
        }
    }

    /// The transport failed without producing a response (connect, DNS,
    /// timeout). Always retryable.
    pub fn network_error(err: &reqwest::Error) -> Self {
        Self {
            code: Some("network_error".to_string()),
            retryable: true,
            ..Self::base(format!("Network error while calling Aviationstack: {}", err))
        }
    }

    /// Catch-all for failures outside the known classifications.
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self {
            code: Some("unexpected_error".to_string()),
            ..Self::base(message.into())
        }
    }

    /// Dispatch-layer error for a tool name with no endpoint mapping.
    pub fn unknown_tool(name: &str, valid: &[&str]) -> Self {
        Self {
            code: Some("unknown_tool".to_string()),
            ..Self::base(format!(
                "Unknown tool: {}. Valid tools: {}",
                name,
                valid.join(", ")
            ))
        }
    }

    /// Classifies a response with an HTTP status of 400 or above.
    ///
    /// 429 marks the payload rate-limited; 429 and 5xx are retryable.
    /// Message and code come from an embedded `error` object when the body
    /// carries one, else a generic `HTTP {status}` message with no code.
    /// A malformed `Retry-After` header is silently treated as absent.
    pub fn from_http_status(
        status: StatusCode,
        body: Option<&Value>,
        retry_after: Option<&str>,
    ) -> Self {
        let error = body.and_then(|b| b.get("error")).filter(|e| !e.is_null());
        let message = error
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_else(|| format!("HTTP {} from Aviationstack", status.as_u16()));
        let code = stringify_code(error.and_then(|e| e.get("code")));

        let rate_limited = status == StatusCode::TOO_MANY_REQUESTS;
        let retry_after_seconds = if rate_limited {
            retry_after.and_then(parse_retry_after)
        } else {
            None
        };

        Self {
            provider: PROVIDER.to_string(),
            code,
            message,
            status_code: Some(status.as_u16()),
            retryable: rate_limited || status.is_server_error(),
            rate_limited,
            retry_after_seconds,
        }
    }

    /// Classifies an `error` object embedded in a 2xx response body.
    ///
    /// Aviationstack reports some failures (quota exhaustion in particular)
    /// inside a 200 payload. Only rate-limit wording makes these retryable,
    /// and no header context exists here so `retry_after_seconds` stays
    /// empty.
    pub fn from_body_error(error: &Value, status_code: u16) -> Self {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Aviationstack reported an error")
            .to_owned();
        let code = stringify_code(error.get("code"));

        let haystack =
            format!("{} {}", code.as_deref().unwrap_or_default(), message).to_lowercase();
        let rate_limited = RATE_LIMIT_MARKERS.iter().any(|m| haystack.contains(m));

        Self {
            provider: PROVIDER.to_string(),
            code,
            message,
            status_code: Some(status_code),
            retryable: rate_limited,
            rate_limited,
            retry_after_seconds: None,
        }
    }

    /// Terminal shape surfaced when the retry budget is exhausted.
    ///
    /// Keeps the last observed message, status and rate-limit facts, but the
    /// code becomes `max_retries_exceeded` and the payload is no longer
    /// retryable.
    pub fn into_retries_exhausted(self) -> Self {
        Self {
            code: Some("max_retries_exceeded".to_string()),
            retryable: false,
            ..self
        }
    }
}

impl std::fmt::Display for ErrorPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{}: {}", code, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ErrorPayload {}

/// Provider codes pass through verbatim but stringified; numbers are common.
fn stringify_code(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn parse_retry_after(raw: &str) -> Option<f64> {
    let seconds: f64 = raw.trim().parse().ok()?;
    (seconds.is_finite() && seconds >= 0.0).then_some(seconds)
}
