//! Error types for the PagerDuty client.

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when talking to PagerDuty.
#[derive(Debug, Error)]
pub enum PagerDutyError {
    /// Upstream rejected the credentials (HTTP 401).
    #[error("Unauthorized")]
    Unauthorized,

    /// Requested entity does not exist (HTTP 404).
    #[error("Not found")]
    NotFound,

    /// Any other non-2xx response.
    #[error("{message}")]
    Request { status: u16, message: String },

    /// HTTP transport failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body could not be decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A base URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Discovery could not resolve a base URL.
    #[error("Discovery failed: {0}")]
    Discovery(String),

    /// Catalog entity has neither an integration key nor a service id.
    #[error("Entity has no PagerDuty integration key or service id annotation")]
    MissingAnnotation,

    /// Trigger request was rejected before being sent.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl PagerDutyError {
    /// Build the generic failure for a non-2xx status from its raw body.
    ///
    /// The message is `Request failed with <status>, <errors>` where `<errors>`
    /// is the body's `errors` array joined by single spaces.
    #[must_use]
    pub fn from_status(status: u16, body: &[u8]) -> Self {
        let errors = describe_error_body(body);
        Self::Request {
            status,
            message: format!("Request failed with {status}, {errors}"),
        }
    }

    /// HTTP status carried by this error, if it came from a response.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized => Some(401),
            Self::NotFound => Some(404),
            Self::Request { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Error body shapes returned by the REST and Events APIs.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Option<Vec<String>>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<NestedError>,
}

#[derive(Debug, Default, Deserialize)]
struct NestedError {
    #[serde(default)]
    errors: Option<Vec<String>>,
    #[serde(default)]
    message: Option<String>,
}

/// Events API bodies carry a top-level `errors` list, REST API bodies nest it
/// under `error`. Anything else degrades to the raw body text.
fn describe_error_body(body: &[u8]) -> String {
    let parsed: Option<ErrorBody> = serde_json::from_slice(body).ok();

    if let Some(parsed) = parsed {
        if let Some(errors) = parsed.errors {
            return errors.join(" ");
        }
        if let Some(nested) = parsed.error {
            if let Some(errors) = nested.errors.filter(|e| !e.is_empty()) {
                return errors.join(" ");
            }
            if let Some(message) = nested.message {
                return message;
            }
        }
        if let Some(message) = parsed.message {
            return message;
        }
    }

    String::from_utf8_lossy(body).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joins_top_level_errors() {
        let err = PagerDutyError::from_status(400, br#"{"errors":["bad key","try again"]}"#);
        assert_eq!(err.to_string(), "Request failed with 400, bad key try again");
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn test_empty_errors_array() {
        let err = PagerDutyError::from_status(500, br#"{"errors":[]}"#);
        assert_eq!(err.to_string(), "Request failed with 500, ");
    }

    #[test]
    fn test_nested_rest_error() {
        let body = br#"{"error":{"message":"Invalid Input Provided","code":2001,"errors":["Offset must be >= 0"]}}"#;
        let err = PagerDutyError::from_status(400, body);
        assert_eq!(err.to_string(), "Request failed with 400, Offset must be >= 0");

        let body = br#"{"error":{"message":"Rate limit exceeded","code":2020}}"#;
        let err = PagerDutyError::from_status(429, body);
        assert_eq!(err.to_string(), "Request failed with 429, Rate limit exceeded");
    }

    #[test]
    fn test_non_json_body_falls_back_to_text() {
        let err = PagerDutyError::from_status(502, b"  Bad Gateway\n");
        assert_eq!(err.to_string(), "Request failed with 502, Bad Gateway");
    }

    #[test]
    fn test_distinguished_statuses() {
        assert_eq!(PagerDutyError::Unauthorized.status(), Some(401));
        assert_eq!(PagerDutyError::NotFound.status(), Some(404));
        assert_eq!(PagerDutyError::MissingAnnotation.status(), None);
    }
}
