//! Error types for the HTTP client.
//!
//! Failures fall into four groups: configuration errors raised before a
//! request enters the interceptor chain, classified request errors (invalid
//! URL, timeout, rejected status, body serialization), cancellations, and
//! transport errors passed through untouched.

use std::fmt;

use serde_json::json;
use thiserror::Error;

use crate::cancel::Cancel;
use crate::config::ConfigSnapshot;
use crate::response::Response;
use crate::transport::TransportError;

/// Result type alias for client operations.
pub type HttpResult<T> = Result<T, HttpClientError>;

/// Machine-readable codes attached to classified errors.
pub mod codes {
    /// The request timed out before the transport settled.
    pub const ECONNABORTED: &str = "ECONNABORTED";
    /// The server answered with a rejected 4xx status.
    pub const ERR_BAD_REQUEST: &str = "ERR_BAD_REQUEST";
    /// The server answered with a rejected non-4xx status.
    pub const ERR_BAD_RESPONSE: &str = "ERR_BAD_RESPONSE";
    /// The resolved URL uses a scheme outside the allow-list.
    pub const ERR_INVALID_URL: &str = "ERR_INVALID_URL";
    /// A body could not be serialized or decoded.
    pub const ERR_SERIALIZATION: &str = "ERR_SERIALIZATION";
}

/// Top-level error type for client operations.
#[derive(Debug, Error)]
pub enum HttpClientError {
    /// Bad call shape or option value. Raised before any interceptor runs.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message describing the configuration issue.
        message: String,
    },

    /// A request failed in a way this layer classified.
    #[error("{0}")]
    Request(Box<ClassifiedError>),

    /// The request was cancelled through its token or abort signal.
    #[error("{0}")]
    Cancelled(Cancel),

    /// The transport failed for reasons other than cancellation.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

impl HttpClientError {
    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        HttpClientError::Configuration {
            message: message.into(),
        }
    }

    /// Returns true if this error is a cancellation.
    pub fn is_cancel(&self) -> bool {
        matches!(self, HttpClientError::Cancelled(_))
    }

    /// Returns true if this error was produced by the classification layer.
    pub fn is_http_client_error(&self) -> bool {
        matches!(self, HttpClientError::Request(_))
    }

    /// Returns the classified error, if any.
    pub fn classified(&self) -> Option<&ClassifiedError> {
        match self {
            HttpClientError::Request(inner) => Some(inner),
            _ => None,
        }
    }

    /// Returns the cancellation reason, if this is a cancellation.
    pub fn cancel_reason(&self) -> Option<&Cancel> {
        match self {
            HttpClientError::Cancelled(reason) => Some(reason),
            _ => None,
        }
    }

    /// Returns the classification code, if any.
    pub fn code(&self) -> Option<&str> {
        self.classified().and_then(ClassifiedError::code)
    }

    /// Returns the response attached to the error, if one was obtained.
    pub fn response(&self) -> Option<&Response> {
        self.classified().and_then(ClassifiedError::response)
    }

    /// Consumes the error and returns the attached response, if any.
    ///
    /// Response interceptors use this to recover from a rejected status.
    pub fn into_response(self) -> Option<Response> {
        match self {
            HttpClientError::Request(inner) => inner.response,
            _ => None,
        }
    }

    /// Attaches the sanitized config and resolved URL to a classified error
    /// that was raised without them.
    pub(crate) fn with_context(self, config: &ConfigSnapshot, request: Option<&str>) -> Self {
        match self {
            HttpClientError::Request(mut inner) => {
                if inner.config.is_none() {
                    inner.config = Some(config.clone());
                }
                if inner.request.is_none() {
                    inner.request = request.map(str::to_owned);
                }
                HttpClientError::Request(inner)
            }
            other => other,
        }
    }
}

impl From<ClassifiedError> for HttpClientError {
    fn from(err: ClassifiedError) -> Self {
        HttpClientError::Request(Box::new(err))
    }
}

impl From<serde_json::Error> for HttpClientError {
    fn from(err: serde_json::Error) -> Self {
        ClassifiedError::new(ErrorKind::Serialization, err.to_string())
            .with_code(codes::ERR_SERIALIZATION)
            .into()
    }
}

/// Category of a classified error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The resolved URL was rejected.
    InvalidUrl,
    /// The timeout elapsed before the transport settled.
    Timeout,
    /// The response status failed validation.
    Status,
    /// A body could not be serialized or decoded.
    Serialization,
}

impl ErrorKind {
    /// Returns the kind's name as used in serialized errors.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidUrl => "InvalidUrlError",
            ErrorKind::Timeout => "TimeoutError",
            ErrorKind::Status => "HttpStatusError",
            ErrorKind::Serialization => "SerializationError",
        }
    }
}

/// An error enriched with a code, the sanitized originating config and,
/// when available, the response obtained before failure.
#[derive(Debug)]
pub struct ClassifiedError {
    kind: ErrorKind,
    message: String,
    code: Option<String>,
    config: Option<ConfigSnapshot>,
    request: Option<String>,
    response: Option<Response>,
}

impl ClassifiedError {
    /// Creates a classified error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: None,
            config: None,
            request: None,
            response: None,
        }
    }

    /// Sets the classification code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Sets the sanitized config.
    pub fn with_config(mut self, config: ConfigSnapshot) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the resolved request URL.
    pub fn with_request(mut self, url: impl Into<String>) -> Self {
        self.request = Some(url.into());
        self
    }

    /// Attaches the response.
    pub fn with_response(mut self, response: Response) -> Self {
        self.response = Some(response);
        self
    }

    /// Returns the error category.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the classification code.
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// Returns the sanitized config the request was made with.
    pub fn config(&self) -> Option<&ConfigSnapshot> {
        self.config.as_ref()
    }

    /// Returns the resolved request URL.
    pub fn request(&self) -> Option<&str> {
        self.request.as_deref()
    }

    /// Returns the response obtained before failure.
    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    /// Marker distinguishing classified errors from other failures.
    pub fn is_http_client_error(&self) -> bool {
        true
    }

    /// Serializes the error for logging. The config is already sanitized.
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "name": self.kind.as_str(),
            "message": self.message,
            "code": self.code,
            "status": self.response.as_ref().map(Response::status),
            "request": self.request,
            "config": self.config,
        })
    }
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ClassifiedError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BasicAuth, RequestConfig};
    use crate::response::ResponseData;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_timeout_error_has_no_response() {
        let err: HttpClientError = ClassifiedError::new(ErrorKind::Timeout, "timeout of 5ms exceeded")
            .with_code(codes::ECONNABORTED)
            .into();

        assert_eq!(err.code(), Some("ECONNABORTED"));
        assert!(err.response().is_none());
        assert!(err.is_http_client_error());
        assert!(!err.is_cancel());
    }

    #[test]
    fn test_to_json_redacts_password() {
        let config = RequestConfig::new()
            .url("/secure")
            .auth(BasicAuth::new("alice", "hunter2"));

        let err = ClassifiedError::new(ErrorKind::Status, "Request failed with status code 401")
            .with_config(config.snapshot())
            .with_response(Response::new(401, ResponseData::Text(String::new())));

        let value = err.to_json();
        assert_eq!(value["status"], 401);
        assert_eq!(value["config"]["auth"]["password"], "[REDACTED]");
        assert!(!value.to_string().contains("hunter2"));
    }

    #[test]
    fn test_with_context_keeps_existing_request() {
        let snapshot = RequestConfig::new().url("/a").snapshot();
        let err: HttpClientError = ClassifiedError::new(ErrorKind::InvalidUrl, "bad")
            .with_request("first")
            .into();

        let err = err.with_context(&snapshot, Some("second"));
        let classified = err.classified().unwrap();
        assert_eq!(classified.request(), Some("first"));
        assert!(classified.config().is_some());
    }

    #[test]
    fn test_into_response_recovers_attached_response() {
        let err: HttpClientError = ClassifiedError::new(ErrorKind::Status, "nope")
            .with_response(Response::new(404, ResponseData::Text("missing".to_string())))
            .into();

        let response = err.into_response().unwrap();
        assert_eq!(response.status(), 404);
    }

    #[test]
    fn test_serde_error_is_classified() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = HttpClientError::from(parse_err);
        assert_eq!(err.code(), Some(codes::ERR_SERIALIZATION));
    }
}
