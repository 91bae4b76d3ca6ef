//! Error types for the sciquest crate.
//!
//! Every failure a chat turn can hit is one variant of [`Error`].  Variants fall into three
//! families: configuration problems that keep the session inert, invocation failures reported by
//! (or on the way to) the completion API, and invalid references into the transcript.

use std::io;
use std::str::Utf8Error;
use std::sync::Arc;

/// The main error type for sciquest.
#[derive(Clone, Debug, thiserror::Error)]
pub enum Error {
    /// No API key was supplied, so the session refuses to contact the API.
    #[error("Missing credential: {message}")]
    MissingCredential {
        /// Human-readable error message.
        message: String,
    },

    /// A configuration file could not be understood.
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable error message.
        message: String,
    },

    /// Input that violates a transcript or configuration constraint.
    #[error("Validation error: {message}{}", describe_param(param))]
    Validation {
        /// Human-readable error message.
        message: String,
        /// Parameter that failed validation.
        param: Option<String>,
    },

    /// Feedback was requested for a message that does not exist.
    #[error("Invalid reference: message {index} does not exist (transcript has {len} messages)")]
    InvalidReference {
        /// The rejected index.
        index: usize,
        /// Transcript length at the time of the call.
        len: usize,
    },

    /// A generic API error occurred.
    #[error("{}: {message}{}", error_type.as_deref().unwrap_or("API error"), describe_request_id(request_id))]
    Api {
        /// HTTP status code.
        status_code: u16,
        /// Error type string from the API.
        error_type: Option<String>,
        /// Human-readable error message.
        message: String,
        /// Request ID for debugging and support.
        request_id: Option<String>,
    },

    /// Authentication error.
    #[error("Authentication error: {message}")]
    Authentication {
        /// Human-readable error message.
        message: String,
    },

    /// Authorization/Permission error.
    #[error("Permission error: {message}")]
    Permission {
        /// Human-readable error message.
        message: String,
    },

    /// Resource not found (usually an unknown model).
    #[error("Resource not found: {message}")]
    NotFound {
        /// Human-readable error message.
        message: String,
    },

    /// Rate limit or quota exceeded.
    #[error("Rate limit exceeded: {message}{}", describe_retry_after(retry_after))]
    RateLimit {
        /// Human-readable error message.
        message: String,
        /// Time to wait before retrying, in seconds.
        retry_after: Option<u64>,
    },

    /// Bad request due to invalid parameters.
    #[error("Bad request: {message}{}", describe_param(param))]
    BadRequest {
        /// Human-readable error message.
        message: String,
        /// Parameter that caused the error.
        param: Option<String>,
    },

    /// API timeout error.
    #[error("Timeout error: {message}{}", describe_duration(duration))]
    Timeout {
        /// Human-readable error message.
        message: String,
        /// Duration of the timeout in seconds.
        duration: Option<f64>,
    },

    /// Connection error.
    #[error("Connection error: {message}")]
    Connection {
        /// Human-readable error message.
        message: String,
        /// Underlying cause.
        #[source]
        source: Option<Arc<dyn std::error::Error + Send + Sync>>,
    },

    /// Server returned a 500 internal error.
    #[error("Internal server error: {message}{}", describe_request_id(request_id))]
    InternalServer {
        /// Human-readable error message.
        message: String,
        /// Request ID for debugging and support.
        request_id: Option<String>,
    },

    /// Server is overloaded or unavailable.
    #[error("Service unavailable: {message}{}", describe_retry_after(retry_after))]
    ServiceUnavailable {
        /// Human-readable error message.
        message: String,
        /// Time to wait before retrying, in seconds.
        retry_after: Option<u64>,
    },

    /// Error during JSON serialization or deserialization.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        #[source]
        source: Option<Arc<dyn std::error::Error + Send + Sync>>,
    },

    /// I/O error.
    #[error("I/O error: {message}")]
    Io {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        #[source]
        source: Arc<io::Error>,
    },

    /// HTTP client error.
    #[error("HTTP client error: {message}")]
    HttpClient {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        #[source]
        source: Option<Arc<dyn std::error::Error + Send + Sync>>,
    },

    /// A URL parsing or manipulation error.
    #[error("URL error: {message}")]
    Url {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        #[source]
        source: Option<url::ParseError>,
    },

    /// The response stream broke after it started.
    #[error("Streaming error: {message}")]
    Streaming {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        #[source]
        source: Option<Arc<dyn std::error::Error + Send + Sync>>,
    },

    /// Encoding/decoding error.
    #[error("Encoding error: {message}")]
    Encoding {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        #[source]
        source: Option<Arc<dyn std::error::Error + Send + Sync>>,
    },
}

fn describe_param(param: &Option<String>) -> String {
    param
        .as_ref()
        .map(|p| format!(" (parameter: {p})"))
        .unwrap_or_default()
}

fn describe_request_id(request_id: &Option<String>) -> String {
    request_id
        .as_ref()
        .map(|id| format!(" (Request ID: {id})"))
        .unwrap_or_default()
}

fn describe_retry_after(retry_after: &Option<u64>) -> String {
    retry_after
        .map(|secs| format!(" (retry after {secs} seconds)"))
        .unwrap_or_default()
}

fn describe_duration(duration: &Option<f64>) -> String {
    duration
        .map(|secs| format!(" ({secs} seconds)"))
        .unwrap_or_default()
}

impl Error {
    /// Creates a new missing credential error.
    pub fn missing_credential(message: impl Into<String>) -> Self {
        Error::MissingCredential {
            message: message.into(),
        }
    }

    /// Creates a new configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// Creates a new validation error.
    pub fn validation(message: impl Into<String>, param: Option<String>) -> Self {
        Error::Validation {
            message: message.into(),
            param,
        }
    }

    /// Creates a new invalid reference error.
    pub fn invalid_reference(index: usize, len: usize) -> Self {
        Error::InvalidReference { index, len }
    }

    /// Creates a new API error.
    pub fn api(
        status_code: u16,
        error_type: Option<String>,
        message: String,
        request_id: Option<String>,
    ) -> Self {
        Error::Api {
            status_code,
            error_type,
            message,
            request_id,
        }
    }

    /// Creates a new authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Error::Authentication {
            message: message.into(),
        }
    }

    /// Creates a new permission error.
    pub fn permission(message: impl Into<String>) -> Self {
        Error::Permission {
            message: message.into(),
        }
    }

    /// Creates a new not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Error::NotFound {
            message: message.into(),
        }
    }

    /// Creates a new rate limit error.
    pub fn rate_limit(message: impl Into<String>, retry_after: Option<u64>) -> Self {
        Error::RateLimit {
            message: message.into(),
            retry_after,
        }
    }

    /// Creates a new bad request error.
    pub fn bad_request(message: impl Into<String>, param: Option<String>) -> Self {
        Error::BadRequest {
            message: message.into(),
            param,
        }
    }

    /// Creates a new timeout error.
    pub fn timeout(message: impl Into<String>, duration: Option<f64>) -> Self {
        Error::Timeout {
            message: message.into(),
            duration,
        }
    }

    /// Creates a new connection error.
    pub fn connection(
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::Connection {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new internal server error.
    pub fn internal_server(message: impl Into<String>, request_id: Option<String>) -> Self {
        Error::InternalServer {
            message: message.into(),
            request_id,
        }
    }

    /// Creates a new service unavailable error.
    pub fn service_unavailable(message: impl Into<String>, retry_after: Option<u64>) -> Self {
        Error::ServiceUnavailable {
            message: message.into(),
            retry_after,
        }
    }

    /// Creates a new serialization error.
    pub fn serialization(
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::Serialization {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new I/O error.
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            message: message.into(),
            source: Arc::new(source),
        }
    }

    /// Creates a new HTTP client error.
    pub fn http_client(
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::HttpClient {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new URL error.
    pub fn url(message: impl Into<String>, source: Option<url::ParseError>) -> Self {
        Error::Url {
            message: message.into(),
            source,
        }
    }

    /// Creates a new streaming error.
    pub fn streaming(
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::Streaming {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new encoding error.
    pub fn encoding(
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::Encoding {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Returns true if no credential was available.
    pub fn is_missing_credential(&self) -> bool {
        matches!(self, Error::MissingCredential { .. })
    }

    /// Returns true if this error is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }

    /// Returns true if this error refers to a transcript index that does not exist.
    pub fn is_invalid_reference(&self) -> bool {
        matches!(self, Error::InvalidReference { .. })
    }

    /// Returns true if this error is related to authentication.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Error::Authentication { .. })
    }

    /// Returns true if this error is related to rate limiting.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Error::RateLimit { .. })
    }

    /// Returns true if this error is a bad request.
    pub fn is_bad_request(&self) -> bool {
        matches!(self, Error::BadRequest { .. })
    }

    /// Returns true if this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// Returns true if this error is a connection error.
    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Connection { .. })
    }

    /// Returns true if the response stream broke after it started.
    pub fn is_streaming(&self) -> bool {
        matches!(self, Error::Streaming { .. })
    }

    /// Returns true if this error is a server error.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Error::InternalServer { .. } | Error::ServiceUnavailable { .. }
        )
    }

    /// Returns true for any failure produced while invoking the completion API.
    ///
    /// Callers that do not care which way the call failed treat this as the single failure signal
    /// for a turn.
    pub fn is_invocation(&self) -> bool {
        !matches!(
            self,
            Error::MissingCredential { .. }
                | Error::Config { .. }
                | Error::Validation { .. }
                | Error::InvalidReference { .. }
                | Error::Io { .. }
        )
    }

    /// Returns true if a later, user-initiated attempt could plausibly succeed.
    ///
    /// Nothing in this crate retries on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Api { status_code, .. } => {
                matches!(status_code, 408 | 409 | 429 | 500..=599)
            }
            Error::Timeout { .. } => true,
            Error::Connection { .. } => true,
            Error::RateLimit { .. } => true,
            Error::ServiceUnavailable { .. } => true,
            Error::InternalServer { .. } => true,
            Error::Streaming { .. } => true,
            _ => false,
        }
    }

    /// Returns the request ID associated with this error, if any.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Error::Api { request_id, .. } => request_id.as_deref(),
            Error::InternalServer { request_id, .. } => request_id.as_deref(),
            _ => None,
        }
    }

    /// Returns the status code associated with this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Api { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::io(err.to_string(), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::serialization(format!("JSON error: {err}"), Some(Box::new(err)))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::config(format!("YAML error: {err}"))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::url(format!("URL parse error: {err}"), Some(err))
    }
}

impl From<Utf8Error> for Error {
    fn from(err: Utf8Error) -> Self {
        Error::encoding(format!("UTF-8 error: {err}"), Some(Box::new(err)))
    }
}

/// A specialized Result type for sciquest operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_optional_details() {
        let err = Error::rate_limit("quota exhausted", Some(20));
        assert_eq!(
            err.to_string(),
            "Rate limit exceeded: quota exhausted (retry after 20 seconds)"
        );

        let err = Error::api(
            418,
            Some("teapot".to_string()),
            "short and stout".to_string(),
            Some("req_1".to_string()),
        );
        assert_eq!(err.to_string(), "teapot: short and stout (Request ID: req_1)");

        let err = Error::api(418, None, "short and stout".to_string(), None);
        assert_eq!(err.to_string(), "API error: short and stout");
    }

    #[test]
    fn invalid_reference_reports_bounds() {
        let err = Error::invalid_reference(7, 2);
        assert!(err.is_invalid_reference());
        assert_eq!(
            err.to_string(),
            "Invalid reference: message 7 does not exist (transcript has 2 messages)"
        );
    }

    #[test]
    fn invocation_family() {
        assert!(Error::authentication("bad key").is_invocation());
        assert!(Error::rate_limit("slow down", None).is_invocation());
        assert!(Error::streaming("dropped", None).is_invocation());
        assert!(!Error::missing_credential("no key").is_invocation());
        assert!(!Error::invalid_reference(0, 0).is_invocation());
        assert!(!Error::validation("nope", None).is_invocation());
    }

    #[test]
    fn retryable_errors() {
        assert!(Error::timeout("slow", Some(60.0)).is_retryable());
        assert!(Error::api(503, None, "down".to_string(), None).is_retryable());
        assert!(!Error::authentication("bad key").is_retryable());
        assert!(!Error::bad_request("bad", Some("model".to_string())).is_retryable());
    }

    #[test]
    fn server_error_family() {
        assert!(Error::internal_server("boom", None).is_server_error());
        assert!(Error::service_unavailable("overloaded", Some(5)).is_server_error());
        assert!(!Error::authentication("bad key").is_server_error());
        assert!(!Error::api(502, None, "gateway".to_string(), None).is_server_error());
    }

    #[test]
    fn request_id_and_status_code() {
        let err = Error::internal_server("boom", Some("req_9".to_string()));
        assert_eq!(err.request_id(), Some("req_9"));
        assert_eq!(err.status_code(), None);

        let err = Error::api(
            409,
            Some("conflict".to_string()),
            "busy".to_string(),
            Some("req_2".to_string()),
        );
        assert_eq!(err.request_id(), Some("req_2"));
        assert_eq!(err.status_code(), Some(409));

        let err = Error::rate_limit("slow down", Some(3));
        assert_eq!(err.request_id(), None);
        assert_eq!(err.status_code(), None);
    }
}
