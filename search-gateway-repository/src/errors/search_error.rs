//! Search error types.
//!
//! Every failure in the gateway is reported as a [`SearchError`]: a kind from
//! a closed taxonomy, a user-facing message, and optional technical details
//! that are only shown to callers in verbose mode.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// Classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The search engine could not be reached.
    Connection,
    /// The engine answered with a body that could not be decoded.
    Decode,
    /// The engine answer decoded but did not have the expected shape.
    Parse,
    /// An outbound payload could not be built.
    Marshaling,
    /// The caller sent invalid input.
    BadRequest,
    /// The logical index (or physical index) already exists.
    AlreadyExists,
    /// The engine reported a missing index.
    IndexNotFound,
    /// The engine rejected an argument.
    IllegalArgument,
    /// The engine rejected the payload during validation.
    Validation,
    /// Missing or invalid credentials.
    Unauthorized,
    /// A logical index or document does not exist.
    NotFound,
    /// A bulk batch was accepted but some items failed.
    Bulk,
    /// The engine reported an error type outside this taxonomy.
    Engine,
    /// Anything else.
    Server,
}

impl ErrorKind {
    /// Wire name used in the `type` field of error envelopes.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connection => "connection_error",
            Self::Decode => "decode_error",
            Self::Parse => "parse_error",
            Self::Marshaling => "marshaling_error",
            Self::BadRequest => "bad_request",
            Self::AlreadyExists => "resource_already_exists_exception",
            Self::IndexNotFound => "index_not_found_exception",
            Self::IllegalArgument => "illegal_argument_exception",
            Self::Validation => "validation_exception",
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not_found",
            Self::Bulk => "bulk_error",
            Self::Engine => "engine_error",
            Self::Server => "server_error",
        }
    }

    /// HTTP status for the kind.
    pub fn status(&self) -> u16 {
        match self {
            Self::BadRequest | Self::IllegalArgument | Self::Validation => 400,
            Self::Unauthorized => 401,
            Self::NotFound | Self::IndexNotFound => 404,
            Self::AlreadyExists => 409,
            Self::Connection
            | Self::Decode
            | Self::Parse
            | Self::Marshaling
            | Self::Bulk
            | Self::Engine
            | Self::Server => 500,
        }
    }

    /// Map an engine-native error type onto the taxonomy.
    pub fn from_engine_type(engine_type: &str) -> Self {
        match engine_type {
            "resource_already_exists_exception" => Self::AlreadyExists,
            "index_not_found_exception" => Self::IndexNotFound,
            "illegal_argument_exception" => Self::IllegalArgument,
            "validation_exception" => Self::Validation,
            _ => Self::Engine,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur anywhere in the gateway.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{error_type}: {message}")]
pub struct SearchError {
    kind: ErrorKind,
    status: u16,
    error_type: String,
    message: String,
    details: Option<String>,
}

impl SearchError {
    /// Create an error of the given kind with the kind's default status and type.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: kind.status(),
            error_type: kind.as_str().to_string(),
            message: message.into(),
            details: None,
        }
    }

    /// Attach technical details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Create a connection error.
    pub fn connection(details: impl Into<String>) -> Self {
        Self::new(ErrorKind::Connection, "failed to connect to search engine").with_details(details)
    }

    /// Create a decode error.
    pub fn decode(details: impl Into<String>) -> Self {
        Self::new(ErrorKind::Decode, "failed to decode response").with_details(details)
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Parse, msg)
    }

    /// Create a marshaling error.
    pub fn marshaling(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Marshaling, msg)
    }

    /// Create a bad request error.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, msg)
    }

    /// Create an already-exists error for a logical index.
    pub fn already_exists(alias: &str) -> Self {
        Self::new(ErrorKind::AlreadyExists, "index/alias already exists")
            .with_details(format!("alias {} is already bound", alias))
    }

    /// Create an unauthorized error.
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, msg)
    }

    /// Create a not found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, msg)
    }

    /// Create an alias-not-found error.
    pub fn alias_not_found(alias: &str) -> Self {
        Self::not_found("alias not found").with_details(format!("alias {} is not bound", alias))
    }

    /// Create a bulk error.
    pub fn bulk(failed: usize, total: usize) -> Self {
        Self::new(ErrorKind::Bulk, "bulk request failed")
            .with_details(format!("{} of {} bulk items failed", failed, total))
    }

    /// Create a server error.
    pub fn server(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Server, msg)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// HTTP status reported to callers.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Value of the `type` field in error envelopes.
    pub fn error_type(&self) -> &str {
        &self.error_type
    }

    /// User-facing message.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, ErrorKind::NotFound | ErrorKind::IndexNotFound)
    }
}

/// Classify a non-success engine response.
///
/// Parses `{"error": {"type": .., "reason": ..}}` out of `body`. Recognised
/// engine types get a fixed user-facing message, everything else keeps
/// `default_message`. The engine reason is kept as details.
///
/// # Arguments
///
/// * `status` - HTTP status returned by the engine
/// * `body` - Raw response body
/// * `default_message` - Message used when the engine type is not recognised
pub fn classify_engine_error(status: u16, body: &str, default_message: &str) -> SearchError {
    let parsed: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) => {
            return SearchError {
                kind: ErrorKind::Decode,
                status,
                error_type: ErrorKind::Decode.as_str().to_string(),
                message: default_message.to_string(),
                details: Some(format!("failed to decode error response: {}", body)),
            };
        }
    };

    let error = &parsed["error"];
    let engine_type = error["type"].as_str().unwrap_or_default();
    let reason = error["reason"]
        .as_str()
        .map(str::to_string)
        .or_else(|| error.as_str().map(str::to_string))
        .unwrap_or_else(|| default_message.to_string());

    let kind = ErrorKind::from_engine_type(engine_type);
    let message = match kind {
        ErrorKind::AlreadyExists => "The specified index already exists.",
        ErrorKind::IndexNotFound => "The requested index does not exist.",
        ErrorKind::IllegalArgument => "Invalid request. Please check your input.",
        ErrorKind::Validation => "Validation error. Please verify your request payload.",
        _ => default_message,
    };

    let error_type = if kind == ErrorKind::Engine && !engine_type.is_empty() {
        engine_type.to_string()
    } else {
        kind.as_str().to_string()
    };

    SearchError {
        kind,
        status: if status >= 400 { status } else { kind.status() },
        error_type,
        message: message.to_string(),
        details: Some(reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_wire_names_and_status() {
        assert_eq!(ErrorKind::BadRequest.as_str(), "bad_request");
        assert_eq!(ErrorKind::BadRequest.status(), 400);
        assert_eq!(ErrorKind::AlreadyExists.status(), 409);
        assert_eq!(ErrorKind::Unauthorized.status(), 401);
        assert_eq!(ErrorKind::NotFound.status(), 404);
        assert_eq!(ErrorKind::Connection.status(), 500);
    }

    #[test]
    fn test_classify_index_not_found() {
        let body = r#"{"error":{"type":"index_not_found_exception","reason":"no such index [products]"},"status":404}"#;
        let err = classify_engine_error(404, body, "failed to get index info");

        assert_eq!(err.kind(), ErrorKind::IndexNotFound);
        assert_eq!(err.status(), 404);
        assert_eq!(err.error_type(), "index_not_found_exception");
        assert_eq!(err.message(), "The requested index does not exist.");
        assert_eq!(err.details(), Some("no such index [products]"));
    }

    #[test]
    fn test_classify_illegal_argument_keeps_reason_separate() {
        let body = r#"{"error":{"type":"illegal_argument_exception","reason":"mapper [price] cannot be changed from type [float] to [text]"}}"#;
        let err = classify_engine_error(400, body, "failed to update index mappings");

        assert_eq!(err.kind(), ErrorKind::IllegalArgument);
        assert_eq!(err.message(), "Invalid request. Please check your input.");
        assert!(err.details().unwrap().contains("cannot be changed"));
    }

    #[test]
    fn test_classify_unknown_engine_type() {
        let body = r#"{"error":{"type":"mapper_parsing_exception","reason":"failed to parse"}}"#;
        let err = classify_engine_error(400, body, "failed to create index");

        assert_eq!(err.kind(), ErrorKind::Engine);
        assert_eq!(err.error_type(), "mapper_parsing_exception");
        assert_eq!(err.status(), 400);
        assert_eq!(err.message(), "failed to create index");
    }

    #[test]
    fn test_classify_undecodable_body() {
        let err = classify_engine_error(502, "<html>bad gateway</html>", "bulk request failed");

        assert_eq!(err.kind(), ErrorKind::Decode);
        assert_eq!(err.status(), 502);
        assert_eq!(err.message(), "bulk request failed");
    }

    #[test]
    fn test_display_includes_type() {
        let err = SearchError::bad_request("data array cannot be empty");
        assert_eq!(err.to_string(), "bad_request: data array cannot be empty");
        assert!(err.details().is_none());
    }
}
