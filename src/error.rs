//! Unified error types for hookbridge.
//!
//! [`BridgeError`] is the request-path taxonomy: every variant knows its
//! stable code, HTTP status and optional context, and renders itself as
//! the JSON error body via [`IntoResponse`]. [`AppError`] covers process
//! level failures (config, startup, the `health` subcommand) and
//! [`ValidationError`] describes a single config validation problem.

use std::path::PathBuf;

use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "  {}: {}", self.field, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " ({suggestion})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

fn format_errors(errors: &[ValidationError]) -> String {
    use std::fmt::Write;
    let mut buf = String::new();
    for (i, e) in errors.iter().enumerate() {
        if i > 0 {
            buf.push('\n');
        }
        // write! to String is infallible (only fails on OOM which is unrecoverable)
        let _ = write!(buf, "{e}");
    }
    buf
}

/// Classification of a [`BridgeError`], independent of its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ConnectionFailed,
    NotConnected,
    PublishFailed,
    MissingSignature,
    MissingBody,
    InvalidSignature,
    PayloadTooLarge,
    Internal,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConnectionFailed => "AMQP_CONNECTION_FAILED",
            Self::NotConnected => "AMQP_NOT_CONNECTED",
            Self::PublishFailed => "AMQP_PUBLISH_FAILED",
            Self::MissingSignature => "MISSING_SIGNATURE",
            Self::MissingBody => "MISSING_BODY",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::ConnectionFailed | Self::NotConnected => StatusCode::SERVICE_UNAVAILABLE,
            Self::PublishFailed | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            Self::MissingSignature | Self::InvalidSignature => StatusCode::UNAUTHORIZED,
            Self::MissingBody => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

/// Errors raised on the publish and signature paths.
///
/// The `Display` output is the human message sent to callers, so it never
/// includes the underlying broker error. That text travels in
/// [`BridgeError::context`] instead.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BridgeError {
    #[error("Failed to connect to RabbitMQ")]
    ConnectionFailed { original_error: String },

    #[error("AMQP channel not available")]
    NotConnected,

    #[error("Failed to publish message")]
    PublishFailed { original_error: String },

    #[error("Missing X-Hub-Signature-256 header")]
    MissingSignature,

    #[error("Raw body not available")]
    MissingBody,

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Request body exceeds the configured size limit")]
    PayloadTooLarge,

    #[error("An unexpected error occurred")]
    Internal(#[source] BoxError),
}

impl BridgeError {
    pub fn connection_failed(err: impl std::fmt::Display) -> Self {
        Self::ConnectionFailed {
            original_error: err.to_string(),
        }
    }

    pub fn publish_failed(err: impl std::fmt::Display) -> Self {
        Self::PublishFailed {
            original_error: err.to_string(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ConnectionFailed { .. } => ErrorKind::ConnectionFailed,
            Self::NotConnected => ErrorKind::NotConnected,
            Self::PublishFailed { .. } => ErrorKind::PublishFailed,
            Self::MissingSignature => ErrorKind::MissingSignature,
            Self::MissingBody => ErrorKind::MissingBody,
            Self::InvalidSignature => ErrorKind::InvalidSignature,
            Self::PayloadTooLarge => ErrorKind::PayloadTooLarge,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind().code()
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.kind().status()
    }

    /// Underlying broker error text, if any.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::ConnectionFailed { original_error } | Self::PublishFailed { original_error } => {
                Some(original_error)
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn context(&self) -> Option<Map<String, Value>> {
        self.detail().map(|detail| {
            let mut map = Map::new();
            map.insert("originalError".into(), Value::String(detail.to_string()));
            map
        })
    }

    #[must_use]
    pub fn to_body(&self) -> ErrorBody {
        if matches!(self, Self::Internal(_)) {
            return ErrorBody::internal();
        }
        ErrorBody {
            error: "BridgeError".into(),
            code: self.code().into(),
            message: self.to_string(),
            context: self.context(),
        }
    }
}

impl From<BytesRejection> for BridgeError {
    fn from(rejection: BytesRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge
        } else {
            Self::Internal(Box::new(rejection))
        }
    }
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        if let Self::Internal(ref source) = self {
            tracing::error!(error = %source, "unhandled error while serving request");
        }
        (self.status(), Json(self.to_body())).into_response()
    }
}

/// JSON error body returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Map<String, Value>>,
}

impl ErrorBody {
    /// The fixed body for unclassified failures. Carries no detail.
    #[must_use]
    pub fn internal() -> Self {
        Self {
            error: "InternalServerError".into(),
            code: ErrorKind::Internal.code().into(),
            message: "An unexpected error occurred".into(),
            context: None,
        }
    }
}

fn describe_bridge(e: &BridgeError) -> String {
    e.detail()
        .map_or_else(|| e.to_string(), |detail| format!("{e}: {detail}"))
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AppError {
    #[error("No broker URL configured.\n\n  {hint}")]
    MissingBrokerUrl { hint: String },

    #[error("Config file not found: {}", path.display())]
    ConfigFileNotFound { path: PathBuf },

    #[error("Config parse error in {path}:\n  {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: BoxError,
    },

    #[error("Config validation failed:\n{}", format_errors(.errors))]
    ConfigValidation { errors: Vec<ValidationError> },

    #[error("Unsupported config format: '{0}'")]
    UnsupportedFormat(String),

    #[error("Invalid address: {0}")]
    AddressParse(#[from] std::net::AddrParseError),

    #[error("Invalid URI: {source}")]
    UriParse {
        #[source]
        source: BoxError,
    },

    #[error("HTTP request failed: {source}")]
    HttpRequest {
        #[source]
        source: BoxError,
    },

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("Health check failed with status {0}")]
    HealthCheckFailed(hyper::StatusCode),

    #[error("{}", describe_bridge(.0))]
    Broker(#[from] BridgeError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_codes_and_statuses() {
        let cases = [
            (BridgeError::connection_failed("refused"), "AMQP_CONNECTION_FAILED", 503),
            (BridgeError::NotConnected, "AMQP_NOT_CONNECTED", 503),
            (BridgeError::publish_failed("closed"), "AMQP_PUBLISH_FAILED", 500),
            (BridgeError::MissingSignature, "MISSING_SIGNATURE", 401),
            (BridgeError::MissingBody, "MISSING_BODY", 400),
            (BridgeError::InvalidSignature, "INVALID_SIGNATURE", 401),
            (BridgeError::PayloadTooLarge, "PAYLOAD_TOO_LARGE", 413),
            (BridgeError::Internal("boom".into()), "INTERNAL_ERROR", 500),
        ];
        for (err, code, status) in cases {
            assert_eq!(err.code(), code);
            assert_eq!(err.status().as_u16(), status);
        }
    }

    #[test]
    fn broker_failures_carry_original_error_context() {
        let body = BridgeError::publish_failed("channel closed").to_body();
        assert_eq!(body.error, "BridgeError");
        assert_eq!(body.message, "Failed to publish message");
        let context = body.context.unwrap();
        assert_eq!(context["originalError"], "channel closed");
    }

    #[test]
    fn signature_errors_have_no_context() {
        let json = serde_json::to_value(BridgeError::InvalidSignature.to_body()).unwrap();
        assert_eq!(json["code"], "INVALID_SIGNATURE");
        assert!(json.get("context").is_none());
    }

    #[test]
    fn internal_errors_hide_detail() {
        let body = BridgeError::Internal("database password is hunter2".into()).to_body();
        assert_eq!(body.error, "InternalServerError");
        assert_eq!(body.message, "An unexpected error occurred");
        assert!(body.context.is_none());
    }

    #[test]
    fn startup_error_includes_broker_detail() {
        let err = AppError::from(BridgeError::connection_failed("connection refused"));
        assert_eq!(
            err.to_string(),
            "Failed to connect to RabbitMQ: connection refused"
        );
    }

    #[test]
    fn validation_errors_are_listed() {
        let err = AppError::ConfigValidation {
            errors: vec![ValidationError {
                field: "amqp_url".into(),
                message: "unsupported scheme 'http'".into(),
                suggestion: Some("use amqp:// or amqps://".into()),
            }],
        };
        assert_eq!(
            err.to_string(),
            "Config validation failed:\n  amqp_url: unsupported scheme 'http' (use amqp:// or amqps://)"
        );
    }
}
