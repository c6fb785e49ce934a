//! Shared error types across secsvc crates.
//!
//! `SecSvcError` is the request/service error surface. `MetricsError` is a
//! separate type for the instrumentation pipeline; there is no conversion
//! between the two, so a metrics failure can never be propagated as a request
//! failure through `?`.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed configuration.
    BadRequest,
    /// No route or resource matched.
    NotFound,
    /// Unsupported config/protocol version.
    UnsupportedVersion,
    /// Service is draining or not ready.
    Unavailable,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::NotFound => "NOT_FOUND",
            ClientCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ClientCode::Unavailable => "UNAVAILABLE",
            ClientCode::Internal => "INTERNAL",
        }
    }

    /// HTTP status code paired with this client code.
    pub fn http_status(self) -> u16 {
        match self {
            ClientCode::BadRequest => 400,
            ClientCode::NotFound => 404,
            ClientCode::UnsupportedVersion => 400,
            ClientCode::Unavailable => 503,
            ClientCode::Internal => 500,
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, SecSvcError>;

/// Unified service error used by core and gateway.
#[derive(Debug, Error)]
pub enum SecSvcError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl SecSvcError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            SecSvcError::BadRequest(_) => ClientCode::BadRequest,
            SecSvcError::NotFound(_) => ClientCode::NotFound,
            SecSvcError::UnsupportedVersion => ClientCode::UnsupportedVersion,
            SecSvcError::Unavailable(_) => ClientCode::Unavailable,
            SecSvcError::Internal(_) => ClientCode::Internal,
        }
    }
}

/// Failures inside the metrics pipeline. Always recovered locally.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MetricsError {
    /// The backend already holds a series family under this name that the
    /// registry did not create (reload / duplicate registration).
    #[error("metric {name} already registered on backend {backend}")]
    AlreadyRegistered { name: String, backend: &'static str },
    /// Operation not supported by the instrument kind (e.g. observe on a counter).
    #[error("metric {name} is a {kind}, cannot {op}")]
    KindMismatch {
        name: String,
        kind: &'static str,
        op: &'static str,
    },
    /// Non-finite value or negative counter increment.
    #[error("metric {name} rejected value {value}")]
    InvalidValue { name: String, value: f64 },
    /// Backend-specific failure while recording.
    #[error("backend {backend} failed: {message}")]
    Backend {
        backend: &'static str,
        message: String,
    },
    /// Push exporter could not be built or shut down.
    #[error("exporter: {0}")]
    Exporter(String),
}

/// Internal route classification failure. Never escapes `classify`.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("path is not absolute")]
    NotAbsolute,
    #[error("path contains control characters")]
    ControlCharacter,
}
