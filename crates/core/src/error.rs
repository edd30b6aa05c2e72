//! Unified error types for the compliance notifier.
//!
//! Error codes:
//! - AUTH_001: Scheduler secret or unsubscribe token rejected
//! - VALID_001: Request validation failed
//! - STORE_001: Relational store failure
//! - PROVIDER_001-002: External provider call failed / malformed response
//! - CONFIG_001: Dependent service not configured

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Store error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorCode {
    /// STORE_001: Query or connection failed
    QueryFailed,
}

impl StoreErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::QueryFailed => "STORE_001",
        }
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> u16 {
        500
    }
}

/// External provider error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorCode {
    /// PROVIDER_001: Network error, timeout or non-success status
    CallFailed,
    /// PROVIDER_002: Response could not be parsed
    MalformedResponse,
}

impl ProviderErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::CallFailed => "PROVIDER_001",
            Self::MalformedResponse => "PROVIDER_002",
        }
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> u16 {
        502
    }
}

/// Unified error type for the compliance notifier.
#[derive(Debug, Error)]
pub enum Error {
    /// Store error with code.
    #[error("[{code}] {message}")]
    Store {
        code: &'static str,
        message: String,
        http_status: u16,
    },

    /// External provider error with code.
    #[error("[{code}] {provider}: {message}")]
    Provider {
        code: &'static str,
        provider: &'static str,
        message: String,
        http_status: u16,
    },

    #[error("[CONFIG_001] service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a store error.
    pub fn store(code: StoreErrorCode, msg: impl Into<String>) -> Self {
        Self::Store {
            code: code.code(),
            message: msg.into(),
            http_status: code.http_status(),
        }
    }

    /// Create a provider error.
    pub fn provider(
        code: ProviderErrorCode,
        provider: &'static str,
        msg: impl Into<String>,
    ) -> Self {
        Self::Provider {
            code: code.code(),
            provider,
            message: msg.into(),
            http_status: code.http_status(),
        }
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::ServiceUnavailable(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get the HTTP status code for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Store { http_status, .. } => *http_status,
            Self::Provider { http_status, .. } => *http_status,
            Self::ServiceUnavailable(_) => 503,
            Self::Validation(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::NotFound(_) => 404,
            Self::Serialization(_) => 400,
            Self::Internal(_) => 500,
        }
    }

    /// Get the error code string.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Store { code, .. } => *code,
            Self::Provider { code, .. } => *code,
            Self::ServiceUnavailable(_) => "CONFIG_001",
            Self::Validation(_) | Self::Serialization(_) => "VALID_001",
            Self::Unauthorized(_) => "AUTH_001",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Whether this failure is worth retrying on the next scheduled run.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Store { .. }
                | Self::Provider {
                    code: "PROVIDER_001",
                    ..
                }
        )
    }
}
