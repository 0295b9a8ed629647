//! Error types module
//!
//! This module provides the core error types used throughout coachdesk.
//! All errors surfaced to callers are unified under the `AppError` enum. Store
//! backends keep their own `StoreError` and convert into `AppError::Transport`
//! at the repository boundary.
//!
//! The taxonomy separates three cases callers must never confuse:
//! a missing tenant context (configuration, fatal to the operation), an access
//! denial (the user lacks the role), and a transport failure (the check could
//! not be performed at all).

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues and denied actions
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
/// to an end user or a calling service.
pub trait ErrorMetadata {
    /// HTTP-style status code
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "TRANSPORT_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden from end users
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Tenant context missing: {0}")]
    MissingTenantContext(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Wrap a lower-level failure (store, network, serialization of stored data)
    /// as a transport error, keeping the source chain.
    pub fn transport<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        AppError::Transport {
            message: message.into(),
            source: anyhow::Error::new(source),
        }
    }

    /// Get the error type name for detailed error reports
    pub fn error_type(&self) -> &str {
        match self {
            AppError::MissingTenantContext(_) => "MissingTenantContext",
            AppError::InvalidPath(_) => "InvalidPath",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::NotFound(_) => "NotFound",
            AppError::Conflict(_) => "Conflict",
            AppError::AccessDenied(_) => "AccessDenied",
            AppError::Transport { .. } => "Transport",
            AppError::Internal(_) => "Internal",
        }
    }

    /// True when the error means "the user does not hold the role", as opposed
    /// to "the role could not be checked".
    pub fn is_access_denied(&self) -> bool {
        matches!(self, AppError::AccessDenied(_))
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::transport("I/O failure", err)
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(format!("Validation error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::MissingTenantContext(_) => (
            500,
            "TENANT_CONTEXT_MISSING",
            false,
            Some("Sign in again or select a tenant"),
            true,
            LogLevel::Error,
        ),
        AppError::InvalidPath(_) => (
            400,
            "INVALID_PATH",
            false,
            Some("Check collection and document names"),
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the resource ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::Conflict(_) => (
            409,
            "CONFLICT",
            false,
            Some("Use a different identifier"),
            false,
            LogLevel::Debug,
        ),
        AppError::AccessDenied(_) => (
            403,
            "ACCESS_DENIED",
            false,
            None,
            true,
            LogLevel::Warn,
        ),
        AppError::Transport { .. } => (
            503,
            "TRANSPORT_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Internal(_) => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::MissingTenantContext(_) => "Service configuration error".to_string(),
            AppError::InvalidPath(ref msg) => msg.clone(),
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::Conflict(ref msg) => msg.clone(),
            // The reason (no roster, not in roster) is never revealed.
            AppError::AccessDenied(_) => "Access denied".to_string(),
            AppError::Transport { .. } => {
                "Temporarily unable to complete the request, please retry".to_string()
            }
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }
}
