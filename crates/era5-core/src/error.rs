//! Application-level error types for the ERA5 dashboard.
//!
//! Errors that reach the user carry a `user_message()` that is safe to show;
//! the `Display` output keeps the full context for logs.

use thiserror::Error;

/// Top-level application error type.
///
/// Library crates keep their own error enums; the binary converts them into
/// this type (or into `Service`) before reporting.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Errors from service crates (catalog, provider) mapped by the caller.
    #[error("Service error: {0}")]
    Service(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Returns a user-friendly message suitable for display in the UI.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Config(e) => e.user_message(),
            AppError::Auth(e) => e.user_message(),
            AppError::Service(_) => "Something went wrong. Please try again.",
            AppError::Other(_) => "An unexpected error occurred. Please try again.",
        }
    }
}

/// Network-related errors (HTTP, connectivity).
#[derive(Debug, Clone, Error)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
        }
    }
}

/// Authentication errors for the Earth Engine credentials.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Credentials not configured")]
    NotConfigured,

    #[error("Access token expired")]
    TokenExpired,

    #[error("Access rejected by provider (status {0})")]
    Rejected(u16),

    #[error("Unusable credentials: {0}")]
    Invalid(String),
}

impl AuthError {
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::NotConfigured => {
                "Earth Engine credentials are missing. Showing cached variables."
            }
            AuthError::TokenExpired => "Earth Engine access has expired. Refresh your credentials.",
            AuthError::Rejected(_) => "Earth Engine rejected the credentials.",
            AuthError::Invalid(_) => {
                "Earth Engine credentials could not be used. Showing cached variables."
            }
        }
    }
}

/// Extension trait for converting reqwest errors to our error types.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        if self.is_timeout() {
            NetworkError::Timeout
        } else if self.is_connect() {
            NetworkError::ConnectionFailed(self.to_string())
        } else if self.is_decode() {
            NetworkError::InvalidResponse(self.to_string())
        } else if let Some(status) = self.status() {
            NetworkError::ServerError {
                status: status.as_u16(),
                message: self.to_string(),
            }
        } else {
            NetworkError::ConnectionFailed(self.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_conversion() {
        let auth_err = AuthError::TokenExpired;
        let app_err: AppError = auth_err.into();
        assert!(matches!(app_err, AppError::Auth(AuthError::TokenExpired)));
    }

    #[test]
    fn test_user_message_propagation() {
        let app_err = AppError::Auth(AuthError::Invalid("bad key".into()));
        assert_eq!(
            app_err.user_message(),
            "Earth Engine credentials could not be used. Showing cached variables."
        );
        assert!(app_err.to_string().contains("bad key"));
    }

    #[test]
    fn test_network_error_display() {
        let err = NetworkError::ServerError {
            status: 503,
            message: "unavailable".into(),
        };
        assert_eq!(err.to_string(), "Server error: 503 - unavailable");
    }

    #[test]
    fn test_display_keeps_context() {
        let err = AppError::Service("catalog write failed".into());
        assert!(err.to_string().contains("catalog write failed"));
    }
}
