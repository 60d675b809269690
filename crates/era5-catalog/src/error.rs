//! Catalog error types.
//!
//! None of these are fatal: callers fall back to the cached catalog or to the
//! default record.

use std::path::PathBuf;

use era5_core::{AuthError, NetworkError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Corrupt catalog cache at {}: {reason}", path.display())]
    CorruptCache { path: PathBuf, reason: String },

    #[error("Unknown variable: {0}")]
    UnknownVariable(String),

    #[error("Invalid record {key}: {reason}")]
    InvalidRecord { key: String, reason: String },

    #[error("Catalog IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CatalogError {
    pub fn provider(reason: impl Into<String>) -> Self {
        Self::ProviderUnavailable(reason.into())
    }

    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CorruptCache {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_record(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// User-friendly error message for UI display.
    pub fn user_message(&self) -> String {
        match self {
            Self::ProviderUnavailable(_) => {
                "Earth Engine is unreachable. Showing cached variable information.".to_string()
            }
            Self::CorruptCache { .. } => "Variable catalog was damaged and will be rebuilt.".to_string(),
            Self::UnknownVariable(key) => format!("No details available for {}", key),
            Self::InvalidRecord { .. } | Self::Io(_) => {
                "Variable catalog could not be saved.".to_string()
            }
        }
    }

    /// Whether the app can keep running on cached or default data.
    pub fn is_recoverable(&self) -> bool {
        true
    }

    /// Whether a later rebuild may succeed where this attempt failed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ProviderUnavailable(_) | Self::Io(_))
    }
}

impl From<NetworkError> for CatalogError {
    fn from(err: NetworkError) -> Self {
        Self::ProviderUnavailable(err.to_string())
    }
}

impl From<AuthError> for CatalogError {
    fn from(err: AuthError) -> Self {
        Self::ProviderUnavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_user_messages() {
        let err = CatalogError::provider("timed out");
        assert!(err.user_message().contains("cached"));

        let err = CatalogError::UnknownVariable("foo".into());
        assert!(err.user_message().contains("foo"));

        let err = CatalogError::corrupt("/tmp/catalog.json", "EOF while parsing");
        assert!(err.user_message().contains("rebuilt"));
        assert!(err.to_string().contains("/tmp/catalog.json"));
    }

    #[test]
    fn test_network_and_auth_map_to_provider_unavailable() {
        let err: CatalogError = NetworkError::Timeout.into();
        assert!(matches!(err, CatalogError::ProviderUnavailable(_)));

        let err: CatalogError = AuthError::Rejected(401).into();
        assert!(matches!(err, CatalogError::ProviderUnavailable(ref m) if m.contains("401")));
    }

    #[test]
    fn test_every_error_is_recoverable() {
        let errors = [
            CatalogError::provider("x"),
            CatalogError::corrupt("p", "r"),
            CatalogError::UnknownVariable("k".into()),
            CatalogError::invalid_record("k", "r"),
        ];
        assert!(errors.iter().all(CatalogError::is_recoverable));
    }

    #[test]
    fn test_is_retryable() {
        assert!(CatalogError::provider("x").is_retryable());
        assert!(!CatalogError::UnknownVariable("x".into()).is_retryable());
        assert!(!CatalogError::invalid_record("k", "nan").is_retryable());
    }
}
