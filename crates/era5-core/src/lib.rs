//! Shared foundation for the ERA5 dashboard: configuration, the application
//! error taxonomy and logging setup.

pub mod config;
pub mod error;

pub use config::{CatalogConfig, Config, CredentialsConfig, ProviderConfig, ValidationResult};
pub use error::{AppError, AuthError, ConfigError, NetworkError, ReqwestErrorExt};

use anyhow::Result;

/// Initialize logging for the dashboard process.
///
/// Honors `RUST_LOG`; defaults to `info`.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("ERA5 dashboard core initialized");
    Ok(())
}
