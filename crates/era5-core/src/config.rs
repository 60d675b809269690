use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::ConfigError;

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "ERA5_DASHBOARD_CONFIG";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Variable catalog cache settings
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Earth Engine endpoints and request limits
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Where the Earth Engine secrets live
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Persisted catalog file, relative to the working directory unless absolute
    #[serde(default = "default_catalog_path")]
    pub path: PathBuf,

    /// Rebuild the catalog when the file is older than this (0 = never)
    #[serde(default = "default_max_age_hours")]
    pub max_age_hours: u64,
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("data/variable_catalog.json")
}

fn default_max_age_hours() -> u64 {
    24 * 30
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: default_catalog_path(),
            max_age_hours: default_max_age_hours(),
        }
    }
}

impl CatalogConfig {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_hours.saturating_mul(3600))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Earth Engine REST API root
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Root of the public Earth Engine STAC catalog
    #[serde(default = "default_stac_base_url")]
    pub stac_base_url: String,

    /// Cloud project that owns the collection asset
    #[serde(default = "default_project")]
    pub project: String,

    /// Image collection the dashboard reads
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Budget for one whole catalog build (all requests and retries), in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Limit for a single HTTP request, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Retries for transient provider failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_api_base_url() -> String {
    "https://earthengine.googleapis.com/v1".to_string()
}

fn default_stac_base_url() -> String {
    "https://storage.googleapis.com/earthengine-stac/catalog".to_string()
}

fn default_project() -> String {
    "earthengine-public".to_string()
}

fn default_collection() -> String {
    "ECMWF/ERA5_LAND/MONTHLY_AGGR".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    4
}

fn default_max_retries() -> u32 {
    2
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            stac_base_url: default_stac_base_url(),
            project: default_project(),
            collection: default_collection(),
            timeout_secs: default_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

impl ProviderConfig {
    /// Budget handed to the catalog builder.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// JSON file holding an access token or a service account key (ignored when
    /// `EE_ACCESS_TOKEN` or `EE_SERVICE_ACCOUNT_JSON` is set)
    #[serde(default = "default_secrets_path")]
    pub secrets_path: PathBuf,
}

fn default_secrets_path() -> PathBuf {
    PathBuf::from("secrets/earthengine.json")
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            secrets_path: default_secrets_path(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Load configuration from `path`, writing defaults there if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            tracing::info!("Wrote default configuration to {}", path.display());
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Warnings are logged; errors fail the load.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_url(&self.provider.api_base_url, "provider.api_base_url", &mut result);
        Self::validate_url(&self.provider.stac_base_url, "provider.stac_base_url", &mut result);

        if self.provider.collection.trim().is_empty() {
            result.add_error("provider.collection", "Collection id must not be empty");
        } else if self.provider.collection.starts_with('/') || self.provider.collection.ends_with('/')
        {
            result.add_error(
                "provider.collection",
                "Collection id must not start or end with '/'",
            );
        }

        if self.provider.project.trim().is_empty() {
            result.add_error("provider.project", "Project must not be empty");
        }

        if self.provider.timeout_secs == 0 {
            result.add_error("provider.timeout_secs", "Timeout must be greater than 0");
        } else if self.provider.timeout_secs > 60 {
            result.add_warning(
                "provider.timeout_secs",
                "Timeout above 60 seconds will stall the session on a dead provider",
            );
        }

        if self.provider.request_timeout_secs == 0 {
            result.add_error(
                "provider.request_timeout_secs",
                "Request timeout must be greater than 0",
            );
        } else if self.provider.request_timeout_secs > self.provider.timeout_secs {
            result.add_warning(
                "provider.request_timeout_secs",
                "Request timeout exceeds the build budget; slow requests are cut by the budget",
            );
        }

        if self.catalog.path.as_os_str().is_empty() {
            result.add_error("catalog.path", "Catalog path must not be empty");
        }

        if self.catalog.max_age_hours == 0 {
            result.add_warning(
                "catalog.max_age_hours",
                "Catalog never expires (0 hours); delete the file to force a rebuild",
            );
        }

        result
    }

    fn validate_url(url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).context("Failed to create config directory")?;
            }
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("era5-dashboard");

        Ok(config_dir.join("config.toml"))
    }
}
