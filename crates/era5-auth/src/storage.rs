use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::service_account::ServiceAccountKey;

/// Environment variable holding a ready-to-use OAuth access token.
pub const ACCESS_TOKEN_ENV: &str = "EE_ACCESS_TOKEN";

/// Environment variable holding the JSON of a service account key.
pub const SERVICE_ACCOUNT_ENV: &str = "EE_SERVICE_ACCOUNT_JSON";

/// Environment variable naming the billing project for Earth Engine calls.
pub const PROJECT_ENV: &str = "EE_PROJECT";

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error(
        "No Earth Engine credentials found (set EE_ACCESS_TOKEN or EE_SERVICE_ACCOUNT_JSON, or create {})",
        .0.display()
    )]
    Missing(PathBuf),

    #[error("Failed to read secrets file {}: {reason}", path.display())]
    Unreadable { path: PathBuf, reason: String },

    #[error("Secrets file {} holds an empty access token", .0.display())]
    EmptyToken(PathBuf),

    #[error("Invalid service account key: {0}")]
    InvalidKey(String),

    #[error("Token exchange failed: {0}")]
    Exchange(String),

    #[error("Access token expired")]
    Expired,
}

/// Bearer credentials for the Earth Engine REST API
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// OAuth2 access token with the earthengine scope
    pub access_token: String,

    /// Cloud project billed for the calls (falls back to the configured one)
    #[serde(default)]
    pub project: Option<String>,

    /// Token expiration timestamp (Unix seconds), if known
    #[serde(default)]
    pub expires_at: Option<i64>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .field("project", &self.project)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl Credentials {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            project: None,
            expires_at: None,
        }
    }

    /// Tokens without an expiry are assumed valid; the provider rejects them otherwise.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => chrono::Utc::now().timestamp() >= expires_at,
            None => false,
        }
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

/// Secret material as found in the environment or the secrets file.
#[derive(Debug, Clone)]
pub enum Secret {
    /// Ready-to-use access token
    Token(Credentials),
    /// Key that is exchanged for short-lived access tokens
    ServiceAccount(ServiceAccountKey),
}

/// Raw values of the credential environment variables.
#[derive(Debug, Clone, Default)]
pub struct SecretEnv {
    pub access_token: Option<String>,
    pub service_account_json: Option<String>,
    pub project: Option<String>,
}

impl SecretEnv {
    pub fn from_env() -> Self {
        Self {
            access_token: std::env::var(ACCESS_TOKEN_ENV).ok(),
            service_account_json: std::env::var(SERVICE_ACCOUNT_ENV).ok(),
            project: std::env::var(PROJECT_ENV).ok(),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Loads credentials from the environment first, then from a JSON secrets file.
///
/// The file holds either `{"access_token": ..}` or a service account key as
/// downloaded from the Cloud console.
pub struct SecretStore {
    secrets_path: PathBuf,
}

impl SecretStore {
    pub fn new(secrets_path: impl Into<PathBuf>) -> Self {
        Self {
            secrets_path: secrets_path.into(),
        }
    }

    pub fn secrets_path(&self) -> &Path {
        &self.secrets_path
    }

    /// Resolve the secret from `EE_ACCESS_TOKEN`, `EE_SERVICE_ACCOUNT_JSON`
    /// (in that order) or the secrets file. `EE_PROJECT` overrides the project.
    pub fn load(&self) -> Result<Secret, CredentialsError> {
        self.load_with(SecretEnv::from_env())
    }

    /// Same as [`load`](Self::load) with the environment passed in explicitly.
    pub fn load_with(&self, env: SecretEnv) -> Result<Secret, CredentialsError> {
        let env_project = non_blank(env.project);

        if let Some(token) = non_blank(env.access_token) {
            tracing::info!("Using Earth Engine token from {}", ACCESS_TOKEN_ENV);
            return Ok(Secret::Token(Credentials {
                access_token: token.trim().to_string(),
                project: env_project,
                expires_at: None,
            }));
        }

        let mut secret = match non_blank(env.service_account_json) {
            Some(json) => {
                tracing::info!("Using Earth Engine service account from {}", SERVICE_ACCOUNT_ENV);
                Secret::ServiceAccount(ServiceAccountKey::from_json(&json)?)
            }
            None => self.read_file()?,
        };

        if let Some(project) = env_project {
            match &mut secret {
                Secret::Token(credentials) => credentials.project = Some(project),
                Secret::ServiceAccount(key) => key.project_id = Some(project),
            }
        }
        Ok(secret)
    }

    fn read_file(&self) -> Result<Secret, CredentialsError> {
        let path = &self.secrets_path;

        let json = match fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CredentialsError::Missing(path.clone()));
            }
            Err(e) => {
                return Err(CredentialsError::Unreadable {
                    path: path.clone(),
                    reason: e.to_string(),
                });
            }
        };

        let unreadable = |e: serde_json::Error| CredentialsError::Unreadable {
            path: path.clone(),
            reason: e.to_string(),
        };

        let value: serde_json::Value = serde_json::from_str(&json).map_err(unreadable)?;
        if value.get("private_key").is_some() {
            let key: ServiceAccountKey = serde_json::from_value(value).map_err(unreadable)?;
            tracing::info!(
                "Loaded Earth Engine service account {} from {}",
                key.client_email,
                path.display()
            );
            return Ok(Secret::ServiceAccount(key));
        }

        let credentials: Credentials = serde_json::from_value(value).map_err(unreadable)?;
        if credentials.access_token.trim().is_empty() {
            return Err(CredentialsError::EmptyToken(path.clone()));
        }

        tracing::info!("Loaded Earth Engine credentials from {}", path.display());
        Ok(Secret::Token(credentials))
    }
}
