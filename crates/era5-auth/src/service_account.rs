//! Service account sign-in: an RS256 JWT-bearer assertion exchanged at the
//! Google token endpoint for a short-lived Earth Engine access token.

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::storage::{Credentials, CredentialsError};

pub const EARTH_ENGINE_SCOPE: &str = "https://www.googleapis.com/auth/earthengine";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Assertions are accepted for at most an hour.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// The fields of a Cloud console service account key that sign-in needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    /// Billing project for Earth Engine calls
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("project_id", &self.project_id)
            .finish()
    }
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self, CredentialsError> {
        serde_json::from_str(json).map_err(|e| CredentialsError::InvalidKey(e.to_string()))
    }

    pub fn token_url(&self) -> &str {
        self.token_uri.as_deref().unwrap_or(GOOGLE_TOKEN_URL)
    }

    /// Signed assertion issued at `now` (Unix seconds).
    pub fn assertion(&self, now: i64) -> Result<String, CredentialsError> {
        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .map_err(|e| CredentialsError::InvalidKey(e.to_string()))?;

        let mut header = Header::new(Algorithm::RS256);
        header.kid.clone_from(&self.private_key_id);

        let claims = Claims {
            iss: &self.client_email,
            scope: EARTH_ENGINE_SCOPE,
            aud: self.token_url(),
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };

        encode(&header, &claims, &key).map_err(|e| CredentialsError::InvalidKey(e.to_string()))
    }

    /// Trade a fresh assertion for an access token.
    #[tracing::instrument(skip(self, client), fields(account = %self.client_email), level = "info")]
    pub async fn exchange(&self, client: &reqwest::Client) -> Result<Credentials, CredentialsError> {
        let now = chrono::Utc::now().timestamp();
        let assertion = self.assertion(now)?;

        let response = client
            .post(self.token_url())
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| CredentialsError::Exchange(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(CredentialsError::Exchange(format!("{}: {}", status, error_text)));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| CredentialsError::Exchange(format!("bad token response: {}", e)))?;

        Ok(Credentials {
            access_token: token.access_token,
            project: self.project_id.clone(),
            expires_at: token.expires_in.map(|secs| now + secs),
        })
    }
}
