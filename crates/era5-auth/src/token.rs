use parking_lot::Mutex;

use crate::storage::{Credentials, CredentialsError, Secret};

/// Tokens this close to expiry are exchanged again before use.
const REFRESH_MARGIN_SECS: i64 = 60;

/// Hands out bearer credentials for a [`Secret`].
///
/// Plain tokens are returned as-is. Service account keys are exchanged on
/// first use and the resulting token is reused until it nears expiry.
pub struct TokenSource {
    secret: Secret,
    client: reqwest::Client,
    cached: Mutex<Option<Credentials>>,
}

impl TokenSource {
    pub fn new(secret: Secret) -> Self {
        Self {
            secret,
            client: reqwest::Client::new(),
            cached: Mutex::new(None),
        }
    }

    /// Credentials valid for the next request.
    pub async fn credentials(&self) -> Result<Credentials, CredentialsError> {
        let key = match &self.secret {
            Secret::Token(credentials) if credentials.is_expired() => {
                return Err(CredentialsError::Expired);
            }
            Secret::Token(credentials) => return Ok(credentials.clone()),
            Secret::ServiceAccount(key) => key,
        };

        let cached = self.cached.lock().clone();
        if let Some(credentials) = cached.filter(expires_later) {
            return Ok(credentials);
        }

        let fresh = key.exchange(&self.client).await?;
        *self.cached.lock() = Some(fresh.clone());
        Ok(fresh)
    }
}

impl From<Credentials> for TokenSource {
    fn from(credentials: Credentials) -> Self {
        Self::new(Secret::Token(credentials))
    }
}

fn expires_later(credentials: &Credentials) -> bool {
    match credentials.expires_at {
        Some(expires_at) => chrono::Utc::now().timestamp() + REFRESH_MARGIN_SECS < expires_at,
        None => true,
    }
}
