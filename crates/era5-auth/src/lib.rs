//! Earth Engine credentials, supplied out-of-band through the environment or
//! a secrets file, either as a ready access token or a service account key.

pub mod service_account;
pub mod storage;
pub mod token;

pub use service_account::ServiceAccountKey;
pub use storage::{Credentials, CredentialsError, Secret, SecretEnv, SecretStore};
pub use token::TokenSource;
