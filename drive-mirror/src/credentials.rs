//! Google service-account credentials and access-token acquisition.
//!
//! The key comes from the environment:
//! - `GOOGLE_CREDENTIALS_JSON`: the service-account key as inline JSON, or
//! - `GOOGLE_KEY_FILE`: a path to the key file (inline JSON is accepted here too).
//!
//! Tokens are minted through `yup-oauth2`'s service-account flow, which caches
//! and refreshes them internally.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, info};
use yup_oauth2::authenticator::Authenticator;
use yup_oauth2::hyper::client::HttpConnector;
use yup_oauth2::hyper_rustls::HttpsConnector;
use yup_oauth2::ServiceAccountKey;

pub const KEY_FILE_ENV: &str = "GOOGLE_KEY_FILE";
pub const CREDENTIALS_JSON_ENV: &str = "GOOGLE_CREDENTIALS_JSON";

pub const DRIVE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// Supplies bearer tokens for API requests.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// A fixed token, for pre-minted credentials and tests.
pub struct StaticToken(pub String);

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Where a service-account key is read from.
#[derive(Debug, PartialEq, Eq)]
pub enum KeySource {
    Inline(String),
    File(PathBuf),
}

impl KeySource {
    /// Values starting with `{` are inline JSON, anything else is a path.
    pub fn from_value(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.starts_with('{') {
            KeySource::Inline(trimmed.to_string())
        } else {
            KeySource::File(PathBuf::from(trimmed))
        }
    }

    pub fn from_env() -> Result<Self> {
        if let Ok(inline) = std::env::var(CREDENTIALS_JSON_ENV) {
            if !inline.trim().is_empty() {
                return Ok(KeySource::Inline(inline));
            }
        }
        match std::env::var(KEY_FILE_ENV) {
            Ok(value) if !value.trim().is_empty() => Ok(KeySource::from_value(&value)),
            _ => Err(anyhow!(
                "no Google credentials: set {CREDENTIALS_JSON_ENV} or {KEY_FILE_ENV}"
            )),
        }
    }

    pub async fn load(&self) -> Result<ServiceAccountKey> {
        match self {
            KeySource::Inline(json) => {
                debug!("Parsing inline service account key");
                yup_oauth2::parse_service_account_key(json)
                    .context("Failed to parse inline service account key")
            }
            KeySource::File(path) => {
                debug!(path = %path.display(), "Reading service account key file");
                yup_oauth2::read_service_account_key(path)
                    .await
                    .with_context(|| format!("Failed to read service account key {path:?}"))
            }
        }
    }
}

/// Tokens minted for a service account with a fixed scope set.
pub struct ServiceAccountTokens {
    auth: Authenticator<HttpsConnector<HttpConnector>>,
    scopes: Vec<String>,
}

impl ServiceAccountTokens {
    pub async fn from_env(scope: &str) -> Result<Self> {
        let key = KeySource::from_env()?.load().await?;
        Self::from_key(key, scope).await
    }

    pub async fn from_key(key: ServiceAccountKey, scope: &str) -> Result<Self> {
        let client_email = key.client_email.clone();
        let auth = yup_oauth2::ServiceAccountAuthenticator::builder(key)
            .build()
            .await
            .context("Failed to build service account authenticator")?;
        info!(client_email = %client_email, scope, "Service account authenticator ready");
        Ok(Self {
            auth,
            scopes: vec![scope.to_string()],
        })
    }
}

#[async_trait]
impl TokenSource for ServiceAccountTokens {
    async fn access_token(&self) -> Result<String> {
        let token = self
            .auth
            .token(&self.scopes)
            .await
            .context("Failed to obtain access token")?;
        token
            .token()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("token response carried no access token"))
    }
}
