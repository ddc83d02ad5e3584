//! Bearer-token credentials for the control plane.
//!
//! Two shapes are supported: a service principal (client id / secret /
//! tenant) and an ambient pre-acquired token.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;

use crate::config::{CredentialConfig, SyncConfig};
use crate::error::{InventoryError, Result};

/// Scope requested for management-plane tokens.
pub const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";

/// Refresh tokens this long before they expire.
const EXPIRY_SKEW: Duration = Duration::from_secs(120);

/// Anything that can authorize calls to a subscription.
#[async_trait]
pub trait TokenCredential: Send + Sync {
    async fn bearer_token(&self) -> Result<String>;

    /// Short description for logs.
    fn kind(&self) -> &'static str;
}

/// Pre-acquired token from the environment (or none at all).
pub struct AmbientCredential {
    token: Option<String>,
}

impl AmbientCredential {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

#[async_trait]
impl TokenCredential for AmbientCredential {
    async fn bearer_token(&self) -> Result<String> {
        self.token.clone().ok_or_else(|| {
            InventoryError::Credential(
                "no service principal configured and no ambient access token available".into(),
            )
        })
    }

    fn kind(&self) -> &'static str {
        "ambient"
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// OAuth2 client-credentials grant against the identity authority.
pub struct ClientSecretCredential {
    authority_host: String,
    tenant_id: String,
    client_id: String,
    client_secret: String,
    http: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

impl ClientSecretCredential {
    pub fn new(
        authority_host: &str,
        tenant_id: &str,
        client_id: &str,
        client_secret: &str,
        http: reqwest::Client,
    ) -> Self {
        Self {
            authority_host: authority_host.trim_end_matches('/').to_string(),
            tenant_id: tenant_id.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            http,
            cached: Mutex::new(None),
        }
    }

    fn cached_token(&self) -> Option<String> {
        let guard = self.cached.lock();
        guard
            .as_ref()
            .filter(|t| t.expires_at > Instant::now())
            .map(|t| t.value.clone())
    }
}

#[async_trait]
impl TokenCredential for ClientSecretCredential {
    async fn bearer_token(&self) -> Result<String> {
        if let Some(token) = self.cached_token() {
            return Ok(token);
        }

        let url = format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host, self.tenant_id
        );
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", MANAGEMENT_SCOPE),
        ];

        let response = self.http.post(&url).form(&form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InventoryError::Credential(format!(
                "token request rejected (HTTP {}): {}",
                status.as_u16(),
                body
            )));
        }

        let token: TokenResponse = response.json().await?;
        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(3600));
        *self.cached.lock() = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + lifetime.saturating_sub(EXPIRY_SKEW),
        });

        log::debug!(
            "TOKEN_ACQUIRED tenant={} expires_in_secs={}",
            self.tenant_id,
            lifetime.as_secs()
        );

        Ok(token.access_token)
    }

    fn kind(&self) -> &'static str {
        "client_secret"
    }
}

/// Build the credential selected by the configuration.
pub fn credential_from_config(
    config: &SyncConfig,
    http: reqwest::Client,
) -> Arc<dyn TokenCredential> {
    match &config.credential {
        CredentialConfig::ClientSecret {
            tenant_id,
            client_id,
            client_secret,
        } => {
            log::info!("CREDENTIAL_SELECTED kind=client_secret tenant={}", tenant_id);
            Arc::new(ClientSecretCredential::new(
                &config.authority_host,
                tenant_id,
                client_id,
                client_secret,
                http,
            ))
        }
        CredentialConfig::Default { access_token } => {
            log::info!(
                "CREDENTIAL_SELECTED kind=ambient token_present={}",
                access_token.is_some()
            );
            Arc::new(AmbientCredential::new(access_token.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ambient_without_token_is_credential_error() {
        let credential = AmbientCredential::new(None);
        let err = credential.bearer_token().await.unwrap_err();
        assert!(err.is_systemic());
        assert!(matches!(err, InventoryError::Credential(_)));
    }

    #[tokio::test]
    async fn test_ambient_with_token() {
        let credential = AmbientCredential::new(Some("abc".to_string()));
        assert_eq!(credential.bearer_token().await.unwrap(), "abc");
        assert_eq!(credential.kind(), "ambient");
    }

    #[test]
    fn test_cached_token_respects_expiry() {
        let credential = ClientSecretCredential::new(
            "https://login.example/",
            "tenant",
            "client",
            "secret",
            reqwest::Client::new(),
        );
        assert!(credential.cached_token().is_none());

        *credential.cached.lock() = Some(CachedToken {
            value: "tok".into(),
            expires_at: Instant::now() + Duration::from_secs(60),
        });
        assert_eq!(credential.cached_token().as_deref(), Some("tok"));

        *credential.cached.lock() = Some(CachedToken {
            value: "old".into(),
            expires_at: Instant::now(),
        });
        assert!(credential.cached_token().is_none());
    }

    #[test]
    fn test_authority_trailing_slash_trimmed() {
        let credential = ClientSecretCredential::new(
            "https://login.example/",
            "tenant",
            "client",
            "secret",
            reqwest::Client::new(),
        );
        assert_eq!(credential.authority_host, "https://login.example");
    }
}
