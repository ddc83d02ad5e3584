//! Environment-driven configuration.
//!
//! Values come from the process environment after loading an optional
//! `.env` file. Defaults live here as constants.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{InventoryError, Result};

pub const ENV_SUBSCRIPTIONS: &str = "AZURE_SUBSCRIPTIONS";
pub const ENV_TENANT_ID: &str = "AZURE_TENANT_ID";
pub const ENV_CLIENT_ID: &str = "AZURE_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "AZURE_CLIENT_SECRET";
pub const ENV_ACCESS_TOKEN: &str = "AZURE_ACCESS_TOKEN";
pub const ENV_MANAGEMENT_ENDPOINT: &str = "AZURE_MANAGEMENT_ENDPOINT";
pub const ENV_AUTHORITY_HOST: &str = "AZURE_AUTHORITY_HOST";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "AZURE_REQUEST_TIMEOUT_SECS";
pub const ENV_SPREADSHEET_PATH: &str = "SPREADSHEET_PATH";
pub const ENV_ENABLE_AUTO_SYNC: &str = "ENABLE_AUTO_SYNC";
pub const ENV_SYNC_INTERVAL_MINUTES: &str = "AZURE_SYNC_INTERVAL_MINUTES";

pub const DEFAULT_SUBSCRIPTIONS: &[&str] = &["DDD-DV", "DSP-Infra-PR", "CAS-CALAB-DV"];
pub const DEFAULT_MANAGEMENT_ENDPOINT: &str = "https://management.azure.com";
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SPREADSHEET_PATH: &str = "./data.csv";
pub const DEFAULT_SYNC_INTERVAL_MINUTES: u32 = 15;

/// How calls to the control plane are authorized.
#[derive(Debug, Clone, PartialEq)]
pub enum CredentialConfig {
    /// Service principal triple.
    ClientSecret {
        tenant_id: String,
        client_id: String,
        client_secret: String,
    },
    /// Ambient credential chain; a pre-acquired bearer token if one is set.
    Default { access_token: Option<String> },
}

/// Complete configuration for a sync deployment.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub subscriptions: Vec<String>,
    pub credential: CredentialConfig,
    pub management_endpoint: String,
    pub authority_host: String,
    pub request_timeout: Duration,
    pub spreadsheet_path: PathBuf,
    /// Read by the external scheduler only.
    pub auto_sync: bool,
    pub sync_interval_minutes: u32,
}

impl SyncConfig {
    /// Load `.env` (if present) and build config from the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let subscriptions = match get(ENV_SUBSCRIPTIONS) {
            Some(raw) => parse_subscriptions(&raw),
            None => DEFAULT_SUBSCRIPTIONS.iter().map(|s| s.to_string()).collect(),
        };
        if subscriptions.is_empty() {
            return Err(InventoryError::Config(format!(
                "{} contains no subscription ids",
                ENV_SUBSCRIPTIONS
            )));
        }

        let credential = match (get(ENV_TENANT_ID), get(ENV_CLIENT_ID), get(ENV_CLIENT_SECRET)) {
            (Some(tenant_id), Some(client_id), Some(client_secret)) => {
                CredentialConfig::ClientSecret {
                    tenant_id,
                    client_id,
                    client_secret,
                }
            }
            _ => CredentialConfig::Default {
                access_token: get(ENV_ACCESS_TOKEN),
            },
        };

        let request_timeout_secs = match get(ENV_REQUEST_TIMEOUT_SECS) {
            Some(raw) => parse_number::<u64>(ENV_REQUEST_TIMEOUT_SECS, &raw)?,
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        let sync_interval_minutes = match get(ENV_SYNC_INTERVAL_MINUTES) {
            Some(raw) => parse_number::<u32>(ENV_SYNC_INTERVAL_MINUTES, &raw)?,
            None => DEFAULT_SYNC_INTERVAL_MINUTES,
        };

        Ok(Self {
            subscriptions,
            credential,
            management_endpoint: get(ENV_MANAGEMENT_ENDPOINT)
                .unwrap_or_else(|| DEFAULT_MANAGEMENT_ENDPOINT.to_string()),
            authority_host: get(ENV_AUTHORITY_HOST)
                .unwrap_or_else(|| DEFAULT_AUTHORITY_HOST.to_string()),
            request_timeout: Duration::from_secs(request_timeout_secs),
            spreadsheet_path: PathBuf::from(
                get(ENV_SPREADSHEET_PATH).unwrap_or_else(|| DEFAULT_SPREADSHEET_PATH.to_string()),
            ),
            auto_sync: get(ENV_ENABLE_AUTO_SYNC).as_deref() == Some("true"),
            sync_interval_minutes,
        })
    }
}

fn parse_subscriptions(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.parse::<T>()
        .map_err(|_| InventoryError::Config(format!("{} must be a number, got {:?}", key, raw)))
}
