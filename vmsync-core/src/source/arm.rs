//! Azure Resource Manager REST client.
//!
//! One `ArmComputeClient` per subscription. List operations follow
//! `nextLink` paging until exhausted.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::SyncConfig;
use crate::error::{InventoryError, Result};

use super::client::{ComputeClient, InstanceView, RawInstance};
use super::credential::{credential_from_config, TokenCredential};

pub const RESOURCE_GROUPS_API_VERSION: &str = "2021-04-01";
pub const COMPUTE_API_VERSION: &str = "2023-03-01";

/// Hard stop for runaway `nextLink` chains.
const MAX_PAGES: usize = 1000;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Page<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
    #[serde(default)]
    next_link: Option<String>,
}

#[derive(Deserialize)]
struct NamedResource {
    name: String,
}

#[derive(Deserialize)]
struct ArmErrorBody {
    error: Option<ArmErrorDetail>,
}

#[derive(Deserialize)]
struct ArmErrorDetail {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Resource Manager client scoped to one subscription.
pub struct ArmComputeClient {
    endpoint: String,
    subscription_id: String,
    credential: Arc<dyn TokenCredential>,
    http: reqwest::Client,
}

impl ArmComputeClient {
    pub fn new(
        endpoint: &str,
        subscription_id: &str,
        credential: Arc<dyn TokenCredential>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            subscription_id: subscription_id.to_string(),
            credential,
            http,
        }
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    fn subscription_url(&self) -> String {
        format!("{}/subscriptions/{}", self.endpoint, self.subscription_id)
    }

    fn vm_url(&self, resource_group: &str, name: &str) -> String {
        format!(
            "{}/resourceGroups/{}/providers/Microsoft.Compute/virtualMachines/{}",
            self.subscription_url(),
            resource_group,
            name
        )
    }

    /// GET a URL; `Ok(None)` on 404.
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>> {
        let token = self.credential.bearer_token().await?;
        let response = self.http.get(url).bearer_auth(token).send().await?;
        let status = response.status();

        if status.as_u16() == 404 {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = describe_error_body(&body);
            return Err(match status.as_u16() {
                401 | 403 => InventoryError::Credential(format!(
                    "HTTP {} from {}: {}",
                    status.as_u16(),
                    url,
                    message
                )),
                code => InventoryError::Api {
                    status: code,
                    message,
                },
            });
        }

        let bytes = response.bytes().await?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn get_paged<T: DeserializeOwned>(&self, first_url: String) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(first_url);
        let mut pages = 0;

        while let Some(url) = next.take() {
            pages += 1;
            if pages > MAX_PAGES {
                return Err(InventoryError::Decode(format!(
                    "paging exceeded {} pages at {}",
                    MAX_PAGES, url
                )));
            }
            let page: Page<T> = self.get_json(&url).await?.ok_or_else(|| InventoryError::Api {
                status: 404,
                message: format!("{} not found", url),
            })?;
            items.extend(page.value);
            next = page.next_link.filter(|link| !link.is_empty());
        }

        Ok(items)
    }
}

fn describe_error_body(body: &str) -> String {
    match serde_json::from_str::<ArmErrorBody>(body) {
        Ok(ArmErrorBody {
            error: Some(detail),
        }) => format!("{}: {}", detail.code, detail.message),
        _ => body.chars().take(300).collect(),
    }
}

#[async_trait]
impl ComputeClient for ArmComputeClient {
    async fn list_resource_groups(&self) -> Result<Vec<String>> {
        let url = format!(
            "{}/resourcegroups?api-version={}",
            self.subscription_url(),
            RESOURCE_GROUPS_API_VERSION
        );
        let groups: Vec<NamedResource> = self.get_paged(url).await?;
        Ok(groups.into_iter().map(|g| g.name).collect())
    }

    async fn list_instances(&self, resource_group: &str) -> Result<Vec<RawInstance>> {
        let url = format!(
            "{}/resourceGroups/{}/providers/Microsoft.Compute/virtualMachines?api-version={}",
            self.subscription_url(),
            resource_group,
            COMPUTE_API_VERSION
        );
        self.get_paged(url).await
    }

    async fn get_instance(&self, resource_group: &str, name: &str) -> Result<Option<RawInstance>> {
        let url = format!(
            "{}?api-version={}",
            self.vm_url(resource_group, name),
            COMPUTE_API_VERSION
        );
        self.get_json(&url).await
    }

    async fn get_instance_view(&self, resource_group: &str, name: &str) -> Result<InstanceView> {
        let url = format!(
            "{}/instanceView?api-version={}",
            self.vm_url(resource_group, name),
            COMPUTE_API_VERSION
        );
        self.get_json(&url).await?.ok_or_else(|| InventoryError::Api {
            status: 404,
            message: format!("instance view for {} not found", name),
        })
    }
}

/// Caller-owned, ordered mapping of subscription id to client.
#[derive(Clone, Default)]
pub struct SubscriptionClients {
    entries: Vec<(String, Arc<dyn ComputeClient>)>,
}

impl SubscriptionClients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the client for a subscription.
    pub fn insert(&mut self, subscription_id: &str, client: Arc<dyn ComputeClient>) {
        match self.entries.iter_mut().find(|(id, _)| id == subscription_id) {
            Some(entry) => entry.1 = client,
            None => self.entries.push((subscription_id.to_string(), client)),
        }
    }

    pub fn with(mut self, subscription_id: &str, client: Arc<dyn ComputeClient>) -> Self {
        self.insert(subscription_id, client);
        self
    }

    pub fn get(&self, subscription_id: &str) -> Option<&Arc<dyn ComputeClient>> {
        self.entries
            .iter()
            .find(|(id, _)| id == subscription_id)
            .map(|(_, client)| client)
    }

    pub fn subscription_ids(&self) -> Vec<String> {
        self.entries.iter().map(|(id, _)| id.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn ComputeClient>)> {
        self.entries.iter().map(|(id, client)| (id.as_str(), client))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One Resource Manager client per configured subscription, sharing a
    /// single credential and HTTP connection pool.
    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| InventoryError::Config(format!("HTTP client: {}", e)))?;
        let credential = credential_from_config(config, http.clone());

        let mut clients = Self::new();
        for subscription_id in &config.subscriptions {
            let client = ArmComputeClient::new(
                &config.management_endpoint,
                subscription_id,
                credential.clone(),
                http.clone(),
            );
            clients.insert(subscription_id, Arc::new(client));
        }
        Ok(clients)
    }
}
