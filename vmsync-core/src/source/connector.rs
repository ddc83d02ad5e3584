//! Partial-failure-tolerant enumeration of cloud instances.
//!
//! Subscriptions are walked concurrently; resource groups and instances
//! within one subscription are walked in order. For each instance the detail
//! record and the runtime status view are fetched concurrently and joined
//! locally.
//!
//! Failure scopes:
//! - status view failure: instance kept with no status
//! - detail failure or missing detail: instance dropped
//! - instance listing failure: resource group skipped
//! - resource group listing failure: subscription skipped
//! - systemic failure (credential, unreachable) on every subscription,
//!   e.g. a token that cannot be acquired: pass aborted

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;

use crate::error::{InventoryError, Result};
use crate::extraction::normalize::normalize_instance;
use crate::logging::structured::LogContext;
use crate::record::ServerRecord;
use crate::{log_debug, log_error, log_info, log_warn};

use super::arm::SubscriptionClients;
use super::client::{ComputeClient, InstanceView, RawInstance};

/// One raw instance with its owning subscription and optional status.
#[derive(Debug, Clone)]
pub struct FetchedInstance {
    pub subscription_id: String,
    pub instance: RawInstance,
    pub view: Option<InstanceView>,
}

/// What was skipped during a pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FetchSummary {
    pub subscriptions_total: usize,
    pub subscriptions_skipped: usize,
    pub resource_groups_skipped: usize,
    pub instances_dropped: usize,
    pub instances_without_status: usize,
}

impl FetchSummary {
    fn absorb(&mut self, other: &FetchSummary) {
        self.subscriptions_skipped += other.subscriptions_skipped;
        self.resource_groups_skipped += other.resource_groups_skipped;
        self.instances_dropped += other.instances_dropped;
        self.instances_without_status += other.instances_without_status;
    }
}

/// Best-effort aggregate of one pass.
#[derive(Debug, Clone, Default)]
pub struct FetchReport {
    pub instances: Vec<FetchedInstance>,
    pub summary: FetchSummary,
}

/// Enumerates instances across the subscriptions it was built with.
pub struct SourceConnector {
    clients: SubscriptionClients,
}

impl SourceConnector {
    pub fn new(clients: SubscriptionClients) -> Self {
        Self { clients }
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.clients.subscription_ids()
    }

    /// Fetch every reachable instance.
    ///
    /// # Decision Chain
    ///
    /// 1. A subscription that fails for any reason is skipped and counted
    /// 2. If every subscription failed with a systemic error (rejected
    ///    credential, unreachable control plane) the pass is aborted with
    ///    the first such error
    /// 3. Otherwise the surviving subscriptions are returned in order
    pub async fn fetch_all(&self, ctx: &LogContext) -> Result<FetchReport> {
        log_info!(
            ctx,
            "FETCH_START",
            subscriptions = self.clients.subscription_ids()
        );

        let per_subscription = self.clients.iter().map(|(subscription_id, client)| {
            let sub_ctx = ctx.with_subscription(subscription_id);
            let client = Arc::clone(client);
            let subscription_id = subscription_id.to_string();
            async move {
                let result = fetch_subscription(&subscription_id, client.as_ref(), &sub_ctx).await;
                (sub_ctx, result)
            }
        });

        let results = join_all(per_subscription).await;

        let mut aggregate = FetchReport {
            instances: Vec::new(),
            summary: FetchSummary {
                subscriptions_total: self.clients.len(),
                ..Default::default()
            },
        };
        let mut systemic_failures = 0usize;
        let mut first_systemic: Option<InventoryError> = None;

        for (sub_ctx, result) in results {
            match result {
                Ok(report) => {
                    log_info!(
                        sub_ctx,
                        "SUBSCRIPTION_COMPLETE",
                        instances = report.instances.len()
                    );
                    aggregate.summary.absorb(&report.summary);
                    aggregate.instances.extend(report.instances);
                }
                Err(e) if e.is_systemic() => {
                    log_error!(sub_ctx, "SUBSCRIPTION_SKIPPED", systemic = true, error = e.to_string());
                    aggregate.summary.subscriptions_skipped += 1;
                    systemic_failures += 1;
                    if first_systemic.is_none() {
                        first_systemic = Some(e);
                    }
                }
                Err(e) => {
                    log_warn!(sub_ctx, "SUBSCRIPTION_SKIPPED", systemic = false, error = e.to_string());
                    aggregate.summary.subscriptions_skipped += 1;
                }
            }
        }

        if systemic_failures > 0 && systemic_failures == self.clients.len() {
            if let Some(e) = first_systemic {
                log_error!(ctx, "FETCH_ABORTED", subscriptions_failed = systemic_failures);
                return Err(e);
            }
        }

        log_info!(
            ctx,
            "FETCH_COMPLETE",
            instances = aggregate.instances.len(),
            subscriptions_skipped = aggregate.summary.subscriptions_skipped,
            resource_groups_skipped = aggregate.summary.resource_groups_skipped,
            instances_dropped = aggregate.summary.instances_dropped,
        );

        Ok(aggregate)
    }

    /// Fetch and normalize into canonical records.
    pub async fn fetch_records(&self, ctx: &LogContext) -> Result<Vec<ServerRecord>> {
        Ok(self.fetch_all(ctx).await?.records(ctx))
    }
}

impl FetchReport {
    /// Normalize every fetched instance. Nameless instances are dropped.
    pub fn records(&self, ctx: &LogContext) -> Vec<ServerRecord> {
        self.instances
            .iter()
            .filter_map(|fetched| {
                normalize_instance(
                    &fetched.subscription_id,
                    &fetched.instance,
                    fetched.view.as_ref(),
                    ctx,
                )
            })
            .collect()
    }
}

async fn fetch_subscription(
    subscription_id: &str,
    client: &dyn ComputeClient,
    ctx: &LogContext,
) -> Result<FetchReport> {
    let resource_groups = client.list_resource_groups().await?;
    log_info!(ctx, "RESOURCE_GROUPS_FOUND", count = resource_groups.len());

    let mut report = FetchReport::default();

    for resource_group in &resource_groups {
        let rg_ctx = ctx.with_resource_group(resource_group);

        let summaries = match client.list_instances(resource_group).await {
            Ok(summaries) => summaries,
            Err(e) => {
                log_warn!(rg_ctx, "RESOURCE_GROUP_SKIPPED", error = e.to_string());
                report.summary.resource_groups_skipped += 1;
                continue;
            }
        };

        for summary in summaries {
            if summary.name.is_empty() {
                log_warn!(rg_ctx, "INSTANCE_DROPPED", reason = "empty name");
                report.summary.instances_dropped += 1;
                continue;
            }

            match fetch_instance(client, resource_group, &summary.name, &rg_ctx).await {
                Some((instance, view)) => {
                    if view.is_none() {
                        report.summary.instances_without_status += 1;
                    }
                    report.instances.push(FetchedInstance {
                        subscription_id: subscription_id.to_string(),
                        instance,
                        view,
                    });
                }
                None => report.summary.instances_dropped += 1,
            }
        }
    }

    Ok(report)
}

/// Detail and status for one instance, fetched concurrently.
///
/// `None` means the instance is dropped; status failures only degrade.
async fn fetch_instance(
    client: &dyn ComputeClient,
    resource_group: &str,
    name: &str,
    ctx: &LogContext,
) -> Option<(RawInstance, Option<InstanceView>)> {
    let (detail, view) = tokio::join!(
        client.get_instance(resource_group, name),
        client.get_instance_view(resource_group, name)
    );

    let instance = match detail {
        Ok(Some(instance)) => instance,
        Ok(None) => {
            log_warn!(ctx, "INSTANCE_DROPPED", instance = name, reason = "detail not found");
            return None;
        }
        Err(e) => {
            log_warn!(ctx, "INSTANCE_DROPPED", instance = name, reason = e.to_string());
            return None;
        }
    };

    let view = match view {
        Ok(view) => Some(view),
        Err(e) => {
            log_debug!(ctx, "INSTANCE_STATUS_UNAVAILABLE", instance = name, error = e.to_string());
            None
        }
    };

    Some((instance, view))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;

    use async_trait::async_trait;
    use serde_json::json;

    use crate::error::InventoryError;
    use crate::record::PowerStatus;

    /// In-memory control plane for one subscription.
    #[derive(Default)]
    pub(crate) struct FakeCompute {
        pub groups: Vec<(String, Vec<RawInstance>)>,
        pub views: HashMap<String, InstanceView>,
        pub fail_groups: Option<fn() -> InventoryError>,
        pub fail_listing: Vec<String>,
        pub fail_detail: Vec<String>,
        pub timeout_detail: Vec<String>,
        pub systemic: bool,
    }

    pub(crate) fn instance(subscription: &str, rg: &str, name: &str, tags: serde_json::Value) -> RawInstance {
        serde_json::from_value(json!({
            "id": format!("/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Compute/virtualMachines/{}", subscription, rg, name),
            "name": name,
            "location": "westeurope",
            "tags": tags,
            "properties": {"hardwareProfile": {"vmSize": "Standard_B2s"}}
        }))
        .unwrap()
    }

    pub(crate) fn view(code: &str) -> InstanceView {
        serde_json::from_value(json!({"statuses": [{"code": code}]})).unwrap()
    }

    impl FakeCompute {
        pub(crate) fn with_group(mut self, rg: &str, instances: Vec<RawInstance>) -> Self {
            self.groups.push((rg.to_string(), instances));
            self
        }

        pub(crate) fn with_view(mut self, name: &str, code: &str) -> Self {
            self.views.insert(name.to_string(), view(code));
            self
        }
    }

    #[async_trait]
    impl ComputeClient for FakeCompute {
        async fn list_resource_groups(&self) -> Result<Vec<String>> {
            if self.systemic {
                return Err(InventoryError::Credential("token rejected".into()));
            }
            if let Some(make_err) = self.fail_groups {
                return Err(make_err());
            }
            Ok(self.groups.iter().map(|(rg, _)| rg.clone()).collect())
        }

        async fn list_instances(&self, resource_group: &str) -> Result<Vec<RawInstance>> {
            if self.fail_listing.iter().any(|rg| rg == resource_group) {
                return Err(InventoryError::Api {
                    status: 500,
                    message: "listing failed".into(),
                });
            }
            Ok(self
                .groups
                .iter()
                .find(|(rg, _)| rg == resource_group)
                .map(|(_, instances)| instances.clone())
                .unwrap_or_default())
        }

        async fn get_instance(&self, resource_group: &str, name: &str) -> Result<Option<RawInstance>> {
            if self.timeout_detail.iter().any(|n| n == name) {
                return Err(InventoryError::Unreachable("operation timed out".into()));
            }
            if self.fail_detail.iter().any(|n| n == name) {
                return Err(InventoryError::Api {
                    status: 500,
                    message: "detail failed".into(),
                });
            }
            Ok(self
                .groups
                .iter()
                .find(|(rg, _)| rg == resource_group)
                .and_then(|(_, instances)| instances.iter().find(|i| i.name == name).cloned()))
        }

        async fn get_instance_view(&self, _resource_group: &str, name: &str) -> Result<InstanceView> {
            self.views.get(name).cloned().ok_or_else(|| InventoryError::Api {
                status: 409,
                message: "view unavailable".into(),
            })
        }
    }

    fn api_failure() -> InventoryError {
        InventoryError::Api {
            status: 500,
            message: "resource groups unavailable".into(),
        }
    }

    fn ctx() -> LogContext {
        LogContext::new("test-run")
    }

    #[tokio::test]
    async fn test_partial_subscription_failure_is_contained() {
        let a = FakeCompute::default()
            .with_group("rg-a", vec![instance("A", "rg-a", "vm-a1", json!({}))])
            .with_view("vm-a1", "PowerState/running");
        let b = FakeCompute {
            fail_groups: Some(api_failure),
            ..Default::default()
        };
        let c = FakeCompute::default()
            .with_group("rg-c", vec![instance("C", "rg-c", "vm-c1", json!({}))]);

        let connector = SourceConnector::new(
            SubscriptionClients::new()
                .with("A", Arc::new(a))
                .with("B", Arc::new(b))
                .with("C", Arc::new(c)),
        );

        let report = connector.fetch_all(&ctx()).await.unwrap();
        let subs: Vec<&str> = report
            .instances
            .iter()
            .map(|f| f.subscription_id.as_str())
            .collect();
        assert_eq!(subs.len(), 2);
        assert!(subs.contains(&"A"));
        assert!(subs.contains(&"C"));
        assert!(!subs.contains(&"B"));
        assert_eq!(report.summary.subscriptions_skipped, 1);
        assert_eq!(report.summary.subscriptions_total, 3);
    }

    #[tokio::test]
    async fn test_resource_group_failure_skips_only_that_group() {
        let client = FakeCompute {
            fail_listing: vec!["rg-bad".to_string()],
            ..Default::default()
        }
        .with_group("rg-bad", vec![instance("S", "rg-bad", "vm-x", json!({}))])
        .with_group("rg-good", vec![instance("S", "rg-good", "vm-y", json!({}))]);

        let connector = SourceConnector::new(SubscriptionClients::new().with("S", Arc::new(client)));
        let report = connector.fetch_all(&ctx()).await.unwrap();

        assert_eq!(report.instances.len(), 1);
        assert_eq!(report.instances[0].instance.name, "vm-y");
        assert_eq!(report.summary.resource_groups_skipped, 1);
    }

    #[tokio::test]
    async fn test_detail_failure_drops_instance_status_failure_degrades() {
        let client = FakeCompute {
            fail_detail: vec!["vm-broken".to_string()],
            ..Default::default()
        }
        .with_group(
            "rg",
            vec![
                instance("S", "rg", "vm-broken", json!({})),
                instance("S", "rg", "vm-nostatus", json!({})),
            ],
        );

        let connector = SourceConnector::new(SubscriptionClients::new().with("S", Arc::new(client)));
        let report = connector.fetch_all(&ctx()).await.unwrap();

        assert_eq!(report.instances.len(), 1);
        assert_eq!(report.instances[0].instance.name, "vm-nostatus");
        assert!(report.instances[0].view.is_none());
        assert_eq!(report.summary.instances_dropped, 1);
        assert_eq!(report.summary.instances_without_status, 1);
    }

    fn forbidden() -> InventoryError {
        InventoryError::Credential("HTTP 403: AuthorizationFailed".into())
    }

    #[tokio::test]
    async fn test_forbidden_subscription_is_contained() {
        let a = FakeCompute::default()
            .with_group("rg", vec![instance("A", "rg", "vm-a", json!({}))]);
        let b = FakeCompute {
            fail_groups: Some(forbidden),
            ..Default::default()
        };
        let c = FakeCompute::default()
            .with_group("rg", vec![instance("C", "rg", "vm-c", json!({}))]);

        let connector = SourceConnector::new(
            SubscriptionClients::new()
                .with("A", Arc::new(a))
                .with("B", Arc::new(b))
                .with("C", Arc::new(c)),
        );

        let report = connector.fetch_all(&ctx()).await.unwrap();
        let names: Vec<&str> = report
            .instances
            .iter()
            .map(|f| f.instance.name.as_str())
            .collect();
        assert_eq!(names, vec!["vm-a", "vm-c"]);
        assert_eq!(report.summary.subscriptions_skipped, 1);
    }

    #[tokio::test]
    async fn test_instance_timeout_drops_only_that_instance() {
        let client = FakeCompute {
            timeout_detail: vec!["slow".to_string()],
            ..Default::default()
        }
        .with_group(
            "rg",
            vec![
                instance("S", "rg", "ok1", json!({})),
                instance("S", "rg", "slow", json!({})),
                instance("S", "rg", "ok2", json!({})),
            ],
        );

        let connector = SourceConnector::new(SubscriptionClients::new().with("S", Arc::new(client)));
        let report = connector.fetch_all(&ctx()).await.unwrap();

        let names: Vec<&str> = report
            .instances
            .iter()
            .map(|f| f.instance.name.as_str())
            .collect();
        assert_eq!(names, vec!["ok1", "ok2"]);
        assert_eq!(report.summary.instances_dropped, 1);
    }

    #[tokio::test]
    async fn test_systemic_failure_on_one_subscription_is_contained() {
        let healthy = FakeCompute::default()
            .with_group("rg", vec![instance("A", "rg", "vm-a", json!({}))]);
        let rejected = FakeCompute {
            systemic: true,
            ..Default::default()
        };

        let connector = SourceConnector::new(
            SubscriptionClients::new()
                .with("A", Arc::new(healthy))
                .with("B", Arc::new(rejected)),
        );

        let report = connector.fetch_all(&ctx()).await.unwrap();
        assert_eq!(report.instances.len(), 1);
        assert_eq!(report.summary.subscriptions_skipped, 1);
    }

    #[tokio::test]
    async fn test_systemic_failure_everywhere_aborts_pass() {
        let rejected = || FakeCompute {
            systemic: true,
            ..Default::default()
        };

        let connector = SourceConnector::new(
            SubscriptionClients::new()
                .with("A", Arc::new(rejected()))
                .with("B", Arc::new(rejected())),
        );

        let err = connector.fetch_all(&ctx()).await.unwrap_err();
        assert!(matches!(err, InventoryError::Credential(_)));
    }

    #[tokio::test]
    async fn test_mixed_non_systemic_failures_do_not_abort() {
        let rejected = FakeCompute {
            systemic: true,
            ..Default::default()
        };
        let broken = FakeCompute {
            fail_groups: Some(api_failure),
            ..Default::default()
        };

        let connector = SourceConnector::new(
            SubscriptionClients::new()
                .with("A", Arc::new(rejected))
                .with("B", Arc::new(broken)),
        );

        let report = connector.fetch_all(&ctx()).await.unwrap();
        assert!(report.instances.is_empty());
        assert_eq!(report.summary.subscriptions_skipped, 2);
    }

    #[tokio::test]
    async fn test_fetch_records_normalizes() {
        let client = FakeCompute::default()
            .with_group(
                "rg-app",
                vec![instance("DDD-DV", "rg-app", "app01", json!({"Owner": "teamA"}))],
            )
            .with_view("app01", "PowerState/deallocated");

        let connector =
            SourceConnector::new(SubscriptionClients::new().with("DDD-DV", Arc::new(client)));
        let records = connector.fetch_records(&ctx()).await.unwrap();

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.computer_name, "app01");
        assert_eq!(record.power_status, PowerStatus::Inactive);
        assert_eq!(record.raw_power_state, "deallocated");
        assert_eq!(record.environment, "DV");
        assert_eq!(record.owner, "teamA");
        assert_eq!(record.resource_group, "rg-app");
        assert_eq!(record.subscription_id, "DDD-DV");
    }
}
