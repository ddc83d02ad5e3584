//! Sync operations.
//!
//! The three operations the trigger API exposes: full sync, cloud listing
//! and connectivity check. Each returns a `SyncEnvelope` that serialises
//! to the JSON body the API answers with.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::InventoryError;
use crate::ingest::spreadsheet::load_spreadsheet_if_exists;
use crate::record::ServerRecord;
use crate::source::connector::{FetchSummary, SourceConnector};
use crate::storage::store::ServerStore;

use super::context::RunContext;
use super::reconcile::{inventory_digest, reconcile};

/// Per-provenance counts of a reconciled pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconcileCounts {
    pub matched: usize,
    pub cloud_only: usize,
    pub spreadsheet_only: usize,
}

/// Connectivity probe result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectivityReport {
    pub instance_count: usize,
    pub subscriptions: Vec<String>,
}

/// Success / failure envelope around an operation's payload.
#[derive(Debug, Clone, Serialize)]
pub struct SyncEnvelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconciliation: Option<ReconcileCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch: Option<FetchSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub remediation: Vec<String>,
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
}

impl<T> SyncEnvelope<T> {
    fn success(run: &RunContext, message: String, data: T) -> Self {
        Self {
            success: true,
            message: Some(message),
            data: Some(data),
            count: None,
            digest: None,
            reconciliation: None,
            fetch: None,
            error: None,
            details: None,
            remediation: Vec::new(),
            run_id: run.run_id.clone(),
            timestamp: run.started_at,
        }
    }

    fn failure(run: &RunContext, error: &str, cause: &InventoryError) -> Self {
        Self {
            success: false,
            message: None,
            data: None,
            count: None,
            digest: None,
            reconciliation: None,
            fetch: None,
            error: Some(error.to_string()),
            details: Some(cause.to_string()),
            remediation: cause.remediation().into_iter().map(String::from).collect(),
            run_id: run.run_id.clone(),
            timestamp: run.started_at,
        }
    }
}

/// Full pass: fetch, normalize, reconcile, replace the stored set.
///
/// # Decision Chain
///
/// 1. Systemic fetch failure: failure envelope, store untouched
/// 2. Store failure: failure envelope
/// 3. Otherwise: success with the reconciled set, its counts and digest
pub async fn run_full_sync(
    connector: &SourceConnector,
    sheet_records: &[ServerRecord],
    store: &dyn ServerStore,
) -> SyncEnvelope<Vec<ServerRecord>> {
    let run = RunContext::new();
    let ctx = run.log_context();
    log::info!(
        "{} SYNC_START subscriptions={:?} spreadsheet_rows={}",
        ctx,
        connector.subscriptions(),
        sheet_records.len()
    );

    let report = match connector.fetch_all(&ctx).await {
        Ok(report) => report,
        Err(e) => {
            log::error!("{} SYNC_FAILED stage=fetch error={}", ctx, e);
            return SyncEnvelope::failure(&run, "Failed to sync with Azure", &e);
        }
    };

    let cloud = report.records(&ctx);
    let outcome = reconcile(&cloud, sheet_records, &run);
    let digest = inventory_digest(&outcome.records);

    if let Err(e) = store.replace_all(outcome.records.clone()).await {
        log::error!("{} SYNC_FAILED stage=store error={}", ctx, e);
        return SyncEnvelope::failure(&run, "Failed to store synced servers", &e);
    }

    let count = outcome.records.len();
    log::info!(
        "{} SYNC_COMPLETE count={} digest={}",
        ctx,
        count,
        &digest[..12]
    );

    let mut envelope = SyncEnvelope::success(
        &run,
        format!("Successfully synced {} VMs", count),
        outcome.records,
    );
    envelope.count = Some(count);
    envelope.digest = Some(digest);
    envelope.reconciliation = Some(ReconcileCounts {
        matched: outcome.matched,
        cloud_only: outcome.cloud_only,
        spreadsheet_only: outcome.spreadsheet_only,
    });
    envelope.fetch = Some(report.summary);
    envelope
}

/// Full pass with the spreadsheet read from disk. A missing file counts as
/// an empty spreadsheet; an unreadable one fails the pass.
pub async fn run_full_sync_from_path(
    connector: &SourceConnector,
    spreadsheet_path: &Path,
    store: &dyn ServerStore,
) -> SyncEnvelope<Vec<ServerRecord>> {
    match load_spreadsheet_if_exists(spreadsheet_path) {
        Ok(sheet) => run_full_sync(connector, &sheet, store).await,
        Err(e) => {
            let run = RunContext::new();
            log::error!(
                "{} SYNC_FAILED stage=spreadsheet path={} error={}",
                run.log_context(),
                spreadsheet_path.display(),
                e
            );
            SyncEnvelope::failure(&run, "Failed to read spreadsheet", &e)
        }
    }
}

/// Normalized cloud records without reconciliation or persistence.
pub async fn list_cloud_instances(connector: &SourceConnector) -> SyncEnvelope<Vec<ServerRecord>> {
    let run = RunContext::new();
    let ctx = run.log_context();

    match connector.fetch_all(&ctx).await {
        Ok(report) => {
            let records = report.records(&ctx);
            let count = records.len();
            let mut envelope =
                SyncEnvelope::success(&run, format!("Found {} VMs in Azure", count), records);
            envelope.count = Some(count);
            envelope.fetch = Some(report.summary);
            envelope
        }
        Err(e) => {
            log::error!("{} LIST_FAILED error={}", ctx, e);
            SyncEnvelope::failure(&run, "Failed to fetch VMs from Azure", &e)
        }
    }
}

/// Probe every configured subscription.
pub async fn test_connectivity(connector: &SourceConnector) -> SyncEnvelope<ConnectivityReport> {
    let run = RunContext::new();
    let ctx = run.log_context();
    let subscriptions = connector.subscriptions();

    match connector.fetch_all(&ctx).await {
        Ok(report) => {
            let instance_count = report.instances.len();
            log::info!(
                "{} CONNECTIVITY_OK instances={} subscriptions={}",
                ctx,
                instance_count,
                subscriptions.len()
            );
            let mut envelope = SyncEnvelope::success(
                &run,
                "Azure connection successful".to_string(),
                ConnectivityReport {
                    instance_count,
                    subscriptions,
                },
            );
            envelope.count = Some(instance_count);
            envelope.fetch = Some(report.summary);
            envelope
        }
        Err(e) => {
            log::error!("{} CONNECTIVITY_FAILED error={}", ctx, e);
            SyncEnvelope::failure(&run, "Azure connection failed", &e)
        }
    }
}
