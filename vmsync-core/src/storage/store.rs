//! Replace-all persistence and the read side the dashboard needs.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;

use crate::error::Result;
use crate::record::{PowerStatus, ServerRecord};

use super::models::ServerFilter;

/// Destination for a completed reconciliation.
///
/// `replace_all` is atomic from a reader's point of view: either the old
/// set or the new set is visible, never a mix.
#[async_trait]
pub trait ServerStore: Send + Sync {
    async fn replace_all(&self, records: Vec<ServerRecord>) -> Result<()>;

    /// Every stored record, ordered by name.
    async fn all(&self) -> Result<Vec<ServerRecord>>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServerStats {
    pub total: usize,
    pub active: usize,
    pub scheduled: usize,
    pub inactive: usize,
    pub unknown: usize,
    pub not_found: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterOptions {
    pub environments: Vec<String>,
    pub applications: Vec<String>,
    pub owners: Vec<String>,
}

/// Process-local store. Used by tests and by embedders that keep the
/// inventory in memory.
#[derive(Default)]
pub struct InMemoryStore {
    records: RwLock<Vec<ServerRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<ServerRecord> {
        self.records.read().clone()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Matching records ordered by name.
    pub fn search(&self, filter: &ServerFilter) -> Vec<ServerRecord> {
        let mut hits: Vec<ServerRecord> = self
            .records
            .read()
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        hits.sort_by(|a, b| a.computer_name.cmp(&b.computer_name));
        hits
    }

    pub fn stats(&self) -> ServerStats {
        let records = self.records.read();
        let mut stats = ServerStats {
            total: records.len(),
            ..Default::default()
        };
        for record in records.iter() {
            match record.power_status {
                PowerStatus::Active => stats.active += 1,
                PowerStatus::ScheduleInProgress => stats.scheduled += 1,
                PowerStatus::Inactive => stats.inactive += 1,
                PowerStatus::Unknown => stats.unknown += 1,
                PowerStatus::NotFoundInCloud => stats.not_found += 1,
            }
        }
        stats
    }

    /// Active servers per environment, ordered by environment.
    pub fn environment_breakdown(&self) -> Vec<(String, usize)> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for record in self.records.read().iter() {
            if record.power_status == PowerStatus::Active {
                *counts.entry(record.environment.clone()).or_default() += 1;
            }
        }
        counts.into_iter().collect()
    }

    /// Count per status label, in `PowerStatus::ALL` order. Statuses with
    /// no servers are omitted.
    pub fn status_breakdown(&self) -> Vec<(&'static str, usize)> {
        let records = self.records.read();
        PowerStatus::ALL
            .iter()
            .map(|status| {
                let count = records.iter().filter(|r| r.power_status == *status).count();
                (status.label(), count)
            })
            .filter(|(_, count)| *count > 0)
            .collect()
    }

    /// Distinct non-empty values for the dashboard dropdowns.
    pub fn filter_options(&self) -> FilterOptions {
        let records = self.records.read();
        let distinct = |field: fn(&ServerRecord) -> &str| -> Vec<String> {
            records
                .iter()
                .map(field)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        };

        FilterOptions {
            environments: distinct(|r| r.environment.as_str()),
            applications: distinct(|r| r.app_name.as_str()),
            owners: distinct(|r| r.owner.as_str()),
        }
    }
}

#[async_trait]
impl ServerStore for InMemoryStore {
    async fn replace_all(&self, records: Vec<ServerRecord>) -> Result<()> {
        let count = records.len();
        *self.records.write() = records;
        log::info!("STORE_REPLACED count={}", count);
        Ok(())
    }

    async fn all(&self) -> Result<Vec<ServerRecord>> {
        Ok(self.search(&ServerFilter::default()))
    }
}
