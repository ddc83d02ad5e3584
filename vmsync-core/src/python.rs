//! Python bindings.
//!
//! Each entry point builds configuration from the environment, drives the
//! async operation on a tokio runtime with the GIL released, and returns
//! the envelope as a JSON string.

use std::path::PathBuf;

use lazy_static::lazy_static;
use pyo3::exceptions::PyRuntimeError;
use pyo3::prelude::*;
use serde::Serialize;

use crate::config::SyncConfig;
use crate::error::InventoryError;
use crate::init_logger;
use crate::pipeline::sync;
use crate::source::arm::SubscriptionClients;
use crate::source::connector::SourceConnector;
use crate::storage::models::{ServerFilter, ServerRow};
use crate::storage::queries::{
    build_clear_servers, build_environment_breakdown_query, build_server_insert,
    build_server_search, build_stats_query,
};
use crate::storage::store::InMemoryStore;

lazy_static! {
    /// Last reconciled set, kept for the dashboard reads.
    static ref STORE: InMemoryStore = InMemoryStore::new();
}

fn to_py_err(err: InventoryError) -> PyErr {
    PyRuntimeError::new_err(err.to_string())
}

fn to_json<T: Serialize>(value: &T) -> PyResult<String> {
    serde_json::to_string(value).map_err(|e| PyRuntimeError::new_err(e.to_string()))
}

fn runtime() -> PyResult<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| PyRuntimeError::new_err(e.to_string()))
}

fn connector(config: &SyncConfig) -> PyResult<SourceConnector> {
    let clients = SubscriptionClients::from_config(config).map_err(to_py_err)?;
    Ok(SourceConnector::new(clients))
}

/// Run a full sync.
///
/// # Arguments
/// * `spreadsheet_path` - Overrides `SPREADSHEET_PATH` when given
#[pyfunction]
#[pyo3(signature = (spreadsheet_path=None))]
fn run_sync(py: Python<'_>, spreadsheet_path: Option<String>) -> PyResult<String> {
    init_logger();
    let config = SyncConfig::from_env().map_err(to_py_err)?;
    let connector = connector(&config)?;
    let path = spreadsheet_path
        .map(PathBuf::from)
        .unwrap_or_else(|| config.spreadsheet_path.clone());
    let rt = runtime()?;

    let envelope = py.allow_threads(|| {
        rt.block_on(sync::run_full_sync_from_path(&connector, &path, &*STORE))
    });
    to_json(&envelope)
}

/// Normalized cloud inventory without reconciliation.
#[pyfunction]
fn list_cloud_instances(py: Python<'_>) -> PyResult<String> {
    init_logger();
    let config = SyncConfig::from_env().map_err(to_py_err)?;
    let connector = connector(&config)?;
    let rt = runtime()?;

    let envelope = py.allow_threads(|| rt.block_on(sync::list_cloud_instances(&connector)));
    to_json(&envelope)
}

/// Connectivity probe across the configured subscriptions.
#[pyfunction]
fn test_connection(py: Python<'_>) -> PyResult<String> {
    init_logger();
    let config = SyncConfig::from_env().map_err(to_py_err)?;
    let connector = connector(&config)?;
    let rt = runtime()?;

    let envelope = py.allow_threads(|| rt.block_on(sync::test_connectivity(&connector)));
    to_json(&envelope)
}

/// Search the last reconciled set. `filter_json` is the dashboard request
/// body; empty means no filter.
#[pyfunction]
#[pyo3(signature = (filter_json=None))]
fn search_servers(filter_json: Option<String>) -> PyResult<String> {
    let filter = parse_filter(filter_json.as_deref())?;
    to_json(&STORE.search(&filter))
}

fn parse_filter(filter_json: Option<&str>) -> PyResult<ServerFilter> {
    match filter_json {
        Some(body) if !body.trim().is_empty() => serde_json::from_str(body)
            .map_err(|e| PyRuntimeError::new_err(format!("invalid filter: {}", e))),
        _ => Ok(ServerFilter::default()),
    }
}

/// Search SQL and bound parameters for a host that queries its own
/// database instead of the in-process set.
#[pyfunction]
#[pyo3(signature = (filter_json=None))]
fn server_search_query(filter_json: Option<String>) -> PyResult<(String, Vec<String>)> {
    let filter = parse_filter(filter_json.as_deref())?;
    Ok(build_server_search(&filter))
}

/// Dashboard counter SQL: (stats, active servers per environment).
#[pyfunction]
fn dashboard_queries() -> PyResult<(String, String)> {
    Ok((
        build_stats_query().to_string(),
        build_environment_breakdown_query().to_string(),
    ))
}

/// Dashboard counters over the last reconciled set.
#[pyfunction]
fn server_stats() -> PyResult<String> {
    to_json(&serde_json::json!({
        "stats": STORE.stats(),
        "environments": STORE.environment_breakdown(),
        "statuses": STORE.status_breakdown(),
        "filters": STORE.filter_options(),
    }))
}

/// SQL plus flat rows for persisting the last reconciled set.
///
/// Returns (clear_sql, insert_sql, rows) where each row is in column order.
#[pyfunction]
fn storage_batch() -> PyResult<(String, String, Vec<Vec<String>>)> {
    let rows = STORE
        .snapshot()
        .iter()
        .map(|record| {
            ServerRow::from(record)
                .values()
                .into_iter()
                .map(str::to_string)
                .collect()
        })
        .collect();
    Ok((build_clear_servers().to_string(), build_server_insert(), rows))
}

/// Python module definition
#[pymodule]
fn vmsync_core(_py: Python<'_>, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(run_sync, m)?)?;
    m.add_function(wrap_pyfunction!(list_cloud_instances, m)?)?;
    m.add_function(wrap_pyfunction!(test_connection, m)?)?;
    m.add_function(wrap_pyfunction!(search_servers, m)?)?;
    m.add_function(wrap_pyfunction!(server_stats, m)?)?;
    m.add_function(wrap_pyfunction!(storage_batch, m)?)?;
    m.add_function(wrap_pyfunction!(server_search_query, m)?)?;
    m.add_function(wrap_pyfunction!(dashboard_queries, m)?)?;
    Ok(())
}
