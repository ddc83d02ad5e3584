//! Operations spreadsheet parser.
//!
//! Semicolon-delimited UTF-8 text, optional byte-order mark, fixed header
//! row. Columns map 1:1 onto record fields; nothing is derived.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::Result;
use crate::record::{PowerStatus, ServerRecord};
use crate::routing::environment::normalize_environment;

pub const DELIMITER: char = ';';
pub const DELIMITER_STR: &str = ";";
const BOM: char = '\u{feff}';

/// Header row as written by the operations team.
pub const HEADER_COLUMNS: [&str; 10] = [
    "Estado Start/Stop",
    "Ambiente",
    "App Name",
    "Owner",
    "COMPUTER NAME",
    "RESOURCE GROUP",
    "SUBSCRIPTION",
    "LOCATION",
    "SIZE",
    "Schedule",
];

lazy_static! {
    static ref NON_ALNUM: Regex = Regex::new(r"[^a-z0-9]").unwrap();
    static ref REPEATED_UNDERSCORE: Regex = Regex::new(r"__+").unwrap();
}

/// Canonical field a spreadsheet column feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    PowerStatus,
    Environment,
    AppName,
    Owner,
    ComputerName,
    ResourceGroup,
    Subscription,
    Location,
    Size,
    Schedule,
}

impl Column {
    fn from_key(key: &str) -> Option<Self> {
        Some(match key {
            "estado_start_stop" => Column::PowerStatus,
            "ambiente" => Column::Environment,
            "app_name" => Column::AppName,
            "owner" => Column::Owner,
            "computer_name" => Column::ComputerName,
            "resource_group" => Column::ResourceGroup,
            "subscription" => Column::Subscription,
            "location" => Column::Location,
            "size" => Column::Size,
            "schedule" => Column::Schedule,
            _ => return None,
        })
    }
}

/// Normalize a header cell: lowercase, non-alphanumerics to `_`, runs
/// collapsed, edges trimmed. `COMPUTER NAME` and `computer_name` agree.
pub fn header_key(header: &str) -> String {
    let lowered = header.trim().to_lowercase();
    let replaced = NON_ALNUM.replace_all(&lowered, "_");
    let collapsed = REPEATED_UNDERSCORE.replace_all(&replaced, "_");
    collapsed.trim_matches('_').to_string()
}

/// Parse spreadsheet text.
///
/// Rows with fewer cells than the header, blank rows and rows without a
/// host name are dropped without error.
pub fn parse_spreadsheet(text: &str) -> Vec<ServerRecord> {
    let text = text.trim_start_matches(BOM);
    let mut lines = text.lines();

    let header = match lines.next() {
        Some(line) => line,
        None => return Vec::new(),
    };
    let columns: Vec<Option<Column>> = header
        .split(DELIMITER)
        .map(|cell| Column::from_key(&header_key(cell)))
        .collect();

    if !columns.contains(&Some(Column::ComputerName)) {
        log::warn!(
            "SPREADSHEET_HEADER_INVALID reason=no_host_name_column header={:?}",
            header
        );
        return Vec::new();
    }

    let mut records = Vec::new();
    let mut skipped = 0usize;

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let cells: Vec<&str> = line.split(DELIMITER).map(str::trim).collect();
        if cells.len() < columns.len() {
            skipped += 1;
            continue;
        }

        let record = row_to_record(&columns, &cells);
        if record.computer_name.is_empty() {
            skipped += 1;
            continue;
        }
        records.push(record);
    }

    log::info!(
        "SPREADSHEET_PARSED rows={} skipped={}",
        records.len(),
        skipped
    );

    records
}

fn row_to_record(columns: &[Option<Column>], cells: &[&str]) -> ServerRecord {
    let mut record = ServerRecord {
        environment: normalize_environment(""),
        ..Default::default()
    };

    for (column, cell) in columns.iter().zip(cells) {
        let value = cell.to_string();
        match column {
            Some(Column::PowerStatus) => {
                record.power_status = PowerStatus::from_label(cell);
                record.power_status_text = Some(value);
            }
            Some(Column::Environment) => record.environment = normalize_environment(cell),
            Some(Column::AppName) => record.app_name = value,
            Some(Column::Owner) => record.owner = value,
            Some(Column::ComputerName) => record.computer_name = value,
            Some(Column::ResourceGroup) => record.resource_group = value,
            Some(Column::Subscription) => record.subscription_id = value,
            Some(Column::Location) => record.location = value,
            Some(Column::Size) => record.size = value,
            Some(Column::Schedule) => record.schedule = value,
            None => {}
        }
    }

    record
}

/// Read a whole spreadsheet stream. Any I/O failure (including invalid
/// UTF-8) fails the whole ingestion.
pub fn read_spreadsheet<R: Read>(mut reader: R) -> Result<Vec<ServerRecord>> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    Ok(parse_spreadsheet(&text))
}

pub fn load_spreadsheet(path: &Path) -> Result<Vec<ServerRecord>> {
    log::info!("SPREADSHEET_LOAD path={}", path.display());
    let file = File::open(path)?;
    read_spreadsheet(file)
}

/// Like `load_spreadsheet`, but a missing file is an empty sheet.
pub fn load_spreadsheet_if_exists(path: &Path) -> Result<Vec<ServerRecord>> {
    if !path.exists() {
        log::warn!("SPREADSHEET_MISSING path={}", path.display());
        return Ok(Vec::new());
    }
    load_spreadsheet(path)
}
