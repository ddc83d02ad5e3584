//! Closed enums for power status and provenance.
//!
//! The dashboard shows Portuguese labels; those live in one table here and
//! nowhere else.

use serde::{Deserialize, Serialize};

/// Human-facing power status of a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerStatus {
    Active,
    ScheduleInProgress,
    Inactive,
    Unknown,
    /// Only assigned by the reconciler to spreadsheet rows without a cloud counterpart.
    NotFoundInCloud,
}

/// (variant, dashboard label)
const STATUS_LABELS: &[(PowerStatus, &str)] = &[
    (PowerStatus::Active, "Activo"),
    (PowerStatus::ScheduleInProgress, "Agendamento em progresso"),
    (PowerStatus::Inactive, "Inactivo"),
    (PowerStatus::Unknown, "Desconhecido"),
    (PowerStatus::NotFoundInCloud, "Não encontrado no Azure"),
];

impl PowerStatus {
    pub const ALL: [PowerStatus; 5] = [
        PowerStatus::Active,
        PowerStatus::ScheduleInProgress,
        PowerStatus::Inactive,
        PowerStatus::Unknown,
        PowerStatus::NotFoundInCloud,
    ];

    /// Map a raw provider power state (`running`, `deallocated`, ...).
    pub fn from_raw_state(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "running" => PowerStatus::Active,
            "stopped" | "deallocated" => PowerStatus::Inactive,
            "starting" | "stopping" | "deallocating" => PowerStatus::ScheduleInProgress,
            _ => PowerStatus::Unknown,
        }
    }

    /// Dashboard label.
    pub fn label(&self) -> &'static str {
        STATUS_LABELS
            .iter()
            .find(|(status, _)| status == self)
            .map(|(_, label)| *label)
            .unwrap_or("Desconhecido")
    }

    /// Parse a dashboard label or an English variant name.
    ///
    /// Unrecognised text maps to `Unknown`.
    pub fn from_label(text: &str) -> Self {
        let text = text.trim();
        if let Some((status, _)) = STATUS_LABELS
            .iter()
            .find(|(_, label)| label.eq_ignore_ascii_case(text))
        {
            return *status;
        }
        Self::ALL
            .iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(text))
            .copied()
            .unwrap_or(PowerStatus::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PowerStatus::Active => "Active",
            PowerStatus::ScheduleInProgress => "ScheduleInProgress",
            PowerStatus::Inactive => "Inactive",
            PowerStatus::Unknown => "Unknown",
            PowerStatus::NotFoundInCloud => "NotFoundInCloud",
        }
    }
}

impl Default for PowerStatus {
    fn default() -> Self {
        PowerStatus::Unknown
    }
}

/// Which source(s) contributed a reconciled record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    CloudOnly,
    SpreadsheetOnly,
    Matched,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::CloudOnly => "cloud_only",
            Provenance::SpreadsheetOnly => "spreadsheet_only",
            Provenance::Matched => "matched",
        }
    }
}
