use thiserror::Error;

use crate::model::PeriodOrdinal;

/// A device entry that could not be turned into an observation.
///
/// Kept separate from [`MonitorError`] so record sets can hold on to the
/// devices they rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Malformed record for device {device_id}: {reason}")]
pub struct MalformedRecord {
    pub device_id: String,
    pub reason: String,
}

impl MalformedRecord {
    pub fn new(device_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            reason: reason.into(),
        }
    }
}

/// Typed errors surfaced by the camera monitor.
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("No data found for week {period} of {month}")]
    PeriodNotFound { month: String, period: PeriodOrdinal },

    #[error("No data found for {0}")]
    MonthNotFound(String),

    #[error("Camera {device_id} not found in {scope}")]
    DeviceNotFound { device_id: String, scope: String },

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error(transparent)]
    MalformedRecord(#[from] MalformedRecord),

    #[error("Invalid date '{0}': expected YYYY-MM-DD or MM-DD")]
    InvalidDate(String),

    #[error("Invalid period ordinal {0}: must be between 1 and 5")]
    InvalidPeriod(u8),

    #[error("Invalid month: {0}")]
    InvalidMonth(String),

    #[error("HTTP request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Data source returned error status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Failed to decode period data: {0}")]
    Decode(#[from] serde_json::Error),
}

impl MonitorError {
    /// Whether this error means "no backing data" rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            MonitorError::PeriodNotFound { .. }
                | MonitorError::MonthNotFound(_)
                | MonitorError::DeviceNotFound { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;
