//! Camera Monitor Library
//!
//! This module exposes the core components of the camera monitor for
//! testing and reuse: the record model, the aggregation, ranking and search
//! functions over it, and the sources weekly data is fetched from.

pub mod aggregation;
pub mod analytics;
pub mod api;
pub mod config;
pub mod error;
pub mod model;
pub mod monitor;
pub mod ranking;
pub mod search;
pub mod traits;

// Re-export commonly used types
pub use aggregation::{
    DailyTotal, DevicePerformance, DeviceRollup, PeriodSummary, RangeRollup, SkippedDevice,
    compute_device_rollups, compute_range_rollup,
};
pub use analytics::{Summary, calculate_stats, efficiency};
pub use api::HttpPeriodSource;
pub use config::AppConfig;
pub use error::{MalformedRecord, MonitorError, Result};
pub use model::{
    DailyCounts, DeviceObservation, Month, ObservationDate, PeriodMap, PeriodOrdinal,
    PeriodRecordSet,
};
pub use monitor::{CameraMonitor, DeviceComparison, DeviceListing, MonthlyReport};
pub use ranking::{Metric, RankingEntry, rank};
pub use search::{SearchCriteria, SearchMatch, search};
pub use traits::{MockPeriodSource, PeriodSource};
