//! Query operations over a month of camera data.
//!
//! Each operation resolves the weeks it needs through a [`PeriodSource`] and
//! then hands the record sets to the pure aggregation, ranking and search
//! functions.

use serde::Serialize;

use crate::aggregation::{DevicePerformance, compute_device_rollups, compute_range_rollup};
use crate::analytics::round2;
use crate::error::{MonitorError, Result};
use crate::model::{
    DeviceObservation, Month, ObservationDate, PeriodMap, PeriodOrdinal, PeriodRecordSet,
    present_periods,
};
use crate::ranking::{Metric, RankingEntry, rank};
use crate::search::{SearchCriteria, SearchMatch, search};
use crate::traits::PeriodSource;

/// Cameras listed in a monthly report.
pub const REPORT_TOP_DEVICES: usize = 5;
/// Dates listed in a monthly report.
pub const REPORT_RECENT_DAYS: usize = 7;

// ==================== Result Types ====================

/// A camera as it appears in one week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceListing {
    pub period: PeriodOrdinal,
    pub device_id: String,
    pub name: String,
    pub total_infractions: u64,
    pub storage_used: String,
    pub uptime: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceComparison {
    pub month: String,
    pub period: PeriodOrdinal,
    pub metric: Metric,
    pub rankings: Vec<RankingEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodReport {
    pub period: PeriodOrdinal,
    pub infractions: u64,
    pub frames: u64,
    pub efficiency: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopDevice {
    pub device_id: String,
    pub name: String,
    /// Sum of the stored weekly totals
    pub total_infractions: u64,
    pub total_frames: u64,
    pub efficiency: f64,
    pub periods_active: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayReport {
    pub date: ObservationDate,
    pub infractions: u64,
    pub frames: u64,
}

/// Month-wide summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyReport {
    pub month: String,
    pub total_infractions: u64,
    pub total_frames: u64,
    pub efficiency: f64,
    pub periods: Vec<PeriodOrdinal>,
    pub active_devices: usize,
    pub period_summaries: Vec<PeriodReport>,
    pub top_devices: Vec<TopDevice>,
    pub recent_days: Vec<DayReport>,
    pub skipped_devices: usize,
}

// ==================== Service ====================

/// Camera monitoring service over a period source.
#[derive(Debug, Clone)]
pub struct CameraMonitor<S> {
    source: S,
}

impl<S: PeriodSource> CameraMonitor<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Every camera of one week, or of every week of the month with data.
    pub async fn list_devices(
        &self,
        month: &Month,
        period: Option<PeriodOrdinal>,
    ) -> Result<Vec<DeviceListing>> {
        let periods = self.load_periods(month, period).await?;

        let listings = present_periods(&periods)
            .flat_map(|(period, set)| {
                set.devices().iter().map(move |device| DeviceListing {
                    period,
                    device_id: device.id.clone(),
                    name: device.name.clone(),
                    total_infractions: device.total,
                    storage_used: device.storage_used.clone(),
                    uptime: device.uptime.clone(),
                })
            })
            .collect();

        Ok(listings)
    }

    /// The raw observation of one camera in one week.
    pub async fn device_status(
        &self,
        month: &Month,
        period: PeriodOrdinal,
        device_id: &str,
    ) -> Result<DeviceObservation> {
        let set = self.load_period(month, period).await?;
        set.get(device_id)
            .cloned()
            .ok_or_else(|| MonitorError::DeviceNotFound {
                device_id: device_id.to_string(),
                scope: format!("week {period} of {month}"),
            })
    }

    /// Performance of every camera, or of `device_id` only, over one week or
    /// the whole month.
    pub async fn analyze_performance(
        &self,
        month: &Month,
        period: Option<PeriodOrdinal>,
        device_id: Option<&str>,
    ) -> Result<Vec<DevicePerformance>> {
        let periods = self.load_periods(month, period).await?;
        let rollups = compute_device_rollups(&periods, device_id);

        if rollups.is_empty() {
            let scope = scope_label(month, period);
            return Err(match device_id {
                Some(id) => MonitorError::DeviceNotFound {
                    device_id: id.to_string(),
                    scope,
                },
                None => MonitorError::MonthNotFound(scope),
            });
        }

        Ok(rollups.iter().map(|rollup| rollup.performance()).collect())
    }

    /// Rank the cameras of one week by the named metric.
    pub async fn compare_devices(
        &self,
        month: &Month,
        period: PeriodOrdinal,
        metric: &str,
    ) -> Result<DeviceComparison> {
        let metric: Metric = metric.parse()?;
        let set = self.load_period(month, period).await?;

        Ok(DeviceComparison {
            month: month.to_string(),
            period,
            metric,
            rankings: rank(&set, metric),
        })
    }

    /// Search the daily infraction counts of every week of the month.
    pub async fn search_infractions(
        &self,
        month: &Month,
        criteria: &SearchCriteria,
    ) -> Result<Vec<SearchMatch>> {
        // Rejected before any lookup; search() checks again for direct callers.
        criteria.validate()?;
        let periods = self.load_periods(month, None).await?;
        search(&periods, criteria)
    }

    pub async fn monthly_report(&self, month: &Month) -> Result<MonthlyReport> {
        let periods = self.load_periods(month, None).await?;
        let rollup = compute_range_rollup(&periods);

        let period_summaries = rollup
            .period_summaries
            .iter()
            .map(|summary| PeriodReport {
                period: summary.period,
                infractions: summary.infractions,
                frames: summary.frames,
                efficiency: round2(summary.efficiency()),
            })
            .collect();

        let top_devices = rollup
            .devices_by_infractions()
            .into_iter()
            .take(REPORT_TOP_DEVICES)
            .map(|device| TopDevice {
                device_id: device.device_id.clone(),
                name: device.name.clone(),
                total_infractions: device.total_infractions(),
                total_frames: device.total_frames(),
                efficiency: round2(device.efficiency()),
                periods_active: device.periods_active(),
            })
            .collect();

        let recent_days = rollup
            .recent_days(REPORT_RECENT_DAYS)
            .into_iter()
            .map(|(date, total)| DayReport {
                date,
                infractions: total.infractions,
                frames: total.frames,
            })
            .collect();

        Ok(MonthlyReport {
            month: month.to_string(),
            total_infractions: rollup.total_infractions,
            total_frames: rollup.total_frames,
            efficiency: round2(rollup.efficiency()),
            periods: rollup.periods(),
            active_devices: rollup.devices.len(),
            period_summaries,
            top_devices,
            recent_days,
            skipped_devices: rollup.skipped_devices.len(),
        })
    }

    async fn load_period(&self, month: &Month, period: PeriodOrdinal) -> Result<PeriodRecordSet> {
        self.source
            .resolve_period(month, period)
            .await?
            .ok_or_else(|| MonitorError::PeriodNotFound {
                month: month.to_string(),
                period,
            })
    }

    /// One week when `period` is set, otherwise every week of the month.
    /// Fails with a not-found error when nothing has data.
    async fn load_periods(&self, month: &Month, period: Option<PeriodOrdinal>) -> Result<PeriodMap> {
        if let Some(period) = period {
            let set = self.load_period(month, period).await?;
            return Ok(PeriodMap::from([(period, Some(set))]));
        }

        let periods = self.source.fetch_month(month).await?;
        if present_periods(&periods).next().is_none() {
            return Err(MonitorError::MonthNotFound(month.to_string()));
        }

        tracing::debug!(
            month = %month,
            available = present_periods(&periods).count(),
            "Loaded month"
        );
        Ok(periods)
    }
}

fn scope_label(month: &Month, period: Option<PeriodOrdinal>) -> String {
    match period {
        Some(period) => format!("week {period} of {month}"),
        None => month.to_string(),
    }
}
