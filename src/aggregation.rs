//! Cross-week rollups.
//!
//! Weeks that the source had no data for are skipped, as are devices that
//! were rejected at ingestion. Neither aborts the rest of the rollup.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use crate::analytics::{Summary, calculate_count_stats, efficiency, mean_of, round2};
use crate::model::{
    DailyCounts, DeviceObservation, ObservationDate, PeriodMap, PeriodOrdinal, present_periods,
};

// ==================== Rollup Types ====================

/// One camera's data merged across weeks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceRollup {
    pub device_id: String,
    pub name: String,
    /// Weeks the camera reported in, ascending
    pub periods: Vec<PeriodOrdinal>,
    /// Stored weekly total for each entry of `periods`
    pub period_totals: Vec<u64>,
    pub daily_infractions: DailyCounts,
    pub daily_frames: DailyCounts,
}

impl DeviceRollup {
    fn new(device: &DeviceObservation) -> Self {
        Self {
            device_id: device.id.clone(),
            name: device.name.clone(),
            periods: Vec::new(),
            period_totals: Vec::new(),
            daily_infractions: DailyCounts::new(),
            daily_frames: DailyCounts::new(),
        }
    }

    fn absorb(&mut self, period: PeriodOrdinal, device: &DeviceObservation) {
        self.periods.push(period);
        self.period_totals.push(device.total);
        self.daily_infractions.merge(&device.infractions);
        self.daily_frames.merge(&device.frames);
    }

    pub fn periods_active(&self) -> usize {
        self.periods.len()
    }

    /// Sum of the stored weekly totals.
    pub fn total_infractions(&self) -> u64 {
        self.period_totals.iter().sum()
    }

    pub fn total_frames(&self) -> u64 {
        self.daily_frames.total()
    }

    /// Efficiency from the stored weekly totals and the captured frames.
    pub fn efficiency(&self) -> f64 {
        efficiency(self.total_infractions(), self.total_frames())
    }

    /// Performance figures for this camera.
    ///
    /// Unlike [`Self::efficiency`], the rate here is computed from the daily
    /// breakdown on both sides.
    pub fn performance(&self) -> DevicePerformance {
        DevicePerformance {
            device_id: self.device_id.clone(),
            name: self.name.clone(),
            periods_analyzed: self.periods_active(),
            infraction_stats: calculate_count_stats(self.period_totals.iter().copied()),
            daily_infraction_avg: mean_of(self.daily_infractions.values()),
            daily_frame_avg: mean_of(self.daily_frames.values()),
            efficiency: round2(efficiency(
                self.daily_infractions.total(),
                self.daily_frames.total(),
            )),
        }
    }
}

/// Performance analysis of a single camera.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DevicePerformance {
    pub device_id: String,
    pub name: String,
    pub periods_analyzed: usize,
    /// Summary over the per-week totals
    pub infraction_stats: Summary,
    pub daily_infraction_avg: f64,
    pub daily_frame_avg: f64,
    pub efficiency: f64,
}

/// Infractions and frames for one date, across all cameras.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DailyTotal {
    pub infractions: u64,
    pub frames: u64,
}

/// Totals for one week, across all cameras.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PeriodSummary {
    pub period: PeriodOrdinal,
    pub infractions: u64,
    pub frames: u64,
}

impl PeriodSummary {
    pub fn efficiency(&self) -> f64 {
        efficiency(self.infractions, self.frames)
    }
}

/// A camera entry left out of a rollup because it was malformed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedDevice {
    pub period: PeriodOrdinal,
    pub device_id: String,
    pub reason: String,
}

/// Everything known about a range of weeks.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RangeRollup {
    /// Sum of the daily infraction counts of every camera
    pub total_infractions: u64,
    pub total_frames: u64,
    /// One rollup per camera, in the order cameras were first seen
    pub devices: Vec<DeviceRollup>,
    pub daily_infractions: DailyCounts,
    pub daily_frames: DailyCounts,
    /// One entry per week with data, ascending
    pub period_summaries: Vec<PeriodSummary>,
    pub skipped_devices: Vec<SkippedDevice>,
}

impl RangeRollup {
    pub fn efficiency(&self) -> f64 {
        efficiency(self.total_infractions, self.total_frames)
    }

    pub fn periods(&self) -> Vec<PeriodOrdinal> {
        self.period_summaries.iter().map(|s| s.period).collect()
    }

    /// Cameras ordered by total infractions, highest first. Ties keep the
    /// order cameras were first seen in.
    pub fn devices_by_infractions(&self) -> Vec<&DeviceRollup> {
        let mut devices: Vec<&DeviceRollup> = self.devices.iter().collect();
        devices.sort_by(|a, b| b.total_infractions().cmp(&a.total_infractions()));
        devices
    }

    /// Infractions and frames for every date with either, ascending.
    pub fn daily_totals(&self) -> BTreeMap<ObservationDate, DailyTotal> {
        let dates: BTreeSet<&ObservationDate> = self
            .daily_infractions
            .iter()
            .chain(self.daily_frames.iter())
            .map(|(date, _)| date)
            .collect();

        dates
            .into_iter()
            .map(|date| {
                let total = DailyTotal {
                    infractions: self.daily_infractions.get(date),
                    frames: self.daily_frames.get(date),
                };
                (date.clone(), total)
            })
            .collect()
    }

    /// The last `n` dates with data, ascending.
    pub fn recent_days(&self, n: usize) -> Vec<(ObservationDate, DailyTotal)> {
        let totals = self.daily_totals();
        let skip = totals.len().saturating_sub(n);
        totals.into_iter().skip(skip).collect()
    }
}

// ==================== Rollup Builders ====================

/// Merge every week's observations into one rollup per camera, in the order
/// cameras were first seen.
///
/// With `device_filter` set, only that camera is rolled up.
pub fn compute_device_rollups(periods: &PeriodMap, device_filter: Option<&str>) -> Vec<DeviceRollup> {
    let mut rollups: Vec<DeviceRollup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (period, set) in present_periods(periods) {
        let devices = set
            .devices()
            .iter()
            .filter(|d| device_filter.is_none_or(|id| id == d.id));

        for device in devices {
            let slot = *index.entry(device.id.clone()).or_insert_with(|| {
                rollups.push(DeviceRollup::new(device));
                rollups.len() - 1
            });
            rollups[slot].absorb(period, device);
        }
    }

    rollups
}

/// Build the whole-range rollup: per-camera rollups plus totals per week
/// and per date across every camera.
pub fn compute_range_rollup(periods: &PeriodMap) -> RangeRollup {
    let mut rollup = RangeRollup {
        devices: compute_device_rollups(periods, None),
        ..Default::default()
    };

    for (period, set) in present_periods(periods) {
        let mut summary = PeriodSummary {
            period,
            infractions: 0,
            frames: 0,
        };

        for device in set.devices() {
            rollup.daily_infractions.merge(&device.infractions);
            rollup.daily_frames.merge(&device.frames);
            summary.infractions += device.infractions.total();
            summary.frames += device.total_frames();
        }

        rollup.total_infractions += summary.infractions;
        rollup.total_frames += summary.frames;
        rollup.period_summaries.push(summary);
        rollup
            .skipped_devices
            .extend(set.rejected().iter().map(|r| SkippedDevice {
                period,
                device_id: r.device_id.clone(),
                reason: r.reason.clone(),
            }));
    }

    rollup
}
