use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::analytics::efficiency;
use crate::error::{MonitorError, Result};
use crate::model::PeriodRecordSet;

/// Metric cameras can be compared on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Stored weekly infraction total
    Infractions,
    /// Frames captured over the week
    Frames,
    /// Infractions per hundred frames
    Efficiency,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Infractions, Metric::Frames, Metric::Efficiency];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Infractions => "infractions",
            Metric::Frames => "frames",
            Metric::Efficiency => "efficiency",
        }
    }
}

impl FromStr for Metric {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self> {
        Metric::ALL
            .into_iter()
            .find(|m| m.as_str() == s.trim())
            .ok_or_else(|| {
                MonitorError::InvalidFilter(format!(
                    "metric '{s}' must be 'infractions', 'frames', or 'efficiency'"
                ))
            })
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One camera's position in a comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingEntry {
    pub device_id: String,
    pub name: String,
    pub infractions: u64,
    pub frames: u64,
    pub efficiency: f64,
    /// Value of the selected metric, used for ordering
    pub metric_value: f64,
    pub storage_used: String,
}

/// Rank the cameras of one week by `metric`, highest first.
///
/// The sort is stable, so cameras with equal values keep the order they
/// appear in within the record set.
pub fn rank(records: &PeriodRecordSet, metric: Metric) -> Vec<RankingEntry> {
    let mut entries: Vec<RankingEntry> = records
        .devices()
        .iter()
        .map(|device| {
            let infractions = device.total;
            let frames = device.total_frames();
            let efficiency = efficiency(infractions, frames);
            let metric_value = match metric {
                Metric::Infractions => infractions as f64,
                Metric::Frames => frames as f64,
                Metric::Efficiency => efficiency,
            };

            RankingEntry {
                device_id: device.id.clone(),
                name: device.name.clone(),
                infractions,
                frames,
                efficiency,
                metric_value,
                storage_used: device.storage_used.clone(),
            }
        })
        .collect();

    entries.sort_by(|a, b| b.metric_value.total_cmp(&a.metric_value));
    entries
}
