use serde::Serialize;

use crate::error::{MonitorError, Result};
use crate::model::{ObservationDate, PeriodMap, PeriodOrdinal, present_periods};

/// Filters for an infraction search. Unset fields match everything; the
/// bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchCriteria {
    pub date: Option<ObservationDate>,
    pub min_infractions: Option<u64>,
    pub max_infractions: Option<u64>,
}

impl SearchCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_date(mut self, date: ObservationDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_min_infractions(mut self, min: u64) -> Self {
        self.min_infractions = Some(min);
        self
    }

    pub fn with_max_infractions(mut self, max: u64) -> Self {
        self.max_infractions = Some(max);
        self
    }

    /// Reject a range that can never match.
    pub fn validate(&self) -> Result<()> {
        match (self.min_infractions, self.max_infractions) {
            (Some(min), Some(max)) if min > max => Err(MonitorError::InvalidFilter(format!(
                "min_infractions ({min}) is greater than max_infractions ({max})"
            ))),
            _ => Ok(()),
        }
    }

    pub fn matches(&self, date: &ObservationDate, infractions: u64) -> bool {
        self.date.as_ref().is_none_or(|d| d == date)
            && self.min_infractions.is_none_or(|min| infractions >= min)
            && self.max_infractions.is_none_or(|max| infractions <= max)
    }
}

/// A single (week, camera, date) entry that matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchMatch {
    pub period: PeriodOrdinal,
    pub device_id: String,
    pub device_name: String,
    pub date: ObservationDate,
    pub infractions: u64,
    /// Frames for the same camera and date, zero if none were recorded
    pub frames: u64,
}

/// Scan the daily infraction counts of every camera in every week with
/// data.
///
/// Results are ordered by date ascending, then by infraction count
/// descending. Finding nothing is not an error.
pub fn search(periods: &PeriodMap, criteria: &SearchCriteria) -> Result<Vec<SearchMatch>> {
    criteria.validate()?;

    let mut matches = Vec::new();
    for (period, set) in present_periods(periods) {
        for device in set.devices() {
            for (date, infractions) in device.infractions.iter() {
                if !criteria.matches(date, infractions) {
                    continue;
                }

                matches.push(SearchMatch {
                    period,
                    device_id: device.id.clone(),
                    device_name: device.name.clone(),
                    date: date.clone(),
                    infractions,
                    frames: device.frames.get(date),
                });
            }
        }
    }

    matches.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| b.infractions.cmp(&a.infractions))
    });

    tracing::debug!(count = matches.len(), "Infraction search complete");
    Ok(matches)
}
