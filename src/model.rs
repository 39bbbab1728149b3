//! Record model for per-camera weekly observations.
//!
//! A week's file maps camera identifiers to their observation for that week.
//! Everything here is immutable once built: a [`PeriodRecordSet`] is produced
//! by a single fetch and only ever read afterwards.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{MalformedRecord, MonitorError, Result};

/// Highest week ordinal a month can have.
pub const MAX_PERIODS_PER_MONTH: u8 = 5;

/// Leap year used to validate dates that carry no year.
const YEARLESS_REFERENCE_YEAR: i32 = 2000;

// ==================== Period Identification ====================

/// Week ordinal within a month (1-5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct PeriodOrdinal(u8);

impl PeriodOrdinal {
    pub fn new(value: u8) -> Result<Self> {
        if (1..=MAX_PERIODS_PER_MONTH).contains(&value) {
            Ok(Self(value))
        } else {
            Err(MonitorError::InvalidPeriod(value))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Every candidate ordinal, ascending.
    pub const fn all() -> [PeriodOrdinal; MAX_PERIODS_PER_MONTH as usize] {
        [
            PeriodOrdinal(1),
            PeriodOrdinal(2),
            PeriodOrdinal(3),
            PeriodOrdinal(4),
            PeriodOrdinal(5),
        ]
    }
}

impl TryFrom<u8> for PeriodOrdinal {
    type Error = MonitorError;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(value)
    }
}

impl fmt::Display for PeriodOrdinal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The outer time unit weeks are nested under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Month {
    number: u32,
    name: String,
}

impl Month {
    /// Build a month from its number (1-12) and its name as used by the
    /// data source (e.g. `enero`). The name is trimmed and lowercased.
    pub fn new(number: u32, name: &str) -> Result<Self> {
        if !(1..=12).contains(&number) {
            return Err(MonitorError::InvalidMonth(format!(
                "month number {number} must be between 1 and 12"
            )));
        }

        let name = name.trim().to_lowercase();
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(MonitorError::InvalidMonth(format!(
                "month name '{name}' is not usable"
            )));
        }

        Ok(Self { number, name })
    }

    /// Directory segment used by the data source, e.g. `01-enero`.
    pub fn path_segment(&self) -> String {
        format!("{:02}-{}", self.number, self.name)
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path_segment())
    }
}

// ==================== Dates ====================

/// Calendar date key of a daily count.
///
/// Accepts `YYYY-MM-DD` and the year-less `MM-DD` form. Both are validated
/// as real calendar dates; ordering follows the textual form, which for
/// same-shaped keys is chronological.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ObservationDate(String);

impl ObservationDate {
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let (year, month, day) =
            split_date(text).ok_or_else(|| MonitorError::InvalidDate(text.to_string()))?;

        NaiveDate::from_ymd_opt(year.unwrap_or(YEARLESS_REFERENCE_YEAR), month, day)
            .ok_or_else(|| MonitorError::InvalidDate(text.to_string()))?;

        Ok(Self(text.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn split_date(text: &str) -> Option<(Option<i32>, u32, u32)> {
    fn digits(part: &str, len: usize) -> bool {
        part.len() == len && part.bytes().all(|b| b.is_ascii_digit())
    }

    let parts: Vec<&str> = text.split('-').collect();
    match parts.as_slice() {
        [y, m, d] if digits(y, 4) && digits(m, 2) && digits(d, 2) => {
            Some((Some(y.parse().ok()?), m.parse().ok()?, d.parse().ok()?))
        }
        [m, d] if digits(m, 2) && digits(d, 2) => Some((None, m.parse().ok()?, d.parse().ok()?)),
        _ => None,
    }
}

impl FromStr for ObservationDate {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ObservationDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ObservationDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

// ==================== Daily Counts ====================

/// Per-date counts where an absent date reads as zero.
///
/// Adding a date that is already present sums the counts, so merging two
/// weeks never overwrites data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DailyCounts(BTreeMap<ObservationDate, u64>);

impl DailyCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, date: ObservationDate, count: u64) {
        *self.0.entry(date).or_insert(0) += count;
    }

    pub fn merge(&mut self, other: &DailyCounts) {
        for (date, count) in other.iter() {
            self.add(date.clone(), count);
        }
    }

    /// Count for `date`, zero when the date is absent.
    pub fn get(&self, date: &ObservationDate) -> u64 {
        self.0.get(date).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    /// Entries in ascending date order.
    pub fn iter(&self) -> impl Iterator<Item = (&ObservationDate, u64)> + '_ {
        self.0.iter().map(|(date, count)| (date, *count))
    }

    pub fn values(&self) -> impl Iterator<Item = u64> + '_ {
        self.0.values().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(ObservationDate, u64)> for DailyCounts {
    fn from_iter<I: IntoIterator<Item = (ObservationDate, u64)>>(iter: I) -> Self {
        let mut counts = Self::new();
        for (date, count) in iter {
            counts.add(date, count);
        }
        counts
    }
}

// ==================== Observations ====================

/// One camera's observation for one week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceObservation {
    pub id: String,
    pub name: String,
    pub uptime: String,
    pub storage_used: String,
    /// Stored weekly total. Trusted as-is; not checked against `infractions`.
    pub total: u64,
    pub infractions: DailyCounts,
    pub frames: DailyCounts,
}

impl DeviceObservation {
    pub fn new(id: impl Into<String>, name: impl Into<String>, total: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            uptime: String::new(),
            storage_used: String::new(),
            total,
            infractions: DailyCounts::new(),
            frames: DailyCounts::new(),
        }
    }

    pub fn with_uptime(mut self, uptime: impl Into<String>) -> Self {
        self.uptime = uptime.into();
        self
    }

    pub fn with_storage_used(mut self, storage_used: impl Into<String>) -> Self {
        self.storage_used = storage_used.into();
        self
    }

    pub fn with_infractions(mut self, date: ObservationDate, count: u64) -> Self {
        self.infractions.add(date, count);
        self
    }

    pub fn with_frames(mut self, date: ObservationDate, count: u64) -> Self {
        self.frames.add(date, count);
        self
    }

    /// Frames captured over the week. There is no stored frame total.
    pub fn total_frames(&self) -> u64 {
        self.frames.total()
    }

    /// Build an observation from one entry of a week's JSON document.
    pub fn from_json(id: &str, value: Value) -> std::result::Result<Self, MalformedRecord> {
        if !value.is_object() {
            return Err(MalformedRecord::new(id, "entry is not an object"));
        }

        let raw: RawObservation =
            serde_json::from_value(value).map_err(|e| MalformedRecord::new(id, e.to_string()))?;

        let missing = |field: &str| MalformedRecord::new(id, format!("missing field `{field}`"));
        let name = raw.camera.ok_or_else(|| missing("camera"))?;
        let uptime = raw.uptime.ok_or_else(|| missing("uptime"))?;
        let storage_used = raw.used_storage.ok_or_else(|| missing("used_storage"))?;
        let total = raw.total.ok_or_else(|| missing("total"))?;

        Ok(Self {
            id: id.to_string(),
            name,
            uptime: uptime.trim().to_string(),
            storage_used,
            total,
            infractions: parse_daily(id, "infractions", raw.infractions)?,
            frames: parse_daily(id, "frames", raw.frames)?,
        })
    }
}

/// Wire shape of a single camera entry.
#[derive(Debug, Deserialize)]
struct RawObservation {
    camera: Option<String>,
    uptime: Option<String>,
    used_storage: Option<String>,
    total: Option<u64>,
    infractions: Option<BTreeMap<String, u64>>,
    frames: Option<BTreeMap<String, u64>>,
}

fn parse_daily(
    id: &str,
    field: &str,
    raw: Option<BTreeMap<String, u64>>,
) -> std::result::Result<DailyCounts, MalformedRecord> {
    raw.unwrap_or_default()
        .into_iter()
        .map(|(date, count)| {
            ObservationDate::parse(&date)
                .map(|date| (date, count))
                .map_err(|e| MalformedRecord::new(id, format!("{field}: {e}")))
        })
        .collect()
}

// ==================== Period Record Sets ====================

/// All camera observations for a single week, in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeriodRecordSet {
    devices: Vec<DeviceObservation>,
    rejected: Vec<MalformedRecord>,
}

impl PeriodRecordSet {
    /// Build a record set from observations. A repeated identifier keeps the
    /// first observation and rejects the later ones.
    pub fn new(devices: impl IntoIterator<Item = DeviceObservation>) -> Self {
        let mut set = Self::default();
        let mut seen = HashSet::new();
        for device in devices {
            if seen.insert(device.id.clone()) {
                set.devices.push(device);
            } else {
                set.reject(MalformedRecord::new(&device.id, "duplicate camera identifier"));
            }
        }
        set
    }

    /// Decode a week's JSON document (an object keyed by camera identifier).
    ///
    /// Entries that fail validation are kept aside in [`Self::rejected`]; only
    /// a document that is not an object at all is an error.
    pub fn from_json(value: Value) -> Result<Self> {
        let Value::Object(entries) = value else {
            return Err(MonitorError::Decode(serde::de::Error::custom(
                "expected an object keyed by camera identifier",
            )));
        };

        let mut set = Self::default();
        for (id, entry) in entries {
            match DeviceObservation::from_json(&id, entry) {
                Ok(device) => set.devices.push(device),
                Err(rejected) => set.reject(rejected),
            }
        }
        Ok(set)
    }

    fn reject(&mut self, rejected: MalformedRecord) {
        tracing::warn!(
            device_id = %rejected.device_id,
            reason = %rejected.reason,
            "Skipping malformed camera entry"
        );
        self.rejected.push(rejected);
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Self::from_json(serde_json::from_str(text)?)
    }

    pub fn devices(&self) -> &[DeviceObservation] {
        &self.devices
    }

    pub fn get(&self, device_id: &str) -> Option<&DeviceObservation> {
        self.devices.iter().find(|d| d.id == device_id)
    }

    /// Devices dropped at ingestion, with the reason.
    pub fn rejected(&self) -> &[MalformedRecord] {
        &self.rejected
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

/// Lookup results for the weeks of a month. `None` marks a week the source
/// has no data for.
pub type PeriodMap = BTreeMap<PeriodOrdinal, Option<PeriodRecordSet>>;

/// Weeks that have data, ascending.
pub fn present_periods(periods: &PeriodMap) -> impl Iterator<Item = (PeriodOrdinal, &PeriodRecordSet)> {
    periods
        .iter()
        .filter_map(|(ordinal, set)| set.as_ref().map(|set| (*ordinal, set)))
}
