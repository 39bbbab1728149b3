//! Abstraction over where weekly camera data comes from.
//!
//! This module provides:
//! - `PeriodSource`: looks up the record set of one week of one month
//! - `MockPeriodSource`: an in-memory source for deterministic tests

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{MonitorError, Result};
use crate::model::{Month, PeriodMap, PeriodOrdinal, PeriodRecordSet, present_periods};

// ==================== PeriodSource Trait ====================

/// Source of weekly record sets.
///
/// A week with no backing data resolves to `Ok(None)`; `Err` is reserved
/// for failures such as an unreachable source or an undecodable document.
pub trait PeriodSource: Send + Sync {
    /// Look up the record set for one week of `month`.
    fn resolve_period(
        &self,
        month: &Month,
        period: PeriodOrdinal,
    ) -> impl Future<Output = Result<Option<PeriodRecordSet>>> + Send;

    /// Look up every candidate week of `month` at once.
    fn fetch_month(&self, month: &Month) -> impl Future<Output = Result<PeriodMap>> + Send {
        async move {
            let [w1, w2, w3, w4, w5] = PeriodOrdinal::all();
            let (r1, r2, r3, r4, r5) = tokio::join!(
                self.resolve_period(month, w1),
                self.resolve_period(month, w2),
                self.resolve_period(month, w3),
                self.resolve_period(month, w4),
                self.resolve_period(month, w5),
            );

            let mut periods = PeriodMap::new();
            for (week, result) in [(w1, r1), (w2, r2), (w3, r3), (w4, r4), (w5, r5)] {
                periods.insert(week, result?);
            }
            Ok(periods)
        }
    }

    /// Weeks of `month` that have data, ascending.
    fn list_available_periods(
        &self,
        month: &Month,
    ) -> impl Future<Output = Result<Vec<PeriodOrdinal>>> + Send {
        async move {
            let periods = self.fetch_month(month).await?;
            Ok(present_periods(&periods).map(|(week, _)| week).collect())
        }
    }
}

// ==================== Mock Source ====================

type WeekKey = (String, PeriodOrdinal);

/// In-memory source for testing that records every lookup.
#[derive(Debug, Clone, Default)]
pub struct MockPeriodSource {
    weeks: Arc<Mutex<HashMap<WeekKey, PeriodRecordSet>>>,
    failing: Arc<Mutex<HashSet<WeekKey>>>,
    lookups: Arc<Mutex<Vec<WeekKey>>>,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockPeriodSource {
    /// Create an empty mock source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `records` for the given week.
    pub fn insert(&self, month: &Month, period: PeriodOrdinal, records: PeriodRecordSet) {
        locked(&self.weeks).insert((month.path_segment(), period), records);
    }

    /// Builder form of [`Self::insert`].
    pub fn with_period(self, month: &Month, period: PeriodOrdinal, records: PeriodRecordSet) -> Self {
        self.insert(month, period, records);
        self
    }

    /// Make lookups of the given week fail as if the source returned 500.
    pub fn fail_period(&self, month: &Month, period: PeriodOrdinal) {
        locked(&self.failing).insert((month.path_segment(), period));
    }

    /// Number of lookups made so far.
    pub fn lookup_count(&self) -> usize {
        locked(&self.lookups).len()
    }
}

impl PeriodSource for MockPeriodSource {
    async fn resolve_period(
        &self,
        month: &Month,
        period: PeriodOrdinal,
    ) -> Result<Option<PeriodRecordSet>> {
        let key = (month.path_segment(), period);
        locked(&self.lookups).push(key.clone());

        if locked(&self.failing).contains(&key) {
            return Err(MonitorError::Status {
                url: format!("mock://{}/{}", key.0, period),
                status: 500,
            });
        }

        Ok(locked(&self.weeks).get(&key).cloned())
    }
}
