//! In-memory activity history
//!
//! Holds at most one [`ActivityRecord`] per date and class:
//! - New minutes merge into the stored record only when at least as confident
//! - Daily and Monday-to-Sunday weekly summaries
//! - One-month retention

use crate::models::{ActivityRecord, DailySummary};
use chrono::{Datelike, Duration, Months, NaiveDate};
use std::collections::BTreeSet;
use tracing::debug;

/// Records dated this many months before today are pruned
pub const RETENTION_MONTHS: u32 = 1;

/// What happened to a record passed to [`ActivityLog::merge`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// First record for its date and class
    Inserted,
    /// Minutes added to the stored record
    Merged,
    /// Less confident than the stored record; discarded
    Dropped,
}

/// Activity records keyed by date and class
#[derive(Debug, Clone, Default)]
pub struct ActivityLog {
    records: Vec<ActivityRecord>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[ActivityRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Fold `record` into the log
    ///
    /// An existing record for the same date and class absorbs the minutes and
    /// takes the new confidence and timestamp, but only if the new confidence
    /// is not lower than the stored one.
    pub fn merge(&mut self, record: ActivityRecord) -> MergeOutcome {
        let existing = self
            .records
            .iter_mut()
            .find(|r| r.date == record.date && r.met_class == record.met_class);

        match existing {
            None => {
                self.records.push(record);
                MergeOutcome::Inserted
            }
            Some(stored) if record.confidence >= stored.confidence => {
                stored.duration_minutes = stored.duration_minutes.saturating_add(record.duration_minutes);
                stored.confidence = record.confidence;
                stored.timestamp = record.timestamp;
                MergeOutcome::Merged
            }
            Some(stored) => {
                debug!(
                    date = %record.date,
                    met_class = %record.met_class,
                    confidence = record.confidence,
                    stored_confidence = stored.confidence,
                    "Dropping less confident activity record"
                );
                MergeOutcome::Dropped
            }
        }
    }

    /// Remove records dated before `cutoff`, returning how many were removed
    pub fn prune_before(&mut self, cutoff: NaiveDate) -> usize {
        let before = self.records.len();
        self.records.retain(|r| r.date >= cutoff);
        let removed = before - self.records.len();
        if removed > 0 {
            debug!(cutoff = %cutoff, removed, "Pruned old activity records");
        }
        removed
    }

    /// Apply the retention window relative to `today`
    pub fn prune_expired(&mut self, today: NaiveDate) -> usize {
        self.prune_before(retention_cutoff(today))
    }

    /// Summary for `date`, or `None` when nothing was recorded that day
    pub fn daily_summary(&self, date: NaiveDate) -> Option<DailySummary> {
        self.records
            .iter()
            .any(|r| r.date == date)
            .then(|| DailySummary::from_records(date, &self.records))
    }

    /// One summary per recorded date, oldest first
    pub fn daily_summaries(&self) -> Vec<DailySummary> {
        self.summaries_between(NaiveDate::MIN, NaiveDate::MAX)
    }

    /// Summaries for the recorded days of the Monday-to-Sunday week holding `date`
    pub fn weekly_summaries(&self, date: NaiveDate) -> Vec<DailySummary> {
        let (start, end) = week_bounds(date);
        self.summaries_between(start, end)
    }

    fn summaries_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<DailySummary> {
        let dates: BTreeSet<NaiveDate> = self
            .records
            .iter()
            .map(|r| r.date)
            .filter(|d| (start..=end).contains(d))
            .collect();
        dates
            .into_iter()
            .map(|date| DailySummary::from_records(date, &self.records))
            .collect()
    }
}

/// Monday and Sunday of the week containing `date`
pub fn week_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let monday = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
    (monday, monday + Duration::days(6))
}

/// Oldest date kept by the retention window
pub fn retention_cutoff(today: NaiveDate) -> NaiveDate {
    today
        .checked_sub_months(Months::new(RETENTION_MONTHS))
        .unwrap_or(NaiveDate::MIN)
}
