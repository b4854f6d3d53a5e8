//! Activity tracking over a stream of predictions
//!
//! Smooths per-window predictions into activity sessions and per-minute
//! records that can be rolled up into a [`DailySummary`](crate::models::DailySummary).

use crate::models::{ActivityRecord, ActivitySession, MetClass, PredictionResult};
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

/// Confidence gain needed to replace a prediction of the same class
pub const CONFIDENCE_HYSTERESIS: f32 = 0.1;

/// Sessions this short (in seconds) are not recorded
pub const MIN_SESSION_SECS: i64 = 30;

/// Seconds between activity records
pub const SAVE_INTERVAL_SECS: i64 = 60;

/// Configuration for the tracker
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub confidence_hysteresis: f32,
    pub min_session: Duration,
    pub save_interval: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            confidence_hysteresis: CONFIDENCE_HYSTERESIS,
            min_session: Duration::seconds(MIN_SESSION_SECS),
            save_interval: Duration::seconds(SAVE_INTERVAL_SECS),
        }
    }
}

/// Tracks the current activity and emits sessions and records
#[derive(Debug)]
pub struct ActivityTracker {
    config: TrackerConfig,
    current: PredictionResult,
    session_start: DateTime<Utc>,
    last_save: DateTime<Utc>,
}

impl ActivityTracker {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self::with_config(TrackerConfig::default(), started_at)
    }

    pub fn with_config(config: TrackerConfig, started_at: DateTime<Utc>) -> Self {
        Self {
            config,
            current: PredictionResult::fallback(),
            session_start: started_at,
            last_save: started_at,
        }
    }

    pub fn current(&self) -> PredictionResult {
        self.current
    }

    /// Feed a prediction
    ///
    /// The prediction is adopted if its class differs from the current one or
    /// its confidence is more than the hysteresis above the current
    /// confidence. A class change closes the running session, which is
    /// returned if it lasted longer than the minimum session length.
    pub fn observe(&mut self, result: PredictionResult, now: DateTime<Utc>) -> Option<ActivitySession> {
        let class_changed = result.met_class != self.current.met_class;
        let more_confident =
            result.confidence > self.current.confidence + self.config.confidence_hysteresis;
        if !class_changed && !more_confident {
            return None;
        }

        let finished = if class_changed {
            self.close_session(now)
        } else {
            None
        };

        debug!(
            from = %self.current.met_class,
            to = %result.met_class,
            confidence = result.confidence,
            "Current activity updated"
        );
        self.current = result;
        self.session_start = now;
        finished
    }

    /// Inference failed; assume inactivity
    pub fn observe_failure(&mut self) {
        self.current = PredictionResult::fallback();
    }

    /// Emit a one-minute record once the save interval has elapsed
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<ActivityRecord> {
        if now - self.last_save < self.config.save_interval {
            return None;
        }
        self.last_save = now;
        Some(self.record(now))
    }

    /// Close the running session and emit a final record
    pub fn finish(&mut self, now: DateTime<Utc>) -> (Option<ActivitySession>, ActivityRecord) {
        let session = self.close_session(now);
        self.session_start = now;
        self.last_save = now;
        (session, self.record(now))
    }

    fn close_session(&self, now: DateTime<Utc>) -> Option<ActivitySession> {
        let duration = now - self.session_start;
        if duration <= self.config.min_session {
            debug!(duration_secs = duration.num_seconds(), "Session too short to record");
            return None;
        }
        Some(ActivitySession {
            start: self.session_start,
            end: now,
            met_class: self.current.met_class,
            confidence: self.current.confidence,
            date: now.date_naive(),
        })
    }

    fn record(&self, now: DateTime<Utc>) -> ActivityRecord {
        ActivityRecord {
            date: now.date_naive(),
            met_class: self.current.met_class,
            duration_minutes: 1,
            confidence: self.current.confidence,
            timestamp: now,
        }
    }
}

/// Class with the most recorded minutes, ties going to the lower intensity
pub fn dominant_class(records: &[ActivityRecord]) -> Option<MetClass> {
    let mut minutes = [0u64; 4];
    for record in records {
        minutes[record.met_class.index()] += u64::from(record.duration_minutes);
    }
    let mut best: Option<(MetClass, u64)> = None;
    for class in MetClass::ALL {
        let m = minutes[class.index()];
        if m > best.map_or(0, |(_, top)| top) {
            best = Some((class, m));
        }
    }
    best.map(|(class, _)| class)
}
