//! Core data models for the MET classifier

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Metabolic-equivalent activity intensity class
///
/// Discriminants are the class indices shared by every model output encoding.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum MetClass {
    #[default]
    Sedentary = 0,
    Light = 1,
    Moderate = 2,
    Vigorous = 3,
}

impl MetClass {
    /// All classes in index order
    pub const ALL: [MetClass; 4] = [
        MetClass::Sedentary,
        MetClass::Light,
        MetClass::Moderate,
        MetClass::Vigorous,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            MetClass::Sedentary => "Sedentary",
            MetClass::Light => "Light",
            MetClass::Moderate => "Moderate",
            MetClass::Vigorous => "Vigorous",
        }
    }
}

impl fmt::Display for MetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Interpreted model output: a class and the model's confidence in it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub met_class: MetClass,
    pub confidence: f32,
}

impl PredictionResult {
    pub fn new(met_class: MetClass, confidence: f32) -> Self {
        Self {
            met_class,
            confidence,
        }
    }

    /// A hard label with no probability signal
    pub fn certain(met_class: MetClass) -> Self {
        Self::new(met_class, 1.0)
    }

    /// The safe default: assume inactivity with no confidence
    pub fn fallback() -> Self {
        Self::new(MetClass::Sedentary, 0.0)
    }
}

/// A contiguous period spent in a single activity class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySession {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub met_class: MetClass,
    pub confidence: f32,
    pub date: NaiveDate,
}

impl ActivitySession {
    pub fn duration_secs(&self) -> i64 {
        (self.end - self.start).num_seconds()
    }
}

/// Minutes of activity accounted to a class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub date: NaiveDate,
    pub met_class: MetClass,
    pub duration_minutes: u32,
    pub confidence: f32,
    pub timestamp: DateTime<Utc>,
}

/// Minutes per activity class for one day
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub sedentary_minutes: u32,
    pub light_minutes: u32,
    pub moderate_minutes: u32,
    pub vigorous_minutes: u32,
}

impl DailySummary {
    /// Aggregate the records that fall on `date`
    pub fn from_records(date: NaiveDate, records: &[ActivityRecord]) -> Self {
        let mut summary = Self {
            date,
            ..Default::default()
        };
        for record in records.iter().filter(|r| r.date == date) {
            let slot = match record.met_class {
                MetClass::Sedentary => &mut summary.sedentary_minutes,
                MetClass::Light => &mut summary.light_minutes,
                MetClass::Moderate => &mut summary.moderate_minutes,
                MetClass::Vigorous => &mut summary.vigorous_minutes,
            };
            *slot = slot.saturating_add(record.duration_minutes);
        }
        summary
    }

    /// Sum of all class minutes, saturating at `u32::MAX`
    pub fn total_minutes(&self) -> u32 {
        self.sedentary_minutes
            .saturating_add(self.light_minutes)
            .saturating_add(self.moderate_minutes)
            .saturating_add(self.vigorous_minutes)
    }

    pub fn minutes_for(&self, met_class: MetClass) -> u32 {
        match met_class {
            MetClass::Sedentary => self.sedentary_minutes,
            MetClass::Light => self.light_minutes,
            MetClass::Moderate => self.moderate_minutes,
            MetClass::Vigorous => self.vigorous_minutes,
        }
    }
}

/// Format a duration as `HH:MM:SS`
pub fn format_hms(total_seconds: u64) -> String {
    let h = total_seconds / 3600;
    let m = (total_seconds % 3600) / 60;
    let s = total_seconds % 60;
    format!("{:02}:{:02}:{:02}", h, m, s)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(date: NaiveDate, met_class: MetClass, minutes: u32) -> ActivityRecord {
        ActivityRecord {
            date,
            met_class,
            duration_minutes: minutes,
            confidence: 0.9,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_class_indices_follow_declaration_order() {
        for (i, class) in MetClass::ALL.iter().enumerate() {
            assert_eq!(class.index(), i);
        }
        assert_eq!(MetClass::default(), MetClass::Sedentary);
    }

    #[test]
    fn test_daily_summary_aggregation() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2024, 4, 30).unwrap();
        let records = vec![
            record(today, MetClass::Light, 1),
            record(today, MetClass::Light, 1),
            record(today, MetClass::Vigorous, 3),
            record(yesterday, MetClass::Moderate, 10),
        ];

        let summary = DailySummary::from_records(today, &records);
        assert_eq!(summary.minutes_for(MetClass::Light), 2);
        assert_eq!(summary.minutes_for(MetClass::Vigorous), 3);
        assert_eq!(summary.minutes_for(MetClass::Moderate), 0);
        assert_eq!(summary.total_minutes(), 5);
    }

    #[test]
    fn test_daily_summary_totals_saturate() {
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let records = vec![
            record(day, MetClass::Sedentary, u32::MAX),
            record(day, MetClass::Light, 1),
            record(day, MetClass::Light, u32::MAX),
        ];

        let summary = DailySummary::from_records(day, &records);
        assert_eq!(summary.sedentary_minutes, u32::MAX);
        assert_eq!(summary.light_minutes, u32::MAX);
        assert_eq!(summary.total_minutes(), u32::MAX);
    }

    #[test]
    fn test_format_hms() {
        assert_eq!(format_hms(0), "00:00:00");
        assert_eq!(format_hms(3725), "01:02:05");
        assert_eq!(format_hms(36_000), "10:00:00");
    }

    #[test]
    fn test_prediction_result_serializes_class_name() {
        let json = serde_json::to_string(&PredictionResult::certain(MetClass::Moderate)).unwrap();
        assert_eq!(json, r#"{"met_class":"Moderate","confidence":1.0}"#);
    }
}
