//! Replay recorded feature windows through the predictor and tracker

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use colored::Colorize;
use met_core::history::week_bounds;
use met_core::predictor::InferenceEngine;
use met_core::tracker::dominant_class;
use met_core::{
    format_hms, ActivityLog, ActivityRecord, ActivitySession, ActivityTracker, DailySummary,
    MergeOutcome, MetClass, MetPredictor,
};
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use std::path::Path;
use tabled::Tabled;
use tracing::warn;

use crate::output::{color_class, format_confidence, print_info, print_json, print_table, OutputFormat};

/// One recorded feature window
#[derive(Debug, Deserialize)]
pub struct FeatureSample {
    pub timestamp_ms: i64,
    pub features: Vec<f32>,
}

/// Everything produced by a replay
#[derive(Debug, Default, Serialize)]
pub struct ReplayReport {
    pub samples: usize,
    pub failures: usize,
    pub sessions: Vec<ActivitySession>,
    /// Merged history, one record per date and class
    pub records: Vec<ActivityRecord>,
    /// Records discarded for being less confident than the stored one
    pub dropped_records: usize,
    /// Records removed by the retention window
    pub pruned_records: usize,
    pub summaries: Vec<DailySummary>,
    /// Summaries for the week holding the last sample
    pub weekly: Vec<DailySummary>,
    pub dominant_class: Option<MetClass>,
}

/// Row for sessions table
#[derive(Tabled)]
struct SessionRow {
    #[tabled(rename = "Start")]
    start: String,
    #[tabled(rename = "Duration")]
    duration: String,
    #[tabled(rename = "Activity")]
    met_class: String,
    #[tabled(rename = "Confidence")]
    confidence: String,
}

/// Row for daily summary table
#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Sedentary")]
    sedentary: u32,
    #[tabled(rename = "Light")]
    light: u32,
    #[tabled(rename = "Moderate")]
    moderate: u32,
    #[tabled(rename = "Vigorous")]
    vigorous: u32,
    #[tabled(rename = "Total")]
    total: u32,
}

/// Parse JSON lines, skipping blank lines
pub fn parse_samples(reader: impl BufRead) -> Result<Vec<FeatureSample>> {
    let mut samples = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read replay input")?;
        if line.trim().is_empty() {
            continue;
        }
        let sample = serde_json::from_str(&line)
            .with_context(|| format!("Invalid sample on line {}", i + 1))?;
        samples.push(sample);
    }
    Ok(samples)
}

fn timestamp(ms: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .with_context(|| format!("Timestamp out of range: {}", ms))
}

fn store(log: &mut ActivityLog, record: ActivityRecord, report: &mut ReplayReport) {
    if log.merge(record) == MergeOutcome::Dropped {
        report.dropped_records += 1;
    }
}

/// Run `samples` in order through the predictor, a fresh tracker and an
/// empty activity history
pub fn replay<E: InferenceEngine>(
    predictor: &MetPredictor<E>,
    samples: &[FeatureSample],
) -> Result<ReplayReport> {
    let mut report = ReplayReport {
        samples: samples.len(),
        ..Default::default()
    };
    let Some(first) = samples.first() else {
        return Ok(report);
    };

    let mut tracker = ActivityTracker::new(timestamp(first.timestamp_ms)?);
    let mut log = ActivityLog::new();
    let mut last = timestamp(first.timestamp_ms)?;

    for sample in samples {
        let now = timestamp(sample.timestamp_ms)?;
        last = now;

        match predictor.predict_with_confidence(&sample.features) {
            Ok(result) => report.sessions.extend(tracker.observe(result, now)),
            Err(e) => {
                warn!(error = %e, timestamp_ms = sample.timestamp_ms, "Prediction failed");
                report.failures += 1;
                tracker.observe_failure();
            }
        }
        if let Some(record) = tracker.tick(now) {
            store(&mut log, record, &mut report);
        }
    }

    let (session, record) = tracker.finish(last);
    report.sessions.extend(session);
    store(&mut log, record, &mut report);

    let today = last.date_naive();
    report.pruned_records = log.prune_expired(today);
    report.summaries = log.daily_summaries();
    report.weekly = log.weekly_summaries(today);
    report.dominant_class = dominant_class(log.records());
    report.records = log.records().to_vec();

    Ok(report)
}

/// Replay a JSON-lines file and print sessions and daily summaries
pub fn run<E: InferenceEngine>(
    predictor: &MetPredictor<E>,
    path: &Path,
    format: OutputFormat,
) -> Result<()> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let samples = parse_samples(std::io::BufReader::new(file))?;
    let report = replay(predictor, &samples)?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            print_info(&format!(
                "Replayed {} samples ({} failed, {} records dropped, {} pruned)",
                report.samples, report.failures, report.dropped_records, report.pruned_records
            ));
            println!();
            println!("{}", "Sessions".bold());
            let sessions: Vec<SessionRow> = report
                .sessions
                .iter()
                .map(|s| SessionRow {
                    start: s.start.format("%Y-%m-%d %H:%M:%S").to_string(),
                    duration: format_hms(s.duration_secs().max(0) as u64),
                    met_class: color_class(s.met_class),
                    confidence: format_confidence(s.confidence),
                })
                .collect();
            print_table(&sessions);

            println!();
            println!("{}", "Daily minutes".bold());
            print_table(&summary_rows(&report.summaries));

            if let Some(last) = report.records.iter().map(|r| r.date).max() {
                let (monday, sunday) = week_bounds(last);
                println!();
                println!("{}", format!("Week {} to {}", monday, sunday).bold());
                print_table(&summary_rows(&report.weekly));
            }

            if let Some(class) = report.dominant_class {
                println!("Dominant activity: {}", color_class(class));
            }
        }
    }

    Ok(())
}

fn summary_rows(summaries: &[DailySummary]) -> Vec<SummaryRow> {
    summaries
        .iter()
        .map(|s| SummaryRow {
            date: s.date.to_string(),
            sedentary: s.sedentary_minutes,
            light: s.light_minutes,
            moderate: s.moderate_minutes,
            vigorous: s.vigorous_minutes,
            total: s.total_minutes(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use met_core::predictor::{
        InferenceSession, ModelOutputs, RawModelOutput, SessionOptions, StaticModelSource,
        DEFAULT_MODEL_ASSET,
    };
    use met_core::{PredictorConfig, TractEngine};

    /// Engine whose probabilities are the input features
    struct EchoEngine;

    struct EchoSession;

    impl InferenceSession for EchoSession {
        fn input_name(&self) -> &str {
            "float_input"
        }

        fn run(&self, _input_name: &str, features: &[f32]) -> met_core::Result<ModelOutputs> {
            Ok(ModelOutputs::new(vec![RawModelOutput::Probabilities(features.to_vec())]))
        }
    }

    impl InferenceEngine for EchoEngine {
        type Session = EchoSession;

        fn create_session(&self, _bytes: &[u8], _options: &SessionOptions) -> met_core::Result<EchoSession> {
            Ok(EchoSession)
        }
    }

    const START_MS: i64 = 1_714_550_400_000;

    fn samples(from_secs: i64, to_secs: i64, features: &[f32]) -> Vec<FeatureSample> {
        (from_secs..=to_secs)
            .step_by(10)
            .map(|secs| FeatureSample {
                timestamp_ms: START_MS + secs * 1000,
                features: features.to_vec(),
            })
            .collect()
    }

    #[test]
    fn test_parse_samples() {
        let input = b"{\"timestamp_ms\": 0, \"features\": [0.1, 0.2]}\n\n{\"timestamp_ms\": 1000, \"features\": []}\n";
        let samples = parse_samples(&input[..]).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].features, vec![0.1, 0.2]);
        assert_eq!(samples[1].timestamp_ms, 1000);
    }

    #[test]
    fn test_parse_reports_bad_line() {
        let input = b"{\"timestamp_ms\": 0, \"features\": []}\nnot json\n";
        let err = parse_samples(&input[..]).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_replay_without_session_records_sedentary_minutes() {
        let predictor = MetPredictor::new(TractEngine, PredictorConfig::default()).unwrap();
        let samples: Vec<FeatureSample> = (0..=180)
            .step_by(5)
            .map(|secs| FeatureSample {
                timestamp_ms: 1_714_550_400_000 + secs * 1000,
                features: vec![0.1; 9],
            })
            .collect();

        let report = replay(&predictor, &samples).unwrap();
        assert_eq!(report.failures, 0);
        assert_eq!(report.sessions.len(), 1);
        assert_eq!(report.sessions[0].met_class, MetClass::Sedentary);
        assert_eq!(report.sessions[0].duration_secs(), 180);
        assert_eq!(report.summaries.len(), 1);
        assert_eq!(report.summaries[0].sedentary_minutes, 4);
        assert_eq!(report.summaries[0].total_minutes(), 4);
        assert_eq!(report.dominant_class, Some(MetClass::Sedentary));
    }

    #[test]
    fn test_replay_drops_less_confident_minutes() {
        let predictor = MetPredictor::new(EchoEngine, PredictorConfig::default()).unwrap();
        predictor
            .init(&StaticModelSource::new(DEFAULT_MODEL_ASSET, Vec::new()))
            .unwrap();

        let mut input = samples(0, 120, &[0.05, 0.9, 0.03, 0.02]);
        input.extend(samples(130, 240, &[0.1, 0.05, 0.8, 0.05]));
        input.extend(samples(250, 360, &[0.3, 0.5, 0.1, 0.1]));

        let report = replay(&predictor, &input).unwrap();
        assert_eq!(report.sessions.len(), 3);
        assert_eq!(report.records.len(), 2);
        // the three Light minutes at 0.5 lose to the stored 0.9
        assert_eq!(report.dropped_records, 3);

        let summary = &report.summaries[0];
        assert_eq!(summary.light_minutes, 2);
        assert_eq!(summary.moderate_minutes, 2);
        assert_eq!(summary.total_minutes(), 4);
        assert_eq!(report.weekly, report.summaries);
        assert_eq!(report.dominant_class, Some(MetClass::Light));
    }

    #[test]
    fn test_replay_prunes_records_older_than_a_month() {
        let predictor = MetPredictor::new(TractEngine, PredictorConfig::default()).unwrap();
        let forty_days_ms = 40 * 24 * 60 * 60 * 1000;
        let mut input = samples(0, 60, &[0.1; 9]);
        input.extend(samples(0, 60, &[0.1; 9]).into_iter().map(|s| FeatureSample {
            timestamp_ms: s.timestamp_ms + forty_days_ms,
            ..s
        }));

        let report = replay(&predictor, &input).unwrap();
        assert_eq!(report.pruned_records, 1);
        assert_eq!(report.summaries.len(), 1);
        assert_eq!(report.weekly.len(), 1);
        assert!(report.records.iter().all(|r| r.date == report.summaries[0].date));
    }

    #[test]
    fn test_replay_empty_input() {
        let predictor = MetPredictor::new(TractEngine, PredictorConfig::default()).unwrap();
        let report = replay(&predictor, &[]).unwrap();
        assert_eq!(report.samples, 0);
        assert!(report.records.is_empty());
    }
}
