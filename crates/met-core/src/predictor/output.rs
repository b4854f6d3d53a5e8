//! Model output interpretation
//!
//! Engines disagree on how a classifier reports its answer: some emit a hard
//! label, some a class-ordered probability row, and some (scikit-learn exports
//! with a ZipMap node) a name -> probability map in a second slot. Outputs are
//! decoded into [`RawModelOutput`] at the engine boundary and reduced here to a
//! single [`PredictionResult`].

use super::labels::ClassLabelSet;
use crate::models::{MetClass, PredictionResult};
use std::collections::HashMap;
use tracing::{debug, warn};

/// One decoded output slot
#[derive(Debug, Clone, PartialEq)]
pub enum RawModelOutput {
    /// Class index chosen by the engine
    Label(i64),
    /// Per-class scores in class index order
    Probabilities(Vec<f32>),
    /// Per-class scores keyed by class name
    ProbabilityMap(HashMap<String, f32>),
    /// A slot of a type no decoding rule understands
    Unsupported(String),
}

impl RawModelOutput {
    fn kind(&self) -> &'static str {
        match self {
            RawModelOutput::Label(_) => "label",
            RawModelOutput::Probabilities(_) => "probabilities",
            RawModelOutput::ProbabilityMap(_) => "probability_map",
            RawModelOutput::Unsupported(_) => "unsupported",
        }
    }
}

/// All output slots of a single inference run, in engine order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelOutputs {
    slots: Vec<RawModelOutput>,
}

impl ModelOutputs {
    pub fn new(slots: Vec<RawModelOutput>) -> Self {
        Self { slots }
    }

    pub fn slot(&self, index: usize) -> Option<&RawModelOutput> {
        self.slots.get(index)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl From<Vec<RawModelOutput>> for ModelOutputs {
    fn from(slots: Vec<RawModelOutput>) -> Self {
        Self::new(slots)
    }
}

/// Which decoding rule produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoding {
    Label,
    Probabilities { slot: usize },
    ProbabilityMap,
    Unrecognized,
}

/// Reduces raw model outputs to a canonical class and confidence
#[derive(Debug, Clone, Default)]
pub struct OutputInterpreter {
    labels: ClassLabelSet,
}

impl OutputInterpreter {
    pub fn new() -> Self {
        Self {
            labels: ClassLabelSet,
        }
    }

    /// Interpret `outputs`, never failing
    pub fn extract(&self, outputs: &ModelOutputs) -> PredictionResult {
        self.extract_with_decoding(outputs).0
    }

    /// Interpret `outputs` and report which rule matched
    ///
    /// Rules are tried in order and the first match wins:
    /// 1. slot 0 hard label, confidence 1.0
    /// 2. slot 0 probability row, argmax
    /// 3. slot 1 probability row, argmax
    /// 4. slot 1 probability map, max over the canonical names
    /// 5. otherwise Sedentary with confidence 0.0
    pub fn extract_with_decoding(&self, outputs: &ModelOutputs) -> (PredictionResult, Decoding) {
        match outputs.slot(0) {
            Some(RawModelOutput::Label(label)) => {
                return (self.from_label(*label), Decoding::Label);
            }
            Some(RawModelOutput::Probabilities(scores)) if !scores.is_empty() => {
                return (
                    self.from_scores(scores),
                    Decoding::Probabilities { slot: 0 },
                );
            }
            _ => {}
        }

        match outputs.slot(1) {
            Some(RawModelOutput::Probabilities(scores)) if !scores.is_empty() => {
                return (
                    self.from_scores(scores),
                    Decoding::Probabilities { slot: 1 },
                );
            }
            Some(RawModelOutput::ProbabilityMap(map)) => {
                if let Some(result) = self.from_map(map) {
                    return (result, Decoding::ProbabilityMap);
                }
            }
            _ => {}
        }

        let kinds: Vec<&str> = (0..outputs.len())
            .filter_map(|i| outputs.slot(i).map(RawModelOutput::kind))
            .collect();
        warn!(slots = ?kinds, "No recognized output encoding, assuming sedentary");
        (PredictionResult::fallback(), Decoding::Unrecognized)
    }

    fn from_label(&self, label: i64) -> PredictionResult {
        match self.labels.class_for_label(label) {
            Some(class) => PredictionResult::certain(class),
            None => {
                warn!(label, "Engine label outside the class table");
                PredictionResult::fallback()
            }
        }
    }

    fn from_scores(&self, scores: &[f32]) -> PredictionResult {
        let Some(idx) = argmax(scores) else {
            return PredictionResult::fallback();
        };
        match self.labels.class_at(idx) {
            Some(class) => PredictionResult::new(class, clamp_confidence(scores[idx])),
            None => {
                warn!(
                    index = idx,
                    width = scores.len(),
                    "Probability argmax outside the class table"
                );
                PredictionResult::fallback()
            }
        }
    }

    fn from_map(&self, map: &HashMap<String, f32>) -> Option<PredictionResult> {
        let mut best: Option<(MetClass, f32)> = None;
        let mut top = f32::MIN;
        for (name, class) in self.labels.iter() {
            let Some(&score) = map.get(name) else {
                continue;
            };
            if score > top {
                top = score;
                best = Some((class, score));
            }
        }

        if best.is_none() {
            debug!(keys = map.len(), "Probability map has no canonical class names");
        }
        best.map(|(class, score)| PredictionResult::new(class, clamp_confidence(score)))
    }
}

/// Index of the first maximal element, or `None` for an empty slice
///
/// Scans in index order with a strict `>`, so on ties the lowest index wins.
pub fn argmax(values: &[f32]) -> Option<usize> {
    let (first, rest) = values.split_first()?;
    let mut best = 0;
    let mut top = *first;
    for (i, &v) in rest.iter().enumerate() {
        if v > top {
            top = v;
            best = i + 1;
        }
    }
    Some(best)
}

fn clamp_confidence(raw: f32) -> f32 {
    if raw.is_nan() {
        0.0
    } else {
        raw.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probs(values: &[f32]) -> RawModelOutput {
        RawModelOutput::Probabilities(values.to_vec())
    }

    fn prob_map(entries: &[(&str, f32)]) -> RawModelOutput {
        RawModelOutput::ProbabilityMap(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
        )
    }

    fn extract(slots: Vec<RawModelOutput>) -> (PredictionResult, Decoding) {
        OutputInterpreter::new().extract_with_decoding(&ModelOutputs::new(slots))
    }

    #[test]
    fn test_slot0_label_is_fully_confident() {
        let (result, decoding) = extract(vec![RawModelOutput::Label(2)]);
        assert_eq!(result, PredictionResult::new(MetClass::Moderate, 1.0));
        assert_eq!(decoding, Decoding::Label);
    }

    #[test]
    fn test_label_wins_over_slot1_probabilities() {
        let (result, decoding) = extract(vec![
            RawModelOutput::Label(1),
            probs(&[0.0, 0.1, 0.2, 0.7]),
        ]);
        assert_eq!(result, PredictionResult::new(MetClass::Light, 1.0));
        assert_eq!(decoding, Decoding::Label);
    }

    #[test]
    fn test_slot0_probabilities_argmax() {
        let (result, decoding) = extract(vec![probs(&[0.1, 0.2, 0.65, 0.05])]);
        assert_eq!(result.met_class, MetClass::Moderate);
        assert!((result.confidence - 0.65).abs() < f32::EPSILON);
        assert_eq!(decoding, Decoding::Probabilities { slot: 0 });
    }

    #[test]
    fn test_slot1_probabilities_after_unsupported_slot0() {
        let (result, decoding) = extract(vec![
            RawModelOutput::Unsupported("string tensor".into()),
            probs(&[0.05, 0.05, 0.1, 0.8]),
        ]);
        assert_eq!(result.met_class, MetClass::Vigorous);
        assert!((result.confidence - 0.8).abs() < f32::EPSILON);
        assert_eq!(decoding, Decoding::Probabilities { slot: 1 });
    }

    #[test]
    fn test_slot1_map_picks_maximum() {
        let (result, decoding) = extract(vec![
            RawModelOutput::Unsupported("string tensor".into()),
            prob_map(&[
                ("Sedentary", 0.1),
                ("Light", 0.7),
                ("Moderate", 0.15),
                ("Vigorous", 0.05),
            ]),
        ]);
        assert_eq!(result.met_class, MetClass::Light);
        assert!((result.confidence - 0.7).abs() < f32::EPSILON);
        assert_eq!(decoding, Decoding::ProbabilityMap);
    }

    #[test]
    fn test_map_tie_goes_to_lowest_index() {
        let (result, _) = extract(vec![
            RawModelOutput::Unsupported("string tensor".into()),
            prob_map(&[
                ("Sedentary", 0.3),
                ("Light", 0.3),
                ("Moderate", 0.3),
                ("Vigorous", 0.1),
            ]),
        ]);
        assert_eq!(result.met_class, MetClass::Sedentary);
        assert!((result.confidence - 0.3).abs() < f32::EPSILON);

        let (result, _) = extract(vec![
            RawModelOutput::Unsupported("string tensor".into()),
            prob_map(&[("Light", 0.4), ("Moderate", 0.4), ("Vigorous", 0.2)]),
        ]);
        assert_eq!(result.met_class, MetClass::Light);
    }

    #[test]
    fn test_map_ignores_unknown_and_missing_keys() {
        let (result, _) = extract(vec![
            RawModelOutput::Unsupported("string tensor".into()),
            prob_map(&[("Running", 0.99), ("Moderate", 0.2)]),
        ]);
        assert_eq!(result, PredictionResult::new(MetClass::Moderate, 0.2));
    }

    #[test]
    fn test_map_without_canonical_keys_falls_back() {
        let (result, decoding) = extract(vec![
            RawModelOutput::Unsupported("string tensor".into()),
            prob_map(&[("walking", 0.9)]),
        ]);
        assert_eq!(result, PredictionResult::fallback());
        assert_eq!(decoding, Decoding::Unrecognized);
    }

    #[test]
    fn test_no_slots_falls_back() {
        let (result, decoding) = extract(vec![]);
        assert_eq!(result, PredictionResult::fallback());
        assert_eq!(decoding, Decoding::Unrecognized);
    }

    #[test]
    fn test_slot1_label_is_not_recognized() {
        let (result, _) = extract(vec![
            RawModelOutput::Unsupported("string tensor".into()),
            RawModelOutput::Label(3),
        ]);
        assert_eq!(result, PredictionResult::fallback());
    }

    #[test]
    fn test_empty_slot0_probabilities_fall_through_to_slot1() {
        let (result, decoding) = extract(vec![probs(&[]), probs(&[0.9, 0.1])]);
        assert_eq!(result.met_class, MetClass::Sedentary);
        assert!((result.confidence - 0.9).abs() < f32::EPSILON);
        assert_eq!(decoding, Decoding::Probabilities { slot: 1 });
    }

    #[test]
    fn test_out_of_range_indices_fall_back() {
        let (result, _) = extract(vec![RawModelOutput::Label(7)]);
        assert_eq!(result, PredictionResult::fallback());

        let (result, _) = extract(vec![RawModelOutput::Label(-1)]);
        assert_eq!(result, PredictionResult::fallback());

        let (result, _) = extract(vec![probs(&[0.1, 0.1, 0.1, 0.1, 0.6])]);
        assert_eq!(result, PredictionResult::fallback());
    }

    #[test]
    fn test_confidence_clamped() {
        let (result, _) = extract(vec![probs(&[0.2, 3.5])]);
        assert_eq!(result, PredictionResult::new(MetClass::Light, 1.0));

        let (result, _) = extract(vec![probs(&[f32::NAN, 0.4])]);
        assert_eq!(result, PredictionResult::new(MetClass::Sedentary, 0.0));
    }

    #[test]
    fn test_argmax_edge_cases() {
        assert_eq!(argmax(&[0.9]), Some(0));
        assert_eq!(argmax(&[]), None);
        assert_eq!(argmax(&[0.5, 0.5, 0.2]), Some(0));
        assert_eq!(argmax(&[0.1, 0.5, 0.5]), Some(1));
        assert_eq!(argmax(&[-3.0, -1.0, -2.0]), Some(1));
    }
}
