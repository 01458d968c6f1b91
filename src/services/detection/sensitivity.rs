// Sensitivity utilities
// Sensitivity picks the similarity threshold, never the raw scores.

use crate::models::{Classification, Report};

pub const DEFAULT_THRESHOLD: f64 = 0.70;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DetectionSensitivity {
    Low,
    Medium,
    High,
}

impl DetectionSensitivity {
    pub fn from_str(val: &str) -> Self {
        match val.trim().to_lowercase().as_str() {
            "low" => Self::Low,
            "high" => Self::High,
            _ => Self::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Higher sensitivity flags at lower similarity.
    pub fn threshold(&self) -> f64 {
        match self {
            Self::Low => 0.80,
            Self::Medium => DEFAULT_THRESHOLD,
            Self::High => 0.55,
        }
    }
}

/// Explicit threshold wins; otherwise the sensitivity preset applies.
pub fn resolve_threshold(explicit: Option<f64>, sensitivity: &str) -> f64 {
    match explicit {
        Some(t) if t.is_finite() => t.clamp(0.0, 1.0),
        _ => DetectionSensitivity::from_str(sensitivity).threshold(),
    }
}

pub fn classify(similarity: f64, threshold: f64) -> Classification {
    Classification::from_similarity(similarity, threshold)
}

/// Classifications in report order, using the threshold recorded on the report.
pub fn classify_report(report: &Report) -> Vec<Classification> {
    report
        .entries
        .iter()
        .map(|e| classify(e.similarity, report.threshold))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ScoreEntry, Sentence};

    #[test]
    fn test_thresholds_order() {
        let low = DetectionSensitivity::Low.threshold();
        let mid = DetectionSensitivity::Medium.threshold();
        let high = DetectionSensitivity::High.threshold();
        assert!(low > mid);
        assert!(mid > high);
        assert_eq!(mid, 0.70);
    }

    #[test]
    fn test_resolve_threshold() {
        assert_eq!(resolve_threshold(Some(0.9), "high"), 0.9);
        assert_eq!(resolve_threshold(Some(1.5), "medium"), 1.0);
        assert_eq!(resolve_threshold(Some(f64::NAN), "low"), 0.80);
        assert_eq!(resolve_threshold(None, "unknown"), DEFAULT_THRESHOLD);
    }

    #[test]
    fn test_classify_examples() {
        assert_eq!(classify(0.85, 0.7), Classification::PossiblePlagiarism);
        assert_eq!(classify(0.5, 0.7), Classification::Original);
    }

    #[test]
    fn test_classify_report_uses_report_threshold() {
        let mut report = Report::new(0.6, 2);
        report.push(ScoreEntry::scored(0, Sentence::new("a", 0, 1), 0.65, 1, None));
        report.push(ScoreEntry::scored(1, Sentence::new("b", 2, 3), 0.2, 1, None));
        assert_eq!(
            classify_report(&report),
            vec![Classification::PossiblePlagiarism, Classification::Original]
        );
    }
}
