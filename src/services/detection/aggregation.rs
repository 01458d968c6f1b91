// Aggregation Logic
// Rolls per-sentence entries up into a document-level summary

use crate::models::{Classification, Report, ReportSummary};

/// Summarize a report against `threshold`. Failed entries count as evaluated
/// with similarity 0.
pub fn summarize_report(report: &Report, threshold: f64) -> ReportSummary {
    let evaluated = report.entries.len();
    if evaluated == 0 {
        return ReportSummary {
            total_sentences: report.total_sentences,
            verdict: Classification::Original.label().to_string(),
            ..ReportSummary::default()
        };
    }

    let flagged = report
        .entries
        .iter()
        .filter(|e| e.classify(threshold) == Classification::PossiblePlagiarism)
        .count();
    let failed = report.entries.iter().filter(|e| e.is_failed()).count();
    let sum: f64 = report.entries.iter().map(|e| e.similarity).sum();
    let max = report
        .entries
        .iter()
        .map(|e| e.similarity)
        .fold(0.0_f64, f64::max);

    let verdict = if flagged > 0 {
        Classification::PossiblePlagiarism
    } else {
        Classification::Original
    };

    ReportSummary {
        total_sentences: report.total_sentences,
        evaluated,
        flagged,
        failed,
        mean_similarity: (sum / evaluated as f64).clamp(0.0, 1.0),
        max_similarity: max.clamp(0.0, 1.0),
        flagged_ratio: flagged as f64 / evaluated as f64,
        verdict: verdict.label().to_string(),
    }
}
