// Detection Module
// Plagiarism detection core organized into specialized submodules:
// - similarity: TF-IDF vectorization and cosine best-match scoring
// - evaluator: Sequential segment -> search -> score pipeline
// - sensitivity: Threshold presets and classification
// - aggregation: Document-level summary of a report

pub mod similarity;
pub mod evaluator;
pub mod sensitivity;
pub mod aggregation;

// Re-export commonly used items
pub use similarity::{cosine_similarity, BestMatch, ScoreError, SimilarityScorer, TfidfConfig, TfidfVectorizer};
pub use evaluator::{EvaluatorConfig, PlagiarismEvaluator};
pub use sensitivity::{classify, classify_report, resolve_threshold, DetectionSensitivity, DEFAULT_THRESHOLD};
pub use aggregation::summarize_report;
