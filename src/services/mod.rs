// PlagiProof Core Services

pub mod text_processor;
pub mod config_store;
pub mod providers;
pub mod detection;
pub mod sentence_segmenter;
pub mod document_reader;
pub mod report_sink;

pub use text_processor::*;
pub use config_store::*;
pub use providers::*;
pub use sentence_segmenter::*;
pub use document_reader::*;
pub use report_sink::*;

// Re-export detection module items
pub use detection::{
    classify,
    classify_report,
    resolve_threshold,
    summarize_report,
    BestMatch,
    DetectionSensitivity,
    EvaluatorConfig,
    PlagiarismEvaluator,
    ScoreError,
    SimilarityScorer,
    TfidfConfig,
    DEFAULT_THRESHOLD,
};
