// PlagiProof Data Models
// Sentences, search results, score entries and reports

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============ Text ============

/// A trimmed sentence and where it sits in the segmented text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    pub text: String,
    /// UTF-8 byte offset (0-based) into the segmented text.
    pub start: usize,
    /// UTF-8 byte offset (0-based, end-exclusive) into the segmented text.
    pub end: usize,
}

impl Sentence {
    pub fn new(text: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            text: text.into(),
            start,
            end,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

// ============ Search ============

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SearchResult {
    pub title: String,
    pub link: String,
    pub snippet: String,
}

impl SearchResult {
    pub fn has_snippet(&self) -> bool {
        !self.snippet.trim().is_empty()
    }
}

// ============ Scoring ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum EntryStatus {
    Scored,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreEntry {
    pub index: usize,
    pub sentence: Sentence,
    pub similarity: f64,
    /// Snippets that survived the empty-text filter.
    pub snippet_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_match: Option<SearchResult>,
    pub status: EntryStatus,
}

impl ScoreEntry {
    pub fn scored(
        index: usize,
        sentence: Sentence,
        similarity: f64,
        snippet_count: usize,
        best_match: Option<SearchResult>,
    ) -> Self {
        Self {
            index,
            sentence,
            similarity: similarity.clamp(0.0, 1.0),
            snippet_count,
            best_match,
            status: EntryStatus::Scored,
        }
    }

    pub fn failed(index: usize, sentence: Sentence, reason: impl Into<String>) -> Self {
        Self {
            index,
            sentence,
            similarity: 0.0,
            snippet_count: 0,
            best_match: None,
            status: EntryStatus::Failed {
                reason: reason.into(),
            },
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, EntryStatus::Failed { .. })
    }

    pub fn classify(&self, threshold: f64) -> Classification {
        Classification::from_similarity(self.similarity, threshold)
    }
}

// ============ Classification ============

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Classification {
    PossiblePlagiarism,
    Original,
}

impl Classification {
    pub fn from_similarity(similarity: f64, threshold: f64) -> Self {
        if similarity >= threshold {
            Self::PossiblePlagiarism
        } else {
            Self::Original
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::PossiblePlagiarism => "possible plagiarism",
            Self::Original => "original",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ============ Report ============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub threshold: f64,
    /// Number of sentences the segmenter produced for this run.
    pub total_sentences: usize,
    pub entries: Vec<ScoreEntry>,
}

impl Report {
    pub fn new(threshold: f64, total_sentences: usize) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            created_at: Utc::now(),
            threshold,
            total_sentences,
            entries: Vec::with_capacity(total_sentences),
        }
    }

    pub(crate) fn push(&mut self, entry: ScoreEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// False when the run was stopped before every sentence was evaluated.
    pub fn is_complete(&self) -> bool {
        self.entries.len() == self.total_sentences
    }

    pub fn flagged(&self) -> impl Iterator<Item = &ScoreEntry> + '_ {
        self.entries
            .iter()
            .filter(move |e| e.classify(self.threshold) == Classification::PossiblePlagiarism)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total_sentences: usize,
    pub evaluated: usize,
    pub flagged: usize,
    pub failed: usize,
    pub mean_similarity: f64,
    pub max_similarity: f64,
    /// Share of evaluated sentences classified as possible plagiarism.
    pub flagged_ratio: f64,
    pub verdict: String,
}
