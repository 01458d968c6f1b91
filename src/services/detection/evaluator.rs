// Plagiarism Evaluator
// Segment -> search -> score, one sentence at a time, never aborting on a
// per-sentence failure.

use crate::models::{Report, ScoreEntry, SearchResult, Sentence};
use crate::services::providers::{ProviderError, SnippetProvider};
use crate::services::sentence_segmenter::SentenceSegmenter;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::sensitivity::DEFAULT_THRESHOLD;
use super::similarity::{ScoreError, SimilarityScorer, TfidfConfig};

const DEFAULT_REQUEST_INTERVAL: Duration = Duration::from_millis(1000);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    pub threshold: f64,
    /// Minimum gap between the starts of two consecutive provider calls.
    pub min_request_interval: Duration,
    pub request_timeout: Duration,
    pub tfidf: TfidfConfig,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            min_request_interval: DEFAULT_REQUEST_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            tfidf: TfidfConfig::default(),
        }
    }
}

/// Why a sentence ended up with a zero score instead of a computed one.
#[derive(Debug)]
enum SentenceFailure {
    Fetch(ProviderError),
    Score(ScoreError),
}

impl std::fmt::Display for SentenceFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch(e) => write!(f, "fetch failed: {}", e),
            Self::Score(e) => write!(f, "scoring failed: {}", e),
        }
    }
}

pub struct PlagiarismEvaluator {
    segmenter: SentenceSegmenter,
    provider: Arc<dyn SnippetProvider>,
    scorer: SimilarityScorer,
    config: EvaluatorConfig,
}

impl PlagiarismEvaluator {
    pub fn new(
        segmenter: SentenceSegmenter,
        provider: Arc<dyn SnippetProvider>,
        config: EvaluatorConfig,
    ) -> Self {
        Self {
            segmenter,
            provider,
            scorer: SimilarityScorer::new(config.tfidf),
            config,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.config.threshold
    }

    pub async fn evaluate(&self, text: &str) -> Report {
        self.evaluate_with_progress(text, |_, _| ControlFlow::Continue(()))
            .await
    }

    /// Like [`evaluate`](Self::evaluate), reporting each entry as it is appended.
    /// Returning `ControlFlow::Break` stops the run and yields the partial report.
    pub async fn evaluate_with_progress<F>(&self, text: &str, on_entry: F) -> Report
    where
        F: FnMut(&ScoreEntry, usize) -> ControlFlow<()>,
    {
        self.evaluate_cancellable(text, &CancellationToken::new(), on_entry)
            .await
    }

    /// Cancelling `cancel` stops the run at once, during the request spacing
    /// wait or an in-flight lookup; that sentence is left out of the report.
    pub async fn evaluate_cancellable<F>(
        &self,
        text: &str,
        cancel: &CancellationToken,
        mut on_entry: F,
    ) -> Report
    where
        F: FnMut(&ScoreEntry, usize) -> ControlFlow<()>,
    {
        let sentences = self.segmenter.segment(text);
        let total = sentences.len();
        let mut report = Report::new(self.config.threshold, total);
        let started = Instant::now();

        info!(
            "[EVALUATOR] run={} sentences={} provider={} threshold={:.2}",
            report.run_id,
            total,
            self.provider.name(),
            self.config.threshold
        );

        let mut last_request: Option<Instant> = None;
        for (idx, sentence) in sentences.into_iter().enumerate() {
            if cancel.is_cancelled() {
                break;
            }
            if let Some(prev) = last_request {
                let elapsed = prev.elapsed();
                if elapsed < self.config.min_request_interval {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.config.min_request_interval - elapsed) => {}
                    }
                }
            }
            last_request = Some(Instant::now());

            let entry = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                entry = self.evaluate_sentence(idx, sentence) => entry,
            };
            info!(
                "[EVALUATOR] sentence {}/{} similarity={:.3} snippets={} failed={}",
                idx + 1,
                total,
                entry.similarity,
                entry.snippet_count,
                entry.is_failed()
            );

            let flow = on_entry(&entry, total);
            report.push(entry);
            if flow.is_break() {
                warn!(
                    "[EVALUATOR] run stopped after {}/{} sentences",
                    report.len(),
                    total
                );
                break;
            }
        }

        if cancel.is_cancelled() {
            warn!(
                "[EVALUATOR] run cancelled after {}/{} sentences",
                report.len(),
                total
            );
        }

        info!(
            "[EVALUATOR] done: entries={}, flagged={}, elapsed_ms={}",
            report.len(),
            report.flagged().count(),
            started.elapsed().as_millis()
        );
        report
    }

    /// Fetch and score one sentence. Any failure is recorded as a zero score.
    pub async fn evaluate_sentence(&self, index: usize, sentence: Sentence) -> ScoreEntry {
        match self.try_score(&sentence).await {
            Ok((similarity, snippet_count, best_match)) => {
                ScoreEntry::scored(index, sentence, similarity, snippet_count, best_match)
            }
            Err(failure) => {
                warn!("[EVALUATOR] sentence {} recorded as 0.0: {}", index, failure);
                ScoreEntry::failed(index, sentence, failure.to_string())
            }
        }
    }

    async fn try_score(
        &self,
        sentence: &Sentence,
    ) -> Result<(f64, usize, Option<SearchResult>), SentenceFailure> {
        let fetch = self.provider.search(sentence.as_str());
        let results = match tokio::time::timeout(self.config.request_timeout, fetch).await {
            Ok(Ok(results)) => results,
            Ok(Err(e)) => return Err(SentenceFailure::Fetch(e)),
            Err(_) => {
                return Err(SentenceFailure::Fetch(ProviderError::Timeout(
                    self.config.request_timeout,
                )))
            }
        };

        let usable: Vec<SearchResult> = results.into_iter().filter(|r| r.has_snippet()).collect();
        if usable.is_empty() {
            debug!("[EVALUATOR] no usable snippets");
            return Ok((0.0, 0, None));
        }

        let snippets: Vec<&str> = usable.iter().map(|r| r.snippet.as_str()).collect();
        let best = self
            .scorer
            .score_detailed(sentence.as_str(), &snippets)
            .map_err(SentenceFailure::Score)?;

        let best_match = best.index.and_then(|i| usable.get(i).cloned());
        Ok((best.similarity, usable.len(), best_match))
    }
}
