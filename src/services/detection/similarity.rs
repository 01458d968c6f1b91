// Similarity Scorer
// TF-IDF vector space over {query} ∪ candidates, cosine similarity, best match

use crate::services::text_processor::tokenize_terms;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScoreError {
    #[error("no candidate snippets to score against")]
    NoCandidates,
    #[error("degenerate corpus: no text produced a usable term")]
    DegenerateCorpus,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TfidfConfig {
    #[serde(default = "default_true")]
    pub remove_stop_words: bool,
}

fn default_true() -> bool { true }

impl Default for TfidfConfig {
    fn default() -> Self {
        Self {
            remove_stop_words: true,
        }
    }
}

/// L2-normalized sparse vector, entries sorted by term id.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SparseVector {
    entries: Vec<(usize, f64)>,
}

impl SparseVector {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.entries.len() && j < other.entries.len() {
            let (ti, wi) = self.entries[i];
            let (tj, wj) = other.entries[j];
            match ti.cmp(&tj) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += wi * wj;
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }

    fn norm(&self) -> f64 {
        self.entries.iter().map(|(_, w)| w * w).sum::<f64>().sqrt()
    }
}

/// Cosine similarity in [0, 1]; zero vectors score 0.
pub fn cosine_similarity(a: &SparseVector, b: &SparseVector) -> f64 {
    let denom = a.norm() * b.norm();
    if denom <= f64::EPSILON {
        return 0.0;
    }
    (a.dot(b) / denom).clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Default)]
pub struct TfidfVectorizer {
    config: TfidfConfig,
}

impl TfidfVectorizer {
    pub fn new(config: TfidfConfig) -> Self {
        Self { config }
    }

    /// Fit the vocabulary and IDF weights on `docs` and return one vector per doc.
    pub fn fit_transform(&self, docs: &[&str]) -> Result<Vec<SparseVector>, ScoreError> {
        let counts: Vec<HashMap<String, usize>> = docs
            .iter()
            .map(|d| {
                let mut tf: HashMap<String, usize> = HashMap::new();
                for term in tokenize_terms(d, self.config.remove_stop_words) {
                    *tf.entry(term).or_insert(0) += 1;
                }
                tf
            })
            .collect();

        // Sorted vocabulary keeps term ids stable across runs.
        let mut df: BTreeMap<&str, usize> = BTreeMap::new();
        for tf in &counts {
            for term in tf.keys() {
                *df.entry(term.as_str()).or_insert(0) += 1;
            }
        }
        if df.is_empty() {
            return Err(ScoreError::DegenerateCorpus);
        }

        // Smoothed IDF: as if one extra document held every term.
        let n = docs.len() as f64;
        let mut vocab: HashMap<&str, (usize, f64)> = HashMap::with_capacity(df.len());
        for (id, (term, doc_freq)) in df.iter().enumerate() {
            let doc_freq = *doc_freq as f64;
            let idf = ((1.0 + n) / (1.0 + doc_freq)).ln() + 1.0;
            vocab.insert(*term, (id, idf));
        }

        let vectors = counts
            .iter()
            .map(|tf| {
                let mut entries: Vec<(usize, f64)> = tf
                    .iter()
                    .filter_map(|(term, &count)| {
                        let (id, idf) = vocab.get(term.as_str())?;
                        Some((*id, count as f64 * idf))
                    })
                    .collect();
                entries.sort_by_key(|(id, _)| *id);

                let mut v = SparseVector { entries };
                let norm = v.norm();
                if norm > 0.0 {
                    for (_, w) in v.entries.iter_mut() {
                        *w /= norm;
                    }
                }
                v
            })
            .collect();

        Ok(vectors)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BestMatch {
    /// First candidate reaching the maximum, if any scored above zero.
    pub index: Option<usize>,
    pub similarity: f64,
}

#[derive(Debug, Clone, Default)]
pub struct SimilarityScorer {
    vectorizer: TfidfVectorizer,
}

impl SimilarityScorer {
    pub fn new(config: TfidfConfig) -> Self {
        Self {
            vectorizer: TfidfVectorizer::new(config),
        }
    }

    /// Highest cosine similarity between `query` and any candidate.
    pub fn score<S: AsRef<str>>(&self, query: &str, candidates: &[S]) -> Result<f64, ScoreError> {
        self.score_detailed(query, candidates).map(|m| m.similarity)
    }

    pub fn score_detailed<S: AsRef<str>>(
        &self,
        query: &str,
        candidates: &[S],
    ) -> Result<BestMatch, ScoreError> {
        if candidates.is_empty() {
            return Err(ScoreError::NoCandidates);
        }

        let mut corpus: Vec<&str> = Vec::with_capacity(candidates.len() + 1);
        corpus.push(query);
        corpus.extend(candidates.iter().map(|c| c.as_ref()));

        let vectors = self.vectorizer.fit_transform(&corpus)?;
        let (query_vec, candidate_vecs) = vectors.split_first().ok_or(ScoreError::DegenerateCorpus)?;

        let mut best = BestMatch {
            index: None,
            similarity: 0.0,
        };
        for (idx, vec) in candidate_vecs.iter().enumerate() {
            let sim = cosine_similarity(query_vec, vec);
            if sim > best.similarity {
                best = BestMatch {
                    index: Some(idx),
                    similarity: sim,
                };
            }
        }

        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> SimilarityScorer {
        SimilarityScorer::default()
    }

    #[test]
    fn test_self_similarity_is_one() {
        let q = "Water boils at one hundred degrees Celsius at sea level.";
        let s = scorer().score(q, &[q]).unwrap();
        assert!((s - 1.0).abs() < 1e-9, "got {}", s);
    }

    #[test]
    fn test_partial_overlap_is_non_trivial() {
        let s = scorer()
            .score("The sky is blue.", &["The sky is blue and vast"])
            .unwrap();
        assert!(s > 0.3 && s < 1.0, "got {}", s);
    }

    #[test]
    fn test_unrelated_text_scores_zero() {
        let s = scorer()
            .score("Quantum chromodynamics explains gluons.", &["Bananas grow in tropical climates"])
            .unwrap();
        assert_eq!(s, 0.0);
    }

    #[test]
    fn test_order_invariance() {
        let q = "Rust guarantees memory safety without garbage collection.";
        let a = ["Memory safety in Rust comes from ownership", "Garbage collection pauses", "Cooking pasta"];
        let b = [a[2], a[0], a[1]];
        assert_eq!(scorer().score(q, &a).unwrap(), scorer().score(q, &b).unwrap());
    }

    #[test]
    fn test_best_match_index_and_max() {
        let q = "the quick brown fox jumps";
        let cands = ["slow turtle", "quick brown fox jumps high", "brown fox"];
        let best = scorer().score_detailed(q, &cands).unwrap();
        assert_eq!(best.index, Some(1));
        let each: Vec<f64> = cands.iter().map(|c| scorer().score(q, &[*c]).unwrap()).collect();
        assert!(best.similarity >= each[2]);
    }

    #[test]
    fn test_no_candidates_is_an_error() {
        let empty: [&str; 0] = [];
        assert_eq!(scorer().score("anything", &empty), Err(ScoreError::NoCandidates));
    }

    #[test]
    fn test_stop_word_only_corpus_is_degenerate() {
        assert_eq!(
            scorer().score("It is what it is.", &["of the", ""]),
            Err(ScoreError::DegenerateCorpus)
        );
    }

    #[test]
    fn test_empty_query_vector_scores_zero() {
        let s = scorer().score("the of and", &["sky blue"]).unwrap();
        assert_eq!(s, 0.0);
    }

    #[test]
    fn test_keeping_stop_words_changes_vocabulary() {
        let keep = SimilarityScorer::new(TfidfConfig {
            remove_stop_words: false,
            ..TfidfConfig::default()
        });
        let s = keep.score("It is the one.", &["is it the one"]).unwrap();
        assert!((s - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_idf_downweights_shared_terms() {
        let docs = ["sky blue", "sky green", "sky red"];
        let vectors = TfidfVectorizer::default().fit_transform(&docs).unwrap();
        // "sky" occurs everywhere, so each doc leans towards its colour term.
        for v in &vectors {
            assert_eq!(v.len(), 2);
            let weights: Vec<f64> = v.entries.iter().map(|(_, w)| *w).collect();
            let max = weights.iter().cloned().fold(0.0, f64::max);
            let min = weights.iter().cloned().fold(1.0, f64::min);
            assert!(max > min);
        }
    }
}
