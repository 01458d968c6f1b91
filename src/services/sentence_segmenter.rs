// Sentence Segmenter
// Rule-based sentence boundary detection driven by a per-language model

use crate::models::Sentence;
use crate::services::text_processor::is_stop_word;
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};
use tracing::debug;

const ENGLISH_ABBREVIATIONS: &[&str] = &[
    "e.g", "i.e", "etc", "vs", "mr", "mrs", "ms", "dr", "prof", "jr", "sr", "st", "mt", "inc",
    "ltd", "co", "corp", "dept", "est", "approx", "cf", "al", "gen", "gov", "sen", "rep", "lt",
    "col", "capt", "u.s", "u.k", "a.m", "p.m", "jan", "feb", "mar", "apr", "jun", "jul", "aug",
    "sep", "sept", "oct", "nov", "dec",
];

/// Abbreviations that only hold when a number follows ("No. 5", "Fig. 2").
const ENGLISH_NUMERIC_ABBREVIATIONS: &[&str] =
    &["no", "nos", "fig", "figs", "eq", "vol", "p", "pp", "ch", "sec", "art", "ref"];

static SHARED_MODEL: OnceLock<Arc<SegmenterModel>> = OnceLock::new();

/// Language data the segmenter consults. Built once and shared.
#[derive(Debug, Clone)]
pub struct SegmenterModel {
    language: String,
    abbreviations: HashSet<String>,
    numeric_abbreviations: HashSet<String>,
    split_on_blank_lines: bool,
}

impl SegmenterModel {
    pub fn english() -> Self {
        Self {
            language: "en".to_string(),
            abbreviations: ENGLISH_ABBREVIATIONS.iter().map(|s| s.to_string()).collect(),
            numeric_abbreviations: ENGLISH_NUMERIC_ABBREVIATIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            split_on_blank_lines: true,
        }
    }

    /// Model without abbreviation data; CJK punctuation still splits.
    pub fn bare(language: &str) -> Self {
        Self {
            language: language.to_string(),
            abbreviations: HashSet::new(),
            numeric_abbreviations: HashSet::new(),
            split_on_blank_lines: true,
        }
    }

    pub fn for_language(language: &str) -> Self {
        match language.trim().to_lowercase().as_str() {
            "en" | "english" => Self::english(),
            other => Self::bare(other),
        }
    }

    /// Process-wide English model, initialized on first use.
    pub fn shared() -> Arc<Self> {
        SHARED_MODEL
            .get_or_init(|| {
                debug!("segmenter.model.init language=en");
                Arc::new(Self::english())
            })
            .clone()
    }

    pub fn with_abbreviations<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for abbr in extra {
            let abbr = abbr.as_ref().trim().trim_end_matches('.').to_lowercase();
            if !abbr.is_empty() {
                self.abbreviations.insert(abbr);
            }
        }
        self
    }

    pub fn with_blank_line_splitting(mut self, enabled: bool) -> Self {
        self.split_on_blank_lines = enabled;
        self
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    fn is_abbreviation(&self, word: &str) -> bool {
        self.abbreviations.contains(word)
    }

    fn is_numeric_abbreviation(&self, word: &str) -> bool {
        self.numeric_abbreviations.contains(word)
    }
}

/// Splits text into trimmed sentences in document order.
#[derive(Debug, Clone)]
pub struct SentenceSegmenter {
    model: Arc<SegmenterModel>,
}

impl Default for SentenceSegmenter {
    fn default() -> Self {
        Self::new(SegmenterModel::shared())
    }
}

impl SentenceSegmenter {
    pub fn new(model: Arc<SegmenterModel>) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &SegmenterModel {
        &self.model
    }

    pub fn segment(&self, text: &str) -> Vec<Sentence> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let chars: Vec<(usize, char)> = text.char_indices().collect();
        let mut sentences = Vec::new();
        let mut seg_start = 0usize;
        let mut quote_open = false;
        let mut k = 0usize;

        while k < chars.len() {
            let (pos, ch) = chars[k];

            if ch == '\n' {
                // A stray quote must not swallow the rest of the document.
                quote_open = false;
                if self.model.split_on_blank_lines && is_blank_line_break(&chars, k) {
                    push_trimmed(text, seg_start, pos, &mut sentences);
                    seg_start = pos;
                }
                k += 1;
                continue;
            }

            update_quote_state(&chars, k, &mut quote_open);

            if !is_terminal(ch) || (ch == '.' && is_decimal_point(&chars, k)) {
                k += 1;
                continue;
            }

            let mut run_end = k + 1;
            while run_end < chars.len() && is_terminal(chars[run_end].1) {
                run_end += 1;
            }
            let mut j = run_end;
            while j < chars.len() && is_closer(chars[j].1) {
                update_quote_state(&chars, j, &mut quote_open);
                j += 1;
            }

            if !quote_open && self.is_boundary(&chars, k, run_end, j) {
                let end_byte = chars.get(j).map(|(b, _)| *b).unwrap_or(text.len());
                push_trimmed(text, seg_start, end_byte, &mut sentences);
                seg_start = end_byte;
            }
            k = j;
        }

        push_trimmed(text, seg_start, text.len(), &mut sentences);
        sentences
    }

    /// Sentence texts only.
    pub fn segment_texts(&self, text: &str) -> Vec<String> {
        self.segment(text).into_iter().map(|s| s.text).collect()
    }

    fn is_boundary(&self, chars: &[(usize, char)], k: usize, run_end: usize, j: usize) -> bool {
        let ch = chars[k].1;
        if is_cjk_terminal(ch) {
            return true;
        }

        match chars.get(j) {
            None => return true,
            Some((_, c)) if !c.is_whitespace() => return false,
            _ => {}
        }

        let next_word = chars[j..]
            .iter()
            .map(|(_, c)| *c)
            .find(|c| !c.is_whitespace());

        if matches!(ch, '.' | '…') && next_word.map_or(false, |c| c.is_lowercase()) {
            return false;
        }

        if ch == '.' && run_end == k + 1 {
            let raw = preceding_word(chars, k);
            let word = raw.to_lowercase();
            if self.model.is_abbreviation(&word) || is_initial(&raw, &next_token(chars, j)) {
                return false;
            }
            if next_word.map_or(false, |c| c.is_ascii_digit())
                && self.model.is_numeric_abbreviation(&word)
            {
                return false;
            }
        }

        true
    }
}

fn is_terminal(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '…') || is_cjk_terminal(c)
}

fn is_cjk_terminal(c: char) -> bool {
    matches!(c, '。' | '！' | '？')
}

fn is_closer(c: char) -> bool {
    matches!(c, '"' | '\u{201d}' | '\'' | '\u{2019}' | ')' | ']' | '」' | '』' | '）')
}

/// A straight quote opens at the start of text or after whitespace or an
/// opening bracket, and closes anywhere else (`12" wide` never opens one).
fn update_quote_state(chars: &[(usize, char)], k: usize, open: &mut bool) {
    match chars[k].1 {
        '"' => {
            *open = match k.checked_sub(1).map(|i| chars[i].1) {
                None => true,
                Some(prev) => prev.is_whitespace() || matches!(prev, '(' | '[' | '{'),
            }
        }
        '\u{201c}' => *open = true,
        '\u{201d}' => *open = false,
        _ => {}
    }
}

fn is_decimal_point(chars: &[(usize, char)], k: usize) -> bool {
    k > 0
        && k + 1 < chars.len()
        && chars[k - 1].1.is_ascii_digit()
        && chars[k + 1].1.is_ascii_digit()
}

fn is_blank_line_break(chars: &[(usize, char)], k: usize) -> bool {
    for (_, c) in &chars[k + 1..] {
        if *c == '\n' {
            return true;
        }
        if !c.is_whitespace() {
            return false;
        }
    }
    false
}

/// Word ending right before position `k`, leading punctuation removed.
fn preceding_word(chars: &[(usize, char)], k: usize) -> String {
    let mut start = k;
    while start > 0 && !chars[start - 1].1.is_whitespace() {
        start -= 1;
    }
    let word: String = chars[start..k].iter().map(|(_, c)| *c).collect();
    word.trim_start_matches(|c: char| !c.is_alphanumeric())
        .to_string()
}

/// First whitespace-delimited token at or after position `j`.
fn next_token(chars: &[(usize, char)], j: usize) -> String {
    chars[j.min(chars.len())..]
        .iter()
        .map(|(_, c)| *c)
        .skip_while(|c| c.is_whitespace())
        .take_while(|c| !c.is_whitespace())
        .collect()
}

/// A lone capital reads as an initial when another initial or a capitalized
/// name follows: "J. R. R. Tolkien", "J. Smith", but not "vitamin C. It".
fn is_initial(word: &str, next: &str) -> bool {
    let mut it = word.chars();
    if !matches!((it.next(), it.next()), (Some(c), None) if c.is_uppercase()) {
        return false;
    }

    let mut nt = next.chars();
    match (nt.next(), nt.next(), nt.next()) {
        (Some(c), Some('.'), None) if c.is_uppercase() => true,
        (Some(c), _, _) if c.is_uppercase() => {
            let core: String = next.chars().take_while(|c| c.is_alphanumeric()).collect();
            !is_stop_word(&core.to_lowercase())
        }
        _ => false,
    }
}

fn push_trimmed(text: &str, start: usize, end: usize, out: &mut Vec<Sentence>) {
    if start >= end {
        return;
    }
    let slice = &text[start..end];
    let trimmed = slice.trim();
    if trimmed.is_empty() {
        return;
    }
    let s = start + (slice.len() - slice.trim_start().len());
    out.push(Sentence::new(trimmed, s, s + trimmed.len()));
}

/// Rough language guess: "zh" when CJK ideographs dominate, else "en".
pub fn detect_language(text: &str) -> String {
    let chinese_count = text
        .chars()
        .filter(|c| *c >= '\u{4e00}' && *c <= '\u{9fff}')
        .count();
    let total_chars = text.chars().filter(|c| !c.is_whitespace()).count();

    if total_chars > 0 && chinese_count as f64 / total_chars as f64 > 0.3 {
        "zh".to_string()
    } else {
        "en".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(text: &str) -> Vec<String> {
        SentenceSegmenter::default().segment_texts(text)
    }

    #[test]
    fn test_empty_and_whitespace_input() {
        assert!(texts("").is_empty());
        assert!(texts("   \n\t ").is_empty());
    }

    #[test]
    fn test_basic_split() {
        assert_eq!(
            texts("The sky is blue. Water boils at 100 degrees."),
            vec!["The sky is blue.", "Water boils at 100 degrees."]
        );
    }

    #[test]
    fn test_abbreviations_do_not_split() {
        let out = texts("Dr. Smith met Mr. Jones at 5 p.m. yesterday. They talked, e.g. about Rust.");
        assert_eq!(
            out,
            vec![
                "Dr. Smith met Mr. Jones at 5 p.m. yesterday.",
                "They talked, e.g. about Rust."
            ]
        );
    }

    #[test]
    fn test_initials_and_numeric_abbreviations() {
        let out = texts("J. R. R. Tolkien wrote it. See No. 5 for details. I said no. Then left.");
        assert_eq!(
            out,
            vec![
                "J. R. R. Tolkien wrote it.",
                "See No. 5 for details.",
                "I said no.",
                "Then left."
            ]
        );
    }

    #[test]
    fn test_decimals_and_urls() {
        let out = texts("Pi is 3.14 roughly. Visit example.com today!");
        assert_eq!(out, vec!["Pi is 3.14 roughly.", "Visit example.com today!"]);
    }

    #[test]
    fn test_quotes_stay_with_sentence() {
        let out = texts("He said \"Stop. Now.\" Then he left. Why? Nobody knows!");
        assert_eq!(
            out,
            vec!["He said \"Stop. Now.\"", "Then he left.", "Why?", "Nobody knows!"]
        );
    }

    #[test]
    fn test_inch_mark_does_not_open_a_quote() {
        assert_eq!(
            texts("The board is 12\" wide. It is heavy. We left."),
            vec!["The board is 12\" wide.", "It is heavy.", "We left."]
        );
    }

    #[test]
    fn test_single_letters_before_common_words_end_sentences() {
        assert_eq!(
            texts("Take vitamin C. It helps."),
            vec!["Take vitamin C.", "It helps."]
        );
        assert_eq!(
            texts("He got a B. Then he cried."),
            vec!["He got a B.", "Then he cried."]
        );
        assert_eq!(
            texts("Ask J. Smith about it."),
            vec!["Ask J. Smith about it."]
        );
    }

    #[test]
    fn test_lowercase_continuation_is_not_a_boundary() {
        assert_eq!(texts("Wait... what happened?"), vec!["Wait... what happened?"]);
    }

    #[test]
    fn test_cjk_punctuation_splits_without_spaces() {
        assert_eq!(
            texts("这是第一句。这是第二句！这是第三句？"),
            vec!["这是第一句。", "这是第二句！", "这是第三句？"]
        );
    }

    #[test]
    fn test_blank_line_ends_sentence() {
        let out = texts("Introduction\n\nThe study began in May.");
        assert_eq!(out, vec!["Introduction", "The study began in May."]);

        let joined = SentenceSegmenter::new(Arc::new(
            SegmenterModel::english().with_blank_line_splitting(false),
        ))
        .segment_texts("Introduction\n\nThe study began in May.");
        assert_eq!(joined, vec!["Introduction\n\nThe study began in May."]);
    }

    #[test]
    fn test_internal_whitespace_is_kept_and_offsets_match() {
        let text = "  First   sentence here.  Second\tone.  ";
        let sentences = SentenceSegmenter::default().segment(text);
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[0].text, "First   sentence here.");
        assert_eq!(sentences[1].text, "Second\tone.");
        for s in &sentences {
            assert_eq!(&text[s.start..s.end], s.text);
        }
    }

    #[test]
    fn test_custom_abbreviations() {
        let model = SegmenterModel::english().with_abbreviations(["Approx.", "Ref"]);
        let segmenter = SentenceSegmenter::new(Arc::new(model));
        assert_eq!(
            segmenter.segment_texts("Cost approx. Ten dollars. Done."),
            vec!["Cost approx. Ten dollars.", "Done."]
        );
    }

    #[test]
    fn test_bare_model_splits_on_abbreviations() {
        let segmenter = SentenceSegmenter::new(Arc::new(SegmenterModel::bare("xx")));
        assert_eq!(segmenter.segment_texts("Mr. Smith left."), vec!["Mr.", "Smith left."]);
    }

    #[test]
    fn test_detect_language() {
        assert_eq!(detect_language("这是中文文本"), "zh");
        assert_eq!(detect_language("plain english"), "en");
    }
}
