// Text Processing Service
// Normalization, term extraction and HTML-to-text helpers

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static SPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\u{3000}\u{00A0}]").expect("space regex"));
static HORIZONTAL_WS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\x0C\x0B]+").expect("whitespace regex"));
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag regex"));
static NUMERIC_ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(x[0-9A-Fa-f]+|[0-9]+);").expect("entity regex"));

/// English stop words dropped before vectorization.
static STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
        "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
        "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "few", "for",
        "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers", "herself",
        "him", "himself", "his", "how", "if", "in", "into", "is", "it", "its", "itself", "just",
        "me", "more", "most", "my", "myself", "no", "nor", "not", "now", "of", "off", "on", "once",
        "only", "or", "other", "our", "ours", "ourselves", "out", "over", "own", "same", "she",
        "should", "so", "some", "such", "than", "that", "the", "their", "theirs", "them",
        "themselves", "then", "there", "these", "they", "this", "those", "through", "to", "too",
        "under", "until", "up", "very", "was", "we", "were", "what", "when", "where", "which",
        "while", "who", "whom", "why", "will", "with", "would", "you", "your", "yours",
        "yourself", "yourselves",
    ]
    .into_iter()
    .collect()
});

/// Normalize punctuation in text
pub fn normalize_punctuation(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut s = text.to_string();

    // Replace smart quotes
    s = s.replace('\u{201c}', "\"")
         .replace('\u{201d}', "\"")
         .replace('\u{2018}', "'")
         .replace('\u{2019}', "'");

    s = s.replace('\u{2014}', "-");

    s = SPACE_RE.replace_all(&s, " ").to_string();

    // Normalize line endings
    s = s.replace("\r\n", "\n").replace('\r', "\n");

    s = HORIZONTAL_WS_RE.replace_all(&s, " ").to_string();

    // Strip each line
    s = s.lines()
         .map(|ln| ln.trim())
         .collect::<Vec<_>>()
         .join("\n");

    s.trim().to_string()
}

pub fn is_stop_word(term: &str) -> bool {
    STOP_WORDS.contains(term)
}

/// Extract lowercase terms: alphanumeric runs of at least two characters.
pub fn tokenize_terms(text: &str, remove_stop_words: bool) -> Vec<String> {
    let lowered = text.to_lowercase();
    let mut terms = Vec::new();
    let mut start: Option<usize> = None;

    let flush = |s: usize, e: usize, terms: &mut Vec<String>| {
        let token = &lowered[s..e];
        if token.chars().count() < 2 {
            return;
        }
        if remove_stop_words && is_stop_word(token) {
            return;
        }
        terms.push(token.to_string());
    };

    for (i, c) in lowered.char_indices() {
        if c.is_alphanumeric() || c == '_' {
            if start.is_none() {
                start = Some(i);
            }
        } else if let Some(s) = start.take() {
            flush(s, i, &mut terms);
        }
    }
    if let Some(s) = start {
        flush(s, lowered.len(), &mut terms);
    }

    terms
}

/// Strip tags and decode the entities search engines commonly emit.
pub fn html_to_text(fragment: &str) -> String {
    let stripped = TAG_RE.replace_all(fragment, " ");
    let decoded = decode_entities(&stripped);
    HORIZONTAL_WS_RE
        .replace_all(&decoded.replace('\n', " "), " ")
        .trim()
        .to_string()
}

pub fn decode_entities(s: &str) -> String {
    let named = s
        .replace("&nbsp;", " ")
        .replace("&ensp;", " ")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&middot;", "\u{00B7}")
        .replace("&hellip;", "\u{2026}");

    let numeric = NUMERIC_ENTITY_RE.replace_all(&named, |caps: &regex::Captures| {
        let raw = &caps[1];
        let code = match raw.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => raw.parse::<u32>().ok(),
        };
        code.and_then(char::from_u32)
            .map(|c| c.to_string())
            .unwrap_or_default()
    });

    // Last, so "&amp;lt;" stays literal "&lt;".
    numeric.replace("&amp;", "&")
}

/// First `max_chars` characters on one line, with an ellipsis when cut.
pub fn preview(s: &str, max_chars: usize) -> String {
    let mut out: String = s.chars().take(max_chars).collect();
    if s.chars().count() > max_chars {
        out.push_str("...");
    }
    out.replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_punctuation() {
        let input = "Hello\u{201c}World\u{201d}";
        let output = normalize_punctuation(input);
        assert_eq!(output, "Hello\"World\"");
    }

    #[test]
    fn test_normalize_collapses_whitespace_and_line_endings() {
        let input = "  First\u{00A0}\u{00A0}line \r\n\tsecond   line  ";
        assert_eq!(normalize_punctuation(input), "First line\nsecond line");
    }

    #[test]
    fn test_tokenize_terms_drops_short_and_stop_words() {
        let terms = tokenize_terms("The sky is blue, a 100% Sky!", true);
        assert_eq!(terms, vec!["sky", "blue", "100", "sky"]);

        let all = tokenize_terms("The sky is blue", false);
        assert_eq!(all, vec!["the", "sky", "is", "blue"]);
    }

    #[test]
    fn test_tokenize_terms_handles_non_ascii() {
        let terms = tokenize_terms("Café naïve résumé", false);
        assert_eq!(terms, vec!["café", "naïve", "résumé"]);
    }

    #[test]
    fn test_html_to_text() {
        let html = "<p>The <strong>sky</strong> is&nbsp;blue &amp; vast &#8230; &#x41;</p>";
        assert_eq!(html_to_text(html), "The sky is blue & vast \u{2026} A");
    }

    #[test]
    fn test_decode_entities_does_not_double_decode() {
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("abcdef", 3), "abc...");
        assert_eq!(preview("a\nb", 10), "a b");
    }
}
