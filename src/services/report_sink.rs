// Report Sinks
// Console, JSON and paginated text renderings of a finished report

use crate::models::{Classification, Report, ReportSummary, ScoreEntry};
use crate::services::detection::summarize_report;
use crate::services::text_processor::preview;
use serde::Serialize;
use std::io::Write;
use thiserror::Error;

const DEFAULT_EXCERPT_CHARS: usize = 80;
const DEFAULT_PAGE_SIZE: usize = 25;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}

pub trait ReportSink {
    fn render(&mut self, report: &Report, threshold: f64) -> Result<(), SinkError>;
}

fn percent(similarity: f64) -> String {
    format!("{:5.1}%", similarity * 100.0)
}

fn entry_line(entry: &ScoreEntry, threshold: f64, excerpt_chars: usize) -> String {
    format!(
        "[S{:04}] {}  {:<19}  {}",
        entry.index + 1,
        percent(entry.similarity),
        entry.classify(threshold).label(),
        preview(&entry.sentence.text, excerpt_chars)
    )
}

fn summary_lines(summary: &ReportSummary, report: &Report) -> Vec<String> {
    let mut lines = vec![
        format!(
            "Sentences: {} evaluated of {}{}",
            summary.evaluated,
            summary.total_sentences,
            if report.is_complete() { "" } else { " (run stopped early)" }
        ),
        format!(
            "Flagged: {} ({:.1}%)  Failed lookups: {}",
            summary.flagged,
            summary.flagged_ratio * 100.0,
            summary.failed
        ),
        format!(
            "Mean similarity: {:.1}%  Max similarity: {:.1}%",
            summary.mean_similarity * 100.0,
            summary.max_similarity * 100.0
        ),
    ];
    lines.push(format!("Verdict: {}", summary.verdict));
    lines
}

/// Human-readable lines, one per sentence, followed by a summary.
pub struct ConsoleSink<W: Write> {
    writer: W,
    excerpt_chars: usize,
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
        }
    }

    pub fn with_excerpt_chars(mut self, chars: usize) -> Self {
        self.excerpt_chars = chars.max(1);
        self
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ReportSink for ConsoleSink<W> {
    fn render(&mut self, report: &Report, threshold: f64) -> Result<(), SinkError> {
        writeln!(self.writer, "Plagiarism report {} (threshold {:.0}%)", report.run_id, threshold * 100.0)?;
        writeln!(self.writer)?;

        for entry in &report.entries {
            writeln!(self.writer, "{}", entry_line(entry, threshold, self.excerpt_chars))?;
            if entry.classify(threshold) == Classification::PossiblePlagiarism {
                if let Some(ref m) = entry.best_match {
                    writeln!(self.writer, "         source: {}", m.link)?;
                }
            }
        }

        let summary = summarize_report(report, threshold);
        writeln!(self.writer)?;
        for line in summary_lines(&summary, report) {
            writeln!(self.writer, "{}", line)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonOutput<'a> {
    threshold: f64,
    complete: bool,
    summary: ReportSummary,
    report: &'a Report,
}

/// Pretty JSON: `{ threshold, complete, summary, report }`.
pub struct JsonSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ReportSink for JsonSink<W> {
    fn render(&mut self, report: &Report, threshold: f64) -> Result<(), SinkError> {
        let out = JsonOutput {
            threshold,
            complete: report.is_complete(),
            summary: summarize_report(report, threshold),
            report,
        };
        serde_json::to_writer_pretty(&mut self.writer, &out)?;
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Paginated plain-text document; pages are separated by form feeds.
pub struct PagedTextSink<W: Write> {
    writer: W,
    page_size: usize,
}

impl<W: Write> PagedTextSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn page_header(&mut self, page: usize, pages: usize, report: &Report) -> Result<(), SinkError> {
        writeln!(self.writer, "PlagiProof Report - page {}/{}", page, pages)?;
        writeln!(
            self.writer,
            "Run {}  Generated {}",
            report.run_id,
            report.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        writeln!(self.writer, "{}", "=".repeat(72))?;
        Ok(())
    }
}

impl<W: Write> ReportSink for PagedTextSink<W> {
    fn render(&mut self, report: &Report, threshold: f64) -> Result<(), SinkError> {
        let entry_pages = report.entries.len().div_ceil(self.page_size);
        // Summary always gets the last page.
        let pages = entry_pages + 1;

        for (page_idx, chunk) in report.entries.chunks(self.page_size).enumerate() {
            self.page_header(page_idx + 1, pages, report)?;
            for entry in chunk {
                writeln!(
                    self.writer,
                    "{:>4}. {}  {}",
                    entry.index + 1,
                    percent(entry.similarity),
                    entry.classify(threshold).label()
                )?;
                writeln!(self.writer, "      {}", entry.sentence.text)?;
                if let Some(ref m) = entry.best_match {
                    writeln!(self.writer, "      source: {} <{}>", m.title, m.link)?;
                }
            }
            write!(self.writer, "\x0C")?;
        }

        self.page_header(pages, pages, report)?;
        writeln!(self.writer, "Threshold: {:.0}%", threshold * 100.0)?;
        for line in summary_lines(&summarize_report(report, threshold), report) {
            writeln!(self.writer, "{}", line)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SearchResult, Sentence};

    fn sample_report() -> Report {
        let mut report = Report::new(0.7, 3);
        report.push(ScoreEntry::scored(
            0,
            Sentence::new("The sky is blue.", 0, 16),
            0.85,
            2,
            Some(SearchResult {
                title: "Sky".to_string(),
                link: "https://example.com/sky".to_string(),
                snippet: "The sky is blue and vast".to_string(),
            }),
        ));
        report.push(ScoreEntry::scored(1, Sentence::new("Water boils.", 17, 29), 0.5, 1, None));
        report.push(ScoreEntry::failed(2, Sentence::new("Unknown.", 30, 38), "timeout"));
        report
    }

    #[test]
    fn test_console_sink() {
        let mut sink = ConsoleSink::new(Vec::new()).with_excerpt_chars(60);
        sink.render(&sample_report(), 0.7).unwrap();
        let out = String::from_utf8(sink.into_inner()).unwrap();

        assert!(out.contains("[S0001]  85.0%  possible plagiarism"));
        assert!(out.contains("[S0002]  50.0%  original"));
        assert!(out.contains("source: https://example.com/sky"));
        assert!(out.contains("Flagged: 1"));
        assert!(out.contains("Verdict: possible plagiarism"));
    }

    #[test]
    fn test_json_sink() {
        let mut sink = JsonSink::new(Vec::new());
        sink.render(&sample_report(), 0.7).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&sink.into_inner()).unwrap();

        assert_eq!(value["complete"], true);
        assert_eq!(value["summary"]["flagged"], 1);
        assert_eq!(value["report"]["entries"].as_array().unwrap().len(), 3);
        assert_eq!(value["report"]["entries"][2]["status"]["state"], "failed");
    }

    #[test]
    fn test_paged_sink_paginates() {
        let mut sink = PagedTextSink::new(Vec::new()).with_page_size(2);
        sink.render(&sample_report(), 0.7).unwrap();
        let out = String::from_utf8(sink.into_inner()).unwrap();

        // 3 entries at 2 per page plus a summary page.
        assert_eq!(out.matches('\x0C').count(), 2);
        assert!(out.contains("page 1/3"));
        assert!(out.contains("page 3/3"));
        assert!(out.contains("source: Sky <https://example.com/sky>"));
    }

    fn single_entry_report() -> Report {
        let mut report = Report::new(0.7, 1);
        report.push(ScoreEntry::scored(0, Sentence::new("Close call.", 0, 11), 0.6, 1, None));
        report
    }

    #[test]
    fn test_console_summary_uses_render_threshold() {
        let mut sink = ConsoleSink::new(Vec::new());
        sink.render(&single_entry_report(), 0.5).unwrap();
        let out = String::from_utf8(sink.into_inner()).unwrap();

        assert!(out.contains("[S0001]  60.0%  possible plagiarism"));
        assert!(out.contains("Flagged: 1 (100.0%)"));
        assert!(out.contains("Verdict: possible plagiarism"));
    }

    #[test]
    fn test_json_summary_uses_render_threshold() {
        let mut sink = JsonSink::new(Vec::new());
        sink.render(&single_entry_report(), 0.5).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&sink.into_inner()).unwrap();

        assert_eq!(value["threshold"], 0.5);
        assert_eq!(value["summary"]["flagged"], 1);
        assert_eq!(value["summary"]["verdict"], "possible plagiarism");
    }
}
