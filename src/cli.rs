// Command-line front end
// check / check-text / segment / config

use crate::models::{Report, Sentence};
use crate::services::config_store::{AppConfig, ConfigStore};
use crate::services::detection::{summarize_report, PlagiarismEvaluator};
use crate::services::document_reader::read_document;
use crate::services::providers::{BingProvider, SnippetProvider};
use crate::services::report_sink::{ConsoleSink, JsonSink, PagedTextSink, ReportSink};
use crate::services::sentence_segmenter::{detect_language, SegmenterModel, SentenceSegmenter};
use crate::services::text_processor::{normalize_punctuation, preview};
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io::{BufWriter, Write};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "plagiproof")]
#[command(about = "Sentence-level plagiarism checker backed by web search snippets")]
#[command(version)]
pub struct Cli {
    /// Config directory to use instead of the platform default
    #[arg(long, global = true, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check a document (.txt, .md, .pdf, .docx)
    Check {
        file: PathBuf,
        #[command(flatten)]
        opts: CheckOptions,
    },
    /// Check text given on the command line
    CheckText {
        text: String,
        #[command(flatten)]
        opts: CheckOptions,
    },
    /// Print the sentences a document segments into
    Segment {
        file: PathBuf,
        /// Number of sentences to print
        #[arg(long, default_value_t = 50)]
        limit: usize,
        /// Also write all sentences as JSON
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,
    },
    /// Inspect or change the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the stored configuration
    Show,
    /// Print the config file location
    Path,
    /// Set one value, e.g. `detection.threshold 0.8`
    Set { key: String, value: String },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Console,
    Json,
    Paged,
}

#[derive(Args, Debug, Clone)]
pub struct CheckOptions {
    /// Similarity at or above which a sentence is flagged (0.0-1.0)
    #[arg(long)]
    pub threshold: Option<f64>,
    /// Threshold preset used when --threshold is not given
    #[arg(long, value_parser = ["low", "medium", "high"])]
    pub sensitivity: Option<String>,
    /// Minimum gap between search requests in milliseconds
    #[arg(long)]
    pub interval_ms: Option<u64>,
    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Console)]
    pub format: OutputFormat,
    /// Write the report here instead of stdout
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,
    /// Entries per page for --format paged
    #[arg(long, default_value_t = 25)]
    pub page_size: usize,
    /// Keep English stop words when scoring
    #[arg(long)]
    pub no_stop_words: bool,
}

impl CheckOptions {
    /// Flags override the config file and environment.
    pub fn apply(&self, config: &mut AppConfig) -> Result<()> {
        if let Some(sensitivity) = &self.sensitivity {
            config.detection.sensitivity = sensitivity.clone();
            config.detection.threshold = None;
        }
        if let Some(t) = self.threshold {
            if !(0.0..=1.0).contains(&t) {
                bail!("--threshold must be between 0.0 and 1.0, got {}", t);
            }
            config.detection.threshold = Some(t);
        }
        if let Some(ms) = self.interval_ms {
            config.detection.min_request_interval_ms = ms;
        }
        if let Some(secs) = self.timeout_secs {
            if secs == 0 {
                bail!("--timeout-secs must be at least 1");
            }
            config.detection.request_timeout_secs = secs;
        }
        if self.no_stop_words {
            config.detection.remove_stop_words = false;
        }
        Ok(())
    }
}

pub async fn execute(cli: Cli) -> Result<()> {
    let store = match cli.config_dir {
        Some(dir) => ConfigStore::new(dir),
        None => ConfigStore::open_default()?,
    };

    match cli.command {
        Command::Check { file, opts } => {
            let text = read_document(&file)?;
            check(&store, &text, &opts).await?;
        }
        Command::CheckText { text, opts } => {
            let text = normalize_punctuation(&text);
            if text.is_empty() {
                bail!("no text to check");
            }
            check(&store, &text, &opts).await?;
        }
        Command::Segment { file, limit, out } => segment(&file, limit, out.as_deref())?,
        Command::Config { action } => config_command(&store, action)?,
    }
    Ok(())
}

fn load_config(store: &ConfigStore) -> Result<AppConfig> {
    let mut config = store.load()?;
    config.apply_env_overrides();
    Ok(config)
}

/// Segmenter matching the document language; English uses the shared model.
pub fn segmenter_for(text: &str) -> SentenceSegmenter {
    let language = detect_language(text);
    if language == "en" {
        SentenceSegmenter::default()
    } else {
        SentenceSegmenter::new(Arc::new(SegmenterModel::for_language(&language)))
    }
}

pub fn build_evaluator(config: &AppConfig, text: &str) -> Result<PlagiarismEvaluator> {
    let provider: Arc<dyn SnippetProvider> = Arc::new(
        BingProvider::new(&config.search_settings()).context("failed to create search client")?,
    );
    Ok(PlagiarismEvaluator::new(
        segmenter_for(text),
        provider,
        config.evaluator_config(),
    ))
}

async fn check(store: &ConfigStore, text: &str, opts: &CheckOptions) -> Result<()> {
    let mut config = load_config(store)?;
    opts.apply(&mut config)?;
    let evaluator = build_evaluator(&config, text)?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, stopping the run");
                cancel.cancel();
            }
        });
    }

    let report = evaluator
        .evaluate_cancellable(text, &cancel, |entry, total| {
            info!(
                index = entry.index + 1,
                total,
                similarity = entry.similarity,
                "check.progress"
            );
            ControlFlow::Continue(())
        })
        .await;

    if !report.is_complete() {
        warn!(
            "Report is partial: {}/{} sentences evaluated",
            report.len(),
            report.total_sentences
        );
    }

    render(&report, opts)?;

    let summary = summarize_report(&report, report.threshold);
    info!(
        flagged = summary.flagged,
        failed = summary.failed,
        verdict = %summary.verdict,
        "check.finished"
    );
    Ok(())
}

fn open_output(out: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match out {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(std::io::stdout().lock()),
    })
}

pub fn render(report: &Report, opts: &CheckOptions) -> Result<()> {
    let writer = open_output(opts.out.as_deref())?;
    let threshold = report.threshold;
    let mut sink: Box<dyn ReportSink> = match opts.format {
        OutputFormat::Console => Box::new(ConsoleSink::new(writer)),
        OutputFormat::Json => Box::new(JsonSink::new(writer)),
        OutputFormat::Paged => Box::new(PagedTextSink::new(writer).with_page_size(opts.page_size)),
    };
    sink.render(report, threshold)?;
    if let Some(ref path) = opts.out {
        info!("Report written to {}", path.display());
    }
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SegmentOutput<'a> {
    file: String,
    language: String,
    extracted_chars: usize,
    extracted_bytes: usize,
    sentences: &'a [Sentence],
}

fn segment(path: &Path, limit: usize, out: Option<&Path>) -> Result<()> {
    let text = read_document(path)?;
    let language = detect_language(&text);
    let sentences = segmenter_for(&text).segment(&text);

    println!("File: {}", path.display());
    println!("Extracted: {} chars ({} bytes)", text.chars().count(), text.len());
    println!("Language: {}", language);
    println!();
    println!("Sentences: {}", sentences.len());
    for (i, s) in sentences.iter().take(limit).enumerate() {
        println!(
            "[S{:04}] bytes=[{},{}] chars={}  {}",
            i,
            s.start,
            s.end,
            s.text.chars().count(),
            preview(&s.text, 120)
        );
    }
    if sentences.len() > limit {
        println!("... ({} more sentences)", sentences.len() - limit);
    }

    if let Some(out_path) = out {
        let output = SegmentOutput {
            file: path.display().to_string(),
            language,
            extracted_chars: text.chars().count(),
            extracted_bytes: text.len(),
            sentences: &sentences,
        };
        let json = serde_json::to_string_pretty(&output)?;
        std::fs::write(out_path, json)
            .with_context(|| format!("failed to write {}", out_path.display()))?;
        println!();
        println!("Wrote JSON: {}", out_path.display());
    }
    Ok(())
}

fn config_command(store: &ConfigStore, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = store.load()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            println!("# effective threshold: {:.2}", load_config(store)?.threshold());
        }
        ConfigAction::Path => println!("{}", store.config_file().display()),
        ConfigAction::Set { key, value } => {
            store.set(&key, &value)?;
            println!("{} = {}", key, value);
        }
    }
    Ok(())
}
