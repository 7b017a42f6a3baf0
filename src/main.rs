// condense: summarize text with a local Ollama model, or extractively when none answers.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::Mutex;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use condense::config::{Overrides, Settings};
use condense::{input, Summarizer, SummaryResponse};

#[derive(Parser)]
#[command(name = "condense", about = "Condense text into a short summary with length statistics")]
struct Cli {
    /// More log output (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize one text given inline, from a file, or on stdin
    Summarize(SummarizeArgs),
    /// Summarize every supported file under a directory
    Batch(BatchArgs),
}

#[derive(Args)]
struct SummarizeArgs {
    /// Text to summarize
    #[arg(short, long, conflicts_with = "file")]
    text: Option<String>,
    /// File to summarize (txt, md, csv, json, pdf)
    #[arg(short, long)]
    file: Option<PathBuf>,
    /// Print the full response as JSON
    #[arg(long)]
    json: bool,
    /// Also write the summary text to this file
    #[arg(short, long)]
    output: Option<PathBuf>,
    #[command(flatten)]
    backend: BackendArgs,
}

#[derive(Args)]
struct BatchArgs {
    #[arg(short, long)]
    dir: PathBuf,
    #[arg(short, long, default_value = "condense_report.json")]
    out: PathBuf,
    #[command(flatten)]
    backend: BackendArgs,
}

#[derive(Args)]
struct BackendArgs {
    /// Ollama model (e.g. gemma3:4b). Defaults to OLLAMA_MODEL, then the smallest
    /// installed model.
    #[arg(short = 'm', long = "model")]
    model: Option<String>,
    /// Skip the remote model and summarize extractively
    #[arg(long)]
    local: bool,
    /// Seconds to wait for the remote model
    #[arg(long)]
    timeout: Option<u64>,
}

impl BackendArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            model: self.model.clone(),
            timeout_secs: self.timeout,
            local_only: self.local,
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
struct BatchEntry {
    path: String,
    #[serde(flatten)]
    response: SummaryResponse,
}

#[derive(Serialize, Deserialize, Debug)]
struct BatchFailure {
    path: String,
    error: String,
}

#[derive(Serialize, Deserialize, Debug, Default)]
struct BatchReport {
    summaries: Vec<BatchEntry>,
    failures: Vec<BatchFailure>,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "condense=warn",
        1 => "condense=info",
        _ => "condense=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_summarize(args: SummarizeArgs) -> Result<()> {
    let settings = Settings::load(args.backend.overrides())?;
    let text = match (args.text, &args.file) {
        (Some(t), _) => t,
        (None, Some(path)) => input::read_file(path)?,
        (None, None) => input::read_stdin()?,
    };

    let summarizer = Summarizer::from_settings(&settings);
    let response = summarizer.run(&text)?;

    if let Some(path) = &args.output {
        std::fs::write(path, &response.summary)
            .with_context(|| format!("cannot write summary to {}", path.display()))?;
        info!(path = %path.display(), "summary written");
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        let mut out = StandardStream::stdout(ColorChoice::Auto);
        render_response(&mut out, &response)?;
    }
    Ok(())
}

fn run_batch(args: BatchArgs) -> Result<()> {
    let settings = Settings::load(args.backend.overrides())?;
    let files = input::collect_files(&args.dir);
    info!(dir = %args.dir.display(), files = files.len(), "batch summarization");

    let summarizer = Summarizer::from_settings(&settings);
    let report = summarize_files(&summarizer, &files)?;
    write_report(&report, &args.out)?;

    println!(
        "Summarized {} file(s), {} failed. Wrote report to {}",
        report.summaries.len(),
        report.failures.len(),
        args.out.display()
    );
    Ok(())
}

fn summarize_files(summarizer: &Summarizer, files: &[PathBuf]) -> Result<BatchReport> {
    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] {wide_bar} {pos}/{len} {msg}",
        )?
        .progress_chars("=>-"),
    );

    let failures: Mutex<Vec<BatchFailure>> = Mutex::new(Vec::new());
    let summaries: Vec<BatchEntry> = files
        .par_iter()
        .filter_map(|p| {
            let result = input::read_file(p).and_then(|text| summarizer.run(&text));
            pb.inc(1);
            match result {
                Ok(response) => Some(BatchEntry {
                    path: p.to_string_lossy().to_string(),
                    response,
                }),
                Err(e) => {
                    warn!(path = %p.display(), error = %e, "skipping file");
                    failures.lock().push(BatchFailure {
                        path: p.to_string_lossy().to_string(),
                        error: format!("{:#}", e),
                    });
                    None
                }
            }
        })
        .collect();

    pb.finish_with_message("summarizing files");

    let mut failures = failures.into_inner();
    failures.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(BatchReport { summaries, failures })
}

fn write_report(report: &BatchReport, out: &Path) -> Result<()> {
    let f = std::fs::File::create(out).with_context(|| format!("cannot create {}", out.display()))?;
    serde_json::to_writer_pretty(f, report)?;
    Ok(())
}

fn write_label(out: &mut impl WriteColor, name: &str) -> std::io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true))?;
    write!(out, "{:<12}", name)?;
    out.reset()
}

fn render_response(out: &mut impl WriteColor, response: &SummaryResponse) -> Result<()> {
    writeln!(out, "{}", response.summary)?;
    writeln!(out)?;

    let stats = &response.stats;
    write_label(out, "method")?;
    match &response.model {
        Some(model) => writeln!(out, "{} ({})", response.method.as_str(), model)?,
        None => writeln!(out, "{}", response.method.as_str())?,
    }
    write_label(out, "characters")?;
    writeln!(out, "{} -> {}", stats.original_chars, stats.summary_chars)?;
    write_label(out, "words")?;
    writeln!(out, "{} -> {}", stats.original_words, stats.summary_words)?;
    write_label(out, "compression")?;
    let color = if stats.compression_ratio > 0 { Color::Green } else { Color::Yellow };
    out.set_color(ColorSpec::new().set_fg(Some(color)))?;
    writeln!(out, "{}%", stats.compression_ratio)?;
    out.reset()?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.command {
        Commands::Summarize(args) => run_summarize(args)?,
        Commands::Batch(args) => run_batch(args)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use condense::{Method, SummaryStats};
    use termcolor::Buffer;

    const ARTICLE: &str = "Solar panels convert sunlight into electricity. \
                           Panel efficiency has improved steadily since 2010. \
                           Most rooftop systems pay for themselves within ten years. \
                           Batteries let households store energy for the evening. \
                           Grid operators must balance supply when clouds pass. \
                           Solar power is now among the cheapest sources of energy.";

    fn local() -> Summarizer {
        Summarizer::new(None, 100_000)
    }

    #[test]
    fn test_cli_parses_summarize() {
        let cli = Cli::try_parse_from([
            "condense", "-v", "summarize", "--text", "hello", "--json", "--local", "--timeout", "5",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Summarize(args) => {
                assert_eq!(args.text.as_deref(), Some("hello"));
                assert!(args.json);
                let o = args.backend.overrides();
                assert!(o.local_only);
                assert_eq!(o.timeout_secs, Some(5));
                assert_eq!(o.model, None);
            }
            _ => panic!("expected summarize"),
        }
    }

    #[test]
    fn test_cli_text_conflicts_with_file() {
        let res = Cli::try_parse_from(["condense", "summarize", "--text", "a", "--file", "a.txt"]);
        assert!(res.is_err());
    }

    #[test]
    fn test_cli_parses_batch_defaults() {
        let cli = Cli::try_parse_from(["condense", "batch", "--dir", "docs", "-m", "gemma3:1b"])
            .unwrap();
        match cli.command {
            Commands::Batch(args) => {
                assert_eq!(args.dir, PathBuf::from("docs"));
                assert_eq!(args.out, PathBuf::from("condense_report.json"));
                assert_eq!(args.backend.model.as_deref(), Some("gemma3:1b"));
            }
            _ => panic!("expected batch"),
        }
    }

    #[test]
    fn test_summarize_files_collects_failures() -> Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("article.txt"), ARTICLE)?;
        std::fs::write(dir.path().join("blank.md"), "   \n")?;
        std::fs::write(dir.path().join("notes.md"), "Short note without much structure")?;

        let files = input::collect_files(dir.path());
        assert_eq!(files.len(), 3);

        let report = summarize_files(&local(), &files)?;
        assert_eq!(report.summaries.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].path.ends_with("blank.md"));
        assert!(report.failures[0].error.contains("no text to summarize"));

        let article = &report.summaries[0];
        assert!(article.path.ends_with("article.txt"));
        assert_eq!(article.response.method, Method::Extractive);
        assert!(article
            .response
            .summary
            .starts_with("Solar panels convert sunlight into electricity."));
        Ok(())
    }

    #[test]
    fn test_write_report_round_trip() -> Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("article.txt"), ARTICLE)?;
        let files = input::collect_files(dir.path());
        let report = summarize_files(&local(), &files)?;

        let out = dir.path().join("report.json");
        write_report(&report, &out)?;

        let loaded: BatchReport = serde_json::from_reader(std::fs::File::open(&out)?)?;
        assert_eq!(loaded.summaries.len(), 1);
        assert!(loaded.failures.is_empty());
        assert_eq!(loaded.summaries[0].response.summary, report.summaries[0].response.summary);

        let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&out)?)?;
        assert_eq!(raw["summaries"][0]["method"], "extractive");
        Ok(())
    }

    #[test]
    fn test_render_response_plain() -> Result<()> {
        let summary = "Solar is cheap.".to_string();
        let response = SummaryResponse {
            stats: SummaryStats::compute(ARTICLE, &summary),
            summary,
            method: Method::Remote,
            model: Some("gemma3:1b".into()),
            generated_at: 0,
        };
        let mut buf = Buffer::no_color();
        render_response(&mut buf, &response)?;
        let text = String::from_utf8(buf.into_inner())?;

        assert!(text.starts_with("Solar is cheap.\n\n"));
        assert!(text.contains("remote (gemma3:1b)"));
        assert!(text.contains(&format!("{}%", response.stats.compression_ratio)));
        assert!(text.contains("words"));
        Ok(())
    }
}
