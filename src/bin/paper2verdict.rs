//! CLI binary for paper2verdict.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PredictionConfig` and prints the decision record.

use anyhow::Result;
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use paper2verdict::{
    predict, predict_to_file, PredictionConfig, PredictionProgressCallback, PredictionStage,
    ProviderKind,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: one spinner, ticked through the three stages, with a
/// per-stage log line as each completes.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl PredictionProgressCallback for CliProgress {
    fn on_pipeline_start(&self, review_count: usize) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Analyzing {review_count} reviews…"))
        ));
    }

    fn on_stage_start(&self, stage: PredictionStage) {
        self.bar.set_message(format!(
            "[{}/{}] {}",
            stage.index(),
            PredictionStage::COUNT,
            stage
        ));
    }

    fn on_stage_complete(&self, stage: PredictionStage, output_len: usize) {
        let marker = if output_len > 0 {
            green("✓")
        } else {
            yellow("∅")
        };
        self.bar.println(format!(
            "  {} Stage {}/{}  {:<22}  {}",
            marker,
            stage.index(),
            PredictionStage::COUNT,
            stage.to_string(),
            dim(&format!("{output_len:>6} chars")),
        ));
    }
}

// ── CLI definition ───────────────────────────────────────────────────────────

/// Provider selection on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProviderArg {
    Gemini,
    Openai,
}

impl From<ProviderArg> for ProviderKind {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Gemini => ProviderKind::Gemini,
            ProviderArg::Openai => ProviderKind::OpenAi,
        }
    }
}

/// Predict a paper's accept/reject outcome from peer reviews and a rebuttal PDF.
#[derive(Debug, Parser)]
#[command(name = "paper2verdict", version, about)]
struct Cli {
    /// Reviews JSON file (array of review records).
    reviews: PathBuf,

    /// Rebuttal PDF — local path or HTTP(S) URL. Omit to predict from
    /// reviews alone.
    rebuttal: Option<String>,

    /// Model id; the family substring selects the provider.
    #[arg(long, env = "PAPER2VERDICT_MODEL", default_value = "gemini-2.5-flash")]
    model: String,

    /// Explicit provider (skips model-id detection).
    #[arg(long, value_enum)]
    provider: Option<ProviderArg>,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, default_value_t = 1.0)]
    temperature: f32,

    /// Output-token cap per stage call.
    #[arg(long, default_value_t = 4096)]
    max_tokens: usize,

    /// Maximum rebuttal pages sent to the vision stage.
    #[arg(long, default_value_t = 10)]
    pages: usize,

    /// Target width for rasterised rebuttal pages, in pixels.
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// PDF password for encrypted rebuttals.
    #[arg(long)]
    password: Option<String>,

    /// Write the full output (decision + transcripts + stats) as JSON.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Download timeout for URL rebuttals, in seconds.
    #[arg(long, default_value_t = 120)]
    download_timeout: u64,

    /// Per-inference-call timeout, in seconds.
    #[arg(long, default_value_t = 60)]
    api_timeout: u64,

    /// Print the raw stage transcripts after the decision.
    #[arg(long)]
    transcript: bool,

    /// Suppress the progress spinner.
    #[arg(short, long)]
    quiet: bool,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = match cli.verbose {
        0 => "warn",
        1 => "paper2verdict=info",
        _ => "paper2verdict=debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with_writer(std::io::stderr)
        .init();

    let progress = (!cli.quiet).then(CliProgress::new);

    let mut builder = PredictionConfig::builder()
        .model(&cli.model)
        .temperature(cli.temperature)
        .max_output_tokens(cli.max_tokens)
        .page_limit(cli.pages)
        .page_width_px(cli.width)
        .download_timeout_secs(cli.download_timeout)
        .api_timeout_secs(cli.api_timeout);
    if let Some(provider) = cli.provider {
        builder = builder.provider(provider.into());
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password);
    }
    if let Some(ref cb) = progress {
        let callback: Arc<dyn PredictionProgressCallback> = Arc::clone(cb);
        builder = builder.progress_callback(callback);
    }
    let config = builder.build()?;

    let rebuttal = cli.rebuttal.as_deref();
    let result = match cli.output {
        Some(ref path) => predict_to_file(&cli.reviews, rebuttal, path, &config).await,
        None => predict(&cli.reviews, rebuttal, &config).await,
    };

    if let Some(ref cb) = progress {
        cb.finish();
    }
    let output = result?;

    println!("{}", serde_json::to_string_pretty(&output.decision)?);

    if cli.transcript {
        eprintln!("\n{}", bold("── Stage transcripts ──"));
        eprintln!("{}", dim(&output.transcript.review_analysis));
        eprintln!("{}", dim(&output.transcript.rebuttal_analysis));
        eprintln!("{}", dim(&output.transcript.decision_raw));
    }

    if let Some(ref path) = cli.output {
        eprintln!("{} wrote {}", green("✓"), path.display());
    }

    if !output.is_decided() {
        eprintln!(
            "{} no decision was produced — check provider credentials and logs",
            yellow("!")
        );
        std::process::exit(1);
    }

    Ok(())
}
