//! CLI binary for transcript-verify.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `VerifierConfig` and prints the outcome.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use transcript_verify::pipeline::parse::parse_response;
use transcript_verify::prompts::build_verification_prompt;
use transcript_verify::{
    verify_file, PdfSupport, ProgressCallback, Stage, VerificationOutcome,
    VerificationProgressCallback, VerificationResult, VerificationStatus, VerifierConfig,
};

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner that shows the running stage and logs one line per finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Starting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl VerificationProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_prefix(format!("{stage}…"));
    }

    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        self.bar.println(format!(
            "  {} {:<20} {}",
            green("✓"),
            stage.label(),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0))
        ));
    }

    fn on_stage_error(&self, stage: Stage, error: &str) {
        let msg: String = error.chars().take(80).collect();
        self.bar
            .println(format!("  {} {:<20} {}", red("✗"), stage.label(), red(&msg)));
        self.bar.finish_and_clear();
    }

    fn on_verification_complete(&self, _status: VerificationStatus) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Verify an image transcript against two subjects
  transcript-verify transcript.png -s Calculus -s Physics

  # PDF transcript (needs a pdfium shared library)
  transcript-verify --pdfium-lib /opt/pdfium/lib transcript.pdf -s Chemistry

  # Use a specific model
  transcript-verify --provider anthropic --model claude-sonnet-4-20250514 transcript.jpg -s Biology

  # Machine-readable outcome
  transcript-verify --json transcript.png -s Calculus > outcome.json

  # Show the prompt that would be sent (no API key needed)
  transcript-verify --prompt-only -s Calculus -s Physics

  # Re-parse a saved model reply offline
  transcript-verify --parse-response reply.txt

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Directory or file of the pdfium shared library

DECISION RULE:
  verified  at least one course matching a claimed subject with grade B+ (3.3)
            or better AND authenticity score >= 0.7
  rejected  anything else, including unreadable model replies
"#;

/// Verify academic transcripts using Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "transcript-verify",
    version,
    about = "Verify academic transcripts against claimed subjects using Vision LLMs",
    long_about = "Verify a tutor's academic transcript (PDF, PNG or JPEG) against the subjects \
they claim to teach, using a Vision Language Model. Supports OpenAI, Anthropic, Google Gemini, \
Azure OpenAI, and any OpenAI-compatible endpoint (Ollama, vLLM, LiteLLM, etc.).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Transcript file (.pdf, .png, .jpg).
    #[arg(required_unless_present_any = ["prompt_only", "parse_response"])]
    input: Option<PathBuf>,

    /// Subject the tutor claims to teach (repeatable).
    #[arg(short, long = "subject", env = "TRANSCRIPT_VERIFY_SUBJECTS", value_delimiter = ',')]
    subjects: Vec<String>,

    /// LLM model ID (default: gpt-4o).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        env = "EDGEQUAKE_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set.\n\
          Supported: openai, anthropic, gemini, azure, ollama, or any OpenAI-compatible URL."
    )]
    provider: Option<String>,

    /// PDF page render scale (2.0–4.0).
    #[arg(long, env = "TRANSCRIPT_VERIFY_SCALE", default_value_t = 2.0)]
    scale: f32,

    /// Max LLM output tokens.
    #[arg(long, env = "TRANSCRIPT_VERIFY_MAX_TOKENS", default_value_t = 2000)]
    max_tokens: usize,

    /// LLM temperature.
    #[arg(long, env = "TRANSCRIPT_VERIFY_TEMPERATURE", default_value_t = 0.0)]
    temperature: f32,

    /// Vision call timeout in seconds.
    #[arg(long, env = "TRANSCRIPT_VERIFY_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Directory or file of the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Do not try to load pdfium; PDF transcripts are refused.
    #[arg(long, env = "TRANSCRIPT_VERIFY_NO_PDF")]
    no_pdf: bool,

    /// Output the outcome as JSON.
    #[arg(long, env = "TRANSCRIPT_VERIFY_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "TRANSCRIPT_VERIFY_NO_PROGRESS")]
    no_progress: bool,

    /// Print the verification prompt and exit.
    #[arg(long)]
    prompt_only: bool,

    /// Parse a saved model reply instead of calling the model.
    #[arg(long, value_name = "FILE", conflicts_with = "prompt_only")]
    parse_response: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "TRANSCRIPT_VERIFY_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "TRANSCRIPT_VERIFY_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner replaces INFO logs; --verbose always wins.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Offline modes ────────────────────────────────────────────────────
    if cli.prompt_only {
        println!("{}", build_verification_prompt(&cli.subjects));
        return Ok(());
    }

    if let Some(ref reply_path) = cli.parse_response {
        let raw = tokio::fs::read_to_string(reply_path)
            .await
            .with_context(|| format!("Failed to read model reply from {:?}", reply_path))?;
        let result = parse_response(&raw);
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&result).context("Failed to serialise result")?
            );
        } else {
            print_result(&result, None);
        }
        return Ok(());
    }

    let input = cli
        .input
        .as_deref()
        .context("A transcript file is required")?;

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn VerificationProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, input, progress_cb)?;

    // ── Run verification ─────────────────────────────────────────────────
    let outcome = verify_file(input, &cli.subjects, &config)
        .await
        .context("Verification failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&outcome).context("Failed to serialise outcome")?
        );
    } else if !cli.quiet {
        print_outcome(&outcome);
    }

    Ok(())
}

/// Map CLI args to `VerifierConfig`.
fn build_config(
    cli: &Cli,
    input: &Path,
    progress: Option<ProgressCallback>,
) -> Result<VerifierConfig> {
    let is_pdf = input
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));

    // Only probe for pdfium when it could be needed.
    let pdf_support = if cli.no_pdf || !is_pdf {
        PdfSupport::Disabled
    } else {
        PdfSupport::detect(cli.pdfium_lib.as_deref())
    };

    let mut builder = VerifierConfig::builder()
        .render_scale(cli.scale)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .api_timeout_secs(cli.api_timeout)
        .pdf_support(pdf_support);

    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_outcome(outcome: &VerificationOutcome) {
    print_result(
        &outcome.verification_data,
        outcome.verified_at.map(|t| t.to_rfc3339()),
    );
}

fn print_result(result: &VerificationResult, verified_at: Option<String>) {
    let headline = match result.overall_status {
        VerificationStatus::Verified => green(&bold("✔ VERIFIED")),
        VerificationStatus::Rejected => red(&bold("✘ REJECTED")),
    };
    println!(
        "{}  authenticity {:.2}{}",
        headline,
        result.authenticity_score,
        verified_at
            .map(|t| dim(&format!("  at {t}")))
            .unwrap_or_default()
    );

    if !result.verified_courses.is_empty() {
        println!();
        for course in &result.verified_courses {
            let mark = if course.qualifies() {
                green("✓")
            } else {
                dim("·")
            };
            let subject = course
                .matches_subject
                .as_deref()
                .map(|s| format!("→ {s}"))
                .unwrap_or_default();
            println!(
                "  {} {:<36} {:<4} {:>4.1}  {}",
                mark, course.course_name, course.grade, course.grade_points, subject
            );
        }
    }

    println!();
    if !result.summary.is_empty() {
        println!("{} {}", bold("Summary:"), result.summary);
    }
    if !result.authenticity_notes.is_empty() {
        println!("{} {}", bold("Authenticity:"), result.authenticity_notes);
    }
    if let Some(ref reason) = result.rejection_reason {
        println!("{} {}", bold("Reason:"), reason);
    }
}
