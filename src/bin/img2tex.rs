//! CLI binary for img2tex.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig` and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use img2tex::server::{create_router, AppState};
use img2tex::{extract_file, ExtractionConfig};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract LaTeX from an image (cleaned output on stdout)
  img2tex extract equation.png

  # Show the model output verbatim, delimiters and all
  img2tex extract equation.png --raw

  # Full result as JSON (raw + cleaned + token stats)
  img2tex extract equation.png --json

  # Use a different vision model
  img2tex extract equation.png --model llama-3.2-90b-vision-preview

  # Point at another OpenAI-compatible endpoint
  img2tex extract equation.png --api-url https://api.openai.com/v1/chat/completions --model gpt-4o

  # Run the interactive web UI on http://127.0.0.1:8080
  img2tex serve

ENVIRONMENT VARIABLES:
  IMG2TEX_API_KEY      API credential (checked first)
  GROQ_API_KEY         API credential (fallback)
  IMG2TEX_MODEL        Override the model ID
  IMG2TEX_API_URL      Override the chat-completion endpoint
  IMG2TEX_PORT         Port for `serve`

SETUP:
  1. Set API key:   export GROQ_API_KEY=gsk_...
  2. Extract:       img2tex extract equation.png
"#;

/// Extract LaTeX from equation images using Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "img2tex",
    version,
    about = "Extract LaTeX from equation images using Vision LLMs",
    long_about = "Extract LaTeX source from images of mathematical equations using a hosted \
vision-language model (Groq by default, or any OpenAI-compatible endpoint). \
Run one-shot extractions from the command line or serve an interactive web UI.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "IMG2TEX_VERBOSE", global = true)]
    verbose: bool,

    /// Suppress all output except errors and the result.
    #[arg(short, long, env = "IMG2TEX_QUIET", global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract LaTeX from an image file (png/jpg/jpeg).
    Extract(ExtractArgs),
    /// Run the interactive web UI.
    Serve(ServeArgs),
}

/// Flags shared by `extract` and `serve` that map onto `ExtractionConfig`.
#[derive(Args, Debug)]
struct ModelArgs {
    /// Vision model ID.
    #[arg(long, env = "IMG2TEX_MODEL")]
    model: Option<String>,

    /// Chat-completion endpoint URL (any OpenAI-compatible endpoint).
    #[arg(long, env = "IMG2TEX_API_URL")]
    api_url: Option<String>,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "IMG2TEX_TEMPERATURE", default_value_t = 0.7)]
    temperature: f32,

    /// Max output tokens for the completion.
    #[arg(long, env = "IMG2TEX_MAX_TOKENS", default_value_t = 1024)]
    max_tokens: usize,

    /// Per-call timeout in seconds.
    #[arg(long, env = "IMG2TEX_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Path to a text file containing a custom instruction prompt.
    #[arg(long, env = "IMG2TEX_PROMPT")]
    prompt: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// Image file to extract from.
    image: PathBuf,

    #[command(flatten)]
    model: ModelArgs,

    /// Print the model output verbatim instead of the cleaned variant.
    #[arg(long)]
    raw: bool,

    /// Output the full result (raw, cleaned, stats) as JSON.
    #[arg(long)]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "IMG2TEX_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to bind.
    #[arg(long, env = "IMG2TEX_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to bind.
    #[arg(short, long, env = "IMG2TEX_PORT", default_value_t = 8080)]
    port: u16,

    #[command(flatten)]
    model: ModelArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Library logs go to stderr so stdout stays clean for the result.
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        match cli.command {
            // The spinner is the feedback channel during one-shot extraction.
            Command::Extract(_) => "warn",
            Command::Serve(_) => "info",
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Extract(args) => run_extract(args, cli.quiet).await,
        Command::Serve(args) => run_serve(args).await,
    }
}

/// Map shared CLI flags to `ExtractionConfig`.
fn build_config(args: &ModelArgs) -> Result<ExtractionConfig> {
    let prompt = if let Some(ref path) = args.prompt {
        Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read prompt from {:?}", path))?,
        )
    } else {
        None
    };

    let mut builder = ExtractionConfig::builder()
        .temperature(args.temperature)
        .max_tokens(args.max_tokens)
        .api_timeout_secs(args.api_timeout);

    if let Some(ref model) = args.model {
        builder = builder.model(model);
    }
    if let Some(ref url) = args.api_url {
        builder = builder.api_url(url);
    }
    if let Some(p) = prompt {
        builder = builder.prompt(p);
    }

    builder.build().context("Invalid configuration")
}

async fn run_extract(args: ExtractArgs, quiet: bool) -> Result<()> {
    let config = build_config(&args.model)?;

    let show_spinner =
        !quiet && !args.no_progress && !args.json && io::stderr().is_terminal();
    let spinner = if show_spinner {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_message("Processing image…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Some(bar)
    } else {
        None
    };

    let result = extract_file(&args.image, &config).await;

    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }

    let output = result.context("Extraction failed")?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to serialise output")?
        );
    } else {
        let text = if args.raw { &output.latex } else { &output.cleaned };
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(text.as_bytes())
            .context("Failed to write to stdout")?;
        if !text.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }

    if !quiet && !args.json {
        eprintln!(
            "{} {}  {}",
            green("✔"),
            bold(&args.image.display().to_string()),
            dim(&format!(
                "{} tokens in / {} tokens out — {}ms",
                output.stats.input_tokens, output.stats.output_tokens, output.stats.duration_ms
            )),
        );
    }

    Ok(())
}

async fn run_serve(args: ServeArgs) -> Result<()> {
    let config = build_config(&args.model)?;
    let state = AppState::new(config).context("Cannot start the web UI")?;
    let router = create_router(state);

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    eprintln!(
        "{} img2tex web UI listening on {}",
        green("✔"),
        bold(&format!("http://{addr}/"))
    );

    axum::serve(listener, router)
        .await
        .context("Server terminated unexpectedly")?;

    Ok(())
}
