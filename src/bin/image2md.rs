//! CLI binary for image2markdown.
//!
//! A thin shim over the library crate that maps CLI flags and the optional
//! YAML config file to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use image2markdown::{
    convert_batch, load_config_file, process_single_image, ConfigFile, ConversionConfig,
    ConversionProgressCallback, ProgressCallback, DEFAULT_PATTERN,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── User-facing lines ────────────────────────────────────────────────────────

/// Printed once a `single` conversion has written its output.
fn single_done_line(image: &Path, output: &Path) -> String {
    format!("✓ {} -> {}", image.display(), output.display())
}

/// Printed as each batch image starts.
fn processing_line(source: &Path, destination: &Path) -> String {
    format!("Processing {} -> {}", source.display(), destination.display())
}

/// Printed on stderr for each failed batch image.
fn file_error_line(error: &str) -> String {
    format!("Error: {error}")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── Progress reporting ───────────────────────────────────────────────────────

/// Terminal progress callback: a live bar plus one log line per image.
/// Works with out-of-order completion (`--concurrency > 1`).
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<PathBuf, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_batch_start` tells us how many images matched.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Scanning input directory…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} images  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Converting");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self, source: &Path) -> f64 {
        self.start_times
            .lock()
            .unwrap()
            .remove(source)
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_files: usize) {
        self.activate_bar(total_files);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Converting {total_files} images…"))
        ));
    }

    fn on_file_start(&self, source: &Path, destination: &Path) {
        self.start_times
            .lock()
            .unwrap()
            .insert(source.to_path_buf(), Instant::now());
        self.bar.println(processing_line(source, destination));
        if let Some(name) = source.file_name() {
            self.bar.set_message(name.to_string_lossy().into_owned());
        }
    }

    fn on_file_complete(&self, source: &Path, _destination: &Path, markdown_len: usize) {
        let secs = self.elapsed_secs(source);
        self.bar.println(format!(
            "  {} {}  {}  {}",
            green("✓"),
            source.display(),
            dim(&format!("{markdown_len:>5} chars")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_file_error(&self, source: &Path, error: &str) {
        let secs = self.elapsed_secs(source);
        self.errors.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!(
            "  {} {}  {}",
            red("✗"),
            red(error),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_files: usize, success_count: usize) {
        let failed = self.errors.load(Ordering::SeqCst);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} images converted successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} images converted  ({} failed)",
                if failed == total_files {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_files,
                red(&failed.to_string()),
            );
        }
    }
}

/// Plain line-per-image output for pipes and `--no-progress`.
struct PlainProgressCallback {
    report_errors: bool,
}

impl ConversionProgressCallback for PlainProgressCallback {
    fn on_file_start(&self, source: &Path, destination: &Path) {
        println!("{}", processing_line(source, destination));
    }

    fn on_file_error(&self, _source: &Path, error: &str) {
        if self.report_errors {
            eprintln!("{}", file_error_line(error));
        }
    }
}

// ── Command line ─────────────────────────────────────────────────────────────

const AFTER_HELP: &str = r#"EXAMPLES:
  # One image
  image2md single scan.jpg scan.md

  # Every JPEG under ./scans, mirrored into ./markdown
  image2md batch scans markdown

  # PNGs only, with a custom model and prompt from a config file
  image2md --config image2md.yaml batch scans markdown --pattern "*.png"

  # Four images at a time, stop at the first failure
  image2md batch scans markdown --concurrency 4 --fail-fast

CONFIG FILE (YAML, every key optional):
  model: llama3.2-vision
  provider: ollama
  prompt: |
    Extract all the text from this image as Markdown.

ENVIRONMENT VARIABLES:
  OLLAMA_HOST        Ollama server address (default http://localhost:11434)
  IMAGE2MD_CONFIG    Default for --config
  IMAGE2MD_MODEL     Default for --model
  IMAGE2MD_PROVIDER  Default for --provider
  RUST_LOG           Log filter, e.g. RUST_LOG=image2markdown=debug

SETUP:
  1. Install Ollama and pull a vision model:  ollama pull llama3.2-vision
  2. Convert:                                 image2md single scan.jpg scan.md
"#;

/// Convert images to Markdown using a local Vision LLM.
#[derive(Parser, Debug)]
#[command(
    name = "image2md",
    version,
    about = "Convert image(s) to Markdown using a local Ollama vision model",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to YAML config file (optional).
    #[arg(long, global = true, env = "IMAGE2MD_CONFIG")]
    config: Option<PathBuf>,

    /// Model ID; overrides the config file (e.g. llava, llama3.2-vision).
    #[arg(long, global = true, env = "IMAGE2MD_MODEL")]
    model: Option<String>,

    /// Provider name; overrides the config file (default: ollama).
    #[arg(long, global = true, env = "IMAGE2MD_PROVIDER")]
    provider: Option<String>,

    /// Path to a text file whose contents replace the prompt.
    #[arg(long, global = true)]
    prompt_file: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable the progress bar.
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process a single image.
    Single {
        /// Path to input image.
        image: PathBuf,
        /// Path to output .md file.
        output: PathBuf,
    },
    /// Process all images in a folder.
    Batch(BatchArgs),
}

#[derive(Args, Debug)]
struct BatchArgs {
    /// Folder with images.
    input_dir: PathBuf,

    /// Folder for markdown output.
    output_dir: PathBuf,

    /// Glob pattern for images, matched at any depth.
    #[arg(long, default_value = DEFAULT_PATTERN)]
    pattern: String,

    /// Images converted at once.
    #[arg(short, long, env = "IMAGE2MD_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Stop at the first failing image instead of reporting all failures.
    #[arg(long)]
    fail_fast: bool,

    /// Print the batch report as JSON on stdout.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // User-facing lines come from the progress callbacks; library logs stay
    // at error level unless asked for.
    let filter = if cli.verbose { "debug" } else { "error" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<()> {
    // A bad --config aborts before anything else happens.
    let file_cfg = match cli.config {
        Some(ref path) => load_config_file(path)?,
        None => ConfigFile::default(),
    };

    match cli.command {
        Command::Single {
            ref image,
            ref output,
        } => {
            let config = build_config(cli, &file_cfg, None, 1, false).await?;
            process_single_image(image, output, &config).await?;
            if !cli.quiet {
                println!("{}", single_done_line(image, output));
            }
            Ok(())
        }
        Command::Batch(ref args) => run_batch(cli, &file_cfg, args).await,
    }
}

async fn run_batch(cli: &Cli, file_cfg: &ConfigFile, args: &BatchArgs) -> Result<()> {
    let show_progress =
        !cli.quiet && !cli.no_progress && !args.json && io::stderr().is_terminal();

    let bar_cb = show_progress.then(CliProgressCallback::new_dynamic);
    let progress: Option<ProgressCallback> = match bar_cb {
        Some(ref cb) => Some(Arc::clone(cb) as ProgressCallback),
        None if !cli.quiet && !args.json => Some(Arc::new(PlainProgressCallback {
            report_errors: !args.fail_fast,
        })),
        None => None,
    };

    let config = build_config(cli, file_cfg, progress, args.concurrency, args.fail_fast).await?;

    let result = convert_batch(&args.input_dir, &args.output_dir, &args.pattern, &config).await;
    if let Some(ref cb) = bar_cb {
        if result.is_err() || matches!(result, Ok(ref r) if r.is_empty()) {
            cb.bar.finish_and_clear();
        }
    }
    let report = result?;

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else if report.is_empty() && !cli.quiet {
        println!(
            "No images found in {} matching {}",
            report.input_dir.display(),
            report.pattern
        );
    }

    report.into_result()?;
    Ok(())
}

/// Map the config file and CLI flags to `ConversionConfig`.
///
/// Precedence: built-in defaults < config file < command line.
async fn build_config(
    cli: &Cli,
    file_cfg: &ConfigFile,
    progress: Option<ProgressCallback>,
    concurrency: usize,
    fail_fast: bool,
) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .merge_file(file_cfg)
        .concurrency(concurrency)
        .fail_fast(fail_fast);

    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref path) = cli.prompt_file {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt from {:?}", path))?;
        builder = builder.prompt(prompt.trim());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    Ok(builder.build()?)
}
