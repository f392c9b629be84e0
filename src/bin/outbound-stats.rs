//! CLI binary for outbound-stats.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `StatsConfig`, writes the reports and prints a summary.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use outbound_stats::{
    analyze, inspect, write_reports, ExtractionProgressCallback, PageSelection, ProgressCallback,
    ReportPaths, StatsConfig, StatsError, StatsOutput,
};
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress bar over the pages whose text is being read.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    /// Spinner until `on_extraction_start` reports the page count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, total_pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} pages  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");

        self.bar.set_length(total_pages as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Reading");
        self.bar.set_message("");
    }

    fn on_page_extracted(&self, page_num: usize, _total_pages: usize, text_len: usize) {
        if text_len == 0 {
            self.bar.println(format!(
                "  {} Page {:>3}  {}",
                yellow("⚠"),
                page_num,
                dim("no text layer")
            ));
        }
        self.bar.set_message(format!("page {page_num}"));
        self.bar.inc(1);
    }

    fn on_extraction_complete(&self, records: usize, skipped: usize) {
        self.bar.finish_and_clear();
        if skipped == 0 {
            eprintln!("{} {} outbound records found", green("✔"), bold(&records.to_string()));
        } else {
            eprintln!(
                "{} {} outbound records found  ({} malformed, skipped)",
                yellow("⚠"),
                bold(&records.to_string()),
                red(&skipped.to_string())
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Count outbound records, excluding Macau public holidays
  outbound-stats movements.pdf

  # Keep holidays in the count
  outbound-stats --no-holidays movements.pdf

  # Use your own holiday list
  outbound-stats --region HK --holiday-file hk-holidays.json movements.pdf

  # Records marked with another keyword
  outbound-stats --keyword 離境 movements.pdf

  # Full control over the record grammar (needs year, month, day groups)
  outbound-stats --pattern '出境\s*(?P<year>\d{4})年(?P<month>\d{1,2})月(?P<day>\d{1,2})日' movements.pdf

  # Machine-readable summary
  outbound-stats --json movements.pdf > summary.json

  # Inspect PDF metadata only
  outbound-stats --inspect-only movements.pdf

OUTPUT:
  <base>.xlsx and <base>.md are written next to the input. Nothing is written
  when the PDF holds no outbound record or when any step fails.

HOLIDAY FILE (JSON):
  { "region": "MO", "years": { "2024": ["2024-01-01", "2024-02-10"] } }
  A listed year counts as covered; dates in other years are not filtered.

ENVIRONMENT VARIABLES:
  OUTBOUND_HOLIDAY_FILE   Holiday file used when --holiday-file is not given
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  RUST_LOG                Log filter, overrides -v/-q

EXIT CODES:
  0  success (also when no records were found)
  1  unreadable document, invalid options, or output failure
  2  input file not found
"#;

/// Count outbound records in a PDF per academic year.
#[derive(Parser, Debug)]
#[command(
    name = "outbound-stats",
    version,
    about = "Count outbound (出境) records in a PDF per academic year",
    long_about = "Extract outbound (出境) dates from an immigration-record PDF, collapse same-day \
crossings, optionally drop public holidays, and count the rest per academic year \
(Aug 1 – Jul 31). Writes <base>.xlsx and <base>.md next to the input.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Input PDF file.
    input: PathBuf,

    /// Marker keyword preceding each outbound date.
    #[arg(long, env = "OUTBOUND_KEYWORD", conflicts_with = "pattern")]
    keyword: Option<String>,

    /// Full record regex with named groups year, month and day.
    #[arg(long, env = "OUTBOUND_PATTERN")]
    pattern: Option<String>,

    /// Count holidays like any other day.
    #[arg(long, env = "OUTBOUND_NO_HOLIDAYS")]
    no_holidays: bool,

    /// Holiday region code.
    #[arg(long, env = "OUTBOUND_REGION", default_value = "MO")]
    region: String,

    /// JSON holiday file (overrides the built-in calendar).
    #[arg(long)]
    holiday_file: Option<PathBuf>,

    /// Only list academic years that have records.
    #[arg(long, env = "OUTBOUND_NO_FILL_GAPS")]
    no_fill_gaps: bool,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "OUTBOUND_PASSWORD")]
    password: Option<String>,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "OUTBOUND_PAGES", default_value = "all")]
    pages: String,

    /// Print the summary as JSON on stdout.
    #[arg(long, env = "OUTBOUND_JSON")]
    json: bool,

    /// Print PDF metadata only, no analysis.
    #[arg(long)]
    inspect_only: bool,

    /// Disable progress bar.
    #[arg(long, env = "OUTBOUND_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "OUTBOUND_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "OUTBOUND_QUIET")]
    quiet: bool,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    output: &'a StatsOutput,
    reports: Option<&'a ReportPaths>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
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

    match run(&cli, show_progress) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {:#}", red("✘"), err);
            let code = err
                .chain()
                .find_map(|e| e.downcast_ref::<StatsError>())
                .map_or(1, StatsError::exit_code);
            ExitCode::from(code)
        }
    }
}

fn run(cli: &Cli, show_progress: bool) -> Result<()> {
    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta =
            inspect(&cli.input, cli.password.as_deref()).context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input.display());
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
            if let Some(ref c) = meta.creation_date {
                println!("Created:      {}", c);
            }
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };
    let config = build_config(cli, progress_cb)?;

    // ── Analyze ──────────────────────────────────────────────────────────
    let output = analyze(&cli.input, &config).context("Analysis failed")?;

    if output.is_empty() {
        if !cli.quiet {
            eprintln!(
                "{} No outbound records found in {}",
                yellow("⚠"),
                cli.input.display()
            );
        }
        if cli.json {
            print_json(&output, None)?;
        }
        return Ok(());
    }

    // ── Write reports ────────────────────────────────────────────────────
    let paths = write_reports(&output, &cli.input).context("Failed to write reports")?;

    if cli.json {
        print_json(&output, Some(&paths))?;
    }
    if !cli.quiet {
        print_summary(&output, &paths);
    }
    Ok(())
}

/// Map CLI args to `StatsConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<StatsConfig> {
    let pages: PageSelection = cli.pages.parse().context("Invalid --pages")?;

    let mut builder = StatsConfig::builder()
        .exclude_holidays(!cli.no_holidays)
        .holiday_region(cli.region.trim())
        .fill_gaps(!cli.no_fill_gaps)
        .pages(pages);

    if let Some(ref keyword) = cli.keyword {
        builder = builder.keyword(keyword.clone());
    }
    if let Some(ref pattern) = cli.pattern {
        builder = builder.pattern(pattern.clone());
    }
    if let Some(ref path) = cli.holiday_file {
        builder = builder.holiday_file(path.clone());
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_json(output: &StatsOutput, reports: Option<&ReportPaths>) -> Result<()> {
    let json = serde_json::to_string_pretty(&JsonReport { output, reports })
        .context("Failed to serialise output")?;
    println!("{json}");
    Ok(())
}

fn print_summary(output: &StatsOutput, paths: &ReportPaths) {
    for row in &output.rows {
        eprintln!(
            "  {}  {:>4} {}  {:>4} {}  {:>4} {}",
            bold(&row.label),
            row.total_records,
            dim("records"),
            row.unique_days,
            dim("days"),
            row.counted,
            dim("counted"),
        );
    }

    let meta = &output.metadata;
    if meta.exclude_holidays && meta.holiday_excluded > 0 {
        eprintln!(
            "  {}",
            dim(&format!("{} holiday day(s) excluded", meta.holiday_excluded))
        );
    }
    for warning in &output.warnings {
        eprintln!("{} {}", yellow("⚠"), warning);
    }
    for skipped in &output.skipped {
        let page = skipped
            .page
            .map(|p| format!("page {p}: "))
            .unwrap_or_default();
        eprintln!("{} {}{}", yellow("⚠"), page, skipped.error);
    }

    eprintln!(
        "{}  Results saved: {} and {}",
        green("✔"),
        bold(&paths.xlsx.display().to_string()),
        bold(&paths.markdown.display().to_string()),
    );
}
