//! # outbound-stats
//!
//! Count outbound (出境) border-crossing records in a PDF, per academic year.
//!
//! Immigration movement records list each crossing as a marker keyword
//! followed by a date, e.g. `出境 2023-01-02`. This crate pulls those dates out
//! of the PDF's text layer, collapses same-day crossings, optionally drops
//! public holidays, and tallies the rest per academic year (Aug 1 – Jul 31).
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     check the file exists and is a PDF
//!  ├─ 2. Text      read the text layer via pdfium, normalise each page
//!  ├─ 3. Extract   lazy marker + date matching; malformed records skipped
//!  ├─ 4. Dedup     one event per calendar day
//!  ├─ 5. Holidays  optional removal of public holidays (built-in MO or file)
//!  ├─ 6. Bucket    counts per academic year, optionally zero-filled
//!  └─ 7. Report    <base>.xlsx + <base>.md next to the input
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use outbound_stats::{analyze_to_files, StatsConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = StatsConfig::default();
//!     let (output, paths) = analyze_to_files("movements.pdf", &config)?;
//!     for row in &output.rows {
//!         println!("{}: {}", row.label, row.counted);
//!     }
//!     if let Some(paths) = paths {
//!         eprintln!("wrote {}", paths.markdown.display());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Text obtained some other way can be analysed directly:
//!
//! ```rust
//! use outbound_stats::{analyze_text, StatsConfig};
//!
//! let config = StatsConfig::builder().exclude_holidays(false).build().unwrap();
//! let output = analyze_text("出境 2023-07-31\n出境 2023-08-01", &config).unwrap();
//! assert_eq!(output.rows.len(), 2);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `outbound-stats` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! outbound-stats = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod stats;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PageSelection, StatsConfig, StatsConfigBuilder};
pub use error::{HolidayWarning, RecordError, StatsError};
pub use output::{DocumentMetadata, ReportMetadata, SkippedRecord, StatsOutput, SummaryRow};
pub use pipeline::bucket::{AcademicYear, CountTable};
pub use pipeline::dedup::EventSet;
pub use pipeline::extract::{MarkerGrammar, RawDate};
pub use pipeline::holiday::HolidayCalendar;
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use report::{render_markdown, write_reports, ReportPaths};
pub use stats::{analyze, analyze_document, analyze_text, analyze_to_files, inspect};
