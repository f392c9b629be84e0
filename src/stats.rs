//! Analysis entry points.
//!
//! [`analyze`] reads a PDF and runs the whole pipeline; [`analyze_text`] runs
//! it on text you already have. [`analyze_to_files`] additionally writes the
//! two reports next to the input.

use crate::config::StatsConfig;
use crate::error::{HolidayWarning, StatsError};
use crate::output::{DocumentMetadata, ReportMetadata, SkippedRecord, StatsOutput, SummaryRow};
use crate::pipeline::bucket::{bucket, AcademicYear, CountTable};
use crate::pipeline::dedup::EventSet;
use crate::pipeline::extract::DateExtractor;
use crate::pipeline::holiday::{exclude_holidays, resolve_calendar};
use crate::pipeline::input;
use crate::pipeline::text::{self, DocumentText};
use crate::report::{self, ReportPaths};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Source name reported for text that did not come from a file.
const TEXT_SOURCE: &str = "<text>";

/// Analyze the outbound records in a PDF file.
///
/// # Returns
/// `Ok(StatsOutput)` even when some records were malformed (see
/// `output.skipped`) or holiday data was missing (see `output.warnings`).
///
/// # Errors
/// Fatal conditions only: missing or unreadable input, a document without
/// extractable text, an invalid marker grammar.
pub fn analyze(pdf: impl AsRef<Path>, config: &StatsConfig) -> Result<StatsOutput, StatsError> {
    let start = Instant::now();

    // ── Step 1: Resolve input ────────────────────────────────────────────
    let pdf_path = input::resolve_input(pdf)?;
    info!("Analyzing {}", pdf_path.display());

    // ── Step 2: Metadata ─────────────────────────────────────────────────
    let metadata = text::extract_metadata(&pdf_path, config.password.as_deref())?;
    debug!("PDF has {} pages", metadata.page_count);

    // ── Step 3: Text layer ───────────────────────────────────────────────
    let document = text::extract_text(
        &pdf_path,
        config.password.as_deref(),
        &config.pages,
        config.progress_callback.as_ref(),
    )?;

    // ── Step 4: Records → counts ─────────────────────────────────────────
    let mut output = analyze_document(&document, config)?;
    output.document = Some(metadata);

    info!(
        "Analysis complete: {} records, {} counted in {}ms",
        output.metadata.raw_records,
        output.metadata.total_events,
        start.elapsed().as_millis()
    );
    Ok(output)
}

/// Run the pipeline on plain text (one page).
pub fn analyze_text(text: &str, config: &StatsConfig) -> Result<StatsOutput, StatsError> {
    analyze_document(&DocumentText::from_text(text), config)
}

/// Run the pipeline on already-extracted document text.
///
/// # Errors
/// [`StatsError::UnreadableDocument`] when no page carries any text, and the
/// grammar errors of [`DateExtractor::new`].
pub fn analyze_document(
    document: &DocumentText,
    config: &StatsConfig,
) -> Result<StatsOutput, StatsError> {
    if document.is_blank() {
        return Err(StatsError::UnreadableDocument {
            path: PathBuf::from(TEXT_SOURCE),
            pages: document.page_count(),
        });
    }
    let extractor = DateExtractor::new(&config.grammar)?;

    // Raw counts and the deduplicated set are built in one pass over the
    // lazy date stream.
    let mut raw = CountTable::new();
    let mut events = EventSet::new();
    let mut dates = extractor.dates(document.as_str());
    for date in dates.by_ref() {
        raw.record(date);
        events.insert(date);
    }
    let raw_records = dates.parsed_count();
    let skipped: Vec<SkippedRecord> = dates
        .into_skipped()
        .into_iter()
        .map(|error| SkippedRecord {
            page: document.page_at(error.offset()),
            error,
        })
        .collect();
    debug!(
        "{} records, {} unique days, {} skipped",
        raw_records,
        events.len(),
        skipped.len()
    );

    if let Some(cb) = &config.progress_callback {
        cb.on_extraction_complete(raw_records, skipped.len());
    }

    let unique = bucket(&events, false);

    let mut warnings: Vec<HolidayWarning> = Vec::new();
    let mut holiday_excluded = 0;
    let counted = if config.exclude_holidays && !events.is_empty() {
        let (calendar, resolve_warnings) =
            resolve_calendar(&config.holiday_region, config.holiday_file.as_deref());
        warnings.extend(resolve_warnings);
        match calendar {
            Some(calendar) => {
                let outcome = exclude_holidays(&events, calendar.as_ref());
                holiday_excluded = outcome.excluded.len();
                warnings.extend(outcome.warnings);
                outcome.events
            }
            None => events.clone(),
        }
    } else {
        events.clone()
    };
    for w in warnings.iter().filter(|w| matches!(w, HolidayWarning::Unavailable { year: None, .. })) {
        warn!("{}", w);
    }

    let mut counts = bucket(&counted, false);
    let rows = summary_rows(&raw, &unique, &mut counts, config.fill_gaps);

    let uncovered_years = warnings
        .iter()
        .filter_map(|w| match w {
            HolidayWarning::Unavailable { year, .. } => *year,
        })
        .collect();

    let metadata = ReportMetadata {
        raw_records,
        unique_days: events.len(),
        total_events: counts.total(),
        skipped_records: skipped.len(),
        exclude_holidays: config.exclude_holidays,
        holiday_region: config
            .exclude_holidays
            .then(|| config.holiday_region.to_uppercase()),
        holiday_excluded,
        uncovered_years,
    };

    Ok(StatsOutput {
        rows,
        counts,
        events,
        metadata,
        skipped,
        warnings,
        document: None,
    })
}

/// One row per academic year seen in the raw records, plus the zero-filled
/// years between when `fill_gaps` is set. `counts` gets the same coverage.
fn summary_rows(
    raw: &CountTable,
    unique: &CountTable,
    counts: &mut CountTable,
    fill_gaps: bool,
) -> Vec<SummaryRow> {
    let (Some(first), Some(last)) = (raw.first_year(), raw.last_year()) else {
        return Vec::new();
    };

    let years: Vec<AcademicYear> = if fill_gaps {
        counts.fill_range(first, last);
        std::iter::successors(Some(first), |y| Some(y.next()))
            .take_while(|y| *y <= last)
            .collect()
    } else {
        for year in raw.years() {
            counts.fill_range(year, year);
        }
        raw.years().collect()
    };

    years
        .into_iter()
        .map(|year| SummaryRow {
            year,
            label: year.label(),
            total_records: raw.get(year),
            unique_days: unique.get(year),
            counted: counts.get(year),
        })
        .collect()
}

/// Analyze `pdf` and write `<base>.xlsx` and `<base>.md` next to it.
///
/// Returns `None` for the paths when the document had no outbound record;
/// nothing is written in that case.
pub fn analyze_to_files(
    pdf: impl AsRef<Path>,
    config: &StatsConfig,
) -> Result<(StatsOutput, Option<ReportPaths>), StatsError> {
    let pdf = pdf.as_ref();
    let output = analyze(pdf, config)?;
    if output.is_empty() {
        warn!("No outbound records found in {}", pdf.display());
        return Ok((output, None));
    }
    let paths = report::write_reports(&output, pdf)?;
    Ok((output, Some(paths)))
}

/// Read PDF metadata without analysing any text.
pub fn inspect(pdf: impl AsRef<Path>, password: Option<&str>) -> Result<DocumentMetadata, StatsError> {
    let pdf_path = input::resolve_input(pdf)?;
    text::extract_metadata(&pdf_path, password)
}
