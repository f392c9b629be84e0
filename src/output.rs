//! Result types handed from the pipeline to the reporter.

use crate::error::{HolidayWarning, RecordError};
use crate::pipeline::bucket::{AcademicYear, CountTable};
use crate::pipeline::dedup::EventSet;
use serde::{Deserialize, Serialize};

/// Everything one analysis run produced.
#[derive(Debug, Clone, Serialize)]
pub struct StatsOutput {
    /// One row per academic year, ascending.
    pub rows: Vec<SummaryRow>,
    /// Counted events per academic year (after deduplication and, when
    /// enabled, holiday exclusion).
    pub counts: CountTable,
    /// The deduplicated events before holiday exclusion.
    pub events: EventSet,
    pub metadata: ReportMetadata,
    /// Records whose date could not be parsed.
    pub skipped: Vec<SkippedRecord>,
    /// Holiday coverage gaps.
    pub warnings: Vec<HolidayWarning>,
    /// PDF metadata, when the input was a PDF.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<DocumentMetadata>,
}

impl StatsOutput {
    /// `true` when the document contained no outbound record at all.
    pub fn is_empty(&self) -> bool {
        self.metadata.raw_records == 0
    }
}

/// One academic year of the summary table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub year: AcademicYear,
    /// `2022–2023`.
    pub label: String,
    /// Every outbound record in the year, duplicates included.
    pub total_records: usize,
    /// Distinct calendar days with at least one record.
    pub unique_days: usize,
    /// Unique days left after holiday exclusion (equal to `unique_days`
    /// when exclusion is off).
    pub counted: usize,
}

impl SummaryRow {
    /// `2022–2023学年 (2022-08-01~2023-07-31)`.
    pub fn long_label(&self) -> String {
        format!(
            "{}学年 ({}~{})",
            self.label,
            self.year.first_day(),
            self.year.last_day()
        )
    }
}

/// Totals and settings reported next to the table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Outbound records parsed, duplicates included.
    pub raw_records: usize,
    /// Distinct days across the whole document.
    pub unique_days: usize,
    /// Events counted in the table.
    pub total_events: usize,
    /// Malformed records skipped.
    pub skipped_records: usize,
    pub exclude_holidays: bool,
    pub holiday_region: Option<String>,
    /// Events removed because they fell on a holiday.
    pub holiday_excluded: usize,
    /// Calendar years for which no holiday data was available.
    pub uncovered_years: Vec<i32>,
}

/// A malformed record with its page, when known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    pub error: RecordError,
}

/// PDF document metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}
