//! Error types for the outbound-stats library.
//!
//! Three distinct types reflect three distinct failure modes:
//!
//! * [`StatsError`] — **Fatal**: the analysis cannot proceed at all (missing
//!   input, wrong password, a PDF with no extractable text, an output file
//!   that cannot be written). Returned as `Err(StatsError)` from the
//!   top-level `analyze*` functions and from the reporter.
//!
//! * [`RecordError`] — **Non-fatal**: a single marker was found but the date
//!   next to it could not be parsed. The record is skipped and counted; the
//!   rest of the document is still analysed.
//!
//! * [`HolidayWarning`] — **Non-fatal**: holiday data for a region or a year
//!   is missing. Dates in that year pass through the filter unchanged.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the outbound-stats library.
#[derive(Debug, Error)]
pub enum StatsError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf --decrypt input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// Selected page numbers exceed the actual page count.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// pdfium could not produce a text layer for a page.
    #[error("Text extraction failed for page {page}: {detail}")]
    TextExtractionFailed { page: usize, detail: String },

    /// Every selected page came back without text, e.g. a scanned document.
    #[error(
        "'{path}' has no extractable text in {pages} page(s).\n\
Scanned or image-only documents are not supported; run them through OCR first."
    )]
    UnreadableDocument { path: PathBuf, pages: usize },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A custom marker pattern did not compile.
    #[error("Invalid marker pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create, write, or rename one of the report files.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The workbook container could not be assembled.
    #[error("Failed to build workbook '{path}': {detail}")]
    WorkbookFailed { path: PathBuf, detail: String },

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Text extraction needs the pdfium shared library. You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium (file or directory).\n\
  • Install libpdfium system-wide so the dynamic loader can find it.\n"
    )]
    PdfiumBindingFailed(String),
}

impl StatsError {
    /// Process exit code for the CLI: 2 when the input is missing, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        match self {
            StatsError::FileNotFound { .. } => 2,
            _ => 1,
        }
    }
}

/// A non-fatal error for a single outbound record.
///
/// The record is skipped; the extractor keeps scanning.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum RecordError {
    /// The marker keyword was found but the date next to it is not valid.
    #[error("Malformed record at byte {offset}: '{excerpt}' ({reason})")]
    Malformed {
        /// Byte offset of the marker in the document text.
        offset: usize,
        /// The offending text, marker included.
        excerpt: String,
        reason: String,
    },
}

impl RecordError {
    pub fn offset(&self) -> usize {
        match self {
            RecordError::Malformed { offset, .. } => *offset,
        }
    }
}

/// A non-fatal warning raised by the holiday filter.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum HolidayWarning {
    /// No holiday data for `region` in `year` (or at all when `year` is `None`).
    #[error("Holiday data unavailable for region '{region}'{}: {reason}", .year.map(|y| format!(" in {y}")).unwrap_or_default())]
    Unavailable {
        region: String,
        year: Option<i32>,
        reason: String,
    },
}
