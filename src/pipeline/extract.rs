//! Date extraction: find every outbound marker and parse the date next to it.
//!
//! The extractor is a lazy, restartable iterator over the document text.
//! Each call to [`DateExtractor::records`] or [`DateExtractor::dates`] starts
//! a fresh scan; the list of matches is never materialised, so a large
//! document only costs the memory of its text plus the [`EventSet`] being
//! built downstream.
//!
//! [`EventSet`]: crate::pipeline::dedup::EventSet
//!
//! ## Grammar
//!
//! ```text
//! record   = keyword gap [ date ]
//! keyword  = "出境"            (configurable; whitespace tolerated between characters)
//! gap      = [ \t:：]*         (configurable; stays on the marker's line)
//! date     = digits sep digits sep digits
//! sep      = \s* [-/.] \s*     (configurable)
//! ```
//!
//! A `record` whose date is missing is ignored when the gap is followed by
//! anything other than a digit (column headers such as `出境/入境` look like
//! that). A digit that does not complete the grammar, a year that is not four
//! digits, or a triple that is not a real calendar date produces a
//! [`RecordError::Malformed`] and the scan moves on.

use crate::error::{RecordError, StatsError};
use chrono::NaiveDate;
use regex::{CaptureMatches, Captures, Regex};
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

/// The marker printed before each departure date in the source records.
pub const DEFAULT_KEYWORD: &str = "出境";

/// Characters tolerated between the keyword and the date.
pub const DEFAULT_GAP: &str = r"[ \t\u{A0}:：]*";

/// Separator between year, month and day.
pub const DEFAULT_SEPARATOR: &str = r"\s*[-/.]\s*";

/// Characters of trailing context kept in a malformed-record excerpt.
const EXCERPT_TAIL: usize = 12;

/// A calendar date parsed from the document text.
pub type RawDate = NaiveDate;

/// How outbound markers and their dates are recognised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkerGrammar {
    /// Keyword followed by a `YYYY-MM-DD`-style date.
    ///
    /// `gap` and `separator` are regular-expression fragments.
    Keyword {
        keyword: String,
        gap: String,
        separator: String,
    },
    /// A full regular expression with named groups `year`, `month` and `day`.
    Custom(String),
}

impl Default for MarkerGrammar {
    fn default() -> Self {
        MarkerGrammar::keyword(DEFAULT_KEYWORD)
    }
}

impl MarkerGrammar {
    /// Keyword grammar with the default gap and separator.
    pub fn keyword(keyword: impl Into<String>) -> Self {
        MarkerGrammar::Keyword {
            keyword: keyword.into(),
            gap: DEFAULT_GAP.to_string(),
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }

    /// Render the grammar as a regular expression.
    pub fn to_pattern(&self) -> String {
        match self {
            MarkerGrammar::Keyword {
                keyword,
                gap,
                separator,
            } => {
                // pdfium sometimes splits CJK glyph runs with spaces
                let keyword = keyword
                    .chars()
                    .map(|c| regex::escape(&c.to_string()))
                    .collect::<Vec<_>>()
                    .join(r"\s*");
                format!(
                    r"(?P<marker>{keyword}){gap}(?:(?P<year>[0-9]+){separator}(?P<month>[0-9]+){separator}(?P<day>[0-9]+))?"
                )
            }
            MarkerGrammar::Custom(pattern) => pattern.clone(),
        }
    }

    fn is_custom(&self) -> bool {
        matches!(self, MarkerGrammar::Custom(_))
    }
}

/// One outbound record found in the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundRecord {
    pub date: RawDate,
    /// Byte offset of the marker in the text that was scanned.
    pub offset: usize,
}

/// A compiled [`MarkerGrammar`].
#[derive(Debug, Clone)]
pub struct DateExtractor {
    regex: Regex,
    custom: bool,
}

impl DateExtractor {
    /// Compile `grammar`.
    ///
    /// # Errors
    /// [`StatsError::InvalidPattern`] when the expression does not compile,
    /// [`StatsError::InvalidConfig`] when the keyword is empty or a custom
    /// pattern lacks one of the `year`, `month`, `day` groups.
    pub fn new(grammar: &MarkerGrammar) -> Result<Self, StatsError> {
        if let MarkerGrammar::Keyword { keyword, .. } = grammar {
            if keyword.trim().is_empty() {
                return Err(StatsError::InvalidConfig(
                    "Marker keyword must not be empty".into(),
                ));
            }
        }

        let pattern = grammar.to_pattern();
        let regex = Regex::new(&pattern).map_err(|source| StatsError::InvalidPattern {
            pattern: pattern.clone(),
            source,
        })?;

        for group in ["year", "month", "day"] {
            if !regex.capture_names().flatten().any(|n| n == group) {
                return Err(StatsError::InvalidConfig(format!(
                    "Marker pattern '{pattern}' has no named group '{group}'"
                )));
            }
        }

        Ok(Self {
            regex,
            custom: grammar.is_custom(),
        })
    }

    /// Lazily scan `text` for records, yielding malformed ones as errors.
    pub fn records<'r, 't>(&'r self, text: &'t str) -> OutboundRecords<'r, 't> {
        OutboundRecords {
            matches: self.regex.captures_iter(text),
            text,
            custom: self.custom,
        }
    }

    /// Lazily scan `text` for dates, tallying malformed records on the side.
    pub fn dates<'r, 't>(&'r self, text: &'t str) -> DateStream<'r, 't> {
        DateStream {
            records: self.records(text),
            parsed: 0,
            skipped: Vec::new(),
        }
    }
}

/// Iterator over the records in one text. Created by [`DateExtractor::records`].
pub struct OutboundRecords<'r, 't> {
    matches: CaptureMatches<'r, 't>,
    text: &'t str,
    custom: bool,
}

impl<'r, 't> Iterator for OutboundRecords<'r, 't> {
    type Item = Result<OutboundRecord, RecordError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let caps = self.matches.next()?;
            if let Some(item) = self.classify(&caps) {
                return Some(item);
            }
        }
    }
}

impl<'r, 't> OutboundRecords<'r, 't> {
    /// `None` means the match was a bare keyword and is not a record.
    fn classify(&self, caps: &Captures<'t>) -> Option<Result<OutboundRecord, RecordError>> {
        let whole = caps.get(0)?;
        let offset = caps.name("marker").map_or(whole.start(), |m| m.start());

        let (year, month, day) = match (caps.name("year"), caps.name("month"), caps.name("day")) {
            (Some(y), Some(m), Some(d)) => (y.as_str(), m.as_str(), d.as_str()),
            _ => {
                let next = self.text[whole.end()..].chars().next();
                if !self.custom && next.is_some_and(|c| c.is_ascii_digit()) {
                    return Some(Err(self.malformed(offset, whole.end(), "incomplete date")));
                }
                trace!("Marker without date at byte {}", offset);
                return None;
            }
        };

        Some(
            parse_date(year, month, day)
                .map(|date| OutboundRecord { date, offset })
                .map_err(|reason| self.malformed(offset, whole.end(), reason)),
        )
    }

    fn malformed(&self, start: usize, end: usize, reason: &str) -> RecordError {
        RecordError::Malformed {
            offset: start,
            excerpt: excerpt(self.text, start, end),
            reason: reason.to_string(),
        }
    }
}

/// Date-only view over [`OutboundRecords`]. Created by [`DateExtractor::dates`].
///
/// Malformed records are logged, collected, and skipped. Use
/// [`DateStream::by_ref`](Iterator::by_ref) to consume the dates and still
/// read the tally afterwards.
pub struct DateStream<'r, 't> {
    records: OutboundRecords<'r, 't>,
    parsed: usize,
    skipped: Vec<RecordError>,
}

impl<'r, 't> DateStream<'r, 't> {
    /// Records that parsed successfully so far.
    pub fn parsed_count(&self) -> usize {
        self.parsed
    }

    /// Records skipped so far.
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn skipped(&self) -> &[RecordError] {
        &self.skipped
    }

    pub fn into_skipped(self) -> Vec<RecordError> {
        self.skipped
    }
}

impl<'r, 't> Iterator for DateStream<'r, 't> {
    type Item = RawDate;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.records.next()? {
                Ok(record) => {
                    self.parsed += 1;
                    return Some(record.date);
                }
                Err(e) => {
                    warn!("Skipping {}", e);
                    self.skipped.push(e);
                }
            }
        }
    }
}

fn parse_date(year: &str, month: &str, day: &str) -> Result<RawDate, &'static str> {
    if year.len() != 4 {
        return Err("year must have 4 digits");
    }
    if !(1..=2).contains(&month.len()) || !(1..=2).contains(&day.len()) {
        return Err("month and day must have 1 or 2 digits");
    }
    let (Ok(y), Ok(m), Ok(d)) = (year.parse::<i32>(), month.parse::<u32>(), day.parse::<u32>())
    else {
        return Err("not a number");
    };
    NaiveDate::from_ymd_opt(y, m, d).ok_or("invalid calendar date")
}

/// The matched text plus a little trailing context, cut at the line end.
fn excerpt(text: &str, start: usize, end: usize) -> String {
    let tail: String = text[end..]
        .chars()
        .take_while(|&c| c != '\n')
        .take(EXCERPT_TAIL)
        .collect();
    format!("{}{}", &text[start..end], tail).trim().to_string()
}
